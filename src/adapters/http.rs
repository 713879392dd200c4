use crate::domain::model::{Record, RetryPolicy};
use crate::domain::ports::{CatalogApi, ConfigProvider};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.novaposhta.ua/v2.0/json/";

/// Request envelope: the body selects the remote operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    api_key: &'a str,
    model_name: &'a str,
    called_method: &'a str,
    method_properties: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Vec<Value>,
}

impl ApiResponse {
    fn into_records(self) -> Result<Vec<Record>> {
        if self.success == Some(false) {
            let errors = self
                .errors
                .into_iter()
                .map(|e| match e {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            return Err(EtlError::Api { errors });
        }

        let items = match self.data {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };

        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(obj) => Some(Record::from_object(obj)),
                _ => None,
            })
            .collect())
    }
}

/// Client for the Nova Poshta JSON API. The key and transport settings are
/// fixed at construction.
#[derive(Debug, Clone)]
pub struct NovaPoshtaClient {
    client: Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl NovaPoshtaClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EtlError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            retry,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.api_endpoint(),
            config.api_key(),
            config.request_timeout(),
            config.retry_policy(),
        )
    }

    async fn call(
        &self,
        model_name: &str,
        called_method: &str,
        method_properties: Value,
        retry: &RetryPolicy,
    ) -> Result<Vec<Record>> {
        let request = ApiRequest {
            api_key: &self.api_key,
            model_name,
            called_method,
            method_properties,
        };

        let body = self.send_with_retry(&request, retry).await?;
        let response: ApiResponse = serde_json::from_str(&body)?;
        response.into_records()
    }

    /// Retries only on the policy's status codes; connection errors and
    /// timeouts are returned immediately.
    async fn send_with_retry(&self, request: &ApiRequest<'_>, retry: &RetryPolicy) -> Result<String> {
        let mut attempt = 1;
        loop {
            tracing::debug!(
                "POST {} {}/{} (attempt {}/{})",
                self.endpoint,
                request.model_name,
                request.called_method,
                attempt,
                retry.max_attempts
            );
            let response = self.client.post(&self.endpoint).json(request).send().await?;
            let status = response.status();

            if retry.should_retry(status.as_u16(), attempt) {
                let delay = retry.backoff(attempt, retry_after(&response));
                tracing::debug!(
                    "{} returned {}, retrying in {:?}",
                    request.called_method,
                    status,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                return Err(EtlError::HttpStatus {
                    status: status.as_u16(),
                    attempts: attempt,
                });
            }

            return Ok(response.text().await?);
        }
    }
}

/// `Retry-After` in seconds, honoured for 503 only.
fn retry_after(response: &Response) -> Option<Duration> {
    if response.status() != StatusCode::SERVICE_UNAVAILABLE {
        return None;
    }
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl CatalogApi for NovaPoshtaClient {
    async fn fetch_all_settlements(&self) -> Result<Vec<Record>> {
        self.call("Address", "getCities", json!({}), &RetryPolicy::none())
            .await
    }

    async fn fetch_service_points(&self, settlement_ref: &str) -> Result<Vec<Record>> {
        self.call(
            "AddressGeneral",
            "getWarehouses",
            json!({ "CityRef": settlement_ref }),
            &self.retry,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_factor: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
            ..RetryPolicy::default()
        }
    }

    fn client_for(server: &MockServer, retry: RetryPolicy) -> NovaPoshtaClient {
        NovaPoshtaClient::new(server.url("/"), "test-key", Duration::from_secs(2), retry).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_all_settlements_sends_envelope() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .json_body(json!({
                        "apiKey": "test-key",
                        "modelName": "Address",
                        "calledMethod": "getCities",
                        "methodProperties": {}
                    }));
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({
                        "success": true,
                        "data": [
                            {"Ref": "R1", "Description": "Kyiv", "AreaDescription": "Kyiv Oblast"},
                            {"Ref": "R2", "Description": "Lviv", "AreaDescription": "Lviv Oblast"}
                        ],
                        "errors": []
                    }));
            })
            .await;

        let client = client_for(&server, fast_retry(5));
        let records = client.fetch_all_settlements().await.unwrap();

        api_mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].str_field("Ref"), Some("R1"));
        assert_eq!(records[1].str_field("Description"), Some("Lviv"));
    }

    #[tokio::test]
    async fn test_api_level_failure_is_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(200).json_body(json!({
                    "success": false,
                    "data": [],
                    "errors": ["API key expired"]
                }));
            })
            .await;

        let client = client_for(&server, fast_retry(5));
        let err = client.fetch_all_settlements().await.unwrap_err();

        match err {
            EtlError::Api { errors } => assert_eq!(errors, vec!["API key expired".to_string()]),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_catalog_request_is_not_retried() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(503);
            })
            .await;

        let client = client_for(&server, fast_retry(5));
        let err = client.fetch_all_settlements().await.unwrap_err();

        api_mock.assert_hits_async(1).await;
        assert!(matches!(
            err,
            EtlError::HttpStatus {
                status: 503,
                attempts: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_service_points_request_carries_city_ref() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/").json_body_partial(
                    r#"{"modelName": "AddressGeneral", "calledMethod": "getWarehouses", "methodProperties": {"CityRef": "R1"}}"#,
                );
                then.status(200).json_body(json!({
                    "success": true,
                    "data": [{"Number": "1", "Description": "Branch 1", "TypeOfWarehouse": "Warehouse"}]
                }));
            })
            .await;

        let client = client_for(&server, fast_retry(5));
        let records = client.fetch_service_points("R1").await.unwrap();

        api_mock.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].str_field("Number"), Some("1"));
    }

    #[tokio::test]
    async fn test_service_points_retry_on_server_error_until_exhausted() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(503);
            })
            .await;

        let client = client_for(&server, fast_retry(5));
        let err = client.fetch_service_points("R1").await.unwrap_err();

        api_mock.assert_hits_async(5).await;
        assert!(matches!(
            err,
            EtlError::HttpStatus {
                status: 503,
                attempts: 5
            }
        ));
    }

    #[tokio::test]
    async fn test_service_points_client_error_is_not_retried() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(400);
            })
            .await;

        let client = client_for(&server, fast_retry(5));
        let err = client.fetch_service_points("R1").await.unwrap_err();

        api_mock.assert_hits_async(1).await;
        assert!(matches!(
            err,
            EtlError::HttpStatus {
                status: 400,
                attempts: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_retry_after_replaces_computed_backoff() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(503).header("Retry-After", "0");
            })
            .await;

        // Without the header the first pause alone would be a minute.
        let retry = RetryPolicy {
            max_attempts: 2,
            backoff_factor: Duration::from_secs(60),
            ..RetryPolicy::default()
        };
        let client = client_for(&server, retry);
        let outcome =
            tokio::time::timeout(Duration::from_secs(5), client.fetch_service_points("R1")).await;

        let err = outcome.expect("Retry-After: 0 should skip the backoff").unwrap_err();
        api_mock.assert_hits_async(2).await;
        assert!(matches!(
            err,
            EtlError::HttpStatus {
                status: 503,
                attempts: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_distinctly() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({"success": true, "data": []}));
            })
            .await;

        let client = NovaPoshtaClient::new(
            server.url("/"),
            "test-key",
            Duration::from_millis(50),
            fast_retry(5),
        )
        .unwrap();
        let err = client.fetch_service_points("R1").await.unwrap_err();

        assert!(matches!(err, EtlError::Timeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_missing_success_flag_is_accepted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(200)
                    .json_body(json!({"data": [{"Number": "2"}, "not an object"]}));
            })
            .await;

        let client = client_for(&server, fast_retry(1));
        let records = client.fetch_service_points("R9").await.unwrap();

        assert_eq!(records.len(), 1);
    }
}
