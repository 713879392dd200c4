use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_REGION_LABEL: &str = "Неизвестная область";
pub const DEFAULT_SETTLEMENT_NAME: &str = "Неизвестный населённый пункт";

/// 原始 API 記錄，保留供應商回傳的所有欄位
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn from_object(obj: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data: obj.into_iter().collect(),
        }
    }

    /// 取得字串欄位；缺少、null 或非字串時回傳 None
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// 取得字串欄位，數字會轉為字串（部分欄位供應商會回傳數字）
    pub fn text_field(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Labels substituted when the provider omits a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefaults {
    pub region: String,
    pub settlement_name: String,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION_LABEL.to_string(),
            settlement_name: DEFAULT_SETTLEMENT_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub reference: String,
    pub name: String,
    pub region: String,
    pub settlement_type: String,
}

impl Settlement {
    /// Extracts a settlement from a `getCities` item. A missing, non-string or
    /// blank `AreaDescription` maps to the fallback region label; any other
    /// value is kept verbatim.
    pub fn from_record(record: &Record, defaults: &FieldDefaults) -> Self {
        let region = record
            .str_field("AreaDescription")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.region.as_str())
            .to_string();

        Self {
            reference: record.str_field("Ref").unwrap_or_default().to_string(),
            name: record
                .str_field("Description")
                .unwrap_or(defaults.settlement_name.as_str())
                .to_string(),
            region,
            settlement_type: record
                .str_field("SettlementTypeDescription")
                .unwrap_or_default()
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePoint {
    pub warehouse_number: String,
    pub description: String,
    pub type_of_warehouse: String,
}

impl ServicePoint {
    pub fn from_record(record: &Record) -> Self {
        Self {
            warehouse_number: record.text_field("Number").unwrap_or_default(),
            description: record.str_field("Description").unwrap_or_default().to_string(),
            type_of_warehouse: record
                .str_field("TypeOfWarehouse")
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// One entry of a region file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedSettlement {
    pub name: String,
    pub settlement_type: String,
    pub region: String,
    pub warehouses: Vec<ServicePoint>,
}

impl EnrichedSettlement {
    pub fn new(settlement: Settlement, warehouses: Vec<ServicePoint>) -> Self {
        Self {
            name: settlement.name,
            settlement_type: settlement.settlement_type,
            region: settlement.region,
            warehouses,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionGroup {
    pub region: String,
    pub settlements: Vec<EnrichedSettlement>,
}

/// Region name to settlements, both in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct RegionGroups {
    groups: Vec<RegionGroup>,
    index: HashMap<String, usize>,
}

impl RegionGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, settlement: EnrichedSettlement) {
        match self.index.get(&settlement.region) {
            Some(&pos) => self.groups[pos].settlements.push(settlement),
            None => {
                self.index
                    .insert(settlement.region.clone(), self.groups.len());
                self.groups.push(RegionGroup {
                    region: settlement.region.clone(),
                    settlements: vec![settlement],
                });
            }
        }
    }

    pub fn get(&self, region: &str) -> Option<&RegionGroup> {
        self.index.get(region).map(|&pos| &self.groups[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn settlement_count(&self) -> usize {
        self.groups.iter().map(|g| g.settlements.len()).sum()
    }
}

/// Bounded retry for the per-settlement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff_factor: Duration,
    pub max_backoff: Duration,
    pub retry_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub const DEFAULT_STATUSES: [u16; 4] = [500, 502, 503, 504];

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn should_retry(&self, status: u16, attempt: u32) -> bool {
        attempt < self.max_attempts && self.retry_statuses.contains(&status)
    }

    /// Delay after the `attempt`-th failed attempt: factor * 2^(attempt-1), capped.
    /// A server-provided `Retry-After` replaces the computed value.
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(delay) = retry_after {
            return delay.min(self.max_backoff);
        }
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_factor
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_factor: Duration::from_secs(1),
            max_backoff: Duration::from_secs(120),
            retry_statuses: Self::DEFAULT_STATUSES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub groups: RegionGroups,
    /// References of settlements whose service points could not be fetched.
    pub failed_lookups: Vec<String>,
}

impl TransformResult {
    pub fn service_point_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.settlements.iter())
            .map(|s| s.warehouses.len())
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub settlements: usize,
    pub service_points: usize,
    pub regions: usize,
    pub failed_lookups: Vec<String>,
    pub written_files: Vec<String>,
}
