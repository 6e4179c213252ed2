use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::util;

/// 牌告表中表示"暂无报价"的占位符
pub const UNAVAILABLE: &str = "-";

/// 报价值：抓取时为字符串，旧文件中也可能是数字
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Text(String),
    Number(serde_json::Number),
}

impl Price {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Price::Text(s) if s.trim() == UNAVAILABLE)
    }
}

impl From<&str> for Price {
    fn from(s: &str) -> Self {
        Price::Text(s.to_string())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Text(s) => f.write_str(s),
            Price::Number(n) => write!(f, "{}", n),
        }
    }
}

/// 单一币别的即期买入/卖出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "即期買入", alias = "buy")]
    pub buy: Price,
    #[serde(rename = "即期賣出", alias = "sell")]
    pub sell: Price,
    /// 其他栏位（例如旧档案中的现金汇率）原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Quote {
    pub fn new(buy: Price, sell: Price) -> Self {
        Self { buy, sell, extra: Map::new() }
    }
}

/// One row of the rate board after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRecord {
    pub currency_code: String,
    pub buy: Price,
    pub sell: Price,
}

impl RateRecord {
    pub fn new(currency_code: &str, buy: &str, sell: &str) -> Self {
        Self {
            currency_code: currency_code.to_string(),
            buy: Price::from(buy),
            sell: Price::from(sell),
        }
    }

    pub fn is_available(&self) -> bool {
        !self.buy.is_unavailable() && !self.sell.is_unavailable()
    }
}

/// Parsed rate board: how many data rows the table had, and the rows kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    pub rows_found: usize,
    pub records: Vec<RateRecord>,
}

/// A single day's quotes keyed by currency code.
///
/// Keeps insertion order so the JSON object lists currencies in the same
/// order as the source table. Codes are unique; inserting an existing code
/// replaces its quote in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySnapshot {
    entries: Vec<(String, Quote)>,
}

impl DailySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous quote when `code` was already present.
    pub fn insert(&mut self, code: String, quote: Quote) -> Option<Quote> {
        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some((_, existing)) => Some(std::mem::replace(existing, quote)),
            None => {
                self.entries.push((code, quote));
                None
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&Quote> {
        self.entries.iter().find(|(c, _)| c == code).map(|(_, q)| q)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    /// 控制台预览：取格式化 JSON 的前 `limit` 个字符
    pub fn preview(&self, limit: usize) -> crate::errors::Result<String> {
        let json = util::to_pretty_json(self)?;
        Ok(util::truncate_chars(&json, limit).to_string())
    }
}

impl Serialize for DailySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (code, quote) in &self.entries {
            map.serialize_entry(code, quote)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DailySnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = DailySnapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of currency code to quote")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut snapshot = DailySnapshot::new();
                while let Some((code, quote)) = access.next_entry::<String, Quote>()? {
                    snapshot.insert(code, quote);
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}
