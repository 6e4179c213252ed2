use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::errors::{Result, RateHubError};
use crate::models::rate::DailySnapshot;
use crate::util::{self, RunStamp};

const HISTORY_KEY: &str = "history";
const SCHEMA_KEYS: [&str; 4] = ["base_currency", "source", "last_updated_taipei", HISTORY_KEY];

/// 汇率历史档案，对应磁盘上的整个 JSON 文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStore {
    #[serde(default)]
    pub base_currency: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub last_updated_taipei: String,
    pub history: BTreeMap<String, HistoryEntry>,
    /// Top-level keys written by other tools, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 单日数据；不符合当前格式的旧记录原样保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Snapshot(DailySnapshot),
    /// Entries in any other shape (record lists, null prices, ...)
    Raw(Value),
}

impl HistoryEntry {
    pub fn as_snapshot(&self) -> Option<&DailySnapshot> {
        match self {
            HistoryEntry::Snapshot(snapshot) => Some(snapshot),
            HistoryEntry::Raw(_) => None,
        }
    }

    pub fn currency_count(&self) -> usize {
        match self {
            HistoryEntry::Snapshot(snapshot) => snapshot.len(),
            HistoryEntry::Raw(Value::Array(items)) => items.len(),
            HistoryEntry::Raw(Value::Object(map)) => map.len(),
            HistoryEntry::Raw(_) => 0,
        }
    }
}

/// How `load_or_default` arrived at its store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loaded,
    Missing,
    /// File had no `history` key; schema was initialized
    Initialized,
    /// File was unreadable or corrupt and was discarded
    Reset(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    pub replaced: bool,
    pub total_dates: usize,
}

impl HistoryStore {
    pub fn new(base_currency: &str, source: &str) -> Self {
        Self {
            base_currency: base_currency.to_string(),
            source: source.to_string(),
            last_updated_taipei: String::new(),
            history: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// 读取已有档案；缺失或损坏时退回空档案
    pub fn load_or_default(path: &Path, base_currency: &str, source: &str) -> (Self, LoadState) {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No existing history at {}, starting a new one", path.display());
                return (Self::new(base_currency, source), LoadState::Missing);
            }
            Err(e) => {
                return Self::reset(path, base_currency, source, RateHubError::StoreReadError(e.to_string()));
            }
        };

        let value: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                return Self::reset(path, base_currency, source, RateHubError::StoreReadError(e.to_string()));
            }
        };

        let mut object = match value {
            Value::Object(object) => object,
            other => {
                let err = RateHubError::StoreReadError(format!("expected a JSON object, found {}", json_kind(&other)));
                return Self::reset(path, base_currency, source, err);
            }
        };

        if !object.contains_key(HISTORY_KEY) {
            info!("History file {} has no history yet, initializing schema", path.display());
            let mut store = Self::new(base_currency, source);
            for key in SCHEMA_KEYS {
                object.remove(key);
            }
            store.extra = object;
            return (store, LoadState::Initialized);
        }

        match serde_json::from_value::<HistoryStore>(Value::Object(object)) {
            Ok(mut store) => {
                if store.base_currency.is_empty() {
                    store.base_currency = base_currency.to_string();
                }
                if store.source.is_empty() {
                    store.source = source.to_string();
                }
                info!("Loaded {} dates from {}", store.history.len(), path.display());
                (store, LoadState::Loaded)
            }
            Err(e) => Self::reset(path, base_currency, source, RateHubError::StoreReadError(e.to_string())),
        }
    }

    fn reset(path: &Path, base_currency: &str, source: &str, err: RateHubError) -> (Self, LoadState) {
        warn!(
            "Existing history file {} is corrupted ({}). Starting a new history.",
            path.display(), err
        );
        (Self::new(base_currency, source), LoadState::Reset(err.to_string()))
    }

    /// 写入（或覆盖）当日数据并更新时间戳
    pub fn insert_snapshot(&mut self, stamp: &RunStamp, snapshot: DailySnapshot) -> InsertOutcome {
        let replaced = self.history
            .insert(stamp.date_key.clone(), HistoryEntry::Snapshot(snapshot))
            .is_some();
        self.last_updated_taipei = stamp.timestamp.clone();
        InsertOutcome {
            replaced,
            total_dates: self.history.len(),
        }
    }

    pub fn latest(&self) -> Option<(&String, &HistoryEntry)> {
        self.history.last_key_value()
    }

    pub fn to_json(&self) -> Result<String> {
        util::to_pretty_json(self)
    }

    /// Write the whole store to `path` through a sibling temp file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let wrap = |source| RateHubError::StoreWriteError { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(wrap)?;
        }
        write_atomically(path, json.as_bytes()).map_err(wrap)?;

        info!("Successfully saved historical data to {}", path.display());
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// `history.json` -> `history.json.tmp`, next to the target
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = temp_path(path);
    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rate::{Price, Quote};
    use tempfile::tempdir;

    fn stamp(date: &str, time: &str) -> RunStamp {
        RunStamp {
            date_key: date.to_string(),
            timestamp: format!("{}T{}.000000+08:00", date, time),
        }
    }

    fn snapshot(buy: &str) -> DailySnapshot {
        let mut s = DailySnapshot::new();
        s.insert("USD".to_string(), Quote::new(Price::from(buy), Price::from("32.305")));
        s
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let (store, state) = HistoryStore::load_or_default(&dir.path().join("history.json"), "TWD", "BOT");

        assert_eq!(state, LoadState::Missing);
        assert_eq!(store, HistoryStore::new("TWD", "BOT"));
    }

    #[test]
    fn test_corrupt_file_resets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();

        let (store, state) = HistoryStore::load_or_default(&path, "TWD", "BOT");

        assert!(matches!(state, LoadState::Reset(_)));
        assert!(store.history.is_empty());
    }

    #[test]
    fn test_non_object_resets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let (_, state) = HistoryStore::load_or_default(&path, "TWD", "BOT");
        assert!(matches!(state, LoadState::Reset(_)));
    }

    #[test]
    fn test_wrong_history_shape_resets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"{"history": ["2025-10-09"]}"#).unwrap();

        let (store, state) = HistoryStore::load_or_default(&path, "TWD", "BOT");
        assert!(matches!(state, LoadState::Reset(_)));
        assert!(store.history.is_empty());
    }

    #[test]
    fn test_object_without_history_is_initialized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"{"source": "old", "note": "keep me"}"#).unwrap();

        let (store, state) = HistoryStore::load_or_default(&path, "TWD", "BOT");

        assert_eq!(state, LoadState::Initialized);
        assert_eq!(store.source, "BOT");
        assert_eq!(store.extra.get("note"), Some(&Value::from("keep me")));
        assert!(!store.extra.contains_key("source"));
    }

    #[test]
    fn test_same_day_overwrites() {
        let mut store = HistoryStore::new("TWD", "BOT");

        let first = store.insert_snapshot(&stamp("2025-10-09", "09:00:00"), snapshot("32.1"));
        let second = store.insert_snapshot(&stamp("2025-10-09", "16:00:00"), snapshot("32.2"));

        assert_eq!(first, InsertOutcome { replaced: false, total_dates: 1 });
        assert_eq!(second, InsertOutcome { replaced: true, total_dates: 1 });
        assert_eq!(store.history["2025-10-09"], HistoryEntry::Snapshot(snapshot("32.2")));
        assert_eq!(store.last_updated_taipei, "2025-10-09T16:00:00.000000+08:00");
    }

    #[test]
    fn test_next_day_appends() {
        let mut store = HistoryStore::new("TWD", "BOT");
        store.insert_snapshot(&stamp("2025-10-09", "09:00:00"), snapshot("32.1"));
        let outcome = store.insert_snapshot(&stamp("2025-10-10", "09:00:00"), snapshot("32.3"));

        assert_eq!(outcome.total_dates, 2);
        assert_eq!(store.latest().map(|(d, _)| d.as_str()), Some("2025-10-10"));
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let mut store = HistoryStore::new("TWD", "Bank of Taiwan (BOT)");
        store.extra.insert("comment".to_string(), Value::from("台灣銀行"));
        store.insert_snapshot(&stamp("2025-10-09", "09:00:00"), snapshot("32.205"));

        store.save_to_file(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"即期買入\": \"32.205\""));
        assert!(text.contains("台灣銀行"));
        assert!(text.starts_with("{\n    \"base_currency\": \"TWD\",\n    \"source\""));
        assert!(!temp_path(&path).exists());

        let (loaded, state) = HistoryStore::load_or_default(&path, "TWD", "BOT");
        assert_eq!(state, LoadState::Loaded);
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(temp_path(Path::new("data/history.json")), PathBuf::from("data/history.json.tmp"));
        assert_eq!(temp_path(Path::new("data/rates.tmp")), PathBuf::from("data/rates.tmp.tmp"));
    }

    #[test]
    fn test_save_to_tmp_named_target() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rates.tmp");
        let mut store = HistoryStore::new("TWD", "BOT");
        store.insert_snapshot(&stamp("2025-10-09", "09:00:00"), snapshot("32.205"));

        store.save_to_file(&path).unwrap();

        assert_eq!(HistoryStore::load_from_file(&path).unwrap(), store);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_record_list_entry_survives_merge() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let legacy = serde_json::json!([
            { "currency_code": "USD", "buy": "32.1", "sell": "32.2" },
            { "currency_code": "JPY", "buy": "0.207", "sell": "0.211" }
        ]);
        let file = serde_json::json!({
            "base_currency": "TWD",
            "source": "BOT",
            "last_updated_taipei": "2025-10-08T09:00:00.000000+08:00",
            "history": {
                "2025-10-07": { "USD": { "即期買入": "32.0", "即期賣出": "32.1" } },
                "2025-10-08": legacy.clone()
            }
        });
        fs::write(&path, file.to_string()).unwrap();

        let (mut store, state) = HistoryStore::load_or_default(&path, "TWD", "BOT");
        assert_eq!(state, LoadState::Loaded);
        let outcome = store.insert_snapshot(&stamp("2025-10-09", "09:00:00"), snapshot("32.3"));
        store.save_to_file(&path).unwrap();

        assert_eq!(outcome.total_dates, 3);
        let reloaded = HistoryStore::load_from_file(&path).unwrap();
        assert_eq!(reloaded.history.keys().collect::<Vec<_>>(), vec!["2025-10-07", "2025-10-08", "2025-10-09"]);
        assert_eq!(reloaded.history["2025-10-08"], HistoryEntry::Raw(legacy));
        assert_eq!(reloaded.history["2025-10-08"].currency_count(), 2);
        assert!(reloaded.history["2025-10-07"].as_snapshot().is_some());
    }

    #[test]
    fn test_null_price_entry_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let odd_day = serde_json::json!({ "USD": { "即期買入": null, "即期賣出": "32.2" } });
        let file = serde_json::json!({ "history": { "2025-10-08": odd_day.clone() } });
        fs::write(&path, file.to_string()).unwrap();

        let (store, state) = HistoryStore::load_or_default(&path, "TWD", "BOT");

        assert_eq!(state, LoadState::Loaded);
        assert_eq!(store.history["2025-10-08"], HistoryEntry::Raw(odd_day));
        assert_eq!(store.base_currency, "TWD");
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("data");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let store = HistoryStore::new("TWD", "BOT");
        let result = store.save_to_file(&blocker.join("history.json"));

        assert!(matches!(result, Err(RateHubError::StoreWriteError { .. })));
    }
}
