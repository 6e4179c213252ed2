use crate::config::Config;
use crate::errors::Result;
use crate::models::rate::{DailySnapshot, Quote, RateRecord};
use crate::scrapers::base::RateScraper;
use crate::store::{HistoryStore, LoadState};
use crate::util::RunStamp;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

/// Result of one merge into the history file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub date_key: String,
    pub timestamp: String,
    pub currencies: usize,
    pub replaced: bool,
    pub total_dates: usize,
    pub load_state: LoadState,
}

/// 汇率服务：抓取当日牌告并合并进历史档案
pub struct HistoryService {
    config: Config,
    scraper: Box<dyn RateScraper + Send + Sync>,
    data_path: PathBuf,
}

impl HistoryService {
    pub fn new(config: Config, scraper: Box<dyn RateScraper + Send + Sync>) -> Self {
        let data_path = PathBuf::from(&config.output_file);
        Self {
            config,
            scraper,
            data_path,
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// 抓取失败或没有有效数据时返回 None，错误只记录不抛出
    pub async fn fetch_snapshot(&self) -> Option<DailySnapshot> {
        let table = match self.scraper.fetch_rates().await {
            Ok(table) => table,
            Err(e) => {
                error!("Error fetching or parsing rates from {}: {}", self.scraper.source_name(), e);
                return None;
            }
        };

        info!(
            "Found {} rows in the rate table, kept {} with spot quotes",
            table.rows_found, table.records.len()
        );
        if table.records.is_empty() {
            warn!("No usable rows in the rate table");
            return None;
        }

        Some(snapshot_from_records(table.records))
    }

    pub fn merge_and_persist(&self, snapshot: DailySnapshot) -> Result<MergeSummary> {
        self.merge_and_persist_at(snapshot, Utc::now())
    }

    /// Merge `snapshot` under the Taipei date of `now` and rewrite the file.
    pub fn merge_and_persist_at(&self, snapshot: DailySnapshot, now: DateTime<Utc>) -> Result<MergeSummary> {
        let stamp = RunStamp::from_utc(now)?;

        let (mut store, load_state) = HistoryStore::load_or_default(
            &self.data_path,
            &self.config.base_currency,
            &self.config.source_name,
        );

        let currencies = snapshot.len();
        let outcome = store.insert_snapshot(&stamp, snapshot);
        info!(
            "{} {} currencies for {}; history now holds {} dates",
            if outcome.replaced { "Replaced" } else { "Inserted" },
            currencies, stamp.date_key, outcome.total_dates
        );

        store.save_to_file(&self.data_path)?;

        Ok(MergeSummary {
            date_key: stamp.date_key,
            timestamp: stamp.timestamp,
            currencies,
            replaced: outcome.replaced,
            total_dates: outcome.total_dates,
            load_state,
        })
    }
}

/// 转为以币别为键的快照，重复币别以后出现者为准
pub fn snapshot_from_records(records: Vec<RateRecord>) -> DailySnapshot {
    let mut snapshot = DailySnapshot::new();
    for record in records {
        let quote = Quote::new(record.buy, record.sell);
        if snapshot.insert(record.currency_code.clone(), quote).is_some() {
            warn!("Duplicate currency {} in rate table, keeping the last row", record.currency_code);
        }
    }
    snapshot
}
