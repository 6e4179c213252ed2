// 公开导出的模块，供外部使用
pub mod models;
pub mod store;
pub mod errors;

// 主程序使用的模块
#[doc(hidden)]
pub mod scrapers;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod services;
#[doc(hidden)]
pub mod logging;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use models::rate::{DailySnapshot, Price, Quote, RateRecord, RateTable};
pub use store::{HistoryEntry, HistoryStore};
pub use errors::{Result, RateHubError};
