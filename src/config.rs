pub const SOURCE_URL: &str = "https://rate.bot.com.tw/xrt?Lang=zh-TW";
pub const SOURCE_NAME: &str = "Bank of Taiwan (BOT)";
pub const BASE_CURRENCY: &str = "TWD";
pub const OUTPUT_FILE: &str = "data/history.json";
pub const LOG_FILE: &str = "logs/twd_rate_history.log";

pub struct Config {
    pub source_url: String,
    pub source_name: String,
    pub base_currency: String,
    pub output_file: String,
    pub log_file: String,
    pub request_timeout_secs: u64,
    pub preview_chars: usize,
}

impl Config {
    pub fn new() -> Self {
        Self {
            source_url: SOURCE_URL.to_string(),
            source_name: SOURCE_NAME.to_string(),
            base_currency: BASE_CURRENCY.to_string(),
            output_file: OUTPUT_FILE.to_string(),
            log_file: LOG_FILE.to_string(),
            request_timeout_secs: 30,
            preview_chars: 500,
        }
    }

    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = url.to_string();
        self
    }

    pub fn with_output_file(mut self, path: &str) -> Self {
        self.output_file = path.to_string();
        self
    }

    pub fn with_log_file(mut self, path: &str) -> Self {
        self.log_file = path.to_string();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
