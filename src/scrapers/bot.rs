use crate::models::rate::{RateRecord, RateTable};
use crate::errors::{Result, RateHubError};
use crate::scrapers::base::RateScraper;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use log::{debug, info};

/// 台湾银行牌告汇率抓取器
pub struct BotScraper {
    client: Client,
    url: String,
    source_name: String,
}

impl BotScraper {
    pub fn new(url: &str, source_name: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(RateHubError::RequestError)?;

        Ok(Self {
            client,
            url: url.to_string(),
            source_name: source_name.to_string(),
        })
    }
}

#[async_trait]
impl RateScraper for BotScraper {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    async fn fetch_rates(&self) -> Result<RateTable> {
        info!("Fetching data from {}...", self.source_name);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RateHubError::HttpStatus(status.as_u16(), self.url.clone()));
        }

        let text = response.text().await?;
        debug!("Received {} bytes from {}", text.len(), self.url);

        parse_rate_table(&text)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|why| RateHubError::ProcessingError(format!("Invalid selector {}: {:?}", css, why)))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// 从牌告页面的第一个表格提取 (币别, 即期买入, 即期卖出)
///
/// Only the first three cells of each data row are used. The currency code
/// is the word inside the first pair of parentheses of the label, e.g.
/// `美金 (USD)` gives `USD`. Rows quoting `-` on either side are dropped.
/// The kept records follow the table's row order; `rows_found` counts every
/// data row before filtering.
pub fn parse_rate_table(html: &str) -> Result<RateTable> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let body_row_selector = selector("tbody > tr")?;
    let row_selector = selector("tr")?;
    let td_selector = selector("td")?;
    let code_pattern = Regex::new(r"\((\w+)\)")
        .map_err(|e| RateHubError::ProcessingError(e.to_string()))?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| RateHubError::ProcessingError("No table found in page".to_string()))?;

    let mut rows: Vec<ElementRef> = table.select(&body_row_selector).collect();
    if rows.is_empty() {
        rows = table.select(&row_selector).collect();
    }

    let mut table_out = RateTable::default();
    for row in rows {
        let cells: Vec<String> = row.select(&td_selector).take(3).map(|td| cell_text(&td)).collect();

        // 表头行没有 td
        if cells.is_empty() {
            continue;
        }
        if cells.len() < 3 {
            return Err(RateHubError::ProcessingError(format!(
                "Expected at least 3 columns, found {} in row {:?}", cells.len(), cells
            )));
        }
        table_out.rows_found += 1;

        let code = code_pattern
            .captures(&cells[0])
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| RateHubError::ProcessingError(format!(
                "No currency code in label {:?}", cells[0]
            )))?;

        let record = RateRecord::new(code, &cells[1], &cells[2]);
        if record.is_available() {
            table_out.records.push(record);
        } else {
            debug!("Skipping {}: no spot quote", code);
        }
    }

    Ok(table_out)
}
