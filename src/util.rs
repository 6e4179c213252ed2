use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::Serialize;
use crate::errors::Result;

/// 台北时区，固定 UTC+8，无夏令时
pub fn taipei_offset() -> Result<FixedOffset> {
    Ok("+08:00".parse::<FixedOffset>()?)
}

/// One run's date key and timestamp, both taken from the same instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    /// Taipei calendar date, `YYYY-MM-DD`
    pub date_key: String,
    /// RFC 3339 with microseconds and `+08:00` offset
    pub timestamp: String,
}

impl RunStamp {
    pub fn from_utc(now: DateTime<Utc>) -> Result<Self> {
        let taipei = now.with_timezone(&taipei_offset()?);
        Ok(Self {
            date_key: taipei.format("%Y-%m-%d").to_string(),
            timestamp: taipei.to_rfc3339_opts(SecondsFormat::Micros, false),
        })
    }

    pub fn now() -> Result<Self> {
        Self::from_utc(Utc::now())
    }
}

// 四空格缩进，非 ASCII 字符原样输出
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| e.to_string().into())
}

/// Cut `text` to at most `limit` characters without splitting a code point.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
