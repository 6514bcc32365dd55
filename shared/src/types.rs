//! Common types used across the back office

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DomainError, DomainResult};

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Current wall clock as epoch milliseconds (UTC).
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebResponse<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<PageMetadata>,
}

impl<T> WebResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data, paging: None }
    }

    pub fn paged(data: T, paging: PageMetadata) -> Self {
        Self {
            data,
            paging: Some(paging),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub page: u32,
    pub size: u32,
    pub total_item: u64,
    pub total_page: u64,
}

impl PageMetadata {
    pub fn new(page: &PageRequest, total_item: u64) -> Self {
        let size = page.size() as u64;
        Self {
            page: page.page(),
            size: page.size(),
            total_item,
            total_page: total_item.div_ceil(size),
        }
    }
}

/// Pagination parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageRequest {
    pub const DEFAULT_SIZE: u32 = 10;
    pub const MAX_SIZE: u32 = 100;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn size(&self) -> u32 {
        self.size
            .unwrap_or(Self::DEFAULT_SIZE)
            .clamp(1, Self::MAX_SIZE)
    }

    pub fn limit(&self) -> i64 {
        self.size() as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.size() as i64
    }
}

/// A date carried as epoch milliseconds.
///
/// Deserializes from either a `"YYYY-MM-DD"` string (midnight UTC) or a numeric
/// millisecond epoch, and always serializes as the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UnixDate(pub i64);

impl UnixDate {
    pub fn millis(&self) -> i64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for UnixDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Ok(UnixDate(ms)),
            Raw::Text(text) => parse_date_start(&text)
                .map(UnixDate)
                .map_err(serde::de::Error::custom),
        }
    }
}

fn parse_date(value: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        DomainError::Validation(format!("invalid date '{}', expected YYYY-MM-DD", value))
    })
}

/// `YYYY-MM-DD` at 00:00:00 UTC, in epoch milliseconds.
pub fn parse_date_start(value: &str) -> DomainResult<i64> {
    let date = parse_date(value)?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)).timestamp_millis())
}

/// `YYYY-MM-DD` at 23:59:59 UTC, in epoch milliseconds.
pub fn parse_date_end(value: &str) -> DomainResult<i64> {
    let date = parse_date(value)?;
    let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    Ok(Utc.from_utc_datetime(&date.and_time(end)).timestamp_millis())
}

/// Optional `start_at` / `end_at` query bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRangeQuery {
    pub start_at: Option<String>,
    pub end_at: Option<String>,
}

impl DateRangeQuery {
    /// Resolve to inclusive millisecond bounds.
    pub fn bounds(&self) -> DomainResult<(Option<i64>, Option<i64>)> {
        let start = self.start_at.as_deref().map(parse_date_start).transpose()?;
        let end = self.end_at.as_deref().map(parse_date_end).transpose()?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(DomainError::Validation(
                    "start_at must not be after end_at".to_string(),
                ));
            }
        }
        Ok((start, end))
    }
}
