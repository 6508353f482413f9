use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Trailing window used when no explicit date range is given.
pub const DEFAULT_HISTORY_DAYS: u32 = 21;

/// Daily history rows for one symbol, in the order the backend sent them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StockHistory {
    pub history: Vec<serde_json::Value>,
}

/// Caller-supplied history filters. Either half may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub days: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// The filter actually sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    TrailingDays(u32),
    Between { start: NaiveDate, end: NaiveDate },
}

impl HistoryQuery {
    pub fn trailing(days: u32) -> Self {
        Self {
            days: Some(days),
            ..Self::default()
        }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            days: None,
            start_date: Some(start),
            end_date: Some(end),
        }
    }

    /// A complete date range wins over a day count.
    pub fn resolve(&self) -> HistoryRange {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => HistoryRange::Between { start, end },
            _ => HistoryRange::TrailingDays(self.days.unwrap_or(DEFAULT_HISTORY_DAYS)),
        }
    }
}

impl HistoryRange {
    pub fn query_params(&self) -> Vec<(String, String)> {
        match self {
            Self::TrailingDays(days) => vec![("days".to_string(), days.to_string())],
            Self::Between { start, end } => vec![
                ("start_date".to_string(), start.format("%Y-%m-%d").to_string()),
                ("end_date".to_string(), end.format("%Y-%m-%d").to_string()),
            ],
        }
    }

    /// Suffix distinguishing this range in the cache key.
    pub fn cache_tag(&self) -> String {
        match self {
            Self::TrailingDays(days) => format!("{days}d"),
            Self::Between { start, end } => {
                format!("{}_{}", start.format("%Y%m%d"), end.format("%Y%m%d"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_takes_priority_over_days() {
        let query = HistoryQuery {
            days: Some(90),
            start_date: Some(date(2024, 1, 1)),
            end_date: Some(date(2024, 2, 1)),
        };
        let range = query.resolve();
        assert_eq!(
            range,
            HistoryRange::Between {
                start: date(2024, 1, 1),
                end: date(2024, 2, 1)
            }
        );
        assert_eq!(
            range.query_params(),
            vec![
                ("start_date".to_string(), "2024-01-01".to_string()),
                ("end_date".to_string(), "2024-02-01".to_string()),
            ]
        );
    }

    #[test]
    fn half_open_range_falls_back_to_days() {
        let query = HistoryQuery {
            days: Some(10),
            start_date: Some(date(2024, 1, 1)),
            end_date: None,
        };
        assert_eq!(query.resolve(), HistoryRange::TrailingDays(10));
    }

    #[test]
    fn default_window() {
        assert_eq!(
            HistoryQuery::default().resolve(),
            HistoryRange::TrailingDays(DEFAULT_HISTORY_DAYS)
        );
        assert_eq!(HistoryQuery::trailing(5).resolve().cache_tag(), "5d");
    }

    #[test]
    fn range_cache_tag() {
        let range = HistoryQuery::between(date(2024, 3, 1), date(2024, 3, 20)).resolve();
        assert_eq!(range.cache_tag(), "20240301_20240320");
    }
}
