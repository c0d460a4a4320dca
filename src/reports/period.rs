use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::db::DateWindow;

/// Reporting period for category reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Mtd,     // Month-to-date
    Qtd,     // Quarter-to-date
    Ytd,     // Year-to-date
    OneYear, // Last 365 days
    AllTime,
    Custom { from: NaiveDate, to: NaiveDate },
}

impl Period {
    /// Resolve to an inclusive window ending `today`; `AllTime` has none.
    pub fn window(&self, today: NaiveDate) -> Result<Option<DateWindow>> {
        let start = match *self {
            Period::Mtd => NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                .ok_or_else(|| anyhow!("Invalid current month"))?,
            Period::Qtd => {
                let quarter_start_month = ((today.month() - 1) / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(today.year(), quarter_start_month, 1)
                    .ok_or_else(|| anyhow!("Invalid quarter start"))?
            }
            Period::Ytd => NaiveDate::from_ymd_opt(today.year(), 1, 1)
                .ok_or_else(|| anyhow!("Invalid year start"))?,
            Period::OneYear => today
                .checked_sub_days(chrono::Days::new(365))
                .ok_or_else(|| anyhow!("Failed to compute one-year start"))?,
            Period::AllTime => return Ok(None),
            Period::Custom { from, to } => {
                return DateWindow::new(from, to)
                    .map(Some)
                    .ok_or_else(|| anyhow!("Custom period 'from' must be <= 'to'"));
            }
        };

        Ok(DateWindow::new(start, today))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Mtd => f.write_str("MTD"),
            Period::Qtd => f.write_str("QTD"),
            Period::Ytd => f.write_str("YTD"),
            Period::OneYear => f.write_str("1Y"),
            Period::AllTime => f.write_str("ALL"),
            Period::Custom { from, to } => write!(f, "{}:{}", from, to),
        }
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MTD" => Ok(Period::Mtd),
            "QTD" => Ok(Period::Qtd),
            "YTD" => Ok(Period::Ytd),
            "1Y" | "ONE_YEAR" => Ok(Period::OneYear),
            "ALL" | "ALL_TIME" => Ok(Period::AllTime),
            custom => {
                let (from, to) = custom
                    .split_once(':')
                    .ok_or_else(|| anyhow!("Unknown period '{}' (use MTD|QTD|YTD|1Y|ALL|from:to)", s))?;
                let from = NaiveDate::parse_from_str(from, "%Y-%m-%d")
                    .map_err(|e| anyhow!("Invalid period start '{}': {}", from, e))?;
                let to = NaiveDate::parse_from_str(to, "%Y-%m-%d")
                    .map_err(|e| anyhow!("Invalid period end '{}': {}", to, e))?;
                if from > to {
                    bail!("Custom period 'from' must be <= 'to'");
                }
                Ok(Period::Custom { from, to })
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
    fn test_parse_named_periods() {
        assert_eq!("mtd".parse::<Period>().unwrap(), Period::Mtd);
        assert_eq!("1y".parse::<Period>().unwrap(), Period::OneYear);
        assert_eq!("ALL".parse::<Period>().unwrap(), Period::AllTime);
        assert!("weekly".parse::<Period>().is_err());
    }

    #[test]
    fn test_parse_custom_range() {
        let period = "2025-01-01:2025-03-31".parse::<Period>().unwrap();
        assert_eq!(
            period,
            Period::Custom {
                from: date(2025, 1, 1),
                to: date(2025, 3, 31)
            }
        );
        assert!("2025-03-31:2025-01-01".parse::<Period>().is_err());
    }

    #[test]
    fn test_quarter_window() {
        let window = Period::Qtd.window(date(2025, 8, 14)).unwrap().unwrap();
        assert_eq!(window.start, date(2025, 7, 1));
        assert_eq!(window.end, date(2025, 8, 14));
    }

    #[test]
    fn test_all_time_has_no_window() {
        assert!(Period::AllTime.window(date(2025, 8, 14)).unwrap().is_none());
    }
}
