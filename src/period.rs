use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use serde_with::DeserializeFromStr;

use std::{fmt::Display, str::FromStr};

/// The calendar month a sales figure belongs to.
///
/// A `Period` keeps the full date it was read from, but compares by date and
/// groups by month: see [`Period::month`].
///
/// Parses from `YYYY-MM-DD`, or from `YYYY-MM` (meaning the first of that
/// month), and displays as `YYYY-MM-DD`.
///
/// ```
/// # use retail_sales::Period;
/// let p: Period = "2023-02".parse().unwrap();
/// assert_eq!(p.to_string(), "2023-02-01");
/// assert_eq!(p.month(), (2023, 2));
/// ```
#[derive(Clone, Copy, Debug, DeserializeFromStr, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Period(NaiveDate);

impl Period {
    /// Returns the `(year, month)` bucket this period falls in.
    #[must_use]
    pub fn month(self) -> (i32, u32) {
        (self.0.year(), self.0.month())
    }

    #[must_use]
    pub fn date(self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for Period {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0.format("%Y-%m-%d").to_string())
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
            .with_context(|| format!("invalid date {s:?} (expected YYYY-MM-DD or YYYY-MM)"))?;
        Ok(Self(date))
    }
}
