use anyhow::bail;
use num_format::{Locale, ToFormattedString};
use serde_with::DeserializeFromStr;

use std::{
    fmt::{Debug, Display},
    ops::AddAssign,
    str::FromStr,
};

/// Represents a sales amount.
///
/// The [`Display`] implementation formats the amount with thousands separators
/// and exactly 2 decimal places, and respects any width or alignment given in
/// the format string:
///
/// ```
/// # use retail_sales::Amount;
/// assert_eq!(Amount::from(1234567.8).to_string(), "1,234,567.80");
/// assert_eq!(format!("{:>8}", Amount::from(-12.5)), "  -12.50");
/// ```
#[derive(Clone, Copy, Default, DeserializeFromStr, PartialEq, PartialOrd)]
pub struct Amount(f64);

impl Amount {
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Debug for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.0.is_finite() {
            return f.pad(&format!("{:.2}", self.0));
        }
        // Round to whole cents first, so 0.999 carries into the integer part.
        #[allow(clippy::cast_possible_truncation)]
        let cents = (self.0 * 100.0).round() as i64;
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.unsigned_abs();
        let whole = (cents / 100).to_formatted_string(&Locale::en);
        f.pad(&format!("{sign}{whole}.{:02}", cents % 100))
    }
}

impl FromStr for Amount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let value: f64 = s.trim().replace(',', "").parse()?;
        if !value.is_finite() {
            bail!("sales amount {s:?} is not a finite number");
        }
        Ok(Self(value))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}
