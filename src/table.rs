use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use std::{collections::HashSet, io::Read, path::Path};

use crate::{amount::Amount, period::Period};

/// Defines the CSV format for sales data.
///
/// Columns not named here (such as `reason_for_null`) are ignored. An empty
/// `sales` field is read as a missing amount.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Record {
    #[serde(rename = "sales_month")]
    pub period: Period,
    #[serde(rename = "kind_of_business")]
    pub category: String,
    #[serde(default)]
    pub naics_code: String,
    #[serde(rename = "sales")]
    pub amount: Option<Amount>,
}

/// Holds every sales record, in file order.
///
/// To load a table, use [`SalesTable::read_csv`] or
/// [`SalesTable::from_reader`]. To select a subset of it, use
/// [`SalesTable::view`].
#[derive(Debug, Default)]
pub struct SalesTable {
    records: Vec<Record>,
}

impl SalesTable {
    /// Reads sales data from the CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns any errors from opening or parsing the file, including rows
    /// with an invalid `sales_month` or a non-numeric `sales` value.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let table = Self::from_csv(rdr).with_context(|| format!("reading {}", path.display()))?;
        info!(path = %path.display(), records = table.len(), "loaded sales table");
        Ok(table)
    }

    /// Reads sales data in CSV format from `reader`.
    ///
    /// # Errors
    ///
    /// Returns any errors from parsing the data.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self::from_csv(rdr)
    }

    fn from_csv<R: Read>(mut rdr: csv::Reader<R>) -> Result<Self> {
        let mut records = Vec::new();
        for (row, result) in rdr.deserialize().enumerate() {
            // Row 1 is the header.
            let record: Record = result.with_context(|| format!("row {}", row + 2))?;
            records.push(record);
        }
        Ok(Self { records })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the distinct categories, in the order they first appear.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Returns the earliest and latest periods in the table, if it has any
    /// records.
    #[must_use]
    pub fn period_range(&self) -> Option<(Period, Period)> {
        let first = self.records.iter().map(|r| r.period).min()?;
        let last = self.records.iter().map(|r| r.period).max()?;
        Some((first, last))
    }

    /// Returns the records matching `selection`, in table order.
    #[must_use]
    pub fn view(&self, selection: &Selection) -> View<'_> {
        let view: View = self.records.iter().filter(|r| selection.matches(r)).collect();
        debug!(rows = view.len(), ?selection, "selected view");
        view
    }
}

impl FromIterator<Record> for SalesTable {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Which categories a [`Selection`] includes.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CategorySet {
    #[default]
    All,
    Only(Vec<String>),
}

impl CategorySet {
    #[must_use]
    pub fn contains(&self, category: &str) -> bool {
        match self {
            CategorySet::All => true,
            CategorySet::Only(names) => names.iter().any(|n| n == category),
        }
    }
}

/// A category filter plus an inclusive period range.
///
/// A missing `start` or `end` leaves that side of the range open, which is
/// the same as using the table's earliest or latest period.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    pub categories: CategorySet,
    pub start: Option<Period>,
    pub end: Option<Period>,
}

impl Selection {
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.categories.contains(&record.category)
            && self.start.is_none_or(|start| record.period >= start)
            && self.end.is_none_or(|end| record.period <= end)
    }
}

/// A read-only subset of a [`SalesTable`].
#[derive(Clone, Debug, Default)]
pub struct View<'a> {
    records: Vec<&'a Record>,
}

impl<'a> View<'a> {
    #[must_use]
    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the non-missing amounts, in view order.
    pub fn amounts(&self) -> impl Iterator<Item = f64> + '_ {
        self.records
            .iter()
            .filter_map(|r| r.amount)
            .map(Amount::value)
    }

    /// Returns true if the view has at least one non-missing amount.
    #[must_use]
    pub fn has_amounts(&self) -> bool {
        self.records.iter().any(|r| r.amount.is_some())
    }

    /// Narrows the view to the records for a single category.
    #[must_use]
    pub fn only(&self, category: &str) -> View<'a> {
        self.records
            .iter()
            .copied()
            .filter(|r| r.category == category)
            .collect()
    }
}

impl<'a> FromIterator<&'a Record> for View<'a> {
    fn from_iter<T: IntoIterator<Item = &'a Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
pub(crate) fn record(category: &str, period: &str, amount: Option<f64>) -> Record {
    Record {
        period: period.parse().unwrap(),
        category: category.to_string(),
        naics_code: String::new(),
        amount: amount.map(Amount::from),
    }
}
