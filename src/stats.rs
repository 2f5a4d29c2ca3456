use std::fmt::Display;

use crate::{amount::Amount, table::View};

/// Printed in place of figures when a selection has no sales amounts.
pub const NO_DATA: &str = "No data matches your selection. Please try different filters.";

/// Summary statistics of the sales amounts in a [`View`].
///
/// Missing amounts are left out of every figure. `std_dev` and `variance` use
/// the sample (n - 1) convention, so they are `None` when there is only one
/// amount.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Statistics {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: Option<f64>,
    pub variance: Option<f64>,
}

impl Statistics {
    /// Computes statistics over the non-missing amounts in `view`.
    ///
    /// Returns `None` if the view is empty or every amount is missing.
    #[must_use]
    pub fn from_view(view: &View) -> Option<Self> {
        let mut values: Vec<f64> = view.amounts().collect();
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        values.sort_by(f64::total_cmp);
        let count = values.len();
        let (min, max) = (values[0], values[count - 1]);
        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        // Rounding in the sum can push the mean a hair outside the range.
        let mean = (sum / n).clamp(min, max);
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };
        let variance = (count > 1)
            .then(|| values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0));
        Some(Self {
            count,
            sum,
            mean,
            median,
            min,
            max,
            std_dev: variance.map(f64::sqrt),
            variance,
        })
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| Amount::from(v).to_string())
}

impl Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total Sales: {}", Amount::from(self.sum))?;
        writeln!(f, "Average Sales: {}", Amount::from(self.mean))?;
        writeln!(f, "Median Sales: {}", Amount::from(self.median))?;
        writeln!(f, "Minimum Sales: {}", Amount::from(self.min))?;
        writeln!(f, "Maximum Sales: {}", Amount::from(self.max))?;
        writeln!(f, "Standard Deviation: {}", optional(self.std_dev))?;
        writeln!(f, "Variance: {}", optional(self.variance))?;
        Ok(())
    }
}

/// Returns a printable statistics report for `view`, headed with `label`.
///
/// If the view has no amounts, the report says so instead of giving figures.
///
/// # Examples
///
/// ```
/// # use retail_sales::{report_statistics, SalesTable, Selection};
/// let csv = "sales_month,kind_of_business,sales\n2023-01-01,Furniture,100\n";
/// let table = SalesTable::from_reader(csv.as_bytes()).unwrap();
/// let report = report_statistics(&table.view(&Selection::default()), "Furniture");
/// assert!(report.starts_with("Statistics for Furniture:\nTotal Sales: 100.00\n"));
/// ```
#[must_use]
pub fn report_statistics(view: &View, label: &str) -> String {
    let mut report = format!("Statistics for {label}:\n");
    match Statistics::from_view(view) {
        Some(stats) => report.push_str(&stats.to_string()),
        None => {
            report.push_str(NO_DATA);
            report.push('\n');
        }
    }
    report
}
