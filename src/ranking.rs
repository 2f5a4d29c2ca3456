use tracing::debug;

use std::{
    collections::{BTreeMap, HashSet},
    fmt::Display,
};

use crate::{
    amount::Amount,
    period::Period,
    stats::NO_DATA,
    table::{Record, View},
};

/// Holds the sales figures for one category in a [`Ranking`].
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryRank {
    pub category: String,
    /// Period of the first record with the highest amount.
    pub best_period: Period,
    /// Period of the first record with the lowest amount.
    pub worst_period: Period,
    pub total: f64,
    /// Number of records, including those with a missing amount.
    pub records: usize,
    /// Number of distinct calendar months covered by the records.
    pub distinct_months: usize,
}

impl CategoryRank {
    /// Returns the total scaled to a 12-month span.
    ///
    /// The scale is the number of distinct months present, not the calendar
    /// years they fall in: 400.00 over two months gives 2,400.00.
    #[must_use]
    pub fn average_annual_total(&self) -> f64 {
        if self.distinct_months == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let years = self.distinct_months as f64 / 12.0;
        self.total / years
    }

    /// Returns the total divided by the number of records.
    #[must_use]
    pub fn average_period_total(&self) -> f64 {
        if self.records == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let records = self.records as f64;
        self.total / records
    }
}

impl Display for CategoryRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: Best Period: {}, Worst Period: {}, Total Sales: {}, \
             Average Annual Sales: {}, Average Period Sales: {}",
            self.category,
            self.best_period,
            self.worst_period,
            Amount::from(self.total),
            Amount::from(self.average_annual_total()),
            Amount::from(self.average_period_total()),
        )
    }
}

#[derive(Default)]
struct Group {
    total: Amount,
    records: usize,
    months: HashSet<(i32, u32)>,
    best: Option<(Amount, Period)>,
    worst: Option<(Amount, Period)>,
}

impl Group {
    fn add(&mut self, record: &Record) {
        self.records += 1;
        self.months.insert(record.period.month());
        let Some(amount) = record.amount else {
            return;
        };
        self.total += amount;
        // Strict comparisons, so the first record wins a tie.
        if self.best.is_none_or(|(best, _)| amount > best) {
            self.best = Some((amount, record.period));
        }
        if self.worst.is_none_or(|(worst, _)| amount < worst) {
            self.worst = Some((amount, record.period));
        }
    }

    fn rank(self, category: &str) -> Option<CategoryRank> {
        let (_, best_period) = self.best?;
        let (_, worst_period) = self.worst?;
        Some(CategoryRank {
            category: category.to_string(),
            best_period,
            worst_period,
            total: self.total.value(),
            records: self.records,
            distinct_months: self.months.len(),
        })
    }
}

/// Categories ordered by total sales, descending.
///
/// Categories with equal totals are ordered alphabetically. Categories whose
/// records all have missing amounts have no best or worst period, so they are
/// listed separately by [`Ranking::unranked`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ranking {
    ranked: Vec<CategoryRank>,
    unranked: Vec<String>,
}

impl Ranking {
    #[must_use]
    pub fn from_view(view: &View) -> Self {
        let mut groups: BTreeMap<&str, Group> = BTreeMap::new();
        for record in view.records() {
            groups.entry(record.category.as_str()).or_default().add(record);
        }
        let mut ranking = Self::default();
        for (category, group) in groups {
            match group.rank(category) {
                Some(rank) => ranking.ranked.push(rank),
                None => ranking.unranked.push(category.to_string()),
            }
        }
        // Stable, so alphabetical order survives among equal totals.
        ranking.ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
        debug!(
            ranked = ranking.ranked.len(),
            unranked = ranking.unranked.len(),
            "ranked categories"
        );
        ranking
    }

    #[must_use]
    pub fn ranked(&self) -> &[CategoryRank] {
        &self.ranked
    }

    /// Returns the categories present in the view with no amounts at all.
    #[must_use]
    pub fn unranked(&self) -> &[String] {
        &self.unranked
    }
}

/// Returns a printable ranking of the categories in `view` by total sales.
///
/// Each line gives a category's best and worst periods, its total, its
/// annualised total and its average per record. If the view has no amounts,
/// the report says so instead.
///
/// # Examples
///
/// ```
/// # use retail_sales::{report_ranking, SalesTable, Selection};
/// let csv = "sales_month,kind_of_business,sales\n\
///            2023-01-01,Furniture,100\n\
///            2023-01-01,Electronics,500\n";
/// let table = SalesTable::from_reader(csv.as_bytes()).unwrap();
/// let report = report_ranking(&table.view(&Selection::default()));
/// let lines: Vec<_> = report.lines().collect();
/// assert!(lines[1].starts_with("Electronics: "));
/// assert!(lines[2].starts_with("Furniture: "));
/// ```
#[must_use]
pub fn report_ranking(view: &View) -> String {
    let mut report = String::from("Sales Ranking by Total Sales:\n");
    if !view.has_amounts() {
        report.push_str(NO_DATA);
        report.push('\n');
        return report;
    }
    let ranking = Ranking::from_view(view);
    for rank in ranking.ranked() {
        report.push_str(&format!("{rank}\n"));
    }
    for category in ranking.unranked() {
        report.push_str(&format!("{category}: no sales figures in the selected period\n"));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        stats::Statistics,
        table::{record, Record},
    };

    fn view(records: &[Record]) -> View<'_> {
        records.iter().collect()
    }

    fn example() -> Vec<Record> {
        vec![
            record("Furniture", "2023-01-01", Some(100.0)),
            record("Furniture", "2023-02-01", Some(300.0)),
            record("Electronics", "2023-01-01", Some(500.0)),
        ]
    }

    #[test]
    fn from_view_fn_ranks_categories_by_total() {
        let records = example();
        let ranking = Ranking::from_view(&view(&records));
        let ranked = ranking.ranked();
        assert_eq!(ranked.len(), 2);

        assert_eq!(ranked[0].category, "Electronics");
        assert_eq!(ranked[0].total, 500.0);
        assert_eq!(ranked[0].best_period.to_string(), "2023-01-01");
        assert_eq!(ranked[0].worst_period.to_string(), "2023-01-01");

        let furniture = &ranked[1];
        assert_eq!(furniture.category, "Furniture");
        assert_eq!(furniture.total, 400.0);
        assert_eq!(furniture.best_period.to_string(), "2023-02-01");
        assert_eq!(furniture.worst_period.to_string(), "2023-01-01");
        assert_eq!(furniture.distinct_months, 2);
        assert_eq!(furniture.average_annual_total(), 2_400.0);
        assert_eq!(furniture.average_period_total(), 200.0);
    }

    #[test]
    fn from_view_fn_breaks_total_ties_alphabetically() {
        let records = vec![
            record("Zoos", "2023-01-01", Some(10.0)),
            record("Bakeries", "2023-01-01", Some(10.0)),
            record("Music", "2023-01-01", Some(20.0)),
        ];
        let ranking = Ranking::from_view(&view(&records));
        let names: Vec<_> = ranking.ranked().iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["Music", "Bakeries", "Zoos"]);
    }

    #[test]
    fn from_view_fn_keeps_first_period_on_amount_ties() {
        let records = vec![
            record("A", "2023-03-01", Some(50.0)),
            record("A", "2023-01-01", Some(90.0)),
            record("A", "2023-02-01", Some(50.0)),
            record("A", "2023-04-01", Some(90.0)),
        ];
        let ranking = Ranking::from_view(&view(&records));
        let rank = &ranking.ranked()[0];
        assert_eq!(rank.best_period.to_string(), "2023-01-01");
        assert_eq!(rank.worst_period.to_string(), "2023-03-01");
    }

    #[test]
    fn from_view_fn_counts_distinct_months_not_days() {
        let records = vec![
            record("A", "2023-01-01", Some(10.0)),
            record("A", "2023-01-15", Some(20.0)),
            record("A", "2024-01-01", Some(30.0)),
        ];
        let ranking = Ranking::from_view(&view(&records));
        let rank = &ranking.ranked()[0];
        assert_eq!(rank.distinct_months, 2);
        assert_eq!(rank.records, 3);
        assert_eq!(rank.average_annual_total(), 360.0);
    }

    #[test]
    fn from_view_fn_counts_missing_amounts_as_records() {
        let records = vec![
            record("A", "2023-01-01", Some(300.0)),
            record("A", "2023-02-01", None),
            record("A", "2023-03-01", Some(300.0)),
        ];
        let ranking = Ranking::from_view(&view(&records));
        let rank = &ranking.ranked()[0];
        assert_eq!(rank.total, 600.0);
        assert_eq!(rank.records, 3);
        assert_eq!(rank.distinct_months, 3);
        assert_eq!(rank.average_period_total(), 200.0);
        assert!((rank.average_period_total() * rank.records as f64 - rank.total).abs() < 1e-9);
    }

    #[test]
    fn from_view_fn_separates_categories_without_amounts() {
        let records = vec![
            record("Jewelry", "2023-01-01", None),
            record("Furniture", "2023-01-01", Some(5.0)),
        ];
        let ranking = Ranking::from_view(&view(&records));
        assert_eq!(ranking.ranked().len(), 1);
        assert_eq!(ranking.unranked(), ["Jewelry".to_string()]);
    }

    #[test]
    fn report_ranking_fn_prints_one_line_per_category() {
        let records = example();
        assert_eq!(
            report_ranking(&view(&records)),
            "Sales Ranking by Total Sales:\n\
             Electronics: Best Period: 2023-01-01, Worst Period: 2023-01-01, \
             Total Sales: 500.00, Average Annual Sales: 6,000.00, Average Period Sales: 500.00\n\
             Furniture: Best Period: 2023-02-01, Worst Period: 2023-01-01, \
             Total Sales: 400.00, Average Annual Sales: 2,400.00, Average Period Sales: 200.00\n"
        );
    }

    #[test]
    fn report_ranking_fn_notes_categories_without_amounts() {
        let records = vec![
            record("Jewelry", "2023-01-01", None),
            record("Furniture", "2023-01-01", Some(5.0)),
        ];
        let report = report_ranking(&view(&records));
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Furniture: Best Period"));
        assert_eq!(lines[2], "Jewelry: no sales figures in the selected period");
    }

    #[test]
    fn report_ranking_fn_prints_notice_without_amounts() {
        let expected = format!("Sales Ranking by Total Sales:\n{NO_DATA}\n");
        assert_eq!(report_ranking(&View::default()), expected);
        let records = vec![record("A", "2023-01-01", None)];
        assert_eq!(report_ranking(&view(&records)), expected);
    }

    #[test]
    fn ranking_is_non_increasing_in_total() {
        let table = crate::SalesTable::read_csv("testdata/retail.csv").unwrap();
        let all = table.view(&crate::Selection::default());
        let ranking = Ranking::from_view(&all);
        assert!(ranking
            .ranked()
            .windows(2)
            .all(|pair| pair[0].total >= pair[1].total));
        assert_eq!(ranking.unranked(), ["Jewelry stores".to_string()]);
    }

    #[test]
    fn single_category_total_matches_statistics_sum() {
        let table = crate::SalesTable::read_csv("testdata/retail.csv").unwrap();
        let all = table.view(&crate::Selection::default());
        let electronics = all.only("Electronics stores");
        let ranking = Ranking::from_view(&electronics);
        assert_eq!(ranking.ranked().len(), 1);
        let stats = Statistics::from_view(&electronics).unwrap();
        assert_eq!(ranking.ranked()[0].total, stats.sum);
        assert_eq!(stats.sum, 22_280.0);
    }
}
