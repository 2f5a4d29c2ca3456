use anyhow::{bail, Context, Result};
use tracing::warn;

use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use crate::{
    chart,
    period::Period,
    ranking::report_ranking,
    stats::report_statistics,
    table::{CategorySet, SalesTable, Selection},
};

/// Label for the statistics block when every category is selected.
pub const ALL_LABEL: &str = "All kinds of business";

pub const CHART_TITLE: &str = "Retail Sales Over Time";

/// Parses a menu answer such as `1 3 5` into a set of categories.
///
/// Numbers refer to `categories` counting from 1; a `0` anywhere selects all
/// of them. Repeated numbers are ignored.
///
/// # Errors
///
/// Returns an error if the answer is empty, or contains anything other than
/// numbers between 0 and the number of categories.
///
/// # Examples
///
/// ```
/// # use retail_sales::{parse_categories, CategorySet};
/// let cats = ["Furniture", "Electronics", "Jewelry"];
/// assert_eq!(
///     parse_categories("3 1", &cats).unwrap(),
///     CategorySet::Only(vec!["Jewelry".into(), "Furniture".into()])
/// );
/// assert_eq!(parse_categories("2 0", &cats).unwrap(), CategorySet::All);
/// assert!(parse_categories("4", &cats).is_err());
/// ```
pub fn parse_categories(answer: &str, categories: &[&str]) -> Result<CategorySet> {
    let mut names: Vec<String> = Vec::new();
    let mut all = false;
    for token in answer.split_whitespace() {
        let Ok(n) = token.parse::<usize>() else {
            bail!("{token:?} is not a number");
        };
        if n == 0 {
            all = true;
            continue;
        }
        let Some(name) = categories.get(n - 1) else {
            bail!("{n} is not on the list (choose 0 to {})", categories.len());
        };
        if !names.iter().any(|existing| existing == name) {
            names.push((*name).to_string());
        }
    }
    if all {
        return Ok(CategorySet::All);
    }
    if names.is_empty() {
        bail!("no kinds of business selected");
    }
    Ok(CategorySet::Only(names))
}

/// Parses an optional date bound; a blank answer means no bound.
///
/// # Errors
///
/// Returns an error if the answer is not blank and not a valid date.
pub fn parse_bound(answer: &str) -> Result<Option<Period>> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }
    Ok(Some(answer.parse()?))
}

/// Runs the interactive prompt loop over a [`SalesTable`].
///
/// The session reads answers from `input` and writes prompts and reports to
/// `output`, so it can be driven by a terminal or by a test. End of input at
/// any prompt ends the session.
pub struct Session<'t, R, W> {
    table: &'t SalesTable,
    input: R,
    output: W,
    chart: Option<PathBuf>,
}

impl<'t, R: BufRead, W: Write> Session<'t, R, W> {
    #[must_use]
    pub fn new(table: &'t SalesTable, input: R, output: W) -> Self {
        Self {
            table,
            input,
            output,
            chart: None,
        }
    }

    /// Sets the file each iteration's chart is written to.
    #[must_use]
    pub fn with_chart(mut self, path: impl Into<PathBuf>) -> Self {
        self.chart = Some(path.into());
        self
    }

    /// Prompts for selections and prints reports until the user declines to
    /// run again.
    ///
    /// # Errors
    ///
    /// Returns any errors from reading input, writing output, or writing the
    /// chart.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let Some(categories) = self.select_categories()? else {
                return Ok(());
            };
            writeln!(self.output, "\nEnter date range:")?;
            if let Some((first, last)) = self.table.period_range() {
                writeln!(self.output, "(data runs from {first} to {last})")?;
            }
            let Some(start) =
                self.ask_bound("Enter the start date (YYYY-MM-DD), or leave blank for the earliest date: ")?
            else {
                return Ok(());
            };
            let Some(end) =
                self.ask_bound("Enter the end date (YYYY-MM-DD), or leave blank for the latest date: ")?
            else {
                return Ok(());
            };
            self.report(&Selection {
                categories,
                start,
                end,
            })?;
            match self.ask("Do you want to run the program again? (yes/no): ")? {
                Some(answer) if answer.eq_ignore_ascii_case("yes") => continue,
                _ => return Ok(()),
            }
        }
    }

    /// Prints statistics, the chart location, and the ranking for
    /// `selection`.
    ///
    /// Statistics are given for each selected category, or once for the
    /// whole view if every category is selected.
    ///
    /// # Errors
    ///
    /// Returns any errors from writing output or the chart.
    pub fn report(&mut self, selection: &Selection) -> Result<()> {
        let view = self.table.view(selection);
        writeln!(self.output)?;
        match &selection.categories {
            CategorySet::All => writeln!(self.output, "{}", report_statistics(&view, ALL_LABEL))?,
            CategorySet::Only(names) => {
                for name in names {
                    writeln!(self.output, "{}", report_statistics(&view.only(name), name))?;
                }
            }
        }
        if let Some(path) = &self.chart {
            chart::write_svg(&view, CHART_TITLE, path)?;
            writeln!(self.output, "Chart written to {}\n", path.display())?;
        }
        writeln!(self.output, "{}", report_ranking(&view))?;
        Ok(())
    }

    fn select_categories(&mut self) -> Result<Option<CategorySet>> {
        let table = self.table;
        let categories = table.categories();
        loop {
            writeln!(self.output, "Select kinds of business (multiple selections allowed):")?;
            writeln!(self.output, "0. Select All")?;
            for (n, name) in categories.iter().enumerate() {
                writeln!(self.output, "{}. {name}", n + 1)?;
            }
            let Some(answer) = self.ask(
                "Enter the numbers of the kinds of business you want to select \
                 (e.g., '1 3 5' for multiple selections): ",
            )?
            else {
                return Ok(None);
            };
            match parse_categories(&answer, &categories) {
                Ok(selected) => return Ok(Some(selected)),
                Err(err) => self.reject(&answer, &err)?,
            }
        }
    }

    fn ask_bound(&mut self, prompt: &str) -> Result<Option<Option<Period>>> {
        loop {
            let Some(answer) = self.ask(prompt)? else {
                return Ok(None);
            };
            match parse_bound(&answer) {
                Ok(bound) => return Ok(Some(bound)),
                Err(err) => self.reject(&answer, &err)?,
            }
        }
    }

    fn reject(&mut self, answer: &str, err: &anyhow::Error) -> Result<()> {
        warn!(answer, error = %err, "rejected input");
        writeln!(self.output, "Sorry, {err}. Please try again.")?;
        Ok(())
    }

    /// Prints `prompt` and returns the trimmed answer, or `None` at end of
    /// input.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("reading answer")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{stats::NO_DATA, table::record};

    const CATS: [&str; 3] = ["Furniture", "Electronics", "Jewelry"];

    fn table() -> SalesTable {
        [
            record("Furniture", "2023-01-01", Some(100.0)),
            record("Furniture", "2023-02-01", Some(300.0)),
            record("Electronics", "2023-01-01", Some(500.0)),
            record("Jewelry", "2023-01-01", None),
        ]
        .into_iter()
        .collect()
    }

    fn run(table: &SalesTable, input: &str) -> String {
        let mut output = Vec::new();
        Session::new(table, input.as_bytes(), &mut output)
            .run()
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn parse_categories_fn_maps_numbers_to_names() {
        assert_eq!(
            parse_categories("2", &CATS).unwrap(),
            CategorySet::Only(vec!["Electronics".into()])
        );
        assert_eq!(
            parse_categories(" 1  1 2 ", &CATS).unwrap(),
            CategorySet::Only(vec!["Furniture".into(), "Electronics".into()])
        );
    }

    #[test]
    fn parse_categories_fn_selects_all_for_zero() {
        assert_eq!(parse_categories("0", &CATS).unwrap(), CategorySet::All);
        assert_eq!(parse_categories("1 0 3", &CATS).unwrap(), CategorySet::All);
    }

    #[test]
    fn parse_categories_fn_rejects_bad_answers() {
        assert!(parse_categories("", &CATS).is_err());
        assert!(parse_categories("4", &CATS).is_err());
        assert!(parse_categories("-1", &CATS).is_err());
        assert!(parse_categories("one", &CATS).is_err());
    }

    #[test]
    fn parse_bound_fn_treats_blank_as_open() {
        assert_eq!(parse_bound("  ").unwrap(), None);
        assert_eq!(
            parse_bound("2023-02-01").unwrap().unwrap().to_string(),
            "2023-02-01"
        );
        assert!(parse_bound("02/01/2023").is_err());
    }

    #[test]
    fn run_fn_reports_selection_and_stops_on_no() {
        let table = table();
        let output = run(&table, "1 2\n\n\nno\n");
        assert!(output.contains("0. Select All\n1. Furniture\n2. Electronics\n3. Jewelry\n"));
        assert!(output.contains("Statistics for Furniture:\nTotal Sales: 400.00\n"));
        assert!(output.contains("Statistics for Electronics:\nTotal Sales: 500.00\n"));
        let electronics = output.find("\nElectronics: Best Period").unwrap();
        let furniture = output.find("\nFurniture: Best Period").unwrap();
        assert!(electronics < furniture);
        assert_eq!(output.matches("Sales Ranking by Total Sales:").count(), 1);
    }

    #[test]
    fn run_fn_reports_whole_view_when_all_selected() {
        let table = table();
        let output = run(&table, "0\n2023-01-01\n2023-01-31\nno\n");
        assert!(output.contains(&format!("Statistics for {ALL_LABEL}:\nTotal Sales: 600.00\n")));
        assert!(output.contains("Jewelry: no sales figures in the selected period"));
    }

    #[test]
    fn run_fn_prints_notice_for_empty_selection() {
        let table = table();
        let output = run(&table, "3\n\n\nno\n");
        assert!(output.contains(&format!("Statistics for Jewelry:\n{NO_DATA}\n")));
        assert!(output.contains(&format!("Sales Ranking by Total Sales:\n{NO_DATA}\n")));
    }

    #[test]
    fn run_fn_reprompts_after_bad_input() {
        let table = table();
        let output = run(&table, "7\n1\nyesterday\n\n\nno\n");
        assert_eq!(output.matches("0. Select All").count(), 2);
        assert!(output.contains("Sorry, 7 is not on the list (choose 0 to 3). Please try again."));
        assert!(output.contains("Sorry, invalid date \"yesterday\""));
        assert!(output.contains("Statistics for Furniture:"));
    }

    #[test]
    fn run_fn_repeats_until_answer_is_not_yes() {
        let table = table();
        let output = run(&table, "1\n\n\nYES\n2\n\n\nno\n");
        assert_eq!(output.matches("Sales Ranking by Total Sales:").count(), 2);
        assert!(output.contains("Statistics for Electronics:"));
    }

    #[test]
    fn run_fn_ends_quietly_at_end_of_input() {
        let table = table();
        let output = run(&table, "1\n");
        assert!(!output.contains("Statistics for"));
        assert_eq!(run(&table, ""), output.split("\nEnter date range:").next().unwrap());
    }

    #[test]
    fn report_fn_writes_chart_when_configured() {
        let table = table();
        let path = std::env::temp_dir().join(format!("retail-session-{}.svg", std::process::id()));
        let mut output = Vec::new();
        Session::new(&table, &b""[..], &mut output)
            .with_chart(&path)
            .report(&Selection::default())
            .unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(svg.contains(CHART_TITLE));
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains(&format!("Chart written to {}", path.display())));
    }
}
