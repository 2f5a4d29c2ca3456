use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::info;

use std::{fmt::Display, fs, path::Path};

use crate::{amount::Amount, table::Record, table::View};

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 540.0;
const LEFT: f64 = 100.0;
const RIGHT: f64 = 240.0;
const TOP: f64 = 50.0;
const BOTTOM: f64 = 60.0;
const Y_TICKS: u32 = 5;
const X_TICKS: u32 = 4;

const PALETTE: [&str; 10] = [
    "#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a", "#19d3f3", "#ff6692", "#b6e880",
    "#ff97ff", "#fecb52",
];

/// A line chart of sales over time, with one line per category.
///
/// The [`Display`] implementation renders the chart as a standalone SVG
/// document. Records with a missing amount are left out.
pub struct Chart<'a> {
    title: &'a str,
    series: Vec<(&'a str, Vec<&'a Record>)>,
}

impl<'a> Chart<'a> {
    #[must_use]
    pub fn new(view: &View<'a>, title: &'a str) -> Self {
        let mut series: Vec<(&str, Vec<&Record>)> = Vec::new();
        for record in view.records().iter().copied().filter(|r| r.amount.is_some()) {
            match series.iter_mut().find(|(name, _)| *name == record.category) {
                Some((_, points)) => points.push(record),
                None => series.push((record.category.as_str(), vec![record])),
            }
        }
        for (_, points) in &mut series {
            points.sort_by_key(|r| r.period);
        }
        Self { title, series }
    }

    fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.series
            .iter()
            .flat_map(|(_, points)| points.iter().copied().map(point))
    }

    /// Returns the x (day number) and y (amount) ranges to plot.
    fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut points = self.points();
        let (x, y) = points.next()?;
        let ((mut x0, mut x1), (mut y0, mut y1)) = ((x, x), (y.min(0.0), y));
        for (x, y) in points {
            x0 = x0.min(x);
            x1 = x1.max(x);
            y0 = y0.min(y);
            y1 = y1.max(y);
        }
        if x1 <= x0 {
            (x0, x1) = (x0 - 15.0, x1 + 15.0);
        }
        if y1 <= y0 {
            y1 = y0 + 1.0;
        }
        Some(((x0, x1), (y0, y1)))
    }
}

fn point(record: &Record) -> (f64, f64) {
    let day = f64::from(record.period.date().num_days_from_ce());
    let amount = record.amount.map_or(0.0, Amount::value);
    (day, amount)
}

#[allow(clippy::cast_possible_truncation)]
fn month_label(day: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(day.round() as i32)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

impl Display for Chart<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (plot_w, plot_h) = (WIDTH - LEFT - RIGHT, HEIGHT - TOP - BOTTOM);
        writeln!(
            f,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
        )?;
        writeln!(f, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
        writeln!(
            f,
            r#"<text x="{}" y="30" text-anchor="middle" font-size="18">{}</text>"#,
            LEFT + plot_w / 2.0,
            encode_text(self.title)
        )?;
        writeln!(
            f,
            r##"<rect x="{LEFT}" y="{TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="#444"/>"##
        )?;
        writeln!(
            f,
            r#"<text x="{}" y="{}" text-anchor="middle">Date</text>"#,
            LEFT + plot_w / 2.0,
            HEIGHT - 15.0
        )?;
        writeln!(
            f,
            r#"<text x="20" y="{0}" text-anchor="middle" transform="rotate(-90 20 {0})">Sales Amount</text>"#,
            TOP + plot_h / 2.0
        )?;

        let Some(((x0, x1), (y0, y1))) = self.bounds() else {
            writeln!(
                f,
                r##"<text x="{}" y="{}" text-anchor="middle" fill="#888">No data</text>"##,
                LEFT + plot_w / 2.0,
                TOP + plot_h / 2.0
            )?;
            return writeln!(f, "</svg>");
        };
        let sx = |x: f64| LEFT + (x - x0) / (x1 - x0) * plot_w;
        let sy = |y: f64| TOP + plot_h - (y - y0) / (y1 - y0) * plot_h;

        for i in 0..=Y_TICKS {
            let value = y0 + (y1 - y0) * f64::from(i) / f64::from(Y_TICKS);
            let y = sy(value);
            writeln!(
                f,
                r##"<line x1="{LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#e5e5e5"/>"##,
                LEFT + plot_w
            )?;
            writeln!(
                f,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
                LEFT - 6.0,
                y + 4.0,
                Amount::from(value)
            )?;
        }
        for i in 0..=X_TICKS {
            let day = x0 + (x1 - x0) * f64::from(i) / f64::from(X_TICKS);
            writeln!(
                f,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                sx(day),
                TOP + plot_h + 18.0,
                month_label(day)
            )?;
        }

        for (n, (category, records)) in self.series.iter().enumerate() {
            let colour = PALETTE[n % PALETTE.len()];
            let path: Vec<String> = records
                .iter()
                .map(|r| {
                    let (x, y) = point(r);
                    format!("{:.1},{:.1}", sx(x), sy(y))
                })
                .collect();
            writeln!(
                f,
                r#"<g><polyline fill="none" stroke="{colour}" stroke-width="2" points="{}"/>"#,
                path.join(" ")
            )?;
            for record in records {
                let (x, y) = point(record);
                writeln!(
                    f,
                    r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{colour}"><title>Date: {}&#10;Kind of Business: {}&#10;NAICS Code: {}&#10;Sales Amount: {}</title></circle>"#,
                    sx(x),
                    sy(y),
                    record.period,
                    encode_text(category),
                    encode_text(&record.naics_code),
                    Amount::from(y),
                )?;
            }
            writeln!(f, "</g>")?;

            #[allow(clippy::cast_precision_loss)]
            let legend_y = TOP + 10.0 + 20.0 * n as f64;
            let legend_x = LEFT + plot_w + 20.0;
            writeln!(
                f,
                r#"<rect x="{legend_x}" y="{:.1}" width="12" height="12" fill="{colour}"/>"#,
                legend_y - 10.0
            )?;
            writeln!(
                f,
                r#"<text x="{}" y="{legend_y:.1}" data-category="{}">{}</text>"#,
                legend_x + 18.0,
                encode_double_quoted_attribute(category),
                encode_text(category)
            )?;
        }
        writeln!(f, "</svg>")
    }
}

/// Returns `view` rendered as an SVG line chart.
#[must_use]
pub fn render_svg(view: &View, title: &str) -> String {
    Chart::new(view, title).to_string()
}

/// Renders `view` as an SVG line chart and writes it to `path`.
///
/// # Errors
///
/// Returns any errors from writing the file.
pub fn write_svg(view: &View, title: &str, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, render_svg(view, title))
        .with_context(|| format!("writing chart to {}", path.display()))?;
    info!(path = %path.display(), rows = view.len(), "wrote chart");
    Ok(())
}
