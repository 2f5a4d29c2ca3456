use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::{io, path::PathBuf};

use retail_sales::{CategorySet, Period, SalesTable, Selection, Session};

#[derive(Parser, Debug)]
#[command(version, about = "Explore monthly retail sales figures from a CSV file")]
struct Args {
    /// CSV file of monthly sales
    path: PathBuf,

    /// Where to write the sales chart (SVG)
    #[arg(long, default_value = "retail_sales.svg")]
    chart: PathBuf,

    /// Don't write a chart
    #[arg(long)]
    no_chart: bool,

    /// Print one report for the selection given by the options below, without
    /// prompting
    #[arg(long)]
    batch: bool,

    /// Kind of business to include in batch mode (repeatable; default all)
    #[arg(long = "category", requires = "batch")]
    categories: Vec<String>,

    /// First month to include in batch mode (YYYY-MM-DD)
    #[arg(long, requires = "batch")]
    start: Option<Period>,

    /// Last month to include in batch mode (YYYY-MM-DD)
    #[arg(long, requires = "batch")]
    end: Option<Period>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let table = SalesTable::read_csv(&args.path)?;
    let mut session = Session::new(&table, io::stdin().lock(), io::stdout().lock());
    if !args.no_chart {
        session = session.with_chart(args.chart);
    }
    if args.batch {
        let categories = if args.categories.is_empty() {
            CategorySet::All
        } else {
            CategorySet::Only(args.categories)
        };
        session.report(&Selection {
            categories,
            start: args.start,
            end: args.end,
        })
    } else {
        session.run()
    }
}
