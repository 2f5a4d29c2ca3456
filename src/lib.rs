#![doc = include_str!("../README.md")]
mod amount;
pub mod chart;
mod period;
mod ranking;
mod session;
mod stats;
mod table;

pub use amount::Amount;
pub use period::Period;
pub use ranking::{report_ranking, CategoryRank, Ranking};
pub use session::{parse_bound, parse_categories, Session, ALL_LABEL, CHART_TITLE};
pub use stats::{report_statistics, Statistics, NO_DATA};
pub use table::{CategorySet, Record, SalesTable, Selection, View};
