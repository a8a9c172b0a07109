pub mod activity;

pub use activity::{Activity, ActivityFilter, ActivitySort, ActivityStats, SortDirection};
