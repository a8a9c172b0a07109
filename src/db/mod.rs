//! SQLite-backed activity store: the collaborator finished sessions are
//! handed to.

mod calories;
mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use calories::CalorieTable;
pub use connection::Database;
pub use models::{Activity, ActivityFilter, ActivitySort, ActivityStats, SortDirection};
