pub mod calendar;
pub mod db;
pub mod grid;
pub mod guard;
pub mod models;
pub mod navigation;
pub mod sync;

pub use db::repository::{RepositoryError, TargetRepository};
pub use models::*;
