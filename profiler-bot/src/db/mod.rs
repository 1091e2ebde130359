pub mod cache;
pub mod sqlite;
pub mod tables;

pub use sqlite::Database;
