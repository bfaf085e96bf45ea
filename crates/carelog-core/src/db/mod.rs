//! Local record store backed by `SQLite`

mod checkpoint;
mod connection;
mod migrations;
mod records;

pub use checkpoint::SqliteCheckpoint;
pub use connection::Database;
pub use records::EntityRepository;
