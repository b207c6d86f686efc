//! [`Connection`](crate::core::Connection) implementations shipped with the crate.
//!
//! - [`DryRunConnection`]: records statements and answers catalog queries
//!   from canned responses. Drives DDL previews and the test suites.
//! - [`SqliteConnection`] (feature `sqlite`): a real executor over `rusqlite`.

mod dry_run;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use dry_run::DryRunConnection;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnection;
