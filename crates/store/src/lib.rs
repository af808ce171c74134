//! Conversation store backends for Parley.
//!
//! Implements the [`ChatStore`] trait from `parley-core`:
//! - [`SqliteStore`] — production backend (WAL, transactional append)
//! - [`InMemoryStore`] — tests and ephemeral sessions
//!
//! The store owns conversations exclusively; the pipeline only reads and
//! appends. `append` is atomic and ordered in both backends so a user turn
//! and its assistant turn always land together.
//!
//! [`ChatStore`]: parley_core::ChatStore

pub mod in_memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
