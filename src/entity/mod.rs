//! Sea-ORM entity definitions for the persisted session record.

/// Table holding one row per named session snapshot.
pub mod session_snapshot;
