//! Core type definitions for shaledb.

mod ids;

pub use ids::{Lsn, PageId};
