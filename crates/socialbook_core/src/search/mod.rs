//! Read-time ordering and filtering over the in-memory dataset.
//!
//! # Responsibility
//! - Order groups and people by the selected `SortMode`.
//! - Filter groups and people by a case-insensitive substring query.
//!
//! # Invariants
//! - Neither operation mutates stored order.
//! - Results are deterministic for equal inputs.

pub mod filter;
pub mod sort;

pub use filter::{search_groups, SearchHit};
pub use sort::{sort_by_mode, sorted_view, Sortable};
