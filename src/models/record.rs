//! Records flowing through a chunk-oriented step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// An immutable domain item read from a [`PagedSource`](crate::reader::PagedSource).
///
/// `sort_key` must be totally ordered and, together with a stable backing
/// store, unique within a run; the paging reader relies on it to read every
/// record exactly once.
pub trait Record: Clone + Send + Sync + fmt::Debug + 'static {
    type Id: fmt::Display + fmt::Debug + Clone + Eq + Hash + Send + Sync + 'static;
    type SortKey: Ord + fmt::Debug + Clone + Send + Sync + 'static;

    fn id(&self) -> Self::Id;

    fn sort_key(&self) -> Self::SortKey;

    /// Name of the field `sort_key` is derived from
    fn sort_field() -> &'static str {
        crate::constants::DEFAULT_SORT_KEY
    }
}

/// Row of the `example` table: an identity key plus an opaque payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleRecord {
    pub id: i64,
    pub data: String,
}

impl ExampleRecord {
    pub fn new(id: i64, data: impl Into<String>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Records with ids `1..=count` and generated payloads
    pub fn sequence(count: usize) -> Vec<Self> {
        (1..=count as i64)
            .map(|id| Self::new(id, format!("data-{id}")))
            .collect()
    }
}

impl Record for ExampleRecord {
    type Id = i64;
    type SortKey = i64;

    fn id(&self) -> i64 {
        self.id
    }

    fn sort_key(&self) -> i64 {
        self.id
    }
}
