//! Page requests and fetched pages.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "ASC"),
            Self::Descending => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub key: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Descending,
        }
    }

    pub fn is_ascending(&self) -> bool {
        self.direction == SortDirection::Ascending
    }
}

/// One store-level query: the `page_index`-th window of `page_size` records
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_index: usize,
    pub page_size: usize,
    pub sort: Sort,
}

impl PageRequest {
    pub fn new(page_index: usize, page_size: usize, sort: Sort) -> Self {
        Self {
            page_index,
            page_size,
            sort,
        }
    }

    /// Number of records preceding this page
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }
}

/// Records returned for a [`PageRequest`]
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub index: usize,
    pub requested_size: usize,
    pub records: Vec<R>,
}

impl<R> Page<R> {
    pub fn new(request: &PageRequest, records: Vec<R>) -> Self {
        Self {
            index: request.page_index,
            requested_size: request.page_size,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A short page has no successor
    pub fn is_last(&self) -> bool {
        self.records.len() < self.requested_size
    }
}
