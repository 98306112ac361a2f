//! # Paged Reading
//!
//! [`PagedSource`] is the storage contract; [`PagingReader`] turns it into a
//! forward-only stream of records for the chunk assembler.

pub mod paging_reader;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod source;

pub use paging_reader::{PagingReader, ReaderCursor};
#[cfg(feature = "postgres")]
pub use postgres::PgPagedSource;
pub use source::{InMemoryPagedSource, PagedSource};
