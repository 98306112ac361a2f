use crate::models::Record;

/// An ordered, bounded batch of records processed as one unit of work.
///
/// Chunks are moved into the worker that writes them and are never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<R> {
    index: u64,
    items: Vec<R>,
}

impl<R: Record> Chunk<R> {
    pub fn new(index: u64, items: Vec<R>) -> Self {
        Self { index, items }
    }

    /// Zero-based position of this chunk in the record stream
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn into_items(self) -> Vec<R> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first_id(&self) -> Option<R::Id> {
        self.items.first().map(Record::id)
    }

    pub fn last_id(&self) -> Option<R::Id> {
        self.items.last().map(Record::id)
    }

    pub fn ids(&self) -> Vec<R::Id> {
        self.items.iter().map(Record::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExampleRecord;

    #[test]
    fn test_chunk_bounds() {
        let chunk = Chunk::new(3, ExampleRecord::sequence(5));
        assert_eq!(chunk.index(), 3);
        assert_eq!(chunk.len(), 5);
        assert_eq!(chunk.first_id(), Some(1));
        assert_eq!(chunk.last_id(), Some(5));
        assert_eq!(chunk.ids(), vec![1, 2, 3, 4, 5]);
    }
}
