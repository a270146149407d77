//! Eager source: a pre-materialized record collection.

use std::collections::VecDeque;

use super::{RecordCursor, RecordSource};
use crate::error::SourceError;

/// Wraps an already-materialized ordered record set. Not subject to the
/// query result ceiling (the caller has paid the memory cost up front).
pub struct EagerSource<R> {
    records: Vec<R>,
}

impl<R> EagerSource<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }
}

impl<R: Send + 'static> RecordSource<R> for EagerSource<R> {
    fn open(self: Box<Self>) -> Result<Box<dyn RecordCursor<R>>, SourceError> {
        Ok(Box::new(EagerCursor {
            remaining: self.records.into(),
        }))
    }
}

struct EagerCursor<R> {
    remaining: VecDeque<R>,
}

impl<R: Send + 'static> RecordCursor<R> for EagerCursor<R> {
    fn next_page(&mut self, max: usize) -> Result<Option<Vec<R>>, SourceError> {
        if self.remaining.is_empty() {
            return Ok(None);
        }
        let take = max.min(self.remaining.len());
        Ok(Some(self.remaining.drain(..take).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_in_order_then_exhausts() {
        let source = Box::new(EagerSource::new((0..10).collect::<Vec<u32>>()));
        let mut cursor = RecordSource::open(source).unwrap();
        assert_eq!(cursor.next_page(4).unwrap(), Some(vec![0, 1, 2, 3]));
        assert_eq!(cursor.next_page(4).unwrap(), Some(vec![4, 5, 6, 7]));
        assert_eq!(cursor.next_page(4).unwrap(), Some(vec![8, 9]));
        assert_eq!(cursor.next_page(4).unwrap(), None);
        // Stays exhausted.
        assert_eq!(cursor.next_page(4).unwrap(), None);
    }

    #[test]
    fn empty_source_is_immediately_exhausted() {
        let source = Box::new(EagerSource::new(Vec::<u32>::new()));
        let mut cursor = RecordSource::open(source).unwrap();
        assert_eq!(cursor.next_page(100).unwrap(), None);
    }
}
