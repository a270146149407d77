//! Query-backed source: a paging cursor over a large backing store.

use super::{RecordCursor, RecordSource};
use crate::error::SourceError;

/// Paging function: given the 0-based page index and a page-size hint,
/// return the next page of records, `Ok(None)` when the store is exhausted,
/// or `Err` if the backing store broke mid-iteration.
pub type PageFn<R> = Box<dyn FnMut(u64, usize) -> Result<Option<Vec<R>>, SourceError> + Send>;

/// Streams records page by page from a backing store. Subject to the
/// configured result-count ceiling: once more records than the ceiling have
/// been pulled, iteration fails with `QueryLimitExceeded` (coordinator-level
/// fault, the job goes to Failed).
pub struct QuerySource<R> {
    pager: PageFn<R>,
    ceiling: u64,
}

impl<R> QuerySource<R> {
    pub fn new(pager: PageFn<R>, ceiling: u64) -> Self {
        Self { pager, ceiling }
    }
}

impl<R: Send + 'static> RecordSource<R> for QuerySource<R> {
    fn open(self: Box<Self>) -> Result<Box<dyn RecordCursor<R>>, SourceError> {
        Ok(Box::new(QueryCursor {
            pager: self.pager,
            ceiling: self.ceiling,
            page_index: 0,
            seen: 0,
            done: false,
        }))
    }
}

struct QueryCursor<R> {
    pager: PageFn<R>,
    ceiling: u64,
    page_index: u64,
    seen: u64,
    done: bool,
}

impl<R: Send + 'static> RecordCursor<R> for QueryCursor<R> {
    fn next_page(&mut self, max: usize) -> Result<Option<Vec<R>>, SourceError> {
        if self.done {
            return Ok(None);
        }
        let page = (self.pager)(self.page_index, max)?;
        self.page_index += 1;
        match page {
            None => {
                self.done = true;
                Ok(None)
            }
            Some(records) if records.is_empty() => {
                self.done = true;
                Ok(None)
            }
            Some(records) => {
                self.seen += records.len() as u64;
                if self.seen > self.ceiling {
                    self.done = true;
                    return Err(SourceError::QueryLimitExceeded {
                        seen: self.seen,
                        ceiling: self.ceiling,
                    });
                }
                Ok(Some(records))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pager over a fixed range, `page_size` records per call.
    fn range_pager(total: u32, page_size: usize) -> PageFn<u32> {
        Box::new(move |page, _max| {
            let start = page as usize * page_size;
            if start >= total as usize {
                return Ok(None);
            }
            let end = (start + page_size).min(total as usize);
            Ok(Some((start as u32..end as u32).collect()))
        })
    }

    #[test]
    fn pages_until_exhausted() {
        let source = Box::new(QuerySource::new(range_pager(7, 3), 100));
        let mut cursor = RecordSource::open(source).unwrap();
        assert_eq!(cursor.next_page(3).unwrap(), Some(vec![0, 1, 2]));
        assert_eq!(cursor.next_page(3).unwrap(), Some(vec![3, 4, 5]));
        assert_eq!(cursor.next_page(3).unwrap(), Some(vec![6]));
        assert_eq!(cursor.next_page(3).unwrap(), None);
        assert_eq!(cursor.next_page(3).unwrap(), None);
    }

    #[test]
    fn enforces_result_ceiling() {
        let source = Box::new(QuerySource::new(range_pager(100, 10), 25));
        let mut cursor = RecordSource::open(source).unwrap();
        assert!(cursor.next_page(10).unwrap().is_some());
        assert!(cursor.next_page(10).unwrap().is_some());
        let err = cursor.next_page(10).unwrap_err();
        match err {
            SourceError::QueryLimitExceeded { seen, ceiling } => {
                assert_eq!(seen, 30);
                assert_eq!(ceiling, 25);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn surfaces_backing_store_failure() {
        let mut calls = 0u32;
        let pager: PageFn<u32> = Box::new(move |_page, _max| {
            calls += 1;
            if calls == 1 {
                Ok(Some(vec![1, 2, 3]))
            } else {
                Err(SourceError::Exhausted("table dropped".into()))
            }
        });
        let source = Box::new(QuerySource::new(pager, 100));
        let mut cursor = RecordSource::open(source).unwrap();
        assert!(cursor.next_page(3).unwrap().is_some());
        assert!(matches!(
            cursor.next_page(3),
            Err(SourceError::Exhausted(_))
        ));
    }
}
