//! Batch type and chunking: window a record cursor into fixed-size batches.
//!
//! Purely a buffering function over the cursor: for R records and chunk size
//! N it yields ceil(R/N) batches, each of N records except possibly the last.
//! Lazy, ordered, non-restartable.

use std::collections::VecDeque;

use crate::error::SourceError;
use crate::source::RecordCursor;

/// An ordered, bounded-size slice of a job's records. Owned value snapshots;
/// consumed exactly once by the executor and discarded afterwards.
#[derive(Debug)]
pub struct Batch<R> {
    /// 0-based sequence index within the job.
    pub seq: u64,
    pub records: Vec<R>,
}

impl<R> Batch<R> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Windows a cursor into batches of up to `chunk_size` records. The source's
/// page size need not match the chunk size; records are buffered across page
/// boundaries so every batch but the last is full.
pub struct Chunker<R> {
    cursor: Box<dyn RecordCursor<R>>,
    chunk_size: usize,
    buf: VecDeque<R>,
    next_seq: u64,
    exhausted: bool,
}

impl<R: Send + 'static> Chunker<R> {
    /// `chunk_size` must already be validated/clamped by the caller (≥ 1).
    pub fn new(cursor: Box<dyn RecordCursor<R>>, chunk_size: usize) -> Self {
        Self {
            cursor,
            chunk_size: chunk_size.max(1),
            buf: VecDeque::new(),
            next_seq: 0,
            exhausted: false,
        }
    }

    /// Next batch in sequence order, or `Ok(None)` once the source is done
    /// and the buffer is drained. Source errors pass through unchanged.
    pub fn next_batch(&mut self) -> Result<Option<Batch<R>>, SourceError> {
        while !self.exhausted && self.buf.len() < self.chunk_size {
            match self.cursor.next_page(self.chunk_size)? {
                Some(page) => self.buf.extend(page),
                None => self.exhausted = true,
            }
        }

        if self.buf.is_empty() {
            return Ok(None);
        }

        let take = self.chunk_size.min(self.buf.len());
        let records: Vec<R> = self.buf.drain(..take).collect();
        let seq = self.next_seq;
        self.next_seq += 1;
        Ok(Some(Batch { seq, records }))
    }
}
