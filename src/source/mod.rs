//! Record sources: where a job's records come from.
//!
//! Two variants behind one seam: an eager in-memory collection (no result
//! ceiling) and a query-backed paging cursor subject to the configured
//! result-count ceiling. Cursors hand out owned value snapshots, never
//! references into live mutable state, so batches stay valid however late
//! they execute.

mod eager;
mod query;

pub use eager::EagerSource;
pub use query::{PageFn, QuerySource};

use crate::error::SourceError;

/// Produces the records for one job. Consumed on open; a source cannot be
/// reused across jobs.
pub trait RecordSource<R>: Send {
    /// Open a cursor over the full record set.
    fn open(self: Box<Self>) -> Result<Box<dyn RecordCursor<R>>, SourceError>;
}

/// Forward-only cursor over a source's records.
pub trait RecordCursor<R>: Send {
    /// Pull up to `max` records. `Ok(None)` signals clean exhaustion;
    /// an empty page is treated the same way.
    fn next_page(&mut self, max: usize) -> Result<Option<Vec<R>>, SourceError>;
}
