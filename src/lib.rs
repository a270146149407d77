pub mod config;
pub mod logging;

// Core modules
pub mod admission;
pub mod chunker;
pub mod control;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod finisher;
pub mod job;
pub mod ledger;
pub mod retry;
pub mod source;
