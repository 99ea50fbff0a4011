//! The in-memory entry log.

#[allow(clippy::module_inception)]
mod log;


pub use log::RaftLog;
