//! The top-level consensus server and its protocol handlers.
//!
//! The `Server` struct lives in `server.rs`; the candidate/voter side is in
//! `election.rs`, the append-entries exchange in `replication.rs`, and
//! commit-index advancement plus the apply loop in `commit.rs`.

mod commit;
mod election;
mod replication;
#[allow(clippy::module_inception)]
mod server;


pub use server::Server;
pub use server::ServerState;
