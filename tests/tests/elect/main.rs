#[path = "../fixtures/mod.rs"]
mod fixtures;

mod t10_leader_appears;
mod t30_partial_votes;
