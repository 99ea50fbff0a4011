#[path = "../fixtures/mod.rs"]
mod fixtures;

mod t10_client_writes;
