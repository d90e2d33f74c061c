pub mod interface;
pub mod retry;
pub mod snapshot;
