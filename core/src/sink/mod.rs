pub mod fs;
pub mod interface;
pub mod outbox;
