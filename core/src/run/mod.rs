pub mod lifecycle;
pub mod pipeline;
