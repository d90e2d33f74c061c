pub mod archive;
pub mod render;
pub mod views;
