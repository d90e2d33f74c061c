pub mod audit;
pub mod config;
pub mod determinism;
pub mod evidence;
pub mod logging;
pub mod report;
pub mod run;
pub mod sink;
pub mod source;

pub mod error;
