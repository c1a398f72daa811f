pub mod logging;

pub mod config;
pub mod dfuplus;
pub mod error;
pub mod monitor;
pub mod operations;
pub mod runner;

pub use error::{Error, Result};
