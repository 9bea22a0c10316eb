pub mod canon;
pub mod db;
mod densemap;
pub mod error;
pub mod extension;
pub mod file_state;
pub mod fs;
pub mod generate;
pub mod graph;
pub mod history;
pub mod manager;
pub mod progress;
pub mod run;
mod signal;
pub mod task;
pub mod trace;
pub mod value;
pub mod work;

pub use error::{Error, Result};
