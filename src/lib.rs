//! pmon, a client that reconciles the snapshots of a process monitor into a live process tree

mod local_logger;
mod monitor_client;
mod prelude;
mod render;
mod request_client;

pub mod cli;
pub mod config;
pub mod logger;
pub mod monitor;

pub use local_logger::clean_logger;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
