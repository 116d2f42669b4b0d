mod app;
mod config;
mod error;
mod logging;
mod monitor;

pub use app::run_from_args;
