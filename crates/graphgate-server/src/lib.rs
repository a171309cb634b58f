pub mod config;
pub mod observability;
pub mod schemas;
pub mod server;

pub use config::AppConfig;
pub use server::{build_app, run};
