pub mod config;
pub mod datetime;
pub mod db;

pub use config::AppConfig;
