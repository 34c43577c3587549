pub mod artifacts;
pub mod db;
pub mod error;
pub mod http;
pub mod telemetry;
