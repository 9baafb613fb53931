pub mod api;
pub mod client;
pub mod config;
pub mod console;
pub mod db;
pub mod jobs;
pub mod logging;
