pub mod breakdown;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod features;
pub mod logging;
pub mod render;
pub mod server;
pub mod styling;
pub mod summary;
pub mod timeline;
