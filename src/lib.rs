pub mod config;
pub mod errors;
pub mod judge;
pub mod logging;
pub mod service;
pub mod session;
pub mod sim_config;
pub mod ui;
