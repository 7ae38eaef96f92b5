pub mod actions;
pub mod client;
pub mod config;
pub mod config_merge;
pub mod errors;
pub mod fake_data;
pub mod logging;
pub mod metrics;
pub mod outcome;
pub mod profiles;
pub mod selector;
pub mod session;
pub mod task;
pub mod user;
pub mod utils;
pub mod yaml_config;
