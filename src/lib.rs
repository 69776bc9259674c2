pub mod cluster;
pub mod commands;
pub mod config;
pub mod experiment;
pub mod load;
pub mod report;
pub mod ui;
pub mod utils;
