pub mod attempt;
pub mod config;
