pub mod commands;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod palette;
pub mod pipeline;
pub mod quiz;
pub mod session;
pub mod tui;
pub mod utils;
