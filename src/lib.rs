pub mod canvas;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod orchestrator;
pub mod template;
pub mod tool_support;
pub mod values;
