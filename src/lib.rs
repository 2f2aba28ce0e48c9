pub mod config;
pub mod constants;
pub mod error;
pub mod input;
pub mod intune;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod server;
pub mod types;
pub mod validator;
