pub mod loader;
pub mod run_config;
pub mod types;
pub mod validator;
