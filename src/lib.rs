pub mod config;
pub mod error;
pub mod launch;
pub mod output;
pub mod partition;
pub mod remote;
