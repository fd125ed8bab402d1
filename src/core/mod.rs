pub mod config;
pub mod error;
pub mod init;
pub mod service;
pub mod types;
