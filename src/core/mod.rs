pub mod app;
pub mod config;
pub mod history;
pub mod import;
pub mod log;
pub mod reconcile;
pub mod session;
pub mod tools;
