pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod naming;
pub mod persister;
pub mod reader;
pub mod store;
