// Library interface for localnews modules
// This allows tests and other binaries to import modules

pub mod dates;
pub mod geocoding;
pub mod llm;
pub mod models;
pub mod news;
pub mod processing;
pub mod query;
pub mod server;
