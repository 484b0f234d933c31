pub mod cli;
pub mod config;
pub mod embed;
pub mod indexer;
mod metrics;
mod server;
pub mod service;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use service::SearchService;
pub use store::VectorStore;
