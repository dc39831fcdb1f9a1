pub mod app;
pub mod config;
pub mod errors;
pub mod filter;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod records;
pub mod settings;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use gateway::CrmGateway;
pub use state::AppState;
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
