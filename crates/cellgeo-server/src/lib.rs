pub mod config;
pub mod handlers;
pub mod observability;
pub mod scheduler;
pub mod server;
pub mod state;

pub use config::{
    AppConfig, LoggingConfig, RefreshConfig, ServerConfig, StorageBackend, StorageConfig,
};
pub use observability::init_tracing;
pub use scheduler::MaintenanceTask;
pub use server::{CellgeoServer, ServerBuilder, build_app, router};
pub use state::AppState;
