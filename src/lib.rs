pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ConsoleConfig;

pub use adapters::{FileTokenStore, HistoryNavigator, MemoryTokenStore, TerminalNotifier};
pub use crate::core::{
    auth::Authenticator,
    client::{ApiClient, ApiSettings},
    resources::{CompaniesApi, InventoryApi, LedgerApi, ReportsApi},
    session::SessionService,
};
pub use utils::error::{ConsoleError, Result};
