// Adapters layer: concrete implementations of the domain ports.

pub mod navigation;
pub mod storage;

pub use navigation::{HistoryNavigator, TerminalNotifier};
pub use storage::{FileTokenStore, MemoryTokenStore};
