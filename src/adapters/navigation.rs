use crate::domain::model::{Notice, View};
use crate::domain::ports::{Navigator, Notifier};
use std::sync::Mutex;

/// Keeps the visited views in memory; the last entry is the current view.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<View>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<View> {
        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .last()
            .cloned()
    }

    pub fn history(&self) -> Vec<View> {
        self.history.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, view: View) {
        tracing::debug!("Navigating to {}", view);
        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(view);
    }
}

/// Prints notices to stderr. A terminal has nothing to wait on, so the
/// notice counts as acknowledged once written.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::info!("Notice shown: {}", notice.title());
        eprintln!("⚠️  {}: {}", notice.title(), notice.text());
    }
}
