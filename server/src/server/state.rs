use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::llm::GenerativeModel;
use crate::places::PlacesLookup;

/// Shared, read-only handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub model: Arc<dyn GenerativeModel>,
    /// `None` when no Maps key is configured.
    pub places: Option<Arc<dyn PlacesLookup>>,
    pub reports_dir: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        places: Option<Arc<dyn PlacesLookup>>,
        reports_dir: PathBuf,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                model,
                places,
                reports_dir,
                started_at: Utc::now(),
            }),
        }
    }
}
