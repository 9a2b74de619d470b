use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{info, warn};

use crate::db::Database;
use crate::models::Settings;
use crate::services::holidays::{HolidayCatalog, HolidaySource, NagerHolidaySource, NoHolidays};
use crate::services::layout::{CellLayoutResolver, LayoutHintProvider, LocalOnlyHints};
use crate::services::openai::OpenAiLayoutHints;

pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub settings: Arc<Mutex<Settings>>,
    pub holidays: HolidayCatalog,
    pub layouts: Arc<CellLayoutResolver>,
}

impl AppState {
    /// Wires the network collaborators from settings: Nager.Date holidays for
    /// the configured country and OpenAI hints when an API key is present.
    pub fn new(db: Database, settings: Settings) -> Self {
        let holiday_source: Arc<dyn HolidaySource> = match NagerHolidaySource::new(&settings.holiday_country) {
            Ok(source) => Arc::new(source),
            Err(err) => {
                warn!("Holiday source disabled: {}", err);
                Arc::new(NoHolidays)
            }
        };
        let hints: Arc<dyn LayoutHintProvider> = match settings.openai_api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {
                info!("Layout hints via OpenAI model {}", settings.openai_model);
                Arc::new(OpenAiLayoutHints::new(key, &settings.openai_model))
            }
            _ => Arc::new(LocalOnlyHints),
        };
        Self::with_collaborators(db, settings, holiday_source, hints)
    }

    pub fn with_collaborators(
        db: Database,
        settings: Settings,
        holiday_source: Arc<dyn HolidaySource>,
        hints: Arc<dyn LayoutHintProvider>,
    ) -> Self {
        let timeout = Duration::from_secs(settings.hint_timeout_secs.max(1));
        AppState {
            db: Arc::new(Mutex::new(db)),
            settings: Arc::new(Mutex::new(settings)),
            holidays: HolidayCatalog::new(holiday_source),
            layouts: Arc::new(CellLayoutResolver::new(hints, timeout)),
        }
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| anyhow!("DB lock poisoned"))
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.settings.lock().map_err(|_| anyhow!("Settings lock"))?.clone())
    }
}
