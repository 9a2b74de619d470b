use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::YearMonth;

pub type HolidayMap = BTreeMap<NaiveDate, String>;

#[async_trait]
pub trait HolidaySource: Send + Sync {
    async fn fetch(&self, year: i32) -> Result<HolidayMap>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NagerHoliday {
    date: String,
    local_name: Option<String>,
    name: Option<String>,
}

pub struct NagerHolidaySource {
    client: reqwest::Client,
    country: String,
    base_url: String,
}

impl NagerHolidaySource {
    pub fn new(country: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(NagerHolidaySource {
            client,
            country: country.trim().to_ascii_uppercase(),
            base_url: "https://date.nager.at/api/v3/PublicHolidays".to_string(),
        })
    }
}

#[async_trait]
impl HolidaySource for NagerHolidaySource {
    async fn fetch(&self, year: i32) -> Result<HolidayMap> {
        let url = format!("{}/{}/{}", self.base_url, year, self.country);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Holiday source error {} for {}", response.status(), url));
        }

        let body: Vec<NagerHoliday> = response.json().await?;
        let mut holidays = HolidayMap::new();
        for entry in body {
            let Ok(date) = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d") else {
                continue;
            };
            let name = entry
                .local_name
                .or(entry.name)
                .unwrap_or_else(|| "Holiday".to_string());
            holidays.insert(date, name);
        }
        Ok(holidays)
    }
}

/// Per-process, per-year memo of holiday maps.
///
/// A failed fetch yields an empty map and is not cached, so a later call may
/// retry. Concurrent fetches of the same year both write; the content is the
/// same so the last writer is kept.
#[derive(Clone)]
pub struct HolidayCatalog {
    source: Arc<dyn HolidaySource>,
    cache: Arc<RwLock<HashMap<i32, HolidayMap>>>,
}

impl HolidayCatalog {
    pub fn new(source: Arc<dyn HolidaySource>) -> Self {
        HolidayCatalog {
            source,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn for_year(&self, year: i32) -> HolidayMap {
        if let Some(cached) = self.cached(year) {
            debug!("Holiday cache hit for {}", year);
            return cached;
        }

        match self.source.fetch(year).await {
            Ok(holidays) => {
                info!("Fetched {} public holidays for {}", holidays.len(), year);
                if let Ok(mut cache) = self.cache.write() {
                    cache.insert(year, holidays.clone());
                }
                holidays
            }
            Err(err) => {
                warn!("Holiday source unavailable for {}, assuming none: {}", year, err);
                HolidayMap::new()
            }
        }
    }

    pub async fn for_month(&self, month: YearMonth) -> HolidayMap {
        self.for_year(month.year())
            .await
            .into_iter()
            .filter(|(date, _)| month.contains(*date))
            .collect()
    }

    fn cached(&self, year: i32) -> Option<HolidayMap> {
        self.cache.read().ok().and_then(|cache| cache.get(&year).cloned())
    }
}

pub struct NoHolidays;

#[async_trait]
impl HolidaySource for NoHolidays {
    async fn fetch(&self, _year: i32) -> Result<HolidayMap> {
        Ok(HolidayMap::new())
    }
}
