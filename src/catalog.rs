//! Item catalog and cached unit prices.
//!
//! One registry holds the selectable item names and the price cache behind
//! a single lock. Prices come from a [`PriceSource`] and are refreshed at
//! most once per cache duration; a failed or empty fetch keeps the old cache.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, Instant};

pub const DEFAULT_ITEMS: [&str; 7] = [
    "Item 1", "Item 2", "Item 3", "Item 4", "Item 5", "Curbs", "Pipes",
];

pub const CACHE_DURATION: Duration = Duration::from_secs(5 * 60);

pub trait PriceSource: Send + Sync {
    /// Item name → unit price.
    fn fetch_prices(&self) -> Result<HashMap<String, f64>>;
}

/// A price sheet exported as CSV: a header row, then item name and price in
/// the first two columns. Prices may carry `$` and thousands separators.
#[derive(Debug, Clone)]
pub struct CsvPriceSheet {
    path: PathBuf,
}

impl CsvPriceSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvPriceSheet { path: path.into() }
    }
}

impl PriceSource for CsvPriceSheet {
    fn fetch_prices(&self) -> Result<HashMap<String, f64>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open price sheet: {}", self.path.display()))?;
        parse_price_rows(reader.records().filter_map(|r| r.ok()))
    }
}

/// Rows with fewer than two columns or an unparseable price are skipped.
fn parse_price_rows(rows: impl Iterator<Item = csv::StringRecord>) -> Result<HashMap<String, f64>> {
    let mut prices = HashMap::new();
    for (row_num, row) in rows.enumerate() {
        let (Some(name), Some(price)) = (row.get(0), row.get(1)) else {
            continue;
        };
        let cleaned = price.trim().replace(['$', ','], "");
        match cleaned.parse::<f64>() {
            Ok(value) => {
                prices.insert(name.trim().to_string(), value);
            }
            Err(e) => log::warn!("Price row {}: cannot parse '{}': {}", row_num + 2, price, e),
        }
    }
    if prices.is_empty() {
        log::warn!("Price sheet has no usable rows");
    }
    Ok(prices)
}

struct CatalogState {
    items: Vec<String>,
    prices: HashMap<String, f64>,
    last_update: Option<Instant>,
}

pub struct Catalog {
    state: RwLock<CatalogState>,
    source: Box<dyn PriceSource>,
    cache_duration: Duration,
}

impl Catalog {
    pub fn new(source: Box<dyn PriceSource>) -> Self {
        Catalog {
            state: RwLock::new(CatalogState {
                items: DEFAULT_ITEMS.iter().map(|s| s.to_string()).collect(),
                prices: HashMap::new(),
                last_update: None,
            }),
            source,
            cache_duration: CACHE_DURATION,
        }
    }

    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = duration;
        self
    }

    /// Load item names from a JSON array, falling back to the defaults when
    /// the file does not exist yet.
    pub fn load(path: &Path, source: Box<dyn PriceSource>) -> Result<Self> {
        let catalog = Catalog::new(source);
        if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
            let items: Vec<String> = serde_json::from_str(&data)
                .with_context(|| format!("Invalid catalog: {}", path.display()))?;
            catalog.write().items = items;
        }
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.items())?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write catalog: {}", path.display()))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn items(&self) -> Vec<String> {
        self.read().items.clone()
    }

    /// Returns false if the item was already listed.
    pub fn add_item(&self, name: &str) -> bool {
        let name = name.trim();
        let mut state = self.write();
        if name.is_empty() || state.items.iter().any(|i| i == name) {
            return false;
        }
        state.items.push(name.to_string());
        true
    }

    pub fn remove_item(&self, name: &str) -> bool {
        let mut state = self.write();
        let before = state.items.len();
        state.items.retain(|i| i != name);
        state.items.len() != before
    }

    /// Refetch prices if the cache has expired. Returns true if the cache
    /// was replaced.
    pub fn refresh_prices(&self) -> bool {
        let expired = match self.read().last_update {
            Some(at) => at.elapsed() > self.cache_duration,
            None => true,
        };
        if !expired {
            return false;
        }
        match self.source.fetch_prices() {
            Ok(prices) if !prices.is_empty() => {
                let mut state = self.write();
                state.prices = prices;
                state.last_update = Some(Instant::now());
                log::info!("Price cache refreshed ({} items)", state.prices.len());
                true
            }
            Ok(_) => false,
            Err(e) => {
                log::error!("Price fetch failed: {:#}", e);
                false
            }
        }
    }

    pub fn price(&self, item: &str) -> Option<f64> {
        self.refresh_prices();
        self.read().prices.get(item).copied()
    }

    pub fn prices(&self) -> HashMap<String, f64> {
        self.refresh_prices();
        self.read().prices.clone()
    }
}
