//! Project and line-item records, and the lookup seam the generator reads them through.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

impl Item {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub attn: Option<String>,
    #[serde(default)]
    pub contractor_name: Option<String>,
    #[serde(default)]
    pub contractor_email: Option<String>,
    #[serde(default)]
    pub job_contact: Option<String>,
    #[serde(default)]
    pub job_contact_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Street and city/state/zip parts of a free-text address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub street: String,
    pub city_state_zip: String,
}

impl Project {
    pub fn total_price(&self) -> f64 {
        self.items.iter().map(Item::line_total).sum()
    }

    /// Split the address on commas: the first segment is the street, the
    /// segments strictly between the first and last are the city/state/zip.
    /// Fewer than three segments is not enough to tell them apart, so both
    /// parts come back empty.
    pub fn address_parts(&self) -> AddressParts {
        let address = self.address.as_deref().unwrap_or("");
        let segments: Vec<&str> = address.split(',').map(str::trim).collect();
        if segments.len() < 3 {
            return AddressParts::default();
        }
        AddressParts {
            street: segments[0].to_string(),
            city_state_zip: segments[1..segments.len() - 1].join(", "),
        }
    }

    /// The project date as `Month D, YYYY`. Dates are stored as `YYYY-MM-DD`
    /// but `MM/DD/YYYY` is accepted too; anything else is passed through.
    pub fn formatted_date(&self) -> String {
        let raw = self.date.as_deref().unwrap_or("").trim();
        if raw.is_empty() {
            return String::new();
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
            .map(|d| d.format("%B %-d, %Y").to_string())
            .unwrap_or_else(|_| raw.to_string())
    }
}

// ─── Project lookup ─────────────────────────────────────────────────────────

/// Read access to stored projects. The relational store itself lives
/// outside this crate; generation only ever needs a lookup by id.
pub trait ProjectStore: Send + Sync {
    fn project(&self, id: i64) -> Result<Option<Project>>;
}

/// Projects held in memory, keyed by id.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: HashMap<i64, Project>,
}

impl MemoryProjectStore {
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        MemoryProjectStore {
            projects: projects.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

impl ProjectStore for MemoryProjectStore {
    fn project(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.projects.get(&id).cloned())
    }
}

/// A JSON array of projects on disk, re-read on every lookup so edits made
/// by the application owning the file are picked up without a restart.
#[derive(Debug, Clone)]
pub struct JsonProjectStore {
    path: PathBuf,
}

impl JsonProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonProjectStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_all(&self) -> Result<Vec<Project>> {
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read projects file: {}", self.path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Invalid projects file: {}", self.path.display()))
    }
}

impl ProjectStore for JsonProjectStore {
    fn project(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.load_all()?.into_iter().find(|p| p.id == id))
    }
}
