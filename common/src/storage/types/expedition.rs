use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// ISS expedition metadata, loaded from a JSON file maintained by hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expedition {
    pub number: u32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub crew: Vec<String>,
    pub patch_url: Option<String>,
}

pub fn load_expeditions(path: impl AsRef<Path>) -> Result<Vec<Expedition>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let expeditions: Vec<Expedition> = serde_json::from_str(&raw)?;
    Ok(expeditions)
}

/// Maps a post date to the expedition it fell in. During crew handover
/// two expeditions overlap; the later number wins.
pub fn map_date_to_expedition(date: NaiveDate, expeditions: &[Expedition]) -> Option<u32> {
    expeditions
        .iter()
        .filter(|e| e.start_date <= date && date <= e.end_date)
        .map(|e| e.number)
        .max()
}
