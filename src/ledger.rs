//! In-memory record of market weeks and served predictions.

use parking_lot::RwLock;
use std::cmp::Reverse;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::LedgerError;
use crate::types::{out_of_range, MarketWeek, PredictionRecord};

#[derive(Default)]
pub struct MarketLedger {
    weeks: RwLock<Vec<MarketWeek>>,
    predictions: RwLock<Vec<PredictionRecord>>,
}

fn check_week(w: &MarketWeek) -> Result<(), LedgerError> {
    match out_of_range(w.week, w.rainfall_mm, w.temperature_c) {
        Some(reason) => Err(LedgerError::InvalidWeek {
            week: w.week,
            year: w.year,
            reason,
        }),
        None => Ok(()),
    }
}

impl MarketLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a JSON array of market weeks. Later duplicates of a
    /// `(year, week)` pair are ignored. Rows that fail validation are logged
    /// and skipped; only an unreadable or unparseable file is an error.
    pub fn from_file(path: &Path) -> Result<Self, LedgerError> {
        let data = fs::read_to_string(path).map_err(|source| LedgerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let weeks: Vec<MarketWeek> = serde_json::from_str(&data).map_err(|source| LedgerError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let ledger = Self::new();
        let mut created = 0;
        let mut errors = 0;
        for w in weeks {
            match ledger.insert_week(w) {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("skipping row: {e}");
                    errors += 1;
                }
            }
        }
        info!(
            "loaded {} market weeks, {} errors from {}",
            created,
            errors,
            path.display()
        );
        Ok(ledger)
    }

    /// Insert unless the `(year, week)` pair already exists. Returns whether
    /// a new row was created.
    pub fn insert_week(&self, week: MarketWeek) -> Result<bool, LedgerError> {
        check_week(&week)?;
        let mut weeks = self.weeks.write();
        if weeks.iter().any(|w| w.year == week.year && w.week == week.week) {
            return Ok(false);
        }
        weeks.push(week);
        Ok(true)
    }

    /// All weeks, most recent first.
    pub fn weeks(&self) -> Vec<MarketWeek> {
        let mut weeks = self.weeks.read().clone();
        weeks.sort_by_key(|w| Reverse((w.year, w.week)));
        weeks
    }

    pub fn recent_weeks(&self, n: usize) -> Vec<MarketWeek> {
        let mut weeks = self.weeks();
        weeks.truncate(n);
        weeks
    }

    /// Weeks of `year` with `start <= week <= end`, in week order.
    pub fn weeks_between(&self, year: i32, start: u32, end: u32) -> Vec<MarketWeek> {
        let mut weeks: Vec<_> = self
            .weeks
            .read()
            .iter()
            .filter(|w| w.year == year && (start..=end).contains(&w.week))
            .cloned()
            .collect();
        weeks.sort_by_key(|w| w.week);
        weeks
    }

    pub fn week_count(&self) -> usize {
        self.weeks.read().len()
    }

    pub fn record_prediction(&self, record: PredictionRecord) {
        self.predictions.write().push(record);
    }

    /// All prediction records, newest first.
    pub fn predictions(&self) -> Vec<PredictionRecord> {
        let mut records = self.predictions.read().clone();
        records.sort_by_key(|r| Reverse(r.timestamp));
        records
    }
}
