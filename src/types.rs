use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Demand level used both as an input (last week's demand) and as the
/// predicted/observed label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemandLevel {
    Low,
    Medium,
    High,
}

impl DemandLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DemandLevel::Low => "Low",
            DemandLevel::Medium => "Medium",
            DemandLevel::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(DemandLevel::Low),
            "Medium" => Some(DemandLevel::Medium),
            "High" => Some(DemandLevel::High),
            _ => None,
        }
    }

    /// Ordinal used by the charts: Low=1, Medium=2, High=3.
    pub fn rank(self) -> u8 {
        match self {
            DemandLevel::Low => 1,
            DemandLevel::Medium => 2,
            DemandLevel::High => 3,
        }
    }
}

impl fmt::Display for DemandLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DiseaseAlert {
    Presence,
    #[default]
    Absence,
}

/// Raw, human-readable inputs for one week.
///
/// `last_week_demand` and `month` stay strings: they are looked up in the
/// trained encoder vocabularies, which decide what is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub rainfall_mm: f64,
    pub temperature_c: f64,
    pub market_day: bool,
    pub school_open: bool,
    pub disease_alert: DiseaseAlert,
    pub last_week_demand: String,
    pub week: u32,
    pub month: String,
}

impl Observation {
    /// Range check on the numeric inputs. Vocabulary checks happen at encode
    /// time against the loaded encoders.
    pub fn validate(&self) -> Result<(), String> {
        match out_of_range(self.week, self.rainfall_mm, self.temperature_c) {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

pub(crate) fn out_of_range(week: u32, rainfall_mm: f64, temperature_c: f64) -> Option<String> {
    if !(1..=53).contains(&week) {
        Some("week must be between 1 and 53".to_string())
    } else if !(rainfall_mm >= 0.0) {
        Some(format!("rainfall {rainfall_mm} must be non-negative"))
    } else if !temperature_c.is_finite() {
        Some("temperature must be finite".to_string())
    } else {
        None
    }
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            rainfall_mm: 75.0,
            temperature_c: 22.0,
            market_day: true,
            school_open: true,
            disease_alert: DiseaseAlert::Absence,
            last_week_demand: "Medium".to_string(),
            week: 1,
            month: "January".to_string(),
        }
    }
}

/// One stored week of market data with its observed demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketWeek {
    pub week: u32,
    pub year: i32,
    pub month: String,
    pub rainfall_mm: f64,
    pub temperature_c: f64,
    #[serde(default)]
    pub market_day: bool,
    #[serde(default = "default_true")]
    pub school_open: bool,
    #[serde(default)]
    pub disease_alert: DiseaseAlert,
    pub last_week_demand: DemandLevel,
    pub market_demand: DemandLevel,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_true() -> bool {
    true
}

fn default_source() -> String {
    "manual_upload".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DemandTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl MarketWeek {
    pub fn is_high_demand(&self) -> bool {
        self.market_demand == DemandLevel::High
    }

    pub fn demand_trend(&self) -> DemandTrend {
        use std::cmp::Ordering;
        match self.market_demand.rank().cmp(&self.last_week_demand.rank()) {
            Ordering::Greater => DemandTrend::Increasing,
            Ordering::Less => DemandTrend::Decreasing,
            Ordering::Equal => DemandTrend::Stable,
        }
    }

    pub fn observation(&self) -> Observation {
        Observation {
            rainfall_mm: self.rainfall_mm,
            temperature_c: self.temperature_c,
            market_day: self.market_day,
            school_open: self.school_open,
            disease_alert: self.disease_alert,
            last_week_demand: self.last_week_demand.as_str().to_string(),
            week: self.week,
            month: self.month.clone(),
        }
    }
}

/// Audit entry for one served prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub timestamp: DateTime<Utc>,
    pub week: u32,
    pub year: i32,
    pub predicted_demand: DemandLevel,
    pub confidence_score: f64,
    pub rainfall_mm: Option<f64>,
    pub temperature_c: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(last: DemandLevel, now: DemandLevel) -> MarketWeek {
        MarketWeek {
            week: 3,
            year: 2025,
            month: "January".into(),
            rainfall_mm: 10.0,
            temperature_c: 20.0,
            market_day: false,
            school_open: true,
            disease_alert: DiseaseAlert::Absence,
            last_week_demand: last,
            market_demand: now,
            source: "test".into(),
        }
    }

    #[test]
    fn trend_follows_demand_rank() {
        assert_eq!(week(DemandLevel::Low, DemandLevel::High).demand_trend(), DemandTrend::Increasing);
        assert_eq!(week(DemandLevel::High, DemandLevel::Medium).demand_trend(), DemandTrend::Decreasing);
        assert_eq!(week(DemandLevel::Medium, DemandLevel::Medium).demand_trend(), DemandTrend::Stable);
    }

    #[test]
    fn observation_ranges() {
        assert!(Observation::default().validate().is_ok());
        let bad = Observation {
            rainfall_mm: -500.0,
            ..Observation::default()
        };
        assert!(bad.validate().unwrap_err().contains("rainfall"));
        let bad = Observation {
            week: 0,
            ..Observation::default()
        };
        assert!(bad.validate().unwrap_err().contains("week"));
        let bad = Observation {
            temperature_c: f64::NAN,
            ..Observation::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn market_week_defaults_from_json() {
        let w: MarketWeek = serde_json::from_str(
            r#"{"week":4,"year":2025,"month":"January","rainfall_mm":12.5,"temperature_c":19.0,
                "last_week_demand":"Low","market_demand":"High"}"#,
        )
        .unwrap();
        assert!(w.school_open);
        assert!(!w.market_day);
        assert_eq!(w.disease_alert, DiseaseAlert::Absence);
        assert_eq!(w.source, "manual_upload");
        assert!(w.is_high_demand());
        assert_eq!(w.observation().last_week_demand, "Low");
    }
}
