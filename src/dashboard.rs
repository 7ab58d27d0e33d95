//! Response shaping for the dashboard cards and charts.
//!
//! Everything here is a pure function of ledger snapshots (weeks and
//! prediction records, newest first) and the clock, except the two views that
//! run the predictor.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::PredictionError;
use crate::predictor::Predictor;
use crate::types::{DemandLevel, DemandTrend, DiseaseAlert, MarketWeek, Observation, PredictionRecord};

const FALLBACK_ACCURACY_PCT: i64 = 95;
const PLAY_SPEED_MS: u32 = 500;

// Halves round to even.
fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// `1234567` -> `"1,234,567"`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn percent_change(current: usize, previous: usize) -> String {
    if previous == 0 {
        return "+0%".to_string();
    }
    let pct = (current as f64 - previous as f64) / previous as f64 * 100.0;
    format!("{pct:+.0}%")
}

fn trend_of(change: &str) -> &'static str {
    if change.contains('+') {
        "up"
    } else {
        "down"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DemandCounts {
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "Low")]
    pub low: usize,
}

impl DemandCounts {
    pub fn tally<'a>(levels: impl IntoIterator<Item = &'a DemandLevel>) -> Self {
        let mut counts = Self::default();
        for level in levels {
            match level {
                DemandLevel::High => counts.high += 1,
                DemandLevel::Medium => counts.medium += 1,
                DemandLevel::Low => counts.low += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

// ---------- Current week ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentWeek {
    pub week: u32,
    pub predicted_demand: String,
    pub confidence: f64,
    pub status_color: &'static str,
    pub confidence_percentage: String,
}

/// Prediction for this ISO week using the dashboard's default conditions.
pub fn current_week(predictor: &Predictor, now: DateTime<Utc>) -> Result<CurrentWeek, PredictionError> {
    let week = now.iso_week().week();
    let obs = Observation {
        rainfall_mm: 75.0,
        temperature_c: 23.0,
        market_day: true,
        school_open: true,
        disease_alert: DiseaseAlert::Absence,
        last_week_demand: DemandLevel::Medium.as_str().to_string(),
        week,
        month: now.format("%B").to_string(),
    };

    let p = predictor.predict(&obs)?;
    let status_color = match DemandLevel::parse(&p.label) {
        Some(DemandLevel::High) => "red",
        Some(DemandLevel::Medium) => "orange",
        Some(DemandLevel::Low) => "green",
        None => {
            return Err(PredictionError::Classifier(format!(
                "unexpected demand label {:?}",
                p.label
            )))
        }
    };

    Ok(CurrentWeek {
        week,
        confidence: round2(p.confidence),
        confidence_percentage: format!("{}%", (p.confidence * 100.0) as i64),
        predicted_demand: p.label,
        status_color,
    })
}

// ---------- Metric cards ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub value: String,
    pub change: String,
    pub trend: &'static str,
    pub label: &'static str,
}

impl Card {
    fn new(value: String, change: String, label: &'static str) -> Self {
        let trend = trend_of(&change);
        Self {
            value,
            change,
            trend,
            label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardCards {
    pub total_predictions: Card,
    pub weekly_predictions: Card,
    pub model_performance: Card,
    pub high_demand_weeks: Card,
}

fn count_between(records: &[PredictionRecord], from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> usize {
    records
        .iter()
        .filter(|r| r.timestamp >= from && to.map_or(true, |t| r.timestamp < t))
        .count()
}

/// The four headline cards. `accuracy` is the loaded model's accuracy as a
/// fraction, when a model is loaded.
pub fn dashboard_cards(records: &[PredictionRecord], accuracy: Option<f64>, now: DateTime<Utc>) -> DashboardCards {
    let week_ago = now - Duration::days(7);
    let two_weeks_ago = now - Duration::days(14);
    let weekly = count_between(records, week_ago, None);
    let prev_weekly = count_between(records, two_weeks_ago, Some(week_ago));

    let month_ago = now - Duration::days(30);
    let two_months_ago = now - Duration::days(60);
    let last_month = count_between(records, month_ago, None);
    let prev_month = count_between(records, two_months_ago, Some(month_ago));

    let accuracy_pct = accuracy
        .map(|a| (a * 100.0).round() as i64)
        .unwrap_or(FALLBACK_ACCURACY_PCT);
    let high = records
        .iter()
        .filter(|r| r.predicted_demand == DemandLevel::High)
        .count();

    DashboardCards {
        total_predictions: Card::new(
            group_thousands(records.len()),
            percent_change(last_month, prev_month),
            "TOTAL PREDICTIONS",
        ),
        weekly_predictions: Card::new(
            group_thousands(weekly),
            percent_change(weekly, prev_weekly),
            "THIS WEEK",
        ),
        // accuracy history and high-demand history are not tracked
        model_performance: Card::new(format!("{accuracy_pct}%"), "+0%".to_string(), "ACCURACY"),
        high_demand_weeks: Card::new(group_thousands(high), "+0%".to_string(), "HIGH DEMAND"),
    }
}

// ---------- Trend chart ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub week: String,
    pub demand_level: DemandLevel,
    pub demand_value: u8,
    pub rainfall: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub trend_data: Vec<ChartPoint>,
    pub demand_distribution: DemandCounts,
    pub total_weeks: usize,
}

/// Up to the 12 most recent weeks, oldest first.
pub fn chart_data(weeks_newest_first: &[MarketWeek]) -> ChartData {
    let recent: Vec<&MarketWeek> = weeks_newest_first.iter().take(12).rev().collect();
    let trend_data: Vec<ChartPoint> = recent
        .iter()
        .map(|w| ChartPoint {
            week: format!("W{}", w.week),
            demand_level: w.market_demand,
            demand_value: w.market_demand.rank(),
            rainfall: w.rainfall_mm,
            temperature: w.temperature_c,
        })
        .collect();

    ChartData {
        demand_distribution: DemandCounts::tally(recent.iter().map(|w| &w.market_demand)),
        total_weeks: trend_data.len(),
        trend_data,
    }
}

// ---------- Simulation ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationFrame {
    pub week: u32,
    pub month: String,
    pub predicted_demand: String,
    pub actual_demand: DemandLevel,
    pub confidence: f64,
    #[serde(rename = "match")]
    pub matches: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub frames: Vec<SimulationFrame>,
    pub total_frames: usize,
    pub play_speed: u32,
}

/// Replay stored weeks through the model. Weeks that cannot be predicted are
/// left out of the playback.
pub fn simulate(predictor: &Predictor, weeks_in_order: &[MarketWeek]) -> Simulation {
    let frames: Vec<SimulationFrame> = weeks_in_order
        .iter()
        .filter_map(|w| match predictor.predict(&w.observation()) {
            Ok(p) => Some(SimulationFrame {
                week: w.week,
                month: w.month.clone(),
                matches: p.label == w.market_demand.as_str(),
                predicted_demand: p.label,
                actual_demand: w.market_demand,
                confidence: round2(p.confidence),
            }),
            Err(e) => {
                debug!("skipping week {}/{} in simulation: {}", w.week, w.year, e);
                None
            }
        })
        .collect();

    Simulation {
        total_frames: frames.len(),
        frames,
        play_speed: PLAY_SPEED_MS,
    }
}

// ---------- Status cards ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherCard {
    pub status: &'static str,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCard {
    pub status: &'static str,
    pub details: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disease_alert: Option<DiseaseAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCards {
    pub weather: WeatherCard,
    pub health: HealthCard,
}

pub fn status_cards(latest: Option<&MarketWeek>) -> StatusCards {
    let Some(w) = latest else {
        return StatusCards {
            weather: WeatherCard {
                status: "No data",
                details: "Weather data unavailable".to_string(),
                color: None,
                temperature: None,
                rainfall: None,
            },
            health: HealthCard {
                status: "No data",
                details: "Health data unavailable",
                color: None,
                disease_alert: None,
            },
        };
    };

    let (status, color) = if w.temperature_c > 30.0 {
        ("Hot", "#ef4444")
    } else if w.temperature_c < 15.0 {
        ("Cold", "#3b82f6")
    } else {
        ("Moderate", "#10b981")
    };

    let health = match w.disease_alert {
        DiseaseAlert::Presence => HealthCard {
            status: "Disease Alert",
            details: "Disease detected in area",
            color: Some("#ef4444"),
            disease_alert: Some(w.disease_alert),
        },
        DiseaseAlert::Absence => HealthCard {
            status: "Healthy",
            details: "No disease reported",
            color: Some("#10b981"),
            disease_alert: Some(w.disease_alert),
        },
    };

    StatusCards {
        weather: WeatherCard {
            status,
            details: format!("{:.1}°C, {:.1}mm rain", w.temperature_c, w.rainfall_mm),
            color: Some(color),
            temperature: Some(w.temperature_c),
            rainfall: Some(w.rainfall_mm),
        },
        health,
    }
}

// ---------- Market insights donut ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: &'static str,
    pub value: i64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketInsights {
    pub chart_type: &'static str,
    pub title: &'static str,
    pub data: Vec<Slice>,
    pub center_text: String,
    pub center_label: &'static str,
}

/// Demand mix of the 20 most recent weeks, in whole percent.
pub fn market_insights(weeks_newest_first: &[MarketWeek]) -> MarketInsights {
    let mut counts = DemandCounts::tally(weeks_newest_first.iter().take(20).map(|w| &w.market_demand));
    if counts.total() == 0 {
        counts = DemandCounts {
            high: 30,
            medium: 50,
            low: 20,
        };
    }
    let total = counts.total() as f64;
    let pct = |n: usize| (n as f64 / total * 100.0).round_ties_even() as i64;
    let high = pct(counts.high);

    MarketInsights {
        chart_type: "donut",
        title: "Demand Distribution",
        data: vec![
            Slice {
                label: "High Demand",
                value: high,
                color: "#ef4444",
            },
            Slice {
                label: "Medium Demand",
                value: pct(counts.medium),
                color: "#f59e0b",
            },
            Slice {
                label: "Low Demand",
                value: pct(counts.low),
                color: "#10b981",
            },
        ],
        center_text: format!("{high}%"),
        center_label: "High Demand",
    }
}

// ---------- Business insights ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessInsights {
    pub current_profit_potential: &'static str,
    pub weekly_revenue_estimate: &'static str,
    pub best_selling_days: &'static str,
    pub market_trend: &'static str,
    pub insights: Vec<String>,
}

pub fn business_insights(weeks_newest_first: &[MarketWeek]) -> BusinessInsights {
    let recent = &weeks_newest_first[..weeks_newest_first.len().min(12)];
    if recent.is_empty() {
        return BusinessInsights {
            current_profit_potential: "Medium",
            weekly_revenue_estimate: "450,000",
            best_selling_days: "Tuesday, Friday",
            market_trend: "Stable",
            insights: vec![
                "High demand expected next week".to_string(),
                "Market day sales up 15%".to_string(),
                "Weather conditions favorable".to_string(),
            ],
        };
    }

    let high_weeks = recent.iter().filter(|w| w.is_high_demand()).count();
    let market_days = recent.iter().filter(|w| w.market_day).count();

    let (potential, revenue) = match high_weeks {
        n if n >= 4 => ("High", "650,000"),
        n if n >= 2 => ("Medium", "450,000"),
        _ => ("Low", "280,000"),
    };

    let trend = match recent.iter().take(3).filter(|w| w.is_high_demand()).count() {
        n if n >= 2 => "Growing",
        1 => "Stable",
        _ => "Declining",
    };

    BusinessInsights {
        current_profit_potential: potential,
        weekly_revenue_estimate: revenue,
        best_selling_days: if market_days > 6 {
            "Tuesday, Friday"
        } else {
            "Friday, Saturday"
        },
        market_trend: trend,
        insights: vec![
            format!("{high_weeks} high-demand weeks recorded"),
            format!("Market days show {market_days}/12 activity"),
            format!("Trend is {} this month", trend.to_lowercase()),
        ],
    }
}

// ---------- Agricultural tips ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tip {
    pub icon: &'static str,
    pub text: String,
    pub priority: Priority,
}

impl Tip {
    fn new(icon: &'static str, text: impl Into<String>, priority: Priority) -> Self {
        Self {
            icon,
            text: text.into(),
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tips {
    pub tips: Vec<Tip>,
    pub last_updated: String,
    pub data_source: &'static str,
}

/// Up to four tips, most urgent first, from the latest week and the recent
/// prediction history.
pub fn agricultural_tips(
    latest: Option<&MarketWeek>,
    predictions_newest_first: &[PredictionRecord],
    now: DateTime<Utc>,
) -> Tips {
    let mut tips = vec![
        Tip::new("💡", "Plant tomatoes during dry season for better yields", Priority::High),
        Tip::new("🌱", "Use organic fertilizers to improve soil health", Priority::Medium),
    ];

    if let Some(w) = latest {
        // zero readings are treated as missing
        if w.temperature_c != 0.0 {
            if w.temperature_c > 25.0 {
                tips.push(Tip::new(
                    "🌡️",
                    format!("High temperature ({:.1}°C) - increase irrigation frequency", w.temperature_c),
                    Priority::High,
                ));
            } else if w.temperature_c < 20.0 {
                tips.push(Tip::new(
                    "❄️",
                    "Cool weather detected - protect young plants from cold",
                    Priority::Medium,
                ));
            }
        }
        if w.rainfall_mm != 0.0 {
            if w.rainfall_mm > 100.0 {
                tips.push(Tip::new("🌧️", "Heavy rainfall detected - ensure proper drainage", Priority::High));
            } else if w.rainfall_mm < 20.0 {
                tips.push(Tip::new(
                    "💧",
                    "Low rainfall - implement water conservation techniques",
                    Priority::High,
                ));
            }
        }
        if w.disease_alert == DiseaseAlert::Presence {
            tips.push(Tip::new(
                "🦠",
                "Disease alert active - apply preventive treatments immediately",
                Priority::Critical,
            ));
        }
    }

    let high_recent = predictions_newest_first
        .iter()
        .filter(|r| r.predicted_demand == DemandLevel::High)
        .take(10)
        .count();
    if high_recent >= 3 {
        tips.push(Tip::new(
            "📈",
            format!("High demand trend ({high_recent}/10 weeks) - consider expanding production"),
            Priority::High,
        ));
    } else if high_recent <= 1 {
        tips.push(Tip::new("📉", "Low demand period - focus on quality over quantity", Priority::Medium));
    }

    let last_ten = &predictions_newest_first[..predictions_newest_first.len().min(10)];
    let avg_confidence = if last_ten.is_empty() {
        0.5
    } else {
        last_ten.iter().map(|r| r.confidence_score).sum::<f64>() / last_ten.len() as f64
    };
    if avg_confidence > 0.8 {
        tips.push(Tip::new(
            "🎯",
            format!(
                "High prediction confidence ({}%) - good time for planning",
                (avg_confidence * 100.0) as i64
            ),
            Priority::Medium,
        ));
    }

    // stable: ties keep insertion order
    tips.sort_by_key(|t| t.priority);
    tips.truncate(4);

    Tips {
        tips,
        last_updated: now.to_rfc3339(),
        data_source: "real_time_analysis",
    }
}

// ---------- Market history ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryWeek {
    pub week: u32,
    pub year: i32,
    pub actual_demand: DemandLevel,
    pub month: String,
    pub trend: DemandTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketHistory {
    pub total_weeks_available: usize,
    pub demand_breakdown: BTreeMap<&'static str, usize>,
    pub recent_weeks: Vec<HistoryWeek>,
}

pub fn market_history(weeks_newest_first: &[MarketWeek]) -> MarketHistory {
    let mut breakdown = BTreeMap::new();
    for w in weeks_newest_first {
        *breakdown.entry(w.market_demand.as_str()).or_insert(0) += 1;
    }

    MarketHistory {
        total_weeks_available: weeks_newest_first.len(),
        demand_breakdown: breakdown,
        recent_weeks: weeks_newest_first
            .iter()
            .take(10)
            .map(|w| HistoryWeek {
                week: w.week,
                year: w.year,
                actual_demand: w.market_demand,
                month: w.month.clone(),
                trend: w.demand_trend(),
            })
            .collect(),
    }
}
