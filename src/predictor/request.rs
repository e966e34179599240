/// Request and response types for `POST /predict`.
use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date format accepted by the prediction service.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Weather conditions the service has a feature column for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weather {
    #[default]
    Clear,
    Cloudy,
    Rain,
    Fog,
}

impl Weather {
    /// Parse a weather name case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Some(Self::Clear),
            "cloudy" => Some(Self::Cloudy),
            "rain" | "rainy" => Some(Self::Rain),
            "fog" | "foggy" => Some(Self::Fog),
            _ => None,
        }
    }
}

impl std::fmt::Display for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clear => write!(f, "Clear"),
            Self::Cloudy => write!(f, "Cloudy"),
            Self::Rain => write!(f, "Rain"),
            Self::Fog => write!(f, "Fog"),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A validated prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub area_name: String,
    pub road_name: String,
    pub weather: Weather,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl PredictionRequest {
    /// Build a request from raw user input.
    ///
    /// `area` and `road` are required. Unknown weather is rejected; missing
    /// weather means [`Weather::Clear`]. A missing or unparseable date falls
    /// back to today's local date.
    pub fn new(area: &str, road: &str, weather: Option<&str>, date: Option<&str>) -> Result<Self> {
        let area_name = area.trim();
        let road_name = road.trim();
        if area_name.is_empty() {
            anyhow::bail!("missing required field: area_name");
        }
        if road_name.is_empty() {
            anyhow::bail!("missing required field: road_name");
        }

        let weather = match weather.map(str::trim).filter(|w| !w.is_empty()) {
            Some(raw) => Weather::parse(raw).ok_or_else(|| {
                anyhow::anyhow!("unknown weather '{raw}' (expected Clear, Cloudy, Rain or Fog)")
            })?,
            None => Weather::default(),
        };

        Ok(Self {
            area_name: area_name.to_string(),
            road_name: road_name.to_string(),
            weather,
            date: normalize_date(date).format(DATE_FORMAT).to_string(),
        })
    }
}

/// Parse `YYYY-MM-DD`, falling back to today.
pub fn normalize_date(date: Option<&str>) -> NaiveDate {
    date.and_then(|d| NaiveDate::parse_from_str(d.trim(), DATE_FORMAT).ok())
        .unwrap_or_else(|| Local::now().date_naive())
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// The service's answer. Request fields are echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub area_name: String,
    pub road_name: String,
    /// Echoed as sent; kept as a string since the service does not validate it.
    pub weather: String,
    pub date: String,
    pub traffic_volume: f64,
    pub travel_time_index: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
