//! Weather report with farming advice
//!
//! Conditions are fixed sample values; only the location and the forecast
//! dates vary.

use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;

pub const DEFAULT_LOCATION: &str = "Delhi";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: u32,
    pub wind_speed: f64,
    pub condition: String,
    pub rainfall: f64,
    pub uv_index: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub max_temp: f64,
    pub min_temp: f64,
    pub humidity: u32,
    pub rainfall: f64,
    pub condition: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub location: String,
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastDay>,
    pub farming_advice: Vec<String>,
}

/// (max temp, min temp, humidity, rainfall mm, condition) for today and the
/// next two days
const FORECAST: [(f64, f64, u32, f64, &str); 3] = [
    (32.0, 24.0, 70, 5.0, "Light Rain"),
    (30.0, 22.0, 75, 12.0, "Moderate Rain"),
    (29.0, 21.0, 80, 8.0, "Cloudy"),
];

const ADVICE: [&str; 3] = [
    "Good conditions for irrigation today",
    "Expected rainfall in next 2 days - delay watering",
    "High humidity may increase disease risk - monitor crops closely",
];

pub fn weather_for(location: Option<&str>) -> WeatherReport {
    let location = location
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCATION);
    let today = Utc::now().date_naive();

    let forecast = FORECAST
        .iter()
        .zip(0u64..)
        .map(|(&(max_temp, min_temp, humidity, rainfall, condition), offset)| ForecastDay {
            date: today.checked_add_days(Days::new(offset)).unwrap_or(today),
            max_temp,
            min_temp,
            humidity,
            rainfall,
            condition: condition.to_string(),
        })
        .collect();

    WeatherReport {
        location: location.to_string(),
        current: CurrentConditions {
            temperature: 28.0,
            humidity: 65,
            wind_speed: 12.0,
            condition: "Partly Cloudy".to_string(),
            rainfall: 0.0,
            uv_index: 6,
        },
        forecast,
        farming_advice: ADVICE.iter().map(|s| s.to_string()).collect(),
    }
}
