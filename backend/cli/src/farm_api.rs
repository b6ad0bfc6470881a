//! Farm assistant API client: chat, weather advice, and market prices.
//!
//! Each call is a single request. Whatever goes wrong, the user sees one
//! fixed message per feature; the cause goes to the log.

use anyhow::Result;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub const CHAT_UNAVAILABLE: &str =
    "Sorry, I couldn't connect to the server. Please make sure the API is running.";
pub const WEATHER_UNAVAILABLE: &str =
    "Failed to get weather data. Please ensure the API server is running.";
pub const MARKET_UNAVAILABLE: &str =
    "Failed to get market price. Please ensure the API server is running.";

/// Crops offered as quick picks for price lookups.
pub const POPULAR_CROPS: [&str; 6] = ["Wheat", "Rice", "Corn", "Soybean", "Cotton", "Sugarcane"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FarmApiError {
    #[error("please enter {0}")]
    EmptyInput(&'static str),

    #[error("{0}")]
    Unavailable(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherAdvice {
    pub city: String,
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketQuote {
    pub crop: String,
    pub price: String,
}

pub struct FarmApi {
    http: reqwest::Client,
    base_url: String,
}

impl FarmApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `POST /chat` and return the assistant's reply.
    pub async fn chat(&self, message: &str) -> Result<String, FarmApiError> {
        let message = non_blank(message, "a message")?;
        let request = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(&json!({ "message": message }));

        let data = fetch_json(request)
            .await
            .map_err(|e| unavailable("chat", e, CHAT_UNAVAILABLE))?;
        Ok(first_text(&data, &["response", "message"]))
    }

    /// `GET /weather?city=` and return farming advice for that city.
    pub async fn weather(&self, city: &str) -> Result<WeatherAdvice, FarmApiError> {
        let city = non_blank(city, "a city name")?;
        let request = self
            .http
            .get(format!("{}/weather", self.base_url))
            .query(&[("city", city)]);

        let data = fetch_json(request)
            .await
            .map_err(|e| unavailable("weather", e, WEATHER_UNAVAILABLE))?;
        Ok(WeatherAdvice {
            city: city.to_string(),
            advice: first_text(&data, &["advice", "message", "weather"]),
        })
    }

    /// `GET /market/price?crop=` and return the quoted or predicted price.
    pub async fn market_price(&self, crop: &str) -> Result<MarketQuote, FarmApiError> {
        let crop = non_blank(crop, "a crop name")?;
        let request = self
            .http
            .get(format!("{}/market/price", self.base_url))
            .query(&[("crop", crop)]);

        let data = fetch_json(request)
            .await
            .map_err(|e| unavailable("market", e, MARKET_UNAVAILABLE))?;
        Ok(MarketQuote {
            crop: crop.to_string(),
            price: first_text(&data, &["price", "predicted_price", "value"]),
        })
    }
}

fn non_blank<'a>(input: &'a str, what: &'static str) -> Result<&'a str, FarmApiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err(FarmApiError::EmptyInput(what))
    } else {
        Ok(trimmed)
    }
}

fn unavailable(feature: &str, err: anyhow::Error, message: &'static str) -> FarmApiError {
    warn!(feature, error = %err, "Farm API call failed");
    FarmApiError::Unavailable(message)
}

async fn fetch_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await?.error_for_status()?;
    let data: Value = response.json().await?;
    debug!(body = %data, "Farm API response");
    Ok(data)
}

/// First usable value among `keys`, else the whole body as JSON text.
///
/// Empty strings, zero, false and null are skipped.
pub fn first_text(data: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| data.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            Value::Array(_) | Value::Object(_) => Some(value.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| data.to_string())
}
