//! Terminal dashboard: asks the API for recommendations and prints them.
//!
//! The response is read as loose JSON so a record with missing or oddly
//! typed fields still renders.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct AskConfig {
    pub api_url: String,
    pub budget: f64,
    pub seats: u32,
    pub timeout: Duration,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            budget: 30_000.0,
            seats: 5,
            timeout: Duration::from_secs(10),
        }
    }
}

/// What the API answered
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Cars(Vec<Value>),
    NoMatches(String),
}

pub async fn fetch(config: &AskConfig) -> Result<Answer> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let url = format!("{}/recommendations", config.api_url.trim_end_matches('/'));
    info!("Asking {} for cars under ${}", url, money(config.budget));
    let response = client
        .get(&url)
        .query(&[
            ("budget", config.budget.to_string()),
            ("min_seats", config.seats.to_string()),
        ])
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .context("API response was not JSON")?;
    interpret(status.as_u16(), body)
}

/// Turn a status and JSON body into an answer
pub fn interpret(status: u16, body: Value) -> Result<Answer> {
    if (200..300).contains(&status) {
        let cars = match body.get("recommendations") {
            Some(Value::Array(cars)) => cars.clone(),
            _ => Vec::new(),
        };
        return Ok(if cars.is_empty() {
            Answer::NoMatches("the API returned no recommendations".to_string())
        } else {
            Answer::Cars(cars)
        });
    }

    let code = body.get("error").and_then(Value::as_str).unwrap_or("unknown");
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string();
    if code == "no_matches" {
        return Ok(Answer::NoMatches(message));
    }
    bail!("API error {} ({}): {}", status, code, message)
}

/// One numbered entry, several lines, no trailing newline
pub fn render_car(index: usize, car: &Value) -> String {
    let text = |key: &str| field_text(car, key);
    let heading = match car.get("year").and_then(Value::as_i64) {
        Some(year) => format!("{} {} {}", year, text("make"), text("model")),
        None => format!("{} {}", text("make"), text("model")),
    };
    let price = car
        .get("predicted_price")
        .and_then(Value::as_f64)
        .map(|p| format!("${}", money(p)))
        .unwrap_or_else(|| "N/A".to_string());
    let kilometres = car
        .get("kilometres")
        .and_then(Value::as_f64)
        .map(|km| format!("{} km", thousands(km.round() as i64)))
        .unwrap_or_else(|| "N/A".to_string());
    let seats = car
        .get("seats")
        .and_then(Value::as_u64)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let mut out = format!("{}. {} ({})\n", index, heading, price);
    if let Some(title) = car.get("title").and_then(Value::as_str) {
        out.push_str(&format!("   {}\n", title));
    }
    out.push_str(&format!("   Seats: {}, Kilometres: {}\n", seats, kilometres));
    out.push_str(&format!("   URL: {}", text("url")));
    out
}

pub fn render(answer: &Answer) -> String {
    match answer {
        Answer::Cars(cars) => {
            let mut out = format!("✅ Found {} matching cars!\n\n", cars.len());
            for (i, car) in cars.iter().enumerate() {
                out.push_str(&render_car(i + 1, car));
                out.push_str("\n\n");
            }
            out
        }
        Answer::NoMatches(message) => format!(
            "No cars found matching your criteria ({}). Try adjusting your budget or seats.\n",
            message
        ),
    }
}

fn field_text(car: &Value, key: &str) -> String {
    let fallback = if key == "make" || key == "model" { "Unknown" } else { "N/A" };
    match car.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => fallback.to_string(),
    }
}

/// Two decimal places with thousands separators
fn money(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    format!("{}.{:02}", thousands(cents / 100), (cents % 100).abs())
}

fn thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}
