use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::{extract_params, CapabilityHandler};
use crate::providers::geocode::GeoPoint;
use crate::providers::weather::WeatherReport;
use crate::providers::{GeocodeProvider, LLMProvider, WeatherProvider};
use crate::types::{CapabilityKind, Message, Session};

const EXTRACT_PROMPT: &str = "\
You extract the city the user wants weather for from a travel conversation. \
Respond with only a JSON object: {\"city\": \"<city name>\"}";

/// Current-weather expert. Always includes latitude/longitude in its output,
/// like every location-producing handler.
pub struct WeatherHandler {
    llm: Arc<dyn LLMProvider>,
    weather: Arc<dyn WeatherProvider>,
    geocode: Arc<dyn GeocodeProvider>,
}

#[derive(Debug, Deserialize)]
struct WeatherParams {
    city: String,
}

impl WeatherHandler {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        weather: Arc<dyn WeatherProvider>,
        geocode: Arc<dyn GeocodeProvider>,
    ) -> Self {
        Self {
            llm,
            weather,
            geocode,
        }
    }

    async fn run(&self, session: &Session) -> Result<String> {
        let params: WeatherParams =
            extract_params(self.llm.as_ref(), EXTRACT_PROMPT, session).await?;
        let report = self.weather.current(&params.city).await?;
        let point = self.geocode.lookup(&params.city).await?.point;
        Ok(render(&report, point))
    }
}

#[async_trait]
impl CapabilityHandler for WeatherHandler {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Weather
    }

    async fn handle(&self, session: &Session) -> Message {
        match self.run(session).await {
            Ok(content) => Message::capability(self.kind(), content),
            Err(e) => {
                log::warn!("weather handler failed: {e:#}");
                Message::failure(self.kind(), format!("Could not fetch the weather: {e}"))
            }
        }
    }
}

fn render(report: &WeatherReport, point: GeoPoint) -> String {
    let mut items = vec![
        format!(
            "City: {}{}",
            html_escape::encode_text(&report.city),
            report
                .country
                .as_deref()
                .map(|c| format!(", {}", html_escape::encode_text(c)))
                .unwrap_or_default()
        ),
        format!(
            "Conditions: {}",
            html_escape::encode_text(report.description.as_deref().unwrap_or("unknown"))
        ),
        format!(
            "Temperature: {:.1}&deg;C (feels like {:.1}&deg;C, min {:.1}&deg;C, max {:.1}&deg;C)",
            report.temperature_c, report.feels_like_c, report.temp_min_c, report.temp_max_c
        ),
        format!(
            "Humidity: {}%, Pressure: {} hPa",
            report.humidity_pct, report.pressure_hpa
        ),
        format!(
            "Wind: {:.1} m/s{}",
            report.wind_speed_mps,
            report
                .wind_deg
                .map(|d| format!(" from {}&deg;", d))
                .unwrap_or_default()
        ),
        format!(
            "Visibility: {}, Cloud coverage: {}%",
            report
                .visibility_m
                .map(|v| format!("{} m", v))
                .unwrap_or_else(|| "unknown".to_string()),
            report.cloud_coverage_pct
        ),
    ];
    if let (Some(sunrise), Some(sunset)) = (report.sunrise_utc, report.sunset_utc) {
        items.push(format!("Sunrise (UTC): {}, Sunset (UTC): {}", sunrise, sunset));
    }
    items.push(format!(
        "Latitude: {}, Longitude: {}",
        point.latitude, point.longitude
    ));

    let lis: String = items
        .into_iter()
        .map(|item| format!("<li>{}</li>", item))
        .collect();
    format!("<ul>{}</ul>", lis)
}
