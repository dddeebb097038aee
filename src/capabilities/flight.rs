use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use super::{extract_params, CapabilityHandler};
use crate::providers::flights::{FlightOption, FlightQuery};
use crate::providers::{FlightsProvider, LLMProvider};
use crate::types::{CapabilityKind, Message, Session};

const EXTRACT_PROMPT: &str = "\
You extract flight-search parameters from a travel conversation. \
Respond with only a JSON object: \
{\"from\": \"<IATA code>\", \"to\": \"<IATA code>\", \"date\": \"YYYY-MM-DD\", \
\"adults\": 1, \"cabin\": \"economy\"}. \
Both airports and the date must come from the conversation; never invent them.";

pub struct FlightHandler {
    llm: Arc<dyn LLMProvider>,
    flights: Arc<dyn FlightsProvider>,
}

fn default_adults() -> u32 {
    1
}

fn default_cabin() -> String {
    "economy".to_string()
}

#[derive(Debug, Deserialize)]
struct FlightParams {
    from: String,
    to: String,
    date: String,
    #[serde(default = "default_adults")]
    adults: u32,
    #[serde(default = "default_cabin")]
    cabin: String,
}

impl FlightHandler {
    pub fn new(llm: Arc<dyn LLMProvider>, flights: Arc<dyn FlightsProvider>) -> Self {
        Self { llm, flights }
    }

    async fn run(&self, session: &Session) -> Result<String> {
        let params: FlightParams =
            extract_params(self.llm.as_ref(), EXTRACT_PROMPT, session).await?;

        let from = normalize_iata(&params.from)?;
        let to = normalize_iata(&params.to)?;
        let date = NaiveDate::parse_from_str(&params.date, "%Y-%m-%d")
            .with_context(|| format!("invalid travel date '{}'", params.date))?;

        let query = FlightQuery {
            from,
            to,
            date,
            adults: params.adults,
            cabin: params.cabin,
            currency: "USD".to_string(),
        };
        let flights = self.flights.search(&query).await?;
        if flights.is_empty() {
            anyhow::bail!("no flights found from {} to {} on {}", query.from, query.to, date);
        }

        let lis: String = flights.iter().map(render_flight).collect();
        Ok(format!("<ul>{}</ul>", lis))
    }
}

fn normalize_iata(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(anyhow!("'{}' is not a valid IATA airport code", code));
    }
    Ok(code)
}

#[async_trait]
impl CapabilityHandler for FlightHandler {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Flight
    }

    async fn handle(&self, session: &Session) -> Message {
        match self.run(session).await {
            Ok(content) => Message::capability(self.kind(), content),
            Err(e) => {
                log::warn!("flight handler failed: {e:#}");
                Message::failure(self.kind(), format!("Could not search flights: {e}"))
            }
        }
    }
}

fn render_flight(f: &FlightOption) -> String {
    let mut parts = vec![
        format!(
            "<b>{}</b>{}",
            html_escape::encode_text(f.airline.as_deref().unwrap_or("Unknown airline")),
            f.flight_code
                .as_deref()
                .map(|c| format!(" ({})", html_escape::encode_text(c)))
                .unwrap_or_default()
        ),
        format!(
            "From: {} at {}",
            html_escape::encode_text(f.departure_city.as_deref().unwrap_or("unknown")),
            f.departure_time.as_deref().unwrap_or("unknown")
        ),
        format!(
            "To: {} at {}",
            html_escape::encode_text(f.arrival_city.as_deref().unwrap_or("unknown")),
            f.arrival_time.as_deref().unwrap_or("unknown")
        ),
        format!(
            "Stops: {}, Cabin: {}",
            html_escape::encode_text(&f.stops),
            html_escape::encode_text(&f.cabin_type)
        ),
    ];
    if let Some(duration) = &f.duration {
        parts.push(format!("Duration: {}", html_escape::encode_text(duration)));
    }
    if !f.intermediate_stops.is_empty() {
        let stops: Vec<String> = f
            .intermediate_stops
            .iter()
            .map(|s| {
                format!(
                    "{}{}",
                    html_escape::encode_text(&s.airport),
                    s.duration_minutes
                        .map(|m| format!(" ({} min)", m))
                        .unwrap_or_default()
                )
            })
            .collect();
        parts.push(format!("Via: {}", stops.join(", ")));
    }
    parts.push(format!(
        "Fare: {}",
        f.price
            .map(|p| format!("{} {}", p, f.currency.as_deref().unwrap_or("")))
            .unwrap_or_else(|| "n/a".to_string())
    ));
    format!("<li>{}</li>", parts.join("<br>"))
}
