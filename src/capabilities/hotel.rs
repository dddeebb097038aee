use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

use super::{extract_params, CapabilityHandler};
use crate::providers::hotels::{HotelListing, HotelQuery};
use crate::providers::{GeocodeProvider, HotelsProvider, LLMProvider};
use crate::types::{CapabilityKind, Message, Session};

const EXTRACT_PROMPT: &str = "\
You extract hotel-search parameters from a travel conversation. \
Respond with only a JSON object: \
{\"location\": \"<area or city>\", \"arrival_date\": \"YYYY-MM-DD or null\", \
\"departure_date\": \"YYYY-MM-DD or null\", \"star_rating\": \"<comma-separated classes, e.g. 3,4,5>\", \
\"room_qty\": 1, \"guest_qty\": 1, \"currency\": \"USD\"}. \
Use null for dates the user did not give. If an earlier geolocation answer in \
the conversation names the place, reuse its wording for the location.";

const RENDER_LIMIT: usize = 10;

/// Hotel expert. Resolves the location to a bounding box first (so a bare
/// place name is enough), then searches within it and reports listings
/// ordered by distance from the center.
pub struct HotelHandler {
    llm: Arc<dyn LLMProvider>,
    hotels: Arc<dyn HotelsProvider>,
    geocode: Arc<dyn GeocodeProvider>,
}

fn default_star_rating() -> String {
    "3,4,5".to_string()
}

fn default_qty() -> u32 {
    1
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize)]
struct HotelParams {
    location: String,
    arrival_date: Option<String>,
    departure_date: Option<String>,
    #[serde(default = "default_star_rating")]
    star_rating: String,
    #[serde(default = "default_qty")]
    room_qty: u32,
    #[serde(default = "default_qty")]
    guest_qty: u32,
    #[serde(default = "default_currency")]
    currency: String,
}

impl HotelHandler {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        hotels: Arc<dyn HotelsProvider>,
        geocode: Arc<dyn GeocodeProvider>,
    ) -> Self {
        Self {
            llm,
            hotels,
            geocode,
        }
    }

    async fn run(&self, session: &Session) -> Result<String> {
        let params: HotelParams =
            extract_params(self.llm.as_ref(), EXTRACT_PROMPT, session).await?;

        let today = Utc::now().date_naive();
        let arrival_date = parse_date(params.arrival_date.as_deref())?.unwrap_or(today);
        let departure_date =
            parse_date(params.departure_date.as_deref())?.unwrap_or(arrival_date + Duration::days(1));

        let star_ratings: Vec<u8> = params
            .star_rating
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        let place = self.geocode.lookup(&params.location).await?;
        let query = HotelQuery {
            bbox: place.bounding_box,
            arrival_date,
            departure_date,
            star_ratings,
            room_qty: params.room_qty,
            guest_qty: params.guest_qty,
            currency: params.currency,
        };

        let listings = self.hotels.search(&query).await?;
        if listings.is_empty() {
            anyhow::bail!("no hotels found near {}", params.location);
        }

        let lis: String = listings
            .iter()
            .take(RENDER_LIMIT)
            .map(|h| render_listing(h, arrival_date, departure_date))
            .collect();
        Ok(format!("<ul>{}</ul>", lis))
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value {
        None | Some("null") | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .with_context(|| format!("invalid date '{}'", s)),
    }
}

#[async_trait]
impl CapabilityHandler for HotelHandler {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Hotel
    }

    async fn handle(&self, session: &Session) -> Message {
        match self.run(session).await {
            Ok(content) => Message::capability(self.kind(), content),
            Err(e) => {
                log::warn!("hotel handler failed: {e:#}");
                Message::failure(self.kind(), format!("Could not search hotels: {e}"))
            }
        }
    }
}

fn render_listing(h: &HotelListing, arrival: NaiveDate, departure: NaiveDate) -> String {
    let mut parts = vec![
        format!(
            "<b>{}</b> ({}-star)",
            html_escape::encode_text(&h.name),
            h.star_rating
        ),
        format!(
            "Review: {}{}",
            h.review_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
            h.review_word
                .as_deref()
                .map(|w| format!(" ({}, {} reviews)", w, h.review_count.unwrap_or(0)))
                .unwrap_or_default()
        ),
        format!(
            "Address: {}{}",
            html_escape::encode_text(h.address.as_deref().unwrap_or("unknown")),
            h.city
                .as_deref()
                .map(|c| format!(", {}", html_escape::encode_text(c)))
                .unwrap_or_default()
        ),
        format!("Latitude: {}, Longitude: {}", h.latitude, h.longitude),
        format!(
            "Price per night: {}",
            h.price_per_night
                .map(|p| format!("{} {}", p, h.currency))
                .unwrap_or_else(|| "n/a".to_string())
        ),
        format!("Stay: {} to {}", arrival, departure),
        format!("Distance from center: {} km", h.distance_km),
    ];
    if h.is_free_cancellable {
        parts.push("Free cancellation".to_string());
    }
    if let Some(url) = &h.booking_url {
        let escaped = html_escape::encode_double_quoted_attribute(url);
        parts.push(format!("<a href=\"{}\">Book</a>", escaped));
    }
    format!("<li>{}</li>", parts.join("<br>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::geocode::MockGeocodeProvider;
    use crate::providers::hotels::MockHotelsProvider;
    use crate::providers::llm::MockLLMProvider;

    fn handler_with(
        llm_response: &str,
        hotels: MockHotelsProvider,
        geocode: MockGeocodeProvider,
    ) -> HotelHandler {
        HotelHandler::new(
            Arc::new(MockLLMProvider::with_response(llm_response)),
            Arc::new(hotels),
            Arc::new(geocode),
        )
    }

    #[tokio::test]
    async fn test_success_lists_hotels_with_coordinates() {
        let session = Session::new("3-star hotels near Koramangala");
        let message = handler_with(
            r#"{"location": "Koramangala, Bangalore", "arrival_date": "2025-07-05",
                "departure_date": "2025-07-06", "star_rating": "3"}"#,
            MockHotelsProvider::new(),
            MockGeocodeProvider::new(),
        )
        .handle(&session)
        .await;

        assert!(!message.failed);
        assert!(message.content.contains("Hotel Meridien"));
        assert!(message.content.contains("Latitude:"));
        assert!(message.content.contains("2025-07-05 to 2025-07-06"));
    }

    #[tokio::test]
    async fn test_defaults_apply_when_model_omits_fields() {
        let session = Session::new("hotels in Paris");
        let message = handler_with(
            r#"{"location": "Paris", "arrival_date": null, "departure_date": null}"#,
            MockHotelsProvider::new(),
            MockGeocodeProvider::new(),
        )
        .handle(&session)
        .await;

        assert!(!message.failed);
        let today = Utc::now().date_naive();
        assert!(message.content.contains(&today.to_string()));
    }

    #[tokio::test]
    async fn test_geocode_failure_becomes_message() {
        let session = Session::new("hotels in Nowhere");
        let message = handler_with(
            r#"{"location": "Nowhere"}"#,
            MockHotelsProvider::new(),
            MockGeocodeProvider::failing(),
        )
        .handle(&session)
        .await;

        assert!(message.failed);
        assert!(message.content.contains("Could not search hotels"));
    }

    #[tokio::test]
    async fn test_upstream_failure_becomes_message() {
        let session = Session::new("hotels in Paris");
        let message = handler_with(
            r#"{"location": "Paris"}"#,
            MockHotelsProvider::failing(),
            MockGeocodeProvider::new(),
        )
        .handle(&session)
        .await;

        assert!(message.failed);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(None).unwrap(), None);
        assert_eq!(parse_date(Some("null")).unwrap(), None);
        assert_eq!(
            parse_date(Some("2025-07-05")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 5)
        );
        assert!(parse_date(Some("07/05/2025")).is_err());
    }
}
