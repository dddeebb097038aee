use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::{extract_params, CapabilityHandler};
use crate::providers::geocode::GeoPoint;
use crate::providers::places::Place;
use crate::providers::{GeocodeProvider, LLMProvider, PlacesProvider};
use crate::types::{CapabilityKind, Message, Session};

const EXTRACT_PROMPT: &str = "\
You extract place-search parameters from a travel conversation. \
Respond with only a JSON object: \
{\"city\": \"<city name>\", \"query\": \"<kind of place, e.g. attractions, museums, restaurants>\"}. \
Default query to \"attractions\" when the user does not say.";

const SEARCH_LIMIT: usize = 10;
const RENDER_LIMIT: usize = 5;

pub struct PlaceHandler {
    llm: Arc<dyn LLMProvider>,
    places: Arc<dyn PlacesProvider>,
    geocode: Arc<dyn GeocodeProvider>,
}

fn default_query() -> String {
    "attractions".to_string()
}

#[derive(Debug, Deserialize)]
struct PlaceParams {
    city: String,
    #[serde(default = "default_query")]
    query: String,
}

impl PlaceHandler {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        places: Arc<dyn PlacesProvider>,
        geocode: Arc<dyn GeocodeProvider>,
    ) -> Self {
        Self {
            llm,
            places,
            geocode,
        }
    }

    async fn run(&self, session: &Session) -> Result<String> {
        let params: PlaceParams =
            extract_params(self.llm.as_ref(), EXTRACT_PROMPT, session).await?;
        let found = self
            .places
            .search(&params.city, &params.query, SEARCH_LIMIT)
            .await?;
        if found.is_empty() {
            anyhow::bail!("no results found for '{}' in {}", params.query, params.city);
        }

        let mut rendered = Vec::new();
        for place in found.into_iter().take(RENDER_LIMIT) {
            // Addresses are geocoded individually for lat/lon; a miss on one
            // place should not sink the whole result.
            let point = match self.geocode.lookup(&place.address).await {
                Ok(geo) => Some(geo.point),
                Err(e) => {
                    log::warn!("geocoding '{}' failed: {e:#}", place.address);
                    None
                }
            };
            rendered.push(render_place(&place, point));
        }
        Ok(format!("<ul>{}</ul>", rendered.join("")))
    }
}

#[async_trait]
impl CapabilityHandler for PlaceHandler {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Place
    }

    async fn handle(&self, session: &Session) -> Message {
        match self.run(session).await {
            Ok(content) => Message::capability(self.kind(), content),
            Err(e) => {
                log::warn!("place handler failed: {e:#}");
                Message::failure(self.kind(), format!("Could not find places: {e}"))
            }
        }
    }
}

fn render_place(place: &Place, point: Option<GeoPoint>) -> String {
    let mut parts = vec![
        format!("<b>{}</b>", html_escape::encode_text(&place.name)),
        format!(
            "Category: {}",
            html_escape::encode_text(&place.categories.join(", "))
        ),
        format!("Address: {}", html_escape::encode_text(&place.address)),
    ];
    match point {
        Some(p) => parts.push(format!("Latitude: {}, Longitude: {}", p.latitude, p.longitude)),
        None => parts.push("Latitude: unknown, Longitude: unknown".to_string()),
    }
    if let Some(phone) = &place.phone {
        parts.push(format!("Phone: {}", html_escape::encode_text(phone)));
    }
    if let Some(website) = &place.website {
        let escaped = html_escape::encode_double_quoted_attribute(website);
        parts.push(format!("<a href=\"{0}\">{0}</a>", escaped));
    }
    format!("<li>{}</li>", parts.join("<br>"))
}
