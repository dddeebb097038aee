use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::{extract_params, CapabilityHandler};
use crate::providers::geocode::GeoPlace;
use crate::providers::{GeocodeProvider, LLMProvider};
use crate::types::{CapabilityKind, Message, Session};

const EXTRACT_PROMPT: &str = "\
You extract the place the user wants located from a travel conversation. \
Respond with only a JSON object: {\"place\": \"<place name>\"}";

pub struct GeolocationHandler {
    llm: Arc<dyn LLMProvider>,
    geocode: Arc<dyn GeocodeProvider>,
}

#[derive(Debug, Deserialize)]
struct GeolocationParams {
    place: String,
}

impl GeolocationHandler {
    pub fn new(llm: Arc<dyn LLMProvider>, geocode: Arc<dyn GeocodeProvider>) -> Self {
        Self { llm, geocode }
    }

    async fn run(&self, session: &Session) -> Result<String> {
        let params: GeolocationParams =
            extract_params(self.llm.as_ref(), EXTRACT_PROMPT, session).await?;
        let place = self.geocode.lookup(&params.place).await?;
        Ok(render(&place))
    }
}

#[async_trait]
impl CapabilityHandler for GeolocationHandler {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Geolocation
    }

    async fn handle(&self, session: &Session) -> Message {
        match self.run(session).await {
            Ok(content) => Message::capability(self.kind(), content),
            Err(e) => {
                log::warn!("geolocation handler failed: {e:#}");
                Message::failure(self.kind(), format!("Could not resolve the location: {e}"))
            }
        }
    }
}

fn render(place: &GeoPlace) -> String {
    let bbox = &place.bounding_box;
    format!(
        "<ul>\
         <li>Location: {}</li>\
         <li>Latitude: {}</li>\
         <li>Longitude: {}</li>\
         <li>Bounding box: {}</li>\
         </ul>",
        html_escape::encode_text(&place.display_name),
        place.point.latitude,
        place.point.longitude,
        bbox.as_query(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::geocode::MockGeocodeProvider;
    use crate::providers::llm::MockLLMProvider;
    use crate::types::Origin;

    fn handler(geocode: MockGeocodeProvider) -> GeolocationHandler {
        GeolocationHandler::new(
            Arc::new(MockLLMProvider::with_response(r#"{"place": "Paris"}"#)),
            Arc::new(geocode),
        )
    }

    #[tokio::test]
    async fn test_success_includes_coordinates() {
        let session = Session::new("where is Paris?");
        let message = handler(MockGeocodeProvider::new()).handle(&session).await;

        assert_eq!(message.origin, Origin::Capability(CapabilityKind::Geolocation));
        assert!(!message.failed);
        assert!(message.content.contains("48.8566"));
        assert!(message.content.contains("2.3522"));
    }

    #[tokio::test]
    async fn test_failure_becomes_message() {
        let session = Session::new("where is Atlantis?");
        let message = handler(MockGeocodeProvider::failing()).handle(&session).await;

        assert!(message.failed);
        assert_eq!(message.origin, Origin::Capability(CapabilityKind::Geolocation));
        assert!(message.content.contains("Could not resolve"));
    }
}
