pub mod flight;
pub mod geolocation;
pub mod hotel;
pub mod place;
pub mod weather;

pub use flight::FlightHandler;
pub use geolocation::GeolocationHandler;
pub use hotel::HotelHandler;
pub use place::PlaceHandler;
pub use weather::WeatherHandler;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

use crate::providers::llm::{parse_json_response, ChatMessage, LLMProvider};
use crate::providers::{
    FlightsProvider, GeocodeProvider, HotelsProvider, PlacesProvider, WeatherProvider,
};
use crate::types::{CapabilityKind, Message, Session};

/// Uniform contract for the five expert handlers.
///
/// `handle` is infallible by signature: missing credentials, upstream errors,
/// and empty result sets all come back as a single failure message, so the
/// dispatch loop always makes forward progress.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    fn kind(&self) -> CapabilityKind;

    async fn handle(&self, session: &Session) -> Message;
}

pub type HandlerRegistry = HashMap<CapabilityKind, Arc<dyn CapabilityHandler>>;

/// The external data sources handlers are wired to.
pub struct DataProviders {
    pub geocode: Arc<dyn GeocodeProvider>,
    pub weather: Arc<dyn WeatherProvider>,
    pub places: Arc<dyn PlacesProvider>,
    pub hotels: Arc<dyn HotelsProvider>,
    pub flights: Arc<dyn FlightsProvider>,
}

/// Wire one handler per capability. The registry is the closed world the
/// dispatcher routes over.
pub fn build_registry(llm: Arc<dyn LLMProvider>, data: DataProviders) -> HandlerRegistry {
    let mut handlers: HandlerRegistry = HashMap::new();
    handlers.insert(
        CapabilityKind::Geolocation,
        Arc::new(GeolocationHandler::new(llm.clone(), data.geocode.clone())),
    );
    handlers.insert(
        CapabilityKind::Weather,
        Arc::new(WeatherHandler::new(
            llm.clone(),
            data.weather,
            data.geocode.clone(),
        )),
    );
    handlers.insert(
        CapabilityKind::Place,
        Arc::new(PlaceHandler::new(
            llm.clone(),
            data.places,
            data.geocode.clone(),
        )),
    );
    handlers.insert(
        CapabilityKind::Hotel,
        Arc::new(HotelHandler::new(llm.clone(), data.hotels, data.geocode)),
    );
    handlers.insert(
        CapabilityKind::Flight,
        Arc::new(FlightHandler::new(llm, data.flights)),
    );
    handlers
}

/// Ask the model to pull a typed parameter object out of the conversation.
/// Earlier handler results are part of the transcript, so e.g. a prior
/// geolocation answer can inform a later hotel search.
pub(crate) async fn extract_params<T: DeserializeOwned>(
    llm: &dyn LLMProvider,
    instructions: &str,
    session: &Session,
) -> Result<T> {
    let messages = vec![
        ChatMessage::system(instructions),
        ChatMessage::user(format!("Conversation so far:\n{}", session.transcript())),
    ];
    let response = llm.complete(messages).await?;
    parse_json_response(&response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::flights::MockFlightsProvider;
    use crate::providers::geocode::MockGeocodeProvider;
    use crate::providers::hotels::MockHotelsProvider;
    use crate::providers::llm::MockLLMProvider;
    use crate::providers::places::MockPlacesProvider;
    use crate::providers::weather::MockWeatherProvider;
    use serde::Deserialize;

    fn mock_data_providers() -> DataProviders {
        DataProviders {
            geocode: Arc::new(MockGeocodeProvider::new()),
            weather: Arc::new(MockWeatherProvider::new()),
            places: Arc::new(MockPlacesProvider::new()),
            hotels: Arc::new(MockHotelsProvider::new()),
            flights: Arc::new(MockFlightsProvider::new()),
        }
    }

    #[test]
    fn test_registry_covers_every_capability() {
        let llm = Arc::new(MockLLMProvider::with_response("{}"));
        let registry = build_registry(llm, mock_data_providers());

        for kind in CapabilityKind::ALL {
            let handler = registry.get(&kind).expect("missing handler");
            assert_eq!(handler.kind(), kind);
        }
    }

    #[tokio::test]
    async fn test_extract_params() {
        #[derive(Deserialize)]
        struct P {
            city: String,
        }

        let llm = MockLLMProvider::with_response(r#"{"city": "Paris"}"#);
        let session = Session::new("weather in Paris");
        let params: P = extract_params(&llm, "extract the city", &session)
            .await
            .unwrap();
        assert_eq!(params.city, "Paris");
    }
}
