//! End-to-end dispatch tests: real handlers wired to mock data providers,
//! driven by a scripted oracle.

use std::sync::Arc;

use wayfarer::capabilities::{build_registry, DataProviders, HandlerRegistry};
use wayfarer::providers::flights::MockFlightsProvider;
use wayfarer::providers::geocode::MockGeocodeProvider;
use wayfarer::providers::hotels::MockHotelsProvider;
use wayfarer::providers::llm::MockLLMProvider;
use wayfarer::providers::places::MockPlacesProvider;
use wayfarer::providers::weather::MockWeatherProvider;
use wayfarer::router::{Dispatcher, DispatcherConfig, ScriptedOracle};
use wayfarer::types::{CapabilityKind, DispatchStatus, Origin, RouteTarget};

fn mock_providers() -> DataProviders {
    DataProviders {
        geocode: Arc::new(MockGeocodeProvider::new()),
        weather: Arc::new(MockWeatherProvider::new()),
        places: Arc::new(MockPlacesProvider::new()),
        hotels: Arc::new(MockHotelsProvider::new()),
        flights: Arc::new(MockFlightsProvider::new()),
    }
}

fn registry_with_llm(llm: MockLLMProvider) -> HandlerRegistry {
    build_registry(Arc::new(llm), mock_providers())
}

#[tokio::test]
async fn weather_in_paris_round_trip() {
    let oracle = ScriptedOracle::new(vec![RouteTarget::Capability(CapabilityKind::Weather)]);
    let registry = registry_with_llm(MockLLMProvider::with_response(r#"{"city": "Paris"}"#));
    let dispatcher = Dispatcher::new(Arc::new(oracle), registry);

    let outcome = dispatcher.run("weather in Paris").await.unwrap();

    assert_eq!(outcome.status, DispatchStatus::Complete);
    assert_eq!(outcome.session.history().len(), 2);

    let weather_message = &outcome.session.history()[1];
    assert_eq!(
        weather_message.origin,
        Origin::Capability(CapabilityKind::Weather)
    );
    assert!(weather_message.content.contains("Latitude: 48.8566"));
    assert!(weather_message.content.contains("Longitude: 2.3522"));
    assert_eq!(outcome.answer, weather_message.content);
}

#[tokio::test]
async fn multi_step_trip_geolocation_hotel_flight() {
    // "3-star hotels near Koramangala, Bangalore, and flights from BLR to CCU
    // on 2025-07-05": three experts in sequence, then FINISH.
    let oracle = ScriptedOracle::new(vec![
        RouteTarget::Capability(CapabilityKind::Geolocation),
        RouteTarget::Capability(CapabilityKind::Hotel),
        RouteTarget::Capability(CapabilityKind::Flight),
    ]);
    // One parameter-extraction call per handler, in dispatch order.
    let llm = MockLLMProvider::with_responses(vec![
        r#"{"place": "Koramangala, Bangalore"}"#.to_string(),
        r#"{"location": "Koramangala, Bangalore", "arrival_date": "2025-07-05",
            "departure_date": "2025-07-06", "star_rating": "3"}"#
            .to_string(),
        r#"{"from": "BLR", "to": "CCU", "date": "2025-07-05"}"#.to_string(),
    ]);
    let dispatcher = Dispatcher::new(Arc::new(oracle), registry_with_llm(llm));

    let outcome = dispatcher
        .run("3-star hotels near Koramangala, Bangalore, and flights from BLR to CCU on 2025-07-05")
        .await
        .unwrap();

    assert_eq!(outcome.status, DispatchStatus::Complete);

    let origins: Vec<_> = outcome
        .session
        .history()
        .iter()
        .map(|m| m.origin)
        .collect();
    assert_eq!(
        origins,
        vec![
            Origin::User,
            Origin::Capability(CapabilityKind::Geolocation),
            Origin::Capability(CapabilityKind::Hotel),
            Origin::Capability(CapabilityKind::Flight),
        ]
    );
    assert!(outcome.session.history().iter().all(|m| !m.failed));
    assert!(outcome.answer.contains("IndiGo"));
}

#[tokio::test]
async fn failed_handler_still_appends_and_loop_continues() {
    let oracle = ScriptedOracle::new(vec![
        RouteTarget::Capability(CapabilityKind::Hotel),
        RouteTarget::Capability(CapabilityKind::Weather),
    ]);
    let llm = MockLLMProvider::with_responses(vec![
        r#"{"location": "Paris"}"#.to_string(),
        r#"{"city": "Paris"}"#.to_string(),
    ]);
    let mut providers = mock_providers();
    providers.hotels = Arc::new(MockHotelsProvider::failing());
    let dispatcher = Dispatcher::new(Arc::new(oracle), build_registry(Arc::new(llm), providers));

    let outcome = dispatcher
        .run("hotels and weather in Paris")
        .await
        .unwrap();

    assert_eq!(outcome.status, DispatchStatus::Complete);
    assert_eq!(outcome.session.history().len(), 3);
    assert!(outcome.session.history()[1].failed);
    assert!(!outcome.session.history()[2].failed);
    assert!(outcome.answer.contains("clear sky"));
}

#[tokio::test]
async fn looping_oracle_is_cut_off_at_the_cycle_limit() {
    let llm = MockLLMProvider::with_response(r#"{"city": "Paris"}"#);
    let dispatcher = Dispatcher::new(
        Arc::new(ScriptedOracle::looping(CapabilityKind::Weather)),
        registry_with_llm(llm),
    )
    .with_config(DispatcherConfig {
        max_cycles: 4,
        ..DispatcherConfig::default()
    });

    let outcome = dispatcher.run("weather in Paris").await.unwrap();

    assert_eq!(outcome.status, DispatchStatus::Inconclusive);
    assert_eq!(outcome.session.history().len(), 5);
    // The partial result is still the last handler's answer.
    assert!(outcome.answer.contains("clear sky"));
}

#[tokio::test]
async fn identical_sessions_produce_identical_answers() {
    let run = || async {
        let oracle = ScriptedOracle::new(vec![RouteTarget::Capability(CapabilityKind::Weather)]);
        let registry = registry_with_llm(MockLLMProvider::with_response(r#"{"city": "Paris"}"#));
        Dispatcher::new(Arc::new(oracle), registry)
            .run("weather in Paris")
            .await
            .unwrap()
    };

    let first = run().await;
    let second = run().await;
    assert_eq!(first.answer, second.answer);
    assert_eq!(
        first.session.history()[1].content,
        second.session.history()[1].content
    );
}
