use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct FlightQuery {
    /// IATA code of the departure airport, e.g. "BLR".
    pub from: String,
    /// IATA code of the arrival airport, e.g. "CCU".
    pub to: String,
    pub date: NaiveDate,
    pub adults: u32,
    pub cabin: String,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopOver {
    pub airport: String,
    pub duration_minutes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightOption {
    pub flight_code: Option<String>,
    pub airline: Option<String>,
    pub cabin_type: String,
    pub stops: String,
    pub departure_city: Option<String>,
    pub departure_country: Option<String>,
    pub departure_time: Option<String>,
    pub arrival_city: Option<String>,
    pub arrival_country: Option<String>,
    pub arrival_time: Option<String>,
    pub duration: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub intermediate_stops: Vec<StopOver>,
}

#[async_trait]
pub trait FlightsProvider: Send + Sync {
    async fn search(&self, query: &FlightQuery) -> Result<Vec<FlightOption>>;
}

#[derive(Debug, Clone)]
pub struct FlightFareProvider {
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FareResponse {
    #[serde(default)]
    results: Vec<FareFlight>,
}

#[derive(Debug, Deserialize)]
struct FareFlight {
    flight_code: Option<String>,
    flight_name: Option<String>,
    #[serde(rename = "cabinType")]
    cabin_type: Option<String>,
    stops: Option<String>,
    #[serde(rename = "departureAirport")]
    departure_airport: Option<FareAirport>,
    #[serde(rename = "arrivalAirport")]
    arrival_airport: Option<FareAirport>,
    duration: Option<FareDuration>,
    totals: Option<FareTotals>,
    #[serde(rename = "stopSummary", default)]
    stop_summary: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FareAirport {
    city: Option<String>,
    country: Option<FareCountry>,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FareCountry {
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FareDuration {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FareTotals {
    total: Option<f64>,
    currency: Option<String>,
}

impl FlightFareProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FlightsProvider for FlightFareProvider {
    async fn search(&self, query: &FlightQuery) -> Result<Vec<FlightOption>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("RAPIDAPI_KEY_FLIGHTS not configured"))?;

        let response = self
            .client
            .get("https://flight-fare-search.p.rapidapi.com/v2/flights")
            .header("x-rapidapi-key", api_key)
            .header("x-rapidapi-host", "flight-fare-search.p.rapidapi.com")
            .query(&[
                ("from", query.from.clone()),
                ("to", query.to.clone()),
                ("date", query.date.to_string()),
                ("adult", query.adults.to_string()),
                ("type", query.cabin.clone()),
                ("currency", query.currency.clone()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("flight fare API error {}: {}", status, body);
        }

        let parsed: FareResponse = response.json().await?;
        Ok(parsed.results.into_iter().map(map_flight).collect())
    }
}

fn map_flight(f: FareFlight) -> FlightOption {
    // stopSummary mixes per-stop objects with a scalar connectingTime entry.
    let intermediate_stops = f
        .stop_summary
        .into_iter()
        .filter(|(key, value)| key != "connectingTime" && value.is_object())
        .map(|(_, value)| StopOver {
            airport: value
                .get("airport")
                .and_then(|a| a.as_str())
                .unwrap_or("Unknown")
                .to_string(),
            duration_minutes: value.get("stopDuration").and_then(|d| d.as_u64()),
        })
        .collect();

    let departure = f.departure_airport;
    let arrival = f.arrival_airport;

    FlightOption {
        flight_code: f.flight_code,
        airline: f.flight_name,
        cabin_type: f.cabin_type.unwrap_or_else(|| "Unknown".to_string()),
        stops: f.stops.unwrap_or_else(|| "Unknown".to_string()),
        departure_city: departure.as_ref().and_then(|a| a.city.clone()),
        departure_country: departure
            .as_ref()
            .and_then(|a| a.country.as_ref())
            .and_then(|c| c.label.clone()),
        departure_time: departure.and_then(|a| a.time),
        arrival_city: arrival.as_ref().and_then(|a| a.city.clone()),
        arrival_country: arrival
            .as_ref()
            .and_then(|a| a.country.as_ref())
            .and_then(|c| c.label.clone()),
        arrival_time: arrival.and_then(|a| a.time),
        duration: f.duration.and_then(|d| d.text),
        price: f.totals.as_ref().and_then(|t| t.total),
        currency: f.totals.and_then(|t| t.currency),
        intermediate_stops,
    }
}

pub struct MockFlightsProvider {
    fail: bool,
}

impl Default for MockFlightsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFlightsProvider {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl FlightsProvider for MockFlightsProvider {
    async fn search(&self, query: &FlightQuery) -> Result<Vec<FlightOption>> {
        if self.fail {
            anyhow::bail!("no flights found");
        }
        Ok(vec![FlightOption {
            flight_code: Some("6E-503".to_string()),
            airline: Some("IndiGo".to_string()),
            cabin_type: query.cabin.clone(),
            stops: "Direct".to_string(),
            departure_city: Some(query.from.clone()),
            departure_country: Some("India".to_string()),
            departure_time: Some(format!("{}T08:40:00", query.date)),
            arrival_city: Some(query.to.clone()),
            arrival_country: Some("India".to_string()),
            arrival_time: Some(format!("{}T11:05:00", query.date)),
            duration: Some("2h 25m".to_string()),
            price: Some(87.5),
            currency: Some(query.currency.clone()),
            intermediate_stops: vec![],
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_response_parsing_with_stops() {
        let body = r#"{
            "results": [{
                "flight_code": "AI-775",
                "flight_name": "Air India",
                "cabinType": "economy",
                "stops": "1 Stop",
                "departureAirport": {"city": "Bangalore", "country": {"label": "India"},
                                     "time": "2025-07-05T06:10:00"},
                "arrivalAirport": {"city": "Kolkata", "country": {"label": "India"},
                                   "time": "2025-07-05T12:45:00"},
                "duration": {"text": "6h 35m"},
                "totals": {"total": 132.0, "currency": "USD"},
                "stopSummary": {
                    "connectingTime": 95,
                    "stop1": {"airport": "HYD", "stopDuration": 95}
                }
            }]
        }"#;
        let parsed: FareResponse = serde_json::from_str(body).unwrap();
        let flight = map_flight(parsed.results.into_iter().next().unwrap());

        assert_eq!(flight.airline.as_deref(), Some("Air India"));
        assert_eq!(flight.price, Some(132.0));
        assert_eq!(flight.intermediate_stops.len(), 1);
        assert_eq!(flight.intermediate_stops[0].airport, "HYD");
        assert_eq!(flight.intermediate_stops[0].duration_minutes, Some(95));
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let query = FlightQuery {
            from: "BLR".to_string(),
            to: "CCU".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
            adults: 1,
            cabin: "economy".to_string(),
            currency: "USD".to_string(),
        };
        let flights = MockFlightsProvider::new().search(&query).await.unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].stops, "Direct");

        assert!(MockFlightsProvider::failing().search(&query).await.is_err());
    }
}
