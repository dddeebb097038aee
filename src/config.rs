use serde::{Deserialize, Serialize};

/// API credentials pulled from the environment. Missing data-source keys are
/// tolerated here and surface as handler-local failure messages at call time;
/// only the routing model's key is required up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub locationiq_api_key: Option<String>,
    pub foursquare_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
    pub rapidapi_hotels_key: Option<String>,
    pub rapidapi_flights_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            locationiq_api_key: std::env::var("LOCATIONIQ_API_KEY").ok(),
            foursquare_api_key: std::env::var("FOURSQUARE_API_KEY").ok(),
            openweather_api_key: std::env::var("OPENWEATHER_API_KEY").ok(),
            rapidapi_hotels_key: std::env::var("RAPIDAPI_KEY_HOTELS").ok(),
            rapidapi_flights_key: std::env::var("RAPIDAPI_KEY_FLIGHTS").ok(),
        }
    }
}
