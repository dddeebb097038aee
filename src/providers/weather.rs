use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Current conditions for one city, as reported by the weather API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub country: Option<String>,
    pub description: Option<String>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed_mps: f64,
    pub wind_deg: Option<u16>,
    pub visibility_m: Option<u32>,
    pub cloud_coverage_pct: u8,
    pub sunrise_utc: Option<i64>,
    pub sunset_utc: Option<i64>,
    pub icon: Option<String>,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> Result<WeatherReport>;
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: String,
    weather: Vec<OwmCondition>,
    main: OwmMain,
    wind: Option<OwmWind>,
    visibility: Option<u32>,
    clouds: Option<OwmClouds>,
    sys: Option<OwmSys>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
    deg: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

impl OpenWeatherProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, city: &str) -> Result<WeatherReport> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OPENWEATHER_API_KEY not configured"))?;

        let response = self
            .client
            .get("https://api.openweathermap.org/data/2.5/weather")
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("OpenWeather API error {}: {}", status, body);
        }

        let data: OwmResponse = response.json().await?;
        let condition = data.weather.into_iter().next();
        let sys = data.sys;

        Ok(WeatherReport {
            city: data.name,
            country: sys.as_ref().and_then(|s| s.country.clone()),
            description: condition.as_ref().map(|c| c.description.clone()),
            temperature_c: data.main.temp,
            feels_like_c: data.main.feels_like,
            temp_min_c: data.main.temp_min,
            temp_max_c: data.main.temp_max,
            humidity_pct: data.main.humidity,
            pressure_hpa: data.main.pressure,
            wind_speed_mps: data.wind.as_ref().map(|w| w.speed).unwrap_or(0.0),
            wind_deg: data.wind.and_then(|w| w.deg),
            visibility_m: data.visibility,
            cloud_coverage_pct: data.clouds.map(|c| c.all).unwrap_or(0),
            sunrise_utc: sys.as_ref().and_then(|s| s.sunrise),
            sunset_utc: sys.and_then(|s| s.sunset),
            icon: condition.and_then(|c| c.icon),
        })
    }
}

/// Fixed clear-sky report for tests.
pub struct MockWeatherProvider {
    fail: bool,
}

impl Default for MockWeatherProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWeatherProvider {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl WeatherProvider for MockWeatherProvider {
    async fn current(&self, city: &str) -> Result<WeatherReport> {
        if self.fail {
            anyhow::bail!("weather service unavailable for '{}'", city);
        }
        Ok(WeatherReport {
            city: city.to_string(),
            country: Some("FR".to_string()),
            description: Some("clear sky".to_string()),
            temperature_c: 21.5,
            feels_like_c: 21.0,
            temp_min_c: 18.2,
            temp_max_c: 24.1,
            humidity_pct: 52,
            pressure_hpa: 1017,
            wind_speed_mps: 3.6,
            wind_deg: Some(220),
            visibility_m: Some(10000),
            cloud_coverage_pct: 5,
            sunrise_utc: Some(1_750_000_000),
            sunset_utc: Some(1_750_050_000),
            icon: Some("01d".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openweather_response_parsing() {
        let body = r#"{
            "name": "Paris",
            "weather": [{"description": "light rain", "icon": "10d"}],
            "main": {"temp": 16.4, "feels_like": 15.9, "temp_min": 14.0, "temp_max": 18.0,
                     "humidity": 81, "pressure": 1009},
            "wind": {"speed": 5.1, "deg": 240},
            "visibility": 9000,
            "clouds": {"all": 90},
            "sys": {"country": "FR", "sunrise": 1750000000, "sunset": 1750050000}
        }"#;
        let parsed: OwmResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.name, "Paris");
        assert_eq!(parsed.main.humidity, 81);
        assert_eq!(parsed.weather[0].description, "light rain");
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let report = MockWeatherProvider::new().current("Paris").await.unwrap();
        assert_eq!(report.city, "Paris");
        assert_eq!(report.description.as_deref(), Some("clear sky"));

        assert!(MockWeatherProvider::failing().current("Paris").await.is_err());
    }
}
