use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// LocationIQ bounding boxes arrive as [min_lat, max_lat, min_lon, max_lon].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            latitude: (self.min_lat + self.max_lat) / 2.0,
            longitude: (self.min_lon + self.max_lon) / 2.0,
        }
    }

    /// Comma-joined form expected by the hotel search API.
    pub fn as_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPlace {
    pub display_name: String,
    pub point: GeoPoint,
    pub bounding_box: BoundingBox,
}

#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Resolve a free-text place name to its best match.
    async fn lookup(&self, place: &str) -> Result<GeoPlace>;
}

#[derive(Debug, Clone)]
pub struct LocationIqProvider {
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct LocationIqPlace {
    lat: String,
    lon: String,
    display_name: String,
    boundingbox: [String; 4],
}

impl LocationIqProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GeocodeProvider for LocationIqProvider {
    async fn lookup(&self, place: &str) -> Result<GeoPlace> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("LOCATIONIQ_API_KEY not configured"))?;

        let response = self
            .client
            .get("https://us1.locationiq.com/v1/search.php")
            .query(&[("key", api_key), ("q", place), ("format", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("LocationIQ API error {}: {}", status, body);
        }

        let results: Vec<LocationIqPlace> = response.json().await?;
        let first = results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no geocoding results for '{}'", place))?;

        let parse = |s: &str| -> Result<f64> {
            s.parse::<f64>()
                .map_err(|_| anyhow!("non-numeric coordinate '{}' in geocoding result", s))
        };

        Ok(GeoPlace {
            point: GeoPoint {
                latitude: parse(&first.lat)?,
                longitude: parse(&first.lon)?,
            },
            bounding_box: BoundingBox {
                min_lat: parse(&first.boundingbox[0])?,
                max_lat: parse(&first.boundingbox[1])?,
                min_lon: parse(&first.boundingbox[2])?,
                max_lon: parse(&first.boundingbox[3])?,
            },
            display_name: first.display_name,
        })
    }
}

/// Deterministic provider for tests: every place resolves to central Paris.
pub struct MockGeocodeProvider {
    fail: bool,
}

impl Default for MockGeocodeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGeocodeProvider {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }

    pub fn paris() -> GeoPlace {
        GeoPlace {
            display_name: "Paris, Ile-de-France, France".to_string(),
            point: GeoPoint {
                latitude: 48.8566,
                longitude: 2.3522,
            },
            bounding_box: BoundingBox {
                min_lat: 48.8156,
                max_lat: 48.9022,
                min_lon: 2.2242,
                max_lon: 2.4699,
            },
        }
    }
}

#[async_trait]
impl GeocodeProvider for MockGeocodeProvider {
    async fn lookup(&self, place: &str) -> Result<GeoPlace> {
        if self.fail {
            anyhow::bail!("no geocoding results for '{}'", place);
        }
        Ok(Self::paris())
    }
}
