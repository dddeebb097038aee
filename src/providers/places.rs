use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub categories: Vec<String>,
    pub address: String,
    pub phone: Option<String>,
    pub website: Option<String>,
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Search for places of a given kind near a city.
    async fn search(&self, near: &str, query: &str, limit: usize) -> Result<Vec<Place>>;
}

#[derive(Debug, Clone)]
pub struct FoursquareProvider {
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FsqResponse {
    results: Vec<FsqPlace>,
}

#[derive(Debug, Deserialize)]
struct FsqPlace {
    name: Option<String>,
    categories: Option<Vec<FsqCategory>>,
    location: FsqLocation,
    tel: Option<String>,
    website: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FsqCategory {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FsqLocation {
    formatted_address: Option<String>,
}

impl FoursquareProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PlacesProvider for FoursquareProvider {
    async fn search(&self, near: &str, query: &str, limit: usize) -> Result<Vec<Place>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("FOURSQUARE_API_KEY not configured"))?;

        let response = self
            .client
            .get("https://places-api.foursquare.com/places/search")
            .header("accept", "application/json")
            .header("X-Places-Api-Version", "2025-06-17")
            .header("authorization", api_key)
            .query(&[
                ("near", near.to_string()),
                ("query", query.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("Foursquare API error {}: {}", status, body);
        }

        let parsed: FsqResponse = response.json().await?;
        let places = parsed
            .results
            .into_iter()
            .map(|p| Place {
                name: p.name.unwrap_or_else(|| "Unknown".to_string()),
                categories: p
                    .categories
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|c| c.name)
                    .collect(),
                address: p.location.formatted_address.unwrap_or_default(),
                phone: p.tel,
                website: p.website,
            })
            .collect();

        Ok(places)
    }
}

pub struct MockPlacesProvider {
    fail: bool,
}

impl Default for MockPlacesProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlacesProvider {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl PlacesProvider for MockPlacesProvider {
    async fn search(&self, near: &str, query: &str, limit: usize) -> Result<Vec<Place>> {
        if self.fail {
            anyhow::bail!("no results found for '{}' in {}", query, near);
        }
        let places = vec![
            Place {
                name: "Musee du Louvre".to_string(),
                categories: vec!["Art Museum".to_string()],
                address: format!("Rue de Rivoli, {}", near),
                phone: Some("+33 1 40 20 50 50".to_string()),
                website: Some("https://www.louvre.fr".to_string()),
            },
            Place {
                name: "Jardin du Luxembourg".to_string(),
                categories: vec!["Park".to_string()],
                address: format!("Rue de Medicis, {}", near),
                phone: None,
                website: None,
            },
        ];
        Ok(places.into_iter().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foursquare_response_parsing() {
        let body = r#"{
            "results": [{
                "name": "Victoria Memorial",
                "categories": [{"name": "Monument"}, {"name": "History Museum"}],
                "location": {"formatted_address": "1 Queens Way, Kolkata"},
                "tel": "+91 33 2223 1890",
                "website": "https://victoriamemorial-cal.org"
            }]
        }"#;
        let parsed: FsqResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].name.as_deref(), Some("Victoria Memorial"));
    }

    #[tokio::test]
    async fn test_mock_provider_respects_limit() {
        let provider = MockPlacesProvider::new();
        let places = provider.search("Paris", "attractions", 1).await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Musee du Louvre");
    }
}
