use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::geocode::{BoundingBox, GeoPoint};

#[derive(Debug, Clone)]
pub struct HotelQuery {
    pub bbox: BoundingBox,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    /// Star classes to keep, e.g. [3, 4, 5].
    pub star_ratings: Vec<u8>,
    pub room_qty: u32,
    pub guest_qty: u32,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelListing {
    pub name: String,
    pub star_rating: u8,
    pub review_score: Option<f64>,
    pub review_word: Option<String>,
    pub review_count: Option<u32>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub price_per_night: Option<f64>,
    pub currency: String,
    pub image: Option<String>,
    pub booking_url: Option<String>,
    pub is_free_cancellable: bool,
    pub is_mobile_deal: bool,
    pub checkin_from: Option<String>,
    pub checkout_until: Option<String>,
    /// Great-circle distance from the center of the searched bounding box.
    pub distance_km: f64,
}

#[async_trait]
pub trait HotelsProvider: Send + Sync {
    /// Returns listings sorted by ascending distance from the bbox center.
    async fn search(&self, query: &HotelQuery) -> Result<Vec<HotelListing>>;
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();
    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

#[derive(Debug, Clone)]
pub struct BookingProvider {
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BookingResponse {
    #[serde(default)]
    result: Vec<BookingHotel>,
}

#[derive(Debug, Deserialize)]
struct BookingHotel {
    hotel_name: Option<String>,
    class: Option<f64>,
    review_score: Option<f64>,
    review_score_word: Option<String>,
    review_nr: Option<u32>,
    address: Option<String>,
    city: Option<String>,
    district: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    min_total_price: Option<f64>,
    price_breakdown: Option<BookingPriceBreakdown>,
    currencycode: Option<String>,
    main_photo_url: Option<String>,
    url: Option<String>,
    is_free_cancellable: Option<u8>,
    is_mobile_deal: Option<u8>,
    checkin: Option<BookingCheckin>,
    checkout: Option<BookingCheckout>,
}

#[derive(Debug, Deserialize)]
struct BookingPriceBreakdown {
    all_inclusive_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BookingCheckin {
    from: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BookingCheckout {
    until: Option<String>,
}

impl BookingProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn categories_filter(star_ratings: &[u8]) -> String {
        star_ratings
            .iter()
            .map(|s| format!("class::{}", s))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
impl HotelsProvider for BookingProvider {
    async fn search(&self, query: &HotelQuery) -> Result<Vec<HotelListing>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("RAPIDAPI_KEY_HOTELS not configured"))?;

        let response = self
            .client
            .get("https://apidojo-booking-v1.p.rapidapi.com/properties/list-by-map")
            .header("x-rapidapi-key", api_key)
            .header("x-rapidapi-host", "apidojo-booking-v1.p.rapidapi.com")
            .query(&[
                ("bbox", query.bbox.as_query()),
                ("room_qty", query.room_qty.to_string()),
                ("guest_qty", query.guest_qty.to_string()),
                ("search_id", "none".to_string()),
                ("price_filter_currencycode", query.currency.clone()),
                (
                    "categories_filter",
                    Self::categories_filter(&query.star_ratings),
                ),
                ("languagecode", "en-us".to_string()),
                ("travel_purpose", "leisure".to_string()),
                ("order_by", "popularity".to_string()),
                ("offset", "0".to_string()),
                ("arrival_date", query.arrival_date.to_string()),
                ("departure_date", query.departure_date.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("hotel search API error {}: {}", status, body);
        }

        let parsed: BookingResponse = response.json().await?;
        Ok(map_listings(parsed, query))
    }
}

fn map_listings(response: BookingResponse, query: &HotelQuery) -> Vec<HotelListing> {
    let center = query.bbox.center();

    let mut listings: Vec<HotelListing> = response
        .result
        .into_iter()
        .filter_map(|h| {
            // Unclassified or unlocated entries are useless downstream.
            let class = h.class?;
            let latitude = h.latitude?;
            let longitude = h.longitude?;

            let price = h
                .min_total_price
                .or(h.price_breakdown.and_then(|p| p.all_inclusive_price));
            let distance_km = haversine_km(
                center,
                GeoPoint {
                    latitude,
                    longitude,
                },
            );

            Some(HotelListing {
                name: h.hotel_name.unwrap_or_else(|| "Unknown".to_string()),
                star_rating: class.round() as u8,
                review_score: h.review_score,
                review_word: h.review_score_word,
                review_count: h.review_nr,
                address: h.address,
                city: h.city,
                district: h.district,
                latitude,
                longitude,
                price_per_night: price,
                currency: h.currencycode.unwrap_or_else(|| query.currency.clone()),
                image: h.main_photo_url,
                booking_url: h.url,
                is_free_cancellable: h.is_free_cancellable.unwrap_or(0) != 0,
                is_mobile_deal: h.is_mobile_deal.unwrap_or(0) != 0,
                checkin_from: h.checkin.and_then(|c| c.from),
                checkout_until: h.checkout.and_then(|c| c.until),
                distance_km: (distance_km * 100.0).round() / 100.0,
            })
        })
        .collect();

    listings.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    listings
}

pub struct MockHotelsProvider {
    fail: bool,
}

impl Default for MockHotelsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHotelsProvider {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl HotelsProvider for MockHotelsProvider {
    async fn search(&self, query: &HotelQuery) -> Result<Vec<HotelListing>> {
        if self.fail {
            anyhow::bail!("hotel search API error 502: upstream unavailable");
        }
        let center = query.bbox.center();
        Ok(vec![
            HotelListing {
                name: "Hotel Meridien".to_string(),
                star_rating: 4,
                review_score: Some(8.4),
                review_word: Some("Very Good".to_string()),
                review_count: Some(1203),
                address: Some("12 Rue Centrale".to_string()),
                city: Some("Paris".to_string()),
                district: Some("1st arr.".to_string()),
                latitude: center.latitude + 0.01,
                longitude: center.longitude - 0.01,
                price_per_night: Some(182.0),
                currency: query.currency.clone(),
                image: None,
                booking_url: Some("https://booking.example/meridien".to_string()),
                is_free_cancellable: true,
                is_mobile_deal: false,
                checkin_from: Some("14:00".to_string()),
                checkout_until: Some("11:00".to_string()),
                distance_km: 1.2,
            },
            HotelListing {
                name: "Grand Koramangala Inn".to_string(),
                star_rating: 3,
                review_score: Some(7.6),
                review_word: Some("Good".to_string()),
                review_count: Some(412),
                address: Some("80 Feet Road".to_string()),
                city: Some("Bangalore".to_string()),
                district: Some("Koramangala".to_string()),
                latitude: center.latitude - 0.02,
                longitude: center.longitude + 0.02,
                price_per_night: Some(64.0),
                currency: query.currency.clone(),
                image: None,
                booking_url: None,
                is_free_cancellable: false,
                is_mobile_deal: true,
                checkin_from: Some("12:00".to_string()),
                checkout_until: Some("10:00".to_string()),
                distance_km: 2.9,
            },
        ])
    }
}
