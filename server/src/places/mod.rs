//! Nearby-places lookup used to give the location analysis real context.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Search radius around the analysed point, in metres.
pub const SEARCH_RADIUS_M: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Places API error {0}")]
    Api(u16),

    #[error("Places API status {status}: {message}")]
    Status { status: String, message: String },
}

#[async_trait]
pub trait PlacesLookup: Send + Sync {
    async fn nearby(&self, lat: f64, lng: f64) -> Result<Vec<Place>, PlacesError>;
}

// ── Google Places Nearby Search ──────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    results: Vec<Place>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

pub struct GooglePlacesClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, PlacesError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn into_places(response: NearbySearchResponse) -> Result<Vec<Place>, PlacesError> {
        match response.status.as_deref() {
            None | Some("OK") | Some("ZERO_RESULTS") => Ok(response.results),
            Some(status) => Err(PlacesError::Status {
                status: status.to_string(),
                message: response.error_message.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl PlacesLookup for GooglePlacesClient {
    async fn nearby(&self, lat: f64, lng: f64) -> Result<Vec<Place>, PlacesError> {
        let url = format!("{}/maps/api/place/nearbysearch/json", self.base_url);
        let location = format!("{},{}", lat, lng);
        let radius = SEARCH_RADIUS_M.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", "point_of_interest"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlacesError::Api(response.status().as_u16()));
        }

        let body: NearbySearchResponse = response.json().await?;
        Self::into_places(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<Place>, PlacesError> {
        GooglePlacesClient::into_places(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn results_are_read_with_their_types() {
        let places = parse(
            r#"{"status":"OK","results":[
                {"name":"Central Library","types":["library","point_of_interest"],"rating":4.5},
                {"name":"Corner Shop"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].types, vec!["library", "point_of_interest"]);
        assert!(places[1].types.is_empty());
    }

    #[test]
    fn zero_results_is_not_an_error() {
        assert!(parse(r#"{"status":"ZERO_RESULTS","results":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn denied_requests_surface_the_status() {
        let err = parse(r#"{"status":"REQUEST_DENIED","error_message":"bad key","results":[]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("REQUEST_DENIED"));
        assert!(err.to_string().contains("bad key"));
    }
}
