//! Turning a free-text place name into a rectangle.

use crate::geocoding::error::GeocodeError;
use crate::types::bounding_box::BoundingBox;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const USER_AGENT: &str = concat!("cds_request/", env!("CARGO_PKG_VERSION"));

/// Resolves a place name to its rectangle.
///
/// Returns `Ok(None)` when the service answered but knows no such place, so
/// callers can tell "not found" apart from transport failures.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        location: &str,
    ) -> impl Future<Output = Result<Option<BoundingBox>, GeocodeError>> + Send;
}

/// [`Geocoder`] backed by the OpenStreetMap Nominatim search API.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    /// `[south, north, west, east]` as decimal strings.
    boundingbox: [String; 4],
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_base_url(NOMINATIM_URL)
    }

    /// Points the geocoder at another Nominatim-compatible endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(GeocodeError::ClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn search(&self, location: &str) -> Result<Option<BoundingBox>, GeocodeError> {
        info!("Geocoding '{}' via {}", location, self.base_url);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", location), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| GeocodeError::NetworkRequest(self.base_url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", self.base_url, e);
                return Err(if let Some(status) = e.status() {
                    GeocodeError::HttpStatus {
                        url: self.base_url.clone(),
                        status,
                        source: e,
                    }
                } else {
                    GeocodeError::NetworkRequest(self.base_url.clone(), e)
                });
            }
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| GeocodeError::NetworkRequest(self.base_url.clone(), e))?;
        parse_places(location, &body)
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(
        &self,
        location: &str,
    ) -> impl Future<Output = Result<Option<BoundingBox>, GeocodeError>> + Send {
        self.search(location)
    }
}

fn parse_places(location: &str, body: &[u8]) -> Result<Option<BoundingBox>, GeocodeError> {
    let places: Vec<NominatimPlace> = serde_json::from_slice(body)?;
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    let parse = |value: &String| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidCoordinate {
                location: location.to_string(),
                value: value.clone(),
            })
    };
    let [south, north, west, east] = &place.boundingbox;
    Ok(Some(BoundingBox::new(
        parse(north)?,
        parse(south)?,
        parse(east)?,
        parse(west)?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_places_reads_nominatim_order() -> Result<(), GeocodeError> {
        let body = br#"[{"place_id": 1, "display_name": "Rome, Lazio, Italy",
            "boundingbox": ["41.7695581", "42.0505462", "12.3417139", "12.7302286"]}]"#;
        let bbox = parse_places("Rome", body)?.unwrap();
        assert_eq!(bbox.south, 41.7695581);
        assert_eq!(bbox.north, 42.0505462);
        assert_eq!(bbox.west, 12.3417139);
        assert_eq!(bbox.east, 12.7302286);
        Ok(())
    }

    #[test]
    fn test_parse_places_empty_result_is_none() -> Result<(), GeocodeError> {
        assert!(parse_places("Atlantis", b"[]")?.is_none());
        Ok(())
    }

    #[test]
    fn test_parse_places_rejects_bad_coordinate() {
        let body = br#"[{"boundingbox": ["north-ish", "1.0", "2.0", "3.0"]}]"#;
        let err = parse_places("Nowhere", body).unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidCoordinate { value, .. } if value == "north-ish"));
    }
}
