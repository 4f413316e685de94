//! Query codec for the USGS ComCat [FDSN event service](https://earthquake.usgs.gov/fdsnws/event/1/).
//!
//! This module builds query URLs and decodes GeoJSON responses. It does not perform any
//! network IO itself; [`ComCatLookup`] delegates the transfer to a caller-supplied fetch
//! function so that the caller controls the transport and its timeout.
//!
//! **Requires the `serde` feature**
use chrono::{NaiveDateTime, TimeDelta};
use log::debug;
use serde::Deserialize;

use super::{CatalogLookup, LookupError, PreferredMagnitude};

pub const COMCAT_QUERY_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A spatio-temporal search window around a candidate origin
#[derive(Debug, Clone, PartialEq)]
pub struct ComCatQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub radius_km: f64,
}

impl ComCatQuery {
    pub fn new(
        latitude: f64,
        longitude: f64,
        time: NaiveDateTime,
        radius_km: f64,
        window_seconds: f64,
    ) -> Self {
        let window = TimeDelta::milliseconds((window_seconds * 1000.0) as i64);
        Self {
            latitude,
            longitude,
            start: time - window,
            end: time + window,
            radius_km,
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{COMCAT_QUERY_URL}?format=geojson&starttime={}&endtime={}&latitude={:.4}&longitude={:.4}&maxradiuskm={}",
            self.start.format(QUERY_TIME_FORMAT),
            self.end.format(QUERY_TIME_FORMAT),
            self.latitude,
            self.longitude,
            self.radius_km.trunc() as i64,
        )
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: FeatureProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureProperties {
    mag: Option<f64>,
    mag_type: Option<String>,
    sources: Option<String>,
}

/// Decode a GeoJSON event query response.
///
/// A response is only informative when it matches exactly one event. Zero or several
/// matches, or a match with no magnitude, give `Ok(None)`.
pub fn parse_geojson(body: &str) -> Result<Option<PreferredMagnitude>, LookupError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    if collection.features.len() != 1 {
        debug!(
            "ComCat query matched {} events, ignoring",
            collection.features.len()
        );
        return Ok(None);
    }
    let properties = match collection.features.into_iter().next() {
        Some(feature) => feature.properties,
        None => return Ok(None),
    };
    let (value, magnitude_type) = match (properties.mag, properties.mag_type) {
        (Some(value), Some(magnitude_type)) => (value, magnitude_type),
        _ => return Ok(None),
    };
    // The source list is wrapped in commas, ",us,ci,", so the first entry is the second token
    let source = properties
        .sources
        .as_deref()
        .and_then(|s| s.split(',').nth(1))
        .unwrap_or_default();
    Ok(Some(PreferredMagnitude::new(value, magnitude_type, source)))
}

/// A [`CatalogLookup`] backed by ComCat, with the transfer delegated to `fetch`
pub struct ComCatLookup<F: FnMut(&str) -> Result<String, LookupError>> {
    fetch: F,
}

impl<F: FnMut(&str) -> Result<String, LookupError>> ComCatLookup<F> {
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

impl<F: FnMut(&str) -> Result<String, LookupError>> CatalogLookup for ComCatLookup<F> {
    fn find_preferred_magnitude(
        &mut self,
        latitude: f64,
        longitude: f64,
        time: NaiveDateTime,
        radius_km: f64,
        window_seconds: f64,
    ) -> Result<Option<PreferredMagnitude>, LookupError> {
        let query = ComCatQuery::new(latitude, longitude, time, radius_km, window_seconds);
        let url = query.url();
        debug!("Querying {url}");
        let body = (self.fetch)(&url)?;
        parse_geojson(&body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    const ONE_EVENT: &str = r#"{
        "type": "FeatureCollection",
        "metadata": {"count": 1},
        "features": [{
            "type": "Feature",
            "properties": {"mag": 5.8, "magType": "mw", "sources": ",se,us,at,", "time": 1314121918050},
            "geometry": {"type": "Point", "coordinates": [-77.933, 37.91, 6]},
            "id": "se609212"
        }]
    }"#;

    fn origin_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2011, 8, 23)
            .unwrap()
            .and_hms_milli_opt(17, 51, 4, 560)
            .unwrap()
    }

    #[test]
    fn test_query_url() {
        let query = ComCatQuery::new(37.936, -77.933, origin_time(), 10.0, 3.0);
        assert_eq!(
            query.url(),
            "https://earthquake.usgs.gov/fdsnws/event/1/query?format=geojson&starttime=2011-08-23T17:51:01&endtime=2011-08-23T17:51:07&latitude=37.9360&longitude=-77.9330&maxradiuskm=10"
        );
    }

    #[test]
    fn test_parse_single_feature() {
        let found = parse_geojson(ONE_EVENT).unwrap().unwrap();
        assert_eq!(found, PreferredMagnitude::new(5.8, "mw", "se"));
    }

    #[test]
    fn test_parse_ambiguous() {
        assert!(parse_geojson(r#"{"features": []}"#).unwrap().is_none());
        assert!(parse_geojson(r#"{"type": "FeatureCollection"}"#)
            .unwrap()
            .is_none());
        let two = format!(
            r#"{{"features": [{0}, {0}]}}"#,
            r#"{"properties": {"mag": 4.1, "magType": "mb", "sources": ",us,"}}"#
        );
        assert!(parse_geojson(&two).unwrap().is_none());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_geojson("<html>503</html>"),
            Err(LookupError::Decode(_))
        ));
    }

    #[test]
    fn test_lookup_uses_fetch() {
        let mut seen = Vec::new();
        let mut lookup = ComCatLookup::new(|url: &str| {
            seen.push(url.to_string());
            Ok(ONE_EVENT.to_string())
        });
        let found = lookup
            .find_preferred_magnitude(37.936, -77.933, origin_time(), 10.0, 3.0)
            .unwrap();
        assert_eq!(found.map(|m| m.value), Some(5.8));
        drop(lookup);
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("maxradiuskm=10"));
    }
}
