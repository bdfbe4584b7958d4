#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Meteostat source.
//!
//! This crate provides a Meteostat client that implements the
//! [`DailyDataSource`] and [`StationDirectory`] traits from `weather-core`.
//!
//! # Features
//!
//! - Daily observations for a station between two dates
//! - Free-text search for places and stations
//! - Place position and nearest-station lookup
//! - Content negotiation for JSON served as `application/json` or `text/*`

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use weather_core::{
    DailyDataSource, DailyObservation, DataSource, Location, NearbyStation, Result,
    SearchResults, StationDirectory, WeatherError, format_template,
};

/// Meteostat app API base URL.
pub const DEFAULT_BASE_URL: &str = "https://d.meteostat.net/app/";

/// Place properties URL template.
pub const DEFAULT_PLACE_URL_TEMPLATE: &str = "https://meteostat.net/props/en/place/${country}/${id}";

const DAILY_URL_TEMPLATE: &str =
    "${api}proxy/stations/daily?station=${stationId}&start=${start}&end=${end}";
const AUTOCOMPLETE_URL_TEMPLATE: &str = "${api}autocomplete?q=${location}&lang=${locale}";
const NEARBY_URL_TEMPLATE: &str =
    "${api}nearby?lang=en&limit=1&lat=${latitude}&lon=${longitude}";

/// Default request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent for HTTP requests.
const USER_AGENT: &str = concat!("weather-meteostat/", env!("CARGO_PKG_VERSION"));

/// Meteostat client.
///
/// Implements [`DailyDataSource`] and [`StationDirectory`].
#[derive(Debug, Clone)]
pub struct MeteostatClient {
    client: reqwest::Client,
    base_url: String,
    place_url_template: String,
    locale: String,
}

impl MeteostatClient {
    /// Create a new client with default settings.
    ///
    /// Requests time out after 30 seconds.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    /// Create a new client with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            place_url_template: DEFAULT_PLACE_URL_TEMPLATE.to_string(),
            locale: "en".to_string(),
        }
    }

    /// Set the app API base URL (must end with `/`).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the place properties URL template (`${country}` and `${id}` placeholders).
    #[must_use]
    pub fn with_place_url_template(mut self, template: impl Into<String>) -> Self {
        self.place_url_template = template.into();
        self
    }

    /// Set the language used for search results.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    fn daily_url(&self, station_id: &str, start: NaiveDate, end: NaiveDate) -> String {
        let params = HashMap::from([
            ("api", self.base_url.clone()),
            ("stationId", encode(station_id)),
            ("start", start.format("%Y-%m-%d").to_string()),
            ("end", end.format("%Y-%m-%d").to_string()),
        ]);
        format_template(DAILY_URL_TEMPLATE, &params)
    }

    fn autocomplete_url(&self, query: &str) -> String {
        let params = HashMap::from([
            ("api", self.base_url.clone()),
            ("location", encode(query)),
            ("locale", encode(&self.locale)),
        ]);
        format_template(AUTOCOMPLETE_URL_TEMPLATE, &params)
    }

    fn nearby_url(&self, latitude: f64, longitude: f64) -> String {
        let params = HashMap::from([
            ("api", self.base_url.clone()),
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
        ]);
        format_template(NEARBY_URL_TEMPLATE, &params)
    }

    fn place_url(&self, country: &str, place_id: &str) -> String {
        let params = HashMap::from([
            ("country", encode(&country.to_lowercase())),
            ("id", encode(place_id)),
        ]);
        format_template(&self.place_url_template, &params)
    }

    /// GET `url` and decode the body according to its content type.
    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        parse_payload(content_type.as_deref(), &body)
    }
}

impl Default for MeteostatClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a response body according to its `Content-Type`.
///
/// `application/json` bodies and any `text/*` body are parsed as JSON.
///
/// # Errors
/// Returns [`WeatherError::UnsupportedContentType`] for any other (or a
/// missing) content type, and [`WeatherError::Parse`] if the body is not
/// valid JSON for `T`.
pub fn parse_payload<T: DeserializeOwned>(content_type: Option<&str>, body: &str) -> Result<T> {
    match content_type {
        Some(ct) if ct.contains("application/json") || ct.contains("text/") => {
            serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))
        }
        other => Err(WeatherError::UnsupportedContentType(
            other.unwrap_or("none").to_string(),
        )),
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

impl DataSource for MeteostatClient {
    fn name(&self) -> &str {
        "Meteostat"
    }

    fn description(&self) -> &str {
        "Meteostat daily station observations and station directory"
    }
}

#[async_trait]
impl DailyDataSource for MeteostatClient {
    #[instrument(skip(self))]
    async fn fetch_daily(
        &self,
        station_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyObservation>> {
        if start > end {
            return Err(WeatherError::InvalidParameter(format!(
                "Start date {start} is after end date {end}"
            )));
        }

        let url = self.daily_url(station_id, start, end);
        let envelope: Envelope<Vec<DailyObservation>> = self.fetch_json(&url).await?;
        let rows = envelope.data.unwrap_or_default();
        debug!("Received {} daily rows", rows.len());
        Ok(rows)
    }
}

#[async_trait]
impl StationDirectory for MeteostatClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<SearchResults> {
        let url = self.autocomplete_url(query);
        let envelope: Envelope<SearchResults> = self.fetch_json(&url).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn place_location(&self, country: &str, place_id: &str) -> Result<Location> {
        let url = self.place_url(country, place_id);
        let response: PlaceResponse = self.fetch_json(&url).await?;
        Ok(response.place.location)
    }

    #[instrument(skip(self))]
    async fn nearest_station(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<NearbyStation>> {
        let url = self.nearby_url(latitude, longitude);
        let envelope: Envelope<OneOrMany<NearbyStation>> = self.fetch_json(&url).await?;
        Ok(envelope.data.and_then(OneOrMany::into_first))
    }
}

// ============================================================================
// Meteostat API Response Types
// ============================================================================

/// `{ "data": ... }` envelope; `null` or missing data decodes to `None`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_first(self) -> Option<T> {
        match self {
            Self::Many(items) => items.into_iter().next(),
            Self::One(item) => Some(item),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlaceResponse {
    place: PlaceDetails,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    location: Location,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn local_client(base: String) -> MeteostatClient {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        MeteostatClient::with_client(client).with_base_url(base)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Serves a single HTTP response and returns the base URL plus the request line.
    async fn serve_once(
        content_type: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request.lines().next().unwrap_or_default().to_string()
        });
        (format!("http://{addr}/app/"), handle)
    }

    #[test]
    fn test_daily_url() {
        let client = MeteostatClient::new();
        let url = client.daily_url("10637", date(2023, 1, 6), date(2023, 1, 10));
        assert_eq!(
            url,
            "https://d.meteostat.net/app/proxy/stations/daily?station=10637&start=2023-01-06&end=2023-01-10"
        );
    }

    #[test]
    fn test_autocomplete_url_encodes_query() {
        let client = MeteostatClient::new().with_locale("de");
        let url = client.autocomplete_url("São Paulo & co");
        assert_eq!(
            url,
            "https://d.meteostat.net/app/autocomplete?q=S%C3%A3o+Paulo+%26+co&lang=de"
        );
    }

    #[test]
    fn test_nearby_and_place_urls() {
        let client = MeteostatClient::new();
        assert_eq!(
            client.nearby_url(35.6895, 139.6917),
            "https://d.meteostat.net/app/nearby?lang=en&limit=1&lat=35.6895&lon=139.6917"
        );
        assert_eq!(
            client.place_url("JP", "tokyo"),
            "https://meteostat.net/props/en/place/jp/tokyo"
        );
    }

    #[test]
    fn test_parse_payload_content_negotiation() {
        let json: serde_json::Value =
            parse_payload(Some("application/json; charset=utf-8"), r#"{"data":[]}"#).unwrap();
        assert!(json["data"].is_array());

        let text: serde_json::Value = parse_payload(Some("text/plain"), r#"{"a":1}"#).unwrap();
        assert_eq!(text["a"], 1);

        let html: serde_json::Value = parse_payload(Some("text/html"), "[1,2]").unwrap();
        assert_eq!(html[1], 2);

        let err = parse_payload::<serde_json::Value>(Some("image/png"), "{}").unwrap_err();
        assert!(matches!(err, WeatherError::UnsupportedContentType(ct) if ct == "image/png"));

        let err = parse_payload::<serde_json::Value>(None, "{}").unwrap_err();
        assert!(matches!(err, WeatherError::UnsupportedContentType(_)));

        let err = parse_payload::<serde_json::Value>(Some("text/plain"), "not json").unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[test]
    fn test_daily_envelope_with_nulls() {
        let body = r#"{"meta":{},"data":[
            {"date":"2023-03-14","tavg":3.1,"tmin":-1.0,"tmax":8.2,"prcp":null},
            {"date":"2023-03-15","tmin":null,"tmax":null}
        ]}"#;
        let envelope: Envelope<Vec<DailyObservation>> =
            parse_payload(Some("application/json"), body).unwrap();
        let rows = envelope.data.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tmax, Some(8.2));
        assert!(rows[1].record().is_empty());
    }

    #[test]
    fn test_null_data_is_empty() {
        let envelope: Envelope<Vec<DailyObservation>> =
            parse_payload(Some("application/json"), r#"{"data":null}"#).unwrap();
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_nearby_accepts_object_or_list() {
        let one: Envelope<OneOrMany<NearbyStation>> = parse_payload(
            Some("application/json"),
            r#"{"data":{"id":"47662","name":"Tokyo","elevation":5,"active":true,"distance":6808}}"#,
        )
        .unwrap();
        assert_eq!(one.data.and_then(OneOrMany::into_first).unwrap().id, "47662");

        let many: Envelope<OneOrMany<NearbyStation>> = parse_payload(
            Some("application/json"),
            r#"{"data":[{"id":"47662","name":"Tokyo"}]}"#,
        )
        .unwrap();
        assert_eq!(many.data.and_then(OneOrMany::into_first).unwrap().name, "Tokyo");

        let none: Envelope<OneOrMany<NearbyStation>> =
            parse_payload(Some("application/json"), r#"{"data":[]}"#).unwrap();
        assert!(none.data.and_then(OneOrMany::into_first).is_none());
    }

    #[test]
    fn test_place_and_search_shapes() {
        let place: PlaceResponse = parse_payload(
            Some("application/json"),
            r#"{"place":{"id":"tokyo","name":"Tokyo","country":"JP","region":null,
                "location":{"latitude":35.6895,"longitude":139.6917,"elevation":44},
                "timezone":"Asia/Tokyo"}}"#,
        )
        .unwrap();
        assert_eq!(place.place.location.latitude, 35.6895);
        assert_eq!(place.place.location.elevation, Some(44.0));

        let search: Envelope<SearchResults> = parse_payload(
            Some("text/plain"),
            r#"{"data":{"stations":[{"id":"47686","country":"JP",
                "name":"New Tokyo Inter-National Airport","region":"CH","active":true}]}}"#,
        )
        .unwrap();
        let results = search.data.unwrap();
        assert!(results.places.is_empty());
        assert_eq!(results.stations[0].region.as_deref(), Some("CH"));
    }

    #[test]
    fn test_provider_info() {
        let client = MeteostatClient::default();
        assert_eq!(client.name(), "Meteostat");
    }

    #[tokio::test]
    async fn test_fetch_daily_over_http() {
        let (base, server) = serve_once(
            "text/plain",
            r#"{"data":[{"date":"2023-01-06","tmax":4.0,"tmin":-2.0}]}"#,
        )
        .await;
        let client = local_client(base);

        let rows = client
            .fetch_daily("X", date(2023, 1, 6), date(2023, 1, 10))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tmin, Some(-2.0));

        let request_line = server.await.unwrap();
        assert!(request_line.contains("station=X&start=2023-01-06&end=2023-01-10"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_unsupported_content_type() {
        let (base, server) = serve_once("application/octet-stream", "{}").await;
        let client = local_client(base);

        let err = client
            .fetch_daily("X", date(2023, 1, 1), date(2023, 1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::UnsupportedContentType(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_daily_rejects_inverted_span() {
        let client = MeteostatClient::new();
        let err = client
            .fetch_daily("X", date(2023, 2, 1), date(2023, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::InvalidParameter(_)));
    }
}
