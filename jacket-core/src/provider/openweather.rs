use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::ServiceError,
    model::{ForecastQuery, Place, WeatherSnapshot},
    schedule::FORECAST_SLOT_MILLIS,
};

use super::{ForecastProvider, PlaceSearch, truncate_body};

const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
const GEOCODING_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";

/// Furthest a forecast entry may sit from the requested slot and still count.
const MAX_SLOT_DISTANCE_SECS: i64 = FORECAST_SLOT_MILLIS / 1000;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http: Client::new(),
        }
    }

    async fn get_body(&self, url: &str, query: &[(&str, String)]) -> Result<String, ServiceError> {
        let res = self
            .http
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ServiceError::internal(format!("Failed to reach OpenWeather: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| {
                ServiceError::internal(format!("Failed to read OpenWeather response: {e}"))
            })?;

        if !status.is_success() {
            warn!(%status, "OpenWeather request failed");
            return Err(upstream_error(status.as_u16(), &body));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwError {
    message: Option<String>,
}

/// Prefer the provider's own `message` field; fall back to the raw body.
fn upstream_error(status: u16, body: &str) -> ServiceError {
    let message = serde_json::from_str::<OwError>(body)
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Failed to fetch weather data: {}", truncate_body(body)));
    ServiceError::upstream(status, message)
}

/// Pick the forecast entry nearest to `target`.
fn snapshot_from_forecast(
    body: &str,
    target: DateTime<Utc>,
) -> Result<WeatherSnapshot, ServiceError> {
    let parsed: OwForecastResponse = serde_json::from_str(body).map_err(|e| {
        ServiceError::upstream(502, format!("Failed to parse OpenWeather forecast JSON: {e}"))
    })?;

    let target_ts = target.timestamp();
    let entry = parsed
        .list
        .iter()
        .min_by_key(|e| (e.dt - target_ts).abs())
        .ok_or_else(|| {
            ServiceError::upstream(502, "OpenWeather forecast response contained no data")
        })?;

    if (entry.dt - target_ts).abs() > MAX_SLOT_DISTANCE_SECS {
        return Err(ServiceError::upstream(
            404,
            format!("No forecast is available for {target}. Forecasts cover the next 5 days."),
        ));
    }

    let (precipitation, icon_code) = entry
        .weather
        .first()
        .map(|w| (w.description.clone(), w.icon.clone()))
        .unwrap_or_else(|| ("Unknown".to_string(), None));

    Ok(WeatherSnapshot {
        temperature_f: entry.main.temp,
        wind_speed_mph: entry.wind.speed,
        precipitation,
        icon_code,
        forecast_time: DateTime::from_timestamp(entry.dt, 0).unwrap_or(target),
    })
}

fn places_from_geocoding(body: &str) -> Result<Vec<Place>, ServiceError> {
    let parsed: Vec<OwGeoEntry> = serde_json::from_str(body).map_err(|e| {
        ServiceError::upstream(502, format!("Failed to parse OpenWeather geocoding JSON: {e}"))
    })?;

    Ok(parsed
        .into_iter()
        .map(|g| Place {
            name: g.name,
            latitude: g.lat,
            longitude: g.lon,
            state: g.state,
            country: g.country,
        })
        .collect())
}

#[async_trait]
impl ForecastProvider for OpenWeatherProvider {
    #[instrument(skip(self), fields(lat = query.latitude, lon = query.longitude, at = %query.at))]
    async fn get_forecast(&self, query: &ForecastQuery) -> Result<WeatherSnapshot, ServiceError> {
        let body = self
            .get_body(
                FORECAST_URL,
                &[
                    ("lat", query.latitude.to_string()),
                    ("lon", query.longitude.to_string()),
                    ("units", "imperial".to_string()),
                ],
            )
            .await?;

        let snapshot = snapshot_from_forecast(&body, query.at)?;
        debug!(
            temperature_f = snapshot.temperature_f,
            wind_mph = snapshot.wind_speed_mph,
            precipitation = %snapshot.precipitation,
            "forecast resolved"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl PlaceSearch for OpenWeatherProvider {
    #[instrument(skip(self))]
    async fn search_places(&self, query: &str, limit: u8) -> Result<Vec<Place>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let body = self
            .get_body(
                GEOCODING_URL,
                &[("q", query.to_string()), ("limit", limit.clamp(1, 5).to_string())],
            )
            .await?;

        let places = places_from_geocoding(&body)?;
        debug!(count = places.len(), "places found");
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST: &str = r#"{
        "cod": "200",
        "list": [
            {"dt": 1700000000, "main": {"temp": 51.3, "feels_like": 49.0},
             "weather": [{"main": "Clouds", "description": "overcast clouds", "icon": "04d"}],
             "wind": {"speed": 7.9, "deg": 200}},
            {"dt": 1700010800, "main": {"temp": 47.8},
             "weather": [{"main": "Rain", "description": "light rain", "icon": "10n"}],
             "wind": {"speed": 12.6}},
            {"dt": 1700021600, "main": {"temp": 44.1},
             "weather": [],
             "wind": {"speed": 3.0}}
        ],
        "city": {"name": "Seattle", "country": "US"}
    }"#;

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    #[test]
    fn picks_nearest_entry() {
        let snapshot = snapshot_from_forecast(FORECAST, at(1_700_010_000)).unwrap();
        assert_eq!(snapshot.temperature_f, 47.8);
        assert_eq!(snapshot.wind_speed_mph, 12.6);
        assert_eq!(snapshot.precipitation, "light rain");
        assert_eq!(snapshot.icon_code.as_deref(), Some("10n"));
        assert_eq!(snapshot.forecast_time, at(1_700_010_800));
    }

    #[test]
    fn missing_weather_block_is_unknown() {
        let snapshot = snapshot_from_forecast(FORECAST, at(1_700_021_600)).unwrap();
        assert_eq!(snapshot.precipitation, "Unknown");
        assert_eq!(snapshot.icon_code, None);
    }

    #[test]
    fn slot_outside_the_forecast_window() {
        let err = snapshot_from_forecast(FORECAST, at(1_700_021_600 + 4 * 3600)).unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn empty_forecast_is_an_upstream_error() {
        let err = snapshot_from_forecast(r#"{"list": []}"#, at(0)).unwrap_err();
        assert!(err.to_string().contains("no data"));
    }

    #[test]
    fn malformed_forecast_is_an_upstream_error() {
        let err = snapshot_from_forecast("<html>", at(0)).unwrap_err();
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn error_message_comes_from_provider() {
        let body = r#"{
            "cod": 401,
            "message": "Invalid API key. Please see https://openweathermap.org/faq#error401"
        }"#;
        let err = upstream_error(401, body);
        assert_eq!(err.status_code(), 401);
        assert!(err.to_string().starts_with("Invalid API key."));
    }

    #[test]
    fn error_without_message_uses_body() {
        let err = upstream_error(503, "Service Unavailable");
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.to_string(), "Failed to fetch weather data: Service Unavailable");
    }

    #[test]
    fn geocoding_results() {
        let body = r#"[
            {"name": "Portland", "lat": 45.52, "lon": -122.67, "country": "US", "state": "Oregon",
             "local_names": {"en": "Portland"}},
            {"name": "Portland", "lat": 43.66, "lon": -70.25, "country": "US", "state": "Maine"}
        ]"#;
        let places = places_from_geocoding(body).unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].label(), "Portland, Oregon, US");
        assert_eq!(places[1].latitude, 43.66);
    }
}
