//! JSON payloads exchanged with the HTTP API.
//!
//! Request payloads are deliberately loose (every field optional, numbers may
//! arrive as strings) and are turned into typed values by `validate`, which
//! reports problems as [`ServiceError::Validation`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::ServiceError,
    model::{Gender, VenueType, WeatherSnapshot},
    prompt::RecommendationPrompt,
};

pub const MISSING_DATA: &str = "Missing or invalid data in request body.";
pub const INVALID_NUMBERS: &str = "Invalid number format for temperature, wind, or duration.";
pub const MAX_DURATION_HOURS: u8 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&ServiceError> for ErrorBody {
    fn from(err: &ServiceError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Query string of the forecast lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
    /// Unix seconds.
    pub timestamp: i64,
}

impl WeatherQuery {
    pub fn at(&self) -> Result<DateTime<Utc>, ServiceError> {
        DateTime::from_timestamp(self.timestamp, 0)
            .ok_or_else(|| ServiceError::validation("Invalid timestamp."))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherPayload {
    pub temp: f64,
    pub wind_speed: f64,
    pub precipitation: String,
    pub icon_code: Option<String>,
    pub forecast_time: i64,
}

impl From<&WeatherSnapshot> for WeatherPayload {
    fn from(snapshot: &WeatherSnapshot) -> Self {
        Self {
            temp: snapshot.temperature_f,
            wind_speed: snapshot.wind_speed_mph,
            precipitation: snapshot.precipitation.clone(),
            icon_code: snapshot.icon_code.clone(),
            forecast_time: snapshot.forecast_time.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesQuery {
    pub q: String,
    pub limit: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePayload {
    pub temperature: Option<Value>,
    pub wind_speed: Option<Value>,
    pub precipitation: Option<String>,
    pub venue_type: Option<String>,
}

/// Validated score engine inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreInputs {
    pub temperature_f: f64,
    pub wind_mph: f64,
    pub precipitation: String,
    pub venue: VenueType,
}

impl ScorePayload {
    pub fn validate(self) -> Result<ScoreInputs, ServiceError> {
        let (Some(temperature), Some(wind), Some(precipitation), Some(venue)) =
            (self.temperature, self.wind_speed, self.precipitation, self.venue_type)
        else {
            return Err(ServiceError::validation(MISSING_DATA));
        };

        let venue = venue
            .parse()
            .map_err(|_| ServiceError::validation(MISSING_DATA))?;
        let (Some(temperature_f), Some(wind_mph)) =
            (parse_number(&temperature), parse_number(&wind))
        else {
            return Err(ServiceError::validation(
                "Invalid number format for temperature or wind speed.",
            ));
        };

        Ok(ScoreInputs {
            temperature_f,
            wind_mph,
            precipitation,
            venue,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationPayload {
    pub location: Option<String>,
    pub time: Option<String>,
    pub duration: Option<Value>,
    pub temperature: Option<Value>,
    pub wind: Option<Value>,
    pub precipitation: Option<String>,
    pub venue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl RecommendationPayload {
    pub fn from_prompt(prompt: &RecommendationPrompt) -> Self {
        Self {
            location: Some(prompt.location.clone()),
            time: Some(prompt.time.clone()),
            duration: Some(prompt.duration_hours.into()),
            temperature: Some(prompt.temperature_f.into()),
            wind: Some(prompt.wind_mph.into()),
            precipitation: Some(prompt.precipitation.clone()),
            venue_type: Some(prompt.venue.to_string()),
            gender: prompt.gender.map(|g| g.to_string()),
        }
    }

    pub fn validate(self) -> Result<RecommendationPrompt, ServiceError> {
        let missing = || ServiceError::validation(MISSING_DATA);

        let location = non_empty(self.location).ok_or_else(missing)?;
        let time = non_empty(self.time).ok_or_else(missing)?;
        let duration = self.duration.filter(is_truthy).ok_or_else(missing)?;
        let temperature = self.temperature.ok_or_else(missing)?;
        let wind = self.wind.ok_or_else(missing)?;
        let precipitation = non_empty(self.precipitation).ok_or_else(missing)?;
        let venue: VenueType = non_empty(self.venue_type)
            .ok_or_else(missing)?
            .parse()
            .map_err(|_| missing())?;
        let gender = parse_gender(self.gender.as_deref()).ok_or_else(missing)?;

        let (Some(temperature_f), Some(wind_mph), Some(duration)) =
            (parse_number(&temperature), parse_number(&wind), parse_whole(&duration))
        else {
            return Err(ServiceError::validation(INVALID_NUMBERS));
        };

        let duration_hours = u8::try_from(duration)
            .ok()
            .filter(|d| (1..=MAX_DURATION_HOURS).contains(d))
            .ok_or_else(|| {
                ServiceError::validation(format!(
                    "Duration must be between 1 and {MAX_DURATION_HOURS} hours."
                ))
            })?;

        Ok(RecommendationPrompt {
            location,
            time,
            duration_hours,
            temperature_f,
            wind_mph,
            precipitation,
            venue,
            gender,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendation: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `Some(None)` is a valid "no gender" answer; `None` is an unknown value.
fn parse_gender(value: Option<&str>) -> Option<Option<Gender>> {
    match value.map(|g| g.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("prefer not to say") => Some(None),
        Some("male") => Some(Some(Gender::Male)),
        Some("female") => Some(Some(Gender::Female)),
        Some(_) => None,
    }
}

/// A finite number, given either as a JSON number or a numeric string.
pub fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// An integer, truncating fractional input.
fn parse_whole(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}
