use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VenueType {
    #[serde(rename = "Indoors", alias = "Indoor", alias = "indoors", alias = "indoor")]
    Indoor,
    #[serde(rename = "Outdoors", alias = "Outdoor", alias = "outdoors", alias = "outdoor")]
    Outdoor,
}

impl VenueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueType::Indoor => "Indoors",
            VenueType::Outdoor => "Outdoors",
        }
    }

    pub const fn all() -> &'static [VenueType] {
        &[VenueType::Indoor, VenueType::Outdoor]
    }
}

impl fmt::Display for VenueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VenueType {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "indoors" | "indoor" => Ok(VenueType::Indoor),
            "outdoors" | "outdoor" => Ok(VenueType::Outdoor),
            _ => Err(ServiceError::validation(format!(
                "Unknown venue type '{value}'. Expected Indoors or Outdoors."
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three-way choice offered by the form. Only the first two end up in
/// the outing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenderChoice {
    Male,
    Female,
    #[serde(rename = "Prefer Not to Say")]
    PreferNotToSay,
}

impl GenderChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderChoice::Male => "Male",
            GenderChoice::Female => "Female",
            GenderChoice::PreferNotToSay => "Prefer Not to Say",
        }
    }

    pub const fn all() -> &'static [GenderChoice] {
        &[GenderChoice::Male, GenderChoice::Female, GenderChoice::PreferNotToSay]
    }

    pub fn gender(&self) -> Option<Gender> {
        match self {
            GenderChoice::Male => Some(Gender::Male),
            GenderChoice::Female => Some(Gender::Female),
            GenderChoice::PreferNotToSay => None,
        }
    }
}

impl fmt::Display for GenderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A destination picked from place autocomplete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Place {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            state: None,
            country: None,
        }
    }

    /// "Name, State, Country", skipping whatever is unknown.
    pub fn label(&self) -> String {
        [Some(self.name.as_str()), self.state.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Lookup key for the forecast provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Already rounded to a 3-hour slot.
    pub at: DateTime<Utc>,
}

/// Forecast conditions for one slot, in imperial units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_f: f64,
    pub wind_speed_mph: f64,
    pub precipitation: String,
    pub icon_code: Option<String>,
    pub forecast_time: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Temperature and wind rounded to whole numbers, as displayed and as fed
    /// to both the score engine and the recommendation prompt.
    pub fn rounded(mut self) -> Self {
        self.temperature_f = self.temperature_f.round();
        self.wind_speed_mph = self.wind_speed_mph.round();
        self
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon_code
            .as_ref()
            .map(|code| format!("https://openweathermap.org/img/wn/{code}@2x.png"))
    }
}

/// A validated, submitted form. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct OutingRequest {
    pub place: Place,
    /// The slot label as chosen, e.g. "03:00 PM".
    pub arrival_label: String,
    /// Wall-clock arrival in the submitter's offset.
    pub arrival: DateTime<FixedOffset>,
    pub forecast_at: DateTime<Utc>,
    pub duration_hours: u8,
    pub venue: VenueType,
    pub gender: Option<Gender>,
}

impl OutingRequest {
    pub fn forecast_query(&self) -> ForecastQuery {
        ForecastQuery {
            latitude: self.place.latitude,
            longitude: self.place.longitude,
            at: self.forecast_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_type_parses_loosely() {
        assert_eq!("Indoors".parse::<VenueType>().unwrap(), VenueType::Indoor);
        assert_eq!(" outdoor ".parse::<VenueType>().unwrap(), VenueType::Outdoor);
        assert!("garage".parse::<VenueType>().is_err());
    }

    #[test]
    fn venue_type_serializes_as_display_name() {
        let json = serde_json::to_string(&VenueType::Outdoor).unwrap();
        assert_eq!(json, "\"Outdoors\"");
        let parsed: VenueType = serde_json::from_str("\"indoor\"").unwrap();
        assert_eq!(parsed, VenueType::Indoor);
    }

    #[test]
    fn prefer_not_to_say_has_no_gender() {
        assert_eq!(GenderChoice::PreferNotToSay.gender(), None);
        assert_eq!(GenderChoice::Female.gender(), Some(Gender::Female));
    }

    #[test]
    fn place_label_skips_missing_parts() {
        let mut place = Place::new("Portland", 45.5, -122.7);
        assert_eq!(place.label(), "Portland");

        place.country = Some("US".into());
        assert_eq!(place.label(), "Portland, US");

        place.state = Some("Oregon".into());
        assert_eq!(place.label(), "Portland, Oregon, US");
    }

    #[test]
    fn rounded_snapshot() {
        let snapshot = WeatherSnapshot {
            temperature_f: 41.6,
            wind_speed_mph: 12.4,
            precipitation: "light rain".into(),
            icon_code: Some("10d".into()),
            forecast_time: Utc::now(),
        }
        .rounded();

        assert_eq!(snapshot.temperature_f, 42.0);
        assert_eq!(snapshot.wind_speed_mph, 12.0);
        assert_eq!(
            snapshot.icon_url().as_deref(),
            Some("https://openweathermap.org/img/wn/10d@2x.png")
        );
    }
}
