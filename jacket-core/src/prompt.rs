use std::fmt::Write as _;

use crate::model::{Gender, OutingRequest, VenueType, WeatherSnapshot};

/// Everything the language model is told about an outing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationPrompt {
    pub location: String,
    /// Arrival time as displayed, e.g. "03:00 PM".
    pub time: String,
    pub duration_hours: u8,
    pub temperature_f: f64,
    pub wind_mph: f64,
    pub precipitation: String,
    pub venue: VenueType,
    pub gender: Option<Gender>,
}

impl RecommendationPrompt {
    pub fn for_outing(request: &OutingRequest, weather: &WeatherSnapshot) -> Self {
        Self {
            location: request.place.name.clone(),
            time: request.arrival_label.clone(),
            duration_hours: request.duration_hours,
            temperature_f: weather.temperature_f,
            wind_mph: weather.wind_speed_mph,
            precipitation: weather.precipitation.clone(),
            venue: request.venue,
            gender: request.gender,
        }
    }

    pub fn text(&self) -> String {
        let mut prompt = format!(
            "I'm going to a {} venue called {} at {} for {} hours. \
             The weather is {} degrees F with {} mph wind and {}.",
            self.venue,
            self.location,
            self.time,
            self.duration_hours,
            self.temperature_f,
            self.wind_mph,
            self.precipitation,
        );

        if let Some(gender) = self.gender {
            let _ = write!(prompt, " The person is {gender}.");
        }

        prompt.push_str(" Do I need a jacket? Provide a brief recommendation.");
        prompt
    }
}
