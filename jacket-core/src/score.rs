//! The jacket score engine.
//!
//! A heuristic, not a physical model: a temperature band sets the base,
//! wind and precipitation add to it, an indoor venue discounts the total,
//! and the result is rounded and clamped into `min_score..=max_score`.
//! All tuning lives in [`ScoreTable`] so it can be recalibrated without
//! touching [`ScoreTable::score`].

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

use crate::model::VenueType;

/// Base points for temperatures at or below `up_to_f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBand {
    pub up_to_f: f64,
    pub points: f64,
}

pub const DEFAULT_TEMPERATURE_BANDS: [TemperatureBand; 5] = [
    TemperatureBand {
        up_to_f: 32.0,
        points: 7.0,
    },
    TemperatureBand {
        up_to_f: 45.0,
        points: 5.0,
    },
    TemperatureBand {
        up_to_f: 55.0,
        points: 4.0,
    },
    TemperatureBand {
        up_to_f: 65.0,
        points: 2.0,
    },
    TemperatureBand {
        up_to_f: 75.0,
        points: 1.0,
    },
];
pub const DEFAULT_WARM_POINTS: f64 = 0.0;
pub const DEFAULT_WIND_POINTS_PER_MPH: f64 = 0.1;
pub const DEFAULT_WIND_POINTS_CAP: f64 = 3.0;
pub const DEFAULT_PRECIPITATION_BONUS: f64 = 2.0;
pub const DEFAULT_INDOOR_MULTIPLIER: f64 = 0.5;
pub const DEFAULT_MIN_SCORE: u8 = 0;
pub const DEFAULT_MAX_SCORE: u8 = 10;
pub const DEFAULT_PRECIPITATION_KEYWORDS: [&str; 9] = [
    "rain",
    "snow",
    "drizzle",
    "sleet",
    "hail",
    "shower",
    "thunderstorm",
    "freezing",
    "ice",
];

/// Tuning table for the score engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    /// Ascending by `up_to_f`, with non-increasing `points`.
    pub temperature_bands: Vec<TemperatureBand>,
    /// Base points above the last band.
    pub warm_points: f64,
    pub wind_points_per_mph: f64,
    pub wind_points_cap: f64,
    pub precipitation_bonus: f64,
    pub precipitation_keywords: Vec<String>,
    /// Applied to the whole total for indoor venues, in `0.0..=1.0`.
    pub indoor_multiplier: f64,
    pub min_score: u8,
    pub max_score: u8,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            temperature_bands: DEFAULT_TEMPERATURE_BANDS.to_vec(),
            warm_points: DEFAULT_WARM_POINTS,
            wind_points_per_mph: DEFAULT_WIND_POINTS_PER_MPH,
            wind_points_cap: DEFAULT_WIND_POINTS_CAP,
            precipitation_bonus: DEFAULT_PRECIPITATION_BONUS,
            precipitation_keywords: DEFAULT_PRECIPITATION_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            indoor_multiplier: DEFAULT_INDOOR_MULTIPLIER,
            min_score: DEFAULT_MIN_SCORE,
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

impl ScoreTable {
    /// Check the properties `score` relies on: monotone bands, non-negative
    /// contributions, a discounting indoor multiplier and a sane range.
    pub fn validate(&self) -> Result<(), String> {
        for pair in self.temperature_bands.windows(2) {
            if pair[0].up_to_f.partial_cmp(&pair[1].up_to_f) != Some(Ordering::Less) {
                return Err(format!(
                    "temperature bands must be strictly ascending (found {} then {})",
                    pair[0].up_to_f, pair[1].up_to_f
                ));
            }
            if pair[1].points > pair[0].points {
                return Err(format!(
                    "band points must not increase with temperature (band up to {}°F)",
                    pair[1].up_to_f
                ));
            }
        }

        if !self.temperature_bands.iter().all(|b| non_negative(b.points)) {
            return Err("band points must be non-negative".into());
        }

        let last_band_points = self.temperature_bands.last().map(|b| b.points);
        let above_last_band = last_band_points.is_some_and(|p| self.warm_points > p);
        if !non_negative(self.warm_points) || above_last_band {
            return Err(
                "warm_points must be non-negative and at most the last band's points".into(),
            );
        }

        if !non_negative(self.wind_points_per_mph) || !non_negative(self.wind_points_cap) {
            return Err("wind points must be non-negative".into());
        }
        if !non_negative(self.precipitation_bonus) {
            return Err("precipitation_bonus must be non-negative".into());
        }
        if !(0.0..=1.0).contains(&self.indoor_multiplier) {
            return Err("indoor_multiplier must be between 0 and 1".into());
        }
        if self.min_score > self.max_score {
            return Err("min_score must not exceed max_score".into());
        }

        Ok(())
    }

    fn base_points(&self, temperature_f: f64) -> f64 {
        self.temperature_bands
            .iter()
            .find(|band| temperature_f <= band.up_to_f)
            .map_or(self.warm_points, |band| band.points)
    }

    fn wind_points(&self, wind_mph: f64) -> f64 {
        // f64::max drops NaN, so NaN wind counts as calm.
        let wind = wind_mph.max(0.0);
        (wind * self.wind_points_per_mph).min(self.wind_points_cap)
    }

    pub fn is_precipitation(&self, descriptor: &str) -> bool {
        let descriptor = descriptor.to_lowercase();
        self.precipitation_keywords
            .iter()
            .any(|keyword| descriptor.contains(&keyword.to_lowercase()))
    }

    /// Score an outing. Total over all inputs: never fails, never leaves
    /// the configured range.
    pub fn score(
        &self,
        temperature_f: f64,
        wind_mph: f64,
        precipitation: &str,
        venue: VenueType,
    ) -> JacketScore {
        let mut total = self.base_points(temperature_f) + self.wind_points(wind_mph);
        if self.is_precipitation(precipitation) {
            total += self.precipitation_bonus;
        }
        if venue == VenueType::Indoor {
            total *= self.indoor_multiplier;
        }

        // Tables built in code skip `validate`, so order the bounds here.
        let low = self.min_score.min(self.max_score);
        let high = self.min_score.max(self.max_score);
        let (min, max) = (f64::from(low), f64::from(high));
        let clamped = if total.is_nan() {
            min
        } else {
            total.round().clamp(min, max)
        };

        JacketScore {
            value: clamped as u8,
            max: high,
        }
    }
}

// False for NaN.
fn non_negative(value: f64) -> bool {
    value >= 0.0
}

/// Score with the shipped table.
pub fn jacket_score(
    temperature_f: f64,
    wind_mph: f64,
    precipitation: &str,
    venue: VenueType,
) -> JacketScore {
    ScoreTable::default().score(temperature_f, wind_mph, precipitation, venue)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    NoJacket,
    LightLayer,
    Jacket,
    HeavyCoat,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::NoJacket => "No jacket needed",
            Verdict::LightLayer => "A light layer should do",
            Verdict::Jacket => "Bring a jacket",
            Verdict::HeavyCoat => "Wear a heavy coat",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JacketScore {
    value: u8,
    max: u8,
}

impl JacketScore {
    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn verdict(&self) -> Verdict {
        if self.max == 0 {
            return Verdict::NoJacket;
        }
        let fraction = f64::from(self.value) / f64::from(self.max);
        if fraction < 0.25 {
            Verdict::NoJacket
        } else if fraction < 0.45 {
            Verdict::LightLayer
        } else if fraction < 0.75 {
            Verdict::Jacket
        } else {
            Verdict::HeavyCoat
        }
    }
}

impl fmt::Display for JacketScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.max)
    }
}
