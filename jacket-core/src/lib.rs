//! Core library for JacketScore.
//!
//! This crate defines:
//! - The jacket score engine and its tuning table
//! - Arrival-time helpers and 3-hour forecast slot rounding
//! - Forecast, place search and recommendation providers
//! - The form controller state machine
//! - Configuration & credentials handling
//! - JSON payloads shared with the HTTP API
//!
//! It is used by `jacket-cli`, but can also be reused by other binaries or services.

pub mod api;
pub mod config;
pub mod error;
pub mod form;
pub mod model;
pub mod prompt;
pub mod provider;
pub mod schedule;
pub mod score;

pub use config::{Config, ProviderConfig, RecommendationSettings};
pub use error::ServiceError;
pub use form::{FormController, FormDraft, FormError, FormState, ResultsView};
pub use model::{
    ForecastQuery, Gender, GenderChoice, OutingRequest, Place, VenueType, WeatherSnapshot,
};
pub use prompt::RecommendationPrompt;
pub use provider::{ForecastProvider, PlaceSearch, ProviderId, Recommender};
pub use score::{JacketScore, ScoreTable, Verdict, jacket_score};
