use crate::{
    Config, ForecastQuery, Place, ServiceError, WeatherSnapshot,
    prompt::RecommendationPrompt,
    provider::{openai::OpenAiRecommender, openweather::OpenWeatherProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod openai;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    OpenAi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::OpenAi => "openai",
        }
    }

    /// Environment variable that overrides the stored API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
            ProviderId::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::OpenAi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "openai" => Ok(ProviderId::OpenAi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, openai."
            )),
        }
    }
}

/// Forecast lookup for one rounded 3-hour slot.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn get_forecast(&self, query: &ForecastQuery) -> Result<WeatherSnapshot, ServiceError>;
}

/// Place autocomplete.
#[async_trait]
pub trait PlaceSearch: Send + Sync + Debug {
    async fn search_places(&self, query: &str, limit: u8) -> Result<Vec<Place>, ServiceError>;
}

/// Free-text jacket advice. Implementations return the trimmed text only.
#[async_trait]
pub trait Recommender: Send + Sync + Debug {
    async fn recommend(&self, prompt: &RecommendationPrompt) -> Result<String, ServiceError>;
}

fn api_key(id: ProviderId, config: &Config) -> anyhow::Result<String> {
    config.provider_api_key(id).map(str::to_owned).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `jacket configure {id}` or set {}.",
            id.env_var()
        )
    })
}

/// The OpenWeather client serves both forecasts and place search.
pub fn openweather_from_config(config: &Config) -> anyhow::Result<Arc<OpenWeatherProvider>> {
    let key = api_key(ProviderId::OpenWeather, config)?;
    Ok(Arc::new(OpenWeatherProvider::new(key)))
}

pub fn recommender_from_config(config: &Config) -> anyhow::Result<Arc<dyn Recommender>> {
    let key = api_key(ProviderId::OpenAi, config)?;
    let recommender = OpenAiRecommender::new(key, config.recommendation.clone());
    Ok(Arc::new(recommender))
}

/// Cut long upstream bodies down for error messages.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("weatherapi").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn openweather_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = openweather_from_config(&cfg).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("No API key configured for provider 'openweather'"));
        assert!(msg.contains("OPENWEATHER_API_KEY"));
    }

    #[test]
    fn recommender_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = recommender_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("Hint: run `jacket configure openai`"));
    }

    #[test]
    fn providers_build_when_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW".to_string());
        cfg.upsert_provider_api_key(ProviderId::OpenAi, "AI".to_string());

        assert!(openweather_from_config(&cfg).is_ok());
        assert!(recommender_from_config(&cfg).is_ok());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let short = "short body";
        assert_eq!(truncate_body(short), short);

        let long = "é".repeat(300);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
    }
}
