//! Form controller: one explicit state value instead of a handful of
//! independently toggled flags.
//!
//! ```text
//! Editing --submit--> Loading --forecast ok--> Results
//!    ^                   |
//!    |                   +--forecast failed--> Failed
//!    +-------------------edit-------------------+
//! ```
//!
//! The draft lives beside the state, so leaving any state for `Editing`
//! keeps every earlier selection.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    api::MAX_DURATION_HOURS,
    error::ServiceError,
    model::{GenderChoice, OutingRequest, Place, VenueType, WeatherSnapshot},
    prompt::RecommendationPrompt,
    provider::{ForecastProvider, Recommender},
    schedule::{resolve_arrival, round_to_forecast_slot},
    score::{JacketScore, ScoreTable},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please fill in all the required fields.")]
    Incomplete,

    #[error("Duration must be between 1 and {} hours.", MAX_DURATION_HOURS)]
    InvalidDuration,

    #[error("{0}")]
    InvalidTime(ServiceError),

    #[error("A request is already in progress.")]
    Busy,
}

/// What the person has selected so far.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDraft {
    pub place: Option<Place>,
    pub venue: Option<VenueType>,
    /// One of the labels produced by `schedule::arrival_options`.
    pub arrival: Option<String>,
    pub duration_hours: u8,
    pub gender: Option<GenderChoice>,
}

impl Default for FormDraft {
    fn default() -> Self {
        Self {
            place: None,
            venue: None,
            arrival: None,
            duration_hours: 1,
            gender: None,
        }
    }
}

impl FormDraft {
    /// Build the immutable request, resolving the arrival label against `now`.
    pub fn validate<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<OutingRequest, FormError> {
        let (Some(place), Some(venue), Some(arrival_label), Some(gender)) =
            (&self.place, self.venue, &self.arrival, self.gender)
        else {
            return Err(FormError::Incomplete);
        };

        if !(1..=MAX_DURATION_HOURS).contains(&self.duration_hours) {
            return Err(FormError::InvalidDuration);
        }

        let arrival = resolve_arrival(now, arrival_label).map_err(FormError::InvalidTime)?;
        let forecast_at = round_to_forecast_slot(arrival.with_timezone(&Utc));

        Ok(OutingRequest {
            place: place.clone(),
            arrival_label: arrival_label.clone(),
            arrival: arrival.fixed_offset(),
            forecast_at,
            duration_hours: self.duration_hours,
            venue,
            gender: gender.gender(),
        })
    }
}

/// Everything shown after a forecast resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub request: OutingRequest,
    pub weather: WeatherSnapshot,
    pub score: JacketScore,
    /// The language-model text, or the message explaining why it is absent.
    pub recommendation: Result<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Editing { error: Option<String> },
    Loading { request: OutingRequest },
    Results(ResultsView),
    /// The forecast lookup failed; no weather, score or recommendation.
    Failed {
        request: OutingRequest,
        message: String,
    },
}

impl FormState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FormState::Loading { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FormState::Editing { error } => error.as_deref(),
            FormState::Failed { message, .. } => Some(message),
            FormState::Results(view) => view.recommendation.as_ref().err().map(String::as_str),
            FormState::Loading { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct FormController {
    forecast: Arc<dyn ForecastProvider>,
    recommender: Arc<dyn Recommender>,
    table: ScoreTable,
    draft: FormDraft,
    state: FormState,
}

impl FormController {
    pub fn new(
        forecast: Arc<dyn ForecastProvider>,
        recommender: Arc<dyn Recommender>,
        table: ScoreTable,
    ) -> Self {
        Self {
            forecast,
            recommender,
            table,
            draft: FormDraft::default(),
            state: FormState::Editing { error: None },
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn draft(&self) -> &FormDraft {
        &self.draft
    }

    /// Selections can change in any state except while a request is out.
    pub fn draft_mut(&mut self) -> Result<&mut FormDraft, FormError> {
        if self.state.is_loading() {
            return Err(FormError::Busy);
        }
        Ok(&mut self.draft)
    }

    /// Back to input mode: clears the error, keeps the selections.
    pub fn edit(&mut self) -> Result<(), FormError> {
        if self.state.is_loading() {
            return Err(FormError::Busy);
        }
        self.state = FormState::Editing { error: None };
        Ok(())
    }

    /// Validate the draft and enter `Loading`. Nothing is sent anywhere if
    /// this fails.
    pub fn begin_submit<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
    ) -> Result<OutingRequest, FormError> {
        if self.state.is_loading() {
            return Err(FormError::Busy);
        }

        match self.draft.validate(now) {
            Ok(request) => {
                self.state = FormState::Loading {
                    request: request.clone(),
                };
                Ok(request)
            }
            Err(err) => {
                warn!(error = %err, "form submission blocked");
                self.state = FormState::Editing {
                    error: Some(err.to_string()),
                };
                Err(err)
            }
        }
    }

    /// Resolve the forecast, then score and recommend from that same
    /// snapshot, and leave `Loading`. Does nothing in any other state.
    #[instrument(skip_all)]
    async fn complete(&mut self) -> &FormState {
        let FormState::Loading { request } = &self.state else {
            return &self.state;
        };
        let request = request.clone();
        debug!(place = %request.place.name, at = %request.forecast_at, "fetching forecast");

        let weather = match self.forecast.get_forecast(&request.forecast_query()).await {
            Ok(weather) => weather.rounded(),
            Err(err) => {
                warn!(error = %err, "forecast lookup failed");
                self.state = FormState::Failed {
                    request,
                    message: err.to_string(),
                };
                return &self.state;
            }
        };

        let score = self.table.score(
            weather.temperature_f,
            weather.wind_speed_mph,
            &weather.precipitation,
            request.venue,
        );

        let prompt = RecommendationPrompt::for_outing(&request, &weather);
        let recommendation = self.recommender.recommend(&prompt).await.map_err(|err| {
            warn!(error = %err, "recommendation failed");
            err.to_string()
        });

        info!(score = score.value(), recommended = recommendation.is_ok(), "results ready");
        self.state = FormState::Results(ResultsView {
            request,
            weather,
            score,
            recommendation,
        });
        &self.state
    }

    pub async fn submit_at<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
    ) -> Result<&FormState, FormError> {
        self.begin_submit(now)?;
        Ok(self.complete().await)
    }

    pub async fn submit(&mut self) -> Result<&FormState, FormError> {
        self.submit_at(&Local::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Gender;
    use crate::schedule::arrival_options;
    use async_trait::async_trait;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use crate::model::ForecastQuery;

    #[derive(Debug)]
    struct FakeForecast {
        result: Result<WeatherSnapshot, ServiceError>,
        calls: AtomicUsize,
        last_query: Mutex<Option<ForecastQuery>>,
    }

    #[async_trait]
    impl ForecastProvider for FakeForecast {
        async fn get_forecast(
            &self,
            query: &ForecastQuery,
        ) -> Result<WeatherSnapshot, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = Some(*query);
            self.result.clone()
        }
    }

    #[derive(Debug)]
    struct FakeRecommender {
        result: Result<String, ServiceError>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<RecommendationPrompt>>,
    }

    #[async_trait]
    impl Recommender for FakeRecommender {
        async fn recommend(&self, prompt: &RecommendationPrompt) -> Result<String, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.clone());
            self.result.clone()
        }
    }

    fn snowy() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_f: 29.6,
            wind_speed_mph: 19.7,
            precipitation: "snow".into(),
            icon_code: Some("13d".into()),
            forecast_time: Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap(),
        }
    }

    fn setup(
        forecast: Result<WeatherSnapshot, ServiceError>,
        recommendation: Result<String, ServiceError>,
    ) -> (FormController, Arc<FakeForecast>, Arc<FakeRecommender>) {
        let forecast = Arc::new(FakeForecast {
            result: forecast,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        });
        let recommender = Arc::new(FakeRecommender {
            result: recommendation,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        });
        let controller =
            FormController::new(forecast.clone(), recommender.clone(), ScoreTable::default());
        (controller, forecast, recommender)
    }

    fn fill(controller: &mut FormController) {
        let draft = controller.draft_mut().unwrap();
        draft.place = Some(Place::new("Boston Common", 42.355, -71.065));
        draft.venue = Some(VenueType::Outdoor);
        draft.arrival = Some("04:00 PM".into());
        draft.duration_hours = 3;
        draft.gender = Some(GenderChoice::PreferNotToSay);
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 37, 0).unwrap()
    }

    #[test]
    fn draft_defaults_to_one_hour() {
        let draft = FormDraft::default();
        assert_eq!(draft.duration_hours, 1);
        assert_eq!(draft.validate(&now()).unwrap_err(), FormError::Incomplete);
    }

    #[test]
    fn validate_rounds_to_forecast_slot() {
        let draft = FormDraft {
            place: Some(Place::new("Boston Common", 42.355, -71.065)),
            venue: Some(VenueType::Indoor),
            arrival: Some("04:00 PM".into()),
            duration_hours: 2,
            gender: Some(GenderChoice::Female),
        };

        let request = draft.validate(&now()).unwrap();
        let arrival = Utc.with_ymd_and_hms(2024, 1, 15, 16, 0, 0).unwrap();
        let slot = Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap();
        assert_eq!(request.arrival.with_timezone(&Utc), arrival);
        assert_eq!(request.forecast_at, slot);
        assert_eq!(request.gender, Some(Gender::Female));
    }

    #[test]
    fn validate_rejects_bad_duration() {
        let draft = FormDraft {
            place: Some(Place::new("Boston Common", 42.355, -71.065)),
            venue: Some(VenueType::Indoor),
            arrival: Some("04:00 PM".into()),
            duration_hours: 13,
            gender: Some(GenderChoice::Male),
        };
        assert_eq!(draft.validate(&now()).unwrap_err(), FormError::InvalidDuration);
    }

    #[tokio::test]
    async fn missing_venue_blocks_submission_without_network() {
        let (mut controller, forecast, recommender) =
            setup(Ok(snowy()), Ok("Bundle up.".into()));
        fill(&mut controller);
        controller.draft_mut().unwrap().venue = None;

        let err = controller.submit_at(&now()).await.unwrap_err();

        assert_eq!(err, FormError::Incomplete);
        assert_eq!(
            controller.state(),
            &FormState::Editing {
                error: Some("Please fill in all the required fields.".into()),
            }
        );
        assert_eq!(forecast.calls.load(Ordering::SeqCst), 0);
        assert_eq!(recommender.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_submission_shows_results() {
        let (mut controller, forecast, recommender) =
            setup(Ok(snowy()), Ok("Bring a warm coat.".into()));
        fill(&mut controller);

        let state = controller.submit_at(&now()).await.unwrap().clone();

        let FormState::Results(view) = state else {
            panic!("expected results, got {state:?}");
        };
        assert_eq!(view.weather.temperature_f, 30.0);
        assert_eq!(view.weather.wind_speed_mph, 20.0);
        assert!(view.score.value() >= 9);
        assert_eq!(view.recommendation.as_deref(), Ok("Bring a warm coat."));

        let query = forecast.last_query.lock().unwrap().expect("forecast was queried");
        assert_eq!(query.at, Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap());
        assert_eq!(query.latitude, 42.355);

        let prompt = recommender.last_prompt.lock().unwrap().clone().expect("prompt was sent");
        assert_eq!(prompt.temperature_f, 30.0);
        assert_eq!(prompt.wind_mph, 20.0);
        assert_eq!(prompt.gender, None);
        assert_eq!(prompt.time, "04:00 PM");
    }

    #[tokio::test]
    async fn forecast_failure_shows_message_without_weather() {
        let (mut controller, _forecast, recommender) = setup(
            Err(ServiceError::upstream(401, "Invalid API key")),
            Ok("unused".into()),
        );
        fill(&mut controller);

        let state = controller.submit_at(&now()).await.unwrap();

        assert!(matches!(state, FormState::Failed { message, .. } if message == "Invalid API key"));
        assert_eq!(state.error(), Some("Invalid API key"));
        assert_eq!(recommender.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recommendation_failure_keeps_score_and_weather() {
        let (mut controller, _forecast, _recommender) = setup(
            Ok(snowy()),
            Err(ServiceError::upstream(429, "Rate limit reached")),
        );
        fill(&mut controller);

        let state = controller.submit_at(&now()).await.unwrap();

        let FormState::Results(view) = state else {
            panic!("expected results, got {state:?}");
        };
        assert!(view.score.value() >= 9);
        assert_eq!(view.weather.precipitation, "snow");
        assert_eq!(view.recommendation, Err("Rate limit reached".to_string()));
    }

    #[tokio::test]
    async fn edit_keeps_selections_and_clears_error() {
        let (mut controller, _forecast, _recommender) = setup(
            Err(ServiceError::upstream(500, "boom")),
            Ok("unused".into()),
        );
        fill(&mut controller);
        let before = controller.draft().clone();

        controller.submit_at(&now()).await.unwrap();
        controller.edit().unwrap();

        assert_eq!(controller.state(), &FormState::Editing { error: None });
        assert_eq!(controller.draft(), &before);
    }

    #[test]
    fn second_submit_while_loading_is_rejected() {
        let (mut controller, _forecast, _recommender) = setup(Ok(snowy()), Ok("ok".into()));
        fill(&mut controller);

        controller.begin_submit(&now()).unwrap();
        assert!(controller.state().is_loading());

        assert_eq!(controller.begin_submit(&now()).unwrap_err(), FormError::Busy);
        assert_eq!(controller.edit().unwrap_err(), FormError::Busy);
        assert!(controller.draft_mut().is_err());
    }

    #[tokio::test]
    async fn completing_outside_loading_does_nothing() {
        let (mut controller, forecast, recommender) = setup(Ok(snowy()), Ok("ok".into()));
        fill(&mut controller);

        let state = controller.complete().await.clone();

        assert_eq!(state, FormState::Editing { error: None });
        assert_eq!(forecast.calls.load(Ordering::SeqCst), 0);
        assert_eq!(recommender.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn current_hour_survives_the_hour_turning() {
        let (mut controller, forecast, _recommender) = setup(Ok(snowy()), Ok("ok".into()));
        fill(&mut controller);

        let listed = Utc.with_ymd_and_hms(2024, 1, 15, 14, 59, 58).unwrap();
        let first = arrival_options(&listed).remove(0);
        controller.draft_mut().unwrap().arrival = Some(first);

        let submitted = Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 2).unwrap();
        let state = controller.submit_at(&submitted).await.unwrap().clone();

        let FormState::Results(view) = state else {
            panic!("expected results, got {state:?}");
        };
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        assert_eq!(view.request.arrival.with_timezone(&Utc), expected);
        let query = forecast.last_query.lock().unwrap().expect("forecast was queried");
        assert_eq!(query.at, Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn resubmit_after_results() {
        let (mut controller, forecast, _recommender) = setup(Ok(snowy()), Ok("ok".into()));
        fill(&mut controller);

        controller.submit_at(&now()).await.unwrap();
        controller.edit().unwrap();
        controller.draft_mut().unwrap().venue = Some(VenueType::Indoor);
        let state = controller.submit_at(&now()).await.unwrap();

        let FormState::Results(view) = state else {
            panic!("expected results");
        };
        assert_eq!(view.request.venue, VenueType::Indoor);
        assert_eq!(forecast.calls.load(Ordering::SeqCst), 2);
    }
}
