//! Human-friendly rendering of form states and scores.

use jacket_core::{FormState, JacketScore, ResultsView};
use std::fmt::Write as _;

pub fn render_score(score: &JacketScore) -> String {
    let filled = usize::from(score.value());
    let empty = usize::from(score.max().saturating_sub(score.value()));
    format!(
        "Your Jacket Score: {score}  [{}{}]\n{}",
        "#".repeat(filled),
        "-".repeat(empty),
        score.verdict()
    )
}

fn render_results(view: &ResultsView) -> String {
    let mut out = render_score(&view.score);

    out.push_str("\n\nRecommendation\n");
    match &view.recommendation {
        Ok(text) => out.push_str(text),
        Err(message) => {
            let _ = write!(out, "Unavailable: {message}");
        }
    }

    let weather = &view.weather;
    let request = &view.request;
    let _ = write!(
        out,
        "\n\nWeather Information\n\
         {place} at {arrival} for {duration} h ({venue})\n\
         Temperature: {temp}°F\n\
         Wind Speed: {wind} mph\n\
         Precipitation: {precipitation}",
        place = request.place,
        arrival = request.arrival_label,
        duration = request.duration_hours,
        venue = request.venue,
        temp = weather.temperature_f,
        wind = weather.wind_speed_mph,
        precipitation = weather.precipitation,
    );
    if let Some(url) = weather.icon_url() {
        let _ = write!(out, "\nIcon: {url}");
    }

    out
}

pub fn render_state(state: &FormState) -> String {
    match state {
        FormState::Editing {
            error: Some(message),
        } => format!("Error: {message}"),
        FormState::Editing { error: None } => String::new(),
        FormState::Loading { .. } => "Calculating...".to_string(),
        FormState::Results(view) => render_results(view),
        FormState::Failed { message, .. } => format!("Error: {message}"),
    }
}
