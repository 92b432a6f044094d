//! The outing form, rendered as terminal prompts.
//!
//! Pressing Esc skips a question and leaves that field unset, which the
//! controller then refuses to submit.

use chrono::Local;
use inquire::{Confirm, Select, Text};
use jacket_core::{
    Config, FormController, FormDraft, GenderChoice, Place, PlaceSearch, VenueType,
    provider::{openweather_from_config, recommender_from_config},
    schedule::arrival_options,
};

use crate::output;

const PLACE_SUGGESTIONS: u8 = 5;
const DURATIONS: std::ops::RangeInclusive<u8> = 1..=12;

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let weather = openweather_from_config(config)?;
    let recommender = recommender_from_config(config)?;
    let mut controller =
        FormController::new(weather.clone(), recommender, config.score_table());

    println!("Do You Need a Jacket?");
    println!(
        "Use JacketScore, powered by AI, to decide if you'll need a jacket based on your \
         location, weather, and duration of stay.\n"
    );

    loop {
        let previous = controller.draft().clone();
        let next = collect(&previous, weather.as_ref()).await?;
        *controller.draft_mut()? = next;

        println!("\nCalculating...");
        match controller.submit().await {
            Ok(state) => println!("\n{}", output::render_state(state)),
            Err(err) => println!("\n{err}"),
        }

        let again = Confirm::new("Edit inputs?").with_default(false).prompt()?;
        if !again {
            return Ok(());
        }
        controller.edit()?;
    }
}

/// Ask every question again, offering the previous answers as defaults.
async fn collect(previous: &FormDraft, places: &dyn PlaceSearch) -> anyhow::Result<FormDraft> {
    let place = ask_place(previous.place.as_ref(), places).await?;

    let venue = Select::new("Are you staying indoors or outdoors?", VenueType::all().to_vec())
        .with_starting_cursor(cursor_of(VenueType::all(), previous.venue.as_ref()))
        .prompt_skippable()?;

    let options = arrival_options(&Local::now());
    let arrival_cursor = previous
        .arrival
        .as_ref()
        .and_then(|prev| options.iter().position(|o| o == prev))
        .unwrap_or(0);
    let arrival = Select::new("What time are you arriving?", options)
        .with_starting_cursor(arrival_cursor)
        .prompt_skippable()?;

    let durations: Vec<u8> = DURATIONS.collect();
    let duration_hours = Select::new("How long will you be staying? (hours)", durations.clone())
        .with_starting_cursor(cursor_of(&durations, Some(&previous.duration_hours)))
        .prompt_skippable()?
        .unwrap_or(previous.duration_hours);

    let gender = Select::new("What is your gender?", GenderChoice::all().to_vec())
        .with_starting_cursor(cursor_of(GenderChoice::all(), previous.gender.as_ref()))
        .prompt_skippable()?;

    Ok(FormDraft {
        place,
        venue,
        arrival,
        duration_hours,
        gender,
    })
}

/// Free-text search, then a pick among the matches. Keeps the previous
/// place when its label is submitted unchanged.
async fn ask_place(
    previous: Option<&Place>,
    places: &dyn PlaceSearch,
) -> anyhow::Result<Option<Place>> {
    let previous_label = previous.map(Place::label);

    loop {
        let mut prompt = Text::new("Where are you going?");
        if let Some(label) = previous_label.as_deref() {
            prompt = prompt.with_default(label);
        }
        let Some(query) = prompt.prompt_skippable()? else {
            return Ok(None);
        };

        if previous_label.as_deref() == Some(query.trim()) {
            return Ok(previous.cloned());
        }

        let mut matches = match places.search_places(&query, PLACE_SUGGESTIONS).await {
            Ok(matches) => matches,
            Err(err) => {
                println!("Error: {err}");
                continue;
            }
        };

        match matches.len() {
            0 => println!("No places found for \"{}\".", query.trim()),
            1 => return Ok(matches.pop()),
            _ => {
                if let Some(place) = Select::new("Which one?", matches).prompt_skippable()? {
                    return Ok(Some(place));
                }
            }
        }
    }
}

fn cursor_of<T: PartialEq>(options: &[T], selected: Option<&T>) -> usize {
    selected
        .and_then(|s| options.iter().position(|o| o == s))
        .unwrap_or(0)
}
