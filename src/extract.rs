use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::warn;

use crate::config::ScrapeConfig;
use crate::fetch;
use crate::model::{
    odds_base_for, speed_for, stamina_for, Grade, Horse, Race, Track, Weather,
    DEFAULT_DISTANCE, DEFAULT_JOCKEY, DEFAULT_WEIGHT, MAX_HORSES, TRAINER_PLACEHOLDER,
};

/// Why a shutuba page produced no record. Transport problems and missing
/// page structure get separate log lines, so they stay separate variants.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("page is missing the {0} block")]
    MissingField(&'static str),
}

fn sel(slot: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    slot.get_or_init(|| Selector::parse(css).expect("static CSS selector is valid"))
}

static RACE_NAME: OnceLock<Selector> = OnceLock::new();
static RACE_DATA: OnceLock<Selector> = OnceLock::new();
static SHUTUBA_TABLE: OnceLock<Selector> = OnceLock::new();
static HORSE_ROW: OnceLock<Selector> = OnceLock::new();
static UMABAN: OnceLock<Selector> = OnceLock::new();
static HORSE_NAME: OnceLock<Selector> = OnceLock::new();
static JOCKEY: OnceLock<Selector> = OnceLock::new();
static WEIGHT: OnceLock<Selector> = OnceLock::new();

/// Fetch one shutuba page and extract its race record.
pub fn scrape_race(
    client: &Client,
    cfg: &ScrapeConfig,
    race_id: &str,
) -> Result<Race, ExtractError> {
    let url = format!("{}/race/shutuba.html", cfg.base_url);
    let body = fetch::get_text(client, &url, &[("race_id", race_id.to_string())])?;
    parse_race(&body, race_id)
}

/// Extract a race record from shutuba page HTML. The race name and the
/// RaceData01 detail line are the only mandatory pieces of structure;
/// everything else degrades to a per-field default.
pub fn parse_race(html: &str, race_id: &str) -> Result<Race, ExtractError> {
    let doc = Html::parse_document(html);

    let name = doc
        .select(sel(&RACE_NAME, ".RaceName"))
        .next()
        .map(text_of)
        .ok_or(ExtractError::MissingField("RaceName"))?;

    let detail = doc
        .select(sel(&RACE_DATA, ".RaceData01"))
        .next()
        .map(text_of)
        .ok_or(ExtractError::MissingField("RaceData01"))?;

    let distance = parse_distance(&detail);
    let track = Track::from_detail(&detail);
    let weather = Weather::from_detail(&detail);
    let grade = Grade::from_name(&name);

    // A card with no entry table is still a valid race, just an empty one.
    let mut horses = Vec::new();
    if let Some(table) = doc.select(sel(&SHUTUBA_TABLE, ".Shutuba_Table")).next() {
        for (i, row) in table.select(sel(&HORSE_ROW, "tr.HorseList")).enumerate() {
            let idx = (i + 1) as u32;
            match parse_horse_row(row, idx, race_id, distance) {
                Ok(horse) => horses.push(horse),
                Err(e) => warn!("race {race_id}: skipping horse row {idx}: {e:#}"),
            }
        }
    }
    horses.truncate(MAX_HORSES);

    Ok(Race {
        id: format!("race_{race_id}"),
        name: name.clone(),
        grade,
        distance,
        track,
        weather,
        week: 1, // rewritten on merge
        description: name,
        horses,
    })
}

fn parse_horse_row(
    row: ElementRef,
    idx: u32,
    race_id: &str,
    distance: u32,
) -> anyhow::Result<Horse> {
    // A present but non-numeric gate cell fails the row; an absent one
    // falls back to the row position.
    let number = match row.select(sel(&UMABAN, ".Umaban")).next() {
        Some(td) => {
            let text = text_of(td);
            text.parse::<u32>()
                .with_context(|| format!("gate number {text:?} is not a number"))?
        }
        None => idx,
    };

    let name = row
        .select(sel(&HORSE_NAME, ".Horse_Name a"))
        .next()
        .map(text_of)
        .unwrap_or_else(|| format!("馬{idx}"));

    let jockey = row
        .select(sel(&JOCKEY, ".Jockey a"))
        .next()
        .map(text_of)
        .unwrap_or_else(|| DEFAULT_JOCKEY.to_string());

    // Weight cells read like "482(+2)"; the leading digit run is the weight.
    let weight_text = row
        .select(sel(&WEIGHT, ".Weight"))
        .next()
        .map(text_of)
        .unwrap_or_else(|| DEFAULT_WEIGHT.to_string());
    let weight = first_digit_run(&weight_text).unwrap_or(DEFAULT_WEIGHT);

    Ok(Horse {
        id: format!("h{race_id}_{idx:02}"),
        number,
        name,
        speed: speed_for(idx),
        stamina: stamina_for(idx, distance),
        odds_base: odds_base_for(idx),
        jockey,
        weight,
        trainer: TRAINER_PLACEHOLDER.to_string(),
    })
}

/// First digit run directly before the "m" unit marker, defaulting when
/// the detail line carries no distance at all.
fn parse_distance(detail: &str) -> u32 {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d+)m").unwrap());
    re.captures(detail)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(DEFAULT_DISTANCE)
}

fn first_digit_run(text: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d+)").unwrap());
    re.captures(text).and_then(|caps| caps[1].parse().ok())
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── Tests ──
