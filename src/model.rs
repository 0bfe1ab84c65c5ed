use serde::{Deserialize, Serialize};

/// A shutuba page never lists more than a full gate of 18.
pub const MAX_HORSES: usize = 18;

pub const DEFAULT_DISTANCE: u32 = 2000;
pub const DEFAULT_WEIGHT: u32 = 480;
pub const DEFAULT_JOCKEY: &str = "騎手";
pub const TRAINER_PLACEHOLDER: &str = "調教師";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    G1,
    G2,
    G3,
}

impl Grade {
    /// Grade is inferred from the race name. netkeiba mixes ASCII and
    /// full-width roman numerals, so both spellings count.
    pub fn from_name(name: &str) -> Grade {
        if name.contains("G1") || name.contains("GⅠ") {
            Grade::G1
        } else if name.contains("G2") || name.contains("GⅡ") {
            Grade::G2
        } else {
            Grade::G3
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Track {
    #[serde(rename = "芝")]
    Turf,
    #[serde(rename = "ダート")]
    Dirt,
}

impl Track {
    pub fn from_detail(detail: &str) -> Track {
        if detail.contains("芝") {
            Track::Turf
        } else {
            Track::Dirt
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weather {
    #[serde(rename = "晴")]
    Sunny,
    #[serde(rename = "曇")]
    Cloudy,
    #[serde(rename = "雨")]
    Rainy,
}

impl Weather {
    /// 曇 wins over 雨 when the detail line mentions both.
    pub fn from_detail(detail: &str) -> Weather {
        if detail.contains("曇") {
            Weather::Cloudy
        } else if detail.contains("雨") {
            Weather::Rainy
        } else {
            Weather::Sunny
        }
    }
}

/// One race card. Field order is the JSON key order in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub id: String,
    pub name: String,
    pub grade: Grade,
    pub distance: u32,
    pub track: Track,
    pub weather: Weather,
    pub week: u32,
    pub description: String,
    pub horses: Vec<Horse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horse {
    pub id: String,
    pub number: u32,
    pub name: String,
    pub speed: u32,
    pub stamina: u32,
    pub odds_base: f64,
    pub jockey: String,
    pub weight: u32,
    pub trainer: String,
}

// Ability scores and the odds baseline are not on the page; they are
// derived from gate position and distance so repeated runs over the same
// card produce identical records.

pub fn speed_for(idx: u32) -> u32 {
    let raw = 85 - 3 * (i64::from(idx) - 1);
    raw.clamp(60, 95) as u32
}

pub fn stamina_for(idx: u32, distance: u32) -> u32 {
    // div_euclid floors toward -inf for short distances
    let bonus = 5 * (i64::from(distance) - 1600).div_euclid(400);
    let raw = 80 + bonus - 2 * (i64::from(idx) - 1);
    raw.clamp(60, 95) as u32
}

pub fn odds_base_for(idx: u32) -> f64 {
    let raw = 2.0 + 1.5 * (f64::from(idx) - 1.0);
    (raw * 10.0).round() / 10.0
}
