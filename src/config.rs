use std::path::PathBuf;

use config::{Config, Environment};
use serde::Deserialize;
use tracing::warn;

/// JRA racecourse codes as they appear in positions 8..10 of a race id.
pub const RACECOURSES: &[(&str, &str)] = &[
    ("01", "札幌"),
    ("02", "函館"),
    ("03", "福島"),
    ("04", "新潟"),
    ("05", "東京"),
    ("06", "中山"),
    ("07", "中京"),
    ("08", "京都"),
    ("09", "阪神"),
    ("10", "小倉"),
];

pub fn racecourse_name(code: &str) -> Option<&'static str> {
    RACECOURSES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Fixed knobs for a scrape run. Built once at startup and passed by
/// reference into the id supplier and the extractor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Courtesy throttle between consecutive fetches, in seconds.
    pub request_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub store_path: PathBuf,
    pub manifest_path: PathBuf,
    pub discovery_years: Vec<i32>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig {
            base_url: "https://race.netkeiba.com".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/120.0.0.0 Safari/537.36"
                .into(),
            request_delay_secs: 2,
            request_timeout_secs: 10,
            store_path: PathBuf::from("public/data/races.json"),
            manifest_path: PathBuf::from("scripts/race_ids.json"),
            discovery_years: vec![2024, 2023, 2022],
        }
    }
}

impl ScrapeConfig {
    /// Defaults overridable through the environment, e.g.
    /// KEIBA_REQUEST_DELAY_SECS=5 or KEIBA_STORE_PATH=/tmp/races.json.
    pub fn load() -> Self {
        let layered = Config::builder()
            .add_source(Environment::with_prefix("KEIBA"))
            .build()
            .and_then(|c| c.try_deserialize::<ScrapeConfig>());
        match layered {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("config from environment unusable, using defaults: {e}");
                ScrapeConfig::default()
            }
        }
    }
}
