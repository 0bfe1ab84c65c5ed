use std::collections::HashSet;
use std::fs;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ScrapeConfig;
use crate::fetch;

/// Race ids are 12 digits: YYYYMMDD + course code + race number.
const RACE_ID_LEN: usize = 12;

/// Main G1 cards of the 2022-2024 seasons:
/// (year, month, day, course code, race number).
const G1_CALENDAR: &[(i32, u32, u32, &str, &str)] = &[
    // 2024
    (2024, 12, 22, "06", "11"), // 有馬記念 (中山)
    (2024, 11, 24, "05", "11"), // ジャパンカップ (東京)
    (2024, 10, 27, "05", "11"), // 天皇賞秋 (東京)
    (2024, 10, 6, "08", "11"),  // 秋華賞 (京都)
    (2024, 9, 29, "06", "11"),  // スプリンターズS (中山)
    (2024, 6, 2, "05", "11"),   // 日本ダービー (東京)
    (2024, 5, 26, "05", "11"),  // オークス (東京)
    (2024, 5, 5, "08", "11"),   // NHKマイルC (京都)
    (2024, 4, 28, "05", "11"),  // 天皇賞春 (東京)
    (2024, 4, 21, "06", "11"),  // 皐月賞 (中山)
    (2024, 3, 31, "06", "11"),  // 大阪杯 (中山)
    (2024, 2, 25, "05", "11"),  // フェブラリーS (東京)
    // 2023
    (2023, 12, 24, "06", "11"), // 有馬記念
    (2023, 11, 26, "05", "11"), // ジャパンカップ
    (2023, 10, 29, "05", "11"), // 天皇賞秋
    (2023, 10, 15, "09", "11"), // 秋華賞
    (2023, 10, 1, "06", "11"),  // スプリンターズS
    (2023, 5, 28, "05", "11"),  // 日本ダービー
    (2023, 5, 21, "05", "11"),  // オークス
    (2023, 5, 7, "05", "11"),   // NHKマイルC
    (2023, 4, 30, "08", "11"),  // 天皇賞春
    (2023, 4, 16, "06", "11"),  // 皐月賞
    (2023, 4, 2, "09", "11"),   // 大阪杯
    (2023, 2, 19, "05", "11"),  // フェブラリーS
    // 2022
    (2022, 12, 25, "06", "11"), // 有馬記念
    (2022, 11, 27, "05", "11"), // ジャパンカップ
    (2022, 10, 30, "05", "11"), // 天皇賞秋
    (2022, 10, 16, "09", "11"), // 秋華賞
    (2022, 10, 2, "06", "11"),  // スプリンターズS
    (2022, 5, 29, "05", "11"),  // 日本ダービー
    (2022, 5, 22, "05", "11"),  // オークス
    (2022, 5, 8, "05", "11"),   // NHKマイルC
    (2022, 5, 1, "08", "11"),   // 天皇賞春
    (2022, 4, 17, "06", "11"),  // 皐月賞
    (2022, 4, 3, "09", "11"),   // 大阪杯
    (2022, 2, 20, "05", "11"),  // フェブラリーS
];

/// Deterministic mode: ids built straight from the known G1 calendar.
pub fn calendar_ids(limit: usize) -> Vec<String> {
    G1_CALENDAR
        .iter()
        .map(|(year, month, day, course, race_num)| {
            format!("{year}{month:02}{day:02}{course}{race_num}")
        })
        .take(limit)
        .collect()
}

/// Discovery mode: one listing fetch per configured year, with the
/// courtesy pause between years. A year that fails just contributes
/// nothing.
pub fn discover_ids(client: &Client, cfg: &ScrapeConfig, per_year: usize) -> Vec<String> {
    let mut all = Vec::new();
    for (i, &year) in cfg.discovery_years.iter().enumerate() {
        let ids = discover_year(client, cfg, year, per_year);
        info!("{year}: found {} G1 races", ids.len());
        all.extend(ids);
        if i + 1 < cfg.discovery_years.len() {
            thread::sleep(Duration::from_secs(cfg.request_delay_secs));
        }
    }
    all
}

fn discover_year(client: &Client, cfg: &ScrapeConfig, year: i32, max: usize) -> Vec<String> {
    let url = format!("{}/race/list.html", cfg.base_url);
    let query = [
        ("start_year", year.to_string()),
        ("end_year", year.to_string()),
        ("grade[]", "1".to_string()),
        ("list", "100".to_string()),
    ];
    match fetch::get_text(client, &url, &query) {
        Ok(html) => {
            let mut ids = scan_race_ids(&html);
            ids.truncate(max);
            ids
        }
        Err(e) => {
            warn!("race search for {year} failed: {e}");
            Vec::new()
        }
    }
}

/// Pull race ids out of every race link on a listing page, keeping only
/// well-formed 12-digit ids, first-seen order, no duplicates.
pub fn scan_race_ids(html: &str) -> Vec<String> {
    static RACE_LINK: OnceLock<Selector> = OnceLock::new();
    let link_sel = RACE_LINK.get_or_init(|| {
        Selector::parse(r#"a[href*="/race/"]"#).expect("static CSS selector is valid")
    });
    static RACE_ID_RE: OnceLock<Regex> = OnceLock::new();
    let re = RACE_ID_RE.get_or_init(|| Regex::new(r"race_id=(\d+)").unwrap());

    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for link in doc.select(link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(caps) = re.captures(href) {
            let id = &caps[1];
            if id.len() == RACE_ID_LEN && seen.insert(id.to_string()) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

/// Informational sidecar written after a discovery run; nothing reads it
/// back.
#[derive(Debug, Serialize)]
pub struct RaceIdManifest {
    pub race_ids: Vec<String>,
    pub count: usize,
    pub years: Vec<i32>,
    pub generated_at: String,
}

pub fn write_manifest(cfg: &ScrapeConfig, ids: &[String]) -> Result<()> {
    let manifest = RaceIdManifest {
        race_ids: ids.to_vec(),
        count: ids.len(),
        years: cfg.discovery_years.clone(),
        generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    if let Some(parent) = cfg.manifest_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&cfg.manifest_path, json)
        .with_context(|| format!("failed to write {}", cfg.manifest_path.display()))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_builds_zero_padded_ids() {
        let ids = calendar_ids(usize::MAX);
        assert_eq!(ids.len(), 36);
        assert_eq!(ids[0], "202412220611");
        // Single-digit day zero-pads.
        assert_eq!(ids[3], "202410060811");
        assert!(ids.iter().all(|id| id.len() == RACE_ID_LEN));
    }

    #[test]
    fn calendar_respects_limit() {
        assert_eq!(calendar_ids(5).len(), 5);
        assert!(calendar_ids(0).is_empty());
    }

    #[test]
    fn scan_keeps_only_well_formed_ids() {
        let html = r#"<html><body>
            <a href="/race/?race_id=202412220611">有馬記念</a>
            <a href="/race/?race_id=123">broken</a>
            <a href="/race/?race_id=202412220611">dup</a>
            <a href="/top/">elsewhere</a>
            <a href="/race/?race_id=202305280511">ダービー</a>
        </body></html>"#;
        let ids = scan_race_ids(html);
        assert_eq!(ids, vec!["202412220611", "202305280511"]);
    }

    #[test]
    fn scan_of_linkless_page_is_empty() {
        assert!(scan_race_ids("<html><body><p>no links</p></body></html>").is_empty());
    }

    #[test]
    fn manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ScrapeConfig {
            manifest_path: dir.path().join("race_ids.json"),
            ..ScrapeConfig::default()
        };
        let ids = vec!["202412220611".to_string(), "202305280511".to_string()];
        write_manifest(&cfg, &ids).unwrap();

        let raw = std::fs::read_to_string(&cfg.manifest_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["race_ids"][0], "202412220611");
        assert_eq!(value["years"][0], 2024);
        assert!(!value["generated_at"].as_str().unwrap().is_empty());
    }
}
