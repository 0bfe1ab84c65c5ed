use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::Race;

/// Load the persisted race collection. A missing file is an empty
/// collection; a file that exists but does not parse is fatal.
pub fn load_races(path: &Path) -> Result<Vec<Race>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()))
        }
    };
    serde_json::from_str(&raw)
        .with_context(|| format!("malformed race store at {}", path.display()))
}

pub struct MergeOutcome {
    pub races: Vec<Race>,
    pub added: usize,
}

/// Append fresh races whose id the store has not seen, then renumber
/// `week` 1..N across the whole collection. Existing records are never
/// overwritten or edited beyond that renumbering.
pub fn merge_races(existing: Vec<Race>, fresh: Vec<Race>) -> MergeOutcome {
    let known: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();

    let mut races = existing;
    let mut added = 0;
    for race in fresh {
        if known.contains(&race.id) {
            continue;
        }
        races.push(race);
        added += 1;
    }

    for (i, race) in races.iter_mut().enumerate() {
        race.week = (i + 1) as u32;
    }

    MergeOutcome { races, added }
}

pub fn save_races(path: &Path, races: &[Race]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(races)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Grade, Horse, Track, Weather};

    fn race(raw_id: &str, name: &str) -> Race {
        Race {
            id: format!("race_{raw_id}"),
            name: name.to_string(),
            grade: Grade::G1,
            distance: 2500,
            track: Track::Turf,
            weather: Weather::Sunny,
            week: 1,
            description: name.to_string(),
            horses: vec![Horse {
                id: format!("h{raw_id}_01"),
                number: 1,
                name: "馬1".into(),
                speed: 85,
                stamina: 90,
                odds_base: 2.0,
                jockey: "騎手".into(),
                weight: 480,
                trainer: "調教師".into(),
            }],
        }
    }

    #[test]
    fn merge_appends_unknown_and_skips_known() {
        let existing = vec![race("202212250611", "有馬記念")];
        let fresh = vec![
            race("202212250611", "有馬記念"),
            race("202312240611", "有馬記念"),
        ];
        let out = merge_races(existing, fresh);
        assert_eq!(out.added, 1);
        assert_eq!(out.races.len(), 2);
        assert_eq!(out.races[1].id, "race_202312240611");
    }

    #[test]
    fn merge_is_idempotent() {
        let fresh = vec![race("a", "A"), race("b", "B")];
        let first = merge_races(Vec::new(), fresh.clone());
        let second = merge_races(first.races.clone(), fresh);
        assert_eq!(second.added, 0);
        assert_eq!(second.races, first.races);
    }

    #[test]
    fn weeks_are_contiguous_after_merge() {
        let existing = vec![race("a", "A"), race("b", "B")];
        let fresh = vec![race("c", "C"), race("d", "D")];
        let out = merge_races(existing, fresh);
        let weeks: Vec<u32> = out.races.iter().map(|r| r.week).collect();
        assert_eq!(weeks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn merge_rewrites_stale_week_numbers() {
        let mut existing = vec![race("a", "A"), race("b", "B")];
        existing[0].week = 7;
        existing[1].week = 7;
        let out = merge_races(existing, Vec::new());
        assert_eq!(out.added, 0);
        assert_eq!(out.races[0].week, 1);
        assert_eq!(out.races[1].week, 2);
    }

    #[test]
    fn merge_leaves_existing_fields_untouched() {
        let existing = vec![race("202212250611", "有馬記念")];
        let snapshot = existing.clone();
        let out = merge_races(existing, vec![race("x", "X")]);

        let kept = &out.races[0];
        let orig = &snapshot[0];
        assert_eq!(kept.id, orig.id);
        assert_eq!(kept.name, orig.name);
        assert_eq!(kept.grade, orig.grade);
        assert_eq!(kept.distance, orig.distance);
        assert_eq!(kept.track, orig.track);
        assert_eq!(kept.weather, orig.weather);
        assert_eq!(kept.description, orig.description);
        assert_eq!(kept.horses, orig.horses);
    }

    #[test]
    fn missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let races = load_races(&dir.path().join("races.json")).unwrap();
        assert!(races.is_empty());
    }

    #[test]
    fn malformed_store_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("races.json");
        fs::write(&path, "not json at all").unwrap();
        assert!(load_races(&path).is_err());
    }

    #[test]
    fn save_then_load_roundtrips_with_literal_japanese() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("races.json");
        let races = vec![race("202212250611", "有馬記念")];
        save_races(&path, &races).unwrap();

        // Human-readable characters stay literal, not \u-escaped.
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("有馬記念"));

        assert_eq!(load_races(&path).unwrap(), races);
    }
}
