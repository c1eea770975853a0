//! Versioned migration of the stored show collection.
//!
//! The stored document is an envelope `{"version": N, "shows": [...]}`.
//! Documents written by earlier releases were a bare array of shows and are
//! treated as version 1. Each step below is a pure function over the raw
//! JSON that only fills in what is missing, so re-running the composed pass
//! on already-migrated data produces identical output.

use serde_json::{json, Value};

/// Schema version written on every persist.
pub const SCHEMA_VERSION: u64 = 3;

/// Bring a raw stored document up to the current schema.
pub fn migrate_shows(doc: Value) -> Value {
    let (version, mut shows) = split_envelope(doc);
    if version < 2 {
        v1_to_v2(&mut shows);
    }
    if version < 3 {
        v2_to_v3(&mut shows);
    }
    json!({ "version": SCHEMA_VERSION, "shows": shows })
}

/// Pull the show array and its claimed version out of a stored document.
/// Unrecognized top-level shapes yield an empty, current-version collection.
fn split_envelope(doc: Value) -> (u64, Vec<Value>) {
    match doc {
        Value::Array(shows) => (1, shows),
        Value::Object(mut map) => {
            let version = map.get("version").and_then(Value::as_u64).unwrap_or(1);
            let shows = match map.remove("shows") {
                Some(Value::Array(shows)) => shows,
                _ => Vec::new(),
            };
            (version, shows)
        }
        _ => (SCHEMA_VERSION, Vec::new()),
    }
}

/// v1 -> v2: shows gain `maxSeason` (seeded from the legacy `season` field)
/// and an explicit `isFavorite` flag.
fn v1_to_v2(shows: &mut [Value]) {
    for show in shows.iter_mut() {
        let Some(obj) = show.as_object_mut() else {
            continue;
        };
        let max_season = obj.get("maxSeason").and_then(Value::as_u64).filter(|&n| n > 0);
        if max_season.is_none() {
            let season = obj
                .get("season")
                .and_then(Value::as_u64)
                .filter(|&n| n > 0)
                .unwrap_or(1);
            obj.insert("maxSeason".to_string(), json!(season));
        }
        if obj.get("isFavorite").and_then(Value::as_bool).is_none() {
            obj.insert("isFavorite".to_string(), json!(false));
        }
    }
}

/// v2 -> v3: episodes gain explicit season placement and ordering, a
/// post-credit scene body, and normalized optional image fields.
fn v2_to_v3(shows: &mut [Value]) {
    for show in shows.iter_mut() {
        let Some(episodes) = show.get_mut("episodes").and_then(Value::as_array_mut) else {
            continue;
        };
        for (idx, episode) in episodes.iter_mut().enumerate() {
            let Some(obj) = episode.as_object_mut() else {
                continue;
            };
            if obj
                .get("seasonNumber")
                .and_then(Value::as_u64)
                .filter(|&n| n > 0)
                .is_none()
            {
                obj.insert("seasonNumber".to_string(), json!(1));
            }
            if obj
                .get("order")
                .and_then(Value::as_u64)
                .filter(|&n| n > 0)
                .is_none()
            {
                obj.insert("order".to_string(), json!(idx as u64 + 1));
            }
            if obj.get("postCreditScene").and_then(Value::as_str).is_none() {
                obj.insert("postCreditScene".to_string(), json!(""));
            }
            // Optional fields are absent, never null.
            for key in ["imageUrl", "imagePrompt"] {
                if matches!(obj.get(key), Some(Value::Null)) {
                    obj.remove(key);
                }
            }
        }
    }
}
