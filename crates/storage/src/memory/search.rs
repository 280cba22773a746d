//! Relevance scoring for the in-memory adapter.
//!
//! A crude stand-in for `ts_rank`: the share of title words that match any
//! query word, case-insensitively. Rows with no matching word are not hits.

use std::cmp::Ordering;

use quizhub_core::cursor::RankedKey;
use quizhub_core::models::{RankedStudyset, Studyset};

/// Score `studyset` against `query`, or `None` when nothing matches.
pub(super) fn rank(query: &str, studyset: &Studyset) -> Option<RankedStudyset> {
    let needles: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    let words: Vec<String> = studyset
        .title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if needles.is_empty() || words.is_empty() {
        return None;
    }

    let matches = words.iter().filter(|w| needles.contains(w)).count();
    if matches == 0 {
        return None;
    }

    let score = matches as f64 / words.len() as f64;
    Some(RankedStudyset {
        studyset: studyset.clone(),
        score: score.to_string(),
    })
}

fn position(hit: &RankedStudyset) -> (f64, chrono::DateTime<chrono::Utc>, uuid::Uuid) {
    (
        hit.score.parse().unwrap_or(0.0),
        hit.studyset.updated_at,
        hit.studyset.id,
    )
}

fn compare(
    a: (f64, chrono::DateTime<chrono::Utc>, uuid::Uuid),
    b: (f64, chrono::DateTime<chrono::Utc>, uuid::Uuid),
) -> Ordering {
    a.0.total_cmp(&b.0)
        .then(a.1.cmp(&b.1))
        .then(a.2.cmp(&b.2))
}

/// `score DESC, updated_at DESC, id DESC`.
pub(super) fn ranked_desc(a: &RankedStudyset, b: &RankedStudyset) -> Ordering {
    compare(position(b), position(a))
}

/// Whether `hit` sorts strictly after the cursor position.
pub(super) fn ranked_after(hit: &RankedStudyset, after: Option<&RankedKey>) -> bool {
    let Some(key) = after else {
        return true;
    };
    let Ok(score) = key.score.parse::<f64>() else {
        return false;
    };
    compare(position(hit), (score, key.timestamp, key.id)) == Ordering::Less
}
