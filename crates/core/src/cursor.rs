//! Opaque keyset pagination cursors.
//!
//! A cursor is the sort key of the last row a client has seen, joined with
//! [`DELIMITER`] and encoded with the URL-safe base64 alphabet (no padding).
//! Three shapes exist, one per total order used by the API:
//!
//! | Shape          | Order                              | Plain text                |
//! |----------------|------------------------------------|---------------------------|
//! | [`RecencyKey`] | `timestamp DESC, id DESC`          | `<timestamp>\|<id>`        |
//! | [`RankedKey`]  | `score DESC, timestamp DESC, id DESC` | `<score>\|<timestamp>\|<id>` |
//! | [`IdKey`]      | `id ASC`                           | `id\|<id>`                 |
//!
//! Every part is validated on decode (timestamps must parse, scores must be
//! finite decimals, ids must be UUIDs, the id shape must carry its tag), so a
//! cursor produced for one shape never decodes as another.
//!
//! Parts must not contain the delimiter. Timestamps, decimal scores and UUIDs
//! cannot, so no escaping is done; free-text sort keys would need it.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::metrics::record_invalid_cursor;

/// Separator between sort-key parts.
pub const DELIMITER: char = '|';

/// Written in place of an empty first part so a token never starts with the
/// delimiter.
const EMPTY_PLACEHOLDER: &str = "~";

/// Leading tag of [`IdKey`] cursors.
const ID_TAG: &str = "id";

// =============================================================================
// Cursor
// =============================================================================

/// Opaque cursor for pagination.
///
/// The cursor value should be treated as an opaque token by clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub value: String,
}

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Reasons a cursor failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("cursor is empty")]
    Empty,

    #[error("cursor is not valid base64: {0}")]
    Encoding(String),

    #[error("cursor is not valid UTF-8")]
    Utf8,

    #[error("expected {expected} cursor parts, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("cursor type tag mismatch")]
    Tag,

    #[error("invalid cursor {field}: {value:?}")]
    Field { field: &'static str, value: String },
}

// =============================================================================
// Raw codec
// =============================================================================

/// Join sort-key parts and encode them into a cursor.
pub fn encode_parts(parts: &[&str]) -> Cursor {
    let mut joined = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            joined.push(DELIMITER);
        }
        if i == 0 && part.is_empty() {
            joined.push_str(EMPTY_PLACEHOLDER);
        } else {
            joined.push_str(part);
        }
    }
    Cursor {
        value: URL_SAFE_NO_PAD.encode(joined),
    }
}

/// Decode a cursor into exactly `arity` parts.
pub fn decode_parts(cursor: &str, arity: usize) -> Result<Vec<String>, CursorError> {
    if cursor.is_empty() {
        return Err(CursorError::Empty);
    }

    let raw = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|e| CursorError::Encoding(e.to_string()))?;
    let text = String::from_utf8(raw).map_err(|_| CursorError::Utf8)?;

    let mut parts: Vec<String> = text.split(DELIMITER).map(str::to_owned).collect();
    if parts.len() != arity {
        return Err(CursorError::Arity {
            expected: arity,
            actual: parts.len(),
        });
    }

    if parts[0] == EMPTY_PLACEHOLDER {
        parts[0].clear();
    }

    Ok(parts)
}

// =============================================================================
// Typed keys
// =============================================================================

/// A sort key that can be carried in a [`Cursor`].
pub trait CursorKey: Sized {
    /// Shape name used in logs and metrics.
    const SHAPE: &'static str;

    fn encode(&self) -> Cursor;

    fn decode(cursor: &str) -> Result<Self, CursorError>;

    /// Id of the row this position was taken from.
    fn row_id(&self) -> Uuid;

    /// Decode an optional client-supplied cursor.
    ///
    /// An invalid cursor is treated exactly like an absent one.
    fn decode_or_start(cursor: Option<&str>) -> Option<Self> {
        let raw = cursor?;
        match Self::decode(raw) {
            Ok(key) => Some(key),
            Err(e) => {
                debug!(shape = Self::SHAPE, error = %e, "Ignoring invalid cursor");
                record_invalid_cursor(Self::SHAPE);
                None
            }
        }
    }
}

/// Position in a recency order: `(timestamp, id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecencyKey {
    pub timestamp: DateTime<Utc>,
    pub id: Uuid,
}

impl RecencyKey {
    pub fn new(timestamp: DateTime<Utc>, id: Uuid) -> Self {
        Self { timestamp, id }
    }
}

impl CursorKey for RecencyKey {
    const SHAPE: &'static str = "recency";

    fn row_id(&self) -> Uuid {
        self.id
    }

    fn encode(&self) -> Cursor {
        let timestamp = format_timestamp(&self.timestamp);
        let id = self.id.to_string();
        encode_parts(&[&timestamp, &id])
    }

    fn decode(cursor: &str) -> Result<Self, CursorError> {
        let parts = decode_parts(cursor, 2)?;
        Ok(Self {
            timestamp: parse_timestamp(&parts[0])?,
            id: parse_id(&parts[1])?,
        })
    }
}

/// Position in a ranked search order: `(score, timestamp, id)`.
///
/// The score is kept as the decimal string produced by storage so the
/// resumed query compares against exactly the value it emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedKey {
    pub score: String,
    pub timestamp: DateTime<Utc>,
    pub id: Uuid,
}

impl RankedKey {
    pub fn new(score: impl Into<String>, timestamp: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            score: score.into(),
            timestamp,
            id,
        }
    }
}

impl CursorKey for RankedKey {
    const SHAPE: &'static str = "ranked";

    fn row_id(&self) -> Uuid {
        self.id
    }

    fn encode(&self) -> Cursor {
        let timestamp = format_timestamp(&self.timestamp);
        let id = self.id.to_string();
        encode_parts(&[&self.score, &timestamp, &id])
    }

    fn decode(cursor: &str) -> Result<Self, CursorError> {
        let mut parts = decode_parts(cursor, 3)?;
        let valid_score = parts[0]
            .parse::<f64>()
            .map(f64::is_finite)
            .unwrap_or(false);
        if !valid_score {
            return Err(CursorError::Field {
                field: "score",
                value: parts.swap_remove(0),
            });
        }
        let timestamp = parse_timestamp(&parts[1])?;
        let id = parse_id(&parts[2])?;
        Ok(Self {
            score: parts.swap_remove(0),
            timestamp,
            id,
        })
    }
}

/// Position in an id order, tagged so it cannot pass for a recency cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdKey {
    pub id: Uuid,
}

impl IdKey {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

impl CursorKey for IdKey {
    const SHAPE: &'static str = "id";

    fn row_id(&self) -> Uuid {
        self.id
    }

    fn encode(&self) -> Cursor {
        let id = self.id.to_string();
        encode_parts(&[ID_TAG, &id])
    }

    fn decode(cursor: &str) -> Result<Self, CursorError> {
        let parts = decode_parts(cursor, 2)?;
        if parts[0] != ID_TAG {
            return Err(CursorError::Tag);
        }
        Ok(Self {
            id: parse_id(&parts[1])?,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Canonical RFC 3339 form, with only as many fractional digits as needed.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, CursorError> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| CursorError::Field {
            field: "timestamp",
            value: s.to_owned(),
        })
}

fn parse_id(s: &str) -> Result<Uuid, CursorError> {
    Uuid::parse_str(s).map_err(|_| CursorError::Field {
        field: "id",
        value: s.to_owned(),
    })
}

// =============================================================================
// Tests
// =============================================================================
