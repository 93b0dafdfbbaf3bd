//! Citation Extraction
//!
//! Upstream producers embed a JSON array of source records between two sentinel
//! tokens (`data_start` / `data_end` by default). This module finds that
//! segment, parses the records, and lays them out as an inline marker list plus
//! a grid of source tiles. Selection state for the detail region lives in
//! [`CitationSelection`].

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use chatmark_core::{ChatmarkError, ContentPayload};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_START_TOKEN: &str = "data_start";
pub const DEFAULT_END_TOKEN: &str = "data_end";
pub const DEFAULT_GRID_COLUMNS: usize = 5;

/// Where the sentinels were found and what they split the text into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentinelSegment {
    pub has_start: bool,
    pub has_end: bool,
    pub prefix: String,
    pub payload: Option<String>,
}

impl SentinelSegment {
    pub fn is_citation(&self) -> bool {
        self.payload.is_some()
    }
}

/// Page numbers arrive as either JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageNumber {
    Number(i64),
    Text(String),
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One source entry. Field names are a wire contract with the producer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationRecord {
    pub page_number: PageNumber,
    pub document_chunk: String,
    pub document_path: String,
}

/// Sentinel tokens used to find the embedded citation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationExtractor {
    start_token: String,
    end_token: String,
}

impl Default for CitationExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_START_TOKEN, DEFAULT_END_TOKEN)
    }
}

impl CitationExtractor {
    pub fn new(start_token: impl Into<String>, end_token: impl Into<String>) -> Self {
        Self {
            start_token: start_token.into(),
            end_token: end_token.into(),
        }
    }

    /// Split `text` around the first start token and the first end token.
    ///
    /// Without both tokens the whole text is the prefix and there is no payload.
    /// An end token ahead of the start token bounds the payload from the other
    /// side, which never parses as a record array.
    pub fn extract(&self, text: &str) -> SentinelSegment {
        let start = text.find(&self.start_token);
        let end = text.find(&self.end_token);

        match (start, end) {
            (Some(start), Some(end)) => {
                let from = start + self.start_token.len();
                let payload = if end >= from { &text[from..end] } else { &text[end..from] };
                SentinelSegment {
                    has_start: true,
                    has_end: true,
                    prefix: text[..start].to_string(),
                    payload: Some(payload.trim().to_string()),
                }
            }
            _ => SentinelSegment {
                has_start: start.is_some(),
                has_end: end.is_some(),
                prefix: text.to_string(),
                payload: None,
            },
        }
    }
}

/// Extract with the default `data_start` / `data_end` tokens.
pub fn extract_citations(text: &str) -> SentinelSegment {
    CitationExtractor::default().extract(text)
}

/// Parse a sentinel payload. Malformed data fails the whole render pass.
pub fn parse_records(payload: &str) -> Result<Vec<CitationRecord>, ChatmarkError> {
    serde_json::from_str(payload).map_err(ChatmarkError::MalformedCitations)
}

/// Inline `chunk [page]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationMarker {
    pub index: usize,
    pub chunk: String,
    pub label: String,
}

/// One clickable tile in the source grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTile {
    pub index: usize,
    pub label: String,
}

/// Expanded view of the selected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationDetail {
    pub document_path: String,
    pub document_chunk: String,
}

/// Citation UI for one render pass. Markers and tiles share record order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationLayout {
    pub records: Vec<CitationRecord>,
    pub markers: Vec<CitationMarker>,
    pub grid_columns: usize,
    pub tiles: Vec<SourceTile>,
    pub detail: Option<CitationDetail>,
}

impl CitationLayout {
    pub fn new(records: Vec<CitationRecord>, grid_columns: usize) -> Self {
        let markers = records
            .iter()
            .enumerate()
            .map(|(index, record)| CitationMarker {
                index,
                chunk: record.document_chunk.clone(),
                label: format!("[{}]", record.page_number),
            })
            .collect();
        let tiles = records
            .iter()
            .enumerate()
            .map(|(index, record)| SourceTile {
                index,
                label: format!("Source{}", record.page_number),
            })
            .collect();
        Self {
            records,
            markers,
            grid_columns: grid_columns.max(1),
            tiles,
            detail: None,
        }
    }

    /// Tiles grouped into grid rows.
    pub fn grid_rows(&self) -> impl Iterator<Item = &[SourceTile]> {
        self.tiles.chunks(self.grid_columns)
    }

    pub fn record(&self, index: usize) -> Option<&CitationRecord> {
        self.records.get(index)
    }

    /// Fill the detail region from the current selection.
    pub fn with_selection(mut self, selection: &CitationSelection) -> Self {
        self.detail = selection.selected().map(|record| CitationDetail {
            document_path: record.document_path.clone(),
            document_chunk: record.document_chunk.clone(),
        });
        self
    }
}

/// How a click behaves while another record is already open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationToggle {
    /// Any click while a record is open closes it.
    #[default]
    ClearWhenOpen,
    /// Clicking the open record closes it; clicking another replaces it.
    Switch,
}

/// At most one selected record, cleared when the payload changes.
#[derive(Debug, Clone, Default)]
pub struct CitationSelection {
    toggle: CitationToggle,
    selected: Option<CitationRecord>,
    payload_key: Option<u64>,
}

impl CitationSelection {
    pub fn new(toggle: CitationToggle) -> Self {
        Self {
            toggle,
            ..Default::default()
        }
    }

    pub fn selected(&self) -> Option<&CitationRecord> {
        self.selected.as_ref()
    }

    /// Handle a click on a marker or tile for `record`.
    pub fn click(&mut self, record: &CitationRecord) {
        self.selected = match (self.toggle, self.selected.take()) {
            (_, None) => Some(record.clone()),
            (CitationToggle::ClearWhenOpen, Some(_)) => None,
            (CitationToggle::Switch, Some(open)) if open == *record => None,
            (CitationToggle::Switch, Some(_)) => Some(record.clone()),
        };
    }

    /// Record the payload of a new render pass, clearing any selection made
    /// against a different one.
    pub fn observe(&mut self, payload: &ContentPayload) {
        let mut hasher = DefaultHasher::new();
        payload.hash(&mut hasher);
        let key = hasher.finish();
        if self.payload_key != Some(key) {
            if self.selected.take().is_some() {
                debug!("[Citations] Payload changed; selection cleared");
            }
            self.payload_key = Some(key);
        }
    }
}
