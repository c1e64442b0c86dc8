//! Range-annotated documents.
//!
//! Upstream content models usually store annotations as character ranges
//! over a string. A [`Document`] is that shape, readable from JSON, and
//! [`Document::to_units`] flattens it into the per-character form the
//! renderer walks.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, ContentUnit, Payload};
use crate::error::DocumentError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub annotations: Vec<RangeAnnotation>,
}

/// An annotation over the half-open char range `start..end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeAnnotation {
    #[serde(rename = "type")]
    pub kind: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub data: Payload,
}

impl Document {
    pub fn from_json(source: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(source)?)
    }

    /// One content unit per char of `text`.
    ///
    /// Each range entry becomes its own annotation instance; a unit lists
    /// the instances covering it in the order the entries are declared.
    pub fn to_units(&self) -> Result<Vec<ContentUnit>, DocumentError> {
        let mut units: Vec<ContentUnit> = self.text.chars().map(ContentUnit::plain).collect();
        let len = units.len();

        for (index, range) in self.annotations.iter().enumerate() {
            if range.start > range.end || range.end > len {
                return Err(DocumentError::Range {
                    index,
                    start: range.start,
                    end: range.end,
                    len,
                });
            }
            if range.start == range.end {
                continue;
            }

            let annotation = Annotation::with_data(range.kind.as_str(), range.data.clone());
            for unit in &mut units[range.start..range.end] {
                unit.annotations.push(annotation.clone());
            }
        }

        Ok(units)
    }
}
