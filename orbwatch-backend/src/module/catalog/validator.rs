///! Structural checks applied to a fetched payload before it is cached
use orbwatch_common::tle::{is_line_one, is_line_two};

use crate::error::ValidationError;

/// Max characters of the offending name quoted in a rejection
const NEAR_NAME_CHARS: usize = 40;

/// How element lines are grouped in a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementLayout {
    /// Name line followed by two element lines
    ThreeLine,
    /// Two element lines only (legacy); names default to "UNKNOWN"
    TwoLine,
}

impl ElementLayout {
    pub fn lines_per_object(&self) -> usize {
        match self {
            ElementLayout::ThreeLine => 3,
            ElementLayout::TwoLine => 2,
        }
    }
}

/// Non-blank lines with trailing whitespace removed.
pub fn content_lines(raw_text: &str) -> Vec<&str> {
    raw_text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::trim_end)
        .collect()
}

fn near(text: &str) -> String {
    text.trim().chars().take(NEAR_NAME_CHARS).collect()
}

/// Validate an element-set payload and report its layout.
///
/// A payload whose first line already carries the line-one marker is
/// read as the legacy two-line layout; anything else must be name
/// triplets. Numeric fields are not inspected here.
pub fn validate_elements(raw_text: &str) -> Result<ElementLayout, ValidationError> {
    let lines = content_lines(raw_text);
    if lines.is_empty() {
        return Err(ValidationError::Empty);
    }

    let layout = if is_line_one(lines[0]) {
        ElementLayout::TwoLine
    } else {
        ElementLayout::ThreeLine
    };
    let per_object = layout.lines_per_object();

    if lines.len() % per_object != 0 {
        return Err(ValidationError::LineCount {
            count: lines.len(),
            expected: per_object,
        });
    }

    for chunk in lines.chunks(per_object) {
        let (name, line1, line2) = match layout {
            ElementLayout::ThreeLine => (chunk[0], chunk[1], chunk[2]),
            ElementLayout::TwoLine => (chunk[0], chunk[0], chunk[1]),
        };
        if !(is_line_one(line1) && is_line_two(line2)) {
            return Err(ValidationError::Malformed { near: near(name) });
        }
    }

    Ok(layout)
}

/// Validate an auxiliary feed payload (a JSON document).
pub fn validate_json(raw_text: &str) -> Result<(), ValidationError> {
    if raw_text.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    serde_json::from_str::<serde_json::Value>(raw_text)
        .map(|_| ())
        .map_err(|e| ValidationError::Json(e.to_string()))
}
