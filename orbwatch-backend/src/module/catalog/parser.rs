///! Turns a validated element-set payload into records
use chrono::{DateTime, Utc};
use orbwatch_common::ElementSetRecord;
use orbwatch_common::tle::catalog_number;
use std::collections::HashSet;

use super::validator::{ElementLayout, content_lines, validate_elements};
use crate::error::ValidationError;

/// Name given to objects delivered without a name line
pub const UNKNOWN_NAME: &str = "UNKNOWN";

/// Validate `raw_text` and build one record per object.
///
/// Objects whose catalog number cannot be decoded are skipped; a repeated
/// catalog number keeps its first occurrence.
pub fn parse_records(
    raw_text: &str,
    source_group: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<ElementSetRecord>, ValidationError> {
    let layout = validate_elements(raw_text)?;
    let lines = content_lines(raw_text);

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(lines.len() / layout.lines_per_object());

    for chunk in lines.chunks(layout.lines_per_object()) {
        let (name, line1, line2) = match layout {
            ElementLayout::ThreeLine => (chunk[0].trim(), chunk[1], chunk[2]),
            ElementLayout::TwoLine => (UNKNOWN_NAME, chunk[0], chunk[1]),
        };

        let object_id = match catalog_number(line1) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Skipping '{}' in group '{}': {}", name, source_group, e);
                continue;
            }
        };

        if !seen.insert(object_id) {
            tracing::debug!("Duplicate object {} ('{}') in group '{}'", object_id, name, source_group);
            continue;
        }

        records.push(ElementSetRecord {
            object_id,
            name: if name.is_empty() { UNKNOWN_NAME.to_string() } else { name.to_string() },
            raw_line_1: line1.to_string(),
            raw_line_2: line2.to_string(),
            fetched_at,
            source_group: source_group.to_string(),
        });
    }

    Ok(records)
}
