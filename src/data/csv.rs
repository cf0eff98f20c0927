//! Point-format CSV decoding for the finder datasets.
//!
//! Both datasets are plain CSV exports with a header row. Detail rows carry an id and
//! projected x/y columns; aggregation-unit rows carry only x/y and a unit code. Count
//! rows pair a unit code with a record count.

use crate::core::{geo::Point, projection::Projection};
use crate::data::record::{Record, RecordId};
use crate::prelude::HashMap;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Which columns hold a row's id and coordinates, and in what projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointFormat {
    /// Id column; rows are numbered from 0 when absent
    pub id: Option<String>,
    pub x: String,
    pub y: String,
    pub projection: Projection,
}

impl PointFormat {
    /// Decodes every row into a [`Record`] located in `target`.
    ///
    /// Rows whose coordinates are missing or not numeric are skipped.
    pub fn decode(&self, csv: &str, target: Projection) -> Result<Vec<Record>> {
        let mut rows = read_records(csv).into_iter();
        let Some(headers) = rows.next() else {
            return Ok(Vec::new());
        };
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| MapError::Parse(format!("no '{}' column in CSV header", name)))
        };
        let x_col = column(&self.x)?;
        let y_col = column(&self.y)?;
        let id_col = self.id.as_deref().map(column).transpose()?;

        let mut records = Vec::new();
        for (row_number, values) in rows.enumerate() {
            let coordinate = |col: usize| values.get(col).and_then(|v| v.trim().parse::<f64>().ok());
            let (Some(x), Some(y)) = (coordinate(x_col), coordinate(y_col)) else {
                log::warn!("skipping CSV row {} without usable coordinates", row_number + 1);
                continue;
            };
            let point = self.projection.transform_point(target, Point::new(x, y))?;
            let id = match id_col {
                Some(col) => RecordId(values.get(col).cloned().unwrap_or_default()),
                None => RecordId::from(row_number as u64),
            };
            let attributes: HashMap<String, String> =
                headers.iter().cloned().zip(values.into_iter()).collect();
            records.push(Record {
                id,
                point,
                attributes,
            });
        }
        Ok(records)
    }
}

/// Columns of the grouped count dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCountFormat {
    pub unit: String,
    pub count: String,
}

impl Default for UnitCountFormat {
    fn default() -> Self {
        Self {
            unit: "community_board".to_string(),
            count: "count".to_string(),
        }
    }
}

impl UnitCountFormat {
    pub fn decode(&self, csv: &str) -> Result<Vec<(String, u64)>> {
        let mut rows = read_records(csv).into_iter();
        let Some(headers) = rows.next() else {
            return Ok(Vec::new());
        };
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| MapError::Parse(format!("no '{}' column in CSV header", name)))
        };
        let unit_col = position(&self.unit)?;
        let count_col = position(&self.count)?;

        let mut counts = Vec::new();
        for values in rows {
            match (values.get(unit_col), values.get(count_col).map(|c| c.trim().parse::<u64>())) {
                (Some(unit), Some(Ok(count))) if !unit.is_empty() => counts.push((unit.clone(), count)),
                _ => log::warn!("skipping malformed count row: {:?}", values),
            }
        }
        Ok(counts)
    }
}

/// Splits CSV text into records of fields.
///
/// Double-quoted fields may contain commas, line breaks and `""` escapes. Blank lines
/// outside quotes produce no record.
fn read_records(csv: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = csv.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => record.push(std::mem::take(&mut field)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => end_record(&mut records, &mut record, &mut field),
            _ => field.push(c),
        }
    }
    end_record(&mut records, &mut record, &mut field);
    records
}

fn end_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, field: &mut String) {
    record.push(std::mem::take(field));
    let finished = std::mem::take(record);
    let blank = finished.len() == 1 && finished[0].trim().is_empty();
    if !blank {
        records.push(finished);
    }
}
