//! CSV reader for the model table.
//!
//! The header must name every column in [`Column::ALL`]; order is free and
//! extra columns are ignored. Empty cells and `NA` are missing values.
//! `#` comment lines are only recognized before the header.

use super::row::{is_missing_text, Column, DatasetRow, Framework};
use super::DataError;
use std::collections::HashMap;

pub fn parse_rows(text: &str) -> Result<(Vec<String>, Vec<DatasetRow>), DataError> {
    let mut header: Option<(Vec<String>, HashMap<Column, usize>)> = None;
    let mut rows = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || (header.is_none() && trimmed.starts_with('#')) {
            continue;
        }
        let fields = split_record(trimmed)
            .map_err(|e| DataError::Schema(format!("line {}: {}", line_no, e)))?;

        if header.is_none() {
            header = Some(read_header(fields)?);
            continue;
        }
        let Some((names, index)) = header.as_ref() else {
            continue;
        };

        if fields.len() != names.len() {
            return Err(DataError::Schema(format!(
                "line {}: expected {} columns, got {}",
                line_no,
                names.len(),
                fields.len()
            )));
        }
        let row = parse_row(&fields, index)
            .map_err(|e| DataError::Schema(format!("line {}: {}", line_no, e)))?;
        rows.push(row);
    }

    match header {
        Some((names, _)) => Ok((names, rows)),
        None => Err(DataError::Schema("missing header".to_string())),
    }
}

fn read_header(fields: Vec<String>) -> Result<(Vec<String>, HashMap<Column, usize>), DataError> {
    let names: Vec<String> = fields.into_iter().map(|s| s.trim().to_string()).collect();
    let mut index = HashMap::new();
    for (pos, name) in names.iter().enumerate() {
        if let Some(col) = Column::from_name(name) {
            if index.insert(col, pos).is_some() {
                return Err(DataError::Schema(format!("duplicate column {:?}", name)));
            }
        }
    }
    let missing: Vec<&str> = Column::ALL
        .iter()
        .filter(|c| !index.contains_key(c))
        .map(|c| c.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(DataError::Schema(format!("missing columns {:?}", missing)));
    }
    Ok((names, index))
}

fn parse_row(fields: &[String], index: &HashMap<Column, usize>) -> Result<DatasetRow, String> {
    let raw = |c: Column| -> Option<&str> {
        let v = fields[index[&c]].trim();
        if is_missing_text(v) {
            None
        } else {
            Some(v)
        }
    };
    let num = |c: Column| -> Result<Option<f64>, String> {
        raw(c)
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|e| format!("bad {} {:?}: {}", c.as_str(), v, e))
            })
            .transpose()
    };
    let text = |c: Column| raw(c).map(str::to_string);

    let model_id = raw(Column::ModelId).ok_or("missing model_id")?.to_string();
    let framework: Framework = raw(Column::Framework)
        .ok_or("missing framework")?
        .parse()?;
    let post_mean = num(Column::PostMean)?.ok_or("missing post_mean")?;

    Ok(DatasetRow {
        model_id,
        framework,
        post_mean,
        estimate: num(Column::Estimate)?,
        se: num(Column::Se)?,
        lower95: num(Column::Lower95)?,
        higher95: num(Column::Higher95)?,
        outcome: text(Column::Outcome),
        temporal_window: text(Column::TemporalWindow),
        operationalisation: text(Column::Operationalisation),
        typicality: text(Column::Typicality),
        found_effect: text(Column::FoundEffect),
        compelling: text(Column::Compelling),
        years_from_phd: num(Column::YearsFromPhd)?,
        prior_belief: num(Column::PriorBelief)?,
        phon_rating: num(Column::PhonRating)?,
        stat_rating: num(Column::StatRating)?,
        all_rating: num(Column::AllRating)?,
    })
}

/// Split one record, honoring double-quoted fields (`""` escapes a quote).
fn split_record(line: &str) -> Result<Vec<String>, String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match (ch, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            ('"', true) => quoted = false,
            ('"', false) if cur.trim().is_empty() => {
                cur.clear();
                quoted = true;
            }
            (',', false) => out.push(std::mem::take(&mut cur)),
            (c, _) => cur.push(c),
        }
    }
    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    out.push(cur);
    Ok(out)
}
