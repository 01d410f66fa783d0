// Agenda spreadsheet reader
//
// The first worksheet holds some free-form preamble, then a header row, then
// one row per session. Headers are matched after normalization, so `*Date`,
// `date` and `DATE ` all name the same column.

use crate::error::{Error, Result};
use crate::import::{AgendaRow, parse_speakers};
use calamine::{Data, ExcelDateTime, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Date,
    TimeStart,
    TimeEnd,
    Kind,
    Title,
    Location,
    Description,
    Speakers,
}

/// Expected headers (normalized) and the field each one fills
const HEADERS: [(&str, Field); 8] = [
    ("date", Field::Date),
    ("timestart", Field::TimeStart),
    ("timeend", Field::TimeEnd),
    ("sessionorsub-session(sub)", Field::Kind),
    ("sessiontitle", Field::Title),
    ("room/location", Field::Location),
    ("description", Field::Description),
    ("speakers", Field::Speakers),
];

/// Read agenda rows from the first worksheet of an `.xls`, `.xlsx` or `.ods` file
pub fn read_agenda<P: AsRef<Path>>(path: P) -> Result<Vec<AgendaRow>> {
    let path = path.as_ref();
    info!(path = %path.display(), "Reading agenda spreadsheet");

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::EmptyWorkbook(path.to_path_buf()))??;

    let cells = range.rows().map(|row| row.iter().map(cell_text).collect());
    parse_rows(cells)
}

/// Turn text cells into agenda rows; the header row is located first
pub fn parse_rows<I>(rows: I) -> Result<Vec<AgendaRow>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut rows = rows.into_iter().enumerate();
    let mut best_missing = HEADERS[0].0;
    let mut best_found = 0;

    let columns = loop {
        let Some((index, cells)) = rows.next() else {
            return Err(Error::MissingHeader(best_missing.to_string()));
        };

        match header_columns(&cells) {
            Ok(columns) => {
                debug!(row = index + 1, "Found header row");
                break columns;
            }
            Err((found, missing)) if found > best_found => {
                best_found = found;
                best_missing = missing;
            }
            Err(_) => {}
        }
    };

    let mut parsed = Vec::new();
    for (index, cells) in rows {
        if cells.iter().all(|c| c.trim().is_empty()) {
            debug!(row = index + 1, "Skipping blank row");
            continue;
        }

        let get = |field: Field| -> String {
            let column = columns[field as usize];
            cells.get(column).map(|c| c.trim().to_string()).unwrap_or_default()
        };

        parsed.push(AgendaRow {
            row: index + 1,
            date: get(Field::Date),
            time_start: get(Field::TimeStart),
            time_end: get(Field::TimeEnd),
            kind_flag: get(Field::Kind),
            session_title: get(Field::Title),
            location: get(Field::Location),
            description: get(Field::Description),
            speakers: parse_speakers(&get(Field::Speakers)),
        });
    }

    debug!(rows = parsed.len(), "Parsed agenda rows");
    Ok(parsed)
}

/// Lowercase, drop `*` markers and all whitespace
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| *c != '*' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Column index per field, in `Field` order, when every header is present.
/// Otherwise the number of headers found and the first one missing.
fn header_columns(cells: &[String]) -> std::result::Result<[usize; 8], (usize, &'static str)> {
    let normalized: Vec<String> = cells.iter().map(|c| normalize_header(c)).collect();
    let mut columns = [0; 8];
    let mut found = 0;
    let mut missing = None;

    for (header, field) in HEADERS {
        match normalized.iter().position(|n| n == header) {
            Some(index) => {
                columns[field as usize] = index;
                found += 1;
            }
            None => {
                missing.get_or_insert(header);
            }
        }
    }

    match missing {
        None => Ok(columns),
        Some(header) => Err((found, header)),
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::DateTime(dt) => format_datetime(dt).unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

// Excel stores times as fractions of a day and dates as whole day counts
fn format_datetime(dt: &ExcelDateTime) -> Option<String> {
    let serial = dt.as_f64();
    let value: NaiveDateTime = dt.as_datetime()?;

    let formatted = if serial < 1.0 {
        value.format("%I:%M %p")
    } else if serial.fract() == 0.0 {
        value.format("%m/%d/%Y")
    } else {
        value.format("%m/%d/%Y %I:%M %p")
    };
    Some(formatted.to_string())
}
