//! CSV round-trip for the client and exercise rosters.
//!
//! The format is the plain spreadsheet dialect: comma-separated, fields
//! quoted when they contain commas, quotes, or newlines, embedded quotes
//! doubled. Headers are matched case-insensitively so hand-edited sheets
//! survive.

use crate::clients::{Client, ClientInput, Gender};
use crate::errors::{Error, Result};
use crate::exercises::{Category, Exercise, ExerciseInput};

const CLIENT_HEADER: &str = "id,name,gender,isTrainer";
const EXERCISE_HEADER: &str = "id,name,category";

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn clients_to_csv(clients: &[Client]) -> String {
    let mut lines = vec![CLIENT_HEADER.to_string()];
    lines.extend(clients.iter().map(|client| {
        format!(
            "{},{},{},{}",
            escape_field(&client.id),
            escape_field(&client.name),
            match client.gender {
                Gender::Male => "male",
                Gender::Female => "female",
            },
            u8::from(client.is_trainer),
        )
    }));
    lines.join("\n")
}

pub fn exercises_to_csv(exercises: &[Exercise]) -> String {
    let mut lines = vec![EXERCISE_HEADER.to_string()];
    lines.extend(exercises.iter().map(|exercise| {
        format!(
            "{},{},{}",
            escape_field(&exercise.id),
            escape_field(&exercise.name),
            escape_field(exercise.category.name()),
        )
    }));
    lines.join("\n")
}

/// Parse client rows. Requires a `name` column; rows with a blank name are
/// skipped. A blank or absent id means "new client". Gender defaults to
/// male unless the cell says female; the trainer flag accepts `1` or
/// `true`.
pub fn clients_from_csv(text: &str) -> Result<Vec<ClientInput>> {
    let rows = parse_rows(text);
    let Some((header, body)) = rows.split_first() else {
        return Err(Error::invalid_input("CSV has no header row"));
    };
    let name_idx = header_index(header, "name")
        .ok_or_else(|| Error::invalid_input("CSV is missing a 'name' column"))?;
    let id_idx = header_index(header, "id");
    let gender_idx = header_index(header, "gender");
    let trainer_idx = header_index(header, "istrainer");

    let mut inputs = Vec::new();
    for row in body {
        let name = cell(row, Some(name_idx)).trim();
        if name.is_empty() {
            continue;
        }
        let gender = if cell(row, gender_idx).trim().eq_ignore_ascii_case("female") {
            Gender::Female
        } else {
            Gender::Male
        };
        let trainer_cell = cell(row, trainer_idx).trim();
        let is_trainer = trainer_cell == "1" || trainer_cell.eq_ignore_ascii_case("true");
        inputs.push(ClientInput {
            id: optional_id(row, id_idx),
            name: name.to_string(),
            gender,
            is_trainer,
        });
    }
    Ok(inputs)
}

/// Parse exercise rows; same shape rules as [`clients_from_csv`]. An
/// unrecognized category falls back to Back rather than dropping the row.
pub fn exercises_from_csv(text: &str) -> Result<Vec<ExerciseInput>> {
    let rows = parse_rows(text);
    let Some((header, body)) = rows.split_first() else {
        return Err(Error::invalid_input("CSV has no header row"));
    };
    let name_idx = header_index(header, "name")
        .ok_or_else(|| Error::invalid_input("CSV is missing a 'name' column"))?;
    let id_idx = header_index(header, "id");
    let category_idx = header_index(header, "category");

    let mut inputs = Vec::new();
    for row in body {
        let name = cell(row, Some(name_idx)).trim();
        if name.is_empty() {
            continue;
        }
        let category = Category::from_name(cell(row, category_idx)).unwrap_or(Category::Back);
        inputs.push(ExerciseInput {
            id: optional_id(row, id_idx),
            name: name.to_string(),
            category,
        });
    }
    Ok(inputs)
}

fn header_index(header: &[String], wanted: &str) -> Option<usize> {
    header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(wanted))
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

fn optional_id(row: &[String], idx: Option<usize>) -> Option<String> {
    let raw = cell(row, idx).trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Quote-aware row scanner. Handles CRLF line ends and swallows blank
/// lines.
fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                flush_row(&mut rows, &mut row);
            }
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        flush_row(&mut rows, &mut row);
    }
    rows
}

fn flush_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>) {
    let blank = row.len() == 1 && row[0].trim().is_empty();
    if blank {
        row.clear();
    } else {
        rows.push(std::mem::take(row));
    }
}
