//! Pure mutations over a [`TrackerDocument`].
//!
//! Every write path, whatever store backs it, funnels through these
//! functions so the replacement policy, cascades, and settings handling
//! behave identically everywhere. Functions take the document by mutable
//! reference and leave persistence to the caller.

use uuid::Uuid;

use crate::clients::{Client, ClientInput};
use crate::errors::{Error, Result};
use crate::exercises::{Exercise, ExerciseInput};
use crate::leaderboard::rankings_for_exercise;
use crate::records::{compute_volume, is_improvement, Record, SaveOutcome};

use super::{TrackerDocument, SCHEMA_VERSION};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn validate_lift(weight: f64, reps: u32) -> Result<()> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(Error::invalid_input("weight must be a positive number"));
    }
    if reps == 0 {
        return Err(Error::invalid_input("reps must be at least 1"));
    }
    Ok(())
}

/// Create or update a client.
///
/// An input without an id creates a client under a fresh identifier. An
/// input carrying an id updates the matching client; if no client has that
/// id the document is left untouched and `None` comes back.
pub fn upsert_client(doc: &mut TrackerDocument, input: ClientInput) -> Option<Client> {
    match input.id {
        Some(id) => {
            let client = doc.clients.iter_mut().find(|c| c.id == id)?;
            client.name = input.name;
            client.gender = input.gender;
            client.is_trainer = input.is_trainer;
            Some(client.clone())
        }
        None => {
            let client = Client {
                id: new_id(),
                name: input.name,
                gender: input.gender,
                is_trainer: input.is_trainer,
            };
            doc.clients.push(client.clone());
            Some(client)
        }
    }
}

/// Remove a client and every record they hold. Returns whether a client
/// was actually removed.
pub fn delete_client(doc: &mut TrackerDocument, client_id: &str) -> bool {
    let before = doc.clients.len();
    doc.clients.retain(|c| c.id != client_id);
    doc.records.retain(|r| r.client_id != client_id);
    doc.clients.len() != before
}

/// Create or update an exercise; same id semantics as [`upsert_client`].
pub fn upsert_exercise(doc: &mut TrackerDocument, input: ExerciseInput) -> Option<Exercise> {
    match input.id {
        Some(id) => {
            let exercise = doc.exercises.iter_mut().find(|e| e.id == id)?;
            exercise.name = input.name;
            exercise.category = input.category;
            Some(exercise.clone())
        }
        None => {
            let exercise = Exercise {
                id: new_id(),
                name: input.name,
                category: input.category,
            };
            doc.exercises.push(exercise.clone());
            Some(exercise)
        }
    }
}

/// Remove an exercise and every record logged against it.
pub fn delete_exercise(doc: &mut TrackerDocument, exercise_id: &str) -> bool {
    let before = doc.exercises.len();
    doc.exercises.retain(|e| e.id != exercise_id);
    doc.records.retain(|r| r.exercise_id != exercise_id);
    doc.exercises.len() != before
}

/// Record a lift attempt against the client's best-record slot for the
/// exercise.
///
/// The attempt only lands if it beats the slot's current best; otherwise
/// nothing changes and the standing best is returned. Gold detection (did
/// this save take over the #1 spot among the client's gender?) compares
/// the exercise ranking immediately before and after the write, inside the
/// same mutation, so a concurrent writer can never slip between the two
/// reads.
pub fn save_record(
    doc: &mut TrackerDocument,
    client_id: &str,
    exercise_id: &str,
    weight: f64,
    reps: u32,
    now: i64,
) -> Result<SaveOutcome> {
    validate_lift(weight, reps)?;

    let gender = match doc.client(client_id) {
        Some(client) => client.gender,
        None => return Ok(SaveOutcome::UnknownClient),
    };

    let was_gold = rankings_for_exercise(doc, exercise_id, Some(gender))
        .first()
        .map(|top| top.client_id == client_id)
        .unwrap_or(false);

    if let Some(existing) = doc.record_for(client_id, exercise_id) {
        if !is_improvement(Some(existing), weight, reps) {
            return Ok(SaveOutcome::NotAnImprovement {
                existing: existing.clone(),
            });
        }
    }

    let record = upsert_record(doc, client_id, exercise_id, weight, reps, now);

    let is_gold = rankings_for_exercise(doc, exercise_id, Some(gender))
        .first()
        .map(|top| top.client_id == client_id)
        .unwrap_or(false);

    Ok(SaveOutcome::Saved {
        record,
        was_gold,
        is_gold,
    })
}

/// Overwrite a best-record slot unconditionally, bypassing the
/// replacement policy. Used when a trainer corrects a mistyped entry.
pub fn force_update_record(
    doc: &mut TrackerDocument,
    client_id: &str,
    exercise_id: &str,
    weight: f64,
    reps: u32,
    now: i64,
) -> Result<Record> {
    validate_lift(weight, reps)?;
    Ok(upsert_record(doc, client_id, exercise_id, weight, reps, now))
}

fn upsert_record(
    doc: &mut TrackerDocument,
    client_id: &str,
    exercise_id: &str,
    weight: f64,
    reps: u32,
    now: i64,
) -> Record {
    let volume = compute_volume(weight, reps);
    if let Some(record) = doc
        .records
        .iter_mut()
        .find(|r| r.client_id == client_id && r.exercise_id == exercise_id)
    {
        record.weight = weight;
        record.reps = reps;
        record.volume = volume;
        record.updated_at = now;
        return record.clone();
    }

    let record = Record {
        id: new_id(),
        client_id: client_id.to_string(),
        exercise_id: exercise_id.to_string(),
        weight,
        reps,
        volume,
        updated_at: now,
    };
    doc.records.push(record.clone());
    record
}

/// Apply imported client rows. Unlike [`upsert_client`], a row carrying an
/// id that is not in the document is inserted under that id, so exported
/// rosters round-trip across devices. Returns the number of rows applied.
pub fn import_clients(doc: &mut TrackerDocument, rows: Vec<ClientInput>) -> usize {
    let mut applied = 0;
    for row in rows {
        match row.id {
            Some(id) => {
                if let Some(client) = doc.clients.iter_mut().find(|c| c.id == id) {
                    client.name = row.name;
                    client.gender = row.gender;
                    client.is_trainer = row.is_trainer;
                } else {
                    doc.clients.push(Client {
                        id,
                        name: row.name,
                        gender: row.gender,
                        is_trainer: row.is_trainer,
                    });
                }
            }
            None => {
                doc.clients.push(Client {
                    id: new_id(),
                    name: row.name,
                    gender: row.gender,
                    is_trainer: row.is_trainer,
                });
            }
        }
        applied += 1;
    }
    applied
}

/// Apply imported exercise rows; same id semantics as [`import_clients`].
pub fn import_exercises(doc: &mut TrackerDocument, rows: Vec<ExerciseInput>) -> usize {
    let mut applied = 0;
    for row in rows {
        match row.id {
            Some(id) => {
                if let Some(exercise) = doc.exercises.iter_mut().find(|e| e.id == id) {
                    exercise.name = row.name;
                    exercise.category = row.category;
                } else {
                    doc.exercises.push(Exercise {
                        id,
                        name: row.name,
                        category: row.category,
                    });
                }
            }
            None => {
                doc.exercises.push(Exercise {
                    id: new_id(),
                    name: row.name,
                    category: row.category,
                });
            }
        }
        applied += 1;
    }
    applied
}

/// Replace the document with a restored backup, keeping only the device's
/// server credentials so a restore never severs the connection.
pub fn restore_backup(doc: &mut TrackerDocument, incoming: TrackerDocument) {
    let api_url = std::mem::take(&mut doc.settings.api_url);
    let api_key = std::mem::take(&mut doc.settings.api_key);
    *doc = incoming;
    doc.settings.api_url = api_url;
    doc.settings.api_key = api_key;
    doc.schema_version = SCHEMA_VERSION;
}

/// Adopt a document handed back by the server. Collections are replaced
/// wholesale; local settings survive untouched except `last_sync`, which
/// takes the server's timestamp (falling back to `now` when the server
/// sent none).
pub fn apply_remote(
    doc: &mut TrackerDocument,
    remote: TrackerDocument,
    server_timestamp: Option<i64>,
    now: i64,
) {
    let settings = doc.settings.clone();
    *doc = remote;
    doc.settings = settings;
    doc.settings.last_sync = server_timestamp.unwrap_or(now);
    doc.schema_version = SCHEMA_VERSION;
}

/// Enter client session mode: the device is handed to one athlete and the
/// leaderboard filter follows their gender. No-op when the client id does
/// not resolve.
pub fn start_session(doc: &mut TrackerDocument, client_id: &str) -> Option<Client> {
    let client = doc.client(client_id)?.clone();
    doc.settings.client_mode_active = true;
    doc.settings.active_client_id = Some(client.id.clone());
    doc.settings.gender_filter = client.gender;
    Some(client)
}

/// Leave client session mode. The gender filter keeps whatever the session
/// set it to.
pub fn end_session(doc: &mut TrackerDocument) {
    doc.settings.client_mode_active = false;
    doc.settings.active_client_id = None;
}

/// Factory reset: collections, preferences, and server credentials all go.
pub fn clear_all(doc: &mut TrackerDocument) {
    *doc = TrackerDocument::default();
}
