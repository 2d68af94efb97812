//! Ranking order and leaderboard assembly.
//!
//! Both views are derived on the fly from the document; nothing here is
//! cached or persisted, so they can never drift out of step with the
//! records they rank.

use std::cmp::Ordering;

use crate::clients::{Client, Gender};
use crate::document::TrackerDocument;
use crate::exercises::{Category, Exercise};
use crate::records::Record;

/// Most exercises the leaderboard shows at once.
pub const LEADERBOARD_MAX: usize = 10;

/// Ranking order for records of one exercise: heaviest weight first, reps
/// breaking ties. Equal weight and reps rank equal.
pub fn compare_rank(a: &Record, b: &Record) -> Ordering {
    b.weight
        .total_cmp(&a.weight)
        .then_with(|| b.reps.cmp(&a.reps))
}

/// All best records for one exercise in ranking order, optionally narrowed
/// to clients of one gender. Records whose client no longer resolves never
/// rank.
pub fn rankings_for_exercise(
    doc: &TrackerDocument,
    exercise_id: &str,
    gender: Option<Gender>,
) -> Vec<Record> {
    let mut records: Vec<Record> = doc
        .records
        .iter()
        .filter(|r| r.exercise_id == exercise_id)
        .filter(|r| match doc.client(&r.client_id) {
            Some(client) => gender.map_or(true, |wanted| client.gender == wanted),
            None => false,
        })
        .cloned()
        .collect();
    records.sort_by(compare_rank);
    records
}

/// One leaderboard row: an exercise, its current #1, and how many athletes
/// hold a record on it.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub exercise: Exercise,
    pub top_record: Record,
    pub top_client: Client,
    pub athlete_count: usize,
}

struct ExerciseGroup<'a> {
    exercise_id: &'a str,
    latest_at: i64,
    top: &'a Record,
    athletes: Vec<&'a str>,
}

/// Assemble the leaderboard: for each exercise with activity among clients
/// of the given gender (optionally one category), the reigning best record,
/// ordered by most recent activity and capped at `limit` rows. Rows whose
/// exercise or top client no longer resolve are dropped.
pub fn top_lifts(
    doc: &TrackerDocument,
    gender: Gender,
    category: Option<Category>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut groups: Vec<ExerciseGroup<'_>> = Vec::new();

    for record in &doc.records {
        let in_gender = doc
            .client(&record.client_id)
            .map(|c| c.gender == gender)
            .unwrap_or(false);
        if !in_gender {
            continue;
        }
        if let Some(wanted) = category {
            let in_category = doc
                .exercise(&record.exercise_id)
                .map(|e| e.category == wanted)
                .unwrap_or(false);
            if !in_category {
                continue;
            }
        }

        match groups
            .iter_mut()
            .find(|g| g.exercise_id == record.exercise_id)
        {
            Some(group) => {
                group.latest_at = group.latest_at.max(record.updated_at);
                if compare_rank(record, group.top) == Ordering::Less {
                    group.top = record;
                }
                // Server-merged documents can carry several rows per athlete
                // for one exercise; count each athlete once.
                if !group.athletes.contains(&record.client_id.as_str()) {
                    group.athletes.push(&record.client_id);
                }
            }
            None => groups.push(ExerciseGroup {
                exercise_id: &record.exercise_id,
                latest_at: record.updated_at,
                top: record,
                athletes: vec![&record.client_id],
            }),
        }
    }

    groups.sort_by_key(|g| std::cmp::Reverse(g.latest_at));

    groups
        .into_iter()
        .take(limit)
        .filter_map(|group| {
            let exercise = doc.exercise(group.exercise_id)?.clone();
            let top_client = doc.client(&group.top.client_id)?.clone();
            Some(LeaderboardEntry {
                exercise,
                top_record: group.top.clone(),
                top_client,
                athlete_count: group.athletes.len(),
            })
        })
        .collect()
}
