//! Client domain model.

use serde::{Deserialize, Serialize};

/// Gender used both for client identity and for the view-level leaderboard
/// filter. Not a data partition; records of both genders live side by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// A gym member or trainer. Identity is `id`, an opaque stable string
/// generated once at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    #[serde(default)]
    pub is_trainer: bool,
}

/// Upsert input for [`Client`]. An absent id creates a new client with a
/// freshly generated identifier; a present id updates the matching client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInput {
    pub id: Option<String>,
    pub name: String,
    pub gender: Gender,
    pub is_trainer: bool,
}
