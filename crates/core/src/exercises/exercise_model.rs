//! Exercise domain model.

use serde::{Deserialize, Serialize};

/// Muscle-group category. The set is fixed; serialized names are the
/// canonical display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Back,
    Legs,
    Forearms,
    Biceps,
    Triceps,
    Abs,
    Shoulders,
    Chest,
    Glutes,
}

/// Canonical category order, used for filter pills and as the fallback
/// default on import.
pub const CATEGORIES: [Category; 9] = [
    Category::Back,
    Category::Legs,
    Category::Forearms,
    Category::Biceps,
    Category::Triceps,
    Category::Abs,
    Category::Shoulders,
    Category::Chest,
    Category::Glutes,
];

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Back => "Back",
            Category::Legs => "Legs",
            Category::Forearms => "Forearms",
            Category::Biceps => "Biceps",
            Category::Triceps => "Triceps",
            Category::Abs => "Abs",
            Category::Shoulders => "Shoulders",
            Category::Chest => "Chest",
            Category::Glutes => "Glutes",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        CATEGORIES
            .into_iter()
            .find(|cat| cat.name().eq_ignore_ascii_case(trimmed))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A tracked lift. Deleting an exercise cascades to every record for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub category: Category,
}

/// Upsert input for [`Exercise`]; same id semantics as `ClientInput`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseInput {
    pub id: Option<String>,
    pub name: String,
    pub category: Category,
}
