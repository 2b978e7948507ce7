//! Issue categories a complaint can be filed under.
//!
//! The catalog is fixed at build time. Unknown codes coming from a shell or
//! the backend degrade to the placeholder label instead of failing.

use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_LABEL: &str = "Select Issue Type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Potholes,
    Garbage,
    Lighting,
    Water,
    Drainage,
    Safety,
    Parks,
    Other,
}

impl Category {
    pub const ALL: [Self; 8] = [
        Self::Potholes,
        Self::Garbage,
        Self::Lighting,
        Self::Water,
        Self::Drainage,
        Self::Safety,
        Self::Parks,
        Self::Other,
    ];

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "potholes" => Some(Self::Potholes),
            "garbage" => Some(Self::Garbage),
            "lighting" => Some(Self::Lighting),
            "water" => Some(Self::Water),
            "drainage" => Some(Self::Drainage),
            "safety" => Some(Self::Safety),
            "parks" => Some(Self::Parks),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Potholes => "potholes",
            Self::Garbage => "garbage",
            Self::Lighting => "lighting",
            Self::Water => "water",
            Self::Drainage => "drainage",
            Self::Safety => "safety",
            Self::Parks => "parks",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Potholes => "Potholes",
            Self::Garbage => "Garbage Collection",
            Self::Lighting => "Street Lighting",
            Self::Water => "Water Supply",
            Self::Drainage => "Drainage",
            Self::Safety => "Public Safety",
            Self::Parks => "Parks & Recreation",
            Self::Other => "Other",
        }
    }

    /// Icon name used by the complaint list cards.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Potholes => "car",
            Self::Garbage => "trash",
            Self::Lighting => "bulb",
            Self::Water | Self::Drainage => "water",
            Self::Safety => "shield-checkmark",
            Self::Parks => "leaf",
            Self::Other => "alert-circle",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub code: &'static str,
    pub label: &'static str,
}

const CATALOG: [CategoryEntry; 8] = [
    entry(Category::Potholes),
    entry(Category::Garbage),
    entry(Category::Lighting),
    entry(Category::Water),
    entry(Category::Drainage),
    entry(Category::Safety),
    entry(Category::Parks),
    entry(Category::Other),
];

const fn entry(category: Category) -> CategoryEntry {
    CategoryEntry {
        code: category.code(),
        label: category.label(),
    }
}

/// Picker entries in display order.
#[must_use]
pub fn catalog() -> &'static [CategoryEntry] {
    &CATALOG
}

#[must_use]
pub fn label_of(code: Option<&str>) -> &'static str {
    code.and_then(Category::from_code)
        .map_or(PLACEHOLDER_LABEL, Category::label)
}
