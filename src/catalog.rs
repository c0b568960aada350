use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::discovery::Selection;
use crate::models::{EntityKind, IssueStatus, Listing};

/// The enumerations a page filters against. The pipeline itself knows
/// nothing about them; they are handed in as configuration.
#[derive(Clone, Debug, Serialize)]
pub struct Catalog {
    pub kind: EntityKind,
    pub all_label: &'static str,
    pub categories: Vec<&'static str>,
    pub all_status_label: &'static str,
    pub statuses: Vec<&'static str>,
}

static EVENTS: Lazy<Catalog> = Lazy::new(|| Catalog {
    kind: EntityKind::Event,
    all_label: "All Events",
    categories: vec![
        "Music",
        "Sports",
        "Food & Drink",
        "Arts & Culture",
        "Community",
        "Business",
        "Health & Wellness",
        "Education",
        "Technology",
        "Lost & Found",
        "Other",
    ],
    all_status_label: "All Status",
    statuses: Vec::new(),
});

static ISSUES: Lazy<Catalog> = Lazy::new(|| Catalog {
    kind: EntityKind::Issue,
    all_label: "All Issues",
    categories: vec![
        "Roads",
        "Lighting",
        "Water Supply",
        "Cleanliness",
        "Public Safety",
        "Obstructions",
        "Other",
    ],
    all_status_label: "All Status",
    statuses: IssueStatus::ALL.iter().map(IssueStatus::label).collect(),
});

/// A dataset entry that breaks one of the catalog invariants.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum DatasetViolation {
    DuplicateId { id: u32 },
    UnknownCategory { id: u32, category: String },
    UnknownStatus { id: u32, status: String },
    InvalidDistance { id: u32, distance_km: f64 },
}

impl Catalog {
    pub fn events() -> &'static Catalog {
        &EVENTS
    }

    pub fn issues() -> &'static Catalog {
        &ISSUES
    }

    pub fn for_kind(kind: EntityKind) -> &'static Catalog {
        match kind {
            EntityKind::Event => Self::events(),
            EntityKind::Issue => Self::issues(),
        }
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|known| *known == category)
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.statuses.iter().any(|known| *known == status)
    }

    /// Maps a selector label onto a filter selection. The page's sentinel
    /// label, a bare "all" and an empty value all mean no restriction.
    pub fn category_selection(&self, label: &str) -> Selection {
        Selection::from_label(label, self.all_label)
    }

    pub fn status_selection(&self, label: &str) -> Selection {
        Selection::from_label(label, self.all_status_label)
    }

    pub fn check_dataset<T: Listing>(&self, dataset: &[T]) -> Vec<DatasetViolation> {
        let mut seen = HashSet::new();
        let mut violations = Vec::new();

        for item in dataset {
            let id = item.id();
            if !seen.insert(id) {
                violations.push(DatasetViolation::DuplicateId { id });
            }
            if !self.has_category(item.category()) {
                violations.push(DatasetViolation::UnknownCategory {
                    id,
                    category: item.category().to_string(),
                });
            }
            if let Some(status) = item.status() {
                if !self.has_status(status) {
                    violations.push(DatasetViolation::UnknownStatus {
                        id,
                        status: status.to_string(),
                    });
                }
            }
            let distance_km = item.distance_km();
            if !distance_km.is_finite() || distance_km < 0.0 {
                violations.push(DatasetViolation::InvalidDistance { id, distance_km });
            }
        }

        violations
    }
}
