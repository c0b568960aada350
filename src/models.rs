use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::labels;

/// The two kinds of listing the board shows.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Event,
    Issue,
}

impl EntityKind {
    pub fn noun(&self) -> &'static str {
        match self {
            EntityKind::Event => "event",
            EntityKind::Issue => "issue",
        }
    }
}

/// Read-only view over anything the discovery pipeline can filter and rank.
pub trait Listing {
    fn id(&self) -> u32;
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> &str;
    /// `None` for kinds that carry no status.
    fn status(&self) -> Option<&str>;
    fn distance_km(&self) -> f64;
    fn date_label(&self) -> &str;
    /// Priority listings sort ahead of everything else.
    fn is_priority(&self) -> bool;
    fn popularity(&self) -> u32;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Distance {
    Km(f64),
    Label(String),
}

/// Accepts a plain kilometre figure or a display label like "1.5km away".
fn deserialize_distance<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Distance::deserialize(deserializer)? {
        Distance::Km(km) => Ok(km),
        Distance::Label(label) => labels::parse_distance_label(&label)
            .ok_or_else(|| de::Error::custom(format!("unrecognized distance: {label}"))),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TicketTier {
    pub name: String,
    pub price_cents: i64,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: String,
    pub time: String,
    pub location: String,
    #[serde(default)]
    pub address: Option<String>,
    pub organizer: String,
    #[serde(default)]
    pub attendees: u32,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub ticket_tiers: Vec<TicketTier>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(alias = "distance", deserialize_with = "deserialize_distance")]
    pub distance_km: f64,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub is_urgent: bool,
}

impl Event {
    /// Cheapest ticket, if the event is paid and has tiers.
    pub fn lowest_price_cents(&self) -> Option<i64> {
        if !self.is_paid {
            return None;
        }
        self.ticket_tiers.iter().map(|tier| tier.price_cents).min()
    }
}

impl Listing for Event {
    fn id(&self) -> u32 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn status(&self) -> Option<&str> {
        None
    }

    fn distance_km(&self) -> f64 {
        self.distance_km
    }

    fn date_label(&self) -> &str {
        &self.date
    }

    fn is_priority(&self) -> bool {
        self.is_urgent
    }

    fn popularity(&self) -> u32 {
        self.upvotes
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueStatus {
    Reported,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 3] =
        [IssueStatus::Reported, IssueStatus::InProgress, IssueStatus::Resolved];

    pub fn label(&self) -> &'static str {
        match self {
            IssueStatus::Reported => "Reported",
            IssueStatus::InProgress => "In Progress",
            IssueStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: IssueStatus,
    #[serde(default)]
    pub severity: Severity,
    #[serde(alias = "distance", deserialize_with = "deserialize_distance")]
    pub distance_km: f64,
    #[serde(default)]
    pub upvotes: u32,
    /// Relative display label, e.g. "2 hours ago".
    #[serde(alias = "timeAgo")]
    pub reported: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl Listing for Issue {
    fn id(&self) -> u32 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.label())
    }

    fn distance_km(&self) -> f64 {
        self.distance_km
    }

    fn date_label(&self) -> &str {
        &self.reported
    }

    fn is_priority(&self) -> bool {
        self.severity == Severity::High
    }

    fn popularity(&self) -> u32 {
        self.upvotes
    }
}
