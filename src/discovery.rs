//! Discovery and ranking of listings.
//!
//! A pure function of `(dataset, filters)`: every active filter must pass
//! (AND semantics), then the survivors are ordered priority-first and by
//! popularity descending. Ties keep their dataset order. Nothing here can
//! fail; narrow or contradictory filters just produce an empty result.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::Listing;
use crate::schedule;

/// Either no restriction or one exact value.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// `sentinel` is the page's "everything" label, e.g. "All Issues".
    pub fn from_label(label: &str, sentinel: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed == sentinel || trimmed.eq_ignore_ascii_case("all") {
            Selection::All
        } else {
            Selection::Only(trimmed.to_string())
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Tomorrow,
    Week,
}

impl FromStr for DateFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" | "all dates" => Ok(DateFilter::All),
            "today" => Ok(DateFilter::Today),
            "tomorrow" => Ok(DateFilter::Tomorrow),
            "week" | "this week" => Ok(DateFilter::Week),
            other => Err(format!("unknown date filter: {other}")),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Filters {
    pub category: Selection,
    pub status: Selection,
    pub search: String,
    pub max_distance_km: f64,
    pub date: DateFilter,
    /// The day "today" refers to. No timezone normalization is applied.
    pub reference_date: NaiveDate,
}

impl Filters {
    pub fn new(max_distance_km: f64, reference_date: NaiveDate) -> Self {
        Self {
            category: Selection::All,
            status: Selection::All,
            search: String::new(),
            max_distance_km,
            date: DateFilter::All,
            reference_date,
        }
    }
}

pub fn matches_category<T: Listing>(item: &T, filters: &Filters) -> bool {
    filters.category.accepts(item.category())
}

/// Listings without a status only pass when no status is selected.
pub fn matches_status<T: Listing>(item: &T, filters: &Filters) -> bool {
    match (&filters.status, item.status()) {
        (Selection::All, _) => true,
        (Selection::Only(wanted), Some(status)) => wanted == status,
        (Selection::Only(_), None) => false,
    }
}

pub fn matches_search<T: Listing>(item: &T, filters: &Filters) -> bool {
    if filters.search.is_empty() {
        return true;
    }
    let needle = filters.search.to_lowercase();
    item.title().to_lowercase().contains(&needle)
        || item.description().to_lowercase().contains(&needle)
}

/// Inclusive: a listing exactly at the threshold passes.
pub fn matches_distance<T: Listing>(item: &T, filters: &Filters) -> bool {
    item.distance_km() <= filters.max_distance_km
}

pub fn matches_date<T: Listing>(item: &T, filters: &Filters) -> bool {
    let wanted = match filters.date {
        DateFilter::All | DateFilter::Week => return true,
        DateFilter::Today => Some(filters.reference_date),
        DateFilter::Tomorrow => filters.reference_date.checked_add_days(Days::new(1)),
    };
    match (wanted, schedule::parse_date_label(item.date_label())) {
        (Some(wanted), Some(date)) => wanted == date,
        _ => false,
    }
}

pub fn matches<T: Listing>(item: &T, filters: &Filters) -> bool {
    matches_category(item, filters)
        && matches_status(item, filters)
        && matches_search(item, filters)
        && matches_distance(item, filters)
        && matches_date(item, filters)
}

/// Priority first, then popularity descending. `sort_by` is stable, so
/// anything still tied keeps its incoming order.
pub fn rank<T: Listing>(items: &mut [&T]) {
    items.sort_by(|a, b| {
        b.is_priority()
            .cmp(&a.is_priority())
            .then_with(|| b.popularity().cmp(&a.popularity()))
    });
}

pub fn discover<'a, T: Listing>(dataset: &'a [T], filters: &Filters) -> Vec<&'a T> {
    let mut results: Vec<&T> = dataset.iter().filter(|item| matches(*item, filters)).collect();
    rank(&mut results);
    results
}

/// The ranked output of one pipeline run.
#[derive(Debug)]
pub struct Discovery<'a, T> {
    pub items: Vec<&'a T>,
}

impl<'a, T: Listing> Discovery<'a, T> {
    pub fn run(dataset: &'a [T], filters: &Filters) -> Self {
        let items = discover(dataset, filters);
        tracing::debug!(
            total = dataset.len(),
            matched = items.len(),
            "discovery pipeline finished"
        );
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.items.iter().map(|item| item.id()).collect()
    }

    /// Result header, or the "no results" text when nothing matched.
    pub fn summary(&self, noun: &str) -> String {
        match self.items.len() {
            0 => format!("No {noun}s found"),
            1 => format!("1 {noun} found"),
            n => format!("{n} {noun}s found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, Issue, IssueStatus, Severity};

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 9).expect("valid date")
    }

    fn event(id: u32, category: &str, distance_km: f64, is_urgent: bool, upvotes: u32) -> Event {
        Event {
            id,
            title: format!("Event {id}"),
            description: String::new(),
            category: category.to_string(),
            date: "Dec 09, 2024".to_string(),
            time: "10:00 AM".to_string(),
            location: "Central Park".to_string(),
            address: None,
            organizer: "Organizer".to_string(),
            attendees: 0,
            is_featured: false,
            is_paid: false,
            ticket_tiers: Vec::new(),
            tags: Vec::new(),
            distance_km,
            upvotes,
            is_urgent,
        }
    }

    fn scenario() -> Vec<Event> {
        vec![
            event(1, "Music", 1.2, false, 15),
            event(2, "Lost & Found", 0.8, true, 23),
            event(3, "Community", 2.1, false, 8),
        ]
    }

    fn ids(items: &[&Event]) -> Vec<u32> {
        items.iter().map(|item| item.id).collect()
    }

    #[test]
    fn ranks_priority_then_popularity() {
        let dataset = scenario();
        let filters = Filters::new(5.0, reference());
        assert_eq!(ids(&discover(&dataset, &filters)), vec![2, 1, 3]);
    }

    #[test]
    fn tight_radius_excludes_everything() {
        let dataset = scenario();
        let filters = Filters::new(0.5, reference());
        let found = Discovery::run(&dataset, &filters);
        assert!(found.is_empty());
        assert_eq!(found.summary("event"), "No events found");
    }

    #[test]
    fn distance_threshold_is_inclusive() {
        let dataset = scenario();
        let at_boundary = Filters::new(1.2, reference());
        assert_eq!(ids(&discover(&dataset, &at_boundary)), vec![2, 1]);

        let just_below = Filters::new(1.2 - 1e-9, reference());
        assert_eq!(ids(&discover(&dataset, &just_below)), vec![2]);
    }

    #[test]
    fn urgent_beats_any_score() {
        let dataset = vec![event(1, "Music", 1.0, false, 100), event(2, "Music", 1.0, true, 0)];
        let filters = Filters::new(5.0, reference());
        assert_eq!(ids(&discover(&dataset, &filters)), vec![2, 1]);
    }

    #[test]
    fn equal_keys_keep_dataset_order() {
        let dataset = vec![
            event(5, "Music", 1.0, false, 10),
            event(3, "Sports", 1.0, false, 10),
            event(9, "Music", 1.0, true, 10),
            event(1, "Community", 1.0, false, 10),
            event(7, "Music", 1.0, true, 10),
        ];
        let filters = Filters::new(5.0, reference());
        assert_eq!(ids(&discover(&dataset, &filters)), vec![9, 7, 5, 3, 1]);
    }

    #[test]
    fn empty_search_passes_everything() {
        let dataset = scenario();
        let mut filters = Filters::new(100.0, reference());
        filters.search = String::new();
        assert_eq!(discover(&dataset, &filters).len(), dataset.len());
    }

    #[test]
    fn search_is_case_insensitive_over_title_or_description() {
        let mut dataset = scenario();
        dataset[0].title = "Live Music Festival".to_string();
        dataset[2].description = "Bring your own FESTIVAL gloves".to_string();
        let mut filters = Filters::new(5.0, reference());
        filters.search = "festival".to_string();
        assert_eq!(ids(&discover(&dataset, &filters)), vec![1, 3]);
    }

    #[test]
    fn category_is_an_exact_match() {
        let dataset = scenario();
        let mut filters = Filters::new(5.0, reference());
        filters.category = Selection::Only("Music".to_string());
        assert_eq!(ids(&discover(&dataset, &filters)), vec![1]);

        filters.category = Selection::Only("music".to_string());
        assert!(discover(&dataset, &filters).is_empty());
    }

    #[test]
    fn status_selection_excludes_listings_without_status() {
        let dataset = scenario();
        let mut filters = Filters::new(5.0, reference());
        filters.status = Selection::Only("Reported".to_string());
        assert!(discover(&dataset, &filters).is_empty());
    }

    #[test]
    fn date_buckets_compare_against_reference_day() {
        let mut dataset = scenario();
        dataset[1].date = "Dec 10, 2024".to_string();
        dataset[2].date = "2024-12-09".to_string();
        let mut filters = Filters::new(5.0, reference());

        filters.date = DateFilter::Today;
        assert_eq!(ids(&discover(&dataset, &filters)), vec![1, 3]);

        filters.date = DateFilter::Tomorrow;
        assert_eq!(ids(&discover(&dataset, &filters)), vec![2]);

        filters.date = DateFilter::Week;
        assert_eq!(ids(&discover(&dataset, &filters)), vec![2, 1, 3]);
    }

    #[test]
    fn conjunction_matches_each_predicate() {
        let mut dataset = scenario();
        dataset.push(event(4, "Music", 4.0, false, 2));
        dataset.push(event(5, "Music", 9.0, true, 50));
        dataset[0].date = "Dec 11, 2024".to_string();

        let mut filters = Filters::new(5.0, reference());
        filters.category = Selection::Only("Music".to_string());
        filters.search = "event".to_string();
        filters.date = DateFilter::Today;

        let found = discover(&dataset, &filters);
        for item in &dataset {
            let individually = matches_category(item, &filters)
                && matches_status(item, &filters)
                && matches_search(item, &filters)
                && matches_distance(item, &filters)
                && matches_date(item, &filters);
            assert_eq!(found.iter().any(|f| f.id == item.id), individually);
        }
        assert_eq!(ids(&found), vec![4]);
    }

    #[test]
    fn issues_filter_by_status() {
        let issue = |id: u32, status: IssueStatus, severity: Severity, upvotes: u32| Issue {
            id,
            title: format!("Issue {id}"),
            description: String::new(),
            category: "Roads".to_string(),
            status,
            severity,
            distance_km: 1.0,
            upvotes,
            reported: "1 day ago".to_string(),
            location: None,
        };
        let dataset = vec![
            issue(1, IssueStatus::Reported, Severity::Medium, 45),
            issue(2, IssueStatus::Resolved, Severity::Low, 31),
            issue(3, IssueStatus::Reported, Severity::High, 2),
        ];
        let mut filters = Filters::new(5.0, reference());
        filters.status = Selection::Only("Reported".to_string());

        let found = Discovery::run(&dataset, &filters);
        assert_eq!(found.ids(), vec![3, 1]);
        assert_eq!(found.summary("issue"), "2 issues found");
    }

    #[test]
    fn date_filter_parses_ui_values() {
        assert_eq!("All Dates".parse::<DateFilter>(), Ok(DateFilter::All));
        assert_eq!("today".parse::<DateFilter>(), Ok(DateFilter::Today));
        assert_eq!("This Week".parse::<DateFilter>(), Ok(DateFilter::Week));
        assert!("yesterday".parse::<DateFilter>().is_err());
    }
}
