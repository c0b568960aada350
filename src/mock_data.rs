use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::models::{Event, Issue, IssueStatus, Severity, TicketTier};

struct EventSeed {
    id: u32,
    title: &'static str,
    description: &'static str,
    category: &'static str,
    date: &'static str,
    time: &'static str,
    location: &'static str,
    organizer: &'static str,
    attendees: u32,
    distance_km: f64,
    upvotes: u32,
    is_urgent: bool,
}

fn sample_event(seed: EventSeed) -> Event {
    Event {
        id: seed.id,
        title: seed.title.to_string(),
        description: seed.description.to_string(),
        category: seed.category.to_string(),
        date: seed.date.to_string(),
        time: seed.time.to_string(),
        location: seed.location.to_string(),
        address: None,
        organizer: seed.organizer.to_string(),
        attendees: seed.attendees,
        is_featured: false,
        is_paid: false,
        ticket_tiers: Vec::new(),
        tags: Vec::new(),
        distance_km: seed.distance_km,
        upvotes: seed.upvotes,
        is_urgent: seed.is_urgent,
    }
}

fn tier(name: &str, price_cents: i64, description: &str) -> TicketTier {
    TicketTier {
        name: name.to_string(),
        price_cents,
        description: description.to_string(),
    }
}

pub fn sample_events() -> Vec<Event> {
    let mut festival = sample_event(EventSeed {
        id: 1,
        title: "Live Music Festival",
        description: "Join us for an amazing night of live music featuring local bands and artists.",
        category: "Music",
        date: "Dec 09, 2024",
        time: "10:30 AM",
        location: "Central Park",
        organizer: "Music Events Co.",
        attendees: 27,
        distance_km: 1.2,
        upvotes: 15,
        is_urgent: false,
    });
    festival.is_featured = true;
    festival.is_paid = true;
    festival.address = Some("123 Park Avenue, Downtown".to_string());
    festival.ticket_tiers = vec![
        tier("Standard", 1999, "General admission"),
        tier("Gold", 3999, "Premium seating + refreshments"),
        tier("Platinum", 7999, "VIP experience + meet & greet"),
    ];
    festival.tags = vec!["Music".to_string(), "Outdoor".to_string()];

    vec![
        festival,
        sample_event(EventSeed {
            id: 2,
            title: "Lost Golden Retriever - Max",
            description: "Missing since yesterday evening near Riverside Park. Friendly dog, responds to 'Max'. Please contact if seen.",
            category: "Lost & Found",
            date: "Dec 08, 2024",
            time: "6:00 PM",
            location: "Riverside Park Area",
            organizer: "Sarah Johnson",
            attendees: 0,
            distance_km: 0.8,
            upvotes: 23,
            is_urgent: true,
        }),
        sample_event(EventSeed {
            id: 3,
            title: "Community Cleanup Drive",
            description: "Help make our neighborhood cleaner and more beautiful. Free refreshments provided.",
            category: "Community",
            date: "Dec 12, 2024",
            time: "9:00 AM",
            location: "Riverside Park",
            organizer: "Green Initiative",
            attendees: 15,
            distance_km: 2.1,
            upvotes: 8,
            is_urgent: false,
        }),
        sample_event(EventSeed {
            id: 4,
            title: "Food Truck Rally",
            description: "Taste amazing food from local food trucks and vendors.",
            category: "Food & Drink",
            date: "Dec 15, 2024",
            time: "12:00 PM",
            location: "Downtown Square",
            organizer: "Foodie Events",
            attendees: 42,
            distance_km: 3.2,
            upvotes: 12,
            is_urgent: false,
        }),
        sample_event(EventSeed {
            id: 5,
            title: "Tech Meetup: AI & Machine Learning",
            description: "Explore the latest trends in artificial intelligence and machine learning with industry experts.",
            category: "Technology",
            date: "Dec 10, 2024",
            time: "06:00 PM",
            location: "Innovation Hub",
            organizer: "Tech Innovators",
            attendees: 120,
            distance_km: 6.5,
            upvotes: 31,
            is_urgent: false,
        }),
        sample_event(EventSeed {
            id: 6,
            title: "Basketball Tournament",
            description: "Annual community basketball tournament. Teams of all skill levels welcome!",
            category: "Sports",
            date: "Dec 14, 2024",
            time: "10:00 AM",
            location: "Community Sports Center",
            organizer: "Sports Club",
            attendees: 80,
            distance_km: 4.4,
            upvotes: 19,
            is_urgent: false,
        }),
        sample_event(EventSeed {
            id: 7,
            title: "Art Workshop: Watercolor Painting",
            description: "Learn watercolor painting techniques from professional artists. All materials provided.",
            category: "Arts & Culture",
            date: "Dec 10, 2024",
            time: "02:00 PM",
            location: "Art Studio Downtown",
            organizer: "Downtown Art Center",
            attendees: 25,
            distance_km: 1.9,
            upvotes: 8,
            is_urgent: false,
        }),
        sample_event(EventSeed {
            id: 8,
            title: "Health & Wellness Fair",
            description: "Free health screenings, wellness tips, and healthy lifestyle demonstrations.",
            category: "Health & Wellness",
            date: "Dec 21, 2024",
            time: "11:00 AM",
            location: "Community Center",
            organizer: "Health Department",
            attendees: 150,
            distance_km: 12.0,
            upvotes: 27,
            is_urgent: false,
        }),
    ]
}

#[allow(clippy::too_many_arguments)]
fn sample_issue(
    id: u32,
    title: &str,
    description: &str,
    category: &str,
    status: IssueStatus,
    severity: Severity,
    distance_km: f64,
    upvotes: u32,
    reported: &str,
) -> Issue {
    Issue {
        id,
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        status,
        severity,
        distance_km,
        upvotes,
        reported: reported.to_string(),
        location: None,
    }
}

pub fn sample_issues() -> Vec<Issue> {
    vec![
        sample_issue(
            1,
            "Broken Manhole Cover",
            "Dangerous open manhole without proper barriers",
            "Public Safety",
            IssueStatus::Reported,
            Severity::High,
            1.5,
            45,
            "2 hours ago",
        ),
        sample_issue(
            2,
            "Overflowing Garbage Bins",
            "Multiple garbage bins overflowing for several days",
            "Cleanliness",
            IssueStatus::Resolved,
            Severity::Medium,
            2.1,
            31,
            "1 day ago",
        ),
        sample_issue(
            3,
            "Potholes on Main Street",
            "Dangerous potholes causing traffic issues and vehicle damage",
            "Roads",
            IssueStatus::InProgress,
            Severity::Medium,
            0.8,
            23,
            "3 days ago",
        ),
        sample_issue(
            4,
            "Streetlight Out on Elm Avenue",
            "The corner streetlight has been dark for a week, the crossing is hard to see at night",
            "Lighting",
            IssueStatus::Reported,
            Severity::Low,
            3.4,
            12,
            "5 days ago",
        ),
        sample_issue(
            5,
            "Water Main Leak",
            "Water pooling across the sidewalk near the school entrance",
            "Water Supply",
            IssueStatus::InProgress,
            Severity::High,
            7.2,
            9,
            "6 hours ago",
        ),
    ]
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read dataset {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid dataset json in {}", path.display()))
}

pub fn load_events(path: &Path) -> Result<Vec<Event>> {
    load_json(path)
}

pub fn load_issues(path: &Path) -> Result<Vec<Issue>> {
    load_json(path)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn sample_ids_are_unique() {
        let mut ids: Vec<u32> = sample_events().iter().map(|event| event.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), sample_events().len());
    }

    #[test]
    fn loads_events_written_as_json() {
        let events = sample_events();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(serde_json::to_string(&events).expect("encode").as_bytes())
            .expect("write dataset");

        let loaded = load_events(file.path()).expect("load dataset");
        assert_eq!(loaded, events);
    }

    #[test]
    fn loads_issues_with_distance_labels() {
        let json = r#"[
            {
                "id": 1,
                "title": "Broken Manhole Cover",
                "category": "Public Safety",
                "status": "Reported",
                "upvotes": 45,
                "distance": "1.5km away",
                "description": "Dangerous open manhole without proper barriers",
                "timeAgo": "2 hours ago"
            },
            {
                "id": 3,
                "title": "Potholes on Main Street",
                "category": "Roads",
                "status": "In Progress",
                "upvotes": 23,
                "distance": 0.8,
                "description": "Dangerous potholes causing traffic issues",
                "timeAgo": "3 days ago"
            }
        ]"#;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(json.as_bytes()).expect("write dataset");

        let loaded = load_issues(file.path()).expect("load dataset");
        assert_eq!(loaded[0].distance_km, 1.5);
        assert_eq!(loaded[0].reported, "2 hours ago");
        assert_eq!(loaded[1].distance_km, 0.8);
        assert_eq!(loaded[1].status, IssueStatus::InProgress);
    }

    #[test]
    fn unreadable_distance_label_fails_the_load() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"[{"id": 1, "title": "t", "description": "d", "category": "Roads",
                 "status": "Reported", "distance": "nearby", "timeAgo": "now"}]"#,
        )
        .expect("write dataset");

        let err = load_issues(file.path()).expect_err("should fail");
        assert!(format!("{err:#}").contains("unrecognized distance: nearby"));
    }

    #[test]
    fn invalid_dataset_reports_the_path() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{ not json").expect("write");

        let err = load_issues(file.path()).expect_err("should fail");
        assert!(err.to_string().contains("invalid dataset json"));
    }
}
