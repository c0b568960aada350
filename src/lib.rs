pub mod catalog;
pub mod config;
pub mod discovery;
pub mod drafts;
pub mod forms;
pub mod labels;
pub mod mock_data;
pub mod models;
pub mod schedule;
pub mod submission;
mod utils;

use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use catalog::Catalog;
use config::{AppConfig, ConfigStore};
use discovery::{DateFilter, Discovery, Filters};
use drafts::{DraftStorage, ScopedDrafts, SqliteStorage, ISSUE_REPORT_DRAFT};
use forms::{IssueReportDraft, IssueReportForm};
use models::{EntityKind, Event, Issue, Listing};
use submission::{Receipt, SimulatedSubmitter, Submitter};

/// Raw selector values as a page holds them. Missing values mean "no
/// restriction", except `within` which falls back to the configured radius.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub within: Option<String>,
    pub date: Option<String>,
}

impl ListingQuery {
    /// Never fails. An unknown date bucket means no date restriction, and a
    /// radius that cannot be read matches nothing.
    pub fn to_filters(&self, catalog: &Catalog, config: &AppConfig) -> Filters {
        let max_distance_km = match self.within.as_deref() {
            Some(raw) => labels::parse_radius_option(raw).unwrap_or_else(|| {
                tracing::debug!("unreadable distance {raw:?}, nothing will match");
                f64::NAN
            }),
            None => config.default_distance_km,
        };
        let mut filters = Filters::new(max_distance_km, config.reference_date_or_today());
        if let Some(category) = &self.category {
            filters.category = catalog.category_selection(category);
        }
        if let Some(status) = &self.status {
            filters.status = catalog.status_selection(status);
        }
        if let Some(search) = &self.search {
            filters.search = search.clone();
        }
        if let Some(date) = &self.date {
            filters.date = date.parse::<DateFilter>().unwrap_or_else(|err| {
                tracing::debug!("{err}, showing all dates");
                DateFilter::All
            });
        }
        filters
    }
}

#[derive(Debug, Serialize)]
pub struct ListingPage<T> {
    pub summary: String,
    pub count: usize,
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCard {
    #[serde(flatten)]
    pub event: Event,
    pub distance_label: String,
    pub badge: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCard {
    #[serde(flatten)]
    pub issue: Issue,
    pub distance_label: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub kind: EntityKind,
    pub categories: Vec<&'static str>,
    pub statuses: Vec<&'static str>,
    pub distances: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    #[serde(flatten)]
    pub card: EventCard,
    pub lowest_price_cents: Option<i64>,
}

/// The moment badges are computed against. A pinned reference date keeps
/// the current time of day.
fn local_now(config: &AppConfig) -> NaiveDateTime {
    let now = Utc::now().with_timezone(&config.tz()).naive_local();
    match config.reference_date {
        Some(date) => date.and_time(now.time()),
        None => now,
    }
}

fn page<T: Listing, C>(
    found: Discovery<'_, T>,
    kind: EntityKind,
    card: impl Fn(&T) -> C,
) -> ListingPage<C> {
    ListingPage {
        summary: found.summary(kind.noun()),
        count: found.len(),
        items: found.items.into_iter().map(card).collect(),
    }
}

fn event_card(event: &Event, now: NaiveDateTime) -> EventCard {
    EventCard {
        event: event.clone(),
        distance_label: labels::format_distance(event.distance_km),
        badge: schedule::status_badge(event, now).map(|badge| badge.label()),
    }
}

pub fn list_events(
    query: &ListingQuery,
    events: &[Event],
    config: &AppConfig,
) -> ListingPage<EventCard> {
    list_events_at(query, events, config, local_now(config))
}

fn list_events_at(
    query: &ListingQuery,
    events: &[Event],
    config: &AppConfig,
    now: NaiveDateTime,
) -> ListingPage<EventCard> {
    let filters = query.to_filters(Catalog::events(), config);
    let found = Discovery::run(events, &filters);
    page(found, EntityKind::Event, |event| event_card(event, now))
}

pub fn list_issues(
    query: &ListingQuery,
    issues: &[Issue],
    config: &AppConfig,
) -> ListingPage<IssueCard> {
    let filters = query.to_filters(Catalog::issues(), config);
    let found = Discovery::run(issues, &filters);
    page(found, EntityKind::Issue, |issue| IssueCard {
        issue: issue.clone(),
        distance_label: labels::format_distance(issue.distance_km),
    })
}

pub fn get_event(id: u32, events: &[Event], config: &AppConfig) -> Result<EventDetail, String> {
    get_event_at(id, events, local_now(config))
}

fn get_event_at(id: u32, events: &[Event], now: NaiveDateTime) -> Result<EventDetail, String> {
    let event = events
        .iter()
        .find(|event| event.id == id)
        .ok_or_else(|| format!("event {id} not found"))?;
    Ok(EventDetail {
        card: event_card(event, now),
        lowest_price_cents: event.lowest_price_cents(),
    })
}

/// Selector contents for a page, each list led by its "everything" label.
pub fn list_categories(kind: EntityKind, config: &AppConfig) -> FilterOptions {
    let catalog = Catalog::for_kind(kind);
    let statuses = if catalog.statuses.is_empty() {
        Vec::new()
    } else {
        std::iter::once(catalog.all_status_label)
            .chain(catalog.statuses.iter().copied())
            .collect()
    };
    FilterOptions {
        kind,
        categories: std::iter::once(catalog.all_label)
            .chain(catalog.categories.iter().copied())
            .collect(),
        statuses,
        distances: config
            .distance_options
            .iter()
            .map(|km| labels::format_radius_option(*km))
            .collect(),
    }
}

pub fn open_drafts(config: &AppConfig) -> Result<ScopedDrafts<SqliteStorage>, String> {
    let storage = SqliteStorage::open_default().map_err(|e| e.to_string())?;
    Ok(ScopedDrafts::new(config.drafts_scope.clone(), storage))
}

pub fn save_issue_draft<S: DraftStorage>(
    drafts: &ScopedDrafts<S>,
    draft: &IssueReportDraft,
) -> Result<(), String> {
    drafts
        .save(ISSUE_REPORT_DRAFT, draft)
        .map_err(|e| e.to_string())
}

pub fn load_issue_draft<S: DraftStorage>(
    drafts: &ScopedDrafts<S>,
) -> Result<Option<IssueReportDraft>, String> {
    drafts
        .load_or_discard(ISSUE_REPORT_DRAFT)
        .map_err(|e| e.to_string())
}

pub fn clear_issue_draft<S: DraftStorage>(drafts: &ScopedDrafts<S>) -> Result<(), String> {
    drafts.clear(ISSUE_REPORT_DRAFT).map_err(|e| e.to_string())
}

/// Submits the stored report draft. Photos are never part of a draft, so the
/// report goes out without attachments.
pub async fn submit_issue_draft<S: DraftStorage, T: Submitter>(
    drafts: &ScopedDrafts<S>,
    submitter: &T,
) -> Result<Receipt, String> {
    let draft = load_issue_draft(drafts)?.ok_or_else(|| "no saved issue report".to_string())?;
    let mut form = IssueReportForm::default();
    form.apply_draft(draft);
    submission::submit_issue_report(&mut form, Catalog::issues(), submitter, drafts)
        .await
        .map_err(|e| e.to_string())
}

const USAGE: &str = "usage:
  community-pulse events|issues [--category C] [--status S] [--search Q] [--within KM] [--date all|today|tomorrow|week] [--data FILE]
  community-pulse event <id> [--data FILE]
  community-pulse categories events|issues
  community-pulse draft show|clear
  community-pulse draft save <json>
  community-pulse submit-draft
  community-pulse config show
  community-pulse config set <key> <value>";

#[derive(Debug, PartialEq)]
enum Command {
    List {
        kind: EntityKind,
        query: ListingQuery,
        data: Option<PathBuf>,
    },
    Event {
        id: u32,
        data: Option<PathBuf>,
    },
    Categories(EntityKind),
    DraftShow,
    DraftClear,
    DraftSave(String),
    SubmitDraft,
    ConfigShow,
    ConfigSet {
        key: String,
        value: String,
    },
}

fn parse_kind(raw: &str) -> Result<EntityKind, String> {
    match raw {
        "events" | "event" => Ok(EntityKind::Event),
        "issues" | "issue" => Ok(EntityKind::Issue),
        other => Err(format!("unknown listing kind: {other}")),
    }
}

fn parse_list_args(kind: EntityKind, args: &[String]) -> Result<Command, String> {
    let mut query = ListingQuery::default();
    let mut data = None;
    let mut rest = args.iter();
    while let Some(flag) = rest.next() {
        let value = rest
            .next()
            .ok_or_else(|| format!("{flag} needs a value"))?
            .clone();
        match flag.as_str() {
            "--category" => query.category = Some(value),
            "--status" => query.status = Some(value),
            "--search" => query.search = Some(value),
            "--within" => query.within = Some(value),
            "--date" => query.date = Some(value),
            "--data" => data = Some(PathBuf::from(value)),
            other => return Err(format!("unknown option: {other}")),
        }
    }
    Ok(Command::List { kind, query, data })
}

fn parse_event_args(id: &str, data: Option<PathBuf>) -> Result<Command, String> {
    let id = id
        .parse::<u32>()
        .map_err(|_| format!("invalid event id: {id}"))?;
    Ok(Command::Event { id, data })
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    match words.as_slice() {
        [kind @ ("events" | "issues"), ..] => parse_list_args(parse_kind(kind)?, &args[1..]),
        ["event", id] => parse_event_args(id, None),
        ["event", id, "--data", path] => parse_event_args(id, Some(PathBuf::from(*path))),
        ["categories", kind] => Ok(Command::Categories(parse_kind(kind)?)),
        ["draft", "show"] => Ok(Command::DraftShow),
        ["draft", "clear"] => Ok(Command::DraftClear),
        ["draft", "save", json] => Ok(Command::DraftSave(json.to_string())),
        ["submit-draft"] => Ok(Command::SubmitDraft),
        ["config", "show"] => Ok(Command::ConfigShow),
        ["config", "set", key, value] => Ok(Command::ConfigSet {
            key: key.to_string(),
            value: value.to_string(),
        }),
        _ => Err(USAGE.to_string()),
    }
}

fn load_dataset<T>(
    kind: EntityKind,
    data: Option<&Path>,
    load: fn(&Path) -> anyhow::Result<Vec<T>>,
    sample: fn() -> Vec<T>,
) -> Result<Vec<T>, String>
where
    T: Listing,
{
    let Some(path) = data else {
        return Ok(sample());
    };
    let items = load(path).map_err(|e| format!("{e:#}"))?;
    for violation in Catalog::for_kind(kind).check_dataset(&items) {
        tracing::warn!(?violation, "dataset entry breaks the {} catalog", kind.noun());
    }
    Ok(items)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

/// Persists one config value and returns the effective config.
pub fn set_config(store: &ConfigStore, key: &str, value: &str) -> Result<AppConfig, String> {
    store
        .update(|config| config.set(key, value))
        .map_err(|e| e.to_string())
}

fn execute(command: Command, store: &ConfigStore) -> Result<String, String> {
    let config = &store.read();
    match command {
        Command::List { kind, query, data } => match kind {
            EntityKind::Event => {
                let events = load_dataset(
                    kind,
                    data.as_deref(),
                    mock_data::load_events,
                    mock_data::sample_events,
                )?;
                to_json(&list_events(&query, &events, config))
            }
            EntityKind::Issue => {
                let issues = load_dataset(
                    kind,
                    data.as_deref(),
                    mock_data::load_issues,
                    mock_data::sample_issues,
                )?;
                to_json(&list_issues(&query, &issues, config))
            }
        },
        Command::Event { id, data } => {
            let events = load_dataset(
                EntityKind::Event,
                data.as_deref(),
                mock_data::load_events,
                mock_data::sample_events,
            )?;
            to_json(&get_event(id, &events, config)?)
        }
        Command::Categories(kind) => to_json(&list_categories(kind, config)),
        Command::DraftShow => to_json(&load_issue_draft(&open_drafts(config)?)?),
        Command::DraftClear => {
            clear_issue_draft(&open_drafts(config)?)?;
            to_json(&serde_json::json!({ "cleared": true }))
        }
        Command::DraftSave(json) => {
            let draft: IssueReportDraft =
                serde_json::from_str(&json).map_err(|e| format!("invalid draft json: {e}"))?;
            save_issue_draft(&open_drafts(config)?, &draft)?;
            to_json(&draft)
        }
        Command::SubmitDraft => {
            let drafts = open_drafts(config)?;
            let submitter = SimulatedSubmitter::new(config.submit_delay());
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .map_err(|e| e.to_string())?;
            to_json(&runtime.block_on(submit_issue_draft(&drafts, &submitter))?)
        }
        Command::ConfigShow => to_json(config),
        Command::ConfigSet { key, value } => to_json(&set_config(store, &key, &value)?),
    }
}

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let store = ConfigStore::load();
    match parse_command(&args).and_then(|command| execute(command, &store)) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
