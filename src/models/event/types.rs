use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Deserialize;
use sqlx::FromRow;

/// Storage format of event dates and all timestamps.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepted date inputs, tried in order. `datetime-local` inputs submit the
/// `T`-separated forms.
const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

pub const CATEGORIES: [&str; 5] = ["Workshop", "Conference", "Seminar", "Meetup", "Other"];

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

pub fn is_valid_category(category: &str) -> bool {
    category.is_empty() || CATEGORIES.contains(&category)
}

/// Parse a submitted event date. A bare date means midnight.
pub fn parse_event_date(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Local wall-clock time in storage format; event dates are compared against it.
pub fn now_string() -> String {
    chrono::Local::now().naive_local().format(DATETIME_FORMAT).to_string()
}

/// `YYYY-MM-DD HH:MM`, dropping the seconds of a stored timestamp.
pub fn short_datetime(stored: &str) -> &str {
    stored.get(..16).unwrap_or(stored)
}

/// Value for a `datetime-local` input.
pub fn input_datetime(stored: &str) -> String {
    short_datetime(stored).replacen(' ', "T", 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Upcoming,
    Past,
}

impl DateFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            DateFilter::All => "all",
            DateFilter::Upcoming => "upcoming",
            DateFilter::Past => "past",
        }
    }
}

impl FromStr for DateFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" | "" => Ok(DateFilter::All),
            "upcoming" => Ok(DateFilter::Upcoming),
            "past" => Ok(DateFilter::Past),
            _ => Err(()),
        }
    }
}

/// Query string of the public event list.
#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub date_filter: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Normalised filter: empty strings are dropped, unknown values ignored.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub date: DateFilter,
}

impl EventFilter {
    pub fn from_query(query: &EventListQuery) -> Self {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            category: non_empty(&query.category),
            search: non_empty(&query.search),
            date: query
                .date_filter
                .as_deref()
                .and_then(|d| d.parse().ok())
                .unwrap_or_default(),
        }
    }
}

/// Clamp page and page size: page >= 1, size in 1..=MAX_PER_PAGE.
pub fn clamp_paging(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Row in event listings, with organizer name and registration count.
#[derive(Debug, Clone, FromRow)]
pub struct EventListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub category: String,
    pub max_participants: i64,
    pub organizer_id: i64,
    pub organizer_name: String,
    pub registrations_count: i64,
}

impl EventListItem {
    pub fn is_full(&self) -> bool {
        self.max_participants > 0 && self.registrations_count >= self.max_participants
    }

    pub fn date_short(&self) -> &str {
        short_datetime(&self.date)
    }

    /// Description cut to `max` characters for list cards.
    pub fn excerpt(&self, max: usize) -> String {
        let mut out: String = self.description.chars().take(max).collect();
        if self.description.chars().count() > max {
            out.push_str("...");
        }
        out
    }
}

pub struct EventPage {
    pub events: Vec<EventListItem>,
    pub page: i64,
    pub per_page: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

impl EventPage {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Plain event row, used for ownership checks, edit forms and profile listings.
#[derive(Debug, Clone, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub category: String,
    pub max_participants: i64,
    pub organizer_id: i64,
    pub created_at: String,
}

impl Event {
    pub fn date_short(&self) -> &str {
        short_datetime(&self.date)
    }
}

/// Event with organizer contact details for the detail page.
#[derive(Debug, Clone, FromRow)]
pub struct EventDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub category: String,
    pub max_participants: i64,
    pub organizer_id: i64,
    pub created_at: String,
    pub organizer_name: String,
    pub organizer_email: String,
}

impl EventDetail {
    pub fn date_short(&self) -> &str {
        short_datetime(&self.date)
    }
}

/// Compact row for dashboard and home listings.
#[derive(Debug, Clone, FromRow)]
pub struct EventSummary {
    pub id: i64,
    pub title: String,
    pub date: String,
    pub location: String,
    pub organizer_name: String,
}

impl EventSummary {
    pub fn date_short(&self) -> &str {
        short_datetime(&self.date)
    }
}

/// Validated fields for insert or update. `date` is in `DATETIME_FORMAT`.
#[derive(Debug, Clone)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub category: String,
    pub max_participants: i64,
}

/// Raw create/edit form submission.
#[derive(Debug, Default, Deserialize)]
pub struct EventForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub max_participants: String,
    #[serde(default)]
    pub csrf_token: String,
}
