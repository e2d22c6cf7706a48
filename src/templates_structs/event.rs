use askama::Template;

use super::{PageContext, SelectOption};
use crate::models::event::{Event, EventDetail, EventPage};
use crate::models::registration::Participant;

#[derive(Template)]
#[template(path = "events/list.html")]
pub struct EventListTemplate {
    pub ctx: PageContext,
    pub event_page: EventPage,
    pub search: String,
    pub categories: Vec<SelectOption>,
    pub date_filters: Vec<SelectOption>,
    /// Current filters as a query string, for pagination links.
    pub filter_query: String,
}

#[derive(Template)]
#[template(path = "events/detail.html")]
pub struct EventDetailTemplate {
    pub ctx: PageContext,
    pub event: EventDetail,
    pub participants: Vec<Participant>,
    pub participant_count: i64,
    pub is_past: bool,
    pub is_full: bool,
    pub is_registered: bool,
    pub can_manage: bool,
}

#[derive(Template)]
#[template(path = "events/form.html")]
pub struct EventFormTemplate {
    pub ctx: PageContext,
    pub form_action: String,
    pub form_title: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub max_participants: String,
    pub categories: Vec<SelectOption>,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "events/delete.html")]
pub struct EventDeleteTemplate {
    pub ctx: PageContext,
    pub event: Event,
    pub registrations_count: i64,
}
