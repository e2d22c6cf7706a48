use askama::Template;

use super::{PageContext, SelectOption};
use crate::models::contact::ContactMessagePage;
use crate::models::event::EventListItem;
use crate::models::stats::{DashboardStats, SiteStats};
use crate::models::user::UserWithCounts;

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub ctx: PageContext,
    pub stats: DashboardStats,
}

/// A user row with its role picker; `is_self` hides the actions on the admin's own row.
pub struct AdminUserRow {
    pub user: UserWithCounts,
    pub role_options: Vec<SelectOption>,
    pub is_self: bool,
}

#[derive(Template)]
#[template(path = "admin/users.html")]
pub struct AdminUsersTemplate {
    pub ctx: PageContext,
    pub rows: Vec<AdminUserRow>,
}

#[derive(Template)]
#[template(path = "admin/events.html")]
pub struct AdminEventsTemplate {
    pub ctx: PageContext,
    pub events: Vec<EventListItem>,
    pub statuses: Vec<SelectOption>,
    pub search: String,
    pub now: String,
}

#[derive(Template)]
#[template(path = "admin/stats.html")]
pub struct AdminStatsTemplate {
    pub ctx: PageContext,
    pub stats: SiteStats,
}

#[derive(Template)]
#[template(path = "admin/messages.html")]
pub struct AdminMessagesTemplate {
    pub ctx: PageContext,
    pub message_page: ContactMessagePage,
}
