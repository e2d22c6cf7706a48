use askama::Template;

use super::PageContext;
use crate::models::event::Event;
use crate::models::registration::UserRegistration;
use crate::models::user::UserDisplay;

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub ctx: PageContext,
    pub profile: UserDisplay,
    pub registrations: Vec<UserRegistration>,
    pub organized: Vec<Event>,
    pub now: String,
}

#[derive(Template)]
#[template(path = "my_registrations.html")]
pub struct MyRegistrationsTemplate {
    pub ctx: PageContext,
    pub registrations: Vec<UserRegistration>,
    pub now: String,
}
