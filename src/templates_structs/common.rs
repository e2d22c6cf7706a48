use askama::Template;

use super::{Captcha, PageContext};
use crate::models::event::EventListItem;

#[derive(Template)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub upcoming: Vec<EventListItem>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub username: String,
    pub timed_out: bool,
    pub captcha: Captcha,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub username: String,
    pub email: String,
    pub captcha: Captcha,
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub captcha: Captcha,
}
