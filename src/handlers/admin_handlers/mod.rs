pub mod dashboard;
pub mod events;
pub mod messages;
pub mod users;
