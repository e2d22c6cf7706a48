pub mod contact;
pub mod event;
pub mod registration;
pub mod stats;
pub mod user;
