pub mod crud;
pub mod list;
pub mod registration;

pub use crud::{create, delete, delete_confirm, edit_form, new_form, update};
pub use list::{detail, list};
pub use registration::{register, unregister};
