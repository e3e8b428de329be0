//! Page objects, one per portal screen

mod assignment;
mod base;
mod dashboard;
mod login;
mod tenant;

pub use assignment::UserAssignmentPage;
pub use base::{screenshot_file_name, BasePage};
pub use dashboard::{DashboardPage, Theme};
pub use login::LoginPage;
pub use tenant::{TenantForm, TenantPage};
