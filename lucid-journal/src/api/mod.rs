//! HTTP API for lucid-journal

pub mod account;
pub mod auth;
pub mod cases;
pub mod entries;
pub mod extract;
pub mod health;
pub mod reports;
pub mod silva;
pub mod templates;
pub mod workspaces;

pub use account::account_routes;
pub use auth::CurrentUser;
pub use cases::case_routes;
pub use entries::entry_routes;
pub use health::health_routes;
pub use reports::report_routes;
pub use silva::silva_routes;
pub use templates::template_routes;
pub use workspaces::workspace_routes;
