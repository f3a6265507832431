//! HTTP API handlers

pub mod assist;
pub mod health;

pub use assist::{assist_routes, list_actions, post_assist};
pub use health::{health_check, health_routes};
