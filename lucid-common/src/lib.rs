//! # Lucid Common Library
//!
//! Shared code for the Suite de lucidité services:
//! - Database initialization and row models
//! - Bearer-token authentication against the auth provider
//! - Subscription plans and monthly AI usage accounting
//! - Activity log
//! - Configuration loading

pub mod activity;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod time;
pub mod usage;

pub use error::{Error, Result};
