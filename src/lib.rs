//! Uni Borrow
//!
//! REST JSON server for a university equipment-borrowing office: students
//! browse the catalog and request equipment, staff approve, reject and
//! record returns, and admins maintain the catalog. Inventory counts move
//! with request approvals and returns.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
