//! Business logic services

pub mod catalog;
pub mod requests;
pub mod seed;
pub mod users;

use std::sync::Arc;

use crate::{config::AuthConfig, error::AppResult, repository::RecordStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub requests: requests::RequestsService,
    pub users: users::UsersService,
    pub store: Arc<dyn RecordStore>,
}

impl Services {
    /// Create all services over the given record store
    pub fn new(store: Arc<dyn RecordStore>, auth_config: AuthConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store.clone()),
            requests: requests::RequestsService::new(store.clone()),
            users: users::UsersService::new(store.clone(), auth_config),
            store,
        }
    }

    /// Fill an empty store with the demo catalog and accounts
    pub async fn seed_demo(&self) -> AppResult<()> {
        seed::seed_demo(self).await
    }
}
