//! In-memory record store, optionally mirrored to a JSON snapshot file

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    adjust_stock, equipment_not_found, request_not_found, user_not_found, RecordStore, Transition,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::UpdateEquipment, BorrowRequest, Equipment, RequestDraft, RequestFilter, User,
    },
};

/// Everything a memory store holds; also the snapshot file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub requests: Vec<BorrowRequest>,
    #[serde(default)]
    pub users: Vec<User>,
}

pub struct MemoryStore {
    data: RwLock<Snapshot>,
    snapshot_path: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store that is never written to disk
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Snapshot::default()),
            snapshot_path: None,
        }
    }

    /// Store backed by `path`, loading it first when it exists
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            "Opened snapshot {} ({} equipment, {} requests, {} users)",
            path.display(),
            snapshot.equipment.len(),
            snapshot.requests.len(),
            snapshot.users.len()
        );
        Ok(Self {
            data: RwLock::new(snapshot),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Write the snapshot file. Called with the write lock held.
    async fn persist(&self, data: &Snapshot) -> AppResult<()> {
        let Some(ref path) = self.snapshot_path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Persist `next` and only then make it the live state, so a failed
    /// write leaves the store as it was.
    async fn commit(&self, data: &mut Snapshot, next: Snapshot) -> AppResult<()> {
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn equipment_list(&self) -> AppResult<Vec<Equipment>> {
        let data = self.data.read().await;
        let mut list = data.equipment.clone();
        // Same order as the Postgres store: LOWER(name), then name
        list.sort_by_cached_key(|e| (e.name.to_lowercase(), e.name.clone()));
        Ok(list)
    }

    async fn equipment_get(&self, id: Uuid) -> AppResult<Equipment> {
        let data = self.data.read().await;
        data.equipment
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| equipment_not_found(id))
    }

    async fn equipment_create(&self, equipment: Equipment) -> AppResult<Equipment> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        next.equipment.push(equipment.clone());
        self.commit(&mut data, next).await?;
        Ok(equipment)
    }

    async fn equipment_update(&self, id: Uuid, update: &UpdateEquipment) -> AppResult<Equipment> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let slot = next
            .equipment
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| equipment_not_found(id))?;

        update.apply_to(slot);
        slot.check_stock()?;
        let merged = slot.clone();

        self.commit(&mut data, next).await?;
        Ok(merged)
    }

    async fn equipment_delete(&self, id: Uuid) -> AppResult<()> {
        let mut data = self.data.write().await;
        if !data.equipment.iter().any(|e| e.id == id) {
            return Err(equipment_not_found(id));
        }
        let open = data
            .requests
            .iter()
            .filter(|r| r.equipment_id == id && r.status.is_open())
            .count();
        if open > 0 {
            return Err(AppError::Conflict(format!(
                "Equipment {} has {} open request(s)",
                id, open
            )));
        }

        let mut next = data.clone();
        next.equipment.retain(|e| e.id != id);
        next.requests.retain(|r| r.equipment_id != id);
        self.commit(&mut data, next).await
    }

    async fn requests_list(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>> {
        let data = self.data.read().await;
        Ok(data
            .requests
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn request_get(&self, id: Uuid) -> AppResult<BorrowRequest> {
        let data = self.data.read().await;
        data.requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| request_not_found(id))
    }

    async fn request_create(&self, draft: RequestDraft) -> AppResult<BorrowRequest> {
        let mut data = self.data.write().await;
        if !data.equipment.iter().any(|e| e.id == draft.equipment_id) {
            return Err(equipment_not_found(draft.equipment_id));
        }
        let request = draft.into_request(Utc::now());
        let mut next = data.clone();
        next.requests.push(request.clone());
        self.commit(&mut data, next).await?;
        Ok(request)
    }

    async fn apply_transition(&self, transition: &Transition) -> AppResult<BorrowRequest> {
        let mut data = self.data.write().await;

        let req_idx = data
            .requests
            .iter()
            .position(|r| r.id == transition.request_id)
            .ok_or_else(|| request_not_found(transition.request_id))?;
        let current = data.requests[req_idx].status;
        if current != transition.from {
            return Err(AppError::InvalidTransition {
                from: current,
                to: transition.to,
            });
        }

        let mut next = data.clone();
        if transition.stock_delta != 0 {
            let equipment_id = next.requests[req_idx].equipment_id;
            let equipment = next
                .equipment
                .iter_mut()
                .find(|e| e.id == equipment_id)
                .ok_or_else(|| equipment_not_found(equipment_id))?;
            equipment.available = adjust_stock(equipment, transition.stock_delta)?;
            equipment.updated_at = Utc::now();
        }

        let request = &mut next.requests[req_idx];
        transition.apply_to(request);
        let updated = request.clone();

        self.commit(&mut data, next).await?;
        Ok(updated)
    }

    async fn users_list(&self) -> AppResult<Vec<User>> {
        let data = self.data.read().await;
        Ok(data.users.clone())
    }

    async fn user_get(&self, id: Uuid) -> AppResult<User> {
        let data = self.data.read().await;
        data.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| user_not_found(id))
    }

    async fn user_find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn user_create(&self, user: User) -> AppResult<User> {
        let mut data = self.data.write().await;
        if data.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                user.email
            )));
        }
        let mut next = data.clone();
        next.users.push(user.clone());
        self.commit(&mut data, next).await?;
        Ok(user)
    }
}
