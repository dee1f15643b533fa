//! Borrow request lifecycle
//!
//! Requests move `pending -> approved | rejected` and `approved -> returned`.
//! Approving takes the requested units out of the equipment's available
//! count and returning puts them back; both happen in the same store
//! operation as the status change.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        request::CreateBorrowRequest, BorrowRequest, RequestDraft, RequestFilter, RequestStatus,
    },
    repository::{RecordStore, Transition},
};

#[derive(Clone)]
pub struct RequestsService {
    store: Arc<dyn RecordStore>,
}

impl RequestsService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Submit a new pending request. Availability is checked but not changed.
    pub async fn create(
        &self,
        user_id: Uuid,
        user_name: &str,
        data: CreateBorrowRequest,
    ) -> AppResult<BorrowRequest> {
        data.validate()?;

        let equipment = self.store.equipment_get(data.equipment_id).await?;
        if data.quantity > equipment.available {
            return Err(AppError::InsufficientStock {
                equipment_id: equipment.id,
                requested: data.quantity,
                available: equipment.available,
            });
        }

        let request = self
            .store
            .request_create(RequestDraft {
                equipment_id: equipment.id,
                user_id,
                user_name: user_name.to_string(),
                quantity: data.quantity,
                notes: data.notes,
            })
            .await?;

        tracing::info!(
            "Request {} submitted by {} for {} x {}",
            request.id,
            user_name,
            request.quantity,
            equipment.name
        );
        Ok(request)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<BorrowRequest> {
        self.store.request_get(id).await
    }

    pub async fn list(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>> {
        self.store.requests_list(filter).await
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowRequest>> {
        self.store.requests_list(&RequestFilter::for_user(user_id)).await
    }

    /// Requests waiting for a staff decision
    pub async fn pending(&self) -> AppResult<Vec<BorrowRequest>> {
        self.store
            .requests_list(&RequestFilter::with_status(RequestStatus::Pending))
            .await
    }

    /// Approved requests whose equipment has not come back yet
    pub async fn active_loans(&self) -> AppResult<Vec<BorrowRequest>> {
        self.store
            .requests_list(&RequestFilter::with_status(RequestStatus::Approved))
            .await
    }

    pub async fn approve(&self, id: Uuid, approver: &str) -> AppResult<BorrowRequest> {
        self.transition(id, RequestStatus::Approved, Some(approver)).await
    }

    pub async fn reject(&self, id: Uuid, approver: &str) -> AppResult<BorrowRequest> {
        self.transition(id, RequestStatus::Rejected, Some(approver)).await
    }

    pub async fn mark_returned(&self, id: Uuid) -> AppResult<BorrowRequest> {
        self.transition(id, RequestStatus::Returned, None).await
    }

    /// Dispatch a status change coming from `PATCH /requests/{id}/status`
    pub async fn update_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        approver: &str,
    ) -> AppResult<BorrowRequest> {
        match status {
            RequestStatus::Approved => self.approve(id, approver).await,
            RequestStatus::Rejected => self.reject(id, approver).await,
            RequestStatus::Returned => self.mark_returned(id).await,
            RequestStatus::Pending => {
                let current = self.store.request_get(id).await?;
                Err(AppError::InvalidTransition {
                    from: current.status,
                    to: RequestStatus::Pending,
                })
            }
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        to: RequestStatus,
        approver: Option<&str>,
    ) -> AppResult<BorrowRequest> {
        let request = self.store.request_get(id).await?;
        if !request.status.can_transition_to(to) {
            tracing::warn!("Refused transition of request {}: {} -> {}", id, request.status, to);
            return Err(AppError::InvalidTransition {
                from: request.status,
                to,
            });
        }

        let now = Utc::now();
        let transition = Transition {
            request_id: id,
            from: request.status,
            to,
            approved_by: approver.map(str::to_string),
            approved_date: (to == RequestStatus::Approved).then_some(now),
            return_date: (to == RequestStatus::Returned).then_some(now),
            stock_delta: match to {
                RequestStatus::Approved => -request.quantity,
                RequestStatus::Returned => request.quantity,
                RequestStatus::Pending | RequestStatus::Rejected => 0,
            },
        };

        match self.store.apply_transition(&transition).await {
            Ok(updated) => {
                tracing::info!(
                    "Request {} {} -> {} (stock {:+})",
                    id,
                    request.status,
                    to,
                    transition.stock_delta
                );
                Ok(updated)
            }
            Err(e) => {
                tracing::warn!("Request {} could not move to {}: {}", id, to, e);
                Err(e)
            }
        }
    }
}
