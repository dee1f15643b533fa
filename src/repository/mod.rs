//! Record store abstraction and its backends

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::UpdateEquipment, BorrowRequest, Equipment, RequestDraft, RequestFilter,
        RequestStatus, User,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A status change together with its inventory side effect.
///
/// Stores apply a transition atomically: the request must still be in
/// `from`, and the equipment's available count must stay within
/// `0..=quantity` after adding `stock_delta`, otherwise nothing changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub request_id: Uuid,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub approved_by: Option<String>,
    pub approved_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    /// Added to the equipment's available count
    pub stock_delta: i32,
}

impl Transition {
    /// Copy the transition's fields onto a request
    pub fn apply_to(&self, request: &mut BorrowRequest) {
        request.status = self.to;
        if self.approved_by.is_some() {
            request.approved_by = self.approved_by.clone();
        }
        if self.approved_date.is_some() {
            request.approved_date = self.approved_date;
        }
        if self.return_date.is_some() {
            request.return_date = self.return_date;
        }
    }
}

/// New available count after adding `delta`, or the typed failure
pub fn adjust_stock(equipment: &Equipment, delta: i32) -> AppResult<i32> {
    let insufficient = || AppError::InsufficientStock {
        equipment_id: equipment.id,
        requested: delta.saturating_neg(),
        available: equipment.available,
    };
    let overflow = || AppError::InventoryOverflow {
        equipment_id: equipment.id,
        returned: delta,
        quantity: equipment.quantity,
    };

    let next = match equipment.available.checked_add(delta) {
        Some(next) => next,
        None if delta > 0 => return Err(overflow()),
        None => return Err(insufficient()),
    };
    if next < 0 {
        return Err(insufficient());
    }
    if next > equipment.quantity {
        return Err(overflow());
    }
    Ok(next)
}

/// Persistence for equipment, borrow requests and users
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Check that the backing storage is reachable
    async fn ping(&self) -> AppResult<()>;

    /// All equipment ordered by name
    async fn equipment_list(&self) -> AppResult<Vec<Equipment>>;
    async fn equipment_get(&self, id: Uuid) -> AppResult<Equipment>;
    async fn equipment_create(&self, equipment: Equipment) -> AppResult<Equipment>;
    /// Merge `data` onto the stored record, re-checking the stock invariant
    async fn equipment_update(&self, id: Uuid, data: &UpdateEquipment) -> AppResult<Equipment>;
    /// Delete equipment and its closed requests; refused while requests are open
    async fn equipment_delete(&self, id: Uuid) -> AppResult<()>;

    /// Requests matching `filter`, oldest first
    async fn requests_list(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>>;
    async fn request_get(&self, id: Uuid) -> AppResult<BorrowRequest>;
    async fn request_create(&self, draft: RequestDraft) -> AppResult<BorrowRequest>;
    async fn apply_transition(&self, transition: &Transition) -> AppResult<BorrowRequest>;

    async fn users_list(&self) -> AppResult<Vec<User>>;
    async fn user_get(&self, id: Uuid) -> AppResult<User>;
    async fn user_find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Insert a user; `Conflict` if the email is taken
    async fn user_create(&self, user: User) -> AppResult<User>;
}

pub(crate) fn equipment_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Equipment {} not found", id))
}

pub(crate) fn request_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Borrow request {} not found", id))
}

pub(crate) fn user_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Condition;

    fn equipment(quantity: i32, available: i32) -> Equipment {
        let now = Utc::now();
        Equipment {
            id: Uuid::new_v4(),
            name: "DSLR Camera Canon".to_string(),
            category: "Photography".to_string(),
            condition: Condition::Good,
            quantity,
            available,
            description: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_adjust_stock_within_bounds() {
        assert_eq!(adjust_stock(&equipment(10, 7), -2).unwrap(), 5);
        assert_eq!(adjust_stock(&equipment(10, 5), 2).unwrap(), 7);
        assert_eq!(adjust_stock(&equipment(5, 3), -3).unwrap(), 0);
    }

    #[test]
    fn test_adjust_stock_refuses_negative() {
        let err = adjust_stock(&equipment(5, 1), -2).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { requested: 2, available: 1, .. }
        ));
    }

    #[test]
    fn test_adjust_stock_refuses_overflow() {
        let err = adjust_stock(&equipment(5, 4), 2).unwrap_err();
        assert!(matches!(
            err,
            AppError::InventoryOverflow { returned: 2, quantity: 5, .. }
        ));
    }

    #[test]
    fn test_adjust_stock_at_integer_limits() {
        let full = equipment(i32::MAX, i32::MAX);
        assert!(matches!(
            adjust_stock(&full, 1),
            Err(AppError::InventoryOverflow { returned: 1, .. })
        ));
        assert_eq!(adjust_stock(&full, -1).unwrap(), i32::MAX - 1);
        assert!(matches!(
            adjust_stock(&equipment(5, 0), i32::MIN),
            Err(AppError::InsufficientStock { requested: i32::MAX, .. })
        ));
    }
}
