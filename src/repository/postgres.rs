//! PostgreSQL record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres};
use uuid::Uuid;

use super::{
    adjust_stock, equipment_not_found, request_not_found, user_not_found, RecordStore, Transition,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::UpdateEquipment, BorrowRequest, Condition, Equipment, RequestDraft,
        RequestFilter, RequestStatus, Role, User,
    },
};

/// Internal row structure for the equipment table
#[derive(Debug, Clone, FromRow)]
struct EquipmentRow {
    id: Uuid,
    name: String,
    category: String,
    condition: String,
    quantity: i32,
    available: i32,
    description: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EquipmentRow> for Equipment {
    type Error = AppError;

    fn try_from(row: EquipmentRow) -> Result<Self, Self::Error> {
        let condition: Condition = row.condition.parse().map_err(AppError::Internal)?;
        Ok(Equipment {
            id: row.id,
            name: row.name,
            category: row.category,
            condition,
            quantity: row.quantity,
            available: row.available,
            description: row.description,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row structure for the borrow_requests table
#[derive(Debug, Clone, FromRow)]
struct RequestRow {
    id: Uuid,
    equipment_id: Uuid,
    user_id: Uuid,
    user_name: String,
    status: String,
    request_date: DateTime<Utc>,
    approved_date: Option<DateTime<Utc>>,
    return_date: Option<DateTime<Utc>>,
    approved_by: Option<String>,
    quantity: i32,
    notes: Option<String>,
}

impl TryFrom<RequestRow> for BorrowRequest {
    type Error = AppError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let status: RequestStatus = row.status.parse().map_err(AppError::Internal)?;
        Ok(BorrowRequest {
            id: row.id,
            equipment_id: row.equipment_id,
            user_id: row.user_id,
            user_name: row.user_name,
            status,
            request_date: row.request_date,
            approved_date: row.approved_date,
            return_date: row.return_date,
            approved_by: row.approved_by,
            quantity: row.quantity,
            notes: row.notes,
        })
    }
}

/// Internal row structure for the users table
#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(AppError::Internal)?;
        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role,
            created_at: row.created_at,
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Run the embedded migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn equipment_list(&self) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, EquipmentRow>(
            "SELECT * FROM equipment ORDER BY LOWER(name), name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Equipment::try_from).collect()
    }

    async fn equipment_get(&self, id: Uuid) -> AppResult<Equipment> {
        sqlx::query_as::<_, EquipmentRow>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| equipment_not_found(id))?
            .try_into()
    }

    async fn equipment_create(&self, equipment: Equipment) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            INSERT INTO equipment (id, name, category, condition, quantity, available,
                                   description, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(equipment.id)
        .bind(&equipment.name)
        .bind(&equipment.category)
        .bind(equipment.condition.as_str())
        .bind(equipment.quantity)
        .bind(equipment.available)
        .bind(&equipment.description)
        .bind(&equipment.image_url)
        .bind(equipment.created_at)
        .bind(equipment.updated_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn equipment_update(&self, id: Uuid, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        let mut equipment: Equipment = sqlx::query_as::<_, EquipmentRow>(
            "SELECT * FROM equipment WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| equipment_not_found(id))?
        .try_into()?;

        data.apply_to(&mut equipment);
        equipment.check_stock()?;

        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            UPDATE equipment
            SET name = $1, category = $2, condition = $3, quantity = $4, available = $5,
                description = $6, image_url = $7, updated_at = $8
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(&equipment.name)
        .bind(&equipment.category)
        .bind(equipment.condition.as_str())
        .bind(equipment.quantity)
        .bind(equipment.available)
        .bind(&equipment.description)
        .bind(&equipment.image_url)
        .bind(equipment.updated_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let equipment = Equipment::try_from(row)?;
        tx.commit().await?;
        Ok(equipment)
    }

    async fn equipment_delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| equipment_not_found(id))?;

        let open: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrow_requests
            WHERE equipment_id = $1 AND status IN ('pending', 'approved')
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if open > 0 {
            return Err(AppError::Conflict(format!(
                "Equipment {} has {} open request(s)",
                id, open
            )));
        }

        // Closed requests go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn requests_list(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT * FROM borrow_requests
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::uuid IS NULL OR equipment_id = $3)
            ORDER BY request_date
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.user_id)
        .bind(filter.equipment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BorrowRequest::try_from).collect()
    }

    async fn request_get(&self, id: Uuid) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, RequestRow>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| request_not_found(id))?
            .try_into()
    }

    async fn request_create(&self, draft: RequestDraft) -> AppResult<BorrowRequest> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1)")
            .bind(draft.equipment_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(equipment_not_found(draft.equipment_id));
        }

        let request = draft.into_request(Utc::now());
        sqlx::query_as::<_, RequestRow>(
            r#"
            INSERT INTO borrow_requests (id, equipment_id, user_id, user_name, status,
                                         request_date, quantity, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.equipment_id)
        .bind(request.user_id)
        .bind(&request.user_name)
        .bind(request.status.as_str())
        .bind(request.request_date)
        .bind(request.quantity)
        .bind(&request.notes)
        .fetch_one(&self.pool)
        .await?
        .try_into()
    }

    async fn apply_transition(&self, transition: &Transition) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request: BorrowRequest = sqlx::query_as::<_, RequestRow>(
            "SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(transition.request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| request_not_found(transition.request_id))?
        .try_into()?;

        if request.status != transition.from {
            return Err(AppError::InvalidTransition {
                from: request.status,
                to: transition.to,
            });
        }

        if transition.stock_delta != 0 {
            let equipment: Equipment = sqlx::query_as::<_, EquipmentRow>(
                "SELECT * FROM equipment WHERE id = $1 FOR UPDATE",
            )
            .bind(request.equipment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| equipment_not_found(request.equipment_id))?
            .try_into()?;

            let available = adjust_stock(&equipment, transition.stock_delta)?;

            sqlx::query("UPDATE equipment SET available = $1, updated_at = $2 WHERE id = $3")
                .bind(available)
                .bind(Utc::now())
                .bind(equipment.id)
                .execute(&mut *tx)
                .await?;
        }

        let updated: BorrowRequest = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE borrow_requests
            SET status = $1,
                approved_by = COALESCE($2, approved_by),
                approved_date = COALESCE($3, approved_date),
                return_date = COALESCE($4, return_date)
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(transition.to.as_str())
        .bind(&transition.approved_by)
        .bind(transition.approved_date)
        .bind(transition.return_date)
        .bind(transition.request_id)
        .fetch_one(&mut *tx)
        .await?
        .try_into()?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn users_list(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn user_get(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| user_not_found(id))?
            .try_into()
    }

    async fn user_find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn user_create(&self, user: User) -> AppResult<User> {
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(format!(
                "Email {} is already registered",
                user.email
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn connect() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
        let store = PgStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn equipment_row(condition: &str) -> EquipmentRow {
        let now = Utc::now();
        EquipmentRow {
            id: Uuid::new_v4(),
            name: "Digital Multimeter".to_string(),
            category: "Lab Equipment".to_string(),
            condition: condition.to_string(),
            quantity: 4,
            available: 4,
            description: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_equipment_row_with_unknown_condition_is_rejected() {
        let err = Equipment::try_from(equipment_row("broken")).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        let equipment = Equipment::try_from(equipment_row("Fair")).unwrap();
        assert_eq!(equipment.condition, Condition::Fair);
    }

    #[tokio::test]
    #[ignore] // Run with: DATABASE_URL=... cargo test -- --ignored
    async fn test_approve_and_return_round_trip() {
        let store = connect().await;
        let now = Utc::now();
        let item = store
            .equipment_create(Equipment {
                id: Uuid::new_v4(),
                name: "Projector Epson".to_string(),
                category: "Presentation".to_string(),
                condition: Condition::Excellent,
                quantity: 8,
                available: 6,
                description: None,
                image_url: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let user = store
            .user_create(User {
                id: Uuid::new_v4(),
                email: format!("{}@school.edu", Uuid::new_v4()),
                password_hash: "hash".to_string(),
                name: "John Student".to_string(),
                role: Role::Student,
                created_at: now,
            })
            .await
            .unwrap();
        let request = store
            .request_create(RequestDraft {
                equipment_id: item.id,
                user_id: user.id,
                user_name: user.name.clone(),
                quantity: 2,
                notes: None,
            })
            .await
            .unwrap();

        let approve = Transition {
            request_id: request.id,
            from: RequestStatus::Pending,
            to: RequestStatus::Approved,
            approved_by: Some("Jane Staff".to_string()),
            approved_date: Some(Utc::now()),
            return_date: None,
            stock_delta: -2,
        };
        store.apply_transition(&approve).await.unwrap();
        assert_eq!(store.equipment_get(item.id).await.unwrap().available, 4);
        assert!(matches!(
            store.apply_transition(&approve).await,
            Err(AppError::InvalidTransition { .. })
        ));

        let returned = Transition {
            request_id: request.id,
            from: RequestStatus::Approved,
            to: RequestStatus::Returned,
            approved_by: None,
            approved_date: None,
            return_date: Some(Utc::now()),
            stock_delta: 2,
        };
        let done = store.apply_transition(&returned).await.unwrap();
        assert_eq!(done.status, RequestStatus::Returned);
        assert_eq!(done.approved_by.as_deref(), Some("Jane Staff"));
        assert_eq!(store.equipment_get(item.id).await.unwrap().available, 6);

        store.equipment_delete(item.id).await.unwrap();
    }
}
