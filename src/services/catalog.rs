//! Equipment catalog service

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        equipment::{CreateEquipment, EquipmentQuery, UpdateEquipment, ALL_CATEGORIES},
        Condition, Equipment,
    },
    repository::RecordStore,
};

/// Items whose name or description contains `search` (case-insensitive)
/// and whose category equals `category`, or any category for "All"/None.
pub fn filter_catalog(items: &[Equipment], search: &str, category: Option<&str>) -> Vec<Equipment> {
    items
        .iter()
        .filter(|item| item.matches(search, category))
        .cloned()
        .collect()
}

/// Category selector values: "All" followed by the distinct categories, sorted
pub fn categories(items: &[Equipment]) -> Vec<String> {
    let distinct: BTreeSet<&str> = items.iter().map(|e| e.category.as_str()).collect();
    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn RecordStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Catalog view filtered by search text and category
    pub async fn search(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let items = self.store.equipment_list().await?;
        Ok(filter_catalog(
            &items,
            query.search.as_deref().unwrap_or(""),
            query.category.as_deref(),
        ))
    }

    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let items = self.store.equipment_list().await?;
        Ok(categories(&items))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Equipment> {
        self.store.equipment_get(id).await
    }

    pub async fn create(&self, data: CreateEquipment) -> AppResult<Equipment> {
        data.validate()?;

        let now = Utc::now();
        let equipment = Equipment {
            id: Uuid::new_v4(),
            name: data.name.trim().to_string(),
            category: data.category.trim().to_string(),
            condition: data.condition.unwrap_or(Condition::Good),
            quantity: data.quantity,
            available: data.available.unwrap_or(data.quantity),
            description: data.description,
            image_url: data.image_url,
            created_at: now,
            updated_at: now,
        };
        equipment.check_stock()?;

        let created = self.store.equipment_create(equipment).await?;
        tracing::info!("Equipment {} added: {}", created.id, created.name);
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, data: &UpdateEquipment) -> AppResult<Equipment> {
        data.validate()?;
        self.store.equipment_update(id, data).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.store.equipment_delete(id).await?;
        tracing::info!("Equipment {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, repository::MemoryStore};

    fn item(name: &str, category: &str, description: Option<&str>) -> Equipment {
        let now = Utc::now();
        Equipment {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.to_string(),
            condition: Condition::Good,
            quantity: 5,
            available: 5,
            description: description.map(str::to_string),
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog() -> Vec<Equipment> {
        vec![
            item("Laptop Dell XPS 15", "Computers", Some("High-performance laptop")),
            item("Workstation", "Computers", Some("Desktop replacement for LAPTOP users")),
            item("Chromebook", "Computers", Some("Lightweight machine")),
            item("Laptop stand", "Accessories", None),
            item("iPad Pro 12.9\"", "Tablets", Some("Digital art and presentations")),
        ]
    }

    #[test]
    fn test_filter_by_category_and_text() {
        let items = catalog();
        let found = filter_catalog(&items, "laptop", Some("Computers"));
        let names: Vec<_> = found.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Laptop Dell XPS 15", "Workstation"]);
    }

    #[test]
    fn test_filter_all_categories() {
        let items = catalog();
        assert_eq!(filter_catalog(&items, "laptop", Some(ALL_CATEGORIES)).len(), 3);
        assert_eq!(filter_catalog(&items, "", None).len(), items.len());
        assert!(filter_catalog(&items, "microscope", None).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let items = catalog();
        let once = filter_catalog(&items, "LAPTOP", Some("Computers"));
        let twice = filter_catalog(&once, "LAPTOP", Some("Computers"));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_categories_are_distinct_and_sorted() {
        assert_eq!(
            categories(&catalog()),
            vec!["All", "Accessories", "Computers", "Tablets"]
        );
        assert_eq!(categories(&[]), vec!["All"]);
    }

    #[tokio::test]
    async fn test_create_defaults_available_to_quantity() {
        let service = CatalogService::new(Arc::new(MemoryStore::new()));
        let created = service
            .create(CreateEquipment {
                name: "Arduino Starter Kit".to_string(),
                category: "Electronics".to_string(),
                condition: None,
                quantity: 20,
                available: None,
                description: None,
                image_url: None,
            })
            .await
            .unwrap();
        assert_eq!(created.available, 20);
        assert_eq!(created.condition, Condition::Good);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_stock() {
        let service = CatalogService::new(Arc::new(MemoryStore::new()));
        let err = service
            .create(CreateEquipment {
                name: "Microscope Olympus".to_string(),
                category: "Lab Equipment".to_string(),
                condition: Some(Condition::Excellent),
                quantity: 12,
                available: Some(13),
                description: None,
                image_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .create(CreateEquipment {
                name: String::new(),
                category: "Lab Equipment".to_string(),
                condition: None,
                quantity: 1,
                available: None,
                description: None,
                image_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
