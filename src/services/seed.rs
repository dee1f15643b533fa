//! Demo catalog and accounts for a fresh store

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{user::CreateUser, Condition, Equipment, Role},
};

use super::Services;

struct DemoItem {
    name: &'static str,
    category: &'static str,
    condition: Condition,
    quantity: i32,
    available: i32,
    description: &'static str,
}

const DEMO_EQUIPMENT: &[DemoItem] = &[
    DemoItem {
        name: "Laptop Dell XPS 15",
        category: "Computers",
        condition: Condition::Excellent,
        quantity: 10,
        available: 7,
        description: "High-performance laptop for programming and design work",
    },
    DemoItem {
        name: "iPad Pro 12.9\"",
        category: "Tablets",
        condition: Condition::Good,
        quantity: 15,
        available: 12,
        description: "Perfect for digital art and presentations",
    },
    DemoItem {
        name: "Scientific Calculator",
        category: "Calculators",
        condition: Condition::Excellent,
        quantity: 50,
        available: 45,
        description: "Texas Instruments TI-84 Plus",
    },
    DemoItem {
        name: "DSLR Camera Canon",
        category: "Photography",
        condition: Condition::Good,
        quantity: 5,
        available: 3,
        description: "Professional camera for photography projects",
    },
    DemoItem {
        name: "Projector Epson",
        category: "Presentation",
        condition: Condition::Excellent,
        quantity: 8,
        available: 6,
        description: "HD projector for presentations",
    },
    DemoItem {
        name: "Arduino Starter Kit",
        category: "Electronics",
        condition: Condition::Good,
        quantity: 20,
        available: 18,
        description: "Complete kit for electronics projects",
    },
    DemoItem {
        name: "Microscope Olympus",
        category: "Lab Equipment",
        condition: Condition::Excellent,
        quantity: 12,
        available: 10,
        description: "Advanced microscope for biology lab",
    },
    DemoItem {
        name: "VR Headset Meta Quest",
        category: "Virtual Reality",
        condition: Condition::Good,
        quantity: 6,
        available: 4,
        description: "Virtual reality headset for immersive learning",
    },
];

/// (email, password, name, role)
const DEMO_ACCOUNTS: &[(&str, &str, &str, Role)] = &[
    ("student@school.edu", "student123", "John Student", Role::Student),
    ("staff@school.edu", "staff123", "Jane Staff", Role::Staff),
    ("admin@school.edu", "admin123", "Admin User", Role::Admin),
];

/// Insert the demo catalog and accounts. Each part is only seeded when the
/// store holds none of that kind of record, so restarts are no-ops.
pub async fn seed_demo(services: &Services) -> AppResult<()> {
    if services.store.equipment_list().await?.is_empty() {
        let now = Utc::now();
        for item in DEMO_EQUIPMENT {
            services
                .store
                .equipment_create(Equipment {
                    id: Uuid::new_v4(),
                    name: item.name.to_string(),
                    category: item.category.to_string(),
                    condition: item.condition,
                    quantity: item.quantity,
                    available: item.available,
                    description: Some(item.description.to_string()),
                    image_url: None,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
        }
        tracing::info!("Seeded {} demo equipment items", DEMO_EQUIPMENT.len());
    }

    if services.store.users_list().await?.is_empty() {
        for (email, password, name, role) in DEMO_ACCOUNTS {
            services
                .users
                .create_user(CreateUser {
                    email: email.to_string(),
                    password: password.to_string(),
                    name: name.to_string(),
                    role: *role,
                })
                .await?;
        }
        tracing::info!("Seeded {} demo accounts", DEMO_ACCOUNTS.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AuthConfig, repository::MemoryStore, services::catalog};

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let services = Services::new(Arc::new(MemoryStore::new()), AuthConfig::default());
        seed_demo(&services).await.unwrap();
        seed_demo(&services).await.unwrap();

        let items = services.store.equipment_list().await.unwrap();
        assert_eq!(items.len(), DEMO_EQUIPMENT.len());
        assert!(items.iter().all(|e| e.check_stock().is_ok()));
        assert_eq!(services.store.users_list().await.unwrap().len(), 3);
        assert_eq!(catalog::categories(&items).len(), 9);
    }
}
