//! Equipment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Physical condition of a piece of equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "excellent" => Ok(Condition::Excellent),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            "poor" => Ok(Condition::Poor),
            _ => Err(format!("Invalid condition: {}", s)),
        }
    }
}

/// Loanable inventory item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub condition: Condition,
    /// Total number of units owned
    pub quantity: i32,
    /// Units not currently on loan, always within `0..=quantity`
    pub available: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    /// Check the stock invariant
    pub fn check_stock(&self) -> Result<(), AppError> {
        if self.quantity < 1 {
            return Err(AppError::Validation("Quantity must be at least 1".to_string()));
        }
        if self.available < 0 || self.available > self.quantity {
            return Err(AppError::Validation(format!(
                "Available count {} must be between 0 and {}",
                self.available, self.quantity
            )));
        }
        Ok(())
    }

    /// Whether the search text and category selector both match
    pub fn matches(&self, search: &str, category: Option<&str>) -> bool {
        let category_ok = match category {
            None => true,
            Some(c) if c == ALL_CATEGORIES => true,
            Some(c) => self.category == c,
        };
        if !category_ok {
            return false;
        }

        let needle = search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

/// Category selector value that matches every category
pub const ALL_CATEGORIES: &str = "All";

/// Catalog query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EquipmentQuery {
    /// Free text matched against name and description
    pub search: Option<String>,
    /// Exact category, or "All"
    pub category: Option<String>,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipment {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    pub condition: Option<Condition>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Defaults to `quantity`
    #[validate(range(min = 0, message = "Available cannot be negative"))]
    pub available: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Update equipment request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEquipment {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Category cannot be empty"))]
    pub category: Option<String>,
    pub condition: Option<Condition>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0, message = "Available cannot be negative"))]
    pub available: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl UpdateEquipment {
    /// Merge the provided fields onto an existing record
    pub fn apply_to(&self, equipment: &mut Equipment) {
        if let Some(ref name) = self.name {
            equipment.name = name.clone();
        }
        if let Some(ref category) = self.category {
            equipment.category = category.clone();
        }
        if let Some(condition) = self.condition {
            equipment.condition = condition;
        }
        if let Some(quantity) = self.quantity {
            equipment.quantity = quantity;
        }
        if let Some(available) = self.available {
            equipment.available = available;
        }
        if self.description.is_some() {
            equipment.description = self.description.clone();
        }
        if self.image_url.is_some() {
            equipment.image_url = self.image_url.clone();
        }
        equipment.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laptop() -> Equipment {
        let now = Utc::now();
        Equipment {
            id: Uuid::new_v4(),
            name: "Laptop Dell XPS 15".to_string(),
            category: "Computers".to_string(),
            condition: Condition::Excellent,
            quantity: 10,
            available: 7,
            description: Some("High-performance laptop for programming".to_string()),
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let item = laptop();
        assert!(item.matches("LAPTOP", None));
        assert!(item.matches("programming", Some("Computers")));
        assert!(item.matches("", Some(ALL_CATEGORIES)));
        assert!(!item.matches("laptop", Some("Tablets")));
        assert!(!item.matches("camera", None));
    }

    #[test]
    fn test_check_stock() {
        let mut item = laptop();
        assert!(item.check_stock().is_ok());
        item.available = 11;
        assert!(item.check_stock().is_err());
        item.available = -1;
        assert!(item.check_stock().is_err());
    }

    #[test]
    fn test_update_merges_fields() {
        let mut item = laptop();
        let update = UpdateEquipment {
            condition: Some(Condition::Fair),
            available: Some(2),
            ..Default::default()
        };
        update.apply_to(&mut item);
        assert_eq!(item.condition, Condition::Fair);
        assert_eq!(item.available, 2);
        assert_eq!(item.name, "Laptop Dell XPS 15");
    }

    #[test]
    fn test_condition_round_trips_through_str() {
        assert_eq!("Poor".parse::<Condition>().unwrap(), Condition::Poor);
        assert!("broken".parse::<Condition>().is_err());
    }
}
