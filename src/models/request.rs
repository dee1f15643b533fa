//! Borrow request model and status machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Borrow request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Returned => "returned",
        }
    }

    /// `pending -> approved | rejected`, `approved -> returned`
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::Approved, RequestStatus::Returned)
        )
    }

    /// Requests that still hold, or may come to hold, units of stock
    pub fn is_open(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Approved)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "returned" => Ok(RequestStatus::Returned),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// Record of a borrowing intent and its approval lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_date: Option<DateTime<Utc>>,
    /// Staff member who approved or rejected the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Validated input for a new request, ready to be stored
#[derive(Debug, Clone)]
pub struct RequestDraft {
    pub equipment_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub quantity: i32,
    pub notes: Option<String>,
}

impl RequestDraft {
    /// Materialize the draft as a pending request
    pub fn into_request(self, now: DateTime<Utc>) -> BorrowRequest {
        BorrowRequest {
            id: Uuid::new_v4(),
            equipment_id: self.equipment_id,
            user_id: self.user_id,
            user_name: self.user_name,
            status: RequestStatus::Pending,
            request_date: now,
            approved_date: None,
            return_date: None,
            approved_by: None,
            quantity: self.quantity,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        }
    }
}

/// Body of `POST /requests`
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBorrowRequest {
    pub equipment_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(max = 1000, message = "Notes are limited to 1000 characters"))]
    pub notes: Option<String>,
}

/// Body of `PATCH /requests/{id}/status`
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequestStatus {
    /// Target status: approved, rejected or returned
    pub status: String,
    /// Name recorded as approver; defaults to the caller's display name
    pub approved_by: Option<String>,
}

/// Request list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub user_id: Option<Uuid>,
    pub equipment_id: Option<Uuid>,
}

impl RequestFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn with_status(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, request: &BorrowRequest) -> bool {
        self.status.map_or(true, |s| s == request.status)
            && self.user_id.map_or(true, |u| u == request.user_id)
            && self.equipment_id.map_or(true, |e| e == request.equipment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::Returned,
    ];

    #[test]
    fn test_only_three_transitions_are_valid() {
        let valid: Vec<_> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();
        assert_eq!(
            valid,
            vec![
                (RequestStatus::Pending, RequestStatus::Approved),
                (RequestStatus::Pending, RequestStatus::Rejected),
                (RequestStatus::Approved, RequestStatus::Returned),
            ]
        );
    }

    #[test]
    fn test_open_states() {
        assert!(RequestStatus::Pending.is_open());
        assert!(RequestStatus::Approved.is_open());
        assert!(!RequestStatus::Rejected.is_open());
        assert!(!RequestStatus::Returned.is_open());
    }

    #[test]
    fn test_status_parsing_ignores_case() {
        assert_eq!("APPROVED".parse::<RequestStatus>().unwrap(), RequestStatus::Approved);
        assert!("cancelled".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_draft_drops_blank_notes() {
        let draft = RequestDraft {
            equipment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "John Student".to_string(),
            quantity: 1,
            notes: Some("   ".to_string()),
        };
        let request = draft.into_request(Utc::now());
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.notes.is_none());
        assert!(request.approved_by.is_none());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let draft = RequestDraft {
            equipment_id: Uuid::nil(),
            user_id: Uuid::nil(),
            user_name: "John Student".to_string(),
            quantity: 2,
            notes: None,
        };
        let json = serde_json::to_value(draft.into_request(Utc::now())).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["userName"], "John Student");
        assert!(json.get("equipmentId").is_some());
        assert!(json.get("approvedBy").is_none());
    }
}
