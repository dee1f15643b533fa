//! Data models for the borrowing server

pub mod equipment;
pub mod request;
pub mod user;

// Re-export commonly used types
pub use equipment::{Condition, Equipment};
pub use request::{BorrowRequest, RequestDraft, RequestFilter, RequestStatus};
pub use user::{Panel, Role, User, UserClaims, UserInfo};
