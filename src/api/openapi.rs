//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, equipment, health, requests, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Uni Borrow API",
        version = "1.0.0",
        description = "University equipment borrowing REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::signup,
        auth::login,
        auth::me,
        // Equipment
        equipment::list_equipment,
        equipment::list_categories,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Requests
        requests::list_requests,
        requests::my_requests,
        requests::pending_requests,
        requests::active_requests,
        requests::create_request,
        requests::get_request,
        requests::update_request_status,
        // Users
        users::create_user,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            crate::models::user::SignupRequest,
            crate::models::user::CreateUser,
            crate::models::UserInfo,
            crate::models::Role,
            crate::models::Panel,
            // Equipment
            crate::models::Equipment,
            crate::models::Condition,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            // Requests
            crate::models::BorrowRequest,
            crate::models::RequestStatus,
            crate::models::request::CreateBorrowRequest,
            crate::models::request::UpdateRequestStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Signup, login and current user"),
        (name = "equipment", description = "Equipment catalog"),
        (name = "requests", description = "Borrow request lifecycle"),
        (name = "users", description = "Account management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
