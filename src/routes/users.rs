/// User Routes
///
/// Thin adapters between actix-web and `UserService`: extract the body, query
/// and caller claims, call the service, pick the status code.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::auth::Claims;
use crate::directory::PageRequest;
use crate::error::AppError;
use crate::service::{EditUserRequest, LoginRequest, SignupRequest, UserService};

/// Query string of `GET /users`
///
/// Kept as raw strings so unparseable values fall back to defaults instead of
/// rejecting the request.
#[derive(Deserialize)]
pub struct ListUsersQuery {
    #[serde(rename = "recordPerPage")]
    pub record_per_page: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "startIndex")]
    pub start_index: Option<String>,
}

/// Query string of `PATCH /users/edit`
#[derive(Deserialize)]
pub struct EditUserQuery {
    pub id: Option<String>,
}

/// POST /users/signup
///
/// # Errors
/// - 400: missing or invalid field, duplicate email or staff number
/// - 500: storage failure or timeout
pub async fn signup(
    body: web::Json<SignupRequest>,
    service: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let created = service.signup(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// POST /users/signin
///
/// Returns the full user record with freshly issued tokens.
pub async fn signin(
    body: web::Json<LoginRequest>,
    service: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let user = service.login(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// GET /users/{user_id}
pub async fn get_user(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    service: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let user = service.get_user(&claims, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// PATCH /users/edit?id=
pub async fn edit_user(
    query: web::Query<EditUserQuery>,
    body: web::Json<EditUserRequest>,
    claims: web::ReqData<Claims>,
    service: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    service
        .edit_user(&claims, query.id.as_deref(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!("Successfully Updated User's Details")))
}

/// GET /users?recordPerPage=&page=&startIndex=
pub async fn list_users(
    query: web::Query<ListUsersQuery>,
    claims: web::ReqData<Claims>,
    service: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let request = PageRequest::from_params(
        query.record_per_page.as_deref(),
        query.page.as_deref(),
        query.start_index.as_deref(),
    );
    let page = service.list_users(&claims, request).await?;
    Ok(HttpResponse::Ok().json(page))
}
