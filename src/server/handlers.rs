//! HTTP request handlers.

use crate::catalog::{BookInput, BookPage, BookWithCategory};
use crate::db::{self, Book, Category, Review};
use crate::error::{AppError, Result};
use crate::server::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::Html,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// WEB PAGES
// ============================================================================

/// Index page (simple HTML).
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
</head>
<body>
    <h1>{title}</h1>
    <p>API is running. Browse the catalog at <code>/api/books</code>.</p>
</body>
</html>"#,
        title = state.config.server.title,
    );

    Html(html)
}

// ============================================================================
// BOOK HANDLERS
// ============================================================================

/// Catalog listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Case-insensitive name substring filter.
    keyword: Option<String>,
    /// 1-based page number.
    #[serde(rename = "pageNumber")]
    page_number: Option<i64>,
}

/// List books with pagination and optional keyword filter.
pub async fn books_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<BookPage>> {
    let page = state
        .catalog
        .list(params.keyword.as_deref(), params.page_number)?;
    Ok(Json(page))
}

/// Top rated books.
pub async fn books_top_rated(State(state): State<AppState>) -> Result<Json<Vec<Book>>> {
    Ok(Json(state.catalog.top_rated()?))
}

/// Single book with resolved category.
pub async fn books_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookWithCategory>> {
    Ok(Json(state.catalog.get_by_id(&id)?))
}

/// Create a book (authenticated).
pub async fn books_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<BookInput>,
) -> Result<(StatusCode, Json<Book>)> {
    let user = get_authenticated_user(&state, &headers).await?;
    let book = state.catalog.create(input, &user)?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Update a book (authenticated).
pub async fn books_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>> {
    get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.catalog.update(&id, input)?))
}

/// Confirmation message payload.
#[derive(Serialize)]
pub struct MessageResponse {
    message: String,
}

/// Delete a book (authenticated; admin enforced by the catalog service).
pub async fn books_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.catalog.delete(&id, &user)?;
    Ok(Json(MessageResponse {
        message: "Book removed".to_string(),
    }))
}

/// Review submission request.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    rating: i64,
    #[serde(default)]
    comment: String,
}

/// Submit a review (authenticated).
pub async fn books_add_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let user = get_authenticated_user(&state, &headers).await?;
    state
        .catalog
        .add_review(&id, &user, req.rating, req.comment)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Review added".to_string(),
        }),
    ))
}

/// Reviews for a book.
pub async fn books_get_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.catalog.reviews(&id)?))
}

// ============================================================================
// CATEGORY HANDLERS
// ============================================================================

/// Category creation request.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    name: String,
    #[serde(default)]
    description: String,
}

/// List all categories.
pub async fn categories_list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.db.list_categories()?))
}

/// Create a category (admin).
pub async fn categories_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let user = get_authenticated_user(&state, &headers).await?;
    if !state.auth.is_admin(&user) {
        return Err(AppError::Unauthorized(
            "Not authorized to manage categories".to_string(),
        ));
    }

    if req.name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let category = Category {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name,
        description: req.description,
        created_at: db::now_timestamp(),
    };
    state.db.create_category(&category)?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// Single category.
pub async fn categories_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Category>> {
    state
        .db
        .get_category(&id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}

/// Books in a category (unpaginated).
pub async fn categories_books(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Book>>> {
    Ok(Json(state.catalog.list_by_category(&id)?))
}

// ============================================================================
// AUTH API
// ============================================================================

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
    user_id: String,
    username: String,
    role: String,
}

/// Register request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    username: String,
    password: String,
    display_name: Option<String>,
}

/// Auth login.
pub async fn auth_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (user, token) = state.auth.login(&req.username, &req.password)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

/// Auth register.
pub async fn auth_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>> {
    let _user = state
        .auth
        .register(&req.username, &req.password, req.display_name)?;
    let (user, token) = state.auth.login(&req.username, &req.password)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

/// Auth logout.
pub async fn auth_logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    if let Some(token) = extract_token(&headers) {
        state.auth.logout(&token)?;
    }
    Ok(StatusCode::OK)
}

/// Get current user info.
pub async fn auth_me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<db::User>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(user))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Extract token from Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Get authenticated user from token.
async fn get_authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<db::User> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    state
        .auth
        .validate_token(&token)?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
}
