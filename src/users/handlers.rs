use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use super::{
    dto::{
        is_valid_email, LoginRequest, LoginResponse, PaginationParams, RegisterRequest,
        UserEnvelope, UserList,
    },
    services::{self, NewAccount},
};
use crate::{auth::AuthUser, error::AppError, state::AppState};

const MIN_PASSWORD_LEN: usize = 8;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn parse_user_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|e| AppError::BadRequest(format!("invalid user ID format: {e}")))
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    Ok(email)
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::BadRequest("Password too short".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserEnvelope>, AppError> {
    let username = normalize_email(&payload.email)?;
    check_password(&payload.password)?;
    let avatar = payload
        .avatar
        .filter(|a| !a.is_empty())
        .map(|a| STANDARD.decode(a.as_bytes()))
        .transpose()
        .map_err(|_| AppError::BadRequest("avatar must be base64 encoded".into()))?;

    let user = services::register(
        &state,
        NewAccount {
            username,
            password: payload.password,
            name: payload.name.unwrap_or_default(),
            avatar,
        },
    )
    .await?;
    Ok(Json(UserEnvelope { user }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let username = normalize_email(&payload.email)?;
    check_password(&payload.password)?;
    let res = services::login(&state, &username, &payload.password).await?;
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<UserList>, AppError> {
    let page = params.validate().map_err(AppError::BadRequest)?;
    let (users, total) = services::list_users(&state, page).await?;
    Ok(Json(UserList {
        users,
        total,
        offset: page.offset,
        limit: page.limit,
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserEnvelope>, AppError> {
    let id = parse_user_id(&id)?;
    let user = services::get_user(&state, &user, id).await?;
    Ok(Json(UserEnvelope { user }))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<UserEnvelope>, AppError> {
    let id = parse_user_id(&id)?;
    let Value::Object(changes) = body else {
        return Err(AppError::BadRequest("request body must be a JSON object".into()));
    };
    let user = services::update_user(&state, &user, id, changes).await?;
    Ok(Json(UserEnvelope { user }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_user_id(&id)?;
    services::delete_user(&state, &user, id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
