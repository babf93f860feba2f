use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn, Instrument};

use super::{
    dto::{AuthToken, LoginResponse, Pagination, UserInfo},
    models::{NewUser, Role, User},
    policy::check_permissions,
    repo::RepoError,
    update::build_update,
};
use crate::{auth::AuthUser, error::AppError, state::AppState};

/// Registration input after payload validation.
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub name: String,
    pub avatar: Option<Vec<u8>>,
}

#[instrument(skip(st, password))]
pub async fn login(st: &AppState, username: &str, password: &str) -> Result<LoginResponse, AppError> {
    let user = match st.users.get_by_username(username).await {
        Ok(u) => u,
        Err(RepoError::NotFound) => {
            warn!("login unknown user");
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => {
            error!(error = %e, "get_by_username failed");
            return Err(AppError::internal(e));
        }
    };

    let ok = st.hasher.verify(password, &user.password_hash).map_err(|e| {
        error!(error = %e, user_id = user.id, "verify password failed");
        AppError::Internal(e)
    })?;
    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    if user.is_deleted() {
        warn!(user_id = user.id, "login for deleted user");
        return Err(AppError::UserDeleted);
    }

    let issued = st.tokens.issue(&user.id.to_string(), &user.username)?;

    let users = Arc::clone(&st.users);
    let user_id = user.id;
    tokio::spawn(
        async move {
            if let Err(e) = users.touch_last_login(user_id).await {
                warn!(error = %e, user_id, "failed to record last login");
            }
        }
        .in_current_span(),
    );

    info!(user_id = user.id, "user logged in");
    Ok(LoginResponse {
        success: true,
        message: "Login successful".into(),
        user: UserInfo::from(&user),
        token: AuthToken {
            token: issued.token,
            expires_at: issued.expires_at,
        },
    })
}

/// Create an account. The existence check only produces a friendlier error;
/// the unique constraint in storage is what actually prevents duplicates.
#[instrument(skip(st, account), fields(username = %account.username))]
pub async fn register(st: &AppState, account: NewAccount) -> Result<User, AppError> {
    match st.users.get_by_username(&account.username).await {
        Ok(_) => {
            warn!("username already registered");
            return Err(AppError::UserAlreadyExists);
        }
        Err(RepoError::NotFound) => {}
        Err(e) => {
            error!(error = %e, "existence check failed");
            return Err(AppError::internal(e));
        }
    }

    let password_hash = st.hasher.hash(&account.password).map_err(|e| {
        error!(error = %e, "hash password failed");
        AppError::Internal(e)
    })?;

    let user = st
        .users
        .create(NewUser {
            name: account.name,
            username: account.username,
            role: Role::User,
            password_hash,
            avatar: account.avatar,
        })
        .await
        .map_err(|e| match e {
            RepoError::DuplicateField(_) => {
                warn!("username registered concurrently");
                AppError::UserAlreadyExists
            }
            e => {
                error!(error = %e, "create user failed");
                AppError::internal(e)
            }
        })?;

    info!(user_id = user.id, "user registered");
    Ok(user)
}

#[instrument(skip(st))]
pub async fn list_users(st: &AppState, page: Pagination) -> Result<(Vec<User>, i64), AppError> {
    st.users
        .list(page.offset, page.limit)
        .await
        .map_err(|e| {
            error!(error = %e, "list users failed");
            AppError::internal(e)
        })
}

#[instrument(skip(st), fields(actor = %auth.user_id))]
pub async fn get_user(st: &AppState, auth: &AuthUser, id: i64) -> Result<User, AppError> {
    check_permissions(st.users.as_ref(), &st.config.debug_auth, auth, id).await?;
    st.users.get_by_id(id).await.map_err(AppError::from)
}

#[instrument(skip(st, changes), fields(actor = %auth.user_id))]
pub async fn update_user(
    st: &AppState,
    auth: &AuthUser,
    id: i64,
    changes: Map<String, Value>,
) -> Result<User, AppError> {
    check_permissions(st.users.as_ref(), &st.config.debug_auth, auth, id).await?;
    let set = build_update(changes)?;
    st.users.update(id, &set).await.map_err(AppError::from)
}

#[instrument(skip(st), fields(actor = %auth.user_id))]
pub async fn delete_user(st: &AppState, auth: &AuthUser, id: i64) -> Result<(), AppError> {
    check_permissions(st.users.as_ref(), &st.config.debug_auth, auth, id).await?;
    st.users.delete(id).await.map_err(AppError::from)
}
