use time::OffsetDateTime;
use tracing::{error, warn};

use super::{
    models::{Role, User},
    repo::{RepoError, UserRepository},
};
use crate::{
    auth::{extractors::OPERATOR_ID, AuthUser},
    config::DebugAuthConfig,
    error::AppError,
};

/// Self-or-admin rule.
pub fn allowed(actor: &User, target_id: i64) -> bool {
    actor.id == target_id || actor.role == Role::Admin
}

/// Fixed record backing the debug operator identity.
pub fn operator_record(debug_auth: &DebugAuthConfig) -> User {
    let epoch = OffsetDateTime::UNIX_EPOCH;
    User {
        id: OPERATOR_ID,
        name: "Operator".into(),
        username: debug_auth.username.clone(),
        role: Role::Admin,
        password_hash: String::new(),
        avatar: None,
        last_login: None,
        updated_at: epoch,
        created_at: epoch,
        deleted_at: None,
    }
}

/// Resolve the acting identity to its current record and apply [`allowed`].
///
/// The record is read on every call, so role changes and deletions apply
/// without waiting for the token to expire. Returns the actor, not the target.
pub async fn check_permissions(
    repo: &dyn UserRepository,
    debug_auth: &DebugAuthConfig,
    auth: &AuthUser,
    target_id: i64,
) -> Result<User, AppError> {
    let actor = if auth.operator {
        if !debug_auth.is_active() {
            warn!("operator identity presented while debug auth is inactive");
            return Err(AppError::Unauthorized("invalid credentials"));
        }
        operator_record(debug_auth)
    } else {
        let actor_id: i64 = auth.user_id.parse().map_err(|_| {
            warn!(user_id = %auth.user_id, "token subject is not a user id");
            AppError::Unauthorized("invalid credentials")
        })?;
        match repo.get_by_id(actor_id).await {
            Ok(u) if u.is_deleted() => {
                warn!(user_id = actor_id, "deleted user presented a valid token");
                return Err(AppError::Unauthorized("invalid credentials"));
            }
            Ok(u) => u,
            Err(RepoError::NotFound) => {
                warn!(user_id = actor_id, "token subject no longer exists");
                return Err(AppError::Unauthorized("invalid credentials"));
            }
            Err(e) => {
                error!(error = %e, user_id = actor_id, "resolve acting user failed");
                return Err(AppError::internal(e));
            }
        }
    };

    if !allowed(&actor, target_id) {
        warn!(user_id = actor.id, username = %auth.username, target_id, "permission denied");
        return Err(AppError::Forbidden);
    }
    Ok(actor)
}
