//! In-memory `UserRepository` used by the service and router tests.

use std::sync::{
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    models::{NewUser, Role, User},
    repo::{RepoError, UserRepository},
    update::{FieldValue, UpdateField, UpdateSet},
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
    next_id: AtomicI64,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub touch_calls: AtomicUsize,
    pub fail_touch: AtomicBool,
    /// Makes `create` lose a uniqueness race it cannot see in the pre-check.
    pub fail_create_duplicate: AtomicBool,
}

impl InMemoryUserRepository {
    pub fn seed(&self, username: &str, role: Role, password_hash: &str) -> User {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: username.split('@').next().unwrap_or_default().to_string(),
            username: username.to_string(),
            role,
            password_hash: password_hash.to_string(),
            avatar: None,
            last_login: None,
            updated_at: now,
            created_at: now,
            deleted_at: None,
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn soft_delete(&self, id: i64) {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == id) {
            u.deleted_at = Some(OffsetDateTime::now_utc());
        }
    }

    pub fn set_role(&self, id: i64, role: Role) {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == id) {
            u.role = role;
        }
    }

    pub fn find(&self, id: i64) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_username(&self, username: &str) -> Result<User, RepoError> {
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn get_by_id(&self, id: i64) -> Result<User, RepoError> {
        self.find(id).ok_or(RepoError::NotFound)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), RepoError> {
        let users = self.users.lock().unwrap();
        let page = users
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, users.len() as i64))
    }

    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        if self.fail_create_duplicate.load(Ordering::SeqCst) {
            return Err(RepoError::DuplicateField("email".into()));
        }
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == new.username) {
            return Err(RepoError::DuplicateField("email".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: new.name,
            username: new.username,
            role: new.role,
            password_hash: new.password_hash,
            avatar: new.avatar,
            last_login: None,
            updated_at: now,
            created_at: now,
            deleted_at: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, set: &UpdateSet) -> Result<User, RepoError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        if let Some(FieldValue::Text(username)) = set.get(UpdateField::Email) {
            if users.iter().any(|u| u.id != id && &u.username == username) {
                return Err(RepoError::DuplicateField("email".into()));
            }
        }
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepoError::NotFound)?;
        for a in set.assignments() {
            match (a.field, &a.value) {
                (UpdateField::Name, FieldValue::Text(s)) => user.name = s.clone(),
                (UpdateField::Email, FieldValue::Text(s)) => user.username = s.clone(),
                (UpdateField::Avatar, FieldValue::Bytes(b)) => user.avatar = Some(b.clone()),
                _ => {}
            }
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: i64) -> Result<(), RepoError> {
        self.touch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepoError::NotFound)?;
        user.last_login = Some(OffsetDateTime::now_utc());
        Ok(())
    }
}
