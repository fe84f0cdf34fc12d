//! crates/library_core/src/users.rs
//!
//! User registration, actor resolution and role administration.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Actor, NewUser, Role, User};
use crate::error::LibraryResult;
use crate::policy::{authorize, Operation};
use crate::ports::LibraryStore;
use crate::validation::normalize_email;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn LibraryStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Registers a new `MEMBER`. Self-registration never grants a higher tier.
    pub async fn register(
        &self,
        email: &str,
        name: Option<String>,
        password_hash: Option<String>,
    ) -> LibraryResult<User> {
        let email = normalize_email(email)?;
        let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let user = self
            .store
            .create_user(NewUser {
                email,
                name,
                role: Role::Member,
                password_hash,
            })
            .await?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Resolves a stored user into the actor the services trust.
    pub async fn resolve_actor(&self, user_id: Uuid) -> LibraryResult<Actor> {
        let user = self.store.get_user_by_id(user_id).await?;
        Ok(Actor::from(&user))
    }

    pub async fn find_by_email(&self, email: &str) -> LibraryResult<User> {
        let email = normalize_email(email)?;
        Ok(self.store.get_user_by_email(&email).await?)
    }

    pub async fn list(&self, actor: &Actor) -> LibraryResult<Vec<User>> {
        authorize(Some(actor), Operation::ManageUsers)?;
        Ok(self.store.list_users().await?)
    }

    pub async fn set_role(&self, actor: &Actor, user_id: Uuid, role: Role) -> LibraryResult<User> {
        authorize(Some(actor), Operation::ManageUsers)?;
        let user = self.store.set_user_role(user_id, role).await?;
        info!(%user_id, %role, actor = %actor.id, "User role changed");
        Ok(user)
    }

    /// Explicitly seeds a user with the given role, creating them if needed.
    ///
    /// This is an operator action run at startup or from the seed tool, never a
    /// side effect of somebody signing in.
    pub async fn seed_user(&self, email: &str, name: Option<&str>, role: Role) -> LibraryResult<User> {
        let email = normalize_email(email)?;
        let user = self.store.upsert_user_with_role(&email, name, role).await?;
        info!(user_id = %user.id, email = %user.email, %role, "Seeded user role");
        Ok(user)
    }

    pub async fn bootstrap_admin(&self, email: &str) -> LibraryResult<User> {
        self.seed_user(email, None, Role::Admin).await
    }
}
