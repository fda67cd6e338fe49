//! Directory service
//!
//! Admin-only maintenance of events and users, plus the active-user check
//! every other service runs before letting an actor touch a claim.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use core_kernel::{EventId, RecordStore, UserId, Versioned};

use crate::error::DirectoryError;
use crate::event::{Event, EventStatus, EventUpdate, NewEvent};
use crate::repository::{EventRepository, UserRepository};
use crate::user::{Actor, NewUser, Role, User, UserStatus, UserUpdate};

fn check_version(id: impl ToString, current: u64, expected: Option<u64>) -> Result<u64, DirectoryError> {
    match expected {
        Some(v) if v != current => Err(DirectoryError::StaleState {
            id: id.to_string(),
            expected: v,
            actual: current,
        }),
        _ => Ok(current),
    }
}

#[derive(Clone)]
pub struct DirectoryService {
    events: EventRepository,
    users: UserRepository,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            events: EventRepository::new(store.clone()),
            users: UserRepository::new(store),
        }
    }

    pub fn events(&self) -> &EventRepository {
        &self.events
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Loads the actor's user record and checks it may act
    ///
    /// Fails when the user is unknown, deactivated, or no longer holds the
    /// role carried by the actor.
    pub async fn ensure_active(&self, actor: &Actor) -> Result<User, DirectoryError> {
        let user = self
            .users
            .find(actor.user_id)
            .await?
            .ok_or_else(|| DirectoryError::unauthorized(format!("unknown user {}", actor.user_id)))?
            .value;
        if !user.is_active() {
            warn!(user_id = %actor.user_id, "inactive user attempted an operation");
            return Err(DirectoryError::InactiveUser(actor.user_id.to_string()));
        }
        if user.role != actor.role {
            return Err(DirectoryError::unauthorized(format!(
                "user {} no longer has role {}",
                actor.user_id, actor.role
            )));
        }
        Ok(user)
    }

    async fn ensure_admin(&self, actor: &Actor) -> Result<User, DirectoryError> {
        let user = self.ensure_active(actor).await?;
        if !user.role.is_admin() {
            return Err(DirectoryError::unauthorized("admin role required"));
        }
        Ok(user)
    }

    // ---- events ----------------------------------------------------------

    #[instrument(skip(self, input), fields(actor = %actor.user_id))]
    pub async fn create_event(&self, actor: &Actor, input: NewEvent) -> Result<Versioned<Event>, DirectoryError> {
        self.ensure_admin(actor).await?;
        let event = Event::create(EventId::new_v7(), input, actor.user_id)?;
        let stored = self.events.insert(&event).await?;
        info!(event_id = %event.id, name = %event.name, "event created");
        Ok(stored)
    }

    #[instrument(skip(self, update), fields(actor = %actor.user_id, event_id = %id))]
    pub async fn update_event(
        &self,
        actor: &Actor,
        id: EventId,
        update: EventUpdate,
        expected_version: Option<u64>,
    ) -> Result<Versioned<Event>, DirectoryError> {
        self.ensure_admin(actor).await?;
        let current = self.events.get(id).await?;
        let version = check_version(id, current.version, expected_version)?;
        let mut event = current.value;
        event.apply(update)?;
        let stored = self.events.save(&event, version).await?;
        info!(version = stored.version, "event updated");
        Ok(stored)
    }

    pub async fn set_event_status(
        &self,
        actor: &Actor,
        id: EventId,
        status: EventStatus,
    ) -> Result<Versioned<Event>, DirectoryError> {
        self.update_event(
            actor,
            id,
            EventUpdate {
                status: Some(status),
                ..Default::default()
            },
            None,
        )
        .await
    }

    pub async fn get_event(&self, id: EventId) -> Result<Versioned<Event>, DirectoryError> {
        self.events.get(id).await
    }

    pub async fn list_events(&self, status: Option<EventStatus>) -> Result<Vec<Versioned<Event>>, DirectoryError> {
        self.events.list(status).await
    }

    // ---- users -----------------------------------------------------------

    #[instrument(skip(self, input), fields(actor = %actor.user_id, role = %input.role))]
    pub async fn create_user(&self, actor: &Actor, input: NewUser) -> Result<Versioned<User>, DirectoryError> {
        self.ensure_admin(actor).await?;
        self.insert_user(input).await
    }

    /// Creates the first admin of an empty directory
    ///
    /// Returns `None` when any user already exists.
    pub async fn bootstrap_admin(&self, mut input: NewUser) -> Result<Option<Versioned<User>>, DirectoryError> {
        if !self.users.list(None).await?.is_empty() {
            return Ok(None);
        }
        input.role = Role::Admin;
        let stored = self.insert_user(input).await?;
        info!(user_id = %stored.value.id, "bootstrap admin created");
        Ok(Some(stored))
    }

    async fn insert_user(&self, input: NewUser) -> Result<Versioned<User>, DirectoryError> {
        let user = input.into_user(UserId::new_v7())?;
        if self.users.find_by_email(&user.email).await?.is_some() {
            return Err(DirectoryError::DuplicateEmail(user.email));
        }
        let stored = self.users.insert(&user).await?;
        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(stored)
    }

    #[instrument(skip(self, update), fields(actor = %actor.user_id, user_id = %id))]
    pub async fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        update: UserUpdate,
        expected_version: Option<u64>,
    ) -> Result<Versioned<User>, DirectoryError> {
        self.ensure_admin(actor).await?;
        let current = self.users.get(id).await?;
        let version = check_version(id, current.version, expected_version)?;
        let mut user = current.value;
        if let Some(name) = update.display_name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DirectoryError::validation("display name must not be blank"));
            }
            user.display_name = name;
        }
        if let Some(role) = update.role {
            if id == actor.user_id && role != Role::Admin {
                return Err(DirectoryError::validation("admins cannot demote themselves"));
            }
            user.role = role;
        }
        if let Some(department) = update.department {
            user.department = Some(department).filter(|d| !d.trim().is_empty());
        }
        let stored = self.users.save(&user, version).await?;
        info!(role = %user.role, "user updated");
        Ok(stored)
    }

    #[instrument(skip(self), fields(actor = %actor.user_id, user_id = %id))]
    pub async fn deactivate_user(&self, actor: &Actor, id: UserId) -> Result<Versioned<User>, DirectoryError> {
        self.ensure_admin(actor).await?;
        if id == actor.user_id {
            return Err(DirectoryError::validation("admins cannot deactivate themselves"));
        }
        let current = self.users.get(id).await?;
        let mut user = current.value;
        user.status = UserStatus::Inactive;
        let stored = self.users.save(&user, current.version).await?;
        info!("user deactivated");
        Ok(stored)
    }

    pub async fn get_user(&self, id: UserId) -> Result<Versioned<User>, DirectoryError> {
        self.users.get(id).await
    }

    pub async fn list_users(&self, role: Option<Role>) -> Result<Vec<Versioned<User>>, DirectoryError> {
        self.users.list(role).await
    }
}
