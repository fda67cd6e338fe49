//! Users, roles and the acting identity

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use core_kernel::{CoreError, UserId};

use crate::error::DirectoryError;

/// Role of a user within the organisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Validator,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Validator => "validator",
            Role::User => "user",
        }
    }

    /// Whether the role may approve, reject or question claims
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Admin | Role::Validator)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "validator" => Ok(Role::Validator),
            "user" => Ok(Role::User),
            other => Err(CoreError::unknown_value("role", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
}

/// A user as stored in the `users` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub status: UserStatus,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// The acting identity for this user
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub display_name: String,
    pub role: Role,
    #[validate(length(max = 120))]
    pub department: Option<String>,
}

impl NewUser {
    pub fn into_user(self, id: UserId) -> Result<User, DirectoryError> {
        self.validate()
            .map_err(|e| DirectoryError::validation(e.to_string()))?;
        let display_name = self.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(DirectoryError::validation("display name must not be blank"));
        }
        Ok(User {
            id,
            email: self.email.trim().to_ascii_lowercase(),
            display_name,
            role: self.role,
            department: self.department.filter(|d| !d.trim().is_empty()),
            status: UserStatus::Active,
        })
    }
}

/// Administrative changes to a user's role or department
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
}

/// The authenticated caller of an operation
///
/// Supplied by the authentication collaborator and passed explicitly into
/// every service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn can_review(&self) -> bool {
        self.role.can_review()
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.user_id, self.role)
    }
}
