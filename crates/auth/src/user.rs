//! Platform users as seen by authorization and notification delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookhub_core::{DomainError, DomainResult, PublisherId, UserId};

use crate::Role;

/// A registered user.
///
/// Publisher staff carry the id of the publisher profile they act for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub publisher_id: Option<PublisherId>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Validate and normalize a new user record.
    pub fn new(
        id: UserId,
        email: &str,
        full_name: &str,
        role: Role,
        date_joined: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if email.trim().is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        if full_name.trim().is_empty() {
            return Err(DomainError::validation("full name cannot be empty"));
        }

        Ok(Self {
            id,
            email: email.trim().to_lowercase(),
            full_name: full_name.trim().to_string(),
            role,
            publisher_id: None,
            date_joined,
        })
    }

    /// Attach the user to a publisher profile.
    pub fn with_publisher(mut self, publisher_id: PublisherId) -> Self {
        self.publisher_id = Some(publisher_id);
        self
    }
}
