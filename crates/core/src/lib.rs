//! `bookhub-core`: domain building blocks shared by every bookhub crate.
//!
//! Pure domain primitives only: identifiers, the domain error model and the
//! aggregate contract. No storage or transport concerns live here.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{BookId, NotificationId, OrderId, PublisherId, UserId};
