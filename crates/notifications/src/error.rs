use thiserror::Error;

use bookhub_core::{OrderId, PublisherId, UserId};

use crate::StoreError;

/// The party a notification could not be addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientRef {
    Publisher(PublisherId),
    Customer(UserId),
}

impl core::fmt::Display for RecipientRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecipientRef::Publisher(id) => write!(f, "publisher {id} has no user"),
            RecipientRef::Customer(id) => write!(f, "customer {id} not found"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("unresolved recipient: {0}")]
    UnresolvedRecipient(RecipientRef),

    #[error(transparent)]
    Store(#[from] StoreError),
}
