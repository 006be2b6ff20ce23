use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Resource guarded by the permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Book,
    Publisher,
    School,
    Institution,
    Order,
    Faq,
    ContactMessage,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Book,
        Resource::Publisher,
        Resource::School,
        Resource::Institution,
        Resource::Order,
        Resource::Faq,
        Resource::ContactMessage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Book => "book",
            Resource::Publisher => "publisher",
            Resource::School => "school",
            Resource::Institution => "institution",
            Resource::Order => "order",
            Resource::Faq => "faq",
            Resource::ContactMessage => "contact_message",
        }
    }

    /// Human-readable noun used in denial messages.
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Book => "book",
            Resource::Publisher => "publisher",
            Resource::School => "school",
            Resource::Institution => "institution",
            Resource::Order => "order",
            Resource::Faq => "faq",
            Resource::ContactMessage => "contact message",
        }
    }
}

/// Action performed on a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    Retrieve,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Update, Action::Delete, Action::Retrieve];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Retrieve => "retrieve",
        }
    }
}

/// Permission token: one (resource, action) pair.
///
/// Tokens are rendered as `"<resource>.<action>"` (e.g. `"book.create"`) on
/// the wire and in logs. The full set is fixed at compile time; see
/// [`Permission::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Permission {
    resource: Resource,
    action: Action,
}

impl Permission {
    pub const CREATE_BOOK: Self = Self::new(Resource::Book, Action::Create);
    pub const UPDATE_BOOK: Self = Self::new(Resource::Book, Action::Update);
    pub const DELETE_BOOK: Self = Self::new(Resource::Book, Action::Delete);
    pub const RETRIEVE_BOOK: Self = Self::new(Resource::Book, Action::Retrieve);

    pub const CREATE_PUBLISHER: Self = Self::new(Resource::Publisher, Action::Create);
    pub const UPDATE_PUBLISHER: Self = Self::new(Resource::Publisher, Action::Update);
    pub const DELETE_PUBLISHER: Self = Self::new(Resource::Publisher, Action::Delete);
    pub const RETRIEVE_PUBLISHER: Self = Self::new(Resource::Publisher, Action::Retrieve);

    pub const CREATE_SCHOOL: Self = Self::new(Resource::School, Action::Create);
    pub const UPDATE_SCHOOL: Self = Self::new(Resource::School, Action::Update);
    pub const DELETE_SCHOOL: Self = Self::new(Resource::School, Action::Delete);
    pub const RETRIEVE_SCHOOL: Self = Self::new(Resource::School, Action::Retrieve);

    pub const CREATE_INSTITUTION: Self = Self::new(Resource::Institution, Action::Create);
    pub const UPDATE_INSTITUTION: Self = Self::new(Resource::Institution, Action::Update);
    pub const DELETE_INSTITUTION: Self = Self::new(Resource::Institution, Action::Delete);
    pub const RETRIEVE_INSTITUTION: Self = Self::new(Resource::Institution, Action::Retrieve);

    pub const CREATE_ORDER: Self = Self::new(Resource::Order, Action::Create);
    pub const UPDATE_ORDER: Self = Self::new(Resource::Order, Action::Update);
    pub const DELETE_ORDER: Self = Self::new(Resource::Order, Action::Delete);
    pub const RETRIEVE_ORDER: Self = Self::new(Resource::Order, Action::Retrieve);

    pub const CREATE_FAQ: Self = Self::new(Resource::Faq, Action::Create);
    pub const UPDATE_FAQ: Self = Self::new(Resource::Faq, Action::Update);
    pub const DELETE_FAQ: Self = Self::new(Resource::Faq, Action::Delete);
    pub const RETRIEVE_FAQ: Self = Self::new(Resource::Faq, Action::Retrieve);

    pub const CREATE_CONTACT_MESSAGE: Self = Self::new(Resource::ContactMessage, Action::Create);
    pub const UPDATE_CONTACT_MESSAGE: Self = Self::new(Resource::ContactMessage, Action::Update);
    pub const DELETE_CONTACT_MESSAGE: Self = Self::new(Resource::ContactMessage, Action::Delete);
    pub const RETRIEVE_CONTACT_MESSAGE: Self =
        Self::new(Resource::ContactMessage, Action::Retrieve);

    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Every token known to the platform, grouped by resource.
    pub fn all() -> impl Iterator<Item = Permission> {
        Resource::ALL
            .into_iter()
            .flat_map(|resource| Action::ALL.into_iter().map(move |action| Permission::new(resource, action)))
    }

    /// Built-in denial message for this token.
    pub fn denial_message(&self) -> String {
        format!(
            "You don't have permission to {} {}",
            self.action.as_str(),
            self.resource.label()
        )
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.resource.as_str(), self.action.as_str())
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.to_string()
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::all()
            .find(|p| p.to_string() == s)
            .ok_or_else(|| format!("unknown permission token '{s}'"))
    }
}

impl TryFrom<String> for Permission {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A deduplicated set of permission tokens.
///
/// Ordered so listings and audit output are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    pub fn contains_all(&self, required: &[Permission]) -> bool {
        required.iter().all(|p| self.0.contains(p))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn is_subset(&self, other: &PermissionSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Tokens in `self` that are absent from `other`.
    pub fn difference(&self, other: &PermissionSet) -> Vec<Permission> {
        self.0.difference(&other.0).copied().collect()
    }

    /// Returns `self` extended with `extra` (composition helper).
    pub fn with(mut self, extra: impl IntoIterator<Item = Permission>) -> Self {
        self.0.extend(extra);
        self
    }

    /// Returns the union of `self` and `other`.
    pub fn union(&self, other: &PermissionSet) -> Self {
        Self(self.0.union(&other.0).copied().collect())
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::collections::btree_set::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Default message used when a token has no specific denial message.
pub const DEFAULT_PERMISSION_DENIED_MESSAGE: &str =
    "You don't have permission to perform this action";

/// Denial messages keyed by permission token.
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    default_message: Cow<'static, str>,
    messages: HashMap<Permission, String>,
}

impl PermissionCatalog {
    /// Catalog with the built-in message of every token.
    pub fn standard() -> Self {
        Self::standard_with_default(DEFAULT_PERMISSION_DENIED_MESSAGE)
    }

    /// Catalog with the built-in message of every token and a custom default.
    pub fn standard_with_default(default_message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            default_message: default_message.into(),
            messages: Permission::all().map(|p| (p, p.denial_message())).collect(),
        }
    }

    /// Catalog with no token-specific messages.
    pub fn empty(default_message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            default_message: default_message.into(),
            messages: HashMap::new(),
        }
    }

    pub fn with_message(mut self, permission: Permission, message: impl Into<String>) -> Self {
        self.messages.insert(permission, message.into());
        self
    }

    pub fn default_message(&self) -> &str {
        &self.default_message
    }

    /// Token-specific message if present, else the default message.
    pub fn message(&self, permission: &Permission) -> &str {
        self.messages
            .get(permission)
            .map(String::as_str)
            .unwrap_or(&self.default_message)
    }
}

impl Default for PermissionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_resource_action_pair() {
        let all: PermissionSet = Permission::all().collect();
        assert_eq!(all.len(), Resource::ALL.len() * Action::ALL.len());
        assert!(all.contains(&Permission::RETRIEVE_CONTACT_MESSAGE));
    }

    #[test]
    fn tokens_render_as_resource_dot_action() {
        assert_eq!(Permission::CREATE_BOOK.to_string(), "book.create");
        assert_eq!(
            Permission::DELETE_CONTACT_MESSAGE.to_string(),
            "contact_message.delete"
        );
        assert_eq!("order.update".parse::<Permission>(), Ok(Permission::UPDATE_ORDER));
        assert!("order.approve".parse::<Permission>().is_err());
    }

    #[test]
    fn tokens_serialize_as_strings() {
        let json = serde_json::to_string(&Permission::RETRIEVE_FAQ).unwrap();
        assert_eq!(json, "\"faq.retrieve\"");

        let set: PermissionSet =
            serde_json::from_str(r#"["school.update", "book.retrieve", "school.update"]"#).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn message_falls_back_to_default() {
        let catalog = PermissionCatalog::empty("nope")
            .with_message(Permission::CREATE_FAQ, "faq is admin only");

        assert_eq!(catalog.message(&Permission::CREATE_FAQ), "faq is admin only");
        assert_eq!(catalog.message(&Permission::DELETE_FAQ), "nope");
    }

    #[test]
    fn standard_catalog_has_specific_messages() {
        let catalog = PermissionCatalog::standard();
        assert_eq!(
            catalog.message(&Permission::UPDATE_PUBLISHER),
            "You don't have permission to update publisher"
        );
        assert_eq!(
            catalog.message(&Permission::CREATE_CONTACT_MESSAGE),
            "You don't have permission to create contact message"
        );
        assert_eq!(catalog.default_message(), DEFAULT_PERMISSION_DENIED_MESSAGE);
    }
}
