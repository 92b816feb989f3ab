//! Core types for live bindings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Stable unique identifier of a record.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

/// A record a binding can hold.
///
/// Only the identifier is interpreted; everything else is carried as-is.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> &RecordId;
}

/// An opaque JSON record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Create a record with no fields.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Build a record from a JSON object; `id` is taken from the object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Set a field, returning the record.
    pub fn with(mut self, field: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }
}

impl Entity for Record {
    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Kind of change carried by a [`ChangeEvent`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    /// Any action this crate does not recognize. Applying it is a no-op.
    Unknown(String),
}

impl ChangeAction {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
            ChangeAction::Unknown(s) => s,
        }
    }

    /// Creates and updates carry a record that may need expanding.
    pub fn carries_record(&self) -> bool {
        matches!(self, ChangeAction::Create | ChangeAction::Update)
    }
}

impl From<&str> for ChangeAction {
    fn from(s: &str) -> Self {
        match s {
            "create" => ChangeAction::Create,
            "update" => ChangeAction::Update,
            "delete" => ChangeAction::Delete,
            other => ChangeAction::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChangeAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChangeAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ChangeAction::from(s.as_str()))
    }
}

/// A notification that a record was created, updated or deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent<E> {
    pub action: ChangeAction,
    pub record: E,
}

impl<E: Entity> ChangeEvent<E> {
    pub fn new(action: ChangeAction, record: E) -> Self {
        Self { action, record }
    }

    pub fn create(record: E) -> Self {
        Self::new(ChangeAction::Create, record)
    }

    pub fn update(record: E) -> Self {
        Self::new(ChangeAction::Update, record)
    }

    pub fn delete(record: E) -> Self {
        Self::new(ChangeAction::Delete, record)
    }

    pub fn id(&self) -> &RecordId {
        self.record.id()
    }
}

/// Delivery position of an event over a binding's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Sequence(pub u64);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

/// One page of a collection plus its paging metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageWindow<E> {
    pub items: Vec<E>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<E> PageWindow<E> {
    /// A window with no items and no known pages.
    pub fn empty(page: u32, per_page: u32) -> Self {
        Self {
            items: Vec::new(),
            page,
            per_page,
            total_items: 0,
            total_pages: 0,
        }
    }

    /// `ceil(total_items / per_page)`; zero when `per_page` is zero.
    pub fn total_pages_for(total_items: u64, per_page: u32) -> u32 {
        if per_page == 0 {
            return 0;
        }
        let pages = total_items.div_ceil(u64::from(per_page));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Whether `page` is a valid navigation target for this window.
    pub fn contains_page(&self, page: u32) -> bool {
        page >= 1 && page <= self.total_pages
    }
}

/// Parameters handed verbatim to the source on fetches.
///
/// Only `expand` matters when reconciling live events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub expand: Option<String>,
    pub fields: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The expand directive, if present and non-blank.
    pub fn expand_directive(&self) -> Option<&str> {
        self.expand
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// Flatten into key/value pairs for a transport.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let named = [
            ("filter", &self.filter),
            ("sort", &self.sort),
            ("expand", &self.expand),
            ("fields", &self.fields),
        ];
        for (key, value) in named {
            if let Some(v) = value {
                pairs.push((key.to_string(), v.clone()));
            }
        }
        pairs.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }
}

/// What a live subscription listens to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionScope {
    /// Events for exactly one record.
    Record(RecordId),
    /// Every event in the collection.
    Collection,
}

impl SubscriptionScope {
    /// Wildcard topic for the whole collection.
    pub const WILDCARD: &'static str = "*";

    /// Transport topic for this scope.
    pub fn topic(&self) -> &str {
        match self {
            SubscriptionScope::Record(id) => id.as_str(),
            SubscriptionScope::Collection => Self::WILDCARD,
        }
    }

    /// Whether an event for `id` belongs to this scope.
    pub fn matches(&self, id: &RecordId) -> bool {
        match self {
            SubscriptionScope::Record(scoped) => scoped == id,
            SubscriptionScope::Collection => true,
        }
    }
}
