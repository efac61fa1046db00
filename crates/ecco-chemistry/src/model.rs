//! # Domain Model: Items, Folders and Class Handles
//!
//! Ecco stores everything as **items** (outline entries with free-form text)
//! and **folders** (typed columns; an item holds at most one value per
//! folder). Both are identified by stable integers assigned by the host.
//!
//! The types here are plain handles. They carry identity and the little
//! metadata that never changes for the lifetime of the host object; every
//! mutable fact (an item's text, its folder values, its place in the
//! outline) lives in the host and is read through the [`crate::api::EccoApi`].
//!
//! ## Identity
//!
//! - [`ItemId`] / [`FolderId`]: host-assigned ids.
//! - [`Item`]: an item id paired with the [`ClassId`] it was resolved to.
//!   Equality and hashing use the id alone, so the same outline entry seen
//!   through two different classes is still the same item.
//! - [`Folder`]: id, name and type. The type is checked against the host on
//!   lookup and never changes afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::codec::FolderType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderId(pub u32);

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a declared item class in a [`crate::schema::Schema`].
///
/// `ClassId::ITEM` is the root class every schema starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) usize);

impl ClassId {
    pub const ITEM: ClassId = ClassId(0);
}

/// An outline entry, viewed as an instance of a declared class.
#[derive(Debug, Clone, Copy)]
pub struct Item {
    pub id: ItemId,
    pub class: ClassId,
}

impl Item {
    pub fn new(id: ItemId, class: ClassId) -> Self {
        Self { id, class }
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl From<Item> for ItemId {
    fn from(item: Item) -> Self {
        item.id
    }
}

impl From<&Item> for ItemId {
    fn from(item: &Item) -> Self {
        item.id
    }
}

/// A typed folder known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub kind: FolderType,
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Folder({:?})", self.kind, self.name)
    }
}

/// How a caller names a folder: by its (display) name or by host id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRef {
    Name(String),
    Id(FolderId),
}

impl fmt::Display for FolderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderRef::Name(name) => write!(f, "{}", name),
            FolderRef::Id(id) => write!(f, "#{}", id),
        }
    }
}

impl From<&str> for FolderRef {
    fn from(name: &str) -> Self {
        FolderRef::Name(name.to_string())
    }
}

impl From<String> for FolderRef {
    fn from(name: String) -> Self {
        FolderRef::Name(name)
    }
}

impl From<FolderId> for FolderRef {
    fn from(id: FolderId) -> Self {
        FolderRef::Id(id)
    }
}
