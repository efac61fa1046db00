//! # Host Transport
//!
//! Everything this crate knows about the host application goes through the
//! [`Transport`] trait. It mirrors the handful of automation requests Ecco
//! answers over DDE; the core never relies on any other host capability.
//!
//! ## Implementations
//!
//! - A DDE client lives outside this crate and implements the trait.
//! - [`memory::MemTransport`]: an in-memory host for tests and fixtures.
//!
//! ## Call Model
//!
//! Every method is one blocking request/response round-trip. The trait takes
//! `&self` throughout; implementations handle their own interior mutability.
//! No retries or reconnection happen at this layer.

use serde::{Deserialize, Serialize};

use crate::codec::FolderType;
use crate::error::Result;
use crate::model::{FolderId, ItemId};

pub mod memory;

/// Where `insert_items` places items relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InsertLevel {
    /// As the first child of the target.
    #[default]
    Child,
    /// As the next sibling of the target.
    Same,
}

/// A selection criterion for [`Transport::get_folder_items`].
///
/// Folder comparisons take the folder's *encoded* value; text criteria take
/// raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    Gt(String),
    Ge(String),
    Lt(String),
    Le(String),
    Eq(String),
    Ne(String),
    /// Folder value starts with.
    StartsWith(String),
    /// Folder value contains.
    Contains(String),
    /// Folder value does not contain.
    Lacks(String),
    /// Sort by folder value.
    Ascending,
    Descending,
    /// Item text starts with.
    TextStartsWith(String),
    TextContains(String),
    TextLacks(String),
    /// Sort by item text.
    TextAscending,
    TextDescending,
}

impl Criterion {
    /// The operator code sent to the host.
    pub fn code(&self) -> &'static str {
        match self {
            Criterion::Gt(_) => "GT",
            Criterion::Ge(_) => "GE",
            Criterion::Lt(_) => "LT",
            Criterion::Le(_) => "LE",
            Criterion::Eq(_) => "EQ",
            Criterion::Ne(_) => "NE",
            Criterion::StartsWith(_) => "TB",
            Criterion::Contains(_) => "TC",
            Criterion::Lacks(_) => "TN",
            Criterion::Ascending => "va",
            Criterion::Descending => "vd",
            Criterion::TextStartsWith(_) => "IB",
            Criterion::TextContains(_) => "IC",
            Criterion::TextLacks(_) => "IN",
            Criterion::TextAscending => "ia",
            Criterion::TextDescending => "id",
        }
    }

    /// The operand, for criteria that take one.
    pub fn operand(&self) -> Option<&str> {
        match self {
            Criterion::Gt(v)
            | Criterion::Ge(v)
            | Criterion::Lt(v)
            | Criterion::Le(v)
            | Criterion::Eq(v)
            | Criterion::Ne(v)
            | Criterion::StartsWith(v)
            | Criterion::Contains(v)
            | Criterion::Lacks(v)
            | Criterion::TextStartsWith(v)
            | Criterion::TextContains(v)
            | Criterion::TextLacks(v) => Some(v),
            Criterion::Ascending
            | Criterion::Descending
            | Criterion::TextAscending
            | Criterion::TextDescending => None,
        }
    }

    /// Flatten into the argument list the host expects (code, then operand).
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.code().to_string()];
        if let Some(v) = self.operand() {
            args.push(v.to_string());
        }
        args
    }
}

/// Abstract interface to the host application.
pub trait Transport {
    // --- Items ---

    /// Create a top-level outline entry with the given text and folder values.
    fn create_item(&self, text: &str, values: &[(FolderId, String)]) -> Result<ItemId>;

    fn get_item_text(&self, item: ItemId) -> Result<String>;

    fn set_item_text(&self, item: ItemId, text: &str) -> Result<()>;

    /// Folder ids holding a non-empty value for `item`.
    fn get_item_folders(&self, item: ItemId) -> Result<Vec<FolderId>>;

    // --- Folder values ---

    /// Wire values of `folders` for `item`, in the same order.
    /// Folders the item is not in yield `""`.
    fn get_folder_values(&self, item: ItemId, folders: &[FolderId]) -> Result<Vec<String>>;

    /// Set several folder values in one request. `""` removes the item from
    /// that folder.
    fn set_folder_values(&self, item: ItemId, values: &[(FolderId, String)]) -> Result<()>;

    // --- Outline structure ---

    /// Ancestors of `item`, outermost first. Empty for top-level items.
    fn get_item_parents(&self, item: ItemId) -> Result<Vec<ItemId>>;

    /// Move `items` in the outline.
    ///
    /// Items are inserted one at a time at the same position relative to
    /// `target`, so the last element of `items` ends up first. A `None`
    /// target moves the items to the top level.
    fn insert_items(&self, target: Option<ItemId>, items: &[ItemId], level: InsertLevel)
        -> Result<()>;

    /// Descendants of `parent` in outline order, with their depth below it.
    /// `depth` limits how far down to go; `0` means unlimited.
    fn get_item_subs(&self, parent: ItemId, depth: u32) -> Result<Vec<(u32, ItemId)>>;

    // --- Folders ---

    fn get_folders_by_name(&self, name: &str) -> Result<Vec<FolderId>>;

    fn create_folder(&self, name: &str, kind: FolderType) -> Result<FolderId>;

    fn get_folder_name(&self, folder: FolderId) -> Result<String>;

    fn get_folder_type(&self, folder: FolderId) -> Result<FolderType>;

    /// All folders in outline order with their 0-based depth.
    fn get_folder_outline(&self) -> Result<Vec<(FolderId, u32)>>;

    /// The query primitive: items in `folder` satisfying every criterion.
    fn get_folder_items(&self, folder: FolderId, criteria: &[Criterion]) -> Result<Vec<ItemId>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn create_item(&self, text: &str, values: &[(FolderId, String)]) -> Result<ItemId> {
        (**self).create_item(text, values)
    }
    fn get_item_text(&self, item: ItemId) -> Result<String> {
        (**self).get_item_text(item)
    }
    fn set_item_text(&self, item: ItemId, text: &str) -> Result<()> {
        (**self).set_item_text(item, text)
    }
    fn get_item_folders(&self, item: ItemId) -> Result<Vec<FolderId>> {
        (**self).get_item_folders(item)
    }
    fn get_folder_values(&self, item: ItemId, folders: &[FolderId]) -> Result<Vec<String>> {
        (**self).get_folder_values(item, folders)
    }
    fn set_folder_values(&self, item: ItemId, values: &[(FolderId, String)]) -> Result<()> {
        (**self).set_folder_values(item, values)
    }
    fn get_item_parents(&self, item: ItemId) -> Result<Vec<ItemId>> {
        (**self).get_item_parents(item)
    }
    fn insert_items(
        &self,
        target: Option<ItemId>,
        items: &[ItemId],
        level: InsertLevel,
    ) -> Result<()> {
        (**self).insert_items(target, items, level)
    }
    fn get_item_subs(&self, parent: ItemId, depth: u32) -> Result<Vec<(u32, ItemId)>> {
        (**self).get_item_subs(parent, depth)
    }
    fn get_folders_by_name(&self, name: &str) -> Result<Vec<FolderId>> {
        (**self).get_folders_by_name(name)
    }
    fn create_folder(&self, name: &str, kind: FolderType) -> Result<FolderId> {
        (**self).create_folder(name, kind)
    }
    fn get_folder_name(&self, folder: FolderId) -> Result<String> {
        (**self).get_folder_name(folder)
    }
    fn get_folder_type(&self, folder: FolderId) -> Result<FolderType> {
        (**self).get_folder_type(folder)
    }
    fn get_folder_outline(&self) -> Result<Vec<(FolderId, u32)>> {
        (**self).get_folder_outline()
    }
    fn get_folder_items(&self, folder: FolderId, criteria: &[Criterion]) -> Result<Vec<ItemId>> {
        (**self).get_folder_items(folder, criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_codes_match_host_vocabulary() {
        assert_eq!(Criterion::Gt("5".into()).code(), "GT");
        assert_eq!(Criterion::StartsWith("a".into()).code(), "TB");
        assert_eq!(Criterion::Descending.code(), "vd");
        assert_eq!(Criterion::TextLacks("x".into()).code(), "IN");
        assert_eq!(Criterion::TextAscending.code(), "ia");
    }

    #[test]
    fn criterion_args_include_operand_when_present() {
        assert_eq!(Criterion::Eq("1".into()).to_args(), vec!["EQ", "1"]);
        assert_eq!(Criterion::Ascending.to_args(), vec!["va"]);
    }
}
