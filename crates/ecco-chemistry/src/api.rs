//! # API Facade
//!
//! [`EccoApi`] is the single entry point for callers. It owns the transport,
//! the folder registry and the class schema, and forwards every operation to
//! the command layer with a borrowed [`Ctx`].
//!
//! ## Role and Responsibilities
//!
//! The facade:
//! - **Owns state**: transport, folder cache and bit index, declared classes
//! - **Dispatches** to `commands/*.rs` and the query builders
//! - **Normalizes inputs** (folder names or ids, class names)
//!
//! Logic lives in the command modules; this layer only wires it up.
//!
//! ## Generic Over Transport
//!
//! `EccoApi<T: Transport>` works with any host connection:
//! - Production: a DDE client implementing [`Transport`]
//! - Testing: `EccoApi<MemTransport>`
//!
//! ## Lifecycle
//!
//! Declare classes first (`declare` takes `&mut self`), then work with items
//! through `&self`. Folder lookups made during declaration are cached (unless
//! `cache_folders` is off) and the folder bit index only ever grows.

use crate::codec::{FolderType, Value};
use crate::commands::{access, create, links, update, upgrade, wrap, Ctx};
use crate::config::EccoConfig;
use crate::error::{EccoError, Result};
use crate::model::{ClassId, Folder, FolderRef, Item, ItemId};
use crate::query::{ClassItems, Container};
use crate::registry::FolderRegistry;
use crate::schema::{ClassSpec, Schema};
use crate::transport::{Criterion, Transport};

/// The main API facade.
pub struct EccoApi<T: Transport> {
    transport: T,
    folders: FolderRegistry,
    schema: Schema,
    config: EccoConfig,
}

impl<T: Transport> EccoApi<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EccoConfig::default())
    }

    pub fn with_config(transport: T, config: EccoConfig) -> Self {
        Self {
            transport,
            folders: FolderRegistry::new(config.cache_folders),
            schema: Schema::new(config.checkmark_marker()),
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &EccoConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn ctx(&self) -> Ctx<'_, T> {
        Ctx::new(&self.transport, &self.schema, &self.folders)
    }

    // --- Folders ---

    pub fn folder(&self, folder: impl Into<FolderRef>) -> Result<Folder> {
        self.folders
            .lookup(&self.transport, &folder.into(), None, false)
    }

    /// Look up a folder and check its type.
    pub fn typed_folder(&self, folder: impl Into<FolderRef>, kind: FolderType) -> Result<Folder> {
        self.folders
            .lookup(&self.transport, &folder.into(), Some(kind), false)
    }

    /// Look up a folder by name, creating it if there is none.
    pub fn create_folder(&self, name: &str, kind: FolderType) -> Result<Folder> {
        self.folders
            .lookup(&self.transport, &FolderRef::from(name), Some(kind), true)
    }

    pub fn folder_parent(&self, folder: &Folder) -> Result<Option<Folder>> {
        self.folders.parent(&self.transport, folder)
    }

    pub fn folder_children(&self, folder: &Folder) -> Result<Vec<Folder>> {
        self.folders.children(&self.transport, folder)
    }

    /// Raw item ids in `folder`, without class resolution.
    pub fn folder_items(&self, folder: &Folder, criteria: &[Criterion]) -> Result<Vec<ItemId>> {
        self.transport.get_folder_items(folder.id, criteria)
    }

    // --- Classes ---

    pub fn declare(&mut self, spec: ClassSpec) -> Result<ClassId> {
        self.schema
            .declare(&self.transport, &mut self.folders, spec)
    }

    pub fn class(&self, name: &str) -> Result<ClassId> {
        self.schema
            .find(name)
            .ok_or_else(|| EccoError::InvalidClass(format!("unknown class {}", name)))
    }

    // --- Items ---

    pub fn create(&self, class: ClassId, text: &str, attrs: &[(String, Value)]) -> Result<Item> {
        create::run(self.ctx(), class, text, attrs)
    }

    pub fn wrap(&self, class: ClassId, id: ItemId, attrs: &[(String, Value)]) -> Result<Item> {
        wrap::run(self.ctx(), class, id, attrs)
    }

    /// Wrap an id already known to be a `class`, skipping resolution.
    pub fn wrap_as(&self, class: ClassId, id: ItemId) -> Item {
        wrap::wrap_as(id, class)
    }

    pub fn update(&self, item: Item, attrs: &[(String, Value)]) -> Result<()> {
        update::run(self.ctx(), item, attrs)
    }

    pub fn upgrade(&self, class: ClassId, id: ItemId, attrs: &[(String, Value)]) -> Result<Item> {
        upgrade::run(self.ctx(), class, id, attrs)
    }

    /// The most specific class under `class` that `id` matches, if any.
    pub fn resolve(&self, class: ClassId, id: ItemId) -> Result<Option<Item>> {
        Ok(self
            .ctx()
            .resolve(class, Some(id), &[], false)?
            .map(|c| Item::new(id, c)))
    }

    pub fn get(&self, item: Item, attr: &str) -> Result<Value> {
        access::get(self.ctx(), item, attr)
    }

    pub fn set(&self, item: Item, attr: &str, value: impl Into<Value>) -> Result<()> {
        access::set(self.ctx(), item, attr, &value.into())
    }

    pub fn clear(&self, item: Item, attr: &str) -> Result<()> {
        access::clear(self.ctx(), item, attr)
    }

    pub fn text(&self, item: Item) -> Result<String> {
        access::text(self.ctx(), item.id)
    }

    pub fn set_text(&self, item: Item, text: &str) -> Result<()> {
        access::set_text(self.ctx(), item.id, text)
    }

    pub fn get_value(&self, item: Item, folder: &Folder) -> Result<Value> {
        access::get_value(self.ctx(), item.id, folder)
    }

    pub fn set_value(&self, item: Item, folder: &Folder, value: impl Into<Value>) -> Result<()> {
        access::set_value(self.ctx(), item.id, folder, &value.into())
    }

    pub fn clear_value(&self, item: Item, folder: &Folder) -> Result<()> {
        access::clear_value(self.ctx(), item.id, folder)
    }

    pub fn in_folder(&self, item: Item, folder: &Folder) -> Result<bool> {
        access::in_folder(self.ctx(), item.id, folder)
    }

    // --- Links ---

    // Parent and children here are typed as the item's own class, like the
    // `parent` / `children` attributes every class inherits.

    pub fn parent(&self, item: Item) -> Result<Option<Item>> {
        links::parent(self.ctx(), item.id, Some(item.class))
    }

    /// Move `item` under `parent` (as first child), or to the top level.
    pub fn set_parent(&self, item: Item, parent: Option<Item>) -> Result<()> {
        links::set_parent(self.ctx(), item.id, Some(item.class), parent.map(|p| p.id))
    }

    pub fn children(&self, item: Item) -> links::Children<'_, T> {
        links::children(self.ctx(), item.id, Some(item.class), 1)
    }

    pub fn all_children(&self, item: Item) -> links::Children<'_, T> {
        links::children(self.ctx(), item.id, Some(item.class), 0)
    }

    // --- Queries ---

    /// Query `class` through one of its folder attributes.
    pub fn container(&self, class: ClassId, attr: &str) -> Result<Container<'_, T>> {
        let folder = self
            .schema
            .attribute(class, attr)?
            .folder()
            .cloned()
            .ok_or_else(|| {
                EccoError::InvalidClass(format!(
                    "{}.{} is not a folder attribute",
                    self.schema.class(class).name(),
                    attr
                ))
            })?;
        Ok(Container::new(self.ctx(), class, folder))
    }

    /// All items of `class`, through its container folder.
    pub fn items(&self, class: ClassId) -> Result<ClassItems<'_, T>> {
        ClassItems::new(self.ctx(), class)
    }

    /// `Class(id)`, naming the item's resolved class.
    pub fn repr(&self, item: Item) -> String {
        format!("{}({})", self.schema.class(item.class).name(), item.id)
    }
}
