//! # Command Layer
//!
//! The item operations live here, one submodule per concern. Each takes a
//! [`Ctx`] (transport, schema and folder registry borrowed together) and
//! returns plain data: [`Item`](crate::model::Item)s, [`Value`]s, `()`.
//!
//! Commands do not own state and never cache item data: every read is a
//! host round-trip. The [`crate::api::EccoApi`] facade builds a `Ctx` per call
//! and forwards to these functions.
//!
//! ## Testing Strategy
//!
//! Most behavior is tested here against
//! [`MemTransport`](crate::transport::memory::MemTransport), asserting both
//! the resulting host state and, where it matters, the exact host calls made.
//!
//! ## Command Modules
//!
//! - [`create`]: new items from text and attributes
//! - [`wrap`]: view existing items as a class, optionally writing values
//! - [`update`]: batched attribute writes
//! - [`upgrade`]: re-resolve an item to a more specific class
//! - [`access`]: single attribute reads and writes
//! - [`links`]: parent and children links

use crate::codec::Value;
use crate::error::Result;
use crate::model::{ClassId, FolderId, ItemId};
use crate::registry::FolderRegistry;
use crate::resolve;
use crate::schema::{self, Schema, Split};
use crate::transport::Transport;

pub mod access;
pub mod create;
pub mod links;
pub mod update;
pub mod upgrade;
pub mod wrap;

/// Everything a command needs, borrowed for one call.
pub struct Ctx<'a, T: Transport> {
    pub transport: &'a T,
    pub schema: &'a Schema,
    pub folders: &'a FolderRegistry,
}

impl<T: Transport> Clone for Ctx<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Transport> Copy for Ctx<'_, T> {}

impl<'a, T: Transport> Ctx<'a, T> {
    pub fn new(transport: &'a T, schema: &'a Schema, folders: &'a FolderRegistry) -> Self {
        Self {
            transport,
            schema,
            folders,
        }
    }

    pub fn split(&self, class: ClassId, attrs: &[(String, Value)]) -> Result<Split> {
        schema::split(self.schema, class, attrs)
    }

    pub fn resolve(
        &self,
        base: ClassId,
        item: Option<ItemId>,
        proposed: &[(FolderId, String)],
        required: bool,
    ) -> Result<Option<ClassId>> {
        resolve::resolve(
            self.transport,
            self.schema,
            self.folders,
            base,
            item,
            proposed,
            required,
        )
    }
}
