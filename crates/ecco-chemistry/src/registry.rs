//! # Folder Registry
//!
//! Resolves folders by name or id, remembers what it has learned about them,
//! and owns the folder bit index used by subclass resolution.
//!
//! ## Lookup
//!
//! - **By name**: `GetFoldersByName`. No match creates the folder when asked
//!   to (and a type is known), otherwise fails with
//!   [`EccoError::FolderNotFound`]. Several matches fail with
//!   [`EccoError::AmbiguousFolder`]; there is no tie-break.
//! - **By id**: `GetFolderName`.
//! - In both cases the host type is fetched and checked against the caller's
//!   expected type.
//!
//! ## Caching
//!
//! Folders never change type and are never deleted by this layer, so lookups
//! are cached by id and by name when `cache_folders` is on. The folder
//! outline is cached too and dropped whenever this registry creates a folder.
//!
//! ## Bit Index
//!
//! Every folder that takes part in a class rule gets a bit, in first-seen
//! order. An item's folder membership then becomes a [`FolderMask`], and
//! "does this item satisfy class X" is a subset test instead of a scan over
//! X's rules. The index is append-only for the lifetime of the registry.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::codec::FolderType;
use crate::error::{EccoError, Result};
use crate::model::{Folder, FolderId, FolderRef};
use crate::transport::Transport;

/// Growable set of folder bits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderMask {
    words: Vec<u64>,
}

impl FolderMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bit: usize) {
        let (word, offset) = (bit / 64, bit % 64);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << offset;
    }

    pub fn remove(&mut self, bit: usize) {
        if let Some(w) = self.words.get_mut(bit / 64) {
            *w &= !(1u64 << (bit % 64));
        }
    }

    pub fn contains(&self, bit: usize) -> bool {
        self.words
            .get(bit / 64)
            .is_some_and(|w| w & (1u64 << (bit % 64)) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// True if every bit of `self` is also set in `other`.
    pub fn is_subset(&self, other: &FolderMask) -> bool {
        self.words.iter().enumerate().all(|(i, w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & o == *w
        })
    }

    pub fn intersects(&self, other: &FolderMask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    pub fn union_with(&mut self, other: &FolderMask) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= b;
        }
    }
}

/// Lazily assigned folder → bit mapping.
#[derive(Debug, Default)]
pub struct FolderBits {
    bits: HashMap<FolderId, usize>,
    order: Vec<FolderId>,
}

impl FolderBits {
    /// Bit for `folder`, assigning the next free one on first sight.
    pub fn assign(&mut self, folder: FolderId) -> usize {
        if let Some(bit) = self.bits.get(&folder) {
            return *bit;
        }
        let bit = self.order.len();
        self.bits.insert(folder, bit);
        self.order.push(folder);
        bit
    }

    pub fn get(&self, folder: FolderId) -> Option<usize> {
        self.bits.get(&folder).copied()
    }

    /// Folders with a bit, in assignment order.
    pub fn indexed(&self) -> &[FolderId] {
        &self.order
    }

    /// Mask over the indexed subset of `folders`; others are ignored.
    pub fn mask_of<'a>(&self, folders: impl IntoIterator<Item = &'a FolderId>) -> FolderMask {
        let mut mask = FolderMask::new();
        for f in folders {
            if let Some(bit) = self.get(*f) {
                mask.insert(bit);
            }
        }
        mask
    }
}

/// Parent/child structure of the folder outline.
#[derive(Debug, Clone, Default)]
pub struct FolderOutline {
    parents: HashMap<FolderId, Option<FolderId>>,
    children: HashMap<FolderId, Vec<FolderId>>,
}

impl FolderOutline {
    /// Build from `(id, depth)` pairs in outline order, depth 0 at top level.
    pub fn from_entries(entries: &[(FolderId, u32)]) -> Self {
        let mut outline = FolderOutline::default();
        let mut stack: Vec<FolderId> = Vec::new();
        for &(id, depth) in entries {
            stack.truncate(depth as usize);
            let parent = stack.last().copied();
            outline.parents.insert(id, parent);
            outline.children.entry(id).or_default();
            if let Some(p) = parent {
                outline.children.entry(p).or_default().push(id);
            }
            stack.push(id);
        }
        outline
    }

    pub fn parent(&self, id: FolderId) -> Option<FolderId> {
        self.parents.get(&id).copied().flatten()
    }

    pub fn children(&self, id: FolderId) -> &[FolderId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, id: FolderId) -> bool {
        self.parents.contains_key(&id)
    }
}

#[derive(Debug, Default)]
struct FolderCache {
    by_id: HashMap<FolderId, Folder>,
    by_name: HashMap<String, FolderId>,
    outline: Option<FolderOutline>,
}

/// Folder lookup, metadata cache and bit index.
#[derive(Debug)]
pub struct FolderRegistry {
    cache: RefCell<FolderCache>,
    caching: bool,
    bits: FolderBits,
}

impl Default for FolderRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FolderRegistry {
    pub fn new(caching: bool) -> Self {
        Self {
            cache: RefCell::new(FolderCache::default()),
            caching,
            bits: FolderBits::default(),
        }
    }

    pub fn bits(&self) -> &FolderBits {
        &self.bits
    }

    pub fn bits_mut(&mut self) -> &mut FolderBits {
        &mut self.bits
    }

    /// Resolve a folder, optionally asserting its type and creating it.
    pub fn lookup<T: Transport>(
        &self,
        transport: &T,
        folder: &FolderRef,
        expected: Option<FolderType>,
        create: bool,
    ) -> Result<Folder> {
        if create && expected.is_none() {
            return Err(EccoError::UntypedFolderCreate(folder.to_string()));
        }

        if let Some(found) = self.cached(folder) {
            return check_type(found, folder, expected);
        }

        let (id, name) = match folder {
            FolderRef::Name(name) => {
                let ids = transport.get_folders_by_name(name)?;
                match ids.as_slice() {
                    [] => match expected {
                        Some(kind) if create => {
                            let id = transport.create_folder(name, kind)?;
                            tracing::info!(folder = %name, id = id.0, %kind, "created folder");
                            self.cache.borrow_mut().outline = None;
                            (id, name.clone())
                        }
                        _ => return Err(EccoError::FolderNotFound(name.clone())),
                    },
                    [id] => (*id, name.clone()),
                    _ => {
                        return Err(EccoError::AmbiguousFolder {
                            name: name.clone(),
                            ids: ids.clone(),
                        })
                    }
                }
            }
            FolderRef::Id(id) => (*id, transport.get_folder_name(*id)?),
        };

        let kind = transport.get_folder_type(id)?;
        let found = Folder { id, name, kind };
        tracing::debug!(folder = %found, "resolved folder");
        self.remember(&found);
        check_type(found, folder, expected)
    }

    /// The folder outline, fetched once and cached.
    pub fn outline<T: Transport>(&self, transport: &T) -> Result<FolderOutline> {
        if self.caching {
            if let Some(outline) = &self.cache.borrow().outline {
                return Ok(outline.clone());
            }
        }
        let outline = FolderOutline::from_entries(&transport.get_folder_outline()?);
        if self.caching {
            self.cache.borrow_mut().outline = Some(outline.clone());
        }
        Ok(outline)
    }

    pub fn parent<T: Transport>(&self, transport: &T, folder: &Folder) -> Result<Option<Folder>> {
        match self.outline(transport)?.parent(folder.id) {
            Some(id) => Ok(Some(self.lookup(transport, &FolderRef::Id(id), None, false)?)),
            None => Ok(None),
        }
    }

    pub fn children<T: Transport>(&self, transport: &T, folder: &Folder) -> Result<Vec<Folder>> {
        self.outline(transport)?
            .children(folder.id)
            .iter()
            .map(|id| self.lookup(transport, &FolderRef::Id(*id), None, false))
            .collect()
    }

    fn cached(&self, folder: &FolderRef) -> Option<Folder> {
        if !self.caching {
            return None;
        }
        let cache = self.cache.borrow();
        let id = match folder {
            FolderRef::Name(name) => *cache.by_name.get(name)?,
            FolderRef::Id(id) => *id,
        };
        cache.by_id.get(&id).cloned()
    }

    fn remember(&self, folder: &Folder) {
        if !self.caching {
            return;
        }
        let mut cache = self.cache.borrow_mut();
        cache.by_name.insert(folder.name.clone(), folder.id);
        cache.by_id.insert(folder.id, folder.clone());
    }
}

fn check_type(found: Folder, requested: &FolderRef, expected: Option<FolderType>) -> Result<Folder> {
    match expected {
        Some(kind) if kind != found.kind => Err(EccoError::FolderTypeMismatch {
            folder: requested.to_string(),
            expected: kind,
            actual: found.kind,
        }),
        _ => Ok(found),
    }
}
