use super::{Criterion, InsertLevel, Transport};
use crate::codec::FolderType;
use crate::error::{EccoError, Result};
use crate::model::{FolderId, ItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FolderEntry {
    id: FolderId,
    name: String,
    kind: FolderType,
    depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemEntry {
    id: ItemId,
    text: String,
    #[serde(default)]
    parent: Option<ItemId>,
    #[serde(default)]
    children: Vec<ItemId>,
    #[serde(default)]
    values: Vec<(FolderId, String)>,
}

impl ItemEntry {
    fn value(&self, folder: FolderId) -> &str {
        self.values
            .iter()
            .find(|(f, _)| *f == folder)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    fn set_value(&mut self, folder: FolderId, value: &str) {
        self.values.retain(|(f, _)| *f != folder);
        if !value.is_empty() {
            self.values.push((folder, value.to_string()));
            self.values.sort_by_key(|(f, _)| *f);
        }
    }
}

/// Snapshot of the whole in-memory host, as stored by `to_json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HostState {
    /// Folder outline, in outline order.
    folders: Vec<FolderEntry>,
    items: Vec<ItemEntry>,
    roots: Vec<ItemId>,
    next_folder: u32,
    next_item: u32,
}

impl HostState {
    fn item(&self, id: ItemId) -> Result<&ItemEntry> {
        self.items
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| EccoError::Transport(format!("no such item: {}", id)))
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut ItemEntry> {
        self.items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| EccoError::Transport(format!("no such item: {}", id)))
    }

    fn folder(&self, id: FolderId) -> Result<&FolderEntry> {
        self.folders
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| EccoError::Transport(format!("no such folder: {}", id)))
    }

    fn siblings_mut(&mut self, parent: Option<ItemId>) -> Result<&mut Vec<ItemId>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(p) => Ok(&mut self.item_mut(p)?.children),
        }
    }

    fn detach(&mut self, id: ItemId) -> Result<()> {
        let parent = self.item(id)?.parent;
        self.siblings_mut(parent)?.retain(|c| *c != id);
        self.item_mut(id)?.parent = None;
        Ok(())
    }

    fn ancestors(&self, id: ItemId) -> Result<Vec<ItemId>> {
        let mut chain = Vec::new();
        let mut current = self.item(id)?.parent;
        while let Some(p) = current {
            chain.push(p);
            current = self.item(p)?.parent;
        }
        chain.reverse();
        Ok(chain)
    }

    fn collect_subs(&self, parent: ItemId, level: u32, limit: u32, out: &mut Vec<(u32, ItemId)>) {
        let Ok(entry) = self.item(parent) else {
            return;
        };
        for child in &entry.children {
            out.push((level, *child));
            if limit == 0 || level < limit {
                self.collect_subs(*child, level + 1, limit, out);
            }
        }
    }

    fn compare(&self, kind: FolderType, a: &str, b: &str) -> Ordering {
        if kind == FolderType::Number {
            if let (Ok(x), Ok(y)) = (Decimal::from_str(a), Decimal::from_str(b)) {
                return x.cmp(&y);
            }
        }
        a.cmp(b)
    }
}

/// In-memory host application for testing.
///
/// Implements the full [`Transport`] contract over a small outline model:
/// typed folders, items with text and per-folder values, and a parent/child
/// tree. Uses `RefCell` for interior mutability since the layer above is
/// single-threaded.
///
/// Every request is recorded by its host command name (`"CreateItem"`,
/// `"SetFolderValues"`, ...) so tests can assert which round-trips happened.
pub struct MemTransport {
    state: RefCell<HostState>,
    calls: RefCell<Vec<&'static str>>,
    fail_writes: Cell<bool>,
}

impl Default for MemTransport {
    fn default() -> Self {
        Self {
            state: RefCell::new(HostState {
                next_folder: 1,
                next_item: 1,
                ..Default::default()
            }),
            calls: RefCell::new(Vec::new()),
            fail_writes: Cell::new(false),
        }
    }
}

impl MemTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a host from a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        let state: HostState = serde_json::from_str(json)?;
        Ok(Self {
            state: RefCell::new(state),
            ..Default::default()
        })
    }

    /// Serialize the host state.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.state.borrow())?)
    }

    /// Make every mutating request fail, for testing error propagation.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Host commands issued so far.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Fixture helper: add a folder without going through `create_folder`.
    pub fn add_folder(&self, name: &str, kind: FolderType) -> FolderId {
        self.add_folder_under(name, kind, None)
    }

    /// Fixture helper: add a folder nested under `parent` in the outline.
    pub fn add_folder_under(&self, name: &str, kind: FolderType, parent: Option<FolderId>) -> FolderId {
        let mut state = self.state.borrow_mut();
        let id = FolderId(state.next_folder);
        state.next_folder += 1;

        let (pos, depth) = match parent.and_then(|p| state.folders.iter().position(|f| f.id == p)) {
            Some(idx) => {
                let depth = state.folders[idx].depth;
                let end = state.folders[idx + 1..]
                    .iter()
                    .position(|f| f.depth <= depth)
                    .map(|off| idx + 1 + off)
                    .unwrap_or(state.folders.len());
                (end, depth + 1)
            }
            None => (state.folders.len(), 0),
        };
        state.folders.insert(
            pos,
            FolderEntry {
                id,
                name: name.to_string(),
                kind,
                depth,
            },
        );
        id
    }

    /// Fixture helper: add a top-level item with wire values.
    pub fn add_item(&self, text: &str, values: &[(FolderId, &str)]) -> ItemId {
        let mut state = self.state.borrow_mut();
        let id = ItemId(state.next_item);
        state.next_item += 1;
        let mut entry = ItemEntry {
            id,
            text: text.to_string(),
            parent: None,
            children: Vec::new(),
            values: Vec::new(),
        };
        for (folder, value) in values {
            entry.set_value(*folder, value);
        }
        state.items.push(entry);
        state.roots.push(id);
        id
    }

    fn record(&self, call: &'static str) {
        tracing::debug!(call, "mem transport request");
        self.calls.borrow_mut().push(call);
    }

    fn check_write(&self, call: &'static str) -> Result<()> {
        self.record(call);
        if self.fail_writes.get() {
            return Err(EccoError::Transport(format!("simulated failure in {}", call)));
        }
        Ok(())
    }
}

impl Transport for MemTransport {
    fn create_item(&self, text: &str, values: &[(FolderId, String)]) -> Result<ItemId> {
        self.check_write("CreateItem")?;
        {
            let state = self.state.borrow();
            for (folder, _) in values {
                state.folder(*folder)?;
            }
        }
        let pairs: Vec<(FolderId, &str)> = values.iter().map(|(f, v)| (*f, v.as_str())).collect();
        Ok(self.add_item(text, &pairs))
    }

    fn get_item_text(&self, item: ItemId) -> Result<String> {
        self.record("GetItemText");
        Ok(self.state.borrow().item(item)?.text.clone())
    }

    fn set_item_text(&self, item: ItemId, text: &str) -> Result<()> {
        self.check_write("SetItemText")?;
        self.state.borrow_mut().item_mut(item)?.text = text.to_string();
        Ok(())
    }

    fn get_item_folders(&self, item: ItemId) -> Result<Vec<FolderId>> {
        self.record("GetItemFolders");
        let state = self.state.borrow();
        Ok(state.item(item)?.values.iter().map(|(f, _)| *f).collect())
    }

    fn get_folder_values(&self, item: ItemId, folders: &[FolderId]) -> Result<Vec<String>> {
        self.record("GetFolderValues");
        let state = self.state.borrow();
        let entry = state.item(item)?;
        Ok(folders.iter().map(|f| entry.value(*f).to_string()).collect())
    }

    fn set_folder_values(&self, item: ItemId, values: &[(FolderId, String)]) -> Result<()> {
        self.check_write("SetFolderValues")?;
        let mut state = self.state.borrow_mut();
        for (folder, _) in values {
            state.folder(*folder)?;
        }
        let entry = state.item_mut(item)?;
        for (folder, value) in values {
            entry.set_value(*folder, value);
        }
        Ok(())
    }

    fn get_item_parents(&self, item: ItemId) -> Result<Vec<ItemId>> {
        self.record("GetItemParents");
        self.state.borrow().ancestors(item)
    }

    fn insert_items(
        &self,
        target: Option<ItemId>,
        items: &[ItemId],
        level: InsertLevel,
    ) -> Result<()> {
        self.check_write("InsertItem")?;
        let mut state = self.state.borrow_mut();
        for &id in items {
            if let Some(t) = target {
                if t == id || state.ancestors(t)?.contains(&id) {
                    return Err(EccoError::Transport(format!(
                        "cannot insert item {} below itself",
                        id
                    )));
                }
            }
            state.detach(id)?;
            let (parent, index) = match (target, level) {
                (None, _) => (None, 0),
                (Some(t), InsertLevel::Child) => (Some(t), 0),
                (Some(t), InsertLevel::Same) => {
                    let parent = state.item(t)?.parent;
                    let siblings = state.siblings_mut(parent)?;
                    let index = siblings.iter().position(|s| *s == t).map_or(0, |i| i + 1);
                    (parent, index)
                }
            };
            state.siblings_mut(parent)?.insert(index, id);
            state.item_mut(id)?.parent = parent;
        }
        Ok(())
    }

    fn get_item_subs(&self, parent: ItemId, depth: u32) -> Result<Vec<(u32, ItemId)>> {
        self.record("GetItemSubs");
        let state = self.state.borrow();
        state.item(parent)?;
        let mut out = Vec::new();
        state.collect_subs(parent, 1, depth, &mut out);
        Ok(out)
    }

    fn get_folders_by_name(&self, name: &str) -> Result<Vec<FolderId>> {
        self.record("GetFoldersByName");
        let state = self.state.borrow();
        Ok(state
            .folders
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.id)
            .collect())
    }

    fn create_folder(&self, name: &str, kind: FolderType) -> Result<FolderId> {
        self.check_write("CreateFolder")?;
        Ok(self.add_folder(name, kind))
    }

    fn get_folder_name(&self, folder: FolderId) -> Result<String> {
        self.record("GetFolderName");
        Ok(self.state.borrow().folder(folder)?.name.clone())
    }

    fn get_folder_type(&self, folder: FolderId) -> Result<FolderType> {
        self.record("GetFolderType");
        Ok(self.state.borrow().folder(folder)?.kind)
    }

    fn get_folder_outline(&self) -> Result<Vec<(FolderId, u32)>> {
        self.record("GetFolderOutline");
        let state = self.state.borrow();
        Ok(state.folders.iter().map(|f| (f.id, f.depth)).collect())
    }

    fn get_folder_items(&self, folder: FolderId, criteria: &[Criterion]) -> Result<Vec<ItemId>> {
        self.record("GetFolderItems");
        let state = self.state.borrow();
        let kind = state.folder(folder)?.kind;

        let mut hits: Vec<&ItemEntry> = state
            .items
            .iter()
            .filter(|item| !item.value(folder).is_empty())
            .collect();

        for criterion in criteria {
            match criterion {
                Criterion::Gt(v) => hits.retain(|i| state.compare(kind, i.value(folder), v).is_gt()),
                Criterion::Ge(v) => hits.retain(|i| state.compare(kind, i.value(folder), v).is_ge()),
                Criterion::Lt(v) => hits.retain(|i| state.compare(kind, i.value(folder), v).is_lt()),
                Criterion::Le(v) => hits.retain(|i| state.compare(kind, i.value(folder), v).is_le()),
                Criterion::Eq(v) => hits.retain(|i| state.compare(kind, i.value(folder), v).is_eq()),
                Criterion::Ne(v) => hits.retain(|i| state.compare(kind, i.value(folder), v).is_ne()),
                Criterion::StartsWith(v) => hits.retain(|i| i.value(folder).starts_with(v.as_str())),
                Criterion::Contains(v) => hits.retain(|i| i.value(folder).contains(v.as_str())),
                Criterion::Lacks(v) => hits.retain(|i| !i.value(folder).contains(v.as_str())),
                Criterion::TextStartsWith(v) => hits.retain(|i| i.text.starts_with(v.as_str())),
                Criterion::TextContains(v) => hits.retain(|i| i.text.contains(v.as_str())),
                Criterion::TextLacks(v) => hits.retain(|i| !i.text.contains(v.as_str())),
                Criterion::Ascending => {
                    hits.sort_by(|a, b| state.compare(kind, a.value(folder), b.value(folder)))
                }
                Criterion::Descending => {
                    hits.sort_by(|a, b| state.compare(kind, b.value(folder), a.value(folder)))
                }
                Criterion::TextAscending => hits.sort_by(|a, b| a.text.cmp(&b.text)),
                Criterion::TextDescending => hits.sort_by(|a, b| b.text.cmp(&a.text)),
            }
        }

        Ok(hits.into_iter().map(|i| i.id).collect())
    }
}
