//! Parent and children links.
//!
//! Links are outline structure, not folder values: reads go through
//! `GetItemParents` / `GetItemSubs`, writes through `InsertItem`. A link
//! attribute may name a class; reads resolve linked items under it (skipping
//! items it does not match) and writes refuse items it does not match.
//! Passing no class here leaves the link untyped; attribute access fills in
//! the owner's class first.

use crate::commands::Ctx;
use crate::error::{EccoError, Result};
use crate::model::{ClassId, Item, ItemId};
use crate::query::Items;
use crate::transport::{InsertLevel, Transport};

/// The direct parent of `item`, if it has one that matches `class`.
pub fn parent<T: Transport>(
    ctx: Ctx<'_, T>,
    item: ItemId,
    class: Option<ClassId>,
) -> Result<Option<Item>> {
    let parents = ctx.transport.get_item_parents(item)?;
    let Some(direct) = parents.last().copied() else {
        return Ok(None);
    };
    let base = class.unwrap_or(ClassId::ITEM);
    Ok(ctx
        .resolve(base, Some(direct), &[], false)?
        .map(|c| Item::new(direct, c)))
}

/// Move `item` under `parent` as its first child, or to the top level.
pub fn set_parent<T: Transport>(
    ctx: Ctx<'_, T>,
    item: ItemId,
    class: Option<ClassId>,
    parent: Option<ItemId>,
) -> Result<()> {
    match parent {
        Some(parent) => {
            if let Some(class) = class {
                ensure_class(ctx, class, parent)?;
            }
            ctx.transport
                .insert_items(Some(parent), &[item], InsertLevel::Child)
        }
        None => ctx.transport.insert_items(None, &[item], InsertLevel::Child),
    }
}

/// Fail with [`EccoError::WrongItemClass`] unless `id` resolves under `class`.
pub(crate) fn ensure_class<T: Transport>(ctx: Ctx<'_, T>, class: ClassId, id: ItemId) -> Result<()> {
    if class == ClassId::ITEM || ctx.resolve(class, Some(id), &[], false)?.is_some() {
        return Ok(());
    }
    Err(EccoError::WrongItemClass {
        expected: ctx.schema.class(class).name().to_string(),
        item: id,
    })
}

pub fn children<T: Transport>(
    ctx: Ctx<'_, T>,
    parent: ItemId,
    class: Option<ClassId>,
    depth: u32,
) -> Children<'_, T> {
    Children {
        ctx,
        parent,
        class: class.unwrap_or(ClassId::ITEM),
        depth,
    }
}

/// Live view of an item's sub-items. Nothing is cached; every call asks the
/// host.
pub struct Children<'a, T: Transport> {
    ctx: Ctx<'a, T>,
    parent: ItemId,
    class: ClassId,
    depth: u32,
}

impl<'a, T: Transport> Children<'a, T> {
    pub fn parent(&self) -> ItemId {
        self.parent
    }

    /// How far down the view reaches; `0` is unlimited.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Sub-items in outline order, resolved under the view's class.
    pub fn iter(&self) -> Items<'a, T> {
        Items::subs(self.ctx, self.class, self.parent, self.depth)
    }

    pub fn to_vec(&self) -> Result<Vec<Item>> {
        self.iter().collect()
    }

    pub fn len(&self) -> Result<usize> {
        self.iter().try_fold(0, |n, item| item.map(|_| n + 1))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.iter().next().transpose()?.is_none())
    }

    /// True if `item` is of the view's class and sits within its depth.
    pub fn contains(&self, item: &Item) -> Result<bool> {
        if !self.ctx.schema.is_subclass(item.class, self.class) {
            return Ok(false);
        }
        let parents = self.ctx.transport.get_item_parents(item.id)?;
        Ok(match self.depth {
            0 => parents.contains(&self.parent),
            depth => parents
                .iter()
                .rev()
                .take(depth as usize)
                .any(|p| *p == self.parent),
        })
    }

    /// Move `items` to the end of the direct children, keeping their order.
    pub fn extend(&self, items: &[ItemId]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let reversed: Vec<ItemId> = items.iter().rev().copied().collect();
        let subs = self.ctx.transport.get_item_subs(self.parent, 1)?;
        match subs.last() {
            Some((_, last)) => self
                .ctx
                .transport
                .insert_items(Some(*last), &reversed, InsertLevel::Same),
            None => self
                .ctx
                .transport
                .insert_items(Some(self.parent), &reversed, InsertLevel::Child),
        }
    }

    pub fn append(&self, item: ItemId) -> Result<()> {
        self.extend(&[item])
    }

    /// Move `item` to the front of the direct children.
    pub fn prepend(&self, item: ItemId) -> Result<()> {
        self.ctx
            .transport
            .insert_items(Some(self.parent), &[item], InsertLevel::Child)
    }

    /// Make `items` the direct children of the view's class.
    ///
    /// Current children of the class move to the top level. Every new item is
    /// checked against the class before anything moves.
    pub fn replace(&self, items: &[ItemId]) -> Result<()> {
        let incoming: Vec<ItemId> = items
            .iter()
            .rev()
            .copied()
            .filter(|id| *id != self.parent)
            .collect();
        for id in &incoming {
            ensure_class(self.ctx, self.class, *id)?;
        }

        let current = Items::subs(self.ctx, self.class, self.parent, 1)
            .map(|r| r.map(|i| i.id))
            .collect::<Result<Vec<_>>>()?;
        if !current.is_empty() {
            self.ctx
                .transport
                .insert_items(None, &current, InsertLevel::Child)?;
        }
        if !incoming.is_empty() {
            self.ctx
                .transport
                .insert_items(Some(self.parent), &incoming, InsertLevel::Child)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.replace(&[])
    }
}

impl<'a, T: Transport> IntoIterator for &Children<'a, T> {
    type Item = Result<Item>;
    type IntoIter = Items<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
