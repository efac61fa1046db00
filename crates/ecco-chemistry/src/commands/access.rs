//! Single attribute reads and writes.
//!
//! Attribute names dispatch on the class's [`Attribute`] kind:
//!
//! | Kind | Read | Write |
//! |------|------|-------|
//! | `Folder` | `GetFolderValues` + decode | encode + `SetFolderValues` |
//! | `Text` | `GetItemText` | `SetItemText` |
//! | `Parent` | `Value::Ref` / `Value::None` | relink (type-checked) |
//! | `Children` | `Value::Refs` | replace all direct children |
//!
//! A link attribute without a class links items of the owner's own class.

use crate::codec::Value;
use crate::commands::{links, Ctx};
use crate::error::{EccoError, Result};
use crate::model::{ClassId, Folder, Item, ItemId};
use crate::schema::Attribute;
use crate::transport::Transport;

pub fn get<T: Transport>(ctx: Ctx<'_, T>, item: Item, name: &str) -> Result<Value> {
    match ctx.schema.attribute(item.class, name)? {
        Attribute::Folder(folder) => get_value(ctx, item.id, folder),
        Attribute::Text => Ok(Value::Text(text(ctx, item.id)?)),
        Attribute::Parent { class } => Ok(links::parent(ctx, item.id, link_class(item, *class))?
            .map(|p| Value::Ref(p.id))
            .unwrap_or(Value::None)),
        Attribute::Children { class, depth } => {
            let ids = links::children(ctx, item.id, link_class(item, *class), *depth)
                .iter()
                .map(|r| r.map(|i| i.id))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Refs(ids))
        }
    }
}

pub fn set<T: Transport>(ctx: Ctx<'_, T>, item: Item, name: &str, value: &Value) -> Result<()> {
    match ctx.schema.attribute(item.class, name)? {
        Attribute::Folder(folder) => set_value(ctx, item.id, folder, value),
        Attribute::Text => match value {
            Value::Text(s) => set_text(ctx, item.id, s),
            Value::None => set_text(ctx, item.id, ""),
            other => Err(invalid(name, other)),
        },
        Attribute::Parent { class } => {
            let class = link_class(item, *class);
            match value {
                Value::Ref(parent) => links::set_parent(ctx, item.id, class, Some(*parent)),
                Value::None => links::set_parent(ctx, item.id, class, None),
                other => Err(invalid(name, other)),
            }
        }
        Attribute::Children { class, depth } => {
            let kids = links::children(ctx, item.id, link_class(item, *class), *depth);
            match value {
                Value::Refs(ids) => kids.replace(ids),
                Value::Ref(id) => kids.replace(&[*id]),
                Value::None => kids.clear(),
                other => Err(invalid(name, other)),
            }
        }
    }
}

/// Reset an attribute: empty folder value, empty text, top-level, no children.
pub fn clear<T: Transport>(ctx: Ctx<'_, T>, item: Item, name: &str) -> Result<()> {
    set(ctx, item, name, &Value::None)
}

/// Apply non-folder attributes one by one, in order.
pub(crate) fn set_plain<T: Transport>(
    ctx: Ctx<'_, T>,
    item: Item,
    plain: &[(String, Value)],
) -> Result<()> {
    for (name, value) in plain {
        set(ctx, item, name, value)?;
    }
    Ok(())
}

pub fn text<T: Transport>(ctx: Ctx<'_, T>, item: ItemId) -> Result<String> {
    ctx.transport.get_item_text(item)
}

pub fn set_text<T: Transport>(ctx: Ctx<'_, T>, item: ItemId, text: &str) -> Result<()> {
    ctx.transport.set_item_text(item, text)
}

pub fn get_value<T: Transport>(ctx: Ctx<'_, T>, item: ItemId, folder: &Folder) -> Result<Value> {
    let values = ctx.transport.get_folder_values(item, &[folder.id])?;
    folder
        .kind
        .decode(values.first().map(String::as_str).unwrap_or(""))
}

pub fn set_value<T: Transport>(
    ctx: Ctx<'_, T>,
    item: ItemId,
    folder: &Folder,
    value: &Value,
) -> Result<()> {
    let wire = ctx.schema.encode(folder, value)?;
    ctx.transport.set_folder_values(item, &[(folder.id, wire)])
}

pub fn clear_value<T: Transport>(ctx: Ctx<'_, T>, item: ItemId, folder: &Folder) -> Result<()> {
    ctx.transport.set_folder_values(item, &[(folder.id, String::new())])
}

/// True if the item holds a non-empty value in `folder`.
pub fn in_folder<T: Transport>(ctx: Ctx<'_, T>, item: ItemId, folder: &Folder) -> Result<bool> {
    Ok(ctx.transport.get_item_folders(item)?.contains(&folder.id))
}

/// Links that name no class are typed as the owning item's class.
fn link_class(owner: Item, class: Option<ClassId>) -> Option<ClassId> {
    class.or(Some(owner.class))
}

fn invalid(attr: &str, value: &Value) -> EccoError {
    EccoError::InvalidValue {
        attr: attr.to_string(),
        value: value.to_string(),
    }
}
