use crate::codec::Value;
use crate::commands::{access, Ctx};
use crate::error::Result;
use crate::model::{ClassId, Item, ItemId};
use crate::transport::Transport;

/// View an existing item as its most specific class under `class`.
///
/// Any `attrs` are written to the item. Resolution sees the item's current
/// host state with the proposed values layered on top, so wrapping can move
/// an item into a subclass. An item no class under `class` accepts is an
/// error.
pub fn run<T: Transport>(
    ctx: Ctx<'_, T>,
    class: ClassId,
    id: ItemId,
    attrs: &[(String, Value)],
) -> Result<Item> {
    let split = ctx.split(class, attrs)?;
    let resolved = ctx
        .resolve(class, Some(id), &split.folder_values, true)?
        .unwrap_or(class);

    if !split.folder_values.is_empty() {
        ctx.transport.set_folder_values(id, &split.folder_values)?;
    }
    let item = Item::new(id, resolved);
    access::set_plain(ctx, item, &split.plain)?;
    Ok(item)
}

/// Wrap without resolution, for ids already known to belong to `class`.
pub fn wrap_as(id: ItemId, class: ClassId) -> Item {
    Item::new(id, class)
}
