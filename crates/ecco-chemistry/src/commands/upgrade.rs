use crate::codec::Value;
use crate::commands::{wrap, Ctx};
use crate::error::Result;
use crate::model::{ClassId, Item, ItemId};
use crate::schema::{Attribute, Attrs};
use crate::transport::Transport;

/// Move an existing item into `class`.
///
/// The class's defaults are proposed for every folder the item does not
/// already hold, explicit `attrs` override them, and the result is wrapped
/// (and resolved) as `class`. Values the item already has are kept.
pub fn run<T: Transport>(
    ctx: Ctx<'_, T>,
    class: ClassId,
    id: ItemId,
    attrs: &[(String, Value)],
) -> Result<Item> {
    let held = ctx.transport.get_item_folders(id)?;
    let target = ctx.schema.class(class);

    let mut merged: Attrs = target
        .default_values()
        .iter()
        .filter(|(name, _)| match target.attribute(name) {
            Some(Attribute::Folder(folder)) => !held.contains(&folder.id),
            _ => true,
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(attrs.iter().cloned());

    tracing::debug!(item = %id, class = target.name(), defaults = merged.len(), "upgrading item");
    wrap::run(ctx, class, id, &merged)
}
