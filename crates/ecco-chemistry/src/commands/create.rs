use crate::codec::Value;
use crate::commands::{access, Ctx};
use crate::error::Result;
use crate::model::{ClassId, Item};
use crate::schema::Attrs;
use crate::transport::Transport;

/// Create a new outline item as an instance of `class`.
///
/// Class defaults are applied first and `attrs` override them. The concrete
/// class is resolved from the proposed values alone, before the host is
/// asked to create anything; no match is an error.
pub fn run<T: Transport>(
    ctx: Ctx<'_, T>,
    class: ClassId,
    text: &str,
    attrs: &[(String, Value)],
) -> Result<Item> {
    let mut merged: Attrs = ctx
        .schema
        .class(class)
        .default_values()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(attrs.iter().cloned());

    let split = ctx.split(class, &merged)?;
    let resolved = ctx
        .resolve(class, None, &split.folder_values, true)?
        .unwrap_or(class);

    let id = ctx.transport.create_item(text, &split.folder_values)?;
    tracing::info!(item = %id, class = ctx.schema.class(resolved).name(), "created item");

    let item = Item::new(id, resolved);
    access::set_plain(ctx, item, &split.plain)?;
    Ok(item)
}
