use crate::codec::Value;
use crate::commands::{access, Ctx};
use crate::error::Result;
use crate::model::Item;
use crate::transport::Transport;

/// Write several attributes of `item`.
///
/// Folder-backed values go out in a single `SetFolderValues`; text and link
/// attributes follow one by one. The item's class is not re-resolved.
pub fn run<T: Transport>(ctx: Ctx<'_, T>, item: Item, attrs: &[(String, Value)]) -> Result<()> {
    let split = ctx.split(item.class, attrs)?;
    if !split.folder_values.is_empty() {
        tracing::debug!(item = %item.id, folders = split.folder_values.len(), "updating folder values");
        ctx.transport.set_folder_values(item.id, &split.folder_values)?;
    }
    access::set_plain(ctx, item, &split.plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create;
    use crate::commands::fixtures::Fixture;
    use crate::error::EccoError;
    use crate::schema::attrs;
    use crate::transport::Transport;

    #[test]
    fn folder_values_go_out_in_one_call() {
        let fx = Fixture::new();
        let ada = create::run(fx.ctx(), fx.person, "Ada", &[]).unwrap();
        fx.host.clear_calls();

        run(
            fx.ctx(),
            ada,
            &attrs([
                ("email", Value::from("ada@example.org")),
                ("age", Value::from(37)),
                ("text", Value::from("Ada L.")),
            ]),
        )
        .unwrap();

        assert_eq!(fx.host.calls(), vec!["SetFolderValues", "SetItemText"]);
        assert_eq!(
            fx.host
                .get_folder_values(ada.id, &[fx.email_folder, fx.age_folder])
                .unwrap(),
            vec!["ada@example.org", "37"]
        );
        assert_eq!(fx.host.get_item_text(ada.id).unwrap(), "Ada L.");
    }

    #[test]
    fn unknown_attribute_writes_nothing() {
        let fx = Fixture::new();
        let ada = create::run(fx.ctx(), fx.person, "Ada", &[]).unwrap();
        fx.host.clear_calls();

        let err = run(fx.ctx(), ada, &attrs([("age", Value::from(1)), ("nope", Value::None)])).unwrap_err();
        assert!(matches!(err, EccoError::NoSuchAttribute { .. }));
        assert!(fx.host.calls().is_empty());
    }

    #[test]
    fn attributes_of_subclasses_are_not_visible_on_the_base() {
        let fx = Fixture::new();
        let acme = create::run(fx.ctx(), fx.company, "Acme", &[]).unwrap();
        let err = run(fx.ctx(), acme, &attrs([("age", 3)])).unwrap_err();
        assert!(matches!(err, EccoError::NoSuchAttribute { ref class, .. } if class == "Company"));
    }

    #[test]
    fn host_failures_propagate() {
        let fx = Fixture::new();
        let ada = create::run(fx.ctx(), fx.person, "Ada", &[]).unwrap();
        fx.host.set_fail_writes(true);
        let err = run(fx.ctx(), ada, &attrs([("age", 2)])).unwrap_err();
        assert!(matches!(err, EccoError::Transport(_)));
    }
}
