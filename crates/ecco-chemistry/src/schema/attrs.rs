//! Splitting caller-supplied attributes by how they reach the host.

use super::{Attribute, Schema};
use crate::codec::Value;
use crate::error::Result;
use crate::model::{ClassId, FolderId};

/// Named attribute values, in caller order. Later entries win.
pub type Attrs = Vec<(String, Value)>;

/// Build [`Attrs`] from anything pair-like.
pub fn attrs<K, V, I>(pairs: I) -> Attrs
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Attributes sorted into folder writes and everything else.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Split {
    /// Encoded folder values, ready for `CreateItem` / `SetFolderValues`.
    pub folder_values: Vec<(FolderId, String)>,
    /// The same folder values before encoding, for class resolution.
    pub proposed: Vec<(FolderId, Value)>,
    /// Text and link attributes, applied after the item exists.
    pub plain: Vec<(String, Value)>,
}

/// Sort `attrs` by accessor kind for `class`.
///
/// Fails on the first unknown name, before anything is encoded or sent.
pub fn split(schema: &Schema, class: ClassId, attrs: &[(String, Value)]) -> Result<Split> {
    let mut resolved = Vec::with_capacity(attrs.len());
    for (name, value) in attrs {
        resolved.push((name, schema.attribute(class, name)?, value));
    }

    let mut split = Split::default();
    for (name, attr, value) in resolved {
        match attr {
            Attribute::Folder(folder) => {
                let wire = schema.encode(folder, value)?;
                set_last(&mut split.folder_values, folder.id, wire);
                set_last(&mut split.proposed, folder.id, value.clone());
            }
            _ => {
                split.plain.retain(|(n, _)| n != name);
                split.plain.push((name.clone(), value.clone()));
            }
        }
    }
    Ok(split)
}

fn set_last<V>(entries: &mut Vec<(FolderId, V)>, folder: FolderId, value: V) {
    entries.retain(|(f, _)| *f != folder);
    entries.push((folder, value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FolderType;
    use crate::error::EccoError;
    use crate::registry::FolderRegistry;
    use crate::schema::ClassSpec;
    use crate::transport::memory::MemTransport;

    fn setup() -> (MemTransport, Schema, ClassId, FolderId) {
        let host = MemTransport::new();
        let done = host.add_folder("Done", FolderType::Checkmark);
        let mut folders = FolderRegistry::default();
        let mut schema = Schema::default();
        let task = schema
            .declare(&host, &mut folders, ClassSpec::new("Task").folder("done", "Done"))
            .unwrap();
        (host, schema, task, done)
    }

    #[test]
    fn folder_and_plain_attributes_are_separated() {
        let (_host, schema, task, done) = setup();
        let split = split(
            &schema,
            task,
            &attrs([("text", Value::from("buy milk")), ("done", Value::from(true))]),
        )
        .unwrap();

        assert_eq!(split.folder_values, vec![(done, "1".to_string())]);
        assert_eq!(split.proposed, vec![(done, Value::Bool(true))]);
        assert_eq!(split.plain, vec![("text".to_string(), Value::from("buy milk"))]);
    }

    #[test]
    fn later_values_override_earlier_ones() {
        let (_host, schema, task, done) = setup();
        let split = split(
            &schema,
            task,
            &attrs([("done", true), ("done", false)]),
        )
        .unwrap();
        assert_eq!(split.folder_values, vec![(done, String::new())]);
    }

    #[test]
    fn unknown_names_fail_before_any_host_call() {
        let (host, schema, task, _) = setup();
        host.clear_calls();
        let err = split(
            &schema,
            task,
            &attrs([("done", Value::from(true)), ("colour", Value::from("red"))]),
        )
        .unwrap_err();
        assert!(matches!(err, EccoError::NoSuchAttribute { ref name, .. } if name == "colour"));
        assert!(host.calls().is_empty());
    }
}
