//! # Subclass Resolution
//!
//! Given what an item holds (or is about to hold), find the most specific
//! declared class under a base class whose rules it satisfies.
//!
//! ## Observation
//!
//! [`observe`] builds the item's view in at most two host round-trips:
//!
//! 1. `GetItemFolders` for an existing item, filtered to bit-indexed folders.
//! 2. `GetFolderValues` for those folders (skipped when none are indexed).
//!
//! Proposed wire values are then layered on top: a non-empty value sets the
//! folder's bit, an empty one clears it.
//!
//! ## Walk
//!
//! Candidates start as `[base]`. At each level a candidate matches when
//!
//! - its folder mask is a subset of the item's mask,
//! - its exclusion mask does not intersect the item's mask,
//! - every required wire value is equal to the item's value,
//! - its validator (if any) accepts the decoded values.
//!
//! Two or more matches at one level is [`EccoError::AmbiguousClass`]; sibling
//! order never breaks the tie. A single match becomes the answer so far and
//! its direct subclasses become the next level. When a level matches nothing
//! the walk stops and returns the last match, failing with
//! [`EccoError::ClassNotResolved`] only if there is none and the caller
//! required one.

use std::collections::HashMap;

use crate::error::{EccoError, Result};
use crate::model::{ClassId, FolderId, ItemId};
use crate::registry::{FolderMask, FolderRegistry};
use crate::schema::{ItemClass, Schema};
use crate::transport::Transport;

/// An item's bit-indexed folder membership and wire values.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub mask: FolderMask,
    pub values: HashMap<FolderId, String>,
}

/// Collect the folder state relevant to resolution.
pub fn observe<T: Transport>(
    transport: &T,
    folders: &FolderRegistry,
    item: Option<ItemId>,
    proposed: &[(FolderId, String)],
) -> Result<Observation> {
    let bits = folders.bits();
    let mut obs = Observation::default();

    if let Some(item) = item {
        let held: Vec<FolderId> = transport
            .get_item_folders(item)?
            .into_iter()
            .filter(|f| bits.get(*f).is_some())
            .collect();
        if !held.is_empty() {
            let values = transport.get_folder_values(item, &held)?;
            obs.mask = bits.mask_of(&held);
            obs.values = held.into_iter().zip(values).collect();
        }
    }

    for (folder, wire) in proposed {
        if let Some(bit) = bits.get(*folder) {
            if wire.is_empty() {
                obs.mask.remove(bit);
            } else {
                obs.mask.insert(bit);
            }
        }
        obs.values.insert(*folder, wire.clone());
    }
    Ok(obs)
}

/// Observe `item` and walk the class tree under `base`.
pub fn resolve<T: Transport>(
    transport: &T,
    schema: &Schema,
    folders: &FolderRegistry,
    base: ClassId,
    item: Option<ItemId>,
    proposed: &[(FolderId, String)],
    required: bool,
) -> Result<Option<ClassId>> {
    let obs = observe(transport, folders, item, proposed)?;
    find_item_class(schema, base, item, &obs, required)
}

/// The level walk over an existing observation.
pub fn find_item_class(
    schema: &Schema,
    base: ClassId,
    item: Option<ItemId>,
    obs: &Observation,
    required: bool,
) -> Result<Option<ClassId>> {
    let mut found = None;
    let mut candidates = vec![base];

    loop {
        let mut matches = Vec::new();
        for id in &candidates {
            if accepts(schema.class(*id), obs)? {
                matches.push(*id);
            }
        }

        match matches.as_slice() {
            [] => break,
            [one] => {
                tracing::debug!(item = ?item, class = schema.class(*one).name(), "class matched");
                found = Some(*one);
                candidates = schema.class(*one).subclasses().to_vec();
            }
            several => {
                return Err(EccoError::AmbiguousClass {
                    item,
                    classes: several
                        .iter()
                        .map(|c| schema.class(*c).name().to_string())
                        .collect(),
                })
            }
        }
    }

    if found.is_none() && required {
        return Err(EccoError::ClassNotResolved {
            class: schema.class(base).name().to_string(),
            item,
        });
    }
    Ok(found)
}

fn accepts(class: &ItemClass, obs: &Observation) -> Result<bool> {
    if !class.folder_mask().is_subset(&obs.mask) || class.exclusion_mask().intersects(&obs.mask) {
        return Ok(false);
    }
    let values_match = class.required_wire().iter().all(|(folder, wanted)| match wanted {
        Some(wire) => obs.values.get(folder) == Some(wire),
        None => true,
    });
    if !values_match {
        return Ok(false);
    }
    class.check_fields(&obs.values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FolderType;
    use crate::schema::ClassSpec;
    use crate::transport::memory::MemTransport;

    struct Fixture {
        host: MemTransport,
        folders: FolderRegistry,
        schema: Schema,
        status: FolderId,
        flag: FolderId,
    }

    impl Fixture {
        fn new() -> Self {
            let host = MemTransport::new();
            let status = host.add_folder("Status", FolderType::PopupList);
            let flag = host.add_folder("Flag", FolderType::Checkmark);
            host.add_folder("Notes", FolderType::Text);
            Self {
                host,
                folders: FolderRegistry::default(),
                schema: Schema::default(),
                status,
                flag,
            }
        }

        fn declare(&mut self, spec: ClassSpec) -> ClassId {
            self.schema
                .declare(&self.host, &mut self.folders, spec)
                .unwrap()
        }

        fn resolve(&self, base: ClassId, item: Option<ItemId>, proposed: &[(FolderId, &str)], required: bool) -> Result<Option<ClassId>> {
            let proposed: Vec<_> = proposed.iter().map(|(f, v)| (*f, v.to_string())).collect();
            resolve(&self.host, &self.schema, &self.folders, base, item, &proposed, required)
        }
    }

    #[test]
    fn plain_item_resolves_to_base() {
        let fx = Fixture::new();
        let id = fx.host.add_item("anything", &[]);
        assert_eq!(fx.resolve(ClassId::ITEM, Some(id), &[], true).unwrap(), Some(ClassId::ITEM));
    }

    #[test]
    fn present_and_absent_rules_pick_one_sibling() {
        let mut fx = Fixture::new();
        let task = fx.declare(ClassSpec::new("Task").folder("status", "Status"));
        let open = fx.declare(
            ClassSpec::new("Open")
                .extends(task)
                .require("status", "open"),
        );
        let unfiled = fx.declare(
            ClassSpec::new("Unfiled")
                .extends(task)
                .exclude("status"),
        );

        let a = fx.host.add_item("a", &[(fx.status, "open")]);
        let b = fx.host.add_item("b", &[]);
        assert_eq!(fx.resolve(task, Some(a), &[], true).unwrap(), Some(open));
        assert_eq!(fx.resolve(task, Some(b), &[], true).unwrap(), Some(unfiled));
    }

    #[test]
    fn overlapping_siblings_are_ambiguous() {
        let mut fx = Fixture::new();
        let base = fx.declare(
            ClassSpec::new("Base")
                .folder("status", "Status")
                .folder("flag", "Flag"),
        );
        fx.declare(ClassSpec::new("Flagged").extends(base).require("flag", true));
        fx.declare(ClassSpec::new("Done").extends(base).require("status", "done"));

        let id = fx.host.add_item("x", &[(fx.status, "done"), (fx.flag, "1")]);
        let err = fx.resolve(base, Some(id), &[], false).unwrap_err();
        match err {
            EccoError::AmbiguousClass { item, classes } => {
                assert_eq!(item, Some(id));
                assert_eq!(classes, vec!["Flagged".to_string(), "Done".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn walk_descends_through_levels() {
        let mut fx = Fixture::new();
        let task = fx.declare(ClassSpec::new("Task").folder("flag", "Flag").require("flag", true));
        let tracked = fx.declare(
            ClassSpec::new("Tracked")
                .extends(task)
                .folder("status", "Status")
                .require_present("status"),
        );
        let done = fx.declare(ClassSpec::new("Done").extends(tracked).require("status", "done"));

        let id = fx.host.add_item("x", &[(fx.flag, "1"), (fx.status, "done")]);
        assert_eq!(fx.resolve(ClassId::ITEM, Some(id), &[], false).unwrap(), Some(done));

        let other = fx.host.add_item("y", &[(fx.flag, "1"), (fx.status, "later")]);
        assert_eq!(fx.resolve(ClassId::ITEM, Some(other), &[], false).unwrap(), Some(tracked));
    }

    #[test]
    fn no_match_fails_only_when_required() {
        let mut fx = Fixture::new();
        let flagged = fx.declare(ClassSpec::new("Flagged").folder("flag", "Flag").require("flag", true));
        let id = fx.host.add_item("x", &[]);

        assert_eq!(fx.resolve(flagged, Some(id), &[], false).unwrap(), None);
        assert!(matches!(
            fx.resolve(flagged, Some(id), &[], true).unwrap_err(),
            EccoError::ClassNotResolved { .. }
        ));
    }

    #[test]
    fn proposed_values_override_host_state() {
        let mut fx = Fixture::new();
        let base = fx.declare(ClassSpec::new("Base").folder("flag", "Flag"));
        let flagged = fx.declare(ClassSpec::new("Flagged").extends(base).require("flag", true));
        let plain = fx.declare(ClassSpec::new("Plain").extends(base).exclude("flag"));

        let id = fx.host.add_item("x", &[(fx.flag, "1")]);
        assert_eq!(fx.resolve(base, Some(id), &[], true).unwrap(), Some(flagged));
        assert_eq!(fx.resolve(base, Some(id), &[(fx.flag, "")], true).unwrap(), Some(plain));
        assert_eq!(fx.resolve(base, None, &[(fx.flag, "1")], true).unwrap(), Some(flagged));
    }

    #[test]
    fn unindexed_folders_are_not_fetched() {
        let fx = Fixture::new();
        let id = fx.host.add_item("x", &[(fx.status, "open")]);
        fx.host.clear_calls();
        fx.resolve(ClassId::ITEM, Some(id), &[], false).unwrap();
        assert_eq!(fx.host.calls(), vec!["GetItemFolders"]);
    }

    #[test]
    fn validator_rejects_values() {
        let mut fx = Fixture::new();
        let base = fx.declare(ClassSpec::new("Base").folder("status", "Status"));
        let urgent = fx.declare(
            ClassSpec::new("Urgent")
                .extends(base)
                .validate(&["status"], |v| v[0].as_text().is_some_and(|s| s.starts_with('!'))),
        );

        let yes = fx.host.add_item("a", &[(fx.status, "!now")]);
        let no = fx.host.add_item("b", &[(fx.status, "later")]);
        assert_eq!(fx.resolve(base, Some(yes), &[], false).unwrap(), Some(urgent));
        assert_eq!(fx.resolve(base, Some(no), &[], false).unwrap(), Some(base));
    }
}
