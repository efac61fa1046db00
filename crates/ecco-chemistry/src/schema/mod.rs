//! # Item Classes
//!
//! A [`Schema`] is the explicit registry of item classes. Each class is
//! declared with a [`ClassSpec`] naming its parent class, its attributes and
//! the folder rules an item must satisfy to count as an instance.
//!
//! ## Attributes
//!
//! Every class carries a name → [`Attribute`] map, inherited from its parent
//! and extended by its own declaration:
//!
//! | Attribute | Backed by |
//! |-----------|-----------|
//! | `Folder` | a folder value, through the codec |
//! | `Text` | the item's outline text |
//! | `Parent` | the item's direct parent in the outline |
//! | `Children` | the item's sub-items, to a depth (0 = all) |
//!
//! The root class `Item` ([`ClassId::ITEM`]) defines `text`, `parent`,
//! `children` and `all_children`.
//!
//! ## Rules
//!
//! `required_values` maps folder attributes to:
//!
//! - a value: the item must hold exactly that (encoded) value;
//! - `Value::None`: the item must hold some value;
//! - `Value::Bool(false)`: the item must *not* be in the folder.
//!
//! Required values double as creation defaults (an exclusion defaults to an
//! empty value), and the first `Bool(true)` requirement, in declaration
//! order, makes that folder the class's container when none is declared or
//! inherited. A checkmark container defaults to set.
//!
//! A class may also carry a validator: a predicate over the decoded values of
//! named folder attributes, run after the structural rules pass.
//!
//! On declaration the rules compile to a required [`FolderMask`], an
//! exclusion mask and a folder → wire value map, ready for
//! [`crate::resolve`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::codec::{FolderType, Value};
use crate::error::{EccoError, Result};
use crate::model::{ClassId, Folder, FolderId, FolderRef};
use crate::registry::{FolderMask, FolderRegistry};
use crate::transport::Transport;

mod attrs;

pub use attrs::{attrs, split, Attrs, Split};

/// Predicate over decoded attribute values, in declaration order.
pub type Validator = Rc<dyn Fn(&[Value]) -> bool>;

/// Accessor behind a class attribute name.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Folder(Folder),
    Text,
    /// `class: None` resolves the parent as the owning class.
    Parent { class: Option<ClassId> },
    Children { class: Option<ClassId>, depth: u32 },
}

impl Attribute {
    pub fn folder(&self) -> Option<&Folder> {
        match self {
            Attribute::Folder(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum AttrDecl {
    Folder {
        folder: FolderRef,
        kind: Option<FolderType>,
        create: bool,
    },
    Ready(Attribute),
}

/// Declaration of an item class, consumed by [`Schema::declare`].
pub struct ClassSpec {
    name: String,
    parent: ClassId,
    attributes: Vec<(String, AttrDecl)>,
    required: Vec<(String, Value)>,
    defaults: Vec<(String, Value)>,
    container: Option<String>,
    validator: Option<(Vec<String>, Validator)>,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: ClassId::ITEM,
            attributes: Vec::new(),
            required: Vec::new(),
            defaults: Vec::new(),
            container: None,
            validator: None,
        }
    }

    pub fn extends(mut self, parent: ClassId) -> Self {
        self.parent = parent;
        self
    }

    /// Folder attribute of whatever type the host reports.
    pub fn folder(self, attr: impl Into<String>, folder: impl Into<FolderRef>) -> Self {
        self.folder_decl(attr, folder.into(), None, false)
    }

    /// Folder attribute that must have type `kind`.
    pub fn typed_folder(
        self,
        attr: impl Into<String>,
        folder: impl Into<FolderRef>,
        kind: FolderType,
    ) -> Self {
        self.folder_decl(attr, folder.into(), Some(kind), false)
    }

    /// Folder attribute created on the host if no folder has that name yet.
    pub fn new_folder(self, attr: impl Into<String>, name: impl Into<String>, kind: FolderType) -> Self {
        self.folder_decl(attr, FolderRef::Name(name.into()), Some(kind), true)
    }

    fn folder_decl(
        mut self,
        attr: impl Into<String>,
        folder: FolderRef,
        kind: Option<FolderType>,
        create: bool,
    ) -> Self {
        self.attributes.push((
            attr.into(),
            AttrDecl::Folder {
                folder,
                kind,
                create,
            },
        ));
        self
    }

    pub fn text_attr(mut self, attr: impl Into<String>) -> Self {
        self.attributes
            .push((attr.into(), AttrDecl::Ready(Attribute::Text)));
        self
    }

    pub fn parent_attr(mut self, attr: impl Into<String>, class: Option<ClassId>) -> Self {
        self.attributes
            .push((attr.into(), AttrDecl::Ready(Attribute::Parent { class })));
        self
    }

    pub fn children_attr(mut self, attr: impl Into<String>, class: Option<ClassId>, depth: u32) -> Self {
        self.attributes.push((
            attr.into(),
            AttrDecl::Ready(Attribute::Children { class, depth }),
        ));
        self
    }

    pub fn require(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.required.push((attr.into(), value.into()));
        self
    }

    /// The item must hold some value in this folder.
    pub fn require_present(self, attr: impl Into<String>) -> Self {
        self.require(attr, Value::None)
    }

    /// The item must not be in this folder.
    pub fn exclude(self, attr: impl Into<String>) -> Self {
        self.require(attr, false)
    }

    pub fn default_value(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.push((attr.into(), value.into()));
        self
    }

    /// Folder attribute whose items are this class's instances.
    pub fn container(mut self, attr: impl Into<String>) -> Self {
        self.container = Some(attr.into());
        self
    }

    pub fn validate<F>(mut self, fields: &[&str], check: F) -> Self
    where
        F: Fn(&[Value]) -> bool + 'static,
    {
        let fields = fields.iter().map(|f| f.to_string()).collect();
        self.validator = Some((fields, Rc::new(check)));
        self
    }
}

/// A declared, compiled item class.
pub struct ItemClass {
    name: String,
    parent: Option<ClassId>,
    subclasses: Vec<ClassId>,
    attributes: BTreeMap<String, Attribute>,
    required_values: BTreeMap<String, Value>,
    default_values: BTreeMap<String, Value>,
    container_attr: Option<String>,
    container: Option<Folder>,
    validator_decl: Option<(Vec<String>, Validator)>,
    validator: Option<(Vec<Folder>, Validator)>,
    required: BTreeMap<FolderId, Option<String>>,
    folder_mask: FolderMask,
    exclusion_mask: FolderMask,
}

impl fmt::Debug for ItemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemClass")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("subclasses", &self.subclasses)
            .field("required", &self.required)
            .field("container", &self.container)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

impl ItemClass {
    fn root() -> Self {
        let attributes = [
            ("text", Attribute::Text),
            ("parent", Attribute::Parent { class: None }),
            ("children", Attribute::Children { class: None, depth: 1 }),
            ("all_children", Attribute::Children { class: None, depth: 0 }),
        ]
        .into_iter()
        .map(|(name, attr)| (name.to_string(), attr))
        .collect();

        Self {
            name: "Item".to_string(),
            parent: None,
            subclasses: Vec::new(),
            attributes,
            required_values: BTreeMap::new(),
            default_values: BTreeMap::new(),
            container_attr: None,
            container: None,
            validator_decl: None,
            validator: None,
            required: BTreeMap::new(),
            folder_mask: FolderMask::new(),
            exclusion_mask: FolderMask::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    /// Directly declared subclasses, in declaration order.
    pub fn subclasses(&self) -> &[ClassId] {
        &self.subclasses
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn required_values(&self) -> &BTreeMap<String, Value> {
        &self.required_values
    }

    pub fn default_values(&self) -> &BTreeMap<String, Value> {
        &self.default_values
    }

    pub fn container(&self) -> Option<&Folder> {
        self.container.as_ref()
    }

    /// Required wire value per folder; `None` accepts any value.
    pub fn required_wire(&self) -> &BTreeMap<FolderId, Option<String>> {
        &self.required
    }

    pub fn folder_mask(&self) -> &FolderMask {
        &self.folder_mask
    }

    pub fn exclusion_mask(&self) -> &FolderMask {
        &self.exclusion_mask
    }

    /// Run the validator over wire values; classes without one pass.
    pub(crate) fn check_fields(&self, values: &HashMap<FolderId, String>) -> Result<bool> {
        let Some((fields, check)) = &self.validator else {
            return Ok(true);
        };
        let decoded = fields
            .iter()
            .map(|f| f.kind.decode(values.get(&f.id).map(String::as_str).unwrap_or("")))
            .collect::<Result<Vec<_>>>()?;
        Ok(check(&decoded))
    }
}

/// Registry of item classes.
#[derive(Debug)]
pub struct Schema {
    classes: Vec<ItemClass>,
    checkmark: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(crate::codec::DEFAULT_CHECKMARK)
    }
}

impl Schema {
    pub fn new(checkmark: impl Into<String>) -> Self {
        Self {
            classes: vec![ItemClass::root()],
            checkmark: checkmark.into(),
        }
    }

    pub fn class(&self, id: ClassId) -> &ItemClass {
        &self.classes[id.0]
    }

    pub fn find(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .map(ClassId)
    }

    /// True if `class` is `of` or declared somewhere below it.
    pub fn is_subclass(&self, class: ClassId, of: ClassId) -> bool {
        let mut current = Some(class);
        while let Some(c) = current {
            if c == of {
                return true;
            }
            current = self.class(c).parent;
        }
        false
    }

    pub fn attribute(&self, class: ClassId, name: &str) -> Result<&Attribute> {
        self.class(class)
            .attribute(name)
            .ok_or_else(|| EccoError::NoSuchAttribute {
                class: self.class(class).name.clone(),
                name: name.to_string(),
            })
    }

    pub fn checkmark(&self) -> &str {
        &self.checkmark
    }

    pub fn encode(&self, folder: &Folder, value: &Value) -> Result<String> {
        folder.kind.encode_with(value, &self.checkmark)
    }

    /// Compile and register a class, resolving its folders on the host.
    pub fn declare<T: Transport>(
        &mut self,
        transport: &T,
        folders: &mut FolderRegistry,
        spec: ClassSpec,
    ) -> Result<ClassId> {
        if self.find(&spec.name).is_some() {
            return Err(EccoError::InvalidClass(format!(
                "a class named {} already exists",
                spec.name
            )));
        }
        let parent = self
            .classes
            .get(spec.parent.0)
            .ok_or_else(|| EccoError::InvalidClass(format!("{}: unknown parent class", spec.name)))?;

        let mut attributes = parent.attributes.clone();
        for (name, decl) in spec.attributes {
            let attr = match decl {
                AttrDecl::Folder {
                    folder,
                    kind,
                    create,
                } => Attribute::Folder(folders.lookup(transport, &folder, kind, create)?),
                AttrDecl::Ready(attr) => attr,
            };
            attributes.insert(name, attr);
        }

        let mut required = parent.required_values.clone();
        required.extend(spec.required.iter().cloned());

        let mut defaults = parent.default_values.clone();
        for (name, value) in &spec.required {
            match value {
                Value::None => {}
                Value::Bool(false) => {
                    defaults.insert(name.clone(), Value::None);
                }
                other => {
                    defaults.insert(name.clone(), other.clone());
                }
            }
        }
        defaults.extend(spec.defaults);

        let container_attr = spec
            .container
            .or_else(|| parent.container_attr.clone())
            .or_else(|| {
                spec.required
                    .iter()
                    .find(|(_, v)| *v == Value::Bool(true))
                    .map(|(k, _)| k.clone())
            });
        let container = match &container_attr {
            Some(attr) => {
                let folder = folder_attr(&spec.name, &attributes, attr)?.clone();
                required.entry(attr.clone()).or_insert(Value::None);
                if folder.kind == FolderType::Checkmark {
                    defaults.entry(attr.clone()).or_insert(Value::Bool(true));
                }
                Some(folder)
            }
            None => None,
        };

        let bits = folders.bits_mut();
        let mut rules = BTreeMap::new();
        let mut folder_mask = FolderMask::new();
        let mut exclusion_mask = FolderMask::new();
        for (name, value) in &required {
            let folder = folder_attr(&spec.name, &attributes, name)?;
            let bit = bits.assign(folder.id);
            match value {
                Value::Bool(false) => exclusion_mask.insert(bit),
                Value::None => {
                    folder_mask.insert(bit);
                    rules.insert(folder.id, None);
                }
                other => {
                    folder_mask.insert(bit);
                    rules.insert(folder.id, Some(self.encode(folder, other)?));
                }
            }
        }

        let validator_decl = spec.validator.or_else(|| parent.validator_decl.clone());
        let validator = match &validator_decl {
            Some((fields, check)) => {
                let mut resolved = Vec::with_capacity(fields.len());
                for field in fields {
                    let folder = folder_attr(&spec.name, &attributes, field)?;
                    // values of validated folders must be fetched during resolution
                    bits.assign(folder.id);
                    resolved.push(folder.clone());
                }
                Some((resolved, Rc::clone(check)))
            }
            None => None,
        };

        let id = ClassId(self.classes.len());
        tracing::info!(class = %spec.name, parent = %parent.name, rules = rules.len(), "declared item class");
        self.classes.push(ItemClass {
            name: spec.name,
            parent: Some(spec.parent),
            subclasses: Vec::new(),
            attributes,
            required_values: required,
            default_values: defaults,
            container_attr,
            container,
            validator_decl,
            validator,
            required: rules,
            folder_mask,
            exclusion_mask,
        });
        self.classes[spec.parent.0].subclasses.push(id);
        Ok(id)
    }
}

fn folder_attr<'a>(
    class: &str,
    attributes: &'a BTreeMap<String, Attribute>,
    name: &str,
) -> Result<&'a Folder> {
    match attributes.get(name) {
        Some(Attribute::Folder(folder)) => Ok(folder),
        Some(_) => Err(EccoError::InvalidClass(format!(
            "{}: {} is not a folder attribute",
            class, name
        ))),
        None => Err(EccoError::NoSuchAttribute {
            class: class.to_string(),
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemTransport;

    struct Fixture {
        host: MemTransport,
        folders: FolderRegistry,
        schema: Schema,
    }

    impl Fixture {
        fn new() -> Self {
            let host = MemTransport::new();
            host.add_folder("Contact", FolderType::Checkmark);
            host.add_folder("Kind", FolderType::PopupList);
            host.add_folder("Age", FolderType::Number);
            host.add_folder("Archived", FolderType::Checkmark);
            Self {
                host,
                folders: FolderRegistry::default(),
                schema: Schema::default(),
            }
        }

        fn declare(&mut self, spec: ClassSpec) -> Result<ClassId> {
            self.schema.declare(&self.host, &mut self.folders, spec)
        }
    }

    #[test]
    fn root_class_has_link_attributes() {
        let schema = Schema::default();
        let root = schema.class(ClassId::ITEM);
        assert_eq!(root.name(), "Item");
        assert_eq!(root.attribute("text"), Some(&Attribute::Text));
        assert_eq!(
            root.attribute("all_children"),
            Some(&Attribute::Children { class: None, depth: 0 })
        );
    }

    #[test]
    fn true_requirement_becomes_container_and_default() {
        let mut fx = Fixture::new();
        let contact = fx
            .declare(
                ClassSpec::new("Contact")
                    .folder("is_contact", "Contact")
                    .require("is_contact", true),
            )
            .unwrap();

        let class = fx.schema.class(contact);
        assert_eq!(class.container().unwrap().name, "Contact");
        assert_eq!(
            class.default_values().get("is_contact"),
            Some(&Value::Bool(true))
        );
        let folder = class.container().unwrap().id;
        assert_eq!(class.required_wire().get(&folder), Some(&Some("1".to_string())));
        assert!(!class.folder_mask().is_empty());
    }

    #[test]
    fn false_requirement_compiles_to_exclusion() {
        let mut fx = Fixture::new();
        let live = fx
            .declare(
                ClassSpec::new("Live")
                    .folder("archived", "Archived")
                    .exclude("archived"),
            )
            .unwrap();

        let class = fx.schema.class(live);
        assert!(class.folder_mask().is_empty());
        assert!(!class.exclusion_mask().is_empty());
        assert!(class.required_wire().is_empty());
        assert_eq!(class.default_values().get("archived"), Some(&Value::None));
    }

    #[test]
    fn exclusion_overrides_an_inherited_default() {
        let mut fx = Fixture::new();
        let entry = fx
            .declare(
                ClassSpec::new("Entry")
                    .folder("kind", "Kind")
                    .default_value("kind", "note"),
            )
            .unwrap();
        let unsorted = fx
            .declare(ClassSpec::new("Unsorted").extends(entry).exclude("kind"))
            .unwrap();

        assert_eq!(
            fx.schema.class(unsorted).default_values().get("kind"),
            Some(&Value::None)
        );
    }

    #[test]
    fn container_falls_back_to_first_declared_true_requirement() {
        let mut fx = Fixture::new();
        let shown = fx
            .declare(
                ClassSpec::new("Shown")
                    .folder("visible", "Contact")
                    .folder("archived", "Archived")
                    .require("visible", true)
                    .require("archived", true),
            )
            .unwrap();

        assert_eq!(fx.schema.class(shown).container().unwrap().name, "Contact");
    }

    #[test]
    fn subclasses_inherit_attributes_and_rules() {
        let mut fx = Fixture::new();
        let contact = fx
            .declare(
                ClassSpec::new("Contact")
                    .folder("is_contact", "Contact")
                    .folder("kind", "Kind")
                    .require("is_contact", true),
            )
            .unwrap();
        let person = fx
            .declare(
                ClassSpec::new("Person")
                    .extends(contact)
                    .require("kind", "person"),
            )
            .unwrap();

        let class = fx.schema.class(person);
        assert!(class.attribute("kind").is_some());
        assert_eq!(class.required_wire().len(), 2);
        assert_eq!(class.container().unwrap().name, "Contact");
        assert_eq!(class.default_values().get("kind"), Some(&Value::from("person")));
        assert_eq!(fx.schema.class(contact).subclasses(), &[person]);
        assert!(fx.schema.is_subclass(person, contact));
        assert!(fx.schema.is_subclass(person, ClassId::ITEM));
        assert!(!fx.schema.is_subclass(contact, person));
    }

    #[test]
    fn requirement_on_unknown_attribute_is_rejected() {
        let mut fx = Fixture::new();
        let err = fx
            .declare(ClassSpec::new("Broken").require("nope", true))
            .unwrap_err();
        assert!(matches!(err, EccoError::NoSuchAttribute { .. }));
    }

    #[test]
    fn requirement_on_link_attribute_is_rejected() {
        let mut fx = Fixture::new();
        let err = fx
            .declare(ClassSpec::new("Broken").require_present("parent"))
            .unwrap_err();
        assert!(matches!(err, EccoError::InvalidClass(_)));
    }

    #[test]
    fn duplicate_class_names_are_rejected() {
        let mut fx = Fixture::new();
        fx.declare(ClassSpec::new("A")).unwrap();
        assert!(matches!(
            fx.declare(ClassSpec::new("A")).unwrap_err(),
            EccoError::InvalidClass(_)
        ));
    }

    #[test]
    fn validator_fields_are_bit_indexed_and_inherited() {
        let mut fx = Fixture::new();
        let adult = fx
            .declare(
                ClassSpec::new("Adult")
                    .folder("age", "Age")
                    .validate(&["age"], |v| v[0].as_int().is_some_and(|n| n >= 18)),
            )
            .unwrap();
        let senior = fx
            .declare(ClassSpec::new("Senior").extends(adult))
            .unwrap();

        let age = fx.schema.class(adult).attribute("age").unwrap().folder().unwrap().id;
        assert!(fx.folders.bits().get(age).is_some());

        let mut values = HashMap::new();
        values.insert(age, "30".to_string());
        assert!(fx.schema.class(senior).check_fields(&values).unwrap());
        values.insert(age, "12".to_string());
        assert!(!fx.schema.class(senior).check_fields(&values).unwrap());
        values.insert(age, "twelve".to_string());
        assert!(fx.schema.class(senior).check_fields(&values).is_err());
    }

    #[test]
    fn typed_folder_mismatch_fails_declaration() {
        let mut fx = Fixture::new();
        let err = fx
            .declare(ClassSpec::new("Bad").typed_folder("age", "Age", FolderType::Date))
            .unwrap_err();
        assert!(matches!(err, EccoError::FolderTypeMismatch { .. }));
    }

    #[test]
    fn new_folder_is_created_on_declaration() {
        let mut fx = Fixture::new();
        let task = fx
            .declare(ClassSpec::new("Task").new_folder("due", "Due", FolderType::Date))
            .unwrap();
        let due = fx.schema.class(task).attribute("due").unwrap().folder().unwrap();
        assert_eq!(due.kind, FolderType::Date);
        assert_eq!(fx.host.get_folders_by_name("Due").unwrap(), vec![due.id]);
    }
}
