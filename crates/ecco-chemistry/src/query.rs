//! # Queries
//!
//! Folder-backed collections of items.
//!
//! ## Query
//!
//! A [`Query`] is a description of a `GetFolderItems` request plus the class
//! its results are resolved under. It is finite and re-iterable: every
//! [`Query::iter`] issues the request again, then resolves each id to its
//! most specific class, skipping ids the base class itself does not match.
//! Nothing is fetched until the iterator is first advanced.
//!
//! ## Container
//!
//! A [`Container`] pairs a class with one of its folder attributes and
//! builds queries against that folder:
//!
//! | Method | Criterion |
//! |--------|-----------|
//! | `greater_than` / `at_least` | `GT` / `GE` |
//! | `less_than` / `at_most` | `LT` / `LE` |
//! | `equals` / `not_equals` | `EQ` / `NE` |
//! | `starts_with` | `TB` |
//! | `with_text` / `without_text` | `TC` / `TN` |
//! | `ascending` / `descending` | `va` / `vd` |
//!
//! Comparison operands are encoded with the folder's codec first; text
//! operands are sent as given.
//!
//! It also treats the folder as a unique key: [`Container::get`] returns
//! `None`, the single match, or [`EccoError::AmbiguousKey`].
//!
//! ## ClassItems
//!
//! [`ClassItems`] iterates a class through its container folder, with item
//! text criteria (`IB`, `IC`, `IN`, `ia`, `id`).

use crate::codec::Value;
use crate::commands::{access, create, Ctx};
use crate::error::{EccoError, Result};
use crate::model::{ClassId, Folder, FolderId, Item, ItemId};
use crate::transport::{Criterion, Transport};

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Folder {
        folder: FolderId,
        criteria: Vec<Criterion>,
    },
    Subs {
        parent: ItemId,
        depth: u32,
    },
}

impl Source {
    fn fetch<T: Transport>(&self, transport: &T) -> Result<Vec<ItemId>> {
        match self {
            Source::Folder { folder, criteria } => transport.get_folder_items(*folder, criteria),
            Source::Subs { parent, depth } => Ok(transport
                .get_item_subs(*parent, *depth)?
                .into_iter()
                .map(|(_, id)| id)
                .collect()),
        }
    }
}

/// Lazily fetched, lazily resolved items.
pub struct Items<'a, T: Transport> {
    ctx: Ctx<'a, T>,
    base: ClassId,
    pending: Option<Source>,
    ids: std::vec::IntoIter<ItemId>,
}

impl<'a, T: Transport> Items<'a, T> {
    fn new(ctx: Ctx<'a, T>, base: ClassId, source: Source) -> Self {
        Self {
            ctx,
            base,
            pending: Some(source),
            ids: Vec::new().into_iter(),
        }
    }

    pub(crate) fn subs(ctx: Ctx<'a, T>, base: ClassId, parent: ItemId, depth: u32) -> Self {
        Self::new(ctx, base, Source::Subs { parent, depth })
    }
}

impl<T: Transport> Iterator for Items<'_, T> {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(source) = self.pending.take() {
            match source.fetch(self.ctx.transport) {
                Ok(ids) => self.ids = ids.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
        loop {
            let id = self.ids.next()?;
            match self.ctx.resolve(self.base, Some(id), &[], false) {
                Ok(Some(class)) => return Some(Ok(Item::new(id, class))),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// A re-iterable folder query.
pub struct Query<'a, T: Transport> {
    ctx: Ctx<'a, T>,
    base: ClassId,
    source: Source,
}

impl<'a, T: Transport> Query<'a, T> {
    pub(crate) fn new(ctx: Ctx<'a, T>, base: ClassId, folder: FolderId, criteria: Vec<Criterion>) -> Self {
        Self {
            ctx,
            base,
            source: Source::Folder { folder, criteria },
        }
    }

    pub fn criteria(&self) -> &[Criterion] {
        match &self.source {
            Source::Folder { criteria, .. } => criteria,
            Source::Subs { .. } => &[],
        }
    }

    /// Issue the query; each call starts over.
    pub fn iter(&self) -> Items<'a, T> {
        Items::new(self.ctx, self.base, self.source.clone())
    }

    pub fn to_vec(&self) -> Result<Vec<Item>> {
        self.iter().collect()
    }

    pub fn ids(&self) -> Result<Vec<ItemId>> {
        self.iter().map(|r| r.map(|i| i.id)).collect()
    }

    pub fn first(&self) -> Result<Option<Item>> {
        self.iter().next().transpose()
    }

    pub fn count(&self) -> Result<usize> {
        self.iter().try_fold(0, |n, item| item.map(|_| n + 1))
    }
}

impl<'a, T: Transport> IntoIterator for &Query<'a, T> {
    type Item = Result<Item>;
    type IntoIter = Items<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Items of a class, looked up through one of its folder attributes.
pub struct Container<'a, T: Transport> {
    ctx: Ctx<'a, T>,
    class: ClassId,
    folder: Folder,
}

impl<'a, T: Transport> Container<'a, T> {
    pub(crate) fn new(ctx: Ctx<'a, T>, class: ClassId, folder: Folder) -> Self {
        Self { ctx, class, folder }
    }

    pub fn folder(&self) -> &Folder {
        &self.folder
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    fn query(&self, criteria: Vec<Criterion>) -> Query<'a, T> {
        Query::new(self.ctx, self.class, self.folder.id, criteria)
    }

    fn encode(&self, value: impl Into<Value>) -> Result<String> {
        self.ctx.schema.encode(&self.folder, &value.into())
    }

    /// Every item in the folder.
    pub fn all(&self) -> Query<'a, T> {
        self.query(Vec::new())
    }

    pub fn greater_than(&self, value: impl Into<Value>) -> Result<Query<'a, T>> {
        Ok(self.query(vec![Criterion::Gt(self.encode(value)?)]))
    }

    pub fn at_least(&self, value: impl Into<Value>) -> Result<Query<'a, T>> {
        Ok(self.query(vec![Criterion::Ge(self.encode(value)?)]))
    }

    pub fn less_than(&self, value: impl Into<Value>) -> Result<Query<'a, T>> {
        Ok(self.query(vec![Criterion::Lt(self.encode(value)?)]))
    }

    pub fn at_most(&self, value: impl Into<Value>) -> Result<Query<'a, T>> {
        Ok(self.query(vec![Criterion::Le(self.encode(value)?)]))
    }

    pub fn equals(&self, value: impl Into<Value>) -> Result<Query<'a, T>> {
        Ok(self.query(vec![Criterion::Eq(self.encode(value)?)]))
    }

    pub fn not_equals(&self, value: impl Into<Value>) -> Result<Query<'a, T>> {
        Ok(self.query(vec![Criterion::Ne(self.encode(value)?)]))
    }

    pub fn starts_with(&self, prefix: &str) -> Query<'a, T> {
        self.query(vec![Criterion::StartsWith(prefix.to_string())])
    }

    pub fn with_text(&self, text: &str) -> Query<'a, T> {
        self.query(vec![Criterion::Contains(text.to_string())])
    }

    pub fn without_text(&self, text: &str) -> Query<'a, T> {
        self.query(vec![Criterion::Lacks(text.to_string())])
    }

    pub fn ascending(&self) -> Query<'a, T> {
        self.query(vec![Criterion::Ascending])
    }

    pub fn descending(&self) -> Query<'a, T> {
        self.query(vec![Criterion::Descending])
    }

    /// The single item whose folder value equals `key`, if any.
    pub fn get(&self, key: impl Into<Value>) -> Result<Option<Item>> {
        let key = key.into();
        let mut found = self.equals(key.clone())?.to_vec()?;
        match found.len() {
            0 | 1 => Ok(found.pop()),
            _ => Err(EccoError::AmbiguousKey(key.to_string())),
        }
    }

    /// Like [`Container::get`], but a missing key is [`EccoError::KeyNotFound`].
    pub fn index(&self, key: impl Into<Value>) -> Result<Item> {
        let key = key.into();
        self.get(key.clone())?
            .ok_or_else(|| EccoError::KeyNotFound(key.to_string()))
    }

    /// True if at least one item holds `key`.
    pub fn contains_key(&self, key: impl Into<Value>) -> Result<bool> {
        Ok(self.equals(key)?.first()?.is_some())
    }

    /// Look up `key`, creating an item with `text` and `defaults` (and the
    /// key) when there is none.
    pub fn setdefault(
        &self,
        key: impl Into<Value>,
        text: &str,
        defaults: &[(String, Value)],
    ) -> Result<Item> {
        let key = key.into();
        if let Some(item) = self.get(key.clone())? {
            return Ok(item);
        }
        let item = create::run(self.ctx, self.class, text, defaults)?;
        access::set_value(self.ctx, item.id, &self.folder, &key)?;
        Ok(item)
    }
}

/// All items of a class, through its container folder.
pub struct ClassItems<'a, T: Transport> {
    container: Container<'a, T>,
}

impl<'a, T: Transport> ClassItems<'a, T> {
    /// Fails with [`EccoError::NoContainer`] for classes without one.
    pub(crate) fn new(ctx: Ctx<'a, T>, class: ClassId) -> Result<Self> {
        let spec = ctx.schema.class(class);
        let folder = spec
            .container()
            .cloned()
            .ok_or_else(|| EccoError::NoContainer(spec.name().to_string()))?;
        Ok(Self {
            container: Container::new(ctx, class, folder),
        })
    }

    pub fn container(&self) -> &Container<'a, T> {
        &self.container
    }

    pub fn all(&self) -> Query<'a, T> {
        self.container.all()
    }

    pub fn starts_with(&self, prefix: &str) -> Query<'a, T> {
        self.container
            .query(vec![Criterion::TextStartsWith(prefix.to_string())])
    }

    pub fn with_text(&self, text: &str) -> Query<'a, T> {
        self.container
            .query(vec![Criterion::TextContains(text.to_string())])
    }

    pub fn without_text(&self, text: &str) -> Query<'a, T> {
        self.container
            .query(vec![Criterion::TextLacks(text.to_string())])
    }

    pub fn ascending(&self) -> Query<'a, T> {
        self.container.query(vec![Criterion::TextAscending])
    }

    pub fn descending(&self) -> Query<'a, T> {
        self.container.query(vec![Criterion::TextDescending])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::Fixture;
    use crate::schema::attrs;

    fn age_container(fx: &Fixture) -> Container<'_, crate::transport::memory::MemTransport> {
        let folder = fx
            .schema
            .attribute(fx.person, "age")
            .unwrap()
            .folder()
            .unwrap()
            .clone();
        Container::new(fx.ctx(), fx.person, folder)
    }

    fn people(fx: &Fixture) -> Vec<Item> {
        [("Ada", 36), ("Bob", 20), ("Cy", 50)]
            .into_iter()
            .map(|(name, age)| create::run(fx.ctx(), fx.person, name, &attrs([("age", age)])).unwrap())
            .collect()
    }

    #[test]
    fn comparisons_encode_their_operand() {
        let fx = Fixture::new();
        let p = people(&fx);
        let ages = age_container(&fx);

        let older = ages.greater_than(30).unwrap();
        assert_eq!(older.criteria(), &[Criterion::Gt("30".into())]);
        assert_eq!(older.ids().unwrap(), vec![p[0].id, p[2].id]);
        assert_eq!(ages.at_most(36).unwrap().ids().unwrap(), vec![p[0].id, p[1].id]);
        assert_eq!(ages.not_equals(20).unwrap().count().unwrap(), 2);
    }

    #[test]
    fn queries_are_lazy_and_reiterable() {
        let fx = Fixture::new();
        people(&fx);
        let ages = age_container(&fx);
        fx.host.clear_calls();

        let all = ages.all();
        assert!(fx.host.calls().is_empty());

        assert_eq!(all.count().unwrap(), 3);
        assert_eq!(all.count().unwrap(), 3);
        let fetches = fx.host.calls().iter().filter(|c| **c == "GetFolderItems").count();
        assert_eq!(fetches, 2);
    }

    #[test]
    fn results_resolve_to_the_most_specific_class() {
        let fx = Fixture::new();
        let acme = create::run(fx.ctx(), fx.company, "Acme", &[]).unwrap();
        let ada = create::run(fx.ctx(), fx.person, "Ada", &[]).unwrap();
        let note = fx.host.add_item("unfiled", &[(fx.email_folder, "x@y.z")]);
        let email = fx.schema.attribute(fx.contact, "email").unwrap().folder().unwrap().clone();
        fx.host
            .set_folder_values(acme.id, &[(email.id, "acme@y.z".to_string())])
            .unwrap();
        fx.host
            .set_folder_values(ada.id, &[(email.id, "ada@y.z".to_string())])
            .unwrap();

        let found = Container::new(fx.ctx(), fx.contact, email).all().to_vec().unwrap();
        let classes: Vec<(ItemId, ClassId)> = found.iter().map(|i| (i.id, i.class)).collect();
        assert_eq!(classes, vec![(acme.id, fx.company), (ada.id, fx.person)]);
        assert!(!found.iter().any(|i| i.id == note));
    }

    #[test]
    fn get_honours_the_unique_key_contract() {
        let fx = Fixture::new();
        let p = people(&fx);
        create::run(fx.ctx(), fx.person, "Dee", &attrs([("age", 20)])).unwrap();
        let ages = age_container(&fx);

        assert_eq!(ages.get(99).unwrap(), None);
        assert_eq!(ages.get(36).unwrap(), Some(p[0]));
        assert!(matches!(ages.get(20).unwrap_err(), EccoError::AmbiguousKey(ref k) if k == "20"));
        assert!(matches!(ages.index(99).unwrap_err(), EccoError::KeyNotFound(_)));
        assert_eq!(ages.index(50).unwrap(), p[2]);
        assert!(ages.contains_key(20).unwrap());
        assert!(!ages.contains_key(21).unwrap());
    }

    #[test]
    fn setdefault_creates_only_when_missing() {
        let fx = Fixture::new();
        let p = people(&fx);
        let ages = age_container(&fx);

        assert_eq!(ages.setdefault(36, "ignored", &[]).unwrap(), p[0]);
        let fresh = ages.setdefault(70, "Eve", &[]).unwrap();
        assert_eq!(fresh.class, fx.person);
        assert_eq!(fx.host.get_item_text(fresh.id).unwrap(), "Eve");
        assert_eq!(ages.index(70).unwrap(), fresh);
    }

    #[test]
    fn text_criteria_pass_through_unencoded() {
        let fx = Fixture::new();
        people(&fx);
        let ages = age_container(&fx);
        assert_eq!(ages.starts_with("3").criteria(), &[Criterion::StartsWith("3".into())]);
        assert_eq!(ages.starts_with("3").count().unwrap(), 1);
        assert_eq!(ages.descending().criteria(), &[Criterion::Descending]);
    }

    #[test]
    fn class_items_go_through_the_container() {
        let fx = Fixture::new();
        let p = people(&fx);
        let acme = create::run(fx.ctx(), fx.company, "Acme", &[]).unwrap();

        let contacts = ClassItems::new(fx.ctx(), fx.contact).unwrap();
        assert_eq!(contacts.all().count().unwrap(), 4);
        assert_eq!(contacts.starts_with("A").ids().unwrap(), vec![p[0].id, acme.id]);
        assert_eq!(contacts.without_text("z").count().unwrap(), 4);

        let persons = ClassItems::new(fx.ctx(), fx.person).unwrap();
        assert_eq!(persons.with_text("o").ids().unwrap(), vec![p[1].id]);
        assert_eq!(
            persons.descending().ids().unwrap(),
            vec![p[2].id, p[1].id, p[0].id]
        );
    }

    #[test]
    fn classes_without_container_cannot_be_listed() {
        let fx = Fixture::new();
        assert!(matches!(
            ClassItems::new(fx.ctx(), ClassId::ITEM).err(),
            Some(EccoError::NoContainer(_))
        ));
    }
}
