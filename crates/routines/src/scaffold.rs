//! Authoring the next definition file.
//!
//! A brand-new name gets an empty `_v01.sql` for the author to fill in (reading
//! it before then fails with [`Error::EmptyDefinition`]). An existing name gets
//! a copy of its latest body under the next version number.

use camino::Utf8PathBuf;

use crate::definition::{Definition, DefinitionStore, ObjectKind, Version};
use crate::resolver::{Intent, VersionResolver};
use crate::{Error, Result};

/// What [`Scaffold::apply`] will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub definition: Definition,
    /// Full path of the file to create.
    pub path: Utf8PathBuf,
    /// The definition whose body is copied, `None` for a new object.
    pub copy_from: Option<Definition>,
}

impl Plan {
    pub fn is_new(&self) -> bool {
        self.copy_from.is_none()
    }
}

pub struct Scaffold<'a, S: DefinitionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DefinitionStore + ?Sized> Scaffold<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Plan the next version of `name`.
    pub fn plan(&self, kind: ObjectKind, name: &str) -> Result<Plan> {
        let resolver = VersionResolver::new(self.store);
        let version = resolver.version_for(kind, name, Intent::Update)?;
        let definition = Definition::new(kind, name, version);
        let copy_from = (version != Version::FIRST).then(|| {
            // `version` is latest + 1, so its predecessor is the latest.
            let previous = Version::new(version.get() - 1).unwrap_or(Version::FIRST);
            Definition::new(kind, name, previous)
        });

        Ok(Plan {
            path: self.store.full_path(&definition),
            definition,
            copy_from,
        })
    }

    /// Write the planned file. Never overwrites an existing definition.
    pub fn apply(&self, plan: &Plan) -> Result<()> {
        let target = plan.definition.path();
        if self.store.load(&target)?.is_some() {
            return Err(Error::DefinitionExists {
                path: plan.path.clone(),
            });
        }

        let body = match &plan.copy_from {
            Some(previous) => self
                .store
                .load(&previous.path())?
                .ok_or_else(|| Error::DefinitionNotFound {
                    kind: previous.kind,
                    path: self.store.full_path(previous),
                })?,
            None => String::new(),
        };

        tracing::info!(path = %plan.path, new = plan.is_new(), "writing definition");
        self.store.store(&target, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::MemoryStore;

    fn v(n: u32) -> Version {
        Version::new(n).unwrap()
    }

    #[test]
    fn test_new_object_gets_empty_first_version() {
        let store = MemoryStore::new();
        let scaffold = Scaffold::new(&store);

        let plan = scaffold.plan(ObjectKind::Function, "add_em").unwrap();
        assert!(plan.is_new());
        assert_eq!(plan.path, "db/functions/add_em_v01.sql");

        scaffold.apply(&plan).unwrap();
        let err = store.read(&plan.definition).unwrap_err();
        assert!(matches!(err, Error::EmptyDefinition { .. }));
    }

    #[test]
    fn test_bump_copies_latest_body() {
        let store = MemoryStore::new()
            .with(ObjectKind::Aggregate, "ns.avg", v(1), "sfunc = a")
            .with(ObjectKind::Aggregate, "ns.avg", v(2), "sfunc = b");
        let scaffold = Scaffold::new(&store);

        let plan = scaffold.plan(ObjectKind::Aggregate, "ns.avg").unwrap();
        assert_eq!(plan.path, "db/aggregates/ns_avg_v03.sql");
        assert_eq!(plan.copy_from.as_ref().map(|d| d.version.get()), Some(2));

        scaffold.apply(&plan).unwrap();
        assert_eq!(store.read(&plan.definition).unwrap(), "sfunc = b");
    }

    #[test]
    fn test_apply_refuses_to_overwrite() {
        let store = MemoryStore::new();
        let scaffold = Scaffold::new(&store);
        let plan = scaffold.plan(ObjectKind::Function, "add_em").unwrap();

        scaffold.apply(&plan).unwrap();
        let err = scaffold.apply(&plan).unwrap_err();
        assert!(matches!(err, Error::DefinitionExists { .. }));
    }
}
