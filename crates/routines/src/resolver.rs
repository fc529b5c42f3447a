//! Version discovery.
//!
//! The "current" version of a name is the highest `_vNN` file present in the
//! store. Nothing is cached: every call lists the store again, so edits made
//! between two calls are always picked up.

use crate::definition::{DefinitionStore, ObjectKind, Version, normalize_name, parse_file_version};
use crate::{Error, Result};

/// What the caller is about to do with a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Author a new version on top of the latest one.
    Update,
    /// Remove the latest version. Destroying version 1 removes the object.
    Destroy,
}

/// Resolves versions from an injected [`DefinitionStore`].
pub struct VersionResolver<'a, S: DefinitionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DefinitionStore + ?Sized> VersionResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// All versions on disk for `name`, ascending.
    pub fn versions(&self, kind: ObjectKind, name: &str) -> Result<Vec<Version>> {
        let normalized = normalize_name(name);
        let mut versions: Vec<Version> = self
            .store
            .list(kind)?
            .iter()
            .filter_map(|file| parse_file_version(&normalized, file))
            .collect();
        versions.sort_unstable();
        versions.dedup();
        Ok(versions)
    }

    /// The highest version on disk for `name`.
    pub fn latest(&self, kind: ObjectKind, name: &str) -> Result<Version> {
        self.versions(kind, name)?
            .last()
            .copied()
            .ok_or_else(|| Error::NoDefinitions {
                kind,
                name: name.to_string(),
            })
    }

    /// The version an [`Intent`] targets.
    ///
    /// `Update` on a name with no definitions yields version 1.
    pub fn version_for(&self, kind: ObjectKind, name: &str, intent: Intent) -> Result<Version> {
        match intent {
            Intent::Update => match self.latest(kind, name) {
                Ok(latest) => Ok(latest.next()),
                Err(Error::NoDefinitions { .. }) => Ok(Version::FIRST),
                Err(e) => Err(e),
            },
            Intent::Destroy => self.latest(kind, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::MemoryStore;

    fn v(n: u32) -> Version {
        Version::new(n).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with(ObjectKind::Function, "add_em", v(1), "SELECT 1")
            .with(ObjectKind::Function, "add_em", v(2), "SELECT 2")
            .with(ObjectKind::Function, "add_em", v(3), "SELECT 3")
            .with(ObjectKind::Function, "add_em", v(4), "SELECT 4")
            .with(ObjectKind::Function, "add_em_more", v(9), "SELECT 9")
            .with(ObjectKind::Aggregate, "add_em", v(7), "sfunc = f")
    }

    #[test]
    fn test_latest_is_max_version() {
        let store = store();
        let resolver = VersionResolver::new(&store);
        assert_eq!(resolver.latest(ObjectKind::Function, "add_em").unwrap(), v(4));
        assert_eq!(resolver.latest(ObjectKind::Aggregate, "add_em").unwrap(), v(7));
    }

    #[test]
    fn test_versions_sorted_and_exact() {
        let store = store();
        let resolver = VersionResolver::new(&store);
        assert_eq!(
            resolver.versions(ObjectKind::Function, "add_em").unwrap(),
            vec![v(1), v(2), v(3), v(4)]
        );
    }

    #[test]
    fn test_no_definitions() {
        let store = store();
        let resolver = VersionResolver::new(&store);
        let err = resolver.latest(ObjectKind::Function, "nope").unwrap_err();
        assert!(matches!(err, Error::NoDefinitions { .. }));
    }

    #[test]
    fn test_namespaced_name_is_normalized() {
        let store = MemoryStore::new()
            .with(ObjectKind::Function, "ns_thing", v(1), "SELECT 1")
            .with(ObjectKind::Function, "ns_thing", v(2), "SELECT 2");
        let resolver = VersionResolver::new(&store);
        assert_eq!(resolver.latest(ObjectKind::Function, "ns.thing").unwrap(), v(2));
    }

    #[test]
    fn test_intent_versions() {
        let store = store();
        let resolver = VersionResolver::new(&store);
        assert_eq!(
            resolver
                .version_for(ObjectKind::Function, "add_em", Intent::Update)
                .unwrap(),
            v(5)
        );
        assert_eq!(
            resolver
                .version_for(ObjectKind::Function, "add_em", Intent::Destroy)
                .unwrap(),
            v(4)
        );
        assert_eq!(
            resolver
                .version_for(ObjectKind::Function, "fresh", Intent::Update)
                .unwrap(),
            Version::FIRST
        );
        assert!(
            resolver
                .version_for(ObjectKind::Function, "fresh", Intent::Destroy)
                .is_err()
        );
    }
}
