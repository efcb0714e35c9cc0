//! Versioned schema descriptions applied when an engine is opened.
//!
//! The upgrade hook is a plain function from the previously persisted version
//! to the steps that bring the engine up to date. Engines interpret the steps;
//! the schema never touches an engine API.

/// Name of the keyspace that holds blob records.
pub const FILES_KEYSPACE: &str = "files";

/// A single schema migration step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationStep {
    /// Create a keyspace that is known not to exist yet.
    CreateKeyspace(String),
    /// Create a keyspace unless it already exists.
    EnsureKeyspace(String),
}

impl MigrationStep {
    /// The keyspace this step targets.
    pub fn keyspace(&self) -> &str {
        match self {
            Self::CreateKeyspace(name) | Self::EnsureKeyspace(name) => name,
        }
    }
}

/// A named, versioned schema with its upgrade function.
#[derive(Clone, Debug)]
pub struct Schema {
    /// Database name.
    pub name: String,
    /// Current schema version. Engines persist it after upgrading.
    pub version: u32,
    /// Keyspace the engine operates on once open.
    pub keyspace: String,
    /// Steps required to upgrade from the given persisted version.
    pub upgrade: fn(u32) -> Vec<MigrationStep>,
}

impl Schema {
    /// Migration steps needed to move from `from_version` to `self.version`.
    ///
    /// Returns no steps when the engine is already current.
    pub fn migrations(&self, from_version: u32) -> Vec<MigrationStep> {
        if from_version >= self.version {
            return Vec::new();
        }
        (self.upgrade)(from_version)
    }
}

fn upgrade_files(from_version: u32) -> Vec<MigrationStep> {
    match from_version {
        0 => vec![MigrationStep::CreateKeyspace(FILES_KEYSPACE.into())],
        1 => vec![MigrationStep::EnsureKeyspace(FILES_KEYSPACE.into())],
        _ => Vec::new(),
    }
}

/// The blob store schema: version 2, a single `files` keyspace.
pub fn files_schema() -> Schema {
    Schema {
        name: "vault_fs".into(),
        version: 2,
        keyspace: FILES_KEYSPACE.into(),
        upgrade: upgrade_files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_engine_creates_files_keyspace() {
        let schema = files_schema();
        assert_eq!(
            schema.migrations(0),
            vec![MigrationStep::CreateKeyspace("files".into())]
        );
    }

    #[test]
    fn version_one_ensures_files_keyspace() {
        let schema = files_schema();
        assert_eq!(
            schema.migrations(1),
            vec![MigrationStep::EnsureKeyspace("files".into())]
        );
    }

    #[test]
    fn current_version_needs_nothing() {
        let schema = files_schema();
        assert!(schema.migrations(2).is_empty());
        assert!(schema.migrations(7).is_empty());
    }

    #[test]
    fn step_keyspace() {
        assert_eq!(MigrationStep::EnsureKeyspace("x".into()).keyspace(), "x");
    }
}
