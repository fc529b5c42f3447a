//! Configuration schema for `.config/routines.styx`.
//!
//! ```text
//! definitions db/routines
//! database_url "postgres://localhost/app"
//! ignore (audit_trigger legacy_sum)
//! ```

use facet::Facet;

/// Store root used when `definitions` is not set.
pub const DEFAULT_DEFINITIONS: &str = "db";

/// Project configuration.
#[derive(Facet, Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Directory holding `functions/` and `aggregates/`, relative to the
    /// directory that contains `.config/`.
    #[facet(default)]
    pub definitions: Option<String>,

    /// Connection URL, used when neither `--database-url` nor `DATABASE_URL`
    /// is given.
    #[facet(default)]
    pub database_url: Option<String>,

    /// Extra object names left out of `routines dump`.
    #[facet(default)]
    pub ignore: Vec<String>,
}

impl Config {
    pub fn definitions(&self) -> &str {
        self.definitions.as_deref().unwrap_or(DEFAULT_DEFINITIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.definitions(), "db");
        assert!(config.database_url.is_none());
        assert!(config.ignore.is_empty());
    }

    #[test]
    fn test_parse_styx() {
        let config: Config = facet_styx::from_str(
            "definitions sql\ndatabase_url \"postgres://localhost/app\"\n",
        )
        .unwrap();
        assert_eq!(config.definitions(), "sql");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/app")
        );
        assert!(config.ignore.is_empty());
    }
}
