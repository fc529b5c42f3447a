//! Configuration file handling for routines.
//!
//! Looks for `.config/routines.styx` in the current directory or any parent directory.

pub use routines_config::Config;

use camino::{Utf8Path, Utf8PathBuf};

const CONFIG_FILE: &str = ".config/routines.styx";

/// A loaded configuration and the project directory it applies to.
#[derive(Debug, Clone)]
pub struct Project {
    pub config: Config,
    /// Directory containing `.config/`. Relative config paths resolve here.
    pub root: Utf8PathBuf,
}

impl Project {
    /// Absolute store root for definition files.
    pub fn definitions(&self) -> Utf8PathBuf {
        self.root.join(self.config.definitions())
    }
}

/// Load the project configuration starting from the current directory.
///
/// Without a config file, the current directory is the project root and the
/// defaults apply.
pub fn load() -> Result<Project, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(e.to_string()))?;
    let cwd = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|p| ConfigError::Io(format!("non-UTF-8 directory {}", p.display())))?;

    match load_from(&cwd) {
        Err(ConfigError::NotFound) => Ok(Project {
            config: Config::default(),
            root: cwd,
        }),
        other => other,
    }
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Utf8Path) -> Result<Project, ConfigError> {
    let config_path = find_config_file(start)?;
    let content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io(e.to_string()))?;

    let config: Config =
        facet_styx::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    tracing::debug!(path = %config_path, "loaded config");

    // `config_path` is `<root>/.config/routines.styx`.
    let root = config_path
        .parent()
        .and_then(Utf8Path::parent)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|| start.to_path_buf());

    Ok(Project { config, root })
}

/// Find `.config/routines.styx` by searching up the directory tree.
fn find_config_file(start: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No `.config/routines.styx` found in any parent directory
    #[error("no {CONFIG_FILE} found in current directory or any parent")]
    NotFound,
    /// I/O error reading the file
    #[error("failed to read {CONFIG_FILE}: {0}")]
    Io(String),
    /// Parse error in the Styx file
    #[error("failed to parse {CONFIG_FILE}: {0}")]
    Parse(String),
}
