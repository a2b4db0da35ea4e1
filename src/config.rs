use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::catalog::client::DEFAULT_API_URL;
use crate::catalog::Thing;
use crate::sync::locate::remote_name;
use crate::sync::SyncContext;

/// User-level document, looked up in the home directory.
pub const USER_CONFIG: &str = ".thingsync.json";
/// Project-level document, looked up in the project directory.
pub const PROJECT_CONFIG: &str = "thingsync.json";
pub const DEFAULT_README: &str = "README.md";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No configuration found (looked for {searched})")]
    Missing { searched: String },

    #[error("Malformed configuration in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[source] serde_json::Error),

    #[error("Missing required setting '{0}'")]
    MissingField(&'static str),

    #[error("'{first}' and '{second}' would both upload as '{name}'")]
    DuplicateRemoteName {
        name: String,
        first: String,
        second: String,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Shape of the merged configuration documents.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigDocument {
    username: Option<String>,
    token: Option<String>,
    api_url: Option<String>,
    thing: Option<Thing>,
    files: Vec<String>,
    images: Vec<String>,
    readme: Option<String>,
}

/// Values from the command line that take precedence over both documents.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub token: Option<String>,
    pub username: Option<String>,
    pub checkpoint: bool,
    pub no_progress_bar: bool,
}

/// Resolved settings for one run.
pub struct Config {
    pub token: String,
    pub username: String,
    pub api_url: String,
    /// Thing payload, description filled from the readme when present.
    pub thing: Thing,
    pub files: Vec<String>,
    pub images: Vec<String>,
    /// Project directory; asset paths and the state file live under it.
    pub root: PathBuf,
    pub readme: PathBuf,
    pub checkpoint: bool,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("thing", &self.thing.name)
            .field("files", &self.files)
            .field("images", &self.images)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Parse one JSON document. A missing file is `Ok(None)`.
pub fn read_document(path: &Path) -> Result<Option<Map<String, Value>>, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Shallow merge: top-level keys of `project` replace those of `user`.
fn merge(user: Option<Map<String, Value>>, project: Option<Map<String, Value>>) -> Option<Map<String, Value>> {
    match (user, project) {
        (None, None) => None,
        (Some(doc), None) | (None, Some(doc)) => Some(doc),
        (Some(mut base), Some(top)) => {
            base.extend(top);
            Some(base)
        }
    }
}

/// Files and images share one filename namespace on a thing, so no two
/// configured paths may end in the same file name.
fn check_remote_names(files: &[String], images: &[String]) -> Result<(), ConfigError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for path in files.iter().chain(images) {
        let name = remote_name(path);
        if let Some(first) = seen.insert(name.clone(), path) {
            return Err(ConfigError::DuplicateRemoteName {
                name,
                first: first.to_string(),
                second: path.clone(),
            });
        }
    }
    Ok(())
}

impl Config {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self, ConfigError> {
        let user_path = dirs::home_dir().map(|home| home.join(USER_CONFIG));
        let overrides = Overrides {
            token: cli.token.clone(),
            username: cli.username.clone(),
            checkpoint: cli.checkpoint,
            no_progress_bar: cli.no_progress_bar,
        };
        Self::load_from(user_path.as_deref(), &expand_tilde(&cli.directory), overrides)
    }

    /// Load and merge the user document at `user_path` and the project
    /// document in `project_dir`, then apply `overrides`.
    pub fn load_from(
        user_path: Option<&Path>,
        project_dir: &Path,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let project_path = project_dir.join(PROJECT_CONFIG);
        let user_doc = match user_path {
            Some(path) => read_document(path)?,
            None => None,
        };
        let project_doc = read_document(&project_path)?;

        let merged = merge(user_doc, project_doc).ok_or_else(|| {
            let mut searched = vec![project_path.display().to_string()];
            if let Some(path) = user_path {
                searched.insert(0, path.display().to_string());
            }
            ConfigError::Missing {
                searched: searched.join(", "),
            }
        })?;
        let doc: ConfigDocument =
            serde_json::from_value(Value::Object(merged)).map_err(ConfigError::Invalid)?;

        let token = overrides
            .token
            .or(doc.token)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingField("token"))?;
        let username = overrides
            .username
            .or(doc.username)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingField("username"))?;
        let thing = doc.thing.ok_or(ConfigError::MissingField("thing"))?;
        if thing.name.is_empty() {
            return Err(ConfigError::MissingField("thing.name"));
        }

        check_remote_names(&doc.files, &doc.images)?;

        let readme = project_dir.join(doc.readme.as_deref().unwrap_or(DEFAULT_README));
        let mut config = Self {
            token,
            username,
            api_url: doc.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            thing,
            files: doc.files,
            images: doc.images,
            root: project_dir.to_path_buf(),
            readme,
            checkpoint: overrides.checkpoint,
            no_progress_bar: overrides.no_progress_bar,
        };
        config.apply_readme()?;
        Ok(config)
    }

    /// Use the readme text as the description. A missing readme keeps
    /// whatever description the documents set.
    fn apply_readme(&mut self) -> Result<(), ConfigError> {
        match std::fs::read_to_string(&self.readme) {
            Ok(text) => {
                self.thing.description = Some(text);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Readme {} not found; keeping the configured description",
                    self.readme.display()
                );
                Ok(())
            }
            Err(source) => Err(ConfigError::Io {
                path: self.readme.clone(),
                source,
            }),
        }
    }

    pub fn to_context(&self) -> SyncContext {
        SyncContext {
            username: self.username.clone(),
            root: self.root.clone(),
            thing: self.thing.clone(),
            files: self.files.clone(),
            images: self.images.clone(),
            no_progress_bar: self.no_progress_bar,
        }
    }
}
