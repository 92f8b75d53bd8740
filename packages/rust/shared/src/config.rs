//! Application configuration for doxymark.
//!
//! User config lives at `~/.doxymark/doxymark.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DoxymarkError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "doxymark.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".doxymark";

// ---------------------------------------------------------------------------
// Config structs (matching doxymark.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Category filters for members and compounds.
    #[serde(default)]
    pub filters: FiltersConfig,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output file. In per-group mode the group name is appended to the stem.
    #[serde(default = "default_output_path")]
    pub path: String,

    /// Write one document per group instead of a single document.
    #[serde(default = "default_true")]
    pub groups: bool,

    /// Emit `{#anchor}` markers for internal links.
    #[serde(default = "default_true")]
    pub anchors: bool,

    /// Template language (selects the embedded template set).
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Directory of `*.md` templates overriding the embedded ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            groups: true,
            anchors: true,
            lang: default_lang(),
            template_dir: None,
        }
    }
}

fn default_output_path() -> String {
    "API.md".into()
}
fn default_true() -> bool {
    true
}
fn default_lang() -> String {
    "cpp".into()
}

/// `[filters]` section. Order matters: categories are emitted in list order,
/// and anything not listed is hidden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Member section kinds to include (e.g. `public-func`).
    #[serde(default = "default_member_filter")]
    pub members: Vec<String>,

    /// Compound kinds to include (e.g. `namespace`, `class`).
    #[serde(default = "default_compound_filter")]
    pub compounds: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            members: default_member_filter(),
            compounds: default_compound_filter(),
        }
    }
}

fn default_member_filter() -> Vec<String> {
    ["public-attrib", "public-func", "protected-attrib", "protected-func"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_compound_filter() -> Vec<String> {
    ["namespace", "class", "struct", "union", "typedef"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Render config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime render configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Directory holding Doxygen's `index.xml` and compound files.
    pub input_dir: PathBuf,
    /// Output file (single mode) or file name template (group mode).
    pub output: PathBuf,
    /// Per-group output instead of a single document.
    pub groups: bool,
    /// Emit anchors for internal links.
    pub anchors: bool,
    /// Template language.
    pub lang: String,
    /// Optional template override directory.
    pub template_dir: Option<PathBuf>,
    /// Ordered member categories.
    pub member_filter: Vec<String>,
    /// Ordered compound kinds.
    pub compound_filter: Vec<String>,
}

impl From<&AppConfig> for RenderConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            input_dir: PathBuf::new(),
            output: PathBuf::from(&config.output.path),
            groups: config.output.groups,
            anchors: config.output.anchors,
            lang: config.output.lang.clone(),
            template_dir: config.output.template_dir.as_ref().map(PathBuf::from),
            member_filter: config.filters.members.clone(),
            compound_filter: config.filters.compounds.clone(),
        }
    }
}

impl RenderConfig {
    /// Path of the document written for a group: the group name is
    /// appended to the output stem, before the extension.
    pub fn group_output_path(&self, group_name: &str) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = match self.output.extension() {
            Some(ext) => format!("{stem}-{group_name}.{}", ext.to_string_lossy()),
            None => format!("{stem}-{group_name}"),
        };
        match self.output.parent() {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.doxymark/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DoxymarkError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.doxymark/doxymark.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DoxymarkError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        DoxymarkError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DoxymarkError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DoxymarkError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DoxymarkError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configurations that would silently produce empty documents.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.output.path.trim().is_empty() {
        return Err(DoxymarkError::config("output.path must not be empty"));
    }
    if config.filters.compounds.is_empty() {
        return Err(DoxymarkError::config(
            "filters.compounds is empty, nothing would be rendered",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("API.md"));
        assert!(toml_str.contains("public-func"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert!(parsed.output.groups);
        assert_eq!(parsed.filters.compounds[0], "namespace");
        assert_eq!(parsed.filters.members.len(), 4);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[output]
path = "docs/Reference.md"
groups = false

[filters]
members = ["public-func"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.output.path, "docs/Reference.md");
        assert!(!config.output.groups);
        assert!(config.output.anchors);
        assert_eq!(config.filters.members, vec!["public-func".to_string()]);
        assert_eq!(config.filters.compounds.len(), 5);
    }

    #[test]
    fn render_config_from_app_config() {
        let app = AppConfig::default();
        let render = RenderConfig::from(&app);
        assert_eq!(render.output, PathBuf::from("API.md"));
        assert!(render.groups);
        assert_eq!(render.lang, "cpp");
        assert!(render.template_dir.is_none());
    }

    #[test]
    fn group_output_path_inserts_group_name() {
        let mut render = RenderConfig::from(&AppConfig::default());
        render.output = PathBuf::from("out/API.md");
        assert_eq!(
            render.group_output_path("network"),
            PathBuf::from("out/API-network.md")
        );

        render.output = PathBuf::from("README");
        assert_eq!(render.group_output_path("core"), PathBuf::from("README-core"));
    }

    #[test]
    fn empty_compound_filter_rejected() {
        let mut config = AppConfig::default();
        config.filters.compounds.clear();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("filters.compounds"));
    }
}
