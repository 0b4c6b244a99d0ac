use crate::{
    error::ConfigError,
    geometry::Size,
    graph::{LayoutAxis, DEFAULT_NODE_SIZE},
    layout::LayoutConfig,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Editor settings. Every field is optional in the YAML form.
///
/// ```yaml
/// axis: Horizontal
/// layout:
///   level_spacing: 120
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub layout: LayoutConfig,
    pub axis: LayoutAxis,
    /// Size given to scene nodes until the view reports the rendered one.
    pub node_size: Size,
    /// Extension of tree files, without the dot.
    pub file_extension: String,
    /// Extensions still accepted when opening a file.
    pub legacy_extensions: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            axis: LayoutAxis::default(),
            node_size: DEFAULT_NODE_SIZE,
            file_extension: "bhbtree".to_owned(),
            legacy_extensions: vec!["ssbt".to_owned()],
        }
    }
}

impl EditorConfig {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    /// Whether `path` has the tree file extension or a legacy one.
    pub fn accepts_file(&self, path: impl AsRef<Path>) -> bool {
        let Some(ext) = path.as_ref().extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        ext.eq_ignore_ascii_case(&self.file_extension)
            || self
                .legacy_extensions
                .iter()
                .any(|legacy| ext.eq_ignore_ascii_case(legacy))
    }
}
