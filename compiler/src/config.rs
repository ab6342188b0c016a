use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PACKAGE_NAME: &str = "main";
pub const DEFAULT_INTERFACE_NAME: &str = "BufObject";
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 4096;
pub const DEFAULT_OUTPUT: &str = "bufobjects_gen.go";

/// Settings that flow into the generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub package_name:    String,
    pub interface_name:  String,
    /// Appended to every declared record name.
    pub name_suffix:     String,
    /// Scratch buffer size used by generated code, never enforced here.
    pub max_object_size: usize,
    pub imports:         Vec<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        DocumentConfig {
            package_name:    DEFAULT_PACKAGE_NAME.to_string(),
            interface_name:  DEFAULT_INTERFACE_NAME.to_string(),
            name_suffix:     String::new(),
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            imports:         Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerConfig {
    pub language:       String,
    pub schema_pattern: String,
    pub output:         PathBuf,
    /// Root holding one `<language>/` bundle directory; built-ins are used when unset.
    pub template_dir:   Option<PathBuf>,
    pub document:       DocumentConfig,
}

impl CompilerConfig {
    pub fn new(language: impl Into<String>, schema_pattern: impl Into<String>) -> Self {
        CompilerConfig {
            language:       language.into(),
            schema_pattern: schema_pattern.into(),
            output:         PathBuf::from(DEFAULT_OUTPUT),
            template_dir:   None,
            document:       DocumentConfig::default(),
        }
    }
}
