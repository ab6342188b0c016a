use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    builtin,
    error::BufObjectsError,
    template::Template,
    types::{ElementType, FieldShape, ScalarType},
};

pub const DOC: &str = "doc";
pub const OBJECTS: &str = "objects";
pub const RECORD: &str = "record";
pub const ARRAY_INDEX: &str = "array_index";
pub const MANIFEST: &str = "bundle.json";

const TEMPLATE_EXTENSION: &str = "tmpl";

/// Selects which template family renders a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    Scalar(ScalarType),
    Array,
    Slice,
    Object,
    ObjectIndexed,
}

impl TemplateKey {
    pub fn for_shape(shape: FieldShape, element: &ElementType) -> TemplateKey {
        match (shape, element) {
            (FieldShape::ObjectFixedArray, _) | (FieldShape::ObjectDynamicSequence, _) => TemplateKey::ObjectIndexed,
            (FieldShape::ObjectReference, _) => TemplateKey::Object,
            (FieldShape::FixedArray, _) => TemplateKey::Array,
            (FieldShape::DynamicSequence, _) => TemplateKey::Slice,
            (FieldShape::Scalar, ElementType::Scalar(t)) => TemplateKey::Scalar(*t),
            // Classification never pairs a scalar shape with a record name.
            (FieldShape::Scalar, ElementType::Object(_)) => TemplateKey::Object,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            TemplateKey::Scalar(t)     => t.keyword(),
            TemplateKey::Array         => "array",
            TemplateKey::Slice         => "slice",
            TemplateKey::Object        => "object",
            TemplateKey::ObjectIndexed => "object_indexed",
        }
    }

    /// Keys whose templates loop and need per-element code.
    pub fn is_indexed(self) -> bool {
        matches!(self, TemplateKey::Array | TemplateKey::Slice | TemplateKey::ObjectIndexed)
    }

    pub fn template_name(self, direction: Direction) -> String {
        format!("{}{}", direction.prefix(), self.suffix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Write,
    Read,
}

impl Direction {
    fn prefix(self) -> &'static str {
        match self {
            Direction::Write => "write/write_",
            Direction::Read  => "read/read_",
        }
    }
}

/// Bundle metadata, read from `bundle.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Imports every generated document needs.
    pub base_imports: Vec<String>,
    /// Extra imports keyed by element type, added when any field uses it.
    pub imports:      HashMap<String, Vec<String>>,
    /// Field names that clash with the language or the generated methods;
    /// templates get them as `ident` with a trailing `_`.
    pub reserved:     Vec<String>,
}

/// All templates of one target language.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    language:  String,
    templates: HashMap<String, Template>,
    manifest:  Manifest,
}

impl TemplateSet {
    pub fn new(language: &str, manifest: Manifest) -> Self {
        TemplateSet {
            language:  language.to_string(),
            templates: HashMap::new(),
            manifest,
        }
    }

    /// Parses and registers a template under `name`.
    pub fn add(&mut self, name: &str, source: &str) -> Result<(), BufObjectsError> {
        let template = Template::parse(name, source)?;
        self.templates.insert(name.to_string(), template);
        Ok(())
    }

    /// Templates compiled into the binary.
    pub fn builtin(language: &str) -> Result<TemplateSet, BufObjectsError> {
        let (sources, manifest) = builtin::bundle(language).ok_or_else(|| {
            BufObjectsError::Config(format!("no built-in templates for language \"{}\"", language))
        })?;
        let mut set = TemplateSet::new(language, serde_json::from_str(manifest)?);
        for (name, source) in sources {
            set.add(name, source)?;
        }
        Ok(set)
    }

    /// Loads `<root>/<language>/**/*.tmpl`; a template's name is its path
    /// relative to the bundle directory without the extension.
    pub fn load_dir(root: &Path, language: &str) -> Result<TemplateSet, BufObjectsError> {
        let dir = root.join(language);
        if !dir.is_dir() {
            return Err(BufObjectsError::Config(format!(
                "template directory {} does not exist",
                dir.display()
            )));
        }

        let manifest_path = dir.join(MANIFEST);
        let manifest = if manifest_path.is_file() {
            serde_json::from_str(&fs::read_to_string(&manifest_path)?)?
        } else {
            Manifest::default()
        };

        let mut set = TemplateSet::new(language, manifest);
        for entry in WalkDir::new(&dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| BufObjectsError::Io(e.into()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION)
            {
                continue;
            }
            let relative = path.strip_prefix(&dir).unwrap_or(path).with_extension("");
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            debug!(template = %name, path = %path.display(), "loading template");
            set.add(&name, &fs::read_to_string(path)?)?;
        }
        Ok(set)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn get(&self, name: &str) -> Result<&Template, BufObjectsError> {
        self.templates
            .get(name)
            .ok_or_else(|| BufObjectsError::MissingTemplate { key: name.to_string() })
    }

    pub fn field_template(&self, key: TemplateKey, direction: Direction) -> Result<&Template, BufObjectsError> {
        self.get(&key.template_name(direction))
    }

    pub fn base_imports(&self) -> &[String] {
        &self.manifest.base_imports
    }

    /// `name` as a safe identifier in the target language.
    pub fn identifier(&self, name: &str) -> String {
        if self.manifest.reserved.iter().any(|r| r == name) {
            format!("{}_", name)
        } else {
            name.to_string()
        }
    }

    pub fn imports_for(&self, element_type: &str) -> &[String] {
        self.manifest
            .imports
            .get(element_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
