use serde::Serialize;
use std::ops::Range;

use crate::config::DocumentConfig;

/// Scalar base types a field may be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Bool,
    Byte,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
}

impl ScalarType {
    pub const ALL: [ScalarType; 15] = [
        ScalarType::Bool,
        ScalarType::Byte,
        ScalarType::Int,
        ScalarType::Int8,
        ScalarType::Int16,
        ScalarType::Int32,
        ScalarType::Int64,
        ScalarType::Uint,
        ScalarType::Uint8,
        ScalarType::Uint16,
        ScalarType::Uint32,
        ScalarType::Uint64,
        ScalarType::Float32,
        ScalarType::Float64,
        ScalarType::String,
    ];

    pub fn from_keyword(keyword: &str) -> Option<ScalarType> {
        ScalarType::ALL.iter().copied().find(|t| t.keyword() == keyword)
    }

    /// The keyword used in schemas and as the template key suffix.
    pub fn keyword(self) -> &'static str {
        match self {
            ScalarType::Bool    => "bool",
            ScalarType::Byte    => "byte",
            ScalarType::Int     => "int",
            ScalarType::Int8    => "int8",
            ScalarType::Int16   => "int16",
            ScalarType::Int32   => "int32",
            ScalarType::Int64   => "int64",
            ScalarType::Uint    => "uint",
            ScalarType::Uint8   => "uint8",
            ScalarType::Uint16  => "uint16",
            ScalarType::Uint32  => "uint32",
            ScalarType::Uint64  => "uint64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::String  => "string",
        }
    }

    /// Encoded width in bytes, `None` for unbounded text.
    pub fn width(self) -> Option<usize> {
        match self {
            ScalarType::Bool | ScalarType::Byte | ScalarType::Int8 | ScalarType::Uint8 => Some(1),
            ScalarType::Int16 | ScalarType::Uint16 => Some(2),
            ScalarType::Int | ScalarType::Uint => Some(4),
            ScalarType::Int32 | ScalarType::Uint32 | ScalarType::Float32 => Some(4),
            ScalarType::Int64 | ScalarType::Uint64 | ScalarType::Float64 => Some(8),
            ScalarType::String => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Scalar,
    FixedArray,
    DynamicSequence,
    ObjectReference,
    ObjectFixedArray,
    ObjectDynamicSequence,
}

impl FieldShape {
    pub fn is_object(self) -> bool {
        matches!(
            self,
            FieldShape::ObjectReference | FieldShape::ObjectFixedArray | FieldShape::ObjectDynamicSequence
        )
    }

    pub fn is_fixed_array(self) -> bool {
        matches!(self, FieldShape::FixedArray | FieldShape::ObjectFixedArray)
    }

    pub fn is_dynamic_sequence(self) -> bool {
        matches!(self, FieldShape::DynamicSequence | FieldShape::ObjectDynamicSequence)
    }
}

/// Base type of a field once any array/sequence prefix is stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Scalar(ScalarType),
    Object(String),
}

impl ElementType {
    pub fn name(&self) -> &str {
        match self {
            ElementType::Scalar(t)    => t.keyword(),
            ElementType::Object(name) => name,
        }
    }
}

/// Result of classifying a raw type token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
    pub shape:        FieldShape,
    pub element:      ElementType,
    pub array_length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name:       String,
    pub type_token: String,
    pub ty:         FieldType,
}

impl Field {
    pub fn shape(&self) -> FieldShape {
        self.ty.shape
    }

    pub fn element_type(&self) -> &str {
        self.ty.element.name()
    }

    pub fn array_length(&self) -> Option<u32> {
        self.ty.array_length
    }

    pub fn lower_camel_name(&self) -> String {
        crate::utils::lower_camel(&self.name)
    }

    /// Width of a single element, `None` for objects and strings.
    pub fn base_size(&self) -> Option<usize> {
        match self.ty.element {
            ElementType::Scalar(t) => t.width(),
            ElementType::Object(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id:               u16,
    pub name:             String,
    pub raw_name:         String,
    pub fields:           Vec<Field>,
    pub is_variable_size: bool,
    pub fixed_size:       Option<usize>,
}

/// Records of one ingested source and where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpan {
    pub origin:  String,
    pub records: Range<usize>,
}

/// The output unit of one compilation run for one target language.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledDocument {
    pub config:         DocumentConfig,
    pub records:        Vec<Record>,
    pub sources:        Vec<SourceSpan>,
    pub generated_body: String,
}

impl CompiledDocument {
    pub fn new(config: DocumentConfig) -> Self {
        CompiledDocument {
            config,
            ..Default::default()
        }
    }

    pub fn record_by_raw_name(&self, raw_name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.raw_name == raw_name)
    }
}
