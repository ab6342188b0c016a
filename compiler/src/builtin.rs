//! Template bundles compiled into the crate.

macro_rules! templates {
    ($dir:literal: $($name:literal),* $(,)?) => {
        &[$(($name, include_str!(concat!("../templates/", $dir, "/", $name, ".tmpl")))),*]
    };
}

static GO_TEMPLATES: &[(&str, &str)] = templates!("go":
    "doc",
    "objects",
    "record",
    "array_index",
    "write/write_bool",
    "write/write_byte",
    "write/write_int8",
    "write/write_int16",
    "write/write_int32",
    "write/write_int64",
    "write/write_uint8",
    "write/write_uint16",
    "write/write_uint32",
    "write/write_uint64",
    "write/write_float32",
    "write/write_float64",
    "write/write_int",
    "write/write_uint",
    "write/write_string",
    "write/write_array",
    "write/write_slice",
    "write/write_object",
    "write/write_object_indexed",
    "read/read_bool",
    "read/read_byte",
    "read/read_int8",
    "read/read_int16",
    "read/read_int32",
    "read/read_int64",
    "read/read_uint8",
    "read/read_uint16",
    "read/read_uint32",
    "read/read_uint64",
    "read/read_float32",
    "read/read_float64",
    "read/read_int",
    "read/read_uint",
    "read/read_string",
    "read/read_array",
    "read/read_slice",
    "read/read_object",
    "read/read_object_indexed",
);

static GO_MANIFEST: &str = include_str!("../templates/go/bundle.json");

/// Sources and manifest of the built-in bundle for `language`.
pub fn bundle(language: &str) -> Option<(&'static [(&'static str, &'static str)], &'static str)> {
    match language {
        "go" => Some((GO_TEMPLATES, GO_MANIFEST)),
        _ => None,
    }
}
