//! bufobjects-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for the indentation-based schema documents,
//!  2) Field classification and cross-file id allocation (`ingest`),
//!  3) The size-variability pass (unresolved types, embedding cycles, fixed sizes),
//!  4) A small template language and per-language template bundles (built-in `go`),
//!  5) Code emission and the end-to-end pipeline (`run`),
//!  6) Error types (`BufObjectsError`).

pub mod error;
pub mod types;
pub mod config;
pub mod utils;
pub mod classifier;
pub mod allocator;
pub mod tokenizer;
pub mod parser;
pub mod ingest;
pub mod resolver;
pub mod template;
pub mod builtin;
pub mod bundle;
pub mod emit;
pub mod compiler;

pub use compiler::{compile_documents, discover_sources, run};
pub use config::{CompilerConfig, DocumentConfig};
pub use error::BufObjectsError;
pub use parser::parse_document;
pub use types::CompiledDocument;
