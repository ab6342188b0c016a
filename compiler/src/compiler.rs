use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use globset::GlobBuilder;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    allocator::IdAllocator,
    bundle::TemplateSet,
    config::{CompilerConfig, DocumentConfig},
    emit::Emitter,
    error::BufObjectsError,
    ingest::ingest,
    parser::{parse_document, SchemaDocument},
    resolver::resolve,
    types::CompiledDocument,
};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Expands a schema glob into the matching files, sorted.
///
/// `*` and `?` never cross a `/`; use `**` to descend. A pattern whose
/// directory does not exist matches nothing.
pub fn discover_sources(pattern: &str) -> Result<Vec<PathBuf>, BufObjectsError> {
    let glob_error = |e: globset::Error| BufObjectsError::Glob {
        pattern: pattern.to_string(),
        msg:     e.kind().to_string(),
    };
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(glob_error)?
        .compile_matcher();

    let prefix = literal_prefix(pattern);
    let base = if prefix.is_empty() { Path::new(".") } else { Path::new(prefix) };
    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let mut walker = WalkDir::new(base).min_depth(1).follow_links(true).sort_by_file_name();
    if !pattern.contains("**") {
        let rest = pattern[prefix.len()..].trim_start_matches('/');
        walker = walker.max_depth(rest.matches('/').count() + 1);
    }

    let mut sources = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| BufObjectsError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = if prefix.is_empty() {
            entry.path().strip_prefix(".").unwrap_or(entry.path())
        } else {
            entry.path()
        };
        if matcher.is_match(path) {
            sources.push(path.to_path_buf());
        }
    }
    sources.sort();
    Ok(sources)
}

/// Directory part of `pattern` before its first wildcard.
fn literal_prefix(pattern: &str) -> &str {
    let wildcard = pattern
        .find(|c| matches!(c, '*' | '?' | '[' | '{'))
        .unwrap_or(pattern.len());
    match pattern[..wildcard].rfind('/') {
        Some(0)   => "/",
        Some(pos) => &pattern[..pos],
        None      => "",
    }
}

/// Ingests, resolves and emits `sources` in order.
///
/// Returns the finished document together with the rendered output text.
/// Emission only starts once every record is resolved, so a record sees
/// the final size of records declared in later sources.
pub fn compile_documents(
    sources: &[SchemaDocument],
    config: &DocumentConfig,
    templates: &TemplateSet,
) -> Result<(CompiledDocument, String), BufObjectsError> {
    let mut ids = IdAllocator::new();
    let mut doc = CompiledDocument::new(config.clone());

    for source in sources {
        let count = ingest(source, &mut ids, &mut doc)?;
        info!(origin = %source.origin, records = count, "ingested schema");
    }

    resolve(&mut doc.records)?;

    doc.generated_body = Emitter::new(templates, &doc).emit_body()?;
    let text = Emitter::new(templates, &doc).emit_document()?;
    Ok((doc, text))
}

/// Runs one full compilation.
///
/// Returns the written output path, or `None` when the pattern matched no
/// sources. Nothing is written unless the whole run succeeds.
pub fn run(config: &CompilerConfig) -> Result<Option<PathBuf>, BufObjectsError> {
    let paths = discover_sources(&config.schema_pattern)?;
    if paths.is_empty() {
        warn!(pattern = %config.schema_pattern, "no schema sources matched, nothing to do");
        return Ok(None);
    }

    let templates = match &config.template_dir {
        Some(dir) => TemplateSet::load_dir(dir, &config.language)?,
        None => TemplateSet::builtin(&config.language)?,
    };

    let mut sources = Vec::with_capacity(paths.len());
    for path in &paths {
        let text = fs::read_to_string(path).map_err(|e| with_path(e, path))?;
        sources.push(parse_document(&path.to_string_lossy(), &text)?);
    }

    let (doc, text) = compile_documents(&sources, &config.document, &templates)?;
    write_atomic(&config.output, text.as_bytes())?;
    info!(
        output = %config.output.display(),
        language = templates.language(),
        records = doc.records.len(),
        "wrote generated code"
    );
    Ok(Some(config.output.clone()))
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), BufObjectsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| with_path(e, parent))?;
        }
    }

    let tmp = temp_path_next_to(path);
    fs::write(&tmp, contents).map_err(|e| with_path(e, &tmp))?;

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(with_path(e, path));
    }
    Ok(())
}

fn temp_path_next_to(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.tmp", file_name, std::process::id(), n))
}

fn with_path(err: io::Error, path: &Path) -> BufObjectsError {
    BufObjectsError::Io(io::Error::new(err.kind(), format!("{}: {}", path.display(), err)))
}
