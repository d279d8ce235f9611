//! Output writer.
//!
//! Serializes a [`BuildOutput`] to the registry-ready file layout:
//!
//! ```text
//! <root>/
//! ├── manifest.json
//! ├── validations.json
//! ├── courses_out/course_<ctid>.json
//! ├── frameworks_out/framework_<courseCtid>.json
//! └── learningprograms_out/learningprogram_<ctid>.json
//! ```
//!
//! Every file is written to a temp file first and renamed into place.

pub mod envelope;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use casegraph_core::{BuildOutput, ReportSummary};
use casegraph_shared::{CaseGraphError, DefaultsConfig, Result};

/// Name of the manifest written at the output root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Where each kind of file goes, relative to `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub courses_dir: PathBuf,
    pub frameworks_dir: PathBuf,
    pub learning_programs_dir: PathBuf,
    pub validations_file: PathBuf,
}

impl OutputLayout {
    /// Layout from the `[defaults]` config section, optionally under another root.
    pub fn from_defaults(defaults: &DefaultsConfig, root: Option<&Path>) -> Self {
        Self {
            root: root.map_or_else(|| PathBuf::from(&defaults.output_root), Path::to_path_buf),
            courses_dir: defaults.courses_dir.clone().into(),
            frameworks_dir: defaults.frameworks_dir.clone().into(),
            learning_programs_dir: defaults.learning_programs_dir.clone().into(),
            validations_file: defaults.validations_file.clone().into(),
        }
    }
}

/// Inputs to the writer that do not come from the build itself.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Tool version recorded in the manifest.
    pub tool_version: String,
    pub registry_base: String,
    /// Organization the learning programs are published for.
    pub publisher_ctid: Option<String>,
}

/// A serialized file, not yet on disk. `path` is relative to the layout root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Manifest entry for a written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// `manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct OutputManifest {
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub registry_base: String,
    pub summary: ReportSummary,
    pub files: Vec<WrittenFile>,
}

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct WriteResult {
    pub root: PathBuf,
    pub manifest: OutputManifest,
}

/// Serialize every output file without touching the filesystem.
pub fn render(
    output: &BuildOutput,
    layout: &OutputLayout,
    options: &WriteOptions,
    generated_at: DateTime<Utc>,
) -> Result<Vec<RenderedFile>> {
    let mut files = Vec::with_capacity(output.courses.len() * 2 + output.learning_programs.len() + 1);

    for graph in &output.courses {
        let ctid = &graph.course.ctid;
        files.push(RenderedFile {
            path: layout.courses_dir.join(format!("course_{ctid}.json")),
            contents: to_json(&envelope::course(graph))?,
        });
        files.push(RenderedFile {
            path: layout.frameworks_dir.join(format!("framework_{ctid}.json")),
            contents: to_json(&envelope::framework(graph))?,
        });
    }

    for program in &output.learning_programs {
        let env = envelope::learning_program(program, options.publisher_ctid.as_deref());
        files.push(RenderedFile {
            path: layout
                .learning_programs_dir
                .join(format!("learningprogram_{}.json", program.ctid)),
            contents: to_json(&env)?,
        });
    }

    files.push(RenderedFile {
        path: layout.validations_file.clone(),
        contents: to_json(&output.report.document(generated_at))?,
    });

    Ok(files)
}

/// Write every output file plus `manifest.json` under `layout.root`.
#[instrument(skip_all, fields(root = %layout.root.display(), courses = output.courses.len()))]
pub fn write_outputs(
    output: &BuildOutput,
    layout: &OutputLayout,
    options: &WriteOptions,
) -> Result<WriteResult> {
    let generated_at = Utc::now();
    let rendered = render(output, layout, options, generated_at)?;

    info!(files = rendered.len(), "writing outputs");

    let mut written = Vec::with_capacity(rendered.len());
    for file in &rendered {
        let target = layout.root.join(&file.path);
        write_atomic(&target, &file.contents)?;
        written.push(WrittenFile {
            path: portable(&file.path),
            sha256: sha256_hex(&file.contents),
            size_bytes: file.contents.len(),
        });
    }

    let manifest = OutputManifest {
        tool_version: options.tool_version.clone(),
        generated_at,
        registry_base: options.registry_base.clone(),
        summary: output.report.summary(),
        files: written,
    };
    write_atomic(&layout.root.join(MANIFEST_FILE), &to_json(&manifest)?)?;

    info!(
        files = manifest.files.len(),
        path = %layout.root.display(),
        "outputs written"
    );

    Ok(WriteResult {
        root: layout.root.clone(),
        manifest,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pretty-printed JSON with a trailing newline.
fn to_json<T: Serialize>(data: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(data)
        .map_err(|e| CaseGraphError::validation(format!("JSON serialization failed: {e}")))?;
    json.push('\n');
    Ok(json)
}

/// Write to `.<name>.tmp` next to `target`, then rename over it.
fn write_atomic(target: &Path, contents: &str) -> Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| CaseGraphError::io(parent, e))?;

    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CaseGraphError::contract(format!("not a file path: {}", target.display())))?;
    let temp = parent.join(format!(".{name}.tmp"));

    std::fs::write(&temp, contents).map_err(|e| CaseGraphError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| CaseGraphError::io(target, e))?;

    debug!(path = %target.display(), size = contents.len(), "wrote file");
    Ok(())
}

fn sha256_hex(contents: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn portable(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
