// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Core data model shared by the classifier, the backend registry, the
//! render cache, and the preview engine.
//!
//! Everything in this module is immutable once produced. `RenderResult`
//! values in particular are handed to the cache and to the presentation
//! channel simultaneously, so they must be safe to clone and share.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The grammar a backend must target, as distinct from the backend that
/// executes the render.
///
/// String forms match the path segments of the remote rendering service
/// (`mermaid`, `plantuml`, `graphviz`, `structurizr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramType {
    Mermaid,
    Plantuml,
    Graphviz,
    Structurizr,
}

impl DiagramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramType::Mermaid => "mermaid",
            DiagramType::Plantuml => "plantuml",
            DiagramType::Graphviz => "graphviz",
            DiagramType::Structurizr => "structurizr",
        }
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mermaid" => Ok(DiagramType::Mermaid),
            "plantuml" => Ok(DiagramType::Plantuml),
            "graphviz" => Ok(DiagramType::Graphviz),
            "structurizr" => Ok(DiagramType::Structurizr),
            other => Err(format!("unknown diagram type: '{}'", other)),
        }
    }
}

/// Render execution strategy.
///
/// A closed set: dispatch over backend kinds is an exhaustive `match` at the
/// registry boundary, so adding a variant forces every dispatch site to be
/// revisited.
///
/// # Variants
/// * `LocalProcess` - local interpreter + rendering archive, plus a separate CLI tool
/// * `RemoteHttp` - remote HTTP rendering service
/// * `ContainerCli` - orchestration script driving a containerized CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    LocalProcess,
    RemoteHttp,
    ContainerCli,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::LocalProcess => "local_process",
            BackendKind::RemoteHttp => "remote_http",
            BackendKind::ContainerCli => "container_cli",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local_process" | "local" => Ok(BackendKind::LocalProcess),
            "remote_http" | "remote" => Ok(BackendKind::RemoteHttp),
            "container_cli" | "container" => Ok(BackendKind::ContainerCli),
            other => Err(format!("unknown backend kind: '{}'", other)),
        }
    }
}

/// Preview theme. Carried on every render request; only theme-aware
/// backend/type pairs fold it into the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Output format of a successful render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Svg,
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagram source as supplied by the editing surface. Read-only to the
/// core for the duration of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSource {
    pub path: PathBuf,
    pub text: String,
}

impl DiagramSource {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Lowercased file extension, if the path has one.
    pub fn file_extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Outcome of classification: which backend executes the render and which
/// grammar it targets.
///
/// `diagram_type` is `None` when the backend is expected to detect the
/// grammar itself; a classification that cannot even name a backend is
/// represented as the absence of a `ClassificationResult` (see
/// `classify::Classifier::classify`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationResult {
    pub backend: BackendKind,
    pub diagram_type: Option<DiagramType>,
}

impl ClassificationResult {
    pub fn new(backend: BackendKind, diagram_type: DiagramType) -> Self {
        Self {
            backend,
            diagram_type: Some(diagram_type),
        }
    }
}

/// A single render request as dispatched to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub content: String,
    pub diagram_type: DiagramType,
    pub theme: Theme,
    pub cache_key: String,
}

/// Result of a render attempt.
///
/// A tagged union rather than a `Result`: the error arm is itself a value
/// that flows to the presentation surface, and the cache refuses to store
/// it (failures are not memoized so the next edit retries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    Svg(String),
    Png(Vec<u8>),
    Error { message: String },
}

impl RenderResult {
    pub fn is_error(&self) -> bool {
        matches!(self, RenderResult::Error { .. })
    }

    /// Output format of a successful render; `None` for the error arm.
    pub fn format(&self) -> Option<OutputFormat> {
        match self {
            RenderResult::Svg(_) => Some(OutputFormat::Svg),
            RenderResult::Png(_) => Some(OutputFormat::Png),
            RenderResult::Error { .. } => None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RenderResult::Error {
            message: message.into(),
        }
    }
}

/// What a backend reports about itself when probed.
///
/// Recomputed on demand; the registry caches probes per session, never
/// across process restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCapability {
    pub kind: BackendKind,
    pub available: bool,
    pub supported_types: BTreeSet<DiagramType>,
    pub diagnostic: Option<String>,
}

impl BackendCapability {
    pub fn supports(&self, diagram_type: DiagramType) -> bool {
        self.available && self.supported_types.contains(&diagram_type)
    }

    pub fn unavailable(kind: BackendKind, diagnostic: impl Into<String>) -> Self {
        Self {
            kind,
            available: false,
            supported_types: BTreeSet::new(),
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// State pushed to the presentation surface over the outbound channel.
///
/// The core never holds a reference to concrete presentation objects; this
/// union is the entire contract. `Svg`/`Png` correspond to the `result`
/// state with its format tag, `Error` always carries a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    Loading,
    Svg { content: String },
    Png { content: Vec<u8> },
    Error { message: String },
}

impl PreviewState {
    /// Map a settled render result onto the channel union.
    pub fn from_result(result: RenderResult) -> Self {
        match result {
            RenderResult::Svg(content) => PreviewState::Svg { content },
            RenderResult::Png(content) => PreviewState::Png { content },
            RenderResult::Error { message } => PreviewState::Error { message },
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, PreviewState::Loading)
    }
}

/// True when the `(backend, type)` pair folds the theme into its output,
/// which in turn forces the theme into the cache key.
pub fn is_theme_aware(backend: BackendKind, diagram_type: DiagramType) -> bool {
    matches!(
        (backend, diagram_type),
        (BackendKind::LocalProcess, DiagramType::Mermaid)
    )
}

/// Derive the output path for an exported artifact: the source file name
/// with the format's extension, placed in `out_dir` when given, else
/// beside the source.
pub fn artifact_path(source: &Path, out_dir: Option<&Path>, format: OutputFormat) -> PathBuf {
    let with_ext = source.with_extension(format.file_extension());
    match (out_dir, with_ext.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => with_ext,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_round_trips_through_strings() {
        for kind in [
            BackendKind::LocalProcess,
            BackendKind::RemoteHttp,
            BackendKind::ContainerCli,
        ] {
            assert_eq!(kind.as_str().parse::<BackendKind>(), Ok(kind));
        }
    }

    #[test]
    fn backend_kind_accepts_short_forms() {
        assert_eq!("local".parse(), Ok(BackendKind::LocalProcess));
        assert_eq!("remote".parse(), Ok(BackendKind::RemoteHttp));
        assert_eq!("container".parse(), Ok(BackendKind::ContainerCli));
        assert!("grpc".parse::<BackendKind>().is_err());
    }

    #[test]
    fn diagram_type_strings_match_remote_path_segments() {
        assert_eq!(DiagramType::Plantuml.as_str(), "plantuml");
        assert_eq!("structurizr".parse(), Ok(DiagramType::Structurizr));
    }

    #[test]
    fn file_extension_is_lowercased() {
        let source = DiagramSource::new("/work/Flow.MMD", "graph TD");
        assert_eq!(source.file_extension().as_deref(), Some("mmd"));

        let bare = DiagramSource::new("/work/notes", "whatever");
        assert_eq!(bare.file_extension(), None);
    }

    #[test]
    fn error_results_have_no_format() {
        assert_eq!(RenderResult::error("boom").format(), None);
        assert_eq!(
            RenderResult::Svg("<svg/>".into()).format(),
            Some(OutputFormat::Svg)
        );
    }

    #[test]
    fn preview_state_maps_result_arms() {
        let state = PreviewState::from_result(RenderResult::error("no backend"));
        assert_eq!(
            state,
            PreviewState::Error {
                message: "no backend".into()
            }
        );
        assert!(state.is_settled());
        assert!(!PreviewState::Loading.is_settled());
    }

    #[test]
    fn artifact_path_prefers_out_dir() {
        let p = artifact_path(
            Path::new("/ws/docs/flow.mmd"),
            Some(Path::new("/tmp/out")),
            OutputFormat::Svg,
        );
        assert_eq!(p, PathBuf::from("/tmp/out/flow.svg"));

        let beside = artifact_path(Path::new("/ws/docs/flow.mmd"), None, OutputFormat::Png);
        assert_eq!(beside, PathBuf::from("/ws/docs/flow.png"));
    }
}
