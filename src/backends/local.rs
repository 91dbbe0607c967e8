// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Local-process backend: drives a JVM-hosted rendering archive (PlantUML
//! and GraphViz grammars) and a separate CLI tool (Mermaid).
//!
//! The two toolchains are probed independently. Partial availability is
//! valid: with only the archive present this backend still serves
//! PlantUML and GraphViz; with only the CLI it serves Mermaid.
//!
//! Renders write the source to a scratch directory, invoke the tool as a
//! subprocess with its fixed argument pattern, and read the output file
//! the tool produces beside the input. The scratch directory is removed
//! when it drops, so cleanup happens on every exit path.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::consts::{DEFAULT_INTERPRETER, DEFAULT_MERMAID_CLI};
use crate::config::{Configuration, LocalToolPaths};
use crate::errors::RenderError;
use crate::render::{BackendCapability, BackendKind, DiagramType, RenderRequest, RenderResult, Theme};
use crate::traits::DiagramBackend;

pub struct LocalProcessBackend {
    tools: LocalToolPaths,
}

impl LocalProcessBackend {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            tools: config.local_tools.clone(),
        }
    }

    /// Locate a tool: an explicitly configured path must exist as given;
    /// without one, fall back to a PATH lookup.
    fn locate(configured: Option<&PathBuf>, fallback: &str, label: &str) -> Result<PathBuf, String> {
        match configured {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(format!(
                "{} configured at '{}' but no such file exists",
                label,
                path.display()
            )),
            None => which::which(fallback)
                .map_err(|_| format!("{} ('{}') not found on PATH", label, fallback)),
        }
    }

    fn locate_interpreter(&self) -> Result<PathBuf, String> {
        Self::locate(
            self.tools.interpreter_path.as_ref(),
            DEFAULT_INTERPRETER,
            "interpreter",
        )
    }

    /// The rendering archive has no PATH fallback; it must be configured.
    fn locate_archive(&self) -> Result<PathBuf, String> {
        match self.tools.archive_path.as_ref() {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(format!(
                "rendering archive configured at '{}' but no such file exists",
                path.display()
            )),
            None => Err("no rendering archive configured (local_tools.archive_path)".to_string()),
        }
    }

    fn locate_cli(&self) -> Result<PathBuf, String> {
        Self::locate(self.tools.cli_path.as_ref(), DEFAULT_MERMAID_CLI, "mermaid CLI")
    }

    /// `{interpreter} -jar {archive} -tsvg {input}`, output beside input.
    async fn render_with_archive(&self, req: &RenderRequest) -> Result<RenderResult, RenderError> {
        let interpreter = self.locate_interpreter().map_err(RenderError::Tooling)?;
        let archive = self.locate_archive().map_err(RenderError::Tooling)?;

        let scratch = tempfile::Builder::new()
            .prefix("lightbox-render-")
            .tempdir()?;
        let extension = match req.diagram_type {
            DiagramType::Graphviz => "dot",
            _ => "puml",
        };
        let input = scratch.path().join(format!("diagram.{}", extension));
        tokio::fs::write(&input, req.content.as_bytes()).await?;

        let output = Command::new(&interpreter)
            .arg("-jar")
            .arg(&archive)
            .arg("-tsvg")
            .arg(&input)
            .output()
            .await?;

        if !output.status.success() {
            return Err(RenderError::Client {
                kind: BackendKind::LocalProcess,
                message: diagnostic_from(&output.stderr, output.status),
            });
        }

        let svg_path = input.with_extension("svg");
        let svg = read_produced_svg(&svg_path).await?;
        Ok(RenderResult::Svg(svg))
        // `scratch` drops here: input and output files are removed whether
        // or not the render succeeded.
    }

    /// `{cli} -i {input} -o {output}`; the CLI is theme-aware.
    async fn render_with_cli(&self, req: &RenderRequest) -> Result<RenderResult, RenderError> {
        let cli = self.locate_cli().map_err(RenderError::Tooling)?;

        let scratch = tempfile::Builder::new()
            .prefix("lightbox-render-")
            .tempdir()?;
        let input = scratch.path().join("diagram.mmd");
        let output_path = scratch.path().join("diagram.svg");
        tokio::fs::write(&input, req.content.as_bytes()).await?;

        let mut command = Command::new(&cli);
        command.arg("-i").arg(&input).arg("-o").arg(&output_path);
        if req.theme == Theme::Dark {
            command.arg("-t").arg("dark");
        }
        let output = command.output().await?;

        if !output.status.success() {
            return Err(RenderError::Client {
                kind: BackendKind::LocalProcess,
                message: diagnostic_from(&output.stderr, output.status),
            });
        }

        let svg = read_produced_svg(&output_path).await?;
        Ok(RenderResult::Svg(svg))
    }
}

async fn read_produced_svg(path: &Path) -> Result<String, RenderError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        RenderError::Tooling(format!(
            "renderer reported success but produced no readable output file: {}",
            e
        ))
    })
}

/// Prefer the tool's own stderr text; fall back to the exit status when
/// the tool said nothing.
fn diagnostic_from(stderr: &[u8], status: std::process::ExitStatus) -> String {
    let text = String::from_utf8_lossy(stderr).trim().to_string();
    if text.is_empty() {
        format!("renderer exited with {}", status)
    } else {
        text
    }
}

#[async_trait]
impl DiagramBackend for LocalProcessBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalProcess
    }

    async fn probe(&self) -> BackendCapability {
        let mut supported = BTreeSet::new();
        let mut problems = Vec::new();

        match (self.locate_interpreter(), self.locate_archive()) {
            (Ok(_), Ok(_)) => {
                supported.insert(DiagramType::Plantuml);
                supported.insert(DiagramType::Graphviz);
            }
            (interpreter, archive) => {
                problems.extend(interpreter.err());
                problems.extend(archive.err());
            }
        }

        match self.locate_cli() {
            Ok(_) => {
                supported.insert(DiagramType::Mermaid);
            }
            Err(problem) => problems.push(problem),
        }

        BackendCapability {
            kind: BackendKind::LocalProcess,
            available: !supported.is_empty(),
            supported_types: supported,
            diagnostic: if problems.is_empty() {
                None
            } else {
                Some(problems.join("; "))
            },
        }
    }

    async fn render(&self, req: &RenderRequest) -> Result<RenderResult, RenderError> {
        match req.diagram_type {
            DiagramType::Mermaid => self.render_with_cli(req).await,
            DiagramType::Plantuml | DiagramType::Graphviz => self.render_with_archive(req).await,
            DiagramType::Structurizr => Err(RenderError::BackendUnavailable {
                kind: BackendKind::LocalProcess,
                diagram_type: req.diagram_type,
                diagnostic: "structurizr diagrams are not served by the local toolchain".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::cache_key;
    use std::path::Path;

    fn backend_with(tools: LocalToolPaths) -> LocalProcessBackend {
        LocalProcessBackend {
            tools,
        }
    }

    fn request(diagram_type: DiagramType) -> RenderRequest {
        RenderRequest {
            content: "A -> B".to_string(),
            diagram_type,
            theme: Theme::Light,
            cache_key: cache_key(Path::new("/w/x"), "A -> B"),
        }
    }

    #[tokio::test]
    async fn misconfigured_paths_disable_their_diagram_families() {
        let backend = backend_with(LocalToolPaths {
            interpreter_path: Some(PathBuf::from("/nonexistent/java")),
            archive_path: Some(PathBuf::from("/nonexistent/plantuml.jar")),
            cli_path: Some(PathBuf::from("/nonexistent/mmdc")),
        });
        let capability = backend.probe().await;
        assert!(!capability.available);
        assert!(capability.supported_types.is_empty());
        let diagnostic = capability.diagnostic.unwrap();
        assert!(diagnostic.contains("interpreter"));
        assert!(diagnostic.contains("mermaid CLI"));
    }

    #[tokio::test]
    async fn partial_availability_unlocks_archive_types_only() {
        // A readable file stands in for the interpreter and the archive;
        // only the CLI is broken.
        let scratch = tempfile::tempdir().unwrap();
        let fake_tool = scratch.path().join("tool");
        std::fs::write(&fake_tool, "#!/bin/sh\n").unwrap();

        let backend = backend_with(LocalToolPaths {
            interpreter_path: Some(fake_tool.clone()),
            archive_path: Some(fake_tool.clone()),
            cli_path: Some(PathBuf::from("/nonexistent/mmdc")),
        });
        let capability = backend.probe().await;
        assert!(capability.available);
        assert!(capability.supported_types.contains(&DiagramType::Plantuml));
        assert!(capability.supported_types.contains(&DiagramType::Graphviz));
        assert!(!capability.supported_types.contains(&DiagramType::Mermaid));
    }

    #[tokio::test]
    async fn structurizr_is_rejected_outright() {
        let backend = backend_with(LocalToolPaths::default());
        let err = backend.render(&request(DiagramType::Structurizr)).await;
        assert!(matches!(
            err,
            Err(RenderError::BackendUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn missing_cli_surfaces_tooling_error_on_render() {
        let backend = backend_with(LocalToolPaths {
            cli_path: Some(PathBuf::from("/nonexistent/mmdc")),
            ..LocalToolPaths::default()
        });
        let err = backend.render(&request(DiagramType::Mermaid)).await;
        match err {
            Err(RenderError::Tooling(message)) => assert!(message.contains("mermaid CLI")),
            other => panic!("expected tooling error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cli_render_reads_the_produced_file_and_cleans_up() {
        use std::os::unix::fs::PermissionsExt;

        let scratch = tempfile::tempdir().unwrap();
        let cli = scratch.path().join("fake-mmdc");
        // Arguments arrive as: -i <input> -o <output>
        std::fs::write(
            &cli,
            "#!/bin/sh\nout=\"$4\"\nprintf '<svg xmlns=\"http://www.w3.org/2000/svg\"><rect/></svg>' > \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&cli, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = backend_with(LocalToolPaths {
            cli_path: Some(cli),
            ..LocalToolPaths::default()
        });
        let result = backend.render(&request(DiagramType::Mermaid)).await.unwrap();
        match result {
            RenderResult::Svg(svg) => assert!(svg.contains("<rect")),
            other => panic!("expected svg, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_stderr_is_carried_verbatim() {
        use std::os::unix::fs::PermissionsExt;

        let scratch = tempfile::tempdir().unwrap();
        let cli = scratch.path().join("fake-mmdc");
        std::fs::write(
            &cli,
            "#!/bin/sh\necho 'Parse error on line 2' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&cli, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = backend_with(LocalToolPaths {
            cli_path: Some(cli),
            ..LocalToolPaths::default()
        });
        let err = backend.render(&request(DiagramType::Mermaid)).await;
        match err {
            Err(RenderError::Client { message, .. }) => {
                assert!(message.contains("Parse error on line 2"));
            }
            other => panic!("expected client error, got {:?}", other),
        }
    }
}
