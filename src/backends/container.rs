// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Containerized-CLI backend: an orchestration script drives a container
//! that renders Structurizr workspaces.
//!
//! The script's own logging format can drift between tool versions, so
//! render results are recovered along two paths: stdout is parsed for
//! `- {name}.svg` success markers and stderr for `[ERROR] ...` lines,
//! and when parsing yields nothing while the run reported no errors, the
//! configured output directory is scanned for files produced after the
//! invocation started. The scan is the source of truth when the log
//! parse is inconclusive.
//!
//! Renders are bounded by hard timeouts (60s single file, 120s for a
//! whole-workspace batch); on expiry the subprocess is killed, unlike
//! the other backends whose in-flight work merely gets discarded.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::config::consts::{
    CONTAINER_RUNTIME, CONTAINER_SINGLE_RENDER_TIMEOUT, CONTAINER_WORKSPACE_RENDER_TIMEOUT,
};
use crate::config::Configuration;
use crate::errors::RenderError;
use crate::render::{BackendCapability, BackendKind, DiagramType, RenderRequest, RenderResult};
use crate::traits::DiagramBackend;

pub struct ContainerCliBackend {
    script: Option<PathBuf>,
    container_name: String,
    output_dir: Option<PathBuf>,
    single_timeout: Duration,
    workspace_timeout: Duration,
}

struct ScriptOutput {
    status: std::process::ExitStatus,
    stdout: String,
    stderr: String,
}

impl ContainerCliBackend {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            script: config.container.script_path.clone(),
            container_name: config.container.container_name.clone(),
            output_dir: config.container.effective_output_dir(),
            single_timeout: CONTAINER_SINGLE_RENDER_TIMEOUT,
            workspace_timeout: CONTAINER_WORKSPACE_RENDER_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeouts(mut self, single: Duration, workspace: Duration) -> Self {
        self.single_timeout = single;
        self.workspace_timeout = workspace;
        self
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Render every workspace file the script knows about
    /// (`{script} --all`). Returns the produced artifact paths.
    pub async fn export_workspace(&self) -> Result<Vec<PathBuf>, RenderError> {
        let script = self.configured_script()?;
        let workspace = script_workspace(&script);
        let started = SystemTime::now();

        let output = run_script(&script, workspace, "--all", self.workspace_timeout).await?;
        let errors = parse_error_lines(&output.stderr);
        if !errors.is_empty() {
            return Err(RenderError::Client {
                kind: BackendKind::ContainerCli,
                message: errors.join("\n"),
            });
        }
        if !output.status.success() {
            return Err(RenderError::Tooling(format!(
                "orchestration script exited with {}",
                output.status
            )));
        }

        let output_dir = self.configured_output_dir()?;
        let mut produced: Vec<PathBuf> = parse_success_lines(&output.stdout)
            .into_iter()
            .map(|name| output_dir.join(name))
            .collect();
        if produced.is_empty() {
            produced = scan_fresh_svgs(&output_dir, started).await?;
        }
        Ok(produced)
    }

    async fn render_single(&self, req: &RenderRequest) -> Result<RenderResult, RenderError> {
        let script = self.configured_script()?;
        let workspace = script_workspace(&script);

        // A content-derived stem keeps concurrent renders from trampling
        // each other's scratch files inside the shared workspace.
        let digest = hex::encode(Sha256::digest(req.content.as_bytes()));
        let stem = format!("lightbox-{}", &digest[..12]);
        let input_name = format!("{}.dsl", stem);
        let input_path = workspace.join(&input_name);
        tokio::fs::write(&input_path, req.content.as_bytes()).await?;

        let started = SystemTime::now();
        let outcome = run_script(&script, workspace, &input_name, self.single_timeout).await;
        // The scratch source is removed no matter how the run ended.
        let _ = tokio::fs::remove_file(&input_path).await;
        let output = outcome?;

        let errors = parse_error_lines(&output.stderr);
        if !errors.is_empty() {
            return Err(RenderError::Client {
                kind: BackendKind::ContainerCli,
                message: errors.join("\n"),
            });
        }
        if !output.status.success() {
            return Err(RenderError::Tooling(format!(
                "orchestration script exited with {}: {}",
                output.status,
                output.stderr.trim()
            )));
        }

        let output_dir = self.configured_output_dir()?;
        let mut candidates: Vec<PathBuf> = parse_success_lines(&output.stdout)
            .into_iter()
            .map(|name| output_dir.join(name))
            .collect();
        if candidates.is_empty() {
            candidates = scan_fresh_svgs(&output_dir, started).await?;
        }

        // Prefer the artifact named after our input; the script may also
        // emit per-view files with its own naming.
        let chosen = candidates
            .iter()
            .find(|p| {
                p.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s == stem)
            })
            .or_else(|| candidates.first())
            .ok_or_else(|| {
                RenderError::Tooling(
                    "script reported no errors but no output artifact was found".to_string(),
                )
            })?;

        let svg = tokio::fs::read_to_string(chosen).await?;
        Ok(RenderResult::Svg(svg))
    }

    fn configured_script(&self) -> Result<PathBuf, RenderError> {
        match &self.script {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(RenderError::Tooling(format!(
                "orchestration script '{}' does not exist",
                path.display()
            ))),
            None => Err(RenderError::Tooling(
                "no orchestration script configured (container.script_path)".to_string(),
            )),
        }
    }

    fn configured_output_dir(&self) -> Result<PathBuf, RenderError> {
        self.output_dir.clone().ok_or_else(|| {
            RenderError::Tooling("no container output directory could be determined".to_string())
        })
    }
}

fn script_workspace(script: &Path) -> &Path {
    script.parent().unwrap_or_else(|| Path::new("."))
}

/// Run the orchestration script with one argument, killing it when the
/// timeout expires. Stdout and stderr are drained concurrently with the
/// wait so a chatty script cannot deadlock on a full pipe.
async fn run_script(
    script: &Path,
    workspace: &Path,
    argument: &str,
    limit: Duration,
) -> Result<ScriptOutput, RenderError> {
    let mut child = Command::new(script)
        .arg(argument)
        .current_dir(workspace)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| RenderError::Tooling("could not capture script stdout".to_string()))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| RenderError::Tooling("could not capture script stderr".to_string()))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stdout_pipe.read_to_string(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr_pipe.read_to_string(&mut buf).await;
        buf
    });

    let status = match tokio::time::timeout(limit, child.wait()).await {
        Ok(waited) => waited?,
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            return Err(RenderError::Timeout(limit));
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    Ok(ScriptOutput {
        status,
        stdout,
        stderr,
    })
}

/// Success markers: lines of the form `- {name}.svg`.
fn parse_success_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .map(str::trim)
        .filter(|name| name.ends_with(".svg"))
        .map(str::to_string)
        .collect()
}

/// Failure markers: lines of the form `[ERROR] ...`.
fn parse_error_lines(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .filter_map(|line| line.trim().strip_prefix("[ERROR]"))
        .map(|rest| rest.trim().to_string())
        .filter(|rest| !rest.is_empty())
        .collect()
}

/// Fallback discovery: SVG files in the output directory modified after
/// the invocation began, newest first.
async fn scan_fresh_svgs(dir: &Path, since: SystemTime) -> Result<Vec<PathBuf>, RenderError> {
    let mut fresh: Vec<(SystemTime, PathBuf)> = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        RenderError::Tooling(format!(
            "could not scan output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("svg") {
            continue;
        }
        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified >= since {
            fresh.push((modified, path));
        }
    }
    fresh.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(fresh.into_iter().map(|(_, path)| path).collect())
}

#[async_trait]
impl DiagramBackend for ContainerCliBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ContainerCli
    }

    async fn probe(&self) -> BackendCapability {
        if let Err(e) = self.configured_script() {
            return BackendCapability::unavailable(BackendKind::ContainerCli, e.to_string());
        }

        match Command::new(CONTAINER_RUNTIME)
            .arg("ps")
            .arg("--format")
            .arg("{{.Names}}")
            .output()
            .await
        {
            Err(e) => BackendCapability::unavailable(
                BackendKind::ContainerCli,
                format!("container runtime '{}' not reachable: {}", CONTAINER_RUNTIME, e),
            ),
            Ok(out) if !out.status.success() => BackendCapability::unavailable(
                BackendKind::ContainerCli,
                format!(
                    "'{} ps' failed: {}",
                    CONTAINER_RUNTIME,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            ),
            Ok(_) => BackendCapability {
                kind: BackendKind::ContainerCli,
                available: true,
                supported_types: BTreeSet::from([DiagramType::Structurizr]),
                diagnostic: None,
            },
        }
    }

    async fn render(&self, req: &RenderRequest) -> Result<RenderResult, RenderError> {
        if req.diagram_type != DiagramType::Structurizr {
            return Err(RenderError::BackendUnavailable {
                kind: BackendKind::ContainerCli,
                diagram_type: req.diagram_type,
                diagnostic: "the containerized pipeline renders structurizr workspaces only"
                    .to_string(),
            });
        }
        self.render_single(req).await
    }
}
