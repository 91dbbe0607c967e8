// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Diagnostics and batch-export CLI for the rendering engine.
//!
//! `lightbox probe` reports each backend's availability and the diagram
//! types it can serve. `lightbox render` runs the batch exporter over a
//! set of files, or hands a whole workspace to the containerized
//! pipeline with `--all`.

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;

use the_lightbox::backends::ContainerCliBackend;
use the_lightbox::config::{self, Configuration};
use the_lightbox::engine::{BatchExporter, SessionContext};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} probe", program);
    eprintln!(
        "       {} render <file> [<file> ...] [--out <dir>] [--json]",
        program
    );
    eprintln!("       {} render --all", program);
    eprintln!();
    eprintln!("Configuration is resolved from built-in defaults, the user config");
    eprintln!("file, the workspace .lightbox.yaml, and LIGHTBOX_* environment");
    eprintln!("variables, in that order.");
    process::exit(2);
}

fn resolve_configuration() -> anyhow::Result<Configuration> {
    let workspace_root = env::current_dir().ok();
    config::resolve_from_environment(workspace_root.as_deref())
        .context("could not resolve configuration")
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let program = args
        .first()
        .map(String::as_str)
        .unwrap_or("lightbox")
        .to_string();
    if args.len() < 2 {
        usage(&program);
    }

    let config = match resolve_configuration() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(2);
        }
    };

    match args[1].as_str() {
        "probe" => probe(config).await,
        "render" => render(config, &args[2..], &program).await,
        _ => usage(&program),
    }
}

async fn probe(config: Arc<Configuration>) {
    let context = SessionContext::new(config);
    for capability in context.registry.probe_all().await {
        if capability.available {
            let types: Vec<&str> = capability
                .supported_types
                .iter()
                .map(|t| t.as_str())
                .collect();
            println!("{:<14} available ({})", capability.kind, types.join(", "));
            if let Some(diagnostic) = capability.diagnostic {
                println!("{:<14} note: {}", "", diagnostic);
            }
        } else {
            println!(
                "{:<14} unavailable: {}",
                capability.kind,
                capability.diagnostic.unwrap_or_default()
            );
        }
    }
}

async fn render(config: Arc<Configuration>, args: &[String], program: &str) {
    if args.first().map(String::as_str) == Some("--all") {
        let backend = ContainerCliBackend::from_config(&config);
        match backend.export_workspace().await {
            Ok(artifacts) => {
                for artifact in &artifacts {
                    println!("rendered {}", artifact.display());
                }
                println!("{} artifact(s) produced", artifacts.len());
            }
            Err(e) => {
                eprintln!("workspace render failed: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let mut files = Vec::new();
    let mut out_dir = None;
    let mut json = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" => match iter.next() {
                Some(dir) => out_dir = Some(PathBuf::from(dir)),
                None => usage(program),
            },
            "--json" => json = true,
            other if other.starts_with("--") => usage(program),
            other => files.push(PathBuf::from(other)),
        }
    }
    if files.is_empty() {
        usage(program);
    }

    let context = SessionContext::new(config);
    let report = BatchExporter::new(&context).export(files, out_dir).await;

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(serialized) => println!("{}", serialized),
            Err(e) => {
                eprintln!("could not serialize report: {}", e);
                process::exit(1);
            }
        }
    } else {
        for outcome in &report.outcomes {
            match (&outcome.artifact, &outcome.error) {
                (Some(artifact), _) => {
                    println!("ok   {} -> {}", outcome.source.display(), artifact.display())
                }
                (None, Some(error)) => println!("fail {}: {}", outcome.source.display(), error),
                (None, None) => {}
            }
        }
        println!(
            "{} succeeded, {} failed in {:?}",
            report.succeeded(),
            report.failed(),
            report.duration
        );
    }
    if !report.all_succeeded() {
        process::exit(1);
    }
}
