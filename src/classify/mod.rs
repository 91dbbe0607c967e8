// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resolution of diagram source into a `(backend, diagram type)` pair.
//!
//! Classification is a two-stage lookup: a static extension table first
//! (the fast path), then an **ordered** list of content-sniffing rules
//! against the trimmed source text, first match wins. Rule order matters:
//! GraphViz's bare `graph` token would otherwise collide with Mermaid's
//! `graph` keyword, so GraphViz is checked first and only claims the
//! source when the first line also carries a `{`.
//!
//! Classification never fails with an error. An input no rule matches
//! resolves to `None`, and the caller prompts for a manual choice that is
//! used for that render only.

use crate::config::Configuration;
use crate::observability::messages::classify::{ClassificationAmbiguous, ClassificationResolved};
use crate::observability::messages::StructuredLog;
use crate::render::{BackendKind, ClassificationResult, DiagramSource, DiagramType};

/// Leading keywords that identify a Mermaid source. The direction-qualified
/// `graph TB|BT|RL|LR|TD` form is handled separately so it cannot shadow
/// GraphViz's `graph {` form.
const MERMAID_KEYWORDS: &[&str] = &[
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "flowchart",
    "gantt",
    "pie",
    "journey",
    "gitGraph",
    "mindmap",
    "timeline",
    "quadrantChart",
    "requirementDiagram",
];

const MERMAID_GRAPH_DIRECTIONS: &[&str] = &["TB", "BT", "RL", "LR", "TD"];

/// One content-sniffing rule: a named predicate over trimmed source text
/// and the diagram type it claims.
struct SniffRule {
    name: &'static str,
    matches: fn(&str) -> bool,
    diagram_type: DiagramType,
}

/// Ordered rule list; earlier rules win. See the module docs for why
/// GraphViz precedes Mermaid.
const SNIFF_RULES: &[SniffRule] = &[
    SniffRule {
        name: "structurizr_workspace",
        matches: sniff_structurizr,
        diagram_type: DiagramType::Structurizr,
    },
    SniffRule {
        name: "plantuml_start_marker",
        matches: sniff_plantuml,
        diagram_type: DiagramType::Plantuml,
    },
    SniffRule {
        name: "graphviz_graph_block",
        matches: sniff_graphviz,
        diagram_type: DiagramType::Graphviz,
    },
    SniffRule {
        name: "mermaid_keyword",
        matches: sniff_mermaid,
        diagram_type: DiagramType::Mermaid,
    },
];

fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

fn sniff_structurizr(text: &str) -> bool {
    first_token(text) == Some("workspace")
}

fn sniff_plantuml(text: &str) -> bool {
    first_token(text).is_some_and(|tok| tok.starts_with("@start"))
}

fn sniff_graphviz(text: &str) -> bool {
    let mut tokens = text.split_whitespace();
    let mut head = match tokens.next() {
        Some(tok) => tok,
        None => return false,
    };
    // DOT allows a `strict` qualifier before the graph keyword.
    if head == "strict" {
        head = match tokens.next() {
            Some(tok) => tok,
            None => return false,
        };
    }
    if head == "digraph" {
        return true;
    }
    // Bare `graph` is only GraphViz when the opening brace appears on the
    // same (first) line; `graph TD` and friends belong to Mermaid.
    head == "graph" && text.lines().next().is_some_and(|line| line.contains('{'))
}

fn sniff_mermaid(text: &str) -> bool {
    let mut tokens = text.split_whitespace();
    let head = match tokens.next() {
        Some(tok) => tok,
        None => return false,
    };
    if MERMAID_KEYWORDS.contains(&head) {
        return true;
    }
    head == "graph"
        && tokens
            .next()
            .is_some_and(|dir| MERMAID_GRAPH_DIRECTIONS.contains(&dir))
}

/// Resolves diagram source to the backend that executes it and the grammar
/// it targets.
///
/// The two spots where the static tables name alternative backends
/// (PlantUML: local or remote; Structurizr: remote or container) are
/// resolved at construction time from configuration, so classification
/// itself stays a pure function of its input.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    plantuml_backend: BackendKind,
    structurizr_backend: BackendKind,
}

impl Classifier {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            plantuml_backend: config.plantuml_backend,
            structurizr_backend: config.structurizr_backend,
        }
    }

    /// Classify a source file. Returns `None` when neither the extension
    /// table nor any content rule matches; never an error.
    pub fn classify(&self, source: &DiagramSource) -> Option<ClassificationResult> {
        if let Some(result) = self.classify_by_extension(source) {
            ClassificationResolved {
                backend: result.backend,
                diagram_type: result.diagram_type,
                rule: "extension",
            }
            .log();
            return Some(result);
        }

        let trimmed = source.text.trim_start();
        for rule in SNIFF_RULES {
            if (rule.matches)(trimmed) {
                let result =
                    ClassificationResult::new(self.backend_for(rule.diagram_type), rule.diagram_type);
                ClassificationResolved {
                    backend: result.backend,
                    diagram_type: result.diagram_type,
                    rule: rule.name,
                }
                .log();
                return Some(result);
            }
        }

        ClassificationAmbiguous {
            path: source.path.as_path(),
        }
        .log();
        None
    }

    /// Static extension table. Immutable process-wide; user overrides for
    /// ambiguous sources are per-render, never persisted here.
    fn classify_by_extension(&self, source: &DiagramSource) -> Option<ClassificationResult> {
        let ext = source.file_extension()?;
        let diagram_type = match ext.as_str() {
            "mmd" | "mermaid" => DiagramType::Mermaid,
            "puml" | "plantuml" | "iuml" => DiagramType::Plantuml,
            "dot" | "gv" => DiagramType::Graphviz,
            "dsl" => DiagramType::Structurizr,
            _ => return None,
        };
        Some(ClassificationResult::new(
            self.backend_for(diagram_type),
            diagram_type,
        ))
    }

    /// Which backend executes a given grammar under this configuration.
    pub fn backend_for(&self, diagram_type: DiagramType) -> BackendKind {
        match diagram_type {
            DiagramType::Mermaid => BackendKind::LocalProcess,
            DiagramType::Plantuml => self.plantuml_backend,
            DiagramType::Graphviz => BackendKind::RemoteHttp,
            DiagramType::Structurizr => self.structurizr_backend,
        }
    }
}
