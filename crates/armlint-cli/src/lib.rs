//! Library interface for the armlint command line

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use armlint_core::{Message, Severity, SpecKinds, SpecPath};
use armlint_engine::{builtin_rules, lint, LintConfig, LintOptions};
use armlint_parser::HttpFileSystem;
use clap::ValueEnum;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per message
    Text,
    /// The message list as a JSON array
    Json,
}

/// Lowest severity that makes a run fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailOn {
    Error,
    Warning,
}

impl FailOn {
    pub fn threshold(self) -> Severity {
        match self {
            FailOn::Error => Severity::Error,
            FailOn::Warning => Severity::Warning,
        }
    }
}

/// What to lint and how, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct LintRequest {
    pub files: Vec<String>,
    /// Overrides the kind from the config file
    pub kind: Option<SpecKinds>,
    pub config: Option<PathBuf>,
}

pub fn load_config(path: Option<&Path>) -> Result<LintConfig> {
    match path {
        Some(path) => LintConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(LintConfig::default()),
    }
}

/// Turn command-line spellings into document paths. URLs and absolute
/// paths are taken as given; anything else is relative to `cwd`.
pub fn spec_paths(files: &[String], cwd: &Path) -> Result<Vec<SpecPath>> {
    files
        .iter()
        .map(|file| {
            let given = SpecPath::new(file)
                .with_context(|| format!("Invalid document path: {}", file))?;
            let is_uri = file.contains("://") || given.is_remote();
            if is_uri || Path::new(file).is_absolute() {
                Ok(given)
            } else {
                SpecPath::from_fs(Path::new(file), cwd)
                    .with_context(|| format!("Invalid document path: {}", file))
            }
        })
        .collect()
}

pub async fn run_lint(request: &LintRequest) -> Result<Vec<Message>> {
    let config = load_config(request.config.as_deref())?;
    let rules = config.apply(builtin_rules()?)?;
    let kind = match request.kind {
        Some(kind) => kind,
        None => config.spec_kind()?.unwrap_or_default(),
    };

    let mut options = LintOptions::new(rules)
        .with_spec_kind(kind)
        .with_file_system(Arc::new(HttpFileSystem::new()));
    if let Some(depth) = config.compose_depth {
        options = options.with_compose_depth(depth);
    }

    let cwd = std::env::current_dir()?;
    let paths = spec_paths(&request.files, &cwd)?;
    debug!("Linting {} documents as {}", paths.len(), kind);

    let messages = lint(&paths, &options).await.context("Lint run failed")?;
    info!("{} messages", messages.len());
    Ok(messages)
}

pub fn render(messages: &[Message], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(messages)?),
        OutputFormat::Text => {
            if messages.is_empty() {
                return Ok("No problems found".to_string());
            }
            let mut lines: Vec<String> = messages.iter().map(ToString::to_string).collect();
            let errors = messages
                .iter()
                .filter(|m| m.severity.at_least(Severity::Error))
                .count();
            lines.push(format!(
                "{} problems ({} errors, {} warnings or less)",
                messages.len(),
                errors,
                messages.len() - errors
            ));
            Ok(lines.join("\n"))
        }
    }
}

/// True when any message is at least as severe as `fail_on`.
pub fn exceeds(messages: &[Message], fail_on: FailOn) -> bool {
    let threshold = fail_on.threshold();
    messages.iter().any(|m| m.severity.at_least(threshold))
}

/// Table of the built-in rules, optionally limited to one kind.
pub fn describe_rules(kind: Option<SpecKinds>) -> Result<String> {
    let rules = builtin_rules()?;
    let rules = match kind {
        Some(kind) => rules.filter_kinds(kind),
        None => rules,
    };

    let mut rules: Vec<_> = rules.iter().collect();
    rules.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(rules
        .into_iter()
        .map(|rule| {
            format!(
                "{} {} [{}] ({}; {}) {}",
                rule.id, rule.name, rule.severity, rule.kinds, rule.merge_state, rule.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use armlint_core::{Position, Range};

    fn message(severity: Severity) -> Message {
        Message {
            severity,
            rule_code: "R4003".to_string(),
            rule_name: "OperationIdNounVerb".to_string(),
            message: "bad id".to_string(),
            category: "SDKViolation".to_string(),
            json_path: "$.paths['/a'].get.operationId".to_string(),
            source_document: "/specs/a.json".to_string(),
            range: Range::point(Position::new(4, 7)),
        }
    }

    #[test]
    fn test_exceeds() {
        let warnings = vec![message(Severity::Warning)];
        assert!(!exceeds(&warnings, FailOn::Error));
        assert!(exceeds(&warnings, FailOn::Warning));
        assert!(exceeds(&[message(Severity::Fatal)], FailOn::Error));
        assert!(!exceeds(&[], FailOn::Warning));
    }

    #[test]
    fn test_render_text() {
        let text = render(&[message(Severity::Warning)], OutputFormat::Text).unwrap();
        assert!(text.starts_with("/specs/a.json:4:7 warning R4003 (OperationIdNounVerb): bad id"));
        assert_eq!(render(&[], OutputFormat::Text).unwrap(), "No problems found");
    }

    #[test]
    fn test_render_json() {
        let json = render(&[message(Severity::Error)], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["ruleCode"], "R4003");
        assert_eq!(value[0]["range"]["start"]["line"], 4);
    }

    #[test]
    fn test_spec_paths() {
        let cwd = Path::new("/work");
        let paths = spec_paths(
            &[
                "specs/a.json".to_string(),
                "/abs/b.json".to_string(),
                "https://example.com/c.json".to_string(),
            ],
            cwd,
        )
        .unwrap();
        assert_eq!(paths[0].as_str(), "/work/specs/a.json");
        assert_eq!(paths[1].as_str(), "/abs/b.json");
        assert!(paths[2].is_remote());
    }

    #[test]
    fn test_describe_rules_by_kind() {
        let all = describe_rules(None).unwrap();
        assert_eq!(all.lines().count(), 6);
        assert!(all.lines().next().unwrap().starts_with("R4001 PutResponseSchemaMatchesGet"));

        let data_plane = describe_rules(Some(SpecKinds::DATA_PLANE)).unwrap();
        assert_eq!(data_plane.lines().count(), 3);
        assert!(!data_plane.contains("R4005"));
    }
}
