//! Sensitive-path classification and secret redaction.
//!
//! A [`PrivacyChecker`] is built once from configuration and shared
//! read-only with every adapter. Sensitive paths are `glob` patterns where
//! `**` spans zero or more path segments and `*` never crosses a separator.
//! A leading `**/` also matches relative paths.

use glob::{MatchOptions, Pattern};
use regex::Regex;

use crate::{AppError, Result};

/// Replacement text for redacted matches.
pub const REDACTED: &str = "[REDACTED]";

/// Glob patterns that mark a path as sensitive when no configuration overrides them.
#[must_use]
pub fn default_sensitive_patterns() -> Vec<String> {
    [
        "**/.env",
        "**/.env.*",
        "**/.env.local",
        "**/secrets/**",
        "**/*.pem",
        "**/*.key",
        "**/*.p12",
        "**/*password*",
        "**/*secret*",
        "**/*credential*",
        "**/.git/config",
        "**/.ssh/**",
        "**/.aws/**",
        "**/.npmrc",
        "**/.pypirc",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

/// Regexes whose matches are replaced with [`REDACTED`] by default.
#[must_use]
pub fn default_redact_patterns() -> Vec<String> {
    [
        r"(?i)password[=:]\S+",
        r"(?i)api[_-]?key[=:]\S+",
        r"(?i)token[=:]\S+",
        r"(?i)secret[=:]\S+",
        r"(?i)bearer\s+\S+",
        r"(?i)aws_access_key_id[=:]\S+",
        r"(?i)aws_secret_access_key[=:]\S+",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One compiled sensitive-path glob.
#[derive(Debug, Clone)]
struct SensitivePattern {
    full: Pattern,
    /// For `**/X`: `X`, tried against the base name and every trailing run
    /// of path segments so that relative paths match too.
    tail: Option<Pattern>,
}

impl SensitivePattern {
    fn compile(pattern: &str) -> Result<Self> {
        let pattern = pattern.replace('\\', "/");
        let full = compile_glob(&pattern)?;
        let tail = pattern.strip_prefix("**/").map(compile_glob).transpose()?;
        Ok(Self { full, tail })
    }

    fn matches(&self, path: &str) -> bool {
        if self.full.matches_with(path, MATCH_OPTIONS) {
            return true;
        }
        let Some(tail) = &self.tail else {
            return false;
        };
        tail.matches_with(base_name(path), MATCH_OPTIONS)
            || trailing_segments(path).any(|rest| tail.matches_with(rest, MATCH_OPTIONS))
    }
}

/// Process-wide privacy rules: sensitive paths and redaction regexes.
#[derive(Debug, Clone)]
pub struct PrivacyChecker {
    sensitive: Vec<SensitivePattern>,
    redact: Vec<Regex>,
}

impl PrivacyChecker {
    /// Compile the given glob and regex lists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Privacy` if any pattern fails to compile.
    pub fn new(sensitive_patterns: &[String], redact_patterns: &[String]) -> Result<Self> {
        let sensitive = sensitive_patterns
            .iter()
            .map(|p| SensitivePattern::compile(p))
            .collect::<Result<Vec<_>>>()?;
        let redact = redact_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|err| AppError::Privacy(format!("invalid redact pattern {p}: {err}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sensitive, redact })
    }

    /// Checker built from the default pattern lists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Privacy` if a default pattern fails to compile.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&default_sensitive_patterns(), &default_redact_patterns())
    }

    /// Whether `path` matches any sensitive pattern.
    #[must_use]
    pub fn is_sensitive_path(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let normalized = path.replace('\\', "/");
        self.sensitive.iter().any(|p| p.matches(&normalized))
    }

    /// Whether a shell command references a sensitive path.
    ///
    /// Best effort: the whole command and each whitespace-separated word are
    /// run through the path matcher.
    #[must_use]
    pub fn is_sensitive_command(&self, command: &str) -> bool {
        self.is_sensitive_path(command)
            || command
                .split_whitespace()
                .map(|word| word.trim_matches(|c| c == '"' || c == '\''))
                .any(|word| self.is_sensitive_path(word))
    }

    /// Replace every redaction match in `content` with [`REDACTED`].
    #[must_use]
    pub fn redact(&self, content: &str) -> String {
        self.redact
            .iter()
            .fold(content.to_owned(), |acc, re| {
                re.replace_all(&acc, REDACTED).into_owned()
            })
    }
}

fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// `path` itself and every suffix that starts after a `/`.
fn trailing_segments(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once(path).chain(path.match_indices('/').map(move |(i, _)| &path[i + 1..]))
}

fn compile_glob(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|err| AppError::Privacy(format!("invalid glob {pattern}: {err}")))
}
