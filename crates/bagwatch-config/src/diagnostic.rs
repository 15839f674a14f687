// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Miette diagnostics for `bagwatch.toml` problems.
//!
//! Every setting has a compiled default, so a config can only go wrong in
//! three ways: a key the schema does not know, a value of the wrong type, or
//! a value outside its allowed range. Each diagnostic names the dotted key and
//! the `BAGWATCH_*` variable that overrides it.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score above which a known key is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Environment variable prefix used for overrides.
const ENV_PREFIX: &str = "BAGWATCH_";

/// A problem with the loaded configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(section))]
    #[diagnostic(
        code(bagwatch::config::unknown_key),
        help("{}", unknown_key_help(section, suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Section the key appeared in; empty for top-level keys.
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a bagwatch setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(
        code(bagwatch::config::invalid_type),
        help("`{key}` expects {expected}; it can also be set with {}", env_var_for(key))
    )]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    /// A value that parsed but is not usable, such as a zero interval or a
    /// latitude outside -90..=90.
    #[error("`{key}` {message}")]
    #[diagnostic(
        code(bagwatch::config::invalid_value),
        help("fix `{key}` in bagwatch.toml or override it with {}", env_var_for(key))
    )]
    InvalidValue { key: String, message: String },

    /// TOML syntax errors and anything else figment reports.
    #[error("could not read configuration: {0}")]
    #[diagnostic(code(bagwatch::config::unreadable))]
    Unreadable(String),
}

impl ConfigError {
    /// The dotted key the error is about, when there is one.
    pub fn key(&self) -> Option<String> {
        match self {
            ConfigError::UnknownKey { key, section, .. } if section.is_empty() => Some(key.clone()),
            ConfigError::UnknownKey { key, section, .. } => Some(format!("{section}.{key}")),
            ConfigError::InvalidType { key, .. } | ConfigError::InvalidValue { key, .. } => {
                Some(key.clone())
            }
            ConfigError::Unreadable(_) => None,
        }
    }
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(section: &str, suggestion: Option<&str>, valid_keys: &str) -> String {
    let known = if section.is_empty() {
        format!("known sections: {valid_keys}")
    } else {
        format!("[{section}] accepts: {valid_keys}")
    };
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {known}"),
        None => known,
    }
}

/// The override variable for a dotted key, e.g. `poller.interval_secs` maps
/// to `BAGWATCH_POLLER_INTERVAL_SECS`.
pub fn env_var_for(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.replace('.', "_").to_uppercase())
}

/// Turns a figment error chain into diagnostics.
///
/// `toml_sources` holds `(path, content)` pairs so unknown keys can be
/// pointed at in the file they came from.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let section = error.path.join(".");
                let (span, src) = source_span(&error, &section, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    section,
                    span,
                    src,
                }
            }
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                found: actual.to_string(),
                expected: expected.to_string(),
            },
            _ => ConfigError::Unreadable(error.to_string()),
        })
        .collect()
}

/// Resolves the file an error came from and the key's span inside it.
fn source_span(
    error: &figment::error::Error,
    section: &str,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline strings carry no file metadata; fall back to the only source.
    let found = match origin {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };
    let Some((name, content)) = found else {
        return (None, None);
    };

    match find_key_offset(content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key inside `[section]`.
///
/// An empty `section` searches the lines before the first header. The scan
/// stops at the next header, so a same-named key in another section is
/// never matched.
pub fn find_key_offset(content: &str, section: &str, field: &str) -> Option<usize> {
    let mut in_section = section.is_empty();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.split(']').next().unwrap_or_default().trim();
            in_section = name == section;
        } else if in_section
            && let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// The closest known key, if one is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        if handler.render_report(&mut buf, error).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
    if errors.len() > 1 {
        eprintln!("{} configuration problems found", errors.len());
    }
}
