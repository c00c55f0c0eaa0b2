//! Body Normalizer
//!
//! Reduces routine, trigger, event and view bodies to canonical text so
//! that definitions differing only in formatting compare equal.
//!
//! The body is the text between the kind's start keyword (first
//! occurrence) and its end keyword (last occurrence after the start), so
//! nested `BEGIN ... END` blocks stay inside the body.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

static BEGIN_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bBEGIN\b").expect("valid regex"));
static END_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bEND\b").expect("valid regex"));
static DO_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bDO\b").expect("valid regex"));
static AS_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bAS\b").expect("valid regex"));
static CREATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*CREATE\b").expect("valid regex"));
static CHECK_OPTION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+WITH\s+(?:CASCADED\s+|LOCAL\s+)?CHECK\s+OPTION\s*;?\s*$")
        .expect("valid regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Which delimiters isolate a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    /// `BEGIN ... END` inside a `CREATE PROCEDURE` / `CREATE FUNCTION`
    Routine,
    /// `BEGIN ... END`, or the whole statement for single-statement triggers
    Trigger,
    /// `DO ... END`, or `DO` to end of text
    Event,
    /// The `SELECT` after `AS`, without a trailing `WITH CHECK OPTION`
    View,
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BodyKind::Routine => "routine",
            BodyKind::Trigger => "trigger",
            BodyKind::Event => "event",
            BodyKind::View => "view",
        })
    }
}

/// The body could not be isolated by its delimiters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot isolate {kind} body: no `{keyword}` keyword")]
pub struct NormalizationAmbiguity {
    pub kind: BodyKind,
    pub keyword: &'static str,
}

/// Canonical text of a definition body
pub fn normalize(kind: BodyKind, text: &str) -> Result<String, NormalizationAmbiguity> {
    let body = isolate(kind, text)?;
    Ok(canonicalize(body))
}

fn isolate(kind: BodyKind, text: &str) -> Result<&str, NormalizationAmbiguity> {
    match kind {
        BodyKind::Routine => {
            let rest = after(text, &BEGIN_KEYWORD).ok_or(NormalizationAmbiguity {
                kind,
                keyword: "BEGIN",
            })?;
            before_last(rest, &END_KEYWORD).ok_or(NormalizationAmbiguity {
                kind,
                keyword: "END",
            })
        }
        BodyKind::Trigger => match after(text, &BEGIN_KEYWORD) {
            Some(rest) => before_last(rest, &END_KEYWORD).ok_or(NormalizationAmbiguity {
                kind,
                keyword: "END",
            }),
            None => Ok(text),
        },
        BodyKind::Event => {
            let rest = after(text, &DO_KEYWORD).ok_or(NormalizationAmbiguity {
                kind,
                keyword: "DO",
            })?;
            Ok(before_last(rest, &END_KEYWORD).unwrap_or(rest))
        }
        BodyKind::View => {
            let body = if CREATE_PREFIX.is_match(text) {
                after(text, &AS_KEYWORD).ok_or(NormalizationAmbiguity {
                    kind,
                    keyword: "AS",
                })?
            } else {
                text
            };
            Ok(match CHECK_OPTION_SUFFIX.find(body) {
                Some(m) => &body[..m.start()],
                None => body,
            })
        }
    }
}

/// Text after the first match of `keyword`
fn after<'a>(text: &'a str, keyword: &Regex) -> Option<&'a str> {
    keyword.find(text).map(|m| &text[m.end()..])
}

/// Text before the last match of `keyword`
fn before_last<'a>(text: &'a str, keyword: &Regex) -> Option<&'a str> {
    keyword.find_iter(text).last().map(|m| &text[..m.start()])
}

fn canonicalize(body: &str) -> String {
    let collapsed = WHITESPACE.replace_all(body, " ");
    collapsed.replace(" ;", ";").trim().to_string()
}
