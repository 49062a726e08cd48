//! Route path compilation and matching.
//!
//! A route's `path` is a pattern string (`/user/:id`, `/blog/:page(\d+)?`,
//! `/docs/:chapters+`). This module compiles such patterns into a regular
//! expression plus an ordered list of parameter descriptors, and decodes
//! captured parameters from concrete request paths.
//!
//! Matching is case-insensitive and tolerates one trailing slash, so a
//! compiled pattern always matches its own source path.

mod parser;

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use regex::{Regex, RegexBuilder};

use crate::error::{PagesError, Result};

pub use parser::{KeyName, PatternKey, Token};

/// A decoded route parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A single captured value.
    Single(String),
    /// A repeated capture, split on the parameter's delimiter.
    List(Vec<String>),
}

impl ParamValue {
    /// The value as a string slice, when it is a single capture.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::List(_) => None,
        }
    }

    /// The value as a slice of segments, when it is a repeated capture.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Single(_) => None,
            Self::List(values) => Some(values),
        }
    }
}

/// Parameters extracted from a matched path, keyed by parameter name
/// (or position for anonymous groups).
pub type Params = BTreeMap<String, ParamValue>;

/// A compiled route pattern: matching regex plus parameter descriptors.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    keys: Vec<PatternKey>,
}

impl RoutePattern {
    /// Compiles a path pattern.
    pub fn compile(path: &str) -> Result<Self> {
        let tokens = parser::parse(path);
        let mut route = String::from("^");
        let mut keys = Vec::new();

        for token in &tokens {
            match token {
                Token::Literal(text) => route.push_str(&parser::escape_string(text)),
                Token::Key(key) => {
                    let prefix = parser::escape_string(&key.prefix);
                    let mut capture = format!("(?:{})", key.pattern);
                    if key.repeat {
                        capture = format!("{capture}(?:{prefix}{capture})*");
                    }
                    if key.optional {
                        if key.partial {
                            route.push_str(&format!("{prefix}({capture})?"));
                        } else {
                            route.push_str(&format!("(?:{prefix}({capture}))?"));
                        }
                    } else {
                        route.push_str(&format!("{prefix}({capture})"));
                    }
                    keys.push(key.clone());
                }
            }
        }

        // Tolerate one trailing delimiter, then anchor.
        route.push_str("(?:\\/)?$");

        let regex = RegexBuilder::new(&route)
            .case_insensitive(true)
            .build()
            .map_err(|err| PagesError::Pattern {
                path: path.to_string(),
                message: err.to_string(),
            })?;

        Ok(Self {
            source: path.to_string(),
            regex,
            keys,
        })
    }

    /// The pattern string this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The ordered parameter descriptors.
    pub fn keys(&self) -> &[PatternKey] {
        &self.keys
    }

    /// True when the pattern contains no parameters.
    pub fn is_static(&self) -> bool {
        self.keys.is_empty()
    }

    /// Tests `path` against the compiled regex.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` and decodes captured parameters.
    ///
    /// Captured values are percent-decoded; repeated captures are split on
    /// their delimiter; parameters with no captured value are omitted.
    pub fn params(&self, path: &str) -> Option<Params> {
        let captures = self.regex.captures(path)?;
        let mut params = Params::new();

        for (index, key) in self.keys.iter().enumerate() {
            let Some(capture) = captures.get(index + 1) else {
                continue;
            };
            let decoded = decode(capture.as_str());

            let value = if key.repeat {
                ParamValue::List(
                    decoded
                        .split(key.delimiter)
                        .map(|part| part.to_string())
                        .collect(),
                )
            } else {
                ParamValue::Single(decoded)
            };

            params.insert(key.name.as_param(), value);
        }

        Some(params)
    }
}

/// Percent-decodes a captured value; invalid sequences fall back to the raw
/// capture.
fn decode(value: &str) -> String {
    percent_decode_str(value)
        .decode_utf8()
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
