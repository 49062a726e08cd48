//! Tokenizer for route path patterns.
//!
//! Splits a pattern string into literal text and parameter tokens following
//! the express-style grammar the route table compiles:
//!
//! - `:name` named parameter, one path segment by default
//! - `:name(\d+)` named parameter with a custom regex group
//! - `(.*)` anonymous parameter keyed by position
//! - modifiers `?` (optional), `+` (repeat), `*` (optional repeat)
//! - `*` bare wildcard matching anything
//! - `\x` escapes the next character into literal text
//!
//! A `/` or `.` immediately before a parameter is consumed as the token's
//! prefix delimiter; the delimiter also drives the default segment pattern
//! and repeat splitting.

/// Identifies a parameter: by name, or by position for anonymous groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyName {
    /// A `:name` parameter.
    Named(String),
    /// An anonymous group, numbered left to right from zero.
    Index(usize),
}

impl KeyName {
    /// The key under which a captured value is reported.
    pub fn as_param(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Index(index) => index.to_string(),
        }
    }
}

/// One parameter token of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternKey {
    /// Parameter identity.
    pub name: KeyName,
    /// Delimiter consumed before the token (empty for mid-segment tokens).
    pub prefix: String,
    /// Delimiter used for the default segment pattern and repeat splitting.
    pub delimiter: char,
    /// Whether the token may be absent (`?` or `*`).
    pub optional: bool,
    /// Whether the token captures repeated segments (`+` or `*`).
    pub repeat: bool,
    /// Whether the token is followed by more text inside one segment
    /// (e.g. `:a` in `/:a-b`), which changes how optionality nests.
    pub partial: bool,
    /// Regex fragment the token matches (without capture parentheses).
    pub pattern: String,
}

/// A parsed piece of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Verbatim text.
    Literal(String),
    /// A parameter.
    Key(PatternKey),
}

const DEFAULT_DELIMITER: char = '/';

/// Parses a path pattern into tokens.
pub fn parse(path: &str) -> Vec<Token> {
    let chars: Vec<char> = path.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut anon_index = 0usize;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            literal.push(chars[i + 1]);
            i += 2;
            continue;
        }

        match scan_token(&chars, i, &mut anon_index) {
            Some((mut key, next)) => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                let following = chars.get(next).copied();
                key.partial = !key.prefix.is_empty()
                    && following.is_some()
                    && following != key.prefix.chars().next();
                tokens.push(Token::Key(key));
                i = next;
            }
            None => {
                literal.push(chars[i]);
                i += 1;
            }
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    tokens
}

/// Attempts to read one parameter token starting at `start`.
///
/// Returns the key (with `partial` unset) and the index just past the token.
fn scan_token(chars: &[char], start: usize, anon_index: &mut usize) -> Option<(PatternKey, usize)> {
    let mut i = start;
    let mut prefix = None;

    if matches!(chars.get(i), Some('/') | Some('.')) && starts_token_core(chars, i + 1) {
        prefix = Some(chars[i]);
        i += 1;
    }

    let delimiter = prefix.unwrap_or(DEFAULT_DELIMITER);
    let default_pattern = || format!("[^{}]+?", escape_string(&delimiter.to_string()));

    let (name, pattern, mut i) = match chars.get(i)? {
        ':' if is_word(chars.get(i + 1)) => {
            let mut j = i + 1;
            let mut name = String::new();
            while is_word(chars.get(j)) {
                name.push(chars[j]);
                j += 1;
            }
            // Optional custom group directly after the name.
            let (pattern, j) = match scan_group(chars, j) {
                Some((group, after)) => (escape_group(&group), after),
                None => (default_pattern(), j),
            };
            (KeyName::Named(name), pattern, j)
        }
        '(' => {
            let (group, after) = scan_group(chars, i)?;
            let name = KeyName::Index(*anon_index);
            *anon_index += 1;
            (name, escape_group(&group), after)
        }
        '*' => {
            let name = KeyName::Index(*anon_index);
            *anon_index += 1;
            let key = PatternKey {
                name,
                prefix: prefix.map(String::from).unwrap_or_default(),
                delimiter,
                optional: false,
                repeat: false,
                partial: false,
                pattern: ".*".to_string(),
            };
            return Some((key, i + 1));
        }
        _ => return None,
    };

    let modifier = match chars.get(i) {
        Some(m @ ('?' | '+' | '*')) => {
            i += 1;
            Some(*m)
        }
        _ => None,
    };

    let key = PatternKey {
        name,
        prefix: prefix.map(String::from).unwrap_or_default(),
        delimiter,
        optional: matches!(modifier, Some('?') | Some('*')),
        repeat: matches!(modifier, Some('+') | Some('*')),
        partial: false,
        pattern,
    };

    Some((key, i))
}

/// True when a token core (`:name`, `(...)` or `*`) begins at `i`.
fn starts_token_core(chars: &[char], i: usize) -> bool {
    match chars.get(i) {
        Some(':') => is_word(chars.get(i + 1)),
        Some('(') => scan_group(chars, i).is_some(),
        Some('*') => true,
        _ => false,
    }
}

/// Reads a parenthesized group starting at `open`, honoring `\x` escapes.
///
/// Groups cannot nest; an unclosed or empty group is not a group at all.
fn scan_group(chars: &[char], open: usize) -> Option<(String, usize)> {
    if chars.get(open) != Some(&'(') {
        return None;
    }

    let mut content = String::new();
    let mut i = open + 1;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                content.push('\\');
                content.push(chars[i + 1]);
                i += 2;
            }
            ')' => {
                if content.is_empty() {
                    return None;
                }
                return Some((content, i + 1));
            }
            '(' => return None,
            ch => {
                content.push(ch);
                i += 1;
            }
        }
    }

    None
}

fn is_word(ch: Option<&char>) -> bool {
    matches!(ch, Some(c) if c.is_ascii_alphanumeric() || *c == '_')
}

/// Escapes literal text for inclusion in the compiled regex.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ".+*?=^!:${}()[]|/\\".contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escapes the characters of a custom group that would alter the outer regex.
fn escape_group(group: &str) -> String {
    let mut out = String::with_capacity(group.len());
    let mut chars = group.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            out.push(ch);
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        if "=!:$/()".contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
