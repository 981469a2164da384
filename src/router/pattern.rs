//! Ant-style path patterns compiled to anchored regular expressions.
//!
//! Supported syntax:
//!
//! | Token        | Matches                                   |
//! |--------------|-------------------------------------------|
//! | `{name}`     | one path segment, captured as `name`      |
//! | `{name:re}`  | text matching `re`, captured as `name`    |
//! | `*`          | zero or more characters within a segment  |
//! | `?`          | exactly one character within a segment    |
//! | `**`         | zero or more whole segments               |
//!
//! A pattern without a trailing slash also matches the same path with one.

use super::core::ParamVec;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

const DEFAULT_VARIABLE_REGEX: &str = "[^/]+";

/// Reasons a path pattern is rejected at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    Empty,
    UnclosedVariable { pattern: String },
    InvalidVariableName { pattern: String, name: String },
    DuplicateVariable { pattern: String, name: String },
    InvalidRegex { pattern: String, message: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::Empty => write!(f, "path pattern must not be empty"),
            PatternError::UnclosedVariable { pattern } => {
                write!(f, "unbalanced '{{' or '}}' in path pattern '{pattern}'")
            }
            PatternError::InvalidVariableName { pattern, name } => write!(
                f,
                "invalid variable name '{name}' in path pattern '{pattern}' (expected [A-Za-z_][A-Za-z0-9_]*)"
            ),
            PatternError::DuplicateVariable { pattern, name } => {
                write!(f, "variable '{name}' appears more than once in path pattern '{pattern}'")
            }
            PatternError::InvalidRegex { pattern, message } => {
                write!(f, "path pattern '{pattern}' does not compile: {message}")
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: Arc<str>,
    regex: Regex,
    variables: Vec<Arc<str>>,
    single_wildcards: usize,
    double_wildcards: usize,
}

impl PathPattern {
    /// Compile `pattern`. Patterns without a leading slash are treated as rooted.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let mut compiler = Compiler {
            pattern,
            regex: String::with_capacity(pattern.len() * 2),
            variables: Vec::new(),
            single_wildcards: 0,
            double_wildcards: 0,
        };
        compiler.compile()?;

        let regex = Regex::new(&compiler.regex).map_err(|e| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            raw: Arc::from(pattern),
            regex,
            variables: compiler.variables,
            single_wildcards: compiler.single_wildcards,
            double_wildcards: compiler.double_wildcards,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn as_arc(&self) -> Arc<str> {
        Arc::clone(&self.raw)
    }

    #[must_use]
    pub fn variable_names(&self) -> &[Arc<str>] {
        &self.variables
    }

    /// True when the pattern has no variables or wildcards.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.variables.is_empty() && self.single_wildcards == 0 && self.double_wildcards == 0
    }

    /// True for `/**`, the pattern that matches every path.
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        matches!(self.raw.as_ref(), "/**" | "**")
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and extract template variables in declaration order.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<ParamVec> {
        let captures = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for name in &self.variables {
            if let Some(value) = captures.name(name) {
                params.push((Arc::clone(name), value.as_str().to_string()));
            }
        }
        Some(params)
    }

    /// Order two patterns that both matched the same path.
    ///
    /// `Less` means `self` is the more specific pattern. Literal patterns beat
    /// anything with variables, `/**` loses to everything, then fewer variables
    /// and wildcards win (`**` counts double), then the longer pattern wins.
    #[must_use]
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        match (self.is_literal(), other.is_literal()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        match (self.is_catch_all(), other.is_catch_all()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        self.weight()
            .cmp(&other.weight())
            .then_with(|| other.raw.len().cmp(&self.raw.len()))
            .then_with(|| self.double_wildcards.cmp(&other.double_wildcards))
    }

    fn weight(&self) -> usize {
        self.variables.len() + self.single_wildcards + 2 * self.double_wildcards
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PathPattern {}

struct Compiler<'a> {
    pattern: &'a str,
    regex: String,
    variables: Vec<Arc<str>>,
    single_wildcards: usize,
    double_wildcards: usize,
}

impl Compiler<'_> {
    fn compile(&mut self) -> Result<(), PatternError> {
        let rooted = self.pattern.strip_prefix('/').unwrap_or(self.pattern);
        self.regex.push('^');

        if rooted.is_empty() {
            self.regex.push_str("/$");
            return Ok(());
        }

        let segments = split_segments(rooted, self.pattern)?;
        let last = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate() {
            if *segment == "**" {
                self.double_wildcards += 1;
                self.regex.push_str("(?:/.*)?");
                continue;
            }
            self.regex.push('/');
            if segment.is_empty() {
                // Only a trailing empty segment is significant; it pins the slash.
                if index == last {
                    self.regex.push('$');
                    return Ok(());
                }
                continue;
            }
            self.compile_segment(segment)?;
        }

        if !rooted.ends_with("**") {
            self.regex.push_str("/?");
        }
        self.regex.push('$');
        Ok(())
    }

    fn compile_segment(&mut self, segment: &str) -> Result<(), PatternError> {
        let mut literal = String::new();
        let mut chars = segment.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    self.flush_literal(&mut literal);
                    let body = take_variable_body(&mut chars, self.pattern)?;
                    self.push_variable(&body)?;
                }
                '}' => {
                    return Err(PatternError::UnclosedVariable {
                        pattern: self.pattern.to_string(),
                    })
                }
                '*' => {
                    self.flush_literal(&mut literal);
                    self.single_wildcards += 1;
                    self.regex.push_str("[^/]*");
                }
                '?' => {
                    self.flush_literal(&mut literal);
                    self.single_wildcards += 1;
                    self.regex.push_str("[^/]");
                }
                other => literal.push(other),
            }
        }
        self.flush_literal(&mut literal);
        Ok(())
    }

    fn flush_literal(&mut self, literal: &mut String) {
        if !literal.is_empty() {
            self.regex.push_str(&regex::escape(literal));
            literal.clear();
        }
    }

    fn push_variable(&mut self, body: &str) -> Result<(), PatternError> {
        let (name, custom) = match body.split_once(':') {
            Some((name, custom)) => (name.trim(), Some(custom)),
            None => (body.trim(), None),
        };
        if !is_valid_group_name(name) {
            return Err(PatternError::InvalidVariableName {
                pattern: self.pattern.to_string(),
                name: name.to_string(),
            });
        }
        if self.variables.iter().any(|v| v.as_ref() == name) {
            return Err(PatternError::DuplicateVariable {
                pattern: self.pattern.to_string(),
                name: name.to_string(),
            });
        }
        self.regex.push_str("(?P<");
        self.regex.push_str(name);
        self.regex.push('>');
        self.regex.push_str(custom.unwrap_or(DEFAULT_VARIABLE_REGEX));
        self.regex.push(')');
        self.variables.push(Arc::from(name));
        Ok(())
    }
}

/// Split on `/` while keeping custom variable regexes (which may contain `/`) intact.
fn split_segments<'p>(rooted: &'p str, pattern: &str) -> Result<Vec<&'p str>, PatternError> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in rooted.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1).ok_or_else(|| PatternError::UnclosedVariable {
                    pattern: pattern.to_string(),
                })?;
            }
            '/' if depth == 0 => {
                segments.push(&rooted[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(PatternError::UnclosedVariable {
            pattern: pattern.to_string(),
        });
    }
    segments.push(&rooted[start..]);
    Ok(segments)
}

/// Consume up to the brace that closes the current variable, honouring nested
/// quantifier braces such as `{id:[0-9]{2,4}}`.
fn take_variable_body(chars: &mut std::str::Chars<'_>, pattern: &str) -> Result<String, PatternError> {
    let mut depth = 1usize;
    let mut body = String::new();
    for c in chars.by_ref() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(body);
                }
            }
            _ => {}
        }
        body.push(c);
    }
    Err(PatternError::UnclosedVariable {
        pattern: pattern.to_string(),
    })
}

fn is_valid_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
