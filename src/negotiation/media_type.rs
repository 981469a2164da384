//! RFC 7231 media types with the comparison rules content negotiation relies on.

use super::error::MediaTypeError;
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const WILDCARD: &str = "*";
const QUALITY_PARAM: &str = "q";

/// `*/*`
pub static ALL: Lazy<MediaType> = Lazy::new(MediaType::all);
pub static APPLICATION_JSON: Lazy<MediaType> = Lazy::new(|| MediaType::new("application", "json"));
pub static APPLICATION_XML: Lazy<MediaType> = Lazy::new(|| MediaType::new("application", "xml"));
pub static TEXT_HTML: Lazy<MediaType> = Lazy::new(|| MediaType::new("text", "html"));
pub static TEXT_PLAIN: Lazy<MediaType> = Lazy::new(|| MediaType::new("text", "plain"));

/// A parsed media type such as `application/json;charset=utf-8;q=0.8`.
///
/// Type, subtype and parameter names are stored lowercase. Equality compares
/// type, subtype and the parameter set, ignoring parameter order.
#[derive(Debug, Clone)]
pub struct MediaType {
    type_: String,
    subtype: String,
    parameters: Vec<(String, String)>,
}

impl MediaType {
    #[must_use]
    pub fn new(type_: &str, subtype: &str) -> Self {
        Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn all() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    /// Set (or replace) a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        self.parameters.retain(|(k, _)| *k != name);
        self.parameters.push((name, value.to_string()));
        self
    }

    /// Parse a single media type.
    ///
    /// A bare `*` is accepted as `*/*`. Quoted parameter values are unquoted and
    /// a `q` parameter must be a number in `[0, 1]`.
    pub fn parse(value: &str) -> Result<Self, MediaTypeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(MediaTypeError::Empty);
        }

        let mut parts = split_unquoted(trimmed, ';').into_iter();
        let full_type = parts.next().map(str::trim).unwrap_or_default();
        let full_type = if full_type == WILDCARD { "*/*" } else { full_type };

        let (type_, subtype) = full_type
            .split_once('/')
            .ok_or_else(|| MediaTypeError::MissingSubtype {
                value: value.to_string(),
            })?;
        let (type_, subtype) = (type_.trim(), subtype.trim());
        if subtype.is_empty() {
            return Err(MediaTypeError::MissingSubtype {
                value: value.to_string(),
            });
        }
        if !is_token(type_) || !is_token(subtype) {
            return Err(MediaTypeError::InvalidToken {
                value: value.to_string(),
            });
        }
        if type_ == WILDCARD && subtype != WILDCARD {
            return Err(MediaTypeError::WildcardType {
                value: value.to_string(),
            });
        }

        let mut media_type = MediaType::new(type_, subtype);
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, raw) = param
                .split_once('=')
                .ok_or_else(|| MediaTypeError::InvalidParameter {
                    value: value.to_string(),
                })?;
            let name = name.trim();
            if !is_token(name) {
                return Err(MediaTypeError::InvalidParameter {
                    value: value.to_string(),
                });
            }
            let raw = raw.trim();
            let unquoted = raw
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(raw);
            if name.eq_ignore_ascii_case(QUALITY_PARAM) {
                match unquoted.parse::<f64>() {
                    Ok(q) if (0.0..=1.0).contains(&q) => {}
                    _ => {
                        return Err(MediaTypeError::InvalidQuality {
                            value: value.to_string(),
                        })
                    }
                }
            }
            media_type = media_type.with_parameter(name, unquoted);
        }
        Ok(media_type)
    }

    /// Parse a comma-separated list such as an `Accept` header. Empty entries are skipped.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, MediaTypeError> {
        split_unquoted(value, ',')
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    #[must_use]
    pub fn type_(&self) -> &str {
        &self.type_
    }

    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    #[must_use]
    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `q` parameter, defaulting to 1.0.
    #[must_use]
    pub fn quality(&self) -> f64 {
        self.parameter(QUALITY_PARAM)
            .and_then(|q| q.parse::<f64>().ok())
            .unwrap_or(1.0)
    }

    #[must_use]
    pub fn is_wildcard_type(&self) -> bool {
        self.type_ == WILDCARD
    }

    /// `*` or a suffixed wildcard such as `*+xml`.
    #[must_use]
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD || self.subtype.starts_with("*+")
    }

    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// Structured syntax suffix: `xml` for `application/atom+xml`.
    #[must_use]
    pub fn subtype_suffix(&self) -> Option<&str> {
        self.subtype.rsplit_once('+').map(|(_, suffix)| suffix)
    }

    /// Whether `self` is a range that contains `other` (`text/*` includes `text/html`).
    #[must_use]
    pub fn includes(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() {
            return true;
        }
        if self.type_ != other.type_ {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if !self.is_wildcard_subtype() {
            return false;
        }
        match self.subtype.split_once('+') {
            None => true,
            Some((prefix, suffix)) => {
                prefix == WILDCARD && other.subtype_suffix() == Some(suffix)
            }
        }
    }

    /// Symmetric compatibility: either side may be the wildcard range.
    #[must_use]
    pub fn is_compatible_with(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }
        if self.type_ != other.type_ {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if !self.is_wildcard_subtype() && !other.is_wildcard_subtype() {
            return false;
        }
        if self.subtype == WILDCARD || other.subtype == WILDCARD {
            return true;
        }
        let this_suffix = self.subtype_suffix();
        let other_suffix = other.subtype_suffix();
        if self.is_wildcard_subtype() && other_suffix.is_some() {
            return this_suffix == other_suffix;
        }
        if other.is_wildcard_subtype() && this_suffix.is_some() {
            return this_suffix == other_suffix;
        }
        false
    }

    /// Copy of `self` carrying the quality of `from` (or none, if `from` has none).
    #[must_use]
    pub fn copy_quality_value(&self, from: &MediaType) -> MediaType {
        let mut copy = self.remove_quality_value();
        if let Some(q) = from.parameter(QUALITY_PARAM) {
            copy.parameters.push((QUALITY_PARAM.to_string(), q.to_string()));
        }
        copy
    }

    #[must_use]
    pub fn remove_quality_value(&self) -> MediaType {
        let mut copy = self.clone();
        copy.parameters.retain(|(k, _)| k != QUALITY_PARAM);
        copy
    }

    /// Specificity ordering. `Less` means `self` is more specific and sorts first.
    ///
    /// Concrete types beat wildcard types and concrete subtypes beat wildcard
    /// subtypes. Two different concrete types or subtypes compare `Equal`, so the
    /// relation is not transitive and must not be fed to `slice::sort_by`.
    /// With type and subtype equal, higher quality wins and then more
    /// parameters (excluding `q`) win.
    #[must_use]
    pub fn specificity_cmp(&self, other: &MediaType) -> Ordering {
        match (self.is_wildcard_type(), other.is_wildcard_type()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        if self.type_ != other.type_ {
            return Ordering::Equal;
        }
        match (self.is_wildcard_subtype(), other.is_wildcard_subtype()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        if self.subtype != other.subtype {
            return Ordering::Equal;
        }
        self.quality_cmp(other)
            .then_with(|| other.param_count().cmp(&self.param_count()))
    }

    /// Quality ordering. `Less` means `self` has the higher quality.
    #[must_use]
    pub fn quality_cmp(&self, other: &MediaType) -> Ordering {
        other.quality().total_cmp(&self.quality())
    }

    fn param_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|(k, _)| k != QUALITY_PARAM)
            .count()
    }

    /// Type and subtype equality, ignoring parameters.
    #[must_use]
    pub fn essence_eq(&self, other: &MediaType) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }
}

/// Stable sort by specificity, then by quality.
///
/// A plain insertion sort: the specificity relation is not a total order, so
/// the standard library sorts are free to panic on it. Insertion only moves an
/// element past neighbours it strictly beats, which keeps equal and unrelated
/// elements in their original order.
pub fn sort_by_specificity_and_quality(media_types: &mut [MediaType]) {
    for i in 1..media_types.len() {
        let mut j = i;
        while j > 0 && precedes(&media_types[j], &media_types[j - 1]) {
            media_types.swap(j, j - 1);
            j -= 1;
        }
    }
}

fn precedes(a: &MediaType, b: &MediaType) -> bool {
    a.specificity_cmp(b)
        .then_with(|| a.quality_cmp(b))
        == Ordering::Less
}

impl PartialEq for MediaType {
    fn eq(&self, other: &Self) -> bool {
        self.essence_eq(other)
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .all(|(k, v)| other.parameter(k).is_some_and(|ov| ov.eq_ignore_ascii_case(v)))
    }
}

impl Eq for MediaType {}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.parameters {
            if value.chars().all(is_token_char) && !value.is_empty() {
                write!(f, ";{name}={value}")?;
            } else {
                write!(f, ";{name}=\"{value}\"")?;
            }
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == separator && !in_quotes {
            parts.push(&value[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&value[start..]);
    parts
}

fn is_token(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_token_char)
}

// RFC 7230 tchar
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}
