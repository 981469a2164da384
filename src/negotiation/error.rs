use std::fmt;

/// Why a media type string failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaTypeError {
    Empty,
    MissingSubtype { value: String },
    InvalidToken { value: String },
    /// `*/json`: a wildcard type is only legal as `*/*`
    WildcardType { value: String },
    InvalidParameter { value: String },
    InvalidQuality { value: String },
}

impl fmt::Display for MediaTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaTypeError::Empty => write!(f, "media type must not be empty"),
            MediaTypeError::MissingSubtype { value } => {
                write!(f, "media type '{value}' does not contain '/'")
            }
            MediaTypeError::InvalidToken { value } => {
                write!(f, "media type '{value}' contains illegal characters")
            }
            MediaTypeError::WildcardType { value } => write!(
                f,
                "media type '{value}': wildcard type is legal only in '*/*'"
            ),
            MediaTypeError::InvalidParameter { value } => {
                write!(f, "media type '{value}' has a malformed parameter")
            }
            MediaTypeError::InvalidQuality { value } => {
                write!(f, "media type '{value}' has a quality outside [0, 1]")
            }
        }
    }
}

impl std::error::Error for MediaTypeError {}

/// Failure to determine the media types a request accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// The request expressed its preferences in a way that cannot be honoured
    NotAcceptable { value: String, reason: String },
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::NotAcceptable { value, reason } => {
                write!(f, "could not negotiate media types from '{value}': {reason}")
            }
        }
    }
}

impl std::error::Error for NegotiationError {}
