use std::fmt;
use std::str::FromStr;

use ulid::Ulid;

/// Header carrying a caller-supplied request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation identifier for one dispatched request.
///
/// Every event logged by the mapping, the execution chain and the dispatcher
/// carries it as `request_id`, so one exchange can be followed across the
/// pre-handle, handler, async and completion phases. ULIDs sort by creation
/// time, which keeps log searches by id roughly chronological.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Default)]
pub struct RequestId(Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Adopt the caller's `x-request-id` when it parses as a ULID; mint a fresh id otherwise.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        match header_value.map(|v| v.trim().parse::<RequestId>()) {
            Some(Ok(id)) => id,
            _ => Self::new(),
        }
    }

    #[must_use]
    pub fn ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(RequestId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_header_is_adopted() {
        let id = RequestId::new();
        let header = format!("  {id} ");
        assert_eq!(RequestId::from_header_or_new(Some(&header)), id);
    }

    #[test]
    fn test_invalid_header_mints_new_id() {
        let a = RequestId::from_header_or_new(Some("not-a-ulid"));
        let b = RequestId::from_header_or_new(None);
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 26);
    }
}
