//! HTTP status classes as a typed enum.
//!
//! Metrics are aggregated per hundreds-digit bucket, never per exact code.
//! Anything that is not 2xx, 3xx or 4xx lands in [`StatusClass::ServerError`],
//! including informational 1xx codes and the `0` an exchange reports when no
//! response was ever produced.
//!
//! ```rust
//! use reqmeter::StatusClass;
//!
//! assert_eq!(StatusClass::from_code(201), StatusClass::Success);
//! assert_eq!(StatusClass::from_code(404).as_str(), "4xx");
//! assert_eq!(StatusClass::from_code(101), StatusClass::ServerError);
//! ```

use std::fmt;

/// The bucket a response status falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Success,     // 2xx
    Redirection, // 3xx
    ClientError, // 4xx
    ServerError, // 5xx and everything unrecognised
}

impl StatusClass {
    /// Every class, in reporting order.
    pub const ALL: [StatusClass; 4] = [
        Self::Success,
        Self::Redirection,
        Self::ClientError,
        Self::ServerError,
    ];

    pub fn from_code(code: u16) -> Self {
        match code / 100 {
            2 => Self::Success,
            3 => Self::Redirection,
            4 => Self::ClientError,
            _ => Self::ServerError,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success     => "2xx",
            Self::Redirection => "3xx",
            Self::ClientError => "4xx",
            Self::ServerError => "5xx",
        }
    }

    /// The metric label every sink keys this class under.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success     => "requests.2xx",
            Self::Redirection => "requests.3xx",
            Self::ClientError => "requests.4xx",
            Self::ServerError => "requests.5xx",
        }
    }
}

impl From<http::StatusCode> for StatusClass {
    fn from(code: http::StatusCode) -> Self {
        Self::from_code(code.as_u16())
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_boundaries() {
        assert_eq!(StatusClass::from_code(200), StatusClass::Success);
        assert_eq!(StatusClass::from_code(299), StatusClass::Success);
        assert_eq!(StatusClass::from_code(300), StatusClass::Redirection);
        assert_eq!(StatusClass::from_code(399), StatusClass::Redirection);
        assert_eq!(StatusClass::from_code(400), StatusClass::ClientError);
        assert_eq!(StatusClass::from_code(499), StatusClass::ClientError);
        assert_eq!(StatusClass::from_code(500), StatusClass::ServerError);
        assert_eq!(StatusClass::from_code(599), StatusClass::ServerError);
    }

    #[test]
    fn test_unrecognised_codes_fold_into_server_error() {
        for code in [0, 100, 101, 199, 600, 999, u16::MAX] {
            assert_eq!(StatusClass::from_code(code), StatusClass::ServerError, "code {code}");
        }
    }

    #[test]
    fn test_labels() {
        let labels: Vec<_> = StatusClass::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(labels, ["requests.2xx", "requests.3xx", "requests.4xx", "requests.5xx"]);
        assert_eq!(StatusClass::ClientError.to_string(), "4xx");
    }

    #[test]
    fn test_from_http_status_code() {
        assert_eq!(StatusClass::from(http::StatusCode::FOUND), StatusClass::Redirection);
        assert_eq!(StatusClass::from(http::StatusCode::BAD_GATEWAY), StatusClass::ServerError);
    }
}
