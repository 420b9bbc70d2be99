//! Caller-supplied request headers.

use crate::error::{Error, Result};

/// Ordered list of extra request headers.
///
/// Headers are written to the wire exactly in insertion order, one line per
/// entry. Repeating a name produces repeated header lines.
///
/// ```
/// use wsdial::Headers;
///
/// let headers = Headers::new()
///     .origin("http://example.com")
///     .protocols(["chat", "superchat"])
///     .with("X-Trace", "1");
///
/// let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
/// assert_eq!(names, ["Origin", "Sec-WebSocket-Protocol", "X-Trace"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Append a header, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Append an `Origin` header.
    #[must_use]
    pub fn origin(self, origin: impl Into<String>) -> Self {
        self.with("Origin", origin)
    }

    /// Append a `Sec-WebSocket-Protocol` header listing the requested
    /// subprotocols in preference order.
    #[must_use]
    pub fn protocols<I, S>(self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = protocols
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.with("Sec-WebSocket-Protocol", joined)
    }

    /// Append a `Cookie` header.
    #[must_use]
    pub fn cookie(self, cookie: impl Into<String>) -> Self {
        self.with("Cookie", cookie)
    }

    /// Append an `Authorization` header.
    #[must_use]
    pub fn authorization(self, credentials: impl Into<String>) -> Self {
        self.with("Authorization", credentials)
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no headers were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every entry can be written as a single header line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeaderValue`] for an empty or non-token name, or
    /// a value containing CR or LF.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.iter() {
            validate_header_name(name)?;
            validate_header_value(name, value)?;
        }
        Ok(())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

impl<N: Into<String>, V: Into<String>> Extend<(N, V)> for Headers {
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.push(name, value);
        }
    }
}

/// RFC 7230 `tchar`.
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn validate_header_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidHeaderValue {
            header: name.to_string(),
            reason: "empty header name".to_string(),
        });
    }
    if !name.bytes().all(is_token_char) {
        return Err(Error::InvalidHeaderValue {
            header: name.to_string(),
            reason: "header name is not a token".to_string(),
        });
    }
    Ok(())
}

/// Validate that a header value does not contain CR or LF characters.
fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}
