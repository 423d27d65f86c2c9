//! Composite resource identifiers.
//!
//! A state store indexes every resource instance by one opaque string. Child
//! resources need their parent scope to be addressed remotely, so the scope is
//! folded into that string and recovered on every later operation:
//!
//! ```text
//! proj/path:v1.0:42      project : tag_name : link_id
//! 1234:7                 user_id : key_id
//! ```
//!
//! Components are joined with [`DELIMITER`] without escaping. Decoding splits
//! at most `arity - 1` times, so only the *last* component may contain the
//! delimiter itself.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_gitlab::identifier::ResourceId;
//!
//! let id = ResourceId::default()
//!     .with_key("proj/path")
//!     .with_key("v1.0")
//!     .with_leaf(42);
//! assert_eq!(id.encode(), "proj/path:v1.0:42");
//!
//! let parsed = ResourceId::parse("proj/path:v1.0:42", 3).unwrap();
//! assert_eq!(parsed.key(0).unwrap(), "proj/path");
//! assert_eq!(parsed.leaf(2).unwrap(), 42);
//!
//! assert!(ResourceId::parse("proj/path:v1.0", 3).is_err());
//! ```

use std::fmt;

use crate::error::ProviderError;

/// The reserved component delimiter.
pub const DELIMITER: char = ':';

/// An ordered tuple of identifier components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourceId {
    parts: Vec<String>,
}

impl ResourceId {
    /// Create an identifier from already-stringified components.
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a string scope component.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.parts.push(key.into());
        self
    }

    /// Append a numeric leaf component.
    pub fn with_leaf(mut self, leaf: u64) -> Self {
        self.parts.push(leaf.to_string());
        self
    }

    /// Decode `raw` into exactly `arity` components.
    pub fn parse(raw: &str, arity: usize) -> Result<Self, ProviderError> {
        Self::parse_as(raw, arity, &generic_format(arity))
    }

    /// Like [`ResourceId::parse`], naming `format` in the error message.
    pub fn parse_as(raw: &str, arity: usize, format: &str) -> Result<Self, ProviderError> {
        if arity == 0 {
            return Err(malformed(raw, format));
        }
        let parts: Vec<String> = raw.splitn(arity, DELIMITER).map(str::to_string).collect();
        if parts.len() != arity {
            return Err(malformed(raw, format));
        }
        Ok(Self { parts })
    }

    /// Number of components.
    pub fn arity(&self) -> usize {
        self.parts.len()
    }

    /// All components in order.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The string component at `index`.
    pub fn key(&self, index: usize) -> Result<&str, ProviderError> {
        self.parts.get(index).map(String::as_str).ok_or_else(|| {
            ProviderError::MalformedIdentifier(format!(
                "identifier {:?} has no component {}",
                self.encode(),
                index
            ))
        })
    }

    /// The numeric leaf component at `index`.
    pub fn leaf(&self, index: usize) -> Result<u64, ProviderError> {
        parse_leaf(self.key(index)?)
    }

    /// Join the components with [`DELIMITER`].
    pub fn encode(&self) -> String {
        self.parts.join(&DELIMITER.to_string())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Parse a numeric leaf component.
///
/// Only canonical decimal text is accepted: ASCII digits, no sign, and no
/// leading zeros other than `"0"` itself.
pub fn parse_leaf(text: &str) -> Result<u64, ProviderError> {
    let canonical = !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text == "0" || !text.starts_with('0'));
    if !canonical {
        return Err(ProviderError::MalformedIdentifier(format!(
            "{:?} is not a decimal integer",
            text
        )));
    }
    text.parse::<u64>().map_err(|e| {
        ProviderError::MalformedIdentifier(format!("{:?} is not a valid id: {}", text, e))
    })
}

/// Return the pieces of a two-part id `a:b`.
pub fn parse_two_part(raw: &str) -> Result<(String, String), ProviderError> {
    let id = ResourceId::parse_as(raw, 2, "project:key")?;
    let mut parts = id.parts.into_iter();
    match (parts.next(), parts.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(malformed(raw, "project:key")),
    }
}

/// Format two components into an id `a:b`.
pub fn build_two_part(a: &str, b: &str) -> String {
    format!("{}{}{}", a, DELIMITER, b)
}

/// A typed identifier with a fixed number of components.
///
/// Implementors describe how their fields map onto a [`ResourceId`]; the
/// provided [`encode`](CompositeId::encode) and
/// [`decode`](CompositeId::decode) methods apply the wire format.
pub trait CompositeId: Sized {
    /// Number of components in the encoded form.
    const ARITY: usize;

    /// Human readable layout used in error messages, e.g. `project:tag_name:link_id`.
    const FORMAT: &'static str;

    /// Lay the fields out as identifier components.
    fn to_resource_id(&self) -> ResourceId;

    /// Rebuild the typed identifier from decoded components.
    fn from_resource_id(id: &ResourceId) -> Result<Self, ProviderError>;

    /// Encode into the persisted string form.
    fn encode(&self) -> String {
        self.to_resource_id().encode()
    }

    /// Decode the persisted string form.
    fn decode(raw: &str) -> Result<Self, ProviderError> {
        let id = ResourceId::parse_as(raw, Self::ARITY, Self::FORMAT)?;
        Self::from_resource_id(&id).map_err(|e| {
            ProviderError::MalformedIdentifier(format!(
                "Unexpected ID format ({:?}). Expected {}: {}",
                raw,
                Self::FORMAT,
                e.message()
            ))
        })
    }
}

fn generic_format(arity: usize) -> String {
    format!("{} '{}'-separated components", arity, DELIMITER)
}

fn malformed(raw: &str, format: &str) -> ProviderError {
    ProviderError::MalformedIdentifier(format!(
        "Unexpected ID format ({:?}). Expected {}",
        raw, format
    ))
}
