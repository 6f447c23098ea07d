//! Typed tree-node identity.
//!
//! Internally a node is the ordered list of its path segments. On the wire
//! (region ids, the `t` fragment key) it is a *token*: every segment
//! hex-encoded, joined with `-`. Because hex never produces `-`, the
//! ancestors of a node are exactly the proper prefixes of its token split
//! on `-`.

use std::fmt;

/// Separator between hex segments in a token.
pub const TOKEN_SEPARATOR: char = '-';

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePathError {
    /// A token segment is not valid hex.
    InvalidHex { segment: String },
    /// A segment decoded to bytes that are not UTF-8.
    NotUtf8 { segment: String },
    /// Empty segment (leading, trailing, or doubled separator).
    EmptySegment { position: usize },
}

impl fmt::Display for NodePathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHex { segment } => write!(f, "token segment {segment:?} is not hex"),
            Self::NotUtf8 { segment } => {
                write!(f, "token segment {segment:?} does not decode to UTF-8")
            }
            Self::EmptySegment { position } => {
                write!(f, "token has an empty segment at position {position}")
            }
        }
    }
}

impl std::error::Error for NodePathError {}

impl NodePath {
    /// The tree root (no segments).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(self.prefix(self.depth() - 1))
    }

    /// The first `len` segments.
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Non-root prefixes from shortest to longest, ending with `self`.
    pub fn prefixes(&self) -> impl Iterator<Item = NodePath> + '_ {
        (1..=self.depth()).map(|len| self.prefix(len))
    }

    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        self.depth() < other.depth() && other.0.starts_with(&self.0)
    }

    /// Slash-joined path with a leading `/`. The root is `/`.
    pub fn to_path_string(&self) -> String {
        format!("/{}", self.0.join("/"))
    }

    /// Wire token. The root maps to the empty string.
    pub fn to_token(&self) -> String {
        let hexed: Vec<String> = self.0.iter().map(hex::encode).collect();
        hexed.join("-")
    }

    pub fn from_token(token: &str) -> Result<Self, NodePathError> {
        if token.is_empty() {
            return Ok(Self::root());
        }
        token
            .split(TOKEN_SEPARATOR)
            .enumerate()
            .map(|(position, segment)| {
                if segment.is_empty() {
                    return Err(NodePathError::EmptySegment { position });
                }
                let bytes = hex::decode(segment).map_err(|_| NodePathError::InvalidHex {
                    segment: segment.to_owned(),
                })?;
                String::from_utf8(bytes).map_err(|_| NodePathError::NotUtf8 {
                    segment: segment.to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Proper-prefix tokens of `token`, shortest first, without decoding.
    pub fn token_prefixes(token: &str) -> Vec<String> {
        let parts: Vec<&str> = token.split(TOKEN_SEPARATOR).collect();
        (1..=parts.len()).map(|n| parts[..n].join("-")).collect()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path_string())
    }
}
