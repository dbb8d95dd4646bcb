//! Integrity Verifier - keyed, tamper-evident tags over artifact content
//!
//! ## Scheme
//!
//! ```text
//! content ──SHA-256──> Digest ──HMAC-SHA256(secret)──> Tag
//! ```
//!
//! The tag binds the *current bytes* of an artifact to a process-wide
//! shared secret. Re-reading the bytes at deploy time and recomputing the
//! tag detects a swapped or edited file.
//!
//! The keyed hash stands in for signing: callers only see `tag` and
//! `verify`, so an asymmetric scheme can replace it without touching the
//! lifecycle code.
//!
//! ## Usage
//!
//! ```rust
//! use trueno_registry::integrity::{digest, tag, verify, Secret};
//!
//! let secret = Secret::new(b"local-demo-key".to_vec())?;
//! let content = b"serialized model bytes";
//!
//! let t = tag(&digest(content), &secret);
//! assert!(verify(content, &t, &secret));
//! assert!(!verify(b"tampered bytes", &t, &secret));
//! # Ok::<(), trueno_registry::Error>(())
//! ```

mod reader;

pub use reader::{ContentReader, FsContentReader, MemoryContentReader};

use std::fmt;
use std::io::{self, Read};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Chunk size used when hashing streamed content.
const DIGEST_CHUNK: usize = 64 * 1024;

/// SHA-256 content digest of an artifact blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form, e.g. for CAS-style `sha256:<hex>` references.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest(sha256:{})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Keyed integrity tag stored on an artifact record.
///
/// Serialized as a lowercase hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(Vec<u8>);

impl Tag {
    /// Parse a tag from its hex form.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not valid hex.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        hex::decode(s).map(Self)
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Raw tag bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Tag {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_hex()
    }
}

/// Shared secret keying the integrity tags.
///
/// Loaded once at startup. `Debug` output is redacted so the key never
/// reaches a log line.
#[derive(Clone)]
pub struct Secret {
    mac: HmacSha256,
}

impl Secret {
    /// Build a secret from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the key is empty.
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(Error::Config("signing key must not be empty".to_string()));
        }
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| Error::Config(format!("invalid signing key: {e}")))?;
        Ok(Self { mac })
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Compute the content digest of an artifact blob.
#[must_use]
pub fn digest(content: &[u8]) -> Digest {
    Digest(Sha256::digest(content).into())
}

/// Compute the content digest of a byte stream, chunk by chunk.
///
/// # Errors
///
/// Returns the first IO error from `content`.
pub fn digest_reader(mut content: impl Read) -> io::Result<Digest> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; DIGEST_CHUNK];
    loop {
        match content.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Digest(hasher.finalize().into()))
}

/// Compute the keyed integrity tag of a digest.
#[must_use]
pub fn tag(digest: &Digest, key: &Secret) -> Tag {
    let mut mac = key.mac.clone();
    mac.update(digest.as_bytes());
    Tag(mac.finalize().into_bytes().to_vec())
}

/// Check `tag` against freshly computed `tag(digest(content), key)`.
///
/// Comparison is constant-time. Any mismatch, including a tag of the
/// wrong length, yields `false`.
#[must_use]
pub fn verify(content: &[u8], tag: &Tag, key: &Secret) -> bool {
    verify_digest(&digest(content), tag, key)
}

/// Check `tag` against `tag(digest, key)` in constant time.
#[must_use]
pub fn verify_digest(digest: &Digest, tag: &Tag, key: &Secret) -> bool {
    let mut mac = key.mac.clone();
    mac.update(digest.as_bytes());
    mac.verify_slice(tag.as_bytes()).is_ok()
}

/// Verifier bound to a secret and a content source.
///
/// Used by the lifecycle controller to tag artifacts at registration and
/// re-check them against their current bytes at deploy and rollback time.
#[derive(Debug)]
pub struct IntegrityVerifier<R> {
    secret: Secret,
    reader: R,
}

impl<R: ContentReader> IntegrityVerifier<R> {
    /// Create a verifier reading artifact bytes through `reader`.
    #[must_use]
    pub const fn new(secret: Secret, reader: R) -> Self {
        Self { secret, reader }
    }

    /// The content source used for re-verification.
    #[must_use]
    pub const fn reader(&self) -> &R {
        &self.reader
    }

    /// Tag supplied bytes.
    #[must_use]
    pub fn tag_content(&self, content: &[u8]) -> Tag {
        tag(&digest(content), &self.secret)
    }

    /// Stream the bytes at `location` and tag them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the content cannot be read.
    pub fn tag_location(&self, location: &str) -> Result<Tag> {
        let d = self.digest_location(location)?;
        Ok(tag(&d, &self.secret))
    }

    /// Verify the current bytes at `location` against `expected`.
    ///
    /// Unreadable content is a verification failure, not an error.
    #[must_use]
    pub fn verify_location(&self, location: &str, expected: &Tag) -> bool {
        match self.digest_location(location) {
            Ok(d) => verify_digest(&d, expected, &self.secret),
            Err(e) => {
                tracing::warn!(location, error = %e, "artifact content unreadable during verification");
                false
            }
        }
    }

    fn digest_location(&self, location: &str) -> io::Result<Digest> {
        digest_reader(self.reader.open(location)?)
    }
}
