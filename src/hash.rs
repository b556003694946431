// src/hash.rs

//! Configurable hashing for content digests and certificate fingerprints
//!
//! Two algorithms are supported, both from the SHA-2 family:
//!
//! | Algorithm | Output | Use |
//! |-----------|--------|-----|
//! | SHA-256   | 32 bytes | Default for file digests and fingerprints |
//! | SHA-512   | 64 bytes | Opt-in, for deployments that want the wider digest |
//!
//! The algorithm used for file digests is recorded in each archive's
//! manifest, so an unpacker never has to guess it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::io::Read;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256 (256-bit)
    #[default]
    Sha256,
    /// SHA-512 (512-bit)
    Sha512,
}

impl HashAlgorithm {
    /// Get the hash output length in bytes
    #[inline]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Get the hash output length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        self.output_len() * 2
    }

    /// Get the algorithm name as a string
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Pick the algorithm whose output is `len` bytes long
    pub fn from_output_len(len: usize) -> Option<Self> {
        match len {
            32 => Some(Self::Sha256),
            64 => Some(Self::Sha512),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// A hash value with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    /// The algorithm used
    pub algorithm: HashAlgorithm,
    /// The raw digest bytes
    bytes: Vec<u8>,
}

impl Hash {
    /// Create a hash from raw digest bytes, checking the length
    pub fn from_bytes(algorithm: HashAlgorithm, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != algorithm.output_len() {
            return Err(Error::InvalidFingerprint(format!(
                "{} digest must be {} bytes, got {}",
                algorithm,
                algorithm.output_len(),
                bytes.len()
            )));
        }
        Ok(Self { algorithm, bytes })
    }

    /// Parse a hex digest for a known algorithm
    pub fn from_hex(algorithm: HashAlgorithm, value: &str) -> Result<Self> {
        let bytes = hex::decode(value)
            .map_err(|e| Error::InvalidFingerprint(format!("{value}: {e}")))?;
        Self::from_bytes(algorithm, bytes)
    }

    /// Parse a user-supplied digest string
    ///
    /// Accepts an optional `algorithm:` prefix, either case, and `:`
    /// separators between byte pairs (`AB:CD:...`, as printed by
    /// `openssl x509 -fingerprint`). Without a prefix the algorithm is
    /// inferred from the digest length.
    ///
    /// ```
    /// use sealpack::hash::{Hash, HashAlgorithm};
    ///
    /// let plain = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    /// let hash = Hash::parse(plain).unwrap();
    /// assert_eq!(hash.algorithm, HashAlgorithm::Sha256);
    ///
    /// let prefixed = format!("sha256:{}", plain.to_uppercase());
    /// assert_eq!(Hash::parse(&prefixed).unwrap(), hash);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (algorithm, value) = match s.split_once(':') {
            Some((algo, rest)) if algo.parse::<HashAlgorithm>().is_ok() => {
                (Some(algo.parse::<HashAlgorithm>()?), rest)
            }
            _ => (None, s),
        };

        let compact: String = value.chars().filter(|c| *c != ':').collect();
        if compact.is_empty() {
            return Err(Error::InvalidFingerprint("empty digest".to_string()));
        }
        let bytes = hex::decode(compact.to_lowercase())
            .map_err(|e| Error::InvalidFingerprint(format!("{s}: {e}")))?;

        let algorithm = match algorithm {
            Some(algorithm) => algorithm,
            None => HashAlgorithm::from_output_len(bytes.len()).ok_or_else(|| {
                Error::InvalidFingerprint(format!(
                    "cannot infer algorithm from {}-byte digest",
                    bytes.len()
                ))
            })?,
        };
        Self::from_bytes(algorithm, bytes)
    }

    /// Raw digest bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex rendering of the digest
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Format as a prefixed string (e.g., "sha256:abc123...")
    pub fn to_prefixed_string(&self) -> String {
        format!("{}:{}", self.algorithm.name(), self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hasher that can compute hashes using any supported algorithm
pub struct Hasher {
    algorithm: HashAlgorithm,
    state: HasherState,
}

enum HasherState {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    /// Create a new hasher with the specified algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => HasherState::Sha512(Sha512::new()),
        };
        Self { algorithm, state }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha256(hasher) => hasher.update(data),
            HasherState::Sha512(hasher) => hasher.update(data),
        }
    }

    /// Finalize and return the hash
    pub fn finalize(self) -> Hash {
        let bytes = match self.state {
            HasherState::Sha256(hasher) => hasher.finalize().to_vec(),
            HasherState::Sha512(hasher) => hasher.finalize().to_vec(),
        };
        Hash {
            algorithm: self.algorithm,
            bytes,
        }
    }

    /// Get the algorithm being used
    #[inline]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Compute hash of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Hash {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Read `reader` to the end, hashing everything read
///
/// Returns the digest together with the bytes, so callers that also need
/// the content (the packer) read each file exactly once.
pub fn hash_reader<R: Read>(
    algorithm: HashAlgorithm,
    reader: &mut R,
) -> std::io::Result<(Hash, Vec<u8>)> {
    let mut hasher = Hasher::new(algorithm);
    let mut content = Vec::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        content.extend_from_slice(&buffer[..n]);
    }

    Ok((hasher.finalize(), content))
}

/// Compare two digests in constant time with respect to their contents
pub fn digests_equal(a: &Hash, b: &Hash) -> bool {
    if a.algorithm != b.algorithm {
        return false;
    }
    a.bytes.as_slice().ct_eq(b.bytes.as_slice()).into()
}
