use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::Rng as _;
use ring::digest;
use serde::{Deserialize, Serialize};

use crate::error::{MidError, MidResult};

/// Digest algorithms accepted by the service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashType {
    #[default]
    SHA256,
    SHA384,
    SHA512,
}

impl HashType {
    /// Digest length in bytes.
    pub fn length_in_bytes(self) -> usize {
        match self {
            Self::SHA256 => 32,
            Self::SHA384 => 48,
            Self::SHA512 => 64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SHA256 => "SHA256",
            Self::SHA384 => "SHA384",
            Self::SHA512 => "SHA512",
        }
    }

    fn algorithm(self) -> &'static digest::Algorithm {
        match self {
            Self::SHA256 => &digest::SHA256,
            Self::SHA384 => &digest::SHA384,
            Self::SHA512 => &digest::SHA512,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        digest::digest(self.algorithm(), data).as_ref().to_vec()
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A digest submitted to the service instead of the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashToSign {
    hash: Vec<u8>,
    hash_type: HashType,
}

impl HashToSign {
    /// Hashes `data` with the given algorithm.
    pub fn from_data(data: &[u8], hash_type: HashType) -> Self {
        Self {
            hash: hash_type.digest(data),
            hash_type,
        }
    }

    /// Wraps an already computed digest.
    ///
    /// # Errors
    /// Fails if the digest length does not match the hash type.
    pub fn from_hash(hash: Vec<u8>, hash_type: HashType) -> MidResult<Self> {
        if hash.len() != hash_type.length_in_bytes() {
            return Err(MidError::parameter(format!(
                "{hash_type} hash must be {} bytes long, got {}",
                hash_type.length_in_bytes(),
                hash.len()
            )));
        }
        Ok(Self { hash, hash_type })
    }

    pub fn from_base64(hash: &str, hash_type: HashType) -> MidResult<Self> {
        let decoded = STANDARD
            .decode(hash)
            .map_err(|e| MidError::parameter(format!("hash is not valid base64: {e}")))?;
        Self::from_hash(decoded, hash_type)
    }

    /// Generates a random hash, as used for authentication challenges.
    pub fn generate_random(hash_type: HashType) -> Self {
        let mut hash = vec![0u8; hash_type.length_in_bytes()];
        rand::rng().fill(&mut hash[..]);
        Self { hash, hash_type }
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    pub fn hash_type(&self) -> HashType {
        self.hash_type
    }

    pub fn hash_in_base64(&self) -> String {
        STANDARD.encode(&self.hash)
    }

    /// Computes the 4-digit code displayed both to the relying party's user
    /// and on the phone, so the user can match the two.
    ///
    /// The code is the 6 most significant bits of the first byte and the 7
    /// least significant bits of the last byte of SHA-256(hash).
    pub fn calculate_verification_code(&self) -> String {
        let digest = HashType::SHA256.digest(&self.hash);
        let first = u16::from(digest[0] & 0xFC);
        let last = u16::from(digest[digest.len() - 1] & 0x7F);
        format!("{:04}", (first << 5) | last)
    }
}
