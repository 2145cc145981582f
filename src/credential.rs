//! Salted password digests.
//!
//! Passwords are never stored. A [`Credential`] keeps a random 16-byte salt and the
//! SHA-256 digest of `salt || password`; verification compares digests in constant time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    salt: [u8; SALT_LEN],
    digest: [u8; 32],
}

impl Credential {
    /// Hash a password under a freshly generated salt.
    pub fn new(password: &str) -> Self {
        Self::with_salt(rand::random(), password)
    }

    fn with_salt(salt: [u8; SALT_LEN], password: &str) -> Self {
        Credential { salt, digest: digest(&salt, password) }
    }

    pub fn verify(&self, password: &str) -> bool {
        let candidate = digest(&self.salt, password);
        candidate[..].ct_eq(&self.digest[..]).into()
    }
}

fn digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}${}${}", hex::encode(self.salt), hex::encode(self.digest))
    }
}

impl FromStr for Credential {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('$');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(SCHEME), Some(salt), Some(digest), None) => {
                let salt = hex::decode(salt).map_err(|e| format!("bad salt: {e}"))?;
                let digest = hex::decode(digest).map_err(|e| format!("bad digest: {e}"))?;
                Ok(Credential {
                    salt: salt.try_into().map_err(|_| "salt must be 16 bytes".to_string())?,
                    digest: digest.try_into().map_err(|_| "digest must be 32 bytes".to_string())?,
                })
            }
            _ => Err(format!("unsupported credential format (expected {SCHEME}$<salt>$<digest>)")),
        }
    }
}

impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
