//! Password hashing and verification.
//!
//! Stored hashes are self-describing: the text between the first two `$`
//! signs names the scheme that produced them, and verification is dispatched
//! on that tag. New hashes use scrypt unless told otherwise.

use std::fmt;
use std::str::FromStr;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use rand::Rng;
use scrypt::password_hash::Output;
use thiserror::Error;

/// Standard alphabet, written without padding, read with or without it.
const B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Unsupported encryption util: {0}")]
    Unsupported(String),
    #[error("malformed password hash")]
    Malformed,
    #[error("failed to hash password: {0}")]
    Hashing(String),
}

/// The hashing schemes a stored hash may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Argon2id,
    Scrypt,
    /// Verification only; hashes from before scrypt became the default.
    Bcrypt,
}

impl HashScheme {
    pub fn tag(self) -> &'static str {
        match self {
            HashScheme::Argon2id => "argon2id",
            HashScheme::Scrypt => "scrypt",
            HashScheme::Bcrypt => "2b",
        }
    }

    /// Scheme named by the tag of a stored hash.
    pub fn of(stored: &str) -> Result<Self, PasswordError> {
        match stored.split('$').nth(1) {
            Some(tag) => tag.parse(),
            None => Err(PasswordError::Unsupported("undefined".into())),
        }
    }
}

impl FromStr for HashScheme {
    type Err = PasswordError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "argon2id" => Ok(HashScheme::Argon2id),
            "scrypt" => Ok(HashScheme::Scrypt),
            "2a" | "2b" | "2x" | "2y" => Ok(HashScheme::Bcrypt),
            other => Err(PasswordError::Unsupported(other.to_string())),
        }
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Hashes `password` with the given scheme.
///
/// Bcrypt is accepted for verification only and is refused here.
pub fn hash_password(password: &str, scheme: HashScheme) -> Result<String, PasswordError> {
    match scheme {
        HashScheme::Scrypt => ScryptParams::default().hash(password),
        HashScheme::Argon2id => argon2_hash(password),
        HashScheme::Bcrypt => Err(PasswordError::Unsupported(scheme.tag().to_string())),
    }
}

/// Checks `password` against a stored hash produced by any supported scheme.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    match HashScheme::of(stored)? {
        HashScheme::Argon2id => argon2_verify(password, stored),
        HashScheme::Scrypt => scrypt_verify(password, stored),
        HashScheme::Bcrypt => {
            bcrypt::verify(password, stored).map_err(|_| PasswordError::Malformed)
        }
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rng().fill(&mut bytes[..]);
    bytes
}

fn argon2_hash(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::encode_b64(&random_bytes::<16>())
        .map_err(|e| PasswordError::Hashing(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

fn argon2_verify(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let hash = PasswordHash::new(stored).map_err(|_| PasswordError::Malformed)?;
    match Argon2::default().verify_password(password.as_bytes(), &hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err(PasswordError::Malformed),
    }
}

/// Cost parameters of an scrypt hash, as written in its options field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams {
    pub n: u64,
    pub r: u32,
    pub p: u32,
    pub maxmem: u64,
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self {
            n: 32768,
            r: 8,
            p: 1,
            maxmem: 64 * 1024 * 1024,
        }
    }
}

const SCRYPT_SALT_LEN: usize = 32;
const SCRYPT_KEY_LEN: usize = 64;

impl ScryptParams {
    /// Hashes with these parameters into
    /// `$scrypt$N=..,r=..,p=..,maxmem=..$<salt>$<hash>`.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = random_bytes::<SCRYPT_SALT_LEN>();
        let key = self.derive(password, &salt, SCRYPT_KEY_LEN)?;
        Ok(format!(
            "$scrypt${}${}${}",
            self,
            B64.encode(salt),
            B64.encode(key)
        ))
    }

    fn derive(&self, password: &str, salt: &[u8], len: usize) -> Result<Vec<u8>, PasswordError> {
        if !self.n.is_power_of_two() || self.n < 2 {
            return Err(PasswordError::Malformed);
        }
        // scrypt needs 128 * N * r bytes of scratch memory.
        let needed = 128u64
            .checked_mul(self.n)
            .and_then(|v| v.checked_mul(u64::from(self.r)))
            .ok_or(PasswordError::Malformed)?;
        if needed > self.maxmem {
            return Err(PasswordError::Malformed);
        }
        let log_n = self.n.trailing_zeros() as u8;
        let params = scrypt::Params::new(log_n, self.r, self.p, len)
            .map_err(|_| PasswordError::Malformed)?;
        let mut out = vec![0u8; len];
        scrypt::scrypt(password.as_bytes(), salt, &params, &mut out)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;
        Ok(out)
    }

    fn parse(options: &str) -> Result<Self, PasswordError> {
        let mut params = ScryptParams::default();
        for item in options.split(',') {
            let (key, value) = item.split_once('=').ok_or(PasswordError::Malformed)?;
            let bad = |_| PasswordError::Malformed;
            match key {
                "N" => params.n = value.parse().map_err(bad)?,
                "r" => params.r = value.parse().map_err(bad)?,
                "p" => params.p = value.parse().map_err(bad)?,
                "maxmem" => params.maxmem = value.parse().map_err(bad)?,
                _ => return Err(PasswordError::Malformed),
            }
        }
        Ok(params)
    }
}

impl fmt::Display for ScryptParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N={},r={},p={},maxmem={}",
            self.n, self.r, self.p, self.maxmem
        )
    }
}

fn scrypt_verify(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let mut fields = stored.split('$');
    let (Some(""), Some("scrypt"), Some(options), Some(salt), Some(hash), None) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(PasswordError::Malformed);
    };

    let params = ScryptParams::parse(options)?;
    let salt = B64.decode(salt).map_err(|_| PasswordError::Malformed)?;
    let expected = B64.decode(hash).map_err(|_| PasswordError::Malformed)?;
    let expected = Output::new(&expected).map_err(|_| PasswordError::Malformed)?;

    let derived = params.derive(password, &salt, expected.len())?;
    let derived = Output::new(&derived).map_err(|_| PasswordError::Malformed)?;
    // `Output` equality is constant time.
    Ok(derived == expected)
}
