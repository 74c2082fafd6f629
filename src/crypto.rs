use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use rand_core::RngCore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("sealing error")]
    Seal,
    #[error("unsealing error")]
    Open,
    #[error("invalid key")]
    InvalidKey,
}

/// Seals secrets that must sit in memory for a while, such as a registration
/// password waiting for an administrator to forward it.
#[derive(Clone)]
pub struct Crypto {
    cipher: Aes256Gcm,
}

impl Crypto {
    pub fn from_base64(key_b64: &str) -> Result<Self, CryptoError> {
        let key_bytes = general_purpose::STANDARD
            .decode(key_b64.trim())
            .map_err(|_| CryptoError::InvalidKey)?;
        Self::from_key_bytes(&key_bytes)
    }

    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, CryptoError> {
        if key_bytes.len() != 32 {
            return Err(CryptoError::InvalidKey);
        }
        let cipher = Aes256Gcm::new_from_slice(key_bytes).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { cipher })
    }

    pub fn seal_str(&self, value: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut ciphertext = self
            .cipher
            .encrypt(nonce, value.as_bytes())
            .map_err(|_| CryptoError::Seal)?;
        let mut combined = nonce_bytes.to_vec();
        combined.append(&mut ciphertext);
        Ok(general_purpose::STANDARD.encode(combined))
    }

    pub fn open_str(&self, sealed: &str) -> Result<String, CryptoError> {
        let data = general_purpose::STANDARD
            .decode(sealed)
            .map_err(|_| CryptoError::Open)?;
        if data.len() < 13 {
            return Err(CryptoError::Open);
        }
        let (nonce_bytes, cipher_bytes) = data.split_at(12);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), cipher_bytes)
            .map_err(|_| CryptoError::Open)?;
        String::from_utf8(plain).map_err(|_| CryptoError::Open)
    }
}
