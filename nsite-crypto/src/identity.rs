use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::errors::{CryptoError, Result};

/// Public half of a site identity.
///
/// Records and blobs are authored under this key; anyone holding it can list
/// and download a site, but only the matching `SiteIdentity` can publish.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Creates a public key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyFormat` if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyFormat(
                "Public key must be 32 bytes".to_string(),
            ));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);
        Ok(PublicKey(key))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short human-readable fingerprint.
    ///
    /// Blake3 of the key, first 8 bytes as colon-separated groups of 4 hex
    /// characters, e.g. `af13:49b5:9011:628c`.
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(&self.0);
        hash.as_bytes()[..8]
            .chunks(2)
            .map(|chunk| format!("{:02x}{:02x}", chunk[0], chunk[1]))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Verifies an Ed25519 signature made by this key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        let signature =
            Signature::from_slice(signature).map_err(|_| CryptoError::SignatureVerification)?;

        verifying_key
            .verify(message, &signature)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "Invalid public key length: {} (expected 64 hex characters)",
                s.len()
            )));
        }
        let bytes = hex::decode(s)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("Invalid hex string: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_hex()
    }
}

/// Signing identity of a site.
///
/// # Security
///
/// - Secret keys are stored hex-encoded with 0600 permissions on Unix
/// - `SigningKey` zeroizes itself on drop; intermediate copies are wrapped in
///   `Zeroizing`
///
/// # Example
///
/// ```rust
/// use nsite_crypto::SiteIdentity;
///
/// let identity = SiteIdentity::generate();
/// let signature = identity.sign(b"hello");
/// identity.public_key().verify(b"hello", &signature).unwrap();
/// ```
pub struct SiteIdentity {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl std::fmt::Debug for SiteIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteIdentity")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl SiteIdentity {
    /// Generates a fresh keypair from the OS random number generator.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Restores an identity from a 64 character hex secret.
    pub fn from_secret_hex(secret: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(secret.trim())
                .map_err(|e| CryptoError::InvalidKeyFormat(format!("Invalid hex string: {}", e)))?,
        );
        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKeyFormat("Secret key must be 32 bytes".to_string())
        })?;
        let secret = Zeroizing::new(secret);
        Ok(Self::from_signing_key(SigningKey::from_bytes(&secret)))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = PublicKey(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            public_key,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Signs a message, returning the 64 byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// Default key location: `~/.nsite/keys/identity.key`
    pub fn default_key_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            CryptoError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Home directory not found",
            ))
        })?;
        Ok(home.join(".nsite").join("keys").join("identity.key"))
    }

    /// Save the secret key, atomically and with restricted permissions.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let encoded = Zeroizing::new(hex::encode(self.signing_key.to_bytes()));
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, encoded.as_bytes()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(&temp_path).await?.permissions();
            permissions.set_mode(0o600);
            fs::set_permissions(&temp_path, permissions).await?;
        }

        fs::rename(&temp_path, path).await?;
        info!("Site identity saved to {}", path.display());
        Ok(())
    }

    /// Load a secret key written by `save`.
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await? {
            return Err(CryptoError::KeyNotFound(path.display().to_string()));
        }

        let data = Zeroizing::new(fs::read_to_string(path).await?);
        let identity = Self::from_secret_hex(&data)?;
        debug!("Loaded site identity {}", identity.public_key.fingerprint());
        Ok(identity)
    }
}
