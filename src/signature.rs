// Detached-signature verification of downloaded agent artifacts
//
// Jars fetched from anywhere other than the trusted first-party redirect
// must carry a valid Ed25519 signature over their exact bytes before they
// are trusted for execution.

use std::path::Path;

use ring::signature::{UnparsedPublicKey, ED25519};

use crate::error::{Result, SignatureError};

/// Ed25519 public key the agent distribution signs its artifacts with.
const DISTRIBUTION_PUBLIC_KEY: [u8; 32] = [
    0x3d, 0x4a, 0x17, 0xc9, 0x5b, 0xe2, 0x88, 0x01, 0xaf, 0x64, 0x9e, 0x73, 0x2c, 0xd0, 0x41,
    0x96, 0x5f, 0x8b, 0x12, 0xee, 0x07, 0xc3, 0xa8, 0x54, 0x39, 0x6d, 0xf1, 0x20, 0x8a, 0xbc,
    0x45, 0xe7,
];

/// Verifies artifact bytes against a detached signature and a pinned
/// public key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    public_key: Vec<u8>,
}

impl SignatureVerifier {
    /// Verifier pinned to the embedded distribution trust anchor.
    pub fn embedded() -> Self {
        Self {
            public_key: DISTRIBUTION_PUBLIC_KEY.to_vec(),
        }
    }

    /// Verifier over a caller-supplied key, for tests and mirrored
    /// distributions with their own signing key.
    pub fn with_public_key(public_key: impl Into<Vec<u8>>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }

    /// Check `signature` over the exact `content` bytes of `artifact`.
    pub fn verify(&self, artifact: &Path, content: &[u8], signature: &[u8]) -> Result<()> {
        if signature.is_empty() {
            return Err(SignatureError::Malformed {
                message: "empty signature".to_string(),
            }
            .into());
        }

        UnparsedPublicKey::new(&ED25519, &self.public_key)
            .verify(content, signature)
            .map_err(|_| {
                SignatureError::VerificationFailed {
                    artifact: artifact.to_path_buf(),
                }
                .into()
            })
    }
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::embedded()
    }
}
