//! Local Signer - In-process secp256k1 Key
//!
//! Holds one secp256k1 private key loaded from an environment variable
//! and signs 32-byte digests with it (recoverable ECDSA, 65 bytes
//! `r || s || v`). Curves without a local key, such as p256 for the
//! Tezos family, are reported as missing and must be served by an
//! external signer.

use std::collections::HashMap;
use std::str::FromStr;

use alloy::hex;
use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::codec::SigningPayload;
use crate::domain::types::Curve;
use crate::ports::signer::Signer;

/// secp256k1 signer backed by alloy's `PrivateKeySigner`.
pub struct LocalSigner {
    key: PrivateKeySigner,
    /// Compressed SEC1 public key, hex encoded.
    public_key: String,
}

impl LocalSigner {
    /// Build from a hex private key, with or without `0x`.
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let key = PrivateKeySigner::from_str(private_key.trim())
            .context("Invalid secp256k1 private key")?;
        let public_key = hex::encode(key.credential().verifying_key().to_sec1_bytes());
        Ok(Self { key, public_key })
    }

    /// Load the key from the named environment variable.
    ///
    /// The variable MUST come from the process environment (never
    /// committed to config files).
    pub fn from_env(var: &str) -> Result<Self> {
        let raw = std::env::var(var).with_context(|| format!("{var} not set"))?;
        let signer = Self::from_hex(&raw)?;
        info!(address = %signer.address(), "Loaded secp256k1 signing key");
        Ok(signer)
    }

    /// Ethereum address of the key, for logs and on-chain allow-lists.
    pub fn address(&self) -> Address {
        self.key.address()
    }

    fn sign_digest(&self, digest: &B256) -> Result<Vec<u8>> {
        let signature = self
            .key
            .sign_hash_sync(digest)
            .context("secp256k1 signing failed")?;
        Ok(signature.as_bytes().to_vec())
    }
}

#[async_trait]
impl Signer for LocalSigner {
    async fn sign(&self, payload: &SigningPayload, curve: Curve) -> Result<Vec<u8>> {
        match (curve, payload) {
            (Curve::Secp256k1, SigningPayload::Digest(digest)) => self.sign_digest(digest),
            (Curve::Secp256k1, SigningPayload::Raw(_)) => {
                bail!("secp256k1 key only signs 32-byte digests")
            }
            (Curve::P256, _) => bail!("no local p256 key"),
        }
    }

    fn public_keys(&self) -> HashMap<Curve, String> {
        HashMap::from([(Curve::Secp256k1, self.public_key.clone())])
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::keccak256;

    use super::*;

    // Well-known development key (anvil account #0).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_address_and_public_key() {
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();
        assert_eq!(
            signer.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        let keys = signer.public_keys();
        let public_key = &keys[&Curve::Secp256k1];
        assert_eq!(public_key.len(), 66);
        assert!(public_key.starts_with("02") || public_key.starts_with("03"));
        assert!(!keys.contains_key(&Curve::P256));
    }

    #[tokio::test]
    async fn test_signature_recovers_to_address() {
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();
        let digest = keccak256(b"price payload");

        let bytes = signer
            .sign(&SigningPayload::Digest(digest), Curve::Secp256k1)
            .await
            .unwrap();
        assert_eq!(bytes.len(), 65);

        let expected = signer.key.sign_hash_sync(&digest).unwrap();
        assert_eq!(bytes, expected.as_bytes().to_vec());
        assert_eq!(expected.recover_address_from_prehash(&digest).unwrap(), signer.address());
    }

    #[tokio::test]
    async fn test_rejects_unsupported_requests() {
        let signer = LocalSigner::from_hex(DEV_KEY).unwrap();
        assert!(signer.sign(&SigningPayload::Raw(vec![1, 2]), Curve::Secp256k1).await.is_err());
        assert!(signer.sign(&SigningPayload::Digest(B256::ZERO), Curve::P256).await.is_err());
    }

    #[test]
    fn test_invalid_key() {
        assert!(LocalSigner::from_hex("0x1234").is_err());
        assert!(LocalSigner::from_env("PRICE_ORACLE_TEST_UNSET_KEY_VAR").is_err());
    }
}
