pub mod types {
    pub use poolwatch_protocol::types::*;
}

use crate::types::{JobDescription, WeightVote};
use anyhow::{Context, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Digest the validator signs when casting a vote for `subnet_id`.
pub fn vote_digest(subnet_id: u16, vote: &WeightVote) -> Result<String> {
    let payload = serde_json::to_vec(&serde_json::json!({
        "netuid": subnet_id,
        "uids": vote.uids,
        "weights": vote.weights,
    }))?;
    Ok(sha256_hex(&payload))
}

/// Digest bound into a signed worker request: target key, job and timestamp.
pub fn request_digest(target_key: &str, job: &JobDescription, timestamp_ms: i64) -> Result<String> {
    let job_bytes = serde_json::to_vec(job)?;
    let payload = format!("{target_key}|{timestamp_ms}|{}", sha256_hex(&job_bytes));
    Ok(sha256_hex(payload.as_bytes()))
}

#[derive(Clone)]
pub struct ValidatorIdentity {
    signing_key: SigningKey,
}

impl ValidatorIdentity {
    pub fn from_seed(seed_32: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed_32),
        }
    }

    /// Hex-encoded public key; this is the identity key registered on the ledger.
    pub fn identity_key(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn sign_bytes(&self, bytes: &[u8]) -> String {
        let sig = self.signing_key.sign(bytes);
        hex::encode(sig.to_bytes())
    }

    pub fn sign_vote(&self, subnet_id: u16, vote: &WeightVote) -> Result<String> {
        let digest = vote_digest(subnet_id, vote)?;
        Ok(self.sign_bytes(digest.as_bytes()))
    }
}

impl std::fmt::Debug for ValidatorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorIdentity")
            .field("identity_key", &self.identity_key())
            .finish()
    }
}

pub fn verify_signature(public_key_hex: &str, message: &[u8], signature_hex: &str) -> Result<()> {
    let key_bytes = hex::decode(public_key_hex).context("decode pubkey")?;
    let sig_bytes = hex::decode(signature_hex).context("decode signature")?;
    let key_array: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("invalid pubkey length"))?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("invalid signature length"))?;

    let key = VerifyingKey::from_bytes(&key_array)?;
    let signature = Signature::from_bytes(&sig_array);
    key.verify(message, &signature)?;
    Ok(())
}

pub fn verify_vote_signature(
    identity_key: &str,
    subnet_id: u16,
    vote: &WeightVote,
    signature_hex: &str,
) -> Result<()> {
    let digest = vote_digest(subnet_id, vote)?;
    verify_signature(identity_key, digest.as_bytes(), signature_hex)
}
