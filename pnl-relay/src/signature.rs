//! Mailgun webhook signature verification.
//!
//! Mailgun signs `timestamp || token` with HMAC-SHA256 under the account's
//! webhook signing key and sends the hex digest as `signature`.

use hmac::{Hmac, Mac};
use log::{error, info, warn};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Verified,
    /// No signing key configured
    Skipped,
    Rejected,
}

impl SignatureCheck {
    pub fn accepted(&self) -> bool {
        !matches!(self, SignatureCheck::Rejected)
    }
}

#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: Option<String>,
}

impl SignatureVerifier {
    pub fn new(secret: &str) -> Self {
        let secret = Some(secret.trim().to_string()).filter(|s| !s.is_empty());
        Self { secret }
    }

    pub fn verify(&self, token: &str, timestamp: &str, signature: &str) -> SignatureCheck {
        let Some(secret) = &self.secret else {
            warn!("Mailgun signing key not set, skipping verification");
            return SignatureCheck::Skipped;
        };

        // Mailgun sends lowercase hex; anything else cannot match the digest
        let signature = signature.trim();
        if signature.bytes().any(|b| b.is_ascii_uppercase()) {
            error!("Invalid Mailgun signature (not lowercase hex)");
            return SignatureCheck::Rejected;
        }
        let Ok(expected) = hex::decode(signature) else {
            error!("Invalid Mailgun signature (not hex)");
            return SignatureCheck::Rejected;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            error!("Could not initialise HMAC for Mailgun signature");
            return SignatureCheck::Rejected;
        };
        mac.update(timestamp.as_bytes());
        mac.update(token.as_bytes());

        // constant-time comparison
        match mac.verify_slice(&expected) {
            Ok(()) => {
                info!("Mailgun signature verified");
                SignatureCheck::Verified
            }
            Err(_) => {
                error!("Invalid Mailgun signature");
                SignatureCheck::Rejected
            }
        }
    }
}
