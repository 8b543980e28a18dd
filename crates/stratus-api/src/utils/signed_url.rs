//! Expiring, path-bound URLs.
//!
//! A signed path is `/signed/{signature}.{expiry}{path}` where
//! `signature = base64url(HMAC-SHA256(key, path || "." || expiry))` and `expiry`
//! is a unix timestamp in seconds. Changing the path or the expiry invalidates it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use stratus_core::secret::{derive_key, SIGNED_URL_PURPOSE};

use crate::constants::SIGNED_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// Missing segment, missing dot, non-canonical expiry or undecodable signature
    #[error("malformed signature")]
    Malformed,

    #[error("signature expired")]
    Expired,

    #[error("invalid signature")]
    Invalid,
}

#[derive(Clone)]
pub struct UrlSigner {
    key: [u8; 32],
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: derive_key(secret, SIGNED_URL_PURPOSE),
        }
    }

    /// Sign `path` so that it stays valid for `ttl` from now.
    pub fn sign(&self, path: &str, ttl: Duration) -> String {
        let expiry = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|ttl| Utc::now().timestamp().checked_add(ttl))
            .unwrap_or(i64::MAX);
        self.sign_until(path, expiry)
    }

    /// Sign `path` with an absolute expiry.
    pub fn sign_until(&self, path: &str, expiry: i64) -> String {
        let tag = self.mac(path, expiry).finalize().into_bytes();
        format!(
            "{}/{}.{}{}",
            SIGNED_PREFIX,
            URL_SAFE_NO_PAD.encode(tag),
            expiry,
            path
        )
    }

    /// Check a `{signature}.{expiry}` segment against the path it was issued for.
    pub fn verify(&self, segment: &str, path: &str, now: i64) -> Result<(), SignatureError> {
        let (signature, raw_expiry) = segment.split_once('.').ok_or(SignatureError::Malformed)?;
        if raw_expiry.is_empty() || !raw_expiry.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SignatureError::Malformed);
        }
        let expiry: i64 = raw_expiry.parse().map_err(|_| SignatureError::Malformed)?;
        // the MAC covers the canonical form, so only that spelling is accepted
        if expiry.to_string() != raw_expiry {
            return Err(SignatureError::Malformed);
        }
        let tag = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignatureError::Malformed)?;

        self.mac(path, expiry)
            .verify_slice(&tag)
            .map_err(|_| SignatureError::Invalid)?;

        // the expiry is only trusted once the tag covering it checks out
        if now > expiry {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }

    fn mac(&self, path: &str, expiry: i64) -> Hmac<Sha256> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).expect("HMAC accepts any key size");
        mac.update(path.as_bytes());
        mac.update(b".");
        mac.update(expiry.to_string().as_bytes());
        mac
    }
}

/// Split `/signed/{segment}{path}` into the segment and the inner path.
pub fn split_signed_path(signed: &str) -> Option<(&str, &str)> {
    let rest = signed.strip_prefix(SIGNED_PREFIX)?.strip_prefix('/')?;
    let slash = rest.find('/')?;
    let (segment, path) = rest.split_at(slash);
    if segment.is_empty() {
        return None;
    }
    Some((segment, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
    const PATH: &str = "/configuration-versions/cv-abc/upload";

    fn signer() -> UrlSigner {
        UrlSigner::from_secret(SECRET)
    }

    fn sign_and_split(expiry: i64) -> String {
        let signed = signer().sign_until(PATH, expiry);
        let (segment, path) = split_signed_path(&signed).unwrap();
        assert_eq!(path, PATH);
        segment.to_string()
    }

    #[test]
    fn test_intact_unexpired_signature_is_accepted() {
        let now = Utc::now().timestamp();
        let segment = sign_and_split(now + 60);
        assert_eq!(signer().verify(&segment, PATH, now), Ok(()));
    }

    #[test]
    fn test_sign_with_ttl_round_trips() {
        let signed = signer().sign(PATH, Duration::from_secs(3600));
        let (segment, path) = split_signed_path(&signed).unwrap();
        assert!(signer().verify(segment, path, Utc::now().timestamp()).is_ok());
    }

    #[test]
    fn test_expired_signature_is_rejected() {
        let now = Utc::now().timestamp();
        let segment = sign_and_split(now - 1);
        assert_eq!(
            signer().verify(&segment, PATH, now),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn test_altered_signature_is_rejected() {
        let now = Utc::now().timestamp();
        let segment = sign_and_split(now + 60);
        let mut chars: Vec<char> = segment.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        let altered: String = chars.into_iter().collect();
        assert_eq!(
            signer().verify(&altered, PATH, now),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_path_change_is_rejected() {
        let now = Utc::now().timestamp();
        let segment = sign_and_split(now + 60);
        assert_eq!(
            signer().verify(&segment, "/configuration-versions/cv-abd/upload", now),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_extended_expiry_is_rejected() {
        let now = Utc::now().timestamp();
        let segment = sign_and_split(now + 60);
        let (signature, _) = segment.split_once('.').unwrap();
        let forged = format!("{}.{}", signature, now + 86400);
        assert_eq!(
            signer().verify(&forged, PATH, now),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let now = Utc::now().timestamp();
        let segment = sign_and_split(now + 60);
        let other = UrlSigner::from_secret(b"fedcba9876543210fedcba9876543210");
        assert_eq!(other.verify(&segment, PATH, now), Err(SignatureError::Invalid));
    }

    #[test]
    fn test_huge_ttl_does_not_wrap_into_the_past() {
        let signed = signer().sign(PATH, Duration::from_secs(u64::MAX));
        let (segment, path) = split_signed_path(&signed).unwrap();
        assert!(segment.ends_with(&i64::MAX.to_string()));
        assert_eq!(signer().verify(segment, path, Utc::now().timestamp()), Ok(()));
    }

    #[test]
    fn test_non_canonical_expiry_is_rejected() {
        let now = Utc::now().timestamp();
        let expiry = now + 60;
        let segment = sign_and_split(expiry);
        let (signature, _) = segment.split_once('.').unwrap();

        for spelling in [format!("+{}", expiry), format!("000{}", expiry)] {
            let respelled = format!("{}.{}", signature, spelling);
            assert_eq!(
                signer().verify(&respelled, PATH, now),
                Err(SignatureError::Malformed)
            );
        }
    }

    #[test]
    fn test_malformed_segments() {
        let now = Utc::now().timestamp();
        assert_eq!(signer().verify("nodot", PATH, now), Err(SignatureError::Malformed));
        assert_eq!(signer().verify("abc.xyz", PATH, now), Err(SignatureError::Malformed));
        assert_eq!(signer().verify("!!!.123", PATH, now), Err(SignatureError::Malformed));
        assert!(split_signed_path("/signed//configuration-versions").is_none());
        assert!(split_signed_path("/unsigned/abc.1/x").is_none());
    }
}
