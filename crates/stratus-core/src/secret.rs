//! Purpose-bound keys derived from the process secret.
//!
//! The code codec and the URL signer never share key material: each derives its
//! own 32-byte key as `HMAC-SHA256(secret, purpose)`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Purpose label for the authorization code AEAD key
pub const AUTHORIZATION_CODE_PURPOSE: &[u8] = b"stratus/authorization-code/v1";

/// Purpose label for the signed URL MAC key
pub const SIGNED_URL_PURPOSE: &[u8] = b"stratus/signed-url/v1";

/// Derive a 32-byte key for `purpose` from `secret`.
pub fn derive_key(secret: &[u8], purpose: &[u8]) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(purpose);
    mac.finalize().into_bytes().into()
}
