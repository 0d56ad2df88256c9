//! HMAC-SHA256 signing, used for facilitator requests and livestream room tickets.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC of a facilitator request body.
pub const FACILITATOR_AUTH_HEADER: &str = "X-Facilitator-Auth";

/// Sign a request body with the shared facilitator secret. Returns lowercase hex.
pub fn sign_body(secret: &[u8], body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    alloy::hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_rfc4231_vector() {
        assert_eq!(
            sign_body(b"Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn other_secret_or_body_changes_signature() {
        let sig = sign_body(b"secret-a", b"tip");
        assert_eq!(sig.len(), 64);
        assert_eq!(sig, sign_body(b"secret-a", b"tip"));
        assert_ne!(sig, sign_body(b"secret-b", b"tip"));
        assert_ne!(sig, sign_body(b"secret-a", b"tap"));
    }
}
