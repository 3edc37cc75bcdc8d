use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &[u8], val: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret)
        .expect("hmac accepts keys of any length");
    mac.update(val);

    mac
}

pub fn get_digest(secret: &[u8], val: &[u8]) -> Vec<u8> {
    mac(secret, val).finalize().into_bytes().to_vec()
}

/// Constant-time comparison of `digest` against the HMAC of `val`.
pub fn is_valid(secret: &[u8], val: &[u8], digest: &[u8]) -> bool {
    mac(secret, val).verify_slice(digest).is_ok()
}
