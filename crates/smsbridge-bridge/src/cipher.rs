use crate::error::BridgeError;

/// The end-to-end session cipher, consumed as an opaque transform.
///
/// The real implementation is a Double-Ratchet-style session keyed per
/// client; this crate never inspects ciphertext structure. `decrypt`
/// must fail with [`BridgeError::AuthenticationFailure`] when the
/// integrity check fails. Enforcing at-most-once use of a session per
/// inbound message is the implementation's responsibility.
pub trait SessionCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, BridgeError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, BridgeError>;
}
