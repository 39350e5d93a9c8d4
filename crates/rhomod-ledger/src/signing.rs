//! Signing canonical data.
//!
//! The payload handed to a [`Signer`] is the canonical byte encoding of a
//! [`Value`], so the same data always yields the same bytes to sign.

use rhomod_term::{CodecError, Value, encode, hex_lower, to_bytes};
use serde::Serialize;

/// A signature over a canonical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Signature {
    pub fn public_key_hex(&self) -> String {
        hex_lower(&self.public_key)
    }

    pub fn signature_hex(&self) -> String {
        hex_lower(&self.signature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("no key labelled {label:?}")]
    UnknownKey { label: String },

    #[error("signing failed: {message}")]
    Signer { message: String },
}

/// A keystore able to sign bytes with a labelled key.
pub trait Signer {
    fn sign(&self, payload: &[u8], key_label: &str, password: &str)
    -> Result<Signature, SignError>;
}

/// Canonical bytes of `value`.
pub fn signing_payload(value: &Value) -> Result<Vec<u8>, CodecError> {
    to_bytes(&encode(value)?)
}

pub fn sign_value<S>(
    signer: &S,
    value: &Value,
    key_label: &str,
    password: &str,
) -> Result<Signature, SignError>
where
    S: Signer + ?Sized,
{
    let payload = signing_payload(value)?;
    tracing::debug!(key_label, payload_len = payload.len(), "signing canonical payload");
    signer.sign(&payload, key_label, password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records payloads and "signs" by reversing them.
    struct RecordingSigner {
        seen: RefCell<Vec<Vec<u8>>>,
    }

    impl Signer for RecordingSigner {
        fn sign(
            &self,
            payload: &[u8],
            key_label: &str,
            _password: &str,
        ) -> Result<Signature, SignError> {
            if key_label != "alice" {
                return Err(SignError::UnknownKey {
                    label: key_label.to_string(),
                });
            }
            self.seen.borrow_mut().push(payload.to_vec());
            Ok(Signature {
                public_key: vec![0xaa],
                signature: payload.iter().rev().copied().collect(),
            })
        }
    }

    #[test]
    fn payload_is_canonical_encoding() {
        let value = Value::map([("x", Value::from("abc"))]);
        let payload = signing_payload(&value).expect("payload should encode");
        assert_eq!(hex_lower(&payload), "0a0b0a0012072a051a03616263");
    }

    #[test]
    fn sign_value_hands_canonical_bytes_to_signer() {
        let signer = RecordingSigner {
            seen: RefCell::new(Vec::new()),
        };
        let signature = sign_value(&signer, &Value::Int(123), "alice", "pw")
            .expect("signing should succeed");
        assert_eq!(signer.seen.borrow().as_slice(), &[vec![0x2a, 0x03, 0x10, 0xf6, 0x01]]);
        assert_eq!(signature.signature_hex(), "01f610032a");
        assert_eq!(signature.public_key_hex(), "aa");
    }

    #[test]
    fn signer_errors_propagate() {
        let signer = RecordingSigner {
            seen: RefCell::new(Vec::new()),
        };
        let err = sign_value(&signer, &Value::Null, "bob", "pw").unwrap_err();
        assert_eq!(
            err,
            SignError::UnknownKey {
                label: "bob".to_string()
            }
        );
        assert!(signer.seen.borrow().is_empty());
    }
}
