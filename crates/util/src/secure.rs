//! Authenticated encryption of small values, used for tokens handed out to
//! clients (such as session cookies).

use failure::Fail;
use rand::Rng;
use ring::aead::{self, Aad, BoundKey, Nonce, NONCE_LEN};
use serde::{Serialize, de::DeserializeOwned};
use syllabus_macros::From;

/// Encrypt and sign a value.
///
/// The result is MessagePack-encoded `value`, encrypted with AES-256-GCM
/// under `key`, followed by the authentication tag and the nonce.
pub fn seal<T>(key: &[u8], value: T) -> Result<Vec<u8>, SealingError>
where
    T: Serialize,
{
    let mut data = rmps::to_vec(&value)?;

    let nonce_bytes: [u8; NONCE_LEN] = rand::thread_rng().gen();
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let key = aead::UnboundKey::new(&aead::AES_256_GCM, key)?;
    let mut key = aead::SealingKey::new(key, SingleNonce(Some(nonce)));

    key.seal_in_place_append_tag(Aad::empty(), &mut data)?;
    data.extend_from_slice(&nonce_bytes);

    Ok(data)
}

#[derive(Debug, Fail, From)]
pub enum SealingError {
    #[fail(display = "could not serialize: {}", _0)]
    Serialization(#[cause] #[from] rmps::encode::Error),
    #[fail(display = "could not encrypt: {}", _0)]
    Crypto(#[from] ring::error::Unspecified),
}

/// Decrypt and verify a value produced by [`seal`].
pub fn unseal<T>(key: &[u8], data: &mut [u8]) -> Result<T, UnsealingError>
where
    T: DeserializeOwned,
{
    if data.len() < NONCE_LEN {
        return Err(UnsealingError::TooShort);
    }

    let index = data.len() - NONCE_LEN;
    let (ciphertext, nonce) = data.split_at_mut(index);
    let nonce = SingleNonce(Some(Nonce::try_assume_unique_for_key(nonce)?));

    let key = aead::UnboundKey::new(&aead::AES_256_GCM, key)?;
    let mut key = aead::OpeningKey::new(key, nonce);

    let decrypted = key.open_in_place(Aad::empty(), ciphertext)?;

    rmps::from_slice(decrypted).map_err(UnsealingError::Serialization)
}

#[derive(Debug, Fail, From)]
pub enum UnsealingError {
    #[fail(display = "could not deserialize: {}", _0)]
    Serialization(#[cause] #[from] rmps::decode::Error),
    #[fail(display = "could not decrypt: {}", _0)]
    Crypto(#[from] ring::error::Unspecified),
    #[fail(display = "not enough data to unseal")]
    TooShort,
}

/// A nonce sequence yielding exactly one nonce.
struct SingleNonce(Option<Nonce>);

impl aead::NonceSequence for SingleNonce {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        self.0.take().ok_or(ring::error::Unspecified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [7; 32];

    #[test]
    fn sealed_value_can_be_unsealed() {
        let mut sealed = seal(&KEY, 42i32).unwrap();
        assert_eq!(unseal::<i32>(&KEY, &mut sealed).unwrap(), 42);
    }

    #[test]
    fn tampered_value_is_rejected() {
        let mut sealed = seal(&KEY, 42i32).unwrap();
        sealed[0] ^= 0xff;
        assert!(unseal::<i32>(&KEY, &mut sealed).is_err());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let mut sealed = seal(&KEY, 42i32).unwrap();
        assert!(unseal::<i32>(&[8; 32], &mut sealed).is_err());
    }

    #[test]
    fn short_input_is_rejected() {
        let mut data = [0u8; 4];
        match unseal::<i32>(&KEY, &mut data) {
            Err(UnsealingError::TooShort) => (),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
