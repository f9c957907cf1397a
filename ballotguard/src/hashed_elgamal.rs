//! Hashed ElGamal for arbitrary-length extended data (write-ins and the like).
//!
//! The pad `g^r` and the shared secret `K^r` come from a precomputed [`Triple`]. HKDF-SHA256
//! over both, bound to a seed, yields an AES-256-GCM key and IV. The holder of the secret key
//! recovers the shared secret as `pad^s`.

use crate::group::*;
use crate::hash::CryptoHashable;
use crate::precompute::Triple;
use crate::serde_hex::*;
use crate::{hash_elems, Error};
use aes_gcm::aead::{Aead, NewAead};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;

const AES_KEY_LENGTH: usize = 32;
const AES_IV_LENGTH: usize = 12;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HashedElGamalCiphertext {
    #[serde(with = "ElementModPHex")]
    pub pad: ElementModP,

    /// AES-GCM ciphertext followed by its tag
    #[serde(with = "hex")]
    pub data: Vec<u8>,
}

impl HashedElGamalCiphertext {
    /// Encrypt `message` with the nonce held in `triple`
    pub fn encrypt(message: &[u8], triple: &Triple, seed: &ElementModQ) -> Result<Self, Error> {
        let pad = triple.g_to_exp();
        let (key, iv) = derive_key(pad, triple.pubkey_to_exp(), seed)
            .ok_or(Error::ExtendedDataEncryption)?;

        let cipher = Aes256Gcm::new(Key::from_slice(&key));
        let data = cipher
            .encrypt(Nonce::from_slice(&iv), message)
            .map_err(|_| Error::ExtendedDataEncryption)?;

        Ok(HashedElGamalCiphertext {
            pad: pad.clone(),
            data,
        })
    }

    pub fn decrypt(&self, secret_key: &ElementModQ, seed: &ElementModQ) -> Result<Vec<u8>, Error> {
        let shared = pow_mod_p(&self.pad, secret_key);
        self.decrypt_with_shared(&shared, seed)
    }

    pub fn decrypt_known_nonce(
        &self,
        public_key: &ElementModP,
        nonce: &ElementModQ,
        seed: &ElementModQ,
    ) -> Result<Vec<u8>, Error> {
        let shared = pow_mod_p(public_key, nonce);
        self.decrypt_with_shared(&shared, seed)
    }

    fn decrypt_with_shared(&self, shared: &ElementModP, seed: &ElementModQ) -> Result<Vec<u8>, Error> {
        let (key, iv) = derive_key(&self.pad, shared, seed).ok_or(Error::ExtendedDataDecryption)?;

        let cipher = Aes256Gcm::new(Key::from_slice(&key));
        cipher
            .decrypt(Nonce::from_slice(&iv), self.data.as_slice())
            .map_err(|_| Error::ExtendedDataDecryption)
    }
}

impl CryptoHashable for HashedElGamalCiphertext {
    fn crypto_hash(&self) -> ElementModQ {
        hash_elems!(&self.pad, hex::encode_upper(&self.data))
    }
}

fn derive_key(
    pad: &ElementModP,
    shared: &ElementModP,
    seed: &ElementModQ,
) -> Option<([u8; AES_KEY_LENGTH], [u8; AES_IV_LENGTH])> {
    let mut master = Vec::with_capacity(P_BYTES * 2);
    master.extend(pad.to_bytes());
    master.extend(shared.to_bytes());

    let h = Hkdf::<Sha256>::new(None, &master);
    let mut out = [0u8; AES_KEY_LENGTH + AES_IV_LENGTH];
    h.expand(seed.to_hex().as_bytes(), &mut out).ok()?;

    let mut key = [0u8; AES_KEY_LENGTH];
    let mut iv = [0u8; AES_IV_LENGTH];
    key.copy_from_slice(&out[..AES_KEY_LENGTH]);
    iv.copy_from_slice(&out[AES_KEY_LENGTH..]);
    Some((key, iv))
}
