//! Exponential ElGamal over the order-`Q` subgroup.
//!
//! A message `m` encrypted with nonce `r` under public key `K = g^s` is the pair
//! `(g^r, g^m * K^r)`. Ciphertexts multiply component-wise to add their plaintexts.

use crate::group::*;
use crate::hash::CryptoHashable;
use crate::precompute::Triple;
use crate::serde_hex::*;
use crate::{hash_elems, Error};

/// Largest plaintext recovered by the discrete log search in `decrypt_*`
pub const MAX_DISCRETE_LOG: u64 = 100_000;

#[derive(Clone, Debug)]
pub struct ElGamalKeyPair {
    secret_key: ElementModQ,
    public_key: ElementModP,
}

impl ElGamalKeyPair {
    /// Derive `K = g^s`. The secret must be at least two.
    pub fn from_secret(secret_key: ElementModQ) -> Result<Self, Error> {
        if secret_key < *two_mod_q() {
            return Err(Error::InvalidSecretKey);
        }
        let public_key = g_pow_p(&secret_key);
        Ok(ElGamalKeyPair {
            secret_key,
            public_key,
        })
    }

    pub fn generate() -> Self {
        let secret_key = rand_range_q(two_mod_q());
        let public_key = g_pow_p(&secret_key);
        ElGamalKeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn secret_key(&self) -> &ElementModQ {
        &self.secret_key
    }

    pub fn public_key(&self) -> &ElementModP {
        &self.public_key
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElGamalCiphertext {
    #[serde(with = "ElementModPHex")]
    pub pad: ElementModP,

    #[serde(with = "ElementModPHex")]
    pub data: ElementModP,
}

impl ElGamalCiphertext {
    pub fn new(pad: ElementModP, data: ElementModP) -> Self {
        ElGamalCiphertext { pad, data }
    }

    /// Homomorphic addition of the two plaintexts
    pub fn add(&self, other: &ElGamalCiphertext) -> ElGamalCiphertext {
        ElGamalCiphertext {
            pad: mult_mod_p(&self.pad, &other.pad),
            data: mult_mod_p(&self.data, &other.data),
        }
    }

    pub fn is_valid_residue(&self) -> bool {
        self.pad.is_valid_residue() && self.data.is_valid_residue()
    }

    /// Decrypt with the secret key
    pub fn decrypt_known_secret(&self, secret_key: &ElementModQ) -> Option<u64> {
        self.decrypt_known_product(&pow_mod_p(&self.pad, secret_key))
    }

    /// Decrypt with the nonce used to encrypt
    pub fn decrypt_known_nonce(&self, public_key: &ElementModP, nonce: &ElementModQ) -> Option<u64> {
        self.decrypt_known_product(&pow_mod_p(public_key, nonce))
    }

    /// Decrypt given the blinding factor `K^r`
    pub fn decrypt_known_product(&self, product: &ElementModP) -> Option<u64> {
        let inverse = product.pow(&(p() - 2u32));
        discrete_log(&mult_mod_p(&self.data, &inverse))
    }
}

impl CryptoHashable for ElGamalCiphertext {
    fn crypto_hash(&self) -> ElementModQ {
        hash_elems!(&self.pad, &self.data)
    }
}

/// Encrypt `message` with `nonce` under `public_key`
pub fn elgamal_encrypt(
    message: u64,
    nonce: &ElementModQ,
    public_key: &ElementModP,
) -> Result<ElGamalCiphertext, Error> {
    if nonce.is_zero() {
        return Err(Error::InvalidElement("q"));
    }
    if !public_key.is_valid_residue() {
        return Err(Error::InvalidPublicKey);
    }

    let pad = g_pow_p(nonce);
    let data = mult_mod_p(&g_pow_p(&ElementModQ::from(message)), &pow_mod_p(public_key, nonce));
    Ok(ElGamalCiphertext { pad, data })
}

/// Encrypt `message` reusing the powers held in `triple`; `triple.exp()` is the nonce.
///
/// Messages `0` and `1` cost no exponentiation.
pub fn elgamal_encrypt_with_triple(message: u64, triple: &Triple) -> ElGamalCiphertext {
    let pad = triple.g_to_exp().clone();
    let data = match message {
        0 => triple.pubkey_to_exp().clone(),
        1 => mult_mod_p(g(), triple.pubkey_to_exp()),
        m => mult_mod_p(&g_pow_p(&ElementModQ::from(m)), triple.pubkey_to_exp()),
    };
    ElGamalCiphertext { pad, data }
}

/// Homomorphically add any number of ciphertexts. The empty sum is `(1, 1)`.
pub fn elgamal_add(ciphertexts: &[&ElGamalCiphertext]) -> ElGamalCiphertext {
    let identity = ElGamalCiphertext::new(one_mod_p().clone(), one_mod_p().clone());
    ciphertexts
        .iter()
        .fold(identity, |sum, ciphertext| sum.add(ciphertext))
}

fn discrete_log(element: &ElementModP) -> Option<u64> {
    let mut candidate = one_mod_p().clone();
    for exponent in 0..=MAX_DISCRETE_LOG {
        if candidate == *element {
            return Some(exponent);
        }
        candidate = mult_mod_p(&candidate, g());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_must_be_at_least_two() {
        assert!(matches!(
            ElGamalKeyPair::from_secret(ElementModQ::from(1)),
            Err(Error::InvalidSecretKey)
        ));
        let keypair = ElGamalKeyPair::from_secret(ElementModQ::from(2)).unwrap();
        assert_eq!(keypair.public_key(), &g_pow_p(&ElementModQ::from(2)));
    }

    #[test]
    fn encrypt_decrypt() {
        let keypair = ElGamalKeyPair::generate();
        let nonce = rand_q();
        for message in [0u64, 1, 7].iter() {
            let ciphertext = elgamal_encrypt(*message, &nonce, keypair.public_key()).unwrap();
            assert!(ciphertext.is_valid_residue());
            assert_eq!(
                ciphertext.decrypt_known_secret(keypair.secret_key()),
                Some(*message)
            );
            assert_eq!(
                ciphertext.decrypt_known_nonce(keypair.public_key(), &nonce),
                Some(*message)
            );
        }
    }

    #[test]
    fn zero_nonce_is_rejected() {
        let keypair = ElGamalKeyPair::generate();
        assert!(elgamal_encrypt(1, zero_mod_q(), keypair.public_key()).is_err());
    }

    #[test]
    fn triple_encryption_matches_direct_encryption() {
        let keypair = ElGamalKeyPair::generate();
        let triple = Triple::generate(keypair.public_key());
        for message in [0u64, 1, 3].iter() {
            assert_eq!(
                elgamal_encrypt_with_triple(*message, &triple),
                elgamal_encrypt(*message, triple.exp(), keypair.public_key()).unwrap()
            );
        }
    }

    #[test]
    fn ciphertexts_add_homomorphically() {
        let keypair = ElGamalKeyPair::generate();
        let ciphertexts: Vec<_> = [1u64, 0, 1, 1]
            .iter()
            .map(|m| elgamal_encrypt(*m, &rand_q(), keypair.public_key()).unwrap())
            .collect();
        let refs: Vec<&ElGamalCiphertext> = ciphertexts.iter().collect();
        let sum = elgamal_add(&refs);
        assert_eq!(sum.decrypt_known_secret(keypair.secret_key()), Some(3));
        assert_eq!(
            elgamal_add(&[]).decrypt_known_secret(keypair.secret_key()),
            Some(0)
        );
    }
}
