//! Non-interactive Chaum-Pedersen proofs over ElGamal ciphertexts.
//!
//! [`DisjunctiveChaumPedersenProof`] shows a selection encrypts 0 or 1. The real branch
//! commits with the bundle's second triple; the other branch is simulated from the
//! bundle's quadruple, whose `g^exp1` and `g^exp2 * K^exp1` are exactly the commitments
//! a simulated branch needs.
//!
//! [`ConstantChaumPedersenProof`] shows a contest's accumulated ciphertext encrypts a known
//! constant.

use crate::elgamal::ElGamalCiphertext;
use crate::group::*;
use crate::nonces::Nonces;
use crate::precompute::{Triple, TwoTriplesAndAQuadruple};
use crate::serde_hex::*;
use crate::{hash_elems, Error};
use log::debug;

const CONSTANT_PROOF_HEADER: &str = "constant-chaum-pedersen-proof";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DisjunctiveChaumPedersenProof {
    #[serde(with = "ElementModPHex")]
    pub proof_zero_pad: ElementModP,

    #[serde(with = "ElementModPHex")]
    pub proof_zero_data: ElementModP,

    #[serde(with = "ElementModPHex")]
    pub proof_one_pad: ElementModP,

    #[serde(with = "ElementModPHex")]
    pub proof_one_data: ElementModP,

    #[serde(with = "ElementModQHex")]
    pub proof_zero_challenge: ElementModQ,

    #[serde(with = "ElementModQHex")]
    pub proof_one_challenge: ElementModQ,

    #[serde(with = "ElementModQHex")]
    pub challenge: ElementModQ,

    #[serde(with = "ElementModQHex")]
    pub proof_zero_response: ElementModQ,

    #[serde(with = "ElementModQHex")]
    pub proof_one_response: ElementModQ,
}

impl DisjunctiveChaumPedersenProof {
    /// Prove that `ciphertext`, encrypted with `bundle.triple1()`, holds `plaintext`.
    ///
    /// `seed` is bound into the challenge, usually the extended base hash.
    pub fn make(
        ciphertext: &ElGamalCiphertext,
        bundle: &TwoTriplesAndAQuadruple,
        seed: &ElementModQ,
        plaintext: u64,
    ) -> Result<Self, Error> {
        match plaintext {
            0 => Ok(Self::make_zero(ciphertext, bundle, seed)),
            1 => Ok(Self::make_one(ciphertext, bundle, seed)),
            other => Err(Error::InvalidVote(
                "disjunctive proof plaintext".to_string(),
                other,
            )),
        }
    }

    fn make_zero(
        ciphertext: &ElGamalCiphertext,
        bundle: &TwoTriplesAndAQuadruple,
        seed: &ElementModQ,
    ) -> Self {
        let r = bundle.triple1().exp();
        let real = bundle.triple2();
        let fake = bundle.quad();

        // Real zero branch
        let u = real.exp();
        let a0 = real.g_to_exp();
        let b0 = real.pubkey_to_exp();

        // Simulated one branch
        let c1 = fake.exp2();
        let v1 = a_plus_bc_mod_q(fake.exp1(), r, c1);
        let a1 = fake.g_to_exp1();
        let b1 = fake.g_to_exp2_mult_by_pubkey_to_exp1();

        let c = hash_elems!(seed, &ciphertext.pad, &ciphertext.data, a0, b0, a1, b1);
        let c0 = a_minus_b_mod_q(&c, c1);
        let v0 = a_plus_bc_mod_q(u, &c0, r);

        DisjunctiveChaumPedersenProof {
            proof_zero_pad: a0.clone(),
            proof_zero_data: b0.clone(),
            proof_one_pad: a1.clone(),
            proof_one_data: b1.clone(),
            proof_zero_challenge: c0,
            proof_one_challenge: c1.clone(),
            challenge: c,
            proof_zero_response: v0,
            proof_one_response: v1,
        }
    }

    fn make_one(
        ciphertext: &ElGamalCiphertext,
        bundle: &TwoTriplesAndAQuadruple,
        seed: &ElementModQ,
    ) -> Self {
        let r = bundle.triple1().exp();
        let real = bundle.triple2();
        let fake = bundle.quad();

        // Simulated zero branch
        let c0 = negate_mod_q(fake.exp2());
        let v0 = a_plus_bc_mod_q(fake.exp1(), r, &c0);
        let a0 = fake.g_to_exp1();
        let b0 = fake.g_to_exp2_mult_by_pubkey_to_exp1();

        // Real one branch
        let u = real.exp();
        let a1 = real.g_to_exp();
        let b1 = real.pubkey_to_exp();

        let c = hash_elems!(seed, &ciphertext.pad, &ciphertext.data, a0, b0, a1, b1);
        let c1 = a_minus_b_mod_q(&c, &c0);
        let v1 = a_plus_bc_mod_q(u, &c1, r);

        DisjunctiveChaumPedersenProof {
            proof_zero_pad: a0.clone(),
            proof_zero_data: b0.clone(),
            proof_one_pad: a1.clone(),
            proof_one_data: b1.clone(),
            proof_zero_challenge: c0,
            proof_one_challenge: c1,
            challenge: c,
            proof_zero_response: v0,
            proof_one_response: v1,
        }
    }

    /// Check the proof against `ciphertext`, `public_key` and `seed`
    pub fn is_valid(
        &self,
        ciphertext: &ElGamalCiphertext,
        public_key: &ElementModP,
        seed: &ElementModQ,
    ) -> bool {
        let alpha = &ciphertext.pad;
        let beta = &ciphertext.data;
        let a0 = &self.proof_zero_pad;
        let b0 = &self.proof_zero_data;
        let a1 = &self.proof_one_pad;
        let b1 = &self.proof_one_data;
        let c0 = &self.proof_zero_challenge;
        let c1 = &self.proof_one_challenge;
        let c = &self.challenge;
        let v0 = &self.proof_zero_response;
        let v1 = &self.proof_one_response;

        let in_range = [alpha, beta, a0, b0, a1, b1]
            .iter()
            .all(|elem| elem.is_valid_residue())
            && [c0, c1, c, v0, v1].iter().all(|elem| elem.is_in_bounds());
        if !in_range {
            debug!("disjunctive proof has an element out of range");
            return false;
        }

        let recomputed = hash_elems!(seed, alpha, beta, a0, b0, a1, b1);
        if recomputed != *c || add_mod_q(c0, c1) != *c {
            debug!("disjunctive proof challenge mismatch");
            return false;
        }

        let zero_pad_ok = g_pow_p(v0) == mult_mod_p(a0, &pow_mod_p(alpha, c0));
        let one_pad_ok = g_pow_p(v1) == mult_mod_p(a1, &pow_mod_p(alpha, c1));
        let zero_data_ok = pow_mod_p(public_key, v0) == mult_mod_p(b0, &pow_mod_p(beta, c0));
        let one_data_ok = mult_mod_p(&g_pow_p(c1), &pow_mod_p(public_key, v1))
            == mult_mod_p(b1, &pow_mod_p(beta, c1));

        let valid = zero_pad_ok && one_pad_ok && zero_data_ok && one_data_ok;
        if !valid {
            debug!(
                "disjunctive proof equations failed: zero_pad {}, one_pad {}, zero_data {}, one_data {}",
                zero_pad_ok, one_pad_ok, zero_data_ok, one_data_ok
            );
        }
        valid
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConstantChaumPedersenProof {
    #[serde(with = "ElementModPHex")]
    pub pad: ElementModP,

    #[serde(with = "ElementModPHex")]
    pub data: ElementModP,

    #[serde(with = "ElementModQHex")]
    pub challenge: ElementModQ,

    #[serde(with = "ElementModQHex")]
    pub response: ElementModQ,

    pub constant: u64,
}

impl ConstantChaumPedersenProof {
    /// Prove that `ciphertext`, encrypted with aggregate nonce `r`, holds `constant`.
    ///
    /// The commitment exponent comes from `triple` when one is supplied, otherwise it is
    /// derived from `seed`.
    pub fn make(
        ciphertext: &ElGamalCiphertext,
        r: &ElementModQ,
        public_key: &ElementModP,
        seed: &ElementModQ,
        hash_header: &ElementModQ,
        constant: u64,
        triple: Option<Triple>,
    ) -> Self {
        let triple = match triple {
            Some(triple) => triple,
            None => {
                let u = Nonces::with_header(seed, CONSTANT_PROOF_HEADER).get(0);
                Triple::from_exponent(u, public_key)
            }
        };

        let a = triple.g_to_exp();
        let b = triple.pubkey_to_exp();
        let c = hash_elems!(hash_header, &ciphertext.pad, &ciphertext.data, a, b);
        let v = a_plus_bc_mod_q(triple.exp(), &c, r);

        ConstantChaumPedersenProof {
            pad: a.clone(),
            data: b.clone(),
            challenge: c,
            response: v,
            constant,
        }
    }

    pub fn is_valid(
        &self,
        ciphertext: &ElGamalCiphertext,
        public_key: &ElementModP,
        hash_header: &ElementModQ,
    ) -> bool {
        let alpha = &ciphertext.pad;
        let beta = &ciphertext.data;
        let a = &self.pad;
        let b = &self.data;
        let c = &self.challenge;
        let v = &self.response;

        let in_range = [alpha, beta, a, b].iter().all(|elem| elem.is_valid_residue())
            && c.is_in_bounds()
            && v.is_in_bounds();
        if !in_range {
            debug!("constant proof has an element out of range");
            return false;
        }

        if hash_elems!(hash_header, alpha, beta, a, b) != *c {
            debug!("constant proof challenge mismatch");
            return false;
        }

        let constant = ElementModQ::from(self.constant);
        let pad_ok = g_pow_p(v) == mult_mod_p(a, &pow_mod_p(alpha, c));
        let data_ok = mult_mod_p(&g_pow_p(&mult_mod_q(c, &constant)), &pow_mod_p(public_key, v))
            == mult_mod_p(b, &pow_mod_p(beta, c));

        let valid = pad_ok && data_ok;
        if !valid {
            debug!(
                "constant proof equations failed: pad {}, data {}",
                pad_ok, data_ok
            );
        }
        valid
    }
}
