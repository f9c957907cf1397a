//! Arithmetic over the multiplicative group of integers modulo a 4096-bit prime `P`.
//!
//! `P = Q * R + 1` where `Q = 2^256 - 189` is prime, so the group contains a subgroup
//! of prime order `Q`, generated by `G = 2^R mod P`. Ciphertext components live in
//! that subgroup ([`ElementModP`]); exponents, nonces and hashes live mod `Q`
//! ([`ElementModQ`]).

use crate::Error;
use lazy_static::lazy_static;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use std::fmt;

/// Width of a serialized `ElementModP`
pub const P_BYTES: usize = 512;

/// Width of a serialized `ElementModQ`
pub const Q_BYTES: usize = 32;

const P_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF609",
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE0429694AB55379D4683358D633F633",
);

const Q_HEX: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF43";

const R_HEX: &str = concat!(
    "0100000000000000000000000000000000000000000000000000000000000000",
    "BC0000000000000000000000000000000000000000000000000000000000008A",
    "CC00000000000000000000000000000000000000000000000000000000006678",
    "9C000000000000000000000000000000000000000000000000000000004BA70B",
    "2C00000000000000000000000000000000000000000000000000000037DA533F",
    "7C0000000000000000000000000000000000000000000000000000293C2F75DE",
    "8C000000000000000000000000000000000000000000000000001E716F0A054D",
    "5C0000000000000000000000000000000000000000000000001679BEFA65EA1C",
    "EC00000000000000000000000000000000000000000000001097E1FEDD3DD75A",
    "3C000000000000000000000000000000000000000000000C4021D92956A7FD9E",
    "4C000000000000000000000000000000000000000000090B58FD5384FA063DDE",
    "1C000000000000000000000000000000000000000006AD60B306A92C969BACFA",
    "AC0000000000000000000000000000000000000004EE00642BEAE5EB30EEB510",
    "FC00000000000000000000000000000000000003A3B649F46C6BBEA3203BAD8A",
    "0C000000000000000000000000000000000002AFDD9499740B8BBE6ECC0F1EE0",
    "E6",
);

const G_HEX: &str = concat!(
    "64AE69E9ECEF386E7C470F90A09C5369E0FA09F9FB3B15283D944F8B32574308",
    "408FF06D9B8B202543694E1D996938B9EFAD57CD33BCB3384F302685E45DB67F",
    "A2DFD76FED9B5CA73F07C9740C22B22C7CEBCA9966F5864B47BE14D16F6713CE",
    "1375E18CD318147BD53F0C1BD84B0377D4E609266BB905652CC068925ED28CB6",
    "64C11AC6DAE7D122B9DEB29D107B064F416D10927AB6A022AF6929881137ED6A",
    "671C9A53D79EA92ECD6A4C3E242143B98D4D3391F72C94C8B4A3729A54580606",
    "3FAE8AA4938BB8F2D75418FD42D02DB36737835FEB14B6DAAC56A8203DDD9DEF",
    "7112B367F42DF238FA32682F1F42F045BEEDC11F509859886A0AD8A65FEDFEC7",
    "9053983ACEB3CCCEA3DA673D98FE29B4F42E55B93BE25978CCDC06EE7665478A",
    "3DCBFB126275464F6B2851D493C45B37717D48CEBD7E73CF92C89D9BF4795AF6",
    "5EC9888642EDDBFFC5DED6CD4DE4A662D50EA32FD9AA5E968459ADFF46DA7AF6",
    "BC8BD651E428215EB8ADF483BD57A2DB494026C37BAB92CA5577A6B8D91F6499",
    "100E58CC9CED407B64C84983116F4ABE10E9F72B8F6ACB8D8E1FED853D507844",
    "4EFA05F0C5EF89920070658FDFE046D7E77FE63E142BBFBFA788DE3C09A4914C",
    "2D408ADD8A06B56C162E65DF894D4C3369FF093030C94AF2D4C0470561575599",
    "7CF078A240171A15F8D30890CDB08754F5D15CB979C8752725DE7E32D522BA0D",
);

struct GroupConstants {
    p: BigUint,
    q: BigUint,
    r: BigUint,
    g: BigUint,
}

impl GroupConstants {
    // Panics on malformed constants
    fn load() -> Self {
        let parse = |hex: &str| {
            BigUint::parse_bytes(hex.as_bytes(), 16)
                .expect("ballotguard: malformed group constant")
        };
        let constants = GroupConstants {
            p: parse(P_HEX),
            q: parse(Q_HEX),
            r: parse(R_HEX),
            g: parse(G_HEX),
        };

        assert_eq!(
            &constants.q * &constants.r + BigUint::one(),
            constants.p,
            "ballotguard: P != Q * R + 1"
        );
        assert!(
            constants.g > BigUint::one() && constants.g < constants.p,
            "ballotguard: G out of range"
        );
        assert!(
            constants.g.modpow(&constants.q, &constants.p).is_one(),
            "ballotguard: G does not generate the order-Q subgroup"
        );

        constants
    }
}

lazy_static! {
    static ref CONSTANTS: GroupConstants = GroupConstants::load();
    static ref G_MOD_P: ElementModP = ElementModP::new_unchecked(CONSTANTS.g.clone());
    static ref ZERO_MOD_P: ElementModP = ElementModP::from(0);
    static ref ONE_MOD_P: ElementModP = ElementModP::from(1);
    static ref TWO_MOD_P: ElementModP = ElementModP::from(2);
    static ref ZERO_MOD_Q: ElementModQ = ElementModQ::from(0);
    static ref ONE_MOD_Q: ElementModQ = ElementModQ::from(1);
    static ref TWO_MOD_Q: ElementModQ = ElementModQ::from(2);
}

/// The large prime modulus
pub fn p() -> &'static BigUint {
    &CONSTANTS.p
}

/// The order of the subgroup generated by `G`
pub fn q() -> &'static BigUint {
    &CONSTANTS.q
}

/// The cofactor, `(P - 1) / Q`
pub fn r() -> &'static BigUint {
    &CONSTANTS.r
}

/// The generator of the order-`Q` subgroup
pub fn g() -> &'static ElementModP {
    &G_MOD_P
}

pub fn zero_mod_p() -> &'static ElementModP {
    &ZERO_MOD_P
}

pub fn one_mod_p() -> &'static ElementModP {
    &ONE_MOD_P
}

pub fn two_mod_p() -> &'static ElementModP {
    &TWO_MOD_P
}

pub fn zero_mod_q() -> &'static ElementModQ {
    &ZERO_MOD_Q
}

pub fn one_mod_q() -> &'static ElementModQ {
    &ONE_MOD_Q
}

pub fn two_mod_q() -> &'static ElementModQ {
    &TWO_MOD_Q
}

macro_rules! element_type {
    ($name:ident, $modulus:expr, $width:expr, $label:expr) => {
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(BigUint);

        impl $name {
            /// Create an element, failing if `value` is not in `[0, modulus)`
            pub fn new(value: BigUint) -> Result<Self, Error> {
                if value < *$modulus {
                    Ok($name(value))
                } else {
                    Err(Error::InvalidElement($label))
                }
            }

            /// Create an element without range validation.
            ///
            /// Only for hard-coded constants and for values the caller has already verified.
            pub fn new_unchecked(value: BigUint) -> Self {
                $name(value)
            }

            /// Parse a hexidecimal string, failing if the value is out of range
            pub fn from_hex(hex: &str) -> Result<Self, Error> {
                Self::new(parse_hex(hex)?)
            }

            /// Parse a hexidecimal string without range validation
            pub fn from_hex_unchecked(hex: &str) -> Result<Self, Error> {
                Ok(Self::new_unchecked(parse_hex(hex)?))
            }

            /// Read a big-endian byte string, failing if the value is out of range
            pub fn from_bytes_be(bytes: &[u8]) -> Result<Self, Error> {
                Self::new(BigUint::from_bytes_be(bytes))
            }

            pub fn as_biguint(&self) -> &BigUint {
                &self.0
            }

            /// Uppercase hex, padded to an even number of digits
            pub fn to_hex(&self) -> String {
                to_hex(&self.0)
            }

            /// Fixed-width big-endian encoding
            pub fn to_bytes(&self) -> Vec<u8> {
                let bytes = self.0.to_bytes_be();
                let mut padded = vec![0u8; $width.saturating_sub(bytes.len())];
                padded.extend_from_slice(&bytes);
                padded
            }

            pub fn is_in_bounds(&self) -> bool {
                self.0 < *$modulus
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                $name(BigUint::from(value))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }
    };
}

element_type!(ElementModP, p(), P_BYTES, "p");
element_type!(ElementModQ, q(), Q_BYTES, "q");

impl ElementModP {
    /// `0 < x < P` and `x^Q mod P == 1`, i.e. the value is a member of the order-`Q` subgroup
    pub fn is_valid_residue(&self) -> bool {
        !self.0.is_zero() && self.is_in_bounds() && self.0.modpow(q(), p()).is_one()
    }

    /// Raise to an arbitrary non-negative exponent
    pub fn pow(&self, exponent: &BigUint) -> ElementModP {
        ElementModP(self.0.modpow(exponent, p()))
    }
}

/// Uppercase hex, padded to an even number of digits
pub fn to_hex(value: &BigUint) -> String {
    let hex = value.to_str_radix(16).to_uppercase();
    if hex.len() % 2 == 1 {
        format!("0{}", hex)
    } else {
        hex
    }
}

fn parse_hex(hex: &str) -> Result<BigUint, Error> {
    let hex = hex.trim();
    if hex.is_empty() {
        return Err(Error::InvalidHex);
    }
    BigUint::parse_bytes(hex.as_bytes(), 16).ok_or(Error::InvalidHex)
}

/// `base ^ exponent mod P`
pub fn pow_mod_p(base: &ElementModP, exponent: &ElementModQ) -> ElementModP {
    base.pow(&exponent.0)
}

/// `G ^ exponent mod P`
pub fn g_pow_p(exponent: &ElementModQ) -> ElementModP {
    pow_mod_p(g(), exponent)
}

/// `a * b mod P`
pub fn mult_mod_p(a: &ElementModP, b: &ElementModP) -> ElementModP {
    ElementModP((&a.0 * &b.0) % p())
}

/// Product of all the elements mod P. The empty product is one.
pub fn mul_mod_p(elems: &[&ElementModP]) -> ElementModP {
    let product = elems
        .iter()
        .fold(BigUint::one(), |acc, elem| (acc * &elem.0) % p());
    ElementModP(product)
}

/// `a + b mod Q`
pub fn add_mod_q(a: &ElementModQ, b: &ElementModQ) -> ElementModQ {
    ElementModQ((&a.0 + &b.0) % q())
}

/// `a * b mod Q`
pub fn mult_mod_q(a: &ElementModQ, b: &ElementModQ) -> ElementModQ {
    ElementModQ((&a.0 * &b.0) % q())
}

/// `a - b mod Q`
pub fn a_minus_b_mod_q(a: &ElementModQ, b: &ElementModQ) -> ElementModQ {
    // b < Q, so adding Q first keeps the subtraction non-negative
    ElementModQ((&a.0 + q() - &b.0) % q())
}

/// `a + b * c mod Q`
pub fn a_plus_bc_mod_q(a: &ElementModQ, b: &ElementModQ, c: &ElementModQ) -> ElementModQ {
    ElementModQ((&a.0 + &b.0 * &c.0) % q())
}

/// `-a mod Q`
pub fn negate_mod_q(a: &ElementModQ) -> ElementModQ {
    a_minus_b_mod_q(&ZERO_MOD_Q, a)
}

/// Uniformly sample an exponent in `[1, Q)` from the operating system's CSPRNG
pub fn rand_q() -> ElementModQ {
    rand_q_with(&mut OsRng)
}

/// Uniformly sample an exponent in `[1, Q)` from the given CSPRNG
pub fn rand_q_with<R: RngCore + CryptoRng>(rng: &mut R) -> ElementModQ {
    ElementModQ(rng.gen_biguint_range(&BigUint::one(), q()))
}

/// Uniformly sample an exponent in `[start, Q)`
pub fn rand_range_q(start: &ElementModQ) -> ElementModQ {
    ElementModQ(OsRng.gen_biguint_range(&start.0, q()))
}
