use crate::group::*;
use crate::serde_hex::*;
use crate::{hash_elems, Error};

/// The public election parameters every encryption is bound to
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CiphertextElectionContext {
    pub number_of_guardians: u64,
    pub quorum: u64,

    /// The joint public key `K`
    #[serde(with = "ElementModPHex")]
    pub elgamal_public_key: ElementModP,

    /// Hash of the guardians' key ceremony commitments
    #[serde(with = "ElementModQHex")]
    pub commitment_hash: ElementModQ,

    #[serde(with = "ElementModQHex")]
    pub manifest_hash: ElementModQ,

    /// `H(P, Q, G, number_of_guardians, quorum, manifest_hash)`
    #[serde(with = "ElementModQHex")]
    pub crypto_base_hash: ElementModQ,

    /// `H(crypto_base_hash, commitment_hash)`
    #[serde(with = "ElementModQHex")]
    pub crypto_extended_base_hash: ElementModQ,
}

impl CiphertextElectionContext {
    pub fn make(
        number_of_guardians: u64,
        quorum: u64,
        elgamal_public_key: ElementModP,
        commitment_hash: ElementModQ,
        manifest_hash: ElementModQ,
    ) -> Result<Self, Error> {
        if !elgamal_public_key.is_valid_residue() {
            return Err(Error::InvalidPublicKey);
        }

        let crypto_base_hash = hash_elems!(
            to_hex(p()),
            to_hex(q()),
            g(),
            number_of_guardians,
            quorum,
            &manifest_hash
        );
        let crypto_extended_base_hash = hash_elems!(&crypto_base_hash, &commitment_hash);

        Ok(CiphertextElectionContext {
            number_of_guardians,
            quorum,
            elgamal_public_key,
            commitment_hash,
            manifest_hash,
            crypto_base_hash,
            crypto_extended_base_hash,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        crate::ballot::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_hashes_commit_to_parameters() {
        let key = g_pow_p(&ElementModQ::from(99));
        let commitment = hash_elems!("commitments");
        let manifest = hash_elems!("manifest");

        let context =
            CiphertextElectionContext::make(5, 3, key.clone(), commitment.clone(), manifest.clone())
                .unwrap();
        assert_eq!(
            context.crypto_extended_base_hash,
            hash_elems!(&context.crypto_base_hash, &commitment)
        );

        let other_quorum =
            CiphertextElectionContext::make(5, 4, key.clone(), commitment, manifest).unwrap();
        assert_ne!(other_quorum.crypto_base_hash, context.crypto_base_hash);

        let json = serde_json::to_vec(&context).unwrap();
        assert_eq!(CiphertextElectionContext::from_bytes(&json).unwrap(), context);
        let cbor = serde_cbor::to_vec(&context).unwrap();
        assert_eq!(CiphertextElectionContext::from_bytes(&cbor).unwrap(), context);
    }

    #[test]
    fn rejects_invalid_public_key() {
        assert!(matches!(
            CiphertextElectionContext::make(
                1,
                1,
                ElementModP::from(0),
                ElementModQ::from(1),
                ElementModQ::from(2)
            ),
            Err(Error::InvalidPublicKey)
        ));
    }
}
