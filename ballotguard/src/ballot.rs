use crate::chain::{ballot_code, contest_hash, selection_hash};
use crate::chaum_pedersen::{ConstantChaumPedersenProof, DisjunctiveChaumPedersenProof};
use crate::elgamal::{elgamal_add, ElGamalCiphertext};
use crate::group::*;
use crate::hash::{CryptoHashable, HashItem};
use crate::hashed_elgamal::HashedElGamalCiphertext;
use crate::serde_hex::*;
use crate::{hash_elems, Error};
use content_inspector::ContentType;
use log::debug;
use serde::de::DeserializeOwned;

/// Deserialize from JSON or CBOR, detected from the content
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    match content_inspector::inspect(bytes) {
        ContentType::UTF_8 => Ok(serde_json::from_slice(bytes)?),
        ContentType::BINARY => Ok(serde_cbor::from_slice(bytes)?),
        _ => Err(Error::DeserializationUnknownFormat),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlaintextBallotSelection {
    pub object_id: String,
    pub vote: u64,

    #[serde(default)]
    pub is_placeholder_selection: bool,

    /// Write-in text or other data encrypted alongside the vote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_data: Option<String>,
}

impl PlaintextBallotSelection {
    pub fn new(object_id: &str, vote: u64) -> Self {
        PlaintextBallotSelection {
            object_id: object_id.to_string(),
            vote,
            is_placeholder_selection: false,
            extended_data: None,
        }
    }

    pub fn with_extended_data(mut self, extended_data: &str) -> Self {
        self.extended_data = Some(extended_data.to_string());
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlaintextBallotContest {
    pub object_id: String,
    pub ballot_selections: Vec<PlaintextBallotSelection>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlaintextBallot {
    pub object_id: String,
    pub style_id: String,
    pub contests: Vec<PlaintextBallotContest>,
}

impl PlaintextBallot {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        from_bytes(bytes)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CiphertextBallotSelection {
    pub object_id: String,
    pub sequence_order: u64,

    #[serde(with = "ElementModQHex")]
    pub description_hash: ElementModQ,

    pub ciphertext: ElGamalCiphertext,

    #[serde(with = "ElementModQHex")]
    pub crypto_hash: ElementModQ,

    pub is_placeholder_selection: bool,

    /// Encryption nonce; removed before the ballot is submitted
    #[serde(with = "option_q_hex", default)]
    pub nonce: Option<ElementModQ>,

    pub proof: DisjunctiveChaumPedersenProof,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_data: Option<HashedElGamalCiphertext>,
}

impl CiphertextBallotSelection {
    pub fn crypto_hash_with(&self, seed_hash: &ElementModQ) -> ElementModQ {
        selection_hash(seed_hash, &self.ciphertext)
    }

    /// `seed_hash` is the selection's description hash
    pub fn is_valid_encryption(
        &self,
        seed_hash: &ElementModQ,
        public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> bool {
        if seed_hash != &self.description_hash {
            debug!("selection {} description hash mismatch", self.object_id);
            return false;
        }

        if self.crypto_hash_with(seed_hash) != self.crypto_hash {
            debug!("selection {} crypto hash mismatch", self.object_id);
            return false;
        }

        self.proof
            .is_valid(&self.ciphertext, public_key, extended_base_hash)
    }
}

impl CryptoHashable for CiphertextBallotSelection {
    fn crypto_hash(&self) -> ElementModQ {
        self.crypto_hash.clone()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CiphertextBallotContest {
    pub object_id: String,
    pub sequence_order: u64,

    #[serde(with = "ElementModQHex")]
    pub description_hash: ElementModQ,

    /// Real selections followed by placeholders, in sequence order
    pub ballot_selections: Vec<CiphertextBallotSelection>,

    pub ciphertext_accumulation: ElGamalCiphertext,

    #[serde(with = "ElementModQHex")]
    pub crypto_hash: ElementModQ,

    #[serde(with = "option_q_hex", default)]
    pub nonce: Option<ElementModQ>,

    pub proof: ConstantChaumPedersenProof,
}

impl CiphertextBallotContest {
    /// Sum of the selection nonces, if they are all still present
    pub fn aggregate_nonce(&self) -> Option<ElementModQ> {
        self.ballot_selections
            .iter()
            .try_fold(zero_mod_q().clone(), |sum, selection| {
                selection.nonce.as_ref().map(|nonce| add_mod_q(&sum, nonce))
            })
    }

    pub fn elgamal_accumulate(&self) -> ElGamalCiphertext {
        let ciphertexts: Vec<&ElGamalCiphertext> = self
            .ballot_selections
            .iter()
            .map(|s| &s.ciphertext)
            .collect();
        elgamal_add(&ciphertexts)
    }

    pub fn crypto_hash_with(&self, seed_hash: &ElementModQ) -> ElementModQ {
        let selection_hashes: Vec<ElementModQ> = self
            .ballot_selections
            .iter()
            .map(|s| s.crypto_hash.clone())
            .collect();
        contest_hash(seed_hash, &selection_hashes, &self.ciphertext_accumulation)
    }

    /// `seed_hash` is the contest's description hash
    pub fn is_valid_encryption(
        &self,
        seed_hash: &ElementModQ,
        public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> bool {
        if seed_hash != &self.description_hash {
            debug!("contest {} description hash mismatch", self.object_id);
            return false;
        }

        if self.crypto_hash_with(seed_hash) != self.crypto_hash {
            debug!("contest {} crypto hash mismatch", self.object_id);
            return false;
        }

        if self.elgamal_accumulate() != self.ciphertext_accumulation {
            debug!("contest {} accumulation mismatch", self.object_id);
            return false;
        }

        let selections_valid = self.ballot_selections.iter().all(|selection| {
            selection.is_valid_encryption(
                &selection.description_hash,
                public_key,
                extended_base_hash,
            )
        });
        if !selections_valid {
            return false;
        }

        self.proof
            .is_valid(&self.ciphertext_accumulation, public_key, extended_base_hash)
    }
}

impl CryptoHashable for CiphertextBallotContest {
    fn crypto_hash(&self) -> ElementModQ {
        self.crypto_hash.clone()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CiphertextBallot {
    pub object_id: String,
    pub style_id: String,

    #[serde(with = "ElementModQHex")]
    pub manifest_hash: ElementModQ,

    /// The previous ballot's code, or the device hash for the first ballot
    #[serde(with = "ElementModQHex")]
    pub code_seed: ElementModQ,

    pub contests: Vec<CiphertextBallotContest>,

    #[serde(with = "ElementModQHex")]
    pub code: ElementModQ,

    pub timestamp: u64,

    #[serde(with = "ElementModQHex")]
    pub crypto_hash: ElementModQ,

    #[serde(with = "option_q_hex", default)]
    pub nonce: Option<ElementModQ>,
}

impl CiphertextBallot {
    pub fn contest_hashes(&self) -> Vec<ElementModQ> {
        self.contests.iter().map(|c| c.crypto_hash.clone()).collect()
    }

    pub fn crypto_hash_with(&self, manifest_hash: &ElementModQ) -> ElementModQ {
        hash_elems!(
            self.object_id.as_str(),
            manifest_hash,
            HashItem::seq(self.contests.iter().map(|c| &c.crypto_hash))
        )
    }

    /// Check every hash, the ballot code and every proof on the ballot
    pub fn is_valid_encryption(
        &self,
        manifest_hash: &ElementModQ,
        public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> bool {
        if manifest_hash != &self.manifest_hash {
            debug!("ballot {} manifest hash mismatch", self.object_id);
            return false;
        }

        if self.crypto_hash_with(manifest_hash) != self.crypto_hash {
            debug!("ballot {} crypto hash mismatch", self.object_id);
            return false;
        }

        let code = ballot_code(
            manifest_hash,
            &self.code_seed,
            self.timestamp,
            &self.contest_hashes(),
        );
        if code != self.code {
            debug!("ballot {} code mismatch", self.object_id);
            return false;
        }

        self.contests.iter().all(|contest| {
            contest.is_valid_encryption(&contest.description_hash, public_key, extended_base_hash)
        })
    }

    /// Cast or spoil the ballot, discarding every nonce
    pub fn submit(&self, state: BallotBoxState) -> SubmittedBallot {
        let mut ballot = self.clone();
        ballot.nonce = None;
        for contest in ballot.contests.iter_mut() {
            contest.nonce = None;
            for selection in contest.ballot_selections.iter_mut() {
                selection.nonce = None;
            }
        }
        SubmittedBallot { ballot, state }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("ballotguard: Unexpected error serializing ballot")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("ballotguard: Unexpected error packing ballot")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        from_bytes(bytes)
    }
}

impl CryptoHashable for CiphertextBallot {
    fn crypto_hash(&self) -> ElementModQ {
        self.crypto_hash.clone()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BallotBoxState {
    Cast,
    Spoiled,
    Unknown,
}

/// A ballot handed to the ballot box, nonces removed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SubmittedBallot {
    pub ballot: CiphertextBallot,
    pub state: BallotBoxState,
}

impl SubmittedBallot {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("ballotguard: Unexpected error packing ballot")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        from_bytes(bytes)
    }
}
