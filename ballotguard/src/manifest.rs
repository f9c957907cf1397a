//! The parts of an election manifest the encryptor reads: contests, their selections, and the
//! description hashes every ciphertext is bound to.

use crate::group::ElementModQ;
use crate::hash::{CryptoHashable, HashItem};
use crate::serde_hex::*;
use crate::{hash_elems, Error};
use indexmap::IndexMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SelectionDescription {
    pub object_id: String,
    pub candidate_id: String,
    pub sequence_order: u64,

    #[serde(with = "ElementModQHex")]
    pub crypto_hash: ElementModQ,
}

impl SelectionDescription {
    pub fn new(object_id: &str, candidate_id: &str, sequence_order: u64) -> Self {
        SelectionDescription {
            object_id: object_id.to_string(),
            candidate_id: candidate_id.to_string(),
            sequence_order,
            crypto_hash: hash_elems!(object_id, sequence_order, candidate_id),
        }
    }
}

impl CryptoHashable for SelectionDescription {
    fn crypto_hash(&self) -> ElementModQ {
        self.crypto_hash.clone()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContestDescription {
    pub object_id: String,
    pub sequence_order: u64,
    pub name: String,

    /// Number of selections that must be made, counting placeholders
    pub number_elected: u64,
    pub votes_allowed: u64,

    pub selections: Vec<SelectionDescription>,

    /// One placeholder per seat, used to pad undervotes
    pub placeholders: Vec<SelectionDescription>,

    #[serde(with = "ElementModQHex")]
    pub crypto_hash: ElementModQ,
}

impl ContestDescription {
    /// Build a contest, ordering its selections and generating its placeholders.
    ///
    /// Placeholders take the sequence orders after the last selection, so those must fit in a `u64`.
    pub fn new(
        object_id: &str,
        sequence_order: u64,
        name: &str,
        number_elected: u64,
        votes_allowed: u64,
        mut selections: Vec<SelectionDescription>,
    ) -> Result<Self, Error> {
        selections.sort_by_key(|s| s.sequence_order);

        let overflow = || Error::SequenceOrderOverflow(object_id.to_string());
        let next_sequence = match selections.last() {
            Some(last) => last.sequence_order.checked_add(1).ok_or_else(overflow)?,
            None => 0,
        };
        let placeholders = (0..number_elected)
            .map(|i| {
                let sequence_order = next_sequence.checked_add(i).ok_or_else(overflow)?;
                let placeholder_id = format!("{}-{}", object_id, sequence_order);
                let candidate_id = format!("{}-candidate", placeholder_id);
                Ok(SelectionDescription::new(
                    &placeholder_id,
                    &candidate_id,
                    sequence_order,
                ))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let crypto_hash = hash_elems!(
            object_id,
            sequence_order,
            name,
            number_elected,
            votes_allowed,
            HashItem::seq(selections.iter().map(|s| &s.crypto_hash))
        );

        Ok(ContestDescription {
            object_id: object_id.to_string(),
            sequence_order,
            name: name.to_string(),
            number_elected,
            votes_allowed,
            selections,
            placeholders,
            crypto_hash,
        })
    }

    pub fn selection(&self, object_id: &str) -> Option<&SelectionDescription> {
        self.selections.iter().find(|s| s.object_id == object_id)
    }
}

impl CryptoHashable for ContestDescription {
    fn crypto_hash(&self) -> ElementModQ {
        self.crypto_hash.clone()
    }
}

/// A manifest reduced to what encryption needs, contests keyed by object id in
/// sequence order
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InternalManifest {
    pub election_scope_id: String,

    #[serde(with = "ElementModQHex")]
    pub manifest_hash: ElementModQ,

    pub contests: IndexMap<String, ContestDescription>,
}

impl InternalManifest {
    pub fn new(election_scope_id: &str, mut contests: Vec<ContestDescription>) -> Self {
        contests.sort_by_key(|c| c.sequence_order);

        let manifest_hash = hash_elems!(
            election_scope_id,
            HashItem::seq(contests.iter().map(|c| &c.crypto_hash))
        );

        let contests = contests
            .into_iter()
            .map(|c| (c.object_id.clone(), c))
            .collect();

        InternalManifest {
            election_scope_id: election_scope_id.to_string(),
            manifest_hash,
            contests,
        }
    }

    pub fn get_contest(&self, object_id: &str) -> Result<&ContestDescription, Error> {
        self.contests
            .get(object_id)
            .ok_or_else(|| Error::UnknownContest(object_id.to_string()))
    }
}
