//! Ballot codes and the hash chain linking consecutive ballots.
//!
//! ```text
//! selection hash = H(selection description hash, ciphertext)
//! contest hash   = H(contest description hash, [selection hashes], accumulation)
//! ballot code    = H(manifest hash, code seed, timestamp, [contest hashes])
//! ```
//!
//! Each ballot's code seed is the previous ballot's code, or the device hash for the first
//! ballot of a session. Altering, reordering or dropping anything changes every later code.

use crate::ballot::{CiphertextBallot, PlaintextBallot};
use crate::election::CiphertextElectionContext;
use crate::elgamal::ElGamalCiphertext;
use crate::encrypt::encrypt_ballot;
use crate::group::*;
use crate::hash::HashItem;
use crate::manifest::InternalManifest;
use crate::precompute::PrecomputeBuffer;
use crate::{hash_elems, Error};
use log::{debug, info};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn selection_hash(description_hash: &ElementModQ, ciphertext: &ElGamalCiphertext) -> ElementModQ {
    hash_elems!(description_hash, HashItem::Hashable(ciphertext))
}

pub fn contest_hash(
    description_hash: &ElementModQ,
    selection_hashes: &[ElementModQ],
    accumulation: &ElGamalCiphertext,
) -> ElementModQ {
    hash_elems!(
        description_hash,
        HashItem::seq(selection_hashes),
        HashItem::Hashable(accumulation)
    )
}

pub fn ballot_code(
    manifest_hash: &ElementModQ,
    code_seed: &ElementModQ,
    timestamp: u64,
    contest_hashes: &[ElementModQ],
) -> ElementModQ {
    hash_elems!(
        manifest_hash,
        code_seed,
        timestamp,
        HashItem::seq(contest_hashes)
    )
}

/// Recompute a ballot's code from its ciphertexts, ignoring every stored hash
pub fn recompute_ballot_code(ballot: &CiphertextBallot) -> ElementModQ {
    let contest_hashes: Vec<ElementModQ> = ballot
        .contests
        .iter()
        .map(|contest| {
            let selection_hashes: Vec<ElementModQ> = contest
                .ballot_selections
                .iter()
                .map(|s| selection_hash(&s.description_hash, &s.ciphertext))
                .collect();
            contest_hash(
                &contest.description_hash,
                &selection_hashes,
                &contest.ciphertext_accumulation,
            )
        })
        .collect();

    ballot_code(
        &ballot.manifest_hash,
        &ballot.code_seed,
        ballot.timestamp,
        &contest_hashes,
    )
}

/// Re-derive every code in `ballots` and check each links to its predecessor
pub fn verify_ballot_chain(
    initial_seed: &ElementModQ,
    manifest_hash: &ElementModQ,
    ballots: &[CiphertextBallot],
) -> bool {
    let mut seed = initial_seed;
    for (i, ballot) in ballots.iter().enumerate() {
        if &ballot.code_seed != seed {
            debug!("ballot {} ({}) does not link to its predecessor", i, ballot.object_id);
            return false;
        }
        if &ballot.manifest_hash != manifest_hash {
            debug!("ballot {} ({}) has a foreign manifest hash", i, ballot.object_id);
            return false;
        }
        if recompute_ballot_code(ballot) != ballot.code {
            debug!("ballot {} ({}) code does not match its contents", i, ballot.object_id);
            return false;
        }
        seed = &ballot.code;
    }
    true
}

/// The device a chain of ballots is encrypted on
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EncryptionDevice {
    pub device_id: u64,
    pub session_id: u64,
    pub launch_code: u64,
    pub location: String,
}

impl EncryptionDevice {
    pub fn new(device_id: u64, session_id: u64, launch_code: u64, location: &str) -> Self {
        EncryptionDevice {
            device_id,
            session_id,
            launch_code,
            location: location.to_string(),
        }
    }

    /// Seed for the first ballot code of this device's session
    pub fn device_hash(&self) -> ElementModQ {
        hash_elems!(
            self.device_id,
            self.session_id,
            self.launch_code,
            self.location.as_str()
        )
    }
}

/// Encrypts ballots one after another on a single device, chaining their codes
pub struct EncryptionMediator<'a> {
    manifest: InternalManifest,
    context: CiphertextElectionContext,
    device: EncryptionDevice,
    code_seed: ElementModQ,
    precompute: Option<&'a PrecomputeBuffer>,
    should_verify_proofs: bool,
}

impl<'a> EncryptionMediator<'a> {
    pub fn new(
        manifest: InternalManifest,
        context: CiphertextElectionContext,
        device: EncryptionDevice,
    ) -> Self {
        let code_seed = device.device_hash();
        EncryptionMediator {
            manifest,
            context,
            device,
            code_seed,
            precompute: None,
            should_verify_proofs: true,
        }
    }

    /// Draw precomputed values from `buffer`
    pub fn with_precompute(mut self, buffer: &'a PrecomputeBuffer) -> Self {
        self.precompute = Some(buffer);
        self
    }

    pub fn verify_proofs(mut self, should_verify_proofs: bool) -> Self {
        self.should_verify_proofs = should_verify_proofs;
        self
    }

    pub fn device(&self) -> &EncryptionDevice {
        &self.device
    }

    /// The seed the next ballot's code will chain from
    pub fn code_seed(&self) -> &ElementModQ {
        &self.code_seed
    }

    /// Encrypt with a fresh random nonce, stamped with the current time
    pub fn encrypt(&mut self, ballot: &PlaintextBallot) -> Result<CiphertextBallot, Error> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.encrypt_with(ballot, rand_q(), timestamp)
    }

    pub fn encrypt_with(
        &mut self,
        ballot: &PlaintextBallot,
        nonce: ElementModQ,
        timestamp: u64,
    ) -> Result<CiphertextBallot, Error> {
        let encrypted = encrypt_ballot(
            ballot,
            &self.manifest,
            &self.context,
            &self.code_seed,
            Some(nonce),
            timestamp,
            self.precompute,
            self.should_verify_proofs,
        )?;

        info!("encrypted ballot {} with code {}", encrypted.object_id, encrypted.code);
        self.code_seed = encrypted.code.clone();
        Ok(encrypted)
    }
}
