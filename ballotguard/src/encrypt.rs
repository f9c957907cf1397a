//! Selection, contest and ballot encryption.
//!
//! All randomness derives from one master nonce per ballot:
//!
//! ```text
//! nonce seed      = H(manifest hash, ballot id, master nonce)
//! contest nonce   = Nonces(H(contest description hash, nonce seed))[contest sequence]
//! selection nonce = Nonces(H(selection description hash, contest nonce))[selection sequence]
//! proof seed      = Nonces(H(selection description hash, contest nonce))[0]
//! ```
//!
//! A precomputed bundle replaces the derived selection and proof nonces with its own
//! random exponents; the encryption is then no longer reproducible from the master nonce.

use crate::ballot::*;
use crate::chain::{ballot_code, contest_hash, selection_hash};
use crate::chaum_pedersen::{ConstantChaumPedersenProof, DisjunctiveChaumPedersenProof};
use crate::election::CiphertextElectionContext;
use crate::elgamal::{elgamal_add, elgamal_encrypt_with_triple, ElGamalCiphertext};
use crate::group::*;
use crate::hash::HashItem;
use crate::hashed_elgamal::HashedElGamalCiphertext;
use crate::manifest::{ContestDescription, InternalManifest, SelectionDescription};
use crate::nonces::Nonces;
use crate::precompute::{PrecomputeBuffer, Quadruple, Triple, TwoTriplesAndAQuadruple};
use crate::{hash_elems, Error};
use log::{debug, warn};
use std::collections::HashSet;

const DISJUNCTIVE_PROOF_HEADER: &str = "disjoint-chaum-pedersen-proof";
const EXTENDED_DATA_HEADER: &str = "extended-data";

/// Derive the bundle a selection would use without precomputation
fn bundle_from_nonces(
    selection_nonce: &ElementModQ,
    proof_seed: &ElementModQ,
    public_key: &ElementModP,
) -> TwoTriplesAndAQuadruple {
    let mut proof_nonces = Nonces::with_header(proof_seed, DISJUNCTIVE_PROOF_HEADER);
    let triple1 = Triple::from_exponent(selection_nonce.clone(), public_key);
    let triple2 = Triple::from_exponent(proof_nonces.get(0), public_key);
    let quad = Quadruple::from_exponents(proof_nonces.get(1), proof_nonces.get(2), public_key);
    TwoTriplesAndAQuadruple::new(triple1, triple2, quad)
}

/// Encrypt one selection and prove it holds 0 or 1.
///
/// Without `bundle` every exponent derives from `nonce_seed`. With one, the bundle's first
/// triple supplies the selection nonce.
#[allow(clippy::too_many_arguments)]
pub fn encrypt_selection(
    selection: &PlaintextBallotSelection,
    description: &SelectionDescription,
    public_key: &ElementModP,
    extended_base_hash: &ElementModQ,
    nonce_seed: &ElementModQ,
    is_placeholder: bool,
    should_verify_proofs: bool,
    bundle: Option<TwoTriplesAndAQuadruple>,
    extended_data_triple: Option<Triple>,
) -> Result<CiphertextBallotSelection, Error> {
    if selection.vote > 1 {
        return Err(Error::InvalidVote(
            selection.object_id.clone(),
            selection.vote,
        ));
    }

    let description_hash = &description.crypto_hash;
    let mut nonce_sequence = Nonces::with_header(description_hash, nonce_seed);
    let derived_nonce = nonce_sequence.get(description.sequence_order);
    let proof_seed = nonce_sequence.get(0);

    let bundle = match bundle {
        Some(bundle) => bundle,
        None => bundle_from_nonces(&derived_nonce, &proof_seed, public_key),
    };
    let selection_nonce = bundle.triple1().exp().clone();

    let ciphertext = elgamal_encrypt_with_triple(selection.vote, bundle.triple1());
    let proof =
        DisjunctiveChaumPedersenProof::make(&ciphertext, &bundle, extended_base_hash, selection.vote)?;
    let crypto_hash = selection_hash(description_hash, &ciphertext);

    let extended_data = match &selection.extended_data {
        Some(data) => {
            let triple = match extended_data_triple {
                Some(triple) => triple,
                None => {
                    let exp = nonce_sequence
                        .get_with_header(description.sequence_order, EXTENDED_DATA_HEADER);
                    Triple::from_exponent(exp, public_key)
                }
            };
            Some(HashedElGamalCiphertext::encrypt(
                data.as_bytes(),
                &triple,
                description_hash,
            )?)
        }
        None => None,
    };

    let encrypted = CiphertextBallotSelection {
        object_id: description.object_id.clone(),
        sequence_order: description.sequence_order,
        description_hash: description_hash.clone(),
        ciphertext,
        crypto_hash,
        is_placeholder_selection: is_placeholder,
        nonce: Some(selection_nonce),
        proof,
        extended_data,
    };

    if should_verify_proofs
        && !encrypted.is_valid_encryption(description_hash, public_key, extended_base_hash)
    {
        warn!("selection {} failed its own proof check", encrypted.object_id);
        return Err(Error::ProofVerificationFailed(encrypted.object_id));
    }

    Ok(encrypted)
}

/// Encrypt a contest, filling undervotes with placeholder selections
pub fn encrypt_contest(
    contest: &PlaintextBallotContest,
    description: &ContestDescription,
    public_key: &ElementModP,
    extended_base_hash: &ElementModQ,
    nonce_seed: &ElementModQ,
    should_verify_proofs: bool,
    precompute: Option<&PrecomputeBuffer>,
) -> Result<CiphertextBallotContest, Error> {
    let mut votes = 0u64;
    let mut seen = HashSet::with_capacity(contest.ballot_selections.len());
    for selection in contest.ballot_selections.iter() {
        if description.selection(&selection.object_id).is_none() {
            return Err(Error::UnknownSelection(
                contest.object_id.clone(),
                selection.object_id.clone(),
            ));
        }
        if !seen.insert(selection.object_id.as_str()) {
            return Err(Error::DuplicateSelection(
                contest.object_id.clone(),
                selection.object_id.clone(),
            ));
        }
        if selection.vote > 1 {
            return Err(Error::InvalidVote(
                selection.object_id.clone(),
                selection.vote,
            ));
        }
        votes += selection.vote;
    }
    if votes > description.number_elected {
        return Err(Error::Overvote(
            contest.object_id.clone(),
            votes,
            description.number_elected,
        ));
    }

    let contest_nonce = Nonces::with_header(&description.crypto_hash, nonce_seed)
        .get(description.sequence_order);

    let mut encrypted_selections =
        Vec::with_capacity(description.selections.len() + description.placeholders.len());

    for selection_description in description.selections.iter() {
        let plaintext = contest
            .ballot_selections
            .iter()
            .find(|s| s.object_id == selection_description.object_id)
            .cloned()
            .unwrap_or_else(|| PlaintextBallotSelection::new(&selection_description.object_id, 0));

        let (bundle, extended_data_triple) = draw_precomputed(precompute, &plaintext)?;
        encrypted_selections.push(encrypt_selection(
            &plaintext,
            selection_description,
            public_key,
            extended_base_hash,
            &contest_nonce,
            false,
            should_verify_proofs,
            bundle,
            extended_data_triple,
        )?);
    }

    // One placeholder vote per unfilled seat
    let mut filled = votes;
    for placeholder_description in description.placeholders.iter() {
        let vote = if filled < description.number_elected {
            filled += 1;
            1
        } else {
            0
        };
        let mut placeholder = PlaintextBallotSelection::new(&placeholder_description.object_id, vote);
        placeholder.is_placeholder_selection = true;

        let (bundle, _) = draw_precomputed(precompute, &placeholder)?;
        encrypted_selections.push(encrypt_selection(
            &placeholder,
            placeholder_description,
            public_key,
            extended_base_hash,
            &contest_nonce,
            true,
            should_verify_proofs,
            bundle,
            None,
        )?);
    }

    let ciphertexts: Vec<&ElGamalCiphertext> =
        encrypted_selections.iter().map(|s| &s.ciphertext).collect();
    let accumulation = elgamal_add(&ciphertexts);

    let aggregate_nonce = encrypted_selections
        .iter()
        .filter_map(|s| s.nonce.as_ref())
        .fold(zero_mod_q().clone(), |sum, nonce| add_mod_q(&sum, nonce));

    let triple = match precompute {
        Some(buffer) => Some(buffer.get_triple()?),
        None => None,
    };
    let proof = ConstantChaumPedersenProof::make(
        &accumulation,
        &aggregate_nonce,
        public_key,
        &contest_nonce,
        extended_base_hash,
        description.number_elected,
        triple,
    );

    let selection_hashes: Vec<ElementModQ> = encrypted_selections
        .iter()
        .map(|s| s.crypto_hash.clone())
        .collect();
    let crypto_hash = contest_hash(&description.crypto_hash, &selection_hashes, &accumulation);

    let encrypted = CiphertextBallotContest {
        object_id: description.object_id.clone(),
        sequence_order: description.sequence_order,
        description_hash: description.crypto_hash.clone(),
        ballot_selections: encrypted_selections,
        ciphertext_accumulation: accumulation,
        crypto_hash,
        nonce: Some(contest_nonce),
        proof,
    };

    if should_verify_proofs
        && !encrypted.proof.is_valid(
            &encrypted.ciphertext_accumulation,
            public_key,
            extended_base_hash,
        )
    {
        warn!("contest {} failed its own proof check", encrypted.object_id);
        return Err(Error::ProofVerificationFailed(encrypted.object_id));
    }

    Ok(encrypted)
}

fn draw_precomputed(
    precompute: Option<&PrecomputeBuffer>,
    selection: &PlaintextBallotSelection,
) -> Result<(Option<TwoTriplesAndAQuadruple>, Option<Triple>), Error> {
    let buffer = match precompute {
        Some(buffer) => buffer,
        None => return Ok((None, None)),
    };

    let bundle = buffer.get_two_triples_and_a_quadruple()?;
    let triple = if selection.extended_data.is_some() {
        Some(buffer.get_triple()?)
    } else {
        None
    };
    Ok((Some(bundle), triple))
}

/// Encrypt a ballot and compute its code.
///
/// `code_seed` is the previous ballot's code, or the device hash for the first ballot of a
/// session. Without `nonce` a random master nonce is drawn. When `precompute` is supplied
/// it must have been populated with the context's public key.
#[allow(clippy::too_many_arguments)]
pub fn encrypt_ballot(
    ballot: &PlaintextBallot,
    manifest: &InternalManifest,
    context: &CiphertextElectionContext,
    code_seed: &ElementModQ,
    nonce: Option<ElementModQ>,
    timestamp: u64,
    precompute: Option<&PrecomputeBuffer>,
    should_verify_proofs: bool,
) -> Result<CiphertextBallot, Error> {
    let public_key = &context.elgamal_public_key;
    let extended_base_hash = &context.crypto_extended_base_hash;

    if let Some(buffer) = precompute {
        match buffer.public_key() {
            Some(key) if &key == public_key => {}
            Some(_) => return Err(Error::PrecomputeKeyMismatch),
            None => return Err(Error::PrecomputeNotPopulated),
        }
    }

    for contest in ballot.contests.iter() {
        manifest.get_contest(&contest.object_id)?;
    }

    let master_nonce = nonce.unwrap_or_else(rand_q);
    let nonce_seed = hash_elems!(
        &manifest.manifest_hash,
        ballot.object_id.as_str(),
        &master_nonce
    );

    let mut contests = Vec::with_capacity(ballot.contests.len());
    for description in manifest.contests.values() {
        let plaintext = match ballot
            .contests
            .iter()
            .find(|c| c.object_id == description.object_id)
        {
            Some(plaintext) => plaintext,
            None => continue,
        };

        contests.push(encrypt_contest(
            plaintext,
            description,
            public_key,
            extended_base_hash,
            &nonce_seed,
            should_verify_proofs,
            precompute,
        )?);
    }

    let contest_hashes: Vec<ElementModQ> = contests.iter().map(|c| c.crypto_hash.clone()).collect();
    let code = ballot_code(&manifest.manifest_hash, code_seed, timestamp, &contest_hashes);
    let crypto_hash = hash_elems!(
        ballot.object_id.as_str(),
        &manifest.manifest_hash,
        HashItem::seq(contest_hashes.iter())
    );

    let encrypted = CiphertextBallot {
        object_id: ballot.object_id.clone(),
        style_id: ballot.style_id.clone(),
        manifest_hash: manifest.manifest_hash.clone(),
        code_seed: code_seed.clone(),
        contests,
        code,
        timestamp,
        crypto_hash,
        nonce: Some(master_nonce),
    };

    debug!(
        "encrypted ballot {} with {} contests",
        encrypted.object_id,
        encrypted.contests.len()
    );

    if should_verify_proofs
        && !encrypted.is_valid_encryption(&manifest.manifest_hash, public_key, extended_base_hash)
    {
        warn!("ballot {} failed its own validity check", encrypted.object_id);
        return Err(Error::ProofVerificationFailed(encrypted.object_id));
    }

    Ok(encrypted)
}
