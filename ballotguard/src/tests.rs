use super::*;

struct Election {
    keypair: ElGamalKeyPair,
    manifest: InternalManifest,
    context: CiphertextElectionContext,
}

fn election() -> Election {
    let mayor = ContestDescription::new(
        "mayor",
        1,
        "Mayor",
        1,
        1,
        vec![
            SelectionDescription::new("mayor-alice", "alice", 1),
            SelectionDescription::new("mayor-bob", "bob", 2),
        ],
    )
    .unwrap();
    let council = ContestDescription::new(
        "council",
        2,
        "City Council",
        2,
        2,
        vec![
            SelectionDescription::new("council-carol", "carol", 1),
            SelectionDescription::new("council-dave", "dave", 2),
            SelectionDescription::new("council-erin", "erin", 3),
        ],
    )
    .unwrap();
    let manifest = InternalManifest::new("general-2026", vec![council, mayor]);

    let keypair = ElGamalKeyPair::from_secret(ElementModQ::from(0x5EC2E7)).unwrap();
    let context = CiphertextElectionContext::make(
        3,
        2,
        keypair.public_key().clone(),
        hash_elems!("commitments"),
        manifest.manifest_hash.clone(),
    )
    .unwrap();

    Election {
        keypair,
        manifest,
        context,
    }
}

fn ballot(id: &str) -> PlaintextBallot {
    PlaintextBallot {
        object_id: id.to_string(),
        style_id: "city".to_string(),
        contests: vec![
            PlaintextBallotContest {
                object_id: "mayor".to_string(),
                ballot_selections: vec![PlaintextBallotSelection::new("mayor-bob", 1)],
            },
            PlaintextBallotContest {
                object_id: "council".to_string(),
                ballot_selections: vec![
                    PlaintextBallotSelection::new("council-carol", 1),
                    PlaintextBallotSelection::new("council-erin", 0)
                        .with_extended_data("write-in: Frank"),
                ],
            },
        ],
    }
}

fn mayor_only(id: &str, vote_for: &str) -> PlaintextBallot {
    PlaintextBallot {
        object_id: id.to_string(),
        style_id: "mayor".to_string(),
        contests: vec![PlaintextBallotContest {
            object_id: "mayor".to_string(),
            ballot_selections: vec![PlaintextBallotSelection::new(vote_for, 1)],
        }],
    }
}

#[test]
fn end_to_end_ballot_encryption() {
    let e = election();
    let pk = e.keypair.public_key();
    let extended_base_hash = &e.context.crypto_extended_base_hash;

    // The first ballot of a session chains from the device
    let device = EncryptionDevice::new(1, 2, 3, "polling-place-7");
    let code_seed = device.device_hash();

    let encrypted = encrypt_ballot(
        &ballot("ballot-1"),
        &e.manifest,
        &e.context,
        &code_seed,
        Some(ElementModQ::from(42)),
        1_700_000_000,
        None,
        true,
    )
    .unwrap();

    assert!(encrypted.is_valid_encryption(&e.manifest.manifest_hash, pk, extended_base_hash));

    // Contests follow manifest order, selections are real ones then placeholders
    assert_eq!(encrypted.contests[0].object_id, "mayor");
    assert_eq!(encrypted.contests[1].object_id, "council");
    assert_eq!(encrypted.contests[0].ballot_selections.len(), 3);
    assert_eq!(encrypted.contests[1].ballot_selections.len(), 5);

    // Every contest accumulates to exactly its number of seats
    for contest in encrypted.contests.iter() {
        let seats = e.manifest.get_contest(&contest.object_id).unwrap().number_elected;
        assert_eq!(
            contest
                .ciphertext_accumulation
                .decrypt_known_secret(e.keypair.secret_key()),
            Some(seats)
        );
        assert_eq!(contest.elgamal_accumulate(), contest.ciphertext_accumulation);
    }

    // Decrypt the real selections
    let votes: Vec<(String, Option<u64>)> = encrypted
        .contests
        .iter()
        .flat_map(|c| c.ballot_selections.iter())
        .filter(|s| !s.is_placeholder_selection)
        .map(|s| {
            (
                s.object_id.clone(),
                s.ciphertext.decrypt_known_secret(e.keypair.secret_key()),
            )
        })
        .collect();
    assert_eq!(
        votes,
        vec![
            ("mayor-alice".to_string(), Some(0)),
            ("mayor-bob".to_string(), Some(1)),
            ("council-carol".to_string(), Some(1)),
            ("council-dave".to_string(), Some(0)),
            ("council-erin".to_string(), Some(0)),
        ]
    );

    // The undervoted council seat is filled by a placeholder
    let council = &encrypted.contests[1];
    let placeholder_votes: Vec<Option<u64>> = council
        .ballot_selections
        .iter()
        .filter(|s| s.is_placeholder_selection)
        .map(|s| s.ciphertext.decrypt_known_secret(e.keypair.secret_key()))
        .collect();
    assert_eq!(placeholder_votes, vec![Some(1), Some(0)]);

    // Decrypt the write-in
    let erin = &council.ballot_selections[2];
    let write_in = erin
        .extended_data
        .as_ref()
        .unwrap()
        .decrypt(e.keypair.secret_key(), &erin.description_hash)
        .unwrap();
    assert_eq!(write_in, b"write-in: Frank".to_vec());

    // Nonces are recoverable until the ballot is submitted
    let contest_nonce = council.aggregate_nonce().unwrap();
    assert_eq!(
        council
            .ciphertext_accumulation
            .decrypt_known_nonce(pk, &contest_nonce),
        Some(2)
    );

    let submitted = encrypted.submit(BallotBoxState::Cast);
    assert!(submitted.ballot.nonce.is_none());
    assert!(submitted.ballot.contests[1].aggregate_nonce().is_none());
    assert!(submitted
        .ballot
        .is_valid_encryption(&e.manifest.manifest_hash, pk, extended_base_hash));

    // Round trip through both wire formats
    let from_json = CiphertextBallot::from_bytes(encrypted.to_json().as_bytes()).unwrap();
    assert_eq!(from_json, encrypted);
    let from_cbor = CiphertextBallot::from_bytes(&encrypted.to_bytes()).unwrap();
    assert_eq!(from_cbor, encrypted);
    let submitted_again = SubmittedBallot::from_bytes(&submitted.to_bytes()).unwrap();
    assert_eq!(submitted_again, submitted);
}

#[test]
fn validation_is_bound_to_key_and_base_hash() {
    let e = election();
    let encrypted = encrypt_ballot(
        &mayor_only("ballot-1", "mayor-alice"),
        &e.manifest,
        &e.context,
        &hash_elems!("seed"),
        None,
        1,
        None,
        true,
    )
    .unwrap();

    let manifest_hash = &e.manifest.manifest_hash;
    let pk = e.keypair.public_key();
    let extended_base_hash = &e.context.crypto_extended_base_hash;
    assert!(encrypted.is_valid_encryption(manifest_hash, pk, extended_base_hash));

    let other_key = ElGamalKeyPair::from_secret(ElementModQ::from(777)).unwrap();
    assert!(!encrypted.is_valid_encryption(manifest_hash, other_key.public_key(), extended_base_hash));
    assert!(!encrypted.is_valid_encryption(manifest_hash, pk, &hash_elems!("other base hash")));
    assert!(!encrypted.is_valid_encryption(&hash_elems!("other manifest"), pk, extended_base_hash));

    // A selection only validates against its own description hash
    let selection = &encrypted.contests[0].ballot_selections[0];
    assert!(selection.is_valid_encryption(&selection.description_hash, pk, extended_base_hash));
    assert!(!selection.is_valid_encryption(
        &encrypted.contests[0].description_hash,
        pk,
        extended_base_hash
    ));
}

#[test]
fn encrypting_a_one_with_a_given_bundle() {
    let e = election();
    let pk = e.keypair.public_key();
    let extended_base_hash = &e.context.crypto_extended_base_hash;
    let description = SelectionDescription::new("mayor-alice", "alice", 1);
    let bundle = TwoTriplesAndAQuadruple::generate(pk);

    let encrypted = encrypt_selection(
        &PlaintextBallotSelection::new("mayor-alice", 1),
        &description,
        pk,
        extended_base_hash,
        &hash_elems!("nonce seed"),
        false,
        false,
        Some(bundle.clone()),
        None,
    )
    .unwrap();

    // The bundle's first triple is the ciphertext
    assert_eq!(encrypted.nonce.as_ref(), Some(bundle.triple1().exp()));
    assert_eq!(&encrypted.ciphertext.pad, bundle.triple1().g_to_exp());
    assert_eq!(
        encrypted.ciphertext.decrypt_known_secret(e.keypair.secret_key()),
        Some(1)
    );

    assert!(encrypted.is_valid_encryption(&description.crypto_hash, pk, extended_base_hash));

    let other_key = ElGamalKeyPair::from_secret(ElementModQ::from(31337)).unwrap();
    assert!(!encrypted.is_valid_encryption(
        &description.crypto_hash,
        other_key.public_key(),
        extended_base_hash
    ));
    assert!(!encrypted.is_valid_encryption(
        &description.crypto_hash,
        pk,
        &hash_elems!("other base hash")
    ));
}

#[test]
fn selection_at_the_last_sequence_order_encrypts() {
    let e = election();
    let pk = e.keypair.public_key();
    let extended_base_hash = &e.context.crypto_extended_base_hash;
    let description = SelectionDescription::new("edge-max", "max", u64::MAX);

    let encrypted = encrypt_selection(
        &PlaintextBallotSelection::new("edge-max", 1).with_extended_data("write-in: Max"),
        &description,
        pk,
        extended_base_hash,
        &hash_elems!("nonce seed"),
        false,
        true,
        None,
        None,
    )
    .unwrap();

    assert_eq!(encrypted.sequence_order, u64::MAX);
    assert!(encrypted.extended_data.is_some());
    assert!(encrypted.is_valid_encryption(&description.crypto_hash, pk, extended_base_hash));
}

#[test]
fn encryption_replays_from_the_master_nonce() {
    let e = election();
    let seed = hash_elems!("seed");
    let encrypt = || {
        encrypt_ballot(
            &ballot("ballot-1"),
            &e.manifest,
            &e.context,
            &seed,
            Some(ElementModQ::from(1234)),
            99,
            None,
            false,
        )
        .unwrap()
    };

    assert_eq!(encrypt(), encrypt());
}

#[test]
fn invalid_ballots_are_rejected() {
    let e = election();
    let seed = hash_elems!("seed");
    let encrypt = |ballot: PlaintextBallot| {
        encrypt_ballot(&ballot, &e.manifest, &e.context, &seed, None, 0, None, false)
    };

    // Overvote
    let mut overvote = ballot("overvote");
    overvote.contests[0]
        .ballot_selections
        .push(PlaintextBallotSelection::new("mayor-alice", 1));
    assert!(matches!(encrypt(overvote), Err(Error::Overvote(_, 2, 1))));

    // Vote that isn't a bit
    let mut not_a_bit = ballot("not-a-bit");
    not_a_bit.contests[0].ballot_selections[0].vote = 2;
    assert!(matches!(encrypt(not_a_bit), Err(Error::InvalidVote(_, 2))));

    // Selection the contest doesn't have
    let unknown_selection = mayor_only("unknown-selection", "mayor-zed");
    assert!(matches!(
        encrypt(unknown_selection),
        Err(Error::UnknownSelection(_, _))
    ));

    // Same selection listed twice, which would otherwise suppress a placeholder vote
    let mut duplicate = ballot("duplicate");
    duplicate.contests[1]
        .ballot_selections
        .push(PlaintextBallotSelection::new("council-carol", 1));
    assert!(matches!(
        encrypt(duplicate.clone()),
        Err(Error::DuplicateSelection(ref contest, ref selection))
            if contest == "council" && selection == "council-carol"
    ));
    assert!(matches!(
        encrypt_ballot(&duplicate, &e.manifest, &e.context, &seed, None, 0, None, true),
        Err(Error::DuplicateSelection(_, _))
    ));

    // Contest the manifest doesn't have
    let mut unknown_contest = ballot("unknown-contest");
    unknown_contest.contests[0].object_id = "governor".to_string();
    assert!(matches!(
        encrypt(unknown_contest),
        Err(Error::UnknownContest(_))
    ));
}

#[test]
fn ballot_codes_form_a_chain() {
    let e = election();
    let device = EncryptionDevice::new(10, 20, 30, "precinct-9");
    let mut mediator =
        EncryptionMediator::new(e.manifest.clone(), e.context.clone(), device.clone())
            .verify_proofs(false);
    assert_eq!(mediator.code_seed(), &device.device_hash());

    let ballots: Vec<CiphertextBallot> = ["alice", "bob", "alice"]
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let plaintext = mayor_only(&format!("ballot-{}", i), &format!("mayor-{}", candidate));
            mediator.encrypt(&plaintext).unwrap()
        })
        .collect();

    assert_eq!(ballots[1].code_seed, ballots[0].code);
    assert_eq!(ballots[2].code_seed, ballots[1].code);
    assert_eq!(mediator.code_seed(), &ballots[2].code);

    let initial_seed = device.device_hash();
    let manifest_hash = &e.manifest.manifest_hash;
    assert!(verify_ballot_chain(&initial_seed, manifest_hash, &ballots));

    // Reordering, truncating or starting from the wrong seed breaks the chain
    let reordered = vec![ballots[1].clone(), ballots[0].clone(), ballots[2].clone()];
    assert!(!verify_ballot_chain(&initial_seed, manifest_hash, &reordered));
    assert!(!verify_ballot_chain(&initial_seed, manifest_hash, &ballots[1..]));
    assert!(verify_ballot_chain(&ballots[0].code, manifest_hash, &ballots[1..]));
    assert!(!verify_ballot_chain(&hash_elems!("other device"), manifest_hash, &ballots));

    // Swapping in another valid ciphertext is detected even with its stored hashes
    let mut tampered = ballots.clone();
    let swapped = ballots[0].contests[0].ballot_selections[1].ciphertext.clone();
    tampered[1].contests[0].ballot_selections[1].ciphertext = swapped;
    assert!(!verify_ballot_chain(&initial_seed, manifest_hash, &tampered));
}

#[test]
fn changing_a_selection_changes_every_enclosing_hash() {
    let e = election();
    let encrypted = encrypt_ballot(
        &mayor_only("ballot-1", "mayor-alice"),
        &e.manifest,
        &e.context,
        &hash_elems!("seed"),
        None,
        5,
        None,
        false,
    )
    .unwrap();

    let contest = &encrypted.contests[0];
    let selection = &contest.ballot_selections[0];

    let mut other_ciphertext = selection.ciphertext.clone();
    other_ciphertext.pad = mult_mod_p(&other_ciphertext.pad, g());

    let new_selection_hash = selection_hash(&selection.description_hash, &other_ciphertext);
    assert_ne!(new_selection_hash, selection.crypto_hash);

    let mut selection_hashes: Vec<ElementModQ> = contest
        .ballot_selections
        .iter()
        .map(|s| s.crypto_hash.clone())
        .collect();
    selection_hashes[0] = new_selection_hash;
    let new_contest_hash = contest_hash(
        &contest.description_hash,
        &selection_hashes,
        &contest.ciphertext_accumulation,
    );
    assert_ne!(new_contest_hash, contest.crypto_hash);

    let new_code = ballot_code(
        &encrypted.manifest_hash,
        &encrypted.code_seed,
        encrypted.timestamp,
        &[new_contest_hash],
    );
    assert_ne!(new_code, encrypted.code);

    // A different code seed changes only the code
    let reseeded_code = ballot_code(
        &encrypted.manifest_hash,
        &hash_elems!("another seed"),
        encrypted.timestamp,
        &encrypted.contest_hashes(),
    );
    assert_ne!(reseeded_code, encrypted.code);
    assert_eq!(
        contest.crypto_hash_with(&contest.description_hash),
        contest.crypto_hash
    );
    assert_eq!(
        selection.crypto_hash_with(&selection.description_hash),
        selection.crypto_hash
    );
}

#[test]
fn encrypting_from_a_precompute_buffer() {
    let e = election();
    let buffer = PrecomputeBuffer::with_max_queue_size(4);
    buffer.populate(e.keypair.public_key()).unwrap();

    let device = EncryptionDevice::new(1, 1, 1, "early-voting");
    let mut mediator = EncryptionMediator::new(e.manifest.clone(), e.context.clone(), device)
        .with_precompute(&buffer);

    let encrypted = mediator.encrypt(&ballot("ballot-1")).unwrap();
    assert!(encrypted.is_valid_encryption(
        &e.manifest.manifest_hash,
        e.keypair.public_key(),
        &e.context.crypto_extended_base_hash
    ));

    let council = &encrypted.contests[1];
    assert_eq!(
        council
            .ciphertext_accumulation
            .decrypt_known_secret(e.keypair.secret_key()),
        Some(2)
    );
    buffer.stop_populate();

    // A buffer filled for another key is refused
    let other = ElGamalKeyPair::from_secret(ElementModQ::from(4242)).unwrap();
    let foreign = PrecomputeBuffer::with_max_queue_size(1);
    foreign.populate(other.public_key()).unwrap();
    foreign.stop_populate();
    assert!(matches!(
        encrypt_ballot(
            &ballot("ballot-2"),
            &e.manifest,
            &e.context,
            &hash_elems!("seed"),
            None,
            0,
            Some(&foreign),
            false,
        ),
        Err(Error::PrecomputeKeyMismatch)
    ));

    let unpopulated = PrecomputeBuffer::with_max_queue_size(1);
    assert!(matches!(
        encrypt_ballot(
            &ballot("ballot-3"),
            &e.manifest,
            &e.context,
            &hash_elems!("seed"),
            None,
            0,
            Some(&unpopulated),
            false,
        ),
        Err(Error::PrecomputeNotPopulated)
    ));
}
