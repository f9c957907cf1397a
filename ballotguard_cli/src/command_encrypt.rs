use crate::config::Config;
use crate::read_file;
use ballotguard::{
    CiphertextBallot, CiphertextElectionContext, EncryptionMediator, InternalManifest,
    PlaintextBallot, PrecomputeBuffer,
};
use log::info;

pub fn command_encrypt(matches: &clap::ArgMatches, config: &Config) {
    let context: CiphertextElectionContext =
        read_file("encrypt", matches.value_of("CONTEXT").unwrap_or_default());
    let manifest: InternalManifest =
        read_file("encrypt", matches.value_of("MANIFEST").unwrap_or_default());

    if manifest.manifest_hash != context.manifest_hash {
        eprintln!("ballotguard encrypt: manifest does not belong to this election context");
        std::process::exit(1);
    }

    let ballots: Vec<PlaintextBallot> = matches
        .values_of("BALLOT")
        .map(|values| values.map(|filename| read_ballot(filename)).collect())
        .unwrap_or_default();

    let buffer = if config.precompute_size > 0 {
        let buffer = PrecomputeBuffer::with_max_queue_size(config.precompute_size);
        if let Err(e) = buffer.populate(&context.elgamal_public_key) {
            eprintln!("ballotguard encrypt: unable to start precompute: {}", e);
            std::process::exit(1);
        }
        info!("precomputing up to {} entries", config.precompute_size);
        Some(buffer)
    } else {
        None
    };

    let mut mediator = EncryptionMediator::new(manifest, context, config.device())
        .verify_proofs(!matches.is_present("skip-proof-check"));
    if let Some(buffer) = buffer.as_ref() {
        mediator = mediator.with_precompute(buffer);
    }

    let mut encrypted: Vec<CiphertextBallot> = Vec::with_capacity(ballots.len());
    for ballot in ballots.iter() {
        match mediator.encrypt(ballot) {
            Ok(ciphertext) => encrypted.push(ciphertext),
            Err(e) => {
                eprintln!("ballotguard encrypt: unable to encrypt {}: {}", ballot.object_id, e);
                std::process::exit(1);
            }
        }
    }

    if let Some(buffer) = buffer.as_ref() {
        buffer.stop_populate();
    }

    let json = serde_json::to_string_pretty(&encrypted).unwrap_or_else(|e| {
        eprintln!("ballotguard encrypt: unable to serialize ballots: {}", e);
        std::process::exit(1);
    });
    println!("{}", json);
}

fn read_ballot(filename: &str) -> PlaintextBallot {
    let mut ballot: PlaintextBallot = read_file("encrypt", filename);
    if ballot.object_id.is_empty() {
        ballot.object_id = uuid::Uuid::new_v4().to_string();
    }
    ballot
}
