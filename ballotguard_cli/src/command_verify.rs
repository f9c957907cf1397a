use crate::config::Config;
use crate::{read_bytes, read_file};
use ballotguard::{verify_ballot_chain, CiphertextBallot, CiphertextElectionContext};

pub fn command_verify(matches: &clap::ArgMatches, config: &Config) {
    let context: CiphertextElectionContext =
        read_file("verify", matches.value_of("CONTEXT").unwrap_or_default());

    let ballots: Vec<CiphertextBallot> = matches
        .values_of("CIPHERTEXT")
        .map(|values| values.flat_map(|filename| read_ciphertexts(filename)).collect())
        .unwrap_or_default();

    let mut all_valid = true;
    for ballot in ballots.iter() {
        let valid = ballot.is_valid_encryption(
            &context.manifest_hash,
            &context.elgamal_public_key,
            &context.crypto_extended_base_hash,
        );
        println!("{}: {}", ballot.object_id, if valid { "OK" } else { "FAILED" });
        all_valid &= valid;
    }

    let device_hash = config.device().device_hash();
    let chain_valid = verify_ballot_chain(&device_hash, &context.manifest_hash, &ballots);
    println!("chain: {}", if chain_valid { "OK" } else { "FAILED" });

    if !(all_valid && chain_valid) {
        std::process::exit(1);
    }
}

// A file holds either one ballot or the array `encrypt` prints
fn read_ciphertexts(filename: &str) -> Vec<CiphertextBallot> {
    let bytes = read_bytes("verify", filename);
    if let Ok(ballots) = ballotguard::from_bytes::<Vec<CiphertextBallot>>(&bytes) {
        return ballots;
    }

    match CiphertextBallot::from_bytes(&bytes) {
        Ok(ballot) => vec![ballot],
        Err(e) => {
            eprintln!("ballotguard verify: unable to read {}: {}", filename, e);
            std::process::exit(1);
        }
    }
}
