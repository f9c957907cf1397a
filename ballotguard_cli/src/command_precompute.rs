use crate::config::Config;
use crate::read_file;
use ballotguard::{CiphertextElectionContext, PrecomputeBuffer, DEFAULT_PRECOMPUTE_SIZE};
use std::time::Duration;

pub fn command_precompute(matches: &clap::ArgMatches, config: &Config) {
    let context: CiphertextElectionContext =
        read_file("precompute", matches.value_of("CONTEXT").unwrap_or_default());

    let seconds: u64 = matches
        .value_of("seconds")
        .unwrap_or("5")
        .parse()
        .unwrap_or_else(|_| {
            eprintln!("ballotguard precompute: --seconds must be a whole number");
            std::process::exit(1);
        });

    let size = match config.precompute_size {
        0 => DEFAULT_PRECOMPUTE_SIZE,
        size => size,
    };

    let buffer = PrecomputeBuffer::with_max_queue_size(size);
    if let Err(e) = buffer.populate(&context.elgamal_public_key) {
        eprintln!("ballotguard precompute: unable to start: {}", e);
        std::process::exit(1);
    }

    std::thread::sleep(Duration::from_secs(seconds));
    buffer.stop_populate();

    println!("status: {:?}", buffer.status());
    println!(
        "bundles: {} / {}",
        buffer.get_current_queue_size(),
        buffer.get_max_queue_size()
    );
    println!(
        "triples: {} / {}",
        buffer.get_current_triple_queue_size(),
        buffer.get_max_triple_queue_size()
    );
}
