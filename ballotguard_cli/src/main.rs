use clap::{App, AppSettings, Arg, SubCommand};
use num_enum::TryFromPrimitive;
use std::convert::TryFrom;

mod command_encrypt;
mod command_precompute;
mod command_verify;
mod config;

use command_encrypt::command_encrypt;
use command_precompute::command_precompute;
use command_verify::command_verify;
use config::Config;

#[derive(TryFromPrimitive, PartialEq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Verbosity {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl Verbosity {
    fn level_filter(self) -> log::LevelFilter {
        match self {
            Verbosity::Silent => log::LevelFilter::Off,
            Verbosity::Error => log::LevelFilter::Error,
            Verbosity::Warn => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
        }
    }
}

fn main() {
    let matches = App::new("BallotGuard CLI")
        .version("1.0")
        .about("Encrypts and verifies ballots for an ElGamal election")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity, repeat for more"),
        )
        .subcommand(
            SubCommand::with_name("encrypt")
                .about("Encrypt plaintext ballots as a single device session, chaining their codes")
                .arg(
                    Arg::with_name("CONTEXT")
                        .index(1)
                        .required(true)
                        .help("Election context file in JSON or CBOR format"),
                )
                .arg(
                    Arg::with_name("MANIFEST")
                        .index(2)
                        .required(true)
                        .help("Internal manifest file in JSON or CBOR format"),
                )
                .arg(
                    Arg::with_name("BALLOT")
                        .index(3)
                        .required(true)
                        .multiple(true)
                        .help("Plaintext ballot files, encrypted in the order given"),
                )
                .arg(
                    Arg::with_name("skip-proof-check")
                        .long("skip-proof-check")
                        .help("Do not verify proofs right after generating them"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Verify the proofs, hashes and code chain of encrypted ballots")
                .arg(
                    Arg::with_name("CONTEXT")
                        .index(1)
                        .required(true)
                        .help("Election context file in JSON or CBOR format"),
                )
                .arg(
                    Arg::with_name("CIPHERTEXT")
                        .index(2)
                        .required(true)
                        .multiple(true)
                        .help("Encrypted ballot files, in chain order"),
                ),
        )
        .subcommand(
            SubCommand::with_name("precompute")
                .about("Fill a precompute buffer for a public key and report its occupancy")
                .arg(
                    Arg::with_name("CONTEXT")
                        .index(1)
                        .required(true)
                        .help("Election context file in JSON or CBOR format"),
                )
                .arg(
                    Arg::with_name("seconds")
                        .long("seconds")
                        .takes_value(true)
                        .default_value("5")
                        .help("How long to let the buffer fill"),
                ),
        )
        .get_matches();

    let verbosity = u8::try_from(matches.occurrences_of("v") + 2)
        .ok()
        .and_then(|v| Verbosity::try_from(v).ok())
        .unwrap_or(Verbosity::Debug);

    env_logger::Builder::new()
        .filter_level(verbosity.level_filter())
        .parse_env("RUST_LOG")
        .init();

    let config = Config::from_env();

    match matches.subcommand() {
        ("encrypt", Some(matches)) => command_encrypt(matches, &config),
        ("verify", Some(matches)) => command_verify(matches, &config),
        ("precompute", Some(matches)) => command_precompute(matches, &config),
        _ => {}
    }
}

pub fn expand(input: &str) -> String {
    shellexpand::full(input)
        .map(|expanded| expanded.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

pub fn read_bytes(command: &str, filename: &str) -> Vec<u8> {
    let filename = expand(filename);
    std::fs::read(&filename).unwrap_or_else(|e| {
        eprintln!("ballotguard {}: unable to read {}: {}", command, filename, e);
        std::process::exit(1);
    })
}

/// Read and decode a JSON or CBOR file, exiting on failure
pub fn read_file<T: serde::de::DeserializeOwned>(command: &str, filename: &str) -> T {
    let file_bytes = read_bytes(command, filename);
    ballotguard::from_bytes(&file_bytes).unwrap_or_else(|e| {
        eprintln!("ballotguard {}: unable to read {}: {}", command, filename, e);
        std::process::exit(1);
    })
}
