use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("ballotguard: invalid element - value is not in range mod {0}")]
    InvalidElement(&'static str),

    #[error("ballotguard: invalid element - invalid hexidecimal")]
    InvalidHex,

    #[error("ballotguard: invalid public key")]
    InvalidPublicKey,

    #[error("ballotguard: invalid secret key - must be at least two")]
    InvalidSecretKey,

    #[error("ballotguard: invalid vote {1} for selection {0} - must be 0 or 1")]
    InvalidVote(String, u64),

    #[error("ballotguard: overvote in contest {0} - {1} selections made, {2} allowed")]
    Overvote(String, u64, u64),

    #[error("ballotguard: selection {1} does not exist in contest {0}")]
    UnknownSelection(String, String),

    #[error("ballotguard: selection {1} appears more than once in contest {0}")]
    DuplicateSelection(String, String),

    #[error("ballotguard: sequence order overflows in contest {0}")]
    SequenceOrderOverflow(String),

    #[error("ballotguard: contest {0} does not exist in manifest")]
    UnknownContest(String),

    #[error("ballotguard: precompute worker is running - call stop_populate first")]
    PrecomputeRunning,

    #[error("ballotguard: precompute buffer has no public key - call populate first")]
    PrecomputeNotPopulated,

    #[error("ballotguard: failed to start precompute worker: {0}")]
    PrecomputeSpawn(std::io::Error),

    #[error("ballotguard: precompute buffer was populated with a different public key")]
    PrecomputeKeyMismatch,

    #[error("ballotguard: freshly generated proof failed to verify for {0}")]
    ProofVerificationFailed(String),

    #[error("ballotguard: failed to encrypt extended data")]
    ExtendedDataEncryption,

    #[error("ballotguard: failed to decrypt extended data")]
    ExtendedDataDecryption,

    #[error("ballotguard: CBOR error deserializing ballot: {0}")]
    CBORDeserialization(#[from] serde_cbor::Error),

    #[error("ballotguard: JSON error deserializing ballot: {0}")]
    JSONDeserialization(#[from] serde_json::Error),

    #[error("ballotguard: error deserializing ballot: unknown format")]
    DeserializationUnknownFormat,
}
