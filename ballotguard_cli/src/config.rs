use std::env::var;

/// Device and precompute settings, read from `BALLOTGUARD_*` environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub precompute_size: usize,
    pub device_id: u64,
    pub session_id: u64,
    pub launch_code: u64,
    pub location: String,
}

impl Config {
    pub fn from_env() -> Self {
        let precompute_size = match var("BALLOTGUARD_PRECOMPUTE_SIZE") {
            Ok(val) => parse_or_exit("BALLOTGUARD_PRECOMPUTE_SIZE", &val),
            Err(_e) => 0,
        };

        let device_id = match var("BALLOTGUARD_DEVICE_ID") {
            Ok(val) => parse_or_exit("BALLOTGUARD_DEVICE_ID", &val),
            Err(_e) => 1,
        };

        let session_id = match var("BALLOTGUARD_SESSION_ID") {
            Ok(val) => parse_or_exit("BALLOTGUARD_SESSION_ID", &val),
            Err(_e) => 1,
        };

        let launch_code = match var("BALLOTGUARD_LAUNCH_CODE") {
            Ok(val) => parse_or_exit("BALLOTGUARD_LAUNCH_CODE", &val),
            Err(_e) => 1,
        };

        let location = match var("BALLOTGUARD_LOCATION") {
            Ok(val) => val,
            Err(_e) => "default-location".to_string(),
        };

        Config {
            precompute_size,
            device_id,
            session_id,
            launch_code,
            location,
        }
    }

    pub fn device(&self) -> ballotguard::EncryptionDevice {
        ballotguard::EncryptionDevice::new(
            self.device_id,
            self.session_id,
            self.launch_code,
            &self.location,
        )
    }
}

fn parse_or_exit<T: std::str::FromStr>(name: &str, val: &str) -> T {
    val.parse().unwrap_or_else(|_| {
        eprintln!("ballotguard: invalid value for {}: {}", name, val);
        std::process::exit(1);
    })
}
