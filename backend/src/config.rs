//! Start-up configuration, read from the environment.

use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    /// `BACKEND_ADDR`
    pub addr: String,
    /// `API_KEY`; required in `X-API-KEY` on mutating routes.
    pub api_key: String,
    /// `DATA_DIR`; holds the SQLite journal and Groth16 keys.
    pub data_dir: PathBuf,
    /// `CRED_DEPTHS`; tree depths that get a verifier bound at start-up.
    pub depths: Vec<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let depths = match std::env::var("CRED_DEPTHS") {
            Ok(s) => parse_depths(&s)?,
            Err(_) => vec![20],
        };

        Ok(Self {
            addr: std::env::var("BACKEND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            // In production, this should be a strong secret from environment.
            api_key: std::env::var("API_KEY").unwrap_or_else(|_| "dev-secret-key".to_string()),
            data_dir: PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
            depths,
        })
    }
}

/// Parse a comma-separated depth list such as `"16, 20"`.
pub fn parse_depths(s: &str) -> Result<Vec<usize>, String> {
    let mut depths = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let depth = part
            .parse::<usize>()
            .map_err(|e| format!("invalid depth {part:?} in CRED_DEPTHS: {e}"))?;
        if !depths.contains(&depth) {
            depths.push(depth);
        }
    }
    if depths.is_empty() {
        return Err("CRED_DEPTHS must list at least one depth".to_string());
    }
    Ok(depths)
}
