//! Obfs4-style keystream transform
//!
//! XORs every chunk with the SHA-256 of the password, cycling the 32-byte
//! key from the start of each chunk, and optionally paces chunks with a
//! sampled inter-arrival time.

use super::timing::{IatDistribution, IatSchedule};
use super::Transform;
use crate::config::BypassConfig;
use crate::crypto::{derive_key, KEY_LEN};
use crate::error::{Error, Result};
use std::time::Duration;
use tracing::instrument;

/// XOR `data` with `key`, cycling the key
///
/// Applying it twice with the same key returns the input.
pub fn xor_keystream(data: &[u8], key: &[u8; KEY_LEN]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

/// Keystream transform with optional IAT pacing
pub struct Obfs4Transform {
    key: [u8; KEY_LEN],
    iat: Option<IatSchedule>,
}

impl Obfs4Transform {
    /// Create a transform keyed by `password`
    pub fn new(password: &str, iat: Option<IatSchedule>) -> Self {
        Self {
            key: derive_key(password),
            iat,
        }
    }

    /// Create from a bypass config
    ///
    /// Reads `iat_mode` (default `true`), `iat_dist` (default `pareto`),
    /// `iat_dist_min` (default 10) and `iat_dist_max` (default 100).
    pub fn from_config(config: &BypassConfig) -> Result<Self> {
        let iat_mode: bool = config.param("iat_mode", true)?;
        let dist: String = config.param("iat_dist", "pareto".to_string())?;
        let min: u64 = config.param("iat_dist_min", 10)?;
        let max: u64 = config.param("iat_dist_max", 100)?;

        if min > max {
            return Err(Error::config_value(
                "iat_dist_min",
                format!("{min} is greater than iat_dist_max {max}"),
            ));
        }

        let iat = iat_mode.then(|| IatSchedule::new(IatDistribution::from_name(&dist), min, max));
        Ok(Self::new(&config.password, iat))
    }

    /// IAT schedule, if pacing is enabled
    pub fn iat(&self) -> Option<&IatSchedule> {
        self.iat.as_ref()
    }
}

impl Transform for Obfs4Transform {
    fn name(&self) -> &'static str {
        "obfs4"
    }

    #[instrument(skip_all, level = "trace", fields(len = chunk.len()))]
    fn apply(&self, chunk: &[u8]) -> Result<Vec<u8>> {
        Ok(xor_keystream(chunk, &self.key))
    }

    fn pacing(&self) -> Option<Duration> {
        self.iat.as_ref().map(IatSchedule::next_delay)
    }
}

impl std::fmt::Debug for Obfs4Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obfs4Transform")
            .field("iat", &self.iat)
            .finish_non_exhaustive()
    }
}
