//! Custom AEAD obfuscator
//!
//! Encrypts each chunk with AES-256-GCM and hides it in fragment frames,
//! a chaff envelope, or both (fragment first, then chaff). Chunks are paced
//! by a sine-wave jitter.

use super::envelope::{self, ChaffEnvelope};
use super::timing::sine_jitter;
use super::Transform;
use crate::config::BypassConfig;
use crate::crypto::Sealer;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{instrument, warn};

/// Envelope layout applied by [`CustomObfuscator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObfuscationMode {
    /// Sealed payload followed by decoy bytes
    Chaff,
    /// Sealed payload split into indexed frames
    Fragment,
    /// Fragment frames wrapped in a chaff envelope
    #[default]
    Hybrid,
}

impl ObfuscationMode {
    /// Config name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chaff => "chaff",
            Self::Fragment => "fragment",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ObfuscationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObfuscationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chaff" => Ok(Self::Chaff),
            "fragment" => Ok(Self::Fragment),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(Error::config_value(
                "obfuscation_mode",
                format!("unknown mode '{other}'"),
            )),
        }
    }
}

/// AES-GCM obfuscator with chaff and fragment envelopes
pub struct CustomObfuscator {
    mode: ObfuscationMode,
    chaff_ratio: f64,
    fragment_size: usize,
    timing_jitter_ms: u64,
    sealer: Sealer,
    /// Next chaff byte value, shared by every connection of the handle
    chaff_counter: AtomicU64,
}

impl CustomObfuscator {
    /// Create an obfuscator keyed by `password`
    pub fn new(
        password: &str,
        mode: ObfuscationMode,
        chaff_ratio: f64,
        fragment_size: usize,
        timing_jitter_ms: u64,
    ) -> Result<Self> {
        if !chaff_ratio.is_finite() || chaff_ratio < 0.0 {
            return Err(Error::config_value(
                "chaff_ratio",
                format!("{chaff_ratio} is not a non-negative number"),
            ));
        }
        if fragment_size == 0 {
            return Err(Error::config_value("fragment_size", "must be greater than zero"));
        }

        Ok(Self {
            mode,
            chaff_ratio,
            fragment_size,
            timing_jitter_ms,
            sealer: Sealer::from_password(password)?,
            chaff_counter: AtomicU64::new(0),
        })
    }

    /// Create from a bypass config
    ///
    /// Reads `obfuscation_mode` (default `hybrid`, unknown names fall back
    /// to hybrid), `chaff_ratio` (0.3), `fragment_size` (1024) and
    /// `timing_jitter_ms` (50).
    pub fn from_config(config: &BypassConfig) -> Result<Self> {
        let mode = match config.parameters.get("obfuscation_mode") {
            None => ObfuscationMode::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(id = %config.id, error = %e, "Falling back to hybrid obfuscation");
                ObfuscationMode::Hybrid
            }),
        };

        Self::new(
            &config.password,
            mode,
            config.param("chaff_ratio", 0.3)?,
            config.param("fragment_size", 1024)?,
            config.param("timing_jitter_ms", 50)?,
        )
    }

    /// Active envelope layout
    pub fn mode(&self) -> ObfuscationMode {
        self.mode
    }

    /// Sealer used for the payload, so peers holding the password can open it
    pub fn sealer(&self) -> &Sealer {
        &self.sealer
    }

    /// Decoy bytes continuing the handle's cyclic counter
    fn chaff_bytes(&self, len: usize) -> Vec<u8> {
        let start = self.chaff_counter.fetch_add(len as u64, Ordering::Relaxed);
        (0..len as u64)
            .map(|i| (start.wrapping_add(i) % 256) as u8)
            .collect()
    }

    fn chaff(&self, data: &[u8]) -> Result<Vec<u8>> {
        let sealed = self.sealer.seal(data)?;
        let chaff = self.chaff_bytes(envelope::chaff_len(sealed.len(), self.chaff_ratio));
        Ok(envelope::wrap_chaff(&sealed, &chaff))
    }

    fn fragment(&self, data: &[u8]) -> Result<Vec<u8>> {
        let sealed = self.sealer.seal(data)?;
        Ok(envelope::frame_fragments(&sealed, self.fragment_size))
    }

    /// Undo one [`apply`](Transform::apply) of this obfuscator
    pub fn reveal(&self, obfuscated: &[u8]) -> Result<Vec<u8>> {
        match self.mode {
            ObfuscationMode::Chaff => self.open_chaff(obfuscated),
            ObfuscationMode::Fragment => self.sealer.open(&envelope::defragment(obfuscated)?),
            ObfuscationMode::Hybrid => {
                let framed = self.open_chaff(obfuscated)?;
                self.sealer.open(&envelope::defragment(&framed)?)
            }
        }
    }

    fn open_chaff(&self, buf: &[u8]) -> Result<Vec<u8>> {
        self.sealer.open(ChaffEnvelope::parse(buf)?.real)
    }
}

impl Transform for CustomObfuscator {
    fn name(&self) -> &'static str {
        "custom"
    }

    #[instrument(skip_all, level = "trace", fields(mode = %self.mode, len = chunk.len()))]
    fn apply(&self, chunk: &[u8]) -> Result<Vec<u8>> {
        match self.mode {
            ObfuscationMode::Chaff => self.chaff(chunk),
            ObfuscationMode::Fragment => self.fragment(chunk),
            ObfuscationMode::Hybrid => self.chaff(&self.fragment(chunk)?),
        }
    }

    fn pacing(&self) -> Option<Duration> {
        sine_jitter(self.timing_jitter_ms)
    }
}

impl fmt::Debug for CustomObfuscator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomObfuscator")
            .field("mode", &self.mode)
            .field("chaff_ratio", &self.chaff_ratio)
            .field("fragment_size", &self.fragment_size)
            .field("timing_jitter_ms", &self.timing_jitter_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Method;
    use crate::crypto::{NONCE_LEN, TAG_LEN};
    use crate::transform::envelope::{parse_fragments, HEADER_LEN, MIN_CHAFF_LEN};

    fn obfuscator(mode: ObfuscationMode) -> CustomObfuscator {
        CustomObfuscator::new("testpass", mode, 0.3, 1024, 0).unwrap()
    }

    // =========== Config Tests ===========

    #[test]
    fn test_from_config_defaults() {
        let config = BypassConfig::new("cfg-1", Method::Custom, 0, "localhost", 1).with_password("p");
        let obfs = CustomObfuscator::from_config(&config).unwrap();
        assert_eq!(obfs.mode(), ObfuscationMode::Hybrid);
        assert_eq!(obfs.fragment_size, 1024);
        assert_eq!(obfs.timing_jitter_ms, 50);
        assert!((obfs.chaff_ratio - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_config_unknown_mode_falls_back() {
        let config = BypassConfig::new("cfg-1", Method::TcpFragment, 0, "localhost", 1)
            .with_parameter("obfuscation_mode", "timing");
        let obfs = CustomObfuscator::from_config(&config).unwrap();
        assert_eq!(obfs.mode(), ObfuscationMode::Hybrid);
    }

    #[test]
    fn test_from_config_rejects_bad_values() {
        let base = BypassConfig::new("cfg-1", Method::Custom, 0, "localhost", 1);
        for (key, value) in [
            ("fragment_size", "0"),
            ("fragment_size", "big"),
            ("chaff_ratio", "-0.5"),
            ("chaff_ratio", "NaN"),
            ("timing_jitter_ms", "-3"),
        ] {
            let config = base.clone().with_parameter(key, value);
            let err = CustomObfuscator::from_config(&config).unwrap_err();
            assert!(err.is_config(), "{key}={value} gave {err}");
        }
    }

    // =========== Chaff Tests ===========

    #[test]
    fn test_chaff_counter_is_cyclic_and_persistent() {
        let obfs = obfuscator(ObfuscationMode::Chaff);
        let first = obfs.chaff_bytes(200);
        assert_eq!(first[0], 0);
        assert_eq!(first[199], 199);

        let second = obfs.chaff_bytes(100);
        assert_eq!(second[0], 200);
        assert_eq!(second[55], 255);
        assert_eq!(second[56], 0);
    }

    #[test]
    fn test_chaff_mode_layout() {
        let obfs = obfuscator(ObfuscationMode::Chaff);
        let out = obfs.apply(b"hello").unwrap();

        let envelope = ChaffEnvelope::parse(&out).unwrap();
        assert_eq!(envelope.real.len(), NONCE_LEN + 5 + TAG_LEN);
        assert_eq!(envelope.chaff.len(), MIN_CHAFF_LEN);
        assert_eq!(obfs.sealer().open(envelope.real).unwrap(), b"hello");
    }

    // =========== Fragment Tests ===========

    #[test]
    fn test_fragment_mode_layout() {
        let obfs = CustomObfuscator::new("testpass", ObfuscationMode::Fragment, 0.3, 10, 0).unwrap();
        let out = obfs.apply(b"abcdefghij").unwrap();

        let frames = parse_fragments(&out).unwrap();
        let sealed_len = Sealer::sealed_len(10);
        assert_eq!(frames.len(), sealed_len.div_ceil(10));
        assert_eq!(out.len(), sealed_len + frames.len() * HEADER_LEN);
        assert_eq!(obfs.reveal(&out).unwrap(), b"abcdefghij");
    }

    // =========== Hybrid Tests ===========

    #[test]
    fn test_hybrid_end_to_end() {
        let obfs = CustomObfuscator::new("test", ObfuscationMode::Hybrid, 0.2, 2, 0).unwrap();
        let input = b"abcdefghij";
        let out = obfs.apply(input).unwrap();
        assert!(out.len() > input.len());

        let envelope = ChaffEnvelope::parse(&out).unwrap();
        let framed = obfs.sealer().open(envelope.real).unwrap();
        let frames = parse_fragments(&framed).unwrap();

        let sealed_len = Sealer::sealed_len(input.len());
        assert_eq!(frames.len(), sealed_len / 2);
        assert!(frames.iter().all(|f| f.payload.len() == 2));
        assert_eq!(frames.iter().map(|f| f.payload.len()).sum::<usize>(), sealed_len);

        assert_eq!(obfs.reveal(&out).unwrap(), input);
    }

    #[test]
    fn test_every_mode_grows_output() {
        for mode in [ObfuscationMode::Chaff, ObfuscationMode::Fragment, ObfuscationMode::Hybrid] {
            let obfs = obfuscator(mode);
            for len in [0usize, 1, 100, 4096] {
                let data = vec![0x42u8; len];
                let out = obfs.apply(&data).unwrap();
                assert!(out.len() > len, "{mode} did not grow {len} bytes");
                assert_eq!(obfs.reveal(&out).unwrap(), data);
            }
        }
    }

    #[test]
    fn test_reveal_rejects_other_password() {
        let obfs = obfuscator(ObfuscationMode::Hybrid);
        let other = CustomObfuscator::new("other", ObfuscationMode::Hybrid, 0.3, 1024, 0).unwrap();
        let out = obfs.apply(b"payload").unwrap();
        assert!(other.reveal(&out).is_err());
    }

    #[test]
    fn test_zero_jitter_disables_pacing() {
        assert!(obfuscator(ObfuscationMode::Hybrid).pacing().is_none());
    }
}
