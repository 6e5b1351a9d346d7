/**
 * Matching configuration
 * Thresholds for enrollment and verification, overridable from the environment
 */

use std::str::FromStr;

use tracing::warn;

use crate::error::{FaceKeyError, Result};

pub const DEFAULT_MIN_ENROLLMENT_FRAMES: usize = 60;
pub const DEFAULT_IOD_EPSILON: f64 = 0.3;
pub const DEFAULT_REQUIRED_RECORD_MATCHES: usize = 1;
pub const DEFAULT_MAX_VERIFICATION_FRAMES: usize = 10;
pub const DEFAULT_MIN_VERIFICATION_FRAMES: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct FaceKeyConfig {
    /// Successful registrations needed before an enrollment is uploaded.
    pub min_enrollment_frames: usize,
    /// Largest allowed gap between `frame.iod * 100` and a record's iod.
    pub iod_epsilon: f64,
    /// Record matches a single frame needs to pass verification.
    pub required_record_matches: usize,
    /// Frames beyond this cap are discarded unevaluated.
    pub max_verification_frames: usize,
    pub min_verification_frames: usize,
}

impl Default for FaceKeyConfig {
    fn default() -> Self {
        Self {
            min_enrollment_frames: DEFAULT_MIN_ENROLLMENT_FRAMES,
            iod_epsilon: DEFAULT_IOD_EPSILON,
            required_record_matches: DEFAULT_REQUIRED_RECORD_MATCHES,
            max_verification_frames: DEFAULT_MAX_VERIFICATION_FRAMES,
            min_verification_frames: DEFAULT_MIN_VERIFICATION_FRAMES,
        }
    }
}

impl FaceKeyConfig {
    /// Reads every threshold from `FACEKEY_*` variables, keeping the
    /// default for anything unset or unparsable.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            min_enrollment_frames: env_or(
                "FACEKEY_MIN_ENROLLMENT_FRAMES",
                DEFAULT_MIN_ENROLLMENT_FRAMES,
            ),
            iod_epsilon: env_or("FACEKEY_IOD_EPSILON", DEFAULT_IOD_EPSILON),
            required_record_matches: env_or(
                "FACEKEY_REQUIRED_RECORD_MATCHES",
                DEFAULT_REQUIRED_RECORD_MATCHES,
            ),
            max_verification_frames: env_or(
                "FACEKEY_MAX_VERIFICATION_FRAMES",
                DEFAULT_MAX_VERIFICATION_FRAMES,
            ),
            min_verification_frames: env_or(
                "FACEKEY_MIN_VERIFICATION_FRAMES",
                DEFAULT_MIN_VERIFICATION_FRAMES,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_enrollment_frames == 0 {
            return Err(FaceKeyError::InvalidConfig(
                "min_enrollment_frames must be at least 1".to_string(),
            ));
        }
        if !self.iod_epsilon.is_finite() || self.iod_epsilon < 0.0 {
            return Err(FaceKeyError::InvalidConfig(format!(
                "iod_epsilon must be a non-negative number, got {}",
                self.iod_epsilon
            )));
        }
        if self.required_record_matches == 0 {
            return Err(FaceKeyError::InvalidConfig(
                "required_record_matches must be at least 1".to_string(),
            ));
        }
        if self.min_verification_frames == 0
            || self.max_verification_frames < self.min_verification_frames
        {
            return Err(FaceKeyError::InvalidConfig(format!(
                "verification frame bounds {}..={} are empty",
                self.min_verification_frames, self.max_verification_frames
            )));
        }
        Ok(())
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = FaceKeyConfig::default();
        assert_eq!(config.min_enrollment_frames, 60);
        assert_eq!(config.iod_epsilon, 0.3);
        assert_eq!(config.required_record_matches, 1);
        assert_eq!(config.max_verification_frames, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_required_matches() {
        let config = FaceKeyConfig {
            required_record_matches: 0,
            ..FaceKeyConfig::default()
        };
        assert!(matches!(config.validate(), Err(FaceKeyError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_negative_epsilon() {
        let config = FaceKeyConfig {
            iod_epsilon: -0.1,
            ..FaceKeyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_falls_back_on_garbage() {
        std::env::set_var("FACEKEY_TEST_ONLY_EPSILON", "not-a-number");
        assert_eq!(env_or("FACEKEY_TEST_ONLY_EPSILON", 0.3), 0.3);
        std::env::set_var("FACEKEY_TEST_ONLY_EPSILON", " 0.5 ");
        assert_eq!(env_or("FACEKEY_TEST_ONLY_EPSILON", 0.3), 0.5);
        std::env::remove_var("FACEKEY_TEST_ONLY_EPSILON");
    }
}
