//! Validated generation options
//!
//! The serving API accepts an open-ended option map; the harness only ever
//! sends a fixed, recognized set. Constructing a [`GenerateOptions`] validates
//! every field up front so a bad value fails at declaration time, not inside a
//! remote call.

use serde::Serialize;

use crate::error::{ApiError, Result};

/// Recognized generation options with explicit defaults
///
/// Serializes to the service's `options` object. Fields the harness does not
/// set are omitted from the wire payload entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateOptions {
    /// Sampling temperature; 0 means greedy decoding
    pub temperature: f32,
    /// Deterministic sampling seed
    pub seed: u32,
    /// Cap on generated tokens, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            seed: 0,
            num_predict: None,
        }
    }
}

impl GenerateOptions {
    /// Maximum accepted temperature
    pub const MAX_TEMPERATURE: f32 = 2.0;

    /// Create options, validating every field
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidOption`] if `temperature` is negative,
    /// non-finite, or above [`Self::MAX_TEMPERATURE`].
    pub fn new(temperature: f32, seed: u32) -> Result<Self> {
        if !temperature.is_finite() {
            return Err(ApiError::InvalidOption(format!(
                "temperature {temperature} is not finite"
            )));
        }
        if !(0.0..=Self::MAX_TEMPERATURE).contains(&temperature) {
            return Err(ApiError::InvalidOption(format!(
                "temperature {temperature} outside 0..={}",
                Self::MAX_TEMPERATURE
            )));
        }
        Ok(Self {
            temperature,
            seed,
            num_predict: None,
        })
    }

    /// Set a token cap
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidOption`] if `num_predict` is zero.
    pub fn with_num_predict(mut self, num_predict: u32) -> Result<Self> {
        if num_predict == 0 {
            return Err(ApiError::InvalidOption(
                "num_predict must be at least 1".to_string(),
            ));
        }
        self.num_predict = Some(num_predict);
        Ok(self)
    }

    /// The deterministic options used by the validation probes
    #[must_use]
    pub fn deterministic(seed: u32) -> Self {
        Self {
            temperature: 0.0,
            seed,
            num_predict: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = GenerateOptions::default();
        assert!((opts.temperature - 0.0).abs() < f32::EPSILON);
        assert_eq!(opts.seed, 0);
        assert!(opts.num_predict.is_none());
    }

    #[test]
    fn test_new_valid() {
        let opts = GenerateOptions::new(0.7, 123).expect("valid options");
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.seed, 123);
    }

    #[test]
    fn test_new_rejects_negative_temperature() {
        assert!(GenerateOptions::new(-0.1, 0).is_err());
    }

    #[test]
    fn test_new_rejects_excessive_temperature() {
        assert!(GenerateOptions::new(2.5, 0).is_err());
    }

    #[test]
    fn test_new_rejects_nan_temperature() {
        assert!(GenerateOptions::new(f32::NAN, 0).is_err());
    }

    #[test]
    fn test_with_num_predict() {
        let opts = GenerateOptions::deterministic(123)
            .with_num_predict(32)
            .expect("valid cap");
        assert_eq!(opts.num_predict, Some(32));
    }

    #[test]
    fn test_with_num_predict_rejects_zero() {
        assert!(GenerateOptions::deterministic(0).with_num_predict(0).is_err());
    }

    #[test]
    fn test_serialize_omits_unset_cap() {
        let opts = GenerateOptions::deterministic(123);
        let json = serde_json::to_string(&opts).expect("serialize");
        assert!(json.contains("\"seed\":123"));
        assert!(!json.contains("num_predict"));
    }

    #[test]
    fn test_serialize_includes_cap_when_set() {
        let opts = GenerateOptions::deterministic(1)
            .with_num_predict(8)
            .expect("valid cap");
        let json = serde_json::to_string(&opts).expect("serialize");
        assert!(json.contains("\"num_predict\":8"));
    }
}
