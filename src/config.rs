use crate::errors::{MinerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mining and prediction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Minimum support threshold (0.0 - 1.0]
    /// Example: 0.1 = rule must occur in at least 10% of sequences
    pub min_support: f64,

    /// Minimum confidence threshold (0.0 - 1.0]
    /// Example: 0.5 = consequent must follow the antecedent at least half the time
    pub min_confidence: f64,

    /// When true, only rules with a single consequent item are mined
    pub single_consequent: bool,

    /// Percentile (0-100) used to estimate a rule's deltaT from its
    /// elapsed-time samples
    pub quantile: u8,

    /// Weights of the prediction score terms
    pub weights: ScoreWeights,
}

/// Weights of the linear prediction score:
/// `(confidence·w1 + support·w2 + P(day)·w3 + P(hour)·w4) · (|A|+|C|)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub confidence: f64,
    pub support: f64,
    pub day: f64,
    pub hour: f64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            min_support: 0.1,     // 10%
            min_confidence: 0.5,  // 50%
            single_consequent: false,
            quantile: 25,
            weights: ScoreWeights::default(),
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            confidence: 0.6,
            support: 0.2,
            day: 0.1,
            hour: 0.1,
        }
    }
}

impl MinerConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check all tunables are in range
    pub fn validate(&self) -> Result<()> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(MinerError::InvalidInput(format!(
                "min_support must be in (0, 1], got {}",
                self.min_support
            )));
        }
        if !(self.min_confidence > 0.0 && self.min_confidence <= 1.0) {
            return Err(MinerError::InvalidInput(format!(
                "min_confidence must be in (0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.quantile > 100 {
            return Err(MinerError::InvalidInput(format!(
                "quantile must be in [0, 100], got {}",
                self.quantile
            )));
        }
        let w = &self.weights;
        if w.confidence < 0.0 || w.support < 0.0 || w.day < 0.0 || w.hour < 0.0 {
            return Err(MinerError::InvalidInput(
                "score weights must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MinerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let mut config = MinerConfig::default();
        config.min_support = 0.0;
        assert!(config.validate().is_err());

        config.min_support = 1.5;
        assert!(config.validate().is_err());

        config.min_support = 0.5;
        config.min_confidence = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_weights() {
        let mut config = MinerConfig::default();
        config.weights.day = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_quantile_above_100() {
        let mut config = MinerConfig::default();
        config.quantile = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_json() {
        let json = serde_json::json!({
            "min_support": 0.2,
            "min_confidence": 0.7,
            "single_consequent": true,
            "quantile": 50,
            "weights": { "confidence": 0.5, "support": 0.3, "day": 0.1, "hour": 0.1 }
        });
        let path = std::env::temp_dir().join("miner_config_test.json");
        std::fs::write(&path, json.to_string()).unwrap();

        let config = MinerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.min_support, 0.2);
        assert!(config.single_consequent);
        assert_eq!(config.quantile, 50);

        std::fs::remove_file(&path).ok();
    }
}
