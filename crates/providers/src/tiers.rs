//! Tier → model name mapping.

use clawloop_config::TierConfig;
use clawloop_core::model::ModelTier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierModels {
    pub low: String,
    pub mid: String,
    pub high: String,
}

impl TierModels {
    pub fn new(low: impl Into<String>, mid: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            low: low.into(),
            mid: mid.into(),
            high: high.into(),
        }
    }

    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Low => &self.low,
            ModelTier::Mid => &self.mid,
            ModelTier::High => &self.high,
        }
    }
}

impl From<&TierConfig> for TierModels {
    fn from(config: &TierConfig) -> Self {
        Self::new(&config.low, &config.mid, &config.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_tier() {
        let models = TierModels::new("small", "medium", "large");
        assert_eq!(models.model_for(ModelTier::Low), "small");
        assert_eq!(models.model_for(ModelTier::Mid), "medium");
        assert_eq!(models.model_for(ModelTier::High), "large");
    }

    #[test]
    fn from_default_config() {
        let models = TierModels::from(&TierConfig::default());
        assert_eq!(models.low, TierConfig::default().low);
        assert_eq!(models.high, TierConfig::default().high);
    }
}
