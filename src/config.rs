use crate::model::MlpClassifierConfig;
use burn::{optim::AdamConfig, prelude::*};

/// Everything a run needs besides the data location.
///
/// Saved next to the model as `training_config.json` so that evaluation
/// rebuilds the exact same architecture before loading the weights.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub model: MlpClassifierConfig,
    pub optimizer: AdamConfig,
    #[config(default = 5)]
    pub num_epochs: usize,
    #[config(default = 128)]
    pub batch_size: usize,
    #[config(default = 2)]
    pub num_workers: usize,
    #[config(default = 1e-3)]
    pub learning_rate: f64,
    #[config(default = 42)]
    pub seed: u64,
    /// Images held out of the 60,000 training set for validation.
    #[config(default = 5000)]
    pub valid_size: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig::new(MlpClassifierConfig::new(), AdamConfig::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.num_epochs, 5);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.valid_size, 5000);
        assert_eq!(config.model.hidden_size, 128);
        assert_eq!(config.model.num_classes, 10);
    }

    #[test]
    fn json_keeps_overrides() {
        let config = TrainingConfig::default()
            .with_num_epochs(1)
            .with_model(MlpClassifierConfig::new().with_dropout(0.5));

        let json = serde_json::to_string(&config).unwrap();
        let loaded: TrainingConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.num_epochs, 1);
        assert_eq!(loaded.model.dropout, 0.5);
        assert_eq!(loaded.learning_rate, 1e-3);
    }
}
