//! Shared test helpers for configuration tests.

use ortho_config::MergeComposer;
use serde_json::Value;

use crate::MergelensConfig;

/// One configuration source, listed from lowest to highest precedence.
#[derive(Debug, Clone)]
pub enum Layer {
    Defaults(Value),
    File(Value),
    Environment(Value),
    Cli(Value),
}

impl Layer {
    fn push_onto(self, composer: &mut MergeComposer) {
        match self {
            Self::Defaults(value) => composer.push_defaults(value),
            Self::File(value) => composer.push_file(value, None),
            Self::Environment(value) => composer.push_environment(value),
            Self::Cli(value) => composer.push_cli(value),
        }
    }
}

/// Merges `layers` in order into a [`MergelensConfig`].
pub fn compose(layers: impl IntoIterator<Item = Layer>) -> MergelensConfig {
    let mut composer = MergeComposer::new();
    for layer in layers {
        layer.push_onto(&mut composer);
    }
    MergelensConfig::merge_from_layers(composer.layers()).expect("layers should merge")
}
