use foil_core::{Bounds, Preprocessing};

/// Construction settings for an [`Adapter`](super::Adapter).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Config {
    bounds: Bounds,

    #[cfg_attr(feature = "serde-derive", serde(default))]
    preprocessing: Preprocessing,

    #[cfg_attr(feature = "serde-derive", serde(default))]
    channel_axis: usize,
}

impl Config {
    /// Creates a config with identity preprocessing and channels on the
    /// first axis of an unbatched input.
    #[must_use]
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            preprocessing: Preprocessing::identity(),
            channel_axis: 0,
        }
    }

    /// Sets the preprocessing stage applied before the backend.
    #[must_use]
    pub fn with_preprocessing(mut self, preprocessing: Preprocessing) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    /// Sets the channel axis of an unbatched input, e.g. `2` for `[H, W, C]`.
    #[must_use]
    pub fn with_channel_axis(mut self, channel_axis: usize) -> Self {
        self.channel_axis = channel_axis;
        self
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[must_use]
    pub fn preprocessing(&self) -> &Preprocessing {
        &self.preprocessing
    }

    #[must_use]
    pub fn channel_axis(&self) -> usize {
        self.channel_axis
    }
}

#[cfg(all(test, feature = "serde-derive"))]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{ "bounds": [0.0, 255.0] }"#).unwrap();

        assert_eq!(config, Config::new(Bounds::new(0.0, 255.0).unwrap()));
        assert!(config.preprocessing().is_identity());
    }

    #[test]
    fn deserializes_preprocessing() {
        let json = r#"{
            "bounds": [0.0, 1.0],
            "preprocessing": {
                "subtrahend": {"v": 1, "dim": [3, 1, 1], "data": [0.485, 0.456, 0.406]},
                "divisor": {"v": 1, "dim": [3, 1, 1], "data": [0.229, 0.224, 0.225]}
            },
            "channel_axis": 0
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(
            config.preprocessing().divisor().map(|d| d.shape().to_vec()),
            Some(vec![3, 1, 1])
        );
        assert!(config.preprocessing().check_shape(&[3, 32, 32]).is_ok());
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert!(serde_json::from_str::<Config>(r#"{ "bounds": [1.0, 1.0] }"#).is_err());
    }
}
