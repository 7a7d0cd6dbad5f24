/// Dense feed-forward networks exported as JSON layer weights
use super::QualityModel;
use crate::BinqcError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// One row of input weights per output unit
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn outputs(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                let z: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + bias;
                self.activation.apply(z)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardNetwork {
    pub layers: Vec<DenseLayer>,
}

impl FeedForwardNetwork {
    /// Layers must chain and end in a single output unit
    pub fn validate(&self) -> Result<(), BinqcError> {
        let Some(last) = self.layers.last() else {
            return Err(BinqcError::Model("network has no layers".to_string()));
        };

        for (i, layer) in self.layers.iter().enumerate() {
            if layer.bias.len() != layer.outputs() {
                return Err(BinqcError::Model(format!(
                    "layer {} has {} units but {} biases",
                    i,
                    layer.outputs(),
                    layer.bias.len()
                )));
            }
            if layer.weights.iter().any(|row| row.len() != layer.inputs()) {
                return Err(BinqcError::Model(format!("layer {} has ragged weights", i)));
            }
            if i > 0 && layer.inputs() != self.layers[i - 1].outputs() {
                return Err(BinqcError::Model(format!(
                    "layer {} expects {} inputs but the previous layer has {} units",
                    i,
                    layer.inputs(),
                    self.layers[i - 1].outputs()
                )));
            }
        }

        if last.outputs() != 1 {
            return Err(BinqcError::Model(format!(
                "network must end in one unit, found {}",
                last.outputs()
            )));
        }
        Ok(())
    }
}

impl QualityModel for FeedForwardNetwork {
    fn input_width(&self) -> Option<usize> {
        self.layers.first().map(DenseLayer::inputs)
    }

    fn predict(&self, features: &[f64]) -> Result<f64, BinqcError> {
        let width = self.input_width().unwrap_or(0);
        if features.len() != width {
            return Err(BinqcError::Schema(format!(
                "network expects {} features, got {}",
                width,
                features.len()
            )));
        }

        let mut activations = features.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        activations
            .first()
            .copied()
            .ok_or_else(|| BinqcError::Model("network produced no output".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> FeedForwardNetwork {
        serde_json::from_str(
            r#"{"layers": [
                {"weights": [[1.0, -1.0], [0.5, 0.5]], "bias": [0.0, 1.0], "activation": "relu"},
                {"weights": [[2.0, 1.0]], "bias": [-3.0], "activation": "linear"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_forward_pass() {
        let net = network();
        net.validate().unwrap();
        assert_eq!(net.input_width(), Some(2));
        // hidden = relu([2 - 4, 1 + 2 + 1]) = [0, 4]; out = 0 + 4 - 3
        assert_eq!(net.predict(&[2.0, 4.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert_eq!(Activation::Sigmoid.apply(0.0), 0.5);
    }

    #[test]
    fn test_width_mismatch() {
        assert!(matches!(network().predict(&[1.0]), Err(BinqcError::Schema(_))));
    }

    #[test]
    fn test_validate_rejects_unchained_layers() {
        let mut net = network();
        net.layers[1].weights = vec![vec![1.0, 1.0, 1.0]];
        assert!(net.validate().is_err());
    }
}
