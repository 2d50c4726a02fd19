//! Activation functions available to hidden and output nodes.

use serde::{Deserialize, Serialize};

/// Closed set of activation functions a node can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    /// Passes the weighted sum through unchanged.
    Identity,
    /// Logistic function `1 / (1 + e^-x)`.
    Sigmoid,
    /// Hyperbolic tangent.
    Tanh,
    /// Rectified linear unit.
    Relu,
    /// Gaussian bump `e^(-x^2)`.
    Gaussian,
    /// Sine of the weighted sum.
    Sin,
    /// Absolute value.
    Abs,
    /// Heaviside step, 1 for positive sums and 0 otherwise.
    Step,
}

impl Activation {
    /// Every activation, in declaration order.
    pub const ALL: [Activation; 8] = [
        Activation::Identity,
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Relu,
        Activation::Gaussian,
        Activation::Sin,
        Activation::Abs,
        Activation::Step,
    ];

    /// Applies the function to a weighted input sum.
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Identity => x,
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            Activation::Gaussian => (-x * x).exp(),
            Activation::Sin => x.sin(),
            Activation::Abs => x.abs(),
            Activation::Step => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}
