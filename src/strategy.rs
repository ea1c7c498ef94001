//! The generation capability consumed by the example source.
//!
//! A `Strategy` knows how to turn entropy plus a parameter into a value, how to
//! draw fresh parameters, and how to move values to and from the opaque string
//! form stored in the example database. The source never looks inside a
//! parameter: it only hands back parameters the same strategy drew earlier.

use rand_chacha::ChaCha8Rng;
use std::rc::Rc;

/// Failure to turn a stored string back into a value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot decode {encoded:?} as {expected}: {reason}")]
pub struct DecodeError {
    pub expected: String,
    pub encoded: String,
    pub reason: String,
}

impl DecodeError {
    pub fn new(expected: impl Into<String>, encoded: &str, reason: impl ToString) -> Self {
        DecodeError {
            expected: expected.into(),
            encoded: encoded.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Type-directed value generation with a string storage form
pub trait Strategy {
    /// Values produced by this strategy
    type Value: Clone;

    /// Bias configuration steering `produce`
    type Parameter;

    /// Stable identity of this strategy, used to derive its database key
    fn describe(&self) -> String;

    /// Draw a fresh parameter for the pool
    fn draw_parameter(&self, rng: &mut ChaCha8Rng) -> Self::Parameter;

    /// Produce a value under the given parameter
    fn produce(&self, rng: &mut ChaCha8Rng, parameter: &Self::Parameter) -> Self::Value;

    fn encode(&self, value: &Self::Value) -> String;

    fn decode(&self, encoded: &str) -> Result<Self::Value, DecodeError>;
}

impl<S: Strategy + ?Sized> Strategy for Rc<S> {
    type Value = S::Value;
    type Parameter = S::Parameter;

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn draw_parameter(&self, rng: &mut ChaCha8Rng) -> Self::Parameter {
        (**self).draw_parameter(rng)
    }

    fn produce(&self, rng: &mut ChaCha8Rng, parameter: &Self::Parameter) -> Self::Value {
        (**self).produce(rng, parameter)
    }

    fn encode(&self, value: &Self::Value) -> String {
        (**self).encode(value)
    }

    fn decode(&self, encoded: &str) -> Result<Self::Value, DecodeError> {
        (**self).decode(encoded)
    }
}
