//! Built-in scalar strategies.
//!
//! Each strategy draws a parameter that biases production towards one region
//! of its value space: a sign and magnitude for integers, a probability for
//! booleans, an expected length and alphabet for text. Steering the example
//! source means steering which of these parameters get drawn from.

use crate::strategy::{DecodeError, Strategy};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Number of binary orders of magnitude integer centers range over
const INTEGER_OCTAVES: f64 = 16.0;

/// Printable alphabet text is drawn from; parameters pick a prefix of it
const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 _-.,!?";

/// Draw a length from a geometric distribution with the given mean, capped
fn draw_length(rng: &mut ChaCha8Rng, expected: f64, max_length: usize) -> usize {
    let p_continue = 1.0 - 1.0 / (1.0 + expected);
    let mut length = 0;
    while length < max_length && rng.gen::<f64>() < p_continue {
        length += 1;
    }
    length
}

/// Bias for integer production: values land uniformly in `center ± spread`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegerParameter {
    pub center: f64,
    pub spread: f64,
}

/// Integers of either sign, or non-negative integers only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegerStrategy {
    non_negative: bool,
}

impl IntegerStrategy {
    pub fn new() -> Self {
        IntegerStrategy { non_negative: false }
    }

    pub fn non_negative() -> Self {
        IntegerStrategy { non_negative: true }
    }
}

impl Strategy for IntegerStrategy {
    type Value = i64;
    type Parameter = IntegerParameter;

    fn describe(&self) -> String {
        if self.non_negative {
            "non_negative_integers".to_string()
        } else {
            "integers".to_string()
        }
    }

    /// Centers are log-uniform in magnitude with a random sign. The spread
    /// relative to the center shrinks as the magnitude grows, so large centers
    /// give values of a single sign while small ones straddle zero.
    fn draw_parameter(&self, rng: &mut ChaCha8Rng) -> IntegerParameter {
        let position: f64 = rng.gen();
        let mut center = (position * INTEGER_OCTAVES).exp2();
        if rng.gen_bool(0.5) {
            center = -center;
        }
        let ratio = (4.0 - 6.0 * position).exp2();
        IntegerParameter {
            center,
            spread: center.abs() * ratio,
        }
    }

    fn produce(&self, rng: &mut ChaCha8Rng, parameter: &IntegerParameter) -> i64 {
        let noise = rng.gen::<f64>() * 2.0 - 1.0;
        let value = (parameter.center + parameter.spread * noise).floor() as i64;
        if self.non_negative {
            value.saturating_abs()
        } else {
            value
        }
    }

    fn encode(&self, value: &i64) -> String {
        value.to_string()
    }

    fn decode(&self, encoded: &str) -> Result<i64, DecodeError> {
        let value: i64 = encoded
            .parse()
            .map_err(|e| DecodeError::new(self.describe(), encoded, e))?;
        if self.non_negative && value < 0 {
            return Err(DecodeError::new(self.describe(), encoded, "negative value"));
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BooleanStrategy;

impl Strategy for BooleanStrategy {
    type Value = bool;
    /// Probability of producing `true`
    type Parameter = f64;

    fn describe(&self) -> String {
        "booleans".to_string()
    }

    fn draw_parameter(&self, rng: &mut ChaCha8Rng) -> f64 {
        rng.gen()
    }

    fn produce(&self, rng: &mut ChaCha8Rng, parameter: &f64) -> bool {
        rng.gen::<f64>() < *parameter
    }

    fn encode(&self, value: &bool) -> String {
        value.to_string()
    }

    fn decode(&self, encoded: &str) -> Result<bool, DecodeError> {
        encoded
            .parse()
            .map_err(|e| DecodeError::new(self.describe(), encoded, e))
    }
}

/// Bias for float production, same shape as for integers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatParameter {
    pub center: f64,
    pub spread: f64,
}

/// Finite floats only, so every value survives a text round trip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloatStrategy;

impl Strategy for FloatStrategy {
    type Value = f64;
    type Parameter = FloatParameter;

    fn describe(&self) -> String {
        "floats".to_string()
    }

    fn draw_parameter(&self, rng: &mut ChaCha8Rng) -> FloatParameter {
        let mut center = (rng.gen::<f64>() * 40.0 - 20.0).exp2();
        if rng.gen_bool(0.5) {
            center = -center;
        }
        let spread = center.abs() * (rng.gen::<f64>() * 8.0 - 4.0).exp2();
        FloatParameter { center, spread }
    }

    fn produce(&self, rng: &mut ChaCha8Rng, parameter: &FloatParameter) -> f64 {
        let noise = rng.gen::<f64>() * 2.0 - 1.0;
        parameter.center + parameter.spread * noise
    }

    fn encode(&self, value: &f64) -> String {
        value.to_string()
    }

    fn decode(&self, encoded: &str) -> Result<f64, DecodeError> {
        let value: f64 = encoded
            .parse()
            .map_err(|e| DecodeError::new(self.describe(), encoded, e))?;
        if !value.is_finite() {
            return Err(DecodeError::new(self.describe(), encoded, "not finite"));
        }
        Ok(value)
    }
}

/// Bias for text and byte production
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextParameter {
    pub expected_length: f64,
    pub alphabet_size: usize,
}

fn draw_text_parameter(rng: &mut ChaCha8Rng, alphabet_len: usize) -> TextParameter {
    TextParameter {
        expected_length: rng.gen::<f64>() * 16.0,
        alphabet_size: rng.gen_range(1..=alphabet_len),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStrategy {
    max_length: usize,
}

impl TextStrategy {
    pub fn new() -> Self {
        TextStrategy { max_length: 64 }
    }

    pub fn max_length(max_length: usize) -> Self {
        TextStrategy { max_length }
    }
}

impl Default for TextStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for TextStrategy {
    type Value = String;
    type Parameter = TextParameter;

    fn describe(&self) -> String {
        format!("text(max_length={})", self.max_length)
    }

    fn draw_parameter(&self, rng: &mut ChaCha8Rng) -> TextParameter {
        draw_text_parameter(rng, ALPHABET.len())
    }

    fn produce(&self, rng: &mut ChaCha8Rng, parameter: &TextParameter) -> String {
        let alphabet = &ALPHABET.as_bytes()[..parameter.alphabet_size.clamp(1, ALPHABET.len())];
        let length = draw_length(rng, parameter.expected_length, self.max_length);
        (0..length)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
            .collect()
    }

    fn encode(&self, value: &String) -> String {
        value.clone()
    }

    fn decode(&self, encoded: &str) -> Result<String, DecodeError> {
        if encoded.chars().count() > self.max_length {
            return Err(DecodeError::new(self.describe(), encoded, "too long"));
        }
        Ok(encoded.to_string())
    }
}

/// Byte strings, stored hex encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytesStrategy {
    max_length: usize,
}

impl BytesStrategy {
    pub fn new() -> Self {
        BytesStrategy { max_length: 64 }
    }
}

impl Default for BytesStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for BytesStrategy {
    type Value = Vec<u8>;
    type Parameter = TextParameter;

    fn describe(&self) -> String {
        format!("bytes(max_length={})", self.max_length)
    }

    fn draw_parameter(&self, rng: &mut ChaCha8Rng) -> TextParameter {
        draw_text_parameter(rng, 256)
    }

    fn produce(&self, rng: &mut ChaCha8Rng, parameter: &TextParameter) -> Vec<u8> {
        let upper = parameter.alphabet_size.clamp(1, 256);
        let length = draw_length(rng, parameter.expected_length, self.max_length);
        (0..length).map(|_| rng.gen_range(0..upper) as u8).collect()
    }

    fn encode(&self, value: &Vec<u8>) -> String {
        hex::encode(value)
    }

    fn decode(&self, encoded: &str) -> Result<Vec<u8>, DecodeError> {
        hex::decode(encoded).map_err(|e| DecodeError::new(self.describe(), encoded, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_large_integer_centers_have_a_single_sign() {
        let strategy = IntegerStrategy::new();
        let parameter = IntegerParameter { center: 5000.0, spread: 1000.0 };
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..200 {
            let value = strategy.produce(&mut rng, &parameter);
            assert!((4000..=6000).contains(&value), "value {} out of range", value);
        }
    }

    #[test]
    fn test_non_negative_integers() {
        let strategy = IntegerStrategy::non_negative();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..100 {
            let parameter = strategy.draw_parameter(&mut rng);
            assert!(strategy.produce(&mut rng, &parameter) >= 0);
        }
        assert!(strategy.decode("-3").is_err());
    }

    #[test]
    fn test_integer_decode_rejects_garbage() {
        let err = IntegerStrategy::new().decode("twelve").unwrap_err();
        assert_eq!(err.expected, "integers");
        assert_eq!(err.encoded, "twelve");
    }

    #[test]
    fn test_text_respects_parameter_alphabet_and_max_length() {
        let strategy = TextStrategy::max_length(5);
        let parameter = TextParameter { expected_length: 50.0, alphabet_size: 2 };
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for _ in 0..50 {
            let text = strategy.produce(&mut rng, &parameter);
            assert!(text.len() <= 5);
            assert!(text.chars().all(|c| c == 'a' || c == 'b'), "unexpected text {:?}", text);
        }
    }

    #[test]
    fn test_float_encoding_is_exact() {
        let strategy = FloatStrategy;
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for _ in 0..50 {
            let parameter = strategy.draw_parameter(&mut rng);
            let value = strategy.produce(&mut rng, &parameter);
            assert_eq!(strategy.decode(&strategy.encode(&value)).unwrap(), value);
        }
        assert!(strategy.decode("inf").is_err());
    }

    #[test]
    fn test_bytes_are_hex_encoded() {
        let strategy = BytesStrategy::new();
        assert_eq!(strategy.encode(&vec![0, 255, 16]), "00ff10");
        assert_eq!(strategy.decode("00ff10").unwrap(), vec![0, 255, 16]);
        assert!(strategy.decode("zz").is_err());
    }

    #[test]
    fn test_boolean_parameter_is_a_probability() {
        let strategy = BooleanStrategy;
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        assert!((0..100).all(|_| strategy.produce(&mut rng, &1.0)));
        assert!((0..100).all(|_| !strategy.produce(&mut rng, &0.0)));
        assert_eq!(strategy.decode("true").unwrap(), true);
    }
}
