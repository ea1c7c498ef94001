//! Strategies for records described by a model schema.
//!
//! A `ModelSchema` lists typed fields. Each field is mapped to a
//! `FieldStrategy` through a `StrategyTable`, a closed registry from field
//! kind to constructor. Mapping a field has three outcomes:
//! - `Supported`: the field gets a strategy
//! - `Skippable`: the field is left out of generated records
//! - `Unsupported`: the whole model cannot be generated
//!
//! A `ModelStrategy` then produces `Record`s, one value per mapped field, and
//! stores them as JSON objects.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::strategies::{
    BooleanStrategy, BytesStrategy, FloatParameter, FloatStrategy, IntegerParameter,
    IntegerStrategy, TextParameter, TextStrategy,
};
use crate::strategy::{DecodeError, Strategy};

/// 2000-01-01T00:00:00Z, the origin generated timestamps are spread around
const TIMESTAMP_ORIGIN: i64 = 946_684_800;

/// Generated timestamps move in steps of an hour
const TIMESTAMP_STEP: i64 = 3_600;

const EMAIL_DOMAIN: &str = "example.com";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Model {model} is not supported: {reason}")]
    ModelNotSupported { model: String, reason: String },
}

/// Type tag of a model field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Auto,
    BigInteger,
    Binary,
    Boolean,
    Char,
    DateTime,
    Email,
    Float,
    Integer,
    NullBoolean,
    PositiveInteger,
    PositiveSmallInteger,
    /// Reference to a row of the named model
    ForeignKey(String),
    /// Any field type without a built-in mapping
    Custom(String),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Auto => "AutoField",
            FieldKind::BigInteger => "BigIntegerField",
            FieldKind::Binary => "BinaryField",
            FieldKind::Boolean => "BooleanField",
            FieldKind::Char => "CharField",
            FieldKind::DateTime => "DateTimeField",
            FieldKind::Email => "EmailField",
            FieldKind::Float => "FloatField",
            FieldKind::Integer => "IntegerField",
            FieldKind::NullBoolean => "NullBooleanField",
            FieldKind::PositiveInteger => "PositiveIntegerField",
            FieldKind::PositiveSmallInteger => "PositiveSmallIntegerField",
            FieldKind::ForeignKey(_) => "ForeignKey",
            FieldKind::Custom(name) => name.as_str(),
        };
        f.write_str(name)
    }
}

/// One field of a model
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Whether the empty string is an acceptable choice
    pub blank: bool,
    pub choices: Vec<String>,
    pub max_length: Option<usize>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldSpec {
            name: name.into(),
            kind,
            nullable: false,
            blank: false,
            choices: Vec::new(),
            max_length: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    pub fn choices<I, T>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        ModelSchema {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// A single generated field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Seconds since the Unix epoch, UTC
    Timestamp(i64),
}

/// A generated row: field name to value
pub type Record = BTreeMap<String, FieldValue>;

/// Per-field generation bias; each variant belongs to one kind of
/// `FieldStrategy`
#[derive(Debug, Clone, PartialEq)]
pub enum FieldParameter {
    Integer(IntegerParameter),
    Boolean(f64),
    Float(FloatParameter),
    Text(TextParameter),
    /// Relative weight of each choice
    Sampled(Vec<f64>),
    Optional {
        null_probability: f64,
        inner: Box<FieldParameter>,
    },
}

/// Generator for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldStrategy {
    Integer(IntegerStrategy),
    Boolean(BooleanStrategy),
    Float(FloatStrategy),
    Text(TextStrategy),
    Bytes(BytesStrategy),
    Email(TextStrategy),
    Timestamp(IntegerStrategy),
    SampledFrom(Vec<String>),
    /// Either null or a value of the inner strategy
    Optional(Box<FieldStrategy>),
}

impl FieldStrategy {
    /// Wrap in `Optional` unless already optional
    pub fn optional(self) -> Self {
        match self {
            FieldStrategy::Optional(_) => self,
            other => FieldStrategy::Optional(Box::new(other)),
        }
    }

    /// A choice among zero options, which can never produce a value
    pub fn has_no_choices(&self) -> bool {
        match self {
            FieldStrategy::SampledFrom(options) => options.is_empty(),
            FieldStrategy::Optional(inner) => inner.has_no_choices(),
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FieldStrategy::Integer(s) => s.describe(),
            FieldStrategy::Boolean(s) => s.describe(),
            FieldStrategy::Float(s) => s.describe(),
            FieldStrategy::Text(s) => s.describe(),
            FieldStrategy::Bytes(s) => s.describe(),
            FieldStrategy::Email(_) => "emails".to_string(),
            FieldStrategy::Timestamp(_) => "timestamps".to_string(),
            FieldStrategy::SampledFrom(options) => format!("sampled_from({:?})", options),
            FieldStrategy::Optional(inner) => format!("optional({})", inner.describe()),
        }
    }

    pub fn draw_parameter(&self, rng: &mut ChaCha8Rng) -> FieldParameter {
        match self {
            FieldStrategy::Integer(s) | FieldStrategy::Timestamp(s) => {
                FieldParameter::Integer(s.draw_parameter(rng))
            }
            FieldStrategy::Boolean(s) => FieldParameter::Boolean(s.draw_parameter(rng)),
            FieldStrategy::Float(s) => FieldParameter::Float(s.draw_parameter(rng)),
            FieldStrategy::Text(s) | FieldStrategy::Email(s) => {
                FieldParameter::Text(s.draw_parameter(rng))
            }
            FieldStrategy::Bytes(s) => FieldParameter::Text(s.draw_parameter(rng)),
            FieldStrategy::SampledFrom(options) => {
                FieldParameter::Sampled(options.iter().map(|_| rng.gen::<f64>()).collect())
            }
            FieldStrategy::Optional(inner) => FieldParameter::Optional {
                null_probability: rng.gen::<f64>() * 0.5,
                inner: Box::new(inner.draw_parameter(rng)),
            },
        }
    }

    pub fn produce(&self, rng: &mut ChaCha8Rng, parameter: &FieldParameter) -> FieldValue {
        match (self, parameter) {
            (FieldStrategy::Integer(s), FieldParameter::Integer(p)) => {
                FieldValue::Int(s.produce(rng, p))
            }
            (FieldStrategy::Timestamp(s), FieldParameter::Integer(p)) => {
                let offset = s.produce(rng, p).saturating_mul(TIMESTAMP_STEP);
                FieldValue::Timestamp(TIMESTAMP_ORIGIN.saturating_add(offset))
            }
            (FieldStrategy::Boolean(s), FieldParameter::Boolean(p)) => {
                FieldValue::Bool(s.produce(rng, p))
            }
            (FieldStrategy::Float(s), FieldParameter::Float(p)) => {
                FieldValue::Float(s.produce(rng, p))
            }
            (FieldStrategy::Text(s), FieldParameter::Text(p)) => FieldValue::Text(s.produce(rng, p)),
            (FieldStrategy::Bytes(s), FieldParameter::Text(p)) => {
                FieldValue::Bytes(s.produce(rng, p))
            }
            (FieldStrategy::Email(s), FieldParameter::Text(p)) => {
                let local: String = s
                    .produce(rng, p)
                    .chars()
                    .filter(char::is_ascii_alphanumeric)
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                let local = if local.is_empty() { "user".to_string() } else { local };
                FieldValue::Text(format!("{}@{}", local, EMAIL_DOMAIN))
            }
            (FieldStrategy::SampledFrom(options), _) if options.is_empty() => FieldValue::Null,
            (FieldStrategy::SampledFrom(options), FieldParameter::Sampled(weights))
                if weights.len() == options.len() =>
            {
                match WeightedIndex::new(weights) {
                    Ok(index) => FieldValue::Text(options[index.sample(rng)].clone()),
                    // All weights zero: fall back to a uniform pick
                    Err(_) => FieldValue::Text(options[rng.gen_range(0..options.len())].clone()),
                }
            }
            (
                FieldStrategy::Optional(inner),
                FieldParameter::Optional {
                    null_probability,
                    inner: inner_parameter,
                },
            ) => {
                if rng.gen::<f64>() < *null_probability {
                    FieldValue::Null
                } else {
                    inner.produce(rng, inner_parameter)
                }
            }
            (strategy, parameter) => {
                warn!(
                    "parameter {:?} does not fit {}, drawing a fresh one",
                    parameter,
                    strategy.describe()
                );
                let fresh = strategy.draw_parameter(rng);
                strategy.produce(rng, &fresh)
            }
        }
    }

    pub fn to_json(&self, value: &FieldValue) -> Value {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(n) | FieldValue::Timestamp(n) => Value::from(*n),
            FieldValue::Float(x) => Value::from(*x),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Bytes(bytes) => Value::String(hex::encode(bytes)),
        }
    }

    /// Type-directed decode of one stored field
    pub fn from_json(&self, value: &Value) -> Result<FieldValue, String> {
        let mismatch = || format!("expected {}, found {}", self.describe(), value);

        match self {
            FieldStrategy::Optional(inner) => match value {
                Value::Null => Ok(FieldValue::Null),
                other => inner.from_json(other),
            },
            FieldStrategy::Integer(s) => match value {
                Value::Number(n) => s
                    .decode(&n.to_string())
                    .map(FieldValue::Int)
                    .map_err(|e| e.reason),
                _ => Err(mismatch()),
            },
            FieldStrategy::Timestamp(_) => value.as_i64().map(FieldValue::Timestamp).ok_or_else(mismatch),
            FieldStrategy::Boolean(_) => value.as_bool().map(FieldValue::Bool).ok_or_else(mismatch),
            FieldStrategy::Float(_) => value.as_f64().map(FieldValue::Float).ok_or_else(mismatch),
            FieldStrategy::Text(s) => {
                let text = value.as_str().ok_or_else(mismatch)?;
                s.decode(text).map(FieldValue::Text).map_err(|e| e.reason)
            }
            FieldStrategy::Bytes(s) => {
                let text = value.as_str().ok_or_else(mismatch)?;
                s.decode(text).map(FieldValue::Bytes).map_err(|e| e.reason)
            }
            FieldStrategy::Email(_) => {
                let text = value.as_str().ok_or_else(mismatch)?;
                match text.split_once('@') {
                    Some((local, domain))
                        if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
                    {
                        Ok(FieldValue::Text(text.to_string()))
                    }
                    _ => Err(format!("{:?} is not an email address", text)),
                }
            }
            FieldStrategy::SampledFrom(options) => {
                let text = value.as_str().ok_or_else(mismatch)?;
                if options.iter().any(|option| option == text) {
                    Ok(FieldValue::Text(text.to_string()))
                } else {
                    Err(format!("{:?} is not one of {:?}", text, options))
                }
            }
        }
    }
}

/// Outcome of mapping one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMapping {
    Supported(FieldStrategy),
    /// Leave the field out of generated records
    Skippable,
    /// The field makes its model impossible to generate
    Unsupported(String),
}

/// Builds the strategy for a field of a known kind
pub type StrategyConstructor = fn(&FieldSpec) -> FieldStrategy;

fn text_for(field: &FieldSpec) -> FieldStrategy {
    match field.max_length {
        Some(max_length) => FieldStrategy::Text(TextStrategy::max_length(max_length)),
        None => FieldStrategy::Text(TextStrategy::new()),
    }
}

/// Field kind to strategy constructor. Lookups are exact: a kind without an
/// entry has no strategy.
#[derive(Clone)]
pub struct StrategyTable {
    constructors: HashMap<FieldKind, StrategyConstructor>,
}

impl fmt::Debug for StrategyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyTable")
            .field("kinds", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        let mut table = StrategyTable {
            constructors: HashMap::new(),
        };
        table.register(FieldKind::BigInteger, |_| FieldStrategy::Integer(IntegerStrategy::new()));
        table.register(FieldKind::Binary, |_| FieldStrategy::Bytes(BytesStrategy::new()));
        table.register(FieldKind::Boolean, |_| FieldStrategy::Boolean(BooleanStrategy));
        table.register(FieldKind::Char, text_for);
        table.register(FieldKind::DateTime, |_| FieldStrategy::Timestamp(IntegerStrategy::new()));
        table.register(FieldKind::Email, |_| FieldStrategy::Email(TextStrategy::max_length(32)));
        table.register(FieldKind::Float, |_| FieldStrategy::Float(FloatStrategy));
        table.register(FieldKind::Integer, |_| FieldStrategy::Integer(IntegerStrategy::new()));
        table.register(FieldKind::NullBoolean, |_| {
            FieldStrategy::Boolean(BooleanStrategy).optional()
        });
        table.register(FieldKind::PositiveInteger, |_| {
            FieldStrategy::Integer(IntegerStrategy::non_negative())
        });
        table.register(FieldKind::PositiveSmallInteger, |_| {
            FieldStrategy::Integer(IntegerStrategy::non_negative())
        });
        table
    }
}

impl StrategyTable {
    /// Register (or replace) the constructor for a kind
    pub fn register(&mut self, kind: FieldKind, constructor: StrategyConstructor) {
        self.constructors.insert(kind, constructor);
    }

    pub fn lookup(&self, field: &FieldSpec) -> Option<FieldStrategy> {
        self.constructors.get(&field.kind).map(|construct| construct(field))
    }

    pub fn supports(&self, kind: &FieldKind) -> bool {
        self.constructors.contains_key(kind)
    }

    pub fn map_field(&self, field: &FieldSpec) -> FieldMapping {
        let strategy = match &field.kind {
            FieldKind::Auto => return FieldMapping::Skippable,
            FieldKind::ForeignKey(_) => FieldStrategy::Integer(IntegerStrategy::non_negative()),
            _ if !field.choices.is_empty() => FieldStrategy::SampledFrom(
                field
                    .choices
                    .iter()
                    .filter(|choice| field.blank || !choice.is_empty())
                    .cloned()
                    .collect(),
            ),
            kind => match self.lookup(field) {
                Some(strategy) => strategy,
                None if field.nullable => return FieldMapping::Skippable,
                None => {
                    return FieldMapping::Unsupported(format!(
                        "No mapping defined for field type {} and {} is not nullable",
                        kind, field.name
                    ))
                }
            },
        };

        if strategy.has_no_choices() {
            return if field.nullable {
                FieldMapping::Skippable
            } else {
                FieldMapping::Unsupported(format!(
                    "No non-blank choices for field {} and it is not nullable",
                    field.name
                ))
            };
        }

        if field.nullable {
            FieldMapping::Supported(strategy.optional())
        } else {
            FieldMapping::Supported(strategy)
        }
    }

    /// Map every field of `schema`. The first unsupported field fails the
    /// whole model.
    pub fn model_strategy(&self, schema: &ModelSchema) -> Result<ModelStrategy, SchemaError> {
        let mut fields = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            match self.map_field(field) {
                FieldMapping::Supported(strategy) => fields.push((field.name.clone(), strategy)),
                FieldMapping::Skippable => debug!("skipping field {}.{}", schema.name, field.name),
                FieldMapping::Unsupported(reason) => {
                    return Err(SchemaError::ModelNotSupported {
                        model: schema.name.clone(),
                        reason,
                    })
                }
            }
        }
        Ok(ModelStrategy {
            model: schema.name.clone(),
            fields,
        })
    }
}

/// Records of one model, a value per mapped field
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStrategy {
    model: String,
    fields: Vec<(String, FieldStrategy)>,
}

impl ModelStrategy {
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Names of the fields present in every record
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

impl Strategy for ModelStrategy {
    type Value = Record;
    /// One parameter per mapped field, in field order
    type Parameter = Vec<FieldParameter>;

    fn describe(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(name, strategy)| format!("{}: {}", name, strategy.describe()))
            .collect();
        format!("model {}{{{}}}", self.model, fields.join(", "))
    }

    fn draw_parameter(&self, rng: &mut ChaCha8Rng) -> Vec<FieldParameter> {
        self.fields
            .iter()
            .map(|(_, strategy)| strategy.draw_parameter(rng))
            .collect()
    }

    fn produce(&self, rng: &mut ChaCha8Rng, parameter: &Vec<FieldParameter>) -> Record {
        self.fields
            .iter()
            .enumerate()
            .map(|(index, (name, strategy))| {
                let value = match parameter.get(index) {
                    Some(field_parameter) => strategy.produce(rng, field_parameter),
                    None => {
                        warn!("no parameter for field {}.{}", self.model, name);
                        let fresh = strategy.draw_parameter(rng);
                        strategy.produce(rng, &fresh)
                    }
                };
                (name.clone(), value)
            })
            .collect()
    }

    fn encode(&self, record: &Record) -> String {
        let object: Map<String, Value> = self
            .fields
            .iter()
            .filter_map(|(name, strategy)| {
                record
                    .get(name)
                    .map(|value| (name.clone(), strategy.to_json(value)))
            })
            .collect();
        Value::Object(object).to_string()
    }

    fn decode(&self, encoded: &str) -> Result<Record, DecodeError> {
        let fail = |reason: String| DecodeError::new(self.describe(), encoded, reason);

        let parsed: Value = serde_json::from_str(encoded).map_err(|e| fail(e.to_string()))?;
        let object = parsed
            .as_object()
            .ok_or_else(|| fail("not a JSON object".to_string()))?;

        if let Some(extra) = object
            .keys()
            .find(|key| !self.fields.iter().any(|(name, _)| name == *key))
        {
            return Err(fail(format!("unknown field {}", extra)));
        }

        let mut record = Record::new();
        for (name, strategy) in &self.fields {
            let stored = object
                .get(name)
                .ok_or_else(|| fail(format!("missing field {}", name)))?;
            let value = strategy
                .from_json(stored)
                .map_err(|reason| fail(format!("field {}: {}", name, reason)))?;
            record.insert(name.clone(), value);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn customer() -> ModelSchema {
        ModelSchema::new("Customer")
            .field(FieldSpec::new("id", FieldKind::Auto))
            .field(FieldSpec::new("name", FieldKind::Char).max_length(100))
            .field(FieldSpec::new("email", FieldKind::Email).max_length(100))
            .field(FieldSpec::new("gender", FieldKind::Char).max_length(50).nullable())
            .field(FieldSpec::new("age", FieldKind::Integer))
            .field(FieldSpec::new("birthday", FieldKind::DateTime))
    }

    #[test]
    fn test_auto_fields_are_skipped() {
        let table = StrategyTable::default();
        assert_eq!(
            table.map_field(&FieldSpec::new("id", FieldKind::Auto)),
            FieldMapping::Skippable
        );
    }

    #[test]
    fn test_unknown_kind_is_skippable_only_when_nullable() {
        let table = StrategyTable::default();
        let charm = FieldKind::Custom("CharmField".to_string());

        assert_eq!(
            table.map_field(&FieldSpec::new("charm", charm.clone()).nullable()),
            FieldMapping::Skippable
        );
        assert_eq!(
            table.map_field(&FieldSpec::new("charm", charm)),
            FieldMapping::Unsupported(
                "No mapping defined for field type CharmField and charm is not nullable"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_nullable_fields_are_optional() {
        let table = StrategyTable::default();
        match table.map_field(&FieldSpec::new("gender", FieldKind::Char).nullable()) {
            FieldMapping::Supported(FieldStrategy::Optional(inner)) => {
                assert!(matches!(*inner, FieldStrategy::Text(_)))
            }
            other => panic!("unexpected mapping {:?}", other),
        }
    }

    #[test]
    fn test_null_boolean_is_not_wrapped_twice() {
        let table = StrategyTable::default();
        let mapping = table.map_field(&FieldSpec::new("flag", FieldKind::NullBoolean).nullable());
        assert_eq!(
            mapping,
            FieldMapping::Supported(FieldStrategy::Optional(Box::new(FieldStrategy::Boolean(
                BooleanStrategy
            ))))
        );
    }

    #[test]
    fn test_choices_drop_blank_unless_allowed() {
        let table = StrategyTable::default();
        let field = FieldSpec::new("size", FieldKind::Char).choices(vec!["", "S", "M"]);

        assert_eq!(
            table.map_field(&field),
            FieldMapping::Supported(FieldStrategy::SampledFrom(vec![
                "S".to_string(),
                "M".to_string()
            ]))
        );
        assert_eq!(
            table.map_field(&field.clone().blank()),
            FieldMapping::Supported(FieldStrategy::SampledFrom(vec![
                "".to_string(),
                "S".to_string(),
                "M".to_string()
            ]))
        );
    }

    #[test]
    fn test_registered_empty_choice_is_not_supported() {
        let mut table = StrategyTable::default();
        let mood = FieldKind::Custom("MoodField".to_string());
        table.register(mood.clone(), |_| FieldStrategy::SampledFrom(Vec::new()));

        assert_eq!(
            table.map_field(&FieldSpec::new("mood", mood.clone()).nullable()),
            FieldMapping::Skippable
        );
        assert_eq!(
            table.map_field(&FieldSpec::new("mood", mood.clone())),
            FieldMapping::Unsupported(
                "No non-blank choices for field mood and it is not nullable".to_string()
            )
        );
        let schema = ModelSchema::new("Moody").field(FieldSpec::new("mood", mood));
        assert!(matches!(
            table.model_strategy(&schema),
            Err(SchemaError::ModelNotSupported { .. })
        ));
    }

    #[test]
    fn test_empty_choice_produces_null() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let strategy = FieldStrategy::SampledFrom(Vec::new());
        let parameter = strategy.draw_parameter(&mut rng);
        assert_eq!(strategy.produce(&mut rng, &parameter), FieldValue::Null);
        assert_eq!(
            strategy.produce(&mut rng, &FieldParameter::Sampled(vec![1.0])),
            FieldValue::Null
        );
    }

    #[test]
    fn test_foreign_keys_are_non_negative_references() {
        let table = StrategyTable::default();
        let field = FieldSpec::new("company", FieldKind::ForeignKey("Company".to_string()));
        assert_eq!(
            table.map_field(&field),
            FieldMapping::Supported(FieldStrategy::Integer(IntegerStrategy::non_negative()))
        );
    }

    #[test]
    fn test_registered_kind_becomes_supported() {
        let mut table = StrategyTable::default();
        let charm = FieldKind::Custom("CharmField".to_string());
        assert!(!table.supports(&charm));

        table.register(charm.clone(), |_| FieldStrategy::Text(TextStrategy::max_length(1)));
        assert!(table.supports(&charm));
        assert!(matches!(
            table.map_field(&FieldSpec::new("charm", charm)),
            FieldMapping::Supported(FieldStrategy::Text(_))
        ));
    }

    #[test]
    fn test_customer_records_have_every_mapped_field() {
        let strategy = StrategyTable::default().model_strategy(&customer()).unwrap();
        let names: Vec<&str> = strategy.field_names().collect();
        assert_eq!(names, vec!["name", "email", "gender", "age", "birthday"]);

        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..50 {
            let parameter = strategy.draw_parameter(&mut rng);
            let record = strategy.produce(&mut rng, &parameter);
            assert_eq!(record.len(), 5);
            assert!(!record.contains_key("id"));
            match &record["email"] {
                FieldValue::Text(email) => assert!(email.ends_with("@example.com")),
                other => panic!("unexpected email {:?}", other),
            }
            assert!(matches!(record["birthday"], FieldValue::Timestamp(_)));

            let encoded = strategy.encode(&record);
            assert_eq!(strategy.decode(&encoded).unwrap(), record);
        }
    }

    #[test]
    fn test_decode_is_type_directed() {
        let schema = ModelSchema::new("Shop")
            .field(FieldSpec::new("name", FieldKind::Char))
            .field(FieldSpec::new("company", FieldKind::ForeignKey("Company".to_string())));
        let strategy = StrategyTable::default().model_strategy(&schema).unwrap();

        assert!(strategy.decode(r#"{"name":"corner","company":3}"#).is_ok());
        assert!(strategy.decode(r#"{"name":"corner","company":-3}"#).is_err());
        assert!(strategy.decode(r#"{"name":3,"company":3}"#).is_err());
        assert!(strategy.decode(r#"{"name":"corner"}"#).is_err());
        assert!(strategy.decode(r#"{"name":"corner","company":3,"owner":1}"#).is_err());
        assert!(strategy.decode("[]").is_err());
    }

    #[test]
    fn test_mismatched_parameter_is_redrawn() {
        let strategy = FieldStrategy::Boolean(BooleanStrategy);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let value = strategy.produce(&mut rng, &FieldParameter::Sampled(vec![1.0]));
        assert!(matches!(value, FieldValue::Bool(_)));
    }
}
