//! Model strategies driven end to end through an example source and the
//! example database, following hypothesis-django's toystore models.

use examplesource::{
    ExampleDatabase, ExampleSource, FieldKind, FieldSpec, FieldValue, ModelSchema, SchemaError,
    Strategy, StrategyTable,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn charm() -> FieldKind {
    FieldKind::Custom("CharmField".to_string())
}

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
fn test_model_with_unmapped_required_field_is_rejected() {
    let schema = ModelSchema::new("Charming").field(FieldSpec::new("charm", charm()));
    match StrategyTable::default().model_strategy(&schema) {
        Err(SchemaError::ModelNotSupported { model, reason }) => {
            assert_eq!(model, "Charming");
            assert_eq!(
                reason,
                "No mapping defined for field type CharmField and charm is not nullable"
            );
        }
        other => panic!("expected ModelNotSupported, got {:?}", other),
    }
}

#[test]
fn test_model_with_unmapped_nullable_field_omits_it() {
    let schema = ModelSchema::new("CouldBeCharming")
        .field(FieldSpec::new("id", FieldKind::Auto))
        .field(FieldSpec::new("charm", charm()).nullable());
    let strategy = StrategyTable::default().model_strategy(&schema).unwrap();
    assert_eq!(strategy.field_names().count(), 0);

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let parameter = strategy.draw_parameter(&mut rng);
    assert!(strategy.produce(&mut rng, &parameter).is_empty());
}

#[test]
fn test_foreign_keys_reference_non_negative_ids() {
    let schema = ModelSchema::new("Shop")
        .field(FieldSpec::new("name", FieldKind::Char).max_length(100))
        .field(FieldSpec::new("company", FieldKind::ForeignKey("Company".to_string())));
    let strategy = StrategyTable::default().model_strategy(&schema).unwrap();

    let mut source = ExampleSource::builder()
        .entropy(ChaCha8Rng::seed_from_u64(3))
        .strategy(strategy)
        .build()
        .unwrap();
    for _ in 0..100 {
        let shop = source.pull().unwrap().unwrap();
        match shop["company"] {
            FieldValue::Int(id) => assert!(id >= 0),
            ref other => panic!("unexpected company {:?}", other),
        }
    }
}

#[test]
fn test_good_records_are_replayed_from_the_database() {
    let strategy = StrategyTable::default().model_strategy(&customer()).unwrap();
    let db = ExampleDatabase::in_memory().unwrap();

    let mut kept = Vec::new();
    {
        let mut source = ExampleSource::builder()
            .entropy(ChaCha8Rng::seed_from_u64(21))
            .strategy(strategy.clone())
            .storage(db.storage_for(strategy.clone()))
            .build()
            .unwrap();
        for _ in 0..30 {
            let record = source.pull().unwrap().unwrap();
            if record["gender"] == FieldValue::Null {
                source.mark_good().unwrap();
                kept.push(record);
            } else {
                source.mark_bad().unwrap();
            }
        }
    }

    let replayed: Vec<_> = db
        .storage_for(strategy.clone())
        .fetch()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(replayed.len(), kept.len());
    for record in &replayed {
        assert!(kept.contains(record));
        assert_eq!(record["gender"], FieldValue::Null);
    }
}
