//! Registry population and dynamic decoding.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use zero_pgtype::registry::TextLiteralCodec;
use zero_pgtype::{
    Composite, Error, FormatCode, FromRow, Oid, Opts, TypeRegistry, UnknownTypes, Value,
    WireValue, oid,
};

#[test]
fn test_unknown_type() {
    let registry = TypeRegistry::with_builtins();
    assert_eq!(
        registry.lookup(123_456).unwrap_err(),
        Error::UnknownType(123_456)
    );
    assert!(registry.lookup(123_456).unwrap_err().is_recoverable());
}

#[test]
fn test_catalog_registration() {
    let catalog: HashMap<String, Oid> = [
        ("citext".to_string(), 16_385),
        ("address".to_string(), 16_390),
    ]
    .into_iter()
    .collect();

    let mut registry = TypeRegistry::with_builtins();
    let citext = registry.register_from_catalog(
        &catalog,
        "citext",
        Arc::new(TextLiteralCodec::new("citext")),
    );
    assert_eq!(citext, Some(16_385));
    assert_eq!(
        registry.register_from_catalog(&catalog, "missing", Arc::new(TextLiteralCodec::new("x"))),
        None
    );

    registry.register_composite(
        16_390,
        "address",
        vec![
            ("street".to_string(), oid::TEXT),
            ("number".to_string(), oid::INT4),
            ("tags".to_string(), oid::TEXT_ARRAY),
        ],
    );
    let value = registry
        .decode(
            16_390,
            FormatCode::Text,
            Some(br#"("Main St",12,"{a,""b c""}")"#),
        )
        .unwrap();
    let Value::Composite(address) = &value else {
        panic!("expected a record, got {value:?}");
    };
    assert_eq!(address.get("street"), Some(&Value::Text("Main St".into())));
    assert_eq!(address.get("number"), Some(&Value::Int4(12)));
    let Some(Value::Array(tags)) = address.get("tags") else {
        panic!("expected an array, got {address:?}");
    };
    assert_eq!(tags.elements()[1].value, Value::Text("b c".into()));

    let mut buf = Vec::new();
    registry
        .encode_payload(&value, 16_390, FormatCode::Binary, &mut buf)
        .unwrap();
    let back = registry
        .decode(16_390, FormatCode::Binary, Some(&buf))
        .unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_raw_passthrough_round_trip() {
    let registry = TypeRegistry::with_builtins();
    let wire = WireValue::new(99_999, FormatCode::Binary, Some(&[0xDE, 0xAD]));
    let value = registry.decode_wire(&wire).unwrap();
    let mut buf = Vec::new();
    registry
        .encode(&value, oid::BYTEA, FormatCode::Binary, &mut buf)
        .unwrap();
    assert_eq!(buf, [0, 0, 0, 2, 0xDE, 0xAD]);

    let strict = TypeRegistry::from_opts(
        Opts::try_from("postgres://localhost/db?unknown_types=error").unwrap(),
    );
    assert_eq!(strict.opts().unknown_types, UnknownTypes::Error);
    assert_eq!(
        strict.decode_wire(&wire).unwrap_err(),
        Error::UnknownType(99_999)
    );
}

#[test]
fn test_anonymous_record_encodes_statically() {
    use zero_pgtype::ToWireValue;

    let record = Composite::new(oid::RECORD)
        .with_field("a", oid::INT4, 1)
        .with_field("b", oid::TEXT, "x y");
    let mut buf = Vec::new();
    record.to_text(oid::RECORD, &mut buf).unwrap();
    assert_eq!(buf, br#"(1,"x y")"#);
    assert!(record.to_text(oid::INT4, &mut Vec::new()).is_err());
}

#[test]
fn test_from_row() {
    let id = 42_i64.to_be_bytes();
    let row = [
        WireValue::new(oid::INT8, FormatCode::Binary, Some(&id)),
        WireValue::new(oid::TEXT, FormatCode::Text, Some(b"answer")),
        WireValue::new(oid::BOOL, FormatCode::Text, None),
    ];
    let (id, name, flag): (i64, &str, Option<bool>) = FromRow::from_row(&row).unwrap();
    assert_eq!(id, 42);
    assert_eq!(name, "answer");
    assert_eq!(flag, None);
}

#[test]
fn test_concurrent_decoding() {
    let registry = Arc::new(TypeRegistry::with_builtins());
    let handles: Vec<_> = (0..4)
        .map(|i: i32| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let text = format!("{{{i},{},NULL}}", i + 1);
                registry
                    .decode(oid::INT4_ARRAY, FormatCode::Text, Some(text.as_bytes()))
                    .unwrap()
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let Value::Array(array) = handle.join().unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(array.len(), 3);
        assert_eq!(array.elements()[0].value, Value::Int4(i as i32));
        assert!(array.elements()[2].is_null());
    }
}
