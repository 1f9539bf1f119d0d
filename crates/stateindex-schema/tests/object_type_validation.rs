use stateindex_schema::{
    Field, Kind, ObjectKey, ObjectType, ObjectUpdate, ObjectValue, SchemaError, Value,
    ValueUpdates,
};

fn object1() -> ObjectType {
    ObjectType::new("object1").with_key_field(Field::new("field1", Kind::String))
}

fn object2() -> ObjectType {
    ObjectType::new("object2")
        .with_key_field(Field::new("field1", Kind::String))
        .with_key_field(Field::new("field2", Kind::Int32))
}

fn object3() -> ObjectType {
    ObjectType::new("object3")
        .with_value_field(Field::new("field1", Kind::String))
        .with_value_field(Field::new("field2", Kind::Int32))
}

fn object4() -> ObjectType {
    ObjectType::new("object4")
        .with_key_field(Field::new("field1", Kind::Int32))
        .with_value_field(Field::new("field2", Kind::String))
}

fn check(result: Result<(), SchemaError>, err_contains: &str, case: &str) {
    match (result, err_contains) {
        (Ok(()), "") => {}
        (Err(e), "") => panic!("{case}: unexpected error: {e}"),
        (Ok(()), want) => panic!("{case}: expected error containing {want:?}, got Ok"),
        (Err(e), want) => assert!(
            e.to_string().contains(want),
            "{case}: expected error containing {want:?}, got: {e}"
        ),
    }
}

#[test]
fn validate_object_type() {
    let cases = [
        ("valid object type", object1(), ""),
        (
            "empty object type name",
            ObjectType::new("").with_key_field(Field::new("field1", Kind::String)),
            "object type name cannot be empty",
        ),
        (
            "invalid key field",
            ObjectType::new("object1").with_key_field(Field::new("", Kind::String)),
            "field name cannot be empty",
        ),
        (
            "invalid value field",
            ObjectType::new("object1").with_value_field(Field::new("", Kind::String)),
            "field name cannot be empty",
        ),
        (
            "unrecognized kind",
            ObjectType::new("object1").with_value_field(Field::new("f", Kind::Invalid)),
            "not a valid field kind",
        ),
        ("no fields", ObjectType::new("object0"), "has no key or value fields"),
        (
            "duplicate key field",
            object1().with_key_field(Field::new("field1", Kind::Int64)),
            "duplicate key field",
        ),
    ];

    for (case, object_type, err) in cases {
        check(object_type.validate(), err, case);
    }
}

#[test]
fn empty_name_is_reported_before_field_errors() {
    let t = ObjectType::new("").with_key_field(Field::new("", Kind::Invalid));
    assert_eq!(t.validate(), Err(SchemaError::EmptyTypeName));
}

#[test]
fn validate_key() {
    let cases: Vec<(&str, ObjectType, ObjectKey, &str)> = vec![
        ("no key fields", object3(), ObjectKey::None, ""),
        (
            "no key fields, anything goes",
            object3(),
            ObjectKey::Composite(vec![Value::Bool(true), Value::Null]),
            "",
        ),
        ("single key field, valid", object1(), Value::from("hello").into(), ""),
        (
            "single key field, invalid",
            object1(),
            vec![Value::from("value")].into(),
            "invalid value",
        ),
        (
            "single key field, wrong kind",
            object1(),
            Value::Int32(1).into(),
            "invalid value",
        ),
        (
            "multiple key fields, valid",
            object2(),
            vec![Value::from("hello"), Value::Int32(42)].into(),
            "",
        ),
        (
            "multiple key fields, not a slice",
            object2(),
            Value::from("hello").into(),
            "expected slice of values",
        ),
        (
            "multiple key fields, wrong number of values",
            object2(),
            vec![Value::from("hello")].into(),
            "expected 2 key fields",
        ),
        (
            "multiple key fields, invalid value",
            object2(),
            vec![Value::from("hello"), Value::from("abc")].into(),
            "invalid value",
        ),
    ];

    for (case, object_type, key, err) in cases {
        check(object_type.validate_key(&key), err, case);
    }
}

#[test]
fn composite_key_error_identifies_position() {
    let err = object2()
        .validate_key(&vec![Value::from("hello"), Value::from("abc")].into())
        .unwrap_err();
    assert!(matches!(
        err,
        SchemaError::InvalidValueAt { position: 1, ref field, .. } if field == "field2"
    ));
}

#[test]
fn numeric_string_is_not_an_int32() {
    let err = object4()
        .validate_key(&Value::from("123").into())
        .unwrap_err();
    assert!(err.to_string().contains("expected int32"));
}

#[test]
fn validate_value() {
    let single = ObjectType::new("single").with_value_field(Field::new("field1", Kind::String));

    let cases: Vec<(&str, ObjectType, ObjectValue, &str)> = vec![
        (
            "no value fields",
            ObjectType::new("object0").with_key_field(Field::new("k", Kind::Bool)),
            ObjectValue::None,
            "",
        ),
        ("single value field, valid", single.clone(), Value::from("hello").into(), ""),
        (
            "single value field, invalid",
            single.clone(),
            Value::Int64(1).into(),
            "expected string",
        ),
        ("value updates, empty", object3(), ValueUpdates::new().into(), ""),
        (
            "value updates, 1 field valid",
            object3(),
            ValueUpdates::new().with("field1", "hello").into(),
            "",
        ),
        (
            "value updates, 2 fields, 1 invalid",
            object3(),
            ValueUpdates::new()
                .with("field1", "hello")
                .with("field2", "abc")
                .into(),
            "expected int32",
        ),
        (
            "value updates, extra value",
            object3(),
            ValueUpdates::new()
                .with("field1", "hello")
                .with("field2", Value::Int32(42))
                .with("field3", "extra")
                .into(),
            "unexpected values",
        ),
        (
            "value updates on a single value field",
            single,
            ValueUpdates::new().with("field1", "hello").into(),
            "",
        ),
        (
            "multiple value fields, full tuple",
            object3(),
            vec![Value::from("hello"), Value::Int32(1)].into(),
            "",
        ),
        (
            "multiple value fields, wrong arity",
            object3(),
            vec![Value::from("hello")].into(),
            "expected 2 value fields",
        ),
    ];

    for (case, object_type, value, err) in cases {
        check(object_type.validate_value(&value), err, case);
    }
}

#[test]
fn validate_object_update() {
    let cases: Vec<(&str, ObjectType, ObjectUpdate, &str)> = vec![
        (
            "wrong name",
            object1(),
            ObjectUpdate::set("object2", Value::from("hello"), ObjectValue::None),
            "does not match update type name",
        ),
        (
            "wrong name wins over bad key",
            object1(),
            ObjectUpdate::set("object2", Value::Int32(1), ObjectValue::None),
            "does not match update type name",
        ),
        (
            "invalid key",
            object1(),
            ObjectUpdate::set("object1", Value::Int32(123), ObjectValue::None),
            "invalid value",
        ),
        (
            "valid update",
            object4(),
            ObjectUpdate::set("object4", Value::Int32(123), Value::from("hello")),
            "",
        ),
        (
            "valid deletion",
            object4(),
            ObjectUpdate {
                type_name: "object4".into(),
                key: Value::Int32(123).into(),
                value: Value::Bool(false).into(),
                delete: true,
            },
            "",
        ),
        (
            "invalid value on update",
            object4(),
            ObjectUpdate::set("object4", Value::Int32(123), Value::Bool(false)),
            "expected string",
        ),
    ];

    for (case, object_type, update, err) in cases {
        check(object_type.validate_object_update(&update), err, case);
    }
}

#[test]
fn object_update_serde_roundtrip() {
    let update = ObjectUpdate::set(
        "object3",
        ObjectKey::None,
        ValueUpdates::new().with("field2", Value::Int32(7)),
    );
    let json = serde_json::to_string(&update).unwrap();
    let back: ObjectUpdate = serde_json::from_str(&json).unwrap();
    assert_eq!(back, update);
    assert!(object3().validate_object_update(&back).is_ok());
}
