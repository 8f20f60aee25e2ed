use data_vision::cell::{CellValue, coerce, key_of, parse_numeric_literal};
use serde_json::json;

fn sample_values() -> Vec<CellValue> {
    vec![
        CellValue::Null,
        CellValue::Bool(true),
        CellValue::Bool(false),
        CellValue::Number(42.0),
        CellValue::Number(-0.5),
        CellValue::Number(f64::NAN),
        CellValue::Number(f64::INFINITY),
        CellValue::Text("12".to_string()),
        CellValue::Text(" 3.5 ".to_string()),
        CellValue::Text("1e3".to_string()),
        CellValue::Text("0x10".to_string()),
        CellValue::Text("-Infinity".to_string()),
        CellValue::Text("".to_string()),
        CellValue::Text("2024-01-05".to_string()),
        CellValue::Text("abc".to_string()),
    ]
}

// Test numeric coercion of every cell variant
#[test]
fn test_coercion_rules() {
    assert_eq!(CellValue::Null.to_number(), 0.0);
    assert_eq!(CellValue::Bool(true).to_number(), 1.0);
    assert_eq!(CellValue::Bool(false).to_number(), 0.0);
    assert_eq!(CellValue::Number(42.0).to_number(), 42.0);
    assert_eq!(CellValue::Number(f64::NAN).to_number(), 0.0);
    assert_eq!(CellValue::Number(f64::INFINITY).to_number(), f64::INFINITY);
    assert_eq!(CellValue::Text("12".to_string()).to_number(), 12.0);
    assert_eq!(CellValue::Text(" 3.5 ".to_string()).to_number(), 3.5);
    assert_eq!(CellValue::Text("".to_string()).to_number(), 0.0);
    assert_eq!(CellValue::Text("2024-01-05".to_string()).to_number(), 0.0);
    assert_eq!(CellValue::Text("abc".to_string()).to_number(), 0.0);
    assert_eq!(CellValue::Text("12abc".to_string()).to_number(), 0.0);
}

#[test]
fn test_missing_cell_coerces_to_zero() {
    assert_eq!(coerce(None), 0.0);
    assert_eq!(coerce(Some(&CellValue::Number(7.0))), 7.0);
}

// coerce(coerce(x)) == coerce(x)
#[test]
fn test_coercion_is_idempotent() {
    for value in sample_values() {
        let once = value.to_number();
        let twice = CellValue::Number(once).to_number();
        assert_eq!(once.to_bits(), twice.to_bits(), "not idempotent for {:?}", value);
        assert!(!once.is_nan(), "coercion produced NaN for {:?}", value);
    }
}

#[test]
fn test_numeric_literals() {
    assert_eq!(parse_numeric_literal("1e3"), Some(1000.0));
    assert_eq!(parse_numeric_literal("-2.5E-1"), Some(-0.25));
    assert_eq!(parse_numeric_literal(".5"), Some(0.5));
    assert_eq!(parse_numeric_literal("5."), Some(5.0));
    assert_eq!(parse_numeric_literal("+7"), Some(7.0));
    assert_eq!(parse_numeric_literal("   "), Some(0.0));
    assert_eq!(parse_numeric_literal("Infinity"), Some(f64::INFINITY));
    assert_eq!(parse_numeric_literal("-Infinity"), Some(f64::NEG_INFINITY));
    assert_eq!(parse_numeric_literal("0xff"), Some(255.0));
    assert_eq!(parse_numeric_literal("0o17"), Some(15.0));
    assert_eq!(parse_numeric_literal("0b101"), Some(5.0));

    // Words Rust would accept but a spreadsheet would not
    assert_eq!(parse_numeric_literal("inf"), None);
    assert_eq!(parse_numeric_literal("NaN"), None);
    assert_eq!(parse_numeric_literal("1,000"), None);
    assert_eq!(parse_numeric_literal("."), None);
}

// Test canonical stringification used for group keys
#[test]
fn test_group_keys() {
    assert_eq!(CellValue::Number(5.0).to_key(), "5");
    assert_eq!(CellValue::Text("5".to_string()).to_key(), "5");
    assert_eq!(CellValue::Number(-0.0).to_key(), "0");
    assert_eq!(CellValue::Number(0.1).to_key(), "0.1");
    assert_eq!(CellValue::Number(-12.75).to_key(), "-12.75");
    assert_eq!(CellValue::Number(f64::NAN).to_key(), "NaN");
    assert_eq!(CellValue::Number(f64::NEG_INFINITY).to_key(), "-Infinity");
    assert_eq!(CellValue::Bool(false).to_key(), "false");
    assert_eq!(CellValue::Null.to_key(), "");
    assert_eq!(key_of(None), "");
}

#[test]
fn test_group_keys_switch_to_exponent_form() {
    assert_eq!(CellValue::Number(1e21).to_key(), "1e+21");
    assert_eq!(CellValue::Number(-1.5e25).to_key(), "-1.5e+25");
    assert_eq!(CellValue::Number(1e-7).to_key(), "1e-7");
    assert_eq!(CellValue::Number(2.5e-9).to_key(), "2.5e-9");

    // Inside the plain range the digits are written out
    assert_eq!(CellValue::Number(1e20).to_key(), "100000000000000000000");
    assert_eq!(CellValue::Number(0.000001).to_key(), "0.000001");
}

#[test]
fn test_json_shape() {
    let values: Vec<CellValue> =
        serde_json::from_value(json!([null, true, 1.5, 3, "x"])).unwrap();
    assert_eq!(
        values,
        vec![
            CellValue::Null,
            CellValue::Bool(true),
            CellValue::Number(1.5),
            CellValue::Number(3.0),
            CellValue::Text("x".to_string()),
        ]
    );

    let encoded = serde_json::to_value(&values).unwrap();
    assert_eq!(encoded, json!([null, true, 1.5, 3.0, "x"]));
}

#[test]
fn test_falsy_values() {
    assert!(CellValue::Null.is_falsy());
    assert!(CellValue::Bool(false).is_falsy());
    assert!(CellValue::Number(0.0).is_falsy());
    assert!(CellValue::Number(f64::NAN).is_falsy());
    assert!(CellValue::Text(String::new()).is_falsy());

    assert!(!CellValue::Bool(true).is_falsy());
    assert!(!CellValue::Number(2024.0).is_falsy());
    assert!(!CellValue::Text("0".to_string()).is_falsy());
}
