use crate::error::Error;
use crate::value::FromText;

#[test]
fn integers() {
    assert_eq!(i8::from_text(b"-128").unwrap(), -128);
    assert_eq!(i16::from_text(b"32767").unwrap(), 32767);
    assert_eq!(i32::from_text(b"42").unwrap(), 42);
    assert_eq!(i64::from_text(b"-9223372036854775808").unwrap(), i64::MIN);
}

#[test]
fn integer_out_of_range() {
    assert!(matches!(i8::from_text(b"128"), Err(Error::ParseIntError(_))));
    assert!(matches!(i32::from_text(b"4294967296"), Err(Error::ParseIntError(_))));
}

#[test]
fn integer_garbage() {
    assert!(matches!(i32::from_text(b"abc"), Err(Error::ParseIntError(_))));
    assert!(matches!(i64::from_text(b""), Err(Error::ParseIntError(_))));
    assert!(matches!(i64::from_text(b" 1"), Err(Error::ParseIntError(_))));
    // DECIMAL text is not an integer
    assert!(matches!(i64::from_text(b"1.50"), Err(Error::ParseIntError(_))));
}

#[test]
fn floats() {
    assert_eq!(f64::from_text(b"1.5").unwrap(), 1.5);
    assert_eq!(f64::from_text(b"-2e3").unwrap(), -2000.0);
    assert_eq!(f32::from_text(b"0.25").unwrap(), 0.25);
    assert!(matches!(f64::from_text(b"1,5"), Err(Error::ParseFloatError(_))));
}

#[test]
fn booleans() {
    assert!(bool::from_text(b"1").unwrap());
    assert!(bool::from_text(b"true").unwrap());
    assert!(!bool::from_text(b"0").unwrap());
    assert!(!bool::from_text(b"false").unwrap());

    for text in [&b"TRUE"[..], b"2", b"yes", b""] {
        assert!(matches!(bool::from_text(text), Err(Error::ParseBoolError(_))));
    }
}

#[test]
fn strings() {
    assert_eq!(String::from_text(b"Rex").unwrap(), "Rex");
    assert_eq!(String::from_text("Größe".as_bytes()).unwrap(), "Größe");
    assert_eq!(String::from_text(b"").unwrap(), "");
    assert!(matches!(
        String::from_text(&[0x66, 0xFF, 0x6F]),
        Err(Error::Utf8Error(_))
    ));
}

#[test]
fn bytes_are_not_validated() {
    assert_eq!(Vec::<u8>::from_text(&[0xFF, 0x00]).unwrap(), vec![0xFF, 0x00]);
}

#[test]
fn invalid_utf8_number() {
    assert!(matches!(i32::from_text(&[0xC3, 0x28]), Err(Error::Utf8Error(_))));
}

#[test]
fn coercion_failures_keep_connection() {
    let err = i32::from_text(b"abc").unwrap_err();
    assert!(!err.is_conn_broken());
    let err = bool::from_text(b"maybe").unwrap_err();
    assert!(!err.is_conn_broken());
}

#[test]
fn float_overflow() {
    assert!(matches!(f32::from_text(b"1e40"), Err(Error::FloatOutOfRange(_))));
    assert!(matches!(f32::from_text(b"-3.5e38"), Err(Error::FloatOutOfRange(_))));
    assert!(matches!(f64::from_text(b"1e400"), Err(Error::FloatOutOfRange(_))));
    // still in range for the wider type
    assert_eq!(f64::from_text(b"1e40").unwrap(), 1e40);
}

#[test]
fn spelled_out_infinity() {
    assert_eq!(f32::from_text(b"inf").unwrap(), f32::INFINITY);
    assert_eq!(f64::from_text(b"-Infinity").unwrap(), f64::NEG_INFINITY);
    assert_eq!(f64::from_text(b"+INF").unwrap(), f64::INFINITY);
}
