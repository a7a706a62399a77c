use cbor_skipscan::float::{f64_to_half_exact, half_to_f64, shortest, FloatWidth, HALF_NAN};
use cbor_skipscan::primitive::{
    decode_bool, decode_bytes, decode_float, decode_integer, decode_text, decode_unsigned,
    decode_value,
};
use cbor_skipscan::{BigNum, Encoder, ErrorCode, ErrorKind, LengthModel, Value, ValueType};

#[test]
fn integers_share_one_extraction_path() {
    assert_eq!(decode_integer(&[0x00], 0).unwrap(), 0);
    assert_eq!(decode_integer(&[0x20], 0).unwrap(), -1);
    // -100
    assert_eq!(decode_integer(&[0x38, 0x63], 0).unwrap(), -100);
    // -(2^64)
    let min = [0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
    assert_eq!(decode_integer(&min, 0).unwrap(), -18_446_744_073_709_551_616);
    let max = [0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
    assert_eq!(decode_unsigned(&max, 0).unwrap(), u64::MAX);

    let err = decode_unsigned(&[0x20], 0).unwrap_err();
    assert_eq!(
        err.code,
        ErrorCode::TypeMismatch {
            expected: ValueType::UInt,
            actual: ValueType::NInt,
        }
    );
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn floats_of_every_width() {
    assert_eq!(decode_float(&[0xf9, 0x3c, 0x00], 0).unwrap(), 1.0);
    assert_eq!(decode_float(&[0xf9, 0xc4, 0x00], 0).unwrap(), -4.0);
    assert!(decode_float(&[0xf9, 0x7c, 0x00], 0).unwrap().is_infinite());
    assert!(decode_float(&[0xf9, 0x7e, 0x00], 0).unwrap().is_nan());
    // smallest positive subnormal half
    assert_eq!(
        decode_float(&[0xf9, 0x00, 0x01], 0).unwrap(),
        5.960_464_477_539_063e-8
    );
    assert_eq!(
        decode_float(&[0xfa, 0x47, 0xc3, 0x50, 0x00], 0).unwrap(),
        100_000.0
    );
    assert_eq!(
        decode_float(&[0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a], 0).unwrap(),
        1.1
    );
    assert!(decode_float(&[0xf6], 0).unwrap_err().is_type_mismatch());
}

#[test]
fn float_width_selection() {
    assert_eq!(half_to_f64(0x3c00), 1.0);
    assert_eq!(f64_to_half_exact(1.5), Some(0x3e00));
    assert_eq!(f64_to_half_exact(1.1), None);
    assert_eq!(f64_to_half_exact(f64::NAN), Some(HALF_NAN));
    assert_eq!(shortest(0.5), FloatWidth::Half(0x3800));
    assert_eq!(shortest(100_000.0), FloatWidth::Single(100_000.0));
    assert_eq!(shortest(1.1), FloatWidth::Double(1.1));
}

#[test]
fn booleans_and_malformed_simples() {
    assert!(!decode_bool(&[0xf4], 0).unwrap());
    assert!(decode_bool(&[0xf5], 0).unwrap());
    assert_eq!(
        decode_bool(&[0xf6], 0).unwrap_err().code,
        ErrorCode::MalformedSimple
    );
    assert!(decode_bool(&[0x01], 0).unwrap_err().is_type_mismatch());
}

#[test]
fn definite_strings_borrow_indefinite_strings_concatenate() {
    let m = LengthModel::default();

    let bytes = [0x43, 0x01, 0x02, 0x03];
    let (payload, end) = decode_bytes(&m, &bytes, 0).unwrap();
    assert!(matches!(payload, std::borrow::Cow::Borrowed(_)));
    assert_eq!(&*payload, &[1, 2, 3]);
    assert_eq!(end, 4);

    // (_ "ab", "c")
    let bytes = [0x7f, 0x62, b'a', b'b', 0x61, b'c', 0xff];
    let (text, end) = decode_text(&m, &bytes, 0).unwrap();
    assert_eq!(text, "abc");
    assert_eq!(end, 7);

    // (_ h'01', "a")
    let bytes = [0x5f, 0x41, 0x01, 0x61, b'a', 0xff];
    let err = decode_bytes(&m, &bytes, 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::IllegalChunk);
    assert_eq!(err.offset, 3);
}

#[test]
fn invalid_utf8_is_rejected() {
    let bytes = [0x62, 0xc3, 0x28];
    let err = decode_text(&LengthModel::default(), &bytes, 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::Utf8Invalid);
}

#[test]
fn decode_value_consumes_exactly_one_item() {
    // {"a": [1, -1], "b": (_ h'00'), 0: 2(h'01')} followed by a trailing 0x00
    let bytes = [
        0xa3, 0x61, b'a', 0x82, 0x01, 0x20, 0x61, b'b', 0x5f, 0x41, 0x00, 0xff, 0x00, 0xc2, 0x41,
        0x01, 0x00,
    ];
    let m = LengthModel::default();
    let (v, end) = decode_value(&m, &bytes, 0).unwrap();
    assert_eq!(end, 16);
    assert_eq!(m.item_byte_size(&bytes, 0).unwrap(), 16);
    assert_eq!(
        v,
        Value::Dictionary(vec![
            (
                Value::from("a"),
                Value::Sequence(vec![Value::Integer(1), Value::Integer(-1)])
            ),
            (Value::from("b"), Value::Bytes(vec![0])),
            (
                Value::Integer(0),
                Value::Tag(2, Box::new(Value::Bytes(vec![1])))
            ),
        ])
    );
}

#[test]
fn encoder_uses_canonical_heads() {
    let mut e = Encoder::new();
    e.uint(24).unwrap();
    e.int(-25).unwrap();
    e.uint(1_000_000).unwrap();
    assert_eq!(
        e.as_bytes(),
        &[0x18, 0x18, 0x38, 0x18, 0x1a, 0x00, 0x0f, 0x42, 0x40]
    );
}

#[test]
fn encoder_strings_and_simples() {
    let mut e = Encoder::new();
    e.string("id").unwrap();
    e.string("é").unwrap();
    e.text("id").unwrap();
    e.simple(16).unwrap();
    e.simple(255).unwrap();
    assert_eq!(
        e.as_bytes(),
        &[0x42, b'i', b'd', 0x62, 0xc3, 0xa9, 0x62, b'i', b'd', 0xf0, 0xf8, 0xff]
    );

    let err = e.simple(24).unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedSimple);
}

#[test]
fn simple_values_never_alias_literals() {
    let mut e = Encoder::new();
    e.simple(19).unwrap();
    for v in 20..=23 {
        let err = e.simple(v).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedSimple, "simple({v})");
    }
    assert_eq!(e.as_bytes(), &[0xf3]);

    // simple(20) would otherwise read back as `false`
    let err = Value::Simple(20).encode().unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedSimple);

    let bytes = Value::Simple(19).encode().unwrap();
    let (back, _) = decode_value(&LengthModel::default(), &bytes, 0).unwrap();
    assert_eq!(back, Value::Simple(19));
}

#[test]
fn encoder_capacity_reservation_reports_failure() {
    let e = Encoder::with_capacity(64).unwrap();
    assert!(e.is_empty());

    let err = Encoder::with_capacity(usize::MAX).unwrap_err();
    assert_eq!(err.code, ErrorCode::AllocationFailed);
}

#[test]
fn encoder_floats_take_shortest_width() {
    let mut e = Encoder::new();
    e.float(1.5).unwrap();
    e.float(100_000.0).unwrap();
    e.float(1.1).unwrap();
    assert_eq!(
        e.into_vec(),
        vec![
            0xf9, 0x3e, 0x00, 0xfa, 0x47, 0xc3, 0x50, 0x00, 0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99,
            0x99, 0x99, 0x9a
        ]
    );
}

#[test]
fn encoder_containers_check_counts() {
    let mut e = Encoder::new();
    let err = e
        .sequence(2, |s| {
            s.int(1)?;
            s.int(2)?;
            s.int(3)
        })
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SequenceLenMismatch);
    assert_eq!(err.kind(), ErrorKind::Encode);
    assert!(e.is_empty());

    let err = e.dictionary(2, |d| d.text_entry("a", |v| v.null())).unwrap_err();
    assert_eq!(err.code, ErrorCode::DictionaryLenMismatch);
    assert!(e.is_empty());

    e.indefinite_sequence(|s| {
        s.int(1)?;
        s.element(|v| v.indefinite_text(&["a", "b"]))
    })
    .unwrap();
    assert_eq!(
        e.as_bytes(),
        &[0x9f, 0x01, 0x7f, 0x61, b'a', 0x61, b'b', 0xff, 0xff]
    );
}

#[test]
fn wide_integers_become_bignums() {
    let mut e = Encoder::new();
    e.integer(i128::from(u64::MAX) + 1).unwrap();
    assert_eq!(
        e.as_bytes(),
        &[0xc2, 0x49, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
    let b = BigNum::from_i128(-(i128::from(u64::MAX)) - 2);
    assert!(b.is_negative());
    assert_eq!(b.to_i128(), Some(-(i128::from(u64::MAX)) - 2));
}

#[test]
fn encoder_writes_into_fixed_sinks() {
    let mut buf = [0u8; 2];
    let mut e = Encoder::on(&mut buf[..]);
    e.uint(1).unwrap();
    let err = e.text("ab").unwrap_err();
    assert_eq!(err.code, ErrorCode::OutOfRange);
}

#[test]
fn value_encoding_round_trips() {
    let v = Value::Dictionary(vec![
        (Value::from("n"), Value::Integer(-300)),
        (Value::from("f"), Value::Float(0.25)),
        (
            Value::from("s"),
            Value::Sequence(vec![Value::Bool(true), Value::Null, Value::Undefined]),
        ),
        (Value::Integer(7), Value::Bytes(vec![0xde, 0xad])),
        (Value::from("t"), Value::Tag(32, Box::new(Value::from("x:y")))),
        (Value::from("simple"), Value::Simple(99)),
    ]);
    let bytes = v.encode().unwrap();
    let (back, end) = decode_value(&LengthModel::default(), &bytes, 0).unwrap();
    assert_eq!(back, v);
    assert_eq!(end, bytes.len());
}
