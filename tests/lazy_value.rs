use cbor_skipscan::{
    BigNum, ByteSource, CborError, Codec, ErrorCode, LazyValue, Number, Predicate, TagDecoder,
    TagValue, Value, ValueType,
};

#[test]
fn null_answers_every_extractor_with_none() {
    let bytes = [0xf6];
    let codec = Codec::new();
    let v = LazyValue::at(&bytes, &codec, 0).unwrap();
    assert!(v.is_null());
    assert_eq!(v.value_type(), ValueType::Null);
    assert!(v.number().unwrap().is_none());
    assert!(v.integer().unwrap().is_none());
    assert!(v.float().unwrap().is_none());
    assert!(v.string().unwrap().is_none());
    assert!(v.bytes().unwrap().is_none());
    assert!(v.bool().unwrap().is_none());
    assert!(v.sequence().unwrap().is_none());
    assert!(v.dictionary().unwrap().is_none());
    assert!(v.tag().unwrap().is_none());
    assert!(v.tag_number().unwrap().is_none());
    assert!(v.tagged().unwrap().is_none());
    assert_eq!(v.to_value().unwrap(), Value::Null);
}

#[test]
fn wrong_type_is_a_mismatch_with_both_names() {
    // [1]
    let bytes = [0x81, 0x01];
    let codec = Codec::new();
    let v = LazyValue::at(&bytes, &codec, 0).unwrap();

    let err = v.dictionary().unwrap_err();
    assert_eq!(
        err,
        CborError::type_mismatch(ValueType::Dictionary, ValueType::Sequence, 0)
    );
    assert_eq!(
        err.to_string(),
        "cbor type mismatch at 0: expected dictionary, found sequence"
    );
    assert!(v.string().unwrap_err().is_type_mismatch());
    assert!(v.number().unwrap_err().is_type_mismatch());
    assert!(v.bool().unwrap_err().is_type_mismatch());
}

#[test]
fn numbers() {
    // [-10, 2.5, 2(h'010000000000000000'), 3(h'00')]
    let bytes = [
        0x84, 0x29, 0xf9, 0x41, 0x00, 0xc2, 0x49, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xc3, 0x41, 0x00,
    ];
    let codec = Codec::new();
    let seq = LazyValue::at(&bytes, &codec, 0)
        .unwrap()
        .sequence()
        .unwrap()
        .unwrap();
    assert_eq!(seq.len(), 4);

    let a = seq.get(0).unwrap().unwrap();
    assert_eq!(a.value_type(), ValueType::NInt);
    assert_eq!(a.integer().unwrap(), Some(-10));
    assert_eq!(a.float().unwrap(), Some(-10.0));

    let b = seq.get(1).unwrap().unwrap();
    assert_eq!(b.number().unwrap(), Some(Number::Float(2.5)));
    assert!(b.integer().unwrap_err().is_type_mismatch());

    let c = seq.get(2).unwrap().unwrap();
    assert_eq!(c.value_type(), ValueType::UBigNum);
    assert_eq!(c.integer().unwrap(), Some(18_446_744_073_709_551_616));
    assert_eq!(
        c.tag().unwrap(),
        Some(TagValue::BigNum(BigNum::new(false, vec![1, 0, 0, 0, 0, 0, 0, 0, 0])))
    );

    let d = seq.get(3).unwrap().unwrap();
    assert_eq!(d.value_type(), ValueType::NBigNum);
    assert_eq!(d.integer().unwrap(), Some(-1));

    assert!(seq.get(4).unwrap().is_none());
}

#[test]
fn strings() {
    // ["hé", h'6869', (_ "a", "b"), h'ff']
    let bytes = [
        0x84, 0x63, b'h', 0xc3, 0xa9, 0x42, b'h', b'i', 0x7f, 0x61, b'a', 0x61, b'b', 0xff, 0x41,
        0xff,
    ];
    let codec = Codec::new();
    let seq = LazyValue::at(&bytes, &codec, 0)
        .unwrap()
        .sequence()
        .unwrap()
        .unwrap();
    let items: Vec<LazyValue<'_>> = seq.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(items.len(), 4);

    assert_eq!(items[0].string().unwrap().unwrap(), "hé");
    assert_eq!(items[1].value_type(), ValueType::ByteString);
    assert_eq!(items[1].string().unwrap().unwrap(), "hi");
    assert_eq!(items[1].bytes().unwrap().unwrap().as_ref(), b"hi");
    assert_eq!(items[2].string().unwrap().unwrap(), "ab");
    assert_eq!(
        items[3].string().unwrap_err().code,
        ErrorCode::Utf8Invalid
    );
    assert_eq!(items[3].raw().unwrap(), &[0x41, 0xff]);
}

#[test]
fn dictionary_views() {
    // {_ "a": 1, "b": [true], 7: null}
    let bytes = [
        0xbf, 0x61, b'a', 0x01, 0x61, b'b', 0x81, 0xf5, 0x07, 0xf6, 0xff,
    ];
    let codec = Codec::new();
    let v = LazyValue::at(&bytes, &codec, 0).unwrap();
    assert_eq!(v.byte_len().unwrap(), 11);

    let d = v.dictionary().unwrap().unwrap();
    assert_eq!(d.len(), 3);
    assert!(!d.is_empty());

    let b = d.get_text("b").unwrap().unwrap();
    assert_eq!(b.offset(), 6);
    let first = b.sequence().unwrap().unwrap().get(0).unwrap().unwrap();
    assert_eq!(first.bool().unwrap(), Some(true));

    let seven = d.get(&Predicate::from(7i64)).unwrap().unwrap();
    assert!(seven.is_null());
    assert!(d.get_text("zz").unwrap().is_none());

    let keys: Vec<Value> = d
        .iter()
        .unwrap()
        .map(|e| e.unwrap().0.to_value().unwrap())
        .collect();
    assert_eq!(
        keys,
        vec![Value::from("a"), Value::from("b"), Value::Integer(7)]
    );
}

#[test]
fn relocate_rebinds_view() {
    // [1, "x"]
    let bytes = [0x82, 0x01, 0x61, b'x'];
    let codec = Codec::new();
    let mut v = LazyValue::at(&bytes, &codec, 1).unwrap();
    assert_eq!(v.integer().unwrap(), Some(1));
    v.relocate(2).unwrap();
    assert_eq!(v.value_type(), ValueType::TextString);
    assert_eq!(v.string().unwrap().unwrap(), "x");

    // relocating onto a break byte fails and leaves the view alone
    let bytes = [0x9f, 0x01, 0xff];
    let mut v = LazyValue::at(&bytes, &codec, 1).unwrap();
    assert_eq!(v.relocate(2).unwrap_err().code, ErrorCode::UnexpectedBreak);
    assert_eq!(v.offset(), 1);
}

#[test]
fn built_in_tags() {
    // [0("2013-03-21T20:04:00Z"), 32("a:b"), 1(1363896240), 24(h'01'), 99("x")]
    let mut bytes = vec![0x85, 0xc0, 0x74];
    bytes.extend_from_slice(b"2013-03-21T20:04:00Z");
    bytes.extend_from_slice(&[0xd8, 0x20, 0x63, b'a', b':', b'b']);
    bytes.extend_from_slice(&[0xc1, 0x1a, 0x51, 0x4b, 0x67, 0xb0]);
    bytes.extend_from_slice(&[0xd8, 0x18, 0x41, 0x01]);
    bytes.extend_from_slice(&[0xd8, 0x63, 0x61, b'x']);

    let codec = Codec::new();
    let seq = LazyValue::at(&bytes, &codec, 0)
        .unwrap()
        .sequence()
        .unwrap()
        .unwrap();
    let items: Vec<LazyValue<'_>> = seq.iter().unwrap().map(Result::unwrap).collect();

    assert_eq!(items[0].value_type(), ValueType::DateTime);
    assert_eq!(items[0].string().unwrap().unwrap(), "2013-03-21T20:04:00Z");
    assert_eq!(items[1].value_type(), ValueType::Uri);
    assert_eq!(items[1].tag().unwrap(), Some(TagValue::Uri("a:b".into())));
    assert_eq!(
        items[2].tag().unwrap(),
        Some(TagValue::Timestamp(Number::Integer(1_363_896_240)))
    );
    assert_eq!(items[3].tag().unwrap(), Some(TagValue::Encoded(vec![0x01])));
    assert_eq!(items[4].value_type(), ValueType::Tag);
    assert_eq!(items[4].tag_number().unwrap(), Some(99));
    assert_eq!(
        items[4].tag().unwrap(),
        Some(TagValue::Other {
            tag: 99,
            value: Value::from("x"),
        })
    );
    let inner = items[4].tagged().unwrap().unwrap();
    assert_eq!(inner.string().unwrap().unwrap(), "x");
}

struct Celsius;

impl TagDecoder for Celsius {
    fn handles(&self, tag: u64) -> bool {
        tag == 1000
    }

    fn value_type(&self, _tag: u64) -> ValueType {
        ValueType::Float
    }

    fn decode(
        &self,
        codec: &Codec,
        src: &dyn ByteSource,
        offset: usize,
        _len: usize,
    ) -> Result<TagValue, CborError> {
        let inner = cbor_skipscan::tagged_offset(src, offset)?;
        Ok(TagValue::Other {
            tag: 1000,
            value: codec.decode(src, inner)?,
        })
    }
}

#[test]
fn custom_tag_decoders_are_consulted_first() {
    // 1000(21)
    let bytes = [0xd9, 0x03, 0xe8, 0x15];
    let codec = Codec::new().with_tag_decoder(Celsius);
    assert_eq!(codec.tags().len(), Codec::new().tags().len() + 1);

    let v = LazyValue::at(&bytes, &codec, 0).unwrap();
    assert_eq!(v.value_type(), ValueType::Float);
    assert_eq!(
        codec.decode_tag(&bytes, 0).unwrap(),
        TagValue::Other {
            tag: 1000,
            value: Value::Integer(21),
        }
    );

    let plain = Codec::new();
    assert_eq!(
        LazyValue::at(&bytes, &plain, 0).unwrap().value_type(),
        ValueType::Tag
    );
}

#[test]
fn type_hierarchy() {
    assert!(ValueType::UInt.matches(ValueType::Number));
    assert!(ValueType::NBigNum.matches(ValueType::Tag));
    assert!(ValueType::TextString.matches(ValueType::Any));
    assert!(!ValueType::Float.matches(ValueType::Int));
    assert_eq!(ValueType::from_name("dictionary"), Some(ValueType::Dictionary));

    let spec = cbor_skipscan::TypeSpec::parse("int?").unwrap();
    assert!(spec.is_nullable());
    assert!(spec.accepts(ValueType::NInt));
    assert!(!spec.accepts(ValueType::Float));
    assert!(cbor_skipscan::TypeSpec::parse("nope").is_none());
}
