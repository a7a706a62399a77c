use cbor_skipscan::{read_argument, DecodeLimits, ErrorCode, LengthModel, ValueType};

#[test]
fn definite_items() {
    let m = LengthModel::default();

    // 1000
    assert_eq!(m.item_byte_size(&[0x19, 0x03, 0xe8], 0).unwrap(), 3);
    // "abc"
    assert_eq!(m.item_byte_size(&[0x63, b'a', b'b', b'c'], 0).unwrap(), 4);
    // {1: 2, 3: 4}
    let dict = [0xa2, 0x01, 0x02, 0x03, 0x04];
    assert_eq!(m.item_byte_size(&dict, 0).unwrap(), 5);
    assert_eq!(m.element_count(&dict, 0, ValueType::Dictionary).unwrap(), 2);
    // 2(h'0100')
    assert_eq!(m.item_byte_size(&[0xc2, 0x42, 0x01, 0x00], 0).unwrap(), 4);
    // 1.5 as half float
    assert_eq!(m.item_byte_size(&[0xf9, 0x3e, 0x00], 0).unwrap(), 3);
}

#[test]
fn indefinite_sequence_size_and_count() {
    // [_ 1, [2, 3], [4, 5]]
    let bytes = [0x9f, 0x01, 0x82, 0x02, 0x03, 0x82, 0x04, 0x05, 0xff];
    let m = LengthModel::default();
    assert_eq!(m.item_byte_size(&bytes, 0).unwrap(), 9);
    assert_eq!(m.element_count(&bytes, 0, ValueType::Sequence).unwrap(), 3);
    assert_eq!(m.skip(&bytes, 2).unwrap(), 5);
    assert_eq!(m.skip_items(&bytes, 1, 2).unwrap(), 5);
}

#[test]
fn indefinite_dictionary_counts_pairs() {
    // {_ "a": 1, "b": 2}
    let bytes = [0xbf, 0x61, b'a', 0x01, 0x61, b'b', 0x02, 0xff];
    let m = LengthModel::default();
    assert_eq!(m.item_byte_size(&bytes, 0).unwrap(), 8);
    assert_eq!(m.element_count(&bytes, 0, ValueType::Any).unwrap(), 2);
}

#[test]
fn odd_indefinite_dictionary_is_rejected() {
    // {_ 1 }
    let bytes = [0xbf, 0x01, 0xff];
    let m = LengthModel::default();
    let err = m.element_count(&bytes, 0, ValueType::Dictionary).unwrap_err();
    assert_eq!(err.code, ErrorCode::OddDictionary);
    assert_eq!(err.offset, 0);
    assert_eq!(
        m.item_byte_size(&bytes, 0).unwrap_err().code,
        ErrorCode::OddDictionary
    );
}

#[test]
fn indefinite_strings_sum_their_chunks() {
    // (_ h'0102', h'03')
    let bytes = [0x5f, 0x42, 0x01, 0x02, 0x41, 0x03, 0xff];
    assert_eq!(LengthModel::default().item_byte_size(&bytes, 0).unwrap(), 7);

    // (_ "ab", "")
    let bytes = [0x7f, 0x62, b'a', b'b', 0x60, 0xff];
    assert_eq!(LengthModel::default().item_byte_size(&bytes, 0).unwrap(), 6);
}

#[test]
fn mismatched_chunk_is_illegal() {
    // (_ "a") inside a byte string
    let bytes = [0x5f, 0x61, b'a', 0xff];
    let err = LengthModel::default().item_byte_size(&bytes, 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::IllegalChunk);
    assert_eq!(err.offset, 1);

    // nested indefinite chunk
    let bytes = [0x5f, 0x5f, 0xff, 0xff];
    let err = LengthModel::default().item_byte_size(&bytes, 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::IllegalChunk);
}

#[test]
fn eight_byte_string_length_is_unsupported() {
    let bytes = [0x5b, 0, 0, 0, 0, 0, 0, 0, 1, 0xaa];
    let err = LengthModel::default().item_byte_size(&bytes, 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedLength);
    assert_eq!(err.offset, 0);
}

#[test]
fn reserved_and_truncated_headers() {
    let m = LengthModel::default();
    assert_eq!(
        m.item_byte_size(&[0x1c], 0).unwrap_err().code,
        ErrorCode::ReservedAdditionalInfo
    );
    // "ab" with one payload byte
    assert_eq!(
        m.item_byte_size(&[0x62, b'a'], 0).unwrap_err().code,
        ErrorCode::OutOfRange
    );
    // two-byte argument with one byte present
    assert_eq!(
        m.item_byte_size(&[0x19, 0x01], 0).unwrap_err().code,
        ErrorCode::OutOfRange
    );
    // indefinite integer
    assert_eq!(
        m.item_byte_size(&[0x1f], 0).unwrap_err().code,
        ErrorCode::IllegalIndefinite
    );
    // missing break
    assert_eq!(
        m.item_byte_size(&[0x9f, 0x01], 0).unwrap_err().code,
        ErrorCode::OutOfRange
    );
}

#[test]
fn head_byte_sizes() {
    let m = LengthModel::default();
    assert_eq!(m.head_byte_size(&[0x17], 0).unwrap(), 1);
    assert_eq!(m.head_byte_size(&[0x38, 0x63], 0).unwrap(), 2);
    assert_eq!(m.head_byte_size(&[0xfb, 0, 0, 0, 0, 0, 0, 0, 0], 0).unwrap(), 9);
}

#[test]
fn depth_limit_bounds_recursion() {
    // [[[[1]]]]
    let bytes = [0x81, 0x81, 0x81, 0x81, 0x01];
    let m = LengthModel::new(DecodeLimits {
        max_depth: 2,
        ..DecodeLimits::default()
    });
    let err = m.item_byte_size(&bytes, 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::DepthLimitExceeded);
    assert_eq!(err.offset, 3);

    assert_eq!(LengthModel::default().item_byte_size(&bytes, 0).unwrap(), 5);
}

#[test]
fn declared_lengths_are_checked_against_limits() {
    let m = LengthModel::new(DecodeLimits::for_bytes(16));
    // sequence declaring 2^32 - 1 elements
    let err = m
        .item_byte_size(&[0x9a, 0xff, 0xff, 0xff, 0xff], 0)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ContainerLenLimitExceeded);
    // byte string declaring 256 bytes
    let err = m.item_byte_size(&[0x59, 0x01, 0x00], 0).unwrap_err();
    assert_eq!(err.code, ErrorCode::StringLenLimitExceeded);
}

#[test]
fn children_walks_slots() {
    let m = LengthModel::default();

    let dict = [0xa2, 0x01, 0x02, 0x03, 0x04];
    let slots: Vec<usize> = m
        .children(&dict, 0, ValueType::Dictionary)
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(slots, vec![1, 2, 3, 4]);

    let seq = [0x9f, 0x01, 0x82, 0x02, 0x03, 0x82, 0x04, 0x05, 0xff];
    let mut it = m.children(&seq, 0, ValueType::Any).unwrap();
    assert_eq!(it.container_offset(), 0);
    let slots: Vec<usize> = it.by_ref().map(Result::unwrap).collect();
    assert_eq!(slots, vec![1, 2, 5]);
    assert_eq!(it.position(), 8);

    let err = m.children(&[0x01], 0, ValueType::Any).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn container_mismatches_name_the_requested_type() {
    let m = LengthModel::default();
    let dict = [0xa1, 0x01, 0x02];
    let seq = [0x81, 0x01];

    let err = m.element_count(&seq, 0, ValueType::Dictionary).unwrap_err();
    assert_eq!(
        err.code,
        ErrorCode::TypeMismatch {
            expected: ValueType::Dictionary,
            actual: ValueType::Sequence,
        }
    );
    let err = m.children(&dict, 0, ValueType::Sequence).unwrap_err();
    assert_eq!(
        err.code,
        ErrorCode::TypeMismatch {
            expected: ValueType::Sequence,
            actual: ValueType::Dictionary,
        }
    );
    let err = m.element_count(&[0x61, b'a'], 0, ValueType::Dictionary).unwrap_err();
    assert_eq!(
        err.code,
        ErrorCode::TypeMismatch {
            expected: ValueType::Dictionary,
            actual: ValueType::TextString,
        }
    );
    assert_eq!(m.element_count(&dict, 0, ValueType::Any).unwrap(), 1);
}

#[test]
fn read_argument_reports_value_and_header_len() {
    let arg = read_argument(&[0x19, 0x01, 0x00], 0).unwrap();
    assert_eq!(arg.value, Some(256));
    assert_eq!(arg.header_len, 3);

    let arg = read_argument(&[0x9f, 0xff], 0).unwrap();
    assert_eq!(arg.value, None);
    assert_eq!(arg.header_len, 1);
}
