#![no_main]

use libfuzzer_sys::fuzz_target;

use cbor_skipscan::primitive::decode_value;
use cbor_skipscan::{DecodeLimits, LengthModel, ValueType};

fuzz_target!(|data: &[u8]| {
    let mut limits = DecodeLimits::for_bytes(data.len());
    limits.max_depth = 64;
    let model = LengthModel::new(limits);

    let size = model.item_byte_size(&data, 0);
    let decoded = decode_value(&model, &data, 0);
    if let (Ok(n), Ok((_, end))) = (size, decoded) {
        assert_eq!(n, end);
    }

    if let Ok(children) = model.children(&data, 0, ValueType::Any) {
        for slot in children.take(8) {
            let Ok(pos) = slot else { break };
            let _ = model.skip(&data, pos);
        }
    }
});
