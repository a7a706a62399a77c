#![no_main]

use std::ops::ControlFlow;

use libfuzzer_sys::fuzz_target;

use cbor_skipscan::{Codec, DecodeLimits, Parser, Query, StrategyKind, TypeSpec, ValueType};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, doc)) = data.split_first() else {
        return;
    };
    let codec = Codec::new().with_limits(DecodeLimits {
        max_depth: 64,
        ..DecodeLimits::for_bytes(doc.len())
    });

    let path = Query::builder()
        .key("a")
        .index(usize::from(selector & 0x0f))
        .build();
    let projection = Query::builder()
        .all()
        .expect(TypeSpec::nullable(ValueType::Dictionary))
        .dictionary(|d| d.entry("v", |p| p.key_int(i64::from(selector))).entry("all", |p| p.all()))
        .build();
    let streams = Query::builder().each_stream().key("a").build();

    for query in [path, projection, streams].into_iter().flatten() {
        for kind in [StrategyKind::Binary, StrategyKind::Object] {
            let parser = Parser::new().with_codec(codec.clone()).with_strategy(kind);
            let _ = parser.select_each(&doc, &query, |s| {
                let _ = s.to_value();
                ControlFlow::Continue(())
            });
        }
    }
});
