use std::ops::ControlFlow;

use cbor_skipscan::{
    CborError, Encoder, ErrorCode, ErrorKind, KeyLiteral, MajorType, Op, Parser, ParserOptions,
    Predicate, Query, Selection, Stage, TypeSpec, Value, ValueType,
};

fn int(sel: &Selection<'_>) -> i128 {
    sel.to_value().unwrap().as_integer().unwrap()
}

/// {"users": [{"name": "ann", "tags": ["a", "b"]}, {"name": "bob"}, 7]}
fn users() -> Vec<u8> {
    let mut e = Encoder::new();
    e.dictionary(1, |d| {
        d.text_entry("users", |e| {
            e.sequence(3, |s| {
                s.element(|e| {
                    e.dictionary(2, |d| {
                        d.text_entry("name", |e| e.text("ann"))?;
                        d.text_entry("tags", |e| {
                            e.sequence(2, |s| {
                                s.text("a")?;
                                s.text("b")
                            })
                        })
                    })
                })?;
                s.element(|e| e.dictionary(1, |d| d.text_entry("name", |e| e.text("bob"))))?;
                s.int(7)
            })
        })
    })
    .unwrap();
    e.into_vec()
}

#[test]
fn integer_key_lookup() {
    // {1: 2, 3: 4}
    let bytes = [0xa2, 0x01, 0x02, 0x03, 0x04];
    let parser = Parser::new();

    let hit = parser
        .select(&bytes, &Query::builder().key_int(3).build().unwrap())
        .unwrap();
    let Selection::Item(v) = &hit else {
        panic!("expected a source item, got {hit:?}");
    };
    assert_eq!(v.major_type(), MajorType::UnsignedInteger);
    assert_eq!(v.offset(), 4);
    assert_eq!(v.integer().unwrap(), Some(4));

    let miss = parser
        .select(&bytes, &Query::builder().key_int(5).build().unwrap())
        .unwrap();
    assert!(matches!(miss, Selection::Null));
    assert!(miss.is_null());
}

#[test]
fn nested_index_into_indefinite_sequence() {
    // [_ 1, [2, 3], [4, 5]]
    let bytes = [0x9f, 0x01, 0x82, 0x02, 0x03, 0x82, 0x04, 0x05, 0xff];
    let parser = Parser::new();

    let q = Query::builder().index(1).index(0).build().unwrap();
    assert_eq!(int(&parser.select(&bytes, &q).unwrap()), 2);

    let q = Query::builder().index(2).index(1).build().unwrap();
    assert_eq!(int(&parser.select(&bytes, &q).unwrap()), 5);

    let q = Query::builder().index(3).build().unwrap();
    assert!(parser.select(&bytes, &q).unwrap().is_null());

    let q = Query::builder().index(1).index(2).build().unwrap();
    assert!(parser.select(&bytes, &q).unwrap().is_null());
}

#[test]
fn text_key_lookup() {
    // {"a": 1, "b": 2}
    let bytes = [0xa2, 0x61, b'a', 0x01, 0x61, b'b', 0x02];
    let parser = Parser::new();

    let q = Query::builder().key("b").build().unwrap();
    assert_eq!(int(&parser.select(&bytes, &q).unwrap()), 2);

    let q = Query::builder().key("c").build().unwrap();
    assert!(parser.select(&bytes, &q).unwrap().is_null());
    assert_eq!(parser.select_all(&bytes, &q).unwrap().len(), 0);
}

#[test]
fn byte_string_keys_match_text_lookups() {
    // {h'6964': 9}
    let bytes = [0xa1, 0x42, b'i', b'd', 0x09];
    let q = Query::builder().key("id").build().unwrap();
    assert_eq!(int(&Parser::new().select(&bytes, &q).unwrap()), 9);
}

#[test]
fn indefinite_keys_are_compared_by_content() {
    // {_ (_ "k", "ey"): true}
    let bytes = [0xbf, 0x7f, 0x61, b'k', 0x62, b'e', b'y', 0xff, 0xf5, 0xff];
    let q = Query::builder().key("key").build().unwrap();
    let parser = Parser::new();
    let hit = parser.select(&bytes, &q).unwrap();
    assert_eq!(hit.to_value().unwrap(), Value::Bool(true));
}

#[test]
fn required_type_assertion_raises() {
    let bytes = [0x01];
    let q = Query::builder()
        .expect(TypeSpec::required(ValueType::Dictionary))
        .build()
        .unwrap();
    let err = Parser::new().select(&bytes, &q).unwrap_err();
    assert_eq!(
        err,
        CborError::type_mismatch(ValueType::Dictionary, ValueType::UInt, 0)
    );
}

#[test]
fn nullable_type_assertion_yields_null() {
    let bytes = [0x01];
    let q = Query::builder()
        .expect(TypeSpec::nullable(ValueType::Dictionary))
        .build()
        .unwrap();
    assert!(Parser::new().select(&bytes, &q).unwrap().is_null());

    let q = Query::builder()
        .expect(TypeSpec::nullable(ValueType::Number))
        .build()
        .unwrap();
    assert_eq!(int(&Parser::new().select(&bytes, &q).unwrap()), 1);
}

#[test]
fn navigating_into_the_wrong_container_is_an_error() {
    // [1]
    let bytes = [0x81, 0x01];
    let q = Query::builder().key("a").build().unwrap();
    let err = Parser::new().select(&bytes, &q).unwrap_err();
    assert!(err.is_type_mismatch());
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn malformed_input_is_never_a_miss() {
    // {"a": <reserved>, "b": 2}
    let bytes = [0xa2, 0x61, b'a', 0x1c, 0x61, b'b', 0x02];
    let q = Query::builder().key("b").build().unwrap();
    let err = Parser::new().select(&bytes, &q).unwrap_err();
    assert_eq!(err.code, ErrorCode::ReservedAdditionalInfo);
    assert_eq!(err.offset, 3);
}

#[test]
fn iterate_and_filter() {
    // [1, 2, 3, 2]
    let bytes = [0x84, 0x01, 0x02, 0x03, 0x02];
    let parser = Parser::new();

    let all = parser
        .select_all(&bytes, &Query::builder().all().build().unwrap())
        .unwrap();
    assert_eq!(all.iter().map(int).collect::<Vec<_>>(), vec![1, 2, 3, 2]);

    let twos = parser
        .select_all(&bytes, &Query::builder().filter(2i64).build().unwrap())
        .unwrap();
    assert_eq!(twos.len(), 2);
    let offsets: Vec<usize> = twos
        .iter()
        .map(|s| match s {
            Selection::Item(v) => v.offset(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(offsets, vec![2, 4]);

    let above_one = Predicate::custom("above_one", |v| {
        Ok(v.integer()?.map_or(false, |i| i > 1))
    });
    let q = Query::builder().filter(above_one).build().unwrap();
    assert_eq!(parser.select_all(&bytes, &q).unwrap().len(), 3);
}

#[test]
fn bool_filters_skip_other_types() {
    // [true, 1, false, null, true]
    let bytes = [0x85, 0xf5, 0x01, 0xf4, 0xf6, 0xf5];
    let parser = Parser::new();

    let hits = parser
        .select_all(&bytes, &Query::builder().filter(true).build().unwrap())
        .unwrap();
    let offsets: Vec<usize> = hits
        .iter()
        .map(|s| match s {
            Selection::Item(v) => v.offset(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(offsets, vec![1, 5]);

    let q = Query::builder().filter(false).build().unwrap();
    assert_eq!(parser.select_all(&bytes, &q).unwrap().len(), 1);
}

#[test]
fn consumer_can_stop_early() {
    let bytes = [0x84, 0x01, 0x02, 0x03, 0x02];
    let q = Query::builder().all().build().unwrap();
    let mut seen = Vec::new();
    let delivered = Parser::new()
        .select_each(&bytes, &q, |s| {
            seen.push(int(&s));
            if seen.len() == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
    assert_eq!(delivered, 2);
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn multi_item_streams() {
    // {"a": 1} {"b": 2} {"a": 3}
    let bytes = [
        0xa1, 0x61, b'a', 0x01, 0xa1, 0x61, b'b', 0x02, 0xa1, 0x61, b'a', 0x03,
    ];
    let q = Query::builder().each_stream().key("a").build().unwrap();

    let parser = Parser::new();
    let hits = parser.select_all(&bytes, &q).unwrap();
    assert_eq!(hits.iter().map(int).collect::<Vec<_>>(), vec![1, 3]);

    let parser = Parser::new().with_options(ParserOptions {
        null_on_stream_miss: true,
        ..ParserOptions::default()
    });
    let hits = parser.select_all(&bytes, &q).unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits[1].is_null());

    let q = Query::builder().stream_index(1).key("b").build().unwrap();
    assert_eq!(int(&Parser::new().select(&bytes, &q).unwrap()), 2);

    let q = Query::builder().stream_index(3).build().unwrap();
    assert!(Parser::new().select(&bytes, &q).unwrap().is_null());
}

#[test]
fn self_describe_prefix_is_skipped() {
    // 55799({"a": 1})
    let bytes = [0xd9, 0xd9, 0xf7, 0xa1, 0x61, b'a', 0x01];
    let q = Query::builder().key("a").build().unwrap();
    assert_eq!(int(&Parser::new().select(&bytes, &q).unwrap()), 1);
}

#[test]
fn dictionary_projection_fills_misses_with_null() {
    let bytes = users();
    let q = Query::builder()
        .key("users")
        .all()
        .expect(TypeSpec::nullable(ValueType::Dictionary))
        .dictionary(|d| {
            d.entry("name", |p| p.key("name"))
                .entry("first_tag", |p| p.key("tags").index(0))
        })
        .build()
        .unwrap();

    let out: Vec<Value> = Parser::new()
        .select_all(&bytes, &q)
        .unwrap()
        .iter()
        .map(|s| s.to_value().unwrap())
        .collect();
    assert_eq!(
        out,
        vec![
            Value::Dictionary(vec![
                (Value::from("name"), Value::from("ann")),
                (Value::from("first_tag"), Value::from("a")),
            ]),
            Value::Dictionary(vec![
                (Value::from("name"), Value::from("bob")),
                (Value::from("first_tag"), Value::Null),
            ]),
        ]
    );
}

#[test]
fn sequence_projection_and_collected_paths() {
    let bytes = users();
    let q = Query::builder()
        .key("users")
        .sequence(|s| {
            s.element(|p| p.index(0).key("name"))
                .element(|p| {
                    p.all()
                        .expect(TypeSpec::nullable(ValueType::Dictionary))
                        .key("name")
                })
                .element(|p| p.index(9))
        })
        .build()
        .unwrap();

    let parser = Parser::new();
    let out = parser.select(&bytes, &q).unwrap().to_value().unwrap();
    assert_eq!(
        out,
        Value::Sequence(vec![
            Value::from("ann"),
            Value::Sequence(vec![Value::from("ann"), Value::from("bob")]),
            Value::Null,
        ])
    );
}

#[test]
fn nested_projections() {
    let bytes = users();
    let q = Query::builder()
        .dictionary(|d| {
            d.entry("first", |p| {
                p.key("users")
                    .index(0)
                    .dictionary(|d| d.entry("tags", |p| p.key("tags")))
            })
            .entry(0i64, |p| p.key("users").index(2))
        })
        .build()
        .unwrap();

    let parser = Parser::new();
    let out = parser.select(&bytes, &q).unwrap().to_value().unwrap();
    assert_eq!(
        out,
        Value::Dictionary(vec![
            (
                Value::from("first"),
                Value::Dictionary(vec![(
                    Value::from("tags"),
                    Value::Sequence(vec![Value::from("a"), Value::from("b")])
                )])
            ),
            (Value::Integer(0), Value::Integer(7)),
        ])
    );
}

#[test]
fn projection_after_a_miss_yields_nothing() {
    let bytes = users();
    let q = Query::builder()
        .key("groups")
        .dictionary(|d| d.entry("x", |p| p))
        .build()
        .unwrap();
    assert!(Parser::new().select(&bytes, &q).unwrap().is_null());
}

#[test]
fn builder_rejects_misplaced_steps() {
    let err = Query::builder()
        .dictionary(|d| d.entry("a", |p| p))
        .key("b")
        .build()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidQuery);
    assert_eq!(err.kind(), ErrorKind::QueryDefinition);

    let err = Query::builder().key("a").each_stream().build().unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidQuery);

    let err = Query::builder()
        .dictionary(|d| d.entry("a", |p| p.stream_index(0)))
        .build()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidQuery);

    let err = Query::from_stage(Stage::leaf(Op::Emit)).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidQuery);
}

fn base(child: Stage) -> Stage {
    Stage::new(Op::Base, vec![child])
}

fn node(op: Op, child: Stage) -> Stage {
    Stage::new(op, vec![child])
}

#[test]
fn malformed_stage_trees_are_rejected_before_execution() {
    let key = || Op::DictionaryLookup(Predicate::from("a"));
    let entry = |child| node(Op::DictionaryEntry(KeyLiteral::from("k")), child);
    let select = |projection| node(Op::Select, projection);

    let rejected = [
        // emit outside any projection
        base(select(Stage::leaf(Op::Emit))),
        base(node(key(), Stage::leaf(Op::Emit))),
        // entries outside their projection
        base(entry(Stage::leaf(Op::Emit))),
        base(select(node(
            Op::AsDictionary,
            node(Op::SequenceElement, Stage::leaf(Op::Emit)),
        ))),
        base(select(node(Op::AsSequence, entry(Stage::leaf(Op::Emit))))),
        // projection not under select or an entry
        base(node(Op::AsDictionary, entry(Stage::leaf(Op::Emit)))),
        // select must end the top-level path
        base(select(node(key(), Stage::leaf(Op::Select)))),
        base(select(select(Stage::leaf(Op::AsSequence)))),
        // stream steps after a path step
        base(node(key(), node(Op::StreamIndex(1), Stage::leaf(Op::Select)))),
        // iteration inside an entry without a collect frame
        base(select(node(
            Op::AsSequence,
            node(Op::SequenceElement, node(Op::SequenceAll, Stage::leaf(Op::Emit))),
        ))),
        // collect outside an entry
        base(node(Op::Collect, Stage::leaf(Op::Select))),
        // a path with no terminal
        base(Stage::leaf(key())),
        Stage::leaf(Op::Base),
        // one entry writing twice
        base(select(node(
            Op::AsDictionary,
            Stage::new(
                Op::DictionaryEntry(KeyLiteral::from("k")),
                vec![Stage::leaf(Op::Emit), Stage::leaf(Op::Emit)],
            ),
        ))),
        node(Op::Select, base(Stage::leaf(Op::Select))),
    ];
    for tree in rejected {
        let err = Query::from_stage(tree.clone()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuery, "{tree:?}");
        assert_eq!(err.kind(), ErrorKind::QueryDefinition);
    }

    // each_stream -> ["k": collect(all -> emit)]
    let accepted = base(node(
        Op::EachStream,
        select(node(
            Op::AsDictionary,
            entry(node(Op::Collect, node(Op::SequenceAll, Stage::leaf(Op::Emit)))),
        )),
    ));
    let q = Query::from_stage(accepted).unwrap();
    let expected = Query::builder()
        .each_stream()
        .dictionary(|d| d.entry("k", |p| p.all()))
        .build()
        .unwrap();
    assert_eq!(q, expected);
}

#[test]
fn builder_trees_pass_stage_validation() {
    let queries = [
        Query::builder().build().unwrap(),
        Query::builder()
            .stream_index(1)
            .key("users")
            .all()
            .expect(TypeSpec::nullable(ValueType::Dictionary))
            .dictionary(|d| {
                d.entry("name", |p| p.key("name"))
                    .entry("tags", |p| p.key("tags").filter("a"))
                    .entry(3i64, |p| {
                        p.index(0).sequence(|s| {
                            s.element(|p| p).element(|p| {
                                p.all().dictionary(|d| d.entry("x", |p| p.key("x")))
                            })
                        })
                    })
            })
            .build()
            .unwrap(),
        Query::builder()
            .filter(1i64)
            .sequence(|s| s.element(|p| p))
            .build()
            .unwrap(),
    ];
    for q in queries {
        assert_eq!(Query::from_stage(q.root().clone()).unwrap(), q);
    }
}

#[test]
fn query_trees_are_plain_data() {
    let a = Query::builder().key("x").index(1).build().unwrap();
    let b = Query::builder().key("x").index(1).build().unwrap();
    assert_eq!(a, b);
    assert_ne!(a, Query::builder().key("x").index(2).build().unwrap());

    let root = a.root();
    assert!(matches!(root.op(), Op::Base));
    let rebuilt = Query::from_stage(root.clone()).unwrap();
    assert_eq!(rebuilt, a);
}

#[test]
fn value_at_shares_the_parser_codec() {
    let bytes = [0x82, 0x01, 0x61, b'x'];
    let parser = Parser::new();
    let v = parser.value_at(&bytes, 2).unwrap();
    assert_eq!(v.string().unwrap().unwrap(), "x");
}
