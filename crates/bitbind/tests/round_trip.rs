use std::{collections::BTreeSet, sync::Arc};

use bitbind::{
    Codec, CodecSource, DecodeErrorKind,
    bitfield::BitFieldCodec,
    bits::{ByteOrder, low_mask},
    numeric::{NumericCodec, NumericKind},
    resolver::PREFIX,
    schema::{Codecs, Description, RecordDef},
    select::{Alternative, prefix_scope},
};
use bitbind_el::{Expression, Node, Record, Relation, Type, Value};
use proptest::prelude::*;

const DAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

fn days() -> BitFieldCodec {
    let masks = DAYS
        .iter()
        .enumerate()
        .map(|(i, day)| (*day, 1u64 << i))
        .collect::<Vec<_>>();

    BitFieldCodec::new(
        "Day",
        &DAYS,
        &masks,
        Expression::<i64>::constant(16),
        ByteOrder::BigEndian,
    )
    .unwrap()
}

fn when_prefix_is(value: i32) -> Expression<bool> {
    let scope = prefix_scope(None);
    let node = Node::relational(
        Relation::Eq,
        Node::reference(&scope, PREFIX).unwrap(),
        Node::int(value),
    )
    .unwrap();
    Expression::new(node).unwrap()
}

fn messages() -> Arc<dyn Codec> {
    Codecs::new()
        .with_record(
            RecordDef::new("Run")
                .field("speed", Description::numeric(NumericKind::Short))
                .field("direction", Description::numeric(NumericKind::Byte)),
        )
        .unwrap()
        .with_record(
            RecordDef::new("Hide").field("safehouse", Description::numeric(NumericKind::Int)),
        )
        .unwrap()
        .create(&Description::SelectFrom {
            prefix_size: 16,
            order: ByteOrder::BigEndian,
            alternatives: vec![
                Alternative::new(when_prefix_is(0x08), Type::record("Run")),
                Alternative::new(when_prefix_is(0x18), Type::record("Hide")),
            ],
            default: None,
        })
        .unwrap()
}

fn run(speed: i16, direction: i8) -> Value {
    Value::Record(Record::new("Run").with("speed", speed).with("direction", direction))
}

fn hide(safehouse: i32) -> Value {
    Value::Record(Record::new("Hide").with("safehouse", safehouse))
}

#[test]
fn test_days_encode_and_decode() {
    let codec = days();
    let set = |days: &[&str]| Value::Set(days.iter().map(|d| d.to_string()).collect());

    assert_eq!(
        bitbind::encode(&codec, &set(&["TUE", "THU", "SAT", "SUN"])).unwrap(),
        vec![0x00, 0x6A]
    );
    assert_eq!(
        bitbind::decode(&codec, &[0x00, 0x15]).unwrap(),
        set(&["MON", "WED", "FRI"])
    );
}

#[test]
fn test_run_and_hide_wire_format() {
    let codec = messages();

    assert_eq!(bitbind::encode(&*codec, &run(30, 5)).unwrap(), vec![0, 8, 0, 30, 5]);
    assert_eq!(
        bitbind::encode(&*codec, &hide(101)).unwrap(),
        vec![0, 0x18, 0, 0, 0, 101]
    );
    assert_eq!(bitbind::decode(&*codec, &[0, 8, 0, 30, 5]), Ok(run(30, 5)));
}

#[test]
fn test_unknown_prefix_names_alternatives() {
    let err = bitbind::decode(&*messages(), &[0, 9, 0, 0]).unwrap_err();

    assert_eq!(err.position, 0);
    let DecodeErrorKind::NoAlternative {
        prefix,
        alternatives,
    } = &err.kind
    else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(*prefix, 9);
    assert!(alternatives.contains("Run if prefix == 8"));
    assert!(alternatives.contains("Hide if prefix == 24"));
}

#[test]
fn test_codecs_are_shared_across_threads() {
    let codec = messages();

    let handles = (0..4)
        .map(|i| {
            let codec = Arc::clone(&codec);
            std::thread::spawn(move || {
                let value = run(i, 1);
                let bytes = bitbind::encode(&*codec, &value).unwrap();
                assert_eq!(bitbind::decode(&*codec, &bytes), Ok(value));
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_size_depends_on_alternatives() {
    assert_eq!(messages().size(), None);

    let codecs = Codecs::new();
    let uniform = codecs
        .create(&Description::SelectFrom {
            prefix_size: 8,
            order: ByteOrder::BigEndian,
            alternatives: vec![
                Alternative::new(when_prefix_is(0), Type::Int),
                Alternative::new(when_prefix_is(1), Type::Int),
            ],
            default: None,
        })
        .unwrap();
    assert_eq!(uniform.size(), Some(Expression::<i64>::constant(40)));
}

fn tree() -> Arc<dyn Codec> {
    Codecs::new()
        .with_record(RecordDef::new("Leaf").field("v", Description::numeric(NumericKind::Byte)))
        .unwrap()
        .with_record(
            RecordDef::new("Tree")
                .field("v", Description::numeric(NumericKind::Byte))
                .field(
                    "child",
                    Description::SelectFrom {
                        prefix_size: 8,
                        order: ByteOrder::BigEndian,
                        alternatives: vec![
                            Alternative::new(when_prefix_is(0), Type::record("Leaf")),
                            Alternative::new(when_prefix_is(1), Type::record("Tree")),
                        ],
                        default: None,
                    },
                ),
        )
        .unwrap()
        .codec_for(&Type::record("Tree"))
        .unwrap()
}

#[test]
fn test_recursive_schema() {
    let codec = tree();
    assert_eq!(codec.size(), None);

    let leaf = Record::new("Leaf").with("v", 3i8);
    let inner = Record::new("Tree").with("v", 2i8).with("child", Value::Record(leaf));
    let outer = Record::new("Tree").with("v", 1i8).with("child", Value::Record(inner));

    let bytes = [1, 1, 2, 0, 3];
    assert_eq!(bitbind::decode(&*codec, &bytes), Ok(Value::Record(outer.clone())));
    assert_eq!(bitbind::encode(&*codec, &Value::Record(outer)).unwrap(), bytes.to_vec());
}

fn kind() -> impl Strategy<Value = NumericKind> {
    prop_oneof![
        Just(NumericKind::Byte),
        Just(NumericKind::Short),
        Just(NumericKind::Int),
        Just(NumericKind::Long),
    ]
}

fn order() -> impl Strategy<Value = ByteOrder> {
    prop_oneof![Just(ByteOrder::BigEndian), Just(ByteOrder::LittleEndian)]
}

proptest! {
    #[test]
    fn prop_numeric_round_trip(kind in kind(), order in order(), raw in any::<u64>()) {
        let codec = NumericCodec::new(Expression::<i64>::constant(kind.bits().into()), order, kind);
        let value = kind.narrow(raw);

        let bytes = bitbind::encode(&codec, &value).unwrap();
        prop_assert_eq!(bytes.len() as u32, kind.bits() / 8);
        prop_assert_eq!(bitbind::decode(&codec, &bytes).unwrap(), value);
    }

    #[test]
    fn prop_narrow_width_round_trip(order in order(), bits in 1u32..64, raw in any::<u64>()) {
        let codec = NumericCodec::new(Expression::<i64>::constant(bits.into()), order, NumericKind::Long);
        let value = Value::Long((raw & low_mask(bits as usize)) as i64);

        let bytes = bitbind::encode(&codec, &value).unwrap();
        prop_assert_eq!(bytes.len(), (bits as usize).div_ceil(8));
        prop_assert_eq!(bitbind::decode(&codec, &bytes).unwrap(), value);
    }

    #[test]
    fn prop_bitfield_round_trip(mask in 0u8..128) {
        let symbols = DAYS
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << *i) != 0)
            .map(|(_, day)| day.to_string())
            .collect::<BTreeSet<_>>();
        let value = Value::Set(symbols);

        let bytes = bitbind::encode(&days(), &value).unwrap();
        prop_assert_eq!(bytes, vec![0, mask]);
        prop_assert_eq!(bitbind::decode(&days(), &[0, mask]).unwrap(), value);
    }

    #[test]
    fn prop_union_round_trip(speed in any::<i16>(), direction in any::<i8>(), safehouse in any::<i32>()) {
        let codec = messages();

        for value in [run(speed, direction), hide(safehouse)] {
            let bytes = bitbind::encode(&*codec, &value).unwrap();
            prop_assert_eq!(bitbind::decode(&*codec, &bytes).unwrap(), value);
        }
    }
}
