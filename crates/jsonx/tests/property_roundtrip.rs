//! Property tests: parsing is total, and acyclic standard values survive a
//! stringify/parse round trip.

use jsonx::{parse, stringify, to_string_pretty, Value};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|i| Value::from(i)),
        any::<u64>().prop_map(|u| Value::from(u)),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(|f| Value::from(f)),
        any::<String>().prop_map(Value::Str),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(|items| Value::array_from(items)),
            prop::collection::vec((any::<String>(), inner), 0..8)
                .prop_map(|entries| Value::object_from(entries)),
        ]
    })
}

proptest! {
    #[test]
    fn parse_is_total_on_arbitrary_text(text in any::<String>()) {
        if let Err(err) = parse(&text) {
            prop_assert!(err.position() <= text.len());
        }
    }

    #[test]
    fn parse_is_total_on_json_like_noise(text in "[\\[\\]{}\",:0-9a-z\\\\ .eE+-]{0,64}") {
        if let Err(err) = parse(&text) {
            prop_assert!(err.position() <= text.len());
        }
    }

    #[test]
    fn compact_round_trip(value in arb_value()) {
        let text = stringify(&value, None, None);
        let back = parse(&text);
        prop_assert!(back.is_ok(), "{text}");
        prop_assert_eq!(back.unwrap(), value);
    }

    #[test]
    fn pretty_round_trip(value in arb_value(), indent in 1usize..12) {
        let text = to_string_pretty(&value, indent);
        prop_assert_eq!(parse(&text).unwrap(), value);
    }

    #[test]
    fn serialization_is_stable(value in arb_value()) {
        let once = stringify(&value, None, None);
        let twice = stringify(&parse(&once).unwrap(), None, None);
        prop_assert_eq!(once, twice);
    }
}
