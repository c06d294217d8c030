use proptest::prelude::*;
use std::collections::BTreeSet;

use yfkit::model::{DynamicValue, Object, Table};
use yfkit::wire;

fn arb_cell() -> impl Strategy<Value = DynamicValue> {
    prop_oneof![
        Just(DynamicValue::Null),
        any::<bool>().prop_map(DynamicValue::from),
        (-1_000i64..1_000).prop_map(DynamicValue::from),
        "[a-z]{0,4}".prop_map(DynamicValue::from),
    ]
}

fn arb_columns() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set("[a-z]{1,6}".prop_filter("reserved", |s| s != "column"), 0..6)
        .prop_map(|set| set.into_iter().collect())
}

fn arb_table() -> impl Strategy<Value = Table> {
    arb_columns().prop_flat_map(|columns| {
        let width = columns.len();
        proptest::collection::vec(proptest::collection::vec(arb_cell(), width), 0..6).prop_map(
            move |cells| {
                let rows = cells
                    .into_iter()
                    .map(|values| {
                        columns
                            .iter()
                            .cloned()
                            .zip(values)
                            .collect::<Object>()
                    })
                    .collect();
                Table::new(columns.clone(), rows)
            },
        )
    })
}

fn varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

proptest! {
    #[test]
    fn transpose_twice_restores_column_set(table in arb_table()) {
        let restored = table.transposed().transposed();
        let before: BTreeSet<String> = table.column_names().into_iter().collect();
        let after: BTreeSet<String> = restored.column_names().into_iter().collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn head_and_tail_of_one(table in arb_table().prop_filter("non-empty", |t| !t.is_empty())) {
        prop_assert_eq!(table.head(1).row_count(), 1);
        let tail = table.tail(1);
        prop_assert_eq!(tail.rows().first(), table.rows().last());
        prop_assert_eq!(table.head(usize::MAX).row_count(), table.row_count());
    }

    #[test]
    fn sort_is_stable(
        keys in proptest::collection::vec(0i64..3, 0..40),
        ascending in any::<bool>(),
    ) {
        let values: Vec<DynamicValue> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let mut row = Object::new();
                row.insert("k".to_string(), (*k).into());
                row.insert("id".to_string(), (i as i64).into());
                DynamicValue::Object(row)
            })
            .collect();
        let sorted = Table::from_objects(&values).sorted("k", ascending);

        let pairs: Vec<(i64, i64)> = sorted
            .rows()
            .iter()
            .map(|r| (r["k"].as_i64().unwrap(), r["id"].as_i64().unwrap()))
            .collect();
        for w in pairs.windows(2) {
            let ((k1, id1), (k2, id2)) = (w[0], w[1]);
            if ascending {
                prop_assert!(k1 <= k2);
            } else {
                prop_assert!(k1 >= k2);
            }
            if k1 == k2 {
                prop_assert!(id1 < id2);
            }
        }
    }

    #[test]
    fn raw_wrapper_matches_inner_number(n in -1.0e12f64..1.0e12) {
        let mut wrapped = Object::new();
        wrapped.insert("raw".to_string(), n.into());
        wrapped.insert("fmt".to_string(), "ignored".into());
        prop_assert_eq!(DynamicValue::Object(wrapped).as_f64(), DynamicValue::from(n).as_f64());

        let mut fmt_only = Object::new();
        fmt_only.insert("fmt".to_string(), n.to_string().into());
        let inner = DynamicValue::from(n.to_string());
        prop_assert_eq!(DynamicValue::Object(fmt_only).as_f64(), inner.as_f64());
    }

    #[test]
    fn zigzag_time_field_round_trips(time in any::<i64>()) {
        prop_assert_eq!(wire::zigzag_decode(zigzag_encode(time)), time);

        let mut buf = Vec::new();
        varint(3 << 3, &mut buf);
        varint(zigzag_encode(time), &mut buf);
        let record = wire::decode(&buf).unwrap();
        prop_assert_eq!(record.time, Some(time));
    }

    #[test]
    fn union_of_keys(a in arb_columns(), b in arb_columns()) {
        let object = |keys: &[String]| {
            DynamicValue::Object(
                keys.iter()
                    .map(|k| (k.clone(), DynamicValue::from(1i64)))
                    .collect(),
            )
        };
        let table = DynamicValue::from(vec![object(a.as_slice()), object(b.as_slice())]).to_table();
        let expected: BTreeSet<String> = a.iter().chain(&b).cloned().collect();
        let actual: BTreeSet<String> = table.column_names().into_iter().collect();
        prop_assert_eq!(actual, expected);
        for name in &a {
            if !b.contains(name) {
                prop_assert!(table.cell(1, name).is_null());
            }
        }
    }
}
