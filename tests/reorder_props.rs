use std::collections::HashSet;

use proptest::collection::vec;
use proptest::prelude::*;
use snpsort::{
    Call, Cell, Position, PositionOrder, ReorderConfig, SampleColumn, TableReorderer,
    VariantTable,
};

fn cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        Just(None),
        Just(Call::new(b'A')),
        Just(Call::new(b'C')),
        Just(Call::new(b'G')),
        Just(Call::new(b'T')),
        Just(Call::new(b'N')),
    ]
}

prop_compose! {
    fn dims()(rows in 1usize..10, samples in 1usize..6) -> (usize, usize) {
        (rows, samples)
    }
}

prop_compose! {
    fn inputs()((rows, samples) in dims())(
        columns in vec(vec(cell(), rows), samples),
        reference in vec(cell(), rows),
        in_order in vec(any::<bool>(), rows),
        extra in 1usize..3,
        rows in Just(rows),
    ) -> (VariantTable, PositionOrder) {
        let positions: Vec<Position> = (1..=rows as Position).map(|row| row * 10).collect();
        let raw = VariantTable::new(
            "position",
            positions.clone(),
            columns
                .into_iter()
                .enumerate()
                .map(|(idx, cells)| SampleColumn::new(format!("S{idx}"), cells))
                .collect(),
        )
        .expect("generated table is valid");

        // Ordered positions run backwards so the merge has to reshuffle.
        let mut entries: Vec<(Position, Cell)> = positions
            .iter()
            .zip(&reference)
            .zip(&in_order)
            .rev()
            .filter(|(_, keep)| **keep)
            .map(|((position, call), _)| (*position, *call))
            .collect();
        entries.extend((0..extra as Position).map(|k| (1_000 + k, Call::new(b'A'))));
        let order = PositionOrder::new("position", "reference_call", entries)
            .expect("generated order is valid");

        (raw, order)
    }
}

fn run(raw: &VariantTable, order: &PositionOrder) -> snpsort::ReorderOutput {
    TableReorderer::new(ReorderConfig::default().with_allow_disjoint(true))
        .run(raw, order)
        .expect("generated inputs reorder")
}

proptest! {
    #[test]
    fn every_position_appears_once((raw, order) in inputs()) {
        let output = run(&raw, &order);

        let expected: HashSet<Position> = raw
            .positions()
            .iter()
            .copied()
            .chain(order.positions())
            .collect();
        for table in [&output.sorted, &output.organized] {
            prop_assert_eq!(table.row_count(), expected.len());
            let seen: HashSet<Position> = table.positions().iter().copied().collect();
            prop_assert_eq!(&seen, &expected);
        }

        let leading: Vec<Position> = output.sorted.positions()[..order.len()].to_vec();
        prop_assert_eq!(leading, order.positions().collect::<Vec<_>>());
    }

    #[test]
    fn all_missing_samples_never_survive((raw, order) in inputs()) {
        let output = run(&raw, &order);
        for table in [&output.sorted, &output.organized] {
            for sample in table.samples() {
                prop_assert!(!sample.is_all_missing(), "{} has no calls", sample.id);
            }
        }
        let kept = output.sorted.sample_count() + output.dropped_columns.len();
        prop_assert_eq!(kept, raw.columns().len());
    }

    #[test]
    fn last_sample_is_pivot((raw, order) in inputs()) {
        let output = run(&raw, &order);
        let last_input = output.sorted.samples().last().map(|c| c.id.clone());
        let first_output = output.organized.samples().first().map(|c| c.id.clone());
        prop_assert_eq!(&output.pivot, &last_input);
        prop_assert_eq!(first_output, last_input);
    }

    #[test]
    fn sort_is_ascending_and_stable((raw, order) in inputs()) {
        let output = run(&raw, &order);
        let input_rank = |id: &str| {
            output.sorted.samples().iter().position(|c| c.id == id).expect("sample exists")
        };

        let rest: Vec<&str> = output
            .organized
            .samples()
            .iter()
            .skip(1)
            .map(|c| c.id.as_str())
            .collect();
        for pair in rest.windows(2) {
            let left = output.metrics.get(pair[0]).expect("metrics exist");
            let right = output.metrics.get(pair[1]).expect("metrics exist");
            prop_assert!(left <= right, "{:?} sorted before {:?}", left, right);
            if left == right {
                prop_assert!(input_rank(pair[0]) < input_rank(pair[1]), "tie order changed");
            }
        }
    }

    #[test]
    fn reordering_only_permutes_columns((raw, order) in inputs()) {
        let output = run(&raw, &order);
        prop_assert_eq!(output.organized.positions(), output.sorted.positions());
        prop_assert_eq!(output.organized.reference(), output.sorted.reference());
        prop_assert_eq!(output.organized.sample_count(), output.sorted.sample_count());
        for sample in output.sorted.samples() {
            prop_assert_eq!(output.organized.column(&sample.id), Some(sample));
        }
    }
}
