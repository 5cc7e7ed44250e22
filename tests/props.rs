//! Property-based relaxation invariants over generated sections.

mod common;

use asmforge::{DirectiveOp, Relaxer, SizeMap, Unit};
use common::*;
use proptest::prelude::*;

fn relax_text(unit: &mut Unit) -> (SizeMap, u64) {
    let section = unit.section(".text").expect("text section").id();
    let mut sizes = SizeMap::new();
    let total = Relaxer::relax(unit, section, &TableEncoder::new(), &mut sizes).expect("relax");
    (sizes, total)
}

proptest! {
    /// Per-entry sizes of a data-only section sum to the section length,
    /// and the length matches the independently computed expectation.
    #[test]
    fn data_sizes_sum_to_total(ops in prop::collection::vec(0usize..5, 1..40)) {
        let mut unit = Unit::new();
        let mut expected = 0u64;
        for (i, op) in ops.iter().enumerate() {
            let (kind, size) = match op {
                0 => (data_dir(DirectiveOp::Byte), 1),
                1 => (data_dir(DirectiveOp::Word), 2),
                2 => (data_dir(DirectiveOp::Long), 4),
                3 => (data_dir(DirectiveOp::Quad), 8),
                _ => (space_const(3), 3),
            };
            expected += size;
            unit.add_entry(kind, i as u32 + 1, None, true).unwrap();
        }
        let (sizes, total) = relax_text(&mut unit);
        prop_assert_eq!(total, expected);
        prop_assert_eq!(sizes.values().sum::<u64>(), total);
    }

    /// A forward conditional branch is short exactly within disp8 range.
    #[test]
    fn branch_size_matches_distance(distance in 0i64..300) {
        let mut unit = Unit::new();
        let branch = jump(&mut unit, "je", "target");
        let mut line = 1;
        unit.add_entry(branch, line, None, true).unwrap();
        if distance > 0 {
            line += 1;
            unit.add_entry(space_const(distance), line, None, true).unwrap();
        }
        line += 1;
        unit.add_entry(label("target"), line, None, true).unwrap();
        unit.add_entry(insn("ret"), line + 1, None, true).unwrap();

        let (sizes, total) = relax_text(&mut unit);
        let branch_size = sizes[&asmforge::EntryId(0)];
        let expect = if distance <= 127 { 2 } else { 6 };
        prop_assert_eq!(branch_size, expect);
        prop_assert_eq!(total, branch_size + distance.max(0) as u64 + 1);
    }

    /// Many branches to one label always converge, and sizes stay
    /// internally consistent.
    #[test]
    fn many_branches_converge(count in 1usize..8, padding in 0i64..200) {
        let mut unit = Unit::new();
        let mut line = 0;
        for _ in 0..count {
            line += 1;
            let branch = jump(&mut unit, "je", "sink");
            unit.add_entry(branch, line, None, true).unwrap();
            if padding > 0 {
                line += 1;
                unit.add_entry(space_const(padding), line, None, true).unwrap();
            }
        }
        unit.add_entry(label("sink"), line + 1, None, true).unwrap();
        unit.add_entry(insn("ret"), line + 2, None, true).unwrap();

        let (sizes, total) = relax_text(&mut unit);
        let sum: u64 = sizes.values().sum();
        prop_assert_eq!(sum, total);
        for size in sizes.values() {
            prop_assert!(*size <= total);
        }
    }

    /// Adding trailing padding never shrinks the section.
    #[test]
    fn growth_is_monotone(base in 0i64..160, extra in 1i64..40) {
        let build = |pad: i64| {
            let mut unit = Unit::new();
            let branch = jump(&mut unit, "je", "target");
            unit.add_entry(branch, 1, None, true).unwrap();
            if pad > 0 {
                unit.add_entry(space_const(pad), 2, None, true).unwrap();
            }
            unit.add_entry(label("target"), 3, None, true).unwrap();
            unit.add_entry(insn("ret"), 4, None, true).unwrap();
            relax_text(&mut unit).1
        };
        prop_assert!(build(base + extra) >= build(base));
    }
}
