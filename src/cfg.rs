//! Control-flow graph construction over a function's entry range.
//!
//! Blocks are carved at leaders: the function's first entry, any label that
//! is a branch or call target, and any entry following a control-transfer
//! instruction.  The graph carries one synthetic entry block and one
//! synthetic exit block, both with empty entry ranges.

use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::insn::UNKNOWN_TARGET;
use crate::ir::EntryId;
use crate::unit::{EntryIter, Function, Unit};

/// Stable index of a basic block; iteration order is id-ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockId(pub u32);

/// How control reaches the destination block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeKind {
    /// Syntactic successor of a non-branching block.
    FallThrough,
    /// Branch taken.
    Taken,
    /// Conditional branch not taken.
    NotTaken,
    /// Call to an intra-function target.
    Call,
    /// Return to the synthetic exit.
    Return,
}

/// One directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// The edge kind.
    pub kind: EdgeKind,
    /// Source block.
    pub src: BlockId,
    /// Destination block.
    pub dst: BlockId,
}

/// One basic block: a closed entry range plus edge lists.
///
/// Synthetic entry/exit blocks have an empty range.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    id: BlockId,
    first_entry: Option<EntryId>,
    last_entry: Option<EntryId>,
    in_edges: Vec<usize>,
    out_edges: Vec<usize>,
}

impl BasicBlock {
    /// The block's id.
    #[must_use]
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// First entry of the range, `None` for synthetic blocks.
    #[must_use]
    pub fn first_entry(&self) -> Option<EntryId> {
        self.first_entry
    }

    /// Last entry of the range, `None` for synthetic blocks.
    #[must_use]
    pub fn last_entry(&self) -> Option<EntryId> {
        self.last_entry
    }

    /// Whether the block is a synthetic entry/exit node.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.first_entry.is_none()
    }
}

/// A per-function control-flow graph.
#[derive(Debug)]
pub struct Cfg {
    blocks: Vec<BasicBlock>,
    edges: Vec<Edge>,
    entry: BlockId,
    exit: BlockId,
}

impl Cfg {
    /// Build the graph for one function.
    #[must_use]
    pub fn build(unit: &Unit, function: &Function) -> Cfg {
        Builder::new(unit, function).build()
    }

    /// The synthetic entry block.
    #[must_use]
    pub fn begin(&self) -> &BasicBlock {
        &self.blocks[self.entry.0 as usize]
    }

    /// The synthetic entry block's id.
    #[must_use]
    pub fn entry_block(&self) -> BlockId {
        self.entry
    }

    /// The synthetic exit block's id.
    #[must_use]
    pub fn exit_block(&self) -> BlockId {
        self.exit
    }

    /// The block count, synthetic nodes included.
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Get a block by id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    /// Iterate blocks in id order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter()
    }

    /// Iterate a block's outgoing edges.
    pub fn out_edges(&self, id: BlockId) -> impl Iterator<Item = &Edge> {
        self.blocks[id.0 as usize]
            .out_edges
            .iter()
            .map(|&e| &self.edges[e])
    }

    /// Iterate a block's incoming edges.
    pub fn in_edges(&self, id: BlockId) -> impl Iterator<Item = &Edge> {
        self.blocks[id.0 as usize]
            .in_edges
            .iter()
            .map(|&e| &self.edges[e])
    }

    /// Iterate a block's entries.
    #[must_use]
    pub fn block_entries<'a>(&self, unit: &'a Unit, id: BlockId) -> EntryIter<'a> {
        let block = self.block(id);
        EntryIter {
            unit,
            cur: block.first_entry,
            stop_after: block.last_entry,
        }
    }

    /// The number of entries in a block.
    #[must_use]
    pub fn num_block_entries(&self, unit: &Unit, id: BlockId) -> usize {
        self.block_entries(unit, id).count()
    }

    fn add_edge(&mut self, kind: EdgeKind, src: BlockId, dst: BlockId) {
        let index = self.edges.len();
        self.edges.push(Edge { kind, src, dst });
        self.blocks[src.0 as usize].out_edges.push(index);
        self.blocks[dst.0 as usize].in_edges.push(index);
    }
}

struct Builder<'a> {
    unit: &'a Unit,
    entry_ids: Vec<EntryId>,
}

impl<'a> Builder<'a> {
    fn new(unit: &'a Unit, function: &Function) -> Self {
        let entry_ids = unit
            .function_entries(function)
            .map(crate::ir::Entry::id)
            .collect();
        Builder { unit, entry_ids }
    }

    /// Label names that are branch or call targets within the function.
    fn collect_targets(&self) -> BTreeSet<String> {
        let symbols = self.unit.symbol_table();
        let mut targets = BTreeSet::new();
        for &id in &self.entry_ids {
            if let Some(insn) = self.unit.entry(id).as_insn() {
                if insn.has_target() || insn.is_call() {
                    let target = insn.target(symbols);
                    if target != UNKNOWN_TARGET {
                        targets.insert(target.to_string());
                    }
                }
            }
        }
        targets
    }

    fn collect_leaders(&self, targets: &BTreeSet<String>) -> BTreeSet<usize> {
        let mut leaders = BTreeSet::new();
        leaders.insert(0);
        for (idx, &id) in self.entry_ids.iter().enumerate() {
            let entry = self.unit.entry(id);
            if let Some(name) = entry.label_name() {
                if targets.contains(name) {
                    leaders.insert(idx);
                }
            }
            if idx > 0 {
                let prev = self.unit.entry(self.entry_ids[idx - 1]);
                if prev.as_insn().is_some_and(crate::insn::Insn::is_control_transfer) {
                    leaders.insert(idx);
                }
            }
        }
        leaders
    }

    fn build(self) -> Cfg {
        let targets = self.collect_targets();
        let leaders = self.collect_leaders(&targets);

        // Carve [start, end] index ranges at leader boundaries.
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        if !self.entry_ids.is_empty() {
            let mut start = 0;
            for idx in 1..self.entry_ids.len() {
                if leaders.contains(&idx) {
                    ranges.push((start, idx - 1));
                    start = idx;
                }
            }
            ranges.push((start, self.entry_ids.len() - 1));
        }

        let entry = BlockId(0);
        let exit = BlockId(ranges.len() as u32 + 1);
        let mut cfg = Cfg {
            blocks: Vec::with_capacity(ranges.len() + 2),
            edges: Vec::new(),
            entry,
            exit,
        };

        cfg.blocks.push(BasicBlock {
            id: entry,
            first_entry: None,
            last_entry: None,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
        });
        for (i, &(start, end)) in ranges.iter().enumerate() {
            cfg.blocks.push(BasicBlock {
                id: BlockId(i as u32 + 1),
                first_entry: Some(self.entry_ids[start]),
                last_entry: Some(self.entry_ids[end]),
                in_edges: Vec::new(),
                out_edges: Vec::new(),
            });
        }
        cfg.blocks.push(BasicBlock {
            id: exit,
            first_entry: None,
            last_entry: None,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
        });

        // Map label names to their blocks for target resolution.
        let mut label_block: alloc::collections::BTreeMap<&str, BlockId> =
            alloc::collections::BTreeMap::new();
        for (i, &(start, end)) in ranges.iter().enumerate() {
            for idx in start..=end {
                if let Some(name) = self.unit.entry(self.entry_ids[idx]).label_name() {
                    label_block.insert(name, BlockId(i as u32 + 1));
                }
            }
        }

        // The synthetic root reaches the first real block.
        let first_real = if ranges.is_empty() {
            exit
        } else {
            BlockId(1)
        };
        cfg.add_edge(EdgeKind::FallThrough, entry, first_real);

        let symbols = self.unit.symbol_table();
        for (i, &(start, end)) in ranges.iter().enumerate() {
            let block = BlockId(i as u32 + 1);
            let next = if i + 1 < ranges.len() {
                BlockId(i as u32 + 2)
            } else {
                exit
            };

            let last_insn = (start..=end)
                .rev()
                .find_map(|idx| self.unit.entry(self.entry_ids[idx]).as_insn());

            let Some(insn) = last_insn else {
                cfg.add_edge(EdgeKind::FallThrough, block, next);
                continue;
            };

            if insn.is_return() {
                cfg.add_edge(EdgeKind::Return, block, exit);
            } else if insn.is_unconditional_jump() {
                if let Some(&dst) = label_block.get(insn.target(symbols)) {
                    cfg.add_edge(EdgeKind::Taken, block, dst);
                }
                // No fall-through after an unconditional jump.
            } else if insn.is_conditional_jump() {
                if let Some(&dst) = label_block.get(insn.target(symbols)) {
                    cfg.add_edge(EdgeKind::Taken, block, dst);
                }
                cfg.add_edge(EdgeKind::NotTaken, block, next);
            } else if insn.is_call() {
                // A per-function graph can only represent recursive calls;
                // the callee may return either way.
                if let Some(&dst) = label_block.get(insn.target(symbols)) {
                    cfg.add_edge(EdgeKind::Call, block, dst);
                }
                cfg.add_edge(EdgeKind::FallThrough, block, next);
            } else {
                cfg.add_edge(EdgeKind::FallThrough, block, next);
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::insn::{Insn, Operand, OperandType};
    use crate::ir::EntryKind;
    use crate::symbols::SymbolType;
    use alloc::boxed::Box;
    use alloc::vec;

    fn label(name: &str) -> EntryKind {
        EntryKind::Label {
            name: name.to_string(),
        }
    }

    fn insn(mnemonic: &str) -> EntryKind {
        EntryKind::Insn(Box::new(Insn::new(mnemonic)))
    }

    fn jump(unit: &mut Unit, mnemonic: &str, target: &str) -> EntryKind {
        let sym = unit.find_or_create_symbol(target);
        let mut insn = Insn::new(mnemonic);
        insn.operands = vec![Operand::mem(OperandType::DISP32, Expr::symbol(sym, 0))];
        EntryKind::Insn(Box::new(insn))
    }

    fn build_function(unit: &mut Unit, name: &str) -> Cfg {
        let sym = unit.symbol_table().find(name).unwrap();
        unit.symbol_table_mut()
            .get_mut(sym)
            .set_symbol_type(SymbolType::Function);
        unit.find_functions().unwrap();
        let function = unit.functions().next().unwrap();
        Cfg::build(unit, function)
    }

    #[test]
    fn straight_line_is_one_block() {
        let mut unit = Unit::new();
        unit.add_entry(label("f"), 1, None, true).unwrap();
        unit.add_entry(insn("nop"), 2, None, true).unwrap();
        unit.add_entry(insn("ret"), 3, None, true).unwrap();
        let cfg = build_function(&mut unit, "f");

        // entry + one real block + exit
        assert_eq!(cfg.num_blocks(), 3);
        let real = cfg.block(BlockId(1));
        assert!(!real.is_synthetic());
        let out: Vec<EdgeKind> = cfg.out_edges(BlockId(1)).map(|e| e.kind).collect();
        assert_eq!(out, [EdgeKind::Return]);
        assert_eq!(cfg.begin().id(), cfg.entry_block());
    }

    #[test]
    fn conditional_branch_has_two_out_edges() {
        let mut unit = Unit::new();
        unit.add_entry(label("f"), 1, None, true).unwrap();
        let je = jump(&mut unit, "je", "done");
        unit.add_entry(je, 2, None, true).unwrap();
        unit.add_entry(insn("nop"), 3, None, true).unwrap();
        unit.add_entry(label("done"), 4, None, true).unwrap();
        unit.add_entry(insn("ret"), 5, None, true).unwrap();
        let cfg = build_function(&mut unit, "f");

        // entry, [f: je], [nop], [done: ret], exit
        assert_eq!(cfg.num_blocks(), 5);
        let mut out: Vec<(EdgeKind, BlockId)> =
            cfg.out_edges(BlockId(1)).map(|e| (e.kind, e.dst)).collect();
        out.sort_by_key(|(_, dst)| dst.0);
        assert_eq!(
            out,
            [
                (EdgeKind::NotTaken, BlockId(2)),
                (EdgeKind::Taken, BlockId(3))
            ]
        );
    }

    #[test]
    fn unconditional_jump_has_no_fall_through() {
        let mut unit = Unit::new();
        unit.add_entry(label("f"), 1, None, true).unwrap();
        let jmp = jump(&mut unit, "jmp", "l");
        unit.add_entry(jmp, 2, None, true).unwrap();
        unit.add_entry(insn("nop"), 3, None, true).unwrap();
        unit.add_entry(label("l"), 4, None, true).unwrap();
        unit.add_entry(insn("ret"), 5, None, true).unwrap();
        let cfg = build_function(&mut unit, "f");

        let out: Vec<(EdgeKind, BlockId)> =
            cfg.out_edges(BlockId(1)).map(|e| (e.kind, e.dst)).collect();
        assert_eq!(out, [(EdgeKind::Taken, BlockId(3))]);
    }

    #[test]
    fn call_has_fall_through() {
        let mut unit = Unit::new();
        unit.add_entry(label("f"), 1, None, true).unwrap();
        let call = jump(&mut unit, "call", "external");
        unit.add_entry(call, 2, None, true).unwrap();
        unit.add_entry(insn("ret"), 3, None, true).unwrap();
        let cfg = build_function(&mut unit, "f");

        // call ends its block; the external target contributes no edge
        let out: Vec<EdgeKind> = cfg.out_edges(BlockId(1)).map(|e| e.kind).collect();
        assert_eq!(out, [EdgeKind::FallThrough]);
    }

    #[test]
    fn block_entry_counts() {
        let mut unit = Unit::new();
        unit.add_entry(label("f"), 1, None, true).unwrap();
        unit.add_entry(insn("nop"), 2, None, true).unwrap();
        unit.add_entry(insn("ret"), 3, None, true).unwrap();
        let cfg = build_function(&mut unit, "f");
        assert_eq!(cfg.num_block_entries(&unit, BlockId(1)), 3);
        assert_eq!(cfg.num_block_entries(&unit, cfg.entry_block()), 0);
    }
}
