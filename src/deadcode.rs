//! Unreachable basic-block discovery.
//!
//! A forward depth-first walk from the CFG root marks every reachable
//! block; whatever stays unmarked is reported.  The pass is diagnostic
//! only — the policy for acting on dead blocks belongs to the driver.

use alloc::vec::Vec;

use crate::cfg::{BlockId, Cfg};
use crate::error::Error;
use crate::passes::{Finding, OptionDef, Pass, PassDescriptor};
use crate::unit::Unit;

/// The registry name of this pass.
pub const PASS_NAME: &str = "DCE";

/// The pass declares no options.
pub static OPTIONS: &[OptionDef] = &[];

/// Registry descriptor.
pub static DESCRIPTOR: PassDescriptor = PassDescriptor {
    name: PASS_NAME,
    options: OPTIONS,
    run: run_pass,
};

fn run_pass(unit: &Unit, cfg: &Cfg, pass: &mut Pass) -> Result<Vec<Finding>, Error> {
    Ok(find_dead_blocks(unit, cfg, pass)
        .into_iter()
        .map(|block| Finding::DeadBlock {
            block,
            entries: cfg.num_block_entries(unit, block),
        })
        .collect())
}

/// Blocks with no path from the root, in id order.
#[must_use]
pub fn find_dead_blocks(unit: &Unit, cfg: &Cfg, pass: &Pass) -> Vec<BlockId> {
    let mut reached = alloc::vec![false; cfg.num_blocks()];
    let mut stack = alloc::vec![cfg.entry_block()];
    while let Some(block) = stack.pop() {
        if reached[block.0 as usize] {
            continue;
        }
        reached[block.0 as usize] = true;
        for edge in cfg.out_edges(block) {
            stack.push(edge.dst);
        }
    }

    let mut dead = Vec::new();
    for block in cfg.blocks() {
        if reached[block.id().0 as usize] {
            continue;
        }
        let entries = cfg.num_block_entries(unit, block.id());
        match entries {
            0 => pass.trace(1, format_args!("found dead, empty basic block")),
            1 => {
                let only = cfg.block_entries(unit, block.id()).next();
                if only.is_some_and(crate::ir::Entry::is_label) {
                    pass.trace(1, format_args!("found dead, single label basic block"));
                } else {
                    pass.trace(1, format_args!("found dead, single insn basic block"));
                }
            }
            n => pass.trace(
                1,
                format_args!("found dead basic block: BB#{}, {} entries", block.id().0, n),
            ),
        }
        dead.push(block.id());
    }
    dead
}
