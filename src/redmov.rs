//! Redundant memory-load detection.
//!
//! Within a basic block, a load `mov mem, reg` followed within a bounded
//! window by a second load of the structurally identical memory operand —
//! with no intervening redefinition of the loaded value or its address
//! registers, and no memory-touching or register-clobbering instruction —
//! is reported as a candidate pair.  Diagnostic only.

use alloc::vec::Vec;

use crate::cfg::Cfg;
use crate::defs::{mask_for_register, register_def_mask, REG_ALL};
use crate::error::Error;
use crate::ir::EntryId;
use crate::passes::{Finding, OptionDef, OptionDefault, Pass, PassDescriptor};
use crate::unit::Unit;

/// The registry name of this pass.
pub const PASS_NAME: &str = "REDMOV";

/// Declared options: the forward-scan window.
pub static OPTIONS: &[OptionDef] = &[OptionDef {
    name: "lookahead",
    default: OptionDefault::Int(6),
    help: "Look ahead limit for pattern matcher",
}];

/// Registry descriptor.
pub static DESCRIPTOR: PassDescriptor = PassDescriptor {
    name: PASS_NAME,
    options: OPTIONS,
    run: run_pass,
};

fn run_pass(unit: &Unit, cfg: &Cfg, pass: &mut Pass) -> Result<Vec<Finding>, Error> {
    Ok(find_redundant_loads(unit, cfg, pass)?
        .into_iter()
        .map(|(first, second)| Finding::RedundantLoad { first, second })
        .collect())
}

fn is_load(insn: &crate::insn::Insn) -> bool {
    insn.mnemonic == "mov" && insn.is_register_operand(1) && insn.is_mem_operand(0)
}

/// Candidate `(first, second)` load pairs.
///
/// # Errors
///
/// Propagates option lookup failures.
pub fn find_redundant_loads(
    unit: &Unit,
    cfg: &Cfg,
    pass: &Pass,
) -> Result<Vec<(EntryId, EntryId)>, Error> {
    let lookahead = pass.int("lookahead")?;
    let mut findings = Vec::new();

    for block in cfg.blocks() {
        for entry in cfg.block_entries(unit, block.id()) {
            let Some(insn) = entry.as_insn() else {
                continue;
            };
            if !is_load(insn) {
                continue;
            }

            let mut mask = register_def_mask(insn);
            let base_index =
                mask_for_register(insn.base_reg) | mask_for_register(insn.index_reg);
            // A load like mov (%rax), %rax feeds its own address; skip it.
            if mask & base_index != 0 {
                continue;
            }
            mask |= base_index;

            let mut checked = 0;
            let mut cursor = unit.next_instruction(entry.id());
            while let Some(next_id) = cursor {
                if checked >= lookahead {
                    break;
                }
                let Some(next) = unit.entry(next_id).as_insn() else {
                    break;
                };
                if next.is_control_transfer() || next.is_call() || next.is_return() {
                    break;
                }
                let defs = register_def_mask(next);
                if defs == 0 || defs == REG_ALL {
                    // Defines something other than registers, or everything.
                    break;
                }
                if is_load(next) && insn.compare_mem_operand(0, next, 0) {
                    pass.trace(
                        1,
                        format_args!(
                            "found two loads from the same memory operand ([{}] and [{}])",
                            entry.id(),
                            next_id
                        ),
                    );
                    findings.push((entry.id(), next_id));
                }
                if defs & mask != 0 {
                    // The first load's value (or address) gets redefined.
                    break;
                }
                checked += 1;
                cursor = unit.next_instruction(next_id);
            }
        }
    }
    Ok(findings)
}
