//! Branch relaxation: fragment construction, iterative fixed-point size
//! resolution, and per-entry size back-annotation.
//!
//! A section's entries are converted into a chain of fragments, each a run
//! of fixed-size bytes followed by an optional variable-size tail (a
//! relaxable branch, alignment padding, a LEB128 value, or a symbolic
//! `.space`).  The fixed point iterates until no fragment grows; growth is
//! monotone, so convergence is guaranteed.  Final sizes are written back
//! into a per-entry size map whose sum equals the section length.
//!
//! Fragments and the anchor symbols synthesized for complex expressions are
//! owned by the relaxation run and dropped when it completes.

use alloc::collections::BTreeMap;
use alloc::string::ToString;
use alloc::vec::Vec;

use crate::error::Error;
use crate::expr::{convert_to_bignum, sizeof_big_leb128, sizeof_leb128, Expr, ExprOp};
use crate::insn::{Insn, DATA_PREFIX};
use crate::ir::{DirOperand, Directive, DirectiveOp, Entry, EntryId, EntryKind};
use crate::symbols::SymbolId;
use crate::unit::{SectionId, Unit};

/// Per-entry byte sizes after relaxation.
pub type SizeMap = BTreeMap<EntryId, u64>;

/// Upper bound on relaxation passes.  Monotone growth converges in at most
/// one pass per fragment on well-formed input; the bound is defensive.
pub const MAX_RELAX_PASSES: usize = 100;

// ─── Front-end contract ────────────────────────────────────

/// The oracles the embedded assembler front-end supplies.
///
/// The relaxer never encodes instructions itself: it asks the front-end for
/// each instruction's fixed byte count and whether the instruction needs
/// machine-dependent relaxation.  For a relaxable jump the fixed part
/// covers prefixes plus the first opcode byte; the displacement (and, for
/// long conditionals, the second opcode byte) belongs to the fragment's
/// variable tail.
pub trait InsnEncoder {
    /// `(fixed_bytes, needs_relaxation)` for one instruction.
    fn size_of_instruction(&self, insn: &Insn) -> (u64, bool);

    /// The opcode bytes carried by a relaxable fragment.
    fn encode_instruction_bytes(&self, insn: &Insn) -> Vec<u8>;

    /// Whether 16-bit code mode is active.
    fn is_code16(&self) -> bool {
        false
    }

    /// Whether the target has the 386 long-displacement conditionals.
    fn has_386(&self) -> bool {
        true
    }
}

// ─── Relax states ──────────────────────────────────────────

const UNCOND_JUMP: u32 = 0;
const COND_JUMP: u32 = 1;
const COND_JUMP86: u32 = 2;

const SMALL: u32 = 0;
const CODE16: u32 = 1;
const BIG: u32 = 2;

const fn encode_relax_state(kind: u32, size: u32) -> u32 {
    (kind << 2) | size
}

struct RelaxState {
    forward: i64,
    backward: i64,
    length: u64,
    next: u32,
}

const fn rs(forward: i64, backward: i64, length: u64, next: u32) -> RelaxState {
    RelaxState {
        forward,
        backward,
        length,
        next,
    }
}

// Variable-part lengths per state.  The opcode byte sits in the fragment's
// fixed part, so a SMALL jump contributes its single displacement byte
// here; growing an unconditional jump adds a dword displacement, growing a
// conditional also adds the second opcode byte.  The displacement is
// measured from the end of the SMALL form, hence the +1 bounds.
static RELAX_TABLE: [RelaxState; 12] = [
    // unconditional jumps
    rs(127 + 1, -128 + 1, 1, encode_relax_state(UNCOND_JUMP, BIG)),
    rs(127 + 1, -128 + 1, 1, encode_relax_state(UNCOND_JUMP, BIG) | CODE16),
    rs(0, 0, 4, 0),
    rs(0, 0, 2, 0),
    // conditional jumps
    rs(127 + 1, -128 + 1, 1, encode_relax_state(COND_JUMP, BIG)),
    rs(127 + 1, -128 + 1, 1, encode_relax_state(COND_JUMP, BIG) | CODE16),
    rs(0, 0, 5, 0),
    rs(0, 0, 3, 0),
    // pre-386 conditionals: the word form is a short jump around a
    // three-byte long branch
    rs(127 + 1, -128 + 1, 1, encode_relax_state(COND_JUMP86, BIG)),
    rs(127 + 1, -128 + 1, 1, encode_relax_state(COND_JUMP86, BIG) | CODE16),
    rs(0, 0, 5, 0),
    rs(0, 0, 4, 0),
];

fn step_states(mut state: u32, aim: i64) -> u32 {
    loop {
        let t = &RELAX_TABLE[state as usize];
        if t.next == 0 {
            return state;
        }
        let in_range = if aim < 0 {
            aim >= t.backward
        } else {
            aim <= t.forward
        };
        if in_range {
            return state;
        }
        state = t.next;
    }
}

fn largest_state(mut state: u32) -> u32 {
    loop {
        let t = &RELAX_TABLE[state as usize];
        if t.next == 0 {
            return state;
        }
        state = t.next;
    }
}

// ─── Fragments ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragKind {
    /// Relaxable branch; `subtype` is the relax state.
    MachineDependent,
    /// Alignment padding; `offset` is log2 of the alignment, `subtype` the
    /// maximum padding to accept (0 for unlimited).  Serves text and data
    /// alike; fill-byte selection is an encoding-time concern.
    Align,
    /// LEB128 value; `subtype` is the signedness.
    Leb128,
    /// Symbolic `.space` count.
    Space,
}

/// Which symbol a fragment's variable part depends on: a unit symbol, or a
/// relaxation-local anchor synthesized for a complex expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragSym {
    Table(SymbolId),
    Local(usize),
}

#[derive(Debug)]
struct Frag {
    address: u64,
    fix: u64,
    kind: FragKind,
    subtype: u32,
    offset: i64,
    symbol: Option<FragSym>,
    opcode: Vec<u8>,
    /// Current variable-size estimate for [`FragKind::Leb128`] and
    /// [`FragKind::Space`]; grows monotonically.
    var_size: u64,
}

impl Default for Frag {
    fn default() -> Self {
        // An open fragment reads as a zero-alignment terminator until it is
        // explicitly ended, which also closes the chain after the last
        // entry.
        Frag {
            address: 0,
            fix: 0,
            kind: FragKind::Align,
            subtype: 0,
            offset: 0,
            symbol: None,
            opcode: Vec::new(),
            var_size: 0,
        }
    }
}

// ─── Relaxer ───────────────────────────────────────────────

/// Runs the relaxation phases over one section.
#[derive(Debug)]
pub struct Relaxer {
    frags: Vec<Frag>,
    relax_map: BTreeMap<usize, EntryId>,
    /// Label symbol → (fragment index, offset within its fixed part).
    anchors: BTreeMap<SymbolId, (usize, u64)>,
    /// Anchor expressions synthesized for complex operands; owned by this
    /// run and dropped with it.
    expr_syms: Vec<Expr>,
}

impl Relaxer {
    /// Relax one section: build fragments, iterate to a fixed point, and
    /// write each entry's final byte size into `size_map`.  Returns the
    /// final section length, which equals the sum of the recorded sizes.
    ///
    /// Signed LEB128 constants whose stored sign disagrees with their
    /// unsigned flag are repaired in place (converted to big values) before
    /// sizing.
    ///
    /// # Errors
    ///
    /// Malformed directive operands, non-positive `.space` counts,
    /// variable-size non-jump instructions, and a non-converging fixed
    /// point (defensive bound) are all fatal.
    pub fn relax(
        unit: &mut Unit,
        section: SectionId,
        encoder: &dyn InsnEncoder,
        size_map: &mut SizeMap,
    ) -> Result<u64, Error> {
        let mut relaxer = Relaxer {
            frags: alloc::vec![Frag::default()],
            relax_map: BTreeMap::new(),
            anchors: BTreeMap::new(),
            expr_syms: Vec::new(),
        };

        relaxer.build_fragments(unit, section, encoder, size_map)?;

        let mut pass = 0;
        while relaxer.relax_segment() {
            pass += 1;
            if pass >= MAX_RELAX_PASSES {
                return Err(Error::RelaxationLimit {
                    max: MAX_RELAX_PASSES,
                });
            }
        }
        log::trace!(target: "relax", "fixed point after {} passes", pass + 1);

        // Back-annotate the variable part of each tagged fragment.  The
        // successor always exists: tagged fragments are ended with a fresh
        // fragment allocated behind them.
        for (&frag, &entry) in &relaxer.relax_map {
            let var =
                relaxer.frags[frag + 1].address - relaxer.frags[frag].address - relaxer.frags[frag].fix;
            *size_map.entry(entry).or_insert(0) += var;
        }

        let total = relaxer
            .frags
            .last()
            .map_or(0, |tail| tail.address + tail.fix);
        Ok(total)
        // The fragment chain and local anchor symbols drop here.
    }

    // ── phase A: fragment construction ─────────────────────

    fn cur(&self) -> usize {
        self.frags.len() - 1
    }

    fn cur_frag_mut(&mut self) -> &mut Frag {
        let i = self.cur();
        &mut self.frags[i]
    }

    fn frag_var(
        &mut self,
        kind: FragKind,
        subtype: u32,
        symbol: Option<FragSym>,
        offset: i64,
        opcode: Vec<u8>,
        new_frag: bool,
    ) {
        let frag = self.cur_frag_mut();
        frag.kind = kind;
        frag.subtype = subtype;
        frag.symbol = symbol;
        frag.offset = offset;
        frag.opcode = opcode;
        if new_frag {
            self.frags.push(Frag::default());
        }
    }

    fn intern_expr_symbol(&mut self, expr: &Expr) -> FragSym {
        let index = self.expr_syms.len();
        self.expr_syms.push(expr.clone());
        FragSym::Local(index)
    }

    fn build_fragments(
        &mut self,
        unit: &mut Unit,
        section: SectionId,
        encoder: &dyn InsnEncoder,
        size_map: &mut SizeMap,
    ) -> Result<(), Error> {
        let entry_ids: Vec<EntryId> = {
            let section = unit.section_by_id(section);
            unit.section_entries(section).map(Entry::id).collect()
        };

        for id in entry_ids {
            repair_signed_leb(unit, id);

            let entry = unit.entry(id);
            match entry.kind() {
                EntryKind::Label { name } => {
                    if let Some(sym) = unit.symbol_table().find(name) {
                        let frag = self.cur();
                        let offset = self.frags[frag].fix;
                        self.anchors.insert(sym, (frag, offset));
                    }
                }
                EntryKind::Debug { .. } => {}
                EntryKind::Insn(insn) => {
                    let (fixed, variable) = encoder.size_of_instruction(insn);
                    self.cur_frag_mut().fix += fixed;
                    size_map.insert(id, fixed);
                    if variable {
                        self.relax_map.insert(self.cur(), id);
                        self.end_fragment_instruction(insn, encoder)?;
                    }
                }
                EntryKind::Directive(d) => {
                    self.build_directive(entry, d, id, size_map)?;
                }
            }
        }

        // The open tail fragment is already a zero-alignment terminator.
        Ok(())
    }

    fn build_directive(
        &mut self,
        entry: &Entry,
        d: &Directive,
        id: EntryId,
        size_map: &mut SizeMap,
    ) -> Result<(), Error> {
        match d.op {
            DirectiveOp::P2align | DirectiveOp::P2alignw | DirectiveOp::P2alignl => {
                if d.num_operands() != 3 {
                    return Err(Error::MissingOperands {
                        directive: d.op.name(),
                        expected: 3,
                        found: d.num_operands(),
                    });
                }
                let alignment = int_operand(d, 0)?;
                let max_skip = int_operand(d, 2)?;
                size_map.insert(id, 0);
                self.relax_map.insert(self.cur(), id);
                self.frag_var(
                    FragKind::Align,
                    max_skip.max(0) as u32,
                    None,
                    alignment,
                    Vec::new(),
                    true,
                );
            }

            DirectiveOp::Sleb128 | DirectiveOp::Uleb128 => {
                let signed = d.op == DirectiveOp::Sleb128;
                let expr = expr_operand(d, 0)?;
                match expr.op {
                    ExprOp::Constant => {
                        let size = sizeof_leb128(expr.add_number, signed);
                        self.cur_frag_mut().fix += size;
                        size_map.insert(id, size);
                    }
                    ExprOp::Big => {
                        let size = sizeof_big_leb128(&expr.littlenums, signed);
                        self.cur_frag_mut().fix += size;
                        size_map.insert(id, size);
                    }
                    _ => {
                        size_map.insert(id, 0);
                        self.relax_map.insert(self.cur(), id);
                        let symbol = self.intern_expr_symbol(expr);
                        self.frag_var(
                            FragKind::Leb128,
                            u32::from(signed),
                            Some(symbol),
                            0,
                            Vec::new(),
                            true,
                        );
                    }
                }
            }

            DirectiveOp::Byte => self.fixed_bytes(id, 1, size_map),
            DirectiveOp::Word => self.fixed_bytes(id, 2, size_map),
            DirectiveOp::Rva | DirectiveOp::Long => self.fixed_bytes(id, 4, size_map),
            DirectiveOp::Quad => self.fixed_bytes(id, 8, size_map),

            DirectiveOp::Ascii => self.handle_string(entry, d, id, 1, false, size_map)?,
            DirectiveOp::String8 => self.handle_string(entry, d, id, 1, true, size_map)?,
            DirectiveOp::String16 => self.handle_string(entry, d, id, 2, true, size_map)?,
            DirectiveOp::String32 => self.handle_string(entry, d, id, 4, true, size_map)?,
            DirectiveOp::String64 => self.handle_string(entry, d, id, 8, true, size_map)?,

            DirectiveOp::Space => self.handle_space(entry, d, id, 0, size_map)?,
            DirectiveOp::DsB => self.handle_space(entry, d, id, 1, size_map)?,
            DirectiveOp::DsW => self.handle_space(entry, d, id, 2, size_map)?,
            DirectiveOp::DsL => self.handle_space(entry, d, id, 4, size_map)?,
            DirectiveOp::DsD => self.handle_space(entry, d, id, 8, size_map)?,
            DirectiveOp::DsX => self.handle_space(entry, d, id, 12, size_map)?,

            DirectiveOp::Comm
            | DirectiveOp::Ident
            | DirectiveOp::File
            | DirectiveOp::Section
            | DirectiveOp::Globl
            | DirectiveOp::Local
            | DirectiveOp::Weak
            | DirectiveOp::Type
            | DirectiveOp::Size
            | DirectiveOp::Set
            | DirectiveOp::Equiv
            | DirectiveOp::Weakref
            | DirectiveOp::Arch => {
                size_map.insert(id, 0);
            }
        }
        Ok(())
    }

    fn fixed_bytes(&mut self, id: EntryId, size: u64, size_map: &mut SizeMap) {
        self.cur_frag_mut().fix += size;
        size_map.insert(id, size);
    }

    fn handle_string(
        &mut self,
        entry: &Entry,
        d: &Directive,
        id: EntryId,
        multiplier: u64,
        null_terminate: bool,
        size_map: &mut SizeMap,
    ) -> Result<(), Error> {
        let text = match d.operand(0)? {
            DirOperand::Str(s) => s,
            _ => {
                return Err(Error::OperandKind {
                    directive: d.op.name(),
                    expected: "a string literal",
                })
            }
        };
        // The parser keeps the surrounding quotes, hence the -2.
        let Some(chars) = text.len().checked_sub(2) else {
            return Err(Error::StringLiteral {
                line: entry.line_number(),
            });
        };
        let size = multiplier * (chars as u64 + u64::from(null_terminate));
        self.fixed_bytes(id, size, size_map);
        Ok(())
    }

    fn handle_space(
        &mut self,
        entry: &Entry,
        d: &Directive,
        id: EntryId,
        mult: u64,
        size_map: &mut SizeMap,
    ) -> Result<(), Error> {
        if d.num_operands() != 2 {
            return Err(Error::MissingOperands {
                directive: d.op.name(),
                expected: 2,
                found: d.num_operands(),
            });
        }
        let expr = expr_operand(d, 0)?;

        if expr.op == ExprOp::Constant {
            let increment = expr.add_number * mult.max(1) as i64;
            if increment <= 0 {
                return Err(Error::SpaceSize {
                    value: increment,
                    line: entry.line_number(),
                });
            }
            self.fixed_bytes(id, increment as u64, size_map);
        } else {
            if mult > 1 {
                return Err(Error::OperandKind {
                    directive: d.op.name(),
                    expected: "a constant count for multi-byte units",
                });
            }
            size_map.insert(id, 0);
            self.relax_map.insert(self.cur(), id);
            let symbol = self.intern_expr_symbol(expr);
            self.frag_var(FragKind::Space, 0, Some(symbol), 0, Vec::new(), true);
        }
        Ok(())
    }

    fn end_fragment_instruction(
        &mut self,
        insn: &Insn,
        encoder: &dyn InsnEncoder,
    ) -> Result<(), Error> {
        if !insn.has_target() {
            return Err(Error::UnrelaxableInstruction {
                mnemonic: insn.mnemonic.as_str().to_string(),
            });
        }

        let mut code16 = if encoder.is_code16() { CODE16 } else { 0 };
        if insn.prefixes[DATA_PREFIX] != 0 {
            code16 ^= CODE16;
        }

        let jump_kind = if insn.is_unconditional_jump() {
            UNCOND_JUMP
        } else if encoder.has_386() {
            COND_JUMP
        } else {
            COND_JUMP86
        };
        let subtype = encode_relax_state(jump_kind, SMALL) | code16;

        let disp = (0..insn.num_operands())
            .find(|&i| insn.is_mem_operand(i))
            .and_then(|i| insn.operands[i].disp());

        let (symbol, offset) = match disp {
            Some(e) if e.op == ExprOp::Constant => (None, e.add_number),
            Some(e) if e.op == ExprOp::Symbol => {
                (e.add_symbol.map(FragSym::Table), e.add_number)
            }
            // Complex expressions get a local anchor symbol and a zeroed
            // offset, leaving the unit's symbols untouched.
            Some(e) => (Some(self.intern_expr_symbol(e)), 0),
            None => (None, 0),
        };

        let opcode = encoder.encode_instruction_bytes(insn);
        self.frag_var(
            FragKind::MachineDependent,
            subtype,
            symbol,
            offset,
            opcode,
            true,
        );
        Ok(())
    }

    // ── phase B: fixed point ───────────────────────────────

    /// One relaxation pass: recompute fragment addresses, then grow any
    /// variable part that no longer fits.  Returns whether anything grew.
    fn relax_segment(&mut self) -> bool {
        let mut address = 0u64;
        for i in 0..self.frags.len() {
            self.frags[i].address = address;
            address += self.frags[i].fix;
            address += self.contribution(i, address);
        }

        let mut changed = false;
        for i in 0..self.frags.len() {
            match self.frags[i].kind {
                FragKind::MachineDependent => {
                    if RELAX_TABLE[self.frags[i].subtype as usize].next == 0 {
                        continue;
                    }
                    let new_state = match self.frag_target(i) {
                        Some(target) => {
                            let aim =
                                target - (self.frags[i].address + self.frags[i].fix) as i64;
                            step_states(self.frags[i].subtype, aim)
                        }
                        // Out-of-section targets take the largest form.
                        None => largest_state(self.frags[i].subtype),
                    };
                    if new_state != self.frags[i].subtype {
                        self.frags[i].subtype = new_state;
                        changed = true;
                    }
                }
                FragKind::Leb128 => {
                    if let Some(value) = self.symbol_value(self.frags[i].symbol) {
                        let signed = self.frags[i].subtype != 0;
                        let size = sizeof_leb128(value, signed);
                        if size > self.frags[i].var_size {
                            self.frags[i].var_size = size;
                            changed = true;
                        }
                    }
                }
                FragKind::Space => {
                    if let Some(value) = self.symbol_value(self.frags[i].symbol) {
                        let size = value.max(0) as u64;
                        if size > self.frags[i].var_size {
                            self.frags[i].var_size = size;
                            changed = true;
                        }
                    }
                }
                FragKind::Align => {}
            }
        }
        changed
    }

    /// The variable-part contribution of fragment `i` when its fixed part
    /// ends at `address`.
    fn contribution(&self, i: usize, address: u64) -> u64 {
        let frag = &self.frags[i];
        match frag.kind {
            FragKind::MachineDependent => RELAX_TABLE[frag.subtype as usize].length,
            FragKind::Align => {
                let p2 = frag.offset.clamp(0, 63) as u32;
                if p2 == 0 {
                    return 0;
                }
                let mask = (1u64 << p2) - 1;
                let padding = (mask + 1 - (address & mask)) & mask;
                if frag.subtype != 0 && padding > u64::from(frag.subtype) {
                    0
                } else {
                    padding
                }
            }
            FragKind::Leb128 | FragKind::Space => frag.var_size,
        }
    }

    fn frag_target(&self, i: usize) -> Option<i64> {
        let frag = &self.frags[i];
        match frag.symbol {
            None => Some(frag.offset),
            Some(sym) => Some(self.resolve(sym)? + frag.offset),
        }
    }

    fn symbol_value(&self, symbol: Option<FragSym>) -> Option<i64> {
        self.resolve(symbol?)
    }

    fn resolve(&self, symbol: FragSym) -> Option<i64> {
        match symbol {
            FragSym::Table(id) => self.table_value(id),
            FragSym::Local(index) => self.eval(&self.expr_syms[index]),
        }
    }

    fn table_value(&self, id: SymbolId) -> Option<i64> {
        let &(frag, offset) = self.anchors.get(&id)?;
        Some((self.frags[frag].address + offset) as i64)
    }

    fn eval(&self, expr: &Expr) -> Option<i64> {
        match expr.op {
            ExprOp::Constant => Some(expr.add_number),
            ExprOp::Symbol => Some(self.table_value(expr.add_symbol?)? + expr.add_number),
            ExprOp::Add => Some(
                self.table_value(expr.add_symbol?)?
                    + self.table_value(expr.op_symbol?)?
                    + expr.add_number,
            ),
            ExprOp::Subtract => Some(
                self.table_value(expr.add_symbol?)?
                    - self.table_value(expr.op_symbol?)?
                    + expr.add_number,
            ),
            _ => None,
        }
    }
}

/// Convert a signed-LEB128 constant whose stored sign bit disagrees with
/// its unsigned flag into a big value, in place.
fn repair_signed_leb(unit: &mut Unit, id: EntryId) {
    let needs_repair = match unit.entry(id).kind() {
        EntryKind::Directive(d) if d.op == DirectiveOp::Sleb128 => match d.operands.first() {
            Some(DirOperand::Expr(e)) => {
                e.op == ExprOp::Constant && (e.add_number < 0) != !e.unsigned
            }
            _ => false,
        },
        _ => false,
    };
    if !needs_repair {
        return;
    }
    let line = unit.entry(id).line_number();
    if let EntryKind::Directive(d) = unit.entry_mut(id).kind_mut() {
        if let Some(DirOperand::Expr(e)) = d.operands.first_mut() {
            convert_to_bignum(e);
            log::debug!(
                target: "relax",
                "line {}: converted signed leb128 constant to a big value",
                line
            );
        }
    }
}

fn int_operand(d: &Directive, index: usize) -> Result<i64, Error> {
    match d.operand(index)? {
        DirOperand::Int(n) => Ok(*n),
        _ => Err(Error::OperandKind {
            directive: d.op.name(),
            expected: "an integer",
        }),
    }
}

fn expr_operand<'a>(d: &'a Directive, index: usize) -> Result<&'a Expr, Error> {
    match d.operand(index)? {
        DirOperand::Expr(e) => Ok(e),
        _ => Err(Error::OperandKind {
            directive: d.op.name(),
            expected: "an expression",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relax_state_encoding() {
        assert_eq!(encode_relax_state(UNCOND_JUMP, SMALL), 0);
        assert_eq!(encode_relax_state(UNCOND_JUMP, BIG), 2);
        assert_eq!(encode_relax_state(COND_JUMP, SMALL), 4);
        assert_eq!(encode_relax_state(COND_JUMP, BIG), 6);
        assert_eq!(encode_relax_state(COND_JUMP86, BIG) | CODE16, 11);
    }

    #[test]
    fn small_states_hold_disp8_range() {
        // aim = disp + 1 for the 1-byte small form
        let small = encode_relax_state(COND_JUMP, SMALL);
        assert_eq!(step_states(small, 128), small); // disp = 127
        assert_eq!(step_states(small, -127), small); // disp = -128
        assert_eq!(
            step_states(small, 129),
            encode_relax_state(COND_JUMP, BIG)
        );
        assert_eq!(
            step_states(small, -128),
            encode_relax_state(COND_JUMP, BIG)
        );
    }

    #[test]
    fn big_states_are_terminal() {
        let big = encode_relax_state(UNCOND_JUMP, BIG);
        assert_eq!(step_states(big, 1 << 40), big);
        assert_eq!(largest_state(encode_relax_state(UNCOND_JUMP, SMALL)), big);
        assert_eq!(
            largest_state(encode_relax_state(COND_JUMP86, SMALL) | CODE16),
            encode_relax_state(COND_JUMP86, BIG) | CODE16
        );
    }

    #[test]
    fn variable_lengths_match_encodings() {
        // small = disp8; uncond big = disp32; cond big = opcode + disp32
        assert_eq!(RELAX_TABLE[encode_relax_state(UNCOND_JUMP, SMALL) as usize].length, 1);
        assert_eq!(RELAX_TABLE[encode_relax_state(UNCOND_JUMP, BIG) as usize].length, 4);
        assert_eq!(RELAX_TABLE[encode_relax_state(COND_JUMP, BIG) as usize].length, 5);
        assert_eq!(
            RELAX_TABLE[(encode_relax_state(COND_JUMP, BIG) | CODE16) as usize].length,
            3
        );
    }
}
