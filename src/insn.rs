//! Machine-instruction records: registers, operands, prefixes, and the
//! classification helpers the analyses are built on.
//!
//! An [`Insn`] preserves everything needed to round-trip an instruction
//! through a GNU-as style printer: per-operand type bitfields, relocation
//! kinds, base/index/scale addressing, segment overrides, and raw prefix
//! bytes in their slot positions.

use alloc::string::ToString;
use alloc::vec::Vec;
use bitflags::bitflags;
use core::fmt;

use crate::error::Error;
use crate::expr::{Expr, ExprOp};
use crate::symbols::SymbolTable;

// ─── Registers ─────────────────────────────────────────────

/// An x86/x86-64 architectural register.
///
/// General-purpose registers are present in all four widths; the 8/16/32-bit
/// names alias the low bits of their 64-bit parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Register {
    // 64-bit general purpose
    Rax, Rcx, Rdx, Rbx, Rsp, Rbp, Rsi, Rdi,
    R8, R9, R10, R11, R12, R13, R14, R15,
    // 32-bit general purpose
    Eax, Ecx, Edx, Ebx, Esp, Ebp, Esi, Edi,
    R8d, R9d, R10d, R11d, R12d, R13d, R14d, R15d,
    // 16-bit general purpose
    Ax, Cx, Dx, Bx, Sp, Bp, Si, Di,
    R8w, R9w, R10w, R11w, R12w, R13w, R14w, R15w,
    // 8-bit general purpose
    Al, Cl, Dl, Bl, Spl, Bpl, Sil, Dil,
    Ah, Ch, Dh, Bh,
    R8b, R9b, R10b, R11b, R12b, R13b, R14b, R15b,
    // instruction pointers
    Rip, Eip,
    // segment registers
    Es, Cs, Ss, Ds, Fs, Gs,
    // x87 stack
    St0, St1, St2, St3, St4, St5, St6, St7,
    // MMX (aliases the x87 stack architecturally)
    Mm0, Mm1, Mm2, Mm3, Mm4, Mm5, Mm6, Mm7,
    // SSE
    Xmm0, Xmm1, Xmm2, Xmm3, Xmm4, Xmm5, Xmm6, Xmm7,
    Xmm8, Xmm9, Xmm10, Xmm11, Xmm12, Xmm13, Xmm14, Xmm15,
}

impl Register {
    /// The GNU-as register name, without the `%` sigil.
    #[must_use]
    pub fn name(self) -> &'static str {
        use Register::*;
        match self {
            Rax => "rax", Rcx => "rcx", Rdx => "rdx", Rbx => "rbx",
            Rsp => "rsp", Rbp => "rbp", Rsi => "rsi", Rdi => "rdi",
            R8 => "r8", R9 => "r9", R10 => "r10", R11 => "r11",
            R12 => "r12", R13 => "r13", R14 => "r14", R15 => "r15",
            Eax => "eax", Ecx => "ecx", Edx => "edx", Ebx => "ebx",
            Esp => "esp", Ebp => "ebp", Esi => "esi", Edi => "edi",
            R8d => "r8d", R9d => "r9d", R10d => "r10d", R11d => "r11d",
            R12d => "r12d", R13d => "r13d", R14d => "r14d", R15d => "r15d",
            Ax => "ax", Cx => "cx", Dx => "dx", Bx => "bx",
            Sp => "sp", Bp => "bp", Si => "si", Di => "di",
            R8w => "r8w", R9w => "r9w", R10w => "r10w", R11w => "r11w",
            R12w => "r12w", R13w => "r13w", R14w => "r14w", R15w => "r15w",
            Al => "al", Cl => "cl", Dl => "dl", Bl => "bl",
            Spl => "spl", Bpl => "bpl", Sil => "sil", Dil => "dil",
            Ah => "ah", Ch => "ch", Dh => "dh", Bh => "bh",
            R8b => "r8b", R9b => "r9b", R10b => "r10b", R11b => "r11b",
            R12b => "r12b", R13b => "r13b", R14b => "r14b", R15b => "r15b",
            Rip => "rip", Eip => "eip",
            Es => "es", Cs => "cs", Ss => "ss", Ds => "ds", Fs => "fs", Gs => "gs",
            St0 => "st", St1 => "st(1)", St2 => "st(2)", St3 => "st(3)",
            St4 => "st(4)", St5 => "st(5)", St6 => "st(6)", St7 => "st(7)",
            Mm0 => "mm0", Mm1 => "mm1", Mm2 => "mm2", Mm3 => "mm3",
            Mm4 => "mm4", Mm5 => "mm5", Mm6 => "mm6", Mm7 => "mm7",
            Xmm0 => "xmm0", Xmm1 => "xmm1", Xmm2 => "xmm2", Xmm3 => "xmm3",
            Xmm4 => "xmm4", Xmm5 => "xmm5", Xmm6 => "xmm6", Xmm7 => "xmm7",
            Xmm8 => "xmm8", Xmm9 => "xmm9", Xmm10 => "xmm10", Xmm11 => "xmm11",
            Xmm12 => "xmm12", Xmm13 => "xmm13", Xmm14 => "xmm14", Xmm15 => "xmm15",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Operand type bitfield ─────────────────────────────────

bitflags! {
    /// Per-operand type bits, one bitfield per operand slot.
    ///
    /// An operand may carry several bits at once (e.g. a symbolic memory
    /// operand is `DISP32 | BASE_INDEX`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OperandType: u32 {
        /// 8-bit displacement.
        const DISP8 = 1 << 0;
        /// 16-bit displacement.
        const DISP16 = 1 << 1;
        /// 32-bit displacement.
        const DISP32 = 1 << 2;
        /// Sign-extended 32-bit displacement (64-bit mode).
        const DISP32S = 1 << 3;
        /// 64-bit displacement.
        const DISP64 = 1 << 4;
        /// The constant 1 (shift/rotate short forms).
        const IMM1 = 1 << 5;
        /// 8-bit immediate.
        const IMM8 = 1 << 6;
        /// Sign-extended 8-bit immediate.
        const IMM8S = 1 << 7;
        /// 16-bit immediate.
        const IMM16 = 1 << 8;
        /// 32-bit immediate.
        const IMM32 = 1 << 9;
        /// Sign-extended 32-bit immediate.
        const IMM32S = 1 << 10;
        /// 64-bit immediate.
        const IMM64 = 1 << 11;
        /// 8-bit general-purpose register.
        const REG8 = 1 << 12;
        /// 16-bit general-purpose register.
        const REG16 = 1 << 13;
        /// 32-bit general-purpose register.
        const REG32 = 1 << 14;
        /// 64-bit general-purpose register.
        const REG64 = 1 << 15;
        /// Accumulator (al/ax/eax/rax).
        const ACC = 1 << 16;
        /// x87 stack register.
        const FLOAT_REG = 1 << 17;
        /// x87 stack top (`%st`).
        const FLOAT_ACC = 1 << 18;
        /// MMX register.
        const REG_MMX = 1 << 19;
        /// SSE register.
        const REG_XMM = 1 << 20;
        /// Segment register encodable with two bits (es/cs/ss/ds).
        const SREG2 = 1 << 21;
        /// Segment register needing three bits (fs/gs).
        const SREG3 = 1 << 22;
        /// Memory operand with base/index addressing.
        const BASE_INDEX = 1 << 23;
        /// Absolute (`*target`) jump operand.
        const JUMP_ABSOLUTE = 1 << 24;
        /// The `(%dx)` port operand of in/out.
        const INOUT_PORT_REG = 1 << 25;
        /// The `%cl` shift-count operand.
        const SHIFT_COUNT = 1 << 26;
    }
}

impl OperandType {
    /// All displacement bits.
    pub const ANY_DISP: OperandType = OperandType::DISP8
        .union(OperandType::DISP16)
        .union(OperandType::DISP32)
        .union(OperandType::DISP32S)
        .union(OperandType::DISP64);

    /// All immediate bits.
    pub const ANY_IMM: OperandType = OperandType::IMM1
        .union(OperandType::IMM8)
        .union(OperandType::IMM8S)
        .union(OperandType::IMM16)
        .union(OperandType::IMM32)
        .union(OperandType::IMM32S)
        .union(OperandType::IMM64);

    /// The bits that make an operand a register for classification
    /// purposes (MMX and the float accumulator are handled separately).
    pub const ANY_REG: OperandType = OperandType::REG8
        .union(OperandType::REG16)
        .union(OperandType::REG32)
        .union(OperandType::REG64)
        .union(OperandType::ACC)
        .union(OperandType::FLOAT_REG)
        .union(OperandType::REG_XMM);

    /// The bits that make an operand a memory reference.
    pub const ANY_MEM: OperandType = OperandType::ANY_DISP.union(OperandType::BASE_INDEX);
}

// ─── Relocations ───────────────────────────────────────────

/// Relocation kind attached to an operand.
///
/// The printable kinds map to GNU-as `@` suffixes.  [`RelocKind::Other`]
/// carries an unrecognized front-end tag opaquely; printing it is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelocKind {
    /// No relocation.
    #[default]
    None,
    /// `@PLT`.
    Plt32,
    /// `@GOTPCREL`.
    GotPcrel,
    /// `@TLSLD`.
    TlsLd,
    /// `@TLSGD`.
    TlsGd,
    /// `@DTPOFF`.
    DtpOff32,
    /// `@GOTTPOFF`.
    GotTpOff,
    /// An unrecognized relocation tag, carried opaquely.
    Other(u32),
}

impl RelocKind {
    /// The `@` suffix rendered after a symbol name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownRelocation`] for [`RelocKind::Other`].
    pub fn suffix(self) -> Result<&'static str, Error> {
        match self {
            RelocKind::None => Ok(""),
            RelocKind::Plt32 => Ok("@PLT"),
            RelocKind::GotPcrel => Ok("@GOTPCREL"),
            RelocKind::TlsLd => Ok("@TLSLD"),
            RelocKind::TlsGd => Ok("@TLSGD"),
            RelocKind::DtpOff32 => Ok("@DTPOFF"),
            RelocKind::GotTpOff => Ok("@GOTTPOFF"),
            RelocKind::Other(_) => Err(Error::unknown_reloc(self)),
        }
    }

    /// The raw tag value, for diagnostics.
    #[must_use]
    pub fn raw_value(self) -> u32 {
        match self {
            RelocKind::None => 0,
            RelocKind::Plt32 => 1,
            RelocKind::GotPcrel => 2,
            RelocKind::TlsLd => 3,
            RelocKind::TlsGd => 4,
            RelocKind::DtpOff32 => 5,
            RelocKind::GotTpOff => 6,
            RelocKind::Other(v) => v,
        }
    }
}

// ─── Prefixes ──────────────────────────────────────────────

/// Number of prefix slots carried per instruction.
pub const MAX_PREFIXES: usize = 6;

/// Prefix slot for `fwait`.
pub const WAIT_PREFIX: usize = 0;
/// Prefix slot for segment overrides.
pub const SEG_PREFIX: usize = 1;
/// Prefix slot for the address-size prefix.
pub const ADDR_PREFIX: usize = 2;
/// Prefix slot for the data-size prefix (flips 16/32-bit relaxation).
pub const DATA_PREFIX: usize = 3;
/// Prefix slot for lock/rep prefixes.
pub const LOCKREP_PREFIX: usize = 4;
/// Prefix slot for the REX byte.
pub const REX_PREFIX: usize = 5;

/// The `repne`/`repnz` prefix byte.
pub const REPNE_PREFIX_OPCODE: u8 = 0xF2;
/// The `rep`/`repe`/`repz` prefix byte.
pub const REPE_PREFIX_OPCODE: u8 = 0xF3;
/// The data-size prefix byte.
pub const DATA_PREFIX_OPCODE: u8 = 0x66;
/// The address-size prefix byte.
pub const ADDR_PREFIX_OPCODE: u8 = 0x67;
/// The base REX prefix byte (`0x40..=0x4F`).
pub const REX_OPCODE: u8 = 0x40;
/// The `%cs` override byte.
pub const CS_PREFIX_OPCODE: u8 = 0x2E;
/// The `%ds` override byte.
pub const DS_PREFIX_OPCODE: u8 = 0x3E;
/// The `%es` override byte.
pub const ES_PREFIX_OPCODE: u8 = 0x26;
/// The `%fs` override byte.
pub const FS_PREFIX_OPCODE: u8 = 0x64;
/// The `%gs` override byte.
pub const GS_PREFIX_OPCODE: u8 = 0x65;
/// The `%ss` override byte.
pub const SS_PREFIX_OPCODE: u8 = 0x36;

// ─── Mnemonic ──────────────────────────────────────────────

/// An instruction mnemonic, stored inline (no heap allocation).
///
/// Mnemonics are the template names without size suffixes (`mov`, not
/// `movq`); the suffix travels separately on the [`Insn`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mnemonic {
    buf: [u8; 16],
    len: u8,
}

impl Mnemonic {
    /// Maximum mnemonic length in bytes.
    pub const MAX_LEN: usize = 16;

    /// The mnemonic as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or("")
    }

    /// Whether the mnemonic ends with the given character.
    #[must_use]
    pub fn ends_with(&self, c: char) -> bool {
        self.as_str().ends_with(c)
    }
}

impl From<&str> for Mnemonic {
    fn from(s: &str) -> Self {
        let mut buf = [0u8; 16];
        let len = s.len().min(Self::MAX_LEN);
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Mnemonic {
            buf,
            len: len as u8,
        }
    }
}

impl PartialEq<&str> for Mnemonic {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mnemonic({:?})", self.as_str())
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Operands ──────────────────────────────────────────────

/// The payload of one operand slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperandData {
    /// No payload (implicit operands).
    #[default]
    None,
    /// Immediate expression.
    Imm(Expr),
    /// Displacement expression of a memory operand.
    Disp(Expr),
    /// Register reference.
    Reg(Register),
}

/// One operand: type bits, relocation, payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Operand {
    /// The operand's type bitfield.
    pub types: OperandType,
    /// The operand's relocation kind.
    pub reloc: RelocKind,
    /// The operand's payload.
    pub data: OperandData,
}

impl Operand {
    /// A register operand.
    #[must_use]
    pub fn reg(types: OperandType, reg: Register) -> Self {
        Operand {
            types,
            reloc: RelocKind::None,
            data: OperandData::Reg(reg),
        }
    }

    /// An immediate operand.
    #[must_use]
    pub fn imm(types: OperandType, expr: Expr) -> Self {
        Operand {
            types,
            reloc: RelocKind::None,
            data: OperandData::Imm(expr),
        }
    }

    /// A memory operand with a displacement expression.
    #[must_use]
    pub fn mem(types: OperandType, disp: Expr) -> Self {
        Operand {
            types,
            reloc: RelocKind::None,
            data: OperandData::Disp(disp),
        }
    }

    /// The displacement expression, if this is a memory operand.
    #[must_use]
    pub fn disp(&self) -> Option<&Expr> {
        match &self.data {
            OperandData::Disp(e) => Some(e),
            _ => None,
        }
    }

    /// The register, if this is a register operand.
    #[must_use]
    pub fn register(&self) -> Option<Register> {
        match &self.data {
            OperandData::Reg(r) => Some(*r),
            _ => None,
        }
    }
}

// ─── Closed mnemonic sets ──────────────────────────────────

const COND_JUMPS: &[&str] = &[
    "jo", "jno", "jb", "jc", "jnae", "jnb", "jnc", "jae", "je", "jz", "jne", "jnz", "jbe", "jna",
    "jnbe", "ja", "js", "jns", "jp", "jpe", "jnp", "jpo", "jl", "jnge", "jnl", "jge", "jle", "jng",
    "jnle", "jg",
    // chosen on the basis of the address-size prefix
    "jcxz", "jecxz", "jrcxz",
    // loop variants
    "loop", "loopz", "loope", "loopnz", "loopne",
];

const UNCOND_JUMPS: &[&str] = &["jmp", "ljmp"];

const CALLS: &[&str] = &["call", "lcall", "vmcall", "syscall", "vmmcall"];

const RETURNS: &[&str] = &["ret", "lret", "retf", "iret", "sysret"];

// String-op classes for rep-prefix rendering.
const REP_OPS: &[&str] = &["ins", "outs", "movs", "lods", "stos"];
const REPE_OPS: &[&str] = &["cmps", "scas"];
// Opcodes whose encodings carry a rep-class byte without an assembly prefix.
const NOREP_OPS: &[&str] = &[
    "movdqu", "mulss", "divss", "subss", "movq", "cvttss2si", "addss",
];
const NOREPN_OPS: &[&str] = &[
    "movsd", "cvtsi2sd", "mulsd", "addsd", "divsd", "subsd", "cvttsd2si",
];

// Suffix already implied by the mnemonic — do not re-print it.
const HAS_L_SUFFIX: &[&str] = &[
    "movsbl", "movswl", "movzbl", "movzwl", "cmovl", "cmovnl", "cwtl", "cltd",
];
const HAS_W_SUFFIX: &[&str] = &["cbtw", "fnstsw", "movsbw"];
const HAS_B_SUFFIX: &[&str] = &["setb"];

fn in_list(m: Mnemonic, list: &[&str]) -> bool {
    list.iter().any(|s| m == *s)
}

/// The sentinel returned by [`Insn::target`] when no symbolic target exists.
pub const UNKNOWN_TARGET: &str = "<UNKNOWN>";

// ─── Insn ──────────────────────────────────────────────────

/// A fully parsed machine instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insn {
    /// The mnemonic tag (no size suffix).
    pub mnemonic: Mnemonic,
    /// The size suffix character, if the source carried one.
    pub suffix: Option<char>,
    /// The explicit operands, in AT&T order (destination last).
    pub operands: Vec<Operand>,
    /// Base register of a memory operand.
    pub base_reg: Option<Register>,
    /// Index register of a memory operand.
    pub index_reg: Option<Register>,
    /// log2 of the index scale factor (0..=3).
    pub log2_scale: u8,
    /// Segment overrides; overrides always occupy slot 0 first.
    pub segments: [Option<Register>; 2],
    /// Raw prefix bytes in their slot positions.
    pub prefixes: [u8; MAX_PREFIXES],
}

impl Insn {
    /// A bare instruction with no operands.
    #[must_use]
    pub fn new(mnemonic: &str) -> Self {
        Insn {
            mnemonic: Mnemonic::from(mnemonic),
            suffix: None,
            operands: Vec::new(),
            base_reg: None,
            index_reg: None,
            log2_scale: 0,
            segments: [None, None],
            prefixes: [0; MAX_PREFIXES],
        }
    }

    /// The operand count.
    #[must_use]
    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    /// Checked operand access.
    ///
    /// # Errors
    ///
    /// [`Error::OperandIndex`] if `index` is out of range.
    pub fn operand(&self, index: usize) -> Result<&Operand, Error> {
        self.operands.get(index).ok_or(Error::OperandIndex {
            index,
            count: self.operands.len(),
        })
    }

    /// Whether operand `i` is a memory reference.  Out-of-range is `false`.
    #[must_use]
    pub fn is_mem_operand(&self, i: usize) -> bool {
        self.operands
            .get(i)
            .is_some_and(|op| op.types.intersects(OperandType::ANY_MEM))
    }

    /// Whether operand `i` is an immediate.  Out-of-range is `false`.
    #[must_use]
    pub fn is_immediate_operand(&self, i: usize) -> bool {
        self.operands
            .get(i)
            .is_some_and(|op| op.types.intersects(OperandType::ANY_IMM))
    }

    /// Whether operand `i` is a register.  Out-of-range is `false`.
    #[must_use]
    pub fn is_register_operand(&self, i: usize) -> bool {
        self.operands
            .get(i)
            .is_some_and(|op| op.types.intersects(OperandType::ANY_REG))
    }

    /// Whether this is a call.
    #[must_use]
    pub fn is_call(&self) -> bool {
        in_list(self.mnemonic, CALLS)
    }

    /// Whether this is a return.
    #[must_use]
    pub fn is_return(&self) -> bool {
        in_list(self.mnemonic, RETURNS)
    }

    /// Whether this is an unconditional jump.
    #[must_use]
    pub fn is_unconditional_jump(&self) -> bool {
        in_list(self.mnemonic, UNCOND_JUMPS)
    }

    /// Whether this is a conditional jump (including the loop family).
    #[must_use]
    pub fn is_conditional_jump(&self) -> bool {
        in_list(self.mnemonic, COND_JUMPS)
    }

    /// Whether this instruction can transfer control away from the
    /// fall-through path: any jump, call, or return.
    #[must_use]
    pub fn is_control_transfer(&self) -> bool {
        self.has_target() || self.is_call() || self.is_return()
    }

    /// Whether execution can continue at the syntactically next entry.
    ///
    /// Returns and unconditional jumps never fall through; calls and
    /// conditional jumps do.
    #[must_use]
    pub fn has_fall_through(&self) -> bool {
        if self.is_return() {
            return false;
        }
        if !self.has_target() {
            return true;
        }
        if self.is_call() {
            return true;
        }
        self.is_conditional_jump()
    }

    /// Whether this instruction names a branch target.
    #[must_use]
    pub fn has_target(&self) -> bool {
        self.is_unconditional_jump() || self.is_conditional_jump()
    }

    /// The symbolic branch target, or [`UNKNOWN_TARGET`].
    #[must_use]
    pub fn target<'a>(&self, symbols: &'a SymbolTable) -> &'a str {
        for (i, op) in self.operands.iter().enumerate() {
            if self.is_mem_operand(i) && op.types.intersects(OperandType::ANY_DISP) {
                if let Some(disp) = op.disp() {
                    if disp.op == ExprOp::Symbol {
                        if let Some(sym) = disp.add_symbol {
                            return symbols.name_of(sym);
                        }
                    }
                }
            }
        }
        UNKNOWN_TARGET
    }

    /// Structural equality of memory operand `i` with `other`'s operand `j`:
    /// same base, index, scale, segment overrides, and displacement
    /// expression.
    #[must_use]
    pub fn compare_mem_operand(&self, i: usize, other: &Insn, j: usize) -> bool {
        if !self.is_mem_operand(i) || !other.is_mem_operand(j) {
            return false;
        }
        self.base_reg == other.base_reg
            && self.index_reg == other.index_reg
            && self.log2_scale == other.log2_scale
            && self.segments == other.segments
            && self.operands[i].disp() == other.operands[j].disp()
    }

    /// The data-size prefix byte (0 when absent).
    #[must_use]
    pub fn data_prefix(&self) -> u8 {
        self.prefixes[DATA_PREFIX]
    }

    // ── printing ───────────────────────────────────────────

    fn print_suffix(&self) -> bool {
        let Some(suffix) = self.suffix else {
            return false;
        };
        match suffix {
            'l' if in_list(self.mnemonic, HAS_L_SUFFIX) => false,
            'w' if in_list(self.mnemonic, HAS_W_SUFFIX) => false,
            'b' if in_list(self.mnemonic, HAS_B_SUFFIX) => false,
            'q' if self.mnemonic.ends_with('q') => false,
            _ => true,
        }
    }

    fn write_prefixes(&self, out: &mut dyn fmt::Write) -> Result<(), Error> {
        for &byte in &self.prefixes {
            if byte == 0 {
                continue;
            }
            match byte {
                REPNE_PREFIX_OPCODE => {
                    if in_list(self.mnemonic, REPE_OPS) {
                        out.write_str("repne ")?;
                    } else if in_list(self.mnemonic, NOREPN_OPS) {
                        // Prefix byte is part of the encoding, not syntax.
                    } else {
                        return Err(Error::PrefixMismatch {
                            mnemonic: self.mnemonic.as_str().to_string(),
                            byte,
                        });
                    }
                }
                REPE_PREFIX_OPCODE => {
                    if in_list(self.mnemonic, REPE_OPS) {
                        out.write_str("repe ")?;
                    } else if in_list(self.mnemonic, REP_OPS) {
                        out.write_str("rep ")?;
                    } else if in_list(self.mnemonic, NOREP_OPS) {
                        // Prefix byte is part of the encoding, not syntax.
                    } else {
                        return Err(Error::PrefixMismatch {
                            mnemonic: self.mnemonic.as_str().to_string(),
                            byte,
                        });
                    }
                }
                b if (REX_OPCODE..REX_OPCODE + 16).contains(&b) => {}
                DATA_PREFIX_OPCODE | ADDR_PREFIX_OPCODE => {}
                CS_PREFIX_OPCODE | DS_PREFIX_OPCODE | ES_PREFIX_OPCODE | FS_PREFIX_OPCODE
                | GS_PREFIX_OPCODE | SS_PREFIX_OPCODE => {}
                other => return Err(Error::UnknownPrefix { byte: other }),
            }
        }
        Ok(())
    }

    fn write_immediate(
        &self,
        out: &mut dyn fmt::Write,
        reloc: RelocKind,
        expr: &Expr,
        symbols: &SymbolTable,
    ) -> Result<(), Error> {
        match expr.op {
            ExprOp::Constant => {
                write!(out, "${}", expr.add_number)?;
            }
            ExprOp::Symbol => {
                if let Some(sym) = expr.add_symbol {
                    write!(out, "${}{}+", symbols.name_of(sym), reloc.suffix()?)?;
                }
                write!(out, "{}", expr.add_number)?;
            }
            ExprOp::Subtract => {
                out.write_str("$(")?;
                let parens = expr.add_symbol.is_some() || expr.op_symbol.is_some();
                if parens {
                    out.write_str("(")?;
                }
                if let Some(sym) = expr.add_symbol {
                    write!(out, "{}{}", symbols.name_of(sym), reloc.suffix()?)?;
                }
                if let Some(sym) = expr.op_symbol {
                    write!(out, "-{}", symbols.name_of(sym))?;
                }
                if parens {
                    out.write_str(")+")?;
                }
                write!(out, "{})", expr.add_number)?;
            }
            op => return Err(Error::UnsupportedExpression { op }),
        }
        Ok(())
    }

    // segment-override:signed-offset(base,index,scale)
    #[allow(clippy::too_many_lines)]
    fn write_memory_operand(
        &self,
        out: &mut dyn fmt::Write,
        types: OperandType,
        reloc: RelocKind,
        expr: &Expr,
        jump_absolute: bool,
        symbols: &SymbolTable,
    ) -> Result<(), Error> {
        const SCALE: [u8; 4] = [1, 2, 4, 8];

        if jump_absolute {
            out.write_str("*")?;
        }

        if let Some(seg) = self.segments[0] {
            write!(out, "%{}:", seg.name())?;
        }

        if types.intersects(OperandType::ANY_DISP) {
            match expr.op {
                ExprOp::Constant => {
                    write!(out, "({})", expr.add_number)?;
                }
                ExprOp::Symbol => {
                    if expr.add_number != 0 {
                        out.write_str("(")?;
                    }
                    if let Some(sym) = expr.add_symbol {
                        write!(out, "{}{}", symbols.name_of(sym), reloc.suffix()?)?;
                    }
                    if expr.add_number != 0 {
                        write!(out, "+{})", expr.add_number)?;
                    }
                }
                ExprOp::Subtract => {
                    let parens = expr.add_symbol.is_some() || expr.op_symbol.is_some();
                    if parens {
                        out.write_str("(")?;
                    }
                    if let Some(sym) = expr.add_symbol {
                        write!(out, "{}{}", symbols.name_of(sym), reloc.suffix()?)?;
                    }
                    // With @GOTPCREL the second symbol is implicit.
                    if reloc != RelocKind::GotPcrel {
                        if let Some(sym) = expr.op_symbol {
                            write!(out, "-{}", symbols.name_of(sym))?;
                        }
                    }
                    if parens {
                        out.write_str(")+")?;
                    }
                    write!(out, "{}", expr.add_number)?;
                }
                op => return Err(Error::UnsupportedExpression { op }),
            }
        }

        if self.base_reg.is_some() || self.index_reg.is_some() {
            out.write_str("(")?;
            if let Some(base) = self.base_reg {
                write!(out, "%{}", base.name())?;
            }
            if let Some(index) = self.index_reg {
                write!(out, ",%{}", index.name())?;
            }
            if self.log2_scale != 0 {
                write!(out, ",{}", SCALE[(self.log2_scale & 3) as usize])?;
            }
            out.write_str(")")?;
        }

        Ok(())
    }

    /// Render the instruction in GNU-as syntax (leading tab included).
    ///
    /// # Errors
    ///
    /// Unsupported expression operators, unknown prefix bytes, and unknown
    /// relocation kinds are unsupported-input errors; formatter failures
    /// surface as [`Error::Format`].
    pub fn write_insn(
        &self,
        out: &mut dyn fmt::Write,
        symbols: &SymbolTable,
    ) -> Result<(), Error> {
        out.write_str("\t")?;
        self.write_prefixes(out)?;

        if self.print_suffix() {
            // suffix presence checked in print_suffix
            let suffix = self.suffix.unwrap_or(' ');
            write!(out, "{}{}\t", self.mnemonic, suffix)?;
        } else {
            write!(out, "{}\t", self.mnemonic)?;
        }

        for (i, op) in self.operands.iter().enumerate() {
            if self.is_immediate_operand(i) {
                if let OperandData::Imm(expr) = &op.data {
                    self.write_immediate(out, op.reloc, expr, symbols)?;
                }
            }

            if self.is_mem_operand(i) {
                // For repe-class string ops both operands carry baseindex but
                // only the implicit (%edi) side is printed for the first.
                if self.operands.len() == 2
                    && i == 0
                    && self.is_mem_operand(1)
                    && in_list(self.mnemonic, REPE_OPS)
                {
                    out.write_str("(%edi) ")?;
                } else {
                    let disp = op.disp().cloned().unwrap_or_default();
                    let jump_absolute = op.types.contains(OperandType::JUMP_ABSOLUTE);
                    self.write_memory_operand(out, op.types, op.reloc, &disp, jump_absolute, symbols)?;
                }
            }

            if op.types.contains(OperandType::FLOAT_ACC) {
                out.write_str("%st")?;
            }

            if op.types.intersects(OperandType::SREG2 | OperandType::SREG3)
                || op.types.contains(OperandType::REG_MMX)
            {
                if let Some(reg) = op.register() {
                    write!(out, "%{}", reg.name())?;
                }
            }

            if self.is_register_operand(i) {
                if op.types.contains(OperandType::JUMP_ABSOLUTE) {
                    out.write_str("*")?;
                }
                if let Some(reg) = op.register() {
                    write!(out, "%{}", reg.name())?;
                }
            }

            if op.types.contains(OperandType::INOUT_PORT_REG) {
                out.write_str("(%dx)")?;
            }

            if op.types.contains(OperandType::SHIFT_COUNT) {
                if let Some(reg) = op.register() {
                    write!(out, "%{}", reg.name())?;
                }
            }

            if i + 1 < self.operands.len() {
                out.write_str(", ")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use alloc::string::String;
    use alloc::vec;

    fn symtab() -> SymbolTable {
        SymbolTable::new()
    }

    fn mem_load(offset: i64, base: Register, dst: Register) -> Insn {
        let mut insn = Insn::new("mov");
        insn.suffix = Some('q');
        insn.operands = vec![
            Operand::mem(
                OperandType::DISP8 | OperandType::BASE_INDEX,
                Expr::constant(offset),
            ),
            Operand::reg(OperandType::REG64, dst),
        ];
        insn.base_reg = Some(base);
        insn
    }

    #[test]
    fn classification_bits() {
        let insn = mem_load(24, Register::Rsp, Register::Rdx);
        assert!(insn.is_mem_operand(0));
        assert!(!insn.is_mem_operand(1));
        assert!(insn.is_register_operand(1));
        assert!(!insn.is_immediate_operand(0));
        // out of range is false, not a panic
        assert!(!insn.is_register_operand(5));
    }

    #[test]
    fn control_transfer_sets() {
        assert!(Insn::new("call").is_call());
        assert!(Insn::new("sysret").is_return());
        assert!(Insn::new("jmp").is_unconditional_jump());
        assert!(Insn::new("jrcxz").is_conditional_jump());
        assert!(Insn::new("loopne").is_conditional_jump());
        assert!(!Insn::new("mov").is_control_transfer());
    }

    #[test]
    fn fall_through_rules() {
        assert!(!Insn::new("ret").has_fall_through());
        assert!(!Insn::new("jmp").has_fall_through());
        assert!(Insn::new("je").has_fall_through());
        assert!(Insn::new("call").has_fall_through());
        assert!(Insn::new("add").has_fall_through());
    }

    #[test]
    fn target_of_symbolic_jump() {
        let mut symbols = symtab();
        let sym = symbols.find_or_create("L1", None);
        let mut insn = Insn::new("jmp");
        insn.operands = vec![Operand::mem(OperandType::DISP32, Expr::symbol(sym, 0))];
        assert_eq!(insn.target(&symbols), "L1");
        assert_eq!(Insn::new("jmp").target(&symbols), UNKNOWN_TARGET);
    }

    #[test]
    fn mem_operand_comparison() {
        let a = mem_load(24, Register::Rsp, Register::Rdx);
        let b = mem_load(24, Register::Rsp, Register::Rcx);
        let c = mem_load(16, Register::Rsp, Register::Rcx);
        let d = mem_load(24, Register::Rbp, Register::Rcx);
        assert!(a.compare_mem_operand(0, &b, 0));
        assert!(!a.compare_mem_operand(0, &c, 0));
        assert!(!a.compare_mem_operand(0, &d, 0));
        // register operands never compare as memory
        assert!(!a.compare_mem_operand(1, &b, 1));
    }

    #[test]
    fn print_load() {
        let insn = mem_load(24, Register::Rsp, Register::Rdx);
        let mut out = String::new();
        insn.write_insn(&mut out, &symtab()).unwrap();
        assert_eq!(out, "\tmovq\t(24)(%rsp), %rdx");
    }

    #[test]
    fn print_suffix_elision() {
        let mut insn = Insn::new("movsbl");
        insn.suffix = Some('l');
        insn.operands = vec![
            Operand::reg(OperandType::REG8, Register::Al),
            Operand::reg(OperandType::REG32, Register::Edx),
        ];
        let mut out = String::new();
        insn.write_insn(&mut out, &symtab()).unwrap();
        assert_eq!(out, "\tmovsbl\t%al, %edx");

        // trailing q elision
        let mut insn = Insn::new("movq");
        insn.suffix = Some('q');
        let mut out = String::new();
        insn.write_insn(&mut out, &symtab()).unwrap();
        assert_eq!(out, "\tmovq\t");
    }

    #[test]
    fn print_rep_prefix() {
        let mut insn = Insn::new("movs");
        insn.suffix = Some('b');
        insn.prefixes[LOCKREP_PREFIX] = REPE_PREFIX_OPCODE;
        let mut out = String::new();
        insn.write_insn(&mut out, &symtab()).unwrap();
        assert_eq!(out, "\trep movsb\t");
    }

    #[test]
    fn print_repne_mismatch_is_error() {
        let mut insn = Insn::new("mov");
        insn.prefixes[LOCKREP_PREFIX] = REPNE_PREFIX_OPCODE;
        let mut out = String::new();
        assert!(matches!(
            insn.write_insn(&mut out, &symtab()),
            Err(Error::PrefixMismatch { .. })
        ));
    }

    #[test]
    fn print_unknown_prefix_is_error() {
        let mut insn = Insn::new("nop");
        insn.prefixes[WAIT_PREFIX] = 0xAA;
        let mut out = String::new();
        assert!(matches!(
            insn.write_insn(&mut out, &symtab()),
            Err(Error::UnknownPrefix { byte: 0xAA })
        ));
    }

    #[test]
    fn print_immediate_with_reloc() {
        let mut symbols = symtab();
        let sym = symbols.find_or_create("x", None);
        let mut insn = Insn::new("mov");
        insn.suffix = Some('l');
        let mut imm = Operand::imm(OperandType::IMM32, Expr::symbol(sym, 0));
        imm.reloc = RelocKind::Plt32;
        insn.operands = vec![imm, Operand::reg(OperandType::REG32, Register::Eax)];
        let mut out = String::new();
        insn.write_insn(&mut out, &symbols).unwrap();
        assert_eq!(out, "\tmovl\t$x@PLT+0, %eax");
    }

    #[test]
    fn print_scaled_index() {
        let mut insn = Insn::new("mov");
        insn.suffix = Some('q');
        insn.operands = vec![
            Operand::mem(
                OperandType::DISP8 | OperandType::BASE_INDEX,
                Expr::constant(8),
            ),
            Operand::reg(OperandType::REG64, Register::Rax),
        ];
        insn.base_reg = Some(Register::Rbx);
        insn.index_reg = Some(Register::Rcx);
        insn.log2_scale = 3;
        let mut out = String::new();
        insn.write_insn(&mut out, &symtab()).unwrap();
        assert_eq!(out, "\tmovq\t(8)(%rbx,%rcx,8), %rax");
    }

    #[test]
    fn unknown_reloc_suffix_is_error() {
        assert!(RelocKind::Plt32.suffix().is_ok());
        assert!(matches!(
            RelocKind::Other(77).suffix(),
            Err(Error::UnknownRelocation { value: 77 })
        ));
    }
}
