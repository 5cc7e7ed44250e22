//! Register definition masks.
//!
//! A 64-bit bitmap records which architectural registers an instruction may
//! write.  Width aliases share one bit per register family, so `%al`, `%ax`,
//! `%eax`, and `%rax` all map to the `rax` bit.  Two sentinels bound the
//! lattice: 0 means "defines no register (may still touch memory)" and
//! [`REG_ALL`] means "kills every register".

use crate::insn::{Insn, Register};

/// Sentinel mask: the instruction may write every register.
pub const REG_ALL: u64 = u64::MAX;

/// Mask bit of the `rax` family.
pub const REG_RAX: u64 = 1 << 0;
/// Mask bit of the `rcx` family.
pub const REG_RCX: u64 = 1 << 1;
/// Mask bit of the `rdx` family.
pub const REG_RDX: u64 = 1 << 2;
/// Mask bit of the `rbx` family.
pub const REG_RBX: u64 = 1 << 3;
/// Mask bit of the `rsp` family.
pub const REG_RSP: u64 = 1 << 4;
/// Mask bit of the `rbp` family.
pub const REG_RBP: u64 = 1 << 5;
/// Mask bit of the `rsi` family.
pub const REG_RSI: u64 = 1 << 6;
/// Mask bit of the `rdi` family.
pub const REG_RDI: u64 = 1 << 7;
/// Mask bit of the instruction pointer.
pub const REG_RIP: u64 = 1 << 16;
/// Mask bit of the flags register.
pub const REG_FLAGS: u64 = 1 << 17;

const REG_R8: u64 = 1 << 8;
const SEG_BASE: u32 = 18; // es cs ss ds fs gs → bits 18..=23
const ST_BASE: u32 = 24; // x87/MMX stack → bits 24..=31
const XMM_BASE: u32 = 32; // xmm0..15 → bits 32..=47

/// The mask bit of one register's family, or 0 for `None`.
///
/// Width aliases share bits; the x87 stack and MMX registers alias each
/// other architecturally and share bits too.
#[must_use]
pub fn mask_for_register(reg: Option<Register>) -> u64 {
    use Register::*;
    let Some(reg) = reg else {
        return 0;
    };
    match reg {
        Rax | Eax | Ax | Al | Ah => REG_RAX,
        Rcx | Ecx | Cx | Cl | Ch => REG_RCX,
        Rdx | Edx | Dx | Dl | Dh => REG_RDX,
        Rbx | Ebx | Bx | Bl | Bh => REG_RBX,
        Rsp | Esp | Sp | Spl => REG_RSP,
        Rbp | Ebp | Bp | Bpl => REG_RBP,
        Rsi | Esi | Si | Sil => REG_RSI,
        Rdi | Edi | Di | Dil => REG_RDI,
        R8 | R8d | R8w | R8b => REG_R8,
        R9 | R9d | R9w | R9b => REG_R8 << 1,
        R10 | R10d | R10w | R10b => REG_R8 << 2,
        R11 | R11d | R11w | R11b => REG_R8 << 3,
        R12 | R12d | R12w | R12b => REG_R8 << 4,
        R13 | R13d | R13w | R13b => REG_R8 << 5,
        R14 | R14d | R14w | R14b => REG_R8 << 6,
        R15 | R15d | R15w | R15b => REG_R8 << 7,
        Rip | Eip => REG_RIP,
        Es => 1 << SEG_BASE,
        Cs => 1 << (SEG_BASE + 1),
        Ss => 1 << (SEG_BASE + 2),
        Ds => 1 << (SEG_BASE + 3),
        Fs => 1 << (SEG_BASE + 4),
        Gs => 1 << (SEG_BASE + 5),
        St0 | Mm0 => 1 << ST_BASE,
        St1 | Mm1 => 1 << (ST_BASE + 1),
        St2 | Mm2 => 1 << (ST_BASE + 2),
        St3 | Mm3 => 1 << (ST_BASE + 3),
        St4 | Mm4 => 1 << (ST_BASE + 4),
        St5 | Mm5 => 1 << (ST_BASE + 5),
        St6 | Mm6 => 1 << (ST_BASE + 6),
        St7 | Mm7 => 1 << (ST_BASE + 7),
        Xmm0 => 1 << XMM_BASE,
        Xmm1 => 1 << (XMM_BASE + 1),
        Xmm2 => 1 << (XMM_BASE + 2),
        Xmm3 => 1 << (XMM_BASE + 3),
        Xmm4 => 1 << (XMM_BASE + 4),
        Xmm5 => 1 << (XMM_BASE + 5),
        Xmm6 => 1 << (XMM_BASE + 6),
        Xmm7 => 1 << (XMM_BASE + 7),
        Xmm8 => 1 << (XMM_BASE + 8),
        Xmm9 => 1 << (XMM_BASE + 9),
        Xmm10 => 1 << (XMM_BASE + 10),
        Xmm11 => 1 << (XMM_BASE + 11),
        Xmm12 => 1 << (XMM_BASE + 12),
        Xmm13 => 1 << (XMM_BASE + 13),
        Xmm14 => 1 << (XMM_BASE + 14),
        Xmm15 => 1 << (XMM_BASE + 15),
    }
}

// Which explicit operand slots an opcode defines.
const DEF_NONE: u8 = 0;
const DEF_OP0: u8 = 1 << 0;
const DEF_OP1: u8 = 1 << 1;
// The destination is the last operand (AT&T order), wherever it sits.
const DEF_LAST: u8 = 1 << 7;

struct DefEntry {
    name: &'static str,
    op_defs: u8,
    implicit: u64,
}

const fn de(name: &'static str, op_defs: u8, implicit: u64) -> DefEntry {
    DefEntry {
        name,
        op_defs,
        implicit,
    }
}

#[rustfmt::skip]
static DEF_TABLE: &[DefEntry] = &[
    // moves
    de("mov", DEF_LAST, 0),
    de("movabs", DEF_LAST, 0),
    de("movsbl", DEF_LAST, 0), de("movsbw", DEF_LAST, 0), de("movsbq", DEF_LAST, 0),
    de("movswl", DEF_LAST, 0), de("movswq", DEF_LAST, 0), de("movslq", DEF_LAST, 0),
    de("movzbl", DEF_LAST, 0), de("movzbw", DEF_LAST, 0), de("movzbq", DEF_LAST, 0),
    de("movzwl", DEF_LAST, 0), de("movzwq", DEF_LAST, 0),
    de("lea", DEF_LAST, 0),
    de("xchg", DEF_OP0 | DEF_OP1, 0),
    de("bswap", DEF_OP0, 0),
    // conditional moves
    de("cmova", DEF_LAST, 0), de("cmovae", DEF_LAST, 0), de("cmovb", DEF_LAST, 0),
    de("cmovbe", DEF_LAST, 0), de("cmovc", DEF_LAST, 0), de("cmove", DEF_LAST, 0),
    de("cmovg", DEF_LAST, 0), de("cmovge", DEF_LAST, 0), de("cmovl", DEF_LAST, 0),
    de("cmovle", DEF_LAST, 0), de("cmovna", DEF_LAST, 0), de("cmovnae", DEF_LAST, 0),
    de("cmovnb", DEF_LAST, 0), de("cmovnbe", DEF_LAST, 0), de("cmovnc", DEF_LAST, 0),
    de("cmovne", DEF_LAST, 0), de("cmovng", DEF_LAST, 0), de("cmovnge", DEF_LAST, 0),
    de("cmovnl", DEF_LAST, 0), de("cmovnle", DEF_LAST, 0), de("cmovno", DEF_LAST, 0),
    de("cmovnp", DEF_LAST, 0), de("cmovns", DEF_LAST, 0), de("cmovnz", DEF_LAST, 0),
    de("cmovo", DEF_LAST, 0), de("cmovp", DEF_LAST, 0), de("cmovs", DEF_LAST, 0),
    de("cmovz", DEF_LAST, 0),
    // integer ALU
    de("add", DEF_LAST, REG_FLAGS), de("adc", DEF_LAST, REG_FLAGS),
    de("sub", DEF_LAST, REG_FLAGS), de("sbb", DEF_LAST, REG_FLAGS),
    de("and", DEF_LAST, REG_FLAGS), de("or", DEF_LAST, REG_FLAGS),
    de("xor", DEF_LAST, REG_FLAGS),
    de("inc", DEF_OP0, REG_FLAGS), de("dec", DEF_OP0, REG_FLAGS),
    de("neg", DEF_OP0, REG_FLAGS), de("not", DEF_OP0, 0),
    de("sal", DEF_LAST, REG_FLAGS), de("sar", DEF_LAST, REG_FLAGS),
    de("shl", DEF_LAST, REG_FLAGS), de("shr", DEF_LAST, REG_FLAGS),
    de("rol", DEF_LAST, REG_FLAGS), de("ror", DEF_LAST, REG_FLAGS),
    de("rcl", DEF_LAST, REG_FLAGS), de("rcr", DEF_LAST, REG_FLAGS),
    de("imul", DEF_LAST, REG_FLAGS),
    de("mul", DEF_NONE, REG_RAX | REG_RDX | REG_FLAGS),
    de("div", DEF_NONE, REG_RAX | REG_RDX | REG_FLAGS),
    de("idiv", DEF_NONE, REG_RAX | REG_RDX | REG_FLAGS),
    // comparisons write only flags
    de("cmp", DEF_NONE, REG_FLAGS),
    de("test", DEF_NONE, REG_FLAGS),
    // stack
    de("push", DEF_NONE, REG_RSP),
    de("pop", DEF_LAST, REG_RSP),
    de("leave", DEF_NONE, REG_RSP | REG_RBP),
    // width conversions
    de("cbtw", DEF_NONE, REG_RAX), de("cwtl", DEF_NONE, REG_RAX),
    de("cltq", DEF_NONE, REG_RAX),
    de("cwtd", DEF_NONE, REG_RDX), de("cltd", DEF_NONE, REG_RDX),
    de("cqto", DEF_NONE, REG_RDX),
    // string ops (rep forms also count the counter)
    de("movs", DEF_NONE, REG_RSI | REG_RDI | REG_RCX),
    de("lods", DEF_NONE, REG_RAX | REG_RSI | REG_RCX),
    de("stos", DEF_NONE, REG_RDI | REG_RCX),
    de("scas", DEF_NONE, REG_RDI | REG_RCX | REG_FLAGS),
    de("cmps", DEF_NONE, REG_RSI | REG_RDI | REG_RCX | REG_FLAGS),
    // misc
    de("nop", DEF_NONE, 0),
    de("cpuid", DEF_NONE, REG_RAX | REG_RBX | REG_RCX | REG_RDX),
    de("rdtsc", DEF_NONE, REG_RAX | REG_RDX),
    de("lahf", DEF_NONE, REG_RAX),
    de("sahf", DEF_NONE, REG_FLAGS),
    de("cld", DEF_NONE, REG_FLAGS), de("std", DEF_NONE, REG_FLAGS),
    de("clc", DEF_NONE, REG_FLAGS), de("stc", DEF_NONE, REG_FLAGS),
    de("cmc", DEF_NONE, REG_FLAGS),
    // control transfers: calls clobber everything per the ABI boundary,
    // jumps and returns adjust rsp/rip only
    de("call", DEF_NONE, REG_ALL),
    de("lcall", DEF_NONE, REG_ALL),
    de("syscall", DEF_NONE, REG_ALL),
    de("ret", DEF_NONE, REG_RSP),
    de("lret", DEF_NONE, REG_RSP),
    de("retf", DEF_NONE, REG_RSP),
    de("iret", DEF_NONE, REG_RSP | REG_FLAGS),
    de("jmp", DEF_NONE, 0),
];

fn lookup(insn: &Insn) -> Option<&'static DefEntry> {
    DEF_TABLE.iter().find(|e| insn.mnemonic == e.name)
}

/// The definition mask of one instruction.
///
/// Combines the opcode's implicit definitions with the register families of
/// the explicit operands the opcode writes.  Opcodes outside the table are
/// assumed to kill everything.  An instruction whose destination is memory
/// contributes no register bits, so a plain register-to-memory store yields
/// 0.
#[must_use]
pub fn register_def_mask(insn: &Insn) -> u64 {
    let Some(entry) = lookup(insn) else {
        return REG_ALL;
    };
    if entry.implicit == REG_ALL {
        return REG_ALL;
    }

    // One-operand imul falls back to the widening rax×op form.
    if insn.mnemonic == "imul" && insn.num_operands() == 1 {
        return REG_RAX | REG_RDX | REG_FLAGS;
    }

    let mut mask = entry.implicit;
    let count = insn.num_operands();
    for i in 0..count {
        let defined = (i < 7 && entry.op_defs & (1 << i) != 0)
            || (entry.op_defs & DEF_LAST != 0 && i + 1 == count);
        if defined && insn.is_register_operand(i) {
            mask |= mask_for_register(insn.operands[i].register());
        }
    }
    mask
}
