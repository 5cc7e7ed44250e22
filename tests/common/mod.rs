//! Shared fixtures: a table-driven size oracle standing in for the
//! assembler front-end, plus entry builders.

#![allow(dead_code)]

use asmforge::{
    DirOperand, Directive, DirectiveOp, EntryKind, Expr, Insn, InsnEncoder, Operand, OperandType,
    Register, Unit,
};

/// A size oracle with fixed per-mnemonic sizes.  Jumps report one fixed
/// opcode byte plus a relaxable displacement, matching the real encoder's
/// split.
pub struct TableEncoder {
    pub code16: bool,
}

impl TableEncoder {
    pub fn new() -> Self {
        TableEncoder { code16: false }
    }
}

impl InsnEncoder for TableEncoder {
    fn size_of_instruction(&self, insn: &Insn) -> (u64, bool) {
        if insn.is_unconditional_jump() || insn.is_conditional_jump() {
            return (1, true);
        }
        let fixed = match insn.mnemonic.as_str() {
            "ret" | "nop" | "push" | "pop" | "leave" => 1,
            "add" | "mov" => 4,
            "call" => 5,
            _ => 1,
        };
        (fixed, false)
    }

    fn encode_instruction_bytes(&self, insn: &Insn) -> Vec<u8> {
        vec![match insn.mnemonic.as_str() {
            "jmp" => 0xEB,
            "je" => 0x74,
            "jne" => 0x75,
            _ => 0x90,
        }]
    }

    fn is_code16(&self) -> bool {
        self.code16
    }
}

pub fn label(name: &str) -> EntryKind {
    EntryKind::Label {
        name: name.to_string(),
    }
}

pub fn insn(mnemonic: &str) -> EntryKind {
    EntryKind::Insn(Box::new(Insn::new(mnemonic)))
}

pub fn insn_sfx(mnemonic: &str, suffix: char) -> EntryKind {
    let mut insn = Insn::new(mnemonic);
    insn.suffix = Some(suffix);
    EntryKind::Insn(Box::new(insn))
}

/// A jump/call with a symbolic target.
pub fn jump(unit: &mut Unit, mnemonic: &str, target: &str) -> EntryKind {
    let sym = unit.find_or_create_symbol(target);
    let mut insn = Insn::new(mnemonic);
    insn.operands = vec![Operand::mem(OperandType::DISP32, Expr::symbol(sym, 0))];
    EntryKind::Insn(Box::new(insn))
}

/// `mov{suffix} disp(base), dst` — a memory load in AT&T operand order.
pub fn mem_load(disp: i64, base: Register, dst: Register) -> EntryKind {
    let mut insn = Insn::new("mov");
    insn.suffix = Some('q');
    insn.operands = vec![
        Operand::mem(
            OperandType::DISP8 | OperandType::BASE_INDEX,
            Expr::constant(disp),
        ),
        Operand::reg(OperandType::REG64, dst),
    ];
    insn.base_reg = Some(base);
    EntryKind::Insn(Box::new(insn))
}

/// `add{q} $imm, dst`.
pub fn add_imm(imm: i64, dst: Register) -> EntryKind {
    let mut insn = Insn::new("add");
    insn.suffix = Some('q');
    insn.operands = vec![
        Operand::imm(OperandType::IMM32S, Expr::constant(imm)),
        Operand::reg(OperandType::REG64, dst),
    ];
    EntryKind::Insn(Box::new(insn))
}

pub fn directive(op: DirectiveOp, operands: Vec<DirOperand>) -> EntryKind {
    EntryKind::Directive(Directive::new(op, operands))
}

pub fn byte_dir(value: i64) -> EntryKind {
    directive(DirectiveOp::Byte, vec![DirOperand::Int(value)])
}

pub fn data_dir(op: DirectiveOp) -> EntryKind {
    directive(op, vec![DirOperand::Int(0)])
}

pub fn sleb(value: i64) -> EntryKind {
    directive(
        DirectiveOp::Sleb128,
        vec![DirOperand::Expr(Expr::constant(value))],
    )
}

pub fn uleb(value: i64) -> EntryKind {
    directive(
        DirectiveOp::Uleb128,
        vec![DirOperand::Expr(Expr::constant(value))],
    )
}

pub fn leb_expr(op: DirectiveOp, expr: Expr) -> EntryKind {
    directive(op, vec![DirOperand::Expr(expr)])
}

pub fn space_const(count: i64) -> EntryKind {
    directive(
        DirectiveOp::Space,
        vec![
            DirOperand::Expr(Expr::constant(count)),
            DirOperand::Empty,
        ],
    )
}

pub fn space_expr(expr: Expr) -> EntryKind {
    directive(
        DirectiveOp::Space,
        vec![DirOperand::Expr(expr), DirOperand::Empty],
    )
}

pub fn p2align(power: i64, max_skip: i64) -> EntryKind {
    directive(
        DirectiveOp::P2align,
        vec![
            DirOperand::Int(power),
            DirOperand::Empty,
            DirOperand::Int(max_skip),
        ],
    )
}

/// A string directive; `literal` must carry its quotes, as the parser
/// leaves them in.
pub fn string_dir(op: DirectiveOp, literal: &str) -> EntryKind {
    directive(op, vec![DirOperand::Str(literal.to_string())])
}

/// Mark `name` as a function symbol and run discovery.
pub fn discover_functions(unit: &mut Unit, names: &[&str]) {
    for name in names {
        let sym = unit.symbol_table().find(name).expect("label symbol");
        unit.symbol_table_mut()
            .get_mut(sym)
            .set_symbol_type(asmforge::SymbolType::Function);
    }
    unit.find_functions().expect("function discovery");
}
