//! The entry model: one record per semantic line of assembly.
//!
//! Entries share id, source line, verbatim text, and chain links in an
//! outer record; the per-kind payload lives in [`EntryKind`].  Entries are
//! owned by the [`Unit`](crate::unit::Unit)'s append-only arena and linked
//! into per-subsection doubly-linked lists over stable ids.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::Error;
use crate::expr::{Expr, ExprOp};
use crate::insn::Insn;
use crate::symbols::{SymbolId, SymbolTable};

/// Stable index of an entry in its unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryId(pub u32);

impl EntryId {
    #[inline]
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Directives ────────────────────────────────────────────

/// The closed set of directive opcodes the core interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum DirectiveOp {
    File,
    Section,
    Globl,
    Local,
    Weak,
    Type,
    Size,
    Byte,
    Word,
    Long,
    Quad,
    Rva,
    Ascii,
    String8,
    String16,
    String32,
    String64,
    Sleb128,
    Uleb128,
    P2align,
    P2alignw,
    P2alignl,
    Space,
    DsB,
    DsW,
    DsL,
    DsD,
    DsX,
    Comm,
    Ident,
    /// `.set`, identical to `.equ`.
    Set,
    Equiv,
    Weakref,
    Arch,
}

impl DirectiveOp {
    /// The directive's source spelling.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DirectiveOp::File => ".file",
            DirectiveOp::Section => ".section",
            DirectiveOp::Globl => ".globl",
            DirectiveOp::Local => ".local",
            DirectiveOp::Weak => ".weak",
            DirectiveOp::Type => ".type",
            DirectiveOp::Size => ".size",
            DirectiveOp::Byte => ".byte",
            DirectiveOp::Word => ".word",
            DirectiveOp::Long => ".long",
            DirectiveOp::Quad => ".quad",
            DirectiveOp::Rva => ".rva",
            DirectiveOp::Ascii => ".ascii",
            DirectiveOp::String8 => ".string",
            DirectiveOp::String16 => ".string16",
            DirectiveOp::String32 => ".string32",
            DirectiveOp::String64 => ".string64",
            DirectiveOp::Sleb128 => ".sleb128",
            DirectiveOp::Uleb128 => ".uleb128",
            DirectiveOp::P2align => ".p2align",
            DirectiveOp::P2alignw => ".p2alignw",
            DirectiveOp::P2alignl => ".p2alignl",
            DirectiveOp::Space => ".space",
            DirectiveOp::DsB => ".ds.b",
            DirectiveOp::DsW => ".ds.w",
            DirectiveOp::DsL => ".ds.l",
            DirectiveOp::DsD => ".ds.d",
            DirectiveOp::DsX => ".ds.x",
            DirectiveOp::Comm => ".comm",
            DirectiveOp::Ident => ".ident",
            DirectiveOp::Set => ".set",
            DirectiveOp::Equiv => ".equiv",
            DirectiveOp::Weakref => ".weakref",
            DirectiveOp::Arch => ".arch",
        }
    }
}

/// One directive operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirOperand {
    /// An explicitly empty operand slot (e.g. the fill of `.p2align 4,,15`).
    Empty,
    /// A string operand, quotes preserved where the source had them.
    Str(String),
    /// An integer operand.
    Int(i64),
    /// A symbol-reference operand.
    Sym(SymbolId),
    /// An expression operand.
    Expr(Expr),
}

/// A directive: opcode plus ordered operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// The directive opcode.
    pub op: DirectiveOp,
    /// The ordered operand list.
    pub operands: Vec<DirOperand>,
}

impl Directive {
    /// Build a directive.
    #[must_use]
    pub fn new(op: DirectiveOp, operands: Vec<DirOperand>) -> Self {
        Directive { op, operands }
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
    pub fn operand(&self, index: usize) -> Result<&DirOperand, Error> {
        self.operands.get(index).ok_or(Error::OperandIndex {
            index,
            count: self.operands.len(),
        })
    }

    fn write_operands(
        &self,
        out: &mut dyn fmt::Write,
        symbols: &SymbolTable,
    ) -> Result<(), Error> {
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            match operand {
                DirOperand::Empty => {}
                DirOperand::Str(s) => out.write_str(s)?,
                DirOperand::Int(n) => write!(out, "{}", n)?,
                DirOperand::Sym(sym) => out.write_str(dot_or_symbol(symbols, *sym))?,
                DirOperand::Expr(expr) => write_dir_expr(out, expr, symbols)?,
            }
        }
        Ok(())
    }
}

// The front-end's fake label for the location counter.
fn dot_or_symbol(symbols: &SymbolTable, sym: SymbolId) -> &str {
    let name = symbols.name_of(sym);
    if name == "L0\u{1}" {
        "."
    } else {
        name
    }
}

fn write_dir_expr(
    out: &mut dyn fmt::Write,
    expr: &Expr,
    symbols: &SymbolTable,
) -> Result<(), Error> {
    match expr.op {
        ExprOp::Constant => write!(out, "{}", expr.add_number)?,
        ExprOp::Symbol => {
            if let Some(sym) = expr.add_symbol {
                write!(out, "{}+", dot_or_symbol(symbols, sym))?;
            }
            write!(out, "{}", expr.add_number)?;
        }
        ExprOp::Add => {
            if let Some(sym) = expr.add_symbol {
                write!(out, "{}+", dot_or_symbol(symbols, sym))?;
            }
            if let Some(sym) = expr.op_symbol {
                write!(out, "{}+", dot_or_symbol(symbols, sym))?;
            }
            write!(out, "{}", expr.add_number)?;
        }
        ExprOp::Subtract => {
            if let Some(sym) = expr.add_symbol {
                write!(out, "{}-", dot_or_symbol(symbols, sym))?;
            }
            if let Some(sym) = expr.op_symbol {
                write!(out, "{}+", dot_or_symbol(symbols, sym))?;
            }
            write!(out, "{}", expr.add_number)?;
        }
        op => return Err(Error::UnsupportedExpression { op }),
    }
    Ok(())
}

// ─── Entries ───────────────────────────────────────────────

/// The per-kind payload of an entry.
#[derive(Debug, Clone)]
pub enum EntryKind {
    /// A label definition; declares a symbol in the enclosing section.
    Label {
        /// The label name.
        name: String,
    },
    /// A directive.
    Directive(Directive),
    /// A machine instruction.
    Insn(alloc::boxed::Box<Insn>),
    /// An opaque debug marker that survives transformation.
    Debug {
        /// The debug directive key (e.g. `.loc`).
        key: String,
        /// The raw value text.
        value: String,
    },
}

/// One semantic line of assembly.
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) id: EntryId,
    pub(crate) line_number: u32,
    pub(crate) verbatim: Option<String>,
    pub(crate) prev: Option<EntryId>,
    pub(crate) next: Option<EntryId>,
    pub(crate) kind: EntryKind,
}

impl Entry {
    /// The entry's id.
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The source line number.
    #[must_use]
    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    /// The verbatim source text, if preserved.
    #[must_use]
    pub fn verbatim(&self) -> Option<&str> {
        self.verbatim.as_deref()
    }

    /// The previous entry in the subsection chain.
    #[must_use]
    pub fn prev(&self) -> Option<EntryId> {
        self.prev
    }

    /// The next entry in the subsection chain.
    #[must_use]
    pub fn next(&self) -> Option<EntryId> {
        self.next
    }

    /// The per-kind payload.
    #[must_use]
    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// The per-kind payload, mutably (for IR-repairing passes).
    pub fn kind_mut(&mut self) -> &mut EntryKind {
        &mut self.kind
    }

    /// Whether this entry is a label.
    #[must_use]
    pub fn is_label(&self) -> bool {
        matches!(self.kind, EntryKind::Label { .. })
    }

    /// Whether this entry is an instruction.
    #[must_use]
    pub fn is_insn(&self) -> bool {
        matches!(self.kind, EntryKind::Insn(_))
    }

    /// The label name, if this entry is a label.
    #[must_use]
    pub fn label_name(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Label { name } => Some(name),
            _ => None,
        }
    }

    /// The instruction, if this entry is one.
    #[must_use]
    pub fn as_insn(&self) -> Option<&Insn> {
        match &self.kind {
            EntryKind::Insn(insn) => Some(insn),
            _ => None,
        }
    }

    /// The directive, if this entry is one.
    #[must_use]
    pub fn as_directive(&self) -> Option<&Directive> {
        match &self.kind {
            EntryKind::Directive(d) => Some(d),
            _ => None,
        }
    }

    /// One-character kind tag for IR dumps.
    #[must_use]
    pub fn descriptive_char(&self) -> char {
        match self.kind {
            EntryKind::Label { .. } => 'L',
            EntryKind::Directive(_) => 'D',
            EntryKind::Insn(_) => 'I',
            EntryKind::Debug { .. } => 'G',
        }
    }

    fn write_source_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "\t # [{}], line: {}\t{}",
            self.id.0,
            self.line_number,
            self.verbatim.as_deref().unwrap_or("")
        )
    }

    /// Render the entry as a line of assembly, trailing source-info comment
    /// included.
    ///
    /// # Errors
    ///
    /// Unsupported-input errors from instruction/expression rendering.
    pub fn write_entry(
        &self,
        out: &mut dyn fmt::Write,
        symbols: &SymbolTable,
    ) -> Result<(), Error> {
        match &self.kind {
            EntryKind::Label { name } => {
                write!(out, "{}:", name)?;
            }
            EntryKind::Directive(d) => {
                write!(out, "\t{}\t", d.op.name())?;
                d.write_operands(out, symbols)?;
            }
            EntryKind::Insn(insn) => {
                insn.write_insn(out, symbols)?;
            }
            EntryKind::Debug { key, value } => {
                write!(out, "\t{}\t{}", key, value)?;
            }
        }
        self.write_source_info(out)?;
        Ok(())
    }

    /// Render the entry payload alone, for IR dumps (no source info).
    ///
    /// # Errors
    ///
    /// Unsupported-input errors from instruction/expression rendering.
    pub fn write_ir(&self, out: &mut dyn fmt::Write, symbols: &SymbolTable) -> Result<(), Error> {
        match &self.kind {
            EntryKind::Label { name } => {
                write!(out, "{}", name)?;
            }
            EntryKind::Directive(d) => {
                write!(out, "{} ", d.op.name())?;
                d.write_operands(out, symbols)?;
            }
            EntryKind::Insn(insn) => {
                insn.write_insn(out, symbols)?;
            }
            EntryKind::Debug { key, value } => {
                write!(out, "{} {}", key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn directive_names() {
        assert_eq!(DirectiveOp::P2align.name(), ".p2align");
        assert_eq!(DirectiveOp::String8.name(), ".string");
        assert_eq!(DirectiveOp::DsX.name(), ".ds.x");
        assert_eq!(DirectiveOp::Set.name(), ".set");
    }

    #[test]
    fn directive_operand_bounds() {
        let d = Directive::new(DirectiveOp::Byte, vec![DirOperand::Int(1)]);
        assert!(d.operand(0).is_ok());
        assert_eq!(
            d.operand(1),
            Err(Error::OperandIndex { index: 1, count: 1 })
        );
    }

    #[test]
    fn directive_rendering() {
        let symbols = SymbolTable::new();
        let d = Directive::new(
            DirectiveOp::P2align,
            vec![DirOperand::Int(4), DirOperand::Empty, DirOperand::Int(15)],
        );
        let mut out = alloc::string::String::new();
        d.write_operands(&mut out, &symbols).unwrap();
        assert_eq!(out, "4, , 15");
    }

    #[test]
    fn dot_symbol_rendering() {
        let mut symbols = SymbolTable::new();
        let dot = symbols.find_or_create("L0\u{1}", None);
        let named = symbols.find_or_create("foo", None);
        assert_eq!(dot_or_symbol(&symbols, dot), ".");
        assert_eq!(dot_or_symbol(&symbols, named), "foo");
    }

    #[test]
    fn expr_operand_rendering() {
        let mut symbols = SymbolTable::new();
        let a = symbols.find_or_create("a", None);
        let b = symbols.find_or_create("b", None);
        let mut out = alloc::string::String::new();
        write_dir_expr(&mut out, &Expr::subtract(a, b, 4), &symbols).unwrap();
        assert_eq!(out, "a-b+4");

        let mut out = alloc::string::String::new();
        write_dir_expr(&mut out, &Expr::constant(-3), &symbols).unwrap();
        assert_eq!(out, "-3");

        let mut out = alloc::string::String::new();
        let err = write_dir_expr(
            &mut out,
            &Expr {
                op: ExprOp::Multiply,
                ..Expr::default()
            },
            &symbols,
        );
        assert_eq!(
            err,
            Err(Error::UnsupportedExpression {
                op: ExprOp::Multiply
            })
        );
    }

    #[test]
    fn entry_kind_tags() {
        let label = Entry {
            id: EntryId(0),
            line_number: 1,
            verbatim: None,
            prev: None,
            next: None,
            kind: EntryKind::Label {
                name: "main".to_string(),
            },
        };
        assert!(label.is_label());
        assert_eq!(label.descriptive_char(), 'L');
        assert_eq!(label.label_name(), Some("main"));
        assert!(label.as_insn().is_none());
    }
}
