//! Shallow expression trees and LEB128 size computation.
//!
//! Expressions mirror the GNU-as model: a single operator, an integer
//! addend, and up to two symbol operands.  Only constant / symbol / add /
//! subtract are fully supported; every other operator is carried opaquely
//! so the entry that owns it round-trips unchanged.

use alloc::vec::Vec;
use core::fmt;

use crate::symbols::SymbolId;

/// Number of bits per big-number limb.
pub const LITTLENUM_BITS: u32 = 16;

const LITTLENUM_MASK: u64 = 0xFFFF;

/// Expression operator tag.
///
/// The full operator alphabet is carried so unsupported expressions survive
/// a round trip; the printer and the relaxer only interpret the first four
/// data-bearing tags plus [`ExprOp::Big`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExprOp {
    /// An illegal expression.
    Illegal,
    /// A nonexistent expression.
    Absent,
    /// `add_number` — a constant.
    Constant,
    /// `add_symbol + add_number`.
    Symbol,
    /// `add_symbol + add_number − image base`.
    SymbolRva,
    /// A register (`add_number` is the register number).
    Register,
    /// A big value held in the limb array; `add_number` is the limb count.
    Big,
    /// `(− add_symbol) + add_number`.
    Uminus,
    /// `(~ add_symbol) + add_number`.
    BitNot,
    /// `(! add_symbol) + add_number`.
    LogicalNot,
    /// `(add_symbol * op_symbol) + add_number`.
    Multiply,
    /// `(add_symbol / op_symbol) + add_number`.
    Divide,
    /// `(add_symbol % op_symbol) + add_number`.
    Modulus,
    /// `(add_symbol << op_symbol) + add_number`.
    LeftShift,
    /// `(add_symbol >> op_symbol) + add_number`.
    RightShift,
    /// `(add_symbol | op_symbol) + add_number`.
    InclusiveOr,
    /// `(add_symbol |~ op_symbol) + add_number`.
    OrNot,
    /// `(add_symbol ^ op_symbol) + add_number`.
    ExclusiveOr,
    /// `(add_symbol & op_symbol) + add_number`.
    BitAnd,
    /// `(add_symbol + op_symbol) + add_number`.
    Add,
    /// `(add_symbol − op_symbol) + add_number`.
    Subtract,
    /// `(add_symbol == op_symbol) + add_number`.
    Eq,
    /// `(add_symbol != op_symbol) + add_number`.
    Ne,
    /// `(add_symbol < op_symbol) + add_number`.
    Lt,
    /// `(add_symbol <= op_symbol) + add_number`.
    Le,
    /// `(add_symbol >= op_symbol) + add_number`.
    Ge,
    /// `(add_symbol > op_symbol) + add_number`.
    Gt,
    /// `(add_symbol && op_symbol) + add_number`.
    LogicalAnd,
    /// `(add_symbol || op_symbol) + add_number`.
    LogicalOr,
    /// `op_symbol[add_symbol]`.
    Index,
}

impl fmt::Display for ExprOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExprOp::Illegal => "illegal",
            ExprOp::Absent => "absent",
            ExprOp::Constant => "constant",
            ExprOp::Symbol => "symbol",
            ExprOp::SymbolRva => "symbol-rva",
            ExprOp::Register => "register",
            ExprOp::Big => "big",
            ExprOp::Uminus => "unary-minus",
            ExprOp::BitNot => "bit-not",
            ExprOp::LogicalNot => "logical-not",
            ExprOp::Multiply => "multiply",
            ExprOp::Divide => "divide",
            ExprOp::Modulus => "modulus",
            ExprOp::LeftShift => "left-shift",
            ExprOp::RightShift => "right-shift",
            ExprOp::InclusiveOr => "inclusive-or",
            ExprOp::OrNot => "or-not",
            ExprOp::ExclusiveOr => "exclusive-or",
            ExprOp::BitAnd => "bit-and",
            ExprOp::Add => "add",
            ExprOp::Subtract => "subtract",
            ExprOp::Eq => "eq",
            ExprOp::Ne => "ne",
            ExprOp::Lt => "lt",
            ExprOp::Le => "le",
            ExprOp::Ge => "ge",
            ExprOp::Gt => "gt",
            ExprOp::LogicalAnd => "logical-and",
            ExprOp::LogicalOr => "logical-or",
            ExprOp::Index => "index",
        };
        f.write_str(name)
    }
}

/// A shallow assembly expression.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Expr {
    /// The operator tag.
    pub op: ExprOp,
    /// The integer addend; for [`ExprOp::Big`], the number of limbs.
    pub add_number: i64,
    /// The primary symbol operand.
    pub add_symbol: Option<SymbolId>,
    /// The secondary symbol operand.
    pub op_symbol: Option<SymbolId>,
    /// Whether `add_number` was written as an unsigned value.
    pub unsigned: bool,
    /// Limbs of a big value, least significant first (16 bits each).
    pub littlenums: Vec<u16>,
}

impl Default for Expr {
    fn default() -> Self {
        Expr {
            op: ExprOp::Absent,
            add_number: 0,
            add_symbol: None,
            op_symbol: None,
            unsigned: false,
            littlenums: Vec::new(),
        }
    }
}

impl Expr {
    /// A constant expression.
    #[must_use]
    pub fn constant(value: i64) -> Self {
        Expr {
            op: ExprOp::Constant,
            add_number: value,
            ..Expr::default()
        }
    }

    /// A symbol reference plus addend.
    #[must_use]
    pub fn symbol(sym: SymbolId, addend: i64) -> Self {
        Expr {
            op: ExprOp::Symbol,
            add_number: addend,
            add_symbol: Some(sym),
            ..Expr::default()
        }
    }

    /// `(a + b) + addend`.
    #[must_use]
    pub fn add(a: SymbolId, b: SymbolId, addend: i64) -> Self {
        Expr {
            op: ExprOp::Add,
            add_number: addend,
            add_symbol: Some(a),
            op_symbol: Some(b),
            ..Expr::default()
        }
    }

    /// `(a − b) + addend`.
    #[must_use]
    pub fn subtract(a: SymbolId, b: SymbolId, addend: i64) -> Self {
        Expr {
            op: ExprOp::Subtract,
            add_number: addend,
            add_symbol: Some(a),
            op_symbol: Some(b),
            ..Expr::default()
        }
    }

    /// Whether the expression is a plain constant.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.op == ExprOp::Constant
    }
}

/// Rewrite a constant expression as a big value.
///
/// Used when a signed LEB128 directive carries a constant whose stored sign
/// bit disagrees with its unsigned flag: the value is re-expressed as a limb
/// array with an explicit extension limb so the size computation sees the
/// intended magnitude.  `add_number` becomes the limb count.
pub fn convert_to_bignum(expr: &mut Expr) {
    let mut value = expr.add_number as u64;
    let mut limbs = Vec::with_capacity(5);
    for _ in 0..(64 / LITTLENUM_BITS) {
        limbs.push((value & LITTLENUM_MASK) as u16);
        value >>= LITTLENUM_BITS;
    }
    // Append an extension limb when the top bit does not reflect the sign
    // of the original value.
    if (expr.add_number < 0) != !expr.unsigned {
        limbs.push(if expr.unsigned { 0 } else { 0xFFFF });
    }
    expr.op = ExprOp::Big;
    expr.add_number = limbs.len() as i64;
    expr.littlenums = limbs;
}

/// Byte length of the signed LEB128 encoding of `value`.
#[must_use]
pub fn sizeof_sleb128(value: i64) -> u64 {
    sizeof_sleb128_wide(i128::from(value))
}

/// Byte length of the unsigned LEB128 encoding of `value`.
#[must_use]
pub fn sizeof_uleb128(value: u64) -> u64 {
    sizeof_uleb128_wide(u128::from(value))
}

/// Byte length of the LEB128 encoding of `value`, signed or unsigned.
#[must_use]
pub fn sizeof_leb128(value: i64, signed: bool) -> u64 {
    if signed {
        sizeof_sleb128(value)
    } else {
        sizeof_uleb128(value as u64)
    }
}

/// Byte length of the LEB128 encoding of a big value given as limbs.
///
/// This is the measurement mode of the big-number LEB encoder: nothing is
/// emitted, only the length is computed.  Signed values are interpreted as
/// two's complement over `16 * limbs.len()` bits.
#[must_use]
pub fn sizeof_big_leb128(limbs: &[u16], signed: bool) -> u64 {
    let bits = (limbs.len() as u32) * LITTLENUM_BITS;
    let mut value: u128 = 0;
    for (i, limb) in limbs.iter().enumerate().take(8) {
        value |= u128::from(*limb) << (i as u32 * LITTLENUM_BITS);
    }
    if signed {
        // Sign-extend from the top limb bit.
        let negative = bits > 0 && bits < 128 && (value >> (bits - 1)) & 1 == 1;
        let extended = if negative {
            (value | (u128::MAX << bits)) as i128
        } else {
            value as i128
        };
        sizeof_sleb128_wide(extended)
    } else {
        sizeof_uleb128_wide(value)
    }
}

fn sizeof_sleb128_wide(mut value: i128) -> u64 {
    let mut size = 0;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        size += 1;
        if (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0) {
            return size;
        }
    }
}

fn sizeof_uleb128_wide(mut value: u128) -> u64 {
    let mut size = 0;
    loop {
        value >>= 7;
        size += 1;
        if value == 0 {
            return size;
        }
    }
}
