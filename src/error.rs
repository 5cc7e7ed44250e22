//! Error types for IR construction, analysis, and relaxation.

use alloc::string::String;
use core::fmt;

use crate::expr::ExprOp;
use crate::insn::RelocKind;

/// Errors reported by the IR core.
///
/// The first group are structural-invariant violations and unsupported-input
/// conditions — fatal in the sense that the unit being built is unusable,
/// though the caller decides whether to abort.  Diagnostic findings (dead
/// blocks, redundant loads) are *not* errors; passes return them as values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A label name was defined twice in the same unit.
    DuplicateLabel {
        /// The duplicated label name.
        label: String,
        /// Source line of the second definition.
        line: u32,
    },

    /// A label entry was looked up by name but never defined.
    MissingLabel {
        /// The missing label name.
        label: String,
    },

    /// A directive operand index was out of range.
    OperandIndex {
        /// The requested operand index.
        index: usize,
        /// The number of operands present.
        count: usize,
    },

    /// A directive did not carry the operand count its opcode requires.
    MissingOperands {
        /// The directive name (e.g. `.p2align`).
        directive: &'static str,
        /// How many operands the opcode requires.
        expected: usize,
        /// How many operands were present.
        found: usize,
    },

    /// A directive operand had the wrong kind (e.g. a string where an
    /// integer was required).
    OperandKind {
        /// The directive name.
        directive: &'static str,
        /// Description of the expected operand kind.
        expected: &'static str,
    },

    /// An expression tag outside the printable subset had to be emitted.
    UnsupportedExpression {
        /// The offending expression operator.
        op: ExprOp,
    },

    /// An instruction carried a prefix byte the printer does not know.
    UnknownPrefix {
        /// The offending prefix byte.
        byte: u8,
    },

    /// An operand carried a relocation kind the printer does not know.
    UnknownRelocation {
        /// The raw relocation tag value.
        value: u32,
    },

    /// A `rep`-class prefix was attached to an instruction that does not
    /// take one.
    PrefixMismatch {
        /// The instruction mnemonic.
        mnemonic: String,
        /// The offending prefix byte.
        byte: u8,
    },

    /// A `.space`/`.ds.*` directive with a constant count that is not
    /// strictly positive.
    SpaceSize {
        /// The evaluated byte count.
        value: i64,
        /// Source line of the directive.
        line: u32,
    },

    /// A string directive whose literal is too short to carry the
    /// surrounding quotes the parser is expected to keep.
    StringLiteral {
        /// Source line of the directive.
        line: u32,
    },

    /// The size oracle flagged an instruction as variable-size, but it is
    /// not a jump the branch relaxer knows how to grow.
    UnrelaxableInstruction {
        /// The instruction mnemonic.
        mnemonic: String,
    },

    /// Relaxation did not reach a fixed point within the pass budget.
    RelaxationLimit {
        /// The configured maximum number of passes.
        max: usize,
    },

    /// An option referred to a pass that is not registered.
    UnknownPass {
        /// The pass name.
        name: String,
    },

    /// An option was set on a pass that does not declare it.
    UnknownPassOption {
        /// The pass name.
        pass: &'static str,
        /// The unrecognized option name.
        name: String,
    },

    /// The output formatter failed while rendering assembly or IR text.
    Format,

    /// A pass option value did not parse as its declared type.
    OptionType {
        /// The pass name.
        pass: &'static str,
        /// The option name.
        name: &'static str,
        /// The declared type name (`int`, `bool`, or `string`).
        expected: &'static str,
        /// The value text that failed to parse.
        value: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateLabel { label, line } => {
                write!(f, "line {}: duplicate label '{}'", line, label)
            }
            Error::MissingLabel { label } => {
                write!(f, "no label entry for '{}'", label)
            }
            Error::OperandIndex { index, count } => {
                write!(
                    f,
                    "operand index {} out of range (operand count {})",
                    index, count
                )
            }
            Error::MissingOperands {
                directive,
                expected,
                found,
            } => {
                write!(
                    f,
                    "{} requires {} operands, found {}",
                    directive, expected, found
                )
            }
            Error::OperandKind {
                directive,
                expected,
            } => {
                write!(f, "{} operand must be {}", directive, expected)
            }
            Error::UnsupportedExpression { op } => {
                write!(f, "unsupported expression operator '{}'", op)
            }
            Error::UnknownPrefix { byte } => {
                write!(f, "unknown prefix byte 0x{:02X}", byte)
            }
            Error::UnknownRelocation { value } => {
                write!(f, "unknown relocation kind {}", value)
            }
            Error::PrefixMismatch { mnemonic, byte } => {
                write!(
                    f,
                    "prefix 0x{:02X} does not match instruction '{}'",
                    byte, mnemonic
                )
            }
            Error::SpaceSize { value, line } => {
                write!(f, "line {}: space directive of {} bytes", line, value)
            }
            Error::StringLiteral { line } => {
                write!(f, "line {}: string literal missing surrounding quotes", line)
            }
            Error::UnrelaxableInstruction { mnemonic } => {
                write!(f, "instruction '{}' cannot be relaxed", mnemonic)
            }
            Error::RelaxationLimit { max } => {
                write!(
                    f,
                    "relaxation exceeded maximum of {} passes (possible oscillation)",
                    max
                )
            }
            Error::UnknownPass { name } => {
                write!(f, "no registered pass named '{}'", name)
            }
            Error::UnknownPassOption { pass, name } => {
                write!(f, "pass {} declares no option '{}'", pass, name)
            }
            Error::Format => f.write_str("formatter error while writing output"),
            Error::OptionType {
                pass,
                name,
                expected,
                value,
            } => {
                write!(
                    f,
                    "option {}.{} expects {}, got '{}'",
                    pass, name, expected, value
                )
            }
        }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::Format
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl Error {
    /// Build an [`Error::UnknownRelocation`] from a relocation kind.
    #[must_use]
    pub fn unknown_reloc(kind: RelocKind) -> Self {
        Error::UnknownRelocation {
            value: kind.raw_value(),
        }
    }
}
