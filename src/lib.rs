//! # asmforge — assembly-level manipulation framework
//!
//! `asmforge` materializes a stream of parsed GNU-as x86/x86-64 entries
//! into an in-memory IR, exposes analyses over it (control-flow graphs,
//! register definition masks), and computes final encoded section sizes by
//! running machine-dependent branch relaxation.
//!
//! The assembler front-end stays external: it delivers entries one at a
//! time through [`Unit::add_entry`] and answers instruction-size questions
//! through the [`InsnEncoder`] oracles.  The core never encodes
//! instructions and never resolves relocations beyond size computation.
//!
//! ## Quick Start
//!
//! ```rust
//! use asmforge::{
//!     DirOperand, Directive, DirectiveOp, EntryKind, Insn, InsnEncoder, Relaxer, SizeMap, Unit,
//! };
//!
//! // A stand-in for the front-end's size oracle.
//! struct FixedSizes;
//! impl InsnEncoder for FixedSizes {
//!     fn size_of_instruction(&self, _: &Insn) -> (u64, bool) {
//!         (1, false)
//!     }
//!     fn encode_instruction_bytes(&self, _: &Insn) -> Vec<u8> {
//!         vec![0x90]
//!     }
//! }
//!
//! let mut unit = Unit::new();
//! unit.add_entry(
//!     EntryKind::Directive(Directive::new(
//!         DirectiveOp::Quad,
//!         vec![DirOperand::Int(0)],
//!     )),
//!     1,
//!     None,
//!     true,
//! )?;
//! let section = unit.section(".text").unwrap().id();
//! let mut sizes = SizeMap::new();
//! let total = Relaxer::relax(&mut unit, section, &FixedSizes, &mut sizes)?;
//! assert_eq!(total, 8);
//! # Ok::<(), asmforge::Error>(())
//! ```
//!
//! ## Features
//!
//! - **Entry stream IR** — labels, directives, instructions, and debug
//!   markers in one doubly-linked chain per subsection, round-trippable
//!   back to assembly text.
//! - **Analyses** — per-function CFGs with typed edges, and 64-bit register
//!   definition masks for peephole passes.
//! - **Relaxation** — GNU-as compatible fragment chains with monotone
//!   fixed-point growth for branches, alignment, LEB128, and `.space`.
//! - **`no_std` + `alloc`** — the `std` feature (default) adds
//!   `std::error::Error` impls and pass timing.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
// ── Lint policy ──────────────────────────────────────────────────────────
// An assembly framework deliberately performs narrowing and sign-changing
// casts between address, displacement, and size widths.  The lints below
// are expected in this context.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::match_same_arms,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::uninlined_format_args,
    clippy::wildcard_imports,
    clippy::enum_glob_use
)]

extern crate alloc;

/// Control-flow graph construction and basic blocks.
pub mod cfg;
/// Unreachable-block discovery pass.
pub mod deadcode;
/// Register definition masks.
pub mod defs;
/// Error types.
pub mod error;
/// Shallow expressions and LEB128 sizing.
pub mod expr;
/// Machine-instruction records and classification helpers.
pub mod insn;
/// The entry model: labels, directives, instructions, debug markers.
pub mod ir;
/// Pass harness: options, tracing, timing, registry.
pub mod passes;
/// Redundant memory-load detection pass.
pub mod redmov;
/// Fragment chains and branch relaxation.
pub mod relax;
/// Symbol table.
pub mod symbols;
/// The translation unit: sections, subsections, functions, entry chains.
pub mod unit;

// Re-exports
pub use cfg::{BasicBlock, BlockId, Cfg, Edge, EdgeKind};
pub use defs::{mask_for_register, register_def_mask, REG_ALL};
pub use error::Error;
pub use expr::{
    convert_to_bignum, sizeof_big_leb128, sizeof_leb128, sizeof_sleb128, sizeof_uleb128, Expr,
    ExprOp,
};
pub use insn::{
    Insn, Mnemonic, Operand, OperandData, OperandType, Register, RelocKind, UNKNOWN_TARGET,
};
pub use ir::{DirOperand, Directive, DirectiveOp, Entry, EntryId, EntryKind};
pub use passes::{
    Finding, OptionDef, OptionDefault, OptionValue, Pass, PassDescriptor, PassManager, PassOptions,
};
pub use relax::{InsnEncoder, Relaxer, SizeMap, MAX_RELAX_PASSES};
pub use symbols::{Symbol, SymbolId, SymbolTable, SymbolType};
pub use unit::{
    Function, FunctionId, Section, SectionId, SubSection, SubSectionId, Unit,
    DEFAULT_SECTION_NAME, START_SECTION_NAME,
};
