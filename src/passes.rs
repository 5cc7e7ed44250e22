//! Pass harness: typed per-pass options, tracing, timing, and a
//! registration table of pass descriptors.
//!
//! Passes are diagnostic in this core: they receive a `(Unit, Cfg)` pair
//! and return typed [`Finding`]s; the harness handles option plumbing,
//! wall-clock timing (with `std`), and the trace channel.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::time::Duration;

use crate::cfg::{BlockId, Cfg};
use crate::error::Error;
use crate::ir::EntryId;
use crate::unit::Unit;

// ─── Options ───────────────────────────────────────────────

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// An integer option.
    Int(i64),
    /// A boolean option.
    Bool(bool),
    /// A string option.
    Str(String),
}

impl OptionValue {
    /// The type name used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Int(_) => "int",
            OptionValue::Bool(_) => "bool",
            OptionValue::Str(_) => "string",
        }
    }
}

/// A const-friendly option default; doubles as the declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionDefault {
    /// Integer option with its default.
    Int(i64),
    /// Boolean option with its default.
    Bool(bool),
    /// String option with its default.
    Str(&'static str),
}

impl OptionDefault {
    fn to_value(self) -> OptionValue {
        match self {
            OptionDefault::Int(n) => OptionValue::Int(n),
            OptionDefault::Bool(b) => OptionValue::Bool(b),
            OptionDefault::Str(s) => OptionValue::Str(s.to_string()),
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            OptionDefault::Int(_) => "int",
            OptionDefault::Bool(_) => "bool",
            OptionDefault::Str(_) => "string",
        }
    }
}

/// One declared pass option.
#[derive(Debug, Clone, Copy)]
pub struct OptionDef {
    /// The option name.
    pub name: &'static str,
    /// The default value (and with it the declared type).
    pub default: OptionDefault,
    /// One-line help text.
    pub help: &'static str,
}

/// The option values of one pass instance, seeded from its schema.
///
/// Values are stored positionally, parallel to the schema slice.
#[derive(Debug, Clone)]
pub struct PassOptions {
    pass: &'static str,
    schema: &'static [OptionDef],
    values: Vec<OptionValue>,
}

impl PassOptions {
    /// Populate defaults from a schema.
    #[must_use]
    pub fn new(pass: &'static str, schema: &'static [OptionDef]) -> Self {
        let values = schema.iter().map(|def| def.default.to_value()).collect();
        PassOptions {
            pass,
            schema,
            values,
        }
    }

    /// Set an option from text, type-checked against the schema.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPassOption`] for undeclared names and
    /// [`Error::OptionType`] when the text does not parse as the declared
    /// type.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let index = self.position(name)?;
        let def = &self.schema[index];
        let parsed = match def.default {
            OptionDefault::Int(_) => value
                .parse::<i64>()
                .map(OptionValue::Int)
                .map_err(|_| self.type_error(def, value))?,
            OptionDefault::Bool(_) => match value {
                "true" | "1" => OptionValue::Bool(true),
                "false" | "0" => OptionValue::Bool(false),
                _ => return Err(self.type_error(def, value)),
            },
            OptionDefault::Str(_) => OptionValue::Str(value.to_string()),
        };
        self.values[index] = parsed;
        Ok(())
    }

    fn position(&self, name: &str) -> Result<usize, Error> {
        self.schema
            .iter()
            .position(|def| def.name == name)
            .ok_or_else(|| Error::UnknownPassOption {
                pass: self.pass,
                name: name.to_string(),
            })
    }

    fn type_error(&self, def: &OptionDef, value: &str) -> Error {
        Error::OptionType {
            pass: self.pass,
            name: def.name,
            expected: def.default.type_name(),
            value: value.to_string(),
        }
    }

    fn lookup(&self, name: &str) -> Result<(&'static str, &OptionValue), Error> {
        let index = self.position(name)?;
        Ok((self.schema[index].name, &self.values[index]))
    }

    /// An integer option's value.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPassOption`] for undeclared names,
    /// [`Error::OptionType`] when the option has another type.
    pub fn int(&self, name: &str) -> Result<i64, Error> {
        match self.lookup(name)? {
            (_, OptionValue::Int(n)) => Ok(*n),
            (name, other) => Err(Error::OptionType {
                pass: self.pass,
                name,
                expected: "int",
                value: other.type_name().to_string(),
            }),
        }
    }

    /// A boolean option's value.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPassOption`] for undeclared names,
    /// [`Error::OptionType`] when the option has another type.
    pub fn bool(&self, name: &str) -> Result<bool, Error> {
        match self.lookup(name)? {
            (_, OptionValue::Bool(b)) => Ok(*b),
            (name, other) => Err(Error::OptionType {
                pass: self.pass,
                name,
                expected: "bool",
                value: other.type_name().to_string(),
            }),
        }
    }

    /// A string option's value.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPassOption`] for undeclared names,
    /// [`Error::OptionType`] when the option has another type.
    pub fn str(&self, name: &str) -> Result<&str, Error> {
        match self.lookup(name)? {
            (_, OptionValue::Str(s)) => Ok(s),
            (name, other) => Err(Error::OptionType {
                pass: self.pass,
                name,
                expected: "string",
                value: other.type_name().to_string(),
            }),
        }
    }
}

// ─── Findings ──────────────────────────────────────────────

/// A diagnostic finding; passes report, they never rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// A basic block unreachable from the CFG root.
    DeadBlock {
        /// The unreachable block.
        block: BlockId,
        /// How many entries it spans.
        entries: usize,
    },
    /// A pair of loads from the same memory operand with no intervening
    /// redefinition.
    RedundantLoad {
        /// The first load.
        first: EntryId,
        /// The second, redundant load.
        second: EntryId,
    },
}

// ─── Pass state ────────────────────────────────────────────

/// Per-pass state the harness hands to a running pass: options, trace
/// level, accumulated timing.
#[derive(Debug)]
pub struct Pass {
    name: &'static str,
    options: PassOptions,
    trace_level: u32,
    timed: bool,
    elapsed: Duration,
}

impl Pass {
    /// Instantiate pass state from a descriptor's schema.
    #[must_use]
    pub fn new(name: &'static str, schema: &'static [OptionDef]) -> Self {
        Pass {
            name,
            options: PassOptions::new(name, schema),
            trace_level: 0,
            timed: false,
            elapsed: Duration::ZERO,
        }
    }

    /// The pass name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The pass's options.
    #[must_use]
    pub fn options(&self) -> &PassOptions {
        &self.options
    }

    /// The pass's options, mutably.
    pub fn options_mut(&mut self) -> &mut PassOptions {
        &mut self.options
    }

    /// Convenience for [`PassOptions::int`].
    ///
    /// # Errors
    ///
    /// See [`PassOptions::int`].
    pub fn int(&self, name: &str) -> Result<i64, Error> {
        self.options.int(name)
    }

    /// The current trace verbosity.
    #[must_use]
    pub fn trace_level(&self) -> u32 {
        self.trace_level
    }

    /// Set the trace verbosity.
    pub fn set_trace_level(&mut self, level: u32) {
        self.trace_level = level;
    }

    /// Enable wall-clock timing for this pass.
    pub fn set_timed(&mut self) {
        self.timed = true;
    }

    /// Time accumulated across runs (zero without the `std` feature).
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Emit a trace message when `level` is within the configured
    /// verbosity.
    pub fn trace(&self, level: u32, args: fmt::Arguments<'_>) {
        if level <= self.trace_level {
            log::debug!(target: "passes", "[{}] {}", self.name, args);
        }
    }
}

// ─── Registry ──────────────────────────────────────────────

/// A pass: name, option schema, entry point.
pub struct PassDescriptor {
    /// The pass name (option specs use it as prefix).
    pub name: &'static str,
    /// The declared options.
    pub options: &'static [OptionDef],
    /// The entry point, invoked once per `(unit, cfg)` pair.
    pub run: fn(&Unit, &Cfg, &mut Pass) -> Result<Vec<Finding>, Error>,
}

impl fmt::Debug for PassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassDescriptor")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}

/// Holds registered passes and drives them over a unit's functions.
#[derive(Debug, Default)]
pub struct PassManager {
    passes: Vec<(&'static PassDescriptor, Pass)>,
}

impl PassManager {
    /// An empty manager.
    #[must_use]
    pub fn new() -> Self {
        PassManager::default()
    }

    /// Register a pass; it runs in registration order.
    pub fn register(&mut self, descriptor: &'static PassDescriptor) {
        self.passes
            .push((descriptor, Pass::new(descriptor.name, descriptor.options)));
    }

    /// Set an option given a `PASS.option` spec and a value string.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPass`] / [`Error::UnknownPassOption`] /
    /// [`Error::OptionType`] per the failing stage.
    pub fn set_option(&mut self, spec: &str, value: &str) -> Result<(), Error> {
        let (pass_name, option) = spec.split_once('.').ok_or_else(|| Error::UnknownPass {
            name: spec.to_string(),
        })?;
        let pass = self
            .passes
            .iter_mut()
            .find(|(d, _)| d.name == pass_name)
            .map(|(_, p)| p)
            .ok_or_else(|| Error::UnknownPass {
                name: pass_name.to_string(),
            })?;
        pass.options_mut().set(option, value)
    }

    /// Set the trace verbosity of every registered pass.
    pub fn set_trace_level(&mut self, level: u32) {
        for (_, pass) in &mut self.passes {
            pass.set_trace_level(level);
        }
    }

    /// Access a registered pass's state by name.
    #[must_use]
    pub fn pass(&self, name: &str) -> Option<&Pass> {
        self.passes
            .iter()
            .find(|(d, _)| d.name == name)
            .map(|(_, p)| p)
    }

    /// Run every registered pass over every discovered function.
    ///
    /// Each function gets a fresh CFG, released after its passes ran.
    ///
    /// # Errors
    ///
    /// The first pass error aborts the run.
    pub fn run(&mut self, unit: &Unit) -> Result<Vec<Finding>, Error> {
        let mut findings = Vec::new();
        for function in unit.functions() {
            let cfg = Cfg::build(unit, function);
            for (descriptor, pass) in &mut self.passes {
                #[cfg(feature = "std")]
                let start = std::time::Instant::now();

                let mut result = (descriptor.run)(unit, &cfg, pass)?;
                findings.append(&mut result);

                #[cfg(feature = "std")]
                {
                    pass.elapsed += start.elapsed();
                    if pass.timed {
                        log::info!(
                            target: "passes",
                            "[{}] {} took {:?}",
                            pass.name,
                            function.name(),
                            start.elapsed()
                        );
                    }
                }
            }
        }
        Ok(findings)
    }
}
