//! The translation unit: entry arena, sections, subsections, functions.
//!
//! Entries live in an append-only arena indexed by [`EntryId`]; subsection
//! chains are doubly-linked lists over those ids.  When subsections of one
//! section interleave with other sections in the input, each new subsection
//! is spliced onto the previous subsection of the *same* section, so
//! per-section iteration follows textual order.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::error::Error;
use crate::ir::{DirOperand, DirectiveOp, Entry, EntryId, EntryKind};
use crate::symbols::{SymbolId, SymbolTable, SymbolType};

/// The section opened when the first entry arrives with no explicit section.
pub const DEFAULT_SECTION_NAME: &str = ".text";

/// The synthetic section holding entries seen before any real section.
pub const START_SECTION_NAME: &str = "mao_start_section";

/// Stable index of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionId(pub u32);

/// Stable index of a subsection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubSectionId(pub u32);

/// Stable index of a discovered function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionId(pub u32);

/// A contiguous run of entries sharing a `(section, subsection)` tag.
#[derive(Debug, Clone)]
pub struct SubSection {
    id: SubSectionId,
    number: u32,
    section: SectionId,
    first_entry: EntryId,
    last_entry: EntryId,
    start_section: bool,
}

impl SubSection {
    /// The subsection's id.
    #[must_use]
    pub fn id(&self) -> SubSectionId {
        self.id
    }

    /// The subsection number from the source.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The owning section.
    #[must_use]
    pub fn section(&self) -> SectionId {
        self.section
    }

    /// The first entry of the run.
    #[must_use]
    pub fn first_entry(&self) -> EntryId {
        self.first_entry
    }

    /// The last entry of the run.
    #[must_use]
    pub fn last_entry(&self) -> EntryId {
        self.last_entry
    }

    /// Whether this is the synthetic start subsection.
    #[must_use]
    pub fn is_start_section(&self) -> bool {
        self.start_section
    }
}

/// A named section owning subsections in creation order.
#[derive(Debug, Clone)]
pub struct Section {
    id: SectionId,
    name: String,
    subsections: Vec<SubSectionId>,
}

impl Section {
    /// The section's id.
    #[must_use]
    pub fn id(&self) -> SectionId {
        self.id
    }

    /// The section name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The subsections in creation order.
    #[must_use]
    pub fn subsection_ids(&self) -> &[SubSectionId] {
        &self.subsections
    }
}

/// A function: a closed entry range starting at its label.
#[derive(Debug, Clone)]
pub struct Function {
    id: FunctionId,
    name: String,
    first_entry: EntryId,
    last_entry: EntryId,
}

impl Function {
    /// The function's id.
    #[must_use]
    pub fn id(&self) -> FunctionId {
        self.id
    }

    /// The function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function's first entry (its label).
    #[must_use]
    pub fn first_entry(&self) -> EntryId {
        self.first_entry
    }

    /// The function's last entry.
    #[must_use]
    pub fn last_entry(&self) -> EntryId {
        self.last_entry
    }
}

/// Iterator over a run of chained entries.
pub struct EntryIter<'a> {
    pub(crate) unit: &'a Unit,
    pub(crate) cur: Option<EntryId>,
    pub(crate) stop_after: Option<EntryId>,
}

impl<'a> Iterator for EntryIter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<&'a Entry> {
        let id = self.cur?;
        let entry = self.unit.entry(id);
        self.cur = if Some(id) == self.stop_after {
            None
        } else {
            entry.next()
        };
        Some(entry)
    }
}

/// The top-level container for one assembly input.
#[derive(Debug, Default)]
pub struct Unit {
    entries: Vec<Entry>,
    sections: Vec<Section>,
    sections_by_name: BTreeMap<String, SectionId>,
    subsections: Vec<SubSection>,
    labels: BTreeMap<String, EntryId>,
    functions: Vec<Function>,
    symbols: SymbolTable,
    current_subsection: Option<SubSectionId>,
}

impl Unit {
    /// An empty unit with no subsection selected; a default is opened when
    /// the first entry arrives.
    #[must_use]
    pub fn new() -> Self {
        Unit::default()
    }

    // ── entry access ───────────────────────────────────────

    /// The number of entries.
    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Get an entry by id.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id.index()]
    }

    /// Get an entry mutably by id.
    pub fn entry_mut(&mut self, id: EntryId) -> &mut Entry {
        &mut self.entries[id.index()]
    }

    /// The entry after `id` in its chain.
    #[must_use]
    pub fn next_of(&self, id: EntryId) -> Option<EntryId> {
        self.entry(id).next()
    }

    /// The entry before `id` in its chain.
    #[must_use]
    pub fn prev_of(&self, id: EntryId) -> Option<EntryId> {
        self.entry(id).prev()
    }

    /// The next *instruction* entry after `id`, skipping labels,
    /// directives, and debug markers.
    #[must_use]
    pub fn next_instruction(&self, id: EntryId) -> Option<EntryId> {
        let mut cur = self.next_of(id);
        while let Some(e) = cur {
            if self.entry(e).is_insn() {
                return Some(e);
            }
            cur = self.next_of(e);
        }
        None
    }

    // ── construction ───────────────────────────────────────

    /// Append one entry delivered by the front-end.
    ///
    /// Assigns the next dense id, opens a subsection if none is active
    /// (`mao_start_section`, or `.text` when `create_default_section` is
    /// set), registers labels in the label map and symbol table, and opens
    /// a new subsection for `.section` directives.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateLabel`] for a label name seen before, and operand
    /// shape errors for malformed `.section` directives.
    pub fn add_entry(
        &mut self,
        kind: EntryKind,
        line_number: u32,
        verbatim: Option<String>,
        create_default_section: bool,
    ) -> Result<EntryId, Error> {
        // Inspect the payload before it moves into the arena.
        let label_name = match &kind {
            EntryKind::Label { name } => Some(name.clone()),
            _ => None,
        };
        let section_switch = match &kind {
            EntryKind::Directive(d) if d.op == DirectiveOp::Section => {
                if d.num_operands() == 0 {
                    return Err(Error::MissingOperands {
                        directive: DirectiveOp::Section.name(),
                        expected: 1,
                        found: 0,
                    });
                }
                match d.operand(0)? {
                    DirOperand::Str(name) => Some(name.clone()),
                    _ => {
                        return Err(Error::OperandKind {
                            directive: DirectiveOp::Section.name(),
                            expected: "a string",
                        })
                    }
                }
            }
            _ => None,
        };

        let id = EntryId(self.entries.len() as u32);
        self.entries.push(Entry {
            id,
            line_number,
            verbatim,
            prev: None,
            next: None,
            kind,
        });

        if self.current_subsection.is_none() && !create_default_section {
            self.set_subsection(START_SECTION_NAME, 0, id);
            if let Some(ss) = self.current_subsection {
                self.subsections[ss.0 as usize].start_section = true;
            }
        }
        if create_default_section {
            let needs_default = match self.current_subsection {
                None => true,
                Some(ss) => self.subsections[ss.0 as usize].start_section,
            };
            if needs_default {
                self.set_subsection(DEFAULT_SECTION_NAME, 0, id);
            }
        }

        if let Some(name) = section_switch {
            self.set_subsection(&name, 0, id);
        } else if let Some(name) = label_name {
            if self.labels.contains_key(&name) {
                return Err(Error::DuplicateLabel {
                    label: name,
                    line: line_number,
                });
            }
            self.labels.insert(name.clone(), id);
            let section = self.current_section_id();
            self.symbols.find_or_create(&name, section);
        }

        if let Some(ss) = self.current_subsection {
            self.set_last_entry(ss, id);
        }

        Ok(id)
    }

    /// Open subsection `(section_name, number)` starting at `entry`.
    ///
    /// Creates the section on first use.  If the section already had
    /// subsections, the new first entry is spliced after the previous
    /// subsection's last entry, keeping the per-section chain in textual
    /// order.  Returns whether the section was newly created.
    pub fn set_subsection(&mut self, section_name: &str, number: u32, entry: EntryId) -> bool {
        let (is_new, section_id) = self.find_or_create_section(section_name);
        let previous = self.sections[section_id.0 as usize]
            .subsections
            .last()
            .copied();

        let ss_id = SubSectionId(self.subsections.len() as u32);
        self.subsections.push(SubSection {
            id: ss_id,
            number,
            section: section_id,
            first_entry: entry,
            last_entry: entry,
            start_section: false,
        });
        self.sections[section_id.0 as usize].subsections.push(ss_id);
        self.current_subsection = Some(ss_id);

        if let Some(prev_ss) = previous {
            let prev_last = self.subsections[prev_ss.0 as usize].last_entry;
            self.entries[prev_last.index()].next = Some(entry);
            self.entries[entry.index()].prev = Some(prev_last);
        }

        is_new
    }

    fn set_last_entry(&mut self, ss: SubSectionId, entry: EntryId) {
        let subsection = &mut self.subsections[ss.0 as usize];
        // The first entry was already linked when the subsection opened.
        if entry != subsection.first_entry {
            let old_last = subsection.last_entry;
            subsection.last_entry = entry;
            self.entries[old_last.index()].next = Some(entry);
            self.entries[entry.index()].prev = Some(old_last);
        } else {
            subsection.last_entry = entry;
        }
    }

    fn find_or_create_section(&mut self, name: &str) -> (bool, SectionId) {
        if let Some(&id) = self.sections_by_name.get(name) {
            return (false, id);
        }
        let id = SectionId(self.sections.len() as u32);
        self.sections.push(Section {
            id,
            name: name.to_string(),
            subsections: Vec::new(),
        });
        self.sections_by_name.insert(name.to_string(), id);
        (true, id)
    }

    fn current_section_id(&self) -> Option<SectionId> {
        self.current_subsection
            .map(|ss| self.subsections[ss.0 as usize].section)
    }

    // ── symbols ────────────────────────────────────────────

    /// The embedded symbol table.
    #[must_use]
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The embedded symbol table, mutably.
    pub fn symbol_table_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Find or create a symbol in the current section.
    pub fn find_or_create_symbol(&mut self, name: &str) -> SymbolId {
        let section = self.current_section_id();
        self.symbols.find_or_create(name, section)
    }

    /// Record a common symbol, merging size and alignment upward.
    ///
    /// Common symbols may be defined several times; each definition raises
    /// the merged size/alignment, never lowers it.
    pub fn add_comm_symbol(&mut self, name: &str, common_size: u64, common_align: u32) {
        let section = self.current_section_id();
        let id = match self.symbols.find(name) {
            Some(id) => id,
            None => {
                let id = self.symbols.add(name, section);
                self.symbols.get_mut(id).set_symbol_type(SymbolType::Object);
                id
            }
        };
        let symbol = self.symbols.get_mut(id);
        symbol.set_common(true);
        if symbol.common_size() < common_size {
            symbol.set_common_size(common_size);
            symbol.set_size(common_size);
        }
        if symbol.common_align() < common_align {
            symbol.set_common_align(common_align);
        }
    }

    // ── lookup ─────────────────────────────────────────────

    /// The entry defining a label.
    ///
    /// # Errors
    ///
    /// [`Error::MissingLabel`] if no such label was added.
    pub fn label_entry(&self, name: &str) -> Result<EntryId, Error> {
        self.labels.get(name).copied().ok_or_else(|| Error::MissingLabel {
            label: name.to_string(),
        })
    }

    /// Look up a section by name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections_by_name
            .get(name)
            .map(|id| &self.sections[id.0 as usize])
    }

    /// Get a section by id.
    #[must_use]
    pub fn section_by_id(&self, id: SectionId) -> &Section {
        &self.sections[id.0 as usize]
    }

    /// Iterate sections in name order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections_by_name
            .values()
            .map(|id| &self.sections[id.0 as usize])
    }

    /// Get a subsection by id.
    #[must_use]
    pub fn subsection(&self, id: SubSectionId) -> &SubSection {
        &self.subsections[id.0 as usize]
    }

    /// Iterate subsections in creation order.
    pub fn subsections(&self) -> impl Iterator<Item = &SubSection> {
        self.subsections.iter()
    }

    // ── iteration ──────────────────────────────────────────

    /// Iterate a section's entries: subsections in creation order, each in
    /// chain order.  The splice performed by [`Unit::set_subsection`] makes
    /// this a single chain walk from the first subsection's first entry.
    #[must_use]
    pub fn section_entries(&self, section: &Section) -> EntryIter<'_> {
        let cur = section
            .subsections
            .first()
            .map(|ss| self.subsections[ss.0 as usize].first_entry);
        EntryIter {
            unit: self,
            cur,
            stop_after: None,
        }
    }

    /// Iterate one subsection's entries.
    #[must_use]
    pub fn subsection_entries(&self, ss: &SubSection) -> EntryIter<'_> {
        EntryIter {
            unit: self,
            cur: Some(ss.first_entry),
            stop_after: Some(ss.last_entry),
        }
    }

    /// Iterate a function's entries (closed range).
    #[must_use]
    pub fn function_entries(&self, function: &Function) -> EntryIter<'_> {
        EntryIter {
            unit: self,
            cur: Some(function.first_entry),
            stop_after: Some(function.last_entry),
        }
    }

    /// Iterate an arbitrary closed entry range.
    #[must_use]
    pub fn entry_range(&self, first: EntryId, last: EntryId) -> EntryIter<'_> {
        EntryIter {
            unit: self,
            cur: Some(first),
            stop_after: Some(last),
        }
    }

    // ── functions ──────────────────────────────────────────

    /// Discover per-function entry ranges from function-flagged symbols.
    ///
    /// Each function runs from its defining label up to (but not
    /// including) the next function label, or to the end of the chain.
    ///
    /// # Errors
    ///
    /// [`Error::MissingLabel`] when a function symbol has no label entry.
    pub fn find_functions(&mut self) -> Result<(), Error> {
        let function_names: Vec<String> = self
            .symbols
            .iter()
            .filter(|s| s.is_function())
            .map(|s| s.name().to_string())
            .collect();

        for name in function_names {
            let first = self.label_entry(&name)?;
            let mut tail = self.next_of(first).unwrap_or(first);
            while let Some(next) = self.next_of(tail) {
                if let Some(label) = self.entry(next).label_name() {
                    let is_function = self
                        .symbols
                        .find(label)
                        .map(|sym| self.symbols.get(sym).is_function())
                        .unwrap_or(false);
                    if is_function {
                        break;
                    }
                }
                tail = next;
            }
            let id = FunctionId(self.functions.len() as u32);
            self.functions.push(Function {
                id,
                name,
                first_entry: first,
                last_entry: tail,
            });
        }
        Ok(())
    }

    /// Get a discovered function by id.
    #[must_use]
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    /// Iterate discovered functions in discovery order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    // ── output ─────────────────────────────────────────────

    /// Render the whole unit back to assembly text.
    ///
    /// # Errors
    ///
    /// Unsupported-input errors from entry rendering.
    pub fn write_assembly(&self, out: &mut dyn fmt::Write) -> Result<(), Error> {
        for ss in &self.subsections {
            for entry in self.subsection_entries(ss) {
                entry.write_entry(out, &self.symbols)?;
            }
        }
        Ok(())
    }

    /// Render a structural dump: entries, sections, subsections, functions.
    ///
    /// # Errors
    ///
    /// Unsupported-input errors from entry rendering.
    pub fn write_ir(&self, out: &mut dyn fmt::Write) -> Result<(), Error> {
        for ss in &self.subsections {
            for entry in self.subsection_entries(ss) {
                write!(out, "[{:5}][{}] ", entry.id().0, entry.descriptive_char())?;
                if entry.is_insn() {
                    out.write_str("\t")?;
                }
                entry.write_ir(out, &self.symbols)?;
                out.write_str("\n")?;
            }
        }

        out.write_str("Sections :\n")?;
        for section in self.sections() {
            write!(out, "[{:3}] {} [", section.id.0, section.name)?;
            for ss in &section.subsections {
                write!(out, " {}", ss.0)?;
            }
            out.write_str("]\n")?;
        }

        out.write_str("Subsections :\n")?;
        for ss in &self.subsections {
            writeln!(
                out,
                "[{:3}] [{}-{}]: {}",
                ss.id.0,
                ss.first_entry.0,
                ss.last_entry.0,
                self.sections[ss.section.0 as usize].name
            )?;
        }

        out.write_str("Functions :\n")?;
        for function in &self.functions {
            writeln!(
                out,
                "[{:3}] [{:3}-{:3}]: {}",
                function.id.0, function.first_entry.0, function.last_entry.0, function.name
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insn::Insn;
    use alloc::vec;

    fn label(name: &str) -> EntryKind {
        EntryKind::Label {
            name: name.to_string(),
        }
    }

    fn insn(mnemonic: &str) -> EntryKind {
        EntryKind::Insn(alloc::boxed::Box::new(Insn::new(mnemonic)))
    }

    fn section_directive(name: &str) -> EntryKind {
        EntryKind::Directive(crate::ir::Directive::new(
            DirectiveOp::Section,
            vec![DirOperand::Str(name.to_string())],
        ))
    }

    #[test]
    fn default_section_opens_on_first_entry() {
        let mut unit = Unit::new();
        let id = unit.add_entry(insn("nop"), 1, None, true).unwrap();
        let text = unit.section(".text").expect("default section");
        let entries: Vec<EntryId> = unit.section_entries(text).map(Entry::id).collect();
        assert_eq!(entries, [id]);
    }

    #[test]
    fn start_section_holds_preamble() {
        let mut unit = Unit::new();
        unit.add_entry(insn("nop"), 1, None, false).unwrap();
        let ss = unit.subsections().next().unwrap();
        assert!(ss.is_start_section());
        assert_eq!(
            unit.section_by_id(ss.section()).name(),
            START_SECTION_NAME
        );
    }

    #[test]
    fn chain_links_are_consistent() {
        let mut unit = Unit::new();
        let a = unit.add_entry(insn("nop"), 1, None, true).unwrap();
        let b = unit.add_entry(insn("nop"), 2, None, true).unwrap();
        let c = unit.add_entry(insn("ret"), 3, None, true).unwrap();
        assert_eq!(unit.next_of(a), Some(b));
        assert_eq!(unit.prev_of(b), Some(a));
        assert_eq!(unit.next_of(b), Some(c));
        assert_eq!(unit.next_of(c), None);
        // next(prev(e)) == e
        for id in [b, c] {
            let p = unit.prev_of(id).unwrap();
            assert_eq!(unit.next_of(p), Some(id));
        }
    }

    #[test]
    fn duplicate_label_is_fatal() {
        let mut unit = Unit::new();
        unit.add_entry(label("x"), 1, None, true).unwrap();
        let err = unit.add_entry(label("x"), 7, None, true).unwrap_err();
        assert_eq!(
            err,
            Error::DuplicateLabel {
                label: "x".to_string(),
                line: 7
            }
        );
    }

    #[test]
    fn label_declares_symbol_in_section() {
        let mut unit = Unit::new();
        unit.add_entry(label("main"), 1, None, true).unwrap();
        let sym = unit.symbol_table().find("main").unwrap();
        let section = unit.symbol_table().get(sym).section().unwrap();
        assert_eq!(unit.section_by_id(section).name(), ".text");
    }

    #[test]
    fn interleaved_subsections_splice_per_section() {
        let mut unit = Unit::new();
        let t1 = unit.add_entry(insn("nop"), 1, None, true).unwrap();
        let d1 = unit.add_entry(section_directive(".data"), 2, None, true).unwrap();
        let d2 = unit.add_entry(insn("nop"), 3, None, true).unwrap();
        let t2 = unit.add_entry(section_directive(".text"), 4, None, true).unwrap();
        let t3 = unit.add_entry(insn("ret"), 5, None, true).unwrap();

        let text = unit.section(".text").unwrap();
        let text_ids: Vec<EntryId> = unit.section_entries(text).map(Entry::id).collect();
        assert_eq!(text_ids, [t1, t2, t3]);

        let data = unit.section(".data").unwrap();
        let data_ids: Vec<EntryId> = unit.section_entries(data).map(Entry::id).collect();
        assert_eq!(data_ids, [d1, d2]);

        // Adjacent subsections of one section are chained together.
        let text_sections: Vec<&SubSection> = text
            .subsection_ids()
            .iter()
            .map(|&ss| unit.subsection(ss))
            .collect();
        assert_eq!(text_sections.len(), 2);
        assert_eq!(
            unit.next_of(text_sections[0].last_entry()),
            Some(text_sections[1].first_entry())
        );
    }

    #[test]
    fn comm_symbols_merge_upward() {
        let mut unit = Unit::new();
        unit.add_comm_symbol("buf", 16, 4);
        unit.add_comm_symbol("buf", 8, 8);
        let sym = unit.symbol_table().find("buf").unwrap();
        let symbol = unit.symbol_table().get(sym);
        assert!(symbol.is_common());
        assert_eq!(symbol.common_size(), 16);
        assert_eq!(symbol.common_align(), 8);
        assert_eq!(symbol.symbol_type(), SymbolType::Object);
    }

    #[test]
    fn find_functions_delimits_ranges() {
        let mut unit = Unit::new();
        let f1 = unit.add_entry(label("f1"), 1, None, true).unwrap();
        let a = unit.add_entry(insn("nop"), 2, None, true).unwrap();
        let b = unit.add_entry(insn("ret"), 3, None, true).unwrap();
        let f2 = unit.add_entry(label("f2"), 4, None, true).unwrap();
        let c = unit.add_entry(insn("ret"), 5, None, true).unwrap();

        for name in ["f1", "f2"] {
            let sym = unit.symbol_table().find(name).unwrap();
            unit.symbol_table_mut()
                .get_mut(sym)
                .set_symbol_type(SymbolType::Function);
        }
        unit.find_functions().unwrap();

        let functions: Vec<&Function> = unit.functions().collect();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name(), "f1");
        assert_eq!(
            (functions[0].first_entry(), functions[0].last_entry()),
            (f1, b)
        );
        assert_eq!(
            (functions[1].first_entry(), functions[1].last_entry()),
            (f2, c)
        );
        let body: Vec<EntryId> = unit.function_entries(functions[0]).map(Entry::id).collect();
        assert_eq!(body, [f1, a, b]);
    }

    #[test]
    fn missing_function_label_is_error() {
        let mut unit = Unit::new();
        unit.add_entry(insn("ret"), 1, None, true).unwrap();
        let sym = unit.find_or_create_symbol("ghost");
        unit.symbol_table_mut()
            .get_mut(sym)
            .set_symbol_type(SymbolType::Function);
        assert!(matches!(
            unit.find_functions(),
            Err(Error::MissingLabel { .. })
        ));
    }

    #[test]
    fn next_instruction_skips_non_insns() {
        let mut unit = Unit::new();
        let a = unit.add_entry(insn("nop"), 1, None, true).unwrap();
        unit.add_entry(label("mid"), 2, None, true).unwrap();
        let b = unit.add_entry(insn("ret"), 3, None, true).unwrap();
        assert_eq!(unit.next_instruction(a), Some(b));
        assert_eq!(unit.next_instruction(b), None);
    }

    #[test]
    fn write_ir_lists_structure() {
        let mut unit = Unit::new();
        unit.add_entry(label("main"), 1, None, true).unwrap();
        unit.add_entry(insn("ret"), 2, None, true).unwrap();
        let mut out = String::new();
        unit.write_ir(&mut out).unwrap();
        assert!(out.contains("main"));
        assert!(out.contains("Sections :"));
        assert!(out.contains(".text"));
        assert!(out.contains("Subsections :"));
    }
}
