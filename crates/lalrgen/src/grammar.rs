//! Grammar model and the definition builder.
//!
//! The builder is the input interface of the generator: the grammar-file
//! parser (an external collaborator) resolves its rules and directives into
//! symbol handles and feeds them through [`GrammarBuilder`]. `build()`
//! finalizes symbol and rule numbering and validates the structure.

use crate::errors::{Diagnostics, GrammarError};
use crate::symbol::{Assoc, CodeFragment, SymbolId, SymbolKind, SymbolTable, NO_PREC};
use crate::types::Map;
use crate::util::display_fn;
use std::fmt;

/// Upper bound on the number of RHS symbols of a single rule.
pub const MAX_RHS: usize = 1000;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule#{:03}", self.0)
    }
}

/// A production rule.
#[derive(Debug)]
pub struct Rule {
    pub lhs: SymbolId,
    pub rhs: Vec<SymbolId>,
    /// Alias name for each RHS position, when the grammar gave one.
    pub rhs_alias: Vec<Option<String>>,
    /// Explicit precedence symbol from a `[NAME]` annotation, or the one
    /// inferred from the RHS.
    pub precsym: Option<SymbolId>,
    pub code: Option<CodeFragment>,
    pub line: u32,
    /// Declaration order; item and state comparisons key on this.
    pub decl_index: u32,
    /// Rule number as used in the generated tables. Rules that carry an
    /// action come first so the reduce dispatch stays dense.
    pub table_index: u32,
    pub lhs_is_start: bool,
    /// Reached by some Reduce action before compression.
    pub can_reduce: bool,
    /// The user forced this rule to never reduce.
    pub never_reduce: bool,
    /// Still reached by a Reduce or ShiftReduce after compression.
    pub does_reduce: bool,
}

impl Rule {
    pub fn nrhs(&self) -> usize {
        self.rhs.len()
    }

    pub fn no_code(&self) -> bool {
        self.code.as_ref().map_or(true, |c| c.text.trim().is_empty())
    }
}

/// A rule as declared by the grammar parser.
#[derive(Debug)]
pub struct RuleDecl {
    pub lhs: SymbolId,
    pub rhs: Vec<SymbolId>,
    /// Either empty or one entry per RHS symbol.
    pub aliases: Vec<Option<String>>,
    pub precsym: Option<SymbolId>,
    pub code: Option<CodeFragment>,
    pub never_reduce: bool,
    pub line: u32,
}

impl RuleDecl {
    pub fn new(lhs: SymbolId, rhs: Vec<SymbolId>) -> Self {
        Self {
            lhs,
            rhs,
            aliases: Vec::new(),
            precsym: None,
            code: None,
            never_reduce: false,
            line: 0,
        }
    }
}

/// Global directives that ride along with the grammar.
#[derive(Debug, Default)]
pub struct Directives {
    pub name: Option<String>,
    pub token_prefix: Option<String>,
    pub token_type: Option<String>,
    pub default_type: Option<String>,
    pub extra_argument: Option<String>,
    pub extra_context: Option<String>,
    pub stack_size: Option<String>,
    pub header: Vec<CodeFragment>,
    pub trailer: Vec<CodeFragment>,
    pub default_destructor: Option<CodeFragment>,
    pub token_destructor: Option<CodeFragment>,
}

/// A finalized grammar, ready for analysis.
#[derive(Debug)]
pub struct Grammar {
    pub(crate) symbols: SymbolTable,
    pub(crate) rules: Vec<Rule>,
    by_table_index: Vec<RuleId>,
    filename: String,
    start: SymbolId,
    start_rule: RuleId,
    wildcard: Option<SymbolId>,
    error_symbol: Option<SymbolId>,
    has_fallback: bool,
    nrule_with_action: u32,
    directives: Directives,
}

impl Grammar {
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0 as usize]
    }

    pub(crate) fn rule_mut(&mut self, id: RuleId) -> &mut Rule {
        &mut self.rules[id.0 as usize]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId(i as u32), r))
    }

    pub fn nrule(&self) -> u32 {
        self.rules.len() as u32
    }

    pub fn nrule_with_action(&self) -> u32 {
        self.nrule_with_action
    }

    pub fn nsymbol(&self) -> u32 {
        self.symbols.nsymbol()
    }

    pub fn nterminal(&self) -> u32 {
        self.symbols.nterminal()
    }

    /// The designated start symbol.
    pub fn start(&self) -> SymbolId {
        self.start
    }

    /// The augmented start rule: the first rule declared.
    pub fn start_rule(&self) -> RuleId {
        self.start_rule
    }

    pub fn wildcard(&self) -> Option<SymbolId> {
        self.wildcard
    }

    pub fn error_symbol(&self) -> Option<SymbolId> {
        self.error_symbol
    }

    pub fn has_fallback(&self) -> bool {
        self.has_fallback
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn rule_by_table_index(&self, index: u32) -> RuleId {
        self.by_table_index[index as usize]
    }

    pub fn display_rule<'g>(&'g self, id: RuleId) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let rule = self.rule(id);
            write!(f, "{} ::=", self.symbols.name(rule.lhs))?;
            for &sp in &rule.rhs {
                let symbol = self.symbols.symbol(sp);
                if symbol.is_multiterminal() {
                    for (k, &sub) in symbol.subsymbols.iter().enumerate() {
                        let sep = if k == 0 { " " } else { "|" };
                        write!(f, "{}{}", sep, self.symbols.name(sub))?;
                    }
                } else {
                    write!(f, " {}", self.symbols.name(sp))?;
                }
            }
            Ok(())
        })
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals:")?;
        for index in 0..self.nterminal() {
            write!(f, " {}", self.symbols.name(self.symbols.by_index(index)))?;
        }
        write!(f, "\n#### nonterminals:")?;
        for index in self.nterminal()..self.nsymbol() {
            write!(f, " {}", self.symbols.name(self.symbols.by_index(index)))?;
        }
        writeln!(f, "\n#### rules:")?;
        for id in (0..self.rules.len() as u32).map(RuleId) {
            writeln!(f, "- [{:02}] {}", self.rule(id).table_index, self.display_rule(id))?;
        }
        Ok(())
    }
}

/// Assign a precedence symbol to every rule that lacks an explicit one.
///
/// The rule adopts the first RHS symbol with a defined precedence; for a
/// multiterminal, its first member with a defined precedence. Rules with
/// no such RHS symbol keep `precsym = None`.
pub(crate) fn infer_rule_precedences(g: &mut Grammar) {
    for i in 0..g.rules.len() {
        if g.rules[i].precsym.is_some() {
            continue;
        }
        let mut found = None;
        'rhs: for &sp in &g.rules[i].rhs {
            let symbol = g.symbols.symbol(sp);
            if symbol.is_multiterminal() {
                for &sub in &symbol.subsymbols {
                    if g.symbols.symbol(sub).prec >= 0 {
                        found = Some(sub);
                        break 'rhs;
                    }
                }
            } else if symbol.prec >= 0 {
                found = Some(sp);
                break 'rhs;
            }
        }
        g.rules[i].precsym = found;
    }
}

/// Incrementally assembles a [`Grammar`].
#[derive(Debug)]
pub struct GrammarBuilder {
    symbols: SymbolTable,
    rules: Vec<Rule>,
    diagnostics: Diagnostics,
    prec_counter: i32,
    declared_start: Option<SymbolId>,
    wildcard: Option<SymbolId>,
    has_fallback: bool,
    nrule_with_action: u32,
    directives: Directives,
}

impl GrammarBuilder {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            symbols: SymbolTable::new(),
            rules: Vec::new(),
            diagnostics: Diagnostics::new(filename),
            prec_counter: 0,
            declared_start: None,
            wildcard: None,
            has_fallback: false,
            nrule_with_action: 0,
            directives: Directives::default(),
        }
    }

    /// Look up or create a symbol; classification happens on first sight.
    pub fn symbol(&mut self, name: &str) -> SymbolId {
        self.symbols.get_or_create(name)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Add a production rule with no aliases, precedence, or action.
    pub fn rule<I>(&mut self, lhs: SymbolId, rhs: I) -> RuleId
    where
        I: IntoIterator<Item = SymbolId>,
    {
        self.add_rule(RuleDecl::new(lhs, rhs.into_iter().collect()))
    }

    pub fn add_rule(&mut self, decl: RuleDecl) -> RuleId {
        let RuleDecl {
            lhs,
            rhs,
            mut aliases,
            precsym,
            code,
            never_reduce,
            line,
        } = decl;

        if !self.symbols.symbol(lhs).is_nonterminal() {
            self.diagnostics.error(
                line,
                format!(
                    "The left-hand side of a rule must be a nonterminal, not \"{}\".",
                    self.symbols.name(lhs)
                ),
            );
        }
        if rhs.len() > MAX_RHS {
            self.diagnostics
                .error(line, "Too many symbols on RHS of rule.");
        }
        if !aliases.is_empty() && aliases.len() != rhs.len() {
            self.diagnostics
                .error(line, "Alias list does not match the RHS of the rule.");
            aliases.clear();
        }
        if aliases.is_empty() {
            aliases = vec![None; rhs.len()];
        }
        if let Some(prec) = precsym {
            if !self.symbols.symbol(prec).is_terminal() {
                self.diagnostics.error(
                    line,
                    format!(
                        "The precedence symbol \"{}\" must be a terminal.",
                        self.symbols.name(prec)
                    ),
                );
            }
        }

        // Symbols whose values the action text mentions by alias have
        // their content routed into the generated reduce dispatch.
        if let Some(code) = &code {
            for (alias, &sp) in aliases.iter().zip(&rhs) {
                if let Some(alias) = alias {
                    if code.text.contains(alias.as_str()) {
                        self.symbols.symbol_mut(sp).carries_content = true;
                    }
                }
            }
        }

        let id = RuleId(self.rules.len() as u32);
        if code.as_ref().is_some_and(|c| !c.text.trim().is_empty()) {
            self.nrule_with_action += 1;
        }
        self.symbols.symbol_mut(lhs).rules.push(id);
        self.rules.push(Rule {
            lhs,
            rhs,
            rhs_alias: aliases,
            precsym,
            code,
            line,
            decl_index: id.0,
            table_index: u32::MAX,
            lhs_is_start: false,
            can_reduce: false,
            never_reduce,
            does_reduce: false,
        });
        id
    }

    /// Declare one `%left`/`%right`/`%nonassoc` group. Each call opens a
    /// new, higher precedence level.
    pub fn precedence(&mut self, assoc: Assoc, symbols: &[SymbolId]) {
        self.prec_counter += 1;
        for &sp in symbols {
            let name = self.symbols.name(sp).to_owned();
            let symbol = self.symbols.symbol_mut(sp);
            if !matches!(symbol.kind, SymbolKind::Terminal) {
                self.diagnostics
                    .error(0, format!("Can't assign a precedence to \"{}\".", name));
                continue;
            }
            if symbol.prec != NO_PREC {
                self.diagnostics.error(
                    0,
                    format!("Symbol \"{}\" has already been given a precedence.", name),
                );
                continue;
            }
            symbol.prec = self.prec_counter;
            symbol.assoc = assoc;
        }
    }

    /// Declare the start symbol.
    pub fn start(&mut self, symbol: SymbolId) {
        self.declared_start = Some(symbol);
    }

    /// Declare the wildcard token.
    pub fn wildcard(&mut self, symbol: SymbolId) {
        if !self.symbols.symbol(symbol).is_terminal() {
            self.diagnostics.error(
                0,
                format!(
                    "%wildcard argument \"{}\" should be a token",
                    self.symbols.name(symbol)
                ),
            );
            return;
        }
        if self.wildcard.is_some() {
            self.diagnostics.error(
                0,
                format!("Extra wildcard to token: {}", self.symbols.name(symbol)),
            );
            return;
        }
        self.wildcard = Some(symbol);
    }

    /// Declare fallback tokens: every token in `tokens` falls back to
    /// `fallback_to` when it would not otherwise parse.
    pub fn fallback(&mut self, fallback_to: SymbolId, tokens: &[SymbolId]) {
        for &sp in tokens {
            if !self.symbols.symbol(sp).is_terminal() {
                self.diagnostics.error(
                    0,
                    format!(
                        "%fallback argument \"{}\" should be a token",
                        self.symbols.name(sp)
                    ),
                );
                continue;
            }
            if self.symbols.symbol(sp).fallback.is_some() {
                self.diagnostics.error(
                    0,
                    format!(
                        "More than one fallback assigned to token {}",
                        self.symbols.name(sp)
                    ),
                );
                continue;
            }
            self.symbols.symbol_mut(sp).fallback = Some(fallback_to);
            self.has_fallback = true;
        }
    }

    /// Declare a `%token_class`: a named set of terminals that the grammar
    /// treats interchangeably.
    pub fn token_class(&mut self, name: &str, members: &[SymbolId]) -> SymbolId {
        let id = self.symbols.get_or_create(name);
        let symbol = self.symbols.symbol(id);
        if symbol.is_terminal() || !symbol.rules.is_empty() || !symbol.subsymbols.is_empty() {
            self.diagnostics
                .error(0, format!("Symbol \"{}\" already used", name));
            return id;
        }
        self.symbols.make_multiterminal(id);
        for &member in members {
            if !self.symbols.symbol(member).is_terminal() {
                self.diagnostics.error(
                    0,
                    format!(
                        "Cannot form a token class containing a non-terminal \"{}\".",
                        self.symbols.name(member)
                    ),
                );
                continue;
            }
            self.symbols.symbol_mut(id).subsymbols.push(member);
        }
        id
    }

    /// Declare the `%type` of a nonterminal.
    pub fn datatype(&mut self, symbol: SymbolId, ty: &str) {
        let name = self.symbols.name(symbol).to_owned();
        let entry = self.symbols.symbol_mut(symbol);
        if matches!(entry.kind, SymbolKind::Terminal) {
            self.diagnostics.error(
                0,
                format!("Symbol \"{}\" is a token; use %token_type instead.", name),
            );
            return;
        }
        if entry.datatype.is_some() {
            self.diagnostics.error(
                0,
                format!("Duplicate %type declaration for symbol \"{}\".", name),
            );
            return;
        }
        entry.datatype = Some(ty.to_owned());
    }

    pub fn destructor(&mut self, symbol: SymbolId, code: CodeFragment) {
        self.symbols.symbol_mut(symbol).destructor = Some(code);
    }

    pub fn token_type(&mut self, ty: &str) {
        self.directives.token_type = Some(ty.to_owned());
    }

    pub fn default_type(&mut self, ty: &str) {
        self.directives.default_type = Some(ty.to_owned());
    }

    pub fn extra_argument(&mut self, decl: &str) {
        self.directives.extra_argument = Some(decl.to_owned());
    }

    pub fn extra_context(&mut self, decl: &str) {
        self.directives.extra_context = Some(decl.to_owned());
    }

    pub fn stack_size(&mut self, expr: &str) {
        self.directives.stack_size = Some(expr.to_owned());
    }

    pub fn token_prefix(&mut self, prefix: &str) {
        self.directives.token_prefix = Some(prefix.to_owned());
    }

    pub fn name(&mut self, name: &str) {
        self.directives.name = Some(name.to_owned());
    }

    pub fn header(&mut self, code: CodeFragment) {
        self.directives.header.push(code);
    }

    pub fn trailer(&mut self, code: CodeFragment) {
        self.directives.trailer.push(code);
    }

    pub fn default_destructor(&mut self, code: CodeFragment) {
        self.directives.default_destructor = Some(code);
    }

    pub fn token_destructor(&mut self, code: CodeFragment) {
        self.directives.token_destructor = Some(code);
    }

    /// Finalize the grammar: resolve the start symbol, number the rules,
    /// sort and index the symbols, and validate the structure.
    pub fn build(mut self) -> Result<Grammar, GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::Empty);
        }

        // The start symbol defaults to the LHS of the first rule.
        let start_rule = RuleId(0);
        let fallback_start = self.rules[0].lhs;
        let start = match self.declared_start {
            Some(declared) if self.symbols.symbol(declared).is_nonterminal() => declared,
            Some(declared) => {
                self.diagnostics.error(
                    0,
                    format!(
                        "The specified start symbol \"{}\" is not a nonterminal of the \
                         grammar. \"{}\" will be used as the start symbol instead.",
                        self.symbols.name(declared),
                        self.symbols.name(fallback_start)
                    ),
                );
                fallback_start
            }
            None => fallback_start,
        };

        // Rules with an action first, the rest afterwards.
        let mut next = 0;
        for rule in &mut self.rules {
            if !rule.no_code() {
                rule.table_index = next;
                next += 1;
            }
        }
        for rule in &mut self.rules {
            if rule.table_index == u32::MAX {
                rule.table_index = next;
                next += 1;
            }
        }
        let mut by_table_index: Vec<RuleId> = (0..self.rules.len() as u32).map(RuleId).collect();
        by_table_index.sort_by_key(|&id| self.rules[id.0 as usize].table_index);

        self.symbols.assign_indices();
        self.assign_dtnums();

        let error_symbol = self.symbols.find("error");

        if self.diagnostics.error_count() > 0 {
            return Err(GrammarError::Invalid(self.diagnostics));
        }

        Ok(Grammar {
            symbols: self.symbols,
            rules: self.rules,
            by_table_index,
            filename: self.diagnostics.filename().to_owned(),
            start,
            start_rule,
            wildcard: self.wildcard,
            error_symbol,
            has_fallback: self.has_fallback,
            nrule_with_action: self.nrule_with_action,
            directives: self.directives,
        })
    }

    /// Number the distinct `%type` declarations; terminals all share
    /// number zero, as they carry the token type.
    fn assign_dtnums(&mut self) {
        let mut numbers: Map<String, u32> = Map::default();
        let default_dtnum = self
            .directives
            .default_type
            .as_ref()
            .map(|ty| {
                let next = numbers.len() as u32 + 1;
                *numbers.entry(ty.clone()).or_insert(next)
            })
            .unwrap_or(0);
        for id in self.symbols.ids().collect::<Vec<_>>() {
            let symbol = self.symbols.symbol(id);
            if symbol.is_terminal() {
                continue;
            }
            let dtnum = match &symbol.datatype {
                Some(ty) => {
                    let next = numbers.len() as u32 + 1;
                    *numbers.entry(ty.clone()).or_insert(next)
                }
                None => default_dtnum,
            };
            self.symbols.symbol_mut(id).dtnum = dtnum;
        }
    }
}
