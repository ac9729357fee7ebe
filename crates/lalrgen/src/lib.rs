//! An LALR(1) parser generator core.
//!
//! The crate consumes a grammar — rules, symbol declarations, and
//! directives, fed through [`GrammarBuilder`] by whatever front end parses
//! the grammar text — and produces a deterministic pushdown automaton
//! encoded as compact action/lookahead/offset tables ([`ParserTables`]).
//!
//! The pipeline is strictly phased: rule-precedence inference, the
//! nullability and FIRST fixpoints, LR(0) state enumeration, LALR(1)
//! lookahead propagation, action synthesis with precedence-driven
//! conflict resolution, default-reduction compression with shift-reduce
//! fusion, state resorting, and finally row packing.

mod actions;
mod compress;
mod first;
mod lalr;
mod lr0;
mod packing;
mod types;
mod util;

pub mod errors;
pub mod grammar;
pub mod intern;
pub mod symbol;
pub mod tables;

pub use crate::errors::{Diagnostic, Diagnostics, GrammarError};
pub use crate::grammar::{Directives, Grammar, GrammarBuilder, Rule, RuleDecl, RuleId};
pub use crate::symbol::{Assoc, CodeFragment, SymbolId, SymbolKind, TermSet};
pub use crate::tables::{ActionCodes, ParserTables, StateEntry};

/// Knobs for the table-construction pipeline.
#[derive(Debug, Clone)]
pub struct Options {
    /// Run default-reduction compression and shift-reduce fusion.
    pub compress_actions: bool,
    /// Renumber states so the densest come first; the trailing
    /// auto-reduce run is then dropped from the emitted offset tables.
    pub resort_states: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            compress_actions: true,
            resort_states: true,
        }
    }
}

/// The result of a generator run.
#[derive(Debug)]
pub struct Output {
    pub tables: ParserTables,
    /// Diagnostics accumulated during analysis. Grammar problems found
    /// here (unreachable rules, missing rules for a nonterminal) do not
    /// stop table construction, but a caller should treat a nonzero
    /// error count as a failed run.
    pub diagnostics: Diagnostics,
    /// Number of unresolved parsing conflicts.
    pub conflicts: usize,
}

/// Run the whole analysis and table-construction pipeline.
pub fn compile(grammar: &mut Grammar, options: &Options) -> Output {
    let mut diagnostics = Diagnostics::new(grammar.filename().to_owned());

    grammar::infer_rule_precedences(grammar);
    first::find_first_sets(grammar);

    let mut automaton = lr0::find_states(grammar, &mut diagnostics);
    lalr::find_links(&mut automaton);
    lalr::find_follow_sets(&mut automaton);

    let conflicts = actions::find_actions(grammar, &mut automaton, &mut diagnostics);
    if conflicts > 0 {
        tracing::warn!(conflicts, "parsing conflicts");
    }

    if options.compress_actions {
        compress::compress_tables(grammar, &mut automaton);
    }
    compress::resort_states(grammar, &mut automaton, options.resort_states);

    let tables = tables::build_tables(grammar, &mut automaton);

    Output {
        tables,
        diagnostics,
        conflicts,
    }
}
