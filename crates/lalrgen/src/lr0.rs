//! LR(0) state enumeration.
//!
//! States are hash-consed by their sorted basis: `get_state` either finds
//! the existing state with an equal basis (merging the freshly seeded
//! back-propagation links into it) or computes the closure, allocates a
//! new state, and queues it for successor construction.
//!
//! Configurations live in one arena for the lifetime of the run;
//! propagation links are index vectors into that arena.

use crate::actions::{Action, ActionKind};
use crate::errors::Diagnostics;
use crate::grammar::{Grammar, RuleId};
use crate::symbol::{same_symbol, SymbolKind, TermSet};
use crate::types::Map;
use crate::util::display_fn;
use std::collections::VecDeque;
use std::fmt;

/// Sentinel for an unassigned or empty action-table row offset.
pub(crate) const NO_OFFSET: i32 = i32::MIN + 1;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ConfigId(u32);

impl ConfigId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C#{:03}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum CfgStatus {
    Incomplete,
    Complete,
}

/// An LR(0) item `(rule, dot)` with its LALR(1) follow set and the
/// propagation links that feed it.
#[derive(Debug)]
pub(crate) struct Config {
    pub rule: RuleId,
    pub dot: u32,
    /// Follow set over terminal indices.
    pub fws: TermSet,
    /// Forward propagation: configs whose follow sets this one feeds.
    pub fplp: Vec<ConfigId>,
    /// Backward propagation, collected during successor construction and
    /// inverted into forward links before the follow fixpoint.
    pub bplp: Vec<ConfigId>,
    pub status: CfgStatus,
}

#[derive(Debug)]
pub(crate) struct State {
    /// Items whose dot is past position zero, plus the start items. Sorted
    /// by `(rule declaration index, dot)`; uniquely identifies the state.
    pub basis: Vec<ConfigId>,
    /// The closure of the basis, sorted the same way.
    pub closure: Vec<ConfigId>,
    pub actions: Vec<Action>,
    pub statenum: u32,
    pub n_tkn_act: i32,
    pub n_nt_act: i32,
    pub i_tkn_ofst: i32,
    pub i_nt_ofst: i32,
    /// Table index of the default-reduce rule, or `-1` for syntax error.
    pub i_dflt_reduce: i32,
    /// The state performs its default reduction on every lookahead.
    pub auto_reduce: bool,
    pub default_reduce_rule: Option<RuleId>,
}

impl State {
    fn new(statenum: u32, basis: Vec<ConfigId>, closure: Vec<ConfigId>) -> Self {
        Self {
            basis,
            closure,
            actions: Vec::new(),
            statenum,
            n_tkn_act: 0,
            n_nt_act: 0,
            i_tkn_ofst: NO_OFFSET,
            i_nt_ofst: NO_OFFSET,
            i_dflt_reduce: -1,
            auto_reduce: false,
            default_reduce_rule: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Automaton {
    pub configs: Vec<Config>,
    pub states: Vec<State>,
    /// States in presentation order; resorting reorders this and rewrites
    /// the state numbers, keeping state 0 first.
    pub sorted: Vec<StateId>,
    /// Number of states once the trailing auto-reduce run is dropped.
    pub nxstate: u32,
}

impl Automaton {
    pub(crate) fn nstate(&self) -> u32 {
        self.states.len() as u32
    }

    pub(crate) fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    /// Render an item as `lhs -> [ alpha . beta ]` for traces and tests.
    pub(crate) fn display_config<'a>(
        &'a self,
        g: &'a Grammar,
        cid: ConfigId,
    ) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            let config = &self.configs[cid.index()];
            let rule = g.rule(config.rule);
            write!(f, "{} -> [", g.symbols().name(rule.lhs))?;
            for (i, &sp) in rule.rhs.iter().enumerate() {
                if i == config.dot as usize {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbols().name(sp))?;
            }
            if config.dot as usize == rule.nrhs() {
                f.write_str(" .")?;
            }
            f.write_str(" ]")
        })
    }
}

/// Enumerate all LR(0) states reachable from the start symbol, recording
/// follow-set propagation links along the way.
pub(crate) fn find_states(g: &mut Grammar, diags: &mut Diagnostics) -> Automaton {
    let start = g.start();

    // The start symbol must not appear on the right-hand side of any
    // rule; the parser would not work properly if it did.
    for (_, rule) in g.rules() {
        for &sp in &rule.rhs {
            if sp == start {
                diags.error(
                    rule.line,
                    format!(
                        "The start symbol \"{}\" occurs on the right-hand side of a rule. \
                         This will result in a parser which does not work properly.",
                        g.symbols().name(start)
                    ),
                );
            }
        }
    }

    let start_rules = g.symbols().symbol(start).rules.clone();
    for &rule in &start_rules {
        g.rule_mut(rule).lhs_is_start = true;
    }

    let mut builder = StateBuilder {
        grammar: g,
        configs: Vec::new(),
        states: Vec::new(),
        basis_index: Map::default(),
        current: Vec::new(),
        basis: Vec::new(),
        lookup: Map::default(),
        mark: 0,
        pending: VecDeque::new(),
    };

    // The basis of the first state is every rule with the start symbol on
    // the left, dot at zero, with end-of-input in its follow set.
    builder.reset();
    for &rule in &start_rules {
        let cid = builder.add_basis(rule, 0);
        builder.configs[cid.index()].fws.insert(0);
    }
    builder.get_state(diags);

    // All other states follow from the successors of the first.
    while let Some(sid) = builder.pending.pop_front() {
        builder.build_shifts(sid, diags);
    }

    let nstate = builder.states.len() as u32;
    tracing::debug!(nstate, nconfig = builder.configs.len(), "state enumeration done");
    Automaton {
        configs: builder.configs,
        states: builder.states,
        sorted: (0..nstate).map(StateId).collect(),
        nxstate: nstate,
    }
}

struct StateBuilder<'g> {
    grammar: &'g Grammar,
    configs: Vec<Config>,
    states: Vec<State>,
    basis_index: Map<Box<[(u32, u32)]>, StateId>,
    /// Configuration list of the state under construction.
    current: Vec<ConfigId>,
    basis: Vec<ConfigId>,
    /// Item lookup scoped to the state under construction: two distinct
    /// states may legitimately hold items with equal `(rule, dot)` but
    /// different follow sets.
    lookup: Map<(RuleId, u32), ConfigId>,
    /// Arena length at the last reset; everything past it is transient
    /// until the state under construction is interned.
    mark: usize,
    pending: VecDeque<StateId>,
}

impl<'g> StateBuilder<'g> {
    fn reset(&mut self) {
        debug_assert!(self.current.is_empty() && self.basis.is_empty());
        self.lookup.clear();
        self.mark = self.configs.len();
    }

    fn new_config(&mut self, rule: RuleId, dot: u32) -> ConfigId {
        let cid = ConfigId(self.configs.len() as u32);
        self.configs.push(Config {
            rule,
            dot,
            fws: TermSet::new(),
            fplp: Vec::new(),
            bplp: Vec::new(),
            status: CfgStatus::Incomplete,
        });
        cid
    }

    fn add_config(&mut self, rule: RuleId, dot: u32) -> ConfigId {
        if let Some(&cid) = self.lookup.get(&(rule, dot)) {
            return cid;
        }
        let cid = self.new_config(rule, dot);
        self.lookup.insert((rule, dot), cid);
        self.current.push(cid);
        cid
    }

    fn add_basis(&mut self, rule: RuleId, dot: u32) -> ConfigId {
        if let Some(&cid) = self.lookup.get(&(rule, dot)) {
            return cid;
        }
        let cid = self.new_config(rule, dot);
        self.lookup.insert((rule, dot), cid);
        self.current.push(cid);
        self.basis.push(cid);
        cid
    }

    fn sort_key(&self, cid: ConfigId) -> (u32, u32) {
        let config = &self.configs[cid.index()];
        (self.grammar.rule(config.rule).decl_index, config.dot)
    }

    /// Intern the state described by the basis built up by prior
    /// `add_basis` calls.
    fn get_state(&mut self, diags: &mut Diagnostics) -> StateId {
        let mut basis = std::mem::take(&mut self.basis);
        basis.sort_by_key(|&cid| self.sort_key(cid));
        let key: Box<[(u32, u32)]> = basis.iter().map(|&cid| self.sort_key(cid)).collect();

        if let Some(&existing) = self.basis_index.get(&key) {
            // A state with the same basis already exists. Hand the
            // freshly seeded back-links over to its matching items and
            // discard the transient configurations.
            let existing_basis = self.states[existing.index()].basis.clone();
            debug_assert_eq!(existing_basis.len(), basis.len());
            for (&transient, &kept) in basis.iter().zip(&existing_basis) {
                let links = std::mem::take(&mut self.configs[transient.index()].bplp);
                self.configs[kept.index()].bplp.extend(links);
            }
            self.current.clear();
            self.configs.truncate(self.mark);
            return existing;
        }

        self.closure(diags);
        let mut closure = std::mem::take(&mut self.current);
        closure.sort_by_key(|&cid| self.sort_key(cid));

        let sid = StateId(self.states.len() as u32);
        self.states.push(State::new(sid.0, basis, closure));
        self.basis_index.insert(key, sid);
        self.pending.push_back(sid);
        sid
    }

    /// Extend the current configuration list to its closure, seeding the
    /// new items' follow sets and forward propagation links.
    fn closure(&mut self, diags: &mut Diagnostics) {
        let grammar = self.grammar;
        let mut i = 0;
        while i < self.current.len() {
            let cfp = self.current[i];
            i += 1;
            let rule = grammar.rule(self.configs[cfp.index()].rule);
            let dot = self.configs[cfp.index()].dot as usize;
            if dot >= rule.nrhs() {
                continue;
            }
            let sp = rule.rhs[dot];
            let symbol = grammar.symbols().symbol(sp);
            if !symbol.is_nonterminal() {
                continue;
            }
            if symbol.rules.is_empty() && Some(sp) != grammar.error_symbol() {
                diags.error(
                    rule.line,
                    format!("Nonterminal \"{}\" has no rules.", grammar.symbols().name(sp)),
                );
            }
            for &new_rule_id in &symbol.rules {
                let newcfp = self.add_config(new_rule_id, 0);
                // Seed the new item's follow set from what can follow the
                // nonterminal in this rule.
                let mut beta_nullable = true;
                for &xsp in &rule.rhs[dot + 1..] {
                    let xsymbol = grammar.symbols().symbol(xsp);
                    match xsymbol.kind {
                        SymbolKind::Terminal => {
                            self.configs[newcfp.index()].fws.insert(xsymbol.index);
                            beta_nullable = false;
                        }
                        SymbolKind::Multiterminal => {
                            for &sub in &xsymbol.subsymbols {
                                self.configs[newcfp.index()]
                                    .fws
                                    .insert(grammar.symbols().symbol(sub).index);
                            }
                            beta_nullable = false;
                        }
                        SymbolKind::Nonterminal => {
                            self.configs[newcfp.index()]
                                .fws
                                .union_with_changed(&xsymbol.first);
                            if !xsymbol.nullable {
                                beta_nullable = false;
                            }
                        }
                    }
                    if !beta_nullable {
                        break;
                    }
                }
                // Lookaheads that later reach this item propagate onward.
                if beta_nullable {
                    self.configs[cfp.index()].fplp.push(newcfp);
                }
            }
        }
    }

    /// Construct every successor reachable from `sid` by a shift, and
    /// attach the corresponding shift actions.
    fn build_shifts(&mut self, sid: StateId, diags: &mut Diagnostics) {
        let grammar = self.grammar;
        let closure = self.states[sid.index()].closure.clone();

        // Each configuration becomes complete once it has contributed to
        // a successor state.
        for &cid in &closure {
            self.configs[cid.index()].status = CfgStatus::Incomplete;
        }

        for (i, &cfp) in closure.iter().enumerate() {
            if self.configs[cfp.index()].status == CfgStatus::Complete {
                continue;
            }
            let rule = grammar.rule(self.configs[cfp.index()].rule);
            let dot = self.configs[cfp.index()].dot as usize;
            if dot >= rule.nrhs() {
                continue;
            }
            let sp = rule.rhs[dot];
            self.reset();

            // Every configuration of this state that shifts the same
            // symbol contributes its advanced item to the new basis.
            for &bcfp in &closure[i..] {
                if self.configs[bcfp.index()].status == CfgStatus::Complete {
                    continue;
                }
                let brule_id = self.configs[bcfp.index()].rule;
                let bdot = self.configs[bcfp.index()].dot as usize;
                let brule = grammar.rule(brule_id);
                if bdot >= brule.nrhs() {
                    continue;
                }
                if !same_symbol(grammar.symbols(), brule.rhs[bdot], sp) {
                    continue;
                }
                self.configs[bcfp.index()].status = CfgStatus::Complete;
                let newcfg = self.add_basis(brule_id, bdot as u32 + 1);
                self.configs[newcfg.index()].bplp.push(bcfp);
            }

            let newstp = self.get_state(diags);

            // The successor is reached by a shift on `sp`; a token class
            // expands into one shift per member terminal.
            let symbol = grammar.symbols().symbol(sp);
            if symbol.is_multiterminal() {
                for &sub in &symbol.subsymbols {
                    self.states[sid.index()]
                        .actions
                        .push(Action::new(sub, ActionKind::Shift(newstp)));
                }
            } else {
                self.states[sid.index()]
                    .actions
                    .push(Action::new(sp, ActionKind::Shift(newstp)));
            }
        }
    }
}
