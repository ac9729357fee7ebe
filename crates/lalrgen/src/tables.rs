//! Final table assembly: action encoding, row packing, and the output
//! structure handed to the emitter.

use crate::actions::{Action, ActionKind};
use crate::grammar::Grammar;
use crate::lr0::{Automaton, NO_OFFSET};
use crate::packing::ActTab;
use std::cmp::Reverse;

/// The numeric action encoding shared with the runtime:
///
/// * `0 <= a < nstate` — shift to state `a`;
/// * `nstate <= a < nstate + nrule` — shift-reduce by rule `a - nstate`;
/// * `a == nstate + nrule` — syntax error;
/// * `a == nstate + nrule + 1` — accept;
/// * `a == nstate + nrule + 2` — no action;
/// * `nstate + nrule + 3 <= a` — reduce by rule `a - (nstate + nrule + 3)`.
#[derive(Debug, Copy, Clone)]
pub struct ActionCodes {
    pub min_shift_reduce: u32,
    pub err_action: u32,
    pub acc_action: u32,
    pub no_action: u32,
    pub min_reduce: u32,
    pub max_action: u32,
}

impl ActionCodes {
    fn new(nstate: u32, nrule: u32) -> Self {
        let min_shift_reduce = nstate;
        let err_action = min_shift_reduce + nrule;
        let acc_action = err_action + 1;
        let no_action = acc_action + 1;
        let min_reduce = no_action + 1;
        Self {
            min_shift_reduce,
            err_action,
            acc_action,
            no_action,
            min_reduce,
            max_action: min_reduce + nrule,
        }
    }
}

/// Per-state entry of the output, in final state numbering.
#[derive(Debug, Copy, Clone)]
pub struct StateEntry {
    pub i_tkn_ofst: i32,
    pub i_nt_ofst: i32,
    /// Table index of the default-reduce rule, `-1` for syntax error.
    pub i_dflt_reduce: i32,
    pub auto_reduce: bool,
}

/// Everything the emitter needs to render a table-driven parser.
#[derive(Debug)]
pub struct ParserTables {
    pub nstate: u32,
    /// States that survive compression; the trailing auto-reduce run is
    /// reachable only through fused shift-reduce codes.
    pub nxstate: u32,
    pub nrule: u32,
    pub nrule_with_action: u32,
    pub nsymbol: u32,
    pub nterminal: u32,
    pub codes: ActionCodes,

    /// The packed action codes (`yy_action`).
    pub action: Vec<u32>,
    /// The guard lookaheads (`yy_lookahead`), padded with `nterminal`
    /// entries so safe-mode indexing stays in bounds.
    pub lookahead: Vec<u32>,
    /// Per-state terminal-row offsets; trailing empty rows are trimmed.
    pub shift_ofst: Vec<i32>,
    pub shift_ofst_min: i32,
    pub shift_ofst_max: i32,
    /// Per-state nonterminal-row offsets; trailing empty rows trimmed.
    pub reduce_ofst: Vec<i32>,
    pub reduce_ofst_min: i32,
    pub reduce_ofst_max: i32,
    /// Default action per state (`yy_default`).
    pub default_action: Vec<u32>,
    /// Fallback terminal index per terminal; empty when the grammar
    /// declares no `%fallback`.
    pub fallback: Vec<u32>,
    pub states: Vec<StateEntry>,

    /// LHS symbol index per rule, in table numbering.
    pub rule_lhs: Vec<u32>,
    /// RHS length per rule, in table numbering.
    pub rule_nrhs: Vec<u32>,
    /// Symbol names by index, through `{default}`.
    pub symbol_names: Vec<String>,
    pub wildcard: Option<u32>,
    pub error_symbol: Option<u32>,
}

impl ParserTables {
    pub fn n_action_entries(&self) -> usize {
        self.action.len()
    }

    pub fn n_lookahead_entries(&self) -> usize {
        self.lookahead.len()
    }
}

/// Encode an action, or `None` if it produces no table entry.
fn compute_action(
    g: &Grammar,
    aut: &Automaton,
    codes: ActionCodes,
    ap: &Action,
) -> Option<u32> {
    match ap.kind {
        ActionKind::Shift(next) => Some(aut.state(next).statenum),
        ActionKind::ShiftReduce(rule) => {
            // A shift is inherent after a prior reduce, so a fused entry
            // with a nonterminal lookahead degenerates to a plain reduce.
            let base = if g.symbols().symbol(ap.sp).index >= g.nterminal() {
                codes.min_reduce
            } else {
                codes.min_shift_reduce
            };
            Some(base + g.rule(rule).table_index)
        }
        ActionKind::Reduce(rule) => Some(codes.min_reduce + g.rule(rule).table_index),
        ActionKind::Error => Some(codes.err_action),
        ActionKind::Accept => Some(codes.acc_action),
        _ => None,
    }
}

/// Pack the action rows and assemble the output tables.
pub(crate) fn build_tables(g: &mut Grammar, aut: &mut Automaton) -> ParserTables {
    let nstate = aut.nstate();
    let nxstate = aut.nxstate;
    let nrule = g.nrule();
    let nsymbol = g.nsymbol();
    let nterminal = g.nterminal();
    let codes = ActionCodes::new(nstate, nrule);

    // Pack the larger action rows first for better overlap.
    struct RowRef {
        state: usize,
        is_tkn: bool,
        n_action: i32,
        order: usize,
    }
    let mut rows = Vec::with_capacity(nxstate as usize * 2);
    for i in 0..nxstate as usize {
        let sid = aut.sorted[i];
        let state = aut.state(sid);
        rows.push(RowRef {
            state: sid.index(),
            is_tkn: true,
            n_action: state.n_tkn_act,
            order: i * 2,
        });
        rows.push(RowRef {
            state: sid.index(),
            is_tkn: false,
            n_action: state.n_nt_act,
            order: i * 2 + 1,
        });
    }
    rows.sort_by_key(|row| (Reverse(row.n_action), row.order));

    let mut acttab = ActTab::new(nsymbol as usize, nterminal as usize);
    let (mut mn_tkn_ofst, mut mx_tkn_ofst) = (0, 0);
    let (mut mn_nt_ofst, mut mx_nt_ofst) = (0, 0);
    for row in rows.iter().take_while(|row| row.n_action > 0) {
        if row.is_tkn {
            for ap in &aut.states[row.state].actions {
                let index = g.symbols().symbol(ap.sp).index;
                if index >= nterminal {
                    continue;
                }
                if let Some(code) = compute_action(g, aut, codes, ap) {
                    acttab.add_action(index, code as i32);
                }
            }
            let ofst = acttab.insert(true);
            aut.states[row.state].i_tkn_ofst = ofst;
            mn_tkn_ofst = mn_tkn_ofst.min(ofst);
            mx_tkn_ofst = mx_tkn_ofst.max(ofst);
        } else {
            for ap in &aut.states[row.state].actions {
                let index = g.symbols().symbol(ap.sp).index;
                if index < nterminal || index == nsymbol {
                    continue;
                }
                if let Some(code) = compute_action(g, aut, codes, ap) {
                    acttab.add_action(index, code as i32);
                }
            }
            let ofst = acttab.insert(false);
            aut.states[row.state].i_nt_ofst = ofst;
            mn_nt_ofst = mn_nt_ofst.min(ofst);
            mx_nt_ofst = mx_nt_ofst.max(ofst);
        }
    }

    // Mark the rules still reachable after every optimization.
    for i in 0..g.rules.len() {
        g.rules[i].does_reduce = false;
    }
    for i in 0..nxstate as usize {
        let sid = aut.sorted[i];
        for ap in &aut.states[sid.index()].actions {
            if let ActionKind::Reduce(rule) | ActionKind::ShiftReduce(rule) = ap.kind {
                g.rules[rule.raw() as usize].does_reduce = true;
            }
        }
    }

    let nactiontab = acttab.action_size();
    let nlookaheadtab = acttab.lookahead_size();

    let action: Vec<u32> = (0..nactiontab)
        .map(|i| {
            let code = acttab.slot(i).action;
            if code < 0 {
                codes.no_action
            } else {
                code as u32
            }
        })
        .collect();

    // Pad the guard table so shift_ofst + token never reads past the end.
    let mut lookahead: Vec<u32> = (0..nlookaheadtab)
        .map(|i| {
            let la = acttab.slot(i).lookahead;
            if la < 0 {
                nsymbol
            } else {
                la as u32
            }
        })
        .collect();
    while lookahead.len() < nterminal as usize + nactiontab {
        lookahead.push(nterminal);
    }

    let mut n = nxstate as usize;
    while n > 0 && aut.state(aut.sorted[n - 1]).i_tkn_ofst == NO_OFFSET {
        n -= 1;
    }
    let shift_ofst: Vec<i32> = (0..n)
        .map(|i| {
            let ofst = aut.state(aut.sorted[i]).i_tkn_ofst;
            if ofst == NO_OFFSET {
                nactiontab as i32
            } else {
                ofst
            }
        })
        .collect();

    let mut n = nxstate as usize;
    while n > 0 && aut.state(aut.sorted[n - 1]).i_nt_ofst == NO_OFFSET {
        n -= 1;
    }
    let reduce_ofst: Vec<i32> = (0..n)
        .map(|i| {
            let ofst = aut.state(aut.sorted[i]).i_nt_ofst;
            if ofst == NO_OFFSET {
                mn_nt_ofst - 1
            } else {
                ofst
            }
        })
        .collect();

    let default_action: Vec<u32> = (0..nxstate as usize)
        .map(|i| {
            let state = aut.state(aut.sorted[i]);
            if state.i_dflt_reduce < 0 {
                codes.err_action
            } else {
                codes.min_reduce + state.i_dflt_reduce as u32
            }
        })
        .collect();

    let fallback: Vec<u32> = if g.has_fallback() {
        (0..nterminal)
            .map(|t| {
                let symbol = g.symbols().symbol(g.symbols().by_index(t));
                symbol
                    .fallback
                    .map_or(0, |fb| g.symbols().symbol(fb).index)
            })
            .collect()
    } else {
        Vec::new()
    };

    let states: Vec<StateEntry> = (0..nstate as usize)
        .map(|i| {
            let state = aut.state(aut.sorted[i]);
            StateEntry {
                i_tkn_ofst: state.i_tkn_ofst,
                i_nt_ofst: state.i_nt_ofst,
                i_dflt_reduce: state.i_dflt_reduce,
                auto_reduce: state.auto_reduce,
            }
        })
        .collect();

    let mut rule_lhs = vec![0; nrule as usize];
    let mut rule_nrhs = vec![0; nrule as usize];
    for (_, rule) in g.rules() {
        rule_lhs[rule.table_index as usize] = g.symbols().symbol(rule.lhs).index;
        rule_nrhs[rule.table_index as usize] = rule.nrhs() as u32;
    }

    let symbol_names: Vec<String> = (0..=nsymbol)
        .map(|index| g.symbols().name(g.symbols().by_index(index)).to_owned())
        .collect();

    tracing::debug!(
        nactiontab,
        nlookaheadtab,
        nshift = shift_ofst.len(),
        nreduce = reduce_ofst.len(),
        "tables packed"
    );

    ParserTables {
        nstate,
        nxstate,
        nrule,
        nrule_with_action: g.nrule_with_action(),
        nsymbol,
        nterminal,
        codes,
        action,
        lookahead,
        shift_ofst,
        shift_ofst_min: mn_tkn_ofst,
        shift_ofst_max: mx_tkn_ofst,
        reduce_ofst,
        reduce_ofst_min: mn_nt_ofst,
        reduce_ofst_max: mx_nt_ofst,
        default_action,
        fallback,
        states,
        rule_lhs,
        rule_nrhs,
        symbol_names,
        wildcard: g.wildcard().map(|sp| g.symbols().symbol(sp).index),
        error_symbol: g
            .error_symbol()
            .filter(|&sp| g.symbols().symbol(sp).use_count > 0)
            .map(|sp| g.symbols().symbol(sp).index),
    }
}
