//! Action-table compression and state resorting.

use crate::actions::{sort_actions, ActionKind};
use crate::grammar::{Grammar, RuleId};
use crate::lr0::{Automaton, NO_OFFSET};
use std::cmp::Reverse;

/// Compress the action tables.
///
/// Three passes: pick a default reduction per state (unless the wildcard
/// token is a possible lookahead there), convert shifts into auto-reduce
/// states to fused shift-reduces, and short-circuit unit productions whose
/// reduce would land back where it started.
pub(crate) fn compress_tables(g: &mut Grammar, aut: &mut Automaton) {
    let default_symbol = g.symbols().default_symbol();
    let wildcard = g.wildcard();

    for s in 0..aut.states.len() {
        // The candidate default is the reduce rule used most often in
        // this state, never the one for the start symbol.
        let mut nbest = 0;
        let mut rbest: Option<RuleId> = None;
        let mut uses_wildcard = false;
        {
            let actions = &aut.states[s].actions;
            for (i, ap) in actions.iter().enumerate() {
                if matches!(ap.kind, ActionKind::Shift(_)) && Some(ap.sp) == wildcard {
                    uses_wildcard = true;
                }
                let ActionKind::Reduce(rp) = ap.kind else {
                    continue;
                };
                if g.rule(rp).lhs_is_start {
                    continue;
                }
                if Some(rp) == rbest {
                    continue;
                }
                let mut n = 1;
                for ap2 in &actions[i + 1..] {
                    let ActionKind::Reduce(rp2) = ap2.kind else {
                        continue;
                    };
                    if Some(rp2) == rbest {
                        continue;
                    }
                    if rp2 == rp {
                        n += 1;
                    }
                }
                if n > nbest {
                    nbest = n;
                    rbest = Some(rp);
                }
            }
        }

        // A default must not mask the wildcard token.
        if nbest < 1 || uses_wildcard {
            continue;
        }
        let rbest = rbest.expect("nbest >= 1 implies a candidate rule");

        // Combine the matching reduces into a single default action.
        let actions = &mut aut.states[s].actions;
        let first = actions
            .iter()
            .position(|ap| ap.kind == ActionKind::Reduce(rbest))
            .expect("the best rule has at least one reduce");
        actions[first].sp = default_symbol;
        for ap in &mut actions[first + 1..] {
            if ap.kind == ActionKind::Reduce(rbest) {
                ap.kind = ActionKind::NotUsed;
            }
        }
        sort_actions(g, actions);

        let only_default = actions.iter().all(|ap| match ap.kind {
            ActionKind::Shift(_) => false,
            ActionKind::Reduce(rp) => rp == rbest,
            _ => true,
        });
        if only_default {
            aut.states[s].auto_reduce = true;
            aut.states[s].default_reduce_rule = Some(rbest);
        }
    }

    // Every shift into an auto-reduce state becomes a fused shift-reduce.
    for s in 0..aut.states.len() {
        for i in 0..aut.states[s].actions.len() {
            let ActionKind::Shift(next) = aut.states[s].actions[i].kind else {
                continue;
            };
            let target = &aut.states[next.index()];
            let fused = target
                .auto_reduce
                .then_some(target.default_reduce_rule)
                .flatten();
            if let Some(rule) = fused {
                aut.states[s].actions[i].kind = ActionKind::ShiftReduce(rule);
            }
        }
    }

    // A shift-reduce over a single-symbol, code-less rule lands back in
    // the state it started from; splice in the action that the reduce on
    // the rule's LHS would take there. Only applied to nonterminal
    // lookaheads; doing it for terminals too would enlarge the tables.
    let nterminal = g.nterminal();
    for s in 0..aut.states.len() {
        let mut i = 0;
        while i < aut.states[s].actions.len() {
            let (sp, kind) = {
                let ap = &aut.states[s].actions[i];
                (ap.sp, ap.kind)
            };
            let ActionKind::ShiftReduce(rp) = kind else {
                i += 1;
                continue;
            };
            let rule = g.rule(rp);
            if !rule.no_code() || rule.nrhs() != 1 || g.symbols().symbol(sp).index < nterminal {
                i += 1;
                continue;
            }
            let lhs = rule.lhs;
            let spliced = aut.states[s]
                .actions
                .iter()
                .enumerate()
                .find(|&(j, a2)| j != i && a2.sp == lhs)
                .map(|(_, a2)| (a2.sp, a2.kind))
                .expect("the state must act on the LHS of a fused unit rule");
            let ap = &mut aut.states[s].actions[i];
            ap.sp_opt = Some(spliced.0);
            ap.kind = spliced.1;
            // Reexamine this slot: the spliced action may fuse again.
        }
    }
}

/// Does this action produce a table entry, as opposed to being a resolved
/// or conflicting leftover?
pub(crate) fn has_table_code(kind: ActionKind) -> bool {
    matches!(
        kind,
        ActionKind::Shift(_)
            | ActionKind::ShiftReduce(_)
            | ActionKind::Reduce(_)
            | ActionKind::Error
            | ActionKind::Accept
    )
}

/// Count per-state actions, record default reductions, and renumber the
/// states so that the ones with the most nonterminal actions come first.
/// State 0 stays put. `nxstate` drops the trailing all-default run.
pub(crate) fn resort_states(g: &Grammar, aut: &mut Automaton, reorder: bool) {
    let nterminal = g.nterminal();
    let nsymbol = g.nsymbol();

    for state in &mut aut.states {
        state.n_tkn_act = 0;
        state.n_nt_act = 0;
        state.i_dflt_reduce = -1;
        state.i_tkn_ofst = NO_OFFSET;
        state.i_nt_ofst = NO_OFFSET;
        for ap in &state.actions {
            if !has_table_code(ap.kind) {
                continue;
            }
            let index = g.symbols().symbol(ap.sp).index;
            if index < nterminal {
                state.n_tkn_act += 1;
            } else if index < nsymbol {
                state.n_nt_act += 1;
            } else if let ActionKind::Reduce(rule) = ap.kind {
                debug_assert!(!state.auto_reduce || state.default_reduce_rule == Some(rule));
                state.i_dflt_reduce = g.rule(rule).table_index as i32;
            }
        }
    }

    if reorder {
        let mut sorted = std::mem::take(&mut aut.sorted);
        sorted[1..].sort_by_key(|&sid| {
            let state = &aut.states[sid.index()];
            (
                Reverse(state.n_nt_act),
                Reverse(state.n_tkn_act),
                Reverse(state.statenum),
            )
        });
        for (i, &sid) in sorted.iter().enumerate() {
            aut.states[sid.index()].statenum = i as u32;
        }
        aut.sorted = sorted;
    }

    let mut nxstate = aut.states.len() as u32;
    while nxstate > 1 && aut.states[aut.sorted[(nxstate - 1) as usize].index()].auto_reduce {
        nxstate -= 1;
    }
    aut.nxstate = nxstate;
    tracing::debug!(nstate = aut.states.len(), nxstate, "states resorted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::find_actions;
    use crate::errors::Diagnostics;
    use crate::first::find_first_sets;
    use crate::grammar::GrammarBuilder;
    use crate::lalr::{find_follow_sets, find_links};
    use crate::lr0::find_states;

    fn analyzed(mut g: Grammar) -> (Grammar, Automaton) {
        let mut diags = Diagnostics::new("test.y");
        crate::grammar::infer_rule_precedences(&mut g);
        find_first_sets(&mut g);
        let mut aut = find_states(&mut g, &mut diags);
        find_links(&mut aut);
        find_follow_sets(&mut aut);
        find_actions(&mut g, &mut aut, &mut diags);
        assert_eq!(diags.error_count(), 0);
        (g, aut)
    }

    fn list_grammar() -> Grammar {
        // prog -> list ; list -> list COMMA ID | ID
        let mut g = GrammarBuilder::new("test.y");
        let comma = g.symbol("COMMA");
        let id = g.symbol("ID");
        let prog = g.symbol("prog");
        let list = g.symbol("list");
        g.rule(prog, [list]);
        g.rule(list, [list, comma, id]);
        g.rule(list, [id]);
        g.build().unwrap()
    }

    #[test]
    fn default_reduction_collapses_matching_reduces() {
        let (mut g, mut aut) = analyzed(list_grammar());
        compress_tables(&mut g, &mut aut);

        let default_symbol = g.symbols().default_symbol();
        // Some state reduces `list -> list COMMA ID` on both COMMA and
        // end-of-input; compression folds those into one {default} entry.
        let mut defaults = 0;
        for state in &aut.states {
            for ap in &state.actions {
                if ap.sp == default_symbol {
                    assert!(matches!(ap.kind, ActionKind::Reduce(_)));
                    defaults += 1;
                }
            }
        }
        assert!(defaults >= 1);
    }

    #[test]
    fn auto_reduce_states_become_shift_reduces() {
        let (mut g, mut aut) = analyzed(list_grammar());
        compress_tables(&mut g, &mut aut);

        // The state entered on the trailing ID of `list COMMA ID` only
        // ever reduces that rule, so the shift into it is fused.
        let fused = aut
            .states
            .iter()
            .flat_map(|state| &state.actions)
            .filter(|ap| matches!(ap.kind, ActionKind::ShiftReduce(_)))
            .count();
        assert!(fused >= 1);
        assert!(aut.states.iter().any(|state| state.auto_reduce));
    }

    #[test]
    fn wildcard_lookahead_disables_the_default() {
        // s -> x ; x -> e ANY | e ; e -> ID. The state holding
        // { x -> e . ANY, x -> e . } shifts the wildcard, so its reduce
        // must stay explicit instead of becoming a {default} entry.
        fn build(with_wildcard: bool) -> Grammar {
            let mut g = GrammarBuilder::new("test.y");
            let any = g.symbol("ANY");
            let id = g.symbol("ID");
            let s = g.symbol("s");
            let x = g.symbol("x");
            let e = g.symbol("e");
            if with_wildcard {
                g.wildcard(any);
            }
            g.rule(s, [x]);
            g.rule(x, [e, any]);
            g.rule(x, [e]);
            g.rule(e, [id]);
            g.build().unwrap()
        }

        fn guarded_states(g: Grammar) -> (Grammar, usize, usize) {
            let any = g.symbols().find("ANY").unwrap();
            let (mut g, mut aut) = analyzed(g);
            compress_tables(&mut g, &mut aut);
            let default_symbol = g.symbols().default_symbol();
            let mut wildcard_states = 0;
            let mut defaulted = 0;
            for state in &aut.states {
                let shifts_any = state
                    .actions
                    .iter()
                    .any(|ap| ap.sp == any && matches!(ap.kind, ActionKind::Shift(_)));
                let has_default = state.actions.iter().any(|ap| ap.sp == default_symbol);
                if shifts_any {
                    wildcard_states += 1;
                    if has_default {
                        defaulted += 1;
                    }
                }
            }
            (g, wildcard_states, defaulted)
        }

        let (_, with_states, with_defaults) = guarded_states(build(true));
        assert!(with_states >= 1);
        assert_eq!(with_defaults, 0, "default reduction must not mask the wildcard");

        // Without the wildcard declaration the same state takes a default.
        let (_, _, without_defaults) = guarded_states(build(false));
        assert!(without_defaults >= 1);
    }

    #[test]
    fn resort_puts_dense_states_first_and_trims_auto_reduce() {
        let (mut g, mut aut) = analyzed(list_grammar());
        compress_tables(&mut g, &mut aut);
        resort_states(&g, &mut aut, true);

        // Final numbering is dense and sorted order realizes it.
        for (i, &sid) in aut.sorted.iter().enumerate() {
            assert_eq!(aut.state(sid).statenum, i as u32);
        }
        assert_eq!(aut.sorted[0].index(), 0, "state 0 is pinned");
        assert!(aut.nxstate <= aut.nstate());
        for &sid in &aut.sorted[aut.nxstate as usize..] {
            assert!(aut.state(sid).auto_reduce);
        }
        // Nonterminal-action counts never increase along the order.
        let counts: Vec<i32> = aut.sorted[1..]
            .iter()
            .map(|&sid| aut.state(sid).n_nt_act)
            .collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }
}
