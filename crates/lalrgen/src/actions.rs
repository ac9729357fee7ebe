//! Parser actions: synthesis, ordering, and conflict resolution.

use crate::errors::Diagnostics;
use crate::grammar::{Grammar, RuleId};
use crate::lr0::{Automaton, StateId};
use crate::symbol::{Assoc, SymbolId, NO_PREC};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ActionKind {
    Shift(StateId),
    Accept,
    Reduce(RuleId),
    /// Explicit rejection inserted by `%nonassoc` resolution.
    Error,
    SSConflict,
    SRConflict,
    RRConflict,
    /// A shift discarded in favor of a reduce by precedence.
    ShResolved,
    /// A reduce discarded in favor of a shift by precedence.
    RdResolved,
    NotUsed,
    ShiftReduce(RuleId),
}

impl ActionKind {
    /// Sort rank; shifts must come before reduces on the same lookahead.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Shift(_) => 0,
            Self::Accept => 1,
            Self::Reduce(_) => 2,
            Self::Error => 3,
            Self::SSConflict => 4,
            Self::SRConflict => 5,
            Self::RRConflict => 6,
            Self::ShResolved => 7,
            Self::RdResolved => 8,
            Self::NotUsed => 9,
            Self::ShiftReduce(_) => 10,
        }
    }

    pub(crate) fn rule(self) -> Option<RuleId> {
        match self {
            Self::Reduce(rule) | Self::ShiftReduce(rule) => Some(rule),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Action {
    /// The lookahead symbol.
    pub sp: SymbolId,
    /// Secondary symbol recorded by unit-production fusion so the emitter
    /// can annotate the generated entry.
    pub sp_opt: Option<SymbolId>,
    pub kind: ActionKind,
}

impl Action {
    pub(crate) fn new(sp: SymbolId, kind: ActionKind) -> Self {
        Self {
            sp,
            sp_opt: None,
            kind,
        }
    }
}

/// Sort actions by lookahead index, then action rank, then rule order.
/// The sort is stable, so equal keys keep their insertion order.
pub(crate) fn sort_actions(g: &Grammar, actions: &mut [Action]) {
    actions.sort_by_key(|action| {
        let rule_order = action
            .kind
            .rule()
            .map_or(0, |rule| g.rule(rule).decl_index);
        (
            g.symbols().symbol(action.sp).index,
            action.kind.rank(),
            rule_order,
        )
    });
}

/// Synthesize reduce and accept actions, then resolve conflicts.
/// Returns the number of unresolved parsing conflicts.
pub(crate) fn find_actions(
    g: &mut Grammar,
    aut: &mut Automaton,
    diags: &mut Diagnostics,
) -> usize {
    // A reduce action is added for every element of the follow set of a
    // configuration whose dot sits at the extreme right.
    let nterminal = g.nterminal();
    {
        let Automaton {
            states, configs, ..
        } = aut;
        for state in states.iter_mut() {
            for k in 0..state.closure.len() {
                let cid = state.closure[k];
                let config = &configs[cid.index()];
                let rule = g.rule(config.rule);
                if (config.dot as usize) != rule.nrhs() || rule.never_reduce {
                    continue;
                }
                for t in 0..nterminal {
                    if config.fws.contains(t) {
                        state.actions.push(Action::new(
                            g.symbols().by_index(t),
                            ActionKind::Reduce(config.rule),
                        ));
                    }
                }
            }
        }
    }

    // The first state accepts on the start nonterminal.
    aut.states[0]
        .actions
        .push(Action::new(g.start(), ActionKind::Accept));

    // Resolve conflicts pairwise among actions that share a lookahead.
    let mut nconflict = 0;
    for state in &mut aut.states {
        sort_actions(g, &mut state.actions);
        for i in 0..state.actions.len() {
            let mut j = i + 1;
            while j < state.actions.len() && state.actions[j].sp == state.actions[i].sp {
                let (head, tail) = state.actions.split_at_mut(j);
                nconflict += resolve_conflict(g, &mut head[i], &mut tail[0]);
                j += 1;
            }
        }
    }

    // Report each rule that no surviving reduce action ever uses.
    for rule in &mut g.rules {
        rule.can_reduce = false;
    }
    for state in &aut.states {
        for action in &state.actions {
            if let ActionKind::Reduce(rule) = action.kind {
                g.rules[rule.raw() as usize].can_reduce = true;
            }
        }
    }
    for i in 0..g.rules.len() {
        let rule = &g.rules[i];
        if rule.can_reduce || rule.never_reduce {
            continue;
        }
        diags.error(rule.line, "This rule can not be reduced.");
    }

    nconflict
}

/// Resolve a conflict between two actions on the same lookahead. Returns
/// the number of unresolvable conflicts (zero or one).
///
/// The shift is always the earlier action: shifts sort before reduces, so
/// a REDUCE/SHIFT pairing cannot reach this function.
fn resolve_conflict(g: &Grammar, apx: &mut Action, apy: &mut Action) -> usize {
    debug_assert_eq!(apx.sp, apy.sp);
    let mut errcnt = 0;

    match (apx.kind, apy.kind) {
        (ActionKind::Shift(_), ActionKind::Shift(_)) => {
            // Cannot arise from successor construction, which unifies all
            // shifts on one symbol; defended against regardless.
            apy.kind = ActionKind::SSConflict;
            errcnt += 1;
        }
        (ActionKind::Shift(_), ActionKind::Reduce(rule)) => {
            let spx = g.symbols().symbol(apx.sp);
            let precsym = g.rule(rule).precsym;
            let spy_prec = precsym.map_or(NO_PREC, |sp| g.symbols().symbol(sp).prec);
            if precsym.is_none() || spx.prec < 0 || spy_prec < 0 {
                // Not enough precedence information.
                apy.kind = ActionKind::SRConflict;
                errcnt += 1;
            } else if spx.prec > spy_prec {
                apy.kind = ActionKind::RdResolved;
            } else if spx.prec < spy_prec {
                apx.kind = ActionKind::ShResolved;
            } else if spx.assoc == Assoc::Right {
                apy.kind = ActionKind::RdResolved;
            } else if spx.assoc == Assoc::Left {
                apx.kind = ActionKind::ShResolved;
            } else {
                debug_assert_eq!(spx.assoc, Assoc::Nonassoc);
                apx.kind = ActionKind::Error;
            }
        }
        (ActionKind::Reduce(rx), ActionKind::Reduce(ry)) => {
            let px = g.rule(rx).precsym;
            let py = g.rule(ry).precsym;
            let spx_prec = px.map_or(NO_PREC, |sp| g.symbols().symbol(sp).prec);
            let spy_prec = py.map_or(NO_PREC, |sp| g.symbols().symbol(sp).prec);
            if px.is_none() || py.is_none() || spx_prec < 0 || spy_prec < 0 || spx_prec == spy_prec
            {
                apy.kind = ActionKind::RRConflict;
                errcnt += 1;
            } else if spx_prec > spy_prec {
                apy.kind = ActionKind::RdResolved;
            } else {
                apx.kind = ActionKind::RdResolved;
            }
        }
        _ => {
            // One of the pair was already resolved or marked conflicting
            // by an earlier pass, or involves the accept action (which
            // can share its lookahead with a shift only when the start
            // symbol appears on a right-hand side, an error reported
            // elsewhere). A REDUCE/SHIFT pairing is impossible because
            // shifts sort first.
            let handled = |kind: ActionKind| {
                matches!(
                    kind,
                    ActionKind::ShResolved
                        | ActionKind::RdResolved
                        | ActionKind::SSConflict
                        | ActionKind::SRConflict
                        | ActionKind::RRConflict
                        | ActionKind::Error
                        | ActionKind::Accept
                )
            };
            assert!(handled(apx.kind) || handled(apy.kind));
        }
    }

    errcnt
}
