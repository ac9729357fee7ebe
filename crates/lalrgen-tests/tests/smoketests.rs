//! End-to-end checks over the analysis pipeline and table outputs.

use lalrgen_tests::{compile, grammars, token};

#[test]
fn arithmetic_builds_twelve_states_without_conflicts() {
    let (g, output) = compile(grammars::arithmetic());
    assert_eq!(output.tables.nstate, 12);
    assert_eq!(output.conflicts, 0);
    assert_eq!(output.diagnostics.error_count(), 0);

    // first(E) = first(T) = first(F) = { '(', ID }
    let expected = vec![token(&g, "LPAREN"), token(&g, "ID")];
    for name in ["expr", "term", "factor"] {
        let id = g.symbols().find(name).unwrap();
        let mut first: Vec<u32> = g.symbols().symbol(id).first.iter().collect();
        first.sort_unstable();
        let mut want = expected.clone();
        want.sort_unstable();
        assert_eq!(first, want, "FIRST({name})");
        assert!(!g.symbols().symbol(id).nullable);
    }
}

#[test]
fn precedence_resolves_every_ambiguous_operator() {
    let (_g, output) = compile(grammars::arithmetic_prec());
    assert_eq!(output.conflicts, 0);
    assert_eq!(output.diagnostics.error_count(), 0);
}

#[test]
fn dangling_else_conflicts_once_and_precedence_silences_it() {
    let (_g, output) = compile(grammars::dangling_else(false));
    assert_eq!(output.conflicts, 1);

    let (_g, output) = compile(grammars::dangling_else(true));
    assert_eq!(output.conflicts, 0);
}

#[test]
fn nullability_and_first_sets() {
    let (g, output) = compile(grammars::nullable());
    assert_eq!(output.diagnostics.error_count(), 0);

    let a = g.symbols().find("a").unwrap();
    let b = g.symbols().find("b").unwrap();
    assert!(g.symbols().symbol(a).nullable);
    assert!(!g.symbols().symbol(b).nullable);

    let first_a: Vec<u32> = g.symbols().symbol(a).first.iter().collect();
    let first_b: Vec<u32> = g.symbols().symbol(b).first.iter().collect();
    assert_eq!(first_a, vec![token(&g, "TA")]);
    assert_eq!(first_b, vec![token(&g, "TB")]);
}

#[test]
fn nullable_symbols_thread_through_every_position() {
    let (g, output) = compile(grammars::with_nullable());
    let nullable = g.symbols().find("nullable").unwrap();
    let term = g.symbols().find("term").unwrap();
    assert!(g.symbols().symbol(nullable).nullable);
    assert!(!g.symbols().symbol(term).nullable);

    // term -> ATOM and term -> nullable ATOM overlap, so the grammar is
    // ambiguous and carries an unresolvable shift/reduce conflict.
    assert!(output.conflicts >= 1);
}

#[test]
fn merged_lookaheads_surface_as_a_reduce_reduce_conflict() {
    // The parameter-list grammar is LR(1) but not LALR(1): merging the
    // states that follow `ID` mixes the COMMA lookaheads of `ty` and
    // `name`, leaving a reduce/reduce conflict.
    let (_g, output) = compile(grammars::parameters());
    assert_eq!(output.diagnostics.error_count(), 0);
    assert!(output.conflicts >= 1);
}

#[test]
fn unreachable_rules_are_reported() {
    let (_g, output) = compile(grammars::unreachable());
    assert!(output.diagnostics.error_count() >= 2);
    let rendered = output.diagnostics.to_string();
    assert!(rendered.contains("can not be reduced"));
}

#[test]
fn rule_and_state_indices_are_dense() {
    let (g, output) = compile(grammars::arithmetic());
    let tables = &output.tables;

    // Rule table numbers fill [0, nrule).
    let mut seen = vec![false; tables.nrule as usize];
    for (_, rule) in g.rules() {
        assert!(!seen[rule.table_index as usize]);
        seen[rule.table_index as usize] = true;
    }
    assert!(seen.iter().all(|&s| s));

    // Symbol indices fill [0, nsymbol + 1), {default} included.
    for index in 0..=tables.nsymbol {
        let id = g.symbols().by_index(index);
        assert_eq!(g.symbols().symbol(id).index, index);
    }
    assert_eq!(tables.symbol_names.len() as u32, tables.nsymbol + 1);
    assert_eq!(tables.symbol_names[0], "$");
    assert_eq!(tables.symbol_names[tables.nsymbol as usize], "{default}");
}

#[test]
fn action_code_ranges_follow_the_encoding() {
    let (_g, output) = compile(grammars::arithmetic());
    let t = &output.tables;
    let codes = t.codes;
    assert_eq!(codes.min_shift_reduce, t.nstate);
    assert_eq!(codes.err_action, t.nstate + t.nrule);
    assert_eq!(codes.acc_action, codes.err_action + 1);
    assert_eq!(codes.no_action, codes.acc_action + 1);
    assert_eq!(codes.min_reduce, codes.no_action + 1);
    for &a in &t.action {
        assert!(a <= codes.max_action);
    }
}

#[test]
fn every_datum_the_emitter_needs_is_present() {
    let (_g, output) = compile(grammars::arithmetic());
    let t = &output.tables;
    assert!(t.nxstate <= t.nstate);
    assert_eq!(t.default_action.len() as u32, t.nxstate);
    assert_eq!(t.states.len() as u32, t.nstate);
    assert_eq!(t.rule_lhs.len() as u32, t.nrule);
    assert_eq!(t.rule_nrhs.len() as u32, t.nrule);
    assert!(t.shift_ofst.len() as u32 <= t.nxstate);
    assert!(t.reduce_ofst.len() as u32 <= t.nxstate);
    // The guard table is padded for safe terminal indexing.
    assert!(t.lookahead.len() >= t.action.len() + t.nterminal as usize);
    assert!(t.fallback.is_empty());
}

#[test]
fn fallback_table_lists_every_terminal() {
    let (g, output) = compile(grammars::fallback());
    let t = &output.tables;
    assert_eq!(t.fallback.len() as u32, t.nterminal);
    assert_eq!(t.fallback[token(&g, "QUOTE") as usize], token(&g, "ID"));
    assert_eq!(t.fallback[token(&g, "ID") as usize], 0);
}
