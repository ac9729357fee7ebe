//! Drive the packed tables through the reference runtime and check that
//! they accept exactly the language of the source grammar.

use lalrgen::{Grammar, Options};
use lalrgen_runtime::accepts;
use lalrgen_tests::{compile, grammars, token};

fn tokens(g: &Grammar, names: &[&str]) -> Vec<u32> {
    names.iter().map(|name| token(g, name)).collect()
}

#[test]
fn arithmetic_round_trip() {
    let (g, output) = compile(grammars::arithmetic());
    let t = &output.tables;

    for good in [
        vec!["ID"],
        vec!["ID", "PLUS", "ID"],
        vec!["ID", "PLUS", "ID", "STAR", "ID"],
        vec!["LPAREN", "ID", "RPAREN"],
        vec!["LPAREN", "ID", "PLUS", "ID", "RPAREN", "STAR", "ID"],
    ] {
        assert!(accepts(t, &tokens(&g, &good)), "rejected {good:?}");
    }

    for bad in [
        vec![],
        vec!["PLUS"],
        vec!["ID", "PLUS"],
        vec!["ID", "ID"],
        vec!["LPAREN", "ID"],
        vec!["ID", "RPAREN"],
        vec!["ID", "PLUS", "STAR", "ID"],
    ] {
        assert!(!accepts(t, &tokens(&g, &bad)), "accepted {bad:?}");
    }
}

#[test]
fn compression_does_not_change_the_language() {
    let samples: Vec<Vec<&str>> = vec![
        vec!["ID"],
        vec!["ID", "STAR", "ID"],
        vec!["LPAREN", "ID", "PLUS", "ID", "RPAREN"],
        vec!["ID", "PLUS"],
        vec!["STAR"],
        vec!["LPAREN", "RPAREN"],
    ];

    let (g_on, on) = compile(grammars::arithmetic());
    let mut g_off = grammars::arithmetic();
    let off = lalrgen::compile(
        &mut g_off,
        &Options {
            compress_actions: false,
            resort_states: true,
        },
    );

    for sample in &samples {
        let with = accepts(&on.tables, &tokens(&g_on, sample));
        let without = accepts(&off.tables, &tokens(&g_off, sample));
        assert_eq!(with, without, "fusion changed the verdict for {sample:?}");
    }
}

#[test]
fn precedence_grammar_accepts_expressions() {
    let (g, output) = compile(grammars::arithmetic_prec());
    let t = &output.tables;
    assert!(accepts(t, &tokens(&g, &["ID", "PLUS", "ID", "STAR", "ID"])));
    assert!(accepts(t, &tokens(&g, &["LPAREN", "ID", "STAR", "ID", "RPAREN"])));
    assert!(!accepts(t, &tokens(&g, &["ID", "PLUS", "PLUS"])));
}

#[test]
fn dangling_else_prefers_the_shift() {
    let (g, output) = compile(grammars::dangling_else(true));
    let t = &output.tables;
    // if c then if c then stmt else stmt
    let input = tokens(
        &g,
        &[
            "IF", "COND", "THEN", "IF", "COND", "THEN", "STMT", "ELSE", "STMT",
        ],
    );
    assert!(accepts(t, &input));
    assert!(accepts(t, &tokens(&g, &["IF", "COND", "THEN", "STMT"])));
    assert!(!accepts(t, &tokens(&g, &["ELSE", "STMT"])));
}

#[test]
fn token_class_members_shift_to_the_same_successor() {
    let (g, output) = compile(grammars::token_class());
    let t = &output.tables;

    // Both members are interchangeable everywhere the class appears.
    assert!(accepts(t, &tokens(&g, &["INTEGER"])));
    assert!(accepts(t, &tokens(&g, &["FLOAT"])));
    assert!(accepts(t, &tokens(&g, &["INTEGER", "PLUS", "FLOAT"])));
    assert!(accepts(t, &tokens(&g, &["FLOAT", "PLUS", "INTEGER"])));
    assert!(!accepts(t, &tokens(&g, &["PLUS"])));

    // The expanded shifts target one successor: the packed rows give the
    // same action code for INTEGER and FLOAT in the start state.
    let int_index = token(&g, "INTEGER");
    let float_index = token(&g, "FLOAT");
    let ofst = t.shift_ofst[0];
    let at = |tok: u32| {
        let i = (ofst + tok as i32) as usize;
        assert_eq!(t.lookahead[i], tok);
        t.action[i]
    };
    assert_eq!(at(int_index), at(float_index));
}

#[test]
fn fallback_tokens_parse_where_their_target_does() {
    let (g, output) = compile(grammars::fallback());
    let t = &output.tables;
    assert!(accepts(t, &tokens(&g, &["ID", "SEMI"])));
    assert!(accepts(t, &tokens(&g, &["QUOTE", "SEMI"])));
    assert!(!accepts(t, &tokens(&g, &["SEMI"])));
}

#[test]
fn packed_rows_honor_the_guard_invariants() {
    for grammar in [
        grammars::arithmetic(),
        grammars::arithmetic_prec(),
        grammars::nullable(),
        grammars::token_class(),
    ] {
        let (_g, output) = compile(grammar);
        let t = &output.tables;

        for (s, &ofst) in t.shift_ofst.iter().enumerate() {
            for tok in 0..t.nterminal {
                // Safe mode: every possible terminal indexes in bounds.
                let i = ofst + tok as i32;
                assert!(i >= 0, "state {s} token {tok} reads below the table");
                let i = i as usize;
                assert!(i < t.lookahead.len());
                if t.lookahead[i] == tok {
                    assert!(t.action[i] <= t.codes.max_action);
                    assert_ne!(t.action[i], t.codes.no_action);
                }
            }
        }

        for &ofst in &t.reduce_ofst {
            for nt in t.nterminal..t.nsymbol {
                let i = ofst + nt as i32;
                if i < 0 || i as usize >= t.action.len() {
                    continue;
                }
                if t.lookahead[i as usize] == nt {
                    assert!(t.action[i as usize] <= t.codes.max_action);
                }
            }
        }
    }
}
