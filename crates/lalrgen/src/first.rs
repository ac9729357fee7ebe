//! Nullability and FIRST-set computation.
//!
//! Two fixpoint passes over the rules. Termination is guaranteed by
//! monotone growth over a finite domain: the nullable flags only ever flip
//! to true and the FIRST bit-sets only ever gain bits.

use crate::grammar::Grammar;
use crate::symbol::{SymbolKind, TermSet};

pub(crate) fn find_first_sets(g: &mut Grammar) {
    for id in g.symbols.ids().collect::<Vec<_>>() {
        let symbol = g.symbols.symbol_mut(id);
        symbol.nullable = false;
        symbol.first = TermSet::new();
    }

    // Nullable pass: a nonterminal derives the empty string as soon as one
    // of its rules has an all-nullable RHS.
    loop {
        let mut progress = false;
        for i in 0..g.rules.len() {
            let lhs = g.rules[i].lhs;
            if g.symbols.symbol(lhs).nullable {
                continue;
            }
            let all_nullable = g.rules[i].rhs.iter().all(|&sp| {
                let symbol = g.symbols.symbol(sp);
                debug_assert!(symbol.is_nonterminal() || !symbol.nullable);
                symbol.nullable
            });
            if all_nullable {
                g.symbols.symbol_mut(lhs).nullable = true;
                progress = true;
            }
        }
        if !progress {
            break;
        }
    }

    // FIRST pass.
    loop {
        let mut progress = false;
        for i in 0..g.rules.len() {
            let lhs = g.rules[i].lhs;
            let mut first = std::mem::take(&mut g.symbols.symbol_mut(lhs).first);
            for &sp in &g.rules[i].rhs {
                let symbol = g.symbols.symbol(sp);
                match symbol.kind {
                    SymbolKind::Terminal => {
                        progress |= first.insert(symbol.index);
                        break;
                    }
                    SymbolKind::Multiterminal => {
                        for &sub in &symbol.subsymbols {
                            progress |= first.insert(g.symbols.symbol(sub).index);
                        }
                        break;
                    }
                    SymbolKind::Nonterminal if sp == lhs => {
                        // Left recursion adds nothing new; keep scanning
                        // only if the head is itself nullable.
                        if !symbol.nullable {
                            break;
                        }
                    }
                    SymbolKind::Nonterminal => {
                        progress |= first.union_with_changed(&symbol.first);
                        if !symbol.nullable {
                            break;
                        }
                    }
                }
            }
            g.symbols.symbol_mut(lhs).first = first;
        }
        if !progress {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    #[test]
    fn nullable_and_first_of_bracketed_grammar() {
        // A -> a A b | ε ; B -> b
        let mut g = GrammarBuilder::new("test.y");
        let ta = g.symbol("TA");
        let tb = g.symbol("TB");
        let a = g.symbol("a");
        let b = g.symbol("b");
        g.rule(a, [ta, a, tb]);
        g.rule(a, []);
        g.rule(b, [tb]);
        let mut g = g.build().unwrap();

        find_first_sets(&mut g);

        assert!(g.symbols().symbol(a).nullable);
        assert!(!g.symbols().symbol(b).nullable);
        let ta_index = g.symbols().symbol(ta).index;
        let tb_index = g.symbols().symbol(tb).index;
        let first_a: Vec<u32> = g.symbols().symbol(a).first.iter().collect();
        let first_b: Vec<u32> = g.symbols().symbol(b).first.iter().collect();
        assert_eq!(first_a, vec![ta_index]);
        assert_eq!(first_b, vec![tb_index]);
    }

    #[test]
    fn first_flows_through_nullable_prefix() {
        // s -> n TC ; n -> ε | TB
        let mut g = GrammarBuilder::new("test.y");
        let tb = g.symbol("TB");
        let tc = g.symbol("TC");
        let s = g.symbol("s");
        let n = g.symbol("n");
        g.rule(s, [n, tc]);
        g.rule(n, []);
        g.rule(n, [tb]);
        let mut g = g.build().unwrap();

        find_first_sets(&mut g);

        let tb_index = g.symbols().symbol(tb).index;
        let tc_index = g.symbols().symbol(tc).index;
        let first_s: Vec<u32> = g.symbols().symbol(s).first.iter().collect();
        assert_eq!(first_s, vec![tb_index, tc_index]);
    }

    #[test]
    fn token_class_members_enter_first_sets() {
        let mut g = GrammarBuilder::new("test.y");
        let int = g.symbol("INTEGER");
        let float = g.symbol("FLOAT");
        let number = g.token_class("number", &[int, float]);
        let expr = g.symbol("expr");
        g.rule(expr, [number]);
        let mut g = g.build().unwrap();

        find_first_sets(&mut g);

        let expected: Vec<u32> = vec![
            g.symbols().symbol(int).index,
            g.symbols().symbol(float).index,
        ];
        let first: Vec<u32> = g.symbols().symbol(expr).first.iter().collect();
        assert_eq!(first, expected);
    }
}
