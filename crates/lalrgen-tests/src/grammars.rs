//! Grammar definitions for integration tests.

use lalrgen::{Assoc, Grammar, GrammarBuilder};

/// The classic unambiguous arithmetic grammar behind a start rule:
/// `program -> E ; E -> E + T | T ; T -> T * F | F ; F -> ( E ) | ID`.
pub fn arithmetic() -> Grammar {
    let mut g = GrammarBuilder::new("arithmetic.y");
    let plus = g.symbol("PLUS");
    let star = g.symbol("STAR");
    let lparen = g.symbol("LPAREN");
    let rparen = g.symbol("RPAREN");
    let id = g.symbol("ID");

    let program = g.symbol("program");
    let e = g.symbol("expr");
    let t = g.symbol("term");
    let f = g.symbol("factor");

    g.rule(program, [e]);
    g.rule(e, [e, plus, t]);
    g.rule(e, [t]);
    g.rule(t, [t, star, f]);
    g.rule(t, [f]);
    g.rule(f, [lparen, e, rparen]);
    g.rule(f, [id]);
    g.build().unwrap()
}

/// A single ambiguous expression rule disambiguated by `%left` levels:
/// `E -> E + E | E * E | ( E ) | ID`.
pub fn arithmetic_prec() -> Grammar {
    let mut g = GrammarBuilder::new("arithmetic_prec.y");
    let plus = g.symbol("PLUS");
    let star = g.symbol("STAR");
    let lparen = g.symbol("LPAREN");
    let rparen = g.symbol("RPAREN");
    let id = g.symbol("ID");

    g.precedence(Assoc::Left, &[plus]);
    g.precedence(Assoc::Left, &[star]);

    let program = g.symbol("program");
    let e = g.symbol("expr");
    g.rule(program, [e]);
    g.rule(e, [e, plus, e]);
    g.rule(e, [e, star, e]);
    g.rule(e, [lparen, e, rparen]);
    g.rule(e, [id]);
    g.build().unwrap()
}

/// The dangling-else grammar:
/// `S -> IF E THEN S ELSE S | IF E THEN S | STMT ; E -> COND`.
pub fn dangling_else(with_prec: bool) -> Grammar {
    let mut g = GrammarBuilder::new("else.y");
    let r#if = g.symbol("IF");
    let then = g.symbol("THEN");
    let r#else = g.symbol("ELSE");
    let stmt = g.symbol("STMT");
    let cond = g.symbol("COND");

    if with_prec {
        // One level, right-associative: the shift on ELSE wins over the
        // reduce of the shorter IF rule (whose precedence comes from
        // THEN).
        g.precedence(Assoc::Right, &[then, r#else]);
    }

    let program = g.symbol("program");
    let s = g.symbol("s");
    let e = g.symbol("e");
    g.rule(program, [s]);
    g.rule(s, [r#if, e, then, s, r#else, s]);
    g.rule(s, [r#if, e, then, s]);
    g.rule(s, [stmt]);
    g.rule(e, [cond]);
    g.build().unwrap()
}

/// `A -> TA A TB | ε ; B -> TB`, reachable through one start rule.
pub fn nullable() -> Grammar {
    let mut g = GrammarBuilder::new("nullable.y");
    let ta = g.symbol("TA");
    let tb = g.symbol("TB");
    let s = g.symbol("s");
    let a = g.symbol("a");
    let b = g.symbol("b");
    g.rule(s, [a, b]);
    g.rule(a, [ta, a, tb]);
    g.rule(a, []);
    g.rule(b, [tb]);
    g.build().unwrap()
}

/// `S -> A ; X -> B X | B` with `X` unreachable from the start symbol.
pub fn unreachable() -> Grammar {
    let mut g = GrammarBuilder::new("unreachable.y");
    let ta = g.symbol("A");
    let tb = g.symbol("B");
    let s = g.symbol("s");
    let x = g.symbol("x");
    g.rule(s, [ta]);
    g.rule(x, [tb, x]);
    g.rule(x, [tb]);
    g.build().unwrap()
}

/// `%token_class number INTEGER|FLOAT` with
/// `expr -> expr + number | number`.
pub fn token_class() -> Grammar {
    let mut g = GrammarBuilder::new("token_class.y");
    let plus = g.symbol("PLUS");
    let integer = g.symbol("INTEGER");
    let float = g.symbol("FLOAT");
    let number = g.token_class("number", &[integer, float]);
    let program = g.symbol("program");
    let expr = g.symbol("expr");
    g.rule(program, [expr]);
    g.rule(expr, [expr, plus, number]);
    g.rule(expr, [number]);
    g.build().unwrap()
}

/// A declaration-style grammar with a genuine LALR(1) lookahead split:
/// `def -> param_spec return_spec COMMA ; param_spec -> type | name_list
/// COLON type ; return_spec -> type | name COLON type ; type -> ID ;
/// name -> ID ; name_list -> name | name COMMA name_list`.
pub fn parameters() -> Grammar {
    let mut g = GrammarBuilder::new("parameters.y");
    let comma = g.symbol("COMMA");
    let colon = g.symbol("COLON");
    let id = g.symbol("ID");

    let def = g.symbol("def");
    let param_spec = g.symbol("param_spec");
    let return_spec = g.symbol("return_spec");
    let ty = g.symbol("ty");
    let name = g.symbol("name");
    let name_list = g.symbol("name_list");

    g.rule(def, [param_spec, return_spec, comma]);
    g.rule(param_spec, [ty]);
    g.rule(param_spec, [name_list, colon, ty]);
    g.rule(return_spec, [ty]);
    g.rule(return_spec, [name, colon, ty]);
    g.rule(ty, [id]);
    g.rule(name, [id]);
    g.rule(name_list, [name]);
    g.rule(name_list, [name, comma, name_list]);
    g.build().unwrap()
}

/// Nullable symbols threaded through every rule position:
/// `program -> E ; E -> E + T n | T ; T -> A | ( E n ) | n A ; n -> ε | NUM`.
pub fn with_nullable() -> Grammar {
    let mut g = GrammarBuilder::new("with_nullable.y");
    let lparen = g.symbol("LPAREN");
    let rparen = g.symbol("RPAREN");
    let plus = g.symbol("PLUS");
    let a = g.symbol("ATOM");
    let num = g.symbol("NUM");

    let program = g.symbol("program");
    let expr = g.symbol("expr");
    let term = g.symbol("term");
    let nullable = g.symbol("nullable");

    g.rule(program, [expr]);
    g.rule(expr, [expr, plus, nullable]);
    g.rule(expr, [term]);
    g.rule(term, [a]);
    g.rule(term, [lparen, expr, nullable, rparen]);
    g.rule(term, [nullable, a]);
    g.rule(nullable, []);
    g.rule(nullable, [num]);
    g.build().unwrap()
}

/// Keyword fallback: `QUOTE` falls back to `ID`.
pub fn fallback() -> Grammar {
    let mut g = GrammarBuilder::new("fallback.y");
    let id = g.symbol("ID");
    let quote = g.symbol("QUOTE");
    let semi = g.symbol("SEMI");
    g.fallback(id, &[quote]);
    let s = g.symbol("s");
    g.rule(s, [id, semi]);
    g.build().unwrap()
}
