//! Integration-test support for the table generator.

pub mod grammars;

use lalrgen::{Grammar, Options, Output};

/// Run the default pipeline over a grammar.
pub fn compile(mut grammar: Grammar) -> (Grammar, Output) {
    let output = lalrgen::compile(&mut grammar, &Options::default());
    (grammar, output)
}

/// Terminal index of a named token, for driving the runtime.
pub fn token(grammar: &Grammar, name: &str) -> u32 {
    let id = grammar
        .symbols()
        .find(name)
        .unwrap_or_else(|| panic!("no such token: {name}"));
    grammar.symbols().symbol(id).index
}
