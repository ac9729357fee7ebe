//! A reference table-driven LR engine.
//!
//! Drives the packed tables produced by `lalrgen` directly: action lookup
//! is `action[offset(state) + lookahead]`, guarded by the stored lookahead,
//! with fallback-token retry and per-state default actions. Fused
//! shift-reduce codes ride on the state stack until the following step
//! consumes them, exactly as the table encoding intends.
//!
//! The engine recognizes; it does not evaluate semantic actions, and it
//! rejects on the first syntax error rather than attempting recovery.

use lalrgen::ParserTables;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error in state {state} on token {token}")]
    Syntax { state: u32, token: u32 },

    #[error("token {0} is out of range for this grammar")]
    InvalidToken(u32),

    #[error("input continued after acceptance")]
    AlreadyAccepted,

    #[error("input ended before acceptance")]
    UnexpectedEnd,
}

/// The terminal index of the end-of-input marker.
pub const EOF: u32 = 0;

#[derive(Debug)]
pub struct Parser<'t> {
    tables: &'t ParserTables,
    /// State numbers, with pending fused-reduce codes riding on top.
    stack: Vec<u32>,
    accepted: bool,
}

impl<'t> Parser<'t> {
    pub fn new(tables: &'t ParserTables) -> Self {
        Self {
            tables,
            stack: vec![0],
            accepted: false,
        }
    }

    pub fn accepted(&self) -> bool {
        self.accepted
    }

    fn max_shift(&self) -> u32 {
        self.tables.nxstate - 1
    }

    fn max_shift_reduce(&self) -> u32 {
        self.tables.codes.err_action - 1
    }

    /// Feed one terminal. `EOF` drives the final reductions and, on a
    /// well-formed input, acceptance.
    pub fn feed(&mut self, token: u32) -> Result<(), ParseError> {
        if self.accepted {
            return Err(ParseError::AlreadyAccepted);
        }
        if token >= self.tables.nterminal {
            return Err(ParseError::InvalidToken(token));
        }

        let codes = self.tables.codes;
        let mut act = *self.stack.last().expect("start state never pops");
        loop {
            if act <= self.max_shift() {
                act = self.find_shift_action(act, token);
            }
            if act >= codes.min_reduce {
                act = self.reduce(act - codes.min_reduce);
            } else if act <= self.max_shift_reduce() {
                self.shift(act, token);
                return Ok(());
            } else if act == codes.acc_action {
                tracing::trace!("accept");
                self.accepted = true;
                return Ok(());
            } else {
                return Err(ParseError::Syntax {
                    state: *self.stack.last().expect("start state never pops"),
                    token,
                });
            }
        }
    }

    /// Feed the end-of-input marker and require acceptance.
    pub fn finish(mut self) -> Result<(), ParseError> {
        self.feed(EOF)?;
        if self.accepted {
            Ok(())
        } else {
            Err(ParseError::UnexpectedEnd)
        }
    }

    /// Terminal-row lookup with fallback retry.
    fn find_shift_action(&self, state: u32, token: u32) -> u32 {
        let t = self.tables;
        if state as usize >= t.shift_ofst.len() {
            // The trimmed trailing rows behave as all-default.
            return t.default_action[state as usize];
        }
        let mut lookahead = token;
        loop {
            let i = t.shift_ofst[state as usize] + lookahead as i32;
            // Safe-mode packing keeps this index in bounds for every
            // syntactically possible token.
            debug_assert!(i >= 0 && (i as usize) < t.lookahead.len());
            if t.lookahead[i as usize] == lookahead {
                return t.action[i as usize];
            }
            if !t.fallback.is_empty() {
                let fb = t.fallback[lookahead as usize];
                if fb != 0 {
                    tracing::trace!(from = lookahead, to = fb, "fallback");
                    debug_assert_eq!(t.fallback[fb as usize], 0, "fallback loop");
                    lookahead = fb;
                    continue;
                }
            }
            return t.default_action[state as usize];
        }
    }

    /// Nonterminal-row lookup for the goto after a reduce.
    fn find_reduce_action(&self, state: u32, lookahead: u32) -> u32 {
        let t = self.tables;
        if state as usize >= t.reduce_ofst.len() {
            return t.default_action[state as usize];
        }
        let i = t.reduce_ofst[state as usize] + lookahead as i32;
        // Entries of a packed row always sit below the trimmed action
        // count; anything past it is padding.
        if i < 0 || i as usize >= t.action.len() || t.lookahead[i as usize] != lookahead {
            return t.default_action[state as usize];
        }
        t.action[i as usize]
    }

    fn shift(&mut self, mut act: u32, token: u32) {
        // A fused shift-reduce code is stored as the reduce it will
        // perform once the next step picks it back up.
        if act > self.max_shift() {
            act += self.tables.codes.min_reduce - self.tables.codes.min_shift_reduce;
        }
        tracing::trace!(state = act, token, "shift");
        self.stack.push(act);
    }

    /// Pop the rule's RHS, take the goto on its LHS, and leave the result
    /// on the stack. Returns the goto action so chained reductions
    /// continue in the caller's loop.
    fn reduce(&mut self, rule: u32) -> u32 {
        let t = self.tables;
        let nrhs = t.rule_nrhs[rule as usize] as usize;
        let lhs = t.rule_lhs[rule as usize];
        tracing::trace!(rule, nrhs, "reduce");

        let new_len = self.stack.len() - nrhs;
        self.stack.truncate(new_len);
        let top = *self.stack.last().expect("start state never pops");
        let act = self.find_reduce_action(top, lhs);

        // Nonterminal rows never hold fused codes; the generator splices
        // those into plain reduces. A reduce is never followed by error.
        debug_assert!(!(act > self.max_shift() && act <= self.max_shift_reduce()));
        debug_assert_ne!(act, t.codes.err_action);

        self.stack.push(act);
        act
    }
}

/// Run a whole token sequence (without the end marker) through a fresh
/// parser and report whether the tables accept it.
pub fn accepts(tables: &ParserTables, tokens: &[u32]) -> bool {
    let mut parser = Parser::new(tables);
    for &token in tokens {
        if parser.feed(token).is_err() {
            return false;
        }
    }
    parser.finish().is_ok()
}
