//! Grammar symbols and terminal sets.

use crate::intern::{Interner, NameId};
use crate::types::Map;
use std::fmt;

/// A set of terminal symbols, indexed by final terminal index.
///
/// The `insert`/`union_with_changed` return values report whether any bit
/// transitioned from zero to one; the FIRST-set and follow-set fixpoints
/// terminate on that signal.
#[derive(Debug, Default, Clone)]
pub struct TermSet {
    inner: bit_set::BitSet,
}

impl TermSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.inner.contains(index as usize)
    }

    pub fn insert(&mut self, index: u32) -> bool {
        self.inner.insert(index as usize)
    }

    pub fn union_with_changed(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.inner.iter().map(|raw| raw as u32)
    }
}

impl FromIterator<u32> for TermSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        Self {
            inner: iter.into_iter().map(|t| t as usize).collect(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// The `$` end-of-input terminal, created before any user symbol.
    pub const EOF: Self = Self(0);
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOF => write!(f, "Sym#Eof"),
            _ => write!(f, "Sym#{:03}", self.0),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
    Multiterminal,
}

impl SymbolKind {
    /// Sort rank: terminals first, then nonterminals, multiterminals last.
    fn rank(self) -> u8 {
        match self {
            Self::Terminal => 1,
            Self::Nonterminal => 2,
            Self::Multiterminal => 3,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
    Unknown,
}

/// A fragment of user-supplied action text, routed but never evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeFragment {
    pub text: String,
    pub line: u32,
}

/// Precedence not yet assigned.
pub const NO_PREC: i32 = -1;

#[derive(Debug)]
pub struct Symbol {
    pub name: NameId,
    pub kind: SymbolKind,
    /// Final table index, assigned once all symbols are known.
    pub index: u32,
    pub prec: i32,
    pub assoc: Assoc,
    pub use_count: u32,
    /// FIRST set over terminal indices. Nonterminals only.
    pub first: TermSet,
    /// Whether this symbol derives the empty string. Nonterminals only.
    pub nullable: bool,
    /// Rules with this symbol as LHS, in declaration order.
    pub rules: Vec<crate::grammar::RuleId>,
    /// Member terminals of a `%token_class`. Multiterminals only.
    pub subsymbols: Vec<SymbolId>,
    pub fallback: Option<SymbolId>,
    pub destructor: Option<CodeFragment>,
    pub datatype: Option<String>,
    pub dtnum: u32,
    /// True when some rule action references this symbol's value.
    pub carries_content: bool,
}

impl Symbol {
    fn new(name: NameId, kind: SymbolKind) -> Self {
        Self {
            name,
            kind,
            index: u32::MAX,
            prec: NO_PREC,
            assoc: Assoc::Unknown,
            use_count: 0,
            first: TermSet::new(),
            nullable: false,
            rules: Vec::new(),
            subsymbols: Vec::new(),
            fallback: None,
            destructor: None,
            datatype: None,
            dtnum: 0,
            carries_content: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Terminal)
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Nonterminal)
    }

    pub fn is_multiterminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Multiterminal)
    }
}

/// Two symbols shift alike if they are the same symbol, or both are
/// multiterminals with identical member sequences.
pub(crate) fn same_symbol(table: &SymbolTable, a: SymbolId, b: SymbolId) -> bool {
    if a == b {
        return true;
    }
    let (sa, sb) = (table.symbol(a), table.symbol(b));
    sa.is_multiterminal() && sb.is_multiterminal() && sa.subsymbols == sb.subsymbols
}

/// The symbol store, keyed by interned name.
#[derive(Debug)]
pub struct SymbolTable {
    interner: Interner,
    symbols: Vec<Symbol>,
    by_name: Map<NameId, SymbolId>,
    /// Symbols in final index order; valid after `assign_indices`.
    by_index: Vec<SymbolId>,
    nsymbol: u32,
    nterminal: u32,
    default_symbol: Option<SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            interner: Interner::default(),
            symbols: Vec::new(),
            by_name: Map::default(),
            by_index: Vec::new(),
            nsymbol: 0,
            nterminal: 0,
            default_symbol: None,
        };
        // "$" marks end of input; it must end up with terminal index 0.
        let eof = table.insert("$", SymbolKind::Terminal);
        debug_assert_eq!(eof, SymbolId::EOF);
        table
    }

    fn insert(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        let name = self.interner.intern(name);
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol::new(name, kind));
        self.by_name.insert(name, id);
        id
    }

    /// Look up a symbol by name, creating it on first sight.
    ///
    /// A freshly created symbol is classified by its leading character:
    /// uppercase means terminal, anything else nonterminal. Grammar names
    /// are ASCII-only.
    pub fn get_or_create(&mut self, name: &str) -> SymbolId {
        let id = match self.interner.get(name).and_then(|n| self.by_name.get(&n)) {
            Some(&id) => id,
            None => {
                let kind = if name.as_bytes().first().is_some_and(u8::is_ascii_uppercase) {
                    SymbolKind::Terminal
                } else {
                    SymbolKind::Nonterminal
                };
                self.insert(name, kind)
            }
        };
        self.symbols[id.0 as usize].use_count += 1;
        id
    }

    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.interner.get(name).and_then(|n| self.by_name.get(&n)).copied()
    }

    /// Reclassify a symbol as a `%token_class` multiterminal.
    pub(crate) fn make_multiterminal(&mut self, id: SymbolId) {
        self.symbols[id.0 as usize].kind = SymbolKind::Multiterminal;
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        self.interner.resolve(self.symbols[id.0 as usize].name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SymbolId> {
        (0..self.symbols.len() as u32).map(SymbolId)
    }

    /// Sort the symbols and assign final indices.
    ///
    /// Terminals occupy `[0, nterminal)`, nonterminals
    /// `[nterminal, nsymbol)`, and multiterminals come after; within a
    /// class the original declaration order is kept, which experimentally
    /// gives the smallest tables. The synthetic `{default}` nonterminal is
    /// inserted here so that its index equals `nsymbol`, marking the
    /// boundary between nonterminals and multiterminals.
    pub(crate) fn assign_indices(&mut self) {
        let default_symbol = self.insert("{default}", SymbolKind::Nonterminal);
        self.default_symbol = Some(default_symbol);

        let mut order: Vec<SymbolId> = (0..self.symbols.len() as u32).map(SymbolId).collect();
        order.sort_by_key(|&id| (self.symbols[id.0 as usize].kind.rank(), id.0));

        for (index, &id) in order.iter().enumerate() {
            self.symbols[id.0 as usize].index = index as u32;
        }
        self.nterminal = order
            .iter()
            .filter(|&&id| self.symbols[id.0 as usize].is_terminal())
            .count() as u32;
        self.nsymbol = self.symbols[default_symbol.0 as usize].index;
        self.by_index = order;
    }

    /// Count of real symbols; excludes `{default}` and any multiterminals.
    pub fn nsymbol(&self) -> u32 {
        self.nsymbol
    }

    pub fn nterminal(&self) -> u32 {
        self.nterminal
    }

    /// The synthetic `{default}` lookahead used for default reductions.
    pub fn default_symbol(&self) -> SymbolId {
        self.default_symbol.expect("indices not assigned yet")
    }

    pub fn by_index(&self, index: u32) -> SymbolId {
        self.by_index[index as usize]
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_set_reports_changes() {
        let mut a = TermSet::new();
        assert!(a.insert(3));
        assert!(!a.insert(3));

        let b: TermSet = [1, 3].into_iter().collect();
        assert!(a.union_with_changed(&b));
        assert!(!a.union_with_changed(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn classification_by_leading_character() {
        let mut table = SymbolTable::new();
        let plus = table.get_or_create("PLUS");
        let expr = table.get_or_create("expr");
        assert!(table.symbol(plus).is_terminal());
        assert!(table.symbol(expr).is_nonterminal());
        assert_eq!(table.get_or_create("PLUS"), plus);
        assert_eq!(table.symbol(plus).use_count, 2);
    }

    #[test]
    fn index_assignment_orders_kinds() {
        let mut table = SymbolTable::new();
        let expr = table.get_or_create("expr");
        let plus = table.get_or_create("PLUS");
        let num = table.get_or_create("NUM");
        let class = table.get_or_create("ints");
        table.make_multiterminal(class);
        table.assign_indices();

        // $ first, then terminals in declaration order.
        assert_eq!(table.symbol(SymbolId::EOF).index, 0);
        assert_eq!(table.symbol(plus).index, 1);
        assert_eq!(table.symbol(num).index, 2);
        assert_eq!(table.nterminal(), 3);
        // Nonterminals follow, {default} closes the range.
        assert_eq!(table.symbol(expr).index, 3);
        assert_eq!(table.nsymbol(), 4);
        assert_eq!(table.symbol(table.default_symbol()).index, 4);
        // The multiterminal sorts after {default}.
        assert_eq!(table.symbol(class).index, 5);
        assert_eq!(table.by_index(1), plus);
    }
}
