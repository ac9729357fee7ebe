//! Interned identifier storage.
//!
//! Every symbol and alias name is interned exactly once; the returned
//! handle is the sole identity for the name thereafter, so name equality
//! is handle equality.

use crate::types::Set;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameId(u32);

impl fmt::Debug for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name#{:03}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Interner {
    names: Set<Box<str>>,
}

impl Interner {
    pub fn intern(&mut self, name: &str) -> NameId {
        match self.names.get_index_of(name) {
            Some(i) => NameId(i as u32),
            None => {
                let (i, _) = self.names.insert_full(name.into());
                NameId(i as u32)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<NameId> {
        self.names.get_index_of(name).map(|i| NameId(i as u32))
    }

    pub fn resolve(&self, id: NameId) -> &str {
        &self.names[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_share_a_handle() {
        let mut interner = Interner::default();
        let a = interner.intern("expr");
        let b = interner.intern("term");
        let c = interner.intern("expr");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "expr");
        assert_eq!(interner.resolve(b), "term");
        assert_eq!(interner.get("term"), Some(b));
        assert_eq!(interner.get("factor"), None);
    }
}
