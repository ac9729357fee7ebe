//! Packing of per-state action rows into one flat array.
//!
//! The final table maps `(state, lookahead)` to an action code: each state
//! gets an offset, and `actions[offset + lookahead]` holds the entry,
//! guarded by a stored lookahead that must match at runtime. Rows are
//! placed by an offset-overlap search so that entries of different states
//! interleave and share slots wherever their contents agree.

/// One slot of the packed table: the guard lookahead and the action code.
/// Negative values mark an unused slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Slot {
    pub lookahead: i32,
    pub action: i32,
}

const EMPTY: Slot = Slot {
    lookahead: -1,
    action: -1,
};

/// The action table under construction.
///
/// All actions of a single state are first staged with `add_action`, then
/// committed with a single `insert` call, which also resets the staging
/// area for the next state.
#[derive(Debug)]
pub(crate) struct ActTab {
    /// The packed table; slots past `n_action` are preallocated spares.
    slots: Vec<Slot>,
    /// Number of slots actually in use.
    n_action: usize,
    /// The staged row for one state.
    staged: Vec<Slot>,
    mn_lookahead: i32,
    mn_action: i32,
    mx_lookahead: i32,
    nsymbol: usize,
    nterminal: usize,
}

impl ActTab {
    pub(crate) fn new(nsymbol: usize, nterminal: usize) -> Self {
        Self {
            slots: Vec::new(),
            n_action: 0,
            staged: Vec::new(),
            mn_lookahead: 0,
            mn_action: 0,
            mx_lookahead: 0,
            nsymbol,
            nterminal,
        }
    }

    /// Stage one action of the current state.
    pub(crate) fn add_action(&mut self, lookahead: u32, action: i32) {
        let lookahead = lookahead as i32;
        if self.staged.is_empty() {
            self.mx_lookahead = lookahead;
            self.mn_lookahead = lookahead;
            self.mn_action = action;
        } else {
            self.mx_lookahead = self.mx_lookahead.max(lookahead);
            if self.mn_lookahead > lookahead {
                self.mn_lookahead = lookahead;
                self.mn_action = action;
            }
        }
        self.staged.push(Slot { lookahead, action });
    }

    /// Commit the staged row into the table and return the offset that,
    /// added to a lookahead, yields the row's slots.
    ///
    /// In safe mode the candidate offsets start at the row's minimum
    /// lookahead and the used size is padded past `offset + nterminal`,
    /// so the runtime can never index below or beyond the table for any
    /// syntactically valid token. Safe mode is used for terminal rows;
    /// nonterminal lookaheads never hold syntax errors, so their rows
    /// pack tighter without it.
    pub(crate) fn insert(&mut self, make_it_safe: bool) -> i32 {
        assert!(!self.staged.is_empty());

        // Worst case the row is appended to the current end.
        let reserve = self.n_action + self.nsymbol + 21;
        if self.slots.len() < reserve {
            self.slots.resize(reserve, EMPTY);
        }

        let floor = if make_it_safe { self.mn_lookahead } else { 0 };
        let place = self
            .find_overlap(floor)
            .unwrap_or_else(|| self.find_hole(floor));

        // Write the row at the chosen position.
        for j in 0..self.staged.len() {
            let slot = self.staged[j];
            let k = (slot.lookahead - self.mn_lookahead + place) as usize;
            self.slots[k] = slot;
            if k >= self.n_action {
                self.n_action = k + 1;
            }
        }
        if make_it_safe && place as usize + self.nterminal >= self.n_action {
            self.n_action = place as usize + self.nterminal + 1;
        }
        if self.n_action > self.slots.len() {
            self.slots.resize(self.n_action, EMPTY);
        }
        self.staged.clear();

        place - self.mn_lookahead
    }

    /// Scan right-to-left for a position where the staged row coincides
    /// with entries already in the table.
    fn find_overlap(&self, floor: i32) -> Option<i32> {
        let mut i = self.n_action as i32 - 1;
        while i >= floor {
            let candidate = self.slots[i as usize];
            if candidate.lookahead == self.mn_lookahead && candidate.action == self.mn_action {
                // Every staged entry must match the table at this offset.
                let matches = self.staged.iter().all(|slot| {
                    let k = slot.lookahead - self.mn_lookahead + i;
                    (0..self.n_action as i32).contains(&k) && self.slots[k as usize] == *slot
                });
                if matches {
                    // And no defined entry outside the staged row may
                    // alias as a phantom match at this offset.
                    let aliased = (0..self.n_action as i32)
                        .filter(|&j| {
                            let slot = self.slots[j as usize];
                            slot.lookahead >= 0 && slot.lookahead == j + self.mn_lookahead - i
                        })
                        .count();
                    if aliased == self.staged.len() {
                        return Some(i);
                    }
                }
            }
            i -= 1;
        }
        None
    }

    /// Scan left-to-right for the first run of free slots that fits the
    /// staged row without creating phantom matches.
    fn find_hole(&mut self, floor: i32) -> i32 {
        let mut i = floor;
        loop {
            if i as usize >= self.slots.len() - self.mx_lookahead as usize {
                let grown = self.slots.len() + self.nsymbol + 21;
                self.slots.resize(grown, EMPTY);
            }
            if self.slots[i as usize].lookahead < 0 {
                let fits = self.staged.iter().all(|slot| {
                    let k = slot.lookahead - self.mn_lookahead + i;
                    k >= 0 && self.slots[k as usize].lookahead < 0
                });
                let phantom = (0..self.n_action as i32).any(|j| {
                    self.slots[j as usize].lookahead == j + self.mn_lookahead - i
                });
                if fits && !phantom {
                    return i;
                }
            }
            i += 1;
        }
    }

    /// Size of the action table without the trailing unused entries.
    pub(crate) fn action_size(&self) -> usize {
        let mut n = self.n_action;
        while n > 0 && self.slots[n - 1].lookahead < 0 {
            n -= 1;
        }
        n
    }

    /// Size of the lookahead table, including safe-mode padding.
    pub(crate) fn lookahead_size(&self) -> usize {
        self.n_action
    }

    pub(crate) fn slot(&self, i: usize) -> Slot {
        self.slots[i]
    }
}
