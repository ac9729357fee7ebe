//! LALR(1) follow-set propagation.
//!
//! Successor construction records back-links; those are inverted once into
//! forward links, and a fixpoint then flows each item's follow set along
//! its forward links until a full pass makes no change.

use crate::lr0::{Automaton, CfgStatus, ConfigId};
use crate::util::get_two_mut;

/// Convert the back-propagation links into forward links. Only forward
/// links are used by the follow-set computation.
pub(crate) fn find_links(aut: &mut Automaton) {
    for i in 0..aut.configs.len() {
        let links = aut.configs[i].bplp.clone();
        for other in links {
            aut.configs[other.index()].fplp.push(ConfigId::from_index(i));
        }
    }
}

/// Compute the follow set of every configuration.
pub(crate) fn find_follow_sets(aut: &mut Automaton) {
    for config in &mut aut.configs {
        config.status = CfgStatus::Incomplete;
    }

    let mut progress = true;
    while progress {
        progress = false;
        for i in 0..aut.configs.len() {
            if aut.configs[i].status == CfgStatus::Complete {
                continue;
            }
            for k in 0..aut.configs[i].fplp.len() {
                let target = aut.configs[i].fplp[k].index();
                if target == i {
                    continue;
                }
                let (config, other) = get_two_mut(&mut aut.configs, i, target);
                if other.fws.union_with_changed(&config.fws) {
                    other.status = CfgStatus::Incomplete;
                    progress = true;
                }
            }
            aut.configs[i].status = CfgStatus::Complete;
        }
    }
}
