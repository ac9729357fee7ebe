//! Shared collection aliases.

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub(crate) type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub(crate) type Set<T> = indexmap::IndexSet<T, BuildHasher>;
