//! Variant identity, the concurrent intern table, and the resolved output.

use std::sync::RwLock;

use petgraph::graph::NodeIndex;
use serde::Serialize;
use smallvec::SmallVec;

use sanvar_core::types::collections::FxHashMap;
use sanvar_core::types::{LinkKind, MemtagLevel, ModuleKind, SanitizerSet};

/// What distinguishes one build of a module from another: the propagated
/// sanitizer set plus any inherited UBSan subset names.
///
/// A module's own module-local kinds are deliberately not part of its key.
/// Full/subset UBSan color the base variant in place, so a library that
/// requests `undefined` still builds under its plain name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct VariantKey {
    pub set: SanitizerSet,
    /// Whole-static-inherited UBSan subset names, sorted and deduplicated.
    pub misc_subsets: Vec<String>,
}

impl VariantKey {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(set: SanitizerSet) -> Self {
        Self { set, misc_subsets: Vec::new() }
    }

    pub fn with_subsets(set: SanitizerSet, mut misc_subsets: Vec<String>) -> Self {
        misc_subsets.sort();
        misc_subsets.dedup();
        Self { set, misc_subsets }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.misc_subsets.is_empty()
    }

    /// Name suffix for this key, e.g. `"_asan"`. The key's sanitizer set
    /// alone determines it; inherited subset names share the UBSan suffix.
    pub fn suffix(&self) -> String {
        self.set.suffix()
    }
}

/// Index of a materialized variant within a [`ResolvedGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VariantId(pub u32);

/// One materialized build of a module.
#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    #[serde(skip)]
    pub module: NodeIndex,
    pub module_name: String,
    pub kind: ModuleKind,
    pub key: VariantKey,
    /// Module-local kinds active on this variant (full/subset UBSan
    /// resolved on the module itself).
    pub local: SanitizerSet,
    /// UBSan subset names in effect: the module's own plus any inherited
    /// through the key. Sorted and deduplicated.
    pub misc_subsets: Vec<String>,
    /// Link-time dependencies, resolved to variants. Includes injected
    /// runtime libraries.
    pub deps: SmallVec<[(VariantId, LinkKind); 8]>,
    /// Minimal UBSan runtime attached at this link.
    pub minimal_runtime: bool,
    /// Memory-tagging strength. Always `None` for libraries.
    pub memtag: MemtagLevel,
    /// Shared-library variants this executable or shared library pulls
    /// into the install image, transitively. Empty for static libraries.
    pub install_deps: Vec<VariantId>,
}

impl Variant {
    /// The variant's build name: module name plus key suffix.
    pub fn name(&self) -> String {
        format!("{}{}", self.module_name, self.key.suffix())
    }

    /// All sanitizer kinds active on this variant's compilation.
    pub fn active(&self) -> SanitizerSet {
        self.key.set.union(self.local)
    }

    pub fn links_to(&self, id: VariantId, link: LinkKind) -> bool {
        self.deps.iter().any(|(d, l)| *d == id && *l == link)
    }
}

/// Concurrent variant intern table. Insert-if-absent: the first caller to
/// request a (module, key) pair allocates its id, later callers observe it.
#[derive(Default)]
pub struct VariantStore {
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    ids: FxHashMap<(NodeIndex, VariantKey), VariantId>,
    keys: Vec<(NodeIndex, VariantKey)>,
}

impl VariantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, module: NodeIndex, key: VariantKey) -> VariantId {
        let probe = (module, key);
        if let Ok(inner) = self.inner.read() {
            if let Some(id) = inner.ids.get(&probe) {
                return *id;
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(id) = inner.ids.get(&probe) {
            return *id;
        }
        let id = VariantId(inner.keys.len() as u32);
        inner.keys.push(probe.clone());
        inner.ids.insert(probe, id);
        id
    }

    pub fn get(&self, module: NodeIndex, key: &VariantKey) -> Option<VariantId> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.ids.get(&(module, key.clone())).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all interned (module, key) pairs in id order.
    pub fn entries(&self) -> Vec<(NodeIndex, VariantKey)> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).keys.clone()
    }

    /// The pair behind one id, if allocated.
    pub fn entry(&self, index: usize) -> Option<(NodeIndex, VariantKey)> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.keys.get(index).cloned()
    }

    pub fn into_index(self) -> FxHashMap<(NodeIndex, VariantKey), VariantId> {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner()).ids
    }
}

/// The fully materialized variant graph.
#[derive(Debug, Serialize)]
pub struct ResolvedGraph {
    variants: Vec<Variant>,
    #[serde(skip)]
    ids: FxHashMap<(NodeIndex, VariantKey), VariantId>,
}

impl ResolvedGraph {
    pub(crate) fn new(
        variants: Vec<Variant>,
        ids: FxHashMap<(NodeIndex, VariantKey), VariantId>,
    ) -> Self {
        Self { variants, ids }
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, id: VariantId) -> &Variant {
        &self.variants[id.0 as usize]
    }

    pub fn id_for(&self, module: NodeIndex, key: &VariantKey) -> Option<VariantId> {
        self.ids.get(&(module, key.clone())).copied()
    }

    /// Look up a variant by module name and key suffix (`""` for the base
    /// variant).
    pub fn find(&self, module_name: &str, suffix: &str) -> Option<&Variant> {
        self.find_id(module_name, suffix).map(|id| self.variant(id))
    }

    pub fn find_id(&self, module_name: &str, suffix: &str) -> Option<VariantId> {
        self.variants
            .iter()
            .position(|v| v.module_name == module_name && v.key.suffix() == suffix)
            .map(|i| VariantId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanvar_core::types::SanitizerKind;

    #[test]
    fn intern_is_idempotent() {
        let store = VariantStore::new();
        let node = NodeIndex::new(0);
        let key = VariantKey::new(
            [SanitizerKind::Address].into_iter().collect(),
        );

        let a = store.intern(node, key.clone());
        let b = store.intern(node, key.clone());
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(node, &key), Some(a));
    }

    #[test]
    fn subsets_normalize() {
        let key = VariantKey::with_subsets(
            SanitizerSet::EMPTY,
            vec!["integer".into(), "bool".into(), "integer".into()],
        );
        assert_eq!(key.misc_subsets, vec!["bool".to_string(), "integer".to_string()]);
    }

    #[test]
    fn distinct_keys_get_distinct_ids() {
        let store = VariantStore::new();
        let node = NodeIndex::new(0);
        let plain = store.intern(node, VariantKey::empty());
        let asan = store.intern(
            node,
            VariantKey::new([SanitizerKind::Address].into_iter().collect()),
        );
        assert_ne!(plain, asan);
        assert_eq!(store.len(), 2);
    }
}
