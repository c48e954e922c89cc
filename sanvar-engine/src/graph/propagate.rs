//! Two-phase variant propagation.
//!
//! Phase 1 computes the closure of required (module, key) pairs as a
//! fixed point: every module's own base key seeds the worklist, and each
//! dependency edge maps a consumer key to the dependency key it demands.
//! Phase 2 materializes exactly one variant per required pair, rewrites
//! dependency edges to point at variants, injects sanitizer runtime
//! libraries at final links, and derives install dependencies.
//!
//! The edge rules are per kind and per link type:
//!
//! * `shared_libs`: the dependency keeps its own base key; only kinds
//!   that propagate through shared linking (fuzzer) are added on top.
//! * `static_libs`: consumer-driven. The dependency's variant carries
//!   exactly the consumer's propagating kinds (address, thread, fuzzer),
//!   minus anything the dependency explicitly disabled.
//! * `whole_static_libs`: full inheritance. The consumer's entire active
//!   coloring, module-local kinds included, flows into the dependency,
//!   minus explicit opt-outs; UBSan subset names travel along.

use std::collections::{BTreeSet, VecDeque};

use petgraph::graph::NodeIndex;
use smallvec::SmallVec;

use sanvar_core::errors::{EngineError, GraphError, ResolveError};
use sanvar_core::types::collections::FxHashSet;
use sanvar_core::types::{LinkKind, MemtagLevel, ModuleKind, SanitizerKind, SanitizerSet};

use crate::module::ModuleDecl;
use crate::resolve::SanitizerResolver;

use super::runtime::{runtime_for, UBSAN_MINIMAL_RUNTIME, UBSAN_STANDALONE_RUNTIME};
use super::types::ModuleGraph;
use super::variants::{ResolvedGraph, Variant, VariantId, VariantKey, VariantStore};

pub struct PropagationEngine<'a> {
    graph: &'a ModuleGraph,
    resolver: &'a SanitizerResolver<'a>,
}

impl<'a> PropagationEngine<'a> {
    pub fn new(graph: &'a ModuleGraph, resolver: &'a SanitizerResolver<'a>) -> Self {
        Self { graph, resolver }
    }

    pub fn run(&self) -> Result<ResolvedGraph, EngineError> {
        let required = self.required_variants()?;
        tracing::debug!(
            modules = self.graph.len(),
            variants = required.len(),
            "variant closure reached fixed point"
        );

        let store = VariantStore::new();
        for (idx, key) in &required {
            store.intern(*idx, key.clone());
        }

        let mut variants = self.materialize(&store)?;
        self.compute_install_deps(&mut variants);

        Ok(ResolvedGraph::new(variants, store.into_index()))
    }

    /// Phase 1: fixed point over (module, key) requirements.
    fn required_variants(&self) -> Result<BTreeSet<(NodeIndex, VariantKey)>, EngineError> {
        let mut required = BTreeSet::new();
        let mut work = VecDeque::new();

        for idx in self.graph.sorted_indices() {
            let key = self.base_key(idx)?;
            if required.insert((idx, key.clone())) {
                work.push_back((idx, key));
            }
        }

        while let Some((idx, key)) = work.pop_front() {
            for (dep_idx, link) in self.graph.dependencies(idx) {
                let dep_key = self.dep_key(idx, &key, dep_idx, link)?;
                if required.insert((dep_idx, dep_key.clone())) {
                    work.push_back((dep_idx, dep_key));
                }
            }
        }

        Ok(required)
    }

    /// A module's own key: its variant-forming kinds, no inherited subsets.
    fn base_key(&self, idx: NodeIndex) -> Result<VariantKey, ResolveError> {
        let set = self.resolver.base_set(self.graph.module(idx))?;
        Ok(VariantKey::new(set))
    }

    /// The key a consumer variant demands of one dependency.
    fn dep_key(
        &self,
        consumer_idx: NodeIndex,
        consumer_key: &VariantKey,
        dep_idx: NodeIndex,
        link: LinkKind,
    ) -> Result<VariantKey, ResolveError> {
        let dep = self.graph.module(dep_idx);
        match link {
            LinkKind::Shared => {
                // Shared dependencies keep their own coloring; only
                // shared-propagating kinds are layered on top (a fuzzing
                // link needs every DSO hooked).
                let mut set = self.resolver.base_set(dep)?;
                for kind in consumer_key.set.iter() {
                    if kind.propagates_shared() && !dep.explicitly_disabled(kind) {
                        set.insert(kind);
                    }
                }
                Ok(VariantKey::new(set))
            }
            LinkKind::Static => {
                let mut set = SanitizerSet::EMPTY;
                for kind in consumer_key.set.iter() {
                    if kind.propagates_static() && !dep.explicitly_disabled(kind) {
                        set.insert(kind);
                    }
                }
                Ok(VariantKey::new(set))
            }
            LinkKind::WholeStatic => {
                let consumer = self.graph.module(consumer_idx);
                let consumer_local = self.resolver.local_set(consumer)?;
                let mut set = SanitizerSet::EMPTY;
                for kind in consumer_key.set.union(consumer_local).iter() {
                    if !dep.explicitly_disabled(kind) {
                        set.insert(kind);
                    }
                }
                let mut subsets = consumer_key.misc_subsets.clone();
                if consumer_local.contains(SanitizerKind::MiscUndefined) {
                    subsets.extend(consumer.sanitize.misc_undefined.iter().cloned());
                }
                if !set.contains(SanitizerKind::MiscUndefined) {
                    subsets.clear();
                }
                Ok(VariantKey::with_subsets(set, subsets))
            }
        }
    }

    /// Phase 2: one variant per interned pair, edges rewritten to ids.
    ///
    /// Runtime injection may intern runtime-library variants mid-pass, so
    /// the loop reads the store by index until it stops growing; every id
    /// handed out ends up with a variant.
    fn materialize(&self, store: &VariantStore) -> Result<Vec<Variant>, EngineError> {
        let mut variants = Vec::with_capacity(store.len());
        let mut i = 0;
        while let Some((idx, key)) = store.entry(i) {
            let module = self.graph.module(idx);
            let local = self.resolver.local_set(module)?;

            let mut deps: SmallVec<[(VariantId, LinkKind); 8]> = SmallVec::new();
            for (dep_idx, link) in self.graph.dependencies(idx) {
                let dep_key = self.dep_key(idx, &key, dep_idx, link)?;
                // Phase 1 walked the same closure, so this is a lookup.
                deps.push((store.intern(dep_idx, dep_key), link));
            }

            let mut minimal_runtime = false;
            if module.kind.is_final_link() {
                self.inject_runtimes(
                    module,
                    idx,
                    &key,
                    local,
                    store,
                    &mut deps,
                    &mut minimal_runtime,
                )?;
            }

            let mut misc_subsets = key.misc_subsets.clone();
            if local.contains(SanitizerKind::MiscUndefined) {
                misc_subsets.extend(module.sanitize.misc_undefined.iter().cloned());
            }
            misc_subsets.sort();
            misc_subsets.dedup();

            let memtag = if module.kind.is_executable() {
                self.resolver.memtag_level(module)
            } else {
                MemtagLevel::None
            };

            variants.push(Variant {
                module: idx,
                module_name: module.name.clone(),
                kind: module.kind,
                key,
                local,
                misc_subsets,
                deps,
                minimal_runtime,
                memtag,
                install_deps: Vec::new(),
            });
            i += 1;
        }
        Ok(variants)
    }

    #[allow(clippy::too_many_arguments)]
    fn inject_runtimes(
        &self,
        module: &ModuleDecl,
        idx: NodeIndex,
        key: &VariantKey,
        local: SanitizerSet,
        store: &VariantStore,
        deps: &mut SmallVec<[(VariantId, LinkKind); 8]>,
        minimal_runtime: &mut bool,
    ) -> Result<(), EngineError> {
        let active = key.set.union(local);
        for kind in active.iter() {
            let Some(rt) = runtime_for(kind) else { continue };
            if rt.executables_only && !module.kind.is_executable() {
                continue;
            }
            // Runtime libraries never sanitize themselves.
            if module.name == rt.library {
                continue;
            }
            let (rt_idx, rt_key) = self.runtime_variant(rt.library, &module.name)?;
            let id = store.intern(rt_idx, rt_key);
            if !deps.iter().any(|(d, l)| *d == id && *l == rt.link) {
                deps.push((id, rt.link));
            }
        }

        // Which UBSan runtime attaches depends on the whole static
        // closure, not just this module: undefined-behavior checks in any
        // statically linked input surface at this link.
        let (any_ubsan, any_diag) = self.ubsan_in_static_closure(idx, key)?;
        if any_ubsan {
            let (library, link) = if any_diag {
                (UBSAN_STANDALONE_RUNTIME, LinkKind::Shared)
            } else {
                (UBSAN_MINIMAL_RUNTIME, LinkKind::Static)
            };
            if module.name != library {
                let (rt_idx, rt_key) = self.runtime_variant(library, &module.name)?;
                let id = store.intern(rt_idx, rt_key);
                if !deps.iter().any(|(d, l)| *d == id && *l == link) {
                    deps.push((id, link));
                }
                *minimal_runtime = !any_diag;
            }
        }
        Ok(())
    }

    /// Locate a runtime library module and the key of its plain build.
    fn runtime_variant(
        &self,
        library: &str,
        consumer: &str,
    ) -> Result<(NodeIndex, VariantKey), EngineError> {
        let idx = self
            .graph
            .index_of(library)
            .ok_or_else(|| GraphError::MissingRuntime {
                module: consumer.to_string(),
                runtime: library.to_string(),
            })?;
        Ok((idx, self.base_key(idx)?))
    }

    /// Scan this variant and everything statically reachable from it for
    /// active UBSan, and whether any of it requested diagnostics. Shared
    /// edges are not followed: a DSO carries its own runtime.
    fn ubsan_in_static_closure(
        &self,
        idx: NodeIndex,
        key: &VariantKey,
    ) -> Result<(bool, bool), EngineError> {
        let mut any_ubsan = false;
        let mut any_diag = false;
        let mut seen: FxHashSet<(NodeIndex, VariantKey)> = FxHashSet::default();
        let mut work = vec![(idx, key.clone())];
        seen.insert((idx, key.clone()));

        while let Some((n, k)) = work.pop() {
            let module = self.graph.module(n);
            let local = self.resolver.local_set(module)?;
            let active = k.set.union(local);
            if active.contains(SanitizerKind::Undefined)
                || active.contains(SanitizerKind::MiscUndefined)
            {
                any_ubsan = true;
                if local.contains(SanitizerKind::Undefined)
                    && self.resolver.resolve(module, SanitizerKind::Undefined)?.diag
                {
                    any_diag = true;
                }
            }
            for (dep_idx, link) in self.graph.dependencies(n) {
                if link == LinkKind::Shared {
                    continue;
                }
                let dep_key = self.dep_key(n, &k, dep_idx, link)?;
                if seen.insert((dep_idx, dep_key.clone())) {
                    work.push((dep_idx, dep_key));
                }
            }
        }
        Ok((any_ubsan, any_diag))
    }

    /// Phase 2, last step: install dependencies. A final link installs
    /// every shared-library variant transitively reachable through its
    /// rewritten edges, injected runtimes included.
    fn compute_install_deps(&self, variants: &mut [Variant]) {
        let mut computed: Vec<Vec<VariantId>> = Vec::with_capacity(variants.len());
        for variant in variants.iter() {
            if !variant.kind.is_final_link() {
                computed.push(Vec::new());
                continue;
            }
            let mut install = Vec::new();
            let mut seen: FxHashSet<VariantId> = FxHashSet::default();
            let mut work: Vec<VariantId> =
                variant.deps.iter().map(|(id, _)| *id).collect();
            while let Some(id) = work.pop() {
                if !seen.insert(id) {
                    continue;
                }
                let dep = &variants[id.0 as usize];
                if dep.kind == ModuleKind::SharedLibrary {
                    install.push(id);
                }
                work.extend(dep.deps.iter().map(|(d, _)| *d));
            }
            install.sort();
            computed.push(install);
        }
        for (variant, install) in variants.iter_mut().zip(computed) {
            variant.install_deps = install;
        }
    }
}
