//! Memory-tagging strength resolution across path policy and device-wide
//! list combinations. Each scenario pins the full truth table, including
//! the documented odd branches (an unset request with a sync diagnostic
//! sub-request and no default source resolves to None).

use sanvar_core::policy::PolicyConfig;
use sanvar_core::types::MemtagLevel::{self, Async, None as NoNote, Sync};
use sanvar_engine::{flags, resolve_graph, ModuleDecl, SanitizeDecl};

// (name suffix, module path)
const DIRS: [(&str, &str); 4] = [
    ("no_override", "subdir_no_override"),
    ("override_default_disable", "subdir_override_default_disable"),
    ("override_default_sync", "subdir_sync"),
    ("override_default_async", "subdir_async"),
];

fn memtag_policy() -> PolicyConfig {
    let mut p = PolicyConfig::new();
    p.insert_memtag_exclude("subdir_override_default_disable").unwrap();
    // The disable dir sits in both include lists too; exclusion wins.
    p.insert_memtag_sync("subdir_sync").unwrap();
    p.insert_memtag_sync("subdir_override_default_disable").unwrap();
    p.insert_memtag_async("subdir_async").unwrap();
    p.insert_memtag_async("subdir_override_default_disable").unwrap();
    p
}

fn decls() -> Vec<(&'static str, SanitizeDecl)> {
    vec![
        ("unset", SanitizeDecl::default()),
        ("no_memtag", SanitizeDecl::memtag_heap(false)),
        ("set_memtag", SanitizeDecl::memtag_heap(true)),
        ("set_memtag_set_async", SanitizeDecl::memtag_heap(true).with_diag_memtag(false)),
        ("set_memtag_set_sync", SanitizeDecl::memtag_heap(true).with_diag_memtag(true)),
        ("unset_memtag_set_sync", SanitizeDecl::default().with_diag_memtag(true)),
    ]
}

fn modules() -> Vec<ModuleDecl> {
    let mut out = Vec::new();
    for (prefix, decl) in decls() {
        for (dir, path) in DIRS {
            out.push(
                ModuleDecl::binary(format!("{prefix}_binary_{dir}"))
                    .with_path(path)
                    .with_sanitize(decl.clone()),
            );
            out.push(
                ModuleDecl::test(format!("{prefix}_test_{dir}"))
                    .with_path(path)
                    .with_sanitize(decl.clone()),
            );
        }
    }
    out
}

fn check(policy: &PolicyConfig, expected: &[(&str, [MemtagLevel; 4])]) {
    let g = resolve_graph(modules(), policy).unwrap();
    for (template, levels) in expected {
        for ((dir, _), want) in DIRS.iter().zip(levels) {
            let name = format!("{template}_{dir}");
            let v = g.find(&name, "").unwrap_or_else(|| panic!("no variant {name}"));
            assert_eq!(v.memtag, *want, "wrong memtag note on {name}");
        }
    }
}

// Table columns follow DIRS: no_override, override_default_disable,
// override_default_sync, override_default_async.

#[test]
fn memtag_with_no_device_defaults() {
    let expected = [
        ("no_memtag_binary", [NoNote, NoNote, NoNote, NoNote]),
        ("no_memtag_test", [NoNote, NoNote, NoNote, NoNote]),
        ("set_memtag_binary", [Async, Async, Sync, Async]),
        ("set_memtag_test", [Sync, Sync, Sync, Sync]),
        ("set_memtag_set_async_binary", [Async, Async, Async, Async]),
        ("set_memtag_set_async_test", [Async, Async, Async, Async]),
        ("set_memtag_set_sync_binary", [Sync, Sync, Sync, Sync]),
        ("set_memtag_set_sync_test", [Sync, Sync, Sync, Sync]),
        // A diagnostic sub-request alone is not an enable source.
        ("unset_memtag_set_sync_binary", [NoNote, NoNote, Sync, Sync]),
        ("unset_memtag_set_sync_test", [Sync, Sync, Sync, Sync]),
        ("unset_binary", [NoNote, NoNote, Sync, Async]),
        ("unset_test", [Sync, Sync, Sync, Sync]),
    ];
    check(&memtag_policy(), &expected);
}

#[test]
fn memtag_with_device_wide_default() {
    let mut policy = memtag_policy();
    policy.enable_on_device(sanvar_core::types::SanitizerKind::MemtagHeap);

    let expected = [
        ("no_memtag_binary", [NoNote, NoNote, NoNote, NoNote]),
        ("set_memtag_binary", [Async, Async, Sync, Async]),
        ("set_memtag_test", [Sync, Sync, Sync, Sync]),
        ("set_memtag_set_async_binary", [Async, Async, Async, Async]),
        ("set_memtag_set_sync_binary", [Sync, Sync, Sync, Sync]),
        // Device-wide default makes the diag sub-request effective, except
        // on excluded paths where enablement is still suppressed.
        ("unset_memtag_set_sync_binary", [Sync, NoNote, Sync, Sync]),
        ("unset_memtag_set_sync_test", [Sync, Sync, Sync, Sync]),
        ("unset_binary", [Async, NoNote, Sync, Async]),
        ("unset_test", [Sync, Sync, Sync, Sync]),
    ];
    check(&policy, &expected);
}

#[test]
fn memtag_with_device_wide_diagnostics() {
    let mut policy = memtag_policy();
    policy.enable_on_device(sanvar_core::types::SanitizerKind::MemtagHeap);
    policy.enable_diag_on_device(sanvar_core::types::SanitizerKind::MemtagHeap);

    let expected = [
        ("no_memtag_binary", [NoNote, NoNote, NoNote, NoNote]),
        // Device diagnostics upgrade defaults to Sync everywhere, but an
        // explicit async diag request still wins.
        ("set_memtag_binary", [Sync, Sync, Sync, Sync]),
        ("set_memtag_set_async_binary", [Async, Async, Async, Async]),
        ("set_memtag_set_async_test", [Async, Async, Async, Async]),
        ("set_memtag_set_sync_binary", [Sync, Sync, Sync, Sync]),
        ("unset_memtag_set_sync_binary", [Sync, NoNote, Sync, Sync]),
        ("unset_binary", [Sync, NoNote, Sync, Sync]),
        ("unset_test", [Sync, Sync, Sync, Sync]),
    ];
    check(&policy, &expected);
}

#[test]
fn memtag_note_reaches_ldflags() {
    let g = resolve_graph(modules(), &memtag_policy()).unwrap();

    let sync = flags::emit(g.find("unset_test_no_override", "").unwrap());
    assert!(sync.has_ldflag("-fsanitize-memtag-mode=sync"));

    let async_note = flags::emit(g.find("unset_binary_override_default_async", "").unwrap());
    assert!(async_note.has_ldflag("-fsanitize-memtag-mode=async"));

    let none = flags::emit(g.find("no_memtag_binary_no_override", "").unwrap());
    assert!(!none.ldflags.iter().any(|f| f.starts_with("-fsanitize-memtag-mode")));
}
