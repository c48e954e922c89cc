//! Fuzzer instrumentation: the one kind that propagates through shared
//! edges, rebuilding the whole DSO closure.

use sanvar_core::policy::PolicyConfig;
use sanvar_core::types::LinkKind;
use sanvar_engine::{flags, resolve_graph, ModuleDecl, ResolvedGraph, SanitizeDecl};

fn expect_link(g: &ResolvedGraph, from: (&str, &str), to: (&str, &str), link: LinkKind) {
    let from_v = g
        .find(from.0, from.1)
        .unwrap_or_else(|| panic!("no variant {}{}", from.0, from.1));
    let to_id = g
        .find_id(to.0, to.1)
        .unwrap_or_else(|| panic!("no variant {}{}", to.0, to.1));
    assert!(
        from_v.links_to(to_id, link),
        "{}{} should link {}{} as {:?}",
        from.0,
        from.1,
        to.0,
        to.1,
        link
    );
}

fn fuzz_modules() -> Vec<ModuleDecl> {
    let deps = |m: ModuleDecl| {
        m.with_shared_libs(&["libshared", "libfuzzer"])
            .with_static_libs(&["libstatic", "libnofuzzer", "libstatic_fuzzer"])
    };
    vec![
        deps(ModuleDecl::binary("bin_with_fuzzer")).with_sanitize(SanitizeDecl::fuzzer(true)),
        deps(ModuleDecl::binary("bin_no_fuzzer")),
        ModuleDecl::shared_library("libshared").with_shared_libs(&["libtransitive"]),
        ModuleDecl::shared_library("libfuzzer")
            .with_shared_libs(&["libtransitive"])
            .with_sanitize(SanitizeDecl::fuzzer(true)),
        ModuleDecl::shared_library("libtransitive"),
        ModuleDecl::static_library("libstatic"),
        ModuleDecl::static_library("libnofuzzer").with_sanitize(SanitizeDecl::fuzzer(false)),
        ModuleDecl::static_library("libstatic_fuzzer"),
        ModuleDecl::static_library("libclang_rt.fuzzer"),
    ]
}

#[test]
fn fuzzer_propagates_through_the_shared_closure() {
    let g = resolve_graph(fuzz_modules(), &PolicyConfig::new()).unwrap();

    expect_link(&g, ("bin_with_fuzzer", "_fuzzer"), ("libshared", "_fuzzer"), LinkKind::Shared);
    expect_link(&g, ("bin_with_fuzzer", "_fuzzer"), ("libfuzzer", "_fuzzer"), LinkKind::Shared);
    expect_link(&g, ("libshared", "_fuzzer"), ("libtransitive", "_fuzzer"), LinkKind::Shared);
    expect_link(&g, ("libfuzzer", "_fuzzer"), ("libtransitive", "_fuzzer"), LinkKind::Shared);

    expect_link(&g, ("bin_with_fuzzer", "_fuzzer"), ("libstatic", "_fuzzer"), LinkKind::Static);
    expect_link(&g, ("bin_with_fuzzer", "_fuzzer"), ("libnofuzzer", ""), LinkKind::Static);
    expect_link(
        &g,
        ("bin_with_fuzzer", "_fuzzer"),
        ("libstatic_fuzzer", "_fuzzer"),
        LinkKind::Static,
    );
}

#[test]
fn uninstrumented_binary_keeps_plain_variants() {
    let g = resolve_graph(fuzz_modules(), &PolicyConfig::new()).unwrap();

    expect_link(&g, ("bin_no_fuzzer", ""), ("libshared", ""), LinkKind::Shared);
    expect_link(&g, ("bin_no_fuzzer", ""), ("libfuzzer", "_fuzzer"), LinkKind::Shared);
    expect_link(&g, ("libshared", ""), ("libtransitive", ""), LinkKind::Shared);

    expect_link(&g, ("bin_no_fuzzer", ""), ("libstatic", ""), LinkKind::Static);
    expect_link(&g, ("bin_no_fuzzer", ""), ("libnofuzzer", ""), LinkKind::Static);
    expect_link(&g, ("bin_no_fuzzer", ""), ("libstatic_fuzzer", ""), LinkKind::Static);
}

#[test]
fn fuzzer_runtime_is_static_and_executables_only() {
    let g = resolve_graph(fuzz_modules(), &PolicyConfig::new()).unwrap();

    expect_link(
        &g,
        ("bin_with_fuzzer", "_fuzzer"),
        ("libclang_rt.fuzzer", ""),
        LinkKind::Static,
    );

    // Instrumented shared libraries defer the harness to the final link.
    let shared = g.find("libshared", "_fuzzer").unwrap();
    let rt = g.find_id("libclang_rt.fuzzer", "").unwrap();
    assert!(!shared.links_to(rt, LinkKind::Static));
}

#[test]
fn fuzzer_is_never_enabled_by_default() {
    let mut policy = PolicyConfig::new();
    policy.enable_on_device(sanvar_core::types::SanitizerKind::Fuzzer);
    let g = resolve_graph(fuzz_modules(), &policy).unwrap();

    // Device-wide lists cannot turn fuzzing on; only explicit requests do.
    assert!(g.find("bin_no_fuzzer", "_fuzzer").is_none());
    assert!(g.find("bin_no_fuzzer", "").is_some());
}

#[test]
fn fuzzer_compile_flag_covers_the_instrumented_closure() {
    let g = resolve_graph(fuzz_modules(), &PolicyConfig::new()).unwrap();

    for (name, suffix) in [
        ("bin_with_fuzzer", "_fuzzer"),
        ("libshared", "_fuzzer"),
        ("libtransitive", "_fuzzer"),
    ] {
        let f = flags::emit(g.find(name, suffix).unwrap());
        assert!(f.has_cflag("-fsanitize=fuzzer-no-link"), "{name}{suffix}");
    }

    let plain = flags::emit(g.find("libshared", "").unwrap());
    assert!(!plain.has_cflag("-fsanitize=fuzzer-no-link"));
}
