#[test]
fn hooklift_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/hooklift_error_pass.rs");
    t.pass("tests/ui/hooklift_error_cfg_variant.rs");
}
