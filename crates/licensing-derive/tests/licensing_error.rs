#[test]
fn licensing_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/licensing_error_pass.rs");
    t.compile_fail("tests/ui/licensing_error_no_context.rs");
    t.compile_fail("tests/ui/licensing_error_tuple_variant.rs");
}
