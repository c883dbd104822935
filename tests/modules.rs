//! Module-loader and filesystem-builtin tests that need real files on disk,
//! backed by `tempfile` for real on-disk fixtures.

use std::fs;

use jay::{parser, scope, Interpreter, Value};
use tempfile::tempdir;

fn run_file(path: &std::path::Path) -> jay::JayResult<Interpreter> {
    let source = fs::read_to_string(path).unwrap();
    let program = parser::parse(&source, path.display().to_string())?;
    let mut interp = Interpreter::new(path.display().to_string());
    interp.run_program(&program)?;
    Ok(interp)
}

#[test]
fn import_exposes_top_level_bindings_as_module_properties() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("math_helpers.jay"),
        r#"
        const TWO = 2;
        func double(x) { return x * TWO; }
        "#,
    )
    .unwrap();
    let main_path = dir.path().join("main.jay");
    fs::write(
        &main_path,
        r#"
        import "./math_helpers" as helpers;
        let result = helpers.double(21);
        "#,
    )
    .unwrap();

    let interp = run_file(&main_path).unwrap();
    let result = scope::lookup(&interp.global, "result").unwrap();
    assert!(matches!(result, Value::Int(42)));
}

#[test]
fn circular_imports_are_rejected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.jay"), r#"import "./b" as b;"#).unwrap();
    fs::write(dir.path().join("b.jay"), r#"import "./a" as a;"#).unwrap();
    let main_path = dir.path().join("a.jay");

    let err = run_file(&main_path).unwrap_err();
    assert!(matches!(err.kind, jay::ErrorKind::ImportFailed(_)));
}

#[test]
fn a_module_is_evaluated_only_once_and_cached() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("counter.jay"),
        r#"
        let hits = 0;
        func bump() { hits = hits + 1; return hits; }
        bump();
        "#,
    )
    .unwrap();
    let main_path = dir.path().join("main.jay");
    fs::write(
        &main_path,
        r#"
        import "./counter" as a;
        import "./counter" as b;
        let same = a.hits == b.hits;
        "#,
    )
    .unwrap();

    let interp = run_file(&main_path).unwrap();
    let same = scope::lookup(&interp.global, "same").unwrap();
    assert!(matches!(same, Value::Bool(true)));
}

#[test]
fn file_builtins_round_trip_through_a_real_directory() {
    let dir = tempdir().unwrap();
    let script_path = dir.path().join("main.jay");
    let data_path = dir.path().join("data.txt");
    let data_path_str = data_path.display().to_string().replace('\\', "\\\\");
    fs::write(
        &script_path,
        format!(
            r#"
            writeFile("{path}", "hello");
            appendFile("{path}", " world");
            let contents = readFile("{path}");
            let present = fileExists("{path}");
            "#,
            path = data_path_str
        ),
    )
    .unwrap();

    let interp = run_file(&script_path).unwrap();
    let contents = scope::lookup(&interp.global, "contents").unwrap();
    assert_eq!(contents.to_display_string(), "hello world");
    let present = scope::lookup(&interp.global, "present").unwrap();
    assert!(matches!(present, Value::Bool(true)));
}
