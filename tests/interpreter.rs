//! End-to-end script-running tests: feed source through the public
//! `Interpreter`/parser API and inspect the resulting global scope or the
//! `Result` the run completed with, the way the language's own `assert`
//! builtin is meant to be exercised.

use jay::scope;
use jay::{parser, ErrorKind, Interpreter};

fn run(source: &str) -> jay::JayResult<Interpreter> {
    let program = parser::parse(source, "<test>")?;
    let mut interp = Interpreter::new("<test>");
    interp.run_program(&program)?;
    Ok(interp)
}

fn global(interp: &Interpreter, name: &str) -> jay::Value {
    scope::lookup(&interp.global, name).unwrap_or(jay::Value::Null)
}

#[test]
fn arithmetic_and_string_concat_match_spec_rules() {
    let interp = run(
        r#"
        let a = 2 + 3 * 4;
        let b = "x" + 1;
        let c = 7 / 2;
        let d = 2 ** 10;
        "#,
    )
    .unwrap();
    assert!(matches!(global(&interp, "a"), jay::Value::Int(14)));
    assert_eq!(global(&interp, "b").to_display_string(), "x1");
    assert!(matches!(global(&interp, "c"), jay::Value::Float(f) if (f - 3.5).abs() < 1e-9));
    assert!(matches!(global(&interp, "d"), jay::Value::Float(f) if (f - 1024.0).abs() < 1e-9));
}

#[test]
fn assignment_rule_updates_nearest_non_global_ancestor() {
    let interp = run(
        r#"
        let counter = 0;
        func bump() {
            counter = counter + 1;
        }
        bump();
        bump();
        "#,
    )
    .unwrap();
    assert!(matches!(global(&interp, "counter"), jay::Value::Int(2)));
}

#[test]
fn arrow_closures_capture_free_variables_by_snapshot() {
    let interp = run(
        r#"
        let base = 10;
        let addBase = (x) => x + base;
        base = 999;
        let result = addBase(5);
        "#,
    )
    .unwrap();
    assert!(matches!(global(&interp, "result"), jay::Value::Int(15)));
}

#[test]
fn arrow_closures_capture_a_variable_only_ever_touched_by_compound_assign() {
    // `acc` is never read by bare reference inside the arrow, only
    // compound-assigned; if free-variable collection missed it (only
    // walking the compound-assign's right-hand side), `acc += x` would
    // fail with an undefined-variable error instead of operating on the
    // closure's own read-only snapshot.
    let interp = run(
        r#"
        func run() {
            let acc = 0;
            let bump = (x) => { acc += x; return "ok"; };
            return bump(3);
        }
        let status = run();
        "#,
    )
    .unwrap();
    assert_eq!(global(&interp, "status").to_display_string(), "ok");
}

#[test]
fn class_inheritance_dispatches_super_to_parent_method() {
    let interp = run(
        r#"
        class Animal {
            speak() { return "..."; }
        }
        class Dog extends Animal {
            speak() { return "woof " + super.speak(); }
        }
        let d = new Dog();
        let said = d.speak();
        "#,
    )
    .unwrap();
    assert_eq!(global(&interp, "said").to_display_string(), "woof ...");
}

#[test]
fn out_of_range_array_assignment_is_silently_ignored() {
    let interp = run(
        r#"
        let arr = [1, 2, 3];
        arr[10] = 99;
        let len = len(arr);
        "#,
    )
    .unwrap();
    assert!(matches!(global(&interp, "len"), jay::Value::Int(3)));
}

#[test]
fn array_higher_order_methods_match_spec_catalog() {
    let interp = run(
        r#"
        let nums = [1, 2, 3, 4, 5];
        let doubled = nums.map((x) => x * 2);
        let evens = nums.filter((x) => x % 2 == 0);
        let total = nums.reduce((acc, x) => acc + x, 0);
        let firstEven = nums.find((x) => x % 2 == 0);
        let hasThree = nums.includes(3);
        let allPositive = nums.every((x) => x > 0);
        let anyBig = nums.some((x) => x > 4);
        "#,
    )
    .unwrap();
    assert_eq!(global(&interp, "doubled").to_display_string(), "[2, 4, 6, 8, 10]");
    assert_eq!(global(&interp, "evens").to_display_string(), "[2, 4]");
    assert!(matches!(global(&interp, "total"), jay::Value::Int(15)));
    assert!(matches!(global(&interp, "firstEven"), jay::Value::Int(2)));
    assert!(matches!(global(&interp, "hasThree"), jay::Value::Bool(true)));
    assert!(matches!(global(&interp, "allPositive"), jay::Value::Bool(true)));
    assert!(matches!(global(&interp, "anyBig"), jay::Value::Bool(true)));
}

#[test]
fn case_matches_ranges_and_stops_at_the_first_matching_branch() {
    let interp = run(
        r#"
        let out = [];
        case (3) {
            1, 2: out.push("lo");
            3..5: out.push("mid");
            default: out.push("hi");
        }
        "#,
    )
    .unwrap();
    assert_eq!(global(&interp, "out").to_display_string(), "[mid]");
}

#[test]
fn explicit_break_inside_a_case_branch_does_not_escape_an_enclosing_loop() {
    let interp = run(
        r#"
        let seen = [];
        for (i in range(3)) {
            case (i) {
                1: { break; }
                default: seen.push(i);
            }
            seen.push("after " + i);
        }
        "#,
    )
    .unwrap();
    assert_eq!(global(&interp, "seen").to_display_string(), "[0, after 0, after 1, 2, after 2]");
}

#[test]
fn global_constants_are_preregistered() {
    let interp = run("let pi = PI; let e = E; let v = VERSION;").unwrap();
    assert!(matches!(global(&interp, "pi"), jay::Value::Float(f) if (f - std::f64::consts::PI).abs() < 1e-12));
    assert!(matches!(global(&interp, "e"), jay::Value::Float(f) if (f - std::f64::consts::E).abs() < 1e-12));
    assert_eq!(global(&interp, "v").to_display_string(), "3.0");
}

#[test]
fn reassigning_a_const_binding_is_a_script_level_error() {
    let err = run("const x = 1; x = 2;").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ConstReassign(name) if name == "x"));
}

#[test]
fn assert_builtin_raises_a_catchable_error_on_failure() {
    let err = run(r#"assert(1 == 2, "one is not two");"#).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AssertionFailed(Some(msg)) if msg == "one is not two"));
}

#[test]
fn set_timeout_callbacks_run_during_the_post_program_drain() {
    let interp = run(
        r#"
        let order = [];
        setTimeout(() => { order.push("first"); }, 10);
        setTimeout(() => { order.push("second"); }, 5);
        order.push("sync");
        "#,
    )
    .unwrap();
    assert_eq!(global(&interp, "order").to_display_string(), "[sync, second, first]");
}

#[test]
fn clear_interval_stops_a_repeating_timer_from_recurring_forever() {
    let interp = run(
        r#"
        let ticks = 0;
        let id = setInterval(() => {
            ticks = ticks + 1;
            if (ticks >= 3) {
                clearInterval(id);
            }
        }, 1);
        "#,
    )
    .unwrap();
    assert!(matches!(global(&interp, "ticks"), jay::Value::Int(3)));
}
