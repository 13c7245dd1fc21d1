use binja_mcp::{
    AnalysisSource, Dispatcher, FailureKind, InMemorySource, Snapshot, ToolRequest, ToolResult,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample_snapshot.json")
}

fn setup() -> (Arc<InMemorySource>, Dispatcher) {
    let source = Arc::new(
        Snapshot::load(&fixture_path())
            .expect("fixture loads")
            .into_source(),
    );
    let dispatcher = Dispatcher::new(source.clone());
    (source, dispatcher)
}

fn call(dispatcher: &Dispatcher, name: &str, args: Value) -> ToolResult {
    let arguments = match args {
        Value::Object(map) => map,
        _ => panic!("arguments must be an object"),
    };
    dispatcher.dispatch(&ToolRequest::new(name, arguments))
}

fn message(result: &ToolResult) -> &str {
    match result {
        ToolResult::Failure { message, .. } => message,
        ToolResult::Success { payload } => panic!("expected failure, got success: {payload}"),
    }
}

#[test]
fn assembly_for_unique_name_is_ordered_one_per_line() {
    let (_source, dispatcher) = setup();
    let result = call(&dispatcher, "get_function_assembly", json!({"function_name": "main"}));
    let text = result.payload().expect("success");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "0x1000:\tpush    rbp");
    assert_eq!(lines[4], "0x100e:\tret");

    let addresses: Vec<u64> = lines
        .iter()
        .map(|l| {
            let addr = l.split(':').next().expect("address");
            u64::from_str_radix(addr.trim_start_matches("0x"), 16).expect("hex address")
        })
        .collect();
    assert!(addresses.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn assembly_spans_disjoint_ranges() {
    let (_source, dispatcher) = setup();
    let result = call(&dispatcher, "get_function_assembly", json!({"function_name": "sub_2000"}));
    let text = result.payload().expect("success");
    assert!(text.ends_with("0x2400:\txor     eax, eax"));
}

#[test]
fn unknown_name_is_not_found() {
    let (_source, dispatcher) = setup();
    let result = call(&dispatcher, "get_function_decompiled", json!({"function_name": "Main"}));
    assert_eq!(result.kind(), Some(FailureKind::NotFound));
    assert!(message(&result).contains("'Main'"));
}

#[test]
fn duplicate_name_is_ambiguous_with_count() {
    let (source, dispatcher) = setup();
    let result = call(&dispatcher, "rename_function", json!({"function_name": "init", "new_name": "init_a"}));
    assert_eq!(result.kind(), Some(FailureKind::Ambiguous));
    assert!(message(&result).contains("2 matches"));
    assert_eq!(source.functions_named("init").len(), 2);
}

#[test]
fn current_variants_need_a_cursor() {
    let (_source, dispatcher) = setup();
    for tool in ["get_current_function_decompiled", "get_current_function_assembly"] {
        let result = call(&dispatcher, tool, json!({}));
        assert_eq!(result.kind(), Some(FailureKind::NoCurrentContext), "{tool}");
    }

    dispatcher.move_cursor(0x2401);
    let result = call(&dispatcher, "get_current_function_decompiled", json!({}));
    assert!(result.payload().expect("success").starts_with("int64_t sub_2000"));
}

#[test]
fn omitted_function_name_uses_cursor() {
    let (_source, dispatcher) = setup();
    dispatcher.move_cursor(0x1004);
    let result = call(&dispatcher, "get_function_decompiled", json!({}));
    assert!(result.payload().expect("success").contains("main"));
}

#[test]
fn current_function_removed_after_selection() {
    let (source, dispatcher) = setup();
    let func = dispatcher.move_cursor(0x2800).expect("first init");
    assert!(source.remove_function(func.handle));
    let result = call(&dispatcher, "get_current_function_assembly", json!({}));
    assert_eq!(result.kind(), Some(FailureKind::NoCurrentContext));
}

#[test]
fn empty_new_name_is_rejected_before_any_lookup() {
    let (source, dispatcher) = setup();
    let result = call(&dispatcher, "rename_function", json!({"function_name": "sub_2000", "new_name": ""}));
    assert_eq!(result.kind(), Some(FailureKind::InvalidArgument));
    assert_eq!(source.functions_named("sub_2000").len(), 1);
}

#[test]
fn unknown_tool_is_invalid_argument() {
    let (_source, dispatcher) = setup();
    let result = call(&dispatcher, "delete_function", json!({"function_name": "main"}));
    assert_eq!(result.kind(), Some(FailureKind::InvalidArgument));
    assert!(message(&result).contains("delete_function"));
}

#[test]
fn global_variable_lookup() {
    let (_source, dispatcher) = setup();
    let result = call(&dispatcher, "get_global_variable", json!({"variable_name": "g_key"}));
    let value: Value = serde_json::from_str(result.payload().expect("success")).expect("json");
    assert_eq!(value["address"], "0x4000");
    assert_eq!(value["type"], "char const[8]");
    assert_eq!(value["value"], "\"SECRET!\"");

    let result = call(&dispatcher, "get_global_variable", json!({"name": "main"}));
    assert_eq!(result.kind(), Some(FailureKind::NotFound));
}

#[test]
fn comment_overwrite_is_idempotent() {
    let (source, dispatcher) = setup();
    let args = json!({"function_name": "main", "address": "0x1008", "comment": "calls checker"});
    let first = call(&dispatcher, "add_comment", args.clone());
    assert!(first.is_success());
    assert_eq!(source.comment_at(0x1008).as_deref(), Some("calls checker"));

    let second = call(&dispatcher, "add_comment", args);
    assert_eq!(first, second);
    assert_eq!(source.comment_at(0x1008).as_deref(), Some("calls checker"));
}

#[test]
fn comment_outside_function_is_invalid() {
    let (source, dispatcher) = setup();
    let result = call(
        &dispatcher,
        "add_comment",
        json!({"function_name": "main", "address": "0x2000", "comment": "nope"}),
    );
    assert_eq!(result.kind(), Some(FailureKind::InvalidArgument));
    assert_eq!(source.comment_at(0x2000), None);
}

#[test]
fn rename_variable_then_set_type() {
    let (source, dispatcher) = setup();
    let result = call(
        &dispatcher,
        "rename_variable",
        json!({"function_name": "sub_2000", "variable_name": "arg1", "new_name": "input"}),
    );
    assert_eq!(
        result.payload(),
        Some("Variable 'arg1' in function 'sub_2000' renamed to 'input'")
    );

    let result = call(
        &dispatcher,
        "set_variable_type",
        json!({"function_name": "sub_2000", "variable_name": "input", "new_type": "uint8_t const*"}),
    );
    assert!(result.is_success());

    let func = source.functions_named("sub_2000").remove(0);
    let var = source.variables_named(func.handle, "input").remove(0);
    assert_eq!(var.type_name, "uint8_t const*");
}

#[test]
fn engine_rejection_is_mutation_failed() {
    let (source, dispatcher) = setup();
    let result = call(&dispatcher, "rename_function", json!({"function_name": "main", "new_name": "sub_2000"}));
    assert_eq!(result.kind(), Some(FailureKind::MutationFailed));

    let result = call(&dispatcher, "rename_function", json!({"function_name": "main", "new_name": "has space"}));
    assert_eq!(result.kind(), Some(FailureKind::MutationFailed));

    let result = call(&dispatcher, "rename_function", json!({"function_name": "main", "new_name": "   "}));
    assert_eq!(result.kind(), Some(FailureKind::MutationFailed));
    assert_eq!(source.functions_named("main").len(), 1);
}

#[test]
fn concurrent_renames_of_distinct_functions_both_apply() {
    let (source, dispatcher) = setup();
    let dispatcher = Arc::new(dispatcher);
    let handles: Vec<_> = [("main", "entry"), ("sub_2000", "check_key")]
        .into_iter()
        .map(|(from, to)| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                call(&dispatcher, "rename_function", json!({"function_name": from, "new_name": to}))
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().expect("thread").is_success());
    }
    assert_eq!(source.functions_named("entry").len(), 1);
    assert_eq!(source.functions_named("check_key").len(), 1);
}

#[test]
fn list_functions_and_binary_info() {
    let (_source, dispatcher) = setup();
    let result = call(&dispatcher, "list_functions", json!({"filter": "init"}));
    let value: Value = serde_json::from_str(result.payload().expect("success")).expect("json");
    assert_eq!(value["total"], 2);

    let result = call(&dispatcher, "get_binary_info", json!({}));
    let value: Value = serde_json::from_str(result.payload().expect("success")).expect("json");
    assert_eq!(value["function_count"], 4);
    assert_eq!(value["segments"][1]["permissions"], "rw-");
}

#[test]
fn mutations_survive_save_and_reload() {
    let (source, dispatcher) = setup();
    call(&dispatcher, "rename_current_function", json!({"new_name": "x"}));
    dispatcher.move_cursor(0x1000);
    assert!(call(&dispatcher, "rename_current_function", json!({"new_name": "entry"})).is_success());

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("saved.json");
    source.snapshot().save(&path).expect("save");

    let reloaded = Snapshot::load(&path).expect("reload").into_source();
    assert_eq!(reloaded.functions_named("entry").len(), 1);
    assert!(reloaded.functions_named("main").is_empty());
    assert_eq!(reloaded.comment_at(0x1008).as_deref(), Some("validate input"));
}
