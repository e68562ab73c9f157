use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use logicad::engine::{CancelToken, Invoker, Outcome};
use logicad::executor::{Executor, RENDER_PREDICATES};
use logicad::table::TableResult;

fn rows(values: &[&str]) -> TableResult {
    TableResult {
        columns: vec!["v".to_owned()],
        rows: values.iter().map(|v| vec![(*v).to_owned()]).collect(),
    }
}

// What one attempt observed: the predicate asked for, the scratch path, and
// the program text as it was on disk at that moment.
struct Seen {
    predicate: String,
    path: PathBuf,
    text: String,
}

struct Scripted {
    script: Box<dyn Fn(&str) -> Outcome + Send + Sync>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

fn scripted(
    script: impl Fn(&str) -> Outcome + Send + Sync + 'static,
) -> (Box<dyn Invoker>, Arc<Mutex<Vec<Seen>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let invoker = Scripted { script: Box::new(script), seen: Arc::clone(&seen) };
    (Box::new(invoker), seen)
}

impl Invoker for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }
    fn attempt(&self, program: &Path, predicate: &str, _cancel: &CancelToken) -> Outcome {
        self.seen.lock().unwrap().push(Seen {
            predicate: predicate.to_owned(),
            path: program.to_path_buf(),
            text: std::fs::read_to_string(program).unwrap_or_default(),
        });
        (self.script)(predicate)
    }
}

#[test]
fn every_requested_predicate_is_keyed() {
    let (invoker, _) = scripted(|predicate| match predicate {
        "Graph" => Outcome::Rows(rows(&["a", "b"])),
        "Node" => Outcome::Empty(TableResult::default()),
        _ => Outcome::Failed("edge query exploded".into()),
    });
    let executor = Executor::with_invokers(vec![invoker]);
    let tables = executor
        .execute("Node(1);", None, &RENDER_PREDICATES)
        .expect("non-solver run succeeds");

    assert_eq!(tables.len(), 3);
    assert_eq!(tables["Graph"], rows(&["a", "b"]));
    assert!(tables["Node"].is_empty());
    assert!(tables["Edge"].is_empty(), "a failed query surfaces as an empty table");
}

#[test]
fn predicates_run_in_the_given_order() {
    let (invoker, seen) = scripted(|_| Outcome::Empty(TableResult::default()));
    let executor = Executor::with_invokers(vec![invoker]);
    executor.execute("Node(1);", None, &RENDER_PREDICATES).expect("run succeeds");

    let order: Vec<String> = seen.lock().unwrap().iter().map(|s| s.predicate.clone()).collect();
    assert_eq!(order, vec!["Graph", "Node", "Edge"]);
}

#[test]
fn invokers_see_the_assembled_program_on_disk() {
    let (invoker, seen) = scripted(|_| Outcome::Empty(TableResult::default()));
    let executor = Executor::with_invokers(vec![invoker]);
    executor
        .execute("Edge(a, b) :- Link(a, b);", None, &["Graph"])
        .expect("run succeeds");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(
        seen[0].text.starts_with("@Engine(\"sqlite\");\n\n"),
        "scratch program should carry the default directive first"
    );
    assert!(seen[0].text.contains("Edge(a, b) :- Link(a, b);"));
}

#[test]
fn scratch_file_is_gone_after_the_request() {
    let (invoker, seen) = scripted(|_| Outcome::Empty(TableResult::default()));
    let executor = Executor::with_invokers(vec![invoker]);
    executor.execute("Node(1);", None, &RENDER_PREDICATES).expect("run succeeds");

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    for s in seen.iter() {
        assert!(!s.path.exists(), "scratch file survived the request: {}", s.path.display());
    }
}

#[test]
fn scratch_file_is_gone_after_a_hard_failure_too() {
    let (invoker, seen) = scripted(|_| Outcome::Failed("ground failed".into()));
    let executor = Executor::with_invokers(vec![invoker]);
    let err = executor
        .execute("@Engine(\"clingo\"); P(1);", None, &RENDER_PREDICATES)
        .unwrap_err();
    assert!(format!("{err}").contains("ground failed"));

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    for s in seen.iter() {
        assert!(!s.path.exists(), "scratch file survived the request: {}", s.path.display());
    }
}

#[test]
fn all_empty_solver_program_is_a_hard_failure() {
    let (invoker, _) = scripted(|_| Outcome::Empty(TableResult::default()));
    let executor = Executor::with_invokers(vec![invoker]);
    let err = executor
        .execute("@Engine(\"clingo\"); P(1);", None, &RENDER_PREDICATES)
        .unwrap_err();
    let message = format!("{err}");
    assert!(!message.is_empty());
    assert!(message.contains("no results"), "got: {message}");
}

#[test]
fn solver_program_with_any_rows_is_fine() {
    let (invoker, _) = scripted(|predicate| match predicate {
        "Graph" => Outcome::Rows(rows(&["a"])),
        _ => Outcome::Empty(TableResult::default()),
    });
    let executor = Executor::with_invokers(vec![invoker]);
    let tables = executor
        .execute("@Engine(\"clingo\"); P(1);", None, &RENDER_PREDICATES)
        .expect("one non-empty table defuses the escalation");
    assert_eq!(tables["Graph"], rows(&["a"]));
}

#[test]
fn all_empty_without_solver_is_soft() {
    let (invoker, _) = scripted(|_| Outcome::Failed("engine not installed".into()));
    let executor = Executor::with_invokers(vec![invoker]);
    let tables = executor
        .execute("@Engine(\"sqlite\"); P(1);", None, &RENDER_PREDICATES)
        .expect("plain programs tolerate empty runs");
    assert!(tables.values().all(|t| t.is_empty()));
    assert_eq!(tables.len(), 3);
}

#[test]
fn caller_supplied_predicate_list_is_respected() {
    let (invoker, _) = scripted(|_| Outcome::Rows(rows(&["a"])));
    let executor = Executor::with_invokers(vec![invoker]);
    let tables = executor.execute("Node(1);", None, &["Only"]).expect("run succeeds");
    assert_eq!(tables.len(), 1);
    assert!(tables.contains_key("Only"));

    let none = executor.execute("Node(1);", None, &[]).expect("empty list is a no-op");
    assert!(none.is_empty());
}

#[test]
fn cancelled_solver_run_reports_cancellation() {
    let (invoker, seen) = scripted(|_| Outcome::Rows(rows(&["a"])));
    let executor = Executor::with_invokers(vec![invoker]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = executor
        .execute_cancellable("@Engine(\"clingo\"); P(1);", None, &RENDER_PREDICATES, &cancel)
        .unwrap_err();
    assert!(format!("{err}").contains("cancelled"));
    assert!(seen.lock().unwrap().is_empty(), "no strategy may run after cancellation");
}
