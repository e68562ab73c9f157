//! Invocation of the external engine through an ordered fallback chain.
//!
//! Different engine builds expose the query entry point through different
//! calling conventions: the language runtime's module form (in two argument
//! orderings), an installed binary, or a library linked into this process.
//! Each [`Invoker`] wraps one of them behind the same capability, and
//! [`run_chain`] walks them in priority order until one returns rows, so no
//! environment detection is needed up front.
//!
//! External processes run with a hard timeout and both pipes drained on
//! background threads. Cancellation is cooperative via [`CancelToken`]; a
//! cancelled token also kills an in-flight child process.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;
use crate::table::{self, TableResult};

const ENGINE_MODULE: &str = "logica";
const ENGINE_VERB: &str = "run_in_terminal";

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const DIAGNOSTIC_CAP: usize = 4096;

/// Cancellation token shared with in-flight engine invocations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cancels its token when dropped. Held by a request future, it turns the
/// future being dropped (the client went away) into cancellation of the
/// engine work running on the request's behalf.
pub struct CancelOnDrop(CancelToken);

impl CancelOnDrop {
    pub fn new(token: CancelToken) -> Self {
        Self(token)
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// What one invocation strategy produced for one predicate.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The engine returned at least one row.
    Rows(TableResult),
    /// The run was clean but produced no rows; header columns may be known.
    Empty(TableResult),
    /// The attempt failed: bad exit, timeout, spawn error, or garbled table.
    Failed(String),
}

/// One way of invoking the engine.
pub trait Invoker: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this strategy can serve solver-dependent programs.
    fn handles_solver(&self) -> bool {
        true
    }

    fn attempt(&self, program: &Path, predicate: &str, cancel: &CancelToken) -> Outcome;
}

/// Runs the engine through the language runtime's module entry point, with
/// either the program path or the command verb first.
pub struct ModuleInvoker {
    runtime: String,
    verb_first: bool,
    timeout: Duration,
}

impl ModuleInvoker {
    pub fn program_first(runtime: &str, timeout: Duration) -> Self {
        Self { runtime: runtime.to_owned(), verb_first: false, timeout }
    }

    /// Some engine builds reject the program-path-first ordering; this form
    /// puts the command verb ahead of the path instead.
    pub fn verb_first(runtime: &str, timeout: Duration) -> Self {
        Self { runtime: runtime.to_owned(), verb_first: true, timeout }
    }
}

impl Invoker for ModuleInvoker {
    fn name(&self) -> &'static str {
        if self.verb_first { "module-verb-first" } else { "module" }
    }

    fn attempt(&self, program: &Path, predicate: &str, cancel: &CancelToken) -> Outcome {
        let mut cmd = Command::new(&self.runtime);
        cmd.arg("-m").arg(ENGINE_MODULE);
        if self.verb_first {
            cmd.arg(ENGINE_VERB).arg(program).arg(predicate);
        } else {
            cmd.arg(program).arg(ENGINE_VERB).arg(predicate);
        }
        run_engine_process(cmd, self.timeout, cancel)
    }
}

/// Runs a globally installed engine executable found on the PATH, bypassing
/// the language runtime entirely.
pub struct BinaryInvoker {
    binary: String,
    timeout: Duration,
}

impl BinaryInvoker {
    pub fn new(binary: &str, timeout: Duration) -> Self {
        Self { binary: binary.to_owned(), timeout }
    }
}

impl Invoker for BinaryInvoker {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn attempt(&self, program: &Path, predicate: &str, cancel: &CancelToken) -> Outcome {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(program).arg(ENGINE_VERB).arg(predicate);
        run_engine_process(cmd, self.timeout, cancel)
    }
}

/// An engine linked into this process, returning tables directly and
/// bypassing text parsing. The standalone service ships without one; callers
/// embedding the crate can provide an implementation.
pub trait EmbeddedEngine: Send + Sync {
    fn evaluate(&self, program: &Path, predicate: &str) -> Result<TableResult>;
}

/// Calls an [`EmbeddedEngine`]. Never offered a solver-dependent program,
/// since the embedded path has no solver support.
pub struct EmbeddedInvoker {
    engine: Arc<dyn EmbeddedEngine>,
}

impl EmbeddedInvoker {
    pub fn new(engine: Arc<dyn EmbeddedEngine>) -> Self {
        Self { engine }
    }
}

impl Invoker for EmbeddedInvoker {
    fn name(&self) -> &'static str {
        "embedded"
    }

    fn handles_solver(&self) -> bool {
        false
    }

    fn attempt(&self, program: &Path, predicate: &str, _cancel: &CancelToken) -> Outcome {
        match self.engine.evaluate(program, predicate) {
            Ok(table) if table.is_empty() => Outcome::Empty(table),
            Ok(table) => Outcome::Rows(table),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

/// The chain's verdict for one predicate: a table (possibly empty) and the
/// last diagnostic seen while falling through the strategies (empty when the
/// run was clean).
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub table: TableResult,
    pub diagnostic: String,
}

/// Try each invoker in order until one yields rows.
///
/// Empty results and failures both advance the chain; only the last
/// non-empty failure message is retained. Invokers without solver support
/// are skipped when the program depends on the solver.
pub fn run_chain(
    invokers: &[Box<dyn Invoker>],
    program: &Path,
    solver_program: bool,
    predicate: &str,
    cancel: &CancelToken,
) -> QueryOutcome {
    let mut last_table = TableResult::default();
    let mut last_diagnostic = String::new();

    for invoker in invokers {
        if cancel.is_cancelled() {
            last_diagnostic = "cancelled".into();
            break;
        }
        if solver_program && !invoker.handles_solver() {
            debug!(strategy = invoker.name(), predicate, "skipped for solver program");
            continue;
        }
        match invoker.attempt(program, predicate, cancel) {
            Outcome::Rows(table) => {
                debug!(strategy = invoker.name(), predicate, rows = table.rows.len(), "rows returned");
                return QueryOutcome { table, diagnostic: String::new() };
            }
            Outcome::Empty(table) => {
                debug!(strategy = invoker.name(), predicate, "no rows");
                if !table.columns.is_empty() {
                    last_table = table;
                }
            }
            Outcome::Failed(message) => {
                debug!(strategy = invoker.name(), predicate, error = %message, "attempt failed");
                if !message.is_empty() {
                    last_diagnostic = message;
                }
            }
        }
    }

    QueryOutcome { table: last_table, diagnostic: last_diagnostic }
}

enum WaitVerdict {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// Spawn the command, wait for it under the timeout, and classify what came
/// back. The child's stdout must hold the table text on success.
fn run_engine_process(mut cmd: Command, timeout: Duration, cancel: &CancelToken) -> Outcome {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return Outcome::Failed(format!("failed to spawn engine: {e}")),
    };

    // Drain both pipes on their own threads so a chatty child never blocks
    // on a full pipe while we are waiting for it to exit.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let verdict = match wait_verdict(&mut child, timeout, cancel) {
        Ok(verdict) => verdict,
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Outcome::Failed(format!("failed waiting for engine: {e}"));
        }
    };
    if !matches!(verdict, WaitVerdict::Exited(_)) {
        let _ = child.kill();
        // reap, and close the pipes so the drains see EOF
        let _ = child.wait();
    }

    let stdout = stdout.map(collect_drained).unwrap_or_default();
    let stderr = stderr.map(collect_drained).unwrap_or_default();

    match verdict {
        WaitVerdict::TimedOut => {
            Outcome::Failed(format!("engine timed out after {}s", timeout.as_secs()))
        }
        WaitVerdict::Cancelled => Outcome::Failed("cancelled".into()),
        WaitVerdict::Exited(status) if !status.success() => {
            let mut message = cap_diagnostic(stderr.trim());
            if message.is_empty() {
                message = format!("engine exited with {status}");
            }
            Outcome::Failed(message)
        }
        WaitVerdict::Exited(_) => match table::parse_table(&stdout) {
            Ok(table) if table.is_empty() => Outcome::Empty(table),
            Ok(table) => Outcome::Rows(table),
            Err(e) => Outcome::Failed(e.to_string()),
        },
    }
}

fn wait_verdict(child: &mut Child, timeout: Duration, cancel: &CancelToken) -> std::io::Result<WaitVerdict> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(WaitVerdict::Exited(status));
        }
        if cancel.is_cancelled() {
            return Ok(WaitVerdict::Cancelled);
        }
        if Instant::now() >= deadline {
            return Ok(WaitVerdict::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(stream: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut stream = stream;
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        buf
    })
}

fn collect_drained(handle: JoinHandle<Vec<u8>>) -> String {
    match handle.join() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

// keep diagnostics bounded, cutting at a char boundary
fn cap_diagnostic(message: &str) -> String {
    if message.len() <= DIAGNOSTIC_CAP {
        return message.to_owned();
    }
    let mut end = DIAGNOSTIC_CAP;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_owned()
}
