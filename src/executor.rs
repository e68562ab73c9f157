//! Per-request execution: assemble, run every predicate through the chain,
//! and aggregate the tables under the soft/hard failure policy.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::{
    self, BinaryInvoker, CancelToken, EmbeddedEngine, EmbeddedInvoker, Invoker, ModuleInvoker,
};
use crate::error::{LogicadError, Result};
use crate::program::{Program, ScratchProgram};
use crate::settings::Settings;
use crate::table::TableResult;

/// The three predicates the rendering frontend binds to.
pub const RENDER_PREDICATES: [&str; 3] = ["Graph", "Node", "Edge"];

/// Result tables keyed by predicate name, one entry per requested predicate.
pub type ResultMap = BTreeMap<String, TableResult>;

/// Runs assembled programs against the engine.
///
/// The executor is immutable and shared across requests; each call to
/// [`Executor::execute`] is independent and leaves nothing behind.
pub struct Executor {
    invokers: Vec<Box<dyn Invoker>>,
}

impl Executor {
    /// The standard chain: module invocation with the program path first,
    /// the same with the command verb first, then the installed binary.
    pub fn new(settings: &Settings) -> Self {
        let timeout = settings.query_timeout();
        Self {
            invokers: vec![
                Box::new(ModuleInvoker::program_first(&settings.python_runtime, timeout)),
                Box::new(ModuleInvoker::verb_first(&settings.python_runtime, timeout)),
                Box::new(BinaryInvoker::new(&settings.engine_binary, timeout)),
            ],
        }
    }

    /// The standard chain extended with an in-process engine as the final
    /// fallback.
    pub fn with_embedded(settings: &Settings, engine: Arc<dyn EmbeddedEngine>) -> Self {
        let mut executor = Self::new(settings);
        executor.invokers.push(Box::new(EmbeddedInvoker::new(engine)));
        executor
    }

    /// Build an executor from an explicit invoker list, in chain order.
    pub fn with_invokers(invokers: Vec<Box<dyn Invoker>>) -> Self {
        Self { invokers }
    }

    /// Assemble the fragments and run every requested predicate.
    ///
    /// A predicate that stays empty across all strategies is recorded as an
    /// empty table, never as an error. The one exception is a program that
    /// depends on the answer-set solver: when every requested predicate comes
    /// back empty there is no way to tell "no results" from "solver never
    /// ran", so the whole run fails with the last diagnostic.
    pub fn execute(
        &self,
        domain: &str,
        visual: Option<&str>,
        predicates: &[&str],
    ) -> Result<ResultMap> {
        self.execute_cancellable(domain, visual, predicates, &CancelToken::new())
    }

    /// Like [`Executor::execute`], with a caller-held cancellation token.
    /// Cancelling kills any in-flight engine process and skips the rest of
    /// the run.
    pub fn execute_cancellable(
        &self,
        domain: &str,
        visual: Option<&str>,
        predicates: &[&str],
        cancel: &CancelToken,
    ) -> Result<ResultMap> {
        let program = Program::assemble(domain, visual);
        let solver_program = program.invokes_solver();
        // the scratch file lives until this function returns, success or not
        let scratch = ScratchProgram::write(&program)?;
        debug!(path = %scratch.path().display(), solver = solver_program, "program written");

        let mut tables = ResultMap::new();
        let mut all_empty = true;
        let mut last_diagnostic = String::new();

        for predicate in predicates.iter().copied() {
            let outcome =
                engine::run_chain(&self.invokers, scratch.path(), solver_program, predicate, cancel);
            if !outcome.diagnostic.is_empty() {
                warn!(predicate, diagnostic = %outcome.diagnostic, "query failed");
                last_diagnostic = outcome.diagnostic;
            }
            all_empty &= outcome.table.is_empty();
            tables.insert(predicate.to_owned(), outcome.table);
        }

        if solver_program && all_empty && !predicates.is_empty() {
            let message = if last_diagnostic.is_empty() {
                "solver program produced no results on any invocation path".to_owned()
            } else {
                last_diagnostic
            };
            return Err(LogicadError::Execution(message));
        }

        Ok(tables)
    }
}
