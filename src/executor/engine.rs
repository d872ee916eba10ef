//! Parallel executor
//!
//! # Dispatch
//!
//! - The first group runs on the calling thread, which is the trunk thread;
//!   the optional first callback handles its first unit.
//! - Remaining groups are pulled by a bounded set of scoped worker threads
//!   (auxiliary threads).
//! - Units of one group run in order on one thread; they share a connection.
//! - Serial scopes, or an engine configured for serial execution, run every
//!   group on the calling thread.
//!
//! Results are returned in group submission order regardless of completion
//! order. The first failing unit stops further units from starting; the
//! interrupt handle does the same and fails the call with `Interrupted`.
//! A panic inside a group fails only that group's slot, with
//! `WorkerPanicked`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use uuid::Uuid;

use crate::observability::{log_event, Event, MetricsRegistry};

use super::callback::ExecutorCallback;
use super::config::ExecutorConfig;
use super::errors::{ExecutionError, ExecutionResult};
use super::scope::ExecutionScope;
use super::unit::InputGroup;

/// Runs input groups against callbacks with bounded parallelism.
#[derive(Debug, Clone)]
pub struct ExecutorEngine {
    worker_count: usize,
    serial_execution: bool,
    metrics: Option<Arc<MetricsRegistry>>,
}

struct RunContext<'e> {
    scope: &'e ExecutionScope,
    metrics: Option<&'e MetricsRegistry>,
    abort: &'e AtomicBool,
}

impl ExecutorEngine {
    /// Engine with at most `worker_count` auxiliary threads per call.
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            serial_execution: false,
            metrics: None,
        }
    }

    /// Validated engine; `serial_execution` forces serial mode for every call.
    pub fn from_config(config: &ExecutorConfig) -> ExecutionResult<Self> {
        config.validate()?;
        Ok(Self {
            serial_execution: config.serial_execution,
            ..Self::new(config.worker_count())
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_serial(&self) -> bool {
        self.serial_execution
    }

    /// Call scope carrying this engine's serial default.
    pub fn new_scope(&self, execution_id: Uuid) -> ExecutionScope {
        ExecutionScope::new(execution_id).with_serial(self.serial_execution)
    }

    /// Execute every group; one result slot per unit that produced a result.
    pub fn execute<I, O>(
        &self,
        scope: &ExecutionScope,
        input_groups: &[InputGroup<I>],
        first_callback: Option<&dyn ExecutorCallback<I, O>>,
        callback: &dyn ExecutorCallback<I, O>,
    ) -> ExecutionResult<Vec<O>>
    where
        I: Sync,
        O: Send,
    {
        let started = Instant::now();
        let execution_id = scope.execution_id.to_string();
        let serial = self.serial_execution || scope.serial;
        let unit_count: usize = input_groups.iter().map(InputGroup::len).sum();
        log_event(
            Event::ExecuteStart,
            &[
                ("execution_id", &execution_id),
                ("groups", &input_groups.len().to_string()),
                ("units", &unit_count.to_string()),
                ("serial", if serial { "true" } else { "false" }),
            ],
        );

        let abort = AtomicBool::new(false);
        let ctx = RunContext {
            scope,
            metrics: self.metrics.as_deref(),
            abort: &abort,
        };
        let outcome = match input_groups.split_first() {
            None => Ok(Vec::new()),
            Some(_) if serial => serial_execute(input_groups, first_callback, callback, &ctx),
            Some((first, rest)) => self.parallel_execute(first, rest, first_callback, callback, &ctx),
        };

        match &outcome {
            Ok(results) => log_event(
                Event::ExecuteComplete,
                &[
                    ("execution_id", &execution_id),
                    ("results", &results.len().to_string()),
                    ("elapsed_us", &started.elapsed().as_micros().to_string()),
                ],
            ),
            Err(ExecutionError::Interrupted) => {
                log_event(Event::ExecuteInterrupted, &[("execution_id", &execution_id)])
            }
            Err(err) => log_event(
                Event::ExecuteFailed,
                &[
                    ("execution_id", &execution_id),
                    ("code", err.code()),
                    ("error", &err.to_string()),
                ],
            ),
        }
        outcome
    }

    fn parallel_execute<I, O>(
        &self,
        first: &InputGroup<I>,
        rest: &[InputGroup<I>],
        first_callback: Option<&dyn ExecutorCallback<I, O>>,
        callback: &dyn ExecutorCallback<I, O>,
        ctx: &RunContext<'_>,
    ) -> ExecutionResult<Vec<O>>
    where
        I: Sync,
        O: Send,
    {
        let next = AtomicUsize::new(0);
        let workers = self.worker_count.min(rest.len());

        let (first_outcome, slots) = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let next = &next;
                    s.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::SeqCst);
                            let Some(group) = rest.get(index) else {
                                break;
                            };
                            done.push((index, run_group_guarded(index + 1, group, None, callback, false, ctx)));
                        }
                        done
                    })
                })
                .collect();

            let first_outcome = run_group_guarded(0, first, first_callback, callback, true, ctx);

            let mut slots: Vec<Option<ExecutionResult<Vec<O>>>> = rest.iter().map(|_| None).collect();
            for handle in handles {
                if let Ok(done) = handle.join() {
                    for (index, outcome) in done {
                        slots[index] = Some(outcome);
                    }
                }
            }
            (first_outcome, slots)
        });

        let mut outcomes = Vec::with_capacity(1 + slots.len());
        outcomes.push(first_outcome);
        for (index, slot) in slots.into_iter().enumerate() {
            // Only reachable if a worker died outside a group.
            outcomes.push(slot.unwrap_or(Err(ExecutionError::WorkerPanicked { group: index + 1 })));
        }
        collect_outcomes(outcomes)
    }
}

fn serial_execute<I, O>(
    input_groups: &[InputGroup<I>],
    first_callback: Option<&dyn ExecutorCallback<I, O>>,
    callback: &dyn ExecutorCallback<I, O>,
    ctx: &RunContext<'_>,
) -> ExecutionResult<Vec<O>> {
    let mut results = Vec::new();
    for (index, group) in input_groups.iter().enumerate() {
        let first = if index == 0 { first_callback } else { None };
        results.extend(run_group_guarded(index, group, first, callback, true, ctx)?);
    }
    Ok(results)
}

/// `run_group` with a panic turned into `WorkerPanicked` for `group_index`.
fn run_group_guarded<I, O>(
    group_index: usize,
    group: &InputGroup<I>,
    first_callback: Option<&dyn ExecutorCallback<I, O>>,
    callback: &dyn ExecutorCallback<I, O>,
    is_trunk_thread: bool,
    ctx: &RunContext<'_>,
) -> ExecutionResult<Vec<O>> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        run_group(group, first_callback, callback, is_trunk_thread, ctx)
    }))
    .unwrap_or_else(|_| {
        ctx.abort.store(true, Ordering::SeqCst);
        Err(ExecutionError::WorkerPanicked { group: group_index })
    })
}

fn run_group<I, O>(
    group: &InputGroup<I>,
    first_callback: Option<&dyn ExecutorCallback<I, O>>,
    callback: &dyn ExecutorCallback<I, O>,
    is_trunk_thread: bool,
    ctx: &RunContext<'_>,
) -> ExecutionResult<Vec<O>> {
    let mut results = Vec::with_capacity(group.len());
    for (position, input) in group.inputs.iter().enumerate() {
        if ctx.scope.interrupt.is_interrupted() {
            ctx.abort.store(true, Ordering::SeqCst);
            return Err(ExecutionError::Interrupted);
        }
        if ctx.abort.load(Ordering::SeqCst) {
            break;
        }
        let unit_callback = match first_callback {
            Some(first) if position == 0 => first,
            _ => callback,
        };
        let outcome = unit_callback.execute(input, is_trunk_thread, ctx.scope);
        if let Some(metrics) = ctx.metrics {
            metrics.increment_units_executed();
        }
        match outcome {
            Ok(Some(output)) => results.push(output),
            Ok(None) => {}
            Err(err) => {
                ctx.abort.store(true, Ordering::SeqCst);
                return Err(err);
            }
        }
    }
    Ok(results)
}

/// Flatten per-group outcomes in order. An interruption anywhere wins over
/// other errors; otherwise the first error by position is returned.
fn collect_outcomes<O>(outcomes: Vec<ExecutionResult<Vec<O>>>) -> ExecutionResult<Vec<O>> {
    if outcomes
        .iter()
        .any(|o| matches!(o, Err(ExecutionError::Interrupted)))
    {
        return Err(ExecutionError::Interrupted);
    }
    let mut results = Vec::new();
    for outcome in outcomes {
        results.extend(outcome?);
    }
    Ok(results)
}
