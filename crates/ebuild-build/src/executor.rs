// ebuild: a build orchestrator for C and C++ projects.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Runs a [`BuildPlan`] to completion with a fixed worker pool, a
//! mutex-guarded ready queue, and cooperative cancellation.
//!
//! Scheduling is push-based: a node becomes `Ready` the instant its last
//! outstanding predecessor finishes, at which point the finishing worker
//! pushes it onto the queue and wakes a sleeping peer. No worker ever runs
//! user code outside a subprocess; every compile, link, and copy step is a
//! direct `std::process::Command` spawn with an explicit `argv`.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use ebuild_core::build_plan::{BuildNode, BuildPlan, CopyKind, Subsystem};
use ebuild_core::graph::{ModuleGraph, ModuleNodeId, ModuleProvider};
use ebuild_core::incremental::{CurrentInputs, FileFingerprint, IncrementalOracle, IncrementalRecord};
use ebuild_core::layout::ArtifactLayout;
use ebuild_core::module::Module;
use ebuild_util::hash::hash_argv;
use ebuild_util::{Arch, Configuration, Platform};

use crate::aux_copy::{self, AuxCopyError};
use crate::diagnostics::{Diagnostic, DiagnosticParser, Severity};
use crate::toolchain::{CompileContext, LinkContext, LinkKind, ToolStep, ToolchainAdapter, ToolchainError, ToolchainRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Pending,
    Ready,
    Running,
    Done,
    Failed,
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
    #[error("failed to spawn `{tool}`: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Incremental(#[from] ebuild_core::incremental::IncrementalError),
    #[error(transparent)]
    AuxCopy(#[from] AuxCopyError),
    #[error("the build plan contains a cycle, which should have been rejected during planning")]
    PlanCycle,
    #[error("`{tool}` exited with a non-zero status")]
    ToolFailure {
        tool: String,
        diagnostics: Vec<Diagnostic>,
    },
}

/// A single cooperative cancellation flag shared by every worker and the
/// caller that may want to abort a running build.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One node's result, as observed by the scheduler.
struct NodeResult {
    node: BuildNode,
    outcome: Result<RunOutcome, ExecutorError>,
}

enum RunOutcome {
    Built(Vec<Diagnostic>),
    Skipped(&'static str),
}

struct Scheduler {
    status: HashMap<BuildNode, NodeStatus>,
    /// Outstanding predecessor count; a node is pushed to `ready` the
    /// instant this reaches zero.
    remaining: HashMap<BuildNode, usize>,
    /// Reverse of `BuildPlan`'s edges: `dependents[p]` is every node that
    /// has `p` as a predecessor.
    dependents: HashMap<BuildNode, Vec<BuildNode>>,
    ready: VecDeque<BuildNode>,
    in_flight: usize,
    ok: usize,
    skipped: usize,
    failed: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Scheduler {
    fn new(plan: &BuildPlan) -> Result<Self, ExecutorError> {
        let order = plan.execution_order().map_err(|_| ExecutorError::PlanCycle)?;
        let mut status = HashMap::new();
        let mut remaining = HashMap::new();
        let mut dependents: HashMap<BuildNode, Vec<BuildNode>> = HashMap::new();
        let mut ready = VecDeque::new();

        for &node in &order {
            status.insert(node, NodeStatus::Pending);
            let predecessors = plan.predecessors(node);
            remaining.insert(node, predecessors.len());
            for prerequisite in predecessors {
                dependents.entry(prerequisite).or_default().push(node);
            }
        }
        for &node in &order {
            if remaining[&node] == 0 {
                status.insert(node, NodeStatus::Ready);
                ready.push_back(node);
            }
        }

        Ok(Self {
            status,
            remaining,
            dependents,
            ready,
            in_flight: 0,
            ok: 0,
            skipped: 0,
            failed: 0,
            diagnostics: Vec::new(),
        })
    }

    /// Marks every transitive dependent of a failed node `Skipped`,
    /// without touching nodes reachable only through an already-skipped
    /// branch twice.
    fn cascade_skip(&mut self, node: BuildNode) {
        let mut stack = self.dependents.get(&node).cloned().unwrap_or_default();
        while let Some(dependent) = stack.pop() {
            if self.status[&dependent] == NodeStatus::Skipped {
                continue;
            }
            if matches!(self.status[&dependent], NodeStatus::Done) {
                // Already completed before the failure was observed;
                // nothing to cascade onto it.
                continue;
            }
            self.status.insert(dependent, NodeStatus::Skipped);
            self.skipped += 1;
            stack.extend(self.dependents.get(&dependent).cloned().unwrap_or_default());
        }
    }

    fn record(&mut self, result: NodeResult) {
        self.in_flight -= 1;
        match result.outcome {
            Ok(RunOutcome::Built(diagnostics)) => {
                self.diagnostics.extend(diagnostics);
                self.status.insert(result.node, NodeStatus::Done);
                self.ok += 1;
                self.promote_dependents(result.node);
            }
            Ok(RunOutcome::Skipped(_reason)) => {
                self.status.insert(result.node, NodeStatus::Done);
                self.ok += 1;
                self.promote_dependents(result.node);
            }
            Err(ExecutorError::ToolFailure { diagnostics, .. }) => {
                self.diagnostics.extend(diagnostics);
                self.status.insert(result.node, NodeStatus::Failed);
                self.failed += 1;
                self.cascade_skip(result.node);
            }
            Err(err) => {
                warn!(node = ?result.node, error = %err, "build node failed");
                self.status.insert(result.node, NodeStatus::Failed);
                self.failed += 1;
                self.cascade_skip(result.node);
            }
        }
    }

    fn promote_dependents(&mut self, node: BuildNode) {
        for dependent in self.dependents.get(&node).cloned().unwrap_or_default() {
            if self.status[&dependent] == NodeStatus::Skipped {
                continue;
            }
            let left = self.remaining.get_mut(&dependent).expect("tracked above");
            *left -= 1;
            if *left == 0 {
                self.status.insert(dependent, NodeStatus::Ready);
                self.ready.push_back(dependent);
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.ready.is_empty() && self.in_flight == 0
    }
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub built: usize,
    pub skipped: usize,
    pub failed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// The terminal summary line the CLI prints after every `build` run.
pub struct Reporter;

impl Reporter {
    pub fn summary_line(outcome: &BuildOutcome) -> String {
        format!(
            "{} built, {} skipped, {} failed",
            outcome.built, outcome.skipped, outcome.failed
        )
    }
}

/// Executes a [`BuildPlan`] with `jobs` worker threads.
pub struct Executor {
    jobs: usize,
}

impl Executor {
    pub fn new(jobs: usize) -> Self {
        Self {
            jobs: jobs.max(1),
        }
    }

    #[instrument(level = "debug", skip_all)]
    pub fn run<P: ModuleProvider>(
        &self,
        plan: &BuildPlan,
        graph: &ModuleGraph<P>,
        registry: &ToolchainRegistry,
        platform: Platform,
        arch: Arch,
        configuration: Configuration,
        cancellation: &CancellationToken,
    ) -> Result<BuildOutcome, ExecutorError> {
        let scheduler = Mutex::new(Scheduler::new(plan)?);
        let condvar = Condvar::new();

        std::thread::scope(|scope| {
            for worker_id in 0..self.jobs {
                scope.spawn(|| {
                    self.worker_loop(
                        worker_id,
                        plan,
                        graph,
                        registry,
                        platform,
                        arch,
                        configuration,
                        cancellation,
                        &scheduler,
                        &condvar,
                    );
                });
            }
        });

        let scheduler = scheduler.into_inner().expect("no worker panicked while holding the lock");
        Ok(BuildOutcome {
            built: scheduler.ok,
            skipped: scheduler.skipped,
            failed: scheduler.failed,
            diagnostics: scheduler.diagnostics,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn worker_loop<P: ModuleProvider>(
        &self,
        worker_id: usize,
        plan: &BuildPlan,
        graph: &ModuleGraph<P>,
        registry: &ToolchainRegistry,
        platform: Platform,
        arch: Arch,
        configuration: Configuration,
        cancellation: &CancellationToken,
        scheduler: &Mutex<Scheduler>,
        condvar: &Condvar,
    ) {
        loop {
            let node = {
                let mut guard = scheduler.lock().expect("scheduler mutex poisoned");
                loop {
                    if cancellation.is_cancelled() || guard.is_finished() {
                        return;
                    }
                    if let Some(node) = guard.ready.pop_front() {
                        guard.in_flight += 1;
                        guard.status.insert(node, NodeStatus::Running);
                        break node;
                    }
                    guard = condvar
                        .wait_timeout(guard, Duration::from_millis(50))
                        .expect("scheduler mutex poisoned")
                        .0;
                }
            };

            debug!(worker = worker_id, node = ?node, "running build node");
            let outcome = execute_node(node, plan, graph, registry, platform, arch, configuration, cancellation);

            {
                let mut guard = scheduler.lock().expect("scheduler mutex poisoned");
                guard.record(NodeResult { node, outcome });
            }
            condvar.notify_all();
        }
    }
}

fn execute_node<P: ModuleProvider>(
    node: BuildNode,
    plan: &BuildPlan,
    graph: &ModuleGraph<P>,
    registry: &ToolchainRegistry,
    platform: Platform,
    arch: Arch,
    configuration: Configuration,
    cancellation: &CancellationToken,
) -> Result<RunOutcome, ExecutorError> {
    match node {
        BuildNode::Virtual { .. } => Ok(RunOutcome::Built(Vec::new())),
        BuildNode::CompileSource { module, .. } => {
            let adapter = registry.default_for(platform, arch)?;
            run_compile(node, module, adapter, plan, graph, platform, configuration, cancellation)
        }
        BuildNode::CompileResource { module, .. } => {
            let adapter = registry.resolve("rc", platform, arch)?;
            run_compile(node, module, adapter, plan, graph, platform, configuration, cancellation)
        }
        BuildNode::LinkStatic { module } | BuildNode::LinkShared { module } | BuildNode::LinkExecutable { module } => {
            let adapter = registry.default_for(platform, arch)?;
            run_link(node, module, adapter, plan, graph, platform, cancellation)
        }
        BuildNode::CopyAsset { module, .. } => run_copy(node, module, plan, graph),
    }
}

fn module_of<P: ModuleProvider>(graph: &ModuleGraph<P>, id: ModuleNodeId) -> &Module {
    graph
        .node(id)
        .module
        .as_ref()
        .expect("build nodes are only created for Ready modules")
}

#[allow(clippy::too_many_arguments)]
fn run_compile<P: ModuleProvider>(
    node: BuildNode,
    module_id: ModuleNodeId,
    adapter: &dyn ToolchainAdapter,
    plan: &BuildPlan,
    graph: &ModuleGraph<P>,
    platform: Platform,
    configuration: Configuration,
    cancellation: &CancellationToken,
) -> Result<RunOutcome, ExecutorError> {
    let data = &plan.compile_info[&node];
    let module = module_of(graph, module_id);
    let layout = ArtifactLayout::new(module, platform);

    let includes: Vec<PathBuf> = module
        .includes
        .public
        .iter()
        .chain(module.includes.private.iter())
        .cloned()
        .collect();
    let force_includes: Vec<PathBuf> = module
        .force_includes
        .public
        .iter()
        .chain(module.force_includes.private.iter())
        .cloned()
        .collect();
    let definitions: Vec<String> = module
        .definitions
        .public
        .iter()
        .chain(module.definitions.private.iter())
        .cloned()
        .collect();
    let extra_flags: Vec<String> = module
        .compiler_options
        .public
        .iter()
        .chain(module.compiler_options.private.iter())
        .cloned()
        .collect();

    let ctx = CompileContext {
        module,
        output_object: &data.output_object_path,
        includes: &includes,
        force_includes: &force_includes,
        definitions: &definitions,
        extra_flags: &extra_flags,
        configuration,
    };
    let argv = adapter.assemble_compile_argv(&data.source_path, &ctx)?;
    let tool = adapter.executable_path(module, ToolStep::Compile, platform)?;

    let oracle = IncrementalOracle::new(layout.cache_dir());
    let content_key = data.output_object_path.to_string_lossy().into_owned();
    let argument_hash = hash_argv(argv.iter().map(|s| s.as_str()));

    let depfile_path = adapter.depfile_path(&data.output_object_path);
    let prior_inputs = source_and_header_paths(adapter, &depfile_path, &data.source_path)?;

    let current = CurrentInputs {
        tool_path: &tool,
        tool_version_hash: adapter.name(),
        argument_hash: &argument_hash,
        source_and_header_paths: &prior_inputs,
        output_path: &data.output_object_path,
        variant_id: module.variant_id(),
    };
    if oracle.decide(&content_key, &current)?.is_none() {
        return Ok(RunOutcome::Skipped("unchanged"));
    }

    if let Some(parent) = data.output_object_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ExecutorError::Spawn {
            tool: tool.display().to_string(),
            source,
        })?;
    }

    let diagnostics = spawn_and_wait(&tool, &argv, &module.module_dir, adapter, cancellation)?;

    // The depfile this run just wrote may name headers the prior run never
    // saw; fingerprint the freshly discovered set, not the one `decide`
    // was handed.
    let final_inputs = source_and_header_paths(adapter, &depfile_path, &data.source_path)?;
    let mut inputs = Vec::with_capacity(final_inputs.len());
    for path in &final_inputs {
        inputs.push(FileFingerprint::capture(path).map_err(|source| ExecutorError::Spawn {
            tool: "fingerprint".to_owned(),
            source,
        })?);
    }

    let record = IncrementalRecord {
        tool_path: tool,
        tool_version_hash: adapter.name().to_owned(),
        argument_hash,
        inputs,
        output: FileFingerprint::capture(&data.output_object_path).map_err(|source| ExecutorError::Spawn {
            tool: "fingerprint".to_owned(),
            source,
        })?,
        variant_id: module.variant_id(),
    };
    oracle.commit(&content_key, &record)?;

    Ok(RunOutcome::Built(diagnostics))
}

/// The source file followed by every header the adapter's depfile (from
/// the prior build, if any) reports, deduplicated and with the source
/// itself never repeated even when the depfile format includes it.
fn source_and_header_paths(
    adapter: &dyn ToolchainAdapter,
    depfile_path: &Option<PathBuf>,
    source_path: &std::path::Path,
) -> Result<Vec<PathBuf>, ExecutorError> {
    let discovered = match depfile_path {
        Some(path) if path.is_file() => adapter.parse_depfile(path)?,
        _ => Vec::new(),
    };
    let mut paths = vec![source_path.to_path_buf()];
    for header in discovered {
        if header != *source_path && !paths.contains(&header) {
            paths.push(header);
        }
    }
    Ok(paths)
}

fn run_link<P: ModuleProvider>(
    node: BuildNode,
    module_id: ModuleNodeId,
    adapter: &dyn ToolchainAdapter,
    plan: &BuildPlan,
    graph: &ModuleGraph<P>,
    platform: Platform,
    cancellation: &CancellationToken,
) -> Result<RunOutcome, ExecutorError> {
    let data = &plan.link_info[&node];
    let module = module_of(graph, module_id);

    let kind = match node {
        BuildNode::LinkStatic { .. } => LinkKind::Static,
        BuildNode::LinkShared { .. } => LinkKind::Shared,
        BuildNode::LinkExecutable { .. } => LinkKind::Executable {
            gui: data.subsystem == Some(Subsystem::Gui),
        },
        _ => unreachable!("run_link is only called for link nodes"),
    };

    let ctx = LinkContext {
        output: &data.output,
        libraries: &data.libraries,
        library_search_paths: &data.library_search_paths,
        kind,
    };
    let argv = adapter.assemble_link_argv(&data.inputs, &ctx)?;
    let tool = adapter.executable_path(module, ToolStep::Link(kind), platform)?;

    if let Some(parent) = data.output.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ExecutorError::Spawn {
            tool: tool.display().to_string(),
            source,
        })?;
    }

    let diagnostics = spawn_and_wait(&tool, &argv, &module.module_dir, adapter, cancellation)?;
    Ok(RunOutcome::Built(diagnostics))
}

fn run_copy<P: ModuleProvider>(
    node: BuildNode,
    module_id: ModuleNodeId,
    plan: &BuildPlan,
    graph: &ModuleGraph<P>,
) -> Result<RunOutcome, ExecutorError> {
    let data = &plan.copy_info[&node];
    let module = module_of(graph, module_id);
    match data.kind {
        CopyKind::File => aux_copy::copy_file(module, data)?,
        CopyKind::Directory => aux_copy::copy_directory(module, data)?,
    }
    Ok(RunOutcome::Built(Vec::new()))
}

/// Spawns `tool argv` with no shell involved, working directory pinned to
/// `cwd`, `PATH` inherited, and no inherited stdin. Polls for exit so a
/// cancellation request can kill the child instead of blocking forever on
/// `wait`.
fn spawn_and_wait(
    tool: &std::path::Path,
    argv: &[String],
    cwd: &std::path::Path,
    adapter: &dyn ToolchainAdapter,
    cancellation: &CancellationToken,
) -> Result<Vec<Diagnostic>, ExecutorError> {
    let mut child: Child = Command::new(tool)
        .args(argv)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExecutorError::Spawn {
            tool: tool.display().to_string(),
            source,
        })?;

    // Drain both pipes on their own threads while the main thread polls
    // for exit: reading only after the child stops would deadlock once
    // its output fills the OS pipe buffer.
    use std::io::Read;
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stdout_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stderr_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let mut cancelled = false;
    loop {
        if cancellation.is_cancelled() {
            let _ = child.kill();
            cancelled = true;
            break;
        }
        match child.try_wait() {
            Ok(Some(_status)) => break,
            Ok(None) => std::thread::sleep(Duration::from_millis(20)),
            Err(source) => {
                return Err(ExecutorError::Spawn {
                    tool: tool.display().to_string(),
                    source,
                })
            }
        }
    }

    let status = child.wait().map_err(|source| ExecutorError::Spawn {
        tool: tool.display().to_string(),
        source,
    })?;
    let stdout_bytes = stdout_reader.join().unwrap_or_default();
    let stderr_bytes = stderr_reader.join().unwrap_or_default();
    let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

    let parser = DiagnosticParser::new(adapter);
    let mut diagnostics = parser.parse_output(&stdout);
    diagnostics.extend(parser.parse_output(&stderr));

    if cancelled {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            file: None,
            line: None,
            column: None,
            code: None,
            message: format!("{} cancelled", tool.display()),
        });
        return Err(ExecutorError::ToolFailure {
            tool: tool.display().to_string(),
            diagnostics,
        });
    }
    if !status.success() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            file: None,
            line: None,
            column: None,
            code: None,
            message: format!("{} exited with {status}", tool.display()),
        });
        return Err(ExecutorError::ToolFailure {
            tool: tool.display().to_string(),
            diagnostics,
        });
    }

    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    // Scheduler-only tests: no real ModuleGraph is needed, just BuildNodes
    // wired together (or not) in a BuildPlan's graph.
    fn fresh_module_ids(n: usize) -> Vec<ModuleNodeId> {
        let mut slots: SlotMap<ModuleNodeId, ()> = SlotMap::with_key();
        (0..n).map(|_| slots.insert(())).collect()
    }

    #[test]
    fn scheduler_marks_nodes_with_no_edges_immediately_ready() {
        let ids = fresh_module_ids(2);
        let mut plan = BuildPlan::default();
        plan.graph.add_node(BuildNode::LinkStatic { module: ids[0] });
        plan.graph.add_node(BuildNode::LinkStatic { module: ids[1] });

        let scheduler = Scheduler::new(&plan).unwrap();
        assert_eq!(scheduler.ready.len(), 2);
        assert_eq!(scheduler.in_flight, 0);
    }

    #[test]
    fn failure_cascades_skip_to_transitive_dependents_only() {
        let ids = fresh_module_ids(3);
        let compile = BuildNode::CompileSource {
            module: ids[0],
            source_index: 0,
        };
        let link = BuildNode::LinkStatic { module: ids[0] };
        let unrelated = BuildNode::LinkStatic { module: ids[1] };

        let mut plan = BuildPlan::default();
        plan.graph.add_node(compile);
        plan.graph.add_node(link);
        plan.graph.add_node(unrelated);
        plan.graph.add_edge(link, compile, ());

        let mut scheduler = Scheduler::new(&plan).unwrap();
        assert_eq!(scheduler.ready.len(), 2, "compile and the unrelated link both start ready");

        scheduler.in_flight += 1;
        scheduler.record(NodeResult {
            node: compile,
            outcome: Err(ExecutorError::PlanCycle),
        });

        assert_eq!(scheduler.status[&compile], NodeStatus::Failed);
        assert_eq!(scheduler.status[&link], NodeStatus::Skipped);
        assert_eq!(scheduler.status[&unrelated], NodeStatus::Ready);
        assert_eq!(scheduler.failed, 1);
        assert_eq!(scheduler.skipped, 1);
    }

    #[test]
    fn reporter_formats_the_required_summary_shape() {
        let outcome = BuildOutcome {
            built: 3,
            skipped: 1,
            failed: 2,
            diagnostics: vec![],
        };
        assert_eq!(Reporter::summary_line(&outcome), "3 built, 1 skipped, 2 failed");
    }

    #[test]
    fn source_and_header_paths_falls_back_to_source_only_without_a_depfile() {
        let adapter = crate::toolchain::gcc::GccToolchain::default();
        let src = PathBuf::from("inflate.c");
        let paths = source_and_header_paths(&adapter, &None, &src).unwrap();
        assert_eq!(paths, vec![src]);
    }

    #[test]
    fn source_and_header_paths_reads_headers_from_an_existing_depfile_without_duplicating_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("inflate.c");
        std::fs::write(&src, "").unwrap();
        let depfile = dir.path().join("inflate.o.d");
        std::fs::write(&depfile, format!("inflate.o: {} zlib.h\n", src.display())).unwrap();

        let adapter = crate::toolchain::gcc::GccToolchain::default();
        let paths = source_and_header_paths(&adapter, &Some(depfile), &src).unwrap();
        assert_eq!(paths, vec![src, dir.path().join("zlib.h")]);
    }
}
