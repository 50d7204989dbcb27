use g09run::engine::EngineClient;
use g09run::geometry::Geometry;
use g09run::orchestrator::{Orchestrator, ProcessError, ProcessOutcome, RunContext};
use g09run::resources::ResourceProvider;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Minimal but well-formed Gaussian log: one orientation block followed by
/// its terminator, enough for the structure parser.
const STUB_LOG: &str = "\
 Entering Gaussian System
                         Input orientation:
 ---------------------------------------------------------------------
 Center     Atomic      Atomic             Coordinates (Angstroms)
 Number     Number       Type             X           Y           Z
 ---------------------------------------------------------------------
      1          8           0        0.000000    0.000000    0.117790
      2          1           0        0.000000    0.755453   -0.471161
      3          1           0        0.000000   -0.755453   -0.471161
 ---------------------------------------------------------------------
 Rotational constants (GHZ):    823.23  437.96  285.73
 Normal termination of Gaussian 09
";

/// Deterministic resource provider; no environment involved.
struct FixedResources {
    nproc: Option<usize>,
}

impl ResourceProvider for FixedResources {
    fn max_processes(&self) -> Option<usize> {
        self.nproc
    }

    fn scratch_dir(&self) -> Option<PathBuf> {
        None
    }
}

/// Engine double: records configuration, counts runs, fabricates outputs.
///
/// `run` writes the log and creates the checkpoint only when absent, the
/// way a checkpoint forwarded from a dependency stage would survive a real
/// engine run that reads it via `geom=allcheck`.
#[derive(Clone)]
struct StubEngine {
    options: Rc<RefCell<BTreeMap<String, String>>>,
    runs: Rc<Cell<usize>>,
    exit_code: i32,
}

impl StubEngine {
    fn new(exit_code: i32) -> Self {
        Self {
            options: Rc::new(RefCell::new(BTreeMap::new())),
            runs: Rc::new(Cell::new(0)),
            exit_code,
        }
    }

    fn option(&self, key: &str) -> Option<String> {
        self.options.borrow().get(key).cloned()
    }

    fn run_count(&self) -> usize {
        self.runs.get()
    }
}

impl EngineClient for StubEngine {
    fn configure(&mut self, options: &BTreeMap<String, String>) {
        self.options.borrow_mut().extend(options.clone());
    }

    fn write_input(&self, _structure: &Geometry, path: &Path) -> io::Result<()> {
        fs::write(path, "stub input\n")
    }

    fn run(&self, label: &Path) -> io::Result<i32> {
        self.runs.set(self.runs.get() + 1);
        let chk = label.with_extension("chk");
        if !chk.exists() {
            fs::write(&chk, b"stub wavefunction")?;
        }
        fs::write(label.with_extension("log"), STUB_LOG)?;
        Ok(self.exit_code)
    }
}

fn write_init(base: &Path) {
    fs::write(
        base.join("init.xyz"),
        "3\nwater\nO 0.0 0.0 0.117790\nH 0.0 0.755453 -0.471161\nH 0.0 -0.755453 -0.471161\n",
    )
    .unwrap();
}

fn orchestrator(
    base: &Path,
    engine: StubEngine,
    nproc: Option<usize>,
) -> Orchestrator<StubEngine, FixedResources> {
    Orchestrator::new(base, engine, FixedResources { nproc }).unwrap()
}

#[test]
fn opt_produces_artifacts_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());
    let engine = StubEngine::new(0);
    let mut orch = orchestrator(dir.path(), engine.clone(), None);

    let outcome = orch.process("opt", &RunContext::default()).unwrap();
    let ProcessOutcome::Finished(result) = outcome else {
        panic!("expected a fresh run");
    };
    assert!(result.success);
    assert_eq!(result.exit_code, 0);
    assert!(dir.path().join("opt.chk").exists());
    assert!(dir.path().join("opt.log").exists());
    assert!(dir.path().join("opt.xyz").exists());
    assert_eq!(engine.run_count(), 1);

    // Second invocation short-circuits without touching the engine.
    let outcome = orch.process("opt", &RunContext::default()).unwrap();
    assert!(outcome.already_complete());
    assert_eq!(engine.run_count(), 1);
}

#[test]
fn unknown_stage_is_rejected_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());
    let engine = StubEngine::new(0);
    let mut orch = orchestrator(dir.path(), engine.clone(), None);

    let err = orch.process("bogus", &RunContext::default()).unwrap_err();
    assert!(matches!(err, ProcessError::UnknownStage(_)));
    assert_eq!(engine.run_count(), 0);

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1); // only init.xyz
}

#[test]
fn missing_input_is_rejected_before_the_engine_runs() {
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());
    let engine = StubEngine::new(0);
    let mut orch = orchestrator(dir.path(), engine.clone(), None);

    // gs reads opt.xyz, which no stage has produced yet.
    let err = orch.process("gs", &RunContext::default()).unwrap_err();
    assert!(matches!(err, ProcessError::MissingInput { .. }));
    assert_eq!(engine.run_count(), 0);
}

#[test]
fn missing_init_is_rejected_at_construction() {
    let dir = tempfile::tempdir().unwrap();
    let result = Orchestrator::new(dir.path(), StubEngine::new(0), FixedResources { nproc: None });
    assert!(matches!(
        result,
        Err(ProcessError::MissingInput { .. })
    ));
}

#[test]
fn gs_checkpoint_is_copied_from_opt() {
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());
    let engine = StubEngine::new(0);
    let mut orch = orchestrator(dir.path(), engine.clone(), None);

    orch.process("opt", &RunContext::default()).unwrap();
    let opt_chk = fs::read(dir.path().join("opt.chk")).unwrap();

    orch.process("gs", &RunContext::default()).unwrap();
    let gs_chk = fs::read(dir.path().join("gs.chk")).unwrap();
    assert_eq!(gs_chk, opt_chk);
    assert!(dir.path().join("gs.xyz").exists());
}

#[test]
fn gs_without_opt_checkpoint_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());
    // Provide the gs input structure but not the opt checkpoint.
    fs::copy(dir.path().join("init.xyz"), dir.path().join("opt.xyz")).unwrap();
    let engine = StubEngine::new(0);
    let mut orch = orchestrator(dir.path(), engine.clone(), None);

    let err = orch.process("gs", &RunContext::default()).unwrap_err();
    assert!(matches!(err, ProcessError::Checkpoint(_)));
    assert_eq!(engine.run_count(), 0);
}

#[test]
fn td_renders_root_and_nstates_into_keywords_and_filename() {
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());
    let engine = StubEngine::new(0);
    let mut orch = orchestrator(dir.path(), engine.clone(), None);
    orch.process("opt", &RunContext::default()).unwrap();

    let ctx = RunContext {
        root: 2,
        nstates: 10,
        ..RunContext::default()
    };
    orch.process("td", &ctx).unwrap();

    assert!(dir.path().join("td-2.xyz").exists());
    assert_eq!(
        engine.option("td").as_deref(),
        Some("(root=2,nstates=10)")
    );
}

#[test]
fn extras_override_shadows_root() {
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());
    let engine = StubEngine::new(0);
    let mut orch = orchestrator(dir.path(), engine.clone(), None);
    orch.process("opt", &RunContext::default()).unwrap();

    let mut overrides = BTreeMap::new();
    overrides.insert("root".to_string(), "3".to_string());
    let ctx = RunContext {
        overrides,
        ..RunContext::default()
    };
    orch.process("td", &ctx).unwrap();

    assert!(dir.path().join("td-3.xyz").exists());
    assert_eq!(
        engine.option("td").as_deref(),
        Some("(root=3,nstates=5)")
    );
}

#[test]
fn engine_failure_is_not_fatal_and_log_is_still_parsed() {
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());
    let engine = StubEngine::new(137);
    let mut orch = orchestrator(dir.path(), engine.clone(), None);

    let outcome = orch.process("opt", &RunContext::default()).unwrap();
    let ProcessOutcome::Finished(result) = outcome else {
        panic!("expected a run");
    };
    assert!(!result.success);
    assert_eq!(result.exit_code, 137);
    // Best-effort policy: the structure artifact is still written.
    assert!(dir.path().join("opt.xyz").exists());
}

#[test]
fn resource_allocation_reaches_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());

    // Batch mode with 4 processors: memory stays at the 8192 MB floor.
    let engine = StubEngine::new(0);
    let mut orch = orchestrator(dir.path(), engine.clone(), Some(4));
    orch.process("opt", &RunContext::default()).unwrap();
    assert_eq!(engine.option("nprocshared").as_deref(), Some("4"));
    assert_eq!(engine.option("mem").as_deref(), Some("8192MB"));
    assert_eq!(engine.option("chk").as_deref(), Some("opt.chk"));

    // Interactive mode: one process, same floor.
    let dir = tempfile::tempdir().unwrap();
    write_init(dir.path());
    let engine = StubEngine::new(0);
    let mut orch = orchestrator(dir.path(), engine.clone(), None);
    orch.process("opt", &RunContext::default()).unwrap();
    assert_eq!(engine.option("nprocshared").as_deref(), Some("1"));
    assert_eq!(engine.option("mem").as_deref(), Some("8192MB"));
}
