//! The stage orchestrator: sequencing, checkpoint reuse, idempotent re-entry.
//!
//! [`Orchestrator::process`] is the heart of the crate. Given a stage name
//! it resolves the stage's artifacts under the base directory, short-circuits
//! if the stage already completed, forwards the dependency checkpoint,
//! merges the stage keywords into the engine configuration, allocates
//! resources, runs the engine, and extracts the final structure from the
//! produced log.
//!
//! # Failure policy
//!
//! Configuration and precondition problems (unknown stage, unreadable input,
//! missing checkpoint source) abort the invocation with an error before the
//! engine is touched. A non-zero engine exit code does NOT abort: it is
//! logged as a warning and the log is still parsed, so a partially usable
//! run leaves its structure artifact behind for manual inspection. Only a
//! log that cannot be parsed stops the invocation at that point.
//!
//! # Concurrency
//!
//! One orchestrator instance per base directory, strictly synchronous. The
//! engine call blocks until the external process exits; there is no
//! cancellation or timeout.

use crate::checkpoint::{self, CheckpointError};
use crate::config::{self, ConfigError};
use crate::engine::EngineClient;
use crate::geometry::Geometry;
use crate::io::{self, IoError};
use crate::parser::{self, ParseError};
use crate::resources::{self, ResourceProvider};
use crate::stage::{SubstitutionError, Substitutions, STAGES};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by stage processing.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The requested stage is not in the registry
    #[error("unknown stage `{0}`; expected one of: opt, gs, td")]
    UnknownStage(String),
    /// The stage's input structure artifact is missing or unreadable
    #[error("input structure {path} for stage `{stage}` is unreadable: {source}")]
    MissingInput {
        /// Stage being processed
        stage: String,
        /// Expected input artifact path
        path: String,
        /// Underlying read failure
        source: IoError,
    },
    /// The declared checkpoint dependency could not be forwarded
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    /// A keyword or filename template failed to render
    #[error(transparent)]
    Substitution(#[from] SubstitutionError),
    /// The engine log could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Writing the output structure artifact failed
    #[error("structure output failed: {0}")]
    Structure(#[from] IoError),
    /// The JSON config file could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Launching the engine or writing its input failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for orchestrator operations
type Result<T> = std::result::Result<T, ProcessError>;

/// Per-invocation parameters for a stage run.
///
/// `root` and `nstates` select the excited state for the `td` stage; the
/// other stages ignore them. Overrides come from the `--extras` CLI string
/// and extend (or shadow) the substitution map used to render keyword and
/// filename templates.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Excited-state root selector
    pub root: u32,
    /// Number of excited states to solve for
    pub nstates: u32,
    /// Caller-supplied substitution overrides
    pub overrides: BTreeMap<String, String>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            root: 1,
            nstates: 5,
            overrides: BTreeMap::new(),
        }
    }
}

/// Result of one engine execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionResult {
    /// Exit code reported by the engine process
    pub exit_code: i32,
    /// Whether the engine exited cleanly
    pub success: bool,
    /// Final structure parsed from the engine log
    pub final_structure: Option<Geometry>,
}

/// Outcome of a `process` invocation.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// All declared outputs already existed; nothing was run
    AlreadyComplete,
    /// The engine ran; see the execution result
    Finished(ExecutionResult),
}

impl ProcessOutcome {
    /// True when the stage was skipped because its outputs already exist.
    pub fn already_complete(&self) -> bool {
        matches!(self, ProcessOutcome::AlreadyComplete)
    }
}

/// Drives pipeline stages against an engine under one base directory.
pub struct Orchestrator<E: EngineClient, R: ResourceProvider> {
    base: PathBuf,
    engine: E,
    resources: R,
}

impl<E: EngineClient, R: ResourceProvider> Orchestrator<E, R> {
    /// Creates an orchestrator over a base directory.
    ///
    /// The directory must contain a readable primordial `init.xyz`; this is
    /// checked here so a misconfigured invocation fails before any stage
    /// work starts. The built-in stage registry is validated at the same
    /// time.
    pub fn new(base: impl Into<PathBuf>, engine: E, resources: R) -> Result<Self> {
        crate::stage::validate_registry()?;
        let base = base.into();

        let init = base.join(crate::cleanup::PRIMORDIAL_INPUT);
        io::read_xyz(&init).map_err(|source| ProcessError::MissingInput {
            stage: "init".to_string(),
            path: init.display().to_string(),
            source,
        })?;

        Ok(Self {
            base,
            engine,
            resources,
        })
    }

    /// Merges a JSON config file into the engine configuration.
    pub fn load_config(&mut self, path: &Path) -> Result<()> {
        let defaults = config::load_config(path)?;
        self.engine.configure(&defaults);
        info!("merged engine defaults from {}", path.display());
        Ok(())
    }

    /// The base directory this orchestrator operates on.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Runs one pipeline stage.
    ///
    /// See the module documentation for the exact sequencing and failure
    /// policy. Returns [`ProcessOutcome::AlreadyComplete`] without side
    /// effects when every declared output artifact of the stage already
    /// exists.
    pub fn process(&mut self, stage_name: &str, ctx: &RunContext) -> Result<ProcessOutcome> {
        let spec = STAGES
            .get(stage_name)
            .ok_or_else(|| ProcessError::UnknownStage(stage_name.to_string()))?;

        let input_path = self.base.join(spec.input);
        let structure = io::read_xyz(&input_path).map_err(|source| ProcessError::MissingInput {
            stage: spec.name.to_string(),
            path: input_path.display().to_string(),
            source,
        })?;

        let mut subs = Substitutions::new(ctx.root, ctx.nstates);
        subs.extend(&ctx.overrides);

        let chk_path = self.base.join(format!("{}.chk", spec.name));
        let log_path = self.base.join(format!("{}.log", spec.name));
        let output_path = match spec.output_template {
            Some(template) => Some(self.base.join(subs.apply(template)?)),
            None => None,
        };

        let mut expected = vec![chk_path, log_path.clone()];
        expected.extend(output_path.clone());
        if expected.iter().all(|p| p.exists()) {
            info!("calculation stage {} is finished", spec.name);
            return Ok(ProcessOutcome::AlreadyComplete);
        }

        // Forward the dependency checkpoint before the keyword merge, so
        // keywords like geom=allcheck find it in place.
        if let Some(source_stage) = spec.checkpoint_source {
            checkpoint::copy_checkpoint(&self.base, source_stage, spec.name)?;
        }

        let mut options = BTreeMap::new();
        for (key, template) in spec.keywords {
            options.insert((*key).to_string(), subs.apply(template)?);
        }

        let nproc = self.resources.max_processes().unwrap_or(1);
        let mem = resources::memory_mb(nproc);
        options.insert("mem".to_string(), format!("{}MB", mem));
        options.insert("nprocshared".to_string(), nproc.to_string());
        options.insert("chk".to_string(), format!("{}.chk", spec.name));
        self.engine.configure(&options);

        let label = self.base.join(spec.name);
        self.engine.write_input(&structure, &label.with_extension("com"))?;

        info!("running stage {} with {} process(es)", spec.name, nproc);
        let exit_code = self.engine.run(&label)?;
        let success = exit_code == 0;
        if !success {
            warn!(
                "stage {} exited with code {}, please check {}",
                spec.name,
                exit_code,
                log_path.display()
            );
        }

        let final_structure = parser::final_structure(&log_path)?;
        if let Some(path) = &output_path {
            io::write_xyz(&final_structure, path)?;
        }

        Ok(ProcessOutcome::Finished(ExecutionResult {
            exit_code,
            success,
            final_structure: Some(final_structure),
        }))
    }
}
