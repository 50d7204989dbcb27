//! Engine client capability and the Gaussian 09 binding.
//!
//! The orchestrator never talks to a quantum chemistry binary directly. It
//! holds an [`EngineClient`], a small capability with three operations:
//! merge configuration options, write an input file for a structure, and run
//! the engine for a label. This keeps the stage state machine independent of
//! any particular engine binding and lets the tests substitute a stub engine.
//!
//! [`GaussianEngine`] is the production binding. It accumulates an ordered
//! option map and renders it into a Gaussian input file:
//!
//! ```text
//! %chk=opt.chk
//! %nprocshared=4
//! %mem=8192MB
//! # B3LYP/6-31G* opt
//!
//! opt
//!
//! 0 1
//! O  0.00000000  0.00000000  0.00000000
//! ...
//! ```
//!
//! `run` feeds `<label>.com` to the engine on stdin and captures stdout as
//! `<label>.log`, the conventional Gaussian invocation. A non-zero exit code
//! is returned as data; only a failure to launch the process is an error.

use crate::geometry::Geometry;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Option keys rendered as Link0 `%` directives instead of route keywords.
const LINK0_KEYS: &[&str] = &["chk", "nprocshared", "mem"];

/// Option keys consumed by the molecule specification section.
const MOLECULE_KEYS: &[&str] = &["charge", "mult"];

/// Capability for configuring and running an external calculation engine.
pub trait EngineClient {
    /// Merges options into the engine configuration, overwriting existing keys.
    fn configure(&mut self, options: &BTreeMap<String, String>);

    /// Writes the engine input file for a structure at the given path.
    fn write_input(&self, structure: &Geometry, path: &Path) -> io::Result<()>;

    /// Runs the engine for `label` (a path without extension) and returns
    /// the exit code. Spawn failures are I/O errors; a non-zero exit code
    /// is not.
    fn run(&self, label: &Path) -> io::Result<i32>;
}

/// Gaussian 09 engine binding.
pub struct GaussianEngine {
    /// Engine executable (e.g. "g09", "/opt/gaussian/g09")
    command: String,
    /// Accumulated configuration options in sorted key order
    options: BTreeMap<String, String>,
    /// Scratch directory exported to the engine as `GAUSS_SCRDIR`
    scratch: Option<PathBuf>,
}

impl GaussianEngine {
    /// Creates an engine binding for the given executable.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            options: BTreeMap::new(),
            scratch: None,
        }
    }

    /// Sets the scratch directory propagated to the engine via `GAUSS_SCRDIR`.
    pub fn with_scratch(mut self, scratch: Option<PathBuf>) -> Self {
        self.scratch = scratch;
        self
    }

    /// Returns a configured option value.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Builds the route section from the configured options.
    ///
    /// `method` and `basis` join as `method/basis` at the head of the route;
    /// Link0 and molecule keys are excluded; a keyword whose value is empty
    /// or equal to its own name renders bare (`opt` rather than `opt=opt`).
    fn route_section(&self) -> String {
        let mut route = String::from("#");

        let method = self.options.get("method").map(String::as_str).unwrap_or("");
        let basis = self.options.get("basis").map(String::as_str).unwrap_or("");
        match (method.is_empty(), basis.is_empty()) {
            (false, false) => route.push_str(&format!(" {}/{}", method, basis)),
            (false, true) => route.push_str(&format!(" {}", method)),
            _ => {}
        }

        for (key, value) in &self.options {
            let key = key.as_str();
            if key == "method"
                || key == "basis"
                || LINK0_KEYS.contains(&key)
                || MOLECULE_KEYS.contains(&key)
            {
                continue;
            }
            if value.is_empty() || value == key {
                route.push_str(&format!(" {}", key));
            } else {
                route.push_str(&format!(" {}={}", key, value));
            }
        }
        route
    }
}

impl EngineClient for GaussianEngine {
    fn configure(&mut self, options: &BTreeMap<String, String>) {
        for (key, value) in options {
            self.options.insert(key.clone(), value.clone());
        }
    }

    fn write_input(&self, structure: &Geometry, path: &Path) -> io::Result<()> {
        let mut content = String::new();
        for key in LINK0_KEYS {
            if let Some(value) = self.options.get(*key) {
                content.push_str(&format!("%{}={}\n", key, value));
            }
        }
        content.push_str(&self.route_section());
        content.push_str("\n\n");

        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("calculation");
        content.push_str(title);
        content.push_str("\n\n");

        let charge = self.options.get("charge").map(String::as_str).unwrap_or("0");
        let mult = self.options.get("mult").map(String::as_str).unwrap_or("1");
        content.push_str(&format!("{} {}\n", charge, mult));

        for i in 0..structure.num_atoms {
            let coords = structure.get_atom_coords(i);
            content.push_str(&format!(
                "{}  {:.8}  {:.8}  {:.8}\n",
                structure.elements[i], coords[0], coords[1], coords[2]
            ));
        }
        content.push('\n');

        fs::write(path, content)
    }

    fn run(&self, label: &Path) -> io::Result<i32> {
        let com_path = label.with_extension("com");
        let log_path = label.with_extension("log");
        debug!(
            "running {} < {} > {}",
            self.command,
            com_path.display(),
            log_path.display()
        );

        let input = fs::File::open(&com_path)?;
        let output = fs::File::create(&log_path)?;
        let mut command = Command::new(&self.command);
        command
            .stdin(Stdio::from(input))
            .stdout(Stdio::from(output));
        if let Some(dir) = label.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        if let Some(scratch) = &self.scratch {
            command.env("GAUSS_SCRDIR", scratch);
        }

        let status = command.status()?;
        // A signal-terminated engine has no code; report it as failure.
        Ok(status.code().unwrap_or(-1))
    }
}
