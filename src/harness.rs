//! Orchestrates a conformance run
//!
//! Selects grammars, optionally checks the toolchain, then runs each grammar's pipeline in
//! its own working directory, one after the other. The first failure ends the run. Working
//! directories are removed after a clean run and kept when the run fails (subject to
//! `keep_on_failure`) or when retention is requested.

use std::path::PathBuf;

use crate::error::ConformError;
use crate::pipeline::{GrammarRun, Pipeline, PipelineEnv};
use crate::preflight::Preflight;
use crate::process::{Interrupt, ProcessRunner};
use crate::progress::Reporter;
use crate::registry::{Grammar, GrammarRegistry, Selection};
use crate::toolchain::{Platform, Toolchain};
use crate::workspace::{Disposal, WorkArea, WorkspaceSettings};

/// User-supplied options for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding the generator archive, the driver and the examples
    pub project_root: PathBuf,
    pub jython_dir: PathBuf,
    /// Check the toolchain before doing anything else
    pub preflight: bool,
    /// Running under CI
    pub ci: bool,
    /// Forward `-q` to the driver
    pub quiet: bool,
    /// Keep working directories even after a clean run
    pub retain: bool,
    pub selection: Selection,
}

/// What a successful run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Keys of the grammars that passed, in run order
    pub tested: Vec<String>,
    pub workdirs: Vec<PathBuf>,
    pub disposal: Disposal,
}

pub struct Harness<'a> {
    registry: &'a GrammarRegistry,
    toolchain: &'a Toolchain,
    workspace: &'a WorkspaceSettings,
    platform: Platform,
}

impl<'a> Harness<'a> {
    pub fn new(
        registry: &'a GrammarRegistry,
        toolchain: &'a Toolchain,
        workspace: &'a WorkspaceSettings,
    ) -> Self {
        Harness {
            registry,
            toolchain,
            workspace,
            platform: Platform::current(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn run(
        &self,
        options: &RunOptions,
        runner: &mut dyn ProcessRunner,
        reporter: &mut dyn Reporter,
        interrupt: &Interrupt,
    ) -> Result<RunSummary, ConformError> {
        let grammars = self.registry.select(&options.selection)?;

        if options.preflight {
            Preflight::new(runner, self.toolchain)
                .ci(options.ci)
                .platform(self.platform)
                .interrupt(interrupt)
                .check(&options.jython_dir)?;
        }

        let env = PipelineEnv {
            toolchain: self.toolchain.clone(),
            project_root: options.project_root.clone(),
            jython: self.toolchain.jython_path(&options.jython_dir),
            quiet: options.quiet,
            ci: options.ci,
            platform: self.platform,
        };

        let mut area = WorkArea::new(self.workspace.clone());
        let mut tested = Vec::new();
        let outcome = run_grammars(
            &grammars,
            &env,
            &mut area,
            &mut tested,
            runner,
            reporter,
            interrupt,
        );

        if let Err(err) = &outcome {
            log::debug!("run failed: {:?}", err);
        }
        let workdirs = area.dirs().to_vec();
        let disposal = area.finish(outcome.is_err(), options.retain, reporter);

        outcome?;
        Ok(RunSummary {
            tested,
            workdirs,
            disposal: disposal?,
        })
    }
}

fn run_grammars(
    grammars: &[&Grammar],
    env: &PipelineEnv,
    area: &mut WorkArea,
    tested: &mut Vec<String>,
    runner: &mut dyn ProcessRunner,
    reporter: &mut dyn Reporter,
    interrupt: &Interrupt,
) -> Result<(), ConformError> {
    for grammar in grammars {
        interrupt.check()?;
        let workdir = area.allocate(&grammar.key)?;
        let run = GrammarRun::new(grammar, workdir);
        Pipeline::new(env, runner, reporter, interrupt).run(&run)?;
        tested.push(grammar.key.clone());
    }
    Ok(())
}
