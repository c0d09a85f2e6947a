//! Executes a grammar's stages against a process runner

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::ConformError;
use crate::pipeline::stage::{plan, Stage, Target};
use crate::process::{Interrupt, Invocation, ProcessRunner};
use crate::progress::{Progress, Reporter};
use crate::registry::Grammar;
use crate::staging;
use crate::toolchain::{Platform, Toolchain};

/// Where the driver leaves per-target results, relative to the staged directory
pub const RESULTS_DIR: &str = "testfiles/results";

/// Settings shared by every grammar in a run
#[derive(Debug, Clone)]
pub struct PipelineEnv {
    pub toolchain: Toolchain,
    pub project_root: PathBuf,
    /// Full path of the Jython archive
    pub jython: PathBuf,
    /// Pass `-q` to the driver
    pub quiet: bool,
    /// Running under CI, which changes how IronPython is launched
    pub ci: bool,
    pub platform: Platform,
}

impl PipelineEnv {
    fn generator(&self) -> PathBuf {
        Toolchain::in_project(&self.project_root, &self.toolchain.generator_jar)
    }

    fn driver(&self) -> PathBuf {
        Toolchain::in_project(&self.project_root, &self.toolchain.driver_script)
    }

    fn examples(&self) -> PathBuf {
        Toolchain::in_project(&self.project_root, &self.toolchain.examples_dir)
    }

    fn driver_name(&self) -> String {
        self.toolchain
            .driver_script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.toolchain.driver_script.to_string_lossy().into_owned())
    }

    fn quiet_flag(&self) -> Vec<String> {
        if self.quiet {
            vec!["-q".to_string()]
        } else {
            Vec::new()
        }
    }

    fn generator_base(&self) -> Invocation {
        Invocation::new(&self.toolchain.java)
            .arg("-jar")
            .path_arg(self.generator())
            .args(["-n", "-q"])
            .current_dir(&self.project_root)
    }

    fn driver_base(&self, target: Target) -> Result<Invocation, ConformError> {
        let base = match target {
            Target::Java => Invocation::new(&self.toolchain.java)
                .arg("-jar")
                .path_arg(&self.jython),
            Target::CSharp => self
                .toolchain
                .ironpython
                .invocation(self.ci, self.platform)?
                .args(self.toolchain.ironpython.flags.iter().cloned()),
        };
        Ok(base.arg(self.driver_name()).args(self.quiet_flag()))
    }
}

/// One grammar together with the working directory allocated for it
#[derive(Debug, Clone)]
pub struct GrammarRun<'a> {
    pub grammar: &'a Grammar,
    pub workdir: PathBuf,
    /// `<workdir>/<grammar dir>`, where fixtures are staged and tools run
    pub staged: PathBuf,
}

impl<'a> GrammarRun<'a> {
    pub fn new(grammar: &'a Grammar, workdir: impl AsRef<Path>) -> Self {
        let workdir = workdir.as_ref().to_path_buf();
        let staged = workdir.join(&grammar.dir);
        GrammarRun {
            grammar,
            workdir,
            staged,
        }
    }

    fn csharp_dir(&self) -> PathBuf {
        self.staged.join(&self.grammar.csdir)
    }

    /// The external command `stage` runs, or `None` when there is nothing to run.
    pub fn invocation(
        &self,
        stage: Stage,
        env: &PipelineEnv,
    ) -> Result<Option<Invocation>, ConformError> {
        let grammar = self.grammar;
        let inv = match stage {
            Stage::Fixtures => return Ok(None),
            Stage::GeneratePreprocessor(target) => {
                let Some(pp) = grammar.preprocessor.as_ref() else {
                    return Ok(None);
                };
                let base = env.generator_base();
                let base = match target {
                    Target::Java => base,
                    Target::CSharp => base
                        .args(["-lang", "csharp", "-d"])
                        .path_arg(self.csharp_dir().join(&pp.csharp_subdir)),
                };
                base.path_arg(self.staged.join(&pp.grammar))
            }
            Stage::Generate(target) => {
                let base = env.generator_base();
                let base = match target {
                    Target::Java => base,
                    Target::CSharp => base.args(["-lang", "csharp"]),
                };
                base.args(grammar.generator_args.iter().cloned())
                    .path_arg(self.staged.join(&grammar.grammar))
            }
            Stage::Build(Target::Java) => Invocation::new(&env.toolchain.javac)
                .path_arg(grammar.java_parser_source())
                .current_dir(&self.staged),
            Stage::Build(Target::CSharp) => Invocation::new(&env.toolchain.dotnet)
                .args(["build", "--nologo"])
                .current_dir(self.csharp_dir()),
            Stage::RunLexer(target) => env
                .driver_base(target)?
                .arg(self.lexer_name(target))
                .arg(&grammar.ext)
                .current_dir(&self.staged),
            Stage::RunParser(target) => env
                .driver_base(target)?
                .args(["--parser", grammar.production.as_str()])
                .arg(self.parser_name(target))
                .arg(&grammar.ext)
                .current_dir(&self.staged),
            Stage::Compare => {
                let results = Path::new(RESULTS_DIR);
                let mut diff = Invocation::new(&env.toolchain.diff);
                if env.platform == Platform::Windows {
                    diff = diff.arg("-b");
                }
                diff.arg("-r")
                    .path_arg(results.join(Target::Java.results_dir()))
                    .path_arg(results.join(Target::CSharp.results_dir()))
                    .current_dir(&self.staged)
            }
        };
        Ok(Some(inv))
    }

    fn lexer_name(&self, target: Target) -> &str {
        match target {
            Target::Java => &self.grammar.jlexer,
            Target::CSharp => &self.grammar.cspackage,
        }
    }

    fn parser_name(&self, target: Target) -> &str {
        match target {
            Target::Java => &self.grammar.jparser,
            Target::CSharp => &self.grammar.cspackage,
        }
    }

    fn stage_fixtures(&self, env: &PipelineEnv) -> Result<(), ConformError> {
        let source = self.grammar.source_dir(&env.project_root, &env.examples());
        fs::create_dir_all(&self.staged)
            .map_err(|e| ConformError::io_at("Creating", &self.staged, e))?;
        staging::stage_fixtures(&source, &self.staged, &self.grammar.files)?;

        let driver = env.driver();
        let target = self.staged.join(env.driver_name());
        fs::copy(&driver, &target).map_err(|e| ConformError::io_at("Copying", &driver, e))?;
        Ok(())
    }
}

/// Runs the planned stages of one grammar, stopping at the first failure
pub struct Pipeline<'a> {
    env: &'a PipelineEnv,
    runner: &'a mut dyn ProcessRunner,
    reporter: &'a mut dyn Reporter,
    interrupt: &'a Interrupt,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        env: &'a PipelineEnv,
        runner: &'a mut dyn ProcessRunner,
        reporter: &'a mut dyn Reporter,
        interrupt: &'a Interrupt,
    ) -> Self {
        Pipeline {
            env,
            runner,
            reporter,
            interrupt,
        }
    }

    pub fn run(&mut self, run: &GrammarRun<'_>) -> Result<(), ConformError> {
        self.reporter.report(&Progress::GrammarStarted {
            name: run.grammar.name.clone(),
        });
        self.reporter
            .report(&Progress::WorkingDirectory(run.workdir.clone()));

        for stage in plan(run.grammar) {
            self.interrupt.check()?;
            self.execute(stage, run)?;
        }
        Ok(())
    }

    fn execute(&mut self, stage: Stage, run: &GrammarRun<'_>) -> Result<(), ConformError> {
        log::debug!("[{}] stage {}", run.grammar.key, stage);
        let started = Instant::now();
        let completed = match stage {
            Stage::Fixtures => run.stage_fixtures(self.env).map(|()| true),
            _ => self.run_external(stage, run),
        };
        if !completed.map_err(|err| stage.wrap(err))? {
            log::debug!("[{}] nothing to run for {}", run.grammar.key, stage);
            return Ok(());
        }
        let elapsed = stage.is_timed().then(|| started.elapsed());
        self.reporter
            .report(&Progress::StageCompleted { stage, elapsed });
        Ok(())
    }

    /// Run the process behind `stage`. `Ok(false)` when the stage has nothing to run.
    fn run_external(&mut self, stage: Stage, run: &GrammarRun<'_>) -> Result<bool, ConformError> {
        let Some(invocation) = run.invocation(stage, self.env)? else {
            return Ok(false);
        };
        let outcome = self.runner.run(&invocation)?;
        self.interrupt.check()?;
        if !outcome.success() {
            self.interrupt.check_settled()?;
            log::debug!("{} exited with {:?}", invocation.program, outcome.code);
            return Err(stage.failure());
        }
        Ok(true)
    }
}
