mod common;

use common::{grammar, toolchain, Project};
use std::fs;
use std::thread;
use std::time::Duration;
use conform::pipeline::{Stage, Target};
use conform::process::Interrupt;
use conform::progress::Progress;
use conform::registry::{GrammarRegistry, PreprocessorGrammar};
use conform::testing::{mentions, ScriptedRunner};
use conform::toolchain::Platform;
use conform::workspace::Disposal;
use conform::{ConformError, Harness, RunOptions, Selection};

fn options(project: &Project, selection: &str) -> RunOptions {
    RunOptions {
        project_root: project.root().to_path_buf(),
        jython_dir: project.root().join("jython"),
        preflight: false,
        ci: false,
        quiet: false,
        retain: false,
        selection: Selection::parse(selection),
    }
}

fn json_project() -> Project {
    let project = Project::new();
    project
        .fixture("json/JSON.ccc", "// grammar\n")
        .fixture("json/testfiles/a.json", "{}\n");
    project
}

fn registry() -> GrammarRegistry {
    GrammarRegistry::from_grammars(vec![
        grammar("json", "JSON", &["JSON.ccc", "testfiles"]),
        grammar("lua", "Lua", &["*.ccc", "testfiles"]),
    ])
}

#[test]
fn json_only_run_cleans_up() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new();
    let mut events: Vec<Progress> = Vec::new();

    let summary = Harness::new(&registry, &toolchain, &workspace)
        .with_platform(Platform::Linux)
        .run(
            &options(&project, "json"),
            &mut runner,
            &mut events,
            &Interrupt::new(),
        )
        .unwrap();

    assert_eq!(summary.tested, vec!["json"]);
    assert_eq!(summary.workdirs.len(), 1);
    assert_eq!(summary.disposal, Disposal::Deleted);
    assert!(project.leftovers().is_empty());

    assert_eq!(runner.count(|inv| inv.program == "diff"), 1);
    assert_eq!(runner.count(|inv| inv.program == "javac"), 1);
    assert_eq!(runner.count(|inv| inv.program == "dotnet"), 1);

    let banners = events
        .iter()
        .filter(|e| matches!(e, Progress::GrammarStarted { .. }))
        .count();
    assert_eq!(banners, 1);
    assert!(events.contains(&Progress::StageCompleted {
        stage: Stage::Compare,
        elapsed: None,
    }));
    assert_eq!(events.last(), Some(&Progress::Deleted));
}

#[test]
fn selection_follows_registry_order() {
    let project = json_project();
    project
        .fixture("lua/Lua.ccc", "// grammar\n")
        .fixture("lua/testfiles/a.lua", "return 1\n");
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new();
    let mut events: Vec<Progress> = Vec::new();

    let summary = Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "lua,json"),
            &mut runner,
            &mut events,
            &Interrupt::new(),
        )
        .unwrap();

    assert_eq!(summary.tested, vec!["json", "lua"]);
    assert_eq!(runner.count(|inv| inv.program == "diff"), 2);
    assert!(project.leftovers().is_empty());
}

#[test]
fn unknown_grammar_runs_nothing() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new();
    let mut events: Vec<Progress> = Vec::new();

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "json,cobol"),
            &mut runner,
            &mut events,
            &Interrupt::new(),
        )
        .unwrap_err();

    assert!(matches!(err, ConformError::UnknownGrammar { ref name, .. } if name == "cobol"));
    assert!(runner.calls().is_empty());
    assert!(events.is_empty());
    assert!(project.leftovers().is_empty());
}

#[test]
fn missing_toolchain_stops_before_staging() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new().missing("java");
    let mut events: Vec<Progress> = Vec::new();
    let mut opts = options(&project, "json");
    opts.preflight = true;

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(&opts, &mut runner, &mut events, &Interrupt::new())
        .unwrap_err();

    assert!(matches!(err, ConformError::MissingDependency(_)));
    assert_eq!(runner.calls().len(), 1);
    assert!(events.is_empty());
    assert!(project.leftovers().is_empty());
}

#[test]
fn failed_stage_keeps_directory() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new().fail_when(|inv| mentions(inv, "javac"), 1);
    let mut events: Vec<Progress> = Vec::new();

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "json"),
            &mut runner,
            &mut events,
            &Interrupt::new(),
        )
        .unwrap_err();

    assert_eq!(err.to_string(), "Java compilation failed");
    assert!(matches!(
        err,
        ConformError::StageFailed {
            stage: Stage::Build(Target::Java),
            ..
        }
    ));
    assert_eq!(runner.count(|inv| inv.program == "dotnet"), 0);

    let kept = project.leftovers();
    assert_eq!(kept.len(), 1);
    assert!(kept[0].join("json").join("JSON.ccc").is_file());
    assert!(matches!(events.last(), Some(Progress::Retained(dir)) if *dir == kept[0]));
}

#[test]
fn failed_stage_removes_directory_when_not_kept() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(false);
    let mut runner = ScriptedRunner::new().fail_when(|inv| mentions(inv, "dotnet"), 1);
    let mut events: Vec<Progress> = Vec::new();

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "json"),
            &mut runner,
            &mut events,
            &Interrupt::new(),
        )
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to build generated C# code");
    assert!(project.leftovers().is_empty());
    assert_eq!(events.last(), Some(&Progress::Deleted));
}

#[test]
fn missing_build_tool_names_the_stage() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new().missing("dotnet");
    let mut events: Vec<Progress> = Vec::new();

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "json"),
            &mut runner,
            &mut events,
            &Interrupt::new(),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        ConformError::StageFailed {
            stage: Stage::Build(Target::CSharp),
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "Failed to build generated C# code: Unable to locate 'dotnet' on the search path"
    );
    assert_eq!(project.leftovers().len(), 1);
}

#[test]
fn missing_driver_script_fails_staging() {
    let project = json_project();
    fs::remove_file(project.root().join("ptest.py")).unwrap();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new();
    let mut events: Vec<Progress> = Vec::new();

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "json"),
            &mut runner,
            &mut events,
            &Interrupt::new(),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        ConformError::StageFailed {
            stage: Stage::Fixtures,
            ..
        }
    ));
    assert!(err.to_string().starts_with("Staging test files failed: "));
    assert!(err.to_string().contains("ptest.py"));
    assert!(runner.calls().is_empty());
}

#[test]
fn differing_results_fail_the_run() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new().fail_when(|inv| inv.program == "diff", 1);
    let mut events: Vec<Progress> = Vec::new();

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "json"),
            &mut runner,
            &mut events,
            &Interrupt::new(),
        )
        .unwrap_err();

    assert!(matches!(err, ConformError::ResultsDiffer));
    assert_eq!(err.to_string(), "Test results differ - should be identical");
    assert_eq!(project.leftovers().len(), 1);
}

#[test]
fn retention_keeps_directories_after_success() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new();
    let mut events: Vec<Progress> = Vec::new();
    let mut opts = options(&project, "json");
    opts.retain = true;

    let summary = Harness::new(&registry, &toolchain, &workspace)
        .run(&opts, &mut runner, &mut events, &Interrupt::new())
        .unwrap();

    assert_eq!(summary.disposal, Disposal::Retained);
    assert_eq!(project.leftovers(), summary.workdirs);
}

#[test]
fn interrupt_stops_after_running_process() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let interrupt = Interrupt::new();
    let raised = interrupt.clone();
    let mut runner =
        ScriptedRunner::new().on(|inv| mentions(inv, "javac"), move |_| raised.trigger());
    let mut events: Vec<Progress> = Vec::new();

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "json"),
            &mut runner,
            &mut events,
            &interrupt,
        )
        .unwrap_err();

    assert!(err.is_interrupt());
    assert_eq!(runner.count(|inv| inv.program == "dotnet"), 0);
    assert_eq!(project.leftovers().len(), 1);
}

#[test]
fn interrupt_reported_after_failed_exit_still_counts() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let interrupt = Interrupt::new();
    let raised = interrupt.clone();
    // the tool dies from Ctrl-C before the watcher raises the flag
    let mut runner = ScriptedRunner::new()
        .on(
            |inv| mentions(inv, "javac"),
            move |_| {
                let late = raised.clone();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(20));
                    late.trigger();
                });
            },
        )
        .fail_when(|inv| mentions(inv, "javac"), 130);
    let mut events: Vec<Progress> = Vec::new();

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "json"),
            &mut runner,
            &mut events,
            &interrupt,
        )
        .unwrap_err();

    assert!(err.is_interrupt());
    assert_eq!(runner.count(|inv| inv.program == "dotnet"), 0);
}

#[test]
fn interrupt_during_preflight_is_not_a_missing_tool() {
    let project = json_project();
    let registry = registry();
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let interrupt = Interrupt::new();
    let raised = interrupt.clone();
    let mut runner = ScriptedRunner::new()
        .on(|inv| inv.program == "java", move |_| raised.trigger())
        .fail_when(|inv| inv.program == "java", 130);
    let mut events: Vec<Progress> = Vec::new();
    let mut opts = options(&project, "json");
    opts.preflight = true;

    let err = Harness::new(&registry, &toolchain, &workspace)
        .run(&opts, &mut runner, &mut events, &interrupt)
        .unwrap_err();

    assert!(err.is_interrupt());
    assert_eq!(runner.calls().len(), 1);
    assert!(events.is_empty());
    assert!(project.leftovers().is_empty());
}

#[test]
fn preprocessor_fixtures_pull_in_sibling_files() {
    let project = Project::new();
    project
        .fixture("preprocessor/Preprocessor.ccc", "// grammar\n")
        .fixture("preprocessor/testfiles/a.cs", "#if DEBUG\n#endif\n")
        .fixture("java/JavaIdentifierDef.ccc", "// ids\n")
        .fixture("java/JavaLexer.ccc", "// not matched\n");
    let mut preprocessor = grammar(
        "preprocessor",
        "Preprocessor",
        &["*.ccc", "testfiles", "../java/Java*IdentifierDef.ccc"],
    );
    preprocessor.generator_args = vec!["-p".into(), "localtest".into()];
    let registry = GrammarRegistry::from_grammars(vec![preprocessor]);
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new();
    let mut events: Vec<Progress> = Vec::new();
    let mut opts = options(&project, "all");
    opts.retain = true;

    let summary = Harness::new(&registry, &toolchain, &workspace)
        .run(&opts, &mut runner, &mut events, &Interrupt::new())
        .unwrap();

    let staged = summary.workdirs[0].join("preprocessor");
    assert!(staged.join("Preprocessor.ccc").is_file());
    assert!(staged.join("testfiles").join("a.cs").is_file());
    assert!(staged.join("JavaIdentifierDef.ccc").is_file());
    assert!(!staged.join("JavaLexer.ccc").exists());
    assert!(staged.join("ptest.py").is_file());
    assert_eq!(
        runner.count(|inv| inv.args.windows(2).any(|w| w == ["-p", "localtest"])),
        2
    );
}

#[test]
fn csharp_preprocessor_is_generated_for_both_targets() {
    let project = Project::new();
    project
        .fixture("csharp/CSharp.ccc", "// grammar\n")
        .fixture("csharp/PPDirectiveLine.ccc", "// pp\n")
        .fixture("csharp/testfiles/a.cs", "class A {}\n");
    let mut csharp = grammar("csharp", "CSharp", &["*.ccc", "testfiles"]);
    csharp.stateful_lexer = true;
    csharp.preprocessor = Some(PreprocessorGrammar {
        grammar: "PPDirectiveLine.ccc".into(),
        csharp_subdir: "ppline".into(),
    });
    let registry = GrammarRegistry::from_grammars(vec![csharp]);
    let toolchain = toolchain();
    let workspace = project.workspace(true);
    let mut runner = ScriptedRunner::new();
    let mut events: Vec<Progress> = Vec::new();

    Harness::new(&registry, &toolchain, &workspace)
        .run(
            &options(&project, "csharp"),
            &mut runner,
            &mut events,
            &Interrupt::new(),
        )
        .unwrap();

    let pp_runs = runner.count(|inv| {
        inv.args
            .last()
            .is_some_and(|a| a.ends_with("PPDirectiveLine.ccc"))
    });
    assert_eq!(pp_runs, 2);
    assert!(events.contains(&Progress::StageCompleted {
        stage: Stage::GeneratePreprocessor(Target::CSharp),
        elapsed: None,
    }));
    // stateful lexers are only exercised through the parser
    let lexer_runs = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                Progress::StageCompleted {
                    stage: Stage::RunLexer(_),
                    ..
                }
            )
        })
        .count();
    assert_eq!(lexer_runs, 0);
}
