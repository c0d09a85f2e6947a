//! Command-line definition, shared with `build.rs` for shell completions

use clap::{value_parser, Arg, ArgAction, Command, ValueHint};
use std::path::PathBuf;

pub fn command() -> Command {
    Command::new("conform")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Check that generated Java and C# lexers and parsers behave identically")
        .arg(
            Arg::new("jython-dir")
                .long("jython-dir")
                .env("JYTHONDIR")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath)
                .help("Location of jython.jar [default: ~/bin]"),
        )
        .arg(
            Arg::new("no-delete")
                .long("no-delete")
                .action(ArgAction::SetTrue)
                .help("Don't delete working directories"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Pass -q to the test driver"),
        )
        .arg(
            Arg::new("langs")
                .long("langs")
                .value_name("LANG1,LANG2...")
                .default_value("all")
                .help("Languages to test"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath)
                .help("TOML file layered over the built-in settings"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath)
                .default_value(".")
                .help("Project root holding the generator, the test driver and examples/"),
        )
        .arg(
            Arg::new("list-grammars")
                .long("list-grammars")
                .action(ArgAction::SetTrue)
                .help("List the known grammars and exit"),
        )
}
