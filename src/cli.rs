//! Command-line interface for stencilfmt.
//!
//! Arguments are declared with the clap builder API and collected into
//! [`CliArgs`]. Layout options are `Option`s so that only flags actually
//! given override the config files.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::config::Config;

/// Everything given on the command line.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Files or directories to format (`-` reads standard input)
    pub inputs: Vec<PathBuf>,

    /// Columns per indentation level
    pub tab_width: Option<usize>,

    /// Indent with tabs
    pub use_tabs: Option<bool>,

    /// Width at which logic tags wrap
    pub print_width: Option<usize>,

    /// Re-quote strings with single quotes
    pub single_quote: Option<bool>,

    /// Skip the final whitespace pass
    pub preserve_newlines: Option<bool>,

    /// Write results to stdout, leaving files untouched
    pub stdout: bool,

    /// Report files that would change without modifying them
    pub check: bool,

    /// Explicit config file, replacing discovery
    pub config: Option<PathBuf>,

    /// Descend into subdirectories
    pub recursive: bool,

    /// No progress or summary output
    pub silent: bool,

    /// Worker threads; 0 lets Rayon decide, 1 runs in order
    pub jobs: Option<usize>,

    /// Glob patterns for paths to leave alone
    pub exclude: Vec<String>,

    /// Template file extensions in addition to the defaults
    pub extensions: Vec<String>,

    /// Skip templates longer than this many lines
    pub exclude_max_lines: Option<usize>,

    /// Log configuration and pipeline stages
    pub debug: bool,
}

impl CliArgs {
    /// Override `config` with every option given on the command line.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(v) = self.tab_width {
            config.tab_width = v;
        }
        if let Some(v) = self.use_tabs {
            config.use_tabs = v;
        }
        if let Some(v) = self.print_width {
            config.print_width = v;
        }
        if let Some(v) = self.single_quote {
            config.single_quote = v;
        }
        if let Some(v) = self.preserve_newlines {
            config.preserve_newlines = v;
        }
    }
}

/// An on/off option that may be given bare (`--flag`) or with a value (`--flag=false`).
fn bool_option(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .value_name("BOOL")
        .num_args(0..=1)
        .require_equals(true)
        .default_missing_value("true")
        .value_parser(clap::value_parser!(bool))
}

/// A plain switch.
fn switch(name: &'static str, short: Option<char>, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .help(help)
        .action(ArgAction::SetTrue)
}

/// A numeric option.
fn number(name: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .help(help)
        .value_name("NUM")
        .value_parser(clap::value_parser!(usize))
}

/// A string option that may be given several times.
fn repeated(name: &'static str, short: char, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .help(help)
        .value_name(value_name)
        .action(ArgAction::Append)
}

/// The clap command definition.
#[must_use]
pub fn build_cli() -> Command {
    Command::new("stencilfmt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Formatter for Handlebars and Stencil templates")
        .arg(
            Arg::new("inputs")
                .help("Templates or directories to format (`-` for stdin)")
                .value_name("FILE")
                .num_args(1..)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(number("tab-width", 't', "Columns per indentation level [default: 4]"))
        .arg(bool_option("use-tabs", "Indent with tabs instead of spaces"))
        .arg(number(
            "print-width",
            'w',
            "Column past which logic tags and block bodies wrap [default: 80]",
        ))
        .arg(bool_option("single-quote", "Re-quote string literals with single quotes"))
        .arg(bool_option(
            "preserve-newlines",
            "Keep blank lines and trailing whitespace as laid out",
        ))
        .arg(switch("stdout", Some('s'), "Print formatted templates instead of rewriting them"))
        .arg(switch("check", None, "List templates that are not formatted and exit with status 1"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Config file to use instead of discovered stencilfmt.toml files")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(switch("recursive", Some('r'), "Format templates in subdirectories too"))
        .arg(repeated(
            "exclude",
            'e',
            "PATTERN",
            "Skip paths matching a glob pattern (repeatable)",
        ))
        .arg(repeated(
            "ext",
            'x',
            "EXT",
            "Treat files with this extension as templates (repeatable, e.g. -x stencil)",
        ))
        .arg(number(
            "exclude-max-lines",
            'm',
            "Skip templates longer than this many lines",
        ))
        .arg(switch("debug", Some('D'), "Log configuration and pipeline stages"))
        .arg(switch("silent", Some('S'), "Print nothing (for editor integration)"))
        .arg(number("jobs", 'j', "Worker threads (0 = one per core, 1 = in order)"))
}

/// Parse the process arguments.
#[must_use]
pub fn parse_args() -> CliArgs {
    CliArgs::from_matches(&build_cli().get_matches())
}

/// Parse an explicit argument list; the first item is the program name.
#[must_use]
pub fn parse_args_from<I, T>(args: I) -> CliArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    CliArgs::from_matches(&build_cli().get_matches_from(args))
}

impl CliArgs {
    fn from_matches(matches: &ArgMatches) -> Self {
        let strings = |name: &str| -> Vec<String> {
            matches
                .get_many::<String>(name)
                .map(|vals| vals.cloned().collect())
                .unwrap_or_default()
        };
        let usize_of = |name: &str| matches.get_one::<usize>(name).copied();
        let bool_of = |name: &str| matches.get_one::<bool>(name).copied();

        Self {
            inputs: matches
                .get_many::<PathBuf>("inputs")
                .map(|vals| vals.cloned().collect())
                .unwrap_or_default(),
            tab_width: usize_of("tab-width"),
            use_tabs: bool_of("use-tabs"),
            print_width: usize_of("print-width"),
            single_quote: bool_of("single-quote"),
            preserve_newlines: bool_of("preserve-newlines"),
            stdout: matches.get_flag("stdout"),
            check: matches.get_flag("check"),
            config: matches.get_one::<PathBuf>("config").cloned(),
            recursive: matches.get_flag("recursive"),
            exclude: strings("exclude"),
            extensions: strings("ext"),
            exclude_max_lines: usize_of("exclude-max-lines"),
            debug: matches.get_flag("debug"),
            silent: matches.get_flag("silent"),
            jobs: usize_of("jobs"),
        }
    }
}
