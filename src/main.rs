//! stencilfmt - Formatter for Handlebars and Stencil templates

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fs::File;
use std::io::{self, BufReader, IsTerminal, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use glob::Pattern;
use log::{LevelFilter, Log, Metadata, Record};
use rayon::prelude::*;
use stencilfmt::process::format_file;
use stencilfmt::{build_cli, parse_args, CliArgs, Config, Result};
use walkdir::WalkDir;

/// Template file extensions to process
const TEMPLATE_EXTENSIONS: &[&str] = &["html", "hbs", "handlebars"];

/// Inputs larger than this are refused (100 MB).
const MAX_INPUT_BYTES: u64 = 100 * 1024 * 1024;

/// Writes log records to stderr as `[LEVEL] message`.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(args: &CliArgs) {
    let level = if args.silent {
        LevelFilter::Off
    } else if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// What happened to one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Formatted,
    Unchanged,
    /// `--check` found a file that is not formatted.
    WouldChange,
    Skipped,
}

fn main() -> Result<()> {
    let args = parse_args();
    init_logging(&args);

    let use_stdin =
        args.inputs.is_empty() || (args.inputs.len() == 1 && args.inputs[0].as_os_str() == "-");

    // No inputs on an interactive terminal: print usage instead of waiting on stdin
    if args.inputs.is_empty() && io::stdin().is_terminal() {
        return print_usage();
    }

    if use_stdin {
        let config = build_config(&args, None)?;
        let outcome = process_stdin(&config, &args)?;
        if outcome == Outcome::WouldChange {
            std::process::exit(1);
        }
        return Ok(());
    }

    // An explicit config file applies to every file; otherwise each file
    // discovers its own
    let base_config = if args.config.is_some() {
        Some(build_config(&args, None)?)
    } else {
        None
    };

    if let Some(jobs) = args.jobs {
        if jobs > 0 {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build_global()
            {
                log::warn!("failed to configure thread pool: {e}");
            }
        }
    }

    let files = collect_files(&args);

    if files.is_empty() {
        if !args.silent {
            eprintln!("No template files found to format.");
        }
        return Ok(());
    }

    let failures = process_files(&files, base_config.as_ref(), &args);
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Build configuration from CLI args and optional config file
///
/// If `for_path` is provided and no explicit config file is specified,
/// uses auto-discovery to find config files in parent directories.
fn build_config(args: &CliArgs, for_path: Option<&Path>) -> Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        log::debug!("using explicit config file: {}", config_path.display());
        Config::from_toml_file(config_path)?
    } else {
        let start = match for_path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir().unwrap_or_default(),
        };
        let discovered = Config::discover_config_files(&start);
        if discovered.is_empty() {
            log::debug!("no config files discovered for {}", start.display());
        }
        Config::from_discovered_files(&start)
    };

    args.apply_to(&mut config);

    if args.debug {
        print_config_debug(&config);
    }

    if let Some(error) = config.validate() {
        anyhow::bail!("Invalid configuration: {error}");
    }

    Ok(config)
}

/// Print configuration values in debug mode
fn print_config_debug(config: &Config) {
    log::debug!("configuration:");
    log::debug!("  tab_width: {}", config.tab_width);
    log::debug!("  use_tabs: {}", config.use_tabs);
    log::debug!("  print_width: {}", config.print_width);
    log::debug!("  single_quote: {}", config.single_quote);
    log::debug!("  preserve_newlines: {}", config.preserve_newlines);
}

/// Decides which paths under the inputs are templates to format.
struct TemplateFilter<'a> {
    excludes: Vec<Pattern>,
    extra_extensions: &'a [String],
}

impl<'a> TemplateFilter<'a> {
    fn new(args: &'a CliArgs) -> Self {
        let excludes = args
            .exclude
            .iter()
            .filter_map(|raw| {
                Pattern::new(raw)
                    .map_err(|e| log::warn!("ignoring invalid exclude pattern {raw:?}: {e}"))
                    .ok()
            })
            .collect();
        Self {
            excludes,
            extra_extensions: &args.extensions,
        }
    }

    /// A pattern matches the whole path, or any single component of it.
    fn is_excluded(&self, path: &Path) -> bool {
        let whole = path.to_string_lossy();
        self.excludes.iter().any(|pattern| {
            pattern.matches(&whole)
                || path.components().any(|component| match component {
                    Component::Normal(name) => pattern.matches(&name.to_string_lossy()),
                    _ => false,
                })
        })
    }

    /// Template extension check, case-insensitive. `-x .tpl` and `-x tpl` are the same.
    fn has_template_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        TEMPLATE_EXTENSIONS
            .iter()
            .copied()
            .chain(self.extra_extensions.iter().map(|e| e.trim_start_matches('.')))
            .any(|known| ext.eq_ignore_ascii_case(known))
    }

    /// Files found while walking a directory.
    fn accepts(&self, path: &Path) -> bool {
        path.is_file() && self.has_template_extension(path) && !self.is_excluded(path)
    }
}

/// Expand the inputs into template files.
///
/// Files named on the command line are taken whatever their extension;
/// directories contribute their template files, recursively with `-r`.
fn collect_files(args: &CliArgs) -> Vec<PathBuf> {
    let filter = TemplateFilter::new(args);
    let mut files = Vec::new();

    for input in &args.inputs {
        if input.is_file() {
            if !filter.is_excluded(input) {
                files.push(input.clone());
            }
            continue;
        }
        if !input.is_dir() {
            log::warn!("no such file or directory: {}", input.display());
            continue;
        }

        let depth = if args.recursive { 256 } else { 1 };
        // Symlink loops surface as walk errors and are skipped
        let found = WalkDir::new(input)
            .follow_links(true)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .map(walkdir::DirEntry::into_path)
            .filter(|path| filter.accepts(path));
        files.extend(found);
    }

    files
}

/// Number of lines, counting a final unterminated line.
fn count_lines(contents: &[u8]) -> usize {
    let newlines = bytecount_newlines(contents);
    match contents.last() {
        None => 0,
        Some(b'\n') => newlines,
        Some(_) => newlines + 1,
    }
}

#[allow(clippy::naive_bytecount)]
fn bytecount_newlines(contents: &[u8]) -> usize {
    contents.iter().filter(|&&b| b == b'\n').count()
}

fn config_for(path: &Path, base_config: Option<&Config>, args: &CliArgs) -> Result<Config> {
    match base_config {
        Some(config) => Ok(config.clone()),
        None => build_config(args, Some(path)),
    }
}

/// Outcome counts of a batch run, shared across worker threads.
#[derive(Default)]
struct Tally {
    formatted: AtomicUsize,
    unchanged: AtomicUsize,
    would_change: AtomicUsize,
    skipped: AtomicUsize,
    errors: AtomicUsize,
}

impl Tally {
    fn record(&self, path: &Path, result: Result<Outcome>) {
        let counter = match result {
            Ok(Outcome::Formatted) => &self.formatted,
            Ok(Outcome::Unchanged) => &self.unchanged,
            Ok(Outcome::WouldChange) => &self.would_change,
            Ok(Outcome::Skipped) => &self.skipped,
            Err(e) => {
                eprintln!("Error formatting {}: {e}", path.display());
                &self.errors
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::Relaxed)
    }

    /// Files that make the run fail: errors, and unformatted files under `--check`.
    fn failures(&self) -> usize {
        Self::count(&self.errors) + Self::count(&self.would_change)
    }

    fn report(&self, total: usize, args: &CliArgs) {
        if args.silent || args.stdout {
            return;
        }
        let errors = Self::count(&self.errors);
        let skipped = Self::count(&self.skipped);
        if args.check {
            eprintln!(
                "Checked {total} files: {} not formatted, {errors} errors, {skipped} skipped.",
                Self::count(&self.would_change)
            );
        } else {
            eprintln!(
                "{} formatted, {} already formatted, {errors} errors, {skipped} skipped.",
                Self::count(&self.formatted),
                Self::count(&self.unchanged)
            );
        }
    }
}

/// Format every file and return the number of failures.
///
/// `--stdout` and `-j 1` run in order so output is not interleaved; every
/// other run is spread over the Rayon pool.
fn process_files(files: &[PathBuf], base_config: Option<&Config>, args: &CliArgs) -> usize {
    let tally = Tally::default();
    let run = |path: &PathBuf| {
        let result = config_for(path, base_config, args)
            .and_then(|config| process_single_file(path, &config, args));
        tally.record(path, result);
    };

    if args.stdout || args.jobs == Some(1) {
        files.iter().for_each(run);
    } else {
        files.par_iter().for_each(run);
    }

    tally.report(files.len(), args);
    tally.failures()
}

/// Read a whole input, refusing anything over [`MAX_INPUT_BYTES`].
fn read_bounded(input: impl Read, label: &str) -> Result<Vec<u8>> {
    let mut contents = Vec::new();
    input.take(MAX_INPUT_BYTES + 1).read_to_end(&mut contents)?;
    if contents.len() as u64 > MAX_INPUT_BYTES {
        anyhow::bail!(
            "{label} is larger than the {} MB input limit",
            MAX_INPUT_BYTES / (1024 * 1024)
        );
    }
    Ok(contents)
}

fn format_bytes(contents: &[u8], config: &Config, name: &str) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(contents.len());
    format_file(BufReader::new(contents), &mut output, config, name)?;
    Ok(output)
}

fn process_single_file(path: &Path, config: &Config, args: &CliArgs) -> Result<Outcome> {
    let name = path.to_string_lossy();
    let size = std::fs::metadata(path)?.len();
    if size > MAX_INPUT_BYTES {
        log::warn!(
            "skipping {name}: {} MB is over the input limit",
            size / (1024 * 1024)
        );
        return Ok(Outcome::Skipped);
    }
    let contents = read_bounded(File::open(path)?, &name)?;

    if let Some(max_lines) = args.exclude_max_lines {
        let lines = count_lines(&contents);
        if lines > max_lines {
            log::warn!("skipping {name}: {lines} lines is over the limit of {max_lines}");
            return Ok(Outcome::Skipped);
        }
    }

    let output = format_bytes(&contents, config, &name)?;
    let changed = output != contents;

    if args.check {
        if changed && !args.silent {
            println!("{}", path.display());
        }
        return Ok(if changed {
            Outcome::WouldChange
        } else {
            Outcome::Unchanged
        });
    }
    if args.stdout {
        io::stdout().write_all(&output)?;
        return Ok(Outcome::Formatted);
    }
    if !changed {
        log::debug!("{name} is already formatted");
        return Ok(Outcome::Unchanged);
    }

    log::info!("formatting {name}");
    std::fs::write(path, &output)?;
    Ok(Outcome::Formatted)
}

/// Format standard input to standard output.
fn process_stdin(config: &Config, args: &CliArgs) -> Result<Outcome> {
    let contents = read_bounded(io::stdin().lock(), "standard input")?;
    let output = format_bytes(&contents, config, "<stdin>")?;

    if args.check {
        return Ok(if output == contents {
            Outcome::Unchanged
        } else {
            Outcome::WouldChange
        });
    }

    io::stdout().write_all(&output)?;
    log::debug!("formatted standard input ({} bytes)", output.len());
    Ok(Outcome::Formatted)
}

fn print_usage() -> Result<()> {
    build_cli()
        .after_help(
            "Examples:\n  \
             stencilfmt templates/pages/home.html     Format one template in place\n  \
             stencilfmt -r templates/                 Format a theme\n  \
             stencilfmt --check -r templates/         List unformatted templates\n  \
             cat card.html | stencilfmt -             Format standard input\n\n\
             Config files: stencilfmt.toml or .stencilfmt.toml in the home directory\n\
             and in every directory above the template; closer files win.",
        )
        .print_help()?;
    Ok(())
}
