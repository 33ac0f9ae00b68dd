// Command-line interface for chunkdelta.
//
// Explicit subcommands with long-form options. Inputs are read fully into
// memory; outputs default to stdout when no path is given.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::engine::{self, EncodeOptions};
use crate::hash::config::{CHUNK_SIZE, IndexConfig, TABLE_SIZE};
use crate::io::{self as file_io, IoError};
use crate::revision::decoder::InstructionIterator;
use crate::revision::instruction::RevisionStats;

const BUF_SIZE: usize = 64 * 1024;

/// Upper bound accepted for `--chunk-size`.
const MAX_CHUNK_SIZE: u32 = 4096;

/// Upper bound accepted for `--table-size`.
const MAX_TABLE_SIZE: u32 = 1 << 24;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Chunk-index delta encoder/decoder.
#[derive(Parser, Debug)]
#[command(
    name = "chunkdelta",
    version,
    about = "Chunk-index delta encoder/decoder",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compute a revision from old content to new content.
    Encode(EncodeArgs),
    /// Rebuild new content from old content and a revision.
    Decode(DecodeArgs),
    /// Encode, decode, and compare the result with the new content.
    Verify(VerifyArgs),
    /// List the instructions in a revision.
    Inspect(InspectArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct TuningArgs {
    /// Chunk width in bytes.
    #[arg(long = "chunk-size", value_parser = clap::value_parser!(u32).range(1..=MAX_CHUNK_SIZE as i64), default_value_t = CHUNK_SIZE as u32)]
    chunk_size: u32,

    /// Chunk index bucket count.
    #[arg(long = "table-size", value_parser = clap::value_parser!(u32).range(1..=MAX_TABLE_SIZE as i64), default_value_t = TABLE_SIZE as u32)]
    table_size: u32,

    /// Compare candidate bytes before extending a match.
    #[arg(long = "verify-candidates")]
    verify_candidates: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Old file to copy from (default: empty).
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    old: Option<PathBuf>,

    /// New file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Revision output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    #[command(flatten)]
    tuning: TuningArgs,

    /// New file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Revision output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Old file to copy from (default: empty).
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    old: Option<PathBuf>,

    /// Revision file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Revision file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Old file.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// New file.
    #[arg(long, value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Revision file to create.
    #[arg(long, value_hint = ValueHint::FilePath)]
    revision: PathBuf,

    /// Reconstructed file to create.
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: PathBuf,

    #[command(flatten)]
    tuning: TuningArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Old file; when given, copies are bounds-checked against it.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    old: Option<PathBuf>,

    /// Revision file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Encode,
    Decode,
    Verify,
    Inspect,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    encode: EncodeOptions,
    old_file: Option<PathBuf>,
    new_file: Option<PathBuf>,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl TuningArgs {
    fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            index: IndexConfig {
                chunk_size: self.chunk_size as usize,
                table_size: self.table_size as usize,
            },
            verify_candidates: self.verify_candidates,
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Config,
        use_stdout: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        encode: EncodeOptions::default(),
        old_file: None,
        new_file: None,
        input_file: None,
        output_file: None,
    };

    match cli.command {
        Cmd::Encode(args) => {
            opts.command = Command::Encode;
            opts.use_stdout = args.stdout;
            opts.encode = args.tuning.encode_options();
            opts.old_file = args.old;
            opts.input_file = args.input.or(args.input_pos);
            opts.output_file = args.output.or(args.output_pos);
        }
        Cmd::Decode(args) => {
            opts.command = Command::Decode;
            opts.use_stdout = args.stdout;
            opts.old_file = args.old;
            opts.input_file = args.input.or(args.input_pos);
            opts.output_file = args.output.or(args.output_pos);
        }
        Cmd::Verify(args) => {
            opts.command = Command::Verify;
            opts.encode = args.tuning.encode_options();
            opts.old_file = Some(args.old);
            opts.new_file = Some(args.new);
            opts.input_file = Some(args.revision);
            opts.output_file = Some(args.output);
        }
        Cmd::Inspect(args) => {
            opts.command = Command::Inspect;
            opts.old_file = args.old;
            opts.input_file = Some(args.input);
        }
        Cmd::Config => {}
    }

    if opts.use_stdout {
        if let Some(path) = opts.output_file.take()
            && !opts.quiet
        {
            eprintln!(
                "chunkdelta: warning: -c option overrides output filename: {}",
                path.display()
            );
        }
    }

    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("chunkdelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

/// Read a whole file, or stdin when `path` is `None`.
fn read_all(path: Option<&Path>, what: &str) -> Option<Vec<u8>> {
    let result = match path {
        Some(path) => std::fs::read(path).map_err(|e| format!("{}: {e}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .map(|_| buf)
                .map_err(|e| format!("stdin: {e}"))
        }
    };
    match result {
        Ok(data) => Some(data),
        Err(e) => {
            eprintln!("chunkdelta: {what} file: {e}");
            None
        }
    }
}

/// Read the old file, or return empty content when none is given.
fn read_old(path: Option<&Path>) -> Option<Vec<u8>> {
    match path {
        Some(_) => read_all(path, "old"),
        None => Some(Vec::new()),
    }
}

/// Open a file (or stdout) for writing, refusing to clobber without `--force`.
fn open_output(opts: &Options) -> Option<Box<dyn Write>> {
    match &opts.output_file {
        None => Some(Box::new(BufWriter::with_capacity(
            BUF_SIZE,
            io::stdout().lock(),
        ))),
        Some(path) => {
            if !check_overwrite(path, opts.force) {
                return None;
            }
            match File::create(path) {
                Ok(f) => Some(Box::new(BufWriter::with_capacity(BUF_SIZE, f))),
                Err(e) => {
                    eprintln!("chunkdelta: output file: {}: {e}", path.display());
                    None
                }
            }
        }
    }
}

fn check_overwrite(path: &Path, force: bool) -> bool {
    if path.exists() && !force {
        eprintln!(
            "chunkdelta: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return false;
    }
    true
}

fn stats_json(stats: &RevisionStats) -> serde_json::Value {
    serde_json::json!({
        "copies": stats.copies,
        "literals": stats.literals,
        "copied_bytes": stats.copied_bytes,
        "literal_bytes": stats.literal_bytes,
    })
}

fn emit_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => eprintln!("chunkdelta: json: {e}"),
    }
}

fn hex_digest(digest: Option<[u8; 32]>) -> Option<String> {
    digest.map(|d| d.iter().map(|b| format!("{b:02x}")).collect())
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("chunkdelta version {version}");

    let file_io = cfg!(feature = "file-io") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("CHUNK_SIZE={CHUNK_SIZE}");
    eprintln!("TABLE_SIZE={TABLE_SIZE}");
    eprintln!("MAX_CHUNK_SIZE={MAX_CHUNK_SIZE}");
    eprintln!("MAX_TABLE_SIZE={MAX_TABLE_SIZE}");
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Encode command
// ---------------------------------------------------------------------------

fn cmd_encode(opts: &Options) -> i32 {
    let Some(old) = read_old(opts.old_file.as_deref()) else {
        return 1;
    };
    let Some(new) = read_all(opts.input_file.as_deref(), "input") else {
        return 1;
    };

    let mut revision = Vec::new();
    let stats = match engine::encode_with_options(&old, &new, &mut revision, &opts.encode) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("chunkdelta: encode error: {e}");
            return 1;
        }
    };

    let Some(mut writer) = open_output(opts) else {
        return 1;
    };
    if let Err(e) = writer.write_all(&revision).and_then(|()| writer.flush()) {
        eprintln!("chunkdelta: write error: {e}");
        return 1;
    }

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "chunkdelta: encoder: old size: {}, new size: {}, revision size: {}, \
             copies: {}, literals: {}",
            old.len(),
            new.len(),
            revision.len(),
            stats.copies,
            stats.literals
        );
    }

    if opts.json_output {
        emit_json(&serde_json::json!({
            "command": "encode",
            "old_size": old.len(),
            "new_size": new.len(),
            "revision_size": revision.len(),
            "chunk_size": opts.encode.index.chunk_size,
            "instructions": stats_json(&stats),
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(opts: &Options) -> i32 {
    let Some(old) = read_old(opts.old_file.as_deref()) else {
        return 1;
    };
    let Some(revision) = read_all(opts.input_file.as_deref(), "input") else {
        return 1;
    };

    // Decode fully before touching the output.
    let output = match engine::decode(&old, &revision) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("chunkdelta: decode error: {e}");
            return 1;
        }
    };

    let Some(mut writer) = open_output(opts) else {
        return 1;
    };
    if let Err(e) = writer.write_all(&output).and_then(|()| writer.flush()) {
        eprintln!("chunkdelta: write error: {e}");
        return 1;
    }

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "chunkdelta: decoder: revision size: {}, output size: {}",
            revision.len(),
            output.len()
        );
    }

    if opts.json_output {
        emit_json(&serde_json::json!({
            "command": "decode",
            "old_size": old.len(),
            "revision_size": revision.len(),
            "output_size": output.len(),
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Verify command
// ---------------------------------------------------------------------------

fn cmd_verify(opts: &Options) -> i32 {
    let (Some(old), Some(new), Some(revision), Some(output)) = (
        opts.old_file.as_deref(),
        opts.new_file.as_deref(),
        opts.input_file.as_deref(),
        opts.output_file.as_deref(),
    ) else {
        eprintln!("chunkdelta: verify requires --old, --new, --revision and --output");
        return 1;
    };

    if !check_overwrite(revision, opts.force) || !check_overwrite(output, opts.force) {
        return 1;
    }

    let stats = match file_io::verify_roundtrip(old, new, revision, output, &opts.encode) {
        Ok(stats) => stats,
        Err(IoError::PathConflict(path)) => {
            eprintln!(
                "chunkdelta: files used for output must have names distinct from other files: {}",
                path.display()
            );
            return 1;
        }
        Err(e) => {
            eprintln!("chunkdelta: verify: {e}");
            return 1;
        }
    };

    if opts.json_output {
        emit_json(&serde_json::json!({
            "command": "verify",
            "identical": stats.identical,
            "old_size": stats.encode.old_size,
            "new_size": stats.encode.new_size,
            "revision_size": stats.encode.revision_size,
            "output_size": stats.decode.output_size,
            "new_sha256": hex_digest(stats.encode.new_sha256),
            "output_sha256": hex_digest(stats.decode.output_sha256),
            "instructions": stats_json(&stats.encode.instructions),
        }));
    }

    if !stats.identical {
        eprintln!(
            "chunkdelta: {} is not identical to {}; test FAILED",
            output.display(),
            new.display()
        );
        return 1;
    }

    if !opts.quiet {
        eprintln!("chunkdelta: test PASSED");
    }
    0
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

fn cmd_inspect(opts: &Options) -> i32 {
    let Some(input) = opts.input_file.as_deref() else {
        eprintln!("chunkdelta: inspect requires an input file");
        return 1;
    };
    let Some(revision) = read_all(Some(input), "input") else {
        return 1;
    };
    let mut iter = match &opts.old_file {
        Some(path) => match std::fs::metadata(path) {
            Ok(meta) => InstructionIterator::with_source_len(&revision, meta.len() as usize),
            Err(e) => {
                eprintln!("chunkdelta: old file: {}: {e}", path.display());
                return 1;
            }
        },
        None => InstructionIterator::new(&revision),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::with_capacity(BUF_SIZE, stdout.lock());
    let mut stats = RevisionStats::default();
    let mut output_offset: u64 = 0;

    let _ = writeln!(out, "  Output     Instruction");
    loop {
        let stream_offset = iter.offset();
        let inst = match iter.next() {
            Some(Ok(inst)) => inst,
            Some(Err(e)) => {
                let _ = out.flush();
                eprintln!("chunkdelta: instruction decode: {e}");
                return 1;
            }
            None => break,
        };
        if !opts.quiet {
            let _ = writeln!(out, "  {output_offset:010} {inst}  @{stream_offset}");
        }
        output_offset = output_offset.saturating_add(inst.output_len() as u64);
        stats.record(&inst);
    }

    let _ = writeln!(out, "Revision size:   {}", revision.len());
    let _ = writeln!(out, "Output size:     {}", stats.output_len());
    let _ = writeln!(
        out,
        "Copies:          {} ({} bytes)",
        stats.copies, stats.copied_bytes
    );
    let _ = writeln!(
        out,
        "Literals:        {} ({} bytes)",
        stats.literals, stats.literal_bytes
    );
    if let Err(e) = out.flush() {
        eprintln!("chunkdelta: write flush error: {e}");
        return 1;
    }

    if opts.json_output {
        emit_json(&serde_json::json!({
            "command": "inspect",
            "revision_size": revision.len(),
            "output_size": stats.output_len(),
            "instructions": stats_json(&stats),
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    }
}

pub fn run() -> ! {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.quiet, cli.verbose)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    let opts = resolve_options(cli);
    log::debug!("options: {opts:?}");

    let exit_code = match opts.command {
        Command::Encode => cmd_encode(&opts),
        Command::Decode => cmd_decode(&opts),
        Command::Verify => cmd_verify(&opts),
        Command::Inspect => cmd_inspect(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("chunkdelta".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    #[test]
    fn encode_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "encode",
            "--old",
            "old.bin",
            "--chunk-size",
            "16",
            "--table-size",
            "97",
            "--verify-candidates",
            "new.bin",
            "rev.txt",
        ]);
        assert_eq!(opts.command, Command::Encode);
        assert_eq!(opts.old_file.as_deref(), Some(Path::new("old.bin")));
        assert_eq!(opts.input_file, Some(PathBuf::from("new.bin")));
        assert_eq!(opts.output_file, Some(PathBuf::from("rev.txt")));
        assert_eq!(opts.encode.index.chunk_size, 16);
        assert_eq!(opts.encode.index.table_size, 97);
        assert!(opts.encode.verify_candidates);
    }

    #[test]
    fn encode_defaults() {
        let opts = parse_opts(&["encode", "new.bin"]);
        assert_eq!(opts.encode, EncodeOptions::default());
        assert!(opts.old_file.is_none());
        assert!(opts.output_file.is_none());
    }

    #[test]
    fn decode_subcommand_maps_correctly() {
        let opts = parse_opts(&["--quiet", "decode", "-s", "old.bin", "rev.txt", "out.bin"]);
        assert_eq!(opts.command, Command::Decode);
        assert!(opts.quiet);
        assert_eq!(opts.old_file.as_deref(), Some(Path::new("old.bin")));
        assert_eq!(opts.input_file, Some(PathBuf::from("rev.txt")));
        assert_eq!(opts.output_file, Some(PathBuf::from("out.bin")));
    }

    #[test]
    fn stdout_flag_overrides_output() {
        let opts = parse_opts(&["--force", "--quiet", "encode", "--stdout", "in", "out"]);
        assert!(opts.use_stdout);
        assert!(opts.force);
        assert!(opts.output_file.is_none());
    }

    #[test]
    fn verbose_is_capped() {
        let opts = parse_opts(&["-v", "-v", "-v", "encode", "in"]);
        assert_eq!(opts.verbose, 2);
    }

    #[test]
    fn verify_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "verify",
            "--old",
            "a",
            "--new",
            "b",
            "--revision",
            "r",
            "--output",
            "o",
        ]);
        assert_eq!(opts.command, Command::Verify);
        assert_eq!(opts.new_file, Some(PathBuf::from("b")));
        assert_eq!(opts.input_file, Some(PathBuf::from("r")));
        assert_eq!(opts.output_file, Some(PathBuf::from("o")));
    }

    #[test]
    fn inspect_and_config_map() {
        assert_eq!(parse_opts(&["inspect", "rev"]).command, Command::Inspect);
        assert_eq!(parse_opts(&["config"]).command, Command::Config);
    }

    #[test]
    fn chunk_size_zero_is_rejected() {
        let argv = ["chunkdelta", "encode", "--chunk-size", "0", "in"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let argv = ["chunkdelta", "-q", "-v", "config"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn log_filter_levels() {
        assert_eq!(log_filter(true, 2), "error");
        assert_eq!(log_filter(false, 0), "warn");
        assert_eq!(log_filter(false, 1), "info");
        assert_eq!(log_filter(false, 2), "debug");
    }

    #[test]
    fn fuzz_parser_tolerates_garbage() {
        fuzz_try_parse_args(&["--nope".to_string(), "\0".to_string()]);
        fuzz_try_parse_args(&[]);
    }
}
