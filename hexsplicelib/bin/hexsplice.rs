use hexsplicelib::{
    BYTES_PER_ROW, DataRoot, EditorConfig, EditorContext, EngineConfig, Endianness, Frontend,
    ScalarType, SearchType, SpliceOp, StoreStrategy, StringTable, SystemStorage, compare_files,
    format_with_separators,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type Context = EditorContext<ConsoleFrontend, SystemStorage>;

/// Prompts on the terminal, or answers yes to everything with `--yes`.
struct ConsoleFrontend {
    assume_yes: bool,
}

impl Frontend for ConsoleFrontend {
    fn confirm(&mut self, message: &str) -> bool {
        let message = message.replace('\n', " ");
        if self.assume_yes {
            info!("{message} -> yes");
            return true;
        }

        eprint!("{message} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn show_progress(&mut self, message: &str) {
        debug!("{}", message.replace('\n', " "));
    }

    fn status(&mut self, message: &str) {
        eprintln!("{}", message.replace('\n', " "));
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");

    println!(" -------------------------------------------------------------");
    println!("|  Hex Splice Utility  | v{version} - Copyright (c) 2026 Ihar Hlukhau |");
    println!(" -------------------------------------------------------------");
    println!("\nUsage:");
    println!("  hexsplice info <input>");
    println!("  hexsplice view <input> [--offset <val> | --label <title>]");
    println!("  hexsplice read <input> --offset <val> [--type <t>] [--count <n>] [--big-endian]");
    println!("  hexsplice write <input> --offset <val> --value <v1,v2,..> [--type <t>] [--big-endian]");
    println!("  hexsplice insert <input> --offset <val> --size <val> [--fill <val>]");
    println!("  hexsplice remove <input> --offset <val> --size <val>");
    println!("  hexsplice search <input> <pattern> [--text | --regex] [--offset <val>] [--size <val>]");
    println!("  hexsplice compare <input1> <input2>");
    println!("  hexsplice dump <input> <output> --offset <val> --size <val>");
    println!("  hexsplice inject <input> <source> --offset <val>");
    println!("\nOptions:");
    println!("  --yes              Answer every prompt with yes");
    println!("  --data-root <dir>  Directory holding Hex-Editor/Config.json and the asset folders");
    println!("  --encoding <name>  Encoding table from <data-root>/encodings/<name>.json");
    println!("  --labels <name>    Labels from <data-root>/labels/<name>.json");
    println!("  --lang <name>      Messages from <data-root>/lang/<name>.json");
    println!("  --type <t>         u8, u16, u32 or u64 (default: u8)");
    println!("\nAll offsets, sizes and values are hexadecimal, with or without 0x.");
    println!("\nExamples:");
    println!("  hexsplice view game.sav --offset 0x1F0");
    println!("  hexsplice insert game.sav --offset 0x100 --size 0x20 --fill 0xFF --yes");
    println!("  hexsplice search game.sav \"DE AD BE EF\"");
    println!("  hexsplice search game.sav HERO --text");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    // Dispatch and immediately handle results
    if let Err(e) = run_dispatch(command, &args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run_dispatch(cmd: &str, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        "info" => {
            let path_str = args.get(2).ok_or("Missing input file path")?;
            let abs_path = validate_exists(path_str)?;

            let mut ctx = build_context(args, StoreStrategy::Auto)?;
            run_info(&mut ctx, &abs_path)
        }
        "view" => {
            let path_str = args.get(2).ok_or("Missing input file path")?;
            let abs_path = validate_exists(path_str)?;
            let offset = hex_flag(args, "--offset")?.unwrap_or(0);
            let label = get_flag_value(args, "--label");

            let mut ctx = build_context(args, StoreStrategy::Auto)?;
            run_view(&mut ctx, &abs_path, offset, label.as_deref())
        }
        "read" => {
            let path_str = args.get(2).ok_or("Missing input file path")?;
            let abs_path = validate_exists(path_str)?;
            let offset = hex_flag(args, "--offset")?.ok_or("Missing '--offset' flag")?;
            let ty = scalar_type(args)?;
            let count = match get_flag_value(args, "--count") {
                Some(count) => count
                    .parse::<usize>()
                    .map_err(|_e| format!("Invalid count: {count}"))?,
                None => 1,
            };

            let mut ctx = build_context(args, StoreStrategy::Auto)?;
            ctx.open(&abs_path)?;
            let values = ctx.script()?.read(ty, offset, count, endianness(args))?;
            for (idx, value) in values.iter().enumerate() {
                println!("0x{:08X}: 0x{value:0width$X}", offset + idx * ty.width(), width = ty.width() * 2);
            }
            Ok(())
        }
        "write" => {
            let path_str = args.get(2).ok_or("Missing input file path")?;
            let abs_path = validate_exists(path_str)?;
            let offset = hex_flag(args, "--offset")?.ok_or("Missing '--offset' flag")?;
            let ty = scalar_type(args)?;
            let values_str = get_flag_value(args, "--value").ok_or("Missing '--value' flag")?;
            let values = values_str
                .split(',')
                .map(|v| parse_hex_str(v).map(|v| v as u64))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_e| format!("Invalid value: {values_str}"))?;

            let mut ctx = build_context(args, StoreStrategy::Streaming)?;
            ctx.open(&abs_path)?;
            ctx.script()?.write(ty, offset, &values, endianness(args))?;
            ctx.close(true)?;

            println!("Wrote {} value(s) at 0x{offset:X} -> {}", values.len(), abs_path.display());
            Ok(())
        }
        "insert" => {
            let path_str = args.get(2).ok_or("Missing input file path")?;
            let abs_path = validate_exists(path_str)?;
            let offset = hex_flag(args, "--offset")?.ok_or("Missing '--offset' flag")?;
            let size = hex_flag(args, "--size")?.ok_or("Missing '--size' flag")?;
            let fill = match hex_flag(args, "--fill")? {
                Some(fill) => u8::try_from(fill).map_err(|_e| format!("Invalid fill: 0x{fill:X}"))?,
                None => 0x00,
            };

            let mut ctx = build_context(args, StoreStrategy::Streaming)?;
            ctx.open(&abs_path)?;
            report_splice(&mut ctx, SpliceOp::Insert { offset, size, fill }, &abs_path)
        }
        "remove" => {
            let path_str = args.get(2).ok_or("Missing input file path")?;
            let abs_path = validate_exists(path_str)?;
            let offset = hex_flag(args, "--offset")?.ok_or("Missing '--offset' flag")?;
            let size = hex_flag(args, "--size")?.ok_or("Missing '--size' flag")?;

            let mut ctx = build_context(args, StoreStrategy::Streaming)?;
            ctx.open(&abs_path)?;
            report_splice(&mut ctx, SpliceOp::Remove { offset, size }, &abs_path)
        }
        "search" => {
            let path_str = args.get(2).ok_or("Missing input file path")?;
            let abs_path = validate_exists(path_str)?;
            let pattern = args.get(3).ok_or("Missing search pattern")?;

            let search_type = if args.iter().any(|a| a == "--regex") {
                SearchType::Regex(pattern.clone())
            } else if args.iter().any(|a| a == "--text") {
                SearchType::Encoded(pattern.clone())
            } else {
                SearchType::Hex(
                    parse_hex_bytes(pattern).ok_or_else(|| format!("Invalid hex pattern: {pattern}"))?,
                )
            };
            let offset = hex_flag(args, "--offset")?.unwrap_or(0);
            let size = hex_flag(args, "--size")?.unwrap_or(usize::MAX);

            let mut ctx = build_context(args, StoreStrategy::Auto)?;
            ctx.open(&abs_path)?;
            let matches = ctx.search(offset, size, &search_type)?;
            for offset in &matches {
                println!("0x{offset:08X}");
            }
            println!("{} match(es)", matches.len());
            Ok(())
        }
        "compare" => {
            let first = validate_exists(args.get(2).ok_or("Missing first input path")?)?;
            let second = validate_exists(args.get(3).ok_or("Missing second input path")?)?;

            let engine = EngineConfig::for_data_root(&data_root(args));
            let diffs = compare_files(&first, &second, engine.chunk_size())?;
            for diff in &diffs {
                println!("0x{:08X}: {:02X} -> {:02X}", diff.offset, diff.left, diff.right);
            }
            println!("{} difference(s)", diffs.len());

            let (len1, len2) = (std::fs::metadata(&first)?.len(), std::fs::metadata(&second)?.len());
            if len1 != len2 {
                println!("Sizes differ: {len1} vs {len2} bytes");
            }
            Ok(())
        }
        "dump" => {
            let path_str = args.get(2).ok_or("Missing input file path")?;
            let abs_path = validate_exists(path_str)?;
            let out_path = PathBuf::from(args.get(3).ok_or("Missing output path")?);
            let offset = hex_flag(args, "--offset")?.ok_or("Missing '--offset' flag")?;
            let size = hex_flag(args, "--size")?.ok_or("Missing '--size' flag")?;

            let mut ctx = build_context(args, StoreStrategy::Auto)?;
            ctx.open(&abs_path)?;
            ctx.script()?.dump_bytes(offset, size, &out_path)?;

            // Validate output file was written
            let out_abs_path = validate_exists(&out_path.to_string_lossy())?;
            println!("Dumped 0x{size:X} bytes at 0x{offset:X} -> {}", out_abs_path.display());
            Ok(())
        }
        "inject" => {
            let path_str = args.get(2).ok_or("Missing input file path")?;
            let abs_path = validate_exists(path_str)?;
            let src_path = validate_exists(args.get(3).ok_or("Missing source path")?)?;
            let offset = hex_flag(args, "--offset")?.ok_or("Missing '--offset' flag")?;

            let mut ctx = build_context(args, StoreStrategy::Streaming)?;
            ctx.open(&abs_path)?;
            ctx.script()?.inject_file(offset, &src_path)?;
            ctx.close(true)?;

            println!("Injected {} at 0x{offset:X} -> {}", src_path.display(), abs_path.display());
            Ok(())
        }
        _ => {
            print_usage();
            process::exit(1);
        }
    }
}

fn report_splice(
    ctx: &mut Context,
    op: SpliceOp,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (done, verb) = match op {
        SpliceOp::Insert { offset, size, fill } => (ctx.insert(offset, size, fill)?, "Inserted"),
        SpliceOp::Remove { offset, size } => (ctx.remove(offset, size)?, "Removed"),
    };
    if !done {
        println!("Cancelled, {} is unchanged", path.display());
        return Ok(());
    }

    ctx.close(true)?;
    let new_size = std::fs::metadata(path)?.len();
    println!(
        "{verb} 0x{:X} bytes at 0x{:X} -> {} (0x{new_size:X} bytes)",
        op.size(),
        op.offset(),
        path.display()
    );
    Ok(())
}

fn run_info(ctx: &mut Context, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(path)?;
    let session = ctx.session().ok_or("No file open")?;
    let size = std::fs::metadata(path)?.len();

    println!("File Path:   {}", path.display());
    println!(
        "Data Size:   {} bytes",
        format_with_separators(size)
    );
    println!(
        "Store:       {}",
        if session.store().is_streaming() { "streaming" } else { "in-memory" }
    );
    Ok(())
}

fn run_view(
    ctx: &mut Context,
    path: &Path,
    offset: usize,
    label: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.open(path)?;
    match label {
        Some(title) => ctx.jump_to_label(title)?,
        None => ctx.jump_to(offset)?,
    }

    let origin = ctx
        .session()
        .map_or(0, |session| session.navigator().page_origin());
    let bytes = ctx.display_bytes()?;

    for (row, chunk) in bytes.chunks(BYTES_PER_ROW).enumerate() {
        let hex = chunk
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{:08X}  {hex:<47}  {}",
            origin + row * BYTES_PER_ROW,
            ctx.encoding().render(chunk)
        );
    }

    if let Ok(analysis) = ctx.analyze() {
        println!("\n{analysis}");
    }
    Ok(())
}

// =============================== HELPER FUNCTIONS ===============================

fn data_root(args: &[String]) -> DataRoot {
    get_flag_value(args, "--data-root").map_or_else(DataRoot::default, DataRoot::new)
}

/// Builds the editor context from the data root named on the command line
fn build_context(
    args: &[String],
    strategy: StoreStrategy,
) -> Result<Context, Box<dyn std::error::Error>> {
    let root = data_root(args);

    let mut editor = if root.config_file().is_file() {
        EditorConfig::from_json_file(root.config_file())?
    } else {
        EditorConfig::default()
    };
    if editor.backup_path.is_relative() {
        editor.backup_path = root.path().join(&editor.backup_path);
    }

    let engine = EngineConfig {
        strategy,
        ..EngineConfig::for_data_root(&root)
    };
    let frontend = ConsoleFrontend {
        assume_yes: args.iter().any(|a| a == "--yes"),
    };

    let mut ctx = EditorContext::new(editor, engine, frontend, SystemStorage);
    if let Some(name) = get_flag_value(args, "--encoding") {
        ctx.load_encoding(root.encodings_dir().join(format!("{name}.json")))?;
    }
    if let Some(name) = get_flag_value(args, "--labels") {
        ctx.load_labels(root.labels_dir().join(format!("{name}.json")))?;
    }
    if let Some(name) = get_flag_value(args, "--lang") {
        ctx.set_strings(StringTable::from_json_file(
            root.lang_dir().join(format!("{name}.json")),
        )?);
    }
    Ok(ctx)
}

fn scalar_type(args: &[String]) -> Result<ScalarType, Box<dyn std::error::Error>> {
    match get_flag_value(args, "--type") {
        Some(ty) => Ok(ty.parse::<ScalarType>()?),
        None => Ok(ScalarType::U8),
    }
}

fn endianness(args: &[String]) -> Endianness {
    Endianness::from_big(args.iter().any(|a| a == "--big-endian"))
}

/// Parse the value of a hex flag, `None` if the flag is absent
fn hex_flag(args: &[String], flag: &str) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    get_flag_value(args, flag)
        .map(|value| parse_hex_str(&value).map_err(|_e| format!("Invalid {flag}: {value}").into()))
        .transpose()
}

/// Parse a string as a hex number (with optional 0x prefix)
fn parse_hex_str(s: &str) -> Result<usize, std::num::ParseIntError> {
    let s = s.trim();

    // Handle explicit 0x prefix
    if let Some(hex_str) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return usize::from_str_radix(hex_str, 16);
    }

    // Parse as hex without prefix
    usize::from_str_radix(s, 16)
}

/// Parse a byte pattern such as "DEADBEEF" or "de ad be ef"
fn parse_hex_bytes(s: &str) -> Option<Vec<u8>> {
    let digits: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| u8::from_str_radix(&pair.iter().collect::<String>(), 16).ok())
        .collect()
}

/// Validate that a path exists and is a file. Returns absolute path.
fn validate_exists(path_str: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(format!("File not found: {path_str}").into());
    }
    if !path.is_file() {
        return Err(format!("Path is not a file: {path_str}").into());
    }
    // Return absolute path
    Ok(std::fs::canonicalize(path)?)
}

/// Find the value after a specific flag (e.g., "--offset 0x10")
fn get_flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}
