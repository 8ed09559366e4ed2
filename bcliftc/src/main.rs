//! `bcliftc`: decompile an LLVM bitcode or textual-IR module into C.
//!
//! Grounded on `oric`'s `std::env::args()` subcommand dispatch (no `clap`):
//! the driver is a thin wire between `bclift_reader::load_module`,
//! `bclift_passes::translate_module`, and `bclift_emit::emit_program`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bclift_diag::DecompileError;
use bclift_emit::EmitOptions;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "decompile" => decompile(&args[2..]),
        "inspect" => inspect(&args[2..]),
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "version" | "--version" => {
            println!("bcliftc {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!("bcliftc: LLVM-IR-to-C decompiler");
    println!();
    println!("Usage: bcliftc <command> [options]");
    println!();
    println!("Commands:");
    println!("  decompile <input.bc|.ll> [-o output.c]   Decompile a module to C");
    println!("  inspect <input.bc|.ll>                    Print module/function counts");
    println!("  help                                       Show this help message");
    println!("  version                                    Show version information");
    println!();
    println!("Decompile options:");
    println!("  -o <path>              Write output to a file instead of stdout");
    println!("  --no-func-casts        Strip cast chains on call targets");
    println!("  --force-block-labels   Emit a label on every block, even inlined ones");
    println!("  --verbose              Enable debug logging (or set RUST_LOG)");
}

struct DecompileArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    options: EmitOptions,
    verbose: bool,
}

fn parse_decompile_args(args: &[String]) -> Result<DecompileArgs, String> {
    let mut input = None;
    let mut output = None;
    let mut options = EmitOptions::default();
    let mut verbose = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-o" => {
                i += 1;
                let path = args.get(i).ok_or("-o requires a path argument")?;
                output = Some(PathBuf::from(path));
            }
            "--no-func-casts" => options.no_func_casts = true,
            "--force-block-labels" => options.force_block_labels = true,
            "--verbose" => verbose = true,
            other if input.is_none() => input = Some(PathBuf::from(other)),
            other => return Err(format!("unexpected argument: {other}")),
        }
        i += 1;
    }

    let input = input.ok_or("missing input file")?;
    Ok(DecompileArgs { input, output, options, verbose })
}

fn decompile(args: &[String]) -> ExitCode {
    let parsed = match parse_decompile_args(args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("Usage: bcliftc decompile <input.bc|.ll> [-o output.c] [--no-func-casts] [--force-block-labels] [--verbose]");
            return ExitCode::from(1);
        }
    };

    init_logging(parsed.verbose);

    let program = match load_and_translate(&parsed.input) {
        Ok(program) => program,
        Err(err) => return report(&err),
    };

    let code = bclift_emit::emit_program(&program, &parsed.options);

    match parsed.output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, code) {
                eprintln!("error writing '{}': {e}", path.display());
                return ExitCode::from(1);
            }
            println!("wrote {}", path.display());
        }
        None => print!("{code}"),
    }

    ExitCode::SUCCESS
}

fn inspect(args: &[String]) -> ExitCode {
    let Some(input) = args.first() else {
        eprintln!("Usage: bcliftc inspect <input.bc|.ll>");
        return ExitCode::from(1);
    };
    init_logging(false);

    let module = match bclift_reader::load_module(Path::new(input)) {
        Ok(module) => module,
        Err(err) => return report(&err),
    };

    println!("module: {input}");
    println!("  functions defined:  {}", module.functions.len());
    println!("  functions declared: {}", module.func_declarations.len());
    println!("  global variables:   {}", module.global_vars.len());
    ExitCode::SUCCESS
}

fn load_and_translate(input: &Path) -> Result<bclift_ir::Program, DecompileError> {
    let module = bclift_reader::load_module(input)?;
    bclift_passes::translate_module(&module)
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn report(err: &DecompileError) -> ExitCode {
    eprintln!("bcliftc: {err}");
    ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(u8::MAX))
}
