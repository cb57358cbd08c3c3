use anyhow::{bail, Context, Result};
use clap::Parser;
use eigenc::compiler::{default_output, dump_ir, ir_stats};
use eigenc::{CompileMode, CompileOptions, Compiler, EmitKind, SourceUnit, TargetInfo, Toolchain};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "eigenc",
    version,
    about = "Compile EigenScript units to LLVM IR, object files or executables"
)]
struct Cli {
    /// Analyzed unit (JSON) to compile
    input: PathBuf,

    /// Output file (default: input with .ll, .o or no extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Backend optimization level
    #[arg(short = 'O', default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    opt_level: u8,

    /// Target triple (e.g. wasm32-unknown-unknown); defaults to the host
    #[arg(long)]
    target: Option<String>,

    /// Artifact to produce; overrides --obj and --exec
    #[arg(long, value_enum)]
    emit: Option<EmitKind>,

    /// Compile to an object file instead of IR
    #[arg(long)]
    obj: bool,

    /// Compile and link an executable
    #[arg(long)]
    exec: bool,

    /// Compile as a library module with this name
    #[arg(long)]
    module: Option<String>,

    /// Imported module, in initialization order
    #[arg(long = "import", value_name = "MODULE")]
    imports: Vec<String>,

    /// Variable requiring full state tracking
    #[arg(long = "observe", value_name = "NAME")]
    observed: Vec<String>,

    /// Runtime object or archive to link (also EIGEN_RUNTIME)
    #[arg(long)]
    runtime: Option<PathBuf>,

    /// Skip IR verification
    #[arg(long)]
    no_verify: bool,

    /// Print a listing of the generated IR
    #[arg(long)]
    dump_ir: bool,

    /// Verbose logging and full error chains
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn emit_kind(&self) -> EmitKind {
        match self.emit {
            Some(kind) => kind,
            None if self.exec => EmitKind::Exe,
            None if self.obj => EmitKind::Obj,
            None => EmitKind::Ir,
        }
    }

    fn options(&self) -> CompileOptions {
        let mut options = match &self.module {
            Some(module) => CompileOptions::library(module.clone()),
            None => CompileOptions::default(),
        };
        options.target = self.target.clone();
        options.opt_level = self.opt_level;
        options.observed = self.observed.iter().cloned().collect();
        options.imported_modules = self.imports.clone();
        options.verify = !self.no_verify;
        options
    }

    fn runtime(&self) -> Option<PathBuf> {
        self.runtime
            .clone()
            .or_else(|| std::env::var_os("EIGEN_RUNTIME").map(PathBuf::from))
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        report(&err, cli.verbose);
        std::process::exit(1);
    }
}

/// Library events are `tracing` events forwarded as `log` records
fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    colog::default_builder()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn report(err: &anyhow::Error, verbose: bool) {
    if verbose {
        eprintln!("error: {:#?}", err);
        return;
    }
    match err.downcast_ref::<eigenc::Error>() {
        Some(inner) => eprintln!("error: {}", inner.enhanced_message()),
        None => eprintln!("error: {:#}", err),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let emit = cli.emit_kind();
    let options = cli.options();
    let target = TargetInfo::resolve(options.target.as_deref());
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input, emit, &target));
    let toolchain = Toolchain::from_env();

    let unit = SourceUnit::from_path(&cli.input)?;
    let result = Compiler::new(options.clone()).compile(&unit)?;
    if cli.dump_ir {
        dump_ir(&result.module);
    }
    tracing::debug!(
        stats = ?ir_stats(&result.module),
        cleanup = result.cleanup_count,
        "compiled {}",
        cli.input.display()
    );

    match emit {
        EmitKind::Ir => write_ir(&output, &result.ir_text)?,
        EmitKind::Obj => {
            let ir_path = output.with_extension("ll");
            write_ir(&ir_path, &result.ir_text)?;
            toolchain.emit_object(&ir_path, &output, options.opt_level, &target, options.target.is_some())?;
        }
        EmitKind::Exe => {
            if matches!(options.merged_with(&unit).mode, CompileMode::Library { .. }) {
                bail!("a library unit cannot be linked into an executable; use --obj");
            }
            let main_obj = output.with_extension("o");
            let ir_path = output.with_extension("ll");
            write_ir(&ir_path, &result.ir_text)?;
            toolchain.emit_object(&ir_path, &main_obj, options.opt_level, &target, options.target.is_some())?;

            let mut objects = vec![main_obj];
            let mut visited = BTreeSet::new();
            build_imports(&unit, &options, &toolchain, &target, &mut visited, &mut objects)?;

            let runtime = cli.runtime();
            toolchain.link(&objects, runtime.as_deref(), &output, &target)?;
            tracing::info!(modules = objects.len(), "linked {}", output.display());
        }
    }
    Ok(())
}

fn write_ir(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

/// Compile every imported unit to an object file, depth first, once each
fn build_imports(
    unit: &SourceUnit,
    options: &CompileOptions,
    toolchain: &Toolchain,
    target: &TargetInfo,
    visited: &mut BTreeSet<PathBuf>,
    objects: &mut Vec<PathBuf>,
) -> Result<()> {
    for import in &unit.imports {
        let Some(path) = &import.path else {
            tracing::warn!(module = %import.module, "import has no resolved path; expecting it from the runtime");
            continue;
        };
        if !visited.insert(path.clone()) {
            continue;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let imported = SourceUnit::from_path(path)?;
                let mut lib_options = CompileOptions::library(import.module.clone());
                lib_options.target = options.target.clone();
                lib_options.opt_level = options.opt_level;
                lib_options.verify = options.verify;

                let result = Compiler::new(lib_options).compile(&imported)?;
                let ir_path = path.with_extension("ll");
                let obj_path = path.with_extension("o");
                write_ir(&ir_path, &result.ir_text)?;
                toolchain.emit_object(&ir_path, &obj_path, options.opt_level, target, options.target.is_some())?;
                build_imports(&imported, options, toolchain, target, visited, objects)?;
                objects.push(obj_path);
            }
            _ => objects.push(path.clone()),
        }
    }
    Ok(())
}
