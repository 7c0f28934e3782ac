//! worldgen: plan, compile and validate world specifications.
//!
//! Usage:
//!   worldgen plan "a moody city street at night" --seed 42 --compile
//!   worldgen compile path/to/worldspec.json --build-root build
//!   worldgen validate path/to/worldspec.json
//!
//! Exit codes: 0 success, 1 invalid input or failed plan/compile,
//! 2 usage or IO error.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use worldspec_pipeline::core::pipeline::{WorldPipeline, WorldPipelineBuilder};
use worldspec_pipeline::core::planner::Preferences;
use worldspec_pipeline::core::validate::{FieldError, SchemaSet};

#[derive(Parser)]
#[command(name = "worldgen", version, about = "Deterministic prompt-to-world pipeline")]
struct Cli {
    /// Directory scanned for pack.json manifests
    #[arg(long, global = true, default_value = "packs")]
    packs_dir: PathBuf,

    /// Directory scanned for stylekit.json manifests
    #[arg(long, global = true, default_value = "stylekits")]
    stylekits_dir: PathBuf,

    /// Directory containing replacement schema files
    #[arg(long, global = true)]
    schemas_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a world specification from a prompt
    Plan(PlanArgs),
    /// Compile a world specification into a phase-0 artifact
    Compile(CompileArgs),
    /// Validate a world specification against the schema
    Validate(ValidateArgs),
}

#[derive(Parser)]
struct PlanArgs {
    /// Free-text description of the world
    prompt: String,

    /// Explicit seed; derived from the prompt when omitted
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    max_props: Option<u32>,

    #[arg(long)]
    max_texture_tier: Option<u32>,

    #[arg(long)]
    max_lights: Option<u32>,

    /// Also compile the planned world and write its artifact
    #[arg(long)]
    compile: bool,

    #[arg(long, default_value = "build")]
    build_root: PathBuf,
}

#[derive(Parser)]
struct CompileArgs {
    /// Path to a worldspec JSON file
    worldspec: PathBuf,

    #[arg(long, default_value = "build")]
    build_root: PathBuf,

    /// Compile without writing phase0.json
    #[arg(long)]
    no_write: bool,
}

#[derive(Parser)]
struct ValidateArgs {
    /// Path to a worldspec JSON file
    worldspec: PathBuf,
}

#[derive(Serialize)]
struct CompileReport<'a> {
    ok: bool,
    world_id: &'a str,
    phase0_artifact: Option<&'a Path>,
    teleportable_surfaces: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Plan(ref args) => run_plan(&cli, args),
        Commands::Compile(ref args) => run_compile(&cli, args),
        Commands::Validate(ref args) => run_validate(&cli, args),
    }
}

fn pipeline_builder(cli: &Cli) -> Result<WorldPipelineBuilder, ExitCode> {
    let mut builder = WorldPipeline::builder()
        .packs_dir(&cli.packs_dir)
        .stylekits_dir(&cli.stylekits_dir);
    if let Some(ref dir) = cli.schemas_dir {
        match SchemaSet::from_dir(dir) {
            Ok(schemas) => builder = builder.schemas(schemas),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                return Err(ExitCode::from(2));
            }
        }
    }
    Ok(builder)
}

fn build_pipeline(cli: &Cli, build_root: &Path) -> Result<WorldPipeline, ExitCode> {
    pipeline_builder(cli)?
        .build_root(build_root)
        .build()
        .map_err(|e| {
            eprintln!("ERROR: {}", e);
            ExitCode::from(2)
        })
}

fn run_plan(cli: &Cli, args: &PlanArgs) -> ExitCode {
    let pipeline = match build_pipeline(cli, &args.build_root) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let preferences = Preferences {
        max_props: args.max_props,
        max_texture_tier: args.max_texture_tier,
        max_lights: args.max_lights,
    };

    let worldspec = match pipeline.plan(&args.prompt, args.seed, Some(&preferences)) {
        Ok(spec) => spec,
        Err(e) => {
            report_errors(&e.to_string(), &e.field_errors());
            return ExitCode::FAILURE;
        }
    };
    let value = match worldspec.to_value() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::from(2);
        }
    };
    print_json(&value);

    if args.compile {
        return compile_value(&pipeline, &value, true);
    }
    ExitCode::SUCCESS
}

fn run_compile(cli: &Cli, args: &CompileArgs) -> ExitCode {
    let value = match read_json(&args.worldspec) {
        Ok(v) => v,
        Err(code) => return code,
    };
    let pipeline = match build_pipeline(cli, &args.build_root) {
        Ok(p) => p,
        Err(code) => return code,
    };
    compile_value(&pipeline, &value, !args.no_write)
}

fn run_validate(cli: &Cli, args: &ValidateArgs) -> ExitCode {
    let value = match read_json(&args.worldspec) {
        Ok(v) => v,
        Err(code) => return code,
    };
    // Validation needs the schemas only; registries are not scanned.
    let builder = match pipeline_builder(cli) {
        Ok(b) => b,
        Err(code) => return code,
    };
    let pipeline = match builder
        .with_pack_registry(Default::default())
        .with_stylekit_registry(Default::default())
        .build()
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::from(2);
        }
    };

    match pipeline.validate(&value) {
        Ok(errors) if errors.is_empty() => {
            println!("OK: WorldSpec is valid.");
            ExitCode::SUCCESS
        }
        Ok(errors) => {
            println!("INVALID: WorldSpec failed validation.");
            for error in &errors {
                println!("- {}", error);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::from(2)
        }
    }
}

fn compile_value(pipeline: &WorldPipeline, value: &Value, write: bool) -> ExitCode {
    match pipeline.compile(value, write) {
        Ok(output) => {
            let report = CompileReport {
                ok: true,
                world_id: &output.world_id,
                phase0_artifact: output.phase0_artifact.as_deref(),
                teleportable_surfaces: output.teleportable_surfaces,
            };
            match serde_json::to_value(&report) {
                Ok(v) => print_json(&v),
                Err(e) => eprintln!("ERROR: {}", e),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_errors(&e.to_string(), &e.field_errors());
            ExitCode::FAILURE
        }
    }
}

fn read_json(path: &Path) -> Result<Value, ExitCode> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("ERROR: cannot read {}: {}", path.display(), e);
        ExitCode::from(2)
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        eprintln!("ERROR: invalid JSON in {}: {}", path.display(), e);
        ExitCode::from(2)
    })
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("ERROR: {}", e),
    }
}

fn report_errors(summary: &str, errors: &[FieldError]) {
    eprintln!("ERROR: {}", summary);
    for error in errors {
        eprintln!("- {}", error);
    }
}
