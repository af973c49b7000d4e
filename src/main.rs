use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vmcursor::layout::Layout;
use vmcursor::metrics::{Compressibility, byte_frequency_histogram, opcode_histogram};
use vmcursor::program::{self, Compression};
use vmcursor::stress::{self, StressConfig};
use vmcursor::walk::{StopReason, WalkConfig, disassemble, walk};

#[derive(Parser)]
#[command(name = "vmcursor", about = "Decode bytecode programs with a fail-soft instruction cursor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print one line per decoded instruction.
    Disasm(InputArgs),
    /// Print decode statistics for a program.
    Stats(InputArgs),
    /// Decode many random programs and check that decoding is deterministic.
    Stress(StressArgs),
}

#[derive(Args)]
struct LayoutArgs {
    /// Operands of an opcode, as OPCODE=KIND[,KIND...] with KIND one of
    /// u8, u16, u32, bytes:N, var. Repeatable.
    #[arg(long = "operand", value_name = "SPEC")]
    operands: Vec<String>,

    /// Maximum number of opcodes fetched per program.
    #[arg(long, default_value_t = 1 << 16)]
    max_steps: usize,
}

#[derive(Args)]
struct InputArgs {
    /// Program file.
    path: PathBuf,

    /// How the program file is stored.
    #[arg(long, value_enum, default_value_t = Compression::None)]
    compression: Compression,

    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Args)]
struct StressArgs {
    /// Random seed for reproducibility.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of random programs.
    #[arg(long, default_value_t = 1 << 12)]
    programs: usize,

    /// Maximum bytes per program.
    #[arg(long, default_value_t = 64)]
    program_size: usize,

    #[command(flatten)]
    layout: LayoutArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Disasm(args) => run_disasm(&args),
        Command::Stats(args) => run_stats(&args),
        Command::Stress(args) => run_stress(&args),
    }
}

fn build_layout(args: &LayoutArgs) -> anyhow::Result<Layout> {
    Layout::from_specs(&args.operands).context("invalid --operand")
}

fn load_input(args: &InputArgs) -> anyhow::Result<(Vec<u8>, Layout, WalkConfig)> {
    let layout = build_layout(&args.layout)?;
    let program = program::load(&args.path, args.compression)?;
    let config = WalkConfig {
        max_steps: args.layout.max_steps,
    };
    Ok((program, layout, config))
}

fn run_disasm(args: &InputArgs) -> anyhow::Result<()> {
    let (program, layout, config) = load_input(args)?;
    print!("{}", disassemble(&program, &layout, &config));
    Ok(())
}

fn run_stats(args: &InputArgs) -> anyhow::Result<()> {
    let (program, layout, config) = load_input(args)?;
    let w = walk(&program, &layout, &config);
    let ratios = Compressibility::measure(&program, &w);
    let distinct_bytes = byte_frequency_histogram(&program)
        .iter()
        .filter(|&&n| n > 0)
        .count();
    let distinct_opcodes = opcode_histogram(&w).iter().filter(|&&n| n > 0).count();
    let stop = match w.stop {
        StopReason::Return => "return",
        StopReason::StepLimit => "step-limit",
    };

    println!("length:            {}", program.len());
    println!("distinct bytes:    {distinct_bytes}");
    println!("instructions:      {}", w.steps);
    println!("distinct opcodes:  {distinct_opcodes}");
    println!("stop:              {stop}");
    println!("final position:    {}", w.final_position);
    println!("program ratio:     {}", format_ratio(ratios.program));
    println!("opcode ratio:      {}", format_ratio(ratios.opcodes));
    Ok(())
}

fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{r:.6}"),
        None => "-".to_string(),
    }
}

fn run_stress(args: &StressArgs) -> anyhow::Result<()> {
    let layout = build_layout(&args.layout)?;
    let config = StressConfig {
        programs: args.programs,
        program_size: args.program_size,
        max_steps: args.layout.max_steps,
        seed: args.seed,
    };

    let start = std::time::Instant::now();
    let report = stress::run(&config, &layout);
    let elapsed = start.elapsed();
    let steps_per_sec = report.total_steps as f64 / elapsed.as_secs_f64();

    eprintln!("Stress results:");
    eprintln!("  Programs:          {}", report.programs);
    eprintln!("  Returned:          {}", report.returned);
    eprintln!("  Step-limited:      {}", report.step_limited);
    eprintln!("  Mismatches:        {}", report.mismatches);
    eprintln!("  Total steps:       {}", report.total_steps);
    eprintln!("  Elapsed:           {elapsed:.2?}");
    eprintln!("  Steps/sec:         {steps_per_sec:.0}");

    anyhow::ensure!(
        report.mismatches == 0,
        "{} programs decoded differently on repeated walks",
        report.mismatches
    );
    Ok(())
}
