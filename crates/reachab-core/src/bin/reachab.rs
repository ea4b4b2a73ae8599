use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use reachab_core::{AnalysisOutput, analyze};
use reachab_io::InputFormat;
use reachab_types::AnalysisOptions;
use reachab_utils::stdio::get_input_reader;

/// Run the full reachability/belief-propagation pipeline over a graph.
///
/// Reads a CSV or JSON graph (§6 formats), runs `analyze`, and prints the
/// resulting belief for every node as `node\tbelief` to stdout.
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    /// Logging level
    #[clap(long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// Input file (stdin if '-' or omitted)
    #[clap(short, long)]
    input: Option<PathBuf>,

    /// Input format (auto-detected from content if omitted)
    #[clap(short = 'I', long)]
    input_format: Option<InputFormat>,

    /// Cancellation deadline in milliseconds (0 = none)
    #[clap(long, default_value_t = 0)]
    deadline_ms: u64,
}

fn main() -> eyre::Result<()> {
    let use_color = std::io::stderr().is_terminal();
    if use_color {
        color_eyre::install()?;
    }

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(args.log_level.into())
        .with_env_var("REACHAB_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .init();

    let is_stdio = |p: &PathBuf| p.as_os_str() == "-";
    let input_path = args.input.filter(|p| !is_stdio(p));

    let mut reader = get_input_reader(&input_path)?;
    let mut input_text = String::new();
    reader.read_to_string(&mut input_text)?;

    let format = args
        .input_format
        .or_else(|| reachab_io::detect(&input_text))
        .ok_or_else(|| eyre::eyre!("could not determine input format; pass --input-format"))?;
    let graph = reachab_io::parse(format, &input_text)?;
    tracing::info!(
        "parsed graph with {} nodes and {} edges",
        graph.all_nodes().len(),
        graph.edges.len()
    );

    let options = AnalysisOptions {
        deadline_ms: args.deadline_ms,
        ..Default::default()
    };

    match analyze(&graph, &options)? {
        AnalysisOutput::Reachability { beliefs, .. } => {
            for (node, belief) in &beliefs {
                println!("{node}\t{:.6}", belief.midpoint());
            }
        }
        AnalysisOutput::Structure { .. } | AnalysisOutput::Diamonds { .. } => {
            eyre::bail!("reachab only runs the Reachability analysis mode; use reachab-diamonds for DiamondsOnly");
        }
    }

    Ok(())
}
