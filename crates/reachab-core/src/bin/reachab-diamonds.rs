use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use reachab_core::{AnalysisOutput, analyze};
use reachab_io::InputFormat;
use reachab_types::{AnalysisMode, AnalysisOptions};
use reachab_utils::stdio::get_input_reader;

/// Diagnostic tool: run only through diamond detection (C1-C3) and print
/// the diamonds found at each join, without propagating belief.
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    #[clap(long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    #[clap(short, long)]
    input: Option<PathBuf>,

    #[clap(short = 'I', long)]
    input_format: Option<InputFormat>,
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

    let options = AnalysisOptions {
        analysis_mode: AnalysisMode::DiamondsOnly,
        ..Default::default()
    };

    match analyze(&graph, &options)? {
        AnalysisOutput::Diamonds { diamonds } => {
            if diamonds.is_empty() {
                println!("no diamonds detected");
            }
            for (join, at_node) in &diamonds {
                for diamond in &at_node.diamonds {
                    println!(
                        "join={join} relevant={:?} conditioning={:?} non_diamond_parents={:?}",
                        diamond.relevant_nodes, diamond.conditioning_nodes, at_node.non_diamond_parents
                    );
                }
            }
        }
        AnalysisOutput::Structure { .. } | AnalysisOutput::Reachability { .. } => {
            eyre::bail!("reachab-diamonds always runs in DiamondsOnly mode");
        }
    }

    Ok(())
}
