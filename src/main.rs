//! boom CLI: resolve a probability table of class mappings against source
//! ontologies and write the most probable consistent axioms.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use miette::Result;

use boom_engine::config::{OutputMode, ResolverConfig};
use boom_engine::graph::GraphBuilder;
use boom_engine::io::{self, DEFAULT_OUTPUT_PATH};
use boom_engine::report::dot::{GraphvizRasterizer, Rasterizer, write_diagrams};
use boom_engine::report::{json, markdown};
use boom_engine::resolver::Resolver;

#[derive(Parser)]
#[command(
    name = "boom",
    version,
    about = "Bayesian merging of ontologies from a table of mapping probabilities"
)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Output ontology file.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Only report cliques containing these classes (comma-separated or repeated).
    #[arg(short, long = "classes", value_delimiter = ',')]
    classes: Vec<String>,

    /// JSON report file. Printed to stdout when omitted.
    #[arg(short, long)]
    json: Option<PathBuf>,

    /// Probability table (TSV).
    #[arg(short, long)]
    table: PathBuf,

    /// Markdown report file.
    #[arg(short, long)]
    markdown: Option<PathBuf>,

    /// Write only the resolved axioms instead of augmenting the sources.
    #[arg(short = 'n', long = "new")]
    new: bool,

    /// Maximum number of probabilistic edges per clique.
    #[arg(long)]
    max: Option<usize>,

    /// Maximum number of classes per sub-clique when splitting.
    #[arg(long = "split-size", alias = "splitSize")]
    split_size: Option<usize>,

    /// Per-clique cap on evaluated candidate assignments.
    #[arg(long)]
    budget: Option<u64>,

    /// Resolver settings (TOML). Flags override file values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for per-clique Graphviz diagrams.
    #[arg(long)]
    dot_dir: Option<PathBuf>,

    /// Also render diagrams to PNG with Graphviz `dot`.
    #[arg(long, requires = "dot_dir")]
    png: bool,

    /// Solve cliques on the current thread only.
    #[arg(long)]
    serial: bool,

    /// Source ontology files (functional syntax).
    files: Vec<PathBuf>,
}

impl Cli {
    fn resolver_config(&self) -> Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::load(path)?,
            None => ResolverConfig::default(),
        };
        if let Some(max) = self.max {
            config.max_probabilistic_edges = max;
        }
        if let Some(split_size) = self.split_size {
            config.clique_split_size = split_size;
        }
        if self.budget.is_some() {
            config.candidate_budget = self.budget;
        }
        if !self.classes.is_empty() {
            config.seed_entities = self.classes.clone();
        }
        if self.new {
            config.output_mode = OutputMode::Fresh;
        }
        if self.serial {
            config.parallel = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = cli.resolver_config()?;

    let mut builder = GraphBuilder::new();
    for file in &cli.files {
        io::load_axioms(file, &mut builder)?;
    }
    io::load_ptable(&cli.table, &mut builder)?;
    let graph = builder.build()?;

    let resolver = Resolver::new(&graph, config)?;
    let resolution = resolver.resolve();

    for warning in resolution.warnings() {
        tracing::warn!("{warning}");
    }

    if let Some(path) = &cli.markdown {
        io::write_output(path, &markdown::render(&graph, &resolution))?;
    }

    let report = json::render(&graph, &resolution)?;
    match &cli.json {
        Some(path) => io::write_output(path, &report)?,
        None => println!("{report}"),
    }

    let out = cli
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));
    io::save_axioms(&out, &graph, &resolution, resolver.config().output_mode)?;

    if let Some(dir) = &cli.dot_dir {
        let rasterizer = GraphvizRasterizer::default();
        let rasterizer: Option<&dyn Rasterizer> = cli.png.then_some(&rasterizer as &dyn Rasterizer);
        write_diagrams(dir, &graph, &resolution, rasterizer)?;
    }

    if !resolution.is_complete() {
        for failure in resolution.failures() {
            eprintln!("{:?}", miette::Report::new(failure.error.clone()));
        }
        miette::bail!(
            "{} clique(s) could not be solved",
            resolution.failures().len()
        );
    }
    Ok(())
}
