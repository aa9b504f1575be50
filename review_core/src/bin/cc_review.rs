use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use review_core::{
    api::ParsedDiff,
    config::{self, ReviewConfig},
    ColorMode, DiffParser, DiffRenderer, Line, Repository, Role, StyleTable,
};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "cc-review")]
#[command(about = "Review a git diff in the terminal before accepting it", version)]
struct Cli {
    /// Commit or branch to diff the working tree against (defaults to HEAD)
    reference: Option<String>,

    /// Read unified diff text from a file instead of the repository ("-" for stdin)
    #[arg(long, value_name = "FILE", conflicts_with = "reference")]
    patch: Option<PathBuf>,

    /// Repository to review
    #[arg(short = 'C', long, default_value = ".")]
    repo: PathBuf,

    /// Configuration file (defaults to .cc-review.toml in the current directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// When to use colors
    #[arg(long, value_enum)]
    color: Option<ColorMode>,

    /// Treat hunks whose counts disagree with their body as parse failures
    #[arg(long)]
    strict: bool,

    /// Context lines around each change
    #[arg(long, value_name = "LINES")]
    context: Option<u32>,

    /// Do not pair deletions and additions into renames
    #[arg(long)]
    no_renames: bool,

    /// Print the parsed diff as JSON instead of rendering it
    #[arg(long)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    debug!(?config, "effective configuration");

    let text = read_diff_text(&cli, &config)?;
    let styles = StyleTable::for_output(config.color.enabled_for_stdout());
    let mut out = io::stdout().lock();

    if !cli.json {
        let banner = Line::styled(Role::Title, "cc-review").with(Role::Plain, " - Code Review Tool");
        writeln!(out, "{}", banner.paint(&styles))?;
    }

    if text.trim().is_empty() {
        if cli.json {
            writeln!(out, "{}", serde_json::to_string_pretty(&ParsedDiff::default())?)?;
        } else {
            writeln!(out, "{}", styles.paint(Role::Warning, "No changes to review!"))?;
        }
        return Ok(());
    }

    let parsed = DiffParser::new(config.parse_mode()).parse(&text);
    info!(
        files = parsed.len(),
        failures = parsed.failures().count(),
        "parsed diff"
    );
    if parsed.is_empty() {
        bail!("diff output contained no file sections");
    }

    if cli.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&parsed)?)?;
        return Ok(());
    }

    for line in DiffRenderer::new(config.rule_width).render(&parsed) {
        writeln!(out, "{}", line.paint(&styles))?;
    }
    let done = Line::blank()
        .with(Role::Added, "✓")
        .with(Role::Plain, " Review complete!");
    writeln!(out, "\n{}", done.paint(&styles))?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "review_core=debug,cc_review=debug,info"
    } else {
        "warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("CC_REVIEW_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ReviewConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILE_NAME));
    let mut config = ReviewConfig::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    if let Some(color) = cli.color {
        config.color = color;
    }
    if cli.strict {
        config.strict = true;
    }
    if let Some(context) = cli.context {
        config.context_lines = context;
    }
    if cli.no_renames {
        config.detect_renames = false;
    }
    Ok(config)
}

fn read_diff_text(cli: &Cli, config: &ReviewConfig) -> Result<String> {
    if let Some(patch) = &cli.patch {
        return read_patch(patch);
    }

    debug!(repo = %cli.repo.display(), reference = ?cli.reference, "fetching diff");
    let repository = Repository::open(&cli.repo)
        .with_context(|| format!("failed to open repository at {}", cli.repo.display()))?;
    repository
        .diff_text(cli.reference.as_deref(), &config.diff_request())
        .context("error running git diff")
}

fn read_patch(path: &Path) -> Result<String> {
    let mut text = String::new();
    if path == Path::new("-") {
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read diff from stdin")?;
    } else {
        text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
    }
    Ok(text)
}
