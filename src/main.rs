use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yamlviz::actions::{GitHubClient, MetadataCache};
use yamlviz::config::Config;
use yamlviz::graph::{build_graph, render_text, LayoutEngine, WorkflowGraph};
use yamlviz::workflow::{parse_result_json, parse_workflow};
use yamlviz::wrkflw::{ValidationResult, Wrkflw};

#[derive(Parser)]
#[command(name = "yamlviz")]
#[command(about = "Job dependency graphs for GitHub Actions workflows", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/yamlviz/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the positioned job graph
    Graph {
        /// Workflow YAML file, or - for stdin
        file: String,
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Draw the job graph in the terminal
    Dag {
        /// Workflow YAML file, or - for stdin
        file: String,
    },
    /// Print the parsed workflow as {ok, data} or {ok, error}
    Parse {
        /// Workflow YAML file, or - for stdin
        file: String,
    },
    /// Validate a workflow with the wrkflw CLI
    Validate {
        /// Workflow YAML file
        file: PathBuf,
        /// Draw the job graph with validation results
        #[arg(long)]
        annotate: bool,
        /// Print the raw validation result as JSON
        #[arg(long, conflicts_with = "annotate")]
        json: bool,
    },
    /// Run a workflow locally with the wrkflw CLI
    Run {
        /// Workflow YAML file
        file: PathBuf,
    },
    /// Show GitHub metadata for every action a workflow uses
    Actions {
        /// Workflow YAML file, or - for stdin
        file: String,
    },
    /// Show GitHub metadata for one action reference
    Action {
        /// owner/repo[@version]
        reference: String,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "yamlviz=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };

    match cli.command {
        Commands::Graph {
            file,
            format,
            compact,
        } => cmd_graph(&config, &file, format, compact)?,
        Commands::Dag { file } => cmd_dag(&config, &file)?,
        Commands::Parse { file } => cmd_parse(&file)?,
        Commands::Validate {
            file,
            annotate,
            json,
        } => cmd_validate(&config, &file, annotate, json).await?,
        Commands::Run { file } => cmd_run(&config, &file).await?,
        Commands::Actions { file } => cmd_actions(&config, &file).await?,
        Commands::Action { reference } => cmd_action(&config, &reference).await?,
        Commands::Completions { shell } => {
            cmd_completions(shell)?;
        }
    }

    Ok(())
}

/// Shell completion variants
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CompletionShell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::PowerShell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Generate shell completions
fn cmd_completions(shell: CompletionShell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let shell: Shell = shell.into();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}

// ============================================================================
// Input helpers
// ============================================================================

fn read_input(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read workflow from stdin")?;
        return Ok(content);
    }

    let path = Path::new(file);
    if !path.exists() {
        anyhow::bail!("File not found: {}", file);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", file))
}

fn load_graph(config: &Config, file: &str) -> anyhow::Result<WorkflowGraph> {
    let content = read_input(file)?;
    let workflow =
        parse_workflow(&content).with_context(|| format!("Failed to parse {}", file))?;
    let mut graph = build_graph(&workflow);
    LayoutEngine::new(config.layout.clone()).apply(&mut graph);
    Ok(graph)
}

fn metadata_cache(config: &Config) -> MetadataCache {
    MetadataCache::new(
        GitHubClient::new(&config.github),
        Duration::from_secs(config.github.cache_ttl_seconds),
    )
}

// ============================================================================
// Graph Commands
// ============================================================================

fn cmd_graph(
    config: &Config,
    file: &str,
    format: OutputFormat,
    compact: bool,
) -> anyhow::Result<()> {
    let graph = load_graph(config, file)?;

    let rendered = match format {
        OutputFormat::Json if compact => serde_json::to_string(&graph)?,
        OutputFormat::Json => serde_json::to_string_pretty(&graph)?,
        OutputFormat::Yaml => graph.to_yaml()?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn cmd_dag(config: &Config, file: &str) -> anyhow::Result<()> {
    let graph = load_graph(config, file)?;
    print!("{}", render_text(&graph));

    let dangling: Vec<_> = graph.dangling_edges().collect();
    if !dangling.is_empty() {
        println!();
        for edge in dangling {
            println!("  ⚠ '{}' needs unknown job '{}'", edge.target, edge.source);
        }
    }
    Ok(())
}

fn cmd_parse(file: &str) -> anyhow::Result<()> {
    let content = read_input(file)?;
    let result = parse_workflow(&content);
    println!("{}", serde_json::to_string_pretty(&parse_result_json(&result))?);
    Ok(())
}

// ============================================================================
// wrkflw Commands
// ============================================================================

async fn cmd_validate(
    config: &Config,
    file: &Path,
    annotate: bool,
    json: bool,
) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let wrkflw = Wrkflw::from_config(&config.wrkflw);
    let result = match wrkflw.validate(file).await {
        Ok(result) => result,
        Err(yamlviz::Error::ValidatorNotFound(binary)) => {
            anyhow::bail!(
                "wrkflw CLI not found ('{}'). Please install wrkflw: https://github.com/fu2hito/wrkflw",
                binary
            );
        }
        Err(e) => return Err(e).context("Validation failed"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if annotate {
        let mut graph = load_graph(config, &file.to_string_lossy())?;
        graph.apply_validation(&result);
        print!("{}", render_text(&graph));
        print_workflow_issues(&result);
    } else {
        print_validation(&result);
    }

    if !result.is_valid {
        anyhow::bail!("Validation failed: {} issue(s)", result.issues.len());
    }
    Ok(())
}

fn print_validation(result: &ValidationResult) {
    if result.is_valid {
        println!("✓ Workflow is valid");
    } else {
        println!("✗ Validation failed: {} issue(s)", result.issues.len());
    }
    for issue in &result.issues {
        let location = match (issue.line, issue.column) {
            (Some(line), Some(column)) => format!("{}:{} ", line, column),
            (Some(line), None) => format!("{} ", line),
            _ => String::new(),
        };
        let job = issue
            .job_id
            .as_deref()
            .map(|id| format!("[{}] ", id))
            .unwrap_or_default();
        println!("  - {}{}{}: {}", location, job, issue.severity, issue.message);
    }
}

fn print_workflow_issues(result: &ValidationResult) {
    let issues: Vec<_> = result.workflow_issues().collect();
    if issues.is_empty() {
        return;
    }
    println!();
    println!("Workflow issues:");
    for issue in issues {
        println!("  - {}: {}", issue.severity, issue.message);
    }
}

async fn cmd_run(config: &Config, file: &Path) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let wrkflw = Wrkflw::from_config(&config.wrkflw);
    let mut child = wrkflw
        .run(file)
        .with_context(|| format!("Failed to start '{} run'", wrkflw.binary()))?;
    let status = child.wait().await?;

    if !status.success() {
        anyhow::bail!("wrkflw run exited with {}", status);
    }
    Ok(())
}

// ============================================================================
// Action Commands
// ============================================================================

async fn cmd_actions(config: &Config, file: &str) -> anyhow::Result<()> {
    let graph = load_graph(config, file)?;
    let refs = graph.action_refs();
    if refs.is_empty() {
        println!("[]");
        return Ok(());
    }

    let cache = metadata_cache(config);
    let mut entries = Vec::with_capacity(refs.len());
    for (action, result) in cache.get_many(&refs).await {
        let entry = match result {
            Ok(Some(metadata)) => serde_json::json!({
                "reference": action.to_string(),
                "metadata": metadata,
            }),
            Ok(None) => serde_json::json!({
                "reference": action.to_string(),
                "metadata": null,
            }),
            Err(e) => {
                tracing::warn!(action = %action, "metadata lookup failed: {}", e);
                serde_json::json!({
                    "reference": action.to_string(),
                    "error": e.to_json()["error"],
                })
            }
        };
        entries.push(entry);
    }

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

async fn cmd_action(config: &Config, reference: &str) -> anyhow::Result<()> {
    if !yamlviz::actions::is_valid_action_ref(reference) {
        anyhow::bail!(
            "Invalid action reference '{}'. Expected owner/repo[@version]",
            reference
        );
    }

    let client = GitHubClient::new(&config.github);
    match client.fetch_action_metadata(reference).await? {
        Some(metadata) => println!("{}", serde_json::to_string_pretty(&metadata)?),
        None => anyhow::bail!("Action not found: {}", reference),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_graph_options() {
        let cli = Cli::try_parse_from(["yamlviz", "graph", "ci.yml", "--format", "yaml"]).unwrap();
        match cli.command {
            Commands::Graph {
                file,
                format,
                compact,
            } => {
                assert_eq!(file, "ci.yml");
                assert!(format == OutputFormat::Yaml);
                assert!(!compact);
            }
            _ => panic!("expected graph command"),
        }
    }

    #[test]
    fn test_cli_rejects_annotate_with_json() {
        assert!(Cli::try_parse_from(["yamlviz", "validate", "ci.yml", "--annotate", "--json"]).is_err());
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli = Cli::try_parse_from(["yamlviz", "dag", "-", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }
}
