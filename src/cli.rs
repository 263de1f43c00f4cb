//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use regkit::materializer::ConflictPolicy;

/// regkit - component registry installer
///
/// Resolve a component and its registry dependencies, render template
/// variables and install the files into a project.
#[derive(Parser, Debug)]
#[command(
    name = "regkit",
    author,
    version,
    color = clap::ColorChoice::Auto,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Install reusable components from a registry into a project",
    long_about = "regkit resolves a component and every component it depends on, fills in \
                  per-project template variables and writes the files into your project. \
                  Nothing is written until the whole plan has been resolved and validated.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  regkit plan web_search_agent\n    \
                  regkit install web_search_agent --set provider=openai\n    \
                  regkit install web_search_agent --policy skip-if-exists --yes\n    \
                  regkit completions --shell zsh"
)]
pub struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(long, short = 'p', global = true, env = "REGKIT_PROJECT")]
    pub project: Option<PathBuf>,

    /// Registry directory (defaults to <data dir>/regkit/registry)
    #[arg(long, short = 'r', global = true, env = "REGKIT_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Project configuration file (defaults to <project>/regkit.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show what installing a component would do
    Plan(PlanArgs),

    /// Install a component and its dependencies
    Install(InstallArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by plan and install
#[derive(Args, Debug, Clone, Default)]
pub struct PlanOptions {
    /// Component to install
    pub component: String,

    /// Set a template variable (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Conflict policy: overwrite, skip-if-exists, fail-on-conflict, merge
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<ConflictPolicy>,

    /// Never prompt; variables without a value are an error
    #[arg(long)]
    pub non_interactive: bool,

    /// Maximum parallel fetches and writes
    #[arg(long, short = 'j', value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Preview an install:\n    regkit plan web_search_agent\n\n\
                  Preview with a variable set:\n    regkit plan llm_agent --set provider=anthropic\n\n\
                  Machine-readable output:\n    regkit plan web_search_agent --json")]
pub struct PlanArgs {
    #[command(flatten)]
    pub options: PlanOptions,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Install a component:\n    regkit install web_search_agent\n\n\
                  Re-run safely (keep existing files):\n    regkit install web_search_agent --policy skip-if-exists\n\n\
                  Strict install for CI:\n    regkit install web_search_agent --policy fail-on-conflict --non-interactive --yes\n\n\
                  Use a specific registry:\n    regkit install web_search_agent -r ./registry")]
pub struct InstallArgs {
    #[command(flatten)]
    pub options: PlanOptions,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    regkit completions --shell bash > ~/.bash_completion.d/regkit\n\n\
                  Generate zsh completions:\n    regkit completions --shell zsh > ~/.zfunc/_regkit\n\n\
                  Generate fish completions:\n    regkit completions --shell fish > ~/.config/fish/completions/regkit.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(long)]
    pub shell: String,
}
