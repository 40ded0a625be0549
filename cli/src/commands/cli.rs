use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Three independent fetches with staggered durations.
    Concurrent,
    /// Build -> test -> package, ordered by awaiting sibling results.
    Dependent,
    /// Asks for a commit message through a form before continuing.
    Form,
    /// A deep task tree that runs until cancelled.
    Nested,
}

#[derive(Parser, Debug)]
#[command(name = "tasklog", version, about = "Structured task logging over stdio")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to ~/.tasklog/config.toml then ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a demo task tree. Events go to the configured events_out,
    /// `formResponse`/`cancelTask` commands are read from stdin.
    Demo(DemoArgs),
    /// Print the effective configuration.
    Config,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DemoArgs {
    #[arg(value_enum)]
    pub scenario: Scenario,

    /// Base duration of one simulated unit of work.
    #[arg(long, default_value_t = 200)]
    pub step_ms: u64,

    /// Run without a form bridge.
    #[arg(long)]
    pub no_forms: bool,
}
