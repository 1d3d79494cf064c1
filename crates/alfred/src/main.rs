use std::path::PathBuf;

use alfred::core::AgentBuilder;
use alfred::{EndpointResolver, Runner, Settings, agents};
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "alfred", version, about = "A helpful assistant in the terminal")]
struct Args {
    /// Agent to chat with.
    #[arg(long, default_value = agents::ROOT_AGENT)]
    agent: String,
    /// Overrides the agent's model, e.g. `ollama/llama3`.
    #[arg(long)]
    model: Option<String>,
    /// Settings file to use instead of the default one.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Lists the available agents and exits.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    let registry = agents::registry(&settings)?;

    if args.list {
        for config in &registry {
            println!("{}\t{}", config.name(), config.model());
        }
        return Ok(());
    }

    let config = registry
        .get(&args.agent)
        .cloned()
        .with_context(|| format!("no agent named `{}`", args.agent))?;
    let mut builder = AgentBuilder::from(config);
    if let Some(model) = args.model {
        builder = builder.with_model(model);
    }

    let resolver = EndpointResolver::new(settings.openai);
    let agent = builder.build(&resolver)?;
    Runner::new(agent).run()
}
