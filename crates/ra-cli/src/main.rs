mod bootstrap;
mod cli;
mod scenarios;
mod tools;

use clap::Parser;
use cli::{Cli, Command};
use ra_domain::config::{Config, ConfigSeverity};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> anyhow::Result<i32> {
    init_tracing();
    let config = Config::from_env();
    validate_config(&config)?;

    let cli = Cli::parse();
    match cli.command {
        Command::New { message } => cmd_new(&config, &message).await,
        Command::Continue { id_prefix, message } => cmd_continue(&config, &id_prefix, &message).await,
        Command::List => cmd_list(&config),
        Command::Eval { scenarios, baseline, compare } => cmd_eval(&config, scenarios.as_deref(), baseline.as_deref(), compare.as_deref()).await,
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ra_agent=debug")))
        .json()
        .init();
}

fn validate_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {}", issue.message),
            ConfigSeverity::Error => tracing::error!("config: {}", issue.message),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!("config validation failed");
    }
    Ok(())
}

async fn cmd_new(config: &Config, message: &str) -> anyhow::Result<i32> {
    let agent = bootstrap::build_agent(config).await?;
    let store = bootstrap::build_store(config)?;

    let mut conversation = ra_domain::Conversation::new(config.agent.system_prompt.clone());
    let text = agent.send_message(&mut conversation, message).await?;
    store.save(&conversation)?;

    println!("conversation: {}", conversation.id);
    println!("{text}");
    Ok(0)
}

async fn cmd_continue(config: &Config, id_prefix: &str, message: &str) -> anyhow::Result<i32> {
    let agent = bootstrap::build_agent(config).await?;
    let store = bootstrap::build_store(config)?;

    let mut conversation = match store.load(id_prefix) {
        Ok(conversation) => conversation,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(2);
        }
    };

    let text = agent.send_message(&mut conversation, message).await?;
    store.save(&conversation)?;
    println!("{text}");
    Ok(0)
}

fn cmd_list(config: &Config) -> anyhow::Result<i32> {
    let store = bootstrap::build_store(config)?;
    for (id, updated_at) in store.list_all()? {
        println!("{id}  {updated_at}");
    }
    Ok(0)
}

async fn cmd_eval(config: &Config, scenarios_path: Option<&str>, baseline: Option<&str>, compare: Option<&str>) -> anyhow::Result<i32> {
    let agent = bootstrap::build_agent(config).await?;
    let scenarios = scenarios::load_suite(scenarios_path)?;

    let results = ra_eval::run_suite(&agent, &config.agent.system_prompt, &config.eval.weights, config.eval.pass_threshold, &scenarios).await;

    for result in &results.scenario_results {
        let overall = result.scores.get("overall").copied().unwrap_or(0.0);
        println!("{}  {}  overall={overall:.2}", if result.passed { "PASS" } else { "FAIL" }, result.scenario_id);
        if let Some(error) = &result.error {
            println!("    error: {error}");
        }
    }
    println!("{}/{} passed ({:.0}% pass rate)", results.passed, results.total, results.pass_rate * 100.0);

    if let Some(version) = baseline {
        ra_eval::save_baseline(std::path::Path::new(&config.storage.baselines_dir), version, results.clone())?;
        println!("saved baseline {version}");
    }

    if let Some(version) = compare {
        let previous = ra_eval::load_baseline(std::path::Path::new(&config.storage.baselines_dir), version)?;
        let comparison = ra_eval::compare_to_baseline(&results, &previous.summary);
        for (dim, delta) in &comparison.deltas {
            println!("{dim}: {delta:+.3}");
        }
        if comparison.has_regression {
            println!("regression detected against baseline {version}");
            return Ok(3);
        }
    }

    Ok(0)
}
