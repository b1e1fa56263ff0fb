//! Wires the configured Provider, Tool Registry, Conversation Store,
//! Tracer, and Memory Store into one [`AgentCore`], the way the teacher's
//! `main.rs` assembles its gateway state before serving a single request.

use std::sync::Arc;

use anyhow::Context;
use ra_agent::AgentCore;
use ra_domain::config::Config;
use ra_providers::{AnthropicProvider, LlmProvider, OpenAiCompatProvider};
use ra_store::ConversationStore;
use ra_tracer::Tracer;

use crate::tools::register_builtin_tools;

/// Picks a provider from environment: `ANTHROPIC_API_KEY` wins over
/// `OPENAI_API_KEY` when both are set, matching the order a developer
/// would reach for them on a fresh machine.
fn build_provider(model: &str) -> anyhow::Result<Arc<dyn LlmProvider>> {
    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        let provider = AnthropicProvider::new("anthropic", "https://api.anthropic.com", "ANTHROPIC_API_KEY", model)
            .context("initializing Anthropic provider")?;
        return Ok(Arc::new(provider));
    }
    if std::env::var("OPENAI_API_KEY").is_ok() {
        let provider = OpenAiCompatProvider::new("openai", "https://api.openai.com", "OPENAI_API_KEY", model).context("initializing OpenAI provider")?;
        return Ok(Arc::new(provider));
    }
    anyhow::bail!("no provider credentials found: set ANTHROPIC_API_KEY or OPENAI_API_KEY")
}

pub async fn build_agent(config: &Config) -> anyhow::Result<Arc<AgentCore>> {
    let main_provider = build_provider(&config.agent.model)?;
    let summarizer_model = config.agent.summarizer_model.as_deref().unwrap_or(&config.agent.model);
    let summarizer_provider = build_provider(summarizer_model)?;

    let tracer = Arc::new(Tracer::new(&config.storage.traces_dir).context("initializing tracer")?);
    let tools = Arc::new(ra_tools::ToolRegistry::new(tracer.clone()));
    register_builtin_tools(&tools).context("registering built-in tools")?;

    let store = Arc::new(ConversationStore::new(&config.storage.conversations_dir).context("initializing conversation store")?);
    let memory = ra_memory::create_memory_store(&config.memory, &config.storage.memory_dir).await;

    Ok(Arc::new(AgentCore::new(
        main_provider,
        summarizer_provider,
        tools,
        store.clone(),
        tracer,
        memory,
        config.agent.clone(),
        config.retry.clone(),
    )))
}

pub fn build_store(config: &Config) -> anyhow::Result<Arc<ConversationStore>> {
    Ok(Arc::new(ConversationStore::new(&config.storage.conversations_dir).context("initializing conversation store")?))
}
