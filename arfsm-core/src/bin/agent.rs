//! `arfsm-agent`: the binary entry point wiring a [`RuntimeConfig`], a
//! [`RedisStore`]/[`RedisBus`] pair, an [`HdnClient`], and the
//! [`FsmEngine`] together, with a periodic timer driving the autonomy
//! cycle (C9) and a `ctrl_c` shutdown (§10).

use std::sync::Arc;
use std::time::Duration;

use arfsm_core::{
    run_cycle, ActionDispatcher, AutonomyCycleConfig, AutonomyCycleDeps, Error, FsmConfig, FsmEngine,
    GoalOutcomeAction, GuardRegistry, HdnClient, HdnNoveltyAssessor, McpFallbackGraphClient, RedisBus, RedisStore,
    Result, RuntimeConfig,
};

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let runtime_config = RuntimeConfig::parse();

    let fsm_config = FsmConfig::from_path(&runtime_config.config_path)?;
    let timer_interval = Duration::from_secs(fsm_config.performance.timer_interval_seconds);

    let store = Arc::new(RedisStore::connect(&runtime_config.redis_url).await?);
    let bus = Arc::new(RedisBus::new(&runtime_config.redis_url)?);

    let hdn = Arc::new(HdnClient::new(runtime_config.hdn_url.clone()));
    let graph = Arc::new(McpFallbackGraphClient::new(hdn.clone()));
    let novelty = Arc::new(HdnNoveltyAssessor::new(hdn.clone()));

    let guards = GuardRegistry::with_defaults();

    let mut dispatcher = ActionDispatcher::new();
    dispatcher.register("goal_outcome_feedback", Arc::new(GoalOutcomeAction::new(store.clone())));

    let engine = Arc::new(FsmEngine::new(
        fsm_config,
        store.clone(),
        bus.clone(),
        dispatcher,
        guards,
        runtime_config.agent_id.clone(),
    ));
    engine.restore().await;
    engine.start().await?;

    let autonomy_deps = AutonomyCycleDeps {
        graph,
        store: store.clone(),
        hdn: hdn.clone(),
        novelty,
        config: AutonomyCycleConfig {
            max_active_goals: runtime_config.max_active_goals,
            max_concurrent_hypothesis_tests: runtime_config.max_concurrent_hypothesis_tests,
            disable_llm_goal_selection: runtime_config.disable_llm_goal_selection,
            bootstrap_max_depth: runtime_config.bootstrap_max_depth,
            bootstrap_max_nodes: runtime_config.bootstrap_max_nodes,
            bootstrap_rpm: runtime_config.bootstrap_rpm,
            bootstrap_min_confidence: 0.7,
            bootstrap_cooldown: runtime_config.bootstrap_cooldown(),
        },
    };

    let domains: Vec<String> = if runtime_config.bootstrap_seeds.is_empty() {
        vec!["default".to_string()]
    } else {
        runtime_config.bootstrap_seeds.clone()
    };

    let cycle_engine = engine.clone();
    let cycle_deps = autonomy_deps.clone();
    let cycle_handle = tokio::spawn(async move {
        let mut consecutive_empty_cycles: u32 = 0;
        let mut ticker = tokio::time::interval(timer_interval);
        loop {
            ticker.tick().await;
            for domain in &domains {
                match run_cycle(&cycle_deps, domain, consecutive_empty_cycles).await {
                    Ok(events) if events.is_empty() => consecutive_empty_cycles += 1,
                    Ok(events) => {
                        consecutive_empty_cycles = 0;
                        for event in events {
                            cycle_engine.handle_event(&event.name, event.payload).await;
                        }
                    }
                    Err(e) => tracing::warn!(domain, error = %e, "autonomy cycle failed"),
                }
            }
        }
    });

    tokio::signal::ctrl_c().await.map_err(|e| Error::Internal(e.to_string()))?;
    tracing::info!("shutdown signal received, stopping agent");
    cycle_handle.abort();
    engine.stop().await;

    Ok(())
}
