//! Followgate CLI — operate the follow-up governance engine from the shell:
//! seed niche rule packs, register leads, fire trigger events, record
//! replies, and run the scheduler loop that executes deferred follow-ups.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use followgate_core::FollowgateConfig;
use followgate_core::model::{Lead, TriggerEvent};
use followgate_core::traits::ActionExecutor;
use followgate_engine::{
    GovernanceEngine, NullExecutor, TransitionTable, WebhookExecutor, packs, run_scheduler,
};
use followgate_store::GovernanceDb;

#[derive(Parser)]
#[command(name = "followgate", version, about = "Response-aware follow-up governance for lead outreach")]
struct Cli {
    /// Config file path (defaults to ~/.followgate/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the governance database.
    Init,
    /// Run the engine: poll for due deferred follow-ups until stopped.
    Serve {
        /// Override the poll interval in seconds.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Fire a business trigger event at the engine.
    Trigger {
        /// Event name: lead_created, booking_completed, review_received, …
        event: String,
        #[arg(long)]
        lead: String,
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        niche: Option<String>,
        /// JSON payload forwarded to the action executor.
        #[arg(long)]
        payload: Option<String>,
    },
    /// Record a customer reply for a lead.
    Inbound {
        lead: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Register a lead under governance.
    Lead {
        id: String,
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        niche: String,
    },
    /// List a tenant's leads with their governance state.
    Leads {
        tenant: String,
    },
    /// Manage automation rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Show the audit trail.
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Full history for one lead instead of the recent tail.
        #[arg(long)]
        lead: Option<String>,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// List configured rules (active and inactive).
    List,
    /// Seed the starter pack for a niche: salon, home-services, med-spa.
    Seed { niche: String },
    /// Enable or disable a rule.
    SetActive {
        id: String,
        #[arg(long)]
        active: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "followgate=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => FollowgateConfig::load_from(path)?,
        None => FollowgateConfig::load()?,
    };

    match cli.command {
        Commands::Init => {
            config.save()?;
            GovernanceDb::open(&config.db_path())?;
            tracing::info!("🚀 Initialized followgate at {}", config.data_dir);
            println!("config: {}", FollowgateConfig::default_path().display());
            println!("database: {}", config.db_path().display());
        }
        Commands::Serve { interval } => {
            let db = open_db(&config)?;
            let engine = Arc::new(build_engine(&config, db.clone()));
            let secs = interval.unwrap_or(config.engine.poll_interval_secs);
            tracing::info!(
                "🚀 Followgate serving: {} rule(s), {} pending job(s)",
                engine.registry().len(),
                db.pending_job_count()?
            );
            run_scheduler(engine, secs).await;
        }
        Commands::Trigger { event, lead, tenant, niche, payload } => {
            let db = open_db(&config)?;
            let engine = build_engine(&config, db);

            let mut trigger = TriggerEvent::new(&event, &lead, &tenant);
            if let Some(n) = &niche {
                trigger = trigger.with_niche(n);
            }
            if let Some(raw) = &payload {
                let value = serde_json::from_str(raw).context("payload is not valid JSON")?;
                trigger = trigger.with_payload(value);
            }

            let summary = engine.dispatch(&trigger).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Inbound { lead, note } => {
            let db = open_db(&config)?;
            let engine = build_engine(&config, db);
            let state = engine
                .record_inbound(&lead, note.as_deref(), chrono::Utc::now())
                .await?;
            println!("lead {lead} is now {}", state.as_str());
        }
        Commands::Lead { id, tenant, niche } => {
            let db = open_db(&config)?;
            db.upsert_lead(&Lead::new(&id, &tenant, &niche))?;
            println!("lead {id} registered ({niche})");
        }
        Commands::Leads { tenant } => {
            let db = open_db(&config)?;
            for lead in db.leads_for_tenant(&tenant)? {
                println!(
                    "{}  {:<14} {:<10} last_outbound={}",
                    lead.id,
                    lead.niche,
                    lead.governance_state.as_str(),
                    lead.last_outbound_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".into()),
                );
            }
        }
        Commands::Rules { command } => {
            let db = open_db(&config)?;
            match command {
                RulesCommand::List => {
                    for rule in db.load_rules(false)? {
                        println!(
                            "{}  {:<14} {:<18} → {:<26} delay={}m active={}",
                            rule.id,
                            rule.niche.as_deref().unwrap_or("*"),
                            rule.trigger_event.as_deref().unwrap_or("(manual)"),
                            rule.action,
                            rule.delay_minutes,
                            rule.is_active,
                        );
                    }
                }
                RulesCommand::Seed { niche } => {
                    let pack = packs::starter_pack(&niche);
                    if pack.is_empty() {
                        anyhow::bail!(
                            "no starter pack for '{niche}' (known: {})",
                            packs::known_niches().join(", ")
                        );
                    }
                    for rule in &pack {
                        db.save_rule(rule)?;
                    }
                    println!("seeded {} rule(s) for {niche}", pack.len());
                }
                RulesCommand::SetActive { id, active } => {
                    db.set_rule_active(&id, active)?;
                    println!("rule {id} active={active}");
                }
            }
        }
        Commands::Audit { limit, lead } => {
            let db = open_db(&config)?;
            let entries = match &lead {
                Some(lead_id) => db.audit_for_lead(lead_id)?,
                None => db.recent_audit(limit)?,
            };
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}

fn open_db(config: &FollowgateConfig) -> anyhow::Result<Arc<GovernanceDb>> {
    Ok(Arc::new(GovernanceDb::open(&config.db_path())?))
}

/// Wire the engine over the SQLite store. The action executor comes from
/// config: the webhook bridge when one is configured, the dry-run logger
/// otherwise.
fn build_engine(config: &FollowgateConfig, db: Arc<GovernanceDb>) -> GovernanceEngine {
    let executor: Arc<dyn ActionExecutor> = if config.webhook.enabled && !config.webhook.url.is_empty() {
        let mut webhook = WebhookExecutor::new(&config.webhook.url);
        for (key, value) in &config.webhook.headers {
            webhook = webhook.with_header(key, value);
        }
        Arc::new(webhook)
    } else {
        Arc::new(NullExecutor)
    };

    GovernanceEngine::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db,
        executor,
        TransitionTable::default(),
    )
}
