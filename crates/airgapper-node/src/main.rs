//! airgapper-node
//!
//! Long-running server half of the custodian (spec.md §5): one task accepts
//! inbound approval messages, one periodic task evaluates the dead-man's
//! switch and emergency auto-approve/auto-deny/escalate policy. Backups
//! themselves are dispatched by an external scheduler invoking `airgapper
//! backup`, not by this binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use airgapper_emergency::{dead_man_switch, policy};
use airgapper_orchestrator::Orchestrator;

const POLICY_TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "airgapper-node", version, about = "Custodian background server")]
struct Args {
    /// Directory holding config.json, requests/, deletions/ (default: $HOME/.airgapper).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// External backup tool binary name.
    #[arg(long, default_value = "restic")]
    backup_program: String,
}

/// An inbound approval/denial arriving over the network (spec.md §5:
/// "Network approvals arrive on the server and are processed one request at
/// a time"). The transport that produces these (RPC, gossip, etc.) is out of
/// scope; this channel is where it would feed in.
#[derive(Debug)]
enum InboundMessage {
    ApproveRestore { request_id: String },
    DenyRestore { request_id: String },
    ApproveDeletion { request_id: String },
    DenyDeletion { request_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,airgapper_node=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => dirs_home()
            .context("could not determine home directory")?
            .join(".airgapper"),
    };

    let orch = std::sync::Arc::new(Orchestrator::open(&data_dir, args.backup_program)?);
    info!(dir = %data_dir.display(), "airgapper-node starting");

    let (inbound_tx, mut inbound_rx) = tokio::sync::mpsc::channel::<InboundMessage>(256);

    let approval_orch = std::sync::Arc::clone(&orch);
    let approval_task = tokio::spawn(async move {
        while let Some(msg) = inbound_rx.recv().await {
            let now = chrono::Utc::now().timestamp();
            let result = match &msg {
                InboundMessage::ApproveRestore { request_id } => {
                    approval_orch.approve_restore(request_id, now).map(|_| ())
                }
                InboundMessage::DenyRestore { request_id } => {
                    approval_orch.deny_restore(request_id, now).map(|_| ())
                }
                InboundMessage::ApproveDeletion { request_id } => {
                    approval_orch.add_deletion_approval(request_id, now).map(|_| ())
                }
                InboundMessage::DenyDeletion { request_id } => {
                    approval_orch.deny_deletion(request_id, now).map(|_| ())
                }
            };
            if let Err(e) = result {
                warn!(?msg, error = %e, "inbound approval message rejected");
            }
        }
    });

    // Nothing currently feeds `inbound_tx` in this reference server; a real
    // deployment wires it to its transport layer. Held here so the channel
    // doesn't close out from under `approval_task` while the server runs.
    let _inbound_tx = inbound_tx;

    let policy_orch = std::sync::Arc::clone(&orch);
    let policy_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(POLICY_TICK_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = run_policy_tick(&policy_orch) {
                warn!(error = %e, "emergency-policy tick failed");
            }
        }
    });

    info!("node ready");
    tokio::select! {
        res = approval_task => { res.context("approval task panicked")?; }
        res = policy_task => { res.context("policy task panicked")?; }
    }
    Ok(())
}

fn run_policy_tick(orch: &Orchestrator) -> anyhow::Result<()> {
    let now = chrono::Utc::now().timestamp();
    let config = orch.config_store().load()?;

    if let Some(dms) = &config.emergency.dead_man_switch {
        if dead_man_switch::is_triggered(dms, now) {
            warn!("dead-man's switch triggered");
        } else if dead_man_switch::is_warning(dms, now) {
            info!("dead-man's switch in warning window");
        }
    }

    let consent = orch.consent_manager();
    for req in consent.list_pending_restore_requests()? {
        let result = policy::evaluate_restore_policy(&config.emergency, req.created_at, now);
        policy::apply_restore_policy(consent, &req, result, now)?;
    }
    for req in consent.list_pending_deletion_requests()? {
        let result = policy::evaluate_deletion_policy(&config.emergency, req.created_at, now);
        policy::apply_deletion_policy(consent, &req.id, result, now)?;
    }
    Ok(())
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
