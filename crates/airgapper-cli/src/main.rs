//! airgapper
//!
//! Single-shot CLI over the custodian core. Every subcommand loads config,
//! performs one operation, and exits — no long-running state (spec.md §5).
//!
//! Usage:
//!   airgapper init        --name <n> --repo <url> --sss <k>:<n> [--custodian <name>]...
//!   airgapper init        --name <n> --repo <url> --consensus <threshold>:<holders>
//!   airgapper join        --name <n> --repo <url> --share <hex> --share-index <i>
//!   airgapper join        --name <n> --repo <url> --consensus
//!   airgapper backup      <paths...> [--tag <t>]...
//!   airgapper snapshots
//!   airgapper request     --snapshot <id> --reason <r> [<paths...>]
//!   airgapper approve     <request-id>
//!   airgapper deny        <request-id>
//!   airgapper restore     <request-id> --target <dir>
//!   airgapper heartbeat
//!   airgapper export-share <index>

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use airgapper_core::{DeletionType, EmergencyConfig, PeerConfig};
use airgapper_orchestrator::{InitMode, Orchestrator};

#[derive(Parser, Debug)]
#[command(name = "airgapper", version, about = "Consensus-gated encrypted backup custodian")]
struct Args {
    /// Directory holding config.json, requests/, deletions/ (default: $HOME/.airgapper).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// External backup tool binary name.
    #[arg(long, global = true, default_value = "restic")]
    backup_program: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Init {
        #[arg(long)]
        name: String,
        #[arg(long)]
        repo: String,
        /// `k:n` for SSS mode.
        #[arg(long, value_name = "K:N")]
        sss: Option<String>,
        #[arg(long)]
        custodian: Vec<String>,
        /// `threshold:holders` for consensus mode.
        #[arg(long, value_name = "THRESHOLD:HOLDERS")]
        consensus: Option<String>,
    },
    Join {
        #[arg(long)]
        name: String,
        #[arg(long)]
        repo: String,
        #[arg(long)]
        share: Option<String>,
        #[arg(long)]
        share_index: Option<u8>,
        #[arg(long, default_value_t = false)]
        consensus: bool,
    },
    Backup {
        paths: Vec<String>,
        #[arg(long)]
        tag: Vec<String>,
    },
    Snapshots,
    Request {
        #[arg(long)]
        snapshot: String,
        #[arg(long)]
        reason: String,
        paths: Vec<String>,
    },
    Approve {
        request_id: String,
    },
    Deny {
        request_id: String,
    },
    Restore {
        request_id: String,
        #[arg(long)]
        target: String,
    },
    Heartbeat,
    ExportShare {
        index: u8,
    },
    DeleteRequest {
        #[arg(long, value_enum)]
        kind: DeletionKindArg,
        #[arg(long)]
        snapshot: Option<String>,
        #[arg(long)]
        reason: String,
        paths: Vec<String>,
    },
    ApproveDeletion {
        request_id: String,
    },
    DenyDeletion {
        request_id: String,
    },
    MarkExecuted {
        request_id: String,
    },
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum DeletionKindArg {
    Snapshot,
    Path,
    Prune,
    All,
}

impl From<DeletionKindArg> for DeletionType {
    fn from(v: DeletionKindArg) -> Self {
        match v {
            DeletionKindArg::Snapshot => DeletionType::Snapshot,
            DeletionKindArg::Path => DeletionType::Path,
            DeletionKindArg::Prune => DeletionType::Prune,
            DeletionKindArg::All => DeletionType::All,
        }
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn data_dir(args: &Args) -> anyhow::Result<PathBuf> {
    match &args.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => {
            let home = dirs_home().context("could not determine home directory")?;
            Ok(home.join(".airgapper"))
        }
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn,airgapper=info").init();

    let args = Args::parse();
    let dir = data_dir(&args)?;
    let orch = Orchestrator::open(dir, args.backup_program.clone())?;

    match args.command {
        Command::Init { name, repo, sss, custodian, consensus } => {
            let mode = match (sss, consensus) {
                (Some(spec), None) => {
                    let (k, n) = parse_ratio(&spec)?;
                    InitMode::Sss { threshold: k as u8, total_shares: n as u8, custodians: custodian }
                }
                (None, Some(spec)) => {
                    let (threshold, holders) = parse_ratio(&spec)?;
                    InitMode::Consensus { threshold: threshold as u32, total_keys: holders as u32 }
                }
                _ => bail!("specify exactly one of --sss K:N or --consensus THRESHOLD:HOLDERS"),
            };
            let outcome = orch.initialize(name, repo, mode, EmergencyConfig::default(), now())?;
            println!("Initialized. role={:?}", outcome.config.role);
            if let Some(pw) = &outcome.config.repository.password {
                println!("Repository password (back this up!): {pw}");
            }
            for share in &outcome.shares_to_distribute {
                println!("Distribute share index={} data={}", share.index, hex::encode(&share.data));
            }
            Ok(())
        }

        Command::Join { name, repo, share, share_index, consensus } => {
            if consensus {
                let peer = Some(PeerConfig { name: Some(name.clone()), address: None });
                let config = orch.join_consensus(name, repo, peer)?;
                println!("Joined (consensus). public_key={}", hex::encode(config.public_key.unwrap_or_default()));
            } else {
                let share_hex = share.context("--share is required in SSS mode")?;
                let index = share_index.context("--share-index is required in SSS mode")?;
                let data = hex::decode(&share_hex).context("decoding --share hex")?;
                let config = orch.join_sss(name, repo, airgapper_core::Share { index, data })?;
                println!("Joined (sss). share_index={}", config.share_index.unwrap());
            }
            Ok(())
        }

        Command::Backup { paths, tag } => {
            let output = orch.backup(paths, tag, now())?;
            print!("{output}");
            Ok(())
        }

        Command::Snapshots => {
            let output = orch.list_snapshots()?;
            print!("{output}");
            Ok(())
        }

        Command::Request { snapshot, reason, paths } => {
            let req = orch.create_restore_request(snapshot, reason, paths, now())?;
            println!("Restore request created: {} (expires_at={})", req.id, req.expires_at);
            Ok(())
        }

        Command::Approve { request_id } => {
            let req = orch.approve_restore(&request_id, now())?;
            println!("Approval recorded. status={:?}", req.status);
            Ok(())
        }

        Command::Deny { request_id } => {
            let req = orch.deny_restore(&request_id, now())?;
            println!("Denied. status={:?}", req.status);
            Ok(())
        }

        Command::Restore { request_id, target } => {
            let output = orch.restore(&request_id, &target, now())?;
            print!("{output}");
            Ok(())
        }

        Command::Heartbeat => {
            orch.heartbeat(now())?;
            println!("Heartbeat recorded.");
            Ok(())
        }

        Command::ExportShare { index } => {
            let share = orch.export_share(index)?;
            println!("share index={} data={}", share.index, hex::encode(&share.data));
            println!("Warning: this is freshly re-split and does not combine with previously distributed shares.");
            Ok(())
        }

        Command::DeleteRequest { kind, snapshot, reason, paths } => {
            let req = orch.create_deletion_request(kind.into(), snapshot, paths, reason, now())?;
            println!("Deletion request created: {}", req.id);
            Ok(())
        }

        Command::ApproveDeletion { request_id } => {
            let req = orch.add_deletion_approval(&request_id, now())?;
            println!("Deletion approval recorded. status={:?}", req.status);
            Ok(())
        }

        Command::DenyDeletion { request_id } => {
            let req = orch.deny_deletion(&request_id, now())?;
            println!("Deletion denied. status={:?}", req.status);
            Ok(())
        }

        Command::MarkExecuted { request_id } => {
            let req = orch.mark_deletion_executed(&request_id, now())?;
            println!("Deletion marked executed at {:?}", req.executed_at);
            Ok(())
        }
    }
}

fn parse_ratio(spec: &str) -> anyhow::Result<(u32, u32)> {
    let (a, b) = spec.split_once(':').context("expected format K:N")?;
    Ok((a.parse().context("K must be a number")?, b.parse().context("N must be a number")?))
}
