//! Public procedural API (spec.md §4.7). `Orchestrator` is the only type the
//! CLI and node binaries talk to; it owns nothing the lower crates don't
//! already model, it just sequences them: load config, check role and
//! preconditions, delegate, persist, log.

pub mod error;

pub use error::OrchestratorError;

use std::path::{Path, PathBuf};

use airgapper_backup::BackupAdapter;
use airgapper_config::ConfigStore;
use airgapper_consensus::ConsentManager;
use airgapper_core::{
    Config, ConsensusConfig, CoreError, DeletionRequest, DeletionType, EmergencyConfig, KeyHolder,
    PeerConfig, RepositoryConfig, RequestStatus, RestoreRequest, Role, Share, Timestamp,
};
use airgapper_crypto::{canonical_restore_signing_input, generate_repository_password, key_id, verify, KeyPair};
use tracing::info;

type Result<T> = std::result::Result<T, OrchestratorError>;

/// How a node is provisioned at `Initialize` time (spec.md §4.7).
pub enum InitMode {
    Sss {
        threshold: u8,
        total_shares: u8,
        custodians: Vec<String>,
    },
    Consensus {
        threshold: u32,
        total_keys: u32,
    },
}

/// The shares an operator must distribute out-of-band after `Initialize` in
/// SSS mode (`share[0]` stays local; the rest go to the peer host and
/// custodians, per spec.md §4.7).
pub struct InitOutcome {
    pub config: Config,
    pub shares_to_distribute: Vec<Share>,
}

pub struct Orchestrator {
    config_store: ConfigStore,
    consent: ConsentManager,
    backup_program: String,
}

impl Orchestrator {
    pub fn open(data_dir: impl Into<PathBuf>, backup_program: impl Into<String>) -> Result<Self> {
        let data_dir = data_dir.into();
        Ok(Self {
            config_store: ConfigStore::open(&data_dir)?,
            consent: ConsentManager::open(&data_dir)?,
            backup_program: backup_program.into(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        self.config_store.dir()
    }

    fn backup_adapter(&self, repo_url: &str) -> BackupAdapter {
        BackupAdapter::new(&self.backup_program, repo_url)
    }

    fn load(&self) -> Result<Config> {
        self.config_store.load().map_err(|e| match e {
            airgapper_config::ConfigError::NotInitialized(_) => OrchestratorError::Core(CoreError::NotInitialized),
            other => OrchestratorError::Config(other),
        })
    }

    // ── Initialize / Join ───────────────────────────────────────────────────

    pub fn initialize(
        &self,
        name: String,
        repo_url: String,
        mode: InitMode,
        emergency: EmergencyConfig,
        now: Timestamp,
    ) -> Result<InitOutcome> {
        if self.config_store.exists() {
            return Err(CoreError::AlreadyInitialized.into());
        }

        let password = generate_repository_password();
        let adapter = self.backup_adapter(&repo_url);
        adapter.init(&password)?;

        let mut config = Config {
            name,
            role: Some(Role::Owner),
            repository: RepositoryConfig {
                url: repo_url,
                id: None,
                password: Some(password.to_string()),
                api_key: None,
            },
            emergency,
            ..Default::default()
        };

        let shares_to_distribute = match mode {
            InitMode::Sss { threshold, total_shares, custodians: _custodians } => {
                let shares = airgapper_sss::split(password.as_bytes(), threshold, total_shares)?;
                config.local_share = Some(shares[0].data.clone());
                config.share_index = Some(shares[0].index);
                config.sss_threshold = Some(threshold);
                config.sss_total_shares = Some(total_shares);
                shares[1..].to_vec()
            }
            InitMode::Consensus { threshold, total_keys } => {
                let keypair = KeyPair::generate();
                let owner_id = key_id(&keypair.public_key_bytes());
                config.public_key = Some(keypair.public_key_bytes());
                config.private_key = Some(keypair.private_key_bytes().to_vec());
                config.consensus = Some(ConsensusConfig {
                    threshold,
                    total_keys,
                    key_holders: vec![KeyHolder {
                        id: owner_id,
                        name: config.name.clone(),
                        public_key: keypair.public_key_bytes(),
                        address: None,
                        joined_at: now,
                        is_owner: true,
                    }],
                    require_approval: true,
                });
                Vec::new()
            }
        };

        self.config_store.create(&config)?;
        info!(name = %config.name, "node initialized");
        Ok(InitOutcome { config, shares_to_distribute })
    }

    pub fn join_sss(&self, name: String, repo_url: String, share: Share) -> Result<Config> {
        if self.config_store.exists() {
            return Err(CoreError::AlreadyInitialized.into());
        }
        let config = Config {
            name,
            role: Some(Role::Host),
            repository: RepositoryConfig { url: repo_url, id: None, password: None, api_key: None },
            local_share: Some(share.data),
            share_index: Some(share.index),
            ..Default::default()
        };
        self.config_store.create(&config)?;
        info!(name = %config.name, "node joined (sss)");
        Ok(config)
    }

    pub fn join_consensus(&self, name: String, repo_url: String, peer: Option<PeerConfig>) -> Result<Config> {
        if self.config_store.exists() {
            return Err(CoreError::AlreadyInitialized.into());
        }
        let keypair = KeyPair::generate();
        let config = Config {
            name,
            role: Some(Role::Host),
            repository: RepositoryConfig { url: repo_url, id: None, password: None, api_key: None },
            public_key: Some(keypair.public_key_bytes()),
            private_key: Some(keypair.private_key_bytes().to_vec()),
            peer,
            ..Default::default()
        };
        self.config_store.create(&config)?;
        info!(name = %config.name, "node joined (consensus)");
        Ok(config)
    }

    /// Owner registers a joined key holder's public key into the consensus
    /// roster (spec.md §4.7 `Join` note: "the owner must register this
    /// public key later").
    pub fn register_key_holder(&self, holder: KeyHolder) -> Result<Config> {
        let mut config = self.load()?;
        if !config.is_owner() {
            return Err(CoreError::NotOwner.into());
        }
        let consensus = config.consensus.as_mut().ok_or(CoreError::InvalidParameter(
            "node is not in consensus mode".into(),
        ))?;
        consensus.key_holders.push(holder);
        consensus
            .validate()
            .map_err(CoreError::InvalidParameter)?;
        self.config_store.save(&config)?;
        Ok(config)
    }

    // ── Backup / snapshots ──────────────────────────────────────────────────

    pub fn backup(&self, paths: Vec<String>, tags: Vec<String>, now: Timestamp) -> Result<String> {
        let mut config = self.load()?;
        if !config.is_owner() {
            return Err(CoreError::NotOwner.into());
        }
        let password = config.repository.password.clone().ok_or(CoreError::NoPassword)?;
        let adapter = self.backup_adapter(&config.repository.url);
        let output = adapter.backup(&password, &paths, &tags)?;
        self.record_activity(&mut config, now)?;
        Ok(output)
    }

    pub fn list_snapshots(&self) -> Result<String> {
        let config = self.load()?;
        if !config.is_owner() {
            return Err(CoreError::NotOwner.into());
        }
        let password = config.repository.password.clone().ok_or(CoreError::NoPassword)?;
        let adapter = self.backup_adapter(&config.repository.url);
        Ok(adapter.list_snapshots(&password)?)
    }

    fn record_activity(&self, config: &mut Config, now: Timestamp) -> Result<()> {
        if let Some(dms) = config.emergency.dead_man_switch.as_mut() {
            airgapper_emergency::dead_man_switch::record_activity(dms, now);
        }
        self.config_store.save(config)?;
        Ok(())
    }

    pub fn heartbeat(&self, now: Timestamp) -> Result<Config> {
        let mut config = self.load()?;
        self.record_activity(&mut config, now)?;
        Ok(config)
    }

    // ── Restore requests ─────────────────────────────────────────────────────

    pub fn create_restore_request(&self, snapshot_id: String, reason: String, paths: Vec<String>, now: Timestamp) -> Result<RestoreRequest> {
        let config = self.load()?;
        if !config.is_owner() {
            return Err(CoreError::NotOwner.into());
        }
        let requester = config.name.clone();
        if let Some(consensus) = &config.consensus {
            Ok(self.consent.create_restore_request_with_consensus(
                requester,
                snapshot_id,
                reason,
                paths,
                consensus.threshold as usize,
                now,
            )?)
        } else {
            Ok(self.consent.create_restore_request(requester, snapshot_id, reason, paths, now)?)
        }
    }

    /// SSS mode: release the local share into the request. Consensus mode:
    /// sign the canonical transcript and append the signature (spec.md §4.7).
    pub fn approve_restore(&self, request_id: &str, now: Timestamp) -> Result<RestoreRequest> {
        let config = self.load()?;
        if config.is_sss_mode() {
            let share = config.local_share.clone().ok_or(CoreError::NoShare)?;
            Ok(self.consent.approve_restore(request_id, &config.name, share, now)?)
        } else if config.is_consensus_mode() {
            let private_key: [u8; 32] = config
                .private_key
                .clone()
                .ok_or(CoreError::NoPrivateKey)?
                .try_into()
                .map_err(|_| CoreError::InvalidParameter("private key must be 32 bytes".into()))?;
            let keypair = KeyPair::from_bytes(private_key);
            let req = self.consent.get_restore_request(request_id, now)?;
            let holder_key_id = key_id(&keypair.public_key_bytes());
            let transcript = canonical_restore_signing_input(
                &req.id,
                &req.requester,
                &req.snapshot_id,
                &req.reason,
                &holder_key_id,
                &req.paths,
                req.created_at,
            );
            let signature = keypair.sign(&transcript);
            Ok(self.consent.add_restore_signature(request_id, &holder_key_id, &config.name, signature.to_vec(), now)?)
        } else {
            Err(CoreError::InvalidParameter("node has no share or private key configured".into()).into())
        }
    }

    pub fn deny_restore(&self, request_id: &str, now: Timestamp) -> Result<RestoreRequest> {
        Ok(self.consent.deny_restore(request_id, now)?)
    }

    pub fn restore(&self, request_id: &str, target: &str, now: Timestamp) -> Result<String> {
        let config = self.load()?;
        if !config.is_owner() {
            return Err(CoreError::NotOwner.into());
        }
        let req = self.consent.get_restore_request(request_id, now)?;
        if req.status != RequestStatus::Approved {
            return Err(CoreError::RequestNotApproved.into());
        }

        let password = if config.is_sss_mode() {
            let local_share = config.local_share.clone().ok_or(CoreError::NoShare)?;
            let peer_share_data = req.share_data.clone().ok_or(CoreError::RequestNotApproved)?;
            let local_index = config.share_index.ok_or(CoreError::NoShare)?;
            let peer_index = if local_index == 1 { 2 } else { 1 };
            let shares = vec![
                Share { index: local_index, data: local_share },
                Share { index: peer_index, data: peer_share_data },
            ];
            let secret = airgapper_sss::combine(&shares)?;
            String::from_utf8(secret).map_err(|_| CoreError::InvalidParameter("reconstructed password was not valid UTF-8".into()))?
        } else {
            self.verify_consensus_quorum(&config, &req)?;
            config.repository.password.clone().ok_or(CoreError::NoPassword)?
        };

        let adapter = self.backup_adapter(&config.repository.url);
        let output = adapter.restore(&password, &req.snapshot_id, target, None)?;
        info!(request_id, "restore executed");
        Ok(output)
    }

    fn verify_consensus_quorum(&self, config: &Config, req: &RestoreRequest) -> Result<()> {
        let consensus = config
            .consensus
            .as_ref()
            .ok_or_else(|| CoreError::InvalidParameter("node is not in consensus mode".into()))?;
        let mut verified = 0usize;
        for approval in &req.approvals {
            let Some(holder) = consensus.key_holders.iter().find(|h| h.id == approval.key_holder_id) else {
                continue;
            };
            let transcript = canonical_restore_signing_input(
                &req.id,
                &req.requester,
                &req.snapshot_id,
                &req.reason,
                &approval.key_holder_id,
                &req.paths,
                req.created_at,
            );
            if verify(&holder.public_key, &transcript, &approval.signature) {
                verified += 1;
            }
        }
        if verified < req.required_approvals {
            return Err(CoreError::RequestNotApproved.into());
        }
        Ok(())
    }

    /// Re-derive a share at `index` from the stored password under the
    /// current `(threshold, total_shares)`. This uses fresh randomness, so
    /// the returned bytes are a distinct share that combines only with a
    /// freshly re-derived set, never with the originally-distributed shares
    /// (spec.md §4.7, §9 "ExportShare semantics" — left ambiguous on
    /// purpose, implemented literally).
    pub fn export_share(&self, index: u8) -> Result<Share> {
        let config = self.load()?;
        if !config.is_owner() {
            return Err(CoreError::NotOwner.into());
        }
        let password = config.repository.password.clone().ok_or(CoreError::NoPassword)?;
        let k = config.sss_threshold.ok_or(CoreError::InvalidParameter("node has no sss threshold configured".into()))?;
        let n = config.sss_total_shares.ok_or(CoreError::InvalidParameter("node has no sss share count configured".into()))?;
        let shares = airgapper_sss::split(password.as_bytes(), k, n)?;
        let share = shares
            .into_iter()
            .find(|s| s.index == index)
            .ok_or(CoreError::InvalidParameter(format!("no share at index {index}")))?;
        Ok(share)
    }

    // ── Deletion requests ────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn create_deletion_request(
        &self,
        deletion_type: DeletionType,
        snapshot_id: Option<String>,
        paths: Vec<String>,
        reason: String,
        now: Timestamp,
    ) -> Result<DeletionRequest> {
        let config = self.load()?;
        let required_approvals = config
            .consensus
            .as_ref()
            .map(|c| c.threshold as usize)
            .unwrap_or(1);
        Ok(self.consent.create_deletion_request(
            config.name,
            deletion_type,
            snapshot_id,
            paths,
            reason,
            required_approvals,
            now,
        )?)
    }

    pub fn add_deletion_approval(&self, request_id: &str, now: Timestamp) -> Result<DeletionRequest> {
        let config = self.load()?;
        let key_holder_id = config
            .public_key
            .as_ref()
            .map(key_id)
            .unwrap_or_else(|| config.name.clone());
        // Deletion approvals carry no detached signature in the current
        // contract; an empty payload records the approver's presence.
        Ok(self.consent.add_deletion_approval(request_id, &key_holder_id, &config.name, Vec::new(), now)?)
    }

    pub fn deny_deletion(&self, request_id: &str, now: Timestamp) -> Result<DeletionRequest> {
        Ok(self.consent.deny_deletion(request_id, now)?)
    }

    pub fn mark_deletion_executed(&self, request_id: &str, now: Timestamp) -> Result<DeletionRequest> {
        Ok(self.consent.mark_deletion_executed(request_id, now)?)
    }

    // ── Accessors used by the emergency-policy tick (node binary) ──────────

    pub fn consent_manager(&self) -> &ConsentManager {
        &self.consent
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config_store
    }
}
