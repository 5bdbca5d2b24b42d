use crate::crypto::ValidatorIdentity;
use crate::settings::ValidatorSettings;
use anyhow::{Context, Result, anyhow};
use poolwatch_chain_client::{
    HttpLedgerClient, HttpMinerClient, HttpOracleClient, LedgerClient, WorkerDirectory,
};
use poolwatch_policy_engine::ScoringPolicyRegistry;
use poolwatch_storage_core::PgResultArchive;
use poolwatch_task_ledger::PgTaskLedger;
use poolwatch_validator_core::{Validator, ValidatorParts};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub fn identity_seed_path(state_dir: &Path) -> PathBuf {
    state_dir.join("validator_seed.hex")
}

pub fn local_identity_key(state_dir: &Path) -> Result<String> {
    Ok(load_or_create_identity(&identity_seed_path(state_dir))?.identity_key())
}

pub fn load_or_create_identity(seed_file: &Path) -> Result<ValidatorIdentity> {
    if seed_file.exists() {
        let hex_seed = fs::read_to_string(seed_file)
            .with_context(|| format!("read seed {}", seed_file.display()))?;
        let bytes = hex::decode(hex_seed.trim()).context("decode validator seed hex")?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow!("seed must be 32 bytes"))?;
        return Ok(ValidatorIdentity::from_seed(arr));
    }

    if let Some(parent) = seed_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let random_seed: [u8; 32] = rand::random();
    fs::write(seed_file, hex::encode(random_seed))?;
    info!(path = %seed_file.display(), "created validator identity seed");
    Ok(ValidatorIdentity::from_seed(random_seed))
}

pub fn open_task_ledger(settings: &ValidatorSettings) -> PgTaskLedger {
    let ledger = PgTaskLedger::new(settings.database_url.clone(), settings.ledger_options());
    match &settings.db_schema {
        Some(schema) => ledger.with_schema(schema.clone()),
        None => ledger,
    }
}

pub fn open_result_archive(settings: &ValidatorSettings) -> PgResultArchive {
    let archive = PgResultArchive::new(settings.database_url.clone());
    match &settings.db_schema {
        Some(schema) => archive.with_schema(schema.clone()),
        None => archive,
    }
}

/// Create ledger and archive tables; idempotent.
pub fn init_storage(settings: &ValidatorSettings) -> Result<()> {
    open_task_ledger(settings)
        .init_schema()
        .context("init task ledger schema")?;
    open_result_archive(settings)
        .init_schema()
        .context("init result archive schema")?;
    Ok(())
}

/// Wire a [`Validator`] from settings.
///
/// Resolves the subnet and refuses to start when the local identity is not registered in it.
pub async fn open_validator(settings: &ValidatorSettings, state_dir: &Path) -> Result<Validator> {
    settings.validate()?;
    let identity = load_or_create_identity(&identity_seed_path(state_dir))?;
    let policy = ScoringPolicyRegistry::with_builtin().require(&settings.scoring_policy)?;

    let chain: Arc<dyn LedgerClient> = Arc::new(HttpLedgerClient::new(settings.ledger_url.clone()));
    let subnet_id = chain
        .resolve_subnet_id(&settings.subnet_name)
        .await
        .with_context(|| format!("resolve subnet {}", settings.subnet_name))?;
    let own_uid = WorkerDirectory::new(Arc::clone(&chain), subnet_id)
        .snapshot()
        .await?
        .require_registered(&identity.identity_key())?;
    info!(
        subnet = %settings.subnet_name,
        subnet_id,
        validator_uid = own_uid,
        identity_key = %identity.identity_key(),
        policy = policy.id(),
        "validator registered"
    );

    let parts = ValidatorParts {
        miners: Arc::new(HttpMinerClient::new(identity.clone())),
        identity,
        subnet_id,
        ledger: Arc::new(open_task_ledger(settings)),
        archive: Arc::new(open_result_archive(settings)),
        chain,
        oracle: Arc::new(HttpOracleClient::new(settings.oracle_url.clone())),
        policy,
    };
    Ok(Validator::new(parts, settings.validator_config()))
}
