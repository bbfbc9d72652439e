use {
    super::{parse_pubkey, print_json, Session},
    anyhow::{Context, Result},
    msig::{
        programs::multisig::pda::derive_authority, registry::MultisigParams,
        types::MultisigAction, wallet::WalletSigner,
    },
};

/// reads multisig parameters from a yaml file
pub async fn load_params(path: &str) -> Result<MultisigParams> {
    serde_yaml::from_str(
        &tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read params {path}"))?,
    )
    .with_context(|| "failed to deserialize multisig params")
}

pub async fn show_multisig(config_path: &str, multisig: &str) -> Result<()> {
    let session = Session::open(config_path).await?;
    let multisig = parse_pubkey("multisig", multisig)?;
    let info = session.client.get_multisig(&multisig).await?;
    let balance = session.client.vault_balance(&multisig).await?;
    print_json(&serde_json::json!({
        "multisig": info,
        "vaultBalance": balance,
    }))
}

pub async fn list_multisigs(config_path: &str, owner: Option<&str>) -> Result<()> {
    let session = Session::open(config_path).await?;
    let owner = owner.map(|owner| parse_pubkey("owner", owner)).transpose()?;
    let multisigs = session.client.list_multisigs(owner.as_ref()).await?;
    log::info!("found {} multisigs", multisigs.len());
    print_json(&multisigs)
}

pub async fn fees(config_path: &str, action: MultisigAction) -> Result<()> {
    let session = Session::open(config_path).await?;
    let fees = session.client.fees(action).await?;
    print_json(&serde_json::json!({
        "action": action,
        "fees": fees,
        "total": fees.total(),
    }))
}

pub async fn create_multisig(
    config_path: &str,
    keypair: Option<&str>,
    params: &str,
    funding: Option<u64>,
) -> Result<()> {
    let session = Session::open(config_path).await?;
    let wallet = session.wallet(keypair)?;
    let params = load_params(params).await?;
    let (tx, multisig) = session
        .client
        .create_multisig(&wallet.address(), &params, funding)
        .await?;
    let signature = session.sign_and_submit(tx, &wallet).await?;
    let (vault, _) = derive_authority(&session.client.program_id(), &multisig);
    log::info!("created multisig {multisig} with vault {vault}");
    print_json(&serde_json::json!({
        "signature": signature.to_string(),
        "multisig": multisig.to_string(),
        "vault": vault.to_string(),
    }))
}
