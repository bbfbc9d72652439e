use {
    anyhow::{anyhow, Context, Result},
    msig::{
        client::MultisigClient, config::Config, rpc::SolanaRpc, wallet::WalletSigner,
    },
    serde::Serialize,
    solana_sdk::{
        pubkey::Pubkey,
        signature::{read_keypair_file, Keypair, Signature},
        transaction::Transaction,
    },
    std::str::FromStr,
};

pub mod config;
pub mod multisig;
pub mod proposal;

/// loaded config and a client connected with it
pub struct Session {
    pub config: Config,
    pub client: MultisigClient<SolanaRpc>,
}

impl Session {
    pub async fn open(config_path: &str) -> Result<Self> {
        let config = Config::load(config_path).await?;
        let client = MultisigClient::connect(
            config.rpc()?,
            config.program_id()?,
            config.ops_account()?,
        )
        .await
        .with_context(|| "failed to connect client")?;
        Ok(Self { config, client })
    }

    /// reads the signer keypair, preferring `keypair` over the configured path
    pub fn wallet(&self, keypair: Option<&str>) -> Result<Keypair> {
        let path = keypair.unwrap_or(&self.config.keypair_path);
        read_keypair_file(path).map_err(|err| anyhow!("failed to read keypair {path}: {err}"))
    }

    /// adds the wallet signature and submits once
    pub async fn sign_and_submit(
        &self,
        mut tx: Transaction,
        wallet: &impl WalletSigner,
    ) -> Result<Signature> {
        wallet.sign_transaction(&mut tx).await?;
        let signature = self.client.submit(&tx).await?;
        Ok(signature)
    }
}

pub fn parse_pubkey(what: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).with_context(|| format!("invalid {what} '{value}'"))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).with_context(|| "failed to serialize output")?
    );
    Ok(())
}
