use {
    crate::rpc::SolanaRpc,
    anyhow::{Context, Result},
    solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey},
    std::{str::FromStr, time::Duration},
};

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub rpc_url: String,
    /// address the multisig program is deployed at
    pub program_id: String,
    /// fee recipient used when the program has no settings account
    #[serde(default)]
    pub ops_account: Option<String>,
    pub commitment: String,
    pub request_timeout_secs: u64,
    /// accounts fetched per request when scanning proposals
    pub page_size: usize,
    /// history entries fetched per activity request
    pub activity_limit: usize,
    /// upper bound on time spent retrying a failed read
    pub max_retry_elapsed_secs: u64,
    /// keypair used to sign write commands
    pub keypair_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8899".to_string(),
            program_id: String::new(),
            ops_account: None,
            commitment: "confirmed".to_string(),
            request_timeout_secs: 30,
            page_size: 50,
            activity_limit: 100,
            max_retry_elapsed_secs: 30,
            keypair_path: "id.json".to_string(),
        }
    }
}

impl Config {
    pub async fn new() -> Self {
        Self::default()
    }
    pub async fn load(path: &str) -> Result<Self> {
        serde_yaml::from_str(
            &tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config {path}"))?,
        )
        .with_context(|| "failed to deserialize config")
    }
    pub async fn save(&self, path: &str) -> Result<()> {
        tokio::fs::write(
            path,
            serde_yaml::to_string(self).with_context(|| "failed to serialize config")?,
        )
        .await
        .with_context(|| "failed to write config")
    }
    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.program_id)
            .with_context(|| format!("invalid program_id '{}'", self.program_id))
    }
    pub fn ops_account(&self) -> Result<Option<Pubkey>> {
        self.ops_account
            .as_deref()
            .map(|key| Pubkey::from_str(key).with_context(|| format!("invalid ops_account '{key}'")))
            .transpose()
    }
    pub fn commitment(&self) -> Result<CommitmentConfig> {
        CommitmentConfig::from_str(&self.commitment)
            .with_context(|| format!("invalid commitment '{}'", self.commitment))
    }
    pub fn rpc(&self) -> Result<SolanaRpc> {
        Ok(SolanaRpc::new(
            &self.rpc_url,
            Duration::from_secs(self.request_timeout_secs),
            self.commitment()?,
            Duration::from_secs(self.max_retry_elapsed_secs),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("msig-config-{}.yaml", std::process::id()));
        let path = path.to_str().unwrap();
        let mut cfg = Config::new().await;
        cfg.program_id = Pubkey::new_unique().to_string();
        cfg.save(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded, cfg);
        assert!(loaded.program_id().is_ok());
        assert_eq!(loaded.ops_account().unwrap(), None);
        assert_eq!(loaded.commitment().unwrap(), CommitmentConfig::confirmed());
        tokio::fs::remove_file(path).await.unwrap();
    }

    #[test]
    fn test_invalid_values() {
        let cfg = Config {
            commitment: "sometimes".to_string(),
            ops_account: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(cfg.program_id().is_err());
        assert!(cfg.ops_account().is_err());
        assert!(cfg.commitment().is_err());
    }
}
