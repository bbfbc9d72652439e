//! the ledger seam: everything the client needs from a cluster
use {
    anyhow::{anyhow, Context},
    backoff::ExponentialBackoff,
    solana_account_decoder::{UiAccountEncoding, UiDataSliceConfig},
    solana_client::{
        client_error::ClientError,
        nonblocking::rpc_client::RpcClient,
        rpc_client::GetConfirmedSignaturesForAddress2Config,
        rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcTransactionConfig},
        rpc_filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType},
        rpc_request::RpcRequest,
    },
    solana_sdk::{
        clock::Clock,
        commitment_config::CommitmentConfig,
        hash::Hash,
        instruction::InstructionError,
        pubkey::Pubkey,
        signature::Signature,
        sysvar,
        transaction::{Transaction, TransactionError},
    },
    solana_transaction_status::{
        option_serializer::OptionSerializer, EncodedConfirmedTransactionWithStatusMeta,
        UiTransactionEncoding,
    },
    std::{future::Future, str::FromStr, time::Duration},
};

/// max accounts requested by a single getMultipleAccounts call
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountFilter {
    Memcmp { offset: usize, bytes: Vec<u8> },
}

/// an instruction of a historical transaction with resolved account keys
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoricalInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<Pubkey>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoricalTransaction {
    pub signature: Signature,
    pub block_time: Option<i64>,
    pub failed: bool,
    pub instructions: Vec<HistoricalInstruction>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("instruction {index} failed with custom program error {code}")]
    Program { index: u8, code: u32 },
    #[error("transaction failed: {0}")]
    Transaction(TransactionError),
    #[error("transport error: {0:#}")]
    Transport(anyhow::Error),
}

impl From<TransactionError> for SubmitError {
    fn from(value: TransactionError) -> Self {
        match value {
            TransactionError::InstructionError(index, InstructionError::Custom(code)) => {
                Self::Program { index, code }
            }
            other => Self::Transaction(other),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait LedgerRpc {
    /// # Returns
    ///
    /// Ok(None) if the account does not exist
    async fn get_account_data(&self, address: &Pubkey) -> anyhow::Result<Option<Vec<u8>>>;
    async fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> anyhow::Result<Vec<Option<Vec<u8>>>>;
    /// keys of every account owned by `program_id` matching all filters, without their data
    async fn get_program_account_keys(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> anyhow::Result<Vec<Pubkey>>;
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> anyhow::Result<Vec<(Pubkey, Vec<u8>)>>;
    async fn get_latest_blockhash(&self) -> anyhow::Result<Hash>;
    async fn get_balance(&self, address: &Pubkey) -> anyhow::Result<u64>;
    async fn get_minimum_balance_for_rent_exemption(&self, size: usize) -> anyhow::Result<u64>;
    /// unix timestamp of the ledger clock, used for every time based decision
    async fn get_unix_timestamp(&self) -> anyhow::Result<i64>;
    /// signatures touching `address`, newest first
    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> anyhow::Result<Vec<Signature>>;
    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> anyhow::Result<Option<HistoricalTransaction>>;
    /// submits once and waits for confirmation, never retried
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, SubmitError>;
}

/// [`LedgerRpc`] backed by a solana json rpc endpoint
pub struct SolanaRpc {
    rpc: RpcClient,
    commitment: CommitmentConfig,
    max_retry_elapsed: Duration,
}

impl SolanaRpc {
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        commitment: CommitmentConfig,
        max_retry_elapsed: Duration,
    ) -> Self {
        let rpc = RpcClient::new_with_timeout_and_commitment(endpoint.to_string(), timeout, commitment);
        Self {
            rpc,
            commitment,
            max_retry_elapsed,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry_elapsed),
            ..Default::default()
        }
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        backoff::future::retry_notify(
            self.backoff(),
            || {
                let fut = op();
                async move { fut.await.map_err(backoff::Error::transient) }
            },
            |err: ClientError, wait: Duration| {
                log::warn!("{what} failed, retrying in {wait:?}: {err}");
            },
        )
        .await
        .with_context(|| format!("{what} failed"))
    }

    fn filters(filters: &[AccountFilter]) -> Vec<RpcFilterType> {
        filters
            .iter()
            .map(|filter| match filter {
                AccountFilter::Memcmp { offset, bytes } => RpcFilterType::Memcmp(Memcmp::new(
                    *offset,
                    MemcmpEncodedBytes::Bytes(bytes.clone()),
                )),
            })
            .collect()
    }

    fn program_accounts_config(filters: &[AccountFilter], keys_only: bool) -> RpcProgramAccountsConfig {
        RpcProgramAccountsConfig {
            filters: Some(Self::filters(filters)),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                data_slice: keys_only.then_some(UiDataSliceConfig {
                    offset: 0,
                    length: 0,
                }),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// resolves static and lookup table keys, then every top level instruction
fn historical_transaction(
    signature: Signature,
    tx: EncodedConfirmedTransactionWithStatusMeta,
) -> anyhow::Result<HistoricalTransaction> {
    let versioned = tx
        .transaction
        .transaction
        .decode()
        .ok_or_else(|| anyhow!("failed to decode transaction {signature}"))?;
    let mut keys = versioned.message.static_account_keys().to_vec();
    let mut failed = false;
    if let Some(meta) = &tx.transaction.meta {
        failed = meta.err.is_some();
        if let OptionSerializer::Some(loaded) = &meta.loaded_addresses {
            for key in loaded.writable.iter().chain(loaded.readonly.iter()) {
                keys.push(Pubkey::from_str(key).with_context(|| format!("invalid loaded address {key}"))?);
            }
        }
    }
    let instructions = versioned
        .message
        .instructions()
        .iter()
        .filter_map(|ix| {
            Some(HistoricalInstruction {
                program_id: *keys.get(ix.program_id_index as usize)?,
                accounts: ix
                    .accounts
                    .iter()
                    .filter_map(|idx| keys.get(*idx as usize).copied())
                    .collect(),
                data: ix.data.clone(),
            })
        })
        .collect();
    Ok(HistoricalTransaction {
        signature,
        block_time: tx.block_time,
        failed,
        instructions,
    })
}

impl LedgerRpc for SolanaRpc {
    async fn get_account_data(&self, address: &Pubkey) -> anyhow::Result<Option<Vec<u8>>> {
        let response = self
            .with_retry("getAccountInfo", || {
                self.rpc.get_account_with_commitment(address, self.commitment)
            })
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> anyhow::Result<Vec<Option<Vec<u8>>>> {
        let mut out = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let accounts = self
                .with_retry("getMultipleAccounts", || self.rpc.get_multiple_accounts(chunk))
                .await?;
            out.extend(accounts.into_iter().map(|acct| acct.map(|acct| acct.data)));
        }
        Ok(out)
    }

    async fn get_program_account_keys(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> anyhow::Result<Vec<Pubkey>> {
        let accounts = self
            .with_retry("getProgramAccounts", || {
                self.rpc.get_program_accounts_with_config(
                    program_id,
                    Self::program_accounts_config(filters, true),
                )
            })
            .await?;
        Ok(accounts.into_iter().map(|(key, _)| key).collect())
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> anyhow::Result<Vec<(Pubkey, Vec<u8>)>> {
        let accounts = self
            .with_retry("getProgramAccounts", || {
                self.rpc.get_program_accounts_with_config(
                    program_id,
                    Self::program_accounts_config(filters, false),
                )
            })
            .await?;
        Ok(accounts
            .into_iter()
            .map(|(key, account)| (key, account.data))
            .collect())
    }

    async fn get_latest_blockhash(&self) -> anyhow::Result<Hash> {
        self.with_retry("getLatestBlockhash", || self.rpc.get_latest_blockhash())
            .await
    }

    async fn get_balance(&self, address: &Pubkey) -> anyhow::Result<u64> {
        self.with_retry("getBalance", || self.rpc.get_balance(address)).await
    }

    async fn get_minimum_balance_for_rent_exemption(&self, size: usize) -> anyhow::Result<u64> {
        self.with_retry("getMinimumBalanceForRentExemption", || {
            self.rpc.get_minimum_balance_for_rent_exemption(size)
        })
        .await
    }

    async fn get_unix_timestamp(&self) -> anyhow::Result<i64> {
        let data = self
            .get_account_data(&sysvar::clock::id())
            .await?
            .ok_or_else(|| anyhow!("clock sysvar missing"))?;
        let clock: Clock = bincode::deserialize(&data).with_context(|| "failed to decode clock sysvar")?;
        Ok(clock.unix_timestamp)
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> anyhow::Result<Vec<Signature>> {
        let statuses = self
            .with_retry("getSignaturesForAddress", || {
                self.rpc.get_signatures_for_address_with_config(
                    address,
                    GetConfirmedSignaturesForAddress2Config {
                        before,
                        until: None,
                        limit: Some(limit),
                        commitment: Some(self.commitment),
                    },
                )
            })
            .await?;
        statuses
            .into_iter()
            .map(|status| {
                Signature::from_str(&status.signature)
                    .with_context(|| format!("invalid signature {}", status.signature))
            })
            .collect()
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> anyhow::Result<Option<HistoricalTransaction>> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };
        // a null result is an unknown signature, anything else that fails is surfaced
        let tx = self
            .with_retry("getTransaction", || {
                self.rpc.send::<Option<EncodedConfirmedTransactionWithStatusMeta>>(
                    RpcRequest::GetTransaction,
                    serde_json::json!([signature.to_string(), config]),
                )
            })
            .await?;
        tx.map(|tx| historical_transaction(*signature, tx)).transpose()
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, SubmitError> {
        match self.rpc.send_and_confirm_transaction(transaction).await {
            Ok(signature) => Ok(signature),
            Err(err) => match err.get_transaction_error() {
                Some(tx_err) => Err(tx_err.into()),
                None => Err(SubmitError::Transport(anyhow::Error::new(err))),
            },
        }
    }
}
