//! signing providers used to complete built transactions
use {
    anyhow::Context,
    solana_sdk::{
        pubkey::Pubkey,
        signature::Keypair,
        signer::Signer,
        transaction::Transaction,
    },
};

#[allow(async_fn_in_trait)]
pub trait WalletSigner {
    fn address(&self) -> Pubkey;
    /// adds this wallet's signature, keeping signatures already present
    async fn sign_transaction(&self, transaction: &mut Transaction) -> anyhow::Result<()>;
}

impl WalletSigner for Keypair {
    fn address(&self) -> Pubkey {
        self.pubkey()
    }

    async fn sign_transaction(&self, transaction: &mut Transaction) -> anyhow::Result<()> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[self], blockhash)
            .with_context(|| format!("failed to sign with {}", self.pubkey()))
    }
}
