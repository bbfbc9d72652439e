//! serializable views returned by the client and printed by the cli
use {
    crate::{
        programs::{multisig::instructions::Owner, ParsedInstruction},
        status::ProposalStatus,
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    solana_sdk::pubkey::Pubkey,
};

/// (de)serializes a pubkey as its base58 string
pub mod pubkey_string {
    use {
        serde::{Deserialize, Deserializer, Serializer},
        solana_sdk::pubkey::Pubkey,
        std::str::FromStr,
    };

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pubkey::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// converts unix seconds to a utc timestamp, zero means unset
pub fn timestamp(secs: u64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalInfo {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    #[serde(with = "pubkey_string")]
    pub multisig: Pubkey,
    pub version: u8,
    pub operation: u8,
    #[serde(with = "pubkey_string")]
    pub proposer: Pubkey,
    pub title: String,
    pub description: String,
    pub created_on: Option<DateTime<Utc>>,
    pub executed_on: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub owner_set_seqno: u32,
    pub status: ProposalStatus,
    pub approvals: usize,
    pub rejections: usize,
    /// vote of each owner slot, None when the owner has not voted
    pub votes: Vec<Option<bool>>,
    /// whether the viewing owner has voted, None when no viewer was given
    pub did_sign: Option<bool>,
    pub instructions: Vec<ParsedInstruction>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityAction {
    Created,
    Approved,
    Rejected,
    Executed,
    Deleted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub index: usize,
    pub signature: String,
    pub action: ActivityAction,
    pub created_on: Option<DateTime<Utc>>,
    pub owner: Option<Owner>,
}

/// actions of the program that carry fees
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum MultisigAction {
    CreateMultisig,
    EditMultisig,
    CreateTransaction,
    CancelTransaction,
    ApproveTransaction,
    RejectTransaction,
    ExecuteTransaction,
}

/// lamports an action costs the fee payer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFees {
    pub network_fee: u64,
    pub rent_exempt: u64,
    pub multisig_fee: u64,
}

impl TransactionFees {
    pub fn total(&self) -> u64 {
        self.network_fee
            .saturating_add(self.rent_exempt)
            .saturating_add(self.multisig_fee)
    }
}
