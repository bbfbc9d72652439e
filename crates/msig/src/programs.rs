//! program layouts and a pluggable registry of instruction decoders
pub mod multisig;
pub mod system;
pub mod token;

use {
    lazy_static::lazy_static,
    multisig::instructions::MultisigInstruction,
    serde::Serialize,
    solana_sdk::{pubkey::Pubkey, system_program},
    std::{collections::HashMap, fmt::Display, sync::Arc},
};

lazy_static! {
    /// names used to label instructions of programs without a decoder
    static ref KNOWN_PROGRAMS: HashMap<Pubkey, &'static str> = HashMap::from([
        (
            solana_sdk::pubkey!("ComputeBudget111111111111111111111111111111"),
            "Compute Budget Program"
        ),
        (
            solana_sdk::pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr"),
            "Memo Program"
        ),
        (
            solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"),
            "Associated Token Program"
        ),
        (
            solana_sdk::pubkey!("BPFLoaderUpgradeab1e11111111111111111111111"),
            "BPF Upgradeable Loader"
        ),
    ]);
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LabeledAccount {
    pub label: String,
    pub address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InstructionArg {
    pub label: String,
    pub value: String,
}

pub(crate) fn arg(label: &str, value: impl Display) -> InstructionArg {
    InstructionArg {
        label: label.to_string(),
        value: value.to_string(),
    }
}

/// pairs accounts with their labels, accounts past the known labels use `extra`
pub(crate) fn labeled_accounts(labels: &[&str], accounts: &[Pubkey], extra: &str) -> Vec<LabeledAccount> {
    accounts
        .iter()
        .enumerate()
        .map(|(idx, key)| LabeledAccount {
            label: labels.get(idx).copied().unwrap_or(extra).to_string(),
            address: key.to_string(),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedInstruction {
    #[serde(with = "crate::types::pubkey_string")]
    pub program_id: Pubkey,
    pub program_name: String,
    pub name: String,
    pub accounts: Vec<LabeledAccount>,
    pub args: Vec<InstructionArg>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueInstruction {
    #[serde(with = "crate::types::pubkey_string")]
    pub program_id: Pubkey,
    pub program_name: Option<String>,
    pub accounts: Vec<String>,
    pub data: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParsedInstruction {
    Decoded(DecodedInstruction),
    Opaque(OpaqueInstruction),
}

impl ParsedInstruction {
    pub fn program_id(&self) -> Pubkey {
        match self {
            Self::Decoded(ix) => ix.program_id,
            Self::Opaque(ix) => ix.program_id,
        }
    }
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Decoded(ix) => Some(&ix.name),
            Self::Opaque(_) => None,
        }
    }
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

pub trait InstructionDecoder: Send + Sync {
    fn program_name(&self) -> &'static str;
    /// # Returns
    ///
    /// None if the instruction is not recognized by this decoder
    fn decode(&self, accounts: &[Pubkey], data: &[u8]) -> Option<DecodedInstruction>;
}

/// decodes instructions of the multisig program, including the ones it replays
pub struct MultisigDecoder {
    pub program_id: Pubkey,
}

impl InstructionDecoder for MultisigDecoder {
    fn program_name(&self) -> &'static str {
        "Multisig Program"
    }

    fn decode(&self, accounts: &[Pubkey], data: &[u8]) -> Option<DecodedInstruction> {
        let ix = MultisigInstruction::decode(data).ok()?;
        let args = match &ix {
            MultisigInstruction::Unrecognized(_) => return None,
            MultisigInstruction::CreateMultisig(a) => {
                let mut args = vec![
                    arg("label", &a.label),
                    arg("threshold", a.threshold),
                    arg("coolOffPeriodInSeconds", a.cool_off_period_in_seconds),
                ];
                args.extend(a.owners.iter().map(|o| arg(&format!("owner {}", o.name), o.address)));
                args
            }
            MultisigInstruction::EditMultisig(a) => {
                let mut args = vec![
                    arg("label", &a.label),
                    arg("threshold", a.threshold),
                    arg("coolOffPeriodInSeconds", a.cool_off_period_in_seconds),
                ];
                args.extend(a.owners.iter().map(|o| arg(&format!("owner {}", o.name), o.address)));
                args
            }
            MultisigInstruction::CreateTransaction(a) => vec![
                arg("title", &a.title),
                arg("description", &a.description),
                arg("operation", a.operation),
                arg("expirationDate", a.expiration_date),
                arg("instructions", a.instructions.len()),
            ],
            MultisigInstruction::CreateTransactionLegacy(a) => vec![
                arg("title", &a.title),
                arg("description", &a.description),
                arg("operation", a.operation),
                arg("expirationDate", a.expiration_date),
                arg("programId", a.pid),
            ],
            MultisigInstruction::ExecuteTransactionWithReplacements(a) => a
                .replacement_accounts
                .iter()
                .map(|key| arg("replacement", key))
                .collect(),
            MultisigInstruction::UpdateSettings(a) => vec![
                arg("opsAccount", a.ops_account),
                arg("createMultisigAccountFee", a.create_multisig_account_fee),
                arg("createTransactionAccountFee", a.create_transaction_account_fee),
                arg("approveTransactionFee", a.approve_transaction_fee),
                arg("rejectTransactionFee", a.reject_transaction_fee),
                arg("executeTransactionFee", a.execute_transaction_fee),
                arg("cancelTransactionFee", a.cancel_transaction_fee),
            ],
            MultisigInstruction::CancelTransaction
            | MultisigInstruction::Approve
            | MultisigInstruction::Reject
            | MultisigInstruction::ExecuteTransaction
            | MultisigInstruction::InitSettings => vec![],
        };
        Some(DecodedInstruction {
            program_id: self.program_id,
            program_name: self.program_name().to_string(),
            name: ix.name().to_string(),
            accounts: labeled_accounts(ix.account_labels(), accounts, "remainingAccount"),
            args,
        })
    }
}

/// maps program ids to decoders, anything without a decoder is returned opaque
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<Pubkey, Arc<dyn InstructionDecoder>>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// registry with the system, token, token-2022 and multisig decoders
    pub fn with_defaults(multisig_program_id: Pubkey) -> Self {
        let mut registry = Self::new();
        registry.register(system_program::id(), Arc::new(system::SystemDecoder));
        for program_id in [token::TOKEN_PROGRAM_ID, token::TOKEN_2022_PROGRAM_ID] {
            registry.register(program_id, Arc::new(token::TokenDecoder { program_id }));
        }
        registry.register(
            multisig_program_id,
            Arc::new(MultisigDecoder {
                program_id: multisig_program_id,
            }),
        );
        registry
    }

    pub fn register(&mut self, program_id: Pubkey, decoder: Arc<dyn InstructionDecoder>) {
        if self.decoders.insert(program_id, decoder).is_some() {
            log::debug!("replaced decoder for {program_id}");
        }
    }

    pub fn parse(&self, program_id: &Pubkey, accounts: &[Pubkey], data: &[u8]) -> ParsedInstruction {
        if let Some(decoded) = self
            .decoders
            .get(program_id)
            .and_then(|decoder| decoder.decode(accounts, data))
        {
            return ParsedInstruction::Decoded(decoded);
        }
        ParsedInstruction::Opaque(OpaqueInstruction {
            program_id: *program_id,
            program_name: self
                .decoders
                .get(program_id)
                .map(|decoder| decoder.program_name().to_string())
                .or_else(|| KNOWN_PROGRAMS.get(program_id).map(|name| name.to_string())),
            accounts: accounts.iter().map(ToString::to_string).collect(),
            data: to_hex(data),
        })
    }
}
