//! instruction layouts of the multisig program
//!
//! instruction data is an 8 byte discriminator followed by the borsh encoded arguments
use {
    super::{
        accounts::{ProposalAccountMeta, ProposalInstruction},
        pda::{derive_settings, derive_transaction_detail, get_program_data_account},
    },
    crate::error::CodecError,
    borsh::{BorshDeserialize, BorshSerialize},
    serde::{Deserialize, Serialize},
    solana_sdk::{
        instruction::{AccountMeta, Instruction},
        pubkey::Pubkey,
        system_program,
    },
};

pub const CREATE_MULTISIG: [u8; 8] = [148, 146, 240, 10, 226, 215, 167, 174];
pub const EDIT_MULTISIG: [u8; 8] = [255, 101, 248, 115, 198, 95, 34, 247];
pub const CREATE_TRANSACTION: [u8; 8] = [227, 193, 53, 239, 55, 126, 112, 105];
pub const CANCEL_TRANSACTION: [u8; 8] = [65, 191, 19, 127, 230, 26, 214, 142];
pub const APPROVE: [u8; 8] = [69, 74, 217, 36, 115, 117, 97, 76];
pub const REJECT: [u8; 8] = [135, 7, 63, 85, 131, 114, 111, 224];
pub const EXECUTE_TRANSACTION: [u8; 8] = [231, 173, 49, 91, 235, 24, 68, 19];
pub const EXECUTE_TRANSACTION_WITH_REPLACEMENTS: [u8; 8] = [201, 14, 16, 209, 148, 140, 226, 232];
pub const INIT_SETTINGS: [u8; 8] = [140, 238, 186, 38, 195, 253, 166, 236];
pub const UPDATE_SETTINGS: [u8; 8] = [81, 166, 51, 213, 158, 84, 157, 108];

/// an owner as passed to create and edit instructions
#[derive(BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Owner {
    #[serde(with = "crate::types::pubkey_string")]
    pub address: Pubkey,
    pub name: String,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateMultisigArgs {
    pub owners: Vec<Owner>,
    pub threshold: u64,
    pub nonce: u8,
    pub label: String,
    pub cool_off_period_in_seconds: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct EditMultisigArgs {
    pub owners: Vec<Owner>,
    pub threshold: u64,
    pub label: String,
    pub cool_off_period_in_seconds: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateTransactionArgs {
    pub instructions: Vec<ProposalInstruction>,
    pub operation: u8,
    pub title: String,
    pub description: String,
    pub expiration_date: u64,
}

/// single instruction proposal creation used by older deployments
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateTransactionLegacyArgs {
    pub pid: Pubkey,
    pub accs: Vec<ProposalAccountMeta>,
    pub data: Vec<u8>,
    pub operation: u8,
    pub title: String,
    pub description: String,
    pub expiration_date: u64,
    pub pda_timestamp: u64,
    pub pda_bump: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExecuteWithReplacementsArgs {
    pub replacement_accounts: Vec<Pubkey>,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct UpdateSettingsArgs {
    pub ops_account: Pubkey,
    pub create_multisig_account_fee: u64,
    pub create_transaction_account_fee: u64,
    pub approve_transaction_fee: u64,
    pub reject_transaction_fee: u64,
    pub execute_transaction_fee: u64,
    pub cancel_transaction_fee: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultisigInstruction {
    CreateMultisig(CreateMultisigArgs),
    EditMultisig(EditMultisigArgs),
    CreateTransaction(CreateTransactionArgs),
    CreateTransactionLegacy(CreateTransactionLegacyArgs),
    CancelTransaction,
    Approve,
    Reject,
    ExecuteTransaction,
    ExecuteTransactionWithReplacements(ExecuteWithReplacementsArgs),
    InitSettings,
    UpdateSettings(UpdateSettingsArgs),
    Unrecognized([u8; 8]),
}

fn args<T: BorshDeserialize>(name: &'static str, mut data: &[u8]) -> Result<T, CodecError> {
    T::deserialize(&mut data).map_err(|source| CodecError::Layout {
        account: name,
        source,
    })
}

impl MultisigInstruction {
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < 8 {
            return Err(CodecError::TooShort {
                account: "multisig instruction",
                expected: 8,
                actual: data.len(),
            });
        }
        let mut tag = [0u8; 8];
        tag.copy_from_slice(&data[..8]);
        let rest = &data[8..];
        Ok(match tag {
            CREATE_MULTISIG => Self::CreateMultisig(args("create_multisig", rest)?),
            EDIT_MULTISIG => Self::EditMultisig(args("edit_multisig", rest)?),
            CREATE_TRANSACTION => match args("create_transaction", rest) {
                Ok(current) => Self::CreateTransaction(current),
                Err(_) => Self::CreateTransactionLegacy(args("create_transaction", rest)?),
            },
            CANCEL_TRANSACTION => Self::CancelTransaction,
            APPROVE => Self::Approve,
            REJECT => Self::Reject,
            EXECUTE_TRANSACTION => Self::ExecuteTransaction,
            EXECUTE_TRANSACTION_WITH_REPLACEMENTS => Self::ExecuteTransactionWithReplacements(
                args("execute_transaction_with_replacements", rest)?,
            ),
            INIT_SETTINGS => Self::InitSettings,
            UPDATE_SETTINGS => Self::UpdateSettings(args("update_settings", rest)?),
            unknown => Self::Unrecognized(unknown),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut data = self.discriminator().to_vec();
        let result = match self {
            Self::CreateMultisig(a) => a.serialize(&mut data),
            Self::EditMultisig(a) => a.serialize(&mut data),
            Self::CreateTransaction(a) => a.serialize(&mut data),
            Self::CreateTransactionLegacy(a) => a.serialize(&mut data),
            Self::ExecuteTransactionWithReplacements(a) => a.serialize(&mut data),
            Self::UpdateSettings(a) => a.serialize(&mut data),
            _ => Ok(()),
        };
        result.map_err(|source| CodecError::Encode {
            account: self.name(),
            source,
        })?;
        Ok(data)
    }

    pub fn discriminator(&self) -> [u8; 8] {
        match self {
            Self::CreateMultisig(_) => CREATE_MULTISIG,
            Self::EditMultisig(_) => EDIT_MULTISIG,
            Self::CreateTransaction(_) | Self::CreateTransactionLegacy(_) => CREATE_TRANSACTION,
            Self::CancelTransaction => CANCEL_TRANSACTION,
            Self::Approve => APPROVE,
            Self::Reject => REJECT,
            Self::ExecuteTransaction => EXECUTE_TRANSACTION,
            Self::ExecuteTransactionWithReplacements(_) => EXECUTE_TRANSACTION_WITH_REPLACEMENTS,
            Self::InitSettings => INIT_SETTINGS,
            Self::UpdateSettings(_) => UPDATE_SETTINGS,
            Self::Unrecognized(tag) => *tag,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMultisig(_) => "createMultisig",
            Self::EditMultisig(_) => "editMultisig",
            Self::CreateTransaction(_) | Self::CreateTransactionLegacy(_) => "createTransaction",
            Self::CancelTransaction => "cancelTransaction",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::ExecuteTransaction => "executeTransaction",
            Self::ExecuteTransactionWithReplacements(_) => "executeTransactionWithReplacements",
            Self::InitSettings => "initSettings",
            Self::UpdateSettings(_) => "updateSettings",
            Self::Unrecognized(_) => "unrecognized",
        }
    }

    /// labels of the fixed accounts each instruction expects, in order
    pub fn account_labels(&self) -> &'static [&'static str] {
        match self {
            Self::CreateMultisig(_) => &["proposer", "multisig", "opsAccount", "settings", "systemProgram"],
            Self::EditMultisig(_) => &["multisig", "multisigSigner"],
            Self::CreateTransaction(_) | Self::CreateTransactionLegacy(_) | Self::CancelTransaction => &[
                "multisig",
                "transaction",
                "transactionDetail",
                "proposer",
                "opsAccount",
                "settings",
                "systemProgram",
            ],
            Self::Approve | Self::Reject => &[
                "multisig",
                "transaction",
                "transactionDetail",
                "owner",
                "opsAccount",
                "settings",
                "systemProgram",
            ],
            Self::ExecuteTransaction | Self::ExecuteTransactionWithReplacements(_) => &[
                "multisig",
                "multisigSigner",
                "transaction",
                "transactionDetail",
                "payer",
                "opsAccount",
                "settings",
                "systemProgram",
            ],
            Self::InitSettings => &["payer", "settings", "program", "programData", "systemProgram"],
            Self::UpdateSettings(_) => &["authority", "settings", "program", "programData"],
            Self::Unrecognized(_) => &[],
        }
    }
}

/// program wide addresses every instruction builder needs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramAccounts {
    pub program_id: Pubkey,
    pub settings: Pubkey,
    pub ops_account: Pubkey,
}

impl ProgramAccounts {
    pub fn new(program_id: Pubkey, ops_account: Pubkey) -> Self {
        Self {
            program_id,
            settings: derive_settings(&program_id).0,
            ops_account,
        }
    }

    fn instruction(
        &self,
        ix: &MultisigInstruction,
        accounts: Vec<AccountMeta>,
    ) -> Result<Instruction, CodecError> {
        Ok(Instruction {
            program_id: self.program_id,
            accounts,
            data: ix.encode()?,
        })
    }

    pub fn create_multisig(
        &self,
        proposer: &Pubkey,
        multisig: &Pubkey,
        args: CreateMultisigArgs,
    ) -> Result<Instruction, CodecError> {
        self.instruction(
            &MultisigInstruction::CreateMultisig(args),
            vec![
                AccountMeta::new(*proposer, true),
                AccountMeta::new(*multisig, true),
                AccountMeta::new(self.ops_account, false),
                AccountMeta::new_readonly(self.settings, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
        )
    }

    /// must be executed through a proposal since the vault authority signs it
    pub fn edit_multisig(
        &self,
        multisig: &Pubkey,
        authority: &Pubkey,
        args: EditMultisigArgs,
    ) -> Result<Instruction, CodecError> {
        self.instruction(
            &MultisigInstruction::EditMultisig(args),
            vec![
                AccountMeta::new(*multisig, false),
                AccountMeta::new_readonly(*authority, true),
            ],
        )
    }

    pub fn create_transaction(
        &self,
        multisig: &Pubkey,
        transaction: &Pubkey,
        proposer: &Pubkey,
        args: CreateTransactionArgs,
    ) -> Result<Instruction, CodecError> {
        let (detail, _) = derive_transaction_detail(&self.program_id, multisig, transaction);
        self.instruction(
            &MultisigInstruction::CreateTransaction(args),
            vec![
                AccountMeta::new(*multisig, false),
                AccountMeta::new(*transaction, true),
                AccountMeta::new(detail, false),
                AccountMeta::new(*proposer, true),
                AccountMeta::new(self.ops_account, false),
                AccountMeta::new_readonly(self.settings, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
        )
    }

    pub fn cancel_transaction(
        &self,
        multisig: &Pubkey,
        transaction: &Pubkey,
        proposer: &Pubkey,
    ) -> Result<Instruction, CodecError> {
        let (detail, _) = derive_transaction_detail(&self.program_id, multisig, transaction);
        self.instruction(
            &MultisigInstruction::CancelTransaction,
            vec![
                AccountMeta::new(*multisig, false),
                AccountMeta::new(*transaction, false),
                AccountMeta::new(detail, false),
                AccountMeta::new(*proposer, true),
                AccountMeta::new(self.ops_account, false),
                AccountMeta::new_readonly(self.settings, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
        )
    }

    /// approve or reject depending on `approve`
    pub fn vote(
        &self,
        multisig: &Pubkey,
        transaction: &Pubkey,
        owner: &Pubkey,
        approve: bool,
    ) -> Result<Instruction, CodecError> {
        let (detail, _) = derive_transaction_detail(&self.program_id, multisig, transaction);
        let ix = if approve {
            MultisigInstruction::Approve
        } else {
            MultisigInstruction::Reject
        };
        self.instruction(
            &ix,
            vec![
                AccountMeta::new_readonly(*multisig, false),
                AccountMeta::new(*transaction, false),
                AccountMeta::new_readonly(detail, false),
                AccountMeta::new(*owner, true),
                AccountMeta::new(self.ops_account, false),
                AccountMeta::new_readonly(self.settings, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
        )
    }

    pub fn execute_transaction(
        &self,
        multisig: &Pubkey,
        authority: &Pubkey,
        transaction: &Pubkey,
        payer: &Pubkey,
        remaining_accounts: Vec<AccountMeta>,
    ) -> Result<Instruction, CodecError> {
        let (detail, _) = derive_transaction_detail(&self.program_id, multisig, transaction);
        let mut accounts = vec![
            AccountMeta::new(*multisig, false),
            AccountMeta::new_readonly(*authority, false),
            AccountMeta::new(*transaction, false),
            AccountMeta::new(detail, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new(self.ops_account, false),
            AccountMeta::new_readonly(self.settings, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ];
        accounts.extend(remaining_accounts);
        self.instruction(&MultisigInstruction::ExecuteTransaction, accounts)
    }

    pub fn execute_transaction_with_replacements(
        &self,
        multisig: &Pubkey,
        authority: &Pubkey,
        transaction: &Pubkey,
        payer: &Pubkey,
        replacement_accounts: Vec<Pubkey>,
        remaining_accounts: Vec<AccountMeta>,
    ) -> Result<Instruction, CodecError> {
        let (detail, _) = derive_transaction_detail(&self.program_id, multisig, transaction);
        let mut accounts = vec![
            AccountMeta::new(*multisig, false),
            AccountMeta::new_readonly(*authority, false),
            AccountMeta::new(*transaction, false),
            AccountMeta::new(detail, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new(self.ops_account, false),
            AccountMeta::new_readonly(self.settings, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ];
        accounts.extend(remaining_accounts);
        self.instruction(
            &MultisigInstruction::ExecuteTransactionWithReplacements(ExecuteWithReplacementsArgs {
                replacement_accounts,
            }),
            accounts,
        )
    }

    pub fn update_settings(
        &self,
        authority: &Pubkey,
        args: UpdateSettingsArgs,
    ) -> Result<Instruction, CodecError> {
        self.instruction(
            &MultisigInstruction::UpdateSettings(args),
            vec![
                AccountMeta::new_readonly(*authority, true),
                AccountMeta::new(self.settings, false),
                AccountMeta::new_readonly(self.program_id, false),
                AccountMeta::new_readonly(get_program_data_account(&self.program_id), false),
            ],
        )
    }
}
