//! on-chain account layouts of the multisig program
//!
//! every account starts with an 8 byte discriminator followed by a borsh payload.
//! accounts are usually over-allocated so trailing bytes after the payload are ignored.
use {
    super::{
        DESCRIPTION_LEN, LABEL_LEN, MAX_OWNERS, OWNER_NAME_LEN, TITLE_LEN, VOTE_APPROVE,
        VOTE_REJECT,
    },
    crate::{
        error::{CodecError, ValidationError},
        status::OnChainProposalStatus,
    },
    borsh::{BorshDeserialize, BorshSerialize},
    solana_sdk::{
        instruction::{AccountMeta, Instruction},
        pubkey::Pubkey,
    },
};

pub trait AccountCodec: BorshSerialize + BorshDeserialize + Sized {
    const DISCRIMINATOR: [u8; 8];
    const NAME: &'static str;

    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Self::DISCRIMINATOR.to_vec();
        self.serialize(&mut buf)
            .map_err(|source| CodecError::Encode {
                account: Self::NAME,
                source,
            })?;
        Ok(buf)
    }

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < 8 {
            return Err(CodecError::TooShort {
                account: Self::NAME,
                expected: 8,
                actual: data.len(),
            });
        }
        let mut found = [0u8; 8];
        found.copy_from_slice(&data[..8]);
        if found != Self::DISCRIMINATOR {
            return Err(CodecError::Discriminator {
                account: Self::NAME,
                found,
            });
        }
        let mut payload = &data[8..];
        Self::deserialize(&mut payload).map_err(|source| CodecError::Layout {
            account: Self::NAME,
            source,
        })
    }

    /// # Returns
    ///
    /// Ok(None) when the account is missing, zeroed, or holds a different account type
    fn decode_nullable(data: Option<&[u8]>) -> Result<Option<Self>, CodecError> {
        let Some(data) = data.filter(|data| data.iter().any(|b| *b != 0)) else {
            return Ok(None);
        };
        match Self::decode(data) {
            Ok(record) => Ok(Some(record)),
            Err(CodecError::Discriminator { found, .. }) => {
                log::warn!("account is not a {}, found discriminator {found:?}", Self::NAME);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// packs a utf8 string into a null padded fixed width field
pub fn pack_str<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N], ValidationError> {
    let bytes = value.as_bytes();
    if bytes.len() > N {
        return Err(ValidationError::FieldTooLong {
            field,
            max: N,
            len: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

pub fn unpack_str(bytes: &[u8]) -> String {
    let trimmed = bytes.iter().copied().filter(|b| *b != 0).collect::<Vec<_>>();
    String::from_utf8_lossy(&trimmed).into_owned()
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OwnerData {
    pub address: Pubkey,
    pub name: [u8; OWNER_NAME_LEN],
}

impl OwnerData {
    pub fn is_live(&self) -> bool {
        self.address != Pubkey::default()
    }
    pub fn name(&self) -> String {
        unpack_str(&self.name)
    }
}

/// current multisig layout with a fixed owner array, unused slots hold the default key
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MultisigV2 {
    pub owners: [OwnerData; MAX_OWNERS],
    pub version: u8,
    pub nonce: u8,
    pub label: [u8; LABEL_LEN],
    /// incremented every time owners or threshold change, voids older proposals
    pub owner_set_seqno: u32,
    pub threshold: u64,
    pub pending_txs: u64,
    pub created_on: u64,
    pub cool_off_period_in_seconds: u64,
}

impl AccountCodec for MultisigV2 {
    const DISCRIMINATOR: [u8; 8] = [89, 15, 46, 28, 11, 168, 192, 47];
    const NAME: &'static str = "MultisigV2";
}

impl MultisigV2 {
    pub fn live_owners(&self) -> impl Iterator<Item = &OwnerData> {
        self.owners.iter().filter(|owner| owner.is_live())
    }
    pub fn live_owner_count(&self) -> usize {
        self.live_owners().count()
    }
    /// position of the owner among live owners, which is also its vote slot
    pub fn owner_index(&self, owner: &Pubkey) -> Option<usize> {
        self.live_owners().position(|o| o.address == *owner)
    }
    pub fn label(&self) -> String {
        unpack_str(&self.label)
    }
}

/// layout used by multisigs created before the owner array became fixed
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MultisigV1 {
    pub owners: Vec<Pubkey>,
    pub threshold: u64,
    pub nonce: u8,
    pub owner_set_seqno: u32,
    pub label: [u8; LABEL_LEN],
    pub created_on: u64,
    pub pending_txs: u64,
}

impl AccountCodec for MultisigV1 {
    const DISCRIMINATOR: [u8; 8] = [224, 116, 121, 186, 68, 161, 79, 236];
    const NAME: &'static str = "Multisig";
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultisigAccount {
    V2(MultisigV2),
    V1(MultisigV1),
}

impl MultisigAccount {
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        match MultisigV2::decode(data) {
            Ok(ms) => Ok(Self::V2(ms)),
            Err(CodecError::Discriminator { .. }) => {
                log::debug!("multisig is not v2, trying v1");
                MultisigV1::decode(data).map(Self::V1)
            }
            Err(err) => Err(err),
        }
    }
    pub fn decode_nullable(data: Option<&[u8]>) -> Result<Option<Self>, CodecError> {
        let Some(data) = data.filter(|data| data.iter().any(|b| *b != 0)) else {
            return Ok(None);
        };
        match Self::decode(data) {
            Ok(ms) => Ok(Some(ms)),
            Err(CodecError::Discriminator { found, .. }) => {
                log::warn!("account is not a multisig, found discriminator {found:?}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
    pub fn version(&self) -> u8 {
        match self {
            Self::V2(ms) => ms.version.max(2),
            Self::V1(_) => 1,
        }
    }
    pub fn threshold(&self) -> u64 {
        match self {
            Self::V2(ms) => ms.threshold,
            Self::V1(ms) => ms.threshold,
        }
    }
    pub fn owner_set_seqno(&self) -> u32 {
        match self {
            Self::V2(ms) => ms.owner_set_seqno,
            Self::V1(ms) => ms.owner_set_seqno,
        }
    }
    pub fn nonce(&self) -> u8 {
        match self {
            Self::V2(ms) => ms.nonce,
            Self::V1(ms) => ms.nonce,
        }
    }
    pub fn cool_off_period_in_seconds(&self) -> u64 {
        match self {
            Self::V2(ms) => ms.cool_off_period_in_seconds,
            Self::V1(_) => 0,
        }
    }
    /// live owners as (address, name), v1 accounts carry no names
    pub fn live_owners(&self) -> Vec<(Pubkey, String)> {
        match self {
            Self::V2(ms) => ms
                .live_owners()
                .map(|owner| (owner.address, owner.name()))
                .collect(),
            Self::V1(ms) => ms
                .owners
                .iter()
                .filter(|owner| **owner != Pubkey::default())
                .map(|owner| (*owner, String::new()))
                .collect(),
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProposalAccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl From<&AccountMeta> for ProposalAccountMeta {
    fn from(value: &AccountMeta) -> Self {
        Self {
            pubkey: value.pubkey,
            is_signer: value.is_signer,
            is_writable: value.is_writable,
        }
    }
}

impl From<&ProposalAccountMeta> for AccountMeta {
    fn from(value: &ProposalAccountMeta) -> Self {
        Self {
            pubkey: value.pubkey,
            is_signer: value.is_signer,
            is_writable: value.is_writable,
        }
    }
}

/// an instruction stored inside a proposal, replayed by the vault on execution
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProposalInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<ProposalAccountMeta>,
    pub data: Vec<u8>,
}

impl From<&Instruction> for ProposalInstruction {
    fn from(value: &Instruction) -> Self {
        Self {
            program_id: value.program_id,
            accounts: value.accounts.iter().map(From::from).collect(),
            data: value.data.clone(),
        }
    }
}

impl From<&ProposalInstruction> for Instruction {
    fn from(value: &ProposalInstruction) -> Self {
        Instruction {
            program_id: value.program_id,
            accounts: value.accounts.iter().map(From::from).collect(),
            data: value.data.clone(),
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionV2 {
    pub multisig: Pubkey,
    pub instructions: Vec<ProposalInstruction>,
    /// one vote byte per live owner at creation time
    pub signers: Vec<u8>,
    pub owner_set_seqno: u32,
    pub created_on: u64,
    pub executed_on: u64,
    pub operation: u8,
    pub keypairs: Vec<[u8; 64]>,
    pub proposer: Pubkey,
    pub last_known_proposal_status: u8,
    /// when quorum was first reached, anchors the cool off period
    pub last_passed_timestamp: u64,
}

impl AccountCodec for TransactionV2 {
    const DISCRIMINATOR: [u8; 8] = [11, 24, 174, 129, 203, 117, 242, 23];
    const NAME: &'static str = "Transaction";
}

impl TransactionV2 {
    fn is_plausible(&self) -> bool {
        self.signers.len() <= MAX_OWNERS
            && OnChainProposalStatus::from_u8(self.last_known_proposal_status).is_some()
    }
    pub fn cached_status(&self) -> OnChainProposalStatus {
        OnChainProposalStatus::from_u8(self.last_known_proposal_status).unwrap_or_default()
    }
}

/// single instruction proposals written before multi instruction support
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionV1 {
    pub multisig: Pubkey,
    pub program_id: Pubkey,
    pub accounts: Vec<ProposalAccountMeta>,
    pub data: Vec<u8>,
    pub signers: Vec<u8>,
    pub owner_set_seqno: u32,
    pub created_on: u64,
    pub executed_on: u64,
    pub operation: u8,
    pub keypairs: Vec<[u8; 64]>,
    pub proposer: Pubkey,
    pub pda_timestamp: u64,
    pub pda_bump: u8,
}

impl AccountCodec for TransactionV1 {
    const DISCRIMINATOR: [u8; 8] = TransactionV2::DISCRIMINATOR;
    const NAME: &'static str = "Transaction";
}

/// both proposal layouts share a discriminator, v2 is tried first and must pass
/// a plausibility check before it is accepted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProposalAccount {
    V2(TransactionV2),
    V1(TransactionV1),
}

impl ProposalAccount {
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        match TransactionV2::decode(data) {
            Ok(tx) if tx.is_plausible() => return Ok(Self::V2(tx)),
            Ok(_) => log::debug!("proposal decoded as v2 but is implausible, trying v1"),
            Err(err @ CodecError::Discriminator { .. }) | Err(err @ CodecError::TooShort { .. }) => {
                return Err(err)
            }
            Err(err) => log::debug!("proposal is not v2 ({err}), trying v1"),
        }
        match TransactionV1::decode(data) {
            Ok(tx) => Ok(Self::V1(tx)),
            Err(CodecError::Layout { .. }) => Err(CodecError::Implausible {
                account: TransactionV2::NAME,
            }),
            Err(err) => Err(err),
        }
    }
    pub fn decode_nullable(data: Option<&[u8]>) -> Result<Option<Self>, CodecError> {
        let Some(data) = data.filter(|data| data.iter().any(|b| *b != 0)) else {
            return Ok(None);
        };
        match Self::decode(data) {
            Ok(proposal) => Ok(Some(proposal)),
            Err(CodecError::Discriminator { found, .. }) => {
                log::warn!("account is not a proposal, found discriminator {found:?}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
    pub fn version(&self) -> u8 {
        match self {
            Self::V2(_) => 2,
            Self::V1(_) => 1,
        }
    }
    pub fn multisig(&self) -> Pubkey {
        match self {
            Self::V2(tx) => tx.multisig,
            Self::V1(tx) => tx.multisig,
        }
    }
    pub fn proposer(&self) -> Pubkey {
        match self {
            Self::V2(tx) => tx.proposer,
            Self::V1(tx) => tx.proposer,
        }
    }
    pub fn signers(&self) -> &[u8] {
        match self {
            Self::V2(tx) => &tx.signers,
            Self::V1(tx) => &tx.signers,
        }
    }
    pub fn owner_set_seqno(&self) -> u32 {
        match self {
            Self::V2(tx) => tx.owner_set_seqno,
            Self::V1(tx) => tx.owner_set_seqno,
        }
    }
    pub fn created_on(&self) -> u64 {
        match self {
            Self::V2(tx) => tx.created_on,
            Self::V1(tx) => tx.created_on,
        }
    }
    pub fn executed_on(&self) -> u64 {
        match self {
            Self::V2(tx) => tx.executed_on,
            Self::V1(tx) => tx.executed_on,
        }
    }
    pub fn operation(&self) -> u8 {
        match self {
            Self::V2(tx) => tx.operation,
            Self::V1(tx) => tx.operation,
        }
    }
    pub fn cached_status(&self) -> OnChainProposalStatus {
        match self {
            Self::V2(tx) => tx.cached_status(),
            Self::V1(_) => OnChainProposalStatus::NotDefined,
        }
    }
    pub fn last_passed_timestamp(&self) -> u64 {
        match self {
            Self::V2(tx) => tx.last_passed_timestamp,
            Self::V1(_) => 0,
        }
    }
    pub fn instructions(&self) -> Vec<ProposalInstruction> {
        match self {
            Self::V2(tx) => tx.instructions.clone(),
            Self::V1(tx) => vec![ProposalInstruction {
                program_id: tx.program_id,
                accounts: tx.accounts.clone(),
                data: tx.data.clone(),
            }],
        }
    }
    pub fn approvals(&self) -> usize {
        self.signers().iter().filter(|v| **v == VOTE_APPROVE).count()
    }
    pub fn rejections(&self) -> usize {
        self.signers().iter().filter(|v| **v == VOTE_REJECT).count()
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionDetail {
    pub title: [u8; TITLE_LEN],
    pub description: [u8; DESCRIPTION_LEN],
    /// unix seconds, 0 means the proposal never expires
    pub expiration_date: u64,
}

impl AccountCodec for TransactionDetail {
    const DISCRIMINATOR: [u8; 8] = [250, 131, 110, 130, 252, 1, 87, 152];
    const NAME: &'static str = "TransactionDetail";
}

impl TransactionDetail {
    pub fn new(title: &str, description: &str, expiration_date: u64) -> Result<Self, ValidationError> {
        Ok(Self {
            title: pack_str("title", title)?,
            description: pack_str("description", description)?,
            expiration_date,
        })
    }
    pub fn title(&self) -> String {
        unpack_str(&self.title)
    }
    pub fn description(&self) -> String {
        unpack_str(&self.description)
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettingsV2 {
    pub version: u8,
    pub bump: u8,
    pub authority: Pubkey,
    pub ops_account: Pubkey,
    pub create_multisig_account_fee: u64,
    pub create_transaction_account_fee: u64,
    pub approve_transaction_fee: u64,
    pub reject_transaction_fee: u64,
    pub execute_transaction_fee: u64,
    pub cancel_transaction_fee: u64,
}

impl AccountCodec for SettingsV2 {
    const DISCRIMINATOR: [u8; 8] = [223, 179, 163, 190, 177, 224, 67, 173];
    const NAME: &'static str = "Settings";
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettingsV1 {
    pub version: u8,
    pub bump: u8,
    pub authority: Pubkey,
    pub ops_account: Pubkey,
    pub create_multisig_account_fee: u64,
    pub create_transaction_account_fee: u64,
}

impl AccountCodec for SettingsV1 {
    const DISCRIMINATOR: [u8; 8] = SettingsV2::DISCRIMINATOR;
    const NAME: &'static str = "Settings";
}

/// per action fees charged by the program, in lamports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeeSchedule {
    pub create_multisig: u64,
    pub create_transaction: u64,
    pub approve_transaction: u64,
    pub reject_transaction: u64,
    pub execute_transaction: u64,
    pub cancel_transaction: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsAccount {
    V2(SettingsV2),
    V1(SettingsV1),
}

impl SettingsAccount {
    /// v1 settings are a strict prefix of v2, so only a payload with all six fees is read as v2
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        const V2_PAYLOAD: usize = 1 + 1 + 32 + 32 + 8 * 6;
        if data.len() >= 8 + V2_PAYLOAD {
            if let Ok(settings) = SettingsV2::decode(data) {
                if settings.version >= 2 {
                    return Ok(Self::V2(settings));
                }
            }
        }
        SettingsV1::decode(data).map(Self::V1)
    }
    pub fn authority(&self) -> Pubkey {
        match self {
            Self::V2(s) => s.authority,
            Self::V1(s) => s.authority,
        }
    }
    pub fn ops_account(&self) -> Pubkey {
        match self {
            Self::V2(s) => s.ops_account,
            Self::V1(s) => s.ops_account,
        }
    }
    pub fn fees(&self) -> FeeSchedule {
        match self {
            Self::V2(s) => FeeSchedule {
                create_multisig: s.create_multisig_account_fee,
                create_transaction: s.create_transaction_account_fee,
                approve_transaction: s.approve_transaction_fee,
                reject_transaction: s.reject_transaction_fee,
                execute_transaction: s.execute_transaction_fee,
                cancel_transaction: s.cancel_transaction_fee,
            },
            Self::V1(s) => FeeSchedule {
                create_multisig: s.create_multisig_account_fee,
                create_transaction: s.create_transaction_account_fee,
                ..Default::default()
            },
        }
    }
}
