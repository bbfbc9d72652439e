//! error types shared by the codec, the transition model and the client
use solana_sdk::pubkey::Pubkey;

pub type Result<T, E = MultisigError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("data too short for {account}: expected at least {expected} bytes, found {actual}")]
    TooShort {
        account: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("discriminator mismatch for {account}: found {found:?}")]
    Discriminator {
        account: &'static str,
        found: [u8; 8],
    },
    #[error("failed to decode {account} layout: {source}")]
    Layout {
        account: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{account} layout decoded but fields are out of range")]
    Implausible { account: &'static str },
    #[error("failed to encode {account}: {source}")]
    Encode {
        account: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// parameter problems detectable before anything is submitted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a multisig needs at least one owner")]
    NoOwners,
    #[error("too many owners: {count} (max {max})")]
    TooManyOwners { max: usize, count: usize },
    #[error("threshold {threshold} must be between 1 and the owner count {owners}")]
    InvalidThreshold { threshold: u64, owners: usize },
    #[error("owner {0} is listed more than once")]
    DuplicateOwner(Pubkey),
    #[error("the default address cannot be an owner")]
    DefaultOwner,
    #[error("{field} is {len} bytes, max is {max}")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },
    #[error("owner {0} already voted on this proposal")]
    AlreadyVoted(Pubkey),
    #[error("expiration {expiration} is before the earliest executable time {earliest}")]
    ExpirationBeforeCoolOff { expiration: u64, earliest: u64 },
    #[error("nonce {found} does not match the authority bump {expected}")]
    InvalidNonce { expected: u8, found: u8 },
    #[error("a proposal needs at least one instruction")]
    EmptyProposal,
    #[error("{0} uses a legacy layout which is read-only")]
    LegacyAccount(&'static str),
    #[error("encoded proposal is {size} bytes, the account holds {max}")]
    ProposalTooLarge { size: usize, max: usize },
}

impl ValidationError {
    /// the code the multisig program raises for the same condition
    pub fn program_code(&self) -> ProgramErrorCode {
        match self {
            Self::NoOwners | Self::TooManyOwners { .. } => ProgramErrorCode::InvalidOwnersLen,
            Self::InvalidThreshold { .. } => ProgramErrorCode::InvalidThreshold,
            Self::DuplicateOwner(_) => ProgramErrorCode::UniqueOwners,
            Self::DefaultOwner => ProgramErrorCode::InvalidOwner,
            Self::FieldTooLong { field, .. } if *field == "owner name" => {
                ProgramErrorCode::OwnerNameTooLong
            }
            Self::AlreadyVoted(_) => ProgramErrorCode::TransactionAlreadySigned,
            Self::ExpirationBeforeCoolOff { .. } => ProgramErrorCode::ExpirationDateTooShort,
            Self::InvalidNonce { .. } => ProgramErrorCode::InvalidMultisigNonce,
            _ => ProgramErrorCode::InvalidMultisig,
        }
    }
}

/// custom error codes raised by the multisig program, plus the few framework
/// account-constraint codes it surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProgramErrorCode {
    #[error("The given owner is not part of this multisig.")]
    InvalidOwner,
    #[error("Owners length must be non zero.")]
    InvalidOwnersLen,
    #[error("Not enough owners signed this transaction.")]
    NotEnoughSigners,
    #[error("Cannot delete a transaction that has been signed by an owner.")]
    TransactionAlreadySigned,
    #[error("Operation overflow")]
    Overflow,
    #[error("Cannot delete a transaction the owner did not create.")]
    UnableToDelete,
    #[error("The given transaction has already been executed.")]
    AlreadyExecuted,
    #[error("Transaction proposal has expired.")]
    AlreadyExpired,
    #[error("Threshold must be less than or equal to the number of owners.")]
    InvalidThreshold,
    #[error("Owners must be unique.")]
    UniqueOwners,
    #[error("Owner name must have less than 32 bytes.")]
    OwnerNameTooLong,
    #[error("Multisig nonce is not valid.")]
    InvalidMultisigNonce,
    #[error("Multisig version is not valid.")]
    InvalidMultisigVersion,
    #[error("Multisig owner set secuency number is not valid.")]
    InvalidOwnerSetSeqNumber,
    #[error("Multisig account is not valid.")]
    InvalidMultisig,
    #[error("Number of additonal accounts passed is less than required.")]
    RequiredAdditionalAccountsNotSent,
    #[error("Cool off period has not reached yet.")]
    CoolOffPeriodNotReached,
    #[error("Expiry date comes before cool off period.")]
    ExpirationDateTooShort,
    // only raised by deployments predating the cool-off upgrade
    #[error("Invalid settings authority.")]
    InvalidSettingsAuthority,
    #[error("Not enough replacement accounts.")]
    NotEnoughReplacementAccounts,
    #[error("Fee amount exceeds the maximum allowed.")]
    FeeExceedsMaximumAllowed,
    #[error("A has one constraint was violated")]
    ConstraintHasOne,
    #[error("A signer constraint was violated")]
    ConstraintSigner,
    #[error("A seeds constraint was violated")]
    ConstraintSeeds,
    #[error("The program expected this account to be already initialized")]
    AccountNotInitialized,
}

const CURRENT_CODES: [ProgramErrorCode; 18] = [
    ProgramErrorCode::InvalidOwner,
    ProgramErrorCode::InvalidOwnersLen,
    ProgramErrorCode::NotEnoughSigners,
    ProgramErrorCode::TransactionAlreadySigned,
    ProgramErrorCode::Overflow,
    ProgramErrorCode::UnableToDelete,
    ProgramErrorCode::AlreadyExecuted,
    ProgramErrorCode::AlreadyExpired,
    ProgramErrorCode::InvalidThreshold,
    ProgramErrorCode::UniqueOwners,
    ProgramErrorCode::OwnerNameTooLong,
    ProgramErrorCode::InvalidMultisigNonce,
    ProgramErrorCode::InvalidMultisigVersion,
    ProgramErrorCode::InvalidOwnerSetSeqNumber,
    ProgramErrorCode::InvalidMultisig,
    ProgramErrorCode::RequiredAdditionalAccountsNotSent,
    ProgramErrorCode::CoolOffPeriodNotReached,
    ProgramErrorCode::ExpirationDateTooShort,
];

const CUSTOM_ERROR_OFFSET: u32 = 6000;

impl ProgramErrorCode {
    /// numeric code as reported in `InstructionError::Custom`
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidSettingsAuthority => 6015,
            Self::NotEnoughReplacementAccounts => 6016,
            Self::FeeExceedsMaximumAllowed => 6017,
            Self::ConstraintHasOne => 2001,
            Self::ConstraintSigner => 2002,
            Self::ConstraintSeeds => 2006,
            Self::AccountNotInitialized => 3012,
            current => CURRENT_CODES
                .iter()
                .position(|c| c == current)
                .map(|idx| CUSTOM_ERROR_OFFSET + idx as u32)
                .unwrap_or_default(),
        }
    }
    /// resolves a code against the current program error table
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            2001 => Some(Self::ConstraintHasOne),
            2002 => Some(Self::ConstraintSigner),
            2006 => Some(Self::ConstraintSeeds),
            3012 => Some(Self::AccountNotInitialized),
            _ => CURRENT_CODES
                .get(code.checked_sub(CUSTOM_ERROR_OFFSET)? as usize)
                .copied(),
        }
    }
    /// resolves a code against the table of deployments without cool-off support,
    /// which reuse 6015..=6017 for different conditions
    pub fn from_legacy_code(code: u32) -> Option<Self> {
        match code {
            6015 => Some(Self::InvalidSettingsAuthority),
            6016 => Some(Self::NotEnoughReplacementAccounts),
            6017 => Some(Self::FeeExceedsMaximumAllowed),
            _ => Self::from_code(code),
        }
    }
}

/// caller facing error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum MultisigError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("stale owner set: {0}")]
    StaleState(String),
    #[error("quorum error: {0}")]
    Quorum(String),
    #[error("proposal expired: {0}")]
    ExpiredProposal(String),
    #[error("cool off period pending: {0}")]
    CoolOffNotReached(String),
    #[error("proposal already terminal: {0}")]
    AlreadyTerminal(String),
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("arithmetic overflow: {0}")]
    Overflow(String),
    #[error("program rejected the transaction with unknown code {0}")]
    UnknownProgramCode(u32),
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("signing failed: {0}")]
    Signing(#[from] solana_sdk::signer::SignerError),
    #[error("rpc failure: {0:#}")]
    Rpc(#[from] anyhow::Error),
}

impl From<ProgramErrorCode> for MultisigError {
    fn from(value: ProgramErrorCode) -> Self {
        let msg = value.to_string();
        match value {
            ProgramErrorCode::InvalidOwner
            | ProgramErrorCode::TransactionAlreadySigned
            | ProgramErrorCode::UnableToDelete
            | ProgramErrorCode::InvalidSettingsAuthority
            | ProgramErrorCode::ConstraintHasOne
            | ProgramErrorCode::ConstraintSigner
            | ProgramErrorCode::ConstraintSeeds => Self::Authorization(msg),
            ProgramErrorCode::NotEnoughSigners => Self::Quorum(msg),
            ProgramErrorCode::Overflow | ProgramErrorCode::FeeExceedsMaximumAllowed => {
                Self::Overflow(msg)
            }
            ProgramErrorCode::AlreadyExecuted => Self::AlreadyTerminal(msg),
            ProgramErrorCode::AlreadyExpired => Self::ExpiredProposal(msg),
            ProgramErrorCode::InvalidOwnerSetSeqNumber => Self::StaleState(msg),
            ProgramErrorCode::CoolOffPeriodNotReached => Self::CoolOffNotReached(msg),
            ProgramErrorCode::AccountNotInitialized => Self::NotFound(msg),
            ProgramErrorCode::InvalidOwnersLen
            | ProgramErrorCode::InvalidThreshold
            | ProgramErrorCode::UniqueOwners
            | ProgramErrorCode::OwnerNameTooLong
            | ProgramErrorCode::InvalidMultisigNonce
            | ProgramErrorCode::InvalidMultisigVersion
            | ProgramErrorCode::InvalidMultisig
            | ProgramErrorCode::RequiredAdditionalAccountsNotSent
            | ProgramErrorCode::NotEnoughReplacementAccounts
            | ProgramErrorCode::ExpirationDateTooShort => Self::Rejected(msg),
        }
    }
}

impl MultisigError {
    /// maps a custom program code into the taxonomy, unknown codes are kept verbatim
    pub fn from_program_code(code: u32) -> Self {
        match ProgramErrorCode::from_code(code) {
            Some(known) => known.into(),
            None => Self::UnknownProgramCode(code),
        }
    }

    /// same as [`Self::from_program_code`] for deployments without cool-off support
    pub fn from_legacy_program_code(code: u32) -> Self {
        match ProgramErrorCode::from_legacy_code(code) {
            Some(known) => known.into(),
            None => Self::UnknownProgramCode(code),
        }
    }
}
