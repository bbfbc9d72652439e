//! layouts and address derivation for the multisig program
pub mod accounts;
pub mod instructions;
pub mod pda;

use solana_sdk::pubkey::Pubkey;

/// capacity of the fixed owner array in the current multisig layout
pub const MAX_OWNERS: usize = 10;
pub const OWNER_NAME_LEN: usize = 32;
pub const LABEL_LEN: usize = 32;
pub const TITLE_LEN: usize = 64;
pub const DESCRIPTION_LEN: usize = 512;

/// bytes allocated for a proposal account, the serialized record is smaller
pub const PROPOSAL_ACCOUNT_SIZE: usize = 1200;
pub const MULTISIG_ACCOUNT_SIZE: usize =
    8 + MAX_OWNERS * (32 + OWNER_NAME_LEN) + 1 + 1 + LABEL_LEN + 4 + 8 * 4;
pub const TRANSACTION_DETAIL_ACCOUNT_SIZE: usize = 8 + TITLE_LEN + DESCRIPTION_LEN + 8;
pub const SETTINGS_ACCOUNT_SIZE: usize = 8 + 1 + 1 + 32 + 32 + 8 * 6;

/// default proposal lifetime used by the cli, one week
pub const DEFAULT_EXPIRATION_TIME_SECONDS: u64 = 604_800;

/// account slot that is filled with a freshly generated key at execution time
pub const REPLACEMENT_PLACEHOLDER: Pubkey = Pubkey::new_from_array([255u8; 32]);

/// vote byte values stored in a proposal's signer vector
pub const VOTE_NONE: u8 = 0;
pub const VOTE_APPROVE: u8 = 1;
pub const VOTE_REJECT: u8 = 2;
