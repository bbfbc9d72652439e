use solana_program::{bpf_loader_upgradeable, pubkey::Pubkey};

pub const SETTINGS_SEED: &[u8] = b"settings";

/// the vault authority which signs payload instructions on behalf of the multisig
pub fn derive_authority(program_id: &Pubkey, multisig: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[multisig.as_ref()], program_id)
}

pub fn derive_transaction_detail(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[multisig.as_ref(), transaction.as_ref()], program_id)
}

pub fn derive_settings(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SETTINGS_SEED], program_id)
}

/// returns the programdata account of an upgradeable program, required by settings updates
pub fn get_program_data_account(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[&program_id.to_bytes()], &bpf_loader_upgradeable::id()).0
}
