//! decoding of system program instructions (4 byte little endian tag, bincode layout)
use {
    super::{arg, labeled_accounts, DecodedInstruction, InstructionDecoder},
    crate::error::CodecError,
    solana_sdk::{pubkey::Pubkey, system_instruction::SystemInstruction, system_program},
};

pub fn decode_system_instruction(data: &[u8]) -> Result<SystemInstruction, CodecError> {
    bincode::deserialize(data).map_err(|err| CodecError::Layout {
        account: "system instruction",
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
    })
}

pub struct SystemDecoder;

impl InstructionDecoder for SystemDecoder {
    fn program_name(&self) -> &'static str {
        "System Program"
    }

    fn decode(&self, accounts: &[Pubkey], data: &[u8]) -> Option<DecodedInstruction> {
        let ix = match decode_system_instruction(data) {
            Ok(ix) => ix,
            Err(err) => {
                log::debug!("unrecognized system instruction {err}");
                return None;
            }
        };
        let (name, labels, args): (&str, &[&str], _) = match ix {
            SystemInstruction::CreateAccount {
                lamports,
                space,
                owner,
            } => (
                "createAccount",
                &["source", "newAccount"],
                vec![
                    arg("lamports", lamports),
                    arg("space", space),
                    arg("owner", owner),
                ],
            ),
            SystemInstruction::Assign { owner } => ("assign", &["account"], vec![arg("owner", owner)]),
            SystemInstruction::Transfer { lamports } => (
                "transfer",
                &["source", "destination"],
                vec![arg("lamports", lamports)],
            ),
            SystemInstruction::CreateAccountWithSeed {
                base,
                seed,
                lamports,
                space,
                owner,
            } => (
                "createAccountWithSeed",
                &["source", "newAccount", "base"],
                vec![
                    arg("base", base),
                    arg("seed", seed),
                    arg("lamports", lamports),
                    arg("space", space),
                    arg("owner", owner),
                ],
            ),
            SystemInstruction::AdvanceNonceAccount => (
                "advanceNonce",
                &["nonceAccount", "recentBlockhashesSysvar", "nonceAuthority"],
                vec![],
            ),
            SystemInstruction::WithdrawNonceAccount(lamports) => (
                "withdrawNonceAccount",
                &[
                    "nonceAccount",
                    "destination",
                    "recentBlockhashesSysvar",
                    "rentSysvar",
                    "nonceAuthority",
                ],
                vec![arg("lamports", lamports)],
            ),
            SystemInstruction::InitializeNonceAccount(authority) => (
                "initializeNonce",
                &["nonceAccount", "recentBlockhashesSysvar", "rentSysvar"],
                vec![arg("nonceAuthority", authority)],
            ),
            SystemInstruction::AuthorizeNonceAccount(authority) => (
                "authorizeNonce",
                &["nonceAccount", "nonceAuthority"],
                vec![arg("newAuthorized", authority)],
            ),
            SystemInstruction::Allocate { space } => ("allocate", &["account"], vec![arg("space", space)]),
            SystemInstruction::AllocateWithSeed {
                base,
                seed,
                space,
                owner,
            } => (
                "allocateWithSeed",
                &["account", "base"],
                vec![
                    arg("base", base),
                    arg("seed", seed),
                    arg("space", space),
                    arg("owner", owner),
                ],
            ),
            SystemInstruction::AssignWithSeed { base, seed, owner } => (
                "assignWithSeed",
                &["account", "base"],
                vec![arg("base", base), arg("seed", seed), arg("owner", owner)],
            ),
            SystemInstruction::TransferWithSeed {
                lamports,
                from_seed,
                from_owner,
            } => (
                "transferWithSeed",
                &["source", "sourceBase", "destination"],
                vec![
                    arg("lamports", lamports),
                    arg("sourceSeed", from_seed),
                    arg("sourceOwner", from_owner),
                ],
            ),
            SystemInstruction::UpgradeNonceAccount => ("upgradeNonce", &["nonceAccount"], vec![]),
        };
        Some(DecodedInstruction {
            program_id: system_program::id(),
            program_name: self.program_name().to_string(),
            name: name.to_string(),
            accounts: labeled_accounts(labels, accounts, "account"),
            args,
        })
    }
}
