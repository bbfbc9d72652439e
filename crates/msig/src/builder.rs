//! composes the transactions submitted for each multisig operation
//!
//! builders only assemble and co-sign with keys they generate themselves, the
//! fee payer and owners sign afterwards through a [`crate::wallet::WalletSigner`]
use {
    crate::{
        error::{MultisigError, ValidationError},
        programs::multisig::{
            accounts::ProposalInstruction,
            instructions::{CreateTransactionArgs, ProgramAccounts, UpdateSettingsArgs},
            pda::derive_authority,
            DESCRIPTION_LEN, PROPOSAL_ACCOUNT_SIZE, TITLE_LEN,
        },
        registry::MultisigParams,
        transitions::{apply_replacements, placeholder_count, Vote},
    },
    serde::{Deserialize, Serialize},
    solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        pubkey::Pubkey,
        signature::Keypair,
        signer::Signer,
        system_instruction,
        transaction::Transaction,
    },
};

/// user supplied content of a new proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalParams {
    pub title: String,
    pub description: String,
    /// unix seconds, 0 for no expiry
    pub expiration_date: u64,
    pub operation: u8,
    #[serde(skip)]
    pub instructions: Vec<Instruction>,
}

impl ProposalParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.instructions.is_empty() {
            return Err(ValidationError::EmptyProposal);
        }
        if self.title.len() > TITLE_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "title",
                max: TITLE_LEN,
                len: self.title.len(),
            });
        }
        if self.description.len() > DESCRIPTION_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "description",
                max: DESCRIPTION_LEN,
                len: self.description.len(),
            });
        }
        Ok(())
    }

    pub fn args(&self) -> CreateTransactionArgs {
        CreateTransactionArgs {
            instructions: self.instructions.iter().map(From::from).collect(),
            operation: self.operation,
            title: self.title.clone(),
            description: self.description.clone(),
            expiration_date: self.expiration_date,
        }
    }
}

fn unsigned(instructions: &[Instruction], payer: &Pubkey, blockhash: Hash) -> Transaction {
    let mut tx = Transaction::new_with_payer(instructions, Some(payer));
    tx.message.recent_blockhash = blockhash;
    tx
}

fn partially_signed(
    instructions: &[Instruction],
    payer: &Pubkey,
    signers: &[&Keypair],
    blockhash: Hash,
) -> Result<Transaction, MultisigError> {
    let mut tx = Transaction::new_with_payer(instructions, Some(payer));
    tx.try_partial_sign(signers, blockhash)?;
    Ok(tx)
}

/// creates a multisig under a freshly generated address, optionally funding its vault
///
/// # Returns
///
/// the transaction co-signed by the new multisig key, and the multisig address
pub fn create_multisig(
    accounts: &ProgramAccounts,
    payer: &Pubkey,
    params: &MultisigParams,
    funding_lamports: Option<u64>,
    blockhash: Hash,
) -> Result<(Transaction, Pubkey), MultisigError> {
    let multisig = Keypair::new();
    let (authority, nonce) = derive_authority(&accounts.program_id, &multisig.pubkey());
    let mut instructions = vec![accounts.create_multisig(
        payer,
        &multisig.pubkey(),
        params.create_args(nonce),
    )?];
    if let Some(lamports) = funding_lamports.filter(|l| *l > 0) {
        instructions.push(system_instruction::transfer(payer, &authority, lamports));
    }
    let tx = partially_signed(&instructions, payer, &[&multisig], blockhash)?;
    Ok((tx, multisig.pubkey()))
}

/// allocates the proposal account and records the proposal, the proposer auto-approves
///
/// # Parameters
///
/// `pre_instructions`: prepended as is, e.g. to create accounts the payload needs
/// `rent_lamports`: rent exemption for a proposal account
pub fn create_transaction(
    accounts: &ProgramAccounts,
    proposer: &Pubkey,
    multisig: &Pubkey,
    params: &ProposalParams,
    pre_instructions: &[Instruction],
    rent_lamports: u64,
    blockhash: Hash,
) -> Result<(Transaction, Pubkey), MultisigError> {
    let proposal = Keypair::new();
    let mut instructions = pre_instructions.to_vec();
    instructions.push(system_instruction::create_account(
        proposer,
        &proposal.pubkey(),
        rent_lamports,
        PROPOSAL_ACCOUNT_SIZE as u64,
        &accounts.program_id,
    ));
    instructions.push(accounts.create_transaction(
        multisig,
        &proposal.pubkey(),
        proposer,
        params.args(),
    )?);
    let tx = partially_signed(&instructions, proposer, &[&proposal], blockhash)?;
    Ok((tx, proposal.pubkey()))
}

pub fn vote(
    accounts: &ProgramAccounts,
    owner: &Pubkey,
    multisig: &Pubkey,
    proposal: &Pubkey,
    vote: Vote,
    blockhash: Hash,
) -> Result<Transaction, MultisigError> {
    let ix = accounts.vote(multisig, proposal, owner, vote == Vote::Approve)?;
    Ok(unsigned(&[ix], owner, blockhash))
}

pub fn cancel_transaction(
    accounts: &ProgramAccounts,
    proposer: &Pubkey,
    multisig: &Pubkey,
    proposal: &Pubkey,
    blockhash: Hash,
) -> Result<Transaction, MultisigError> {
    let ix = accounts.cancel_transaction(multisig, proposal, proposer)?;
    Ok(unsigned(&[ix], proposer, blockhash))
}

/// every payload account followed by the payload program, the vault never signs the outer transaction
pub fn remaining_accounts(instructions: &[ProposalInstruction], authority: &Pubkey) -> Vec<AccountMeta> {
    instructions
        .iter()
        .flat_map(|ix| {
            ix.accounts
                .iter()
                .map(|meta| AccountMeta {
                    pubkey: meta.pubkey,
                    is_signer: meta.is_signer && meta.pubkey != *authority,
                    is_writable: meta.is_writable,
                })
                .chain(std::iter::once(AccountMeta::new_readonly(ix.program_id, false)))
        })
        .collect()
}

pub fn execute_transaction(
    accounts: &ProgramAccounts,
    payer: &Pubkey,
    multisig: &Pubkey,
    proposal: &Pubkey,
    instructions: &[ProposalInstruction],
    blockhash: Hash,
) -> Result<Transaction, MultisigError> {
    let (authority, _) = derive_authority(&accounts.program_id, multisig);
    let ix = accounts.execute_transaction(
        multisig,
        &authority,
        proposal,
        payer,
        remaining_accounts(instructions, &authority),
    )?;
    Ok(unsigned(&[ix], payer, blockhash))
}

/// generates a key for every placeholder slot, the generated keys co-sign
///
/// # Returns
///
/// the partially signed transaction and the generated keys in slot order
pub fn execute_transaction_with_replacements(
    accounts: &ProgramAccounts,
    payer: &Pubkey,
    multisig: &Pubkey,
    proposal: &Pubkey,
    instructions: &[ProposalInstruction],
    blockhash: Hash,
) -> Result<(Transaction, Vec<Pubkey>), MultisigError> {
    let (authority, _) = derive_authority(&accounts.program_id, multisig);
    let keypairs = (0..placeholder_count(instructions))
        .map(|_| Keypair::new())
        .collect::<Vec<_>>();
    let replacements = keypairs.iter().map(|kp| kp.pubkey()).collect::<Vec<_>>();
    let mut replaced = instructions.to_vec();
    apply_replacements(&mut replaced, &replacements)?;
    let ix = accounts.execute_transaction_with_replacements(
        multisig,
        &authority,
        proposal,
        payer,
        replacements.clone(),
        remaining_accounts(&replaced, &authority),
    )?;
    let signers = keypairs.iter().collect::<Vec<_>>();
    let tx = partially_signed(&[ix], payer, &signers, blockhash)?;
    Ok((tx, replacements))
}

/// an owner set change, which only the vault can sign and so must be proposed
pub fn edit_multisig_instruction(
    accounts: &ProgramAccounts,
    multisig: &Pubkey,
    params: &MultisigParams,
) -> Result<Instruction, MultisigError> {
    let (authority, _) = derive_authority(&accounts.program_id, multisig);
    Ok(accounts.edit_multisig(multisig, &authority, params.edit_args())?)
}

pub fn update_settings(
    accounts: &ProgramAccounts,
    authority: &Pubkey,
    args: UpdateSettingsArgs,
    blockhash: Hash,
) -> Result<Transaction, MultisigError> {
    let ix = accounts.update_settings(authority, args)?;
    Ok(unsigned(&[ix], authority, blockhash))
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::programs::multisig::{
            instructions::{MultisigInstruction, Owner},
            REPLACEMENT_PLACEHOLDER,
        },
    };

    fn accounts() -> ProgramAccounts {
        ProgramAccounts::new(Pubkey::new_unique(), Pubkey::new_unique())
    }

    #[test]
    fn test_create_multisig_cosigned() {
        let accounts = accounts();
        let payer = Pubkey::new_unique();
        let params = MultisigParams {
            label: "team".to_string(),
            threshold: 1,
            owners: vec![Owner {
                address: payer,
                name: "me".to_string(),
            }],
            cool_off_period_in_seconds: 0,
        };
        let blockhash = Hash::new_unique();
        let (tx, multisig) =
            create_multisig(&accounts, &payer, &params, Some(1_000), blockhash).unwrap();
        assert_eq!(tx.message.recent_blockhash, blockhash);
        assert_eq!(tx.message.instructions.len(), 2);
        assert_eq!(tx.message.account_keys[0], payer);
        // payer slot is still unsigned, multisig key signed
        let multisig_idx = tx
            .message
            .account_keys
            .iter()
            .position(|k| *k == multisig)
            .unwrap();
        assert_eq!(tx.signatures[0], Default::default());
        assert_ne!(tx.signatures[multisig_idx], Default::default());

        let data = &tx.message.instructions[0].data;
        match MultisigInstruction::decode(data).unwrap() {
            MultisigInstruction::CreateMultisig(args) => {
                assert_eq!(args.nonce, derive_authority(&accounts.program_id, &multisig).1)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_remaining_accounts_vault_not_signer() {
        let authority = Pubkey::new_unique();
        let other_signer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&authority, &other_signer, 5);
        let mut with_cosigner = ProposalInstruction::from(&ix);
        with_cosigner.accounts[1].is_signer = true;
        let metas = remaining_accounts(&[with_cosigner], &authority);
        assert_eq!(metas.len(), 3);
        assert_eq!(metas[0].pubkey, authority);
        assert!(!metas[0].is_signer);
        assert!(metas[0].is_writable);
        assert!(metas[1].is_signer);
        assert_eq!(metas[2].pubkey, ix.program_id);
        assert!(!metas[2].is_writable);
    }

    #[test]
    fn test_replacements_cosign() {
        let accounts = accounts();
        let payer = Pubkey::new_unique();
        let multisig = Pubkey::new_unique();
        let mut ix = ProposalInstruction::from(&system_instruction::create_account(
            &payer,
            &REPLACEMENT_PLACEHOLDER,
            1,
            0,
            &Pubkey::new_unique(),
        ));
        ix.accounts[0].pubkey = derive_authority(&accounts.program_id, &multisig).0;
        let (tx, fresh) = execute_transaction_with_replacements(
            &accounts,
            &payer,
            &multisig,
            &Pubkey::new_unique(),
            &[ix],
            Hash::new_unique(),
        )
        .unwrap();
        assert_eq!(fresh.len(), 1);
        assert!(!tx.message.account_keys.contains(&REPLACEMENT_PLACEHOLDER));
        let idx = tx
            .message
            .account_keys
            .iter()
            .position(|k| *k == fresh[0])
            .unwrap();
        assert!(tx.message.is_signer(idx));
        assert_ne!(tx.signatures[idx], Default::default());
    }

    #[test]
    fn test_proposal_params_validation() {
        let mut params = ProposalParams {
            title: "t".to_string(),
            description: "d".repeat(DESCRIPTION_LEN + 1),
            expiration_date: 0,
            operation: 0,
            instructions: vec![],
        };
        assert_eq!(params.validate(), Err(ValidationError::EmptyProposal));
        params.instructions =
            vec![system_instruction::transfer(&Pubkey::new_unique(), &Pubkey::new_unique(), 1)];
        assert!(matches!(
            params.validate(),
            Err(ValidationError::FieldTooLong { field: "description", .. })
        ));
    }
}
