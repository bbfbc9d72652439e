//! state transitions applied by the multisig program for each instruction
//!
//! the client runs these on freshly fetched state to reject doomed submissions early,
//! and the in-memory ledger used in tests hosts them as its program
use {
    crate::{
        error::ProgramErrorCode,
        programs::multisig::{
            accounts::{
                pack_str, MultisigV2, ProposalInstruction, SettingsV2, TransactionDetail,
                TransactionV2,
            },
            instructions::{
                CreateMultisigArgs, CreateTransactionArgs, EditMultisigArgs, Owner,
                UpdateSettingsArgs,
            },
            pda::derive_authority,
            REPLACEMENT_PLACEHOLDER, VOTE_APPROVE, VOTE_NONE, VOTE_REJECT,
        },
        registry::{owner_slots, validate_owners},
        status::{proposal_status, OnChainProposalStatus, ProposalStatus, QuorumPolicy, VoteState},
    },
    solana_sdk::{instruction::Instruction, pubkey::Pubkey},
    std::collections::HashSet,
};

pub type TransitionResult<T> = Result<T, ProgramErrorCode>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vote {
    Approve,
    Reject,
}

impl Vote {
    fn byte(self) -> u8 {
        match self {
            Self::Approve => VOTE_APPROVE,
            Self::Reject => VOTE_REJECT,
        }
    }
}

fn write_owner_set(
    multisig: &mut MultisigV2,
    owners: &[Owner],
    threshold: u64,
    label: &str,
    cool_off_period_in_seconds: u64,
) -> TransitionResult<()> {
    validate_owners(owners, threshold).map_err(|err| err.program_code())?;
    multisig.owners = owner_slots(owners).map_err(|err| err.program_code())?;
    multisig.label = pack_str("label", label).map_err(|_| ProgramErrorCode::InvalidMultisig)?;
    multisig.threshold = threshold;
    multisig.cool_off_period_in_seconds = cool_off_period_in_seconds;
    Ok(())
}

pub fn create_multisig(
    program_id: &Pubkey,
    multisig_key: &Pubkey,
    args: &CreateMultisigArgs,
    now: u64,
) -> TransitionResult<MultisigV2> {
    let (_, bump) = derive_authority(program_id, multisig_key);
    if args.nonce != bump {
        return Err(ProgramErrorCode::InvalidMultisigNonce);
    }
    let mut multisig = MultisigV2 {
        version: 2,
        nonce: args.nonce,
        owner_set_seqno: 0,
        pending_txs: 0,
        created_on: now,
        ..Default::default()
    };
    write_owner_set(
        &mut multisig,
        &args.owners,
        args.threshold,
        &args.label,
        args.cool_off_period_in_seconds,
    )?;
    Ok(multisig)
}

/// replaces the owner set and policy, voiding every proposal created before
pub fn edit_multisig(multisig: &mut MultisigV2, args: &EditMultisigArgs) -> TransitionResult<()> {
    write_owner_set(
        multisig,
        &args.owners,
        args.threshold,
        &args.label,
        args.cool_off_period_in_seconds,
    )?;
    multisig.owner_set_seqno = multisig
        .owner_set_seqno
        .checked_add(1)
        .ok_or(ProgramErrorCode::Overflow)?;
    Ok(())
}

/// refreshes the cached status byte, anchoring `last_passed_timestamp` the first time quorum is met
pub fn refresh_cached_status(
    multisig: &MultisigV2,
    proposal: &mut TransactionV2,
    detail: Option<&TransactionDetail>,
    now: u64,
) -> ProposalStatus {
    let status = proposal_status(
        &QuorumPolicy::from(&*multisig),
        &VoteState::from(&*proposal),
        detail,
        now,
    );
    let cached = match status {
        ProposalStatus::Active => Some(OnChainProposalStatus::Active),
        ProposalStatus::Passed | ProposalStatus::Queued => {
            if proposal.last_passed_timestamp == 0 {
                proposal.last_passed_timestamp = now;
            }
            Some(OnChainProposalStatus::Passed)
        }
        ProposalStatus::Executed => Some(OnChainProposalStatus::Executed),
        ProposalStatus::Failed => Some(OnChainProposalStatus::Failed),
        ProposalStatus::Voided | ProposalStatus::Expired | ProposalStatus::Unknown => None,
    };
    if let Some(cached) = cached {
        proposal.last_known_proposal_status = cached as u8;
    }
    status
}

pub fn create_transaction(
    multisig: &mut MultisigV2,
    multisig_key: &Pubkey,
    proposer: &Pubkey,
    args: &CreateTransactionArgs,
    now: u64,
) -> TransitionResult<(TransactionV2, TransactionDetail)> {
    let proposer_idx = multisig
        .owner_index(proposer)
        .ok_or(ProgramErrorCode::InvalidOwner)?;
    let cool_off = multisig.cool_off_period_in_seconds;
    if args.expiration_date > 0 && args.expiration_date < now.saturating_add(cool_off) {
        return Err(ProgramErrorCode::ExpirationDateTooShort);
    }
    if args.instructions.is_empty() {
        return Err(ProgramErrorCode::RequiredAdditionalAccountsNotSent);
    }
    let detail = TransactionDetail::new(&args.title, &args.description, args.expiration_date)
        .map_err(|_| ProgramErrorCode::InvalidMultisig)?;
    let mut signers = vec![VOTE_NONE; multisig.live_owner_count()];
    signers[proposer_idx] = VOTE_APPROVE;
    let mut proposal = TransactionV2 {
        multisig: *multisig_key,
        instructions: args.instructions.clone(),
        signers,
        owner_set_seqno: multisig.owner_set_seqno,
        created_on: now,
        executed_on: 0,
        operation: args.operation,
        keypairs: vec![],
        proposer: *proposer,
        last_known_proposal_status: OnChainProposalStatus::NotDefined as u8,
        last_passed_timestamp: 0,
    };
    refresh_cached_status(multisig, &mut proposal, Some(&detail), now);
    multisig.pending_txs = multisig
        .pending_txs
        .checked_add(1)
        .ok_or(ProgramErrorCode::Overflow)?;
    Ok((proposal, detail))
}

/// rejects votes and executions on proposals that can no longer change
fn ensure_open(status: ProposalStatus) -> TransitionResult<()> {
    match status {
        ProposalStatus::Executed => Err(ProgramErrorCode::AlreadyExecuted),
        ProposalStatus::Voided => Err(ProgramErrorCode::InvalidOwnerSetSeqNumber),
        ProposalStatus::Expired => Err(ProgramErrorCode::AlreadyExpired),
        ProposalStatus::Failed => Err(ProgramErrorCode::NotEnoughSigners),
        ProposalStatus::Unknown => Err(ProgramErrorCode::InvalidMultisig),
        _ => Ok(()),
    }
}

/// records a single vote, an owner may vote only once per proposal
pub fn vote(
    multisig: &MultisigV2,
    proposal: &mut TransactionV2,
    detail: &TransactionDetail,
    owner: &Pubkey,
    vote: Vote,
    now: u64,
) -> TransitionResult<ProposalStatus> {
    let owner_idx = multisig
        .owner_index(owner)
        .ok_or(ProgramErrorCode::InvalidOwner)?;
    let status = proposal_status(
        &QuorumPolicy::from(multisig),
        &VoteState::from(&*proposal),
        Some(detail),
        now,
    );
    ensure_open(status)?;
    // a queued proposal keeps its status across owner set changes, its signer slots do not
    if proposal.owner_set_seqno != multisig.owner_set_seqno {
        return Err(ProgramErrorCode::InvalidOwnerSetSeqNumber);
    }
    let slot = proposal
        .signers
        .get_mut(owner_idx)
        .ok_or(ProgramErrorCode::InvalidOwner)?;
    if *slot != VOTE_NONE {
        return Err(ProgramErrorCode::TransactionAlreadySigned);
    }
    *slot = vote.byte();
    Ok(refresh_cached_status(multisig, proposal, Some(detail), now))
}

/// only the proposer may cancel, and only while no other owner has voted
pub fn cancel_transaction(
    multisig: &mut MultisigV2,
    proposal: &TransactionV2,
    proposer: &Pubkey,
) -> TransitionResult<()> {
    if proposal.executed_on > 0 {
        return Err(ProgramErrorCode::AlreadyExecuted);
    }
    if proposal.proposer != *proposer {
        return Err(ProgramErrorCode::UnableToDelete);
    }
    let votes_cast = proposal.signers.iter().filter(|v| **v != VOTE_NONE).count();
    if votes_cast > 1 {
        return Err(ProgramErrorCode::TransactionAlreadySigned);
    }
    multisig.pending_txs = multisig
        .pending_txs
        .checked_sub(1)
        .ok_or(ProgramErrorCode::Overflow)?;
    Ok(())
}

/// marks the proposal executed and returns the instructions the vault replays
///
/// # Parameters
///
/// `remaining_accounts`: keys passed after the fixed execute accounts, they must
/// cover every payload account and program id
pub fn execute_transaction(
    multisig: &mut MultisigV2,
    proposal: &mut TransactionV2,
    detail: Option<&TransactionDetail>,
    remaining_accounts: &[Pubkey],
    now: u64,
) -> TransitionResult<Vec<Instruction>> {
    let status = proposal_status(
        &QuorumPolicy::from(&*multisig),
        &VoteState::from(&*proposal),
        detail,
        now,
    );
    ensure_open(status)?;
    match status {
        ProposalStatus::Queued => {}
        ProposalStatus::Passed if multisig.cool_off_period_in_seconds == 0 => {}
        ProposalStatus::Passed => return Err(ProgramErrorCode::CoolOffPeriodNotReached),
        _ => return Err(ProgramErrorCode::NotEnoughSigners),
    }
    let provided = remaining_accounts.iter().collect::<HashSet<_>>();
    let covered = proposal.instructions.iter().all(|ix| {
        provided.contains(&ix.program_id)
            && ix.accounts.iter().all(|meta| provided.contains(&meta.pubkey))
    });
    if !covered {
        return Err(ProgramErrorCode::RequiredAdditionalAccountsNotSent);
    }
    proposal.executed_on = now;
    proposal.last_known_proposal_status = OnChainProposalStatus::Executed as u8;
    multisig.pending_txs = multisig
        .pending_txs
        .checked_sub(1)
        .ok_or(ProgramErrorCode::Overflow)?;
    Ok(proposal.instructions.iter().map(Instruction::from).collect())
}

/// fills placeholder slots in order with `replacements`, replaced slots become signers
pub fn apply_replacements(
    instructions: &mut [ProposalInstruction],
    replacements: &[Pubkey],
) -> TransitionResult<()> {
    let mut replacements = replacements.iter();
    for meta in instructions
        .iter_mut()
        .flat_map(|ix| ix.accounts.iter_mut())
        .filter(|meta| meta.pubkey == REPLACEMENT_PLACEHOLDER)
    {
        meta.pubkey = *replacements
            .next()
            .ok_or(ProgramErrorCode::RequiredAdditionalAccountsNotSent)?;
        meta.is_signer = true;
    }
    Ok(())
}

pub fn placeholder_count(instructions: &[ProposalInstruction]) -> usize {
    instructions
        .iter()
        .flat_map(|ix| ix.accounts.iter())
        .filter(|meta| meta.pubkey == REPLACEMENT_PLACEHOLDER)
        .count()
}

pub fn update_settings(
    settings: &mut SettingsV2,
    authority: &Pubkey,
    args: &UpdateSettingsArgs,
) -> TransitionResult<()> {
    if settings.authority != *authority {
        return Err(ProgramErrorCode::ConstraintHasOne);
    }
    settings.ops_account = args.ops_account;
    settings.create_multisig_account_fee = args.create_multisig_account_fee;
    settings.create_transaction_account_fee = args.create_transaction_account_fee;
    settings.approve_transaction_fee = args.approve_transaction_fee;
    settings.reject_transaction_fee = args.reject_transaction_fee;
    settings.execute_transaction_fee = args.execute_transaction_fee;
    settings.cancel_transaction_fee = args.cancel_transaction_fee;
    Ok(())
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::programs::multisig::accounts::ProposalAccountMeta,
    };

    struct Fixture {
        program_id: Pubkey,
        key: Pubkey,
        owners: Vec<Pubkey>,
        multisig: MultisigV2,
    }

    fn fixture(owner_count: usize, threshold: u64, cool_off: u64) -> Fixture {
        let program_id = Pubkey::new_unique();
        let key = Pubkey::new_unique();
        let owners = (0..owner_count).map(|_| Pubkey::new_unique()).collect::<Vec<_>>();
        let args = CreateMultisigArgs {
            owners: owners
                .iter()
                .enumerate()
                .map(|(i, address)| Owner {
                    address: *address,
                    name: format!("o{i}"),
                })
                .collect(),
            threshold,
            nonce: derive_authority(&program_id, &key).1,
            label: "team".to_string(),
            cool_off_period_in_seconds: cool_off,
        };
        let multisig = create_multisig(&program_id, &key, &args, 100).unwrap();
        Fixture {
            program_id,
            key,
            owners,
            multisig,
        }
    }

    fn payload() -> Vec<ProposalInstruction> {
        vec![ProposalInstruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![ProposalAccountMeta {
                pubkey: Pubkey::new_unique(),
                is_signer: false,
                is_writable: true,
            }],
            data: vec![1],
        }]
    }

    fn tx_args(expiration_date: u64) -> CreateTransactionArgs {
        CreateTransactionArgs {
            instructions: payload(),
            operation: 1,
            title: "t".to_string(),
            description: "d".to_string(),
            expiration_date,
        }
    }

    fn keys(proposal: &TransactionV2) -> Vec<Pubkey> {
        proposal
            .instructions
            .iter()
            .flat_map(|ix| {
                ix.accounts
                    .iter()
                    .map(|m| m.pubkey)
                    .chain(std::iter::once(ix.program_id))
            })
            .collect()
    }

    #[test]
    fn test_create_multisig_checks() {
        let f = fixture(3, 2, 0);
        assert_eq!(f.multisig.owner_set_seqno, 0);
        assert_eq!(f.multisig.live_owner_count(), 3);
        assert_eq!(f.multisig.label(), "team");
        let args = CreateMultisigArgs {
            owners: vec![],
            threshold: 1,
            nonce: derive_authority(&f.program_id, &f.key).1,
            label: String::new(),
            cool_off_period_in_seconds: 0,
        };
        assert_eq!(
            create_multisig(&f.program_id, &f.key, &args, 0),
            Err(ProgramErrorCode::InvalidOwnersLen)
        );
        let bad_nonce = CreateMultisigArgs {
            nonce: args.nonce.wrapping_sub(1),
            ..args
        };
        assert_eq!(
            create_multisig(&f.program_id, &f.key, &bad_nonce, 0),
            Err(ProgramErrorCode::InvalidMultisigNonce)
        );
    }

    #[test]
    fn test_proposer_auto_approves() {
        let mut f = fixture(3, 2, 0);
        let (proposal, detail) =
            create_transaction(&mut f.multisig, &f.key, &f.owners[1], &tx_args(0), 200).unwrap();
        assert_eq!(proposal.signers, vec![0, 1, 0]);
        assert_eq!(proposal.cached_status(), OnChainProposalStatus::Active);
        assert_eq!(detail.title(), "t");
        assert_eq!(f.multisig.pending_txs, 1);
        assert_eq!(
            create_transaction(&mut f.multisig, &f.key, &Pubkey::new_unique(), &tx_args(0), 200),
            Err(ProgramErrorCode::InvalidOwner)
        );
    }

    #[test]
    fn test_single_owner_passes_on_creation() {
        let mut f = fixture(1, 1, 0);
        let (proposal, _) =
            create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(0), 200).unwrap();
        assert_eq!(proposal.cached_status(), OnChainProposalStatus::Passed);
        assert_eq!(proposal.last_passed_timestamp, 200);
    }

    #[test]
    fn test_expiration_before_cool_off() {
        let mut f = fixture(2, 1, 600);
        assert_eq!(
            create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(700), 200),
            Err(ProgramErrorCode::ExpirationDateTooShort)
        );
        assert!(create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(800), 200).is_ok());
    }

    #[test]
    fn test_double_vote_rejected() {
        let mut f = fixture(3, 3, 0);
        let (mut proposal, detail) =
            create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(0), 200).unwrap();
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &f.owners[0], Vote::Reject, 201),
            Err(ProgramErrorCode::TransactionAlreadySigned)
        );
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &f.owners[1], Vote::Approve, 201),
            Ok(ProposalStatus::Active)
        );
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &f.owners[1], Vote::Approve, 202),
            Err(ProgramErrorCode::TransactionAlreadySigned)
        );
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &Pubkey::new_unique(), Vote::Approve, 202),
            Err(ProgramErrorCode::InvalidOwner)
        );
    }

    #[test]
    fn test_edit_voids_pending() {
        let mut f = fixture(3, 2, 0);
        let (mut proposal, detail) =
            create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(0), 200).unwrap();
        let edit = EditMultisigArgs {
            owners: f
                .owners
                .iter()
                .map(|address| Owner {
                    address: *address,
                    name: String::new(),
                })
                .collect(),
            threshold: 3,
            label: "team".to_string(),
            cool_off_period_in_seconds: 0,
        };
        edit_multisig(&mut f.multisig, &edit).unwrap();
        assert_eq!(f.multisig.owner_set_seqno, 1);
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &f.owners[1], Vote::Approve, 201),
            Err(ProgramErrorCode::InvalidOwnerSetSeqNumber)
        );
        let remaining = keys(&proposal);
        assert_eq!(
            execute_transaction(&mut f.multisig, &mut proposal, Some(&detail), &remaining, 201),
            Err(ProgramErrorCode::InvalidOwnerSetSeqNumber)
        );
    }

    #[test]
    fn test_execute_gates() {
        let mut f = fixture(3, 2, 60);
        let (mut proposal, detail) =
            create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(0), 200).unwrap();
        let remaining = keys(&proposal);
        assert_eq!(
            execute_transaction(&mut f.multisig, &mut proposal, Some(&detail), &remaining, 201),
            Err(ProgramErrorCode::NotEnoughSigners)
        );
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &f.owners[1], Vote::Approve, 210),
            Ok(ProposalStatus::Passed)
        );
        assert_eq!(proposal.last_passed_timestamp, 210);
        assert_eq!(
            execute_transaction(&mut f.multisig, &mut proposal, Some(&detail), &remaining, 269),
            Err(ProgramErrorCode::CoolOffPeriodNotReached)
        );
        assert_eq!(
            execute_transaction(&mut f.multisig, &mut proposal, Some(&detail), &remaining[..1], 270),
            Err(ProgramErrorCode::RequiredAdditionalAccountsNotSent)
        );
        let replay =
            execute_transaction(&mut f.multisig, &mut proposal, Some(&detail), &remaining, 270)
                .unwrap();
        assert_eq!(replay.len(), 1);
        assert_eq!(proposal.executed_on, 270);
        assert_eq!(f.multisig.pending_txs, 0);
        assert_eq!(
            execute_transaction(&mut f.multisig, &mut proposal, Some(&detail), &remaining, 271),
            Err(ProgramErrorCode::AlreadyExecuted)
        );
    }

    #[test]
    fn test_expired_proposal() {
        let mut f = fixture(2, 2, 0);
        let (mut proposal, detail) =
            create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(300), 200).unwrap();
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &f.owners[1], Vote::Approve, 301),
            Err(ProgramErrorCode::AlreadyExpired)
        );
    }

    #[test]
    fn test_no_votes_after_failure() {
        let mut f = fixture(3, 3, 0);
        let (mut proposal, detail) =
            create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(0), 200).unwrap();
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &f.owners[1], Vote::Reject, 201),
            Ok(ProposalStatus::Failed)
        );
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &f.owners[2], Vote::Approve, 202),
            Err(ProgramErrorCode::NotEnoughSigners)
        );
        assert_eq!(proposal.signers, vec![VOTE_APPROVE, VOTE_REJECT, VOTE_NONE]);
    }

    #[test]
    fn test_queued_proposal_rejects_votes_after_edit() {
        let mut f = fixture(3, 2, 60);
        let (mut proposal, detail) =
            create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(0), 200).unwrap();
        vote(&f.multisig, &mut proposal, &detail, &f.owners[1], Vote::Approve, 210).unwrap();
        let edit = EditMultisigArgs {
            owners: f
                .owners
                .iter()
                .map(|address| Owner {
                    address: *address,
                    name: String::new(),
                })
                .collect(),
            threshold: 2,
            label: "team".to_string(),
            cool_off_period_in_seconds: 60,
        };
        edit_multisig(&mut f.multisig, &edit).unwrap();
        let status = proposal_status(
            &QuorumPolicy::from(&f.multisig),
            &VoteState::from(&proposal),
            Some(&detail),
            280,
        );
        assert_eq!(status, ProposalStatus::Queued);
        assert_eq!(
            vote(&f.multisig, &mut proposal, &detail, &f.owners[2], Vote::Reject, 280),
            Err(ProgramErrorCode::InvalidOwnerSetSeqNumber)
        );
    }

    #[test]
    fn test_cancel_rules() {
        let mut f = fixture(3, 3, 0);
        let (mut proposal, detail) =
            create_transaction(&mut f.multisig, &f.key, &f.owners[0], &tx_args(0), 200).unwrap();
        assert_eq!(
            cancel_transaction(&mut f.multisig, &proposal, &f.owners[1]),
            Err(ProgramErrorCode::UnableToDelete)
        );
        let untouched = proposal.clone();
        vote(&f.multisig, &mut proposal, &detail, &f.owners[2], Vote::Reject, 201).unwrap();
        assert_eq!(
            cancel_transaction(&mut f.multisig, &proposal, &f.owners[0]),
            Err(ProgramErrorCode::TransactionAlreadySigned)
        );
        cancel_transaction(&mut f.multisig, &untouched, &f.owners[0]).unwrap();
        assert_eq!(f.multisig.pending_txs, 0);
    }

    #[test]
    fn test_replacements() {
        let mut instructions = payload();
        instructions[0].accounts.push(ProposalAccountMeta {
            pubkey: REPLACEMENT_PLACEHOLDER,
            is_signer: false,
            is_writable: true,
        });
        instructions[0].accounts.push(ProposalAccountMeta {
            pubkey: REPLACEMENT_PLACEHOLDER,
            is_signer: false,
            is_writable: false,
        });
        assert_eq!(placeholder_count(&instructions), 2);
        let fresh = [Pubkey::new_unique(), Pubkey::new_unique()];
        assert_eq!(
            apply_replacements(&mut instructions.clone(), &fresh[..1]),
            Err(ProgramErrorCode::RequiredAdditionalAccountsNotSent)
        );
        apply_replacements(&mut instructions, &fresh).unwrap();
        assert_eq!(instructions[0].accounts[1].pubkey, fresh[0]);
        assert_eq!(instructions[0].accounts[2].pubkey, fresh[1]);
        assert!(instructions[0].accounts[2].is_signer);
        assert_eq!(placeholder_count(&instructions), 0);
    }

    #[test]
    fn test_update_settings_authority() {
        let authority = Pubkey::new_unique();
        let mut settings = SettingsV2 {
            version: 2,
            authority,
            ..Default::default()
        };
        let args = UpdateSettingsArgs {
            ops_account: Pubkey::new_unique(),
            create_multisig_account_fee: 1,
            create_transaction_account_fee: 2,
            approve_transaction_fee: 3,
            reject_transaction_fee: 4,
            execute_transaction_fee: 5,
            cancel_transaction_fee: 6,
        };
        assert_eq!(
            update_settings(&mut settings, &Pubkey::new_unique(), &args),
            Err(ProgramErrorCode::ConstraintHasOne)
        );
        update_settings(&mut settings, &authority, &args).unwrap();
        assert_eq!(settings.cancel_transaction_fee, 6);
        assert_eq!(settings.ops_account, args.ops_account);
    }
}
