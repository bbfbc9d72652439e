//! end to end scenarios against the in-memory ledger
use {
    crate::{
        builder::{self, ProposalParams},
        client::{MultisigClient, LAMPORTS_PER_SIGNATURE},
        error::{MultisigError, ValidationError},
        programs::{
            multisig::{
                accounts::FeeSchedule,
                instructions::{Owner, UpdateSettingsArgs},
                pda::derive_authority,
                PROPOSAL_ACCOUNT_SIZE, REPLACEMENT_PLACEHOLDER, TRANSACTION_DETAIL_ACCOUNT_SIZE,
            },
            ParsedInstruction,
        },
        registry::MultisigParams,
        rpc::LedgerRpc,
        status::ProposalStatus,
        test_utils::{rent_exempt_minimum, LedgerAccount, MemoryLedger},
        types::{ActivityAction, MultisigAction},
        wallet::WalletSigner,
    },
    futures::StreamExt,
    solana_sdk::{
        instruction::Instruction,
        native_token::LAMPORTS_PER_SOL,
        pubkey::Pubkey,
        signature::{Keypair, Signature},
        signer::Signer,
        system_instruction, system_program,
        transaction::Transaction,
    },
};

const FEES: FeeSchedule = FeeSchedule {
    create_multisig: 2_000,
    create_transaction: 1_000,
    approve_transaction: 100,
    reject_transaction: 100,
    execute_transaction: 300,
    cancel_transaction: 50,
};

struct Harness {
    client: MultisigClient<MemoryLedger>,
    owners: Vec<Keypair>,
    multisig: Pubkey,
    vault: Pubkey,
    ops_account: Pubkey,
}

async fn sign_and_submit(
    client: &MultisigClient<MemoryLedger>,
    mut tx: Transaction,
    signers: &[&Keypair],
) -> Result<Signature, MultisigError> {
    for signer in signers {
        signer.sign_transaction(&mut tx).await.unwrap();
    }
    client.submit(&tx).await
}

async fn setup(owner_count: usize, threshold: u64, cool_off: u64) -> Harness {
    let program_id = Pubkey::new_unique();
    let ledger = MemoryLedger::new(program_id);
    let ops_account = Pubkey::new_unique();
    ledger
        .init_settings(Pubkey::new_unique(), ops_account, FEES)
        .await;
    let owners = (0..owner_count).map(|_| Keypair::new()).collect::<Vec<_>>();
    for owner in &owners {
        ledger.airdrop(&owner.pubkey(), 10 * LAMPORTS_PER_SOL).await;
    }
    let client = MultisigClient::connect(ledger, program_id, None).await.unwrap();
    let params = MultisigParams {
        label: "treasury".to_string(),
        threshold,
        owners: owners
            .iter()
            .enumerate()
            .map(|(idx, kp)| Owner {
                address: kp.pubkey(),
                name: format!("owner-{idx}"),
            })
            .collect(),
        cool_off_period_in_seconds: cool_off,
    };
    let (tx, multisig) = client
        .create_multisig(&owners[0].pubkey(), &params, Some(LAMPORTS_PER_SOL))
        .await
        .unwrap();
    sign_and_submit(&client, tx, &[&owners[0]]).await.unwrap();
    let vault = derive_authority(&program_id, &multisig).0;
    Harness {
        client,
        owners,
        multisig,
        vault,
        ops_account,
    }
}

impl Harness {
    fn owner(&self, idx: usize) -> &Keypair {
        &self.owners[idx]
    }

    async fn propose(&self, proposer: usize, instructions: Vec<Instruction>, expiration_date: u64) -> Pubkey {
        let params = ProposalParams {
            title: "payment".to_string(),
            description: "vendor invoice".to_string(),
            expiration_date,
            operation: 0,
            instructions,
        };
        let (tx, proposal) = self
            .client
            .create_transaction(&self.owner(proposer).pubkey(), &self.multisig, &params, &[])
            .await
            .unwrap();
        sign_and_submit(&self.client, tx, &[self.owner(proposer)])
            .await
            .unwrap();
        self.client.rpc().advance(1).await;
        proposal
    }

    async fn propose_transfer(&self, proposer: usize, to: &Pubkey, lamports: u64) -> Pubkey {
        self.propose(
            proposer,
            vec![system_instruction::transfer(&self.vault, to, lamports)],
            0,
        )
        .await
    }

    async fn approve(&self, owner: usize, proposal: &Pubkey) -> Result<Signature, MultisigError> {
        let tx = self.client.approve(&self.owner(owner).pubkey(), proposal).await?;
        let sig = sign_and_submit(&self.client, tx, &[self.owner(owner)]).await;
        self.client.rpc().advance(1).await;
        sig
    }

    async fn reject(&self, owner: usize, proposal: &Pubkey) -> Result<Signature, MultisigError> {
        let tx = self.client.reject(&self.owner(owner).pubkey(), proposal).await?;
        sign_and_submit(&self.client, tx, &[self.owner(owner)]).await
    }

    async fn execute(&self, payer: usize, proposal: &Pubkey) -> Result<Signature, MultisigError> {
        let (tx, _) = self
            .client
            .execute_transaction(&self.owner(payer).pubkey(), proposal)
            .await?;
        sign_and_submit(&self.client, tx, &[self.owner(payer)]).await
    }

    async fn status(&self, proposal: &Pubkey) -> ProposalStatus {
        self.client.get_proposal(proposal, None).await.unwrap().status
    }
}

#[tokio::test]
async fn test_two_of_three_transfer() {
    let h = setup(3, 2, 0).await;
    let recipient = Pubkey::new_unique();
    let amount = LAMPORTS_PER_SOL / 10;
    assert_eq!(h.client.vault_balance(&h.multisig).await.unwrap(), LAMPORTS_PER_SOL);

    let proposal = h.propose_transfer(0, &recipient, amount).await;
    let info = h
        .client
        .get_proposal(&proposal, Some(&h.owner(1).pubkey()))
        .await
        .unwrap();
    assert_eq!(info.status, ProposalStatus::Active);
    assert_eq!(info.votes, vec![Some(true), None, None]);
    assert_eq!(info.did_sign, Some(false));
    assert_eq!(info.title, "payment");
    match &info.instructions[0] {
        ParsedInstruction::Decoded(decoded) => assert_eq!(decoded.name, "transfer"),
        other => panic!("expected a decoded transfer, got {other:?}"),
    }
    assert!(matches!(
        h.execute(2, &proposal).await,
        Err(MultisigError::Quorum(_))
    ));

    h.approve(1, &proposal).await.unwrap();
    assert_eq!(h.status(&proposal).await, ProposalStatus::Passed);
    h.execute(2, &proposal).await.unwrap();

    assert_eq!(h.client.rpc().get_balance(&recipient).await.unwrap(), amount);
    assert_eq!(
        h.client.vault_balance(&h.multisig).await.unwrap(),
        LAMPORTS_PER_SOL - amount
    );
    assert_eq!(h.status(&proposal).await, ProposalStatus::Executed);
    assert_eq!(h.client.get_multisig(&h.multisig).await.unwrap().pending_txs, 0);
    assert!(matches!(
        h.execute(2, &proposal).await,
        Err(MultisigError::AlreadyTerminal(_))
    ));

    let activity = h.client.activity(&proposal, None, 10).await.unwrap();
    assert_eq!(
        activity.iter().map(|item| item.action).collect::<Vec<_>>(),
        vec![
            ActivityAction::Executed,
            ActivityAction::Approved,
            ActivityAction::Created
        ]
    );
    assert_eq!(
        activity.iter().map(|item| item.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(
        activity[1].owner.as_ref().map(|o| o.address),
        Some(h.owner(1).pubkey())
    );
    assert_eq!(
        activity[2].owner.as_ref().map(|o| o.name.as_str()),
        Some("owner-0")
    );
    let older = h
        .client
        .activity(&proposal, activity[0].signature.parse().ok(), 10)
        .await
        .unwrap();
    assert_eq!(older.len(), 2);
}

#[tokio::test]
async fn test_fees_are_charged_to_the_ops_account() {
    let h = setup(2, 1, 0).await;
    let ops_before = h.client.rpc().get_balance(&h.ops_account).await.unwrap();
    assert_eq!(ops_before, FEES.create_multisig);
    h.propose_transfer(0, &Pubkey::new_unique(), 1).await;
    assert_eq!(
        h.client.rpc().get_balance(&h.ops_account).await.unwrap(),
        ops_before + FEES.create_transaction
    );
    let fees = h.client.fees(MultisigAction::CreateTransaction).await.unwrap();
    assert_eq!(fees.network_fee, 2 * LAMPORTS_PER_SIGNATURE);
    assert_eq!(
        fees.rent_exempt,
        rent_exempt_minimum(PROPOSAL_ACCOUNT_SIZE) + rent_exempt_minimum(TRANSACTION_DETAIL_ACCOUNT_SIZE)
    );
    assert_eq!(fees.multisig_fee, FEES.create_transaction);
    let approve = h.client.fees(MultisigAction::ApproveTransaction).await.unwrap();
    assert_eq!(approve.total(), LAMPORTS_PER_SIGNATURE + FEES.approve_transaction);
}

#[tokio::test]
async fn test_edit_voids_pending_proposals() {
    let h = setup(3, 2, 0).await;
    let pending = h.propose_transfer(0, &Pubkey::new_unique(), 10).await;

    let params = MultisigParams {
        label: "treasury".to_string(),
        threshold: 3,
        owners: h
            .owners
            .iter()
            .map(|kp| Owner {
                address: kp.pubkey(),
                name: "renamed".to_string(),
            })
            .collect(),
        cool_off_period_in_seconds: 0,
    };
    let edit = h
        .client
        .edit_multisig_instruction(&h.multisig, &params)
        .await
        .unwrap();
    let edit_proposal = h.propose(0, vec![edit], 0).await;
    h.approve(1, &edit_proposal).await.unwrap();
    h.execute(0, &edit_proposal).await.unwrap();

    let info = h.client.get_multisig(&h.multisig).await.unwrap();
    assert_eq!(info.owner_set_seqno, 1);
    assert_eq!(info.threshold, 3);
    assert_eq!(info.pending_txs, 1);
    assert!(info.owners.iter().all(|o| o.name == "renamed"));

    assert_eq!(h.status(&pending).await, ProposalStatus::Voided);
    assert!(matches!(
        h.approve(1, &pending).await,
        Err(MultisigError::StaleState(_))
    ));
    assert!(matches!(
        h.execute(0, &pending).await,
        Err(MultisigError::StaleState(_))
    ));
    // the program enforces the same rule when the client check is bypassed
    let blockhash = h.client.rpc().get_latest_blockhash().await.unwrap();
    let tx = builder::vote(
        h.client.accounts(),
        &h.owner(1).pubkey(),
        &h.multisig,
        &pending,
        crate::transitions::Vote::Approve,
        blockhash,
    )
    .unwrap();
    assert!(matches!(
        sign_and_submit(&h.client, tx, &[h.owner(1)]).await,
        Err(MultisigError::StaleState(_))
    ));
}

#[tokio::test]
async fn test_cool_off_queues_passed_proposal() {
    let h = setup(2, 2, 3_600).await;
    let proposal = h.propose_transfer(0, &Pubkey::new_unique(), 10).await;
    h.approve(1, &proposal).await.unwrap();
    assert_eq!(h.status(&proposal).await, ProposalStatus::Passed);
    assert!(matches!(
        h.execute(1, &proposal).await,
        Err(MultisigError::CoolOffNotReached(_))
    ));

    let blockhash = h.client.rpc().get_latest_blockhash().await.unwrap();
    let tx = builder::execute_transaction(
        h.client.accounts(),
        &h.owner(1).pubkey(),
        &h.multisig,
        &proposal,
        &[(&system_instruction::transfer(&h.vault, &Pubkey::new_unique(), 10)).into()],
        blockhash,
    )
    .unwrap();
    assert!(matches!(
        sign_and_submit(&h.client, tx, &[h.owner(1)]).await,
        Err(MultisigError::CoolOffNotReached(_))
    ));

    h.client.rpc().advance(3_600).await;
    assert_eq!(h.status(&proposal).await, ProposalStatus::Queued);
    h.execute(1, &proposal).await.unwrap();
    assert_eq!(h.status(&proposal).await, ProposalStatus::Executed);
}

#[tokio::test]
async fn test_rejections_fail_the_proposal() {
    let h = setup(3, 2, 0).await;
    let proposal = h.propose_transfer(0, &Pubkey::new_unique(), 10).await;
    h.reject(1, &proposal).await.unwrap();
    assert_eq!(h.status(&proposal).await, ProposalStatus::Active);
    h.reject(2, &proposal).await.unwrap();
    let info = h.client.get_proposal(&proposal, None).await.unwrap();
    assert_eq!(info.status, ProposalStatus::Failed);
    assert_eq!(info.rejections, 2);
    assert!(matches!(
        h.execute(0, &proposal).await,
        Err(MultisigError::Quorum(_))
    ));
    // other owners voted so the proposer can no longer cancel
    assert!(matches!(
        h.client
            .cancel_transaction(&h.owner(0).pubkey(), &proposal)
            .await,
        Err(MultisigError::Authorization(_))
    ));
}

#[tokio::test]
async fn test_cancel_closes_the_proposal() {
    let h = setup(3, 2, 0).await;
    let proposal = h.propose_transfer(1, &Pubkey::new_unique(), 10).await;
    assert!(matches!(
        h.client
            .cancel_transaction(&h.owner(0).pubkey(), &proposal)
            .await,
        Err(MultisigError::Authorization(_))
    ));
    let tx = h
        .client
        .cancel_transaction(&h.owner(1).pubkey(), &proposal)
        .await
        .unwrap();
    sign_and_submit(&h.client, tx, &[h.owner(1)]).await.unwrap();
    assert!(matches!(
        h.client.get_proposal(&proposal, None).await,
        Err(MultisigError::NotFound(_))
    ));
    assert_eq!(h.client.get_multisig(&h.multisig).await.unwrap().pending_txs, 0);
    let activity = h.client.activity(&proposal, None, 10).await.unwrap();
    assert_eq!(activity[0].action, ActivityAction::Deleted);
    assert_eq!(activity[0].owner, None);
}

#[tokio::test]
async fn test_double_vote_and_non_owner() {
    let h = setup(3, 3, 0).await;
    let proposal = h.propose_transfer(0, &Pubkey::new_unique(), 10).await;
    h.approve(1, &proposal).await.unwrap();
    assert!(matches!(
        h.approve(1, &proposal).await,
        Err(MultisigError::Validation(ValidationError::AlreadyVoted(_)))
    ));
    assert!(matches!(
        h.client
            .reject(&h.owner(0).pubkey(), &proposal)
            .await,
        Err(MultisigError::Validation(ValidationError::AlreadyVoted(_)))
    ));
    let outsider = Pubkey::new_unique();
    assert!(matches!(
        h.client.approve(&outsider, &proposal).await,
        Err(MultisigError::Authorization(_))
    ));
}

#[tokio::test]
async fn test_expired_proposal() {
    let h = setup(2, 2, 0).await;
    let now = h.client.now().await.unwrap();
    let proposal = h
        .propose(
            0,
            vec![system_instruction::transfer(&h.vault, &Pubkey::new_unique(), 1)],
            now + 100,
        )
        .await;
    h.client.rpc().advance(200).await;
    assert_eq!(h.status(&proposal).await, ProposalStatus::Expired);
    assert!(matches!(
        h.approve(1, &proposal).await,
        Err(MultisigError::ExpiredProposal(_))
    ));
    assert!(matches!(
        h.execute(0, &proposal).await,
        Err(MultisigError::ExpiredProposal(_))
    ));
}

#[tokio::test]
async fn test_oversized_proposal_rejected_before_submission() {
    let h = setup(2, 2, 0).await;
    let params = ProposalParams {
        title: "bulk".to_string(),
        description: String::new(),
        expiration_date: 0,
        operation: 0,
        instructions: vec![Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[7u8; PROPOSAL_ACCOUNT_SIZE],
            vec![],
        )],
    };
    assert!(matches!(
        h.client
            .create_transaction(&h.owner(0).pubkey(), &h.multisig, &params, &[])
            .await,
        Err(MultisigError::Validation(ValidationError::ProposalTooLarge {
            max: PROPOSAL_ACCOUNT_SIZE,
            ..
        }))
    ));
    let info = h.client.get_multisig(&h.multisig).await.unwrap();
    assert_eq!(info.pending_txs, 0);
}

#[tokio::test]
async fn test_expiration_must_follow_cool_off() {
    let h = setup(2, 1, 600).await;
    let now = h.client.now().await.unwrap();
    let params = ProposalParams {
        title: "soon".to_string(),
        description: String::new(),
        expiration_date: now + 300,
        operation: 0,
        instructions: vec![system_instruction::transfer(&h.vault, &Pubkey::new_unique(), 1)],
    };
    assert!(matches!(
        h.client
            .create_transaction(&h.owner(0).pubkey(), &h.multisig, &params, &[])
            .await,
        Err(MultisigError::Validation(
            ValidationError::ExpirationBeforeCoolOff { .. }
        ))
    ));
}

#[tokio::test]
async fn test_unknown_program_code_surfaces() {
    let h = setup(1, 1, 0).await;
    // more than the vault holds, the system program fails with its own code
    let proposal = h
        .propose_transfer(0, &Pubkey::new_unique(), 5 * LAMPORTS_PER_SOL)
        .await;
    assert_eq!(h.status(&proposal).await, ProposalStatus::Passed);
    assert!(matches!(
        h.execute(0, &proposal).await,
        Err(MultisigError::UnknownProgramCode(1))
    ));
    assert_eq!(h.status(&proposal).await, ProposalStatus::Passed);
}

#[tokio::test]
async fn test_legacy_deployment_error_table() {
    let program_id = Pubkey::new_unique();
    let ledger = MemoryLedger::new(program_id);
    let authority = Pubkey::new_unique();
    let ops_account = Pubkey::new_unique();
    ledger.init_legacy_settings(authority, ops_account, FEES).await;
    let intruder = Keypair::new();
    ledger.airdrop(&intruder.pubkey(), LAMPORTS_PER_SOL).await;
    let client = MultisigClient::connect(ledger, program_id, None).await.unwrap();
    assert_eq!(client.accounts().ops_account, ops_account);
    // v1 settings are read only for the client, build the update directly
    let blockhash = client.rpc().get_latest_blockhash().await.unwrap();
    let tx = builder::update_settings(
        client.accounts(),
        &intruder.pubkey(),
        UpdateSettingsArgs {
            ops_account: intruder.pubkey(),
            create_multisig_account_fee: 0,
            create_transaction_account_fee: 0,
            approve_transaction_fee: 0,
            reject_transaction_fee: 0,
            execute_transaction_fee: 0,
            cancel_transaction_fee: 0,
        },
        blockhash,
    )
    .unwrap();
    // 6015 reads as a settings authority failure, not a missing account list
    assert!(matches!(
        sign_and_submit(&client, tx, &[&intruder]).await,
        Err(MultisigError::Authorization(_))
    ));
}

#[tokio::test]
async fn test_execute_with_replacements() {
    let h = setup(1, 1, 0).await;
    let lamports = rent_exempt_minimum(0);
    let proposal = h
        .propose(
            0,
            vec![system_instruction::create_account(
                &h.vault,
                &REPLACEMENT_PLACEHOLDER,
                lamports,
                0,
                &system_program::id(),
            )],
            0,
        )
        .await;
    let (tx, fresh) = h
        .client
        .execute_transaction(&h.owner(0).pubkey(), &proposal)
        .await
        .unwrap();
    assert_eq!(fresh.len(), 1);
    let ops_before = h.client.rpc().get_balance(&h.ops_account).await.unwrap();
    sign_and_submit(&h.client, tx, &[h.owner(0)]).await.unwrap();
    assert_eq!(h.client.rpc().get_balance(&fresh[0]).await.unwrap(), lamports);
    assert_eq!(
        h.client.rpc().get_balance(&h.ops_account).await.unwrap(),
        ops_before + FEES.execute_transaction
    );
    let info = h.client.get_proposal(&proposal, None).await.unwrap();
    assert_eq!(info.status, ProposalStatus::Executed);
}

#[tokio::test]
async fn test_listing_and_pages() {
    let h = setup(2, 2, 0).await;
    let mut created = vec![];
    for _ in 0..3 {
        created.push(h.propose_transfer(0, &Pubkey::new_unique(), 1).await);
    }
    // program accounts of another type that reference the multisig at the same offset
    for _ in 0..2 {
        let mut data = vec![0xaa; 8];
        data.extend_from_slice(h.multisig.as_ref());
        data.resize(PROPOSAL_ACCOUNT_SIZE, 0);
        h.client
            .rpc()
            .set_account(
                Pubkey::new_unique(),
                LedgerAccount {
                    lamports: rent_exempt_minimum(PROPOSAL_ACCOUNT_SIZE),
                    owner: h.client.program_id(),
                    data,
                },
            )
            .await;
    }
    let pages = h
        .client
        .proposal_pages(h.multisig, 2)
        .collect::<Vec<_>>()
        .await;
    assert_eq!(pages.len(), 2);
    let sizes = pages
        .into_iter()
        .map(|page| page.unwrap().len())
        .collect::<Vec<_>>();
    assert_eq!(sizes, vec![2, 1]);

    let listed = h.client.list_proposals(&h.multisig).await.unwrap();
    created.reverse();
    assert_eq!(
        listed.iter().map(|p| p.address).collect::<Vec<_>>(),
        created
    );

    // dropping the stream after the first page stops the scan
    let mut pages = Box::pin(h.client.proposal_pages(h.multisig, 1));
    let first = pages.next().await;
    assert_eq!(first.unwrap().unwrap().len(), 1);

    let mine = h
        .client
        .list_multisigs(Some(&h.owner(1).pubkey()))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].address, h.multisig);
    assert_eq!(mine[0].label, "treasury");
    assert!(mine[0].check_invariants(&h.client.program_id()).is_ok());
    assert!(h
        .client
        .list_multisigs(Some(&Pubkey::new_unique()))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_invalid_multisig_params_rejected_before_submission() {
    let h = setup(1, 1, 0).await;
    let params = MultisigParams {
        label: "x".repeat(40),
        threshold: 1,
        owners: vec![Owner {
            address: h.owner(0).pubkey(),
            name: "me".to_string(),
        }],
        cool_off_period_in_seconds: 0,
    };
    assert!(matches!(
        h.client
            .create_multisig(&h.owner(0).pubkey(), &params, None)
            .await,
        Err(MultisigError::Validation(ValidationError::FieldTooLong {
            field: "label",
            ..
        }))
    ));
    let params = MultisigParams {
        label: "x".to_string(),
        threshold: 2,
        ..params
    };
    assert!(matches!(
        h.client
            .create_multisig(&h.owner(0).pubkey(), &params, None)
            .await,
        Err(MultisigError::Validation(
            ValidationError::InvalidThreshold { .. }
        ))
    ));
}
