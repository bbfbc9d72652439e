//! reconstructs the activity log of a proposal from its transaction history
use {
    crate::{
        programs::multisig::instructions::{MultisigInstruction, Owner},
        rpc::HistoricalTransaction,
        types::{ActivityAction, ActivityItem},
    },
    chrono::DateTime,
    solana_sdk::pubkey::Pubkey,
};

fn action(ix: &MultisigInstruction) -> Option<ActivityAction> {
    match ix {
        MultisigInstruction::CreateTransaction(_) | MultisigInstruction::CreateTransactionLegacy(_) => {
            Some(ActivityAction::Created)
        }
        MultisigInstruction::Approve => Some(ActivityAction::Approved),
        MultisigInstruction::Reject => Some(ActivityAction::Rejected),
        MultisigInstruction::ExecuteTransaction
        | MultisigInstruction::ExecuteTransactionWithReplacements(_) => Some(ActivityAction::Executed),
        MultisigInstruction::CancelTransaction => Some(ActivityAction::Deleted),
        _ => None,
    }
}

/// turns one historical transaction into an activity item
///
/// the first multisig instruction with a proposal action wins, and the acting owner
/// is the first live owner among its accounts. failed transactions and transactions
/// without a recognised multisig instruction produce no item
pub fn parse_activity(
    program_id: &Pubkey,
    owners: &[Owner],
    tx: &HistoricalTransaction,
) -> Option<ActivityItem> {
    if tx.failed {
        log::debug!("skipping failed transaction {}", tx.signature);
        return None;
    }
    let (ix, action) = tx
        .instructions
        .iter()
        .filter(|ix| ix.program_id == *program_id)
        .find_map(|ix| match MultisigInstruction::decode(&ix.data) {
            Ok(decoded) => action(&decoded).map(|action| (ix, action)),
            Err(err) => {
                log::debug!("undecodable multisig instruction in {}: {err}", tx.signature);
                None
            }
        })?;
    let owner = ix
        .accounts
        .iter()
        .find_map(|key| owners.iter().find(|owner| owner.address == *key))
        .cloned();
    Some(ActivityItem {
        index: 0,
        signature: tx.signature.to_string(),
        action,
        created_on: tx.block_time.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        owner,
    })
}

/// newest first, then numbered from zero
pub fn sort_activity(items: &mut [ActivityItem]) {
    items.sort_by(|a, b| b.created_on.cmp(&a.created_on));
    for (idx, item) in items.iter_mut().enumerate() {
        item.index = idx;
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{programs::multisig::instructions::ProgramAccounts, rpc::HistoricalInstruction},
        solana_sdk::{signature::Signature, system_instruction},
    };

    fn historical(ixs: Vec<solana_sdk::instruction::Instruction>, block_time: i64) -> HistoricalTransaction {
        HistoricalTransaction {
            signature: Signature::new_unique(),
            block_time: Some(block_time),
            failed: false,
            instructions: ixs
                .into_iter()
                .map(|ix| HistoricalInstruction {
                    program_id: ix.program_id,
                    accounts: ix.accounts.iter().map(|m| m.pubkey).collect(),
                    data: ix.data,
                })
                .collect(),
        }
    }

    #[test]
    fn test_vote_activity() {
        let accounts = ProgramAccounts::new(Pubkey::new_unique(), Pubkey::new_unique());
        let owner = Owner {
            address: Pubkey::new_unique(),
            name: "alice".to_string(),
        };
        let multisig = Pubkey::new_unique();
        let proposal = Pubkey::new_unique();
        let reject = accounts.vote(&multisig, &proposal, &owner.address, false).unwrap();
        let transfer = system_instruction::transfer(&owner.address, &multisig, 1);
        let tx = historical(vec![transfer, reject], 1_700_000_000);
        let item = parse_activity(&accounts.program_id, &[owner.clone()], &tx).unwrap();
        assert_eq!(item.action, ActivityAction::Rejected);
        assert_eq!(item.owner, Some(owner));
        assert_eq!(item.created_on.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_ignored_transactions() {
        let program_id = Pubkey::new_unique();
        let unknown = solana_sdk::instruction::Instruction {
            program_id,
            accounts: vec![],
            data: vec![9; 8],
        };
        assert!(parse_activity(&program_id, &[], &historical(vec![unknown], 0)).is_none());

        let accounts = ProgramAccounts::new(program_id, Pubkey::new_unique());
        let cancel = accounts
            .cancel_transaction(&Pubkey::new_unique(), &Pubkey::new_unique(), &Pubkey::new_unique())
            .unwrap();
        let mut failed = historical(vec![cancel.clone()], 0);
        failed.failed = true;
        assert!(parse_activity(&program_id, &[], &failed).is_none());
        let item = parse_activity(&program_id, &[], &historical(vec![cancel], 0)).unwrap();
        assert_eq!(item.action, ActivityAction::Deleted);
        assert_eq!(item.owner, None);
    }

    #[test]
    fn test_sort_activity() {
        let item = |secs: i64| ActivityItem {
            index: 9,
            signature: String::new(),
            action: ActivityAction::Approved,
            created_on: DateTime::from_timestamp(secs, 0),
            owner: None,
        };
        let mut items = vec![item(1), item(3), item(2)];
        sort_activity(&mut items);
        assert_eq!(
            items
                .iter()
                .map(|i| (i.index, i.created_on.unwrap().timestamp()))
                .collect::<Vec<_>>(),
            vec![(0, 3), (1, 2), (2, 1)]
        );
    }
}
