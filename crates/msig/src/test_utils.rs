//! an in-memory ledger which hosts the multisig transitions as its program
//!
//! transactions are applied atomically on a copy of the state: signatures and the
//! blockhash are checked, every instruction runs in order and the first failure
//! discards the whole transaction. executions replay the payload with the vault
//! authority as an additional signer.
use {
    crate::{
        error::ProgramErrorCode,
        programs::{
            multisig::{
                accounts::{
                    AccountCodec, FeeSchedule, MultisigV1, MultisigV2, SettingsAccount, SettingsV1,
                    SettingsV2, TransactionDetail, TransactionV2,
                },
                instructions::MultisigInstruction,
                pda::{derive_authority, derive_settings, derive_transaction_detail},
                MULTISIG_ACCOUNT_SIZE, SETTINGS_ACCOUNT_SIZE, TRANSACTION_DETAIL_ACCOUNT_SIZE,
            },
            system::decode_system_instruction,
        },
        rpc::{AccountFilter, HistoricalInstruction, HistoricalTransaction, LedgerRpc, SubmitError},
        transitions::{self, Vote},
    },
    solana_sdk::{
        hash::Hash,
        instruction::{Instruction, InstructionError},
        pubkey::Pubkey,
        signature::Signature,
        system_instruction::SystemInstruction,
        system_program,
        transaction::{Transaction, TransactionError},
    },
    std::collections::{HashMap, HashSet},
    tokio::sync::Mutex,
};

pub const GENESIS_TIMESTAMP: i64 = 1_700_000_000;
const LAMPORTS_PER_SIGNATURE: u64 = 5_000;
const MAX_INVOKE_DEPTH: usize = 4;

pub fn rent_exempt_minimum(size: usize) -> u64 {
    (size as u64 + 128) * 6_960
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerAccount {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

#[derive(Clone, Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, LedgerAccount>,
    now: i64,
    blockhashes: HashSet<Hash>,
    processed: HashSet<Signature>,
    /// signatures per address, oldest first
    history: HashMap<Pubkey, Vec<Signature>>,
    transactions: HashMap<Signature, HistoricalTransaction>,
}

pub struct MemoryLedger {
    program_id: Pubkey,
    state: Mutex<LedgerState>,
}

type ProcessResult<T = ()> = Result<T, InstructionError>;

fn fail(code: ProgramErrorCode) -> InstructionError {
    InstructionError::Custom(code.code())
}

/// the program being run and the accounts it may touch
struct Invocation<'a> {
    program_id: Pubkey,
    accounts: &'a mut HashMap<Pubkey, LedgerAccount>,
    signers: &'a HashSet<Pubkey>,
    now: u64,
}

impl Invocation<'_> {
    fn require_signer(&self, key: &Pubkey) -> ProcessResult {
        if self.signers.contains(key) {
            return Ok(());
        }
        Err(fail(ProgramErrorCode::ConstraintSigner))
    }

    fn lamports(&self, key: &Pubkey) -> u64 {
        self.accounts.get(key).map(|a| a.lamports).unwrap_or_default()
    }

    fn debit(&mut self, key: &Pubkey, lamports: u64) -> ProcessResult {
        let account = self
            .accounts
            .get_mut(key)
            .ok_or(InstructionError::InsufficientFunds)?;
        account.lamports = account
            .lamports
            .checked_sub(lamports)
            .ok_or(InstructionError::InsufficientFunds)?;
        Ok(())
    }

    fn credit(&mut self, key: &Pubkey, lamports: u64) -> ProcessResult {
        let account = self.accounts.entry(*key).or_insert_with(|| LedgerAccount {
            owner: system_program::id(),
            ..Default::default()
        });
        account.lamports = account
            .lamports
            .checked_add(lamports)
            .ok_or(InstructionError::ArithmeticOverflow)?;
        Ok(())
    }

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, lamports: u64) -> ProcessResult {
        self.debit(from, lamports)?;
        self.credit(to, lamports)
    }

    fn create_account(&mut self, funder: &Pubkey, key: &Pubkey, lamports: u64, space: usize, owner: &Pubkey) -> ProcessResult {
        if self
            .accounts
            .get(key)
            .is_some_and(|a| !a.data.is_empty() || a.owner != system_program::id())
        {
            return Err(InstructionError::AccountAlreadyInitialized);
        }
        self.debit(funder, lamports)?;
        let account = self.accounts.entry(*key).or_default();
        account.lamports = account.lamports.saturating_add(lamports);
        account.owner = *owner;
        account.data = vec![0; space];
        Ok(())
    }

    /// removes a program account, returning its lamports to `receiver`
    fn close(&mut self, key: &Pubkey, receiver: &Pubkey) -> ProcessResult {
        if let Some(account) = self.accounts.remove(key) {
            self.credit(receiver, account.lamports)?;
        }
        Ok(())
    }

    fn load<T: AccountCodec>(&self, key: &Pubkey) -> ProcessResult<T> {
        let account = self
            .accounts
            .get(key)
            .filter(|a| !a.data.is_empty())
            .ok_or_else(|| fail(ProgramErrorCode::AccountNotInitialized))?;
        if account.owner != self.program_id {
            return Err(InstructionError::IncorrectProgramId);
        }
        T::decode(&account.data).map_err(|err| {
            log::debug!("failed to load {} {key}: {err}", T::NAME);
            InstructionError::InvalidAccountData
        })
    }

    fn load_multisig(&self, key: &Pubkey) -> ProcessResult<MultisigV2> {
        match self.load::<MultisigV2>(key) {
            Ok(ms) => Ok(ms),
            Err(err) => match self.load::<MultisigV1>(key) {
                Ok(_) => Err(fail(ProgramErrorCode::InvalidMultisigVersion)),
                Err(_) => Err(err),
            },
        }
    }

    fn load_proposal(&self, key: &Pubkey, multisig: &Pubkey) -> ProcessResult<TransactionV2> {
        let proposal = self.load::<TransactionV2>(key)?;
        if proposal.multisig != *multisig {
            return Err(fail(ProgramErrorCode::InvalidMultisig));
        }
        Ok(proposal)
    }

    fn store<T: AccountCodec>(&mut self, key: &Pubkey, record: &T) -> ProcessResult {
        let encoded = record.encode().map_err(|_| InstructionError::InvalidAccountData)?;
        let account = self
            .accounts
            .get_mut(key)
            .ok_or(InstructionError::UninitializedAccount)?;
        if encoded.len() > account.data.len() {
            return Err(InstructionError::AccountDataTooSmall);
        }
        account.data.fill(0);
        account.data[..encoded.len()].copy_from_slice(&encoded);
        Ok(())
    }

    /// allocates a program owned account funded by `payer` and writes `record`
    fn init<T: AccountCodec>(&mut self, payer: &Pubkey, key: &Pubkey, space: usize, record: &T) -> ProcessResult {
        let program_id = self.program_id;
        self.create_account(payer, key, rent_exempt_minimum(space), space, &program_id)?;
        self.store(key, record)
    }

    fn settings(&self, key: &Pubkey) -> ProcessResult<Option<SettingsAccount>> {
        if *key != derive_settings(&self.program_id).0 {
            return Err(fail(ProgramErrorCode::ConstraintSeeds));
        }
        match self.accounts.get(key).filter(|a| !a.data.is_empty()) {
            Some(account) => SettingsAccount::decode(&account.data)
                .map(Some)
                .map_err(|_| InstructionError::InvalidAccountData),
            None => Ok(None),
        }
    }

    /// moves the action fee from `payer` to the configured ops account
    fn charge(
        &mut self,
        settings_key: &Pubkey,
        ops_account: &Pubkey,
        payer: &Pubkey,
        fee: impl Fn(&FeeSchedule) -> u64,
    ) -> ProcessResult {
        let Some(settings) = self.settings(settings_key)? else {
            return Ok(());
        };
        if settings.ops_account() != *ops_account {
            return Err(fail(ProgramErrorCode::ConstraintHasOne));
        }
        let schedule = settings.fees();
        let amount = fee(&schedule);
        if amount > 0 {
            self.transfer(payer, ops_account, amount)?;
        }
        Ok(())
    }
}

fn key(accounts: &[Pubkey], idx: usize) -> ProcessResult<Pubkey> {
    accounts
        .get(idx)
        .copied()
        .ok_or(InstructionError::NotEnoughAccountKeys)
}

fn process_system(inv: &mut Invocation<'_>, accounts: &[Pubkey], data: &[u8]) -> ProcessResult {
    let ix = decode_system_instruction(data).map_err(|_| InstructionError::InvalidInstructionData)?;
    match ix {
        SystemInstruction::Transfer { lamports } => {
            let from = key(accounts, 0)?;
            inv.require_signer(&from)
                .map_err(|_| InstructionError::MissingRequiredSignature)?;
            if inv.lamports(&from) < lamports {
                // SystemError::ResultWithNegativeLamports
                return Err(InstructionError::Custom(1));
            }
            inv.transfer(&from, &key(accounts, 1)?, lamports)
        }
        SystemInstruction::CreateAccount {
            lamports,
            space,
            owner,
        } => {
            let funder = key(accounts, 0)?;
            let new = key(accounts, 1)?;
            for signer in [&funder, &new] {
                inv.require_signer(signer)
                    .map_err(|_| InstructionError::MissingRequiredSignature)?;
            }
            inv.create_account(&funder, &new, lamports, space as usize, &owner)
        }
        other => {
            log::warn!("memory ledger does not support {other:?}");
            Err(InstructionError::InvalidInstructionData)
        }
    }
}

fn process_multisig(inv: &mut Invocation<'_>, accounts: &[Pubkey], data: &[u8], depth: usize) -> ProcessResult {
    let ix = MultisigInstruction::decode(data).map_err(|_| InstructionError::InvalidInstructionData)?;
    let program_id = inv.program_id;
    match ix {
        MultisigInstruction::CreateMultisig(args) => {
            let proposer = key(accounts, 0)?;
            let multisig = key(accounts, 1)?;
            inv.require_signer(&proposer)?;
            inv.require_signer(&multisig)?;
            let ms = transitions::create_multisig(&program_id, &multisig, &args, inv.now).map_err(fail)?;
            inv.init(&proposer, &multisig, MULTISIG_ACCOUNT_SIZE, &ms)?;
            inv.charge(&key(accounts, 3)?, &key(accounts, 2)?, &proposer, |f| f.create_multisig)
        }
        MultisigInstruction::EditMultisig(args) => {
            let multisig = key(accounts, 0)?;
            let authority = key(accounts, 1)?;
            if authority != derive_authority(&program_id, &multisig).0 {
                return Err(fail(ProgramErrorCode::ConstraintSeeds));
            }
            inv.require_signer(&authority)?;
            let mut ms = inv.load_multisig(&multisig)?;
            transitions::edit_multisig(&mut ms, &args).map_err(fail)?;
            inv.store(&multisig, &ms)
        }
        MultisigInstruction::CreateTransaction(args) => {
            let multisig = key(accounts, 0)?;
            let transaction = key(accounts, 1)?;
            let detail = key(accounts, 2)?;
            let proposer = key(accounts, 3)?;
            inv.require_signer(&proposer)?;
            inv.require_signer(&transaction)?;
            if detail != derive_transaction_detail(&program_id, &multisig, &transaction).0 {
                return Err(fail(ProgramErrorCode::ConstraintSeeds));
            }
            // the proposal account is allocated beforehand and must still be blank
            let blank = inv
                .accounts
                .get(&transaction)
                .is_some_and(|a| a.owner == program_id && a.data.iter().all(|b| *b == 0));
            if !blank {
                return Err(InstructionError::AccountAlreadyInitialized);
            }
            let mut ms = inv.load_multisig(&multisig)?;
            let (proposal, record) =
                transitions::create_transaction(&mut ms, &multisig, &proposer, &args, inv.now)
                    .map_err(fail)?;
            inv.store(&transaction, &proposal)?;
            inv.init(&proposer, &detail, TRANSACTION_DETAIL_ACCOUNT_SIZE, &record)?;
            inv.store(&multisig, &ms)?;
            inv.charge(&key(accounts, 5)?, &key(accounts, 4)?, &proposer, |f| f.create_transaction)
        }
        MultisigInstruction::CreateTransactionLegacy(_) => Err(fail(ProgramErrorCode::InvalidMultisigVersion)),
        MultisigInstruction::CancelTransaction => {
            let multisig = key(accounts, 0)?;
            let transaction = key(accounts, 1)?;
            let detail = key(accounts, 2)?;
            let proposer = key(accounts, 3)?;
            inv.require_signer(&proposer)?;
            let mut ms = inv.load_multisig(&multisig)?;
            let proposal = inv.load_proposal(&transaction, &multisig)?;
            transitions::cancel_transaction(&mut ms, &proposal, &proposer).map_err(fail)?;
            inv.store(&multisig, &ms)?;
            inv.close(&transaction, &proposer)?;
            inv.close(&detail, &proposer)?;
            inv.charge(&key(accounts, 5)?, &key(accounts, 4)?, &proposer, |f| f.cancel_transaction)
        }
        MultisigInstruction::Approve => vote(inv, accounts, Vote::Approve),
        MultisigInstruction::Reject => vote(inv, accounts, Vote::Reject),
        MultisigInstruction::ExecuteTransaction => {
            let payer = key(accounts, 4)?;
            let replay = execute(inv, accounts, &[])?;
            inv.charge(&key(accounts, 6)?, &key(accounts, 5)?, &payer, |f| f.execute_transaction)?;
            replay_payload(inv, accounts, replay, depth)
        }
        MultisigInstruction::ExecuteTransactionWithReplacements(args) => {
            for replacement in &args.replacement_accounts {
                inv.require_signer(replacement)?;
            }
            let payer = key(accounts, 4)?;
            let replay = execute(inv, accounts, &args.replacement_accounts)?;
            inv.charge(&key(accounts, 6)?, &key(accounts, 5)?, &payer, |f| f.execute_transaction)?;
            replay_payload(inv, accounts, replay, depth)
        }
        MultisigInstruction::InitSettings => {
            // the payer stands in for the program's upgrade authority
            let payer = key(accounts, 0)?;
            let settings = key(accounts, 1)?;
            inv.require_signer(&payer)?;
            if settings != derive_settings(&program_id).0 {
                return Err(fail(ProgramErrorCode::ConstraintSeeds));
            }
            let record = SettingsV2 {
                version: 2,
                bump: derive_settings(&program_id).1,
                authority: payer,
                ops_account: payer,
                ..Default::default()
            };
            inv.init(&payer, &settings, SETTINGS_ACCOUNT_SIZE, &record)
        }
        MultisigInstruction::UpdateSettings(args) => {
            let authority = key(accounts, 0)?;
            let settings_key = key(accounts, 1)?;
            inv.require_signer(&authority)?;
            match inv.settings(&settings_key)? {
                Some(SettingsAccount::V2(mut settings)) => {
                    transitions::update_settings(&mut settings, &authority, &args).map_err(fail)?;
                    inv.store(&settings_key, &settings)
                }
                // deployments predating cool-off only know the two account fees
                Some(SettingsAccount::V1(mut settings)) => {
                    if settings.authority != authority {
                        return Err(fail(ProgramErrorCode::InvalidSettingsAuthority));
                    }
                    settings.ops_account = args.ops_account;
                    settings.create_multisig_account_fee = args.create_multisig_account_fee;
                    settings.create_transaction_account_fee = args.create_transaction_account_fee;
                    inv.store(&settings_key, &settings)
                }
                None => Err(fail(ProgramErrorCode::AccountNotInitialized)),
            }
        }
        MultisigInstruction::Unrecognized(tag) => {
            log::warn!("unrecognized multisig instruction {tag:?}");
            Err(InstructionError::InvalidInstructionData)
        }
    }
}

fn vote(inv: &mut Invocation<'_>, accounts: &[Pubkey], vote: Vote) -> ProcessResult {
    let multisig = key(accounts, 0)?;
    let transaction = key(accounts, 1)?;
    let owner = key(accounts, 3)?;
    inv.require_signer(&owner)?;
    let ms = inv.load_multisig(&multisig)?;
    let mut proposal = inv.load_proposal(&transaction, &multisig)?;
    let record = inv.load::<TransactionDetail>(&key(accounts, 2)?)?;
    transitions::vote(&ms, &mut proposal, &record, &owner, vote, inv.now).map_err(fail)?;
    inv.store(&transaction, &proposal)?;
    inv.charge(&key(accounts, 5)?, &key(accounts, 4)?, &owner, |f| match vote {
        Vote::Approve => f.approve_transaction,
        Vote::Reject => f.reject_transaction,
    })
}

/// runs the execute transition and persists it, returning the payload to replay
///
/// `fixed`: number of accounts before the remaining accounts
/// multisig, authority, transaction, detail, payer, ops, settings, system program
const EXECUTE_FIXED_ACCOUNTS: usize = 8;

fn execute(
    inv: &mut Invocation<'_>,
    accounts: &[Pubkey],
    replacements: &[Pubkey],
) -> ProcessResult<Vec<Instruction>> {
    let multisig = key(accounts, 0)?;
    let authority = key(accounts, 1)?;
    let transaction = key(accounts, 2)?;
    let payer = key(accounts, 4)?;
    inv.require_signer(&payer)?;
    if authority != derive_authority(&inv.program_id, &multisig).0 {
        return Err(fail(ProgramErrorCode::ConstraintSeeds));
    }
    let mut ms = inv.load_multisig(&multisig)?;
    let mut proposal = inv.load_proposal(&transaction, &multisig)?;
    let detail_key = key(accounts, 3)?;
    let record = match inv.accounts.get(&detail_key) {
        Some(_) => Some(inv.load::<TransactionDetail>(&detail_key)?),
        None => None,
    };
    let mut replaced = proposal.clone();
    transitions::apply_replacements(&mut replaced.instructions, replacements).map_err(fail)?;
    let remaining = accounts.get(EXECUTE_FIXED_ACCOUNTS..).unwrap_or_default();
    let replay = transitions::execute_transaction(&mut ms, &mut replaced, record.as_ref(), remaining, inv.now)
        .map_err(fail)?;
    // placeholders stay in the stored payload
    proposal.executed_on = replaced.executed_on;
    proposal.last_known_proposal_status = replaced.last_known_proposal_status;
    inv.store(&multisig, &ms)?;
    inv.store(&transaction, &proposal)?;
    Ok(replay)
}

/// replays payload instructions with the vault authority signing
fn replay_payload(
    inv: &mut Invocation<'_>,
    accounts: &[Pubkey],
    replay: Vec<Instruction>,
    depth: usize,
) -> ProcessResult {
    let authority = key(accounts, 1)?;
    let mut signers = inv.signers.clone();
    signers.insert(authority);
    for ix in replay {
        let metas = ix.accounts.iter().map(|m| m.pubkey).collect::<Vec<_>>();
        let mut inner = Invocation {
            program_id: inv.program_id,
            accounts: &mut *inv.accounts,
            signers: &signers,
            now: inv.now,
        };
        process_instruction(&mut inner, &ix.program_id, &metas, &ix.data, depth + 1)?;
    }
    Ok(())
}

fn process_instruction(
    inv: &mut Invocation<'_>,
    program_id: &Pubkey,
    accounts: &[Pubkey],
    data: &[u8],
    depth: usize,
) -> ProcessResult {
    if depth > MAX_INVOKE_DEPTH {
        return Err(InstructionError::CallDepth);
    }
    if *program_id == system_program::id() {
        process_system(inv, accounts, data)
    } else if *program_id == inv.program_id {
        process_multisig(inv, accounts, data, depth)
    } else {
        log::warn!("memory ledger has no program {program_id}");
        Err(InstructionError::UnsupportedProgramId)
    }
}

impl MemoryLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            state: Mutex::new(LedgerState {
                now: GENESIS_TIMESTAMP,
                ..Default::default()
            }),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub async fn airdrop(&self, address: &Pubkey, lamports: u64) {
        let mut state = self.state.lock().await;
        let account = state.accounts.entry(*address).or_insert_with(|| LedgerAccount {
            owner: system_program::id(),
            ..Default::default()
        });
        account.lamports = account.lamports.saturating_add(lamports);
    }

    pub async fn now(&self) -> i64 {
        self.state.lock().await.now
    }

    pub async fn set_time(&self, unix_timestamp: i64) {
        self.state.lock().await.now = unix_timestamp;
    }

    pub async fn advance(&self, seconds: i64) {
        let mut state = self.state.lock().await;
        state.now = state.now.saturating_add(seconds);
    }

    pub async fn account(&self, address: &Pubkey) -> Option<LedgerAccount> {
        self.state.lock().await.accounts.get(address).cloned()
    }

    /// writes raw account contents, used to seed legacy layouts
    pub async fn set_account(&self, address: Pubkey, account: LedgerAccount) {
        self.state.lock().await.accounts.insert(address, account);
    }

    /// creates the program settings account directly
    pub async fn init_settings(&self, authority: Pubkey, ops_account: Pubkey, fees: FeeSchedule) {
        let (settings, bump) = derive_settings(&self.program_id);
        let record = SettingsV2 {
            version: 2,
            bump,
            authority,
            ops_account,
            create_multisig_account_fee: fees.create_multisig,
            create_transaction_account_fee: fees.create_transaction,
            approve_transaction_fee: fees.approve_transaction,
            reject_transaction_fee: fees.reject_transaction,
            execute_transaction_fee: fees.execute_transaction,
            cancel_transaction_fee: fees.cancel_transaction,
        };
        let Ok(data) = record.encode() else {
            return;
        };
        self.set_account(
            settings,
            LedgerAccount {
                lamports: rent_exempt_minimum(SETTINGS_ACCOUNT_SIZE),
                owner: self.program_id,
                data,
            },
        )
        .await;
    }

    /// creates settings in the layout of deployments without cool-off support,
    /// which raise codes from the legacy error table
    pub async fn init_legacy_settings(&self, authority: Pubkey, ops_account: Pubkey, fees: FeeSchedule) {
        let (settings, bump) = derive_settings(&self.program_id);
        let record = SettingsV1 {
            version: 1,
            bump,
            authority,
            ops_account,
            create_multisig_account_fee: fees.create_multisig,
            create_transaction_account_fee: fees.create_transaction,
        };
        let Ok(data) = record.encode() else {
            return;
        };
        self.set_account(
            settings,
            LedgerAccount {
                lamports: rent_exempt_minimum(SETTINGS_ACCOUNT_SIZE),
                owner: self.program_id,
                data,
            },
        )
        .await;
    }

    fn apply(&self, state: &mut LedgerState, tx: &Transaction) -> Result<(), TransactionError> {
        let message = &tx.message;
        let payer = *message
            .account_keys
            .first()
            .ok_or(TransactionError::AccountNotFound)?;
        let fee = LAMPORTS_PER_SIGNATURE * u64::from(message.header.num_required_signatures);
        let payer_account = state
            .accounts
            .get_mut(&payer)
            .ok_or(TransactionError::AccountNotFound)?;
        payer_account.lamports = payer_account
            .lamports
            .checked_sub(fee)
            .ok_or(TransactionError::InsufficientFundsForFee)?;
        let signers = message
            .account_keys
            .iter()
            .enumerate()
            .filter(|(idx, _)| message.is_signer(*idx))
            .map(|(_, key)| *key)
            .collect::<HashSet<_>>();
        let now = u64::try_from(state.now).unwrap_or_default();
        for (index, ix) in message.instructions.iter().enumerate() {
            let program_id = message
                .account_keys
                .get(ix.program_id_index as usize)
                .copied()
                .ok_or(TransactionError::ProgramAccountNotFound)?;
            let accounts = ix
                .accounts
                .iter()
                .map(|idx| message.account_keys.get(*idx as usize).copied())
                .collect::<Option<Vec<_>>>()
                .ok_or(TransactionError::AccountNotFound)?;
            let mut inv = Invocation {
                program_id: self.program_id,
                accounts: &mut state.accounts,
                signers: &signers,
                now,
            };
            process_instruction(&mut inv, &program_id, &accounts, &ix.data, 0)
                .map_err(|err| TransactionError::InstructionError(index as u8, err))?;
        }
        Ok(())
    }
}

impl LedgerRpc for MemoryLedger {
    async fn get_account_data(&self, address: &Pubkey) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.state.lock().await.accounts.get(address).map(|a| a.data.clone()))
    }

    async fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> anyhow::Result<Vec<Option<Vec<u8>>>> {
        let state = self.state.lock().await;
        Ok(addresses
            .iter()
            .map(|address| state.accounts.get(address).map(|a| a.data.clone()))
            .collect())
    }

    async fn get_program_account_keys(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> anyhow::Result<Vec<Pubkey>> {
        Ok(self
            .get_program_accounts(program_id, filters)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> anyhow::Result<Vec<(Pubkey, Vec<u8>)>> {
        let state = self.state.lock().await;
        let mut matched = state
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .filter(|(_, account)| {
                filters.iter().all(|filter| match filter {
                    AccountFilter::Memcmp { offset, bytes } => account
                        .data
                        .get(*offset..offset.saturating_add(bytes.len()))
                        .is_some_and(|window| window == bytes.as_slice()),
                })
            })
            .map(|(key, account)| (*key, account.data.clone()))
            .collect::<Vec<_>>();
        matched.sort_by_key(|(key, _)| *key);
        Ok(matched)
    }

    async fn get_latest_blockhash(&self) -> anyhow::Result<Hash> {
        let hash = Hash::new_unique();
        self.state.lock().await.blockhashes.insert(hash);
        Ok(hash)
    }

    async fn get_balance(&self, address: &Pubkey) -> anyhow::Result<u64> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .get(address)
            .map(|a| a.lamports)
            .unwrap_or_default())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, size: usize) -> anyhow::Result<u64> {
        Ok(rent_exempt_minimum(size))
    }

    async fn get_unix_timestamp(&self) -> anyhow::Result<i64> {
        Ok(self.state.lock().await.now)
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> anyhow::Result<Vec<Signature>> {
        let state = self.state.lock().await;
        let Some(history) = state.history.get(address) else {
            return Ok(vec![]);
        };
        let newest_first = history.iter().rev();
        let signatures = match before {
            Some(before) => newest_first
                .skip_while(|sig| **sig != before)
                .skip(1)
                .take(limit)
                .copied()
                .collect(),
            None => newest_first.take(limit).copied().collect(),
        };
        Ok(signatures)
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> anyhow::Result<Option<HistoricalTransaction>> {
        Ok(self.state.lock().await.transactions.get(signature).cloned())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, SubmitError> {
        let mut state = self.state.lock().await;
        if !state.blockhashes.contains(&transaction.message.recent_blockhash) {
            return Err(TransactionError::BlockhashNotFound.into());
        }
        transaction.verify()?;
        let signature = *transaction
            .signatures
            .first()
            .ok_or(TransactionError::MissingSignatureForFee)?;
        if state.processed.contains(&signature) {
            return Err(TransactionError::AlreadyProcessed.into());
        }
        let mut working = state.clone();
        if let Err(err) = self.apply(&mut working, transaction) {
            log::warn!("transaction {signature} failed: {err}");
            return Err(err.into());
        }
        *state = working;
        state.processed.insert(signature);
        let message = &transaction.message;
        let historical = HistoricalTransaction {
            signature,
            block_time: Some(state.now),
            failed: false,
            instructions: message
                .instructions
                .iter()
                .map(|ix| HistoricalInstruction {
                    program_id: message.account_keys[ix.program_id_index as usize],
                    accounts: ix
                        .accounts
                        .iter()
                        .map(|idx| message.account_keys[*idx as usize])
                        .collect(),
                    data: ix.data.clone(),
                })
                .collect(),
        };
        for key in &message.account_keys {
            state.history.entry(*key).or_default().push(signature);
        }
        state.transactions.insert(signature, historical);
        Ok(signature)
    }
}
