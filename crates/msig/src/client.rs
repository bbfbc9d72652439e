//! session client over a [`LedgerRpc`]
//!
//! reads decode accounts into summaries, writes validate against freshly fetched
//! state before composing a transaction with a fresh blockhash
use {
    crate::{
        activity::{parse_activity, sort_activity},
        builder::{self, ProposalParams},
        error::{MultisigError, Result, ValidationError},
        programs::{
            multisig::{
                accounts::{
                    AccountCodec, MultisigAccount, MultisigV1, MultisigV2, ProposalAccount,
                    SettingsAccount, TransactionDetail, TransactionV2,
                },
                instructions::{Owner, ProgramAccounts, UpdateSettingsArgs},
                pda::{derive_authority, derive_settings, derive_transaction_detail},
                MULTISIG_ACCOUNT_SIZE, PROPOSAL_ACCOUNT_SIZE, TRANSACTION_DETAIL_ACCOUNT_SIZE,
                VOTE_APPROVE, VOTE_NONE, VOTE_REJECT,
            },
            DecoderRegistry,
        },
        registry::{MultisigInfo, MultisigParams},
        rpc::{AccountFilter, LedgerRpc, SubmitError, MAX_MULTIPLE_ACCOUNTS},
        status::{ensure_executable, proposal_status, QuorumPolicy, VoteState},
        transitions::{self, placeholder_count, Vote},
        types::{timestamp, ActivityItem, MultisigAction, ProposalInfo, TransactionFees},
    },
    futures::{stream, Stream, TryStreamExt},
    solana_sdk::{
        instruction::Instruction,
        pubkey::Pubkey,
        signature::Signature,
        transaction::Transaction,
    },
};

/// lamports charged per transaction signature
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

pub struct MultisigClient<R> {
    rpc: R,
    accounts: ProgramAccounts,
    settings: Option<SettingsAccount>,
    decoders: DecoderRegistry,
}

/// a proposal with its detail record and the multisig it belongs to
struct LoadedProposal {
    proposal: ProposalAccount,
    detail: Option<TransactionDetail>,
    multisig: MultisigAccount,
}

struct PageCursor {
    info: MultisigInfo,
    now: u64,
    keys: Vec<Pubkey>,
    offset: usize,
}

enum Scan {
    Start,
    Paging(PageCursor),
    Done,
}

fn require_v2_multisig(account: MultisigAccount) -> Result<MultisigV2> {
    match account {
        MultisigAccount::V2(ms) => Ok(ms),
        MultisigAccount::V1(_) => Err(ValidationError::LegacyAccount(MultisigV1::NAME).into()),
    }
}

fn require_v2_proposal(account: ProposalAccount) -> Result<TransactionV2> {
    match account {
        ProposalAccount::V2(tx) => Ok(tx),
        ProposalAccount::V1(_) => Err(ValidationError::LegacyAccount("Transaction v1").into()),
    }
}

fn votes(signers: &[u8], live_owner_count: usize) -> Vec<Option<bool>> {
    (0..live_owner_count)
        .map(|idx| match signers.get(idx).copied().unwrap_or(VOTE_NONE) {
            VOTE_APPROVE => Some(true),
            VOTE_REJECT => Some(false),
            _ => None,
        })
        .collect()
}

impl<R: LedgerRpc> MultisigClient<R> {
    /// resolves the program settings once for the session
    ///
    /// # Parameters
    ///
    /// `ops_account`: used when the program has no settings account yet
    pub async fn connect(rpc: R, program_id: Pubkey, ops_account: Option<Pubkey>) -> Result<Self> {
        let (settings_key, _) = derive_settings(&program_id);
        let settings = match rpc.get_account_data(&settings_key).await? {
            Some(data) => Some(SettingsAccount::decode(&data)?),
            None => {
                log::warn!("no settings account at {settings_key}, fees are assumed zero");
                None
            }
        };
        let ops_account = settings
            .map(|settings| settings.ops_account())
            .or(ops_account)
            .ok_or_else(|| {
                MultisigError::NotFound(format!("settings account {settings_key}"))
            })?;
        Ok(Self {
            rpc,
            accounts: ProgramAccounts::new(program_id, ops_account),
            settings,
            decoders: DecoderRegistry::with_defaults(program_id),
        })
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn program_id(&self) -> Pubkey {
        self.accounts.program_id
    }

    pub fn accounts(&self) -> &ProgramAccounts {
        &self.accounts
    }

    pub fn get_settings(&self) -> Option<&SettingsAccount> {
        self.settings.as_ref()
    }

    pub fn decoders_mut(&mut self) -> &mut DecoderRegistry {
        &mut self.decoders
    }

    /// current ledger time in unix seconds
    pub async fn now(&self) -> Result<u64> {
        let ts = self.rpc.get_unix_timestamp().await?;
        Ok(u64::try_from(ts).unwrap_or_default())
    }

    async fn fetch_multisig(&self, address: &Pubkey) -> Result<MultisigAccount> {
        let data = self.rpc.get_account_data(address).await?;
        MultisigAccount::decode_nullable(data.as_deref())?
            .ok_or_else(|| MultisigError::NotFound(format!("multisig {address}")))
    }

    async fn fetch_proposal(&self, address: &Pubkey) -> Result<LoadedProposal> {
        let data = self.rpc.get_account_data(address).await?;
        let proposal = ProposalAccount::decode_nullable(data.as_deref())?
            .ok_or_else(|| MultisigError::NotFound(format!("proposal {address}")))?;
        let multisig_key = proposal.multisig();
        let (detail_key, _) = derive_transaction_detail(&self.program_id(), &multisig_key, address);
        let fetched = self
            .rpc
            .get_multiple_account_data(&[multisig_key, detail_key])
            .await?;
        let mut fetched = fetched.into_iter();
        let multisig = MultisigAccount::decode_nullable(fetched.next().flatten().as_deref())?
            .ok_or_else(|| MultisigError::NotFound(format!("multisig {multisig_key}")))?;
        let detail = TransactionDetail::decode_nullable(fetched.next().flatten().as_deref())?;
        Ok(LoadedProposal {
            proposal,
            detail,
            multisig,
        })
    }

    pub async fn get_multisig(&self, address: &Pubkey) -> Result<MultisigInfo> {
        let account = self.fetch_multisig(address).await?;
        Ok(MultisigInfo::from_account(&self.program_id(), *address, &account))
    }

    /// every multisig of the program, newest first, optionally only those `owner` belongs to
    pub async fn list_multisigs(&self, owner: Option<&Pubkey>) -> Result<Vec<MultisigInfo>> {
        let mut infos = Vec::new();
        for discriminator in [MultisigV2::DISCRIMINATOR, MultisigV1::DISCRIMINATOR] {
            let accounts = self
                .rpc
                .get_program_accounts(
                    &self.program_id(),
                    &[AccountFilter::Memcmp {
                        offset: 0,
                        bytes: discriminator.to_vec(),
                    }],
                )
                .await?;
            for (address, data) in accounts {
                match MultisigAccount::decode(&data) {
                    Ok(account) => {
                        infos.push(MultisigInfo::from_account(&self.program_id(), address, &account))
                    }
                    Err(err) => log::warn!("skipping undecodable multisig {address}: {err}"),
                }
            }
        }
        if let Some(owner) = owner {
            infos.retain(|info| info.is_owner(owner));
        }
        infos.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        Ok(infos)
    }

    /// lamports held by the multisig's vault authority
    pub async fn vault_balance(&self, multisig: &Pubkey) -> Result<u64> {
        let (authority, _) = derive_authority(&self.program_id(), multisig);
        Ok(self.rpc.get_balance(&authority).await?)
    }

    fn proposal_info(
        &self,
        address: &Pubkey,
        proposal: &ProposalAccount,
        detail: Option<&TransactionDetail>,
        info: &MultisigInfo,
        viewer: Option<&Pubkey>,
        now: u64,
    ) -> ProposalInfo {
        let policy = info.policy();
        let votes = votes(proposal.signers(), policy.live_owner_count);
        let did_sign = viewer.map(|viewer| {
            info.owners
                .iter()
                .position(|owner| owner.address == *viewer)
                .and_then(|idx| votes.get(idx))
                .is_some_and(Option::is_some)
        });
        ProposalInfo {
            address: *address,
            multisig: proposal.multisig(),
            version: proposal.version(),
            operation: proposal.operation(),
            proposer: proposal.proposer(),
            title: detail.map(TransactionDetail::title).unwrap_or_default(),
            description: detail.map(TransactionDetail::description).unwrap_or_default(),
            created_on: timestamp(proposal.created_on()),
            executed_on: timestamp(proposal.executed_on()),
            expiration_date: detail.and_then(|d| timestamp(d.expiration_date)),
            owner_set_seqno: proposal.owner_set_seqno(),
            status: proposal_status(&policy, &VoteState::from(proposal), detail, now),
            approvals: votes.iter().filter(|v| **v == Some(true)).count(),
            rejections: votes.iter().filter(|v| **v == Some(false)).count(),
            votes,
            did_sign,
            instructions: proposal
                .instructions()
                .iter()
                .map(|ix| {
                    let keys = ix.accounts.iter().map(|meta| meta.pubkey).collect::<Vec<_>>();
                    self.decoders.parse(&ix.program_id, &keys, &ix.data)
                })
                .collect(),
        }
    }

    /// # Parameters
    ///
    /// `viewer`: owner whose vote is reported in `did_sign`
    pub async fn get_proposal(&self, address: &Pubkey, viewer: Option<&Pubkey>) -> Result<ProposalInfo> {
        let loaded = self.fetch_proposal(address).await?;
        let info = MultisigInfo::from_account(
            &self.program_id(),
            loaded.proposal.multisig(),
            &loaded.multisig,
        );
        let now = self.now().await?;
        Ok(self.proposal_info(
            address,
            &loaded.proposal,
            loaded.detail.as_ref(),
            &info,
            viewer,
            now,
        ))
    }

    async fn scan_cursor(&self, multisig: &Pubkey) -> Result<PageCursor> {
        let info = self.get_multisig(multisig).await?;
        let keys = self
            .rpc
            .get_program_account_keys(
                &self.program_id(),
                &[
                    // both proposal layouts share the Transaction discriminator
                    AccountFilter::Memcmp {
                        offset: 0,
                        bytes: TransactionV2::DISCRIMINATOR.to_vec(),
                    },
                    AccountFilter::Memcmp {
                        offset: 8,
                        bytes: multisig.to_bytes().to_vec(),
                    },
                ],
            )
            .await?;
        log::debug!("found {} candidate proposals of {multisig}", keys.len());
        Ok(PageCursor {
            info,
            now: self.now().await?,
            keys,
            offset: 0,
        })
    }

    async fn load_page(&self, cursor: &PageCursor, keys: &[Pubkey]) -> Result<Vec<ProposalInfo>> {
        let multisig = cursor.info.address;
        let detail_keys = keys
            .iter()
            .map(|key| derive_transaction_detail(&self.program_id(), &multisig, key).0)
            .collect::<Vec<_>>();
        let proposals = self.rpc.get_multiple_account_data(keys).await?;
        let details = self.rpc.get_multiple_account_data(&detail_keys).await?;
        let mut page = Vec::with_capacity(keys.len());
        for ((address, data), detail) in keys.iter().zip(proposals).zip(details) {
            let proposal = match ProposalAccount::decode_nullable(data.as_deref()) {
                Ok(Some(proposal)) => proposal,
                Ok(None) => continue,
                Err(err) => {
                    log::warn!("skipping undecodable proposal {address}: {err}");
                    continue;
                }
            };
            let detail = TransactionDetail::decode_nullable(detail.as_deref()).unwrap_or_else(|err| {
                log::warn!("undecodable detail of proposal {address}: {err}");
                None
            });
            page.push(self.proposal_info(
                address,
                &proposal,
                detail.as_ref(),
                &cursor.info,
                None,
                cursor.now,
            ));
        }
        page.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        Ok(page)
    }

    /// pages of the multisig's proposals, each page sorted newest first
    ///
    /// accounts are fetched one page at a time, dropping the stream stops the scan
    pub fn proposal_pages(
        &self,
        multisig: Pubkey,
        page_size: usize,
    ) -> impl Stream<Item = Result<Vec<ProposalInfo>>> + '_ {
        let page_size = page_size.clamp(1, MAX_MULTIPLE_ACCOUNTS);
        stream::unfold(Scan::Start, move |state| async move {
            let mut cursor = match state {
                Scan::Done => return None,
                Scan::Start => match self.scan_cursor(&multisig).await {
                    Ok(cursor) => cursor,
                    Err(err) => return Some((Err(err), Scan::Done)),
                },
                Scan::Paging(cursor) => cursor,
            };
            if cursor.offset >= cursor.keys.len() {
                return None;
            }
            let end = cursor.offset.saturating_add(page_size).min(cursor.keys.len());
            let page = self.load_page(&cursor, &cursor.keys[cursor.offset..end]).await;
            cursor.offset = end;
            match page {
                Ok(page) => Some((Ok(page), Scan::Paging(cursor))),
                Err(err) => Some((Err(err), Scan::Done)),
            }
        })
    }

    /// every proposal of the multisig, newest first
    pub async fn list_proposals(&self, multisig: &Pubkey) -> Result<Vec<ProposalInfo>> {
        let pages: Vec<Vec<ProposalInfo>> = self
            .proposal_pages(*multisig, MAX_MULTIPLE_ACCOUNTS)
            .try_collect()
            .await?;
        let mut proposals = pages.into_iter().flatten().collect::<Vec<_>>();
        proposals.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        Ok(proposals)
    }

    /// activity of a proposal reconstructed from its history, newest first
    ///
    /// # Parameters
    ///
    /// `before`: continue from this signature, used for pagination
    pub async fn activity(
        &self,
        proposal: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<ActivityItem>> {
        // cancelled proposals are closed, their items then carry no owner
        let owners: Vec<Owner> = match self.fetch_proposal(proposal).await {
            Ok(loaded) => loaded
                .multisig
                .live_owners()
                .into_iter()
                .map(|(address, name)| Owner { address, name })
                .collect(),
            Err(MultisigError::NotFound(what)) => {
                log::debug!("{what} no longer exists, owners unresolved");
                vec![]
            }
            Err(err) => return Err(err),
        };
        let signatures = self
            .rpc
            .get_signatures_for_address(proposal, before, limit)
            .await?;
        let fetched = futures::future::join_all(
            signatures.iter().map(|signature| self.rpc.get_transaction(signature)),
        )
        .await;
        let mut items = Vec::with_capacity(fetched.len());
        for (signature, tx) in signatures.iter().zip(fetched) {
            match tx? {
                Some(tx) => items.extend(parse_activity(&self.program_id(), &owners, &tx)),
                None => log::warn!("transaction {signature} unavailable, skipping"),
            }
        }
        sort_activity(&mut items);
        Ok(items)
    }

    /// estimated lamports an action costs its fee payer
    pub async fn fees(&self, action: MultisigAction) -> Result<TransactionFees> {
        let schedule = self
            .settings
            .map(|settings| settings.fees())
            .unwrap_or_default();
        let (signatures, rent_sizes, multisig_fee): (u64, &[usize], u64) = match action {
            MultisigAction::CreateMultisig => (2, &[MULTISIG_ACCOUNT_SIZE], schedule.create_multisig),
            // an edit is proposed like any other payload
            MultisigAction::CreateTransaction | MultisigAction::EditMultisig => (
                2,
                &[PROPOSAL_ACCOUNT_SIZE, TRANSACTION_DETAIL_ACCOUNT_SIZE],
                schedule.create_transaction,
            ),
            MultisigAction::CancelTransaction => (1, &[], schedule.cancel_transaction),
            MultisigAction::ApproveTransaction => (1, &[], schedule.approve_transaction),
            MultisigAction::RejectTransaction => (1, &[], schedule.reject_transaction),
            MultisigAction::ExecuteTransaction => (1, &[], schedule.execute_transaction),
        };
        let mut rent_exempt = 0u64;
        for size in rent_sizes {
            rent_exempt = rent_exempt.saturating_add(
                self.rpc
                    .get_minimum_balance_for_rent_exemption(*size)
                    .await?,
            );
        }
        Ok(TransactionFees {
            network_fee: signatures * LAMPORTS_PER_SIGNATURE,
            rent_exempt,
            multisig_fee,
        })
    }

    /// # Returns
    ///
    /// the transaction co-signed by the new multisig key, and the multisig address
    pub async fn create_multisig(
        &self,
        payer: &Pubkey,
        params: &MultisigParams,
        funding_lamports: Option<u64>,
    ) -> Result<(Transaction, Pubkey)> {
        params.validate()?;
        let blockhash = self.rpc.get_latest_blockhash().await?;
        builder::create_multisig(&self.accounts, payer, params, funding_lamports, blockhash)
    }

    /// the instruction replacing owner set and policy, to be embedded in a proposal
    pub async fn edit_multisig_instruction(
        &self,
        multisig: &Pubkey,
        params: &MultisigParams,
    ) -> Result<Instruction> {
        params.validate()?;
        let mut ms = require_v2_multisig(self.fetch_multisig(multisig).await?)?;
        transitions::edit_multisig(&mut ms, &params.edit_args())?;
        builder::edit_multisig_instruction(&self.accounts, multisig, params)
    }

    /// # Parameters
    ///
    /// `pre_instructions`: prepended to the transaction, e.g. to create accounts the payload uses
    ///
    /// # Returns
    ///
    /// the transaction co-signed by the new proposal key, and the proposal address
    pub async fn create_transaction(
        &self,
        proposer: &Pubkey,
        multisig: &Pubkey,
        params: &ProposalParams,
        pre_instructions: &[Instruction],
    ) -> Result<(Transaction, Pubkey)> {
        params.validate()?;
        let mut ms = require_v2_multisig(self.fetch_multisig(multisig).await?)?;
        let now = self.now().await?;
        let earliest = now.saturating_add(ms.cool_off_period_in_seconds);
        if params.expiration_date > 0 && params.expiration_date < earliest {
            return Err(ValidationError::ExpirationBeforeCoolOff {
                expiration: params.expiration_date,
                earliest,
            }
            .into());
        }
        let (proposal, _) =
            transitions::create_transaction(&mut ms, multisig, proposer, &params.args(), now)?;
        let size = proposal.encode()?.len();
        if size > PROPOSAL_ACCOUNT_SIZE {
            return Err(ValidationError::ProposalTooLarge {
                size,
                max: PROPOSAL_ACCOUNT_SIZE,
            }
            .into());
        }
        let rent = self
            .rpc
            .get_minimum_balance_for_rent_exemption(PROPOSAL_ACCOUNT_SIZE)
            .await?;
        let blockhash = self.rpc.get_latest_blockhash().await?;
        builder::create_transaction(
            &self.accounts,
            proposer,
            multisig,
            params,
            pre_instructions,
            rent,
            blockhash,
        )
    }

    pub async fn vote(&self, owner: &Pubkey, proposal: &Pubkey, vote: Vote) -> Result<Transaction> {
        let loaded = self.fetch_proposal(proposal).await?;
        let multisig = loaded.proposal.multisig();
        let ms = require_v2_multisig(loaded.multisig)?;
        let mut tx = require_v2_proposal(loaded.proposal)?;
        let detail = loaded
            .detail
            .ok_or_else(|| MultisigError::NotFound(format!("detail of proposal {proposal}")))?;
        if let Some(idx) = ms.owner_index(owner) {
            if tx.signers.get(idx).is_some_and(|v| *v != VOTE_NONE) {
                return Err(ValidationError::AlreadyVoted(*owner).into());
            }
        }
        let status = transitions::vote(&ms, &mut tx, &detail, owner, vote, self.now().await?)?;
        log::debug!("{vote:?} by {owner} leaves proposal {proposal} {status}");
        let blockhash = self.rpc.get_latest_blockhash().await?;
        builder::vote(&self.accounts, owner, &multisig, proposal, vote, blockhash)
    }

    pub async fn approve(&self, owner: &Pubkey, proposal: &Pubkey) -> Result<Transaction> {
        self.vote(owner, proposal, Vote::Approve).await
    }

    pub async fn reject(&self, owner: &Pubkey, proposal: &Pubkey) -> Result<Transaction> {
        self.vote(owner, proposal, Vote::Reject).await
    }

    pub async fn cancel_transaction(&self, proposer: &Pubkey, proposal: &Pubkey) -> Result<Transaction> {
        let loaded = self.fetch_proposal(proposal).await?;
        let multisig = loaded.proposal.multisig();
        let mut ms = require_v2_multisig(loaded.multisig)?;
        let tx = require_v2_proposal(loaded.proposal)?;
        transitions::cancel_transaction(&mut ms, &tx, proposer)?;
        let blockhash = self.rpc.get_latest_blockhash().await?;
        builder::cancel_transaction(&self.accounts, proposer, &multisig, proposal, blockhash)
    }

    /// builds the execution, generating signer keys when the payload has placeholder slots
    ///
    /// # Returns
    ///
    /// the transaction and the generated keys, empty without placeholders
    pub async fn execute_transaction(
        &self,
        payer: &Pubkey,
        proposal: &Pubkey,
    ) -> Result<(Transaction, Vec<Pubkey>)> {
        let loaded = self.fetch_proposal(proposal).await?;
        let now = self.now().await?;
        let policy = QuorumPolicy::from(&loaded.multisig);
        let status = proposal_status(
            &policy,
            &VoteState::from(&loaded.proposal),
            loaded.detail.as_ref(),
            now,
        );
        ensure_executable(status, policy.cool_off_period_in_seconds)?;
        let multisig = loaded.proposal.multisig();
        let mut ms = require_v2_multisig(loaded.multisig)?;
        let mut tx = require_v2_proposal(loaded.proposal)?;
        let instructions = tx.instructions.clone();
        let blockhash = self.rpc.get_latest_blockhash().await?;
        let (built, replacements) = if placeholder_count(&instructions) > 0 {
            builder::execute_transaction_with_replacements(
                &self.accounts,
                payer,
                &multisig,
                proposal,
                &instructions,
                blockhash,
            )?
        } else {
            let built = builder::execute_transaction(
                &self.accounts,
                payer,
                &multisig,
                proposal,
                &instructions,
                blockhash,
            )?;
            (built, vec![])
        };
        let mut replaced = instructions;
        transitions::apply_replacements(&mut replaced, &replacements)?;
        tx.instructions = replaced;
        let (authority, _) = derive_authority(&self.program_id(), &multisig);
        let remaining = builder::remaining_accounts(&tx.instructions, &authority)
            .into_iter()
            .map(|meta| meta.pubkey)
            .collect::<Vec<_>>();
        transitions::execute_transaction(&mut ms, &mut tx, loaded.detail.as_ref(), &remaining, now)?;
        Ok((built, replacements))
    }

    pub async fn update_settings(&self, authority: &Pubkey, args: UpdateSettingsArgs) -> Result<Transaction> {
        let mut settings = match self.settings {
            Some(SettingsAccount::V2(settings)) => settings,
            Some(SettingsAccount::V1(_)) => {
                return Err(ValidationError::LegacyAccount("Settings v1").into())
            }
            None => {
                return Err(MultisigError::NotFound(format!(
                    "settings account {}",
                    self.accounts.settings
                )))
            }
        };
        transitions::update_settings(&mut settings, authority, &args)?;
        let blockhash = self.rpc.get_latest_blockhash().await?;
        builder::update_settings(&self.accounts, authority, args, blockhash)
    }

    /// sends a fully signed transaction once, program errors are mapped into the taxonomy
    pub async fn submit(&self, transaction: &Transaction) -> Result<Signature> {
        match self.rpc.send_transaction(transaction).await {
            Ok(signature) => {
                log::info!("submitted {signature}");
                Ok(signature)
            }
            Err(SubmitError::Program { index, code }) => {
                log::error!("instruction {index} failed with program code {code}");
                // v1 settings mark a deployment that still raises the legacy table
                if matches!(self.settings, Some(SettingsAccount::V1(_))) {
                    Err(MultisigError::from_legacy_program_code(code))
                } else {
                    Err(MultisigError::from_program_code(code))
                }
            }
            Err(SubmitError::Transaction(err)) => {
                log::error!("transaction rejected: {err}");
                Err(MultisigError::Rejected(err.to_string()))
            }
            Err(SubmitError::Transport(err)) => Err(MultisigError::Rpc(err)),
        }
    }
}
