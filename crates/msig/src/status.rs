//! derives the lifecycle status of a proposal from its votes, the multisig policy and the clock
use {
    crate::{
        error::MultisigError,
        programs::multisig::{
            accounts::{MultisigAccount, MultisigV2, ProposalAccount, TransactionDetail, TransactionV2},
            VOTE_APPROVE, VOTE_REJECT,
        },
    },
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    Active,
    Passed,
    Queued,
    Executed,
    Failed,
    Voided,
    Expired,
    Unknown,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Passed => "passed",
            Self::Queued => "queued",
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::Voided => "voided",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// status byte cached inside the proposal account by the program
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum OnChainProposalStatus {
    #[default]
    NotDefined = 0,
    Active = 1,
    Passed = 2,
    Executed = 3,
    Failed = 4,
}

impl OnChainProposalStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotDefined),
            1 => Some(Self::Active),
            2 => Some(Self::Passed),
            3 => Some(Self::Executed),
            4 => Some(Self::Failed),
            _ => None,
        }
    }
}

/// the parts of a multisig that take part in status computation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuorumPolicy {
    pub threshold: u64,
    pub owner_set_seqno: u32,
    pub live_owner_count: usize,
    pub cool_off_period_in_seconds: u64,
}

impl From<&MultisigV2> for QuorumPolicy {
    fn from(value: &MultisigV2) -> Self {
        Self {
            threshold: value.threshold,
            owner_set_seqno: value.owner_set_seqno,
            live_owner_count: value.live_owner_count(),
            cool_off_period_in_seconds: value.cool_off_period_in_seconds,
        }
    }
}

impl From<&MultisigAccount> for QuorumPolicy {
    fn from(value: &MultisigAccount) -> Self {
        Self {
            threshold: value.threshold(),
            owner_set_seqno: value.owner_set_seqno(),
            live_owner_count: value.live_owners().len(),
            cool_off_period_in_seconds: value.cool_off_period_in_seconds(),
        }
    }
}

/// the parts of a proposal that take part in status computation
#[derive(Clone, Copy, Debug)]
pub struct VoteState<'a> {
    pub signers: &'a [u8],
    pub owner_set_seqno: u32,
    pub executed_on: u64,
    pub cached: OnChainProposalStatus,
    pub last_passed_timestamp: u64,
}

impl<'a> From<&'a TransactionV2> for VoteState<'a> {
    fn from(value: &'a TransactionV2) -> Self {
        Self {
            signers: &value.signers,
            owner_set_seqno: value.owner_set_seqno,
            executed_on: value.executed_on,
            cached: value.cached_status(),
            last_passed_timestamp: value.last_passed_timestamp,
        }
    }
}

impl<'a> From<&'a ProposalAccount> for VoteState<'a> {
    fn from(value: &'a ProposalAccount) -> Self {
        Self {
            signers: value.signers(),
            owner_set_seqno: value.owner_set_seqno(),
            executed_on: value.executed_on(),
            cached: value.cached_status(),
            last_passed_timestamp: value.last_passed_timestamp(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub approvals: usize,
    pub rejections: usize,
}

/// counts votes over the first `live_owner_count` slots only
pub fn tally(signers: &[u8], live_owner_count: usize) -> VoteTally {
    signers
        .iter()
        .take(live_owner_count)
        .fold(VoteTally::default(), |mut tally, vote| {
            match *vote {
                VOTE_APPROVE => tally.approvals += 1,
                VOTE_REJECT => tally.rejections += 1,
                _ => {}
            }
            tally
        })
}

/// # Parameters
///
/// `detail`: the proposal's detail record, when missing the proposal never expires
/// `now`: unix seconds taken from the ledger clock
pub fn proposal_status(
    policy: &QuorumPolicy,
    proposal: &VoteState<'_>,
    detail: Option<&TransactionDetail>,
    now: u64,
) -> ProposalStatus {
    if proposal.executed_on > 0 || proposal.cached == OnChainProposalStatus::Executed {
        return ProposalStatus::Executed;
    }
    let cool_off = policy.cool_off_period_in_seconds;
    let cool_off_elapsed = proposal.last_passed_timestamp > 0
        && now >= proposal.last_passed_timestamp.saturating_add(cool_off);
    // once queued, later owner set changes or expiry no longer apply
    if proposal.cached == OnChainProposalStatus::Passed && cool_off > 0 && cool_off_elapsed {
        return ProposalStatus::Queued;
    }
    if policy.threshold == 0 || policy.live_owner_count == 0 {
        return ProposalStatus::Unknown;
    }
    if proposal.owner_set_seqno != policy.owner_set_seqno {
        return ProposalStatus::Voided;
    }
    let expiration = detail.map(|d| d.expiration_date).unwrap_or_default();
    if expiration > 0 && now > expiration {
        return ProposalStatus::Expired;
    }
    let votes = tally(proposal.signers, policy.live_owner_count);
    if votes.approvals as u64 >= policy.threshold {
        if cool_off > 0 && cool_off_elapsed {
            return ProposalStatus::Queued;
        }
        return ProposalStatus::Passed;
    }
    if ((policy.live_owner_count - votes.rejections.min(policy.live_owner_count)) as u64)
        < policy.threshold
    {
        return ProposalStatus::Failed;
    }
    ProposalStatus::Active
}

/// whether an execution may be submitted for a proposal in this status
pub fn is_executable(status: ProposalStatus, cool_off_period_in_seconds: u64) -> bool {
    match status {
        ProposalStatus::Queued => true,
        ProposalStatus::Passed => cool_off_period_in_seconds == 0,
        _ => false,
    }
}

pub fn ensure_executable(
    status: ProposalStatus,
    cool_off_period_in_seconds: u64,
) -> Result<(), MultisigError> {
    if is_executable(status, cool_off_period_in_seconds) {
        return Ok(());
    }
    Err(match status {
        ProposalStatus::Voided => {
            MultisigError::StaleState("owner set changed after the proposal was created".into())
        }
        ProposalStatus::Expired => MultisigError::ExpiredProposal("proposal has expired".into()),
        ProposalStatus::Executed => MultisigError::AlreadyTerminal(format!("proposal is {status}")),
        ProposalStatus::Failed => {
            MultisigError::Quorum("enough owners rejected that the threshold can no longer be met".into())
        }
        ProposalStatus::Passed => MultisigError::CoolOffNotReached(format!(
            "proposal passed but the {cool_off_period_in_seconds}s cool off has not elapsed"
        )),
        _ => MultisigError::Quorum(format!("proposal is {status}")),
    })
}
