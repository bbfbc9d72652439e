use {
    super::{multisig::load_params, parse_pubkey, print_json, Session},
    anyhow::{Context, Result},
    futures::TryStreamExt,
    msig::{
        builder::ProposalParams, programs::multisig::pda::derive_authority,
        transitions::Vote, types::ProposalInfo, wallet::WalletSigner,
    },
    solana_sdk::{instruction::Instruction, signature::Signature, system_instruction},
    std::str::FromStr,
};

/// user facing fields shared by every proposal command
pub struct ProposalText {
    pub title: String,
    pub description: String,
    pub expiration_date: u64,
    pub operation: u8,
}

impl ProposalText {
    fn into_params(self, instructions: Vec<Instruction>) -> ProposalParams {
        ProposalParams {
            title: self.title,
            description: self.description,
            expiration_date: self.expiration_date,
            operation: self.operation,
            instructions,
        }
    }
}

pub async fn list_proposals(config_path: &str, multisig: &str) -> Result<()> {
    let session = Session::open(config_path).await?;
    let multisig = parse_pubkey("multisig", multisig)?;
    let pages: Vec<Vec<ProposalInfo>> = session
        .client
        .proposal_pages(multisig, session.config.page_size)
        .try_collect()
        .await?;
    let mut proposals = pages.into_iter().flatten().collect::<Vec<_>>();
    proposals.sort_by(|a, b| b.created_on.cmp(&a.created_on));
    print_json(&proposals)
}

pub async fn show_proposal(config_path: &str, proposal: &str, viewer: Option<&str>) -> Result<()> {
    let session = Session::open(config_path).await?;
    let proposal = parse_pubkey("proposal", proposal)?;
    let viewer = viewer.map(|v| parse_pubkey("viewer", v)).transpose()?;
    let info = session
        .client
        .get_proposal(&proposal, viewer.as_ref())
        .await?;
    print_json(&info)
}

pub async fn activity(
    config_path: &str,
    proposal: &str,
    before: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let session = Session::open(config_path).await?;
    let proposal = parse_pubkey("proposal", proposal)?;
    let before = before
        .map(|sig| Signature::from_str(sig).with_context(|| format!("invalid signature '{sig}'")))
        .transpose()?;
    let items = session
        .client
        .activity(
            &proposal,
            before,
            limit.unwrap_or(session.config.activity_limit),
        )
        .await?;
    print_json(&items)
}

async fn propose(
    session: &Session,
    keypair: Option<&str>,
    multisig: &str,
    text: ProposalText,
    instructions: Vec<Instruction>,
) -> Result<()> {
    let wallet = session.wallet(keypair)?;
    let multisig = parse_pubkey("multisig", multisig)?;
    let params = text.into_params(instructions);
    let (tx, proposal) = session
        .client
        .create_transaction(&wallet.address(), &multisig, &params, &[])
        .await?;
    let signature = session.sign_and_submit(tx, &wallet).await?;
    log::info!("created proposal {proposal}");
    print_json(&serde_json::json!({
        "signature": signature.to_string(),
        "proposal": proposal.to_string(),
    }))
}

pub async fn propose_transfer(
    config_path: &str,
    keypair: Option<&str>,
    multisig: &str,
    to: &str,
    lamports: u64,
    text: ProposalText,
) -> Result<()> {
    let session = Session::open(config_path).await?;
    let to = parse_pubkey("recipient", to)?;
    let (vault, _) = derive_authority(
        &session.client.program_id(),
        &parse_pubkey("multisig", multisig)?,
    );
    let transfer = system_instruction::transfer(&vault, &to, lamports);
    propose(&session, keypair, multisig, text, vec![transfer]).await
}

pub async fn propose_edit(
    config_path: &str,
    keypair: Option<&str>,
    multisig: &str,
    params: &str,
    text: ProposalText,
) -> Result<()> {
    let session = Session::open(config_path).await?;
    let params = load_params(params).await?;
    let edit = session
        .client
        .edit_multisig_instruction(&parse_pubkey("multisig", multisig)?, &params)
        .await?;
    propose(&session, keypair, multisig, text, vec![edit]).await
}

async fn vote(config_path: &str, keypair: Option<&str>, proposal: &str, vote: Vote) -> Result<()> {
    let session = Session::open(config_path).await?;
    let wallet = session.wallet(keypair)?;
    let proposal = parse_pubkey("proposal", proposal)?;
    let tx = session
        .client
        .vote(&wallet.address(), &proposal, vote)
        .await?;
    let signature = session.sign_and_submit(tx, &wallet).await?;
    print_json(&serde_json::json!({ "signature": signature.to_string() }))
}

pub async fn approve(config_path: &str, keypair: Option<&str>, proposal: &str) -> Result<()> {
    vote(config_path, keypair, proposal, Vote::Approve).await
}

pub async fn reject(config_path: &str, keypair: Option<&str>, proposal: &str) -> Result<()> {
    vote(config_path, keypair, proposal, Vote::Reject).await
}

pub async fn cancel(config_path: &str, keypair: Option<&str>, proposal: &str) -> Result<()> {
    let session = Session::open(config_path).await?;
    let wallet = session.wallet(keypair)?;
    let proposal = parse_pubkey("proposal", proposal)?;
    let tx = session
        .client
        .cancel_transaction(&wallet.address(), &proposal)
        .await?;
    let signature = session.sign_and_submit(tx, &wallet).await?;
    log::info!("cancelled proposal {proposal}");
    print_json(&serde_json::json!({ "signature": signature.to_string() }))
}

pub async fn execute(config_path: &str, keypair: Option<&str>, proposal: &str) -> Result<()> {
    let session = Session::open(config_path).await?;
    let wallet = session.wallet(keypair)?;
    let proposal = parse_pubkey("proposal", proposal)?;
    let (tx, replacements) = session
        .client
        .execute_transaction(&wallet.address(), &proposal)
        .await?;
    let signature = session.sign_and_submit(tx, &wallet).await?;
    log::info!("executed proposal {proposal}");
    print_json(&serde_json::json!({
        "signature": signature.to_string(),
        "replacements": replacements.iter().map(ToString::to_string).collect::<Vec<_>>(),
    }))
}
