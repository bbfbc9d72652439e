mod cli;
pub mod commands;

use {
    anyhow::Result,
    clap::Parser,
    cli::{Cli, Commands},
    msig::logger::{init_log, rotate_log_file, LogOpts},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // only preserve logs of the single most recent execution
    rotate_log_file(&cli.log_file).await;
    init_log(LogOpts {
        level: cli.log_level.clone(),
        file: cli.log_file.clone(),
    });

    process_command(cli).await
}

async fn process_command(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_str();
    let keypair = cli.keypair.as_deref();
    match cli.command {
        Commands::NewConfig => commands::config::new_config(config_path).await,
        Commands::ShowMultisig { multisig } => {
            commands::multisig::show_multisig(config_path, &multisig).await
        }
        Commands::ListMultisigs { owner } => {
            commands::multisig::list_multisigs(config_path, owner.as_deref()).await
        }
        Commands::ListProposals { multisig } => {
            commands::proposal::list_proposals(config_path, &multisig).await
        }
        Commands::ShowProposal { proposal, viewer } => {
            commands::proposal::show_proposal(config_path, &proposal, viewer.as_deref()).await
        }
        Commands::Activity {
            proposal,
            before,
            limit,
        } => commands::proposal::activity(config_path, &proposal, before.as_deref(), limit).await,
        Commands::Fees { action } => commands::multisig::fees(config_path, action).await,
        Commands::CreateMultisig { params, funding } => {
            commands::multisig::create_multisig(config_path, keypair, &params, funding).await
        }
        Commands::ProposeTransfer {
            multisig,
            to,
            lamports,
            title,
            description,
            expiration_date,
            operation,
        } => {
            commands::proposal::propose_transfer(
                config_path,
                keypair,
                &multisig,
                &to,
                lamports,
                commands::proposal::ProposalText {
                    title,
                    description,
                    expiration_date,
                    operation,
                },
            )
            .await
        }
        Commands::ProposeEdit {
            multisig,
            params,
            title,
            description,
            expiration_date,
            operation,
        } => {
            commands::proposal::propose_edit(
                config_path,
                keypair,
                &multisig,
                &params,
                commands::proposal::ProposalText {
                    title,
                    description,
                    expiration_date,
                    operation,
                },
            )
            .await
        }
        Commands::Approve { proposal } => {
            commands::proposal::approve(config_path, keypair, &proposal).await
        }
        Commands::Reject { proposal } => {
            commands::proposal::reject(config_path, keypair, &proposal).await
        }
        Commands::Cancel { proposal } => {
            commands::proposal::cancel(config_path, keypair, &proposal).await
        }
        Commands::Execute { proposal } => {
            commands::proposal::execute(config_path, keypair, &proposal).await
        }
    }
}
