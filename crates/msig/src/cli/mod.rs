use {
    clap::{Parser, Subcommand},
    msig::types::MultisigAction,
};

#[derive(Parser)]
#[command(name = "msig", about = "multisig proposal client")]
pub struct Cli {
    #[arg(long, default_value = "info", help = "log verbosity to use")]
    pub log_level: String,

    #[arg(long, default_value = "", help = "optionally output logs to this file")]
    pub log_file: String,

    #[arg(long, default_value = "config.yaml")]
    pub config: String,

    #[arg(long, global = true, help = "keypair file overriding the configured signer")]
    pub keypair: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "initialize a new config file")]
    NewConfig,

    #[command(about = "show a multisig and its vault balance")]
    ShowMultisig {
        #[arg(long, help = "multisig account address")]
        multisig: String,
    },

    #[command(about = "list multisigs, optionally only those an owner belongs to")]
    ListMultisigs {
        #[arg(long, help = "only include multisigs with this owner")]
        owner: Option<String>,
    },

    #[command(about = "list the proposals of a multisig, newest first")]
    ListProposals {
        #[arg(long, help = "multisig account address")]
        multisig: String,
    },

    #[command(about = "show a single proposal with its decoded payload")]
    ShowProposal {
        #[arg(long, help = "proposal account address")]
        proposal: String,

        #[arg(long, help = "report whether this owner has voted")]
        viewer: Option<String>,
    },

    #[command(about = "show the activity history of a proposal")]
    Activity {
        #[arg(long, help = "proposal account address")]
        proposal: String,

        #[arg(long, help = "continue from this signature")]
        before: Option<String>,

        #[arg(long, help = "max number of history entries to fetch")]
        limit: Option<usize>,
    },

    #[command(about = "estimate the lamports an action costs")]
    Fees {
        #[arg(long, value_enum)]
        action: MultisigAction,
    },

    #[command(
        about = "create a new multisig",
        long_about = "owners, threshold and label are read from a yaml file"
    )]
    CreateMultisig {
        #[arg(long, help = "yaml file containing the multisig parameters")]
        params: String,

        #[arg(long, help = "lamports to deposit into the vault")]
        funding: Option<u64>,
    },

    #[command(about = "propose moving lamports out of the vault")]
    ProposeTransfer {
        #[arg(long, help = "multisig account address")]
        multisig: String,

        #[arg(long, help = "recipient of the transfer")]
        to: String,

        #[arg(long)]
        lamports: u64,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "0", help = "unix seconds, 0 for no expiry")]
        expiration_date: u64,

        #[arg(long, default_value = "0", help = "application defined operation tag")]
        operation: u8,
    },

    #[command(
        about = "propose replacing the owners and policy of a multisig",
        long_about = "the new parameters are read from a yaml file"
    )]
    ProposeEdit {
        #[arg(long, help = "multisig account address")]
        multisig: String,

        #[arg(long, help = "yaml file containing the new multisig parameters")]
        params: String,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "0", help = "unix seconds, 0 for no expiry")]
        expiration_date: u64,

        #[arg(long, default_value = "0", help = "application defined operation tag")]
        operation: u8,
    },

    #[command(about = "approve a proposal")]
    Approve {
        #[arg(long, help = "proposal account address")]
        proposal: String,
    },

    #[command(about = "reject a proposal")]
    Reject {
        #[arg(long, help = "proposal account address")]
        proposal: String,
    },

    #[command(about = "cancel a proposal you created")]
    Cancel {
        #[arg(long, help = "proposal account address")]
        proposal: String,
    },

    #[command(about = "execute a passed proposal")]
    Execute {
        #[arg(long, help = "proposal account address")]
        proposal: String,
    },
}
