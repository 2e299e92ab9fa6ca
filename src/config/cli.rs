use crate::config::toml_config::{ConsoleConfig, PRODUCTION_BASE_URL};
use crate::domain::model::{CategoryKind, UnauthorizedPolicy};
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "acme-console")]
#[command(about = "Session-aware client for the ACME inventory and company records API")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides the config file)
    #[arg(long, global = true, env = "ACME_API_BASE_URL")]
    pub base_url: Option<String>,

    /// Use the hosted production API instead of the local development server
    #[arg(long, global = true, conflicts_with = "base_url")]
    pub production: bool,

    /// Where the session token is persisted
    #[arg(long, global = true)]
    pub token_file: Option<String>,

    /// Reaction to 401 responses: refresh_and_retry or clear_and_redirect
    #[arg(long, global = true)]
    pub policy: Option<UnauthorizedPolicy>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sign in and persist the access token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "ACME_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the stored session
    Logout,
    /// Show the current session state
    Status,
    /// Check whether a dashboard route may be opened
    Open { path: String },
    #[command(subcommand)]
    Inventory(InventoryCommand),
    #[command(subcommand)]
    Companies(CompaniesCommand),
    #[command(subcommand)]
    Records(RecordsCommand),
    /// Company ledger with dated amounts, as listed on the dashboard
    #[command(subcommand)]
    Ledger(LedgerCommand),
    /// Download a PDF report
    Report(ReportArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum InventoryCommand {
    List {
        #[arg(long)]
        outgoing: bool,
    },
    AddMain {
        #[arg(long, default_value = "incoming")]
        kind: CategoryKind,
        #[arg(long)]
        name: String,
    },
    AddSub {
        #[arg(long, default_value = "incoming")]
        kind: CategoryKind,
        #[arg(long)]
        main: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        details: String,
        #[arg(long)]
        price: String,
    },
    DeleteMain {
        #[arg(long, default_value = "outgoing")]
        kind: CategoryKind,
        #[arg(long)]
        main: String,
        #[arg(long)]
        yes: bool,
    },
    DeleteSub {
        #[arg(long, default_value = "outgoing")]
        kind: CategoryKind,
        #[arg(long)]
        main: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum CompaniesCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Show { id: String },
    Add { name: String },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RecordFields {
    #[arg(long)]
    pub invoice_no: String,
    #[arg(long)]
    pub container_no: String,
    #[arg(long)]
    pub product: String,
    #[arg(long, default_value = "")]
    pub advance: String,
    #[arg(long, default_value = "")]
    pub cheque_number: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum RecordsCommand {
    Add {
        #[arg(long)]
        company: String,
        #[command(flatten)]
        fields: RecordFields,
    },
    Update {
        #[arg(long)]
        company: String,
        #[arg(long)]
        record: String,
        #[command(flatten)]
        fields: RecordFields,
    },
    Delete {
        #[arg(long)]
        company: String,
        #[arg(long)]
        record: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct EntryArgs {
    /// Entry date (YYYY-MM-DD), today when omitted
    #[arg(long)]
    pub date: Option<String>,
    /// Amount; thousands separators are accepted
    #[arg(long)]
    pub amount: String,
    #[arg(long)]
    pub description: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum LedgerCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    AddCompany { name: String },
    DeleteCompany {
        name: String,
        #[arg(long)]
        yes: bool,
    },
    AddEntry {
        #[arg(long)]
        company: String,
        #[command(flatten)]
        entry: EntryArgs,
    },
    EditEntry {
        #[arg(long)]
        company: String,
        #[arg(long)]
        record: String,
        #[command(flatten)]
        entry: EntryArgs,
    },
    DeleteEntry {
        #[arg(long)]
        company: String,
        #[arg(long)]
        record: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportTarget {
    Summary,
    Outgoing,
    Company,
    Full,
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[arg(value_enum)]
    pub target: ReportTarget,
    /// Company id, required for the company report
    #[arg(long)]
    pub company: Option<String>,
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,
}

impl CliConfig {
    /// Loads the config file (if any) and applies command-line overrides.
    pub fn resolve(&self) -> Result<ConsoleConfig> {
        let mut config = match &self.config {
            Some(path) => ConsoleConfig::from_file(path)?,
            None => ConsoleConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        } else if self.production {
            config.api.base_url = PRODUCTION_BASE_URL.to_string();
        }
        if let Some(token_file) = &self.token_file {
            config.session.token_file = token_file.clone();
        }
        if let Some(policy) = self.policy {
            config.session.unauthorized_policy = policy;
        }

        Ok(config)
    }
}
