use acme_console::config::cli::{
    Command, CompaniesCommand, EntryArgs, InventoryCommand, LedgerCommand, RecordFields,
    RecordsCommand, ReportArgs, ReportTarget,
};
use acme_console::core::client::ApiSettings;
use acme_console::core::resources::filter_by_name;
use acme_console::domain::model::{
    CategoryRef, CompanyRecord, Credentials, EntryForm, GuardDecision, NewCompany,
    NewMainCategory, NewSubcategory, ReportKind, SubcategoryRef, View,
};
use acme_console::domain::ports::ConfigProvider;
use acme_console::utils::error::ErrorSeverity;
use acme_console::utils::{logger, validation::Validate};
use acme_console::{
    ApiClient, Authenticator, CliConfig, CompaniesApi, ConsoleError, FileTokenStore,
    HistoryNavigator, InventoryApi, LedgerApi, ReportsApi, Result, SessionService,
    TerminalNotifier,
};
use clap::Parser;
use serde_json::Value;
use std::sync::Arc;

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

fn confirm(yes: bool, what: &str) -> Result<()> {
    if yes {
        return Ok(());
    }
    Err(ConsoleError::validation(format!(
        "Refusing to delete {} without --yes. This action cannot be undone.",
        what
    )))
}

/// Protected commands pass the route guard first, like a protected view would.
fn guard(session: &SessionService, view: View) -> Result<()> {
    match session.require_auth(&view) {
        GuardDecision::Proceed => Ok(()),
        GuardDecision::Redirect(_) => Err(ConsoleError::NoCredential),
    }
}

fn record_from(fields: RecordFields) -> CompanyRecord {
    CompanyRecord {
        invoice_no: fields.invoice_no,
        container_no: fields.container_no,
        product: fields.product,
        advance: fields.advance,
        cheque_number: fields.cheque_number,
    }
}

fn entry_from(args: EntryArgs) -> EntryForm {
    EntryForm {
        date: args
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive().to_string()),
        amount: args.amount,
        description: args.description,
    }
}

fn report_kind(args: &ReportArgs) -> Result<ReportKind> {
    Ok(match args.target {
        ReportTarget::Summary => ReportKind::CompanySummary,
        ReportTarget::Outgoing => ReportKind::Outgoing,
        ReportTarget::Full => ReportKind::Full,
        ReportTarget::Company => match &args.company {
            Some(id) => ReportKind::Company(id.clone()),
            None => {
                return Err(ConsoleError::validation(
                    "--company is required for the company report",
                ))
            }
        },
    })
}

async fn run(command: Command, api: Arc<ApiClient>, navigator: &HistoryNavigator) -> Result<()> {
    let session = api.session().clone();

    match command {
        Command::Login { username, password } => {
            let auth = Authenticator::new(api.clone());
            auth.login(&Credentials::new(username, password)).await?;
            println!("✅ Signed in");
        }
        Command::Logout => {
            Authenticator::new(api.clone()).logout()?;
            println!("👋 Signed out");
        }
        Command::Status => {
            let status = serde_json::json!({
                "state": session.state(),
                "token_present": session.get_token().is_some(),
                "authenticated_since": session.authenticated_since(),
                "policy": api.settings().policy,
            });
            print_json(&status);
        }
        Command::Open { path } => {
            let view = View::from_path(&path);
            match session.require_auth(&view) {
                GuardDecision::Proceed => println!("✅ {} may be opened", view),
                GuardDecision::Redirect(to) => println!("↪️  {} redirects to {}", view, to),
            }
        }
        Command::Inventory(cmd) => {
            let inventory = InventoryApi::new(api.clone());
            match cmd {
                InventoryCommand::List { outgoing } => {
                    guard(&session, View::Dashboard)?;
                    let items = if outgoing {
                        inventory.outgoing().await?
                    } else {
                        inventory.list().await?
                    };
                    print_json(&Value::Array(items));
                }
                InventoryCommand::AddMain { kind, name } => {
                    guard(&session, View::AddMainCategory)?;
                    inventory
                        .add_main_category(&NewMainCategory { kind, name })
                        .await?;
                    println!("✅ Main category added successfully!");
                }
                InventoryCommand::AddSub {
                    kind,
                    main,
                    name,
                    details,
                    price,
                } => {
                    guard(&session, View::AddSubcategory)?;
                    inventory
                        .add_subcategory(&NewSubcategory {
                            kind,
                            main_category_name: main,
                            sub_category_name: name,
                            details,
                            price,
                        })
                        .await?;
                    println!("✅ Subcategory added successfully!");
                }
                InventoryCommand::DeleteMain { kind, main, yes } => {
                    guard(&session, View::Dashboard)?;
                    confirm(yes, &format!("\"{}\"", main))?;
                    inventory
                        .delete_main_category(&CategoryRef {
                            kind,
                            main_category_name: main.clone(),
                        })
                        .await?;
                    println!("🗑️  \"{}\" has been deleted.", main);
                }
                InventoryCommand::DeleteSub {
                    kind,
                    main,
                    name,
                    yes,
                } => {
                    guard(&session, View::Dashboard)?;
                    confirm(yes, &format!("\"{}\" under \"{}\"", name, main))?;
                    inventory
                        .delete_subcategory(&SubcategoryRef {
                            kind,
                            main_category_name: main.clone(),
                            sub_category_name: name.clone(),
                        })
                        .await?;
                    println!("🗑️  \"{}\" under \"{}\" has been deleted.", name, main);
                }
            }
        }
        Command::Companies(cmd) => {
            let companies = CompaniesApi::new(api.clone());
            match cmd {
                CompaniesCommand::List { search } => {
                    guard(&session, View::Companies)?;
                    let mut list = companies.names().await?;
                    if let Some(term) = search {
                        list = filter_by_name(list, &term);
                    }
                    print_json(&Value::Array(list));
                }
                CompaniesCommand::Show { id } => {
                    guard(&session, View::CompanyDetails(id.clone()))?;
                    print_json(&companies.details(&id).await?);
                }
                CompaniesCommand::Add { name } => {
                    guard(&session, View::Companies)?;
                    companies.add(&NewCompany { name }).await?;
                    println!("✅ Company added successfully!");
                }
                CompaniesCommand::Delete { id, yes } => {
                    guard(&session, View::Companies)?;
                    confirm(yes, &format!("company {}", id))?;
                    companies.delete(&id).await?;
                    println!("🗑️  Company has been deleted.");
                }
            }
        }
        Command::Records(cmd) => {
            let companies = CompaniesApi::new(api.clone());
            match cmd {
                RecordsCommand::Add { company, fields } => {
                    guard(&session, View::CompanyDetails(company.clone()))?;
                    companies.add_record(&company, record_from(fields)).await?;
                    println!("✅ Record added!");
                }
                RecordsCommand::Update {
                    company,
                    record,
                    fields,
                } => {
                    guard(&session, View::CompanyDetails(company.clone()))?;
                    companies
                        .update_record(&company, &record, record_from(fields))
                        .await?;
                    println!("✅ Record updated!");
                }
                RecordsCommand::Delete {
                    company,
                    record,
                    yes,
                } => {
                    guard(&session, View::CompanyDetails(company.clone()))?;
                    confirm(yes, &format!("record {}", record))?;
                    companies.delete_record(&company, &record).await?;
                    println!("🗑️  Record has been deleted.");
                }
            }
        }
        Command::Ledger(cmd) => {
            guard(&session, View::Dashboard)?;
            let ledger = LedgerApi::new(api.clone());
            match cmd {
                LedgerCommand::List { search } => {
                    let mut list = ledger.companies().await?;
                    if let Some(term) = search {
                        list = filter_by_name(list, &term);
                    }
                    print_json(&Value::Array(list));
                }
                LedgerCommand::AddCompany { name } => {
                    ledger.add_company(&name).await?;
                    println!("✅ Company added successfully!");
                }
                LedgerCommand::DeleteCompany { name, yes } => {
                    confirm(yes, &format!("\"{}\"", name))?;
                    ledger.delete_company(&name).await?;
                    println!("🗑️  \"{}\" has been deleted.", name);
                }
                LedgerCommand::AddEntry { company, entry } => {
                    ledger.add_entry(&company, entry_from(entry)).await?;
                    println!("✅ Record added successfully!");
                }
                LedgerCommand::EditEntry {
                    company,
                    record,
                    entry,
                } => {
                    ledger.edit_entry(&company, &record, entry_from(entry)).await?;
                    println!("✅ Record updated successfully!");
                }
                LedgerCommand::DeleteEntry {
                    company,
                    record,
                    yes,
                } => {
                    confirm(yes, &format!("record {}", record))?;
                    ledger.delete_entry(&company, &record).await?;
                    println!("🗑️  Record has been deleted.");
                }
            }
        }
        Command::Report(args) => {
            guard(&session, View::Dashboard)?;
            let kind = report_kind(&args)?;
            let path = ReportsApi::new(api.clone()).save(&kind, &args.out).await?;
            println!("📁 Report saved to: {}", path.display());
        }
    }

    if let Some(view) = navigator.current() {
        tracing::debug!("Current view: {}", view);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    let level = config.logging.level.as_deref();
    if cli.json_logs || config.logging.json {
        logger::init_json_logger(cli.verbose, level);
    } else {
        logger::init_cli_logger(cli.verbose, level);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    tracing::debug!("Using API at {}", config.api_base_url());

    let navigator = Arc::new(HistoryNavigator::new());
    let session = Arc::new(
        SessionService::new(
            Arc::new(FileTokenStore::new(config.token_file())),
            navigator.clone(),
            Arc::new(TerminalNotifier),
        )
        .with_clear_on_exit(config.clear_on_exit()),
    );

    let api = match ApiClient::new(ApiSettings::from_config(&config), session.clone()) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let outcome = run(cli.command, api, &navigator).await;

    if let Err(e) = session.teardown() {
        tracing::warn!("Session teardown failed: {}", e);
    }

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}
