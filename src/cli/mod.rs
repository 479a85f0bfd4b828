use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use crate::application::{
    AppError, LedgerService, SpendingReport, StatementReport, TransactionFilter,
};
use crate::config::{Config, DisplayLocale, DEFAULT_CONFIG_FILE};
use crate::domain::{
    parse_cents, parse_iso_date, CategoryNode, Cents, DayOrder, RawTransaction, TransactionType,
    TransactionUpdate, YearMonth,
};
use crate::io::{
    spending_csv, statement_csv, statement_json, Exporter, ImportOptions, ImportResult, Importer,
};
use crate::logging::init_tracing;

/// MoneyMine - Personal Budget Ledger
#[derive(Parser)]
#[command(name = "moneymine")]
#[command(about = "A local-first budgeting ledger with monthly statements and running balances")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides the config file)
    #[arg(long, env = "MONEYMINE_DB", global = true)]
    pub database: Option<String>,

    /// Config file path (defaults to ./moneymine.json when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Configuration file commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Transaction management commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Show a month of transactions grouped by day with running balances
    Statement {
        /// Month to show (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Account code or name (repeatable, omit for all accounts)
        #[arg(short, long = "account")]
        accounts: Vec<String>,

        /// Category code (repeatable, omit for all categories)
        #[arg(short, long = "category")]
        categories: Vec<String>,

        /// Sort days by date instead of first appearance
        #[arg(long)]
        chronological: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Spending of a month per root category
    Spending {
        /// Month to show (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Account code or name (repeatable, omit for all accounts)
        #[arg(short, long = "account")]
        accounts: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Recompute the consolidated balance of an account for a month
    Consolidate {
        /// Account code or name
        #[arg(short, long)]
        account: String,

        /// Month (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
    },

    /// List consolidated monthly balances of an account
    Consolidations {
        /// Account code or name
        #[arg(short, long)]
        account: String,

        /// First month (YYYY-MM)
        #[arg(long)]
        from: Option<String>,

        /// Last month (YYYY-MM)
        #[arg(long)]
        to: Option<String>,
    },

    /// Import transactions into an account
    Import {
        /// File kind
        #[arg(value_enum)]
        kind: ImportKind,

        /// Input file
        file: PathBuf,

        /// Target account code or name
        #[arg(short, long)]
        account: String,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip records already present in the account
        #[arg(long)]
        skip_duplicates: bool,
    },

    /// Export transactions to CSV
    Export {
        /// Account code or name (repeatable, omit for all accounts)
        #[arg(short, long = "account")]
        accounts: Vec<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account name (must be unique)
        name: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List all accounts
    List,

    /// Show account details and balance
    Show {
        /// Account code or name
        account: String,
    },

    /// Rename an account or change its description
    Edit {
        /// Account code or name
        account: String,

        /// New name (must be unique)
        #[arg(short, long)]
        name: Option<String>,

        /// New description
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },

    /// Delete an account without transactions
    Delete {
        /// Account code or name
        account: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category
    Create {
        /// Category name
        name: String,

        /// Parent category code
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// List all categories
    List,

    /// Show categories as a tree
    Tree,

    /// Rename a category or move it in the tree
    Edit {
        /// Category code
        code: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New parent category code
        #[arg(short, long, conflicts_with = "root")]
        parent: Option<String>,

        /// Make it a root category
        #[arg(long)]
        root: bool,
    },

    /// Delete a category without subcategories or transactions
    Delete {
        /// Category code
        code: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write the effective configuration to a file
    Init {
        /// Target file
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction
    Add {
        /// Signed amount: positive for income, negative for expenses (e.g. "-12.50")
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Account code or name
        #[arg(short, long)]
        account: String,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Category code
        #[arg(short, long)]
        category: Option<String>,

        /// Transaction type: deposit, withdrawal, transfer (derived from the sign if omitted)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },

    /// List transactions
    List {
        /// Account code or name (repeatable)
        #[arg(short, long = "account")]
        accounts: Vec<String>,

        /// Category code (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<String>,

        /// From date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// To date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a transaction
    Show {
        /// Transaction code
        code: String,
    },

    /// Edit a transaction
    Edit {
        /// Transaction code
        code: String,

        /// New signed amount
        #[arg(long, allow_hyphen_values = true)]
        value: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New category code
        #[arg(short, long, conflicts_with = "clear_category")]
        category: Option<String>,

        /// Remove the category
        #[arg(long)]
        clear_category: bool,

        /// New transaction type
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },

    /// Delete a transaction
    Delete {
        /// Transaction code
        code: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportKind {
    /// CSV with header: date,description,value[,category_code,type]
    Csv,
    /// JSON array of {date, description, value}
    Json,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        init_tracing(self.verbose, &config.log_level);

        if let Some(database) = self.database {
            config.database = database;
        }
        let database = config.database.clone();
        let locale = config.locale;

        match self.command {
            Commands::Init => {
                LedgerService::init(&database).await?;
                println!("Database initialized: {}", database);
            }

            Commands::Config(cmd) => run_config_command(&config, cmd)?,

            Commands::Account(cmd) => {
                let service = LedgerService::connect(&database).await?;
                run_account_command(&service, cmd, locale).await?;
            }

            Commands::Category(cmd) => {
                let service = LedgerService::connect(&database).await?;
                run_category_command(&service, cmd).await?;
            }

            Commands::Tx(cmd) => {
                let service = LedgerService::connect(&database).await?;
                run_tx_command(&service, cmd, locale).await?;
            }

            Commands::Statement {
                month,
                accounts,
                categories,
                chronological,
                format,
                output,
            } => {
                let service = LedgerService::connect(&database).await?;
                let period = parse_month_or_current(month)?;
                let order = if chronological {
                    DayOrder::Chronological
                } else {
                    config.day_order
                };

                let report = service
                    .monthly_statement(period, &accounts, &categories, order)
                    .await?;

                let writer = open_output(output.as_deref())?;
                match format {
                    OutputFormat::Table => write_statement(&report, locale, writer)?,
                    OutputFormat::Json => statement_json(&report, writer)?,
                    OutputFormat::Csv => {
                        let count = statement_csv(&report, writer)?;
                        if output.is_some() {
                            eprintln!("Exported {} transactions", count);
                        }
                    }
                }
            }

            Commands::Spending {
                month,
                accounts,
                format,
                output,
            } => {
                let service = LedgerService::connect(&database).await?;
                let period = parse_month_or_current(month)?;
                let report = service.spending_by_category(period, &accounts).await?;

                let mut writer = open_output(output.as_deref())?;
                match format {
                    OutputFormat::Table => write_spending(&report, locale, writer)?,
                    OutputFormat::Json => {
                        serde_json::to_writer_pretty(&mut writer, &report)?;
                        writeln!(writer)?;
                    }
                    OutputFormat::Csv => {
                        spending_csv(&report, writer)?;
                    }
                }
            }

            Commands::Consolidate { account, month } => {
                let service = LedgerService::connect(&database).await?;
                let month = parse_month_or_current(month)?;
                let consolidation = service.refresh_consolidation(&account, month).await?;
                println!(
                    "Consolidated {} for {}: {}",
                    consolidation.account_code,
                    consolidation.month,
                    locale.format(consolidation.balance)
                );
            }

            Commands::Consolidations { account, from, to } => {
                let service = LedgerService::connect(&database).await?;
                let from = from.map(|m| YearMonth::parse(&m)).transpose()?;
                let to = to.map(|m| YearMonth::parse(&m)).transpose()?;
                let consolidations = service.list_consolidations(&account, from, to).await?;

                if consolidations.is_empty() {
                    println!("No consolidations found.");
                } else {
                    println!("{:<8} {:>16}", "MONTH", "BALANCE");
                    println!("{}", "-".repeat(25));
                    for c in consolidations {
                        println!("{:<8} {:>16}", c.month, locale.format(c.balance));
                    }
                }
            }

            Commands::Import {
                kind,
                file,
                account,
                dry_run,
                skip_duplicates,
            } => {
                let service = LedgerService::connect(&database).await?;
                let reader = std::fs::File::open(&file)
                    .with_context(|| format!("Failed to open input file: {}", file.display()))?;
                let options = ImportOptions {
                    dry_run,
                    skip_duplicates,
                };

                let importer = Importer::new(&service);
                let result = match kind {
                    ImportKind::Csv => {
                        importer
                            .import_transactions_csv(reader, &account, options)
                            .await?
                    }
                    ImportKind::Json => {
                        importer
                            .import_statement_json(reader, &account, options)
                            .await?
                    }
                };
                print_import_result(&result, dry_run);
            }

            Commands::Export { accounts, output } => {
                let service = LedgerService::connect(&database).await?;
                let writer = open_output(output.as_deref())?;

                let filter = TransactionFilter {
                    accounts,
                    ..Default::default()
                };
                let count = Exporter::new(&service)
                    .export_transactions_csv(filter, writer)
                    .await?;
                if output.is_some() {
                    eprintln!("Exported {} transactions", count);
                }
            }
        }

        Ok(())
    }
}

async fn run_account_command(
    service: &LedgerService,
    cmd: AccountCommands,
    locale: DisplayLocale,
) -> Result<()> {
    match cmd {
        AccountCommands::Create { name, description } => {
            let account = service.create_account(name, description).await?;
            println!("Created account: {} ({})", account.name, account.code);
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<12} {:<24} {:<30}", "CODE", "NAME", "DESCRIPTION");
                println!("{}", "-".repeat(68));
                for account in accounts {
                    println!(
                        "{:<12} {:<24} {:<30}",
                        account.code,
                        truncate(&account.name, 24),
                        truncate(account.description.as_deref().unwrap_or(""), 30)
                    );
                }
            }
        }

        AccountCommands::Show { account } => {
            let info = service.account_balance(&account).await?;
            let account = &info.account;

            println!("Account: {}", account.name);
            println!("  Code:           {}", account.code);
            if let Some(desc) = &account.description {
                println!("  Description:    {}", desc);
            }
            println!(
                "  Created:        {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!("  Balance:        {}", locale.format(info.balance));
            println!("  Transactions:   {}", info.transaction_count);
        }

        AccountCommands::Edit {
            account,
            name,
            description,
            clear_description,
        } => {
            let description = if clear_description {
                Some(None)
            } else {
                description.map(Some)
            };
            let account = service.update_account(&account, name, description).await?;
            println!("Updated account: {} ({})", account.name, account.code);
        }

        AccountCommands::Delete { account } => {
            let account = service.delete_account(&account).await?;
            println!("Deleted account: {} ({})", account.name, account.code);
        }
    }
    Ok(())
}

async fn run_category_command(service: &LedgerService, cmd: CategoryCommands) -> Result<()> {
    match cmd {
        CategoryCommands::Create { name, parent } => {
            let category = service.create_category(name, parent).await?;
            match &category.parent_category_code {
                Some(parent) => println!(
                    "Created category: {} ({}) under {}",
                    category.name, category.code, parent
                ),
                None => println!("Created category: {} ({})", category.name, category.code),
            }
        }

        CategoryCommands::List => {
            let categories = service.list_categories().await?;
            if categories.is_empty() {
                println!("No categories found.");
            } else {
                println!("{:<12} {:<24} {:<12}", "CODE", "NAME", "PARENT");
                println!("{}", "-".repeat(50));
                for category in categories {
                    println!(
                        "{:<12} {:<24} {:<12}",
                        category.code,
                        truncate(&category.name, 24),
                        category.parent_category_code.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        CategoryCommands::Tree => {
            let tree = service.category_tree().await?;
            if tree.is_empty() {
                println!("No categories found.");
            }
            for node in &tree {
                print_category_node(node, 0);
            }
        }

        CategoryCommands::Edit {
            code,
            name,
            parent,
            root,
        } => {
            let parent = if root { Some(None) } else { parent.map(Some) };
            let category = service.update_category(&code, name, parent).await?;
            match &category.parent_category_code {
                Some(parent) => println!(
                    "Updated category: {} ({}) under {}",
                    category.name, category.code, parent
                ),
                None => println!("Updated category: {} ({})", category.name, category.code),
            }
        }

        CategoryCommands::Delete { code } => {
            let category = service.delete_category(&code).await?;
            println!("Deleted category: {} ({})", category.name, category.code);
        }
    }
    Ok(())
}

fn print_category_node(node: &CategoryNode, depth: usize) {
    println!("{}{} ({})", "  ".repeat(depth), node.name, node.code);
    for child in &node.children {
        print_category_node(child, depth + 1);
    }
}

async fn run_tx_command(
    service: &LedgerService,
    cmd: TxCommands,
    locale: DisplayLocale,
) -> Result<()> {
    match cmd {
        TxCommands::Add {
            value,
            account,
            date,
            description,
            category,
            kind,
        } => {
            let value = parse_amount(&value)?;
            let kind = kind.map(|k| parse_kind(&k)).transpose()?;
            let date = date.unwrap_or_else(|| Utc::now().date_naive().to_string());

            let transaction = service
                .record_transaction(RawTransaction {
                    account_code: account,
                    category_code: category,
                    description: description.unwrap_or_default(),
                    kind,
                    date,
                    value,
                })
                .await?;

            println!(
                "Recorded transaction: {} on {} ({})",
                locale.format(transaction.value),
                transaction.date,
                transaction.code
            );
        }

        TxCommands::List {
            accounts,
            categories,
            from_date,
            to_date,
            limit,
        } => {
            let filter = TransactionFilter {
                accounts,
                categories,
                from_date: from_date.as_deref().map(parse_date).transpose()?,
                to_date: to_date.as_deref().map(parse_date).transpose()?,
                limit,
            };
            let transactions = service.list_transactions(filter).await?;

            if transactions.is_empty() {
                println!("No transactions found.");
            } else {
                println!(
                    "{:<12} {:<10} {:<12} {:<30} {:<12} {:>16}",
                    "CODE", "DATE", "ACCOUNT", "DESCRIPTION", "CATEGORY", "VALUE"
                );
                println!("{}", "-".repeat(97));
                for t in transactions {
                    println!(
                        "{:<12} {:<10} {:<12} {:<30} {:<12} {:>16}",
                        t.code,
                        t.date,
                        t.account_code,
                        truncate(&t.description, 30),
                        t.category_code.as_deref().unwrap_or("-"),
                        locale.format(t.value)
                    );
                }
            }
        }

        TxCommands::Show { code } => {
            let t = service.get_transaction(&code).await?;
            println!("Transaction: {}", t.code);
            println!("  Account:        {}", t.account_code);
            println!("  Date:           {}", t.date);
            println!("  Type:           {}", t.kind);
            println!("  Value:          {}", locale.format(t.value));
            println!("  Category:       {}", t.category_code.as_deref().unwrap_or("-"));
            if !t.description.is_empty() {
                println!("  Description:    {}", t.description);
            }
        }

        TxCommands::Edit {
            code,
            value,
            date,
            description,
            category,
            clear_category,
            kind,
        } => {
            let update = TransactionUpdate {
                description,
                category_code: if clear_category {
                    Some(None)
                } else {
                    category.map(Some)
                },
                kind: kind.map(|k| parse_kind(&k)).transpose()?,
                date: date.as_deref().map(parse_date).transpose()?,
                value: value.as_deref().map(parse_amount).transpose()?,
            };

            let t = service.update_transaction(&code, update).await?;
            println!(
                "Updated transaction: {} on {} ({})",
                locale.format(t.value),
                t.date,
                t.code
            );
        }

        TxCommands::Delete { code } => {
            let t = service.delete_transaction(&code).await?;
            println!(
                "Deleted transaction: {} on {} ({})",
                locale.format(t.value),
                t.date,
                t.code
            );
        }
    }
    Ok(())
}

fn run_config_command(config: &Config, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }

        ConfigCommands::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            config.save(&path)?;
            println!("Config written: {}", path.display());
        }
    }
    Ok(())
}

fn write_statement<W: Write>(
    report: &StatementReport,
    locale: DisplayLocale,
    mut w: W,
) -> Result<()> {
    let scope = if report.accounts.is_empty() {
        "all accounts".to_string()
    } else {
        report.accounts.join(", ")
    };
    writeln!(w, "Statement {} ({})", report.period, scope)?;
    writeln!(w)?;

    if report.ledger.is_empty() {
        writeln!(w, "No transactions in {}.", report.period)?;
    } else {
        writeln!(
            w,
            "{:<10}  {:<32} {:<12} {:>16}",
            "DATE", "DESCRIPTION", "CATEGORY", "VALUE"
        )?;
        writeln!(w, "{}", "-".repeat(74))?;
        for group in &report.ledger.groups {
            for (i, t) in group.transactions.iter().enumerate() {
                let day = if i == 0 { group.day_key.as_str() } else { "" };
                writeln!(
                    w,
                    "{:<10}  {:<32} {:<12} {:>16}",
                    day,
                    truncate(&t.description, 32),
                    t.category_code.as_deref().unwrap_or("-"),
                    locale.format(t.value)
                )?;
            }
            writeln!(
                w,
                "{:<10}  {:<45} {:>16}",
                "",
                "Day balance",
                locale.format(group.daily_balance)
            )?;
        }
        writeln!(w, "{}", "-".repeat(74))?;
    }

    let ledger = &report.ledger;
    let summary = [
        ("Previous balance", ledger.opening_balance),
        ("Total income", ledger.total_income),
        ("Total expenses", ledger.total_expenses),
        ("Net", report.net()),
        ("Current balance", report.closing_balance),
    ];
    for (label, amount) in summary {
        writeln!(w, "{:<20} {:>16}", label, locale.format(amount))?;
    }
    w.flush()?;
    Ok(())
}

fn write_spending<W: Write>(
    report: &SpendingReport,
    locale: DisplayLocale,
    mut w: W,
) -> Result<()> {
    if report.categories.is_empty() {
        writeln!(w, "No spending in {}.", report.period)?;
        return Ok(());
    }

    writeln!(w, "Spending by category: {}", report.period)?;
    writeln!(w, "{:<24} {:>16} {:>6} {:>8}", "CATEGORY", "TOTAL", "COUNT", "%")?;
    writeln!(w, "{}", "-".repeat(57))?;
    for share in &report.categories {
        writeln!(
            w,
            "{:<24} {:>16} {:>6} {:>7.1}%",
            truncate(&share.category, 24),
            locale.format(share.total),
            share.count,
            share.percentage
        )?;
    }
    writeln!(w, "{}", "-".repeat(57))?;
    writeln!(w, "{:<24} {:>16}", "TOTAL", locale.format(report.total))?;
    w.flush()?;
    Ok(())
}

fn print_import_result(result: &ImportResult, dry_run: bool) {
    let verb = if dry_run { "Validated" } else { "Imported" };
    println!("{} {} transaction(s), skipped {}", verb, result.imported, result.skipped);
    if !result.errors.is_empty() {
        eprintln!("{} error(s):", result.errors.len());
        for err in &result.errors {
            match &err.field {
                Some(field) => eprintln!("  line {} ({}): {}", err.line, field, err.error),
                None => eprintln!("  line {}: {}", err.line, err.error),
            }
        }
    }
}

fn open_output(path: Option<&str>) -> Result<Box<dyn std::io::Write>> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    parse_iso_date(date_str)
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}

fn parse_amount(value: &str) -> Result<Cents, AppError> {
    Ok(parse_cents(value)?)
}

fn parse_kind(kind: &str) -> Result<TransactionType> {
    TransactionType::from_str(kind).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid transaction type '{}'. Use deposit, withdrawal or transfer",
            kind
        )
    })
}

fn parse_month_or_current(month: Option<String>) -> Result<YearMonth> {
    match month {
        Some(m) => {
            YearMonth::parse(&m).with_context(|| format!("Invalid month '{}'. Use YYYY-MM", m))
        }
        None => Ok(YearMonth::of(Utc::now().date_naive())),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{aggregate, Transaction};

    #[test]
    fn test_command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_tx_add_with_description() {
        let cli = Cli::try_parse_from([
            "moneymine",
            "--database",
            "ledger.db",
            "tx",
            "add",
            "-12.50",
            "--account",
            "Checking",
            "-d",
            "lunch",
        ])
        .unwrap();

        assert_eq!(cli.database.as_deref(), Some("ledger.db"));
        match cli.command {
            Commands::Tx(TxCommands::Add {
                value, description, ..
            }) => {
                assert_eq!(value, "-12.50");
                assert_eq!(description.as_deref(), Some("lunch"));
            }
            _ => panic!("expected tx add"),
        }
    }

    #[test]
    fn test_cli_account_commands() {
        let cli = Cli::try_parse_from(["moneymine", "account", "create", "Checking"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Account(AccountCommands::Create { description: None, .. })
        ));

        let cli = Cli::try_parse_from([
            "moneymine",
            "account",
            "edit",
            "Checking",
            "-n",
            "Main",
            "--clear-description",
        ])
        .unwrap();
        match cli.command {
            Commands::Account(AccountCommands::Edit {
                account,
                name,
                description,
                clear_description,
            }) => {
                assert_eq!(account, "Checking");
                assert_eq!(name.as_deref(), Some("Main"));
                assert!(description.is_none());
                assert!(clear_description);
            }
            _ => panic!("expected account edit"),
        }

        assert!(Cli::try_parse_from([
            "moneymine",
            "account",
            "edit",
            "Checking",
            "-d",
            "x",
            "--clear-description",
        ])
        .is_err());
    }

    #[test]
    fn test_cli_category_edit_conflicts() {
        let cli =
            Cli::try_parse_from(["moneymine", "category", "edit", "abc", "--root"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Category(CategoryCommands::Edit { root: true, parent: None, .. })
        ));

        assert!(Cli::try_parse_from([
            "moneymine", "category", "edit", "abc", "--root", "--parent", "xyz",
        ])
        .is_err());
    }

    #[test]
    fn test_parse_amount_reports_invalid_amount() {
        assert_eq!(parse_amount("-12,50").unwrap(), -1250);
        assert!(matches!(parse_amount("--5"), Err(AppError::InvalidAmount(_))));
        assert!(matches!(parse_amount("ten"), Err(AppError::InvalidAmount(_))));
    }

    #[test]
    fn test_write_statement_table() {
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let transactions = vec![
            Transaction::new("acc", d1, 10000).with_description("Salary"),
            Transaction::new("acc", d1, -3000).with_description("Market"),
        ];
        let report = StatementReport::new(
            YearMonth::parse("2024-03").unwrap(),
            vec!["acc".into()],
            vec![],
            DayOrder::FirstSeen,
            aggregate(&transactions, 20000),
        );

        let mut out = Vec::new();
        write_statement(&report, DisplayLocale::Plain, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Statement 2024-03 (acc)"));
        assert!(text.contains("01/03/2024  Salary"));
        assert!(text.lines().any(|l| l.starts_with("Net") && l.ends_with("70.00")));
        let last = text.lines().last().unwrap();
        assert!(last.starts_with("Current balance") && last.ends_with("270.00"));
    }

    #[test]
    fn test_config_init_writes_file_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("moneymine.json");
        let config = Config {
            database: "ledger.db".into(),
            ..Default::default()
        };

        run_config_command(
            &config,
            ConfigCommands::Init {
                path: path.clone(),
                force: false,
            },
        )
        .unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);

        let again = run_config_command(
            &config,
            ConfigCommands::Init {
                path: path.clone(),
                force: false,
            },
        );
        assert!(again.is_err());

        run_config_command(&config, ConfigCommands::Init { path, force: true }).unwrap();
    }

    #[test]
    fn test_cli_parses_statement() {
        let cli = Cli::try_parse_from([
            "moneymine",
            "statement",
            "--month",
            "2024-03",
            "-a",
            "Checking",
            "-a",
            "Savings",
            "--chronological",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Statement {
                month,
                accounts,
                chronological,
                format,
                ..
            } => {
                assert_eq!(month.as_deref(), Some("2024-03"));
                assert_eq!(accounts, vec!["Checking", "Savings"]);
                assert!(chronological);
                assert!(format == OutputFormat::Json);
            }
            _ => panic!("expected statement command"),
        }
    }

    #[test]
    fn test_cli_accepts_negative_amount() {
        let cli =
            Cli::try_parse_from(["moneymine", "tx", "add", "-12.50", "--account", "Checking"])
                .unwrap();
        match cli.command {
            Commands::Tx(TxCommands::Add { value, account, .. }) => {
                assert_eq!(value, "-12.50");
                assert_eq!(account, "Checking");
            }
            _ => panic!("expected tx add"),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a rather long description", 10), "a rathe...");
        assert_eq!(truncate("padaria são joão", 10), "padaria...");
    }

    #[test]
    fn test_parse_month_or_current() {
        assert_eq!(
            parse_month_or_current(Some("2024-03".into())).unwrap(),
            YearMonth::parse("2024-03").unwrap()
        );
        assert!(parse_month_or_current(Some("03/2024".into())).is_err());
        assert!(parse_month_or_current(None).is_ok());
    }
}
