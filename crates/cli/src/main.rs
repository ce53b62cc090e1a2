use clap::{Args, Parser, Subcommand};
use hts_core::constants::{ALL_ORGANISATION_UNITS, TABLE_HEADERS};
use hts_core::export::write_export;
use hts_core::{
    ApplyOutcome, CoreConfig, Credentials, DashboardService, DashboardView, FilterSelection,
    Session, TableRow,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "hts")]
#[command(about = "HIV testing services dashboard CLI")]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where to connect and how.
#[derive(Args)]
struct Connection {
    /// DHIS2 instance URL
    #[arg(long, env = "HTS_INSTANCE_URL", global = true)]
    instance_url: Option<String>,
    /// DHIS2 username
    #[arg(long, env = "HTS_USERNAME", global = true)]
    username: Option<String>,
    /// DHIS2 password
    #[arg(long, env = "HTS_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,
    /// Relay that forwards requests to the instance (optional)
    #[arg(long, env = "HTS_RELAY_URL", global = true)]
    relay_url: Option<String>,
    /// Per-request timeout in seconds
    #[arg(long, env = "HTS_REQUEST_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<String>,
    /// YAML file overriding the data element and option identifiers
    #[arg(long, env = "HTS_MAPPING_FILE", global = true)]
    mapping_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the credentials are accepted
    Check,
    /// List the organisation units visible to the user
    OrgUnits,
    /// Fetch, aggregate and print a report
    Report {
        /// Reporting year (YYYY)
        #[arg(long)]
        year: i32,
        /// Month 1-12; the whole year when omitted
        #[arg(long)]
        month: Option<u32>,
        /// Organisation unit id (repeatable); every unit when omitted
        #[arg(long = "org-unit")]
        org_units: Vec<String>,
        /// Write the table as CSV to this file
        #[arg(long, conflicts_with = "csv_dir")]
        csv: Option<PathBuf>,
        /// Write the table as CSV into this directory under the standard export name
        #[arg(long)]
        csv_dir: Option<PathBuf>,
        /// Print the full dashboard as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("hts=warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Check) => check(&cli.connection).await,
        Some(Commands::OrgUnits) => org_units(&cli.connection).await,
        Some(Commands::Report {
            year,
            month,
            org_units,
            csv,
            csv_dir,
            json,
        }) => {
            let selection = selection(year, month, org_units);
            report(&cli.connection, selection, csv, csv_dir, json).await
        }
        None => {
            println!("Use 'hts --help' for commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn connect(connection: &Connection) -> CliResult<(DashboardService, Session)> {
    let cfg = CoreConfig::from_env_values(
        connection.relay_url.clone(),
        connection.timeout_secs.clone(),
        connection.mapping_file.clone(),
    )?;
    let service = DashboardService::from_config(Arc::new(cfg))?;

    let instance_url = required(&connection.instance_url, "--instance-url / HTS_INSTANCE_URL")?;
    let username = required(&connection.username, "--username / HTS_USERNAME")?;
    let password = required(&connection.password, "--password / HTS_PASSWORD")?;
    let credentials = Credentials::new(instance_url, username, password)?;

    let session = service.login(credentials).await?;
    Ok((service, session))
}

fn required<'a>(value: &'a Option<String>, name: &str) -> CliResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| format!("missing {name}").into())
}

async fn check(connection: &Connection) -> CliResult<()> {
    let (service, session) = connect(connection).await?;
    println!(
        "Connected to {} as {}. Welcome {}!",
        session.credentials().instance_url(),
        session.credentials().username(),
        session.profile().display_name()
    );
    println!(
        "{} organisation units available",
        session.organisation_units().len()
    );
    service.logout(session);
    Ok(())
}

async fn org_units(connection: &Connection) -> CliResult<()> {
    let (service, session) = connect(connection).await?;
    if session.organisation_units().is_empty() {
        println!("No organisation units found.");
    }
    for unit in session.organisation_units() {
        println!("{}\t{}", unit.id, unit.display_name);
    }
    service.logout(session);
    Ok(())
}

fn selection(year: i32, month: Option<u32>, org_units: Vec<String>) -> FilterSelection {
    let org_units = if org_units.is_empty() {
        vec![ALL_ORGANISATION_UNITS.to_string()]
    } else {
        org_units
    };
    FilterSelection {
        org_units,
        year,
        month,
    }
}

async fn report(
    connection: &Connection,
    selection: FilterSelection,
    csv: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
    json: bool,
) -> CliResult<()> {
    let (service, session) = connect(connection).await?;

    let view = match service.apply(&session, &selection).await? {
        ApplyOutcome::Applied(view) => view,
        ApplyOutcome::Superseded { generation } => {
            return Err(format!("report {generation} was superseded").into())
        }
    };

    for skipped in &view.skipped_periods {
        eprintln!("Skipped {}: {}", skipped.period.label(), skipped.reason);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(view.as_ref())?);
    } else {
        print!("{}", render_report(&view));
    }

    if csv.is_some() || csv_dir.is_some() {
        let today = chrono::Local::now().date_naive();
        if let Some(export) = service.export_csv(today)? {
            let written = match (csv, csv_dir) {
                (Some(path), _) => {
                    std::fs::write(&path, &export.content)?;
                    Some(path)
                }
                (None, Some(dir)) => Some(write_export(&dir, &export)?),
                (None, None) => None,
            };
            if let Some(path) = written {
                eprintln!("Wrote {}", path.display());
            }
        }
    }

    service.logout(session);
    Ok(())
}

/// Summary lines followed by the data table, columns padded to their widest cell.
fn render_report(view: &DashboardView) -> String {
    let summary = &view.summary;
    let mut out = String::new();
    out.push_str(&format!("Total tested:         {}\n", summary.total_tested));
    out.push_str(&format!("Positive:             {}\n", summary.positive));
    out.push_str(&format!("Negative:             {}\n", summary.negative));
    out.push_str(&format!("Inconclusive:         {}\n", summary.inconclusive));
    out.push_str(&format!(
        "Average age:          {}\n",
        hts_core::report::format_average_age(summary.average_age)
    ));
    out.push_str(&format!(
        "Counseling sessions:  {}\n",
        summary.counseling_sessions
    ));
    out.push('\n');

    if view.table.is_empty() {
        out.push_str("No data for the selected filters.\n");
    } else {
        out.push_str(&render_table(&view.table));
    }
    out
}

fn render_table(rows: &[TableRow]) -> String {
    let header = TABLE_HEADERS.map(String::from);
    let body: Vec<[String; 8]> = rows.iter().map(TableRow::cells).collect();

    let mut widths = header.clone().map(|h| h.len());
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    std::iter::once(&header)
        .chain(body.iter())
        .map(|cells| {
            let line: Vec<String> = cells
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            format!("{}\n", line.join("  ").trim_end())
        })
        .collect()
}
