// Entry point and interactive session flow.
//
// - Option [1] loads the current-month and last-month exports.
// - Option [2] computes the branch and CO dashboards, stores the snapshot
//   and exports it to CSV/JSON.
// - Option [3] shows the most recently stored dashboard and lets the user
//   list the clients behind one branch or CO.
use chrono::Utc;
use once_cell::sync::Lazy;
use recovery_dashboard::config::AppConfig;
use recovery_dashboard::error::{DashboardError, Result};
use recovery_dashboard::store::{JsonlSnapshotStore, SnapshotStore};
use recovery_dashboard::types::{Dimension, Record};
use recovery_dashboard::{loader, metrics, output, util};
use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Loaded once, used for as many dashboards as the user generates.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<Periods>,
}

#[derive(Clone)]
struct Periods {
    current: Vec<Record>,
    prior: Vec<Record>,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

/// One trimmed line, or `None` once input is closed or unreadable.
fn read_line_from<R: BufRead>(reader: &mut R) -> Option<String> {
    let mut buf = String::new();
    match reader.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Read a single trimmed line after printing `label`.
fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    let _ = io::stdout().flush();
    read_line_from(&mut io::stdin().lock())
}

fn read_choice() -> Option<String> {
    prompt("Enter choice: ")
}

/// Falls back to `default` on a blank answer or closed input.
fn prompt_with_default(label: &str, default: &str) -> String {
    prompt(&format!("{label} [{default}]: "))
        .filter(|answer| !answer.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N` or input ended.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(answer) = prompt("Back to Main Menu (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Option [1]: load and extract both exports.
fn handle_load(cfg: &AppConfig) -> Result<()> {
    let current_path = prompt_with_default("Current month file", &cfg.current_file);
    let prior_path = prompt_with_default("Last month file", &cfg.prior_file);

    let (current, current_report) = loader::load_period(&current_path, "current month", cfg)?;
    let (prior, prior_report) = loader::load_period(&prior_path, "last month", cfg)?;

    for (label, report) in [("Current month", &current_report), ("Last month", &prior_report)] {
        println!(
            "{label}: {} rows read, {} records kept ({} without branch/CO, {} malformed)",
            util::format_int(report.total_rows),
            util::format_int(report.retained),
            util::format_int(report.unclassified),
            util::format_int(report.malformed)
        );
    }
    println!();

    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    state.data = Some(Periods { current, prior });
    Ok(())
}

/// Option [2]: aggregate, persist, export and preview.
fn handle_generate(cfg: &AppConfig, store: &mut dyn SnapshotStore) -> Result<()> {
    let data = {
        let state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
        state.data.clone()
    };
    let Some(data) = data else {
        return Err(DashboardError::NoData);
    };

    let (default_yesterday, default_today) = util::default_report_dates();
    let yesterday = prompt_with_default("Yesterday date (DD-Mon-YY)", &default_yesterday);
    let today = prompt_with_default("Today date (DD-Mon-YY)", &default_today);

    let snapshot = metrics::build_snapshot(&data.current, &data.prior, &yesterday, &today, Utc::now());
    store.put_latest(&snapshot)?;
    let files = output::export_dashboard(&cfg.export_dir, &snapshot)?;

    println!("\nDashboard generated.");
    output::print_totals(&snapshot);
    for dimension in [Dimension::ByBranch, Dimension::ByOfficer] {
        println!("{} Metrics\n", dimension.label());
        output::preview_table_rows(&output::summary_rows(snapshot.groups(dimension)), 5);
    }
    for file in files {
        println!("(Exported to {})", file.display());
    }
    println!();
    Ok(())
}

/// Option [3]: show the latest stored dashboard and drill into one group.
fn handle_view(store: &dyn SnapshotStore) -> Result<()> {
    let snapshot = store.get_latest()?.ok_or(DashboardError::NoSnapshot)?;

    output::print_totals(&snapshot);
    for dimension in [Dimension::ByBranch, Dimension::ByOfficer] {
        println!("{} Metrics\n", dimension.label());
        let rows = output::summary_rows(snapshot.groups(dimension));
        output::preview_table_rows(&rows, rows.len());
    }

    let key = prompt("Branch or CO to list clients for (blank to skip): ").unwrap_or_default();
    if key.is_empty() {
        return Ok(());
    }
    let group = snapshot
        .groups(Dimension::ByBranch)
        .iter()
        .chain(snapshot.groups(Dimension::ByOfficer))
        .find(|g| g.key == key);
    match group {
        Some(g) => {
            println!("\n{} ({} clients)\n", g.key, util::format_int(g.active_count));
            let rows = output::client_rows(&g.clients);
            output::preview_table_rows(&rows, rows.len());
        }
        None => println!("No branch or CO named {key:?}.\n"),
    }
    Ok(())
}

fn report(result: Result<()>) {
    if let Err(e) = result {
        error!(error = %e, "request failed");
        eprintln!("Error: {e}\n");
    }
}

fn main() {
    dotenvy::dotenv().ok();
    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&cfg.log_level);
    let mut store = JsonlSnapshotStore::new(cfg.snapshot_path.clone());

    loop {
        println!("Recovery Dashboard:");
        println!("[1] Load the files");
        println!("[2] Generate Dashboard");
        println!("[3] View Latest Dashboard\n");
        let Some(choice) = read_choice() else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => report(handle_load(&cfg)),
            "2" => {
                println!();
                report(handle_generate(&cfg, &mut store));
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => report(handle_view(&store)),
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}
