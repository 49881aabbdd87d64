// Entry point and high-level CLI flow.
//
// With a subcommand the binary does one job and exits. Without one it runs
// the menu loop:
// - Option [1] loads a toll-usage CSV and prints a preview.
// - Option [2] generates the monthly report workbook from the loaded data.
// - After generating, the user can go back to the menu or exit.
mod aggregate;
mod blank;
mod config;
mod error;
mod inspect;
mod layout;
mod loader;
mod output;
mod period;
mod reports;
mod sections;
mod template;
mod types;
mod util;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use config::{HeaderOverrides, Profile};
use error::ReportError;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use template::TemplateBook;
use types::{CsvTable, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "toll_report", about = "Fill the monthly expressway usage report from a toll CSV export")]
struct Cli {
    /// Report profile (JSON) with header defaults
    #[arg(long, global = true)]
    profile: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the report workbook
    Generate(GenerateArgs),
    /// Show the first rows of a CSV and its daily summary
    Preview {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
    /// List the route sections
    Sections,
    /// Write the built-in blank form
    Template {
        #[arg(long, default_value = "blank_template.xlsx")]
        out: PathBuf,
    },
    /// Print key cells and formulas of a template workbook
    InspectTemplate { path: PathBuf },
}

#[derive(Args, Debug, Clone, Default)]
struct GenerateArgs {
    #[arg(long)]
    csv: PathBuf,
    /// Template workbook; the built-in blank form when omitted
    #[arg(long)]
    template: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Also write a JSON summary of the run
    #[arg(long)]
    summary_json: bool,
    #[command(flatten)]
    header: HeaderArgs,
}

#[derive(Args, Debug, Clone, Default)]
struct HeaderArgs {
    #[arg(long)]
    organization: Option<String>,
    #[arg(long)]
    position: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "from")]
    from_section: Option<String>,
    #[arg(long = "to")]
    to_section: Option<String>,
    #[arg(long = "fee")]
    one_way_fee: Option<f64>,
    #[arg(long = "allowance")]
    monthly_allowance: Option<f64>,
}

impl From<HeaderArgs> for HeaderOverrides {
    fn from(a: HeaderArgs) -> Self {
        HeaderOverrides {
            organization: a.organization,
            position: a.position,
            name: a.name,
            from_section: a.from_section,
            to_section: a.to_section,
            one_way_fee: a.one_way_fee,
            monthly_allowance: a.monthly_allowance,
        }
    }
}

/// State of one interactive session. Loaded data lives here and is passed
/// to each step explicitly.
struct Session {
    profile: Profile,
    table: Option<CsvTable>,
    template: Option<PathBuf>,
    out_dir: PathBuf,
}

fn setup_logging() {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Read one trimmed line; `None` once stdin is closed or unreadable.
fn read_answer(input: &mut impl BufRead) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn prompt(input: &mut impl BufRead, label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    read_answer(input)
}

/// Ask whether to go back to the menu after generating a report.
fn prompt_back_to_menu(input: &mut impl BufRead) -> bool {
    loop {
        let Some(answer) = prompt(input, "Back to menu (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn load_template(path: Option<&Path>) -> Result<TemplateBook, ReportError> {
    match path {
        Some(p) => {
            log::info!("Loading template {}", p.display());
            TemplateBook::open(p)
        }
        None => {
            log::info!("No template given; using the built-in blank form");
            TemplateBook::from_bytes(blank::blank_template()?)
        }
    }
}

fn load_csv(path: &Path) -> Result<CsvTable, ReportError> {
    let (table, report) = loader::load_table(path)?;
    println!(
        "Loaded {} rows ({}) from {}",
        util::format_int(report.total_rows),
        report.encoding,
        path.display()
    );
    Ok(table)
}

fn print_preview(table: &CsvTable, max_rows: usize) {
    println!("\nData preview (first {} rows)\n", max_rows);
    println!("{}\n", output::preview_csv(table, max_rows));
}

fn print_stats(stats: &types::UsageStats) {
    println!("Trips: {}", util::format_int(stats.total_trips));
    println!("Certified trips: {}", util::format_int(stats.certified_trips));
    println!("Total fee: {}", util::format_yen(stats.total_fee));
    println!("Days travelled: {}", stats.travel_days);
    println!("Expected trips: {}\n", util::format_int(stats.expected_trips));
}

/// Run the pipeline and write the workbook; returns where it went.
fn generate_and_save(
    table: &CsvTable,
    profile: &Profile,
    template: Option<&Path>,
    out_dir: &Path,
    summary_json: bool,
) -> Result<PathBuf> {
    let header = profile.header();
    let book = load_template(template)?;
    let report = reports::generate(table, &header, book)?;

    println!(
        "Period: {}年{}月 (令和{}年)\n",
        report.period.year,
        report.period.month,
        report.period.year - 2018
    );
    println!("{}\n", output::render_rows(&output::daily_summary_rows(&report.aggregates)));
    println!("{}\n", output::render_rows(&output::trip_rows(table, &header)));
    let stats = reports::usage_stats(table, &report.aggregates, &header, profile.monthly_allowance);
    print_stats(&stats);

    let path = out_dir.join(&report.file_name);
    output::write_bytes(&path, &report.workbook)?;
    log::info!("Saved {}", path.display());

    if summary_json {
        let summary = RunSummary {
            period: report.period,
            header,
            stats,
            output_file: report.file_name.clone(),
            cells: report.cells.clone(),
        };
        let json_path = path.with_extension("json");
        output::write_json(&json_path, &summary)?;
        println!("Summary written to {}", json_path.display());
    }
    Ok(path)
}

/// Handle option [1]: load a CSV into the session.
fn handle_load(session: &mut Session, input: &mut impl BufRead) {
    let path = prompt(input, "CSV file: ").unwrap_or_default();
    if path.is_empty() {
        println!("Please select a CSV file.\n");
        return;
    }
    match load_csv(Path::new(&path)) {
        Ok(table) => {
            print_preview(&table, 10);
            session.table = Some(table);
        }
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
}

/// Handle option [2]: generate the report from the loaded data.
fn handle_generate(session: &Session) {
    let Some(table) = session.table.as_ref() else {
        println!("Error: No data loaded. Please load a CSV file first (option 1).\n");
        return;
    };
    println!("Generating report...\n");
    match generate_and_save(table, &session.profile, session.template.as_deref(), &session.out_dir, false) {
        Ok(path) => {
            println!("Report saved to {}", path.display());
            println!("Check the generated workbook and adjust by hand where needed.\n");
        }
        Err(e) => {
            log::error!("Report generation failed: {:#}", e);
            eprintln!("Error: {}\n", e);
        }
    }
}

fn interactive(profile: Profile, input: &mut impl BufRead) {
    let mut session = Session { profile, table: None, template: None, out_dir: PathBuf::from(".") };
    let Some(template) = prompt(input, "Template workbook (blank for the built-in form): ") else {
        return;
    };
    if !template.is_empty() {
        session.template = Some(PathBuf::from(template));
    }
    loop {
        println!("Select an option:");
        println!("[1] Load the CSV file");
        println!("[2] Generate the report\n");
        let Some(choice) = prompt(input, "Enter choice: ") else {
            println!();
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut session, input),
            "2" => {
                println!();
                handle_generate(&session);
                if !prompt_back_to_menu(input) {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut profile = Profile::load(cli.profile.as_deref())?;
    match cli.command {
        None => interactive(profile, &mut io::stdin().lock()),
        Some(Command::Generate(args)) => {
            profile.apply(args.header.into());
            let table = load_csv(&args.csv)?;
            let path = generate_and_save(&table, &profile, args.template.as_deref(), &args.out_dir, args.summary_json)?;
            println!("Report saved to {}", path.display());
        }
        Some(Command::Preview { csv, rows }) => {
            let table = load_csv(&csv)?;
            print_preview(&table, rows);
            let period = period::resolve(&table.rows);
            if !period.is_resolved() {
                return Err(ReportError::PeriodUnresolvable.into());
            }
            println!("Period: {}年{}月\n", period.year, period.month);
            let days = aggregate::aggregate(&table.rows, period);
            println!("{}\n", output::render_rows(&output::daily_summary_rows(&days)));
            let header = profile.header();
            println!("{}\n", output::render_rows(&output::trip_rows(&table, &header)));
            print_stats(&reports::usage_stats(&table, &days, &header, profile.monthly_allowance));
        }
        Some(Command::Sections) => {
            for section in sections::ROUTE_SECTIONS.iter() {
                println!("{}", section);
            }
        }
        Some(Command::Template { out }) => {
            output::write_bytes(&out, &blank::blank_template()?)?;
            println!("Blank form written to {}", out.display());
        }
        Some(Command::InspectTemplate { path }) => {
            let cells = inspect::inspect_template(&path, &inspect::default_addresses())?;
            println!("{}", output::render_rows(&cells));
        }
    }
    Ok(())
}

fn main() {
    setup_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
