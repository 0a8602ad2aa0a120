use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use smartclass::portal::{
    AdminView, ClearOutcome, NoticeLevel, RosterOutcome, SelectOutcome, StudentView,
    TimetableSummary,
};
use smartclass::{Gateway, HttpGateway, Orchestrator, PortalConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line client for the SmartClass timetable service
#[derive(Parser)]
#[command(name = "smartclass", version = env!("CARGO_PKG_VERSION"), long_about = None)]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(global = true, long = "config")]
    config: Option<PathBuf>,

    /// Print views as JSON instead of text
    #[arg(global = true, long = "json")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show inventory counts and generated timetables
    Admin,

    /// Generate and activate a timetable for a department and semester
    Generate {
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        semester: Option<u8>,
    },

    /// Delete the timetables of a department and semester
    Clear {
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        semester: Option<u8>,
    },

    /// Delete every timetable
    ClearAll,

    /// Load the service's demonstration data
    InitSampleData,

    /// Show the weekly grid, faculty, rooms and assignments of a batch
    Student {
        /// Batch id; the first batch in the roster when omitted
        #[arg(long)]
        batch: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PortalConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PortalConfig::default(),
    }
    .with_env_overrides();
    config.validate().context("invalid configuration")?;

    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(&config)?);
    let portal = Orchestrator::new(gateway, &config);

    let result = run(&cli, &config, &portal).await;
    print_notices(&portal);
    result
}

async fn run(cli: &Cli, config: &PortalConfig, portal: &Orchestrator) -> Result<()> {
    match &cli.command {
        Commands::Admin => {
            portal.enter_admin().await?;
            print_admin(&portal.admin_view(), cli.json)?;
        }
        Commands::Generate {
            department,
            semester,
        } => {
            let department = department.as_deref().unwrap_or(&config.default_department);
            let semester = semester.unwrap_or(config.default_semester);
            portal.enter_admin().await?;
            portal.select_department(department)?;
            portal.select_semester(semester)?;
            let timetable = portal.generate(department, semester).await?;
            println!("Generated {} ({})", timetable.name, timetable.id);
            print_admin(&portal.admin_view(), cli.json)?;
        }
        Commands::Clear {
            department,
            semester,
        } => {
            let department = department.as_deref().unwrap_or(&config.default_department);
            let semester = semester.unwrap_or(config.default_semester);
            portal.enter_admin().await?;
            print_clear(portal.clear_current(department, semester).await?);
        }
        Commands::ClearAll => {
            portal.enter_admin().await?;
            print_clear(portal.clear_all().await?);
        }
        Commands::InitSampleData => {
            portal.enter_admin().await?;
            portal.init_sample_data().await?;
        }
        Commands::Student { batch } => {
            if portal.enter_student().await? == RosterOutcome::Empty {
                println!("No batches found. Initialize sample data first.");
                return Ok(());
            }
            if let Some(batch) = batch {
                if portal.select_batch(batch).await? == SelectOutcome::Unknown {
                    bail!("unknown batch `{batch}`");
                }
            }
            print_student(&portal.student_view(Utc::now()), cli.json)?;
        }
    }
    Ok(())
}

fn print_clear(outcome: ClearOutcome) {
    match outcome {
        ClearOutcome::Cleared { message, .. } => println!("{message}"),
        ClearOutcome::NothingToClear => println!("Nothing to clear"),
    }
}

fn print_notices(portal: &Orchestrator) {
    for notice in portal.notices().active() {
        match notice.level {
            NoticeLevel::Success => eprintln!("[ok] {}", notice.message),
            NoticeLevel::Error => eprintln!("[error] {}", notice.message),
        }
    }
}

fn print_admin(view: &AdminView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    let c = &view.counts;
    println!(
        "Rooms: {}  Faculty: {}  Subjects: {}  Batches: {}  Timetables: {}",
        c.rooms, c.faculty, c.subjects, c.batches, c.timetables
    );
    match &view.active {
        Some(active) => println!(
            "Active for {} semester {}: {}",
            view.department, view.semester, active.name
        ),
        None => println!(
            "No active timetable for {} semester {}",
            view.department, view.semester
        ),
    }
    println!();
    for summary in &view.timetables {
        print_summary(summary);
    }
    for d in &view.discrepancies {
        println!(
            "warning: {:?} {} has {} `{}` and `{}`",
            d.scope, d.id, d.field, d.kept, d.seen
        );
    }
    Ok(())
}

fn print_summary(s: &TimetableSummary) {
    println!(
        "{}{} [{}] {} batches, {} entries, {} placed, {} unplaced, {} conflicts, {} overlaps (created {})",
        if s.is_active { "* " } else { "  " },
        s.name,
        s.id,
        s.batches,
        s.entries,
        s.placed,
        s.unplaced,
        s.conflicts,
        s.overlaps,
        s.created_at.format("%Y-%m-%d %H:%M"),
    );
}

fn print_student(view: &StudentView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    if let Some(batch) = &view.batch {
        println!(
            "{} - {} semester {} ({} students)",
            batch.name, batch.department, batch.semester, batch.student_count
        );
    }
    if !view.generated {
        println!("Timetable not generated yet.");
    } else {
        print_grid(view);
    }

    if !view.faculty.is_empty() {
        println!("\nFaculty:");
        for f in &view.faculty {
            println!("  {} - {}", f.faculty_name, f.subjects.join(", "));
        }
    }
    if !view.rooms.is_empty() {
        println!("\nRooms:");
        for r in &view.rooms {
            println!("  {} ({}) - {}", r.room_name, r.room_type, r.subjects.join(", "));
        }
    }

    let active: Vec<_> = view.active_assignments().collect();
    let overdue: Vec<_> = view.overdue_assignments().collect();
    println!("\nAssignments: {} active, {} overdue", active.len(), overdue.len());
    for a in active.iter().chain(&overdue) {
        println!(
            "  {} [{}] due {}",
            a.title,
            a.subject_code,
            a.due_date.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn print_grid(view: &StudentView) {
    const WIDTH: usize = 12;
    let grid = &view.grid;

    print!("{:<WIDTH$}", "Time");
    for day in grid.days() {
        print!("{:<WIDTH$}", day.as_str());
    }
    println!();

    for (col, slot) in grid.slots().iter().enumerate() {
        print!("{:<WIDTH$}", slot.key());
        for row in grid.rows() {
            let label = match row.cells[col].placed() {
                Some(entry) if row.cells[col].has_conflict() => format!("{}!", entry.subject_code),
                Some(entry) => entry.subject_code.clone(),
                None => "-".to_string(),
            };
            print!("{:<WIDTH$}", label);
        }
        println!();
    }

    for conflict in grid.conflicts() {
        println!(
            "warning: {} {} double-booked, showing {}",
            conflict.day, conflict.slot, conflict.placed.subject_name
        );
    }
    for entry in grid.unplaced() {
        println!(
            "warning: {} {} on {} is outside the standard slots",
            entry.subject_name,
            entry.slot_key(),
            entry.day
        );
    }
}
