//! CLI entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `studylog_core` linkage.
//! - Print grade and period reports, scan or repair a data directory,
//!   export CSV files and manage backups.

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use studylog_core::backup::BackupManager;
use studylog_core::integrity::{write_repaired, IntegrityChecker, RepairPolicy};
use studylog_core::service::export_service::ExportService;
use studylog_core::service::grade_service::GradeService;
use studylog_core::service::report_service::{ReportPeriod, ReportService};
use studylog_core::{init_logging_from_config, JsonStudyRepository, StudyConfig};

#[derive(Parser)]
#[command(name = "studylog")]
#[command(about = "Grade, study-time and goal tracker")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $STUDYLOG_CONFIG or studylog.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the core library is linked
    Ping,
    /// Print per-subject grade statistics, or a weekly/monthly summary
    Report {
        #[arg(long)]
        period: Option<PeriodArg>,
    },
    /// Scan the data directory for invalid records
    Check {
        /// Write clamped and defaulted values back
        #[arg(long)]
        repair: bool,
    },
    /// Write grades, study sessions and goals as CSV files
    Export {
        #[arg(long, default_value = "exports")]
        out: PathBuf,
    },
    /// Manage timestamped copies of the data directory
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PeriodArg {
    Weekly,
    Monthly,
}

impl From<PeriodArg> for ReportPeriod {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Weekly => ReportPeriod::Weekly,
            PeriodArg::Monthly => ReportPeriod::Monthly,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum BackupAction {
    /// Snapshot the data files now
    Create,
    /// Snapshot only when the last one is a day old, then expire old ones
    Auto,
    /// List snapshots, newest first
    List,
    /// Remove snapshots past the retention window
    Clean,
    /// Copy a snapshot back into the data directory
    Restore { timestamp: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Command::Ping) {
        Command::Ping => {
            println!("studylog_core ping={}", studylog_core::ping());
            println!("studylog_core version={}", studylog_core::core_version());
            Ok(())
        }
        Command::Report { period } => {
            load(cli.config.as_deref()).and_then(|config| match period {
                Some(period) => period_report(&config, period.into()),
                None => report(&config),
            })
        }
        Command::Check { repair } => {
            load(cli.config.as_deref()).and_then(|config| check(&config, repair))
        }
        Command::Export { out } => load(cli.config.as_deref()).and_then(|config| export(&config, &out)),
        Command::Backup { action } => {
            load(cli.config.as_deref()).and_then(|config| backup(&config, action))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: Option<&Path>) -> Result<StudyConfig, String> {
    let config = StudyConfig::load(path).map_err(|err| err.to_string())?;
    if let Err(message) = init_logging_from_config(&config.logging, Path::new(".")) {
        eprintln!("warning: logging disabled: {message}");
    }
    info!("event=cli_start module=cli status=ok");
    Ok(config)
}

fn report(config: &StudyConfig) -> Result<(), String> {
    let repo = JsonStudyRepository::new(&config.storage.data_dir);
    let grades = GradeService::new(&repo);
    let overall = grades.overall().map_err(|err| err.to_string())?;
    if overall.is_empty() {
        println!("no grades in {}", config.storage.data_dir.display());
        return Ok(());
    }
    for entry in overall {
        let trend = grades.trend(&entry.subject).map_err(|err| err.to_string())?;
        println!(
            "{:<20} n={:<3} weighted={:>6.2} median={:>6.2} std={:>5.2} band={:?} trend={:?}",
            entry.subject,
            entry.summary.count,
            entry.summary.weighted_mean,
            entry.summary.median,
            entry.summary.std_dev,
            entry.letter,
            trend.direction
        );
    }
    Ok(())
}

fn period_report(config: &StudyConfig, period: ReportPeriod) -> Result<(), String> {
    let repo = JsonStudyRepository::new(&config.storage.data_dir);
    let report = ReportService::new(&repo)
        .build(period, today())
        .map_err(|err| err.to_string())?;
    print!("{}", report.render_text());
    Ok(())
}

fn check(config: &StudyConfig, repair: bool) -> Result<(), String> {
    let repo = JsonStudyRepository::new(&config.storage.data_dir);
    let policy = if repair {
        RepairPolicy::Clamp
    } else {
        RepairPolicy::ReportOnly
    };
    let report = IntegrityChecker::new(policy, today())
        .check_repository(&repo)
        .map_err(|err| err.to_string())?;
    if report.is_clean() {
        println!("no issues found");
        return Ok(());
    }
    for issue in &report.issues {
        println!(
            "{:?} subject={} index={} {:?} action={:?}",
            issue.entity,
            issue.subject.as_deref().unwrap_or("-"),
            issue.index.map_or("-".to_string(), |index| index.to_string()),
            issue.kind,
            issue.action
        );
    }
    if write_repaired(&repo, &report).map_err(|err| err.to_string())? {
        println!("repaired data written to {}", config.storage.data_dir.display());
    }
    Ok(())
}

fn export(config: &StudyConfig, out: &Path) -> Result<(), String> {
    let repo = JsonStudyRepository::new(&config.storage.data_dir);
    let files = ExportService::new(&repo)
        .export_all(out, now())
        .map_err(|err| err.to_string())?;
    if files.is_empty() {
        println!("nothing to export");
    }
    for file in files {
        println!("{} rows={}", file.path.display(), file.rows);
    }
    Ok(())
}

fn backup(config: &StudyConfig, action: BackupAction) -> Result<(), String> {
    let backups = BackupManager::from_config(&config.storage);
    match action {
        BackupAction::Create => {
            let info = backups.create(now()).map_err(|err| err.to_string())?;
            println!("created {} files={}", info.timestamp, info.files.len());
        }
        BackupAction::Auto => match backups.auto_backup(now()).map_err(|err| err.to_string())? {
            Some(run) => println!(
                "created {} files={} removed={}",
                run.info.timestamp,
                run.info.files.len(),
                run.removed
            ),
            None => println!("latest backup is less than a day old"),
        },
        BackupAction::List => {
            let listed = backups.list().map_err(|err| err.to_string())?;
            if listed.is_empty() {
                println!("no backups in {}", backups.backup_dir().display());
            }
            for info in listed {
                println!(
                    "{} files={} bytes={}",
                    info.timestamp,
                    info.files.len(),
                    info.total_bytes
                );
            }
        }
        BackupAction::Clean => {
            let removed = backups.clean_old(now()).map_err(|err| err.to_string())?;
            println!("removed {removed} backups");
        }
        BackupAction::Restore { timestamp } => {
            let restored = backups.restore(&timestamp).map_err(|err| err.to_string())?;
            println!("restored {} files from {timestamp}", restored.len());
        }
    }
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
