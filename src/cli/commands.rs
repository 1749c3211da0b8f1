use clap::{Args, Parser, Subcommand, ValueEnum};
use crate::api;
use crate::config::Config;
use crate::db::DbConnection;
use crate::models::{MovementFilter, NewRecord, NewStage, RecordPatch, StageDeletion, StagePatch};
use crate::pipeline::Pipeline;
use crate::seed;
use crate::cli::error::{usage, validate_budget, validate_non_empty, validate_priority};
use crate::cli::output::{
    format_board, format_movement_table, format_record_summary, format_record_table,
    format_stage_table, format_stats, get_terminal_width, is_tty,
};
use crate::utils::parse_date_expr;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use anyhow::{Context, Result};

#[derive(Parser)]
#[command(name = "pipeboard")]
#[command(about = "Pipeline Board - track work through ordered stages with a full movement history")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the default ten-stage pipeline (skipped when stages exist)
    Init {
        /// Also add sample records
        #[arg(long)]
        sample: bool,
    },
    /// Stage management commands
    Stages {
        #[command(subcommand)]
        subcommand: StageCommands,
    },
    /// Pipeline record commands
    Records {
        #[command(subcommand)]
        subcommand: RecordCommands,
    },
    /// Show the movement log, newest first
    Movements {
        /// Only movements of this record
        #[arg(long)]
        record: Option<i64>,
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show the board: one column per stage
    Board {
        /// Records shown per column (defaults to board.limit from the rc file)
        #[arg(long)]
        limit: Option<usize>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show pipeline statistics
    Stats {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Delete every stage, record and movement
    Reset {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Run the REST API server
    Serve {
        /// Bind address (defaults to api.host from the rc file)
        #[arg(long)]
        host: Option<String>,
        /// Port (defaults to api.port from the rc file)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
pub enum StageCommands {
    /// List stages in board order
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Add a stage (appended unless --position is given)
    Add {
        /// Stage name
        name: String,
        /// Position; an occupied position shifts later stages down
        #[arg(long)]
        position: Option<i64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Edit a stage
    Edit {
        /// Stage ID
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        position: Option<i64>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },
    /// Delete a stage
    Delete {
        /// Stage ID
        id: i64,
        /// Move the stage's records to this stage first
        #[arg(long, conflicts_with = "cascade")]
        reassign: Option<i64>,
        /// Delete the stage's records too (their history is kept)
        #[arg(long)]
        cascade: bool,
        /// Actor recorded on reassignment movements
        #[arg(long)]
        by: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Set the full stage order (comma-separated IDs)
    Reorder {
        #[arg(value_delimiter = ',', required = true)]
        ids: Vec<i64>,
    },
}

/// Optional record attributes shared by `add` and `edit`
#[derive(Args, Default)]
pub struct RecordFields {
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub budget: Option<f64>,
    /// Start date (YYYY-MM-DD, today, tomorrow, yesterday)
    #[arg(long)]
    pub start: Option<String>,
    /// Due date (YYYY-MM-DD, today, tomorrow, yesterday)
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

/// Record attributes that `records edit --clear` can remove
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ClearableField {
    Email,
    Phone,
    Address,
    Budget,
    Start,
    Due,
    Description,
    Notes,
}

#[derive(Subcommand)]
pub enum RecordCommands {
    /// List records, newest first
    List {
        /// Only records in this stage
        #[arg(long)]
        stage: Option<i64>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show a record with its movement history
    Show {
        /// Record ID
        id: i64,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Add a record
    Add {
        /// Initial stage ID
        #[arg(long)]
        stage: i64,
        /// Project name
        #[arg(long)]
        project: String,
        /// Customer name
        #[arg(long)]
        customer: String,
        #[command(flatten)]
        fields: RecordFields,
        /// Actor recorded on the initial movement
        #[arg(long)]
        by: Option<String>,
    },
    /// Edit a record (a different --stage also moves it)
    Edit {
        /// Record ID
        id: i64,
        #[arg(long)]
        stage: Option<i64>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        customer: Option<String>,
        #[command(flatten)]
        fields: RecordFields,
        /// Clear attributes (repeatable)
        #[arg(long, value_enum)]
        clear: Vec<ClearableField>,
        /// Actor recorded if the record moves
        #[arg(long)]
        by: Option<String>,
    },
    /// Move a record to another stage
    Move {
        /// Record ID
        id: i64,
        /// Target stage ID
        stage_id: i64,
        /// Actor recorded on the movement
        #[arg(long)]
        by: Option<String>,
    },
    /// Delete a record (its movement history is kept)
    Delete {
        /// Record ID
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported through clap as well
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print()?;
            std::process::exit(code);
        }
    };

    let config = Config::load().context("Failed to load configuration")?;
    log::debug!("Using database {}", config.data_location.display());

    match cli.command {
        Commands::Init { sample } => handle_init(&config, sample),
        Commands::Stages { subcommand } => handle_stages(&config, subcommand),
        Commands::Records { subcommand } => handle_records(&config, subcommand),
        Commands::Movements { record, limit, json } => handle_movements(&config, record, limit, json),
        Commands::Board { limit, json } => handle_board(&config, limit, json),
        Commands::Stats { json } => handle_stats(&config, json),
        Commands::Reset { yes } => handle_reset(&config, yes),
        Commands::Serve { host, port } => handle_serve(&config, host, port),
    }
}

fn open_pipeline(config: &Config) -> Result<Pipeline> {
    let conn = DbConnection::connect_at(&config.data_location)
        .context("Failed to connect to database")?;
    Ok(Pipeline::new(conn, config.default_actor.clone()))
}

/// Ask a yes/no question on stdout; anything but y/yes declines
fn confirm(question: &str) -> Result<bool> {
    use std::io::{self, Write};

    print!("{} (y/n): ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_date_arg(value: &str, flag: &str) -> Result<NaiveDate> {
    parse_date_expr(value).map_err(|e| usage(format!("--{}: {}", flag, e)))
}

fn handle_init(config: &Config, sample: bool) -> Result<()> {
    let pipeline = open_pipeline(config)?;

    let stages = seed::install_default_stages(&pipeline)?;
    if stages.is_empty() {
        println!("Stages already exist; default pipeline not installed.");
    } else {
        println!("Created {} default stages.", stages.len());
    }

    if sample {
        let records = seed::install_sample_records(&pipeline, None)?;
        println!("Added {} sample records.", records.len());
    }
    Ok(())
}

fn handle_stages(config: &Config, cmd: StageCommands) -> Result<()> {
    let pipeline = open_pipeline(config)?;

    match cmd {
        StageCommands::List { json } => {
            let stages = pipeline.list_stages()?;
            if json {
                return print_json(&stages);
            }
            let stats = pipeline.stats()?;
            let counts: HashMap<i64, usize> = stats
                .stages
                .iter()
                .map(|s| (s.stage_id, s.record_count))
                .collect();
            print!("{}", format_stage_table(&stages, &counts));
            Ok(())
        }
        StageCommands::Add { name, position, description } => {
            validate_non_empty(&name, "Stage name").map_err(usage)?;
            let stage = pipeline.create_stage(&NewStage { name, position, description })?;
            println!("Created stage {} '{}' at position {}", stage.id, stage.name, stage.position);
            Ok(())
        }
        StageCommands::Edit { id, name, position, description, clear_description } => {
            let description = if clear_description {
                Some(None)
            } else {
                description.map(Some)
            };
            if name.is_none() && position.is_none() && description.is_none() {
                return Err(usage("Nothing to change. Use --name, --position, --description or --clear-description."));
            }
            let stage = pipeline.update_stage(id, &StagePatch { name, position, description })?;
            println!("Updated stage {} '{}' (position {})", stage.id, stage.name, stage.position);
            Ok(())
        }
        StageCommands::Delete { id, reassign, cascade, by, yes } => {
            let stage = pipeline.get_stage(id)?;
            let mode = match (reassign, cascade) {
                (Some(target), _) => StageDeletion::ReassignTo(target),
                (None, true) => StageDeletion::Cascade,
                (None, false) => StageDeletion::Refuse,
            };

            if !yes && !confirm(&format!("Delete stage {} ({})?", stage.id, stage.name))? {
                println!("Cancelled.");
                return Ok(());
            }

            let report = pipeline.delete_stage(id, mode, by.as_deref())?;
            println!("Deleted stage {}: {}", stage.id, stage.name);
            if report.moved_records > 0 {
                println!("Moved {} record(s).", report.moved_records);
            }
            if report.deleted_records > 0 {
                println!("Deleted {} record(s).", report.deleted_records);
            }
            Ok(())
        }
        StageCommands::Reorder { ids } => {
            let stages = pipeline.reorder_stages(&ids)?;
            println!("Reordered {} stage(s).", stages.len());
            Ok(())
        }
    }
}

/// Convert record field flags into a create request
fn build_new_record(stage: i64, project: String, customer: String, fields: RecordFields) -> Result<NewRecord> {
    Ok(NewRecord {
        stage_id: Some(stage),
        project_name: project,
        customer_name: customer,
        email: fields.email,
        phone: fields.phone,
        address: fields.address,
        priority: fields.priority.as_deref().map(validate_priority).transpose().map_err(usage)?,
        budget: fields.budget.map(validate_budget).transpose().map_err(usage)?,
        start_date: fields.start.as_deref().map(|v| parse_date_arg(v, "start")).transpose()?,
        due_date: fields.due.as_deref().map(|v| parse_date_arg(v, "due")).transpose()?,
        description: fields.description,
        notes: fields.notes,
    })
}

/// Convert record field flags into a patch.
///
/// `--clear <field>` together with a value for the same field is rejected.
fn build_record_patch(
    stage: Option<i64>,
    project: Option<String>,
    customer: Option<String>,
    fields: RecordFields,
    clear: &[ClearableField],
) -> Result<RecordPatch> {
    fn merge<T>(value: Option<T>, cleared: bool, flag: &str) -> Result<Option<Option<T>>> {
        match (value, cleared) {
            (Some(_), true) => Err(usage(format!("--{} and --clear {} cannot be combined", flag, flag))),
            (Some(v), false) => Ok(Some(Some(v))),
            (None, true) => Ok(Some(None)),
            (None, false) => Ok(None),
        }
    }
    let cleared = |field: ClearableField| clear.contains(&field);

    let budget = fields.budget.map(validate_budget).transpose().map_err(usage)?;
    let start = fields.start.as_deref().map(|v| parse_date_arg(v, "start")).transpose()?;
    let due = fields.due.as_deref().map(|v| parse_date_arg(v, "due")).transpose()?;

    Ok(RecordPatch {
        stage_id: stage,
        project_name: project,
        customer_name: customer,
        email: merge(fields.email, cleared(ClearableField::Email), "email")?,
        phone: merge(fields.phone, cleared(ClearableField::Phone), "phone")?,
        address: merge(fields.address, cleared(ClearableField::Address), "address")?,
        priority: fields.priority.as_deref().map(validate_priority).transpose().map_err(usage)?,
        budget: merge(budget, cleared(ClearableField::Budget), "budget")?,
        start_date: merge(start, cleared(ClearableField::Start), "start")?,
        due_date: merge(due, cleared(ClearableField::Due), "due")?,
        description: merge(fields.description, cleared(ClearableField::Description), "description")?,
        notes: merge(fields.notes, cleared(ClearableField::Notes), "notes")?,
    })
}

fn stage_names(pipeline: &Pipeline) -> Result<HashMap<i64, String>> {
    Ok(pipeline
        .list_stages()?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect())
}

fn handle_records(config: &Config, cmd: RecordCommands) -> Result<()> {
    let pipeline = open_pipeline(config)?;

    match cmd {
        RecordCommands::List { stage, json } => {
            let records = pipeline.list_records(stage)?;
            if json {
                return print_json(&records);
            }
            print!("{}", format_record_table(&records, &stage_names(&pipeline)?));
            Ok(())
        }
        RecordCommands::Show { id, json } => {
            let record = pipeline.get_record(id)?;
            let movements = pipeline.list_movements(&MovementFilter::for_record(id))?;
            if json {
                return print_json(&serde_json::json!({
                    "record": record,
                    "movements": movements,
                }));
            }
            let stage_name = stage_names(&pipeline)?
                .remove(&record.stage_id)
                .unwrap_or_else(|| format!("[{}]", record.stage_id));
            print!(
                "{}",
                format_record_summary(&record, &stage_name, &movements, Utc::now(), is_tty())
            );
            Ok(())
        }
        RecordCommands::Add { stage, project, customer, fields, by } => {
            let data = build_new_record(stage, project, customer, fields)?;
            let record = pipeline.create_record(&data, by.as_deref())?;
            println!("Created record {}: {}", record.id, record.project_name);
            Ok(())
        }
        RecordCommands::Edit { id, stage, project, customer, fields, clear, by } => {
            let patch = build_record_patch(stage, project, customer, fields, &clear)?;
            let record = pipeline.update_record(id, &patch, by.as_deref())?;
            println!("Updated record {}: {}", record.id, record.project_name);
            Ok(())
        }
        RecordCommands::Move { id, stage_id, by } => {
            let before = pipeline.get_record(id)?;
            let record = pipeline.move_record(id, stage_id, by.as_deref())?;
            if before.stage_id == stage_id {
                println!("Record {} is already in that stage.", record.id);
            } else {
                let target = pipeline.get_stage(record.stage_id)?;
                println!("Moved record {} to '{}'", record.id, target.name);
            }
            Ok(())
        }
        RecordCommands::Delete { id, yes } => {
            let record = pipeline.get_record(id)?;
            if !yes && !confirm(&format!("Delete record {} ({})?", record.id, record.project_name))? {
                println!("Cancelled.");
                return Ok(());
            }
            pipeline.delete_record(id)?;
            println!("Deleted record {}: {}", record.id, record.project_name);
            Ok(())
        }
    }
}

fn handle_movements(config: &Config, record: Option<i64>, limit: Option<usize>, json: bool) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    let movements = pipeline.list_movements(&MovementFilter { record_id: record, limit })?;
    if json {
        return print_json(&movements);
    }
    print!("{}", format_movement_table(&movements, Utc::now()));
    Ok(())
}

fn handle_board(config: &Config, limit: Option<usize>, json: bool) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    if json {
        return print_json(&pipeline.board(limit)?);
    }
    let board = pipeline.board(Some(limit.unwrap_or(config.board_limit)))?;
    print!("{}", format_board(&board, get_terminal_width(), is_tty()));
    Ok(())
}

fn handle_stats(config: &Config, json: bool) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    let stats = pipeline.stats()?;
    if json {
        return print_json(&stats);
    }
    print!("{}", format_stats(&stats));
    Ok(())
}

fn handle_reset(config: &Config, yes: bool) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    if !yes && !confirm("Delete ALL stages, records and movement history?")? {
        println!("Cancelled.");
        return Ok(());
    }
    let report = pipeline.reset()?;
    println!(
        "Removed {} stage(s), {} record(s), {} movement(s).",
        report.stages, report.records, report.movements
    );
    Ok(())
}

fn handle_serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    let host = host.unwrap_or_else(|| config.api_host.clone());
    let port = port.unwrap_or(config.api_port);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(api::start_server(pipeline, &host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    #[test]
    fn test_cli_parses_nested_commands() {
        let cli = Cli::try_parse_from(["pipeboard", "records", "move", "3", "5", "--by", "ops"]).unwrap();
        match cli.command {
            Commands::Records { subcommand: RecordCommands::Move { id, stage_id, by } } => {
                assert_eq!((id, stage_id), (3, 5));
                assert_eq!(by.as_deref(), Some("ops"));
            }
            _ => panic!("expected records move"),
        }
    }

    #[test]
    fn test_reorder_accepts_comma_list() {
        let cli = Cli::try_parse_from(["pipeboard", "stages", "reorder", "3,1,2"]).unwrap();
        match cli.command {
            Commands::Stages { subcommand: StageCommands::Reorder { ids } } => assert_eq!(ids, vec![3, 1, 2]),
            _ => panic!("expected stages reorder"),
        }
    }

    #[test]
    fn test_delete_reassign_conflicts_with_cascade() {
        let result = Cli::try_parse_from(["pipeboard", "stages", "delete", "1", "--reassign", "2", "--cascade"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_new_record_parses_fields() {
        let fields = RecordFields {
            priority: Some("HIGH".into()),
            budget: Some(1500.0),
            due: Some("2026-04-30".into()),
            ..RecordFields::default()
        };
        let data = build_new_record(2, "Deck".into(), "Ann".into(), fields).unwrap();
        assert_eq!(data.stage_id, Some(2));
        assert_eq!(data.priority, Some(Priority::High));
        assert_eq!(data.due_date, NaiveDate::from_ymd_opt(2026, 4, 30));
    }

    #[test]
    fn test_build_new_record_rejects_bad_input() {
        let fields = RecordFields { priority: Some("urgent".into()), ..RecordFields::default() };
        assert!(build_new_record(1, "P".into(), "C".into(), fields).is_err());

        let fields = RecordFields { due: Some("someday".into()), ..RecordFields::default() };
        assert!(build_new_record(1, "P".into(), "C".into(), fields).is_err());
    }

    #[test]
    fn test_build_record_patch_clear() {
        let fields = RecordFields { notes: Some("call first".into()), ..RecordFields::default() };
        let patch = build_record_patch(None, None, None, fields, &[ClearableField::Email]).unwrap();
        assert_eq!(patch.email, Some(None));
        assert_eq!(patch.notes, Some(Some("call first".to_string())));
        assert_eq!(patch.phone, None);

        let fields = RecordFields { email: Some("a@b.c".into()), ..RecordFields::default() };
        assert!(build_record_patch(None, None, None, fields, &[ClearableField::Email]).is_err());
    }
}
