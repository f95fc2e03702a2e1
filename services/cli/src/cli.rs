use std::path::PathBuf;

use admissions::analysis::ComparisonReport;
use admissions::config::{AppConfig, RunConfig};
use admissions::error::AppError;
use admissions::import::AdmissionImporter;
use admissions::telemetry;
use admissions::{
    AdmissionData, Allocation, CompositeObserver, MechanismKind, RecordingObserver,
    TracingObserver,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::demo::{run_demo, DemoArgs};
use crate::render::{self, SchoolNames};

#[derive(Parser, Debug)]
#[command(
    name = "admissions",
    about = "Run and compare school admission matching mechanisms",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one mechanism on an admission round
    Run(RunArgs),
    /// Run every mechanism on an admission round and compare the outcomes
    Compare(CompareArgs),
    /// Walk through a built-in admission round (default command)
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
pub(crate) struct InputArgs {
    /// JSON document with applications, exams, and seats
    #[arg(
        long,
        conflicts_with_all = ["csv_applications", "csv_exams"],
        required_unless_present_all = ["csv_applications", "csv_exams"]
    )]
    pub(crate) input: Option<PathBuf>,
    /// CSV export of applications: student,choice_1,choice_2,...
    #[arg(long, requires = "csv_exams")]
    pub(crate) csv_applications: Option<PathBuf>,
    /// CSV export of exam results: school,seats,student_1,student_2,...
    #[arg(long, requires = "csv_applications")]
    pub(crate) csv_exams: Option<PathBuf>,
}

impl InputArgs {
    fn load(self) -> Result<AdmissionData, AppError> {
        let data = match (self.input, self.csv_applications, self.csv_exams) {
            (Some(path), _, _) => AdmissionImporter::from_json_path(path)?,
            (None, Some(applications), Some(exams)) => {
                AdmissionImporter::from_csv_paths(applications, exams)?
            }
            _ => {
                return Err(AppError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "provide --input or both --csv-applications and --csv-exams",
                )))
            }
        };
        Ok(data)
    }
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
    /// Mechanism to run (defaults to ADMISSIONS_MECHANISM or deferred_acceptance)
    #[arg(long)]
    pub(crate) mechanism: Option<MechanismKind>,
    /// Print every round, not only the final allocation
    #[arg(long)]
    pub(crate) trace: bool,
    /// Emit JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CompareArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
    /// Emit JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    mechanism: MechanismKind,
    allocation: &'a Allocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a RecordingObserver>,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Run(args) => run_mechanism(args, &config.run),
        Command::Compare(args) => run_comparison(args),
        Command::Demo(args) => run_demo(args, &config.run),
    }
}

fn run_mechanism(args: RunArgs, defaults: &RunConfig) -> Result<(), AppError> {
    let RunArgs {
        input,
        mechanism,
        trace,
        json,
    } = args;

    let data = input.load()?;
    let mechanism = mechanism.unwrap_or(defaults.mechanism);
    let trace = trace || defaults.trace_steps;
    info!(mechanism = mechanism.key(), trace, "running mechanism");

    let mut recorder = RecordingObserver::new();
    let mut logger = TracingObserver::new();
    let allocation = {
        let mut observer = CompositeObserver::new()
            .with(&mut recorder)
            .with(&mut logger);
        mechanism.run(&data, &mut observer)?
    };

    if json {
        return render::print_json(&RunOutput {
            mechanism,
            allocation: &allocation,
            trace: trace.then_some(&recorder),
        });
    }

    let names = SchoolNames::new();
    if trace {
        render::render_trace(&recorder, &names);
    }
    render::render_allocation(mechanism, &data, &allocation, &names);
    Ok(())
}

fn run_comparison(args: CompareArgs) -> Result<(), AppError> {
    let CompareArgs { input, json } = args;

    let data = input.load()?;
    let report = ComparisonReport::compare_all(&data)?;

    if json {
        return render::print_json(&report);
    }

    render::render_comparison(&report, &data, &SchoolNames::new());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_mechanism_aliases() {
        let cli = Cli::try_parse_from([
            "admissions",
            "run",
            "--input",
            "round.json",
            "--mechanism",
            "sosm",
        ])
        .expect("arguments parse");
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(args.mechanism, Some(MechanismKind::SchoolOptimal));
    }

    #[test]
    fn csv_inputs_must_come_in_pairs() {
        let result = Cli::try_parse_from([
            "admissions",
            "compare",
            "--csv-applications",
            "applications.csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn json_and_csv_inputs_are_exclusive() {
        let result = Cli::try_parse_from([
            "admissions",
            "compare",
            "--input",
            "round.json",
            "--csv-applications",
            "applications.csv",
            "--csv-exams",
            "exams.csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn demo_is_the_default_command() {
        let cli = Cli::try_parse_from(["admissions"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
