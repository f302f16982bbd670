use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mood_risk::ingest;
use mood_risk::models::RiskAssessment;
use mood_risk::report;
use mood_risk::risk::{self, RiskRules};
use mood_risk::store::ReportStore;

#[derive(Parser)]
#[command(name = "mood-risk")]
#[command(about = "Depression-risk screening over emotion-classified posts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one analysis document
    Assess {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score every subject in a CSV file
    Batch {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Score a document and save a markdown report
    Report {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long, env = "MOOD_RISK_REPORTS_DIR", default_value = "reports")]
        reports_dir: PathBuf,
    },
    /// Inspect saved reports
    History {
        #[arg(long, env = "MOOD_RISK_REPORTS_DIR", default_value = "reports")]
        reports_dir: PathBuf,
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List saved reports, newest first
    List,
    /// Print a saved report
    Show { id: String },
    /// Delete a saved report
    Delete { id: String },
}

fn load_rules(path: Option<&Path>) -> anyhow::Result<RiskRules> {
    let rules = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read rules file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse rules file {}", path.display()))?
        }
        None => RiskRules::default(),
    };
    rules.validate()?;
    Ok(rules)
}

fn print_assessment(subject: &str, assessment: &RiskAssessment) {
    println!("{subject}: {}", assessment.label());
    println!("{}", assessment.explanation);
    for (label, value) in assessment.indicator_breakdown.iter() {
        println!("- {label}: {value:.1}");
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Assess { input, rules, json } => {
            let rules = load_rules(rules.as_deref())?;
            let bundle = ingest::load_bundle(&input)?;
            let assessment = risk::assess_with(Some(&bundle.profile), &rules)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
            } else {
                print_assessment(bundle.username.as_deref().unwrap_or("subject"), &assessment);
            }
        }
        Commands::Batch { csv, rules, limit } => {
            let rules = load_rules(rules.as_deref())?;
            let subjects = ingest::load_csv_profiles(&csv)?;

            if subjects.is_empty() {
                println!("No subjects found in {}.", csv.display());
                return Ok(());
            }

            let mut scored: Vec<(String, RiskAssessment)> = subjects
                .iter()
                .map(|(name, profile)| (name.clone(), risk::assess_risk_with(profile, &rules)))
                .collect();
            scored.sort_by(|a, b| {
                b.1.is_at_risk.cmp(&a.1.is_at_risk).then_with(|| {
                    b.1.total_indicator_score
                        .partial_cmp(&a.1.total_indicator_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
            });

            let at_risk = scored.iter().filter(|(_, a)| a.is_at_risk).count();
            println!("{at_risk} of {} subjects flagged:", scored.len());
            for (name, assessment) in scored.iter().take(limit) {
                println!(
                    "- {} score {:.1} ({})",
                    name,
                    assessment.total_indicator_score,
                    assessment.label()
                );
            }
        }
        Commands::Report {
            input,
            rules,
            reports_dir,
        } => {
            let rules = load_rules(rules.as_deref())?;
            let bundle = ingest::load_bundle(&input)?;
            let assessment = risk::assess_with(Some(&bundle.profile), &rules)?;
            let generated_at = Utc::now();
            let markdown = report::build_report(&bundle, &assessment, generated_at);

            let store = ReportStore::new(reports_dir);
            let username = bundle.username.as_deref().unwrap_or("anonymous");
            let record = store.save(username, &assessment, &markdown, generated_at)?;
            println!(
                "Report {} written to {}.",
                record.id,
                store.report_path(&record.id).display()
            );
        }
        Commands::History {
            reports_dir,
            action,
        } => {
            let store = ReportStore::new(reports_dir);
            match action {
                HistoryAction::List => {
                    let records = store.list()?;
                    if records.is_empty() {
                        println!("No reports saved in {}.", store.root().display());
                        return Ok(());
                    }
                    for record in records {
                        println!(
                            "- {} @{} {} ({})",
                            record.id,
                            record.username,
                            record.created_at.format("%Y-%m-%d %H:%M"),
                            record.assessment.label()
                        );
                    }
                }
                HistoryAction::Show { id } => {
                    let (_, markdown) = store.get(&id)?;
                    print!("{markdown}");
                }
                HistoryAction::Delete { id } => {
                    store.delete(&id)?;
                    println!("Deleted report {id}.");
                }
            }
        }
    }

    Ok(())
}
