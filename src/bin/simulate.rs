//! recovery-sim command-line runner.
//!
//! Runs a full multi-session simulation with the offline scripted agents and
//! writes the run output as JSON.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: tracing filter (default: "info,recovery_sim=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin simulate -- --variant rich --seed 0x2a --sessions 6
//! cargo run --bin simulate -- --config sim.yaml --profile patient.txt --quiet
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use recovery_sim::config::{Difficulty, RunSeed, SimulationConfig};
use recovery_sim::patient::ModelVariant;
use recovery_sim::run::{Collaborators, RunOutput, SimulationRun};
use recovery_sim::utilities::printer::{Printer, PrinterColor};

const DEFAULT_PROFILE: &str = "Long-standing alcohol use with two weeks of sobriety in ten years. \
    Recently relapsed after 40 days sober. Drinks to manage stress after work and on weekends alone. \
    Struggles to find other routines for relaxation.";

/// Simulate multi-session therapy dialogues with an evolving patient state.
#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(version)]
#[command(about = "Simulate multi-session therapy dialogues.", long_about = None)]
struct Cli {
    /// YAML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run seed, decimal or 0x-prefixed hex (generated when omitted)
    #[arg(long)]
    seed: Option<String>,

    /// Number of sessions
    #[arg(long)]
    sessions: Option<u32>,

    /// Turn budget per session
    #[arg(long)]
    max_turns: Option<usize>,

    /// Model variant (simple, rubric, rich)
    #[arg(long)]
    variant: Option<ModelVariant>,

    /// Patient difficulty (easy, medium, hard)
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Directory for the run output file
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Text file with the patient's history
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Don't print transcripts
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn into_config(self) -> Result<(SimulationConfig, Option<PathBuf>, bool)> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_yaml_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => SimulationConfig::default(),
        };
        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        if let Some(sessions) = self.sessions {
            config.num_sessions = sessions;
        }
        if let Some(max_turns) = self.max_turns {
            config.max_turns = max_turns;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if config.seed.is_none() {
            let seed = RunSeed::generate();
            tracing::info!("No seed given; generated {}", seed);
            config.seed = Some(seed.to_string());
        }
        Ok((config, self.profile, self.quiet))
    }
}

fn print_run(output: &RunOutput) {
    let printer = Printer::new();
    for record in &output.sessions {
        printer.print_session_header(record.session_number);
        for stressor in &record.stressors_applied {
            printer.print(
                &format!("Stressor: {} ({})", stressor.name, stressor.description),
                PrinterColor::BoldRed,
            );
        }
        printer.print_transcript(&record.transcript);
        printer.print(
            &format!(
                "Session ended after {} turns ({:?}); strategies: {}",
                record.turns_taken,
                record.end_reason,
                record.strategies_used.join(", ")
            ),
            PrinterColor::BoldBlue,
        );
    }
    printer.print(
        &format!(
            "\nRun {} ({} model, {} first, seed {})",
            output.run_id, output.variant, output.first_speaker, output.seed
        ),
        PrinterColor::BoldCyan,
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recovery_sim=debug".into()),
        )
        .init();

    let (config, profile_path, quiet) = Cli::parse().into_config()?;
    let profile = match profile_path {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read profile {}", path.display()))?,
        None => DEFAULT_PROFILE.to_string(),
    };
    let output_dir = config.output_dir.clone();

    let run = SimulationRun::new(config, Collaborators::scripted())
        .context("failed to set up simulation")?;
    tracing::info!("Running with seed {}", run.seed());
    let output = run.execute(&profile).await;

    if !quiet {
        print_run(&output);
        Printer::new().print_state("Final state:", &summary_lines(&output));
    }

    let path = output
        .write_to_dir(&output_dir)
        .with_context(|| format!("failed to write output to {}", output_dir.display()))?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

fn summary_lines(output: &RunOutput) -> String {
    let s = &output.final_state;
    let mut lines = vec![
        format!("  - Craving: {:.2}", s.craving),
        format!("  - Stress: {:.2}", s.trigger_salience),
        format!("  - Motivation: {:.2}", s.motivation),
        format!("  - Confidence: {:.2}", s.self_efficacy),
        format!("  - Cognitive control: {:.2}", s.cognitive_control),
        format!("  - Habit strength: {:.2}", s.habit_strength),
    ];
    if let (Some(pain), Some(shame)) = (s.emotional_pain, s.shame) {
        lines.push(format!("  - Emotional pain: {:.2}", pain));
        lines.push(format!("  - Shame: {:.2}", shame));
    }
    lines.join("\n")
}
