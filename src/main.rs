use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use idverify::model::Decision;
use idverify::{IdentityClaim, Verifier};

#[derive(Parser, Debug)]
#[command(name = "idverify")]
#[command(version, about = "Verify a photographed ID document against a claimed identity", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the verification pipeline on one document image
    Verify {
        /// Path to the document image (PNG/JPEG)
        image: PathBuf,

        /// Claimed email address (name may be derived from its local part)
        #[arg(long)]
        email: Option<String>,

        /// Claimed full name
        #[arg(long)]
        name: Option<String>,

        /// Claimed student number
        #[arg(long)]
        student_id: Option<String>,

        /// Emit the full outcome as JSON (including the per-variant trace)
        #[arg(long)]
        json: bool,
    },

    /// List the preprocessing variants in catalog order
    Variants,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Verify { image, email, name, student_id, json } => {
            run_verify(image, email, name, student_id, json)
        }
        Commands::Variants => {
            for variant in idverify::preprocess::catalog() {
                println!("{}", variant.name);
            }
            Ok(())
        }
    }
}

fn run_verify(
    image: PathBuf,
    email: Option<String>,
    name: Option<String>,
    student_id: Option<String>,
    json: bool,
) -> Result<()> {
    if !image.exists() {
        anyhow::bail!("input image does not exist: {}", image.display());
    }

    let claim = IdentityClaim { email, declared_full_name: name, student_id };

    let verifier = Verifier::new();
    let outcome = verifier
        .verify(&image, &claim)
        .with_context(|| format!("failed to verify {}", image.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let decision = match outcome.decision {
        Decision::AutoApproved => "auto approved",
        Decision::PendingReview => "pending review",
        Decision::RejectedNoSignal => "rejected (no signal)",
    };
    println!("decision:   {decision}");
    println!("confidence: {}", outcome.confidence);
    if let Some(id) = &outcome.extracted.student_id {
        println!("student id: {id} (match: {})", outcome.extracted.matches.student_id);
    }
    if let Some(found) = &outcome.extracted.name {
        println!("name:       {found} (match: {})", outcome.extracted.matches.name);
    }
    if let Some(inst) = &outcome.extracted.institution {
        println!("institution: {inst}");
    }
    for reason in &outcome.failure_reasons {
        println!("  - {reason}");
    }

    Ok(())
}
