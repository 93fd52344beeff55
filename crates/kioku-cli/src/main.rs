//! Kioku CLI - Memory lifecycle decisions over record files
//!
//! Runs the rule engines against JSON record files: classify, score, detect
//! conflicts, forget, prune and consolidate. Record files hold either one
//! record object or an array of them.

mod config;
mod records;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kioku::{
    Classifier, ConflictDetector, ForgettingManager, ImportanceScorer, MemoryContext,
    MemoryEngine, MemoryMerger, MemoryRecord, PruneStrategy, RuleClassifier,
    RuleImportanceScorer, RuleMemoryMerger,
};

use config::Config;
use records::{apply_patches, read_records, write_records};

#[derive(Parser)]
#[command(name = "kioku")]
#[command(about = "Kioku CLI - Memory lifecycle decisions over record files", long_about = None)]
#[command(version)]
struct Cli {
    /// Context hints passed to every decision (key=value, repeatable)
    #[arg(short = 'c', long = "context", value_parser = parse_context_pair, global = true)]
    context: Vec<(String, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify text or every record in a file
    Classify {
        /// Memory content (or use -f for file)
        content: Option<String>,
        /// Read records from a JSON file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Score and rank records by importance
    Score {
        /// JSON record file
        file: PathBuf,
        /// Show the per-factor breakdown
        #[arg(long)]
        explain: bool,
    },

    /// Detect conflicts between new content and stored records
    Conflicts {
        /// New memory content
        content: String,
        /// JSON record file with the stored records
        #[arg(short, long)]
        file: PathBuf,
        /// Also resolve each conflict
        #[arg(long)]
        resolve: bool,
    },

    /// Evaluate the forgetting policy for every record
    Forget {
        /// JSON record file
        file: PathBuf,
        /// Write the records with deprecations applied
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Cut a record set down to a target size
    Prune {
        /// JSON record file
        file: PathBuf,
        /// Records to keep (defaults to the configured prune target)
        #[arg(short, long)]
        target: Option<usize>,
        /// least_recently_used, least_important, oldest, highest_decay, balanced
        #[arg(short, long, default_value = "balanced")]
        strategy: PruneStrategy,
        /// Write the surviving records
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge groups of near-duplicate records
    Consolidate {
        /// JSON record file
        file: PathBuf,
        /// Word overlap at which records are grouped
        #[arg(long)]
        threshold: Option<f64>,
        /// Write the consolidated record set
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a new memory through the full ingest pipeline
    Ingest {
        /// New memory content
        content: String,
        /// JSON record file with the stored records
        #[arg(short, long)]
        file: PathBuf,
        /// Write the updated record set
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Refresh scores, forget and consolidate in one pass
    Maintain {
        /// JSON record file
        file: PathBuf,
        /// Write the maintained record set
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set a value by dotted key (e.g. engine.conflict.semantic_threshold)
    Set { key: String, value: String },
    /// Restore defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context: MemoryContext = cli.context.into_iter().collect();

    match cli.command {
        Commands::Classify { content, file } => cmd_classify(content, file, &context).await,
        Commands::Score { file, explain } => cmd_score(file, explain, &context).await,
        Commands::Conflicts { content, file, resolve } => {
            cmd_conflicts(content, file, resolve, &context).await
        }
        Commands::Forget { file, output } => cmd_forget(file, output),
        Commands::Prune { file, target, strategy, output } => {
            cmd_prune(file, target, strategy, output)
        }
        Commands::Consolidate { file, threshold, output } => {
            cmd_consolidate(file, threshold, output).await
        }
        Commands::Ingest { content, file, output } => {
            cmd_ingest(content, file, output, &context).await
        }
        Commands::Maintain { file, output } => cmd_maintain(file, output, &context).await,
        Commands::Config { action } => cmd_config(action.unwrap_or(ConfigAction::Show)),
    }
}

fn parse_context_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

// ============================================
// Command Implementations
// ============================================

async fn cmd_classify(
    content: Option<String>,
    file: Option<PathBuf>,
    context: &MemoryContext,
) -> Result<()> {
    let classifier = RuleClassifier::new();

    let texts: Vec<(String, String)> = match (content, file) {
        (Some(c), None) => vec![("-".to_string(), c)],
        (None, Some(f)) => read_records(&f)?
            .into_iter()
            .map(|r| (r.id().to_string(), r.content().to_string()))
            .collect(),
        (Some(_), Some(_)) => bail!("Cannot specify both content and --file"),
        (None, None) => bail!("Provide content or --file"),
    };

    for (id, text) in texts {
        let memory_type = classifier.classify(&text, context).await?;
        let tags: Vec<String> = classifier.score_tags(&text, memory_type).into_iter().collect();
        let entities: Vec<String> = classifier.extract_entities(&text).into_iter().collect();

        println!(
            "{} {} {}",
            id.dimmed(),
            format!("[{}]", memory_type).cyan().bold(),
            truncate_string(&text, 60)
        );
        println!("    tags: {}", tags.join(", "));
        if !entities.is_empty() {
            println!("    entities: {}", entities.join(", ").yellow());
        }
    }

    Ok(())
}

async fn cmd_score(file: PathBuf, explain: bool, context: &MemoryContext) -> Result<()> {
    let records = read_records(&file)?;
    let ranked = RuleImportanceScorer::new().rank(&records, context).await?;

    println!("{}", "Importance ranking:".bold());
    for (record, score) in ranked {
        let level = format!("{:<8}", score.importance.to_string());
        let level = if score.importance.is_high_priority() {
            level.red()
        } else if score.importance.is_low_priority() {
            level.dimmed()
        } else {
            level.yellow()
        };
        println!(
            "  {:.2} {} conf {:.2}  {}",
            score.total,
            level,
            score.confidence,
            truncate_string(record.content(), 60)
        );
        if explain {
            for (factor, value) in score.breakdown.factors() {
                println!("        {:<14} {:+.2}", factor.dimmed(), value);
            }
        }
    }

    Ok(())
}

async fn cmd_conflicts(
    content: String,
    file: PathBuf,
    resolve: bool,
    context: &MemoryContext,
) -> Result<()> {
    let config = Config::load()?;
    let existing = read_records(&file)?;

    let classifier = RuleClassifier::new();
    let memory_type = classifier.classify(&content, context).await?;
    let new_memory = MemoryRecord::new(config.user.clone(), content).with_type(memory_type);

    let detector = ConflictDetector::new(config.engine.conflict.clone());
    let conflicts = detector.detect(&new_memory, &existing).await;

    if conflicts.is_empty() {
        println!("{} No conflicts", "✓".green());
        return Ok(());
    }

    println!("{} conflicts:", conflicts.len().to_string().yellow());
    for conflict in &conflicts {
        println!(
            "  {} {:.2} (similarity {:.2}) {}",
            format!("[{}]", conflict.conflict_type).red(),
            conflict.confidence,
            conflict.similarity,
            truncate_string(conflict.existing_memory.content(), 60)
        );
        println!("      {}", conflict.reason.dimmed());
        if resolve {
            let resolution = detector.resolve(conflict).await?;
            println!(
                "      → {} {}",
                resolution.strategy.to_string().cyan(),
                resolution.reason.dimmed()
            );
            if let Some(merged) = &resolution.merged_content {
                println!("      {}", truncate_string(merged, 80));
            }
        }
    }

    Ok(())
}

fn cmd_forget(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let mut records = read_records(&file)?;
    let manager = ForgettingManager::new(config.engine.forgetting);

    for decision in manager.evaluate_all(&records) {
        let verdict = if decision.forget { "forget".red() } else { "keep".green() };
        println!(
            "  {} {:<6} retention {:.3} [{}] {}",
            decision.memory_id.dimmed(),
            verdict,
            decision.retention,
            decision.strategy,
            decision.reason.dimmed()
        );
    }

    let patches = manager.forgetting_pass(&records);
    println!("{} of {} records forgotten", patches.len(), records.len());

    if let Some(path) = output {
        apply_patches(&mut records, &patches);
        write_records(&path, &records)?;
        println!("{} Written to {:?}", "✓".green(), path);
    }

    Ok(())
}

fn cmd_prune(
    file: PathBuf,
    target: Option<usize>,
    strategy: PruneStrategy,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load()?;
    let records = read_records(&file)?;
    let target = target.unwrap_or(config.prune_target);

    let manager = ForgettingManager::new(config.engine.forgetting);
    let kept = manager.prune(&records, target, strategy);

    println!(
        "Kept {} of {} records ({})",
        kept.len().to_string().green(),
        records.len(),
        strategy
    );
    for record in &kept {
        println!(
            "  {} [{}] {}",
            record.id().dimmed(),
            record.importance(),
            truncate_string(record.content(), 60)
        );
    }

    if let Some(path) = output {
        write_records(&path, &kept)?;
        println!("{} Written to {:?}", "✓".green(), path);
    }

    Ok(())
}

async fn cmd_consolidate(
    file: PathBuf,
    threshold: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load()?;
    let records = read_records(&file)?;
    let threshold = threshold.unwrap_or(config.engine.merge.consolidation_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        bail!("Threshold must be within [0, 1], got {}", threshold);
    }

    let merger = RuleMemoryMerger::new(config.engine.merge.clone());
    let consolidated = merger.consolidate(&records, threshold).await?;

    let input_ids: HashSet<&str> = records.iter().map(|r| r.id()).collect();
    let merged: Vec<&MemoryRecord> = consolidated
        .iter()
        .filter(|r| !input_ids.contains(r.id()))
        .collect();
    println!(
        "{} records → {} ({} merged)",
        records.len(),
        consolidated.len().to_string().green(),
        merged.len()
    );
    for record in merged {
        println!("  {}", truncate_string(record.content(), 80));
    }

    if let Some(path) = output {
        write_records(&path, &consolidated)?;
        println!("{} Written to {:?}", "✓".green(), path);
    }

    Ok(())
}

async fn cmd_ingest(
    content: String,
    file: PathBuf,
    output: Option<PathBuf>,
    context: &MemoryContext,
) -> Result<()> {
    let config = Config::load()?;
    let mut records = read_records(&file)?;
    let engine = MemoryEngine::new(config.engine);

    let outcome = engine
        .ingest(MemoryRecord::new(config.user, content), &records, context)
        .await?;

    for (conflict, resolution) in &outcome.resolutions {
        println!(
            "  {} with {} → {}",
            format!("[{}]", conflict.conflict_type).red(),
            conflict.existing_memory.id().dimmed(),
            resolution.strategy.to_string().cyan()
        );
    }

    apply_patches(&mut records, &outcome.patches);
    if let Some(merged) = outcome.merged {
        println!("{} Merged: {}", "✓".green(), truncate_string(merged.content(), 80));
        records.push(merged);
    } else if outcome.store {
        println!(
            "{} Stored [{}] [{}]",
            "✓".green(),
            outcome.record.memory_type(),
            outcome.record.importance()
        );
        records.push(outcome.record);
    } else {
        println!("{} Absorbed by an existing memory", "✓".yellow());
    }

    if let Some(path) = output {
        write_records(&path, &records)?;
        println!("{} Written to {:?}", "✓".green(), path);
    }

    Ok(())
}

async fn cmd_maintain(
    file: PathBuf,
    output: Option<PathBuf>,
    context: &MemoryContext,
) -> Result<()> {
    let config = Config::load()?;
    let mut records = read_records(&file)?;
    let engine = MemoryEngine::new(config.engine);

    let report = engine.maintain(&records, context).await?;

    println!(
        "{} live, {} deprecated, {} merged",
        report.records.len().to_string().green(),
        report.deprecated.len().to_string().red(),
        report.merged.len()
    );

    if let Some(path) = output {
        apply_patches(&mut records, &report.patches);
        records.extend(report.merged);
        write_records(&path, &records)?;
        println!("{} Written to {:?}", "✓".green(), path);
    }

    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = Config::load()?;

    match action {
        ConfigAction::Show => {
            println!("{}", "Configuration:".bold());
            println!("  Path: {:?}", Config::config_path()?);
            println!();
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Set { key, value } => {
            config
                .set(&key, &value)
                .with_context(|| format!("Could not set '{}'", key))?;
            config.save()?;
            println!("{} {} = {}", "✓".green(), key.cyan(), value);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("{} Configuration reset to defaults", "✓".green());
        }
    }

    Ok(())
}

/// Truncate string safely for UTF-8 (by char count, not bytes)
fn truncate_string(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        format!("{}...", chars.into_iter().collect::<String>())
    } else {
        s.to_string()
    }
}
