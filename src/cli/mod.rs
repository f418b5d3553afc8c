//! Command-line interface for msversion.
//!
//! Provides commands for detecting manuscript versions, inspecting the logo
//! catalogue, reviewing the audit log and showing the resolved configuration.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::adapters::{
    BibliographicPipeline, CermineAdapter, DoiResolver, HttpDoiResolver, OfflineResolver,
    SidecarSource, WorkingDir,
};
use crate::config::{self, ResolvedConfig};
use crate::core::{digest_file, AuditEntry, AuditLog, DetectError, Detector};
use crate::domain::{Declaration, DetectionResult, Document};
use crate::evidence::LogoCatalogue;

/// msversion - Manuscript version detection for repository deposits
#[derive(Parser, Debug)]
#[command(name = "msversion")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect the version of one or more manuscript files
    Detect {
        /// Files or glob patterns
        #[arg(required = true)]
        paths: Vec<String>,

        /// Declared manuscript title
        #[arg(long)]
        title: Option<String>,

        /// Declared version (e.g. "accepted manuscript")
        #[arg(long = "version")]
        declared_version: Option<String>,

        /// Declared DOI
        #[arg(long)]
        doi: Option<String>,

        /// Explicit artifact sidecar (single input only)
        #[arg(long)]
        artifacts: Option<PathBuf>,

        /// Append results to the audit log
        #[arg(long)]
        audit_log: bool,

        /// Skip DOI resolution (those tests become indeterminate)
        #[arg(long)]
        no_network: bool,

        /// Maximum documents evaluated at once
        #[arg(short, long, default_value = "4")]
        jobs: usize,

        /// Pretty-print JSON results
        #[arg(long)]
        pretty: bool,

        /// Keep CERMINE's temporary working directories
        #[arg(short = 'k', long)]
        keep_temp: bool,

        /// Run CERMINE in <dir>/<file stem>/ instead of a temporary directory
        #[arg(short = 'w', long, value_name = "DIR", conflicts_with = "keep_temp")]
        working_folder: Option<PathBuf>,
    },

    /// List the publisher logo catalogue
    Logos,

    /// Show recent audit log entries
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Options shared by every document in a `detect` batch
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    pub declaration: Declaration,
    pub artifacts: Option<PathBuf>,
    pub audit_log: bool,
    pub no_network: bool,
    pub jobs: usize,
    pub pretty: bool,
    pub keep_temp: bool,
    pub working_folder: Option<PathBuf>,
}

impl DetectOptions {
    /// Where CERMINE should put its working files
    pub fn cermine_working_dir(&self) -> WorkingDir {
        match (&self.working_folder, self.keep_temp) {
            (Some(folder), _) => WorkingDir::Folder(folder.clone()),
            (None, true) => WorkingDir::KeepTemporary,
            (None, false) => WorkingDir::Temporary,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Detect {
                paths,
                title,
                declared_version,
                doi,
                artifacts,
                audit_log,
                no_network,
                jobs,
                pretty,
                keep_temp,
                working_folder,
            } => {
                let options = DetectOptions {
                    declaration: Declaration {
                        title,
                        version: declared_version,
                        doi,
                        authors: Vec::new(),
                    },
                    artifacts,
                    audit_log,
                    no_network,
                    jobs,
                    pretty,
                    keep_temp,
                    working_folder,
                };
                detect(&paths, options).await
            }
            Commands::Logos => list_logos().await,
            Commands::History { limit } => show_history(limit).await,
            Commands::Config => show_config().await,
        }
    }
}

/// Expand glob patterns; plain paths pass through untouched
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = BTreeSet::new();
    let mut inputs = Vec::new();

    for pattern in patterns {
        let is_glob = pattern.contains(['*', '?', '[']);
        if !is_glob {
            if seen.insert(PathBuf::from(pattern)) {
                inputs.push(PathBuf::from(pattern));
            }
            continue;
        }

        let mut matched = 0usize;
        for entry in glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))? {
            let path = entry.with_context(|| format!("Failed to read match for {}", pattern))?;
            if path.is_file() && seen.insert(path.clone()) {
                inputs.push(path);
                matched += 1;
            }
        }
        if matched == 0 {
            warn!(%pattern, "Glob pattern matched no files");
        }
    }

    Ok(inputs)
}

/// Build a detector from the resolved configuration
pub fn build_detector(cfg: &ResolvedConfig, options: &DetectOptions) -> Result<Detector> {
    let sidecar = Arc::new(match &options.artifacts {
        Some(path) => SidecarSource::with_path(path),
        None => SidecarSource::new(),
    });

    let pipeline: Arc<dyn BibliographicPipeline> = match &cfg.cermine_jar {
        Some(jar) if jar.exists() => {
            debug!(jar = %jar.display(), "Using CERMINE for bibliographic extraction");
            Arc::new(
                CermineAdapter::new(jar, cfg.timeouts.bibliographic())
                    .with_java(cfg.java.clone())
                    .with_working_dir(options.cermine_working_dir()),
            )
        }
        Some(jar) => {
            warn!(jar = %jar.display(), "CERMINE jar not found, reading bibliographic data from sidecars");
            sidecar.clone()
        }
        None => sidecar.clone(),
    };

    let resolver: Arc<dyn DoiResolver> = if options.no_network {
        Arc::new(OfflineResolver)
    } else {
        Arc::new(HttpDoiResolver::new(
            cfg.resolver.base_url.clone(),
            cfg.resolver.user_agent.clone(),
            cfg.timeouts.doi_resolution(),
        ))
    };

    let logos = if cfg.logos.exists() {
        LogoCatalogue::from_file(&cfg.logos)?
    } else {
        debug!(path = %cfg.logos.display(), "No logo catalogue, logo detection will find nothing");
        LogoCatalogue::default()
    };

    Ok(Detector::new(sidecar, pipeline, resolver)
        .with_logos(Arc::new(logos))
        .with_thresholds(cfg.thresholds.clone())
        .with_timeouts(cfg.timeouts.clone()))
}

/// Detect versions for every input, printing one JSON result per document
async fn detect(patterns: &[String], options: DetectOptions) -> Result<()> {
    let cfg = config::config()?;
    let inputs = expand_inputs(patterns)?;

    if inputs.is_empty() {
        anyhow::bail!("No input files found");
    }
    if options.artifacts.is_some() && inputs.len() > 1 {
        anyhow::bail!("--artifacts can only be used with a single input file");
    }

    let detector = build_detector(cfg, &options)?;
    let audit = if options.audit_log {
        Some(AuditLog::open(&cfg.audit_log).await?)
    } else {
        None
    };

    info!(count = inputs.len(), "Evaluating documents");

    let permits = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut tasks = JoinSet::new();

    for path in inputs {
        let detector = detector.clone();
        let declaration = options.declaration.clone();
        let permits = permits.clone();

        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let document = Document::new(&path, declaration);
            let outcome = detector.detect(&document).await;
            (path, outcome)
        });
    }

    let mut failures = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let Some((path, result)) = settle(joined) else {
            failures += 1;
            continue;
        };

        if options.pretty {
            println!("{}", result.to_json_pretty()?);
        } else {
            println!("{}", result.to_json()?);
        }

        if let Some(audit) = &audit {
            let digest = match digest_file(&path).await {
                Ok(digest) => Some(digest),
                Err(e) => {
                    debug!(error = %e, "Could not hash input for the audit log");
                    None
                }
            };
            audit
                .append(&AuditEntry::new(path.display().to_string(), digest, result))
                .await?;
        }
    }

    if failures > 0 {
        anyhow::bail!("{} document(s) could not be evaluated", failures);
    }

    Ok(())
}

/// Unwrap one finished batch task; aborted or panicked evaluations are
/// logged and yield `None`
fn settle(
    joined: Result<(PathBuf, Result<DetectionResult, DetectError>), JoinError>,
) -> Option<(PathBuf, DetectionResult)> {
    match joined {
        Ok((path, Ok(result))) => Some((path, result)),
        Ok((path, Err(e))) => {
            error!(path = %path.display(), error = %e, "Evaluation aborted");
            None
        }
        Err(e) => {
            error!(error = %e, "Detection task panicked");
            None
        }
    }
}

async fn list_logos() -> Result<()> {
    let cfg = config::config()?;

    if !cfg.logos.exists() {
        println!("No logo catalogue at {}", cfg.logos.display());
        return Ok(());
    }

    let catalogue = LogoCatalogue::from_file(&cfg.logos)?;
    if catalogue.is_empty() {
        println!("Logo catalogue is empty");
        return Ok(());
    }

    println!("{:<24} {:<20} {:<18} {}", "NAME", "PUBLISHER", "HASH", "VERSIONS");
    println!("{}", "-".repeat(90));

    for entry in catalogue.entries() {
        let versions: Vec<&str> = entry.versions.iter().map(|v| v.code()).collect();
        println!(
            "{:<24} {:<20} {:<18} {}",
            entry.name,
            entry.publisher.as_deref().unwrap_or("-"),
            entry.hash.map(|h| format!("{:016x}", h)).unwrap_or_default(),
            versions.join(", ")
        );
    }

    Ok(())
}

async fn show_history(limit: usize) -> Result<()> {
    let cfg = config::config()?;
    let log = AuditLog::open(&cfg.audit_log).await?;
    let entries = log.recent(limit).await?;

    if entries.is_empty() {
        println!("No audit entries found");
        return Ok(());
    }

    println!("{:<26} {:<30} {:<8} {}", "EVALUATED", "FILE", "DEPOSIT", "REASON");
    println!("{}", "-".repeat(100));

    for entry in entries {
        let result = &entry.result;
        println!(
            "{:<26} {:<30} {:<8} {}",
            result.evaluated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            result.input_file,
            if result.approve_deposit { "yes" } else { "no" },
            result.reason
        );
    }

    Ok(())
}

async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("msversion configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:           {}", cfg.home.display());
    println!("  Logo catalogue: {}", cfg.logos.display());
    println!("  Audit log:      {}", cfg.audit_log.display());
    println!(
        "  CERMINE jar:    {}",
        cfg.cermine_jar
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using sidecars)".to_string())
    );
    println!();
    println!("DOI resolver:");
    println!("  Base URL:   {}", cfg.resolver.base_url);
    println!("  User-Agent: {}", cfg.resolver.user_agent);
    println!();
    println!("Thresholds:");
    println!("  Title similarity:  {}", cfg.thresholds.min_title_similarity);
    println!("  Min text length:   {} chars", cfg.thresholds.min_text_length());
    println!("  Title error ratio: {}", cfg.thresholds.title_error_ratio);
    println!("  Logo distance:     {} bits", cfg.thresholds.max_logo_distance);
    println!();
    println!("Timeouts:");
    println!("  Extraction:      {}s", cfg.timeouts.extraction_seconds);
    println!("  Bibliographic:   {}s", cfg.timeouts.bibliographic_seconds);
    println!("  DOI resolution:  {}s", cfg.timeouts.doi_resolution_seconds);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_inputs() {
        let temp = TempDir::new().unwrap();
        for name in ["a.pdf", "b.pdf", "c.docx"] {
            std::fs::write(temp.path().join(name), b"x").unwrap();
        }

        let pattern = format!("{}/*.pdf", temp.path().display());
        let plain = temp.path().join("c.docx").display().to_string();
        let inputs = expand_inputs(&[pattern.clone(), plain.clone(), pattern]).unwrap();

        assert_eq!(inputs.len(), 3);
        assert!(inputs[0].ends_with("a.pdf"));
        assert!(inputs[1].ends_with("b.pdf"));
        assert_eq!(inputs[2], PathBuf::from(plain));
    }

    #[test]
    fn test_parse_detect_command() {
        let cli = Cli::try_parse_from([
            "msversion",
            "detect",
            "paper.pdf",
            "--title",
            "Effects of drought",
            "--version",
            "accepted manuscript",
            "--no-network",
        ])
        .unwrap();

        match cli.command {
            Commands::Detect {
                paths,
                title,
                declared_version,
                no_network,
                jobs,
                ..
            } => {
                assert_eq!(paths, vec!["paper.pdf".to_string()]);
                assert_eq!(title.as_deref(), Some("Effects of drought"));
                assert_eq!(declared_version.as_deref(), Some("accepted manuscript"));
                assert!(no_network);
                assert_eq!(jobs, 4);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_cermine_working_dir_flags() {
        let cli = Cli::try_parse_from(["msversion", "detect", "paper.pdf", "-w", "/tmp/cermine"]).unwrap();
        match cli.command {
            Commands::Detect {
                keep_temp,
                working_folder,
                ..
            } => {
                assert!(!keep_temp);
                assert_eq!(working_folder, Some(PathBuf::from("/tmp/cermine")));
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["msversion", "detect", "paper.pdf", "--keep-temp"]).is_ok());
        assert!(Cli::try_parse_from(["msversion", "detect", "a.pdf", "-k", "-w", "/tmp/x"]).is_err());
    }

    #[test]
    fn test_cermine_working_dir_from_options() {
        assert_eq!(DetectOptions::default().cermine_working_dir(), WorkingDir::Temporary);

        let keep = DetectOptions {
            keep_temp: true,
            ..Default::default()
        };
        assert_eq!(keep.cermine_working_dir(), WorkingDir::KeepTemporary);

        let folder = DetectOptions {
            working_folder: Some(PathBuf::from("/srv/cermine")),
            ..Default::default()
        };
        assert_eq!(
            folder.cermine_working_dir(),
            WorkingDir::Folder(PathBuf::from("/srv/cermine"))
        );
    }

    async fn crashing_evaluation() -> (PathBuf, Result<DetectionResult, DetectError>) {
        panic!("extractor crashed")
    }

    #[tokio::test]
    async fn test_panicked_task_counts_as_failure() {
        let mut tasks = JoinSet::new();
        tasks.spawn(crashing_evaluation());
        tasks.spawn(async {
            let path = PathBuf::from("figure.png");
            let err = DetectError::UnsupportedInput {
                path: path.clone(),
                extension: "png".to_string(),
            };
            (path, Err(err))
        });

        let mut settled = 0;
        while let Some(joined) = tasks.join_next().await {
            assert!(settle(joined).is_none());
            settled += 1;
        }
        // The panic did not stop the other task from being collected
        assert_eq!(settled, 2);
    }

    #[test]
    fn test_build_detector_without_catalogue() {
        let temp = TempDir::new().unwrap();
        let cfg = ResolvedConfig {
            home: temp.path().to_path_buf(),
            logos: temp.path().join("logos.yaml"),
            audit_log: temp.path().join("audit.jsonl"),
            cermine_jar: Some(temp.path().join("missing.jar")),
            java: "java".to_string(),
            resolver: Default::default(),
            thresholds: Default::default(),
            timeouts: Default::default(),
            config_file: None,
        };
        let options = DetectOptions {
            no_network: true,
            ..Default::default()
        };
        let detector = build_detector(&cfg, &options).unwrap();
        assert_eq!(detector.thresholds().min_pages, 3);
    }
}
