//! CERMINE adapter for bibliographic extraction.
//!
//! Runs the CERMINE content extractor as a `java` subprocess against a
//! private copy of the document, then reads the JATS XML (`.cermxml`) it
//! writes next to that copy. The working directory is temporary unless
//! moderators ask to keep it for inspection.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::BibliographicPipeline;
use crate::domain::{BibliographicRecord, Document};
use crate::evidence::normalize_whitespace;

pub const CERMINE_MAIN_CLASS: &str = "pl.edu.icm.cermine.ContentExtractor";

/// Where CERMINE's working files live
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkingDir {
    /// Fresh temporary directory, removed afterwards
    #[default]
    Temporary,
    /// Fresh temporary directory, left on disk
    KeepTemporary,
    /// One subdirectory per document (named after its file stem), never removed
    Folder(PathBuf),
}

/// CERMINE adapter using subprocess mode
pub struct CermineAdapter {
    /// Java launcher (default: "java")
    java: String,
    jar: PathBuf,
    timeout: Duration,
    working_dir: WorkingDir,
}

impl CermineAdapter {
    pub fn new(jar: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            java: "java".to_string(),
            jar: jar.into(),
            timeout,
            working_dir: WorkingDir::Temporary,
        }
    }

    pub fn with_java(mut self, java: impl Into<String>) -> Self {
        self.java = java.into();
        self
    }

    pub fn with_working_dir(mut self, working_dir: WorkingDir) -> Self {
        self.working_dir = working_dir;
        self
    }

    /// Directory CERMINE runs in for `document`.
    ///
    /// The returned guard, if any, deletes the directory when dropped.
    async fn prepare_workdir(&self, document: &Document) -> Result<(PathBuf, Option<TempDir>)> {
        if let WorkingDir::Folder(root) = &self.working_dir {
            let stem = document
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| document.file_name());
            let dir = root.join(stem);
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create CERMINE working folder {}", dir.display()))?;
            return Ok((dir, None));
        }

        let temp = tempfile::Builder::new()
            .prefix("msversion-cermine-")
            .tempdir()
            .context("Failed to create CERMINE scratch directory")?;

        if self.working_dir == WorkingDir::KeepTemporary {
            let dir = temp.keep();
            info!(path = %dir.display(), "Keeping CERMINE working directory");
            Ok((dir, None))
        } else {
            Ok((temp.path().to_path_buf(), Some(temp)))
        }
    }

    /// Run CERMINE over a working directory holding one document copy and
    /// return the JATS output, if any was written
    async fn execute_subprocess(&self, document: &Document) -> Result<Option<String>> {
        let (workdir, _guard) = self.prepare_workdir(document).await?;

        let copy = workdir.join(document.file_name());
        tokio::fs::copy(&document.path, &copy)
            .await
            .with_context(|| format!("Failed to stage {} for CERMINE", document.path.display()))?;

        let child = Command::new(&self.java)
            .arg("-cp")
            .arg(&self.jar)
            .arg(CERMINE_MAIN_CLASS)
            .arg("-path")
            .arg(&workdir)
            .args(["-outputs", "jats"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn CERMINE via '{}'", self.java))?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| format!("CERMINE timed out after {:?}", self.timeout))?
            .context("Failed to wait for CERMINE process")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "CERMINE failed with exit code {}: {}",
                exit_code,
                stderr.trim()
            );
        }

        let jats_path = copy.with_extension("cermxml");
        if !jats_path.exists() {
            debug!(path = %jats_path.display(), "CERMINE wrote no JATS output");
            return Ok(None);
        }

        let xml = tokio::fs::read_to_string(&jats_path)
            .await
            .with_context(|| format!("Failed to read CERMINE output {}", jats_path.display()))?;
        Ok(Some(xml))
    }
}

#[async_trait]
impl BibliographicPipeline for CermineAdapter {
    fn name(&self) -> &str {
        "cermine"
    }

    async fn extract(&self, document: &Document) -> Result<Option<BibliographicRecord>> {
        let Some(xml) = self.execute_subprocess(document).await? else {
            return Ok(None);
        };
        let record = parse_jats(&xml)?;
        Ok((!record.is_empty()).then_some(record))
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Doi,
    Title,
    Journal,
}

/// Pull DOI, article title and journal title out of a JATS document.
///
/// - DOI: any `article-id` with `pub-id-type="doi"`
/// - title: `article-title` inside `front`
/// - journal: any `journal-title`
///
/// If a field occurs more than once the last value wins, with a warning.
pub fn parse_jats(xml: &str) -> Result<BibliographicRecord> {
    let mut reader = Reader::from_str(xml);
    let mut record = BibliographicRecord::default();

    let mut in_front = false;
    let mut capture: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().context("Malformed JATS XML")? {
            Event::Start(e) => match e.name().as_ref() {
                b"front" => in_front = true,
                b"article-id" => {
                    let is_doi = e
                        .try_get_attribute("pub-id-type")
                        .context("Malformed JATS attribute")?
                        .map(|attr| attr.unescape_value().map(|v| v == "doi"))
                        .transpose()
                        .context("Malformed JATS attribute value")?
                        .unwrap_or(false);
                    if is_doi {
                        capture = Some(Field::Doi);
                        text.clear();
                    }
                }
                b"article-title" if in_front => {
                    capture = Some(Field::Title);
                    text.clear();
                }
                b"journal-title" => {
                    capture = Some(Field::Journal);
                    text.clear();
                }
                _ => {}
            },
            Event::Text(t) if capture.is_some() => {
                text.push_str(&t.unescape().context("Malformed JATS text")?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"front" => in_front = false,
                b"article-id" | b"article-title" | b"journal-title" => {
                    if let Some(field) = capture.take() {
                        assign(&mut record, field, normalize_whitespace(&text));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(record)
}

fn assign(record: &mut BibliographicRecord, field: Field, value: String) {
    if value.is_empty() {
        return;
    }
    let (slot, label) = match field {
        Field::Doi => (&mut record.doi, "DOI"),
        Field::Title => (&mut record.title, "title"),
        Field::Journal => (&mut record.journal_title, "journal title"),
    };
    if let Some(previous) = slot.as_ref() {
        warn!(%previous, current = %value, "Multiple {} values in JATS output, keeping the last", label);
    }
    *slot = Some(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    const JATS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<article>
  <front>
    <journal-meta>
      <journal-title-group>
        <journal-title>Journal of Fern Studies</journal-title>
      </journal-title-group>
    </journal-meta>
    <article-meta>
      <article-id pub-id-type="publisher-id">jfs-001</article-id>
      <article-id pub-id-type="doi">10.1000/jfs.2020.001</article-id>
      <title-group>
        <article-title>Effects of <italic>drought</italic>
          on fern spores</article-title>
      </title-group>
    </article-meta>
  </front>
  <back>
    <ref-list>
      <ref><article-title>A cited paper</article-title></ref>
    </ref-list>
  </back>
</article>"#;

    #[test]
    fn test_parse_jats() {
        let record = parse_jats(JATS).unwrap();
        assert_eq!(record.doi.as_deref(), Some("10.1000/jfs.2020.001"));
        assert_eq!(record.title.as_deref(), Some("Effects of drought on fern spores"));
        assert_eq!(record.journal_title.as_deref(), Some("Journal of Fern Studies"));
    }

    #[test]
    fn test_last_doi_wins() {
        let xml = r#"<article><front>
            <article-id pub-id-type="doi">10.1/first</article-id>
            <article-id pub-id-type="doi">10.1/second</article-id>
        </front></article>"#;
        let record = parse_jats(xml).unwrap();
        assert_eq!(record.doi.as_deref(), Some("10.1/second"));
        assert!(record.title.is_none());
    }

    #[test]
    fn test_empty_document() {
        let record = parse_jats("<article/>").unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_adapter_configuration() {
        let adapter = CermineAdapter::new("/opt/cermine.jar", Duration::from_secs(60))
            .with_java("/usr/bin/java");
        assert_eq!(adapter.name(), "cermine");
        assert_eq!(adapter.java, "/usr/bin/java");
    }

    fn pdf_in(dir: &std::path::Path) -> Document {
        let pdf = dir.join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        Document::new(&pdf, Default::default())
    }

    /// `sh -cp <script> ...` runs the "jar" argument as a shell script, with
    /// the CERMINE arguments as `$0..$4` (`$2` is the working directory)
    #[cfg(unix)]
    fn fake_cermine(timeout: Duration) -> CermineAdapter {
        let script = r#"for f in "$2"/*.pdf; do printf '%s' '<article><front><article-id pub-id-type="doi">10.1/kept</article-id></front></article>' > "${f%.pdf}.cermxml"; done"#;
        CermineAdapter::new(script, timeout).with_java("/bin/sh")
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_working_folder_keeps_jats_output() {
        let temp = tempfile::TempDir::new().unwrap();
        let document = pdf_in(temp.path());
        let work = temp.path().join("work");

        let adapter = fake_cermine(Duration::from_secs(30))
            .with_working_dir(WorkingDir::Folder(work.clone()));
        let record = adapter.extract(&document).await.unwrap().unwrap();

        assert_eq!(record.doi.as_deref(), Some("10.1/kept"));
        assert!(work.join("paper").join("paper.cermxml").exists());
        assert!(work.join("paper").join("paper.pdf").exists());
    }

    #[tokio::test]
    async fn test_temporary_workdir_is_removed() {
        let temp = tempfile::TempDir::new().unwrap();
        let document = pdf_in(temp.path());
        let adapter = CermineAdapter::new("/opt/cermine.jar", Duration::from_secs(5));

        let (dir, guard) = adapter.prepare_workdir(&document).await.unwrap();
        assert!(dir.exists());
        drop(guard);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_kept_workdir_survives() {
        let temp = tempfile::TempDir::new().unwrap();
        let document = pdf_in(temp.path());
        let adapter = CermineAdapter::new("/opt/cermine.jar", Duration::from_secs(5))
            .with_working_dir(WorkingDir::KeepTemporary);

        let (dir, guard) = adapter.prepare_workdir(&document).await.unwrap();
        assert!(guard.is_none());
        drop(guard);
        assert!(dir.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_launcher_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let pdf = temp.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let adapter = CermineAdapter::new("/nonexistent.jar", Duration::from_secs(5))
            .with_java("/nonexistent/java-binary");
        let document = Document::new(&pdf, Default::default());
        assert!(adapter.extract(&document).await.is_err());
    }
}
