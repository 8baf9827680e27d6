//! invrec-artifacts
//!
//! Every run (CLI `run`, daemon session) owns one directory
//! `<root>/<run_id>/` holding its input copy, template, completed template,
//! final file, report, audit log and `manifest.json`. The directory is
//! created exclusively, so two runs can never share an output path.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub source_filename: String,
    pub config_hash: String,
    /// Set once the run has been reconciled.
    pub strategy: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    pub artifacts: ArtifactList,
}

/// File names relative to the run directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactList {
    pub input: String,
    pub template_csv: String,
    pub completed_csv: String,
    pub final_file: String,
    pub report_json: String,
    pub audit_jsonl: String,
    pub manifest_json: String,
}

impl Default for ArtifactList {
    fn default() -> Self {
        Self {
            input: "input.csv".to_string(),
            template_csv: "template.csv".to_string(),
            completed_csv: "completed.csv".to_string(),
            final_file: "final.csv".to_string(),
            report_json: "report.json".to_string(),
            audit_jsonl: "audit.jsonl".to_string(),
            manifest_json: "manifest.json".to_string(),
        }
    }
}

/// Handle on one run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDir {
    pub run_id: Uuid,
    pub dir: PathBuf,
    pub artifacts: ArtifactList,
}

impl RunDir {
    /// Handle on an existing run directory (no filesystem access).
    pub fn at(root: &Path, run_id: Uuid) -> Self {
        Self {
            run_id,
            dir: root.join(run_id.to_string()),
            artifacts: ArtifactList::default(),
        }
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.join(&self.artifacts.input)
    }

    pub fn template_path(&self) -> PathBuf {
        self.dir.join(&self.artifacts.template_csv)
    }

    pub fn completed_path(&self) -> PathBuf {
        self.dir.join(&self.artifacts.completed_csv)
    }

    pub fn final_path(&self) -> PathBuf {
        self.dir.join(&self.artifacts.final_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(&self.artifacts.report_json)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.dir.join(&self.artifacts.audit_jsonl)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(&self.artifacts.manifest_json)
    }
}

pub struct InitRunArtifactsArgs<'a> {
    pub root: &'a Path,
    pub run_id: Uuid,
    pub source_filename: &'a str,
    pub config_hash: &'a str,
}

/// Create `<root>/<run_id>/` with an empty audit log and the manifest.
/// Fails if the run directory already exists.
pub fn init_run_artifacts(args: InitRunArtifactsArgs<'_>) -> Result<RunDir> {
    fs::create_dir_all(args.root)
        .with_context(|| format!("create artifact root failed: {}", args.root.display()))?;

    let run = RunDir::at(args.root, args.run_id);
    if run.dir.exists() {
        bail!("run directory already exists: {}", run.dir.display());
    }
    fs::create_dir(&run.dir)
        .with_context(|| format!("create run dir failed: {}", run.dir.display()))?;

    fs::write(run.audit_path(), "")
        .with_context(|| format!("create audit log failed: {}", run.audit_path().display()))?;

    let now = Utc::now();
    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        run_id: args.run_id,
        source_filename: args.source_filename.to_string(),
        config_hash: args.config_hash.to_string(),
        strategy: None,
        created_at_utc: now,
        updated_at_utc: now,
        artifacts: run.artifacts.clone(),
    };
    write_manifest(&run, &manifest)?;
    Ok(run)
}

pub fn read_manifest(run: &RunDir) -> Result<RunManifest> {
    let path = run.manifest_path();
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read manifest failed: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse manifest failed: {}", path.display()))
}

/// Read, modify and rewrite the manifest; bumps `updated_at_utc`.
pub fn update_manifest(run: &RunDir, f: impl FnOnce(&mut RunManifest)) -> Result<RunManifest> {
    let mut m = read_manifest(run)?;
    f(&mut m);
    m.updated_at_utc = Utc::now();
    write_manifest(run, &m)?;
    Ok(m)
}

fn write_manifest(run: &RunDir, manifest: &RunManifest) -> Result<()> {
    let path = run.manifest_path();
    let json = serde_json::to_string_pretty(manifest).context("serialize manifest failed")?;
    fs::write(&path, format!("{json}\n"))
        .with_context(|| format!("write manifest failed: {}", path.display()))
}

/// Write one artifact of the run.
pub fn write_artifact(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write artifact failed: {}", path.display()))
}

/// Pretty JSON, newline terminated, as `report.json` holds it.
pub fn report_bytes<T: Serialize>(report: &T) -> Result<Vec<u8>> {
    let mut json = serde_json::to_vec_pretty(report).context("serialize report failed")?;
    json.push(b'\n');
    Ok(json)
}

/// Write several artifacts as one step. Each file is written next to its
/// target as `<name>.partial` first; targets are only replaced once every
/// partial file is on disk, in the order given. On a failed write the partial
/// files are removed and no target is touched.
pub fn commit_artifacts(files: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let staged: Vec<(PathBuf, &Path)> = files
        .iter()
        .map(|(target, _)| (partial_path(target), target.as_path()))
        .collect();

    for ((partial, _), (_, contents)) in staged.iter().zip(files) {
        if let Err(e) = write_artifact(partial, contents) {
            for (p, _) in &staged {
                let _ = fs::remove_file(p);
            }
            return Err(e);
        }
    }

    for (partial, target) in &staged {
        fs::rename(partial, target).with_context(|| {
            format!(
                "move artifact into place failed: {} -> {}",
                partial.display(),
                target.display()
            )
        })?;
    }
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    target.with_file_name(name)
}

/// Delete the run directory and everything in it. Missing is fine.
pub fn remove_run_artifacts(run: &RunDir) -> Result<()> {
    match fs::remove_dir_all(&run.dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            Err(e).with_context(|| format!("remove run dir failed: {}", run.dir.display()))
        }
    }
}
