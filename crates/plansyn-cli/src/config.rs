//! Runtime configuration loaded from `sources.yaml`.
//!
//! One file declares every source with an enabled flag plus the output
//! directory and the keyword table path. Disabled sources stay in the
//! file as documentation of what exists and what access they need.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

fn default_true() -> bool {
    true
}

fn default_geonorge_base_url() -> String {
    plansyn_adapters::geonorge::DEFAULT_BASE_URL.to_string()
}

fn default_search_limit() -> usize {
    50
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("./documents")
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_keywords_path() -> PathBuf {
    PathBuf::from("./keywords.yaml")
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeonorgeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_geonorge_base_url")]
    pub base_url: String,
    /// Narrow the search to one municipality; omit to search nationally.
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

impl Default for GeonorgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_geonorge_base_url(),
            municipality: None,
            limit: default_search_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrigoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory of pre-extracted plan-document text files (`*.txt`).
    #[serde(default = "default_documents_dir")]
    pub dir: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_documents_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsConfig {
    /// Fetch the documents advertised in record download links into the
    /// local archive. Off by default: a national catalogue sweep can
    /// advertise gigabytes of plan data.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_downloads_dir")]
    pub dir: PathBuf,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_downloads_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub geonorge: GeonorgeConfig,
    #[serde(default)]
    pub oslo_origo: OrigoConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_keywords_path")]
    pub keywords: PathBuf,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}
