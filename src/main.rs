use std::error::Error as _;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use issuebind::{
    AssembleOptions, ContentSource, DocumentHandle, Issue, IssueHeader, IssueInfo, RawEntry,
    VolumeInfo,
};

#[derive(Parser)]
#[command(
    name = "issuebind",
    version,
    about = "Bind a journal issue's article PDFs into one navigable document"
)]
struct Args {
    /// JSON manifest describing the issue and its article files
    manifest: PathBuf,

    /// Output PDF path
    #[arg(short, long, default_value = "issue.pdf")]
    output: PathBuf,

    /// TOC line budget per page
    #[arg(long)]
    toc_lines_per_page: Option<usize>,

    /// Authors listed per TOC entry before "et al."
    #[arg(long)]
    max_toc_authors: Option<usize>,
}

#[derive(Deserialize)]
struct Manifest {
    journal: String,
    #[serde(default)]
    slug: Option<String>,
    volume: u32,
    issue: u32,
    entries: Vec<ManifestEntry>,
}

/// One content entry of the manifest, tagged by `kind`. Article file paths
/// are resolved relative to the manifest's directory.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ManifestEntry {
    Divider {
        name: String,
    },
    Section {
        name: String,
        members: Vec<ManifestEntry>,
    },
    Article {
        name: String,
        #[serde(default)]
        authors: Option<String>,
        file: String,
        #[serde(default)]
        teaser: Option<String>,
    },
}

impl ManifestEntry {
    fn to_raw(&self) -> RawEntry {
        match self {
            ManifestEntry::Divider { name } => RawEntry::Divider { name: name.clone() },
            ManifestEntry::Section { name, members } => RawEntry::Section {
                name: name.clone(),
                members: members.iter().map(ManifestEntry::to_raw).collect(),
            },
            ManifestEntry::Article {
                name,
                authors,
                file,
                teaser,
            } => RawEntry::Article {
                name: name.clone(),
                author_line: authors.clone(),
                url: None,
                pdf_url: file.clone(),
                teaser: teaser.clone(),
            },
        }
    }
}

/// `ContentSource` over article PDFs on the local filesystem.
struct FileSource {
    base: PathBuf,
    manifest: Manifest,
}

impl ContentSource for FileSource {
    fn volume_index(&self, _journal_slug: &str) -> Result<Vec<VolumeInfo>, issuebind::Error> {
        Ok(vec![VolumeInfo {
            num: self.manifest.volume,
            period: None,
        }])
    }

    fn issue_index(
        &self,
        _journal_slug: &str,
        _volume: u32,
    ) -> Result<Vec<IssueInfo>, issuebind::Error> {
        Ok(vec![IssueInfo {
            num: self.manifest.issue,
            label: None,
        }])
    }

    fn issue_contents(
        &self,
        _journal_slug: &str,
        _volume: u32,
        _issue: u32,
    ) -> Result<Vec<RawEntry>, issuebind::Error> {
        Ok(self.manifest.entries.iter().map(ManifestEntry::to_raw).collect())
    }

    fn fetch_article(
        &self,
        article: &issuebind::Article,
        _scratch: &Path,
    ) -> Result<DocumentHandle, issuebind::Error> {
        DocumentHandle::load(&self.base.join(&article.pdf_url))
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&args.manifest)?;
    let manifest: Manifest = serde_json::from_str(&text)?;
    let base = args
        .manifest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let mut options = AssembleOptions::default();
    if let Some(n) = args.toc_lines_per_page {
        options.toc_lines_per_page = n;
    }
    if let Some(n) = args.max_toc_authors {
        options.max_toc_authors = n;
    }

    let slug = manifest
        .slug
        .clone()
        .unwrap_or_else(|| manifest.journal.to_lowercase().replace(' ', "-"));
    let mut issue = Issue::new(IssueHeader {
        journal_name: manifest.journal.clone(),
        journal_slug: slug,
        volume: manifest.volume,
        issue: manifest.issue,
    });
    let source = FileSource { base, manifest };

    issuebind::assemble_issue(&mut issue, &source, &args.output, &options)?;
    println!("wrote {}", args.output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        let mut cause = err.source();
        while let Some(c) = cause {
            eprintln!("  caused by: {c}");
            cause = c.source();
        }
        std::process::exit(1);
    }
}
