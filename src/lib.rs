mod contents;
mod error;
mod model;
mod pdf;
mod source;

pub use contents::{parse_author_line, RawEntry};
pub use error::Error;
pub use model::{
    articles, flatten, Article, Author, ContentItem, Issue, IssueHeader, Journal, Section, Volume,
};
pub use pdf::AssembleOptions;
pub use source::{ContentSource, Credentials, DocumentHandle, IssueInfo, Session, VolumeInfo};

use std::path::Path;
use std::time::Instant;

/// Bind `issue` into a single PDF at `output`: cover page, table of contents
/// with live page numbers and links, every article's pages in reading order,
/// and a bookmark tree mirroring the section structure.
pub fn assemble_issue<S: ContentSource + ?Sized>(
    issue: &mut Issue,
    source: &S,
    output: &Path,
    options: &AssembleOptions,
) -> Result<(), Error> {
    let t0 = Instant::now();

    let contents = issue.contents(source)?.to_vec();
    let header = issue.header().clone();
    let t_contents = t0.elapsed();

    let pages = pdf::assemble(&header, &contents, source, output, options)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: contents={:.1}ms, assemble={:.1}ms, total={:.1}ms ({pages} pages)",
        t_contents.as_secs_f64() * 1000.0,
        (t_total - t_contents).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
    );

    Ok(())
}
