//! Issue assembly: front matter, article concatenation, outline and links.
//!
//! Assembly is a strictly ordered, single-threaded pipeline. Every article
//! document is fetched first, so all page counts are known before anything is
//! rendered; the front matter is generated against those counts; then pages
//! are appended in reading order while absolute positions are recorded; and
//! only after the outline and link annotations are applied is the output file
//! written. A failure at any point leaves no output artifact behind.

mod compose;
mod frontmatter;
mod render;

use std::path::Path;

use crate::error::Error;
use crate::model::{self, ContentItem, IssueHeader};
use crate::source::{ContentSource, DocumentHandle};
use compose::Composer;

/// Knobs for the generated document. The defaults produce US Letter pages
/// with the metrics the front-matter layout was tuned for.
#[derive(Clone, Debug)]
pub struct AssembleOptions {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    /// Line-unit budget per TOC page. This fixes the TOC's extent before
    /// rendering, so it also moves every page number printed in it.
    pub toc_lines_per_page: usize,
    /// Authors listed per TOC entry before truncating to "et al.".
    pub max_toc_authors: usize,
    /// Absolute page the synthetic "Cover" bookmark targets.
    pub cover_bookmark_page: usize,
    /// Absolute page the synthetic "Contents" bookmark targets.
    pub contents_bookmark_page: usize,
}

impl Default for AssembleOptions {
    fn default() -> AssembleOptions {
        AssembleOptions {
            page_width: 612.0,
            page_height: 792.0,
            margin: 54.0,
            toc_lines_per_page: 28,
            max_toc_authors: 10,
            cover_bookmark_page: 0,
            contents_bookmark_page: 1,
        }
    }
}

impl AssembleOptions {
    /// Effective TOC line budget. An article entry costs three line units, so
    /// anything below that would loop without placing a single entry.
    pub(crate) fn toc_line_budget(&self) -> usize {
        self.toc_lines_per_page.max(4)
    }

    pub(crate) fn toc_line_height(&self) -> f32 {
        (self.page_height - 2.0 * self.margin) / self.toc_line_budget() as f32
    }
}

/// Tracks the absolute page position while the output grows. Pages are
/// 0-based internally; printed page numbers add 1 at display time. The
/// position a node starts on is captured before advancing past it.
pub(crate) struct PageAccountant {
    next: usize,
}

impl PageAccountant {
    pub fn new() -> PageAccountant {
        PageAccountant { next: 0 }
    }

    /// Absolute page the next appended page will land on.
    pub fn current_page(&self) -> usize {
        self.next
    }

    pub fn advance(&mut self, pages: usize) {
        self.next += pages;
    }
}

/// Absolute start page of each article: front matter extent plus the page
/// counts of all preceding articles.
pub(crate) fn article_start_pages(front_pages: usize, article_pages: &[usize]) -> Vec<usize> {
    let mut starts = Vec::with_capacity(article_pages.len());
    let mut next = front_pages;
    for &pages in article_pages {
        starts.push(next);
        next += pages;
    }
    starts
}

/// An internal link to be applied during finalization: a clickable rectangle
/// on `source_page` jumping to `target_page` (absolute, 0-based).
#[derive(Clone, Debug)]
pub(crate) struct LinkRecord {
    pub source_page: usize,
    pub target_page: usize,
    /// PDF user-space [x1, y1, x2, y2].
    pub rect: [f32; 4],
}

/// One outline entry, recorded flat in creation order. `parent` indexes an
/// earlier record; records are created parents-first and page-ascending.
#[derive(Clone, Debug)]
pub(crate) struct BookmarkRecord {
    pub title: String,
    pub page: usize,
    pub parent: Option<usize>,
}

/// Build phases, in order. Each step of the assembler checks it is entered
/// from the phase before it; there is no partial or resumable state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Init,
    CoverRendered,
    ContentsRendered,
    Appending,
    Finalizing,
    Done,
}

struct Assembler {
    composer: Composer,
    accountant: PageAccountant,
    bookmarks: Vec<BookmarkRecord>,
    phase: Phase,
}

impl Assembler {
    fn new() -> Assembler {
        Assembler {
            composer: Composer::new(),
            accountant: PageAccountant::new(),
            bookmarks: Vec::new(),
            phase: Phase::Init,
        }
    }

    fn step(&mut self, expect: Phase, next: Phase) -> Result<(), Error> {
        if self.phase != expect {
            return Err(Error::Pdf(format!(
                "assembly step {next:?} entered from {:?}, expected {expect:?}",
                self.phase
            )));
        }
        self.phase = next;
        Ok(())
    }

    /// Append the rendered front matter and record the synthetic "Cover" and
    /// "Contents" bookmarks that precede all content bookmarks.
    fn add_front_matter(
        &mut self,
        front: frontmatter::FrontMatter,
        opts: &AssembleOptions,
    ) -> Result<(), Error> {
        self.step(Phase::Init, Phase::CoverRendered)?;
        let document = lopdf::Document::load_mem(&front.bytes)?;
        let appended = self.composer.append_document(document)?;
        if appended != front.page_count {
            return Err(Error::Pdf(format!(
                "front matter re-opened with {appended} pages, rendered {}",
                front.page_count
            )));
        }
        self.accountant.advance(appended);

        let last = front.page_count - 1;
        self.bookmarks.push(BookmarkRecord {
            title: "Cover".into(),
            page: opts.cover_bookmark_page.min(last),
            parent: None,
        });
        self.step(Phase::CoverRendered, Phase::ContentsRendered)?;
        self.bookmarks.push(BookmarkRecord {
            title: "Contents".into(),
            page: opts.contents_bookmark_page.min(last),
            parent: None,
        });
        Ok(())
    }

    /// Walk the content tree in document order, appending each article's
    /// pages and recording a bookmark per node.
    fn append_contents(
        &mut self,
        contents: &[ContentItem],
        handles: Vec<DocumentHandle>,
    ) -> Result<(), Error> {
        self.step(Phase::ContentsRendered, Phase::Appending)?;
        let mut handles = handles.into_iter();
        self.append_tree(contents, None, &mut handles)?;
        if handles.next().is_some() {
            return Err(Error::Pdf(
                "more documents fetched than articles in the content tree".into(),
            ));
        }
        Ok(())
    }

    fn append_tree(
        &mut self,
        items: &[ContentItem],
        parent: Option<usize>,
        handles: &mut std::vec::IntoIter<DocumentHandle>,
    ) -> Result<(), Error> {
        for item in items {
            match item {
                ContentItem::Section(section) => {
                    // A section starts where its first member will land; it
                    // occupies no pages of its own.
                    let idx = self.bookmarks.len();
                    self.bookmarks.push(BookmarkRecord {
                        title: section.name.clone(),
                        page: self.accountant.current_page(),
                        parent,
                    });
                    self.append_tree(&section.members, Some(idx), handles)?;
                }
                ContentItem::Article(article) => {
                    let handle = handles.next().ok_or_else(|| {
                        Error::Pdf(format!("no fetched document for article {:?}", article.name))
                    })?;
                    let start = self.accountant.current_page();
                    self.bookmarks.push(BookmarkRecord {
                        title: article.name.clone(),
                        page: start,
                        parent,
                    });
                    let pages = handle.page_count();
                    let appended = self.composer.append_document(handle.into_document())?;
                    if appended != pages {
                        return Err(Error::Pdf(format!(
                            "article {:?} appended {appended} pages, handle reported {pages}",
                            article.name
                        )));
                    }
                    log::debug!(
                        "appended {:?}: pages {}..{}",
                        article.name,
                        start + 1,
                        start + pages
                    );
                    self.accountant.advance(pages);
                }
            }
        }
        Ok(())
    }

    /// Apply link annotations and the outline tree, then write the output
    /// file. This is the only point anything touches the filesystem.
    fn finalize(mut self, links: &[LinkRecord], output: &Path) -> Result<usize, Error> {
        self.step(Phase::Appending, Phase::Finalizing)?;
        let total = self.composer.page_count();
        if self.accountant.current_page() != total {
            return Err(Error::Pdf(format!(
                "page accounting drifted: accountant at {}, output has {total} pages",
                self.accountant.current_page()
            )));
        }

        // An empty trailing section may have recorded a start past the end.
        for bookmark in &mut self.bookmarks {
            bookmark.page = bookmark.page.min(total - 1);
        }
        for link in links {
            self.composer.add_link(link)?;
        }

        let mut document = self.composer.finish(&self.bookmarks)?;
        document.save(output)?;
        self.phase = Phase::Done;
        Ok(total)
    }
}

/// Assemble one issue into `output`. All article documents are fetched into a
/// temporary scratch directory that is removed when the build ends, on
/// failure as well as success. Returns the total page count of the output.
pub(crate) fn assemble<S: ContentSource + ?Sized>(
    header: &IssueHeader,
    contents: &[ContentItem],
    source: &S,
    output: &Path,
    opts: &AssembleOptions,
) -> Result<usize, Error> {
    let scratch = tempfile::TempDir::new()?;

    let articles = model::articles(contents);
    let mut handles = Vec::with_capacity(articles.len());
    for article in &articles {
        log::debug!("fetching {:?} from {}", article.name, article.pdf_url);
        let handle = source
            .fetch_article(article, scratch.path())
            .map_err(|cause| Error::source_unavailable(&article.name, cause))?;
        handles.push(handle);
    }
    let article_pages: Vec<usize> = handles.iter().map(|h| h.page_count()).collect();

    let front = frontmatter::render_front_matter(header, contents, &article_pages, opts)?;
    let links = front.links.clone();

    let mut assembler = Assembler::new();
    assembler.add_front_matter(front, opts)?;
    assembler.append_contents(contents, handles)?;
    let total = assembler.finalize(&links, output)?;

    log::info!(
        "assembled {} v{} i{}: {} articles, {total} pages",
        header.journal_slug,
        header.volume,
        header.issue,
        articles.len()
    );
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Article, Section};

    #[test]
    fn start_pages_accumulate_prior_extents() {
        assert_eq!(article_start_pages(2, &[3, 5, 2]), vec![2, 5, 10]);
        assert_eq!(article_start_pages(4, &[]), Vec::<usize>::new());
    }

    #[test]
    fn accountant_captures_before_advancing() {
        let mut accountant = PageAccountant::new();
        assert_eq!(accountant.current_page(), 0);
        accountant.advance(2);
        let start = accountant.current_page();
        accountant.advance(3);
        assert_eq!(start, 2);
        assert_eq!(accountant.current_page(), 5);
    }

    #[test]
    fn steps_out_of_order_are_rejected() {
        let mut assembler = Assembler::new();
        let err = assembler
            .append_contents(&[], Vec::new())
            .expect_err("skipped front matter");
        assert!(matches!(err, Error::Pdf(_)));
    }

    fn article(name: &str) -> ContentItem {
        ContentItem::Article(Article {
            name: name.into(),
            authors: Vec::new(),
            url: None,
            pdf_url: format!("{name}.pdf"),
            teaser: None,
        })
    }

    #[test]
    fn walk_records_parents_before_children() {
        let tree = vec![
            ContentItem::Section(Section {
                name: "A".into(),
                members: vec![
                    ContentItem::Section(Section {
                        name: "B".into(),
                        members: vec![article("X")],
                    }),
                    article("Y"),
                ],
            }),
        ];
        let handles = vec![
            DocumentHandle::from_document(compose::tests::stub_document(2, "x")).unwrap(),
            DocumentHandle::from_document(compose::tests::stub_document(1, "y")).unwrap(),
        ];

        let mut assembler = Assembler::new();
        assembler.phase = Phase::ContentsRendered;
        assembler.accountant.advance(2); // stand-in for a 2-page front matter
        assembler.append_contents(&tree, handles).unwrap();

        let titles: Vec<&str> = assembler.bookmarks.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "X", "Y"]);
        let parents: Vec<Option<usize>> =
            assembler.bookmarks.iter().map(|b| b.parent).collect();
        assert_eq!(parents, vec![None, Some(0), Some(1), Some(0)]);
        let pages: Vec<usize> = assembler.bookmarks.iter().map(|b| b.page).collect();
        assert_eq!(pages, vec![2, 2, 2, 4]);
    }
}
