use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use issuebind::{
    ContentSource, DocumentHandle, Error, Issue, IssueHeader, IssueInfo, RawEntry, VolumeInfo,
};

/// A synthetic article document with `pages` pages, each captioned with the
/// title and its page number.
pub fn article_pdf(pages: usize, title: &str) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids = Vec::new();
    for n in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{title} p{n}").into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => pages as i64,
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// In-memory `ContentSource` serving a fixed contents listing and synthetic
/// article documents. Fetches are recorded in order.
pub struct StubSource {
    entries: Vec<RawEntry>,
    page_counts: HashMap<String, usize>,
    missing: HashSet<String>,
    pub fetched: RefCell<Vec<String>>,
}

impl StubSource {
    pub fn new(entries: Vec<RawEntry>) -> StubSource {
        StubSource {
            entries,
            page_counts: HashMap::new(),
            missing: HashSet::new(),
            fetched: RefCell::new(Vec::new()),
        }
    }

    /// Page count served for `pdf_url` (articles default to one page).
    pub fn with_pages(mut self, pdf_url: &str, pages: usize) -> StubSource {
        self.page_counts.insert(pdf_url.to_string(), pages);
        self
    }

    /// Make fetching `pdf_url` fail.
    pub fn missing(mut self, pdf_url: &str) -> StubSource {
        self.missing.insert(pdf_url.to_string());
        self
    }
}

impl ContentSource for StubSource {
    fn volume_index(&self, _journal_slug: &str) -> Result<Vec<VolumeInfo>, Error> {
        Ok(vec![VolumeInfo {
            num: 120,
            period: None,
        }])
    }

    fn issue_index(&self, _journal_slug: &str, _volume: u32) -> Result<Vec<IssueInfo>, Error> {
        Ok(vec![IssueInfo {
            num: 13,
            label: None,
        }])
    }

    fn issue_contents(
        &self,
        _journal_slug: &str,
        _volume: u32,
        _issue: u32,
    ) -> Result<Vec<RawEntry>, Error> {
        Ok(self.entries.clone())
    }

    fn fetch_article(
        &self,
        article: &issuebind::Article,
        _scratch: &Path,
    ) -> Result<DocumentHandle, Error> {
        self.fetched.borrow_mut().push(article.pdf_url.clone());
        if self.missing.contains(&article.pdf_url) {
            return Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
        }
        let pages = self.page_counts.get(&article.pdf_url).copied().unwrap_or(1);
        DocumentHandle::from_document(article_pdf(pages, &article.name))
    }
}

pub fn divider(name: &str) -> RawEntry {
    RawEntry::Divider { name: name.into() }
}

pub fn section(name: &str, members: Vec<RawEntry>) -> RawEntry {
    RawEntry::Section {
        name: name.into(),
        members,
    }
}

pub fn raw_article(name: &str) -> RawEntry {
    RawEntry::Article {
        name: name.into(),
        author_line: Some("J. Smith and A. Jones".into()),
        url: None,
        pdf_url: format!("{name}.pdf"),
        teaser: None,
    }
}

pub fn test_issue() -> Issue {
    Issue::new(IssueHeader {
        journal_name: "Physical Review Letters".into(),
        journal_slug: "prl".into(),
        volume: 120,
        issue: 13,
    })
}
