//! Domain types for the journal → volume → issue → contents hierarchy.
//!
//! Collection-valued accessors (`Journal::volumes`, `Volume::issues`,
//! `Issue::contents`) are lazy: the index is fetched from the
//! [`ContentSource`](crate::source::ContentSource) on first access and cached
//! in an explicit `Option` field for the lifetime of the owning object.

use std::collections::BTreeMap;

use crate::contents;
use crate::error::Error;
use crate::source::ContentSource;

pub struct Journal {
    pub name: String,
    /// URL path segment identifying the journal at the origin site (e.g. "prl").
    pub slug: String,
    pub description: Option<String>,
    pub short_name: Option<String>,
    volumes: Option<BTreeMap<u32, Volume>>,
}

impl Journal {
    pub fn new(name: &str, slug: &str) -> Journal {
        Journal {
            name: name.to_string(),
            slug: slug.to_string(),
            description: None,
            short_name: None,
            volumes: None,
        }
    }

    pub fn with_short_name(mut self, short_name: &str) -> Journal {
        self.short_name = Some(short_name.to_string());
        self
    }

    /// Available volume numbers, fetched at most once per journal instance.
    pub fn volumes<S: ContentSource + ?Sized>(&mut self, source: &S) -> Result<Vec<u32>, Error> {
        if self.volumes.is_none() {
            log::debug!("fetching volume index for {}", self.slug);
            let index = source.volume_index(&self.slug)?;
            let mut volumes = BTreeMap::new();
            for info in index {
                volumes.insert(
                    info.num,
                    Volume {
                        journal_name: self.name.clone(),
                        journal_slug: self.slug.clone(),
                        num: info.num,
                        period: info.period,
                        issues: None,
                    },
                );
            }
            self.volumes = Some(volumes);
        }
        Ok(self.volumes.as_ref().unwrap().keys().copied().collect())
    }

    pub fn volume<S: ContentSource + ?Sized>(
        &mut self,
        source: &S,
        num: u32,
    ) -> Result<&mut Volume, Error> {
        let valid = self.volumes(source)?;
        let volumes = self.volumes.as_mut().unwrap();
        volumes.get_mut(&num).ok_or(Error::InvalidReference {
            kind: "volume",
            requested: num,
            valid,
        })
    }
}

pub struct Volume {
    journal_name: String,
    journal_slug: String,
    pub num: u32,
    /// Human-readable publication period as reported by the index, e.g.
    /// "January - June 2019". Informational only.
    pub period: Option<String>,
    issues: Option<BTreeMap<u32, Issue>>,
}

impl Volume {
    /// Available issue numbers, fetched at most once per volume instance.
    pub fn issues<S: ContentSource + ?Sized>(&mut self, source: &S) -> Result<Vec<u32>, Error> {
        if self.issues.is_none() {
            log::debug!("fetching issue index for {} v{}", self.journal_slug, self.num);
            let index = source.issue_index(&self.journal_slug, self.num)?;
            let mut issues = BTreeMap::new();
            for info in index {
                issues.insert(
                    info.num,
                    Issue::new(IssueHeader {
                        journal_name: self.journal_name.clone(),
                        journal_slug: self.journal_slug.clone(),
                        volume: self.num,
                        issue: info.num,
                    }),
                );
            }
            self.issues = Some(issues);
        }
        Ok(self.issues.as_ref().unwrap().keys().copied().collect())
    }

    pub fn issue<S: ContentSource + ?Sized>(
        &mut self,
        source: &S,
        num: u32,
    ) -> Result<&mut Issue, Error> {
        let valid = self.issues(source)?;
        let issues = self.issues.as_mut().unwrap();
        issues.get_mut(&num).ok_or(Error::InvalidReference {
            kind: "issue",
            requested: num,
            valid,
        })
    }
}

/// Identifying fields of an issue, denormalized from its parents so the
/// assembler can render the cover without walking back up the hierarchy.
#[derive(Clone, Debug)]
pub struct IssueHeader {
    pub journal_name: String,
    pub journal_slug: String,
    pub volume: u32,
    pub issue: u32,
}

pub struct Issue {
    header: IssueHeader,
    contents: Option<Vec<ContentItem>>,
}

impl Issue {
    pub fn new(header: IssueHeader) -> Issue {
        Issue {
            header,
            contents: None,
        }
    }

    pub fn header(&self) -> &IssueHeader {
        &self.header
    }

    /// The issue's table of contents, fetched and parsed at most once per
    /// issue instance. Order is fixed at construction and defines both
    /// reading order and final document order.
    pub fn contents<S: ContentSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<&[ContentItem], Error> {
        if self.contents.is_none() {
            log::debug!(
                "fetching contents for {} v{} i{}",
                self.header.journal_slug,
                self.header.volume,
                self.header.issue
            );
            let raw = source.issue_contents(
                &self.header.journal_slug,
                self.header.volume,
                self.header.issue,
            )?;
            self.contents = Some(contents::group_entries(raw)?);
        }
        Ok(self.contents.as_deref().unwrap())
    }
}

/// One node of an issue's content tree. Sections nest arbitrarily deep
/// (in practice two or three levels); articles are the leaves.
#[derive(Clone, Debug)]
pub enum ContentItem {
    Section(Section),
    Article(Article),
}

#[derive(Clone, Debug)]
pub struct Section {
    pub name: String,
    pub members: Vec<ContentItem>,
}

#[derive(Clone, Debug)]
pub struct Article {
    pub name: String,
    pub authors: Vec<Author>,
    pub url: Option<String>,
    /// Locator for the article's source document, interpreted by the
    /// [`ContentSource`](crate::source::ContentSource) (a URL for remote
    /// sources, a relative path for local ones).
    pub pdf_url: String,
    pub teaser: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
}

impl Author {
    /// Best-effort parse of a free-text author name. Three shapes are
    /// recognized: `"Last, First"`, `"First Last"` (the last name may be
    /// multiple words), and a bare token used as both names. Never fails.
    pub fn parse(name: &str) -> Author {
        let name = name.trim();
        if let Some((last, first)) = name.split_once(", ") {
            Author {
                first_name: first.trim().to_string(),
                last_name: last.trim().to_string(),
            }
        } else if let Some((first, last)) = name.split_once(' ') {
            Author {
                first_name: first.to_string(),
                last_name: last.trim().to_string(),
            }
        } else {
            Author {
                first_name: name.to_string(),
                last_name: name.to_string(),
            }
        }
    }

    /// Canonical "Last, First" form.
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Depth-first flattening of a content tree. Yields `(depth, item)` pairs in
/// document order; every section is visited before its members.
pub fn flatten(items: &[ContentItem]) -> Vec<(usize, &ContentItem)> {
    fn walk<'a>(items: &'a [ContentItem], depth: usize, out: &mut Vec<(usize, &'a ContentItem)>) {
        for item in items {
            out.push((depth, item));
            if let ContentItem::Section(section) = item {
                walk(&section.members, depth + 1, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(items, 0, &mut out);
    out
}

/// The leaf articles of a content tree in document order.
pub fn articles(items: &[ContentItem]) -> Vec<&Article> {
    flatten(items)
        .into_iter()
        .filter_map(|(_, item)| match item {
            ContentItem::Article(article) => Some(article),
            ContentItem::Section(_) => None,
        })
        .collect()
}
