//! Parsing of raw fetched contents into the issue's content tree.
//!
//! A fetched table of contents arrives as a flat list of [`RawEntry`] values:
//! dividers (bare headings), explicit sections and articles. Dividers do not
//! own the entries that follow them, so grouping happens here: everything
//! between one divider and the next (or the end of the list) becomes the
//! members of a synthetic section named after the divider.

use crate::error::Error;
use crate::model::{Article, Author, ContentItem, Section};

/// One structural element of a fetched table of contents, tagged once at
/// extraction time. Anything a source cannot classify must be reported as
/// [`Error::MalformedContent`] by the source itself, not smuggled through.
#[derive(Clone, Debug)]
pub enum RawEntry {
    /// A bare heading that introduces the entries after it.
    Divider { name: String },
    /// A heading that already owns its entries.
    Section { name: String, members: Vec<RawEntry> },
    Article {
        name: String,
        /// Free-text author listing, e.g. "J. Smith, A. Jones and B. Lee".
        /// Absent is legitimate (editorials and errata often carry none).
        author_line: Option<String>,
        url: Option<String>,
        pdf_url: String,
        teaser: Option<String>,
    },
}

/// Group a flat entry list into a content tree.
///
/// Runs an index-based partition pass: for each divider, the span up to the
/// next divider is split off and parsed recursively, so nested dividers and
/// explicit sections inside a span are handled the same way as at top level.
/// Explicit sections recurse through the same pass, so a divider among their
/// members becomes a nested synthetic section as well.
pub fn group_entries(entries: Vec<RawEntry>) -> Result<Vec<ContentItem>, Error> {
    let mut contents = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        match &entries[i] {
            RawEntry::Divider { name } => {
                let span_end = entries[i + 1..]
                    .iter()
                    .position(|e| matches!(e, RawEntry::Divider { .. }))
                    .map(|offset| i + 1 + offset)
                    .unwrap_or(entries.len());
                let members = group_entries(entries[i + 1..span_end].to_vec())?;
                contents.push(ContentItem::Section(Section {
                    name: name.clone(),
                    members,
                }));
                i = span_end;
            }
            RawEntry::Section { name, members } => {
                contents.push(ContentItem::Section(Section {
                    name: name.clone(),
                    members: group_entries(members.clone())?,
                }));
                i += 1;
            }
            RawEntry::Article {
                name,
                author_line,
                url,
                pdf_url,
                teaser,
            } => {
                contents.push(ContentItem::Article(Article {
                    name: name.clone(),
                    authors: author_line.as_deref().map(parse_author_line).unwrap_or_default(),
                    url: url.clone(),
                    pdf_url: pdf_url.clone(),
                    teaser: teaser.clone(),
                }));
                i += 1;
            }
        }
    }
    Ok(contents)
}

/// Split a free-text author listing into individual authors. The listing is
/// comma-separated with an optional final "and"; each piece goes through the
/// lenient [`Author::parse`].
///
/// A lone "Last, First" name is ambiguous with a two-author listing. It is
/// treated as one author when there is exactly one comma, no "and", and a
/// single word after the comma; a wrong guess degrades to odd name fields,
/// never to a failure.
pub fn parse_author_line(line: &str) -> Vec<Author> {
    if !line.contains(" and ") && line.matches(',').count() == 1 {
        if let Some((_, first)) = line.split_once(", ") {
            if !first.trim().contains(' ') {
                return vec![Author::parse(line)];
            }
        }
    }
    line.replace(" and ", ", ")
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(Author::parse)
        .collect()
}
