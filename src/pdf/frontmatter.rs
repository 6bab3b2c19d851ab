//! Cover page and table-of-contents generation.
//!
//! The TOC prints absolute page numbers for a document that does not exist
//! yet, and its own length shifts every one of them. The extent is therefore
//! fixed up front: pagination is driven by a deterministic per-entry line-unit
//! counter, and [`toc_page_count`] runs that exact counter, so the page count
//! computed before rendering is the page count rendering produces. Nothing is
//! ever patched retroactively.

use crate::error::Error;
use crate::model::{flatten, ContentItem, IssueHeader, Section};
use crate::pdf::render::{PdfRenderer, Renderer, TextStyle};
use crate::pdf::{article_start_pages, AssembleOptions, LinkRecord};

/// Line units a TOC entry occupies: a section heading is one line, an article
/// is a title line, an author line and a padding line.
const SECTION_COST: usize = 1;
const ARTICLE_COST: usize = 3;

pub(crate) struct FrontMatter {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub links: Vec<LinkRecord>,
}

/// Number of TOC pages the given contents will occupy. Always at least one.
pub(crate) fn toc_page_count(contents: &[ContentItem], opts: &AssembleOptions) -> usize {
    let budget = opts.toc_line_budget();
    let mut pages = 1;
    let mut used = 0;
    for (_, item) in flatten(contents) {
        let cost = entry_cost(item);
        if used + cost > budget && used > 0 {
            pages += 1;
            used = 0;
        }
        used += cost;
    }
    pages
}

/// Cover page count plus TOC page count. Fixed before assembly begins and
/// never recomputed.
pub(crate) fn front_matter_page_count(contents: &[ContentItem], opts: &AssembleOptions) -> usize {
    1 + toc_page_count(contents, opts)
}

fn entry_cost(item: &ContentItem) -> usize {
    match item {
        ContentItem::Section(_) => SECTION_COST,
        ContentItem::Article(_) => ARTICLE_COST,
    }
}

/// Render cover and TOC pages into a standalone PDF, recording one link per
/// article TOC line. `article_pages` holds the page count of every article in
/// document order, learned from the already-fetched documents.
pub(crate) fn render_front_matter(
    header: &IssueHeader,
    contents: &[ContentItem],
    article_pages: &[usize],
    opts: &AssembleOptions,
) -> Result<FrontMatter, Error> {
    let front_pages = front_matter_page_count(contents, opts);
    let starts = article_start_pages(front_pages, article_pages);

    let mut renderer = PdfRenderer::new(opts.page_width, opts.page_height);
    let links = layout(&mut renderer, header, contents, &starts, opts)?;

    if renderer.page_count() != front_pages {
        // The counter-driven pagination above makes this unreachable; treat a
        // mismatch as a hard bug rather than silently shifting every target.
        return Err(Error::Pdf(format!(
            "front matter rendered {} pages but {} were budgeted",
            renderer.page_count(),
            front_pages
        )));
    }

    log::debug!(
        "front matter: {} pages ({} TOC), {} links",
        front_pages,
        front_pages - 1,
        links.len()
    );

    Ok(FrontMatter {
        bytes: renderer.finish(),
        page_count: front_pages,
        links,
    })
}

fn layout<R: Renderer>(
    r: &mut R,
    header: &IssueHeader,
    contents: &[ContentItem],
    article_starts: &[usize],
    opts: &AssembleOptions,
) -> Result<Vec<LinkRecord>, Error> {
    let margin = opts.margin;
    let content_right = opts.page_width - margin;
    let line_height = opts.toc_line_height();
    let budget = opts.toc_line_budget();

    draw_cover(r, header, opts);

    let mut links = Vec::new();
    let mut used = 0;
    let mut article_idx = 0;
    r.new_page();
    draw_footer(r, opts);

    for (depth, item) in flatten(contents) {
        let cost = entry_cost(item);
        if used + cost > budget && used > 0 {
            r.new_page();
            draw_footer(r, opts);
            used = 0;
        }
        let row_top = margin + used as f32 * line_height;
        let indent = margin + depth as f32 * 12.0;

        match item {
            ContentItem::Section(section) => {
                draw_section_heading(r, section, depth, indent, row_top, line_height);
            }
            ContentItem::Article(article) => {
                let start = *article_starts.get(article_idx).ok_or_else(|| {
                    Error::Pdf(format!("no page extent for article {:?}", article.name))
                })?;
                article_idx += 1;

                let title_style = TextStyle::oblique(10.0);
                let title_baseline = row_top + line_height * 0.75;
                let number = (start + 1).to_string();
                let number_style = TextStyle::regular(10.0);
                let number_width = r.text_width(number_style, &number);
                let title_max = content_right - indent - number_width - 12.0;
                let title = ellipsize(r, title_style, &article.name, title_max);

                r.draw_text(indent, title_baseline, title_style, &title);
                r.draw_text(
                    content_right - number_width,
                    title_baseline,
                    number_style,
                    &number,
                );

                let author_style = TextStyle::regular(8.0);
                let author_baseline = title_baseline + line_height;
                let author_line = author_summary(article, opts.max_toc_authors);
                if !author_line.is_empty() {
                    r.draw_text(indent + 12.0, author_baseline, author_style, &author_line);
                }

                // Clickable region spanning the title line, in PDF user space
                // (origin bottom-left).
                let baseline_pdf = opts.page_height - title_baseline;
                links.push(LinkRecord {
                    source_page: r.current_page(),
                    target_page: start,
                    rect: [
                        indent,
                        baseline_pdf - 3.0,
                        content_right,
                        baseline_pdf + title_style.size,
                    ],
                });
            }
        }
        used += cost;
    }

    Ok(links)
}

fn draw_cover<R: Renderer>(r: &mut R, header: &IssueHeader, opts: &AssembleOptions) {
    let title_style = TextStyle::bold(20.0);
    let title_y = opts.page_height * 0.35;
    let title_x = (opts.page_width - r.text_width(title_style, &header.journal_name)) / 2.0;
    r.draw_text(title_x, title_y, title_style, &header.journal_name);

    let subtitle = format!("Volume {} Issue {}", header.volume, header.issue);
    let subtitle_style = TextStyle::regular(14.0);
    let subtitle_x = (opts.page_width - r.text_width(subtitle_style, &subtitle)) / 2.0;
    r.draw_text(subtitle_x, title_y + 28.0, subtitle_style, &subtitle);

    draw_footer(r, opts);
}

fn draw_footer<R: Renderer>(r: &mut R, opts: &AssembleOptions) {
    let style = TextStyle::regular(8.0);
    let text = concat!("Assembled with issuebind ", env!("CARGO_PKG_VERSION"));
    let x = (opts.page_width - r.text_width(style, text)) / 2.0;
    r.draw_text(x, opts.page_height - opts.margin / 2.0, style, text);
}

fn draw_section_heading<R: Renderer>(
    r: &mut R,
    section: &Section,
    depth: usize,
    indent: f32,
    row_top: f32,
    line_height: f32,
) {
    let size = (16.0 - 2.0 * depth as f32).max(10.0);
    let style = TextStyle::bold(size);
    r.draw_text(indent, row_top + line_height * 0.75, style, &section.name);
}

/// Truncated author listing: last names of the first `max_authors`, then
/// "et al." when more remain.
fn author_summary(article: &crate::model::Article, max_authors: usize) -> String {
    let mut line: String = article
        .authors
        .iter()
        .take(max_authors)
        .map(|a| a.last_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    if article.authors.len() > max_authors {
        line.push_str(" et al.");
    }
    line
}

fn ellipsize<R: Renderer>(r: &R, style: TextStyle, text: &str, max_width: f32) -> String {
    if r.text_width(style, text) <= max_width {
        return text.to_string();
    }
    let mut out: String = text.to_string();
    while !out.is_empty() && r.text_width(style, &out) + r.text_width(style, "...") > max_width {
        out.pop();
    }
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Article, Author, ContentItem, Section};

    fn article(name: &str, author_count: usize) -> ContentItem {
        ContentItem::Article(Article {
            name: name.into(),
            authors: (0..author_count)
                .map(|i| Author::parse(&format!("A{i} Lastname{i}")))
                .collect(),
            url: None,
            pdf_url: format!("{name}.pdf"),
            teaser: None,
        })
    }

    fn section(name: &str, members: Vec<ContentItem>) -> ContentItem {
        ContentItem::Section(Section {
            name: name.into(),
            members,
        })
    }

    fn header() -> IssueHeader {
        IssueHeader {
            journal_name: "Physical Review Letters".into(),
            journal_slug: "prl".into(),
            volume: 120,
            issue: 13,
        }
    }

    #[test]
    fn short_contents_fit_on_one_toc_page() {
        let contents = vec![section("LETTERS", vec![article("A", 2), article("B", 1)])];
        let opts = AssembleOptions::default();
        assert_eq!(toc_page_count(&contents, &opts), 1);
        assert_eq!(front_matter_page_count(&contents, &opts), 2);
    }

    #[test]
    fn long_contents_spill_onto_more_toc_pages() {
        let articles: Vec<ContentItem> = (0..40).map(|i| article(&format!("A{i}"), 1)).collect();
        let contents = vec![section("LETTERS", articles)];
        let opts = AssembleOptions::default();
        // 1 section + 40 articles = 121 line units on a 28-unit budget.
        assert_eq!(toc_page_count(&contents, &opts), 5);
    }

    #[test]
    fn empty_contents_still_produce_one_toc_page() {
        let opts = AssembleOptions::default();
        assert_eq!(toc_page_count(&[], &opts), 1);
    }

    #[test]
    fn rendered_extent_matches_budgeted_extent() {
        let articles: Vec<ContentItem> = (0..25).map(|i| article(&format!("A{i}"), 3)).collect();
        let contents = vec![section("LETTERS", articles)];
        let opts = AssembleOptions::default();
        let pages: Vec<usize> = vec![2; 25];

        let front = render_front_matter(&header(), &contents, &pages, &opts).unwrap();
        assert_eq!(front.page_count, front_matter_page_count(&contents, &opts));

        let doc = lopdf::Document::load_mem(&front.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), front.page_count);
    }

    #[test]
    fn one_link_per_article_targeting_its_start_page() {
        let contents = vec![
            section("HIGHLIGHTS", vec![article("A", 1), article("B", 1)]),
            article("C", 1),
        ];
        let opts = AssembleOptions::default();
        // Page counts 3, 5, 2 with a 2-page front matter: starts 2, 5, 10.
        let front = render_front_matter(&header(), &contents, &[3, 5, 2], &opts).unwrap();
        assert_eq!(front.page_count, 2);
        let targets: Vec<usize> = front.links.iter().map(|l| l.target_page).collect();
        assert_eq!(targets, vec![2, 5, 10]);
        // All TOC lines are on the single contents page, absolute page 1.
        assert!(front.links.iter().all(|l| l.source_page == 1));
    }

    #[test]
    fn author_summary_truncates_with_et_al() {
        let ContentItem::Article(a) = article("A", 12) else {
            unreachable!()
        };
        let summary = author_summary(&a, 10);
        assert!(summary.ends_with(" et al."));
        assert_eq!(summary.matches(',').count(), 9);
    }
}
