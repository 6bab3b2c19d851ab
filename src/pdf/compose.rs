//! Output document composition on lopdf.
//!
//! The assembler treats article documents as opaque page sequences: pages are
//! deep-copied into the output with all the objects they reference, appended
//! to a single page tree, and never edited. The finalization pass turns the
//! accumulated bookmark records into a PDF outline tree and the link records
//! into Link annotations on the contents pages.

use std::collections::HashMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use super::{BookmarkRecord, LinkRecord};
use crate::error::Error;

/// Page attributes that may live on an ancestor Pages node and must be
/// materialized onto each page before it is detached from its source tree.
const INHERITED_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Accumulates the output document page by page.
pub(crate) struct Composer {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Composer {
    pub fn new() -> Composer {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Composer {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append every page of `source` to the output, in source page order.
    /// Returns the number of pages appended.
    pub fn append_document(&mut self, source: Document) -> Result<usize, Error> {
        let mut importer = ObjectImporter::new(&source, &mut self.doc);
        let mut appended = Vec::new();
        for (_, page_id) in source.get_pages() {
            appended.push(importer.import_page(page_id)?);
        }
        for &page_id in &appended {
            if let Ok(Object::Dictionary(dict)) = self.doc.get_object_mut(page_id) {
                dict.set("Parent", self.pages_id);
            }
        }
        let count = appended.len();
        self.page_ids.extend(appended);
        Ok(count)
    }

    /// Add an internal Link annotation on the record's source page, targeting
    /// its absolute target page.
    pub fn add_link(&mut self, link: &LinkRecord) -> Result<(), Error> {
        let page_id = self.page_ref(link.source_page)?;
        let target_id = self.page_ref(link.target_page)?;
        let annot_id = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => link.rect.iter().map(|&v| Object::Real(v)).collect::<Vec<_>>(),
            "Border" => vec![0.into(), 0.into(), 0.into()],
            "Dest" => vec![Object::Reference(target_id), Object::Name(b"Fit".to_vec())],
        });

        let page_dict = self.doc.get_object_mut(page_id)?.as_dict_mut()?;
        // Link sources are always pages this crate generated, so Annots is
        // either absent or a direct array.
        if matches!(page_dict.get(b"Annots"), Ok(Object::Array(_))) {
            if let Ok(Object::Array(annots)) = page_dict.get_mut(b"Annots") {
                annots.push(annot_id.into());
            }
        } else {
            page_dict.set("Annots", vec![Object::Reference(annot_id)]);
        }
        Ok(())
    }

    /// Close the page tree, attach the outline built from `records` and
    /// return the finished document ready to be saved.
    pub fn finish(mut self, records: &[BookmarkRecord]) -> Result<Document, Error> {
        let outline_id = build_outline(&mut self.doc, records, &self.page_ids)?;

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| id.into()).collect();
        let count = self.page_ids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }
            .into(),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        };
        if let Some(outline_id) = outline_id {
            catalog.set("Outlines", outline_id);
            catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
        }
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", catalog_id);

        Ok(self.doc)
    }

    fn page_ref(&self, page: usize) -> Result<ObjectId, Error> {
        self.page_ids
            .get(page)
            .copied()
            .ok_or_else(|| Error::Pdf(format!("absolute page {page} is past the end of the output")))
    }
}

/// Emit the flat, parent-linked bookmark records as a PDF outline tree.
/// Records are already in page-ascending creation order with every parent
/// preceding its children, so sibling chains fall out of a single pass.
fn build_outline(
    doc: &mut Document,
    records: &[BookmarkRecord],
    page_ids: &[ObjectId],
) -> Result<Option<ObjectId>, Error> {
    if records.is_empty() {
        return Ok(None);
    }

    let item_ids: Vec<ObjectId> = records.iter().map(|_| doc.add_object(Object::Null)).collect();
    let outline_id = doc.new_object_id();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut top_level: Vec<usize> = Vec::new();
    for (i, record) in records.iter().enumerate() {
        match record.parent {
            Some(p) if p < i => children[p].push(i),
            Some(p) => {
                return Err(Error::Pdf(format!(
                    "bookmark parent {p} does not precede child {i}"
                )));
            }
            None => top_level.push(i),
        }
    }

    // Children always follow their parent, so a reverse pass sees every
    // subtree before its root.
    let mut descendants = vec![0usize; records.len()];
    for i in (0..records.len()).rev() {
        descendants[i] = children[i].iter().map(|&c| descendants[c] + 1).sum();
    }

    let mut dicts: Vec<Dictionary> = Vec::with_capacity(records.len());
    for record in records {
        let page_id = page_ids.get(record.page).copied().ok_or_else(|| {
            Error::Pdf(format!(
                "bookmark {:?} targets page {} past the end of the output",
                record.title, record.page
            ))
        })?;
        dicts.push(dictionary! {
            "Title" => Object::string_literal(record.title.as_str()),
            "Parent" => match record.parent {
                Some(p) => item_ids[p],
                None => outline_id,
            },
            "Dest" => vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())],
        });
    }

    for group in std::iter::once(&top_level).chain(children.iter()) {
        for pair in group.windows(2) {
            dicts[pair[0]].set("Next", item_ids[pair[1]]);
            dicts[pair[1]].set("Prev", item_ids[pair[0]]);
        }
    }
    for (parent, kids) in children.iter().enumerate() {
        if let (Some(&first), Some(&last)) = (kids.first(), kids.last()) {
            dicts[parent].set("First", item_ids[first]);
            dicts[parent].set("Last", item_ids[last]);
            dicts[parent].set("Count", descendants[parent] as i64);
        }
    }

    for (i, dict) in dicts.into_iter().enumerate() {
        doc.objects.insert(item_ids[i], dict.into());
    }

    // The first record has no predecessor, so top_level is never empty here.
    let first = item_ids[top_level[0]];
    let last = item_ids[*top_level.last().expect("top-level bookmark")];
    doc.objects.insert(
        outline_id,
        dictionary! {
            "Type" => "Outlines",
            "First" => first,
            "Last" => last,
            "Count" => records.len() as i64,
        }
        .into(),
    );

    Ok(Some(outline_id))
}

/// Deep-copies objects between documents, remapping references and breaking
/// the Page → Parent → Kids cycles of the page tree.
struct ObjectImporter<'a> {
    source: &'a Document,
    target: &'a mut Document,
    remapped: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectImporter<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> ObjectImporter<'a> {
        ObjectImporter {
            source,
            target,
            remapped: HashMap::new(),
        }
    }

    /// Import a page dictionary and everything it references. Inheritable
    /// attributes are materialized from ancestor Pages nodes first, then the
    /// Parent link is dropped so the source page tree is not dragged along;
    /// the caller reparents the page onto the output tree.
    fn import_page(&mut self, page_id: ObjectId) -> Result<ObjectId, Error> {
        if let Some(&mapped) = self.remapped.get(&page_id) {
            return Ok(mapped);
        }
        let reserved = self.target.add_object(Object::Null);
        self.remapped.insert(page_id, reserved);

        let mut dict = self.source.get_object(page_id)?.as_dict()?.clone();
        for key in INHERITED_PAGE_KEYS {
            if !dict.has(key) {
                if let Some(value) = find_inherited(self.source, page_id, key)? {
                    dict.set(key, value);
                }
            }
        }
        dict.remove(b"Parent");

        let rewritten = self.rewrite(Object::Dictionary(dict))?;
        self.target.objects.insert(reserved, rewritten);
        Ok(reserved)
    }

    /// Import an arbitrary object, once. The new id is registered before the
    /// object's body is rewritten, which is what breaks reference cycles.
    fn import(&mut self, source_id: ObjectId) -> Result<ObjectId, Error> {
        if let Some(&mapped) = self.remapped.get(&source_id) {
            return Ok(mapped);
        }
        let reserved = self.target.add_object(Object::Null);
        self.remapped.insert(source_id, reserved);

        let obj = self.source.get_object(source_id)?.clone();
        let rewritten = self.rewrite(obj)?;
        self.target.objects.insert(reserved, rewritten);
        Ok(reserved)
    }

    fn rewrite(&mut self, obj: Object) -> Result<Object, Error> {
        match obj {
            Object::Reference(id) => Ok(Object::Reference(self.import(id)?)),
            Object::Array(array) => Ok(Object::Array(
                array
                    .into_iter()
                    .map(|o| self.rewrite(o))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Object::Dictionary(mut dict) => {
                for (_, value) in dict.iter_mut() {
                    *value = self.rewrite(value.clone())?;
                }
                Ok(Object::Dictionary(dict))
            }
            Object::Stream(mut stream) => {
                for (_, value) in stream.dict.iter_mut() {
                    *value = self.rewrite(value.clone())?;
                }
                Ok(Object::Stream(stream))
            }
            other => Ok(other),
        }
    }
}

fn find_inherited(source: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>, Error> {
    let mut current = source.get_object(page_id)?.as_dict()?;
    loop {
        let parent_id = match current.get(b"Parent") {
            Ok(parent) => parent.as_reference()?,
            Err(_) => return Ok(None),
        };
        let parent = source.get_object(parent_id)?.as_dict()?;
        if let Ok(value) = parent.get(key) {
            return Ok(Some(value.clone()));
        }
        current = parent;
    }
}
