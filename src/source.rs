//! Collaborator seams for content retrieval.
//!
//! The assembly core performs no network I/O. Everything it needs from the
//! origin site comes through [`ContentSource`]: index listings, raw issue
//! contents and article documents fetched into a caller-provided scratch
//! directory. Implementations are free to parallelize and throttle article
//! fetches; the core consumes the results strictly sequentially.

use std::path::Path;

use crate::contents::RawEntry;
use crate::error::Error;
use crate::model::Article;

/// One row of a journal's volume index.
#[derive(Clone, Debug)]
pub struct VolumeInfo {
    pub num: u32,
    /// Publication period label as shown by the index, if any.
    pub period: Option<String>,
}

/// One row of a volume's issue index.
#[derive(Clone, Debug)]
pub struct IssueInfo {
    pub num: u32,
    pub label: Option<String>,
}

/// Access to journal content. Index methods return metadata only; page counts
/// exist nowhere until [`fetch_article`](ContentSource::fetch_article)
/// materializes a document.
pub trait ContentSource {
    /// Exchange credentials for an authenticated [`Session`] at the origin
    /// site. Sources with no login flow (local files, test stubs) keep the
    /// default, which hands back an anonymous session.
    fn login(&self, _credentials: &Credentials) -> Result<Session, Error> {
        Ok(Session::anonymous())
    }

    fn volume_index(&self, journal_slug: &str) -> Result<Vec<VolumeInfo>, Error>;

    fn issue_index(&self, journal_slug: &str, volume: u32) -> Result<Vec<IssueInfo>, Error>;

    /// The flat, ungrouped contents of an issue. Grouping of dividers into
    /// sections is the core's job, not the source's.
    fn issue_contents(
        &self,
        journal_slug: &str,
        volume: u32,
        issue: u32,
    ) -> Result<Vec<RawEntry>, Error>;

    /// Materialize an article's source document. Any files the source needs
    /// to write go under `scratch`, which the caller deletes when the build
    /// ends (also on failure).
    fn fetch_article(&self, article: &Article, scratch: &Path) -> Result<DocumentHandle, Error>;
}

/// An opened article document: an opaque page sequence plus its page count.
/// The assembler concatenates the pages verbatim and never edits them.
pub struct DocumentHandle {
    document: lopdf::Document,
    page_count: usize,
}

impl DocumentHandle {
    pub fn load(path: &Path) -> Result<DocumentHandle, Error> {
        Self::from_document(lopdf::Document::load(path)?)
    }

    pub fn load_mem(bytes: &[u8]) -> Result<DocumentHandle, Error> {
        Self::from_document(lopdf::Document::load_mem(bytes)?)
    }

    pub fn from_document(document: lopdf::Document) -> Result<DocumentHandle, Error> {
        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(Error::Pdf("source document has no pages".into()));
        }
        Ok(DocumentHandle {
            document,
            page_count,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub(crate) fn into_document(self) -> lopdf::Document {
        self.document
    }
}

/// Credentials for the origin site's login flow, exchanged for a [`Session`]
/// through [`ContentSource::login`].
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Explicit authentication state, passed to [`ContentSource`] implementations
/// that talk to a subscriber-only site. There are no ambient globals: a
/// source holding an anonymous session must surface
/// [`Error::NotAuthenticated`] instead of attempting a subscriber fetch.
#[derive(Clone, Debug, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Session {
        Session { token: None }
    }

    /// A session carrying the auth token obtained from a completed login.
    pub fn with_token(token: String) -> Session {
        Session { token: Some(token) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The auth token, or [`Error::NotAuthenticated`] for anonymous sessions.
    pub fn token(&self) -> Result<&str, Error> {
        self.token.as_deref().ok_or(Error::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Article;

    struct SubscriberSource;

    impl ContentSource for SubscriberSource {
        fn login(&self, credentials: &Credentials) -> Result<Session, Error> {
            if credentials.password.is_empty() {
                return Err(Error::NotAuthenticated);
            }
            Ok(Session::with_token(format!("token-{}", credentials.username)))
        }

        fn volume_index(&self, _journal_slug: &str) -> Result<Vec<VolumeInfo>, Error> {
            unimplemented!("not used by login tests")
        }

        fn issue_index(&self, _journal_slug: &str, _volume: u32) -> Result<Vec<IssueInfo>, Error> {
            unimplemented!("not used by login tests")
        }

        fn issue_contents(
            &self,
            _journal_slug: &str,
            _volume: u32,
            _issue: u32,
        ) -> Result<Vec<RawEntry>, Error> {
            unimplemented!("not used by login tests")
        }

        fn fetch_article(
            &self,
            _article: &Article,
            _scratch: &Path,
        ) -> Result<DocumentHandle, Error> {
            unimplemented!("not used by login tests")
        }
    }

    struct OpenSource;

    impl ContentSource for OpenSource {
        fn volume_index(&self, _journal_slug: &str) -> Result<Vec<VolumeInfo>, Error> {
            unimplemented!("not used by login tests")
        }

        fn issue_index(&self, _journal_slug: &str, _volume: u32) -> Result<Vec<IssueInfo>, Error> {
            unimplemented!("not used by login tests")
        }

        fn issue_contents(
            &self,
            _journal_slug: &str,
            _volume: u32,
            _issue: u32,
        ) -> Result<Vec<RawEntry>, Error> {
            unimplemented!("not used by login tests")
        }

        fn fetch_article(
            &self,
            _article: &Article,
            _scratch: &Path,
        ) -> Result<DocumentHandle, Error> {
            unimplemented!("not used by login tests")
        }
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn login_exchanges_credentials_for_a_session() {
        let session = SubscriberSource
            .login(&credentials("reviewer", "hunter2"))
            .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.token().unwrap(), "token-reviewer");
    }

    #[test]
    fn failed_login_surfaces_typed_error() {
        let err = SubscriberSource
            .login(&credentials("reviewer", ""))
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
    }

    #[test]
    fn sources_without_a_login_flow_stay_anonymous() {
        let session = OpenSource.login(&credentials("anyone", "ignored")).unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn anonymous_session_yields_typed_error() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());
        assert!(matches!(session.token(), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn authenticated_session_exposes_token() {
        let session = Session::with_token("abc123".into());
        assert!(session.is_authenticated());
        assert_eq!(session.token().unwrap(), "abc123");
    }
}
