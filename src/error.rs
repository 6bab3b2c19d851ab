use thiserror::Error;

/// Errors surfaced by the issuebind library.
///
/// `InvalidReference` is recoverable (the caller asked for a volume or issue
/// number that does not exist and can retry with one of the listed numbers).
/// Everything else aborts the current build; there is no partial output.
#[derive(Debug, Error)]
pub enum Error {
    /// A volume or issue number that is not present in the fetched index.
    #[error("invalid {kind} number {requested}, valid numbers are: {valid:?}")]
    InvalidReference {
        kind: &'static str,
        requested: u32,
        valid: Vec<u32>,
    },

    /// An article's source document could not be retrieved or opened.
    /// Fatal: the whole build aborts and scratch files are cleaned up.
    #[error("source document unavailable for article {article:?}")]
    SourceUnavailable {
        article: String,
        #[source]
        cause: Box<Error>,
    },

    /// A structural element in fetched contents that the parser does not
    /// recognize. Fatal, since page accounting cannot run on a partial tree.
    #[error("malformed issue contents: {0}")]
    MalformedContent(String),

    /// A subscriber-only fetch was attempted without an authenticated session.
    #[error("not authenticated; authenticate a Session before fetching subscriber content")]
    NotAuthenticated,

    #[error("pdf assembly failed: {0}")]
    Pdf(String),

    #[error(transparent)]
    PdfObject(#[from] lopdf::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a fetch failure with the name of the article it concerns.
    pub fn source_unavailable(article: &str, cause: Error) -> Error {
        Error::SourceUnavailable {
            article: article.to_string(),
            cause: Box::new(cause),
        }
    }
}
