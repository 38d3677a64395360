//! Error taxonomy shared by the token cache, the Helix client and the playback signer.

use http::StatusCode;

pub type Result<T, E = ProxyError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// A credential needed for the operation was not configured.
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    /// An upstream Twitch endpoint answered with a non-success status, or with a
    /// protocol-level error in an otherwise successful response.
    #[error("upstream responded with status {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    /// Transport and decoding failures.
    #[error(transparent)]
    Other(#[from] eyre::Report),
}

impl ProxyError {
    /// Reads the body of a failed upstream response into an [`ProxyError::Upstream`].
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        Self::Upstream { status, body }
    }

    /// The cause chain of this error, outermost first.
    pub fn chain(&self) -> Vec<String> {
        match self {
            Self::Other(report) => report.chain().map(|e| e.to_string()).collect(),
            other => {
                let mut chain = vec![other.to_string()];
                let mut source = std::error::Error::source(other);
                while let Some(e) = source {
                    chain.push(e.to_string());
                    source = e.source();
                }
                chain
            }
        }
    }
}
