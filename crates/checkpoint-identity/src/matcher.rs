//! The remote face matcher collaborator.

use std::future::Future;
use std::sync::Arc;

use checkpoint_protocol::{Codec, JsonCodec};
use serde::{Deserialize, Serialize};

use crate::MatcherError;

/// The matcher's answer for one still, as it appears on the wire.
///
/// ```json
/// {"verified": true, "name": "Ada Lovelace", "mis": "112233", "distance": 0.21}
/// {"verified": false, "message": "No match found in database"}
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchResponse {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The student's registration number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Embedding distance of the best match. Lower is closer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl MatchResponse {
    /// Parses a JSON response body.
    ///
    /// # Errors
    /// [`MatcherError::MalformedResponse`] if the body isn't a match response.
    pub fn from_json(body: &[u8]) -> Result<Self, MatcherError> {
        Ok(JsonCodec.decode(body)?)
    }
}

/// Matches a still image against enrolled faces.
///
/// Checkpoint never computes embeddings; it sends the still and normalizes
/// whatever comes back.
pub trait RemoteMatcher: Send + Sync + 'static {
    /// Asks the matcher about one encoded still.
    ///
    /// # Errors
    /// Any [`MatcherError`] when no usable answer came back.
    fn match_face(
        &self,
        still: &[u8],
    ) -> impl Future<Output = Result<MatchResponse, MatcherError>> + Send;
}

impl<M: RemoteMatcher> RemoteMatcher for Arc<M> {
    fn match_face(
        &self,
        still: &[u8],
    ) -> impl Future<Output = Result<MatchResponse, MatcherError>> + Send {
        (**self).match_face(still)
    }
}
