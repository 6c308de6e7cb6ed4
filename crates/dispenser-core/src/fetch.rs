//! URL retrieval
//!
//! Fetches are blocking and streamed: the response body is read as the
//! records are pulled. Without the `http` feature every fetch fails with
//! [`Error::MissingDependency`].

use std::io::Read;

use crate::error::{Error, Result};

/// An open response body
pub(crate) struct Fetched {
    pub reader: Box<dyn Read>,
    pub content_type: Option<String>,
}

#[cfg(feature = "http")]
pub(crate) fn fetch(url: &str) -> Result<Fetched> {
    tracing::debug!(url, "Fetching");
    let response = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .map_err(|e| Error::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    Ok(Fetched {
        reader: Box::new(response),
        content_type,
    })
}

#[cfg(not(feature = "http"))]
pub(crate) fn fetch(_url: &str) -> Result<Fetched> {
    Err(Error::MissingDependency {
        capability: "http",
        feature: "http",
    })
}
