//! Retrieval of issuer certificates named by the caIssuers access method of authorityInfoAccess.
//!
//! Whatever a fetcher returns is untrusted input: the chain validator verifies a fetched
//! certificate like any other before relying on it.

use std::collections::HashMap;
use std::io::Read;
use thiserror::Error;

/// Largest certificate accepted from a caIssuers location.
pub const DEFAULT_MAX_SIZE: u64 = 64 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    /// only plain `http://` locations are followed
    #[error("unsupported URL scheme in `{url}`")]
    UnsupportedScheme { url: String },

    #[error("nothing found at `{url}`")]
    NotFound { url: String },

    #[error("`{url}` answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("`{url}` sent more than {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("couldn't read the answer of `{url}`: {source}")]
    Io { url: String, source: std::io::Error },

    #[cfg(feature = "http_fetch")]
    #[error("couldn't fetch `{url}`: {source}")]
    Http { url: String, source: reqwest::Error },
}

/// Fetches the raw bytes (DER or PEM) of a certificate from a caIssuers URL.
pub trait IssuerFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// In-memory fetcher keyed by URL.
impl IssuerFetcher for HashMap<String, Vec<u8>> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound { url: url.to_owned() })
    }
}

impl<F: IssuerFetcher + ?Sized> IssuerFetcher for &F {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url)
    }
}

pub(crate) fn check_scheme(url: &str) -> Result<(), FetchError> {
    let is_http = url
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http://"));
    if is_http {
        Ok(())
    } else {
        Err(FetchError::UnsupportedScheme { url: url.to_owned() })
    }
}

/// Reads at most `limit` bytes of `body`, failing when there is more.
#[cfg_attr(not(feature = "http_fetch"), allow(dead_code))]
pub(crate) fn read_bounded<R: Read>(body: R, url: &str, limit: u64) -> Result<Vec<u8>, FetchError> {
    let mut bytes = Vec::new();
    body.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|source| FetchError::Io {
            url: url.to_owned(),
            source,
        })?;

    if bytes.len() as u64 > limit {
        return Err(FetchError::TooLarge {
            url: url.to_owned(),
            limit,
        });
    }
    Ok(bytes)
}

#[cfg(feature = "http_fetch")]
pub use http::HttpFetcher;

#[cfg(feature = "http_fetch")]
mod http {
    use super::{check_scheme, read_bounded, FetchError, IssuerFetcher, DEFAULT_MAX_SIZE};
    use reqwest::blocking::Client;
    use reqwest::header::CACHE_CONTROL;
    use reqwest::StatusCode;
    use std::time::Duration;

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Blocking HTTP GET with a bounded timeout and body size.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: Client,
        max_size: u64,
    }

    impl HttpFetcher {
        pub fn new() -> Result<Self, FetchError> {
            Self::with_timeout(DEFAULT_TIMEOUT)
        }

        pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|source| FetchError::Http {
                    url: String::new(),
                    source,
                })?;
            Ok(Self {
                client,
                max_size: DEFAULT_MAX_SIZE,
            })
        }

        /// Largest body accepted, in bytes.
        pub fn max_size(mut self, max_size: u64) -> Self {
            self.max_size = max_size;
            self
        }
    }

    impl IssuerFetcher for HttpFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            check_scheme(url)?;

            let http_error = |source| FetchError::Http {
                url: url.to_owned(),
                source,
            };

            let response = self
                .client
                .get(url)
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .map_err(http_error)?;

            match response.status() {
                StatusCode::OK => {
                    if response.content_length().is_some_and(|len| len > self.max_size) {
                        return Err(FetchError::TooLarge {
                            url: url.to_owned(),
                            limit: self.max_size,
                        });
                    }
                    read_bounded(response, url, self.max_size)
                }
                StatusCode::NOT_FOUND => Err(FetchError::NotFound { url: url.to_owned() }),
                status => Err(FetchError::Status {
                    url: url.to_owned(),
                    status: status.as_u16(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory() {
        let mut fetcher = HashMap::new();
        fetcher.insert("http://ca.test/a.crt".to_owned(), vec![1, 2, 3]);

        assert_eq!(fetcher.fetch("http://ca.test/a.crt").unwrap(), vec![1, 2, 3]);
        assert!(matches!(fetcher.fetch("http://ca.test/b.crt"), Err(FetchError::NotFound { .. })));
    }

    #[test]
    fn schemes() {
        check_scheme("http://ca.test/a.crt").unwrap();
        check_scheme("HTTP://ca.test/a.crt").unwrap();
        assert!(matches!(
            check_scheme("https://ca.test/a.crt"),
            Err(FetchError::UnsupportedScheme { .. })
        ));
        assert!(check_scheme("ldap://ca.test").is_err());
    }

    #[test]
    fn body_size_is_bounded() {
        let body = [0u8; 16];
        assert_eq!(read_bounded(&body[..], "http://ca.test/a.crt", 16).unwrap().len(), 16);
        assert!(matches!(
            read_bounded(&body[..], "http://ca.test/a.crt", 15),
            Err(FetchError::TooLarge { limit: 15, .. })
        ));
        assert!(read_bounded(&body[..0], "http://ca.test/a.crt", 0).unwrap().is_empty());
    }
}
