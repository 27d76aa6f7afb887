use url::Url;

use super::TransportError;

/// The maximum length of a request URL.
pub const URL_MAX_LENGTH: usize = 2048;

/// The endpoint and headers attached verbatim to every request of an array store connection.
///
/// Credentials are supplied by the caller as ready-made headers (e.g. `Authorization`).
#[derive(Clone, Debug)]
pub struct ConnectionContext {
    base_url: Url,
    headers: Vec<(String, String)>,
}

impl ConnectionContext {
    /// Create a new connection context for the array store at `base_url`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidUrl`] if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(base_url).map_err(|err| TransportError::InvalidUrl(format!("{base_url}: {err}")))?;
        Ok(Self {
            base_url,
            headers: Vec::new(),
        })
    }

    /// Set the domain addressed by requests, sent as the `Host` header.
    #[must_use]
    pub fn with_domain(self, domain: &str) -> Self {
        self.with_header("Host", domain)
    }

    /// Append a header attached to every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(header, _)| !header.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Return the headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Return the URL of the value of dataset `id`, with an optional `select` query parameter.
    ///
    /// # Errors
    /// Returns [`TransportError::UrlTooLong`] if the URL exceeds [`URL_MAX_LENGTH`].
    pub fn value_url(&self, id: &str, select: Option<&str>) -> Result<String, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = match select {
            Some(select) if !select.is_empty() => format!("{base}/datasets/{id}/value?select={select}"),
            _ => format!("{base}/datasets/{id}/value"),
        };
        if url.len() > URL_MAX_LENGTH {
            Err(TransportError::UrlTooLong(url.len(), URL_MAX_LENGTH))
        } else {
            Ok(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_url() {
        let connection = ConnectionContext::new("http://localhost:5101/")
            .unwrap()
            .with_domain("/home/test/a.h5")
            .with_header("Authorization", "Basic dGVzdDp0ZXN0")
            .with_domain("/home/test/b.h5");
        assert_eq!(
            connection.value_url("d-1", None).unwrap(),
            "http://localhost:5101/datasets/d-1/value"
        );
        assert_eq!(
            connection.value_url("d-1", Some("[0:4:1]")).unwrap(),
            "http://localhost:5101/datasets/d-1/value?select=[0:4:1]"
        );
        assert_eq!(connection.headers().len(), 2);
        assert_eq!(connection.headers()[1], ("Host".to_string(), "/home/test/b.h5".to_string()));
        let select = format!("[{}]", vec!["0:1:1"; 500].join(","));
        assert!(matches!(
            connection.value_url("d-1", Some(&select)),
            Err(TransportError::UrlTooLong(_, URL_MAX_LENGTH))
        ));
        assert!(ConnectionContext::new("not a url").is_err());
    }
}
