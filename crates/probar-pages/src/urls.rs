//! URL helpers used by page navigation and assertions.

use url::{form_urlencoded, Position, Url};

/// Parse absolute URLs as-is and relative ones against a placeholder host
fn parse_lenient(url: &str) -> Option<Url> {
    match Url::parse(url) {
        Ok(parsed) => Some(parsed),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://localhost/")
            .and_then(|base| base.join(url))
            .ok(),
        Err(_) => None,
    }
}

/// Split an absolute URL into `scheme://host/path` and its query string.
///
/// Relative URLs are split at the first `?`, without normalization.
#[must_use]
pub fn split_url_and_params(url: &str) -> (String, String) {
    match Url::parse(url) {
        Ok(parsed) => (
            parsed[..Position::AfterPath].to_string(),
            parsed.query().unwrap_or_default().to_string(),
        ),
        Err(_) => {
            let url = url.split('#').next().unwrap_or_default();
            let (base, query) = url.split_once('?').unwrap_or((url, ""));
            (base.to_string(), query.to_string())
        }
    }
}

/// URL without its query string
#[must_use]
pub fn get_base_url(url: &str) -> String {
    split_url_and_params(url).0
}

/// `host[:port]` part of an absolute URL, empty for relative ones
#[must_use]
pub fn get_domain_from_url(url: &str) -> String {
    Url::parse(url)
        .map(|parsed| parsed[Position::BeforeUsername..Position::AfterPort].to_string())
        .unwrap_or_default()
}

/// Append form-encoded `params` to `url`
#[must_use]
pub fn add_url_params(url: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let delimiter = if url.contains('?') { '&' } else { '?' };
    format!("{url}{delimiter}{encoded}")
}

/// Non-empty values of query parameter `name`
#[must_use]
pub fn get_param_from_url(url: &str, name: &str) -> Option<Vec<String>> {
    let parsed = parse_lenient(url)?;
    let values: Vec<String> = parsed
        .query_pairs()
        .filter(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .collect();
    (!values.is_empty()).then_some(values)
}

/// Object id from a REST-style URL.
///
/// An `id` query parameter wins; otherwise the last path segment is tried.
#[must_use]
pub fn get_id_from_url(url: &str) -> Option<i64> {
    if let Some(ids) = get_param_from_url(url, "id") {
        return ids.first().and_then(|id| id.trim().parse().ok());
    }
    let parsed = parse_lenient(url)?;
    parsed
        .path()
        .rsplit('/')
        .next()
        .and_then(|segment| segment.trim().parse().ok())
}
