use reqwest::header::{HeaderMap, LINK};
use url::Url;

/// Extracts the `rel="next"` target from a `Link` header.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(parse_next)
}

fn parse_next(entry: &str) -> Option<String> {
    let mut parts = entry.split(';');
    let target = parts.next()?.trim();
    let target = target.strip_prefix('<')?.strip_suffix('>')?;
    let is_next = parts.any(|param| {
        let param = param.trim();
        param
            .strip_prefix("rel=")
            .map(|rel| rel.trim_matches('"').split_whitespace().any(|rel| rel == "next"))
            .unwrap_or(false)
    });
    is_next.then(|| target.to_string())
}

/// Some Canvas versions hand out next links without the `/api/v1` prefix.
///
/// Applied to every page link before it is followed.
pub fn normalize_next_link(link: &str) -> String {
    let Ok(mut parsed) = Url::parse(link) else {
        return link.to_string();
    };
    if parsed.path().starts_with("/api/") {
        return parsed.to_string();
    }
    let path = format!("/api/v1{}", parsed.path());
    parsed.set_path(&path);
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue, LINK};

    use super::{next_link, normalize_next_link};

    #[test]
    fn finds_next_among_relations() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://c.edu/api/v1/x?page=1>; rel=\"current\",<https://c.edu/api/v1/x?page=2>; rel=\"next\",<https://c.edu/api/v1/x?page=9>; rel=\"last\"",
            ),
        );
        assert_eq!(next_link(&headers).as_deref(), Some("https://c.edu/api/v1/x?page=2"));
    }

    #[test]
    fn no_next_on_last_page() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static("<https://c.edu/api/v1/x?page=1>; rel=\"first\""),
        );
        assert!(next_link(&headers).is_none());
        assert!(next_link(&HeaderMap::new()).is_none());
    }

    #[test]
    fn missing_api_prefix_is_restored() {
        assert_eq!(
            normalize_next_link("https://c.edu/accounts/1/developer_keys?page=2&per_page=100"),
            "https://c.edu/api/v1/accounts/1/developer_keys?page=2&per_page=100"
        );
        assert_eq!(
            normalize_next_link("https://c.edu/api/v1/accounts/1/external_tools?page=2"),
            "https://c.edu/api/v1/accounts/1/external_tools?page=2"
        );
    }
}
