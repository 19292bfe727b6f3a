use crate::settings::Settings;
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref SCHEME: Regex =
        crate::pattern(r"^([A-Za-z][A-Za-z0-9+.\-]*):");
}

/// Schemes that must carry a host
const HIERARCHICAL: [&str; 3] = ["http", "https", "ftp"];

fn percent_encode(uri: &str) -> String {
    let mut encoded = String::with_capacity(uri.len());
    for ch in uri.chars() {
        match ch {
            ' ' => encoded.push_str("%20"),
            '"' => encoded.push_str("%22"),
            '<' => encoded.push_str("%3C"),
            '>' => encoded.push_str("%3E"),
            other => encoded.push(other),
        }
    }
    encoded
}

/// Validates a uri. Relative uris are always fine, absolute ones need an allowed scheme.
/// Embedded resources may be restricted to the local host.
pub(crate) fn validate(value: &str, embedded: bool, settings: &Settings) -> Option<String> {
    // browsers ignore tabs and newlines inside uris, so `java\tscript:` must not slip through
    let uri: String = value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .trim()
        .to_string();

    let has_host = match SCHEME.captures(&uri) {
        Some(captures) => {
            let scheme = captures.get(1)?.as_str().to_ascii_lowercase();
            if !settings.allowed_schemes.contains(&scheme) {
                return None;
            }

            if HIERARCHICAL.contains(&scheme.as_str()) {
                let parsed = Url::parse(&uri).ok()?;
                parsed.host_str()?;
                true
            } else {
                false
            }
        }
        None if uri.starts_with("//") => {
            // protocol relative
            let parsed = Url::parse(&format!("http:{uri}")).ok()?;
            parsed.host_str()?;
            true
        }
        None => false,
    };

    if embedded && has_host && settings.disable_external_resources {
        return None;
    }

    Some(percent_encode(&uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("http://example.com/a b", Some("http://example.com/a%20b"))]
    #[test_case("HTTPS://example.com", Some("HTTPS://example.com"))]
    #[test_case("/relative/path?x=1", Some("/relative/path?x=1"))]
    #[test_case("mailto:someone@example.com", Some("mailto:someone@example.com"))]
    #[test_case("javascript:alert(1)", None)]
    #[test_case("java\tscript:alert(1)", None)]
    #[test_case(" JavaScript:alert(1)", None)]
    #[test_case("http://", None)]
    #[test_case("data:text/html,x", None)]
    #[test_case("//example.com/x", Some("//example.com/x"))]
    #[test_case("a\"onclick=\"x", Some("a%22onclick=%22x"))]
    fn uris(value: &str, expected: Option<&str>) {
        let settings = Settings::defaults().unwrap();
        assert_eq!(validate(value, false, &settings).as_deref(), expected);
    }

    #[test]
    fn external_resources() {
        let mut settings = Settings::defaults().unwrap();
        settings.disable_external_resources = true;

        assert_eq!(validate("http://evil.com/x.png", true, &settings), None);
        assert_eq!(validate("//evil.com/x.png", true, &settings), None);
        assert_eq!(
            validate("/local.png", true, &settings).as_deref(),
            Some("/local.png")
        );
        // links are not embedded resources
        assert!(validate("http://evil.com/", false, &settings).is_some());
    }
}
