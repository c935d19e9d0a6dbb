use jpm_common::error::{JpmError, Result};
use url::{Host, Url};

/// Validates a URL, ensuring it uses the HTTPS scheme. Plain HTTP is allowed
/// only for loopback hosts so a local registry mirror can be used.
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str)
        .map_err(|e| JpmError::Validation(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback(&url) => Ok(url),
        scheme => Err(JpmError::Validation(format!(
            "Invalid URL scheme for '{url_str}': Must be https, but got '{scheme}'"
        ))),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_is_accepted() {
        assert!(validate_url("https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz").is_ok());
    }

    #[test]
    fn plain_http_only_for_loopback() {
        assert!(validate_url("http://127.0.0.1:4873/left-pad").is_ok());
        assert!(validate_url("http://localhost:4873/left-pad").is_ok());
        assert!(matches!(
            validate_url("http://registry.example.com/left-pad"),
            Err(JpmError::Validation(_))
        ));
    }

    #[test]
    fn garbage_and_other_schemes_are_rejected() {
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("ftp://example.com/x.tgz").is_err());
    }
}
