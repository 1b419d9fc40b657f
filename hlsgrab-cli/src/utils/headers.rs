use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

/// Parse a header string in format "Name: Value" and add it to the HeaderMap
fn parse_and_add_header(headers: &mut HeaderMap, header_str: &str) {
    // Find the first colon which separates name and value
    let Some(colon_pos) = header_str.find(':') else {
        warn!("Invalid header format: '{header_str}'. Expected 'Name: Value'");
        return;
    };

    let name = header_str[..colon_pos].trim();
    let value = header_str[colon_pos + 1..].trim();

    // Try to create a header name and value
    let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
        warn!("Invalid header name: '{name}'");
        return;
    };

    let Ok(header_value) = HeaderValue::from_str(value) else {
        warn!(name, "Invalid header value");
        return;
    };

    // Values may carry credentials
    debug!(name, "Adding request header");
    headers.insert(header_name, header_value);
}

/// Parse a collection of header strings and return a HeaderMap
pub fn parse_headers(header_strings: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for header_str in header_strings {
        parse_and_add_header(&mut headers, header_str);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers(&[
            "Cookie: session=abc; lang=en".to_string(),
            "X-Forwarded-For:10.0.0.1".to_string(),
            "Authorization: Bearer a:b".to_string(),
        ]);
        assert_eq!(headers.get("cookie").unwrap(), "session=abc; lang=en");
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "10.0.0.1");
        // Only the first colon separates name and value
        assert_eq!(headers.get("authorization").unwrap(), "Bearer a:b");
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let headers = parse_headers(&[
            "no colon here".to_string(),
            "bad name: value".to_string(),
            "X-Ok: yes".to_string(),
        ]);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-ok").unwrap(), "yes");
    }
}
