use reqwest::Proxy;

/// Proxy configuration types
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum ProxyType {
    /// HTTP proxy
    Http,
    /// HTTPS proxy
    Https,
    /// SOCKS5 proxy
    Socks5,
    /// All protocols proxy (use this for general-purpose proxies)
    All,
}

/// Proxy authentication type
#[derive(Debug, Clone)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy server URL (e.g., "http://proxy.example.com:8080")
    pub url: String,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

impl ProxyConfig {
    /// Infer the proxy type from the URL scheme, falling back to a catch-all proxy.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let proxy_type = match url.split_once("://").map(|(scheme, _)| scheme) {
            Some("socks5") | Some("socks5h") => ProxyType::Socks5,
            Some("https") => ProxyType::Https,
            _ => ProxyType::All,
        };
        Self {
            url,
            proxy_type,
            auth: None,
        }
    }
}

/// Build a reqwest Proxy object from our proxy configuration
pub fn build_proxy_from_config(config: &ProxyConfig) -> Result<Proxy, String> {
    let proxy_url = &config.url;

    let mut proxy = match config.proxy_type {
        ProxyType::Http => {
            Proxy::http(proxy_url).map_err(|e| format!("Invalid HTTP proxy URL: {e}"))?
        }
        ProxyType::Https => {
            Proxy::https(proxy_url).map_err(|e| format!("Invalid HTTPS proxy URL: {e}"))?
        }
        ProxyType::Socks5 => {
            let url = if proxy_url.starts_with("socks5") {
                proxy_url.to_string()
            } else {
                format!("socks5://{proxy_url}")
            };

            Proxy::all(&url).map_err(|e| format!("Invalid SOCKS5 proxy URL: {e}"))?
        }
        ProxyType::All => Proxy::all(proxy_url).map_err(|e| format!("Invalid proxy URL: {e}"))?,
    };

    if let Some(auth) = &config.auth {
        proxy = proxy.basic_auth(&auth.username, &auth.password);
    }

    Ok(proxy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_type_from_scheme() {
        assert_eq!(
            ProxyConfig::from_url("socks5://127.0.0.1:1080").proxy_type,
            ProxyType::Socks5
        );
        assert_eq!(
            ProxyConfig::from_url("https://proxy.local:443").proxy_type,
            ProxyType::Https
        );
        assert_eq!(
            ProxyConfig::from_url("http://proxy.local:8080").proxy_type,
            ProxyType::All
        );
    }
}
