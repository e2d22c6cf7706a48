use std::net::{IpAddr, Ipv4Addr};

use actix_web::HttpRequest;
use actix_web::http::{Method, Uri, header};

/// Hosts accepted as a POST referer in addition to the request's own host.
pub const DEV_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

/// Resolve the caller's IP. `Client-IP` and `X-Forwarded-For` are honoured only
/// behind a trusted proxy; anything unparseable becomes `0.0.0.0`.
pub fn client_ip(req: &HttpRequest, trust_proxy_headers: bool) -> IpAddr {
    let from_headers = if trust_proxy_headers {
        header_value(req, "Client-IP").or_else(|| {
            header_value(req, "X-Forwarded-For")
                .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        })
    } else {
        None
    };

    let candidate = match from_headers {
        Some(v) if !v.is_empty() => Some(v),
        _ => req.peer_addr().map(|addr| addr.ip().to_string()),
    };

    candidate
        .and_then(|v| v.parse::<IpAddr>().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Same-origin check for state-changing requests, based on the `Referer` header.
pub fn validate_request_origin(req: &HttpRequest) -> bool {
    if *req.method() != Method::POST {
        return true;
    }
    let Some(referer) = req.headers().get(header::REFERER).and_then(|v| v.to_str().ok()) else {
        return true;
    };
    let conn = req.connection_info();
    referer_allowed(referer, conn.host())
}

/// Pure form of the origin rule: the referer's host must match the server host
/// (ports ignored) or one of `DEV_HOSTS`. An unparseable referer is rejected.
pub fn referer_allowed(referer: &str, server_host: &str) -> bool {
    let Some(referer_host) = referer.parse::<Uri>().ok().and_then(|u| u.host().map(str::to_string)) else {
        return false;
    };
    let referer_host = referer_host.trim_start_matches('[').trim_end_matches(']');
    let server_host = strip_port(server_host);
    referer_host.eq_ignore_ascii_case(server_host)
        || DEV_HOSTS.iter().any(|h| referer_host.eq_ignore_ascii_case(h))
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [v6]:port
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) && !name.contains(':') => name,
        _ => host,
    }
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn referer_same_host_passes_regardless_of_port() {
        assert!(referer_allowed("https://events.example.com/events/3", "events.example.com"));
        assert!(referer_allowed("http://events.example.com:8080/login", "events.example.com:8080"));
        assert!(referer_allowed("http://events.example.com/login", "events.example.com:8080"));
    }

    #[test]
    fn referer_dev_hosts_pass() {
        assert!(referer_allowed("http://localhost:3000/", "events.example.com"));
        assert!(referer_allowed("http://127.0.0.1/", "events.example.com"));
    }

    #[test]
    fn foreign_or_garbage_referer_fails() {
        assert!(!referer_allowed("https://evil.example.net/form", "events.example.com"));
        assert!(!referer_allowed("not a url", "events.example.com"));
    }

    #[test]
    fn strip_port_variants() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "::1");
    }

    #[test]
    fn get_requests_skip_origin_check() {
        let req = TestRequest::get()
            .insert_header((header::REFERER, "https://evil.example.net/"))
            .to_http_request();
        assert!(validate_request_origin(&req));
    }

    #[test]
    fn post_without_referer_passes() {
        let req = TestRequest::post().to_http_request();
        assert!(validate_request_origin(&req));
    }

    #[test]
    fn post_with_foreign_referer_fails() {
        let req = TestRequest::post()
            .insert_header((header::HOST, "events.example.com"))
            .insert_header((header::REFERER, "https://evil.example.net/"))
            .to_http_request();
        assert!(!validate_request_origin(&req));
    }

    #[test]
    fn client_ip_ignores_proxy_headers_unless_trusted() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.9, 10.0.0.1"))
            .peer_addr("192.0.2.1:5000".parse().unwrap())
            .to_http_request();
        assert_eq!(client_ip(&req, false), "192.0.2.1".parse::<IpAddr>().unwrap());
        assert_eq!(client_ip(&req, true), "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn client_ip_falls_back_to_unspecified() {
        let req = TestRequest::default()
            .insert_header(("Client-IP", "garbage"))
            .to_http_request();
        assert_eq!(client_ip(&req, true), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
