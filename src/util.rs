use reqwest::Url;
use std::net::IpAddr;

/// Reads a textual on/off switch the way env vars usually spell one.
/// Anything unrecognized counts as off.
pub fn flag_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether a URL points at this machine. The backend is expected to run
/// locally, so connect failures against such hosts get a hint about starting
/// it instead of a bare transport error.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    // IPv6 hosts come back bracketed from the URL parser.
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    match bare.parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || ip.is_unspecified(),
        Err(_) => false,
    }
}
