use ra_domain::Error;

/// Maps a transport-level `reqwest::Error` onto the shared error taxonomy
/// so the Retry Envelope's classifier can see it uniformly.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else if e.is_connect() {
        Error::Network(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

pub fn status_to_error(provider: &str, status: reqwest::StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::Authentication(format!("{provider}: {body}")),
        400 => Error::Validation(format!("{provider}: {body}")),
        404 => Error::Validation(format!("{provider}: model or endpoint not found: {body}")),
        429 => Error::RateLimit(format!("{provider}: {body}")),
        500..=599 => Error::ServerError {
            status: status.as_u16(),
            message: body.to_string(),
        },
        _ => Error::Provider {
            provider: provider.to_string(),
            message: format!("HTTP {}: {body}", status.as_u16()),
        },
    }
}

pub fn resolve_api_key(env_var: &str) -> ra_domain::Result<String> {
    std::env::var(env_var).map_err(|_| Error::Config(format!("missing environment variable {env_var}")))
}
