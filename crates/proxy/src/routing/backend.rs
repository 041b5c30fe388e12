//! Routing decision: tenant ID + scheme + backend template -> upstream URL

use std::fmt;
use tenantgate_shared::TenantId;
use url::Url;

/// Maximum length of a single DNS label
const MAX_LABEL_LEN: usize = 63;

/// Transport scheme of the inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while building the upstream target
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("Tenant ID is empty")]
    EmptyTenantId,

    #[error("Tenant ID is not a valid hostname label: {0}")]
    InvalidTenantId(String),

    #[error("Invalid backend template: {0}")]
    InvalidTemplate(String),
}

/// Build `scheme://<tenant>.<template>` for a resolved tenant.
///
/// The tenant ID becomes a hostname label, so anything other than a single
/// DNS label (dots, slashes, `@`, ...) is rejected instead of being spliced in.
pub fn determine_backend(
    tenant: &TenantId,
    scheme: Scheme,
    template: &str,
) -> Result<Url, RouteError> {
    if tenant.is_empty() {
        return Err(RouteError::EmptyTenantId);
    }
    if !is_dns_label(tenant.as_str()) {
        return Err(RouteError::InvalidTenantId(tenant.to_string()));
    }
    validate_backend_template(template)?;

    let target = format!("{}://{}.{}", scheme, tenant, template);
    let url = Url::parse(&target).map_err(|e| RouteError::InvalidTemplate(e.to_string()))?;

    if url.host_str().is_none() {
        return Err(RouteError::InvalidTemplate(template.to_string()));
    }

    Ok(url)
}

/// Check that a template is a bare `host[:port]`
pub fn validate_backend_template(template: &str) -> Result<(), RouteError> {
    let invalid = || RouteError::InvalidTemplate(template.to_string());

    if template.is_empty() || template.starts_with('.') {
        return Err(invalid());
    }
    if template.contains("://") {
        return Err(invalid());
    }
    if template
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@' | '\\'))
    {
        return Err(invalid());
    }

    let (host, port) = match template.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (template, None),
    };

    if host.is_empty() || !host.split('.').all(is_dns_label) {
        return Err(invalid());
    }
    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err(invalid());
        }
    }

    Ok(())
}

/// A single hostname label: alphanumerics and inner hyphens, 1-63 chars
fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
