use std::error::Error as StdError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Error {operation}: HTTP {status} {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("Error {operation}: {detail}")]
    Transport {
        operation: &'static str,
        detail: String,
    },
    #[error("Error {operation}: untrusted certificate in chain")]
    UntrustedCertificate { operation: &'static str },
    #[error("Conflict while {operation}, check registration ids (lti/proxy) are unique")]
    Conflict { operation: &'static str },
    #[error("Error {operation}: unexpected response: {detail}")]
    InvalidResponse {
        operation: &'static str,
        detail: String,
    },
}

impl GatewayError {
    /// Classifies a client error, recognising certificate trust failures
    /// anywhere in the source chain.
    pub fn from_transport(operation: &'static str, err: &reqwest::Error) -> Self {
        let detail = error_chain(err);
        if is_untrusted_certificate(&detail) {
            return GatewayError::UntrustedCertificate { operation };
        }
        GatewayError::Transport { operation, detail }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } => Some(*status),
            GatewayError::Conflict { .. } => Some(409),
            _ => None,
        }
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

pub(crate) fn is_untrusted_certificate(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("self signed certificate")
        || lower.contains("self-signed certificate")
        || lower.contains("unknownissuer")
        || lower.contains("unknown issuer")
}

pub type GatewayResult<T> = Result<T, GatewayError>;
