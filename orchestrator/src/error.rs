use thiserror::Error;
use warp::http::StatusCode;
use warp::{reject::Reject, Reply, Rejection};

/// Failure of a single call to search, forum or model provider.
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    #[error("{service} rejected credentials: {message}")]
    Auth {
        service: &'static str,
        message: String,
    },

    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} returned malformed data: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    pub fn transport(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            service,
            message: err.to_string(),
        }
    }

    pub fn malformed(service: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            service,
            message: message.into(),
        }
    }

    pub fn rejected_credentials(service: &'static str, status: StatusCode, body: &str) -> Self {
        Self::Auth {
            service,
            message: format!("HTTP {}: {}", status.as_u16(), body),
        }
    }

    /// 401 is a credential rejection; every other non-success status is a plain failure.
    /// Clients whose provider signals bad credentials differently classify before falling back here.
    pub fn from_status(service: &'static str, status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            Self::rejected_credentials(service, status, &body)
        } else {
            Self::Status {
                service,
                status: status.as_u16(),
                body,
            }
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("upstream authentication failed: {0}")]
    UpstreamAuth(UpstreamError),

    #[error("upstream request failed: {0}")]
    UpstreamTransport(UpstreamError),
}

impl From<UpstreamError> for PipelineError {
    fn from(err: UpstreamError) -> Self {
        if err.is_auth() {
            PipelineError::UpstreamAuth(err)
        } else {
            PipelineError::UpstreamTransport(err)
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Server misconfiguration: {0}")]
    Misconfigured(String),

    #[error("Upstream authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl Reject for ApiError {}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(reason) => ApiError::InvalidInput(reason),
            PipelineError::Configuration(reason) => ApiError::Misconfigured(reason),
            PipelineError::UpstreamAuth(inner) => ApiError::AuthenticationError(inner.to_string()),
            PipelineError::UpstreamTransport(inner) => ApiError::Upstream(inner.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Misconfigured(_) | ApiError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    let (status, message) = if let Some(api_err) = err.find::<ApiError>() {
        (api_err.status(), api_err.to_string())
    } else if let Some(body_err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid input: {}", body_err),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Invalid input: request body too large".to_string(),
        )
    } else {
        return Err(err);
    };

    let json = warp::reply::json(&serde_json::json!({ "error": message }));
    Ok(warp::reply::with_status(json, status))
}
