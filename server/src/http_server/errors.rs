use std::fmt::{Debug, Display};

use axum::{http::StatusCode, response::IntoResponse};

pub struct ServerError(pub(crate) color_eyre::Report, pub(crate) StatusCode);

impl ServerError {
    pub(crate) fn not_found(message: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self(color_eyre::Report::msg(message), StatusCode::NOT_FOUND)
    }

    pub(crate) fn bad_request(message: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self(color_eyre::Report::msg(message), StatusCode::BAD_REQUEST)
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl Debug for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("Status Code: {}\n", self.1))?;
        f.write_str("ServerError: \n")?;

        Debug::fmt(&self.0, f)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        if self.1.is_server_error() {
            let error: &(dyn std::error::Error + 'static) = self.0.as_ref();
            sentry::capture_error(error);

            tracing::error!(error = ?self, "ServerError");
        } else {
            tracing::info!(status = %self.1, error = %self, "Request rejected");
        }

        (self.1, self.to_string()).into_response()
    }
}

impl From<color_eyre::Report> for ServerError {
    fn from(err: color_eyre::Report) -> Self {
        ServerError(err, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError>;
}

impl<T, E> WithStatus<T> for Result<T, E>
where
    E: Into<color_eyre::Report>,
{
    fn with_status(self, status: StatusCode) -> Result<T, ServerError> {
        self.map_err(|err| ServerError(err.into(), status))
    }
}
