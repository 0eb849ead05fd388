//! Archive upload endpoint
//!
//! `PUT /actions:upload[?date=YYYY-MM-DD]` archives one day of actions and
//! answers with the public URL of the stored report.

use axum::{
    Router,
    extract::State,
    http::{Method, Uri},
    routing::any,
};

use crate::AppState;
use crate::error::AppError;
use crate::service::{ArchiveStage, resolve_report_date};

/// Create archive router
///
/// Routes:
/// - PUT /actions:upload - Archive actions for `date` (default: yesterday)
///
/// Every method is routed to the handler so that non-PUT requests get the
/// same error body as other failures.
pub fn archive_router() -> Router<AppState> {
    Router::new().route("/actions:upload", any(upload_actions))
}

/// PUT /actions:upload
///
/// Returns the public URL of the archived report as plain text.
async fn upload_actions(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Result<String, AppError> {
    tracing::debug!(method = %method, stage = %ArchiveStage::Received, "Archive stage");

    if method != Method::PUT {
        tracing::warn!(method = %method, "Rejected archive request method");
        return Err(AppError::MethodNotAllowed(method.to_string()));
    }

    let param = date_param(&uri);
    let date = resolve_report_date(
        param.as_deref(),
        state.clock.now(),
        state.config.report.timezone,
    )
    .inspect_err(|error| tracing::warn!(%error, "Rejected archive request date"))?;
    tracing::debug!(date = %date, stage = %ArchiveStage::DateResolved, "Archive stage");

    let report = state.archive.archive(date).await?;
    Ok(report.url)
}

/// First `date` value of the query string, if any
fn date_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "date")
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_param_reads_first_value() {
        let uri: Uri = "/actions:upload?date=2023-06-01&date=2023-06-02".parse().unwrap();
        assert_eq!(date_param(&uri).as_deref(), Some("2023-06-01"));
    }

    #[test]
    fn date_param_is_none_without_query() {
        let uri: Uri = "/actions:upload".parse().unwrap();
        assert_eq!(date_param(&uri), None);
    }

    #[test]
    fn date_param_decodes_percent_escapes() {
        let uri: Uri = "/actions:upload?other=1&date=2023%2D06%2D01".parse().unwrap();
        assert_eq!(date_param(&uri).as_deref(), Some("2023-06-01"));
    }
}
