use crate::api::models::{CompileRequest, CompileStatusResponse};
use crate::core::error::{LatexError, Result};
use super::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;

/// Handler for POST /compile - Compile LaTeX and return the PDF
pub async fn compile(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CompileRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload.map_err(|rejection| LatexError::Validation(rejection.body_text()))?;

    let pdf = state
        .compiler
        .compile_pdf(&request.content, &request.filename)
        .await?;

    let disposition = format!("attachment; filename={}.pdf", request.filename);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Bytes::from(pdf),
    ))
}

/// Handler for POST /compile-status - Compile LaTeX and report status and logs
///
/// Always answers 200; failures are described in the body.
pub async fn compile_status(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CompileRequest>, JsonRejection>,
) -> Json<CompileStatusResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return Json(LatexError::Validation(rejection.body_text()).into());
        }
    };

    let response = match state
        .compiler
        .compile(&request.content, &request.filename)
        .await
    {
        Ok(result) => CompileStatusResponse::from(result),
        Err(e) => {
            tracing::warn!(error_type = e.error_type(), "Compile status request failed: {}", e);
            CompileStatusResponse::from(e)
        }
    };

    Json(response)
}
