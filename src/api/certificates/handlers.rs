use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::certificate::{CertificateResponse, IssueCertificateResponse, VerifyResponse};
use crate::services::certificates::{self, IssuedCertificate};

fn issued_response(
    state: &AppState,
    issued: IssuedCertificate,
) -> (StatusCode, Json<IssueCertificateResponse>) {
    let status = if issued.created { StatusCode::CREATED } else { StatusCode::OK };
    let certificate =
        CertificateResponse::from_view(issued.certificate, state.settings().certificates());
    (status, Json(IssueCertificateResponse { certificate, created: issued.created }))
}

pub(super) async fn issue_certificate(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<IssueCertificateResponse>), ApiError> {
    let issued = certificates::issue(&state, &user, &course_id).await?;

    Ok(issued_response(&state, issued))
}

pub(super) async fn issue_certificate_for_student(
    Path((course_id, student_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<IssueCertificateResponse>), ApiError> {
    let issued = certificates::issue_by_instructor(&state, &user, &course_id, &student_id).await?;

    Ok(issued_response(&state, issued))
}

pub(super) async fn verify_certificate(
    Path(certificate_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let found = certificates::verify(&state, &certificate_id).await?;

    Ok(Json(VerifyResponse::from_lookup(found)))
}

pub(super) async fn download_certificate(
    Path(certificate_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let (view, pdf) = certificates::download(&state, &user, &certificate_id).await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"certificate-{}.pdf\"",
        view.id
    ))
    .map_err(|e| ApiError::internal(e, "Failed to build content disposition"))?;

    let mut response = pdf.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

pub(super) async fn list_my_certificates(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CertificateResponse>>, ApiError> {
    let views = certificates::list_mine(&state, &user).await?;
    let settings = state.settings().certificates();

    Ok(Json(views.into_iter().map(|view| CertificateResponse::from_view(view, settings)).collect()))
}
