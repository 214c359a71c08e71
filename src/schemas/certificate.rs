use serde::Serialize;

use crate::core::config::CertificateSettings;
use crate::core::time::format_primitive;
use crate::repositories::certificates::CertificateView;

#[derive(Debug, Serialize)]
pub(crate) struct CertificateResponse {
    pub(crate) certificate_id: String,
    pub(crate) course_id: String,
    pub(crate) course_title: String,
    pub(crate) learner_id: String,
    pub(crate) learner_name: String,
    pub(crate) issued_at: String,
    pub(crate) fingerprint: String,
    pub(crate) verify_url: String,
}

impl CertificateResponse {
    pub(crate) fn from_view(view: CertificateView, settings: &CertificateSettings) -> Self {
        Self {
            verify_url: format!("{}/{}", settings.verify_base_url.trim_end_matches('/'), view.id),
            certificate_id: view.id,
            course_id: view.course_id,
            course_title: view.course_title,
            learner_id: view.learner_id,
            learner_name: view.learner_name,
            issued_at: format_primitive(view.issued_at),
            fingerprint: view.fingerprint,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct IssueCertificateResponse {
    pub(crate) certificate: CertificateResponse,
    pub(crate) created: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifiedUser {
    pub(crate) id: String,
    pub(crate) full_name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifiedCourse {
    pub(crate) id: String,
    pub(crate) title: String,
}

/// Public verification result. Unknown and malformed ids both produce the
/// bare `{"verified": false}`.
#[derive(Debug, Serialize)]
pub(crate) struct VerifyResponse {
    pub(crate) verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) certificate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) user: Option<VerifiedUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) course: Option<VerifiedCourse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) issued_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) fingerprint: Option<String>,
}

impl VerifyResponse {
    pub(crate) fn from_lookup(view: Option<CertificateView>) -> Self {
        let Some(view) = view else {
            return Self {
                verified: false,
                certificate_id: None,
                user: None,
                course: None,
                issued_at: None,
                fingerprint: None,
            };
        };

        Self {
            verified: true,
            certificate_id: Some(view.id),
            user: Some(VerifiedUser { id: view.learner_id, full_name: view.learner_name }),
            course: Some(VerifiedCourse { id: view.course_id, title: view.course_title }),
            issued_at: Some(format_primitive(view.issued_at)),
            fingerprint: Some(view.fingerprint),
        }
    }
}
