pub(crate) mod access;
pub(crate) mod attempt_history;
pub(crate) mod attempt_lifecycle;
pub(crate) mod attempts;
pub(crate) mod certificate_pdf;
pub(crate) mod certificates;
pub(crate) mod error;
pub(crate) mod progress;
pub(crate) mod quiz_authoring;
