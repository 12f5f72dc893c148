//! Shared HTTP constants (headers, problem URIs, form fields).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

pub(crate) const PROBLEM_INTERNAL: &str = "https://radmesh.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://radmesh.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://radmesh.dev/problems/not-found";
pub(crate) const PROBLEM_PAYLOAD_TOO_LARGE: &str =
    "https://radmesh.dev/problems/payload-too-large";
pub(crate) const PROBLEM_UNPROCESSABLE: &str = "https://radmesh.dev/problems/unprocessable";
pub(crate) const PROBLEM_REMOTE_FAILURE: &str = "https://radmesh.dev/problems/remote-failure";
pub(crate) const PROBLEM_REMOTE_TIMEOUT: &str = "https://radmesh.dev/problems/remote-timeout";

pub(crate) const FIELD_FILE: &str = "file";
pub(crate) const FIELD_FILE_ALIAS: &str = "dicomArchive";
pub(crate) const FIELD_START_COMPUTATION: &str = "startComputation";

pub(crate) const CONTENT_TYPE_OBJ: &str = "model/obj";
pub(crate) const CONTENT_TYPE_METRICS: &str = "text/plain; version=0.0.4";
