//! SigV4 signing for collection data-plane requests

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{
    PayloadChecksumKind, SignableBody, SignableRequest, SigningParams, SigningSettings, sign,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use std::time::SystemTime;

use kbprov_utils::ServiceError;

/// Signing name of the serverless data plane
pub(crate) const SERVICE_NAME: &str = "aoss";

/// Produces SigV4 headers for one request at a time
#[derive(Clone)]
pub(crate) struct RequestSigner {
    credentials: SharedCredentialsProvider,
    region: String,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    pub(crate) fn new(credentials: SharedCredentialsProvider, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
        }
    }

    /// Headers to add to the request: `authorization`, `x-amz-date`,
    /// `x-amz-content-sha256` and, for temporary credentials, `x-amz-security-token`
    pub(crate) async fn sign(
        &self,
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Vec<(String, String)>, ServiceError> {
        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| ServiceError::AccessDenied(format!("Credentials unavailable: {e}")))?;
        let identity: Identity = credentials.into();

        let mut settings = SigningSettings::default();
        settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;

        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SERVICE_NAME)
            .time(SystemTime::now())
            .settings(settings)
            .build()
            .map_err(|e| ServiceError::Other(format!("Invalid signing parameters: {e}")))?
            .into();

        let signable = SignableRequest::new(
            method,
            url,
            headers.iter().copied(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| ServiceError::Validation(format!("Request cannot be signed: {e}")))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| ServiceError::Other(format!("Signing failed: {e}")))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}
