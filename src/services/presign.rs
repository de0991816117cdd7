//! Query-string authenticated URLs and browser form-upload policies.

use crate::config::S3Config;
use crate::error::{S3Error, SigningError};
use crate::signing::{base64_encode, encode_object_key, AwsSigner};
use crate::types::*;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::form_urlencoded::byte_serialize;

/// Service for pre-signed access. Nothing here touches the network.
pub struct PresignService {
    config: Arc<S3Config>,
    signer: Arc<dyn AwsSigner>,
}

fn lifetime(duration: std::time::Duration) -> Result<ChronoDuration, S3Error> {
    ChronoDuration::from_std(duration).map_err(|e| {
        S3Error::Request(crate::error::RequestError::Validation {
            message: format!("lifetime out of range: {}", e),
        })
    })
}

impl PresignService {
    /// Create a new presign service.
    pub fn new(config: Arc<S3Config>, signer: Arc<dyn AwsSigner>) -> Self {
        Self { config, signer }
    }

    /// Create a GET URL valid for `request.expires_in` from now.
    pub async fn authenticated_url(&self, request: &PresignGetRequest) -> Result<PresignedUrl, S3Error> {
        self.authenticated_url_at(request, Utc::now()).await
    }

    /// Create a GET URL valid for `request.expires_in` from `now`.
    pub async fn authenticated_url_at(
        &self,
        request: &PresignGetRequest,
        now: DateTime<Utc>,
    ) -> Result<PresignedUrl, S3Error> {
        let expires = now + lifetime(request.expires_in)?;
        let key = encode_object_key(&request.key);
        let string_to_sign = format!(
            "GET\n\n\n{}\n/{}/{}",
            expires.timestamp(),
            request.bucket,
            key
        );
        let signature = self.signer.sign(&string_to_sign).await?;

        let host = if request.host_bucket {
            request.bucket.clone()
        } else {
            format!("{}.{}", request.bucket, self.config.host)
        };
        let url = format!(
            "{}://{}/{}?AWSAccessKeyId={}&Expires={}&Signature={}",
            if request.https { "https" } else { "http" },
            host,
            key,
            signature.access_key_id,
            expires.timestamp(),
            byte_serialize(signature.value.as_bytes()).collect::<String>()
        );

        Ok(PresignedUrl { url, expires })
    }

    /// Create form fields for a browser upload.
    pub async fn post_upload_params(
        &self,
        request: &PostPolicyRequest,
    ) -> Result<PostUploadParams, S3Error> {
        self.post_upload_params_at(request, Utc::now()).await
    }

    /// Create form fields for a browser upload, with the policy expiring
    /// `request.lifetime` after `now`.
    pub async fn post_upload_params_at(
        &self,
        request: &PostPolicyRequest,
        now: DateTime<Utc>,
    ) -> Result<PostUploadParams, S3Error> {
        let expires = now + lifetime(request.lifetime)?;

        let mut conditions: Vec<Value> = vec![
            json!({ "bucket": request.bucket }),
            json!({ "acl": request.acl.as_str() }),
        ];
        conditions.push(match &request.success_action {
            SuccessAction::Status(status) => json!({ "success_action_status": status.to_string() }),
            SuccessAction::Redirect(url) => json!({ "success_action_redirect": url }),
        });
        conditions.push(json!(["starts-with", "$key", request.key_prefix]));
        if request.filename_condition {
            conditions.push(json!(["starts-with", "$Filename", ""]));
        }
        for (name, _) in &request.headers {
            conditions.push(json!(["starts-with", format!("${}", name), ""]));
        }
        for (name, value) in &request.amz_headers {
            let mut condition = serde_json::Map::new();
            condition.insert(name.clone(), Value::String(value.clone()));
            conditions.push(Value::Object(condition));
        }
        conditions.push(json!(["content-length-range", 0, request.max_file_size]));

        let policy = json!({
            "expiration": expires.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "conditions": conditions,
        });
        let policy = serde_json::to_string(&policy).map_err(|e| {
            S3Error::Signing(SigningError::PolicySerialization {
                message: e.to_string(),
            })
        })?;
        let policy = base64_encode(policy);
        let signature = self.signer.sign(&policy).await?;

        let mut fields = BTreeMap::new();
        fields.insert("AWSAccessKeyId".to_string(), signature.access_key_id);
        fields.insert("key".to_string(), format!("{}${{filename}}", request.key_prefix));
        fields.insert("acl".to_string(), request.acl.as_str().to_string());
        fields.insert("policy".to_string(), policy);
        fields.insert("signature".to_string(), signature.value);
        match &request.success_action {
            SuccessAction::Status(status) => {
                fields.insert("success_action_status".to_string(), status.to_string());
            }
            SuccessAction::Redirect(url) => {
                fields.insert("success_action_redirect".to_string(), url.clone());
            }
        }
        for (name, value) in request.headers.iter().chain(request.amz_headers.iter()) {
            fields.insert(name.clone(), value.clone());
        }

        Ok(PostUploadParams { fields, expires })
    }
}

impl std::fmt::Debug for PresignService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresignService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
