/*
 *  Copyright 2025-2026 Cachet Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Trusted timestamps over signature values.
//!
//! A timestamp authority signs a [`TimestampInfo`] binding a digest of the
//! signature value to the authority's clock. Tokens are verified before they
//! are embedded and again when a package is verified.

use crate::certificates::SigningCertificate;
use crate::crypto::{verify_signature, HashAlgorithmName, SignatureAlgorithm};
use crate::packaging::encode_base64;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const NONCE_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("Timestamp authority request failed: {0}")]
    Request(String),

    #[error("Timestamp authority returned an invalid token: {0}")]
    InvalidToken(String),

    #[error("Timestamp token does not cover the signature value")]
    ImprintMismatch,

    #[error("Timestamp token nonce does not match the request")]
    NonceMismatch,

    #[error("Timestamp token signature is invalid")]
    InvalidSignature,

    #[error("Timestamp authority is not trusted: {0}")]
    UntrustedAuthority(String),

    #[error("Timestamp generation time {0} is outside the signing certificate's validity period")]
    OutsideCertificateValidity(DateTime<Utc>),

    #[error("Timestamp authority cannot sign: {0}")]
    Authority(String),
}

/// What is sent to a timestamp authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampRequest {
    pub hash_algorithm: HashAlgorithmName,
    /// Hex digest of the data being timestamped.
    pub message_imprint: String,
    /// Hex random nonce echoed back in the token.
    pub nonce: String,
}

impl TimestampRequest {
    /// Builds a request for `data` with a fresh nonce.
    pub fn new(data: &[u8], hash_algorithm: HashAlgorithmName) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self {
            hash_algorithm,
            message_imprint: hash_algorithm.hex_digest(data),
            nonce: hex::encode(nonce),
        }
    }
}

/// The signed content of a timestamp token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampInfo {
    pub gen_time: DateTime<Utc>,
    pub hash_algorithm: HashAlgorithmName,
    pub message_imprint: String,
    pub nonce: String,
    pub serial_number: String,
}

/// A timestamp token as embedded in a signature document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampToken {
    /// Base64 of the exact JSON bytes of the [`TimestampInfo`].
    pub info: String,
    /// Base64 DER authority certificate.
    pub certificate: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
    pub signature_algorithm: SignatureAlgorithm,
    /// Base64 authority signature over the info bytes.
    pub signature: String,
}

impl TimestampToken {
    /// Decodes the token info without checking the signature.
    pub fn info(&self) -> Result<TimestampInfo, TimestampError> {
        let bytes = decode(&self.info)?;
        serde_json::from_slice(&bytes).map_err(|e| TimestampError::InvalidToken(e.to_string()))
    }

    /// The authority certificate and its intermediates.
    pub fn authority_certificate(&self) -> Result<SigningCertificate, TimestampError> {
        let der = decode(&self.certificate)?;
        let chain = self
            .chain
            .iter()
            .map(|c| decode(c))
            .collect::<Result<Vec<_>, _>>()?;
        SigningCertificate::from_der(&der, None)
            .map(|cert| cert.with_additional_certificates(chain))
            .map_err(|e| TimestampError::InvalidToken(e.to_string()))
    }

    /// Checks the authority signature and that the token covers `data`.
    ///
    /// When `request` is given its nonce and imprint must be echoed exactly.
    /// Chain trust is the caller's concern.
    pub fn verify_for(
        &self,
        data: &[u8],
        request: Option<&TimestampRequest>,
    ) -> Result<TimestampInfo, TimestampError> {
        let authority = self.authority_certificate()?;
        if authority.info().key_algorithm != Some(self.signature_algorithm) {
            return Err(TimestampError::InvalidSignature);
        }

        let info_bytes = decode(&self.info)?;
        let signature = decode(&self.signature)?;
        verify_signature(
            self.signature_algorithm,
            authority.info().public_key_der(),
            &info_bytes,
            &signature,
        )
        .map_err(|_| TimestampError::InvalidSignature)?;

        let info = self.info()?;
        if info.message_imprint != info.hash_algorithm.hex_digest(data) {
            return Err(TimestampError::ImprintMismatch);
        }
        if let Some(request) = request {
            if info.hash_algorithm != request.hash_algorithm
                || info.message_imprint != request.message_imprint
            {
                return Err(TimestampError::ImprintMismatch);
            }
            if info.nonce != request.nonce {
                return Err(TimestampError::NonceMismatch);
            }
        }
        Ok(info)
    }
}

/// A timestamp authority.
#[async_trait]
pub trait Timestamper: Send + Sync {
    async fn timestamp(&self, request: &TimestampRequest) -> Result<TimestampToken, TimestampError>;
}

/// An in-process timestamp authority backed by a certificate and key.
#[derive(Debug, Clone)]
pub struct LocalTimestampAuthority {
    certificate: SigningCertificate,
    fixed_time: Option<DateTime<Utc>>,
}

impl LocalTimestampAuthority {
    pub fn new(certificate: SigningCertificate) -> Result<Self, TimestampError> {
        if !certificate.has_private_key() {
            return Err(TimestampError::Authority(
                "certificate has no private key".to_string(),
            ));
        }
        Ok(Self {
            certificate,
            fixed_time: None,
        })
    }

    /// Stamps every token with `time` instead of the current time.
    pub fn with_fixed_time(mut self, time: DateTime<Utc>) -> Self {
        self.fixed_time = Some(time);
        self
    }

    pub fn certificate(&self) -> &SigningCertificate {
        &self.certificate
    }
}

#[async_trait]
impl Timestamper for LocalTimestampAuthority {
    async fn timestamp(
        &self,
        request: &TimestampRequest,
    ) -> Result<TimestampToken, TimestampError> {
        let mut serial = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut serial);

        let info = TimestampInfo {
            gen_time: self.fixed_time.unwrap_or_else(Utc::now),
            hash_algorithm: request.hash_algorithm,
            message_imprint: request.message_imprint.clone(),
            nonce: request.nonce.clone(),
            serial_number: hex::encode(serial),
        };
        let info_bytes =
            serde_json::to_vec(&info).map_err(|e| TimestampError::Authority(e.to_string()))?;

        let key = self
            .certificate
            .acquire_private_key()
            .map_err(|e| TimestampError::Authority(e.to_string()))?;
        let signature = key.sign(&info_bytes);

        tracing::debug!(serial = %info.serial_number, "Issued timestamp token");

        Ok(TimestampToken {
            info: encode_base64(&info_bytes),
            certificate: encode_base64(self.certificate.certificate_der()),
            chain: self
                .certificate
                .additional_certificates()
                .iter()
                .map(|c| encode_base64(c))
                .collect(),
            signature_algorithm: key.algorithm(),
            signature: encode_base64(&signature),
        })
    }
}

/// A remote timestamp authority reached over HTTP.
///
/// The request is POSTed as JSON and the response body is the JSON token.
#[cfg(feature = "http-timestamper")]
#[derive(Debug, Clone)]
pub struct HttpTimestamper {
    url: url::Url,
    client: reqwest::Client,
}

#[cfg(feature = "http-timestamper")]
impl HttpTimestamper {
    pub fn new(url: url::Url) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(
        url: url::Url,
        timeout: std::time::Duration,
    ) -> Result<Self, TimestampError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TimestampError::Request(e.to_string()))?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

#[cfg(feature = "http-timestamper")]
#[async_trait]
impl Timestamper for HttpTimestamper {
    async fn timestamp(
        &self,
        request: &TimestampRequest,
    ) -> Result<TimestampToken, TimestampError> {
        tracing::debug!(url = %self.url, "Requesting timestamp");
        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| TimestampError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| TimestampError::Request(e.to_string()))?;

        response
            .json::<TimestampToken>()
            .await
            .map_err(|e| TimestampError::InvalidToken(e.to_string()))
    }
}

fn decode(value: &str) -> Result<Vec<u8>, TimestampError> {
    STANDARD
        .decode(value)
        .map_err(|e| TimestampError::InvalidToken(e.to_string()))
}
