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

//! Security audit logging.
//!
//! Structured `tracing` events for every operation that changes or judges the
//! trust state of a package:
//! - Signing and signature removal (success/failure)
//! - Verification outcomes
//! - Client policy changes
//!
//! Field names are stable so log pipelines can key on them.

use crate::error::DiagnosticCode;
use crate::policy::ClientPolicy;

/// Event types for audit records.
pub mod events {
    /// Package signed event type.
    pub const PACKAGE_SIGNED: &str = "package.signed";
    /// Package sign failure event type.
    pub const PACKAGE_SIGN_FAILURE: &str = "package.sign.failure";
    /// Signature removed event type.
    pub const PACKAGE_SIGNATURE_REMOVED: &str = "package.signature.removed";

    /// Verification success event type.
    pub const VERIFICATION_SUCCESS: &str = "verification.success";
    /// Verification failure event type.
    pub const VERIFICATION_FAILURE: &str = "verification.failure";

    /// Client policy saved event type.
    pub const POLICY_SAVED: &str = "policy.saved";
    /// Client policy deleted event type.
    pub const POLICY_DELETED: &str = "policy.deleted";
}

/// Log a package signing event.
pub fn log_package_signed(
    package_path: &str,
    content_hash: &str,
    signer_fingerprint: &str,
    signature_kind: &str,
    timestamped: bool,
) {
    tracing::info!(
        event_type = events::PACKAGE_SIGNED,
        package_path = %package_path,
        content_hash = %content_hash,
        signer_fingerprint = %signer_fingerprint,
        signature_kind = %signature_kind,
        timestamped = timestamped,
        "Package signed"
    );
}

/// Log a package signing failure.
pub fn log_package_sign_failed(package_path: &str, code: DiagnosticCode, error: &str) {
    tracing::error!(
        event_type = events::PACKAGE_SIGN_FAILURE,
        package_path = %package_path,
        code = %code,
        error = %error,
        "Package signing failed"
    );
}

/// Log removal of the outermost signature.
pub fn log_signature_removed(package_path: &str, removed: &str) {
    tracing::warn!(
        event_type = events::PACKAGE_SIGNATURE_REMOVED,
        package_path = %package_path,
        removed = %removed,
        "Package signature removed"
    );
}

/// Log a verification success event.
pub fn log_verification_success(
    package_path: &str,
    content_hash: Option<&str>,
    signer_fingerprint: Option<&str>,
    policy: ClientPolicy,
    warnings: usize,
) {
    tracing::info!(
        event_type = events::VERIFICATION_SUCCESS,
        package_path = %package_path,
        content_hash = content_hash.unwrap_or("<unsigned>"),
        signer_fingerprint = signer_fingerprint.unwrap_or("<none>"),
        policy = %policy,
        warnings = warnings,
        "Package accepted"
    );
}

/// Log a verification failure event.
pub fn log_verification_failure(
    package_path: &str,
    code: DiagnosticCode,
    failure_reason: &str,
    signer_fingerprint: Option<&str>,
) {
    tracing::warn!(
        event_type = events::VERIFICATION_FAILURE,
        package_path = %package_path,
        code = %code,
        failure_reason = %failure_reason,
        signer_fingerprint = signer_fingerprint.unwrap_or("<unknown>"),
        "Package rejected"
    );
}

/// Log a client policy change.
pub fn log_policy_saved(scope: &str, policy: ClientPolicy) {
    tracing::warn!(
        event_type = events::POLICY_SAVED,
        scope = %scope,
        policy = %policy,
        "Client policy saved"
    );
}

/// Log removal of a client policy value.
pub fn log_policy_deleted(scope: &str) {
    tracing::warn!(
        event_type = events::POLICY_DELETED,
        scope = %scope,
        "Client policy deleted"
    );
}
