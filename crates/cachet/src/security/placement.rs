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

//! Legal signature transitions.
//!
//! A package carries at most one primary signature. An author primary may
//! gain a single repository countersignature; a repository primary may not.
//! Both planners are pure and total over their inputs.

use crate::error::SignatureError;
use serde::Serialize;
use std::fmt;

/// Signature state of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PackageSignatureState {
    Unsigned,
    AuthorSigned,
    RepositoryPrimarySigned,
    /// Author primary plus one repository countersignature.
    RepositoryCountersigned,
}

impl PackageSignatureState {
    pub const ALL: [PackageSignatureState; 4] = [
        Self::Unsigned,
        Self::AuthorSigned,
        Self::RepositoryPrimarySigned,
        Self::RepositoryCountersigned,
    ];

    pub fn is_signed(&self) -> bool {
        !matches!(self, Self::Unsigned)
    }
}

impl fmt::Display for PackageSignatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unsigned => "unsigned",
            Self::AuthorSigned => "author signed",
            Self::RepositoryPrimarySigned => "repository signed",
            Self::RepositoryCountersigned => "author signed, repository countersigned",
        };
        f.write_str(s)
    }
}

/// The kind of signature a request adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureRequestKind {
    AuthorPrimary,
    RepositoryPrimary,
    RepositoryCountersignature,
}

impl SignatureRequestKind {
    pub const ALL: [SignatureRequestKind; 3] = [
        Self::AuthorPrimary,
        Self::RepositoryPrimary,
        Self::RepositoryCountersignature,
    ];
}

impl fmt::Display for SignatureRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AuthorPrimary => "author",
            Self::RepositoryPrimary => "repository",
            Self::RepositoryCountersignature => "repository countersignature",
        };
        f.write_str(s)
    }
}

/// Checks that `kind` may be applied to a package in `state` and returns the
/// resulting state.
pub fn plan_signature(
    state: PackageSignatureState,
    kind: SignatureRequestKind,
) -> Result<PackageSignatureState, SignatureError> {
    use PackageSignatureState as S;
    use SignatureRequestKind as K;

    match (state, kind) {
        (S::Unsigned, K::AuthorPrimary) => Ok(S::AuthorSigned),
        (S::Unsigned, K::RepositoryPrimary) => Ok(S::RepositoryPrimarySigned),
        (S::Unsigned, K::RepositoryCountersignature) => Err(SignatureError::PackageNotSigned),

        (S::AuthorSigned, K::RepositoryCountersignature) => Ok(S::RepositoryCountersigned),
        (S::RepositoryPrimarySigned, K::RepositoryCountersignature) => {
            Err(SignatureError::RepositoryPrimaryMustNotCountersign)
        }
        (S::RepositoryCountersigned, K::RepositoryCountersignature) => {
            Err(SignatureError::CountersignatureAlreadyExists)
        }

        (_, K::AuthorPrimary | K::RepositoryPrimary) => Err(SignatureError::PackageAlreadySigned),
    }
}

/// Which signature a removal strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalAction {
    RemoveCountersignature,
    RemovePrimary,
}

/// Outcome of [`plan_removal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalPlan {
    pub action: RemovalAction,
    pub resulting_state: PackageSignatureState,
}

/// Plans removal of the outermost signature.
pub fn plan_removal(state: PackageSignatureState) -> Result<RemovalPlan, SignatureError> {
    match state {
        PackageSignatureState::Unsigned => Err(SignatureError::PackageNotSigned),
        PackageSignatureState::AuthorSigned | PackageSignatureState::RepositoryPrimarySigned => {
            Ok(RemovalPlan {
                action: RemovalAction::RemovePrimary,
                resulting_state: PackageSignatureState::Unsigned,
            })
        }
        PackageSignatureState::RepositoryCountersigned => Ok(RemovalPlan {
            action: RemovalAction::RemoveCountersignature,
            resulting_state: PackageSignatureState::AuthorSigned,
        }),
    }
}
