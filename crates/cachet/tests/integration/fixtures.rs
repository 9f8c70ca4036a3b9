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

//! Certificate, CRL and package fixtures generated with rcgen.

use cachet::certificates::{ChainValidator, SigningCertificate, TrustStore};
use cachet::packaging::PackageArchive;
use cachet::security::LocalTimestampAuthority;
use rcgen::{
    date_time_ymd, BasicConstraints, Certificate, CertificateParams,
    CertificateRevocationListParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyIdMethod,
    KeyPair, KeyUsagePurpose, RevokedCertParams, SerialNumber, SignatureAlgorithm,
    PKCS_ED25519,
};
use std::path::{Path, PathBuf};

/// A generated certificate and its key.
pub struct Issued {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issued {
    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }

    /// The certificate with its private key, chained through `intermediates`.
    pub fn signing_certificate(&self, intermediates: &[&Issued]) -> SigningCertificate {
        SigningCertificate::from_der(&self.der(), Some(&self.key.serialize_der()))
            .unwrap()
            .with_additional_certificates(intermediates.iter().map(|i| i.der()).collect())
    }
}

/// Validity window of a generated certificate, in calendar years.
#[derive(Clone, Copy)]
pub struct Validity {
    pub from: i32,
    pub to: i32,
}

pub const CURRENT: Validity = Validity { from: 2000, to: 2090 };
pub const EXPIRED: Validity = Validity { from: 2000, to: 2001 };
pub const NOT_YET_VALID: Validity = Validity { from: 2090, to: 2100 };

fn params(common_name: &str, validity: Validity, serial: u8) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    params.not_before = date_time_ymd(validity.from, 1, 1);
    params.not_after = date_time_ymd(validity.to, 1, 1);
    params.serial_number = Some(SerialNumber::from_slice(&[0x10, serial]));
    params
}

fn ca_params(common_name: &str, serial: u8) -> CertificateParams {
    let mut params = params(common_name, CURRENT, serial);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params
}

/// A self-signed root CA.
pub fn root_ca(common_name: &str) -> Issued {
    let key = KeyPair::generate_for(&PKCS_ED25519).unwrap();
    let cert = ca_params(common_name, 1).self_signed(&key).unwrap();
    Issued { cert, key }
}

/// An intermediate CA issued by `issuer`.
pub fn intermediate_ca(common_name: &str, issuer: &Issued) -> Issued {
    let key = KeyPair::generate_for(&PKCS_ED25519).unwrap();
    let cert = ca_params(common_name, 2)
        .signed_by(&key, &issuer.cert, &issuer.key)
        .unwrap();
    Issued { cert, key }
}

/// Options for an end-entity certificate.
pub struct LeafOptions {
    pub common_name: &'static str,
    pub validity: Validity,
    pub serial: u8,
    pub usage: ExtendedKeyUsagePurpose,
    pub algorithm: &'static SignatureAlgorithm,
}

impl LeafOptions {
    pub fn code_signing(common_name: &'static str) -> Self {
        Self {
            common_name,
            validity: CURRENT,
            serial: 0x20,
            usage: ExtendedKeyUsagePurpose::CodeSigning,
            algorithm: &PKCS_ED25519,
        }
    }

    pub fn time_stamping(common_name: &'static str) -> Self {
        Self {
            usage: ExtendedKeyUsagePurpose::TimeStamping,
            serial: 0x30,
            ..Self::code_signing(common_name)
        }
    }

    pub fn validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    pub fn serial(mut self, serial: u8) -> Self {
        self.serial = serial;
        self
    }

    pub fn algorithm(mut self, algorithm: &'static SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// An end-entity certificate issued by `issuer`.
pub fn leaf(options: LeafOptions, issuer: &Issued) -> Issued {
    let key = KeyPair::generate_for(options.algorithm).unwrap();
    let mut params = params(options.common_name, options.validity, options.serial);
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages = vec![options.usage];
    let cert = params.signed_by(&key, &issuer.cert, &issuer.key).unwrap();
    Issued { cert, key }
}

/// A CRL published by `issuer`, revoking the given serials.
pub fn crl(issuer: &Issued, revoked_serials: &[u8], next_update_year: i32) -> Vec<u8> {
    let params = CertificateRevocationListParams {
        this_update: date_time_ymd(2020, 1, 1),
        next_update: date_time_ymd(next_update_year, 1, 1),
        crl_number: SerialNumber::from_slice(&[1]),
        issuing_distribution_point: None,
        revoked_certs: revoked_serials
            .iter()
            .map(|serial| RevokedCertParams {
                serial_number: SerialNumber::from_slice(&[0x10, *serial]),
                revocation_time: date_time_ymd(2020, 6, 1),
                reason_code: None,
                invalidity_date: None,
            })
            .collect(),
        key_identifier_method: KeyIdMethod::Sha256,
    };
    params
        .signed_by(&issuer.cert, &issuer.key)
        .unwrap()
        .der()
        .to_vec()
}

/// A complete PKI: root, intermediate, code signing leaf and timestamp
/// authority.
pub struct Pki {
    pub root: Issued,
    pub intermediate: Issued,
    pub signer: Issued,
    pub tsa: Issued,
}

impl Pki {
    pub fn new(name: &'static str) -> Self {
        let root = root_ca(&format!("{name} Root CA"));
        let intermediate = intermediate_ca(&format!("{name} Issuing CA"), &root);
        let signer = leaf(LeafOptions::code_signing(name), &intermediate);
        let tsa = leaf(LeafOptions::time_stamping("Timestamp Authority"), &root);
        Self {
            root,
            intermediate,
            signer,
            tsa,
        }
    }

    pub fn trust_store(&self) -> TrustStore {
        TrustStore::new().with_root_der(&self.root.der()).unwrap()
    }

    pub fn validator(&self) -> ChainValidator {
        ChainValidator::new(self.trust_store())
    }

    /// The signing leaf with the intermediate attached.
    pub fn signing_certificate(&self) -> SigningCertificate {
        self.signer.signing_certificate(&[&self.intermediate])
    }

    pub fn timestamp_authority(&self) -> LocalTimestampAuthority {
        LocalTimestampAuthority::new(self.tsa.signing_certificate(&[])).unwrap()
    }
}

/// Trusts the roots of every given PKI.
pub fn trust_all(pkis: &[&Pki]) -> TrustStore {
    let mut store = TrustStore::new();
    for pki in pkis {
        store.add_der(&pki.root.der()).unwrap();
    }
    store
}

/// Writes an unsigned package with a couple of entries and returns its path.
pub fn write_package(dir: &Path, name: &str) -> PathBuf {
    let mut package = PackageArchive::new();
    package
        .add_entry("widget.nuspec", b"<package><id>Widget</id></package>".to_vec())
        .unwrap();
    package
        .add_entry("lib/net8.0/Widget.dll", vec![0x4d, 0x5a, 0x90, 0x00])
        .unwrap();
    let path = dir.join(name);
    package.write(&path).unwrap();
    path
}
