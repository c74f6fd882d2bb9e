use crate::utils::errors::{ProvisionError, Result};
use chrono::{DateTime, Utc};
use x509_parser::prelude::*;

/// What the provision summary shows about the issued leaf certificate
#[derive(Debug, Clone)]
pub struct LeafSummary {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_after: DateTime<Utc>,
}

/// Parse the issued leaf PEM for display. Summary only; the PEM written to
/// disk stays exactly as Vault returned it.
pub fn summarize_leaf(cert_pem: &str) -> Result<LeafSummary> {
    let (_, pem) = parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| ProvisionError::CertParsing(format!("Failed to parse PEM: {e}")))?;

    let (_, cert) = parse_x509_certificate(&pem.contents)
        .map_err(|e| ProvisionError::CertParsing(format!("Failed to parse X.509: {e}")))?;

    let subject = common_name(cert.subject());
    let issuer = common_name(cert.issuer());

    // Serial normalized to continuous hex, no colons
    let serial = hex::encode(cert.serial.to_bytes_be());

    let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
        .ok_or_else(|| {
            ProvisionError::CertParsing("Certificate notAfter out of range".to_string())
        })?;

    Ok(LeafSummary {
        subject,
        issuer,
        serial,
        not_after,
    })
}

fn common_name(name: &X509Name) -> String {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_rejects_non_pem() {
        let err = summarize_leaf("this is not a certificate").unwrap_err();
        assert!(matches!(err, ProvisionError::CertParsing(_)));
    }

    #[test]
    fn test_summarize_rejects_wrong_pem_payload() {
        // Valid PEM framing, but the DER inside is not a certificate
        let pem = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        assert!(summarize_leaf(pem).is_err());
    }
}
