use crate::config::ProvisionConfig;
use crate::utils::errors::{ProvisionError, Result};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;

pub struct IssueCertificateRequest<'a> {
    pub pki_mount: &'a str,
    pub role: &'a str,
    pub common_name: &'a str,
    pub alt_names: Option<Vec<String>>,
    pub ip_sans: Option<Vec<String>>,
    pub ttl: Option<&'a str>,
}

/// Thin authenticated wrapper over the Vault HTTP API. Every call is a single
/// request; retry/backoff is deliberately absent at this layer.
pub struct VaultClient {
    client: Client,
    vault_addr: String,
    token: String,
}

impl VaultClient {
    pub fn new(config: &ProvisionConfig) -> Result<Self> {
        let client = super::create_http_client()?;

        Ok(Self {
            client,
            vault_addr: config.vault_addr.clone(),
            token: config.root_token.clone(),
        })
    }

    /// Get vault address
    pub fn vault_addr(&self) -> &str {
        &self.vault_addr
    }

    /// Health check (unauthenticated)
    pub async fn health(&self) -> Result<Value> {
        let url = format!("{}/v1/sys/health", self.vault_addr);
        let response = self.client.get(&url).send().await?;

        // Vault reports sealed/standby states with non-2xx codes but a JSON body
        Ok(response.json().await?)
    }

    /// Generic GET request to Vault API
    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}/v1/{}", self.vault_addr, path);
        let response = self
            .client
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;

        self.handle_response(path, response).await
    }

    /// Generic POST request to Vault API
    pub async fn post(&self, path: &str, data: Value) -> Result<Value> {
        let url = format!("{}/v1/{}", self.vault_addr, path);
        let response = self
            .client
            .post(&url)
            .header("X-Vault-Token", &self.token)
            .header("Content-Type", "application/json")
            .json(&data)
            .send()
            .await?;

        self.handle_response(path, response).await
    }

    /// Generic DELETE request to Vault API
    pub async fn delete(&self, path: &str) -> Result<Value> {
        let url = format!("{}/v1/{}", self.vault_addr, path);
        let response = self
            .client
            .delete(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;

        self.handle_response(path, response).await
    }

    /// Enable a secrets engine at the given mount path
    pub async fn enable_secrets_engine(&self, mount: &str, engine_type: &str) -> Result<Value> {
        let path = format!("sys/mounts/{mount}");
        self.post(&path, json!({ "type": engine_type })).await
    }

    /// Disable the secrets engine at the given mount path
    pub async fn disable_secrets_engine(&self, mount: &str) -> Result<Value> {
        let path = format!("sys/mounts/{mount}");
        self.delete(&path).await
    }

    /// Enable an auth method at the given path
    pub async fn enable_auth_method(&self, path: &str, method_type: &str) -> Result<Value> {
        let api_path = format!("sys/auth/{path}");
        self.post(&api_path, json!({ "type": method_type })).await
    }

    /// Disable the auth method at the given path
    pub async fn disable_auth_method(&self, path: &str) -> Result<Value> {
        let api_path = format!("sys/auth/{path}");
        self.delete(&api_path).await
    }

    /// Generate a self-signed (internal) root CA on a PKI mount
    pub async fn generate_root(
        &self,
        pki_mount: &str,
        common_name: &str,
        ttl: &str,
    ) -> Result<Value> {
        let path = format!("{pki_mount}/root/generate/internal");
        let payload = json!({
            "common_name": common_name,
            "ttl": ttl,
        });
        self.post(&path, payload).await
    }

    /// Delete the root issuer of a PKI mount
    pub async fn delete_root(&self, pki_mount: &str) -> Result<Value> {
        let path = format!("{pki_mount}/root");
        self.delete(&path).await
    }

    /// Set the issuing certificate and CRL distribution URLs for a PKI mount
    pub async fn set_urls(
        &self,
        pki_mount: &str,
        issuing_certificates: &str,
        crl_distribution_points: &str,
    ) -> Result<Value> {
        let path = format!("{pki_mount}/config/urls");
        let payload = json!({
            "issuing_certificates": issuing_certificates,
            "crl_distribution_points": crl_distribution_points,
        });
        self.post(&path, payload).await
    }

    /// Create or update an issuing role on a PKI mount
    pub async fn create_role(&self, pki_mount: &str, role: &str, params: Value) -> Result<Value> {
        let path = format!("{pki_mount}/roles/{role}");
        self.post(&path, params).await
    }

    /// Delete an issuing role from a PKI mount
    pub async fn delete_role(&self, pki_mount: &str, role: &str) -> Result<Value> {
        let path = format!("{pki_mount}/roles/{role}");
        self.delete(&path).await
    }

    /// Issue a new certificate
    pub async fn issue_certificate(&self, request: IssueCertificateRequest<'_>) -> Result<Value> {
        let mut payload = json!({
            "common_name": request.common_name,
        });

        if let Some(sans) = request.alt_names {
            payload["alt_names"] = json!(sans.join(","));
        }

        if let Some(ips) = request.ip_sans {
            payload["ip_sans"] = json!(ips.join(","));
        }

        if let Some(ttl_val) = request.ttl {
            payload["ttl"] = json!(ttl_val);
        }

        let path = format!("{}/issue/{}", request.pki_mount, request.role);
        self.post(&path, payload).await
    }

    /// Revoke certificate by serial number
    pub async fn revoke_certificate(&self, pki_mount: &str, serial: &str) -> Result<Value> {
        let payload = json!({
            "serial_number": serial
        });

        let path = format!("{pki_mount}/revoke");
        self.post(&path, payload).await
    }

    /// Register a certificate under the TLS cert auth method
    pub async fn write_cert_auth_role(
        &self,
        auth_path: &str,
        name: &str,
        display_name: &str,
        certificate_pem: &str,
    ) -> Result<Value> {
        let path = format!("auth/{auth_path}/certs/{name}");
        let payload = json!({
            "display_name": display_name,
            "certificate": certificate_pem,
        });
        self.post(&path, payload).await
    }

    /// Remove a certificate role from the TLS cert auth method
    pub async fn delete_cert_auth_role(&self, auth_path: &str, name: &str) -> Result<Value> {
        let path = format!("auth/{auth_path}/certs/{name}");
        self.delete(&path).await
    }

    /// List all secret engines (mounts)
    pub async fn list_mounts(&self) -> Result<HashMap<String, Value>> {
        let response = self.get("sys/mounts").await?;
        Ok(object_entries(&response))
    }

    /// List all enabled auth methods
    pub async fn list_auth_methods(&self) -> Result<HashMap<String, Value>> {
        let response = self.get("sys/auth").await?;
        Ok(object_entries(&response))
    }

    /// Handle HTTP response from Vault
    async fn handle_response(&self, path: &str, response: Response) -> Result<Value> {
        let status = response.status();

        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            // Some writes answer 200 with a body, others 204 with none
            let text = response.text().await?;
            if text.trim().is_empty() {
                Ok(Value::Null)
            } else {
                Ok(serde_json::from_str(&text)?)
            }
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ProvisionError::Service {
                path: path.to_string(),
                status: status.as_u16(),
                message: super::extract_error_messages(&body),
            })
        }
    }
}

/// Flatten the mount-style responses ("pki/" => {..}) Vault returns from
/// sys/mounts and sys/auth. Newer Vault nests the same map under "data".
fn object_entries(response: &Value) -> HashMap<String, Value> {
    let source = response.get("data").unwrap_or(response);
    let mut entries = HashMap::new();
    if let Some(object) = source.as_object() {
        for (key, value) in object {
            // Skip request metadata fields that share the top level
            if value.is_object() {
                entries.insert(key.clone(), value.clone());
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_entries_nested_under_data() {
        let response = serde_json::json!({
            "request_id": "abc",
            "data": {
                "pki/": { "type": "pki" },
                "secret/": { "type": "kv" }
            }
        });
        let entries = object_entries(&response);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["pki/"]["type"], "pki");
    }

    #[test]
    fn test_object_entries_top_level() {
        let response = serde_json::json!({
            "cert/": { "type": "cert" },
            "token/": { "type": "token" }
        });
        let entries = object_entries(&response);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["cert/"]["type"], "cert");
    }
}
