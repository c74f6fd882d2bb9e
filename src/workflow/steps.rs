use crate::utils::errors::Result;
use crate::vault::client::{IssueCertificateRequest, VaultClient};
use crate::workflow::context::{Artifact, CertificateBundle, Context};
use crate::workflow::step::Step;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Context key for the issued leaf certificate, the workflow's final artifact
pub const LEAF_CERTIFICATE: &str = "leaf-certificate";
/// Context key for the generated root CA response
pub const ROOT_CA: &str = "root-ca";

/// Tunables for one provisioning run. Defaults mirror a local dev setup:
/// a `pki` mount issuing under my-website.com and a `cert` auth method.
#[derive(Debug, Clone)]
pub struct ProvisionSpec {
    pub pki_mount: String,
    pub role: String,
    pub root_common_name: String,
    pub root_ttl: String,
    pub allowed_domains: String,
    pub allow_subdomains: bool,
    pub max_ttl: String,
    pub leaf_common_name: String,
    pub leaf_ttl: Option<String>,
    pub auth_path: String,
    pub auth_role: String,
    pub export_dir: PathBuf,
}

impl Default for ProvisionSpec {
    fn default() -> Self {
        Self {
            pki_mount: "pki".to_string(),
            role: "example-dot-com".to_string(),
            root_common_name: "my-website.com".to_string(),
            root_ttl: "8760h".to_string(),
            allowed_domains: "my-website.com".to_string(),
            allow_subdomains: true,
            max_ttl: "72h".to_string(),
            leaf_common_name: "www.my-website.com".to_string(),
            leaf_ttl: None,
            auth_path: "cert".to_string(),
            auth_role: "example".to_string(),
            export_dir: PathBuf::from("."),
        }
    }
}

impl ProvisionSpec {
    /// Plan the ordered step list for this spec. Order matters: the leaf
    /// certificate issued in the middle is consumed by the cert-auth
    /// registration at the end.
    pub fn plan(&self, client: Arc<VaultClient>) -> Vec<Box<dyn Step>> {
        let base = format!("{}/v1/{}", client.vault_addr(), self.pki_mount);

        vec![
            Box::new(EnableSecretsEngine {
                client: client.clone(),
                mount: self.pki_mount.clone(),
                engine_type: "pki".to_string(),
            }),
            Box::new(GenerateRootCa {
                client: client.clone(),
                mount: self.pki_mount.clone(),
                common_name: self.root_common_name.clone(),
                ttl: self.root_ttl.clone(),
            }),
            Box::new(ConfigureUrls {
                client: client.clone(),
                mount: self.pki_mount.clone(),
                issuing_certificates: format!("{base}/ca"),
                crl_distribution_points: format!("{base}/crl"),
            }),
            Box::new(CreatePkiRole {
                client: client.clone(),
                mount: self.pki_mount.clone(),
                role: self.role.clone(),
                params: json!({
                    "allowed_domains": self.allowed_domains,
                    "allow_subdomains": self.allow_subdomains,
                    "max_ttl": self.max_ttl,
                }),
            }),
            Box::new(IssueLeafCertificate {
                client: client.clone(),
                mount: self.pki_mount.clone(),
                role: self.role.clone(),
                common_name: self.leaf_common_name.clone(),
                ttl: self.leaf_ttl.clone(),
                export_dir: self.export_dir.clone(),
            }),
            Box::new(EnableAuthMethod {
                client: client.clone(),
                path: self.auth_path.clone(),
                method_type: "cert".to_string(),
            }),
            Box::new(RegisterCertAuthRole {
                client,
                auth_path: self.auth_path.clone(),
                name: self.auth_role.clone(),
                display_name: self.auth_role.clone(),
            }),
        ]
    }

    pub fn cert_path(&self) -> PathBuf {
        self.export_dir.join("cert.pem")
    }

    pub fn key_path(&self) -> PathBuf {
        self.export_dir.join("key.pem")
    }
}

/// Treat "already gone" responses as success; undo must be a no-op when the
/// forward effect never completed or was cleaned up earlier.
fn allow_missing(result: Result<Value>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(error) if error.is_missing_target() => Ok(()),
        Err(error) => Err(error),
    }
}

/// Mount a secrets engine (`sys/mounts/{mount}`)
struct EnableSecretsEngine {
    client: Arc<VaultClient>,
    mount: String,
    engine_type: String,
}

#[async_trait]
impl Step for EnableSecretsEngine {
    fn name(&self) -> &str {
        "enable-pki-mount"
    }

    async fn apply(&self, _ctx: &mut Context) -> Result<()> {
        self.client
            .enable_secrets_engine(&self.mount, &self.engine_type)
            .await?;
        Ok(())
    }

    async fn undo(&self, _ctx: &mut Context) -> Result<()> {
        allow_missing(self.client.disable_secrets_engine(&self.mount).await)
    }
}

/// Generate the self-signed root CA on the PKI mount
struct GenerateRootCa {
    client: Arc<VaultClient>,
    mount: String,
    common_name: String,
    ttl: String,
}

#[async_trait]
impl Step for GenerateRootCa {
    fn name(&self) -> &str {
        "generate-root-ca"
    }

    async fn apply(&self, ctx: &mut Context) -> Result<()> {
        let response = self
            .client
            .generate_root(&self.mount, &self.common_name, &self.ttl)
            .await?;
        ctx.insert(ROOT_CA, Artifact::Json(response));
        Ok(())
    }

    async fn undo(&self, ctx: &mut Context) -> Result<()> {
        allow_missing(self.client.delete_root(&self.mount).await)?;
        ctx.take(ROOT_CA);
        Ok(())
    }
}

/// Point issued certificates at the mount's CA and CRL endpoints
struct ConfigureUrls {
    client: Arc<VaultClient>,
    mount: String,
    issuing_certificates: String,
    crl_distribution_points: String,
}

#[async_trait]
impl Step for ConfigureUrls {
    fn name(&self) -> &str {
        "configure-urls"
    }

    async fn apply(&self, _ctx: &mut Context) -> Result<()> {
        self.client
            .set_urls(
                &self.mount,
                &self.issuing_certificates,
                &self.crl_distribution_points,
            )
            .await?;
        Ok(())
    }

    // URL config carries no state of its own; it disappears with the mount
    async fn undo(&self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }
}

/// Create the issuing role constraining what the leaf step may request
struct CreatePkiRole {
    client: Arc<VaultClient>,
    mount: String,
    role: String,
    params: Value,
}

#[async_trait]
impl Step for CreatePkiRole {
    fn name(&self) -> &str {
        "create-pki-role"
    }

    async fn apply(&self, _ctx: &mut Context) -> Result<()> {
        self.client
            .create_role(&self.mount, &self.role, self.params.clone())
            .await?;
        Ok(())
    }

    async fn undo(&self, _ctx: &mut Context) -> Result<()> {
        allow_missing(self.client.delete_role(&self.mount, &self.role).await)
    }
}

/// Issue the leaf certificate and export it as cert.pem / key.pem
struct IssueLeafCertificate {
    client: Arc<VaultClient>,
    mount: String,
    role: String,
    common_name: String,
    ttl: Option<String>,
    export_dir: PathBuf,
}

impl IssueLeafCertificate {
    fn export(&self, bundle: &CertificateBundle) -> Result<()> {
        fs::create_dir_all(&self.export_dir)?;

        let cert_path = self.export_dir.join("cert.pem");
        let key_path = self.export_dir.join("key.pem");
        fs::write(&cert_path, &bundle.certificate)?;
        fs::write(&key_path, &bundle.private_key)?;

        // Private key readable by the owner only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&key_path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&key_path, perms)?;
        }

        tracing::info!(
            "Exported certificate to {} and key to {}",
            cert_path.display(),
            key_path.display()
        );
        Ok(())
    }

    fn remove_exported_files(&self) -> Result<()> {
        for file in ["cert.pem", "key.pem"] {
            let path = self.export_dir.join(file);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Step for IssueLeafCertificate {
    fn name(&self) -> &str {
        "issue-leaf-certificate"
    }

    async fn apply(&self, ctx: &mut Context) -> Result<()> {
        let response = self
            .client
            .issue_certificate(IssueCertificateRequest {
                pki_mount: &self.mount,
                role: &self.role,
                common_name: &self.common_name,
                alt_names: None,
                ip_sans: None,
                ttl: self.ttl.as_deref(),
            })
            .await?;

        let bundle = CertificateBundle::from_issue_response(&response)?;
        self.export(&bundle)?;
        ctx.insert(LEAF_CERTIFICATE, Artifact::Certificate(bundle));
        Ok(())
    }

    async fn undo(&self, ctx: &mut Context) -> Result<()> {
        self.remove_exported_files()?;

        let serial = ctx
            .get(LEAF_CERTIFICATE)
            .and_then(Artifact::as_certificate)
            .map(|bundle| bundle.serial.clone());

        if let Some(serial) = serial {
            allow_missing(self.client.revoke_certificate(&self.mount, &serial).await)?;
            ctx.take(LEAF_CERTIFICATE);
        }

        Ok(())
    }
}

/// Enable an auth method (`sys/auth/{path}`)
struct EnableAuthMethod {
    client: Arc<VaultClient>,
    path: String,
    method_type: String,
}

#[async_trait]
impl Step for EnableAuthMethod {
    fn name(&self) -> &str {
        "enable-cert-auth"
    }

    async fn apply(&self, _ctx: &mut Context) -> Result<()> {
        self.client
            .enable_auth_method(&self.path, &self.method_type)
            .await?;
        Ok(())
    }

    async fn undo(&self, _ctx: &mut Context) -> Result<()> {
        allow_missing(self.client.disable_auth_method(&self.path).await)
    }
}

/// Register the issued certificate for TLS client authentication. Consumes
/// the leaf-certificate artifact produced by the issue step.
struct RegisterCertAuthRole {
    client: Arc<VaultClient>,
    auth_path: String,
    name: String,
    display_name: String,
}

#[async_trait]
impl Step for RegisterCertAuthRole {
    fn name(&self) -> &str {
        "register-cert-auth-role"
    }

    async fn apply(&self, ctx: &mut Context) -> Result<()> {
        let bundle = ctx.certificate(LEAF_CERTIFICATE)?;
        self.client
            .write_cert_auth_role(
                &self.auth_path,
                &self.name,
                &self.display_name,
                &bundle.certificate,
            )
            .await?;
        Ok(())
    }

    async fn undo(&self, _ctx: &mut Context) -> Result<()> {
        allow_missing(
            self.client
                .delete_cert_auth_role(&self.auth_path, &self.name)
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvisionConfig;
    use crate::utils::errors::ProvisionError;

    fn client() -> Arc<VaultClient> {
        let config = ProvisionConfig::resolve(
            Some("http://127.0.0.1:8200".to_string()),
            Some("test-root-token".to_string()),
        )
        .unwrap();
        Arc::new(VaultClient::new(&config).unwrap())
    }

    #[test]
    fn test_plan_orders_steps() {
        let steps = ProvisionSpec::default().plan(client());
        let names: Vec<&str> = steps.iter().map(|step| step.name()).collect();
        assert_eq!(
            names,
            vec![
                "enable-pki-mount",
                "generate-root-ca",
                "configure-urls",
                "create-pki-role",
                "issue-leaf-certificate",
                "enable-cert-auth",
                "register-cert-auth-role",
            ]
        );
    }

    #[test]
    fn test_export_paths_follow_export_dir() {
        let spec = ProvisionSpec {
            export_dir: PathBuf::from("/tmp/provision"),
            ..ProvisionSpec::default()
        };
        assert_eq!(spec.cert_path(), PathBuf::from("/tmp/provision/cert.pem"));
        assert_eq!(spec.key_path(), PathBuf::from("/tmp/provision/key.pem"));
    }

    #[test]
    fn test_allow_missing() {
        assert!(allow_missing(Ok(Value::Null)).is_ok());

        let gone = ProvisionError::Service {
            path: "sys/auth/cert".to_string(),
            status: 400,
            message: "path is not in use".to_string(),
        };
        assert!(allow_missing(Err(gone)).is_ok());

        let denied = ProvisionError::Service {
            path: "sys/auth/cert".to_string(),
            status: 403,
            message: "permission denied".to_string(),
        };
        assert!(allow_missing(Err(denied)).is_err());
    }

    #[tokio::test]
    async fn test_register_requires_leaf_artifact() {
        let step = RegisterCertAuthRole {
            client: client(),
            auth_path: "cert".to_string(),
            name: "example".to_string(),
            display_name: "example".to_string(),
        };

        let mut ctx = Context::new();
        let err = step.apply(&mut ctx).await.unwrap_err();
        assert!(matches!(err, ProvisionError::MissingArtifact(_)));
    }
}
