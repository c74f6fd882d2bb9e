use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vault-provision")]
#[command(version)]
#[command(about = "Provision Vault PKI and TLS certificate authentication with rollback")]
#[command(long_about = None)]
pub struct Cli {
    /// Vault server URL
    #[arg(long, env = "VAULT_ADDR")]
    pub vault_addr: Option<String>,

    /// Enable verbose logging (repeat for more verbosity: -v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output raw tab-separated values (no formatting)
    #[arg(short, long)]
    pub raw: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full provisioning workflow against Vault
    Provision {
        #[command(flatten)]
        opts: ProvisionOpts,

        /// Keep partially applied steps instead of rolling back on failure
        #[arg(long)]
        no_rollback: bool,
    },
    /// Undo every provisioning step in reverse order
    Teardown {
        #[command(flatten)]
        opts: ProvisionOpts,
    },
    /// Show Vault health and whether the provisioned backends are enabled
    Status {
        #[command(flatten)]
        opts: ProvisionOpts,
    },
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProvisionOpts {
    /// PKI secrets engine mount path
    #[arg(long, default_value = "pki")]
    pub pki_mount: String,

    /// PKI role used to issue the leaf certificate
    #[arg(long, default_value = "example-dot-com")]
    pub role: String,

    /// Root CA common name (also the allowed issuing domain)
    #[arg(long, default_value = "my-website.com")]
    pub root_cn: String,

    /// Root CA TTL
    #[arg(long, default_value = "8760h")]
    pub root_ttl: String,

    /// Leaf certificate common name
    #[arg(long, default_value = "www.my-website.com")]
    pub leaf_cn: String,

    /// Leaf certificate TTL (the role's max TTL applies when omitted)
    #[arg(long)]
    pub leaf_ttl: Option<String>,

    /// Maximum TTL the issuing role allows
    #[arg(long, default_value = "72h")]
    pub max_ttl: String,

    /// TLS certificate auth method mount path
    #[arg(long, default_value = "cert")]
    pub auth_path: String,

    /// Name of the cert auth role registered for the issued certificate
    #[arg(long, default_value = "example")]
    pub auth_role: String,

    /// Directory where cert.pem and key.pem are written
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_provision_defaults() {
        let cli = Cli::try_parse_from(["vault-provision", "provision"]).unwrap();
        match cli.command {
            Commands::Provision { opts, no_rollback } => {
                assert_eq!(opts.pki_mount, "pki");
                assert_eq!(opts.role, "example-dot-com");
                assert_eq!(opts.root_cn, "my-website.com");
                assert_eq!(opts.leaf_cn, "www.my-website.com");
                assert_eq!(opts.auth_path, "cert");
                assert_eq!(opts.export_dir, PathBuf::from("."));
                assert!(opts.leaf_ttl.is_none());
                assert!(!no_rollback);
            }
            _ => panic!("expected provision command"),
        }
    }

    #[test]
    fn test_provision_overrides() {
        let cli = Cli::try_parse_from([
            "vault-provision",
            "--vault-addr",
            "https://vault.internal:8200",
            "-vv",
            "provision",
            "--pki-mount",
            "pki-int",
            "--leaf-cn",
            "api.my-website.com",
            "--export-dir",
            "/tmp/out",
            "--no-rollback",
        ])
        .unwrap();

        assert_eq!(cli.vault_addr.as_deref(), Some("https://vault.internal:8200"));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Provision { opts, no_rollback } => {
                assert_eq!(opts.pki_mount, "pki-int");
                assert_eq!(opts.leaf_cn, "api.my-website.com");
                assert_eq!(opts.export_dir, PathBuf::from("/tmp/out"));
                assert!(no_rollback);
            }
            _ => panic!("expected provision command"),
        }
    }

    #[test]
    fn test_teardown_parses() {
        let cli =
            Cli::try_parse_from(["vault-provision", "teardown", "--auth-path", "cert2"]).unwrap();
        match cli.command {
            Commands::Teardown { opts } => assert_eq!(opts.auth_path, "cert2"),
            _ => panic!("expected teardown command"),
        }
    }
}
