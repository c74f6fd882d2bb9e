use crate::cli::args::{Cli, Commands, ProvisionOpts};
use crate::config::ProvisionConfig;
use crate::utils::cert_utils::summarize_leaf;
use crate::utils::errors::Result;
use crate::utils::output::OutputFormat;
use crate::vault::client::VaultClient;
use crate::workflow::{Artifact, Coordinator, ProvisionSpec, UndoFailure, LEAF_CERTIFICATE};
use clap::CommandFactory;
use clap_complete::generate;
use std::io;
use std::sync::Arc;

impl From<&ProvisionOpts> for ProvisionSpec {
    fn from(opts: &ProvisionOpts) -> Self {
        Self {
            pki_mount: opts.pki_mount.clone(),
            role: opts.role.clone(),
            root_common_name: opts.root_cn.clone(),
            root_ttl: opts.root_ttl.clone(),
            allowed_domains: opts.root_cn.clone(),
            allow_subdomains: true,
            max_ttl: opts.max_ttl.clone(),
            leaf_common_name: opts.leaf_cn.clone(),
            leaf_ttl: opts.leaf_ttl.clone(),
            auth_path: opts.auth_path.clone(),
            auth_role: opts.auth_role.clone(),
            export_dir: opts.export_dir.clone(),
        }
    }
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    // Initialize logging - always to stderr
    if !cli.quiet {
        let log_level = match cli.verbose {
            0 => "vault_provision=warn",  // Default: warnings only
            1 => "vault_provision=info",  // -v: info level
            2 => "vault_provision=debug", // -vv: debug level
            _ => "vault_provision=trace", // -vvv+: trace level
        };

        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(log_level)
            .init();
    }

    let output = OutputFormat::new(cli.raw);
    let vault_addr = cli.vault_addr.clone();

    match cli.command {
        Commands::Provision { opts, no_rollback } => {
            handle_provision(vault_addr, opts, no_rollback, &output).await
        }
        Commands::Teardown { opts } => handle_teardown(vault_addr, opts).await,
        Commands::Status { opts } => handle_status(vault_addr, opts, &output).await,
        Commands::Completion { shell } => {
            generate(shell, &mut Cli::command(), "vault-provision", &mut io::stdout());
            Ok(())
        }
    }
}

async fn handle_provision(
    vault_addr: Option<String>,
    opts: ProvisionOpts,
    no_rollback: bool,
    output: &OutputFormat,
) -> Result<()> {
    let config = ProvisionConfig::from_env(vault_addr)?;
    let client = Arc::new(VaultClient::new(&config)?);

    let spec = ProvisionSpec::from(&opts);
    let steps = spec.plan(client);

    let coordinator = Coordinator::new()
        .with_rollback(!no_rollback)
        .with_final_artifact(LEAF_CERTIFICATE);

    let result = coordinator.run(&steps).await;

    report_undo_failures(&result.undo_failures);

    if let Some(error) = result.error {
        if let Some(failed_step) = &result.failed_step {
            if no_rollback {
                eprintln!("Step '{failed_step}' failed; partial setup left in place");
            } else if result.undo_failures.is_empty() {
                eprintln!("Step '{failed_step}' failed; completed steps rolled back cleanly");
            } else {
                eprintln!(
                    "Step '{failed_step}' failed; rollback left {} step(s) dirty",
                    result.undo_failures.len()
                );
            }
        }
        return Err(error);
    }

    eprintln!(
        "✓ Provisioned {} step(s): {}",
        result.completed.len(),
        result.completed.join(", ")
    );

    if let Some(bundle) = result.final_artifact.as_ref().and_then(Artifact::as_certificate) {
        let mut pairs = vec![
            ("Serial".to_string(), bundle.display_serial()),
            (
                "Certificate".to_string(),
                spec.cert_path().display().to_string(),
            ),
            ("Private key".to_string(), spec.key_path().display().to_string()),
        ];

        match summarize_leaf(&bundle.certificate) {
            Ok(summary) => {
                pairs.push(("Subject".to_string(), summary.subject));
                pairs.push(("Issuer".to_string(), summary.issuer));
                pairs.push((
                    "Expires".to_string(),
                    summary.not_after.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                ));
            }
            Err(e) => tracing::warn!("Could not parse issued certificate for summary: {e}"),
        }

        output.print_key_value(&pairs);
    }

    Ok(())
}

async fn handle_teardown(vault_addr: Option<String>, opts: ProvisionOpts) -> Result<()> {
    let config = ProvisionConfig::from_env(vault_addr)?;
    let client = Arc::new(VaultClient::new(&config)?);

    let spec = ProvisionSpec::from(&opts);
    let steps = spec.plan(client);

    let mut failures = Coordinator::new().teardown(&steps).await;

    if failures.is_empty() {
        eprintln!("✓ Teardown complete ({} step(s) undone)", steps.len());
        Ok(())
    } else {
        report_undo_failures(&failures);
        Err(failures.remove(0).error)
    }
}

async fn handle_status(
    vault_addr: Option<String>,
    opts: ProvisionOpts,
    output: &OutputFormat,
) -> Result<()> {
    let config = ProvisionConfig::from_env(vault_addr)?;
    let client = VaultClient::new(&config)?;

    let health = client.health().await?;
    let mounts = client.list_mounts().await?;
    let auth_methods = client.list_auth_methods().await?;

    let enabled = |present: bool| if present { "enabled" } else { "disabled" };
    let pki_present = mounts.contains_key(&format!("{}/", opts.pki_mount));
    let auth_present = auth_methods.contains_key(&format!("{}/", opts.auth_path));

    let pairs = [
        ("Vault".to_string(), config.vault_addr.clone()),
        (
            "Initialized".to_string(),
            health["initialized"].as_bool().unwrap_or(false).to_string(),
        ),
        (
            "Sealed".to_string(),
            health["sealed"].as_bool().unwrap_or(true).to_string(),
        ),
        (
            format!("PKI mount ({})", opts.pki_mount),
            enabled(pki_present).to_string(),
        ),
        (
            format!("Cert auth ({})", opts.auth_path),
            enabled(auth_present).to_string(),
        ),
    ];

    output.print_key_value(&pairs);
    Ok(())
}

fn report_undo_failures(failures: &[UndoFailure]) {
    for failure in failures {
        eprintln!("Warning: undo of '{}' failed: {}", failure.step, failure.error);
    }
}
