//! passgen - generate passwords and keep them under a label
//!
//! Passwords are drawn from a character policy and saved to a local JSON
//! file. Nothing is encrypted: treat the store file like any other plaintext
//! secret.
//!
//! Commands:
//! - generate: Print fresh passwords without saving them
//! - add <LABEL>: Generate and save a password
//! - show <LABEL>: Print a saved password
//! - list: List saved labels
//! - rename <OLD> <NEW>: Rename a label
//! - regen <LABEL>: Replace a password with a new one
//! - delete <LABEL>: Delete a saved password
//! - policies: Show the available character policies
//! - config: Show or initialize configuration

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use passgen_core::config::STORE_ENV;
use passgen_core::{generate, Config, Length, Paths, Policy, RecordStore, StoreError};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "passgen")]
#[command(about = "Generate passwords to a character policy and keep them under a label")]
#[command(version)]
#[command(after_help = r#"POLICIES:
    basic       Lowercase letters only
    medium      Letters (upper/lower) + digits
    advanced    Letters + digits + symbols
    uppercase   Uppercase letters only
    lowercase   Lowercase letters only
    numbers     Digits only
    symbols     Symbols only

STORAGE:
    - Passwords are stored unencrypted in passwords.json (current directory)
    - Override with --store, PASSGEN_STORE or store_path in ~/.config/passgen/config.yaml
    - One process at a time: concurrent writers overwrite each other"#)]
struct Cli {
    /// Path to the password store file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print freshly generated passwords without saving them
    Generate {
        /// Character policy (defaults to the configured policy)
        #[arg(short, long)]
        policy: Option<Policy>,
        /// Password length, 1-999 (defaults to the configured length)
        #[arg(short, long)]
        length: Option<Length>,
        /// How many passwords to print
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },

    /// Generate a password and save it under a new label
    Add {
        /// Label to save under (e.g., Gmail)
        label: String,
        #[arg(short, long)]
        policy: Option<Policy>,
        #[arg(short, long)]
        length: Option<Length>,
    },

    /// Print a saved password with its policy and length
    Show {
        /// Only print the password, without trailing newline (useful for piping)
        #[arg(short = 'n')]
        no_newline: bool,
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
        label: String,
    },

    /// List saved labels
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Rename a saved label
    Rename {
        /// Current label
        old: String,
        /// New label
        new: String,
    },

    /// Replace a saved password with a freshly generated one
    Regen {
        label: String,
        /// New policy (keeps the current one if omitted)
        #[arg(short, long)]
        policy: Option<Policy>,
        /// New length (keeps the current one if omitted)
        #[arg(short, long)]
        length: Option<Length>,
    },

    /// Delete a saved password
    Delete {
        label: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List the available character policies
    Policies,

    /// Show the effective configuration
    Config {
        /// Write a default config file
        #[arg(long)]
        init: bool,
        /// Overwrite an existing config file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so `show -n` output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    tracing::debug!(store = %config.store_path.display(), "resolved store path");

    match cli.command {
        Some(Commands::Generate {
            policy,
            length,
            count,
        }) => cmd_generate(&config, policy, length, count),
        Some(Commands::Add {
            label,
            policy,
            length,
        }) => cmd_add(&config, &label, policy, length),
        Some(Commands::Show {
            no_newline,
            json,
            label,
        }) => cmd_show(&config, &label, no_newline, json),
        Some(Commands::List { json }) => cmd_list(&config, json),
        Some(Commands::Rename { old, new }) => cmd_rename(&config, &old, &new),
        Some(Commands::Regen {
            label,
            policy,
            length,
        }) => cmd_regen(&config, &label, policy, length),
        Some(Commands::Delete { label, yes }) => cmd_delete(&config, &label, yes),
        Some(Commands::Policies) => cmd_policies(),
        Some(Commands::Config { init, force }) => cmd_config(&config, init, force),
        None => {
            // Default to listing labels
            cmd_list(&config, false)
        }
    }
}

fn open_store(config: &Config) -> Result<RecordStore> {
    RecordStore::open(&config.store_path)
        .with_context(|| format!("Failed to open store {}", config.store_path.display()))
}

/// Print passwords without touching the store
fn cmd_generate(
    config: &Config,
    policy: Option<Policy>,
    length: Option<Length>,
    count: usize,
) -> Result<()> {
    let policy = policy.unwrap_or(config.policy);
    let length = length.unwrap_or(config.length);

    for _ in 0..count {
        println!("{}", generate(policy, length));
    }

    Ok(())
}

/// Generate and save a new password
fn cmd_add(
    config: &Config,
    label: &str,
    policy: Option<Policy>,
    length: Option<Length>,
) -> Result<()> {
    let mut store = open_store(config)?;

    let policy = policy.unwrap_or(config.policy);
    let length = length.unwrap_or(config.length);
    let password = generate(policy, length);

    match store.create(label, policy, length, password.as_str()) {
        Err(e @ StoreError::DuplicateLabel(_)) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Use 'passgen regen {}' to replace the saved password", label)));
        }
        result => result?,
    }

    println!("Generated password: {}", password);
    println!(
        "success: Password for '{}' saved to {}",
        label,
        store.path().display()
    );

    Ok(())
}

/// Print a saved password
fn cmd_show(config: &Config, label: &str, no_newline: bool, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let record = store.read(label)?;

    if json {
        let out = serde_json::json!({
            "label": label,
            "policy": record.policy(),
            "length": record.length(),
            "value": record.value(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if no_newline {
        print!("{}", record.value());
        io::stdout().flush()?;
        return Ok(());
    }

    println!("Label:    {}", label);
    println!("Policy:   {}", record.policy());
    println!("Length:   {}", record.length());
    println!("Password: {}", record.value());

    Ok(())
}

/// List saved labels
fn cmd_list(config: &Config, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let labels = store.list_labels();

    if json {
        println!("{}", serde_json::to_string_pretty(&labels)?);
        return Ok(());
    }

    if labels.is_empty() {
        println!("No saved passwords yet. Add one with: passgen add <label>");
        return Ok(());
    }

    println!("Saved entries");
    println!();

    for label in &labels {
        println!("  {}", label);
    }

    Ok(())
}

/// Rename a label
fn cmd_rename(config: &Config, old: &str, new: &str) -> Result<()> {
    let mut store = open_store(config)?;
    store.rename_label(old, new)?;
    println!("success: Renamed '{}' to '{}'", old, new);
    Ok(())
}

/// Replace a password, keeping the old options unless overridden
fn cmd_regen(
    config: &Config,
    label: &str,
    policy: Option<Policy>,
    length: Option<Length>,
) -> Result<()> {
    let mut store = open_store(config)?;
    let current = store.read(label)?;

    let policy = policy.unwrap_or(current.policy());
    let length = length.unwrap_or(current.length());
    let password = generate(policy, length);

    store.update_value(label, policy, length, password.as_str())?;

    println!("New password: {}", password);
    println!("success: Password for '{}' updated", label);

    Ok(())
}

/// Delete a password, asking first unless --yes
fn cmd_delete(config: &Config, label: &str, yes: bool) -> Result<()> {
    let mut store = open_store(config)?;
    // Fail before prompting if there is nothing to delete
    store.read(label)?;

    if !yes {
        print!("Are you sure you want to delete '{}'? (yes/no): ", label);
        io::stdout().flush()?;
        if !confirm(io::stdin().lock())? {
            println!("Deletion cancelled");
            return Ok(());
        }
    }

    store.delete(label)?;
    println!("success: Deleted '{}'", label);

    Ok(())
}

/// Read one answer; only "yes" (any case) confirms
fn confirm<R: BufRead>(mut input: R) -> Result<bool> {
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

/// List the policies
fn cmd_policies() -> Result<()> {
    println!("Policies");
    println!();

    for policy in Policy::ALL {
        println!(
            "  {:<10}  {:<32} ({} characters)",
            policy.as_str(),
            policy.description(),
            policy.charset().len()
        );
    }

    Ok(())
}

/// Show, or initialize, the configuration
fn cmd_config(config: &Config, init: bool, force: bool) -> Result<()> {
    let config_file = Paths::new().config_file();

    if init {
        if config_file.exists() && !force {
            bail!(
                "Config already exists: {} (use --force to overwrite)",
                config_file.display()
            );
        }
        Config::default().save_to(&config_file)?;
        println!("success: Wrote default config to {}", config_file.display());
        return Ok(());
    }

    println!("Config file: {}", config_file.display());
    if !config_file.exists() {
        println!("  (not present, using defaults)");
    }
    println!();
    println!("store_path: {}", config.store_path.display());
    println!("policy:     {}", config.policy);
    println!("length:     {}", config.length);
    println!();
    println!("{} overrides store_path; --store overrides both.", STORE_ENV);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["passgen", "add", "gmail", "-p", "medium", "-l", "12"]).unwrap();
        if let Some(Commands::Add {
            label,
            policy,
            length,
        }) = cli.command
        {
            assert_eq!(label, "gmail");
            assert_eq!(policy, Some(Policy::Medium));
            assert_eq!(length.map(|l| l.get()), Some(12));
        } else {
            panic!("Expected Add command");
        }

        let cli = Cli::try_parse_from(["passgen", "show", "-n", "gmail"]).unwrap();
        if let Some(Commands::Show {
            label, no_newline, ..
        }) = cli.command
        {
            assert_eq!(label, "gmail");
            assert!(no_newline);
        } else {
            panic!("Expected Show command");
        }

        let cli = Cli::try_parse_from(["passgen", "rename", "gmail", "google"]).unwrap();
        if let Some(Commands::Rename { old, new }) = cli.command {
            assert_eq!(old, "gmail");
            assert_eq!(new, "google");
        } else {
            panic!("Expected Rename command");
        }

        let cli = Cli::try_parse_from(["passgen"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_global_store() {
        let cli = Cli::try_parse_from(["passgen", "list", "--store", "/tmp/x.json"]).unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/x.json")));
        assert!(matches!(cli.command, Some(Commands::List { json: false })));
    }

    #[test]
    fn test_cli_rejects_bad_options() {
        assert!(Cli::try_parse_from(["passgen", "generate", "-p", "extreme"]).is_err());
        assert!(Cli::try_parse_from(["passgen", "generate", "-l", "0"]).is_err());
        assert!(Cli::try_parse_from(["passgen", "generate", "-l", "1000"]).is_err());
        assert!(Cli::try_parse_from(["passgen", "generate", "-l", "ten"]).is_err());
        assert!(Cli::try_parse_from(["passgen", "config", "--force"]).is_err());
    }

    #[test]
    fn test_confirm() {
        assert!(confirm("yes\n".as_bytes()).unwrap());
        assert!(confirm("  YES \n".as_bytes()).unwrap());
        assert!(!confirm("y\n".as_bytes()).unwrap());
        assert!(!confirm("no\n".as_bytes()).unwrap());
        assert!(!confirm("".as_bytes()).unwrap());
    }

    fn test_config(tmp: &TempDir) -> Config {
        Config {
            store_path: tmp.path().join("passwords.json"),
            ..Config::default()
        }
    }

    #[test]
    fn test_add_regen_delete_flow() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        cmd_add(&config, "gmail", Some(Policy::Numbers), Some(Length::new(6).unwrap())).unwrap();
        let err = cmd_add(&config, "gmail", None, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::DuplicateLabel(label)) if label == "gmail"
        ));
        assert!(err.to_string().contains("passgen regen gmail"));

        let store = RecordStore::open(&config.store_path).unwrap();
        let record = store.read("gmail").unwrap();
        assert_eq!(record.policy(), Policy::Numbers);
        assert_eq!(record.value().len(), 6);

        // Regen keeps the policy, takes the new length
        cmd_regen(&config, "gmail", None, Some(Length::new(9).unwrap())).unwrap();
        let store = RecordStore::open(&config.store_path).unwrap();
        let record = store.read("gmail").unwrap();
        assert_eq!(record.policy(), Policy::Numbers);
        assert_eq!(record.length().get(), 9);

        cmd_rename(&config, "gmail", "google").unwrap();
        assert!(cmd_show(&config, "gmail", false, false).is_err());
        cmd_show(&config, "google", false, true).unwrap();

        cmd_delete(&config, "google", true).unwrap();
        assert!(cmd_delete(&config, "google", true).is_err());
        assert!(RecordStore::open(&config.store_path).unwrap().is_empty());
    }

    #[test]
    fn test_generate_does_not_touch_store() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        cmd_generate(&config, Some(Policy::Symbols), None, 3).unwrap();
        assert!(!config.store_path.exists());
    }
}
