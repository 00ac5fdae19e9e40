//! cardtrust: Command-line front-end for the smart-card certificate trust engine.

use anyhow::{Context, Result};
use cardtrust_lib::{
    certificate_from_header, Certificate, CertificateChecker, CheckerConfig, Clock, SystemClock,
};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, Level};

#[derive(Parser)]
#[command(
    name = "cardtrust",
    about = "Validate smart-card client certificates against a two-level PKI",
    long_about = "cardtrust checks end-user certificates against root and intermediate\n\
                  CA certificates loaded from directories, then against the\n\
                  intermediate's CRL found in a CRL directory.\n\n\
                  Settings come from a TOML file (--config) and can be overridden\n\
                  on the command line. Log verbosity follows RUST_LOG\n\
                  (error, warn, info, debug, trace) unless -v is given.",
    after_help = "EXAMPLES:\n\
                  \n  cardtrust --config /etc/cardtrust.toml check card.pem\
                  \n  cardtrust --ca-dir ca --ica-dir ica --crl-dir crl check card.der\
                  \n  cardtrust --config cardtrust.toml check --header < header.txt\
                  \n  cardtrust --config cardtrust.toml check -r --failures-only cards/\
                  \n  cardtrust --config cardtrust.toml anchors\
                  \n  cardtrust --config cardtrust.toml crl ica/citizen.crt\
                  \n  cardtrust init-config cardtrust.toml"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Engine settings: a config file plus per-field overrides.
#[derive(Args, Debug, Default)]
struct Settings {
    /// TOML configuration file (default: built-in defaults)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Directory of root CA certificates
    #[arg(long, global = true, value_name = "DIR")]
    ca_dir: Option<PathBuf>,
    /// Directory of intermediate CA certificates
    #[arg(long, global = true, value_name = "DIR")]
    ica_dir: Option<PathBuf>,
    /// Directory of CRL files
    #[arg(long, global = true, value_name = "DIR")]
    crl_dir: Option<PathBuf>,
    /// Maximum number of issuers kept in the CRL cache
    #[arg(long, global = true, value_name = "N")]
    cache_capacity: Option<u64>,
    /// How long a loaded CRL is reused, e.g. 60s, 5m, 1h (plain numbers are seconds)
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration)]
    cache_ttl: Option<Duration>,
    /// Accept an outdated CRL when no up-to-date one exists (testing only)
    #[arg(long, global = true)]
    allow_stale_crl: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check card certificates (exit 0 = accepted, 2 = rejected)
    #[command(after_help = "STATUS CODES:\n\
                      \n  2   NO_CERT_FOUND         no certificate in the input\
                      \n  3   CERT_REVOKED          serial listed in the issuer's CRL\
                      \n  7   CERT_EXPIRED          outside the validity interval\
                      \n  8   UNKNOWN_CA            root CA unknown or signature invalid\
                      \n  9   UNKNOWN_ICA           intermediate CA unknown or signature invalid\
                      \n  11  CRL_MISSING           no usable CRL for the issuer\
                      \n  12  CRL_SIGNATURE_FAILED  CRL not signed by the intermediate CA\
                      \n\nEXAMPLES:\n\
                      \n  cardtrust check card.pem\
                      \n  cardtrust check --json card.der\
                      \n  cardtrust check --header header.txt\
                      \n  cardtrust check -r --failures-only cards/\
                      \n  cat card.pem | cardtrust check")]
    Check {
        /// Certificate file or directory. Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Input is a forwarded client-certificate header value
        #[arg(long)]
        header: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Only print failures (directory mode)
        #[arg(long)]
        failures_only: bool,
        /// Recurse into subdirectories (directory mode)
        #[arg(short, long)]
        recurse: bool,
    },
    /// List the loaded root and intermediate CA subjects
    Anchors {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show the CRL selected for an intermediate CA (exit 2 if unusable)
    #[command(after_help = "EXAMPLES:\n\
                      \n  cardtrust crl ica/citizen.crt\
                      \n  cardtrust --allow-stale-crl crl ica/citizen.crt")]
    Crl {
        /// Intermediate CA certificate (PEM or DER)
        issuer: PathBuf,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Write a configuration file with the default settings
    InitConfig {
        /// Output file
        file: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Maximum file size for certificate inputs (10 MiB).
const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            let meta = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat file: {}", path.display()))?;
            if meta.len() > MAX_INPUT_BYTES {
                anyhow::bail!(
                    "File too large ({} bytes, max {} bytes): {}",
                    meta.len(),
                    MAX_INPUT_BYTES,
                    path.display()
                );
            }
            std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .take(MAX_INPUT_BYTES)
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

/// Parse a duration string using humantime format.
///
/// Plain numbers (e.g. "60") default to seconds. Otherwise, standard
/// humantime units are accepted: `ms`, `s`, `m`, `h`, `d`, etc.
fn parse_duration(s: &str) -> Result<Duration> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        let secs: u64 = s.parse().context("Invalid duration value")?;
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).with_context(|| format!("Invalid duration: '{s}'"))
}

/// Build the engine configuration: file (or defaults), then overrides.
fn resolve_config(settings: &Settings) -> Result<CheckerConfig> {
    let mut config = match &settings.config {
        Some(path) => CheckerConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => CheckerConfig::default(),
    };
    if let Some(dir) = &settings.ca_dir {
        config.ca_dir = dir.clone();
    }
    if let Some(dir) = &settings.ica_dir {
        config.ica_dir = dir.clone();
    }
    if let Some(dir) = &settings.crl_dir {
        config.crl_dir = dir.clone();
    }
    if let Some(capacity) = settings.cache_capacity {
        config.crl_cache_capacity = capacity;
    }
    if let Some(ttl) = settings.cache_ttl {
        config.crl_cache_expiration_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    }
    if settings.allow_stale_crl {
        config.allow_stale_crl = true;
    }
    config.validate()?;
    Ok(config)
}

/// Log level from `-v` when given, otherwise from `RUST_LOG`, default warn.
fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => std::env::var("RUST_LOG")
            .ok()
            .and_then(|v| v.trim().parse::<Level>().ok())
            .unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Check if a path has a certificate file extension.
fn is_cert_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("pem") || ext.eq_ignore_ascii_case("der")
            || ext.eq_ignore_ascii_case("crt") || ext.eq_ignore_ascii_case("cer")
    )
}

/// Find all certificate files (.pem, .der, .crt, .cer) in a directory.
fn find_cert_files(dir: &Path, recurse: bool) -> Vec<PathBuf> {
    let walker = if recurse {
        walkdir::WalkDir::new(dir)
    } else {
        walkdir::WalkDir::new(dir).max_depth(1)
    };
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_cert_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// A single result from batch processing.
struct BatchResult {
    path: String,
    pass: bool,
    detail: String,
}

/// Check certificate files in parallel, printing `filename: result`.
///
/// Returns the number of failures.
fn run_batch<F>(files: &[PathBuf], failures_only: bool, op: F) -> usize
where
    F: Fn(&Path) -> BatchResult + Sync,
{
    let results: Vec<BatchResult> = files.par_iter().map(|f| op(f)).collect();

    let mut failures = 0;
    for r in &results {
        if !r.pass {
            failures += 1;
        }
        if failures_only && r.pass {
            continue;
        }
        if r.pass {
            println!("{}: {}", r.path, r.detail);
        } else {
            eprintln!("{}: {}", r.path, r.detail);
        }
    }
    failures
}

/// Decode the certificate from raw file bytes or from a header value.
fn load_certificate(input: &[u8], header: bool) -> Result<Certificate> {
    if header {
        let value = String::from_utf8_lossy(input);
        Ok(certificate_from_header(&value)?)
    } else {
        Ok(Certificate::from_bytes(input)?)
    }
}

fn check_to_batch(checker: &CertificateChecker, path: &Path, header: bool) -> BatchResult {
    let label = path.display().to_string();
    let cert = match read_input(Some(&path.to_path_buf())).and_then(|i| load_certificate(&i, header)) {
        Ok(c) => c,
        Err(e) => {
            return BatchResult {
                path: label,
                pass: false,
                detail: format!("FAIL ({:#})", e),
            }
        }
    };
    let outcome = checker.inspect(&cert);
    BatchResult {
        path: label,
        pass: outcome.is_valid(),
        detail: outcome.to_string(),
    }
}

fn check_json(checker: &CertificateChecker, cert: &Certificate) -> serde_json::Value {
    let outcome = checker.inspect(cert);
    let (status, code, reason) = match &outcome.result {
        Ok(_) => ("OK", "0", String::new()),
        Err(e) => (e.code().name(), e.code().code(), e.reason().to_string()),
    };
    serde_json::json!({
        "valid": outcome.is_valid(),
        "subject": cert.subject().to_string(),
        "issuer": cert.issuer().to_string(),
        "serial": cert.serial_hex(),
        "status": status,
        "code": code,
        "reason": reason,
        "audit": outcome.audit,
    })
}

fn format_ts(ts: i64) -> String {
    match u64::try_from(ts) {
        Ok(secs) => humantime::format_rfc3339_seconds(UNIX_EPOCH + Duration::from_secs(secs))
            .to_string(),
        Err(_) => ts.to_string(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::InitConfig { file, force } => {
            if file.exists() && !*force {
                anyhow::bail!(
                    "Refusing to overwrite existing file: {} (use --force)",
                    file.display()
                );
            }
            let text = CheckerConfig::default().to_toml_string()?;
            std::fs::write(file, text)
                .with_context(|| format!("Failed to write config: {}", file.display()))?;
            println!("Wrote {}", file.display());
        }
        Commands::Anchors { json } => {
            let config = resolve_config(&cli.settings)?;
            let checker = CertificateChecker::from_config(&config)?;
            let anchors = checker.anchors();
            let mut cas: Vec<String> = anchors.ca_subjects().map(|p| p.to_string()).collect();
            let mut icas: Vec<String> = anchors.ica_subjects().map(|p| p.to_string()).collect();
            cas.sort();
            icas.sort();

            if *json {
                let value = serde_json::json!({ "ca": cas, "ica": icas });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Root CAs ({}) from {}:", cas.len(), config.ca_dir.display());
                for subject in &cas {
                    println!("  {}", subject);
                }
                println!(
                    "Intermediate CAs ({}) from {}:",
                    icas.len(),
                    config.ica_dir.display()
                );
                for subject in &icas {
                    println!("  {}", subject);
                }
            }
        }
        Commands::Crl { issuer, json } => {
            let config = resolve_config(&cli.settings)?;
            let checker = CertificateChecker::from_config(&config)?;
            let input = read_input(Some(issuer))?;
            let ica = Certificate::from_bytes(&input)
                .with_context(|| format!("Failed to parse issuer: {}", issuer.display()))?;

            let crl = match checker.crl_cache().get(ica.subject()) {
                Ok(crl) => crl,
                Err(e) => {
                    eprintln!("{}: FAIL, {}", ica.subject(), e);
                    std::process::exit(2);
                }
            };
            let signature_ok = crl.verify_signed_by(&ica).is_ok();
            let fresh = crl.is_fresh_at(SystemClock.now_ts());

            if *json {
                let value = serde_json::json!({
                    "issuer": crl.issuer().to_string(),
                    "crl_number": crl.crl_number_hex(),
                    "this_update": format_ts(crl.this_update()),
                    "next_update": crl.next_update().map(format_ts),
                    "revoked": crl.revoked_count(),
                    "fresh": fresh,
                    "signature_valid": signature_ok,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Issuer:       {}", crl.issuer());
                println!("CRL Number:   {}", crl.crl_number_hex().unwrap_or("-"));
                println!("This Update:  {}", format_ts(crl.this_update()));
                println!(
                    "Next Update:  {}",
                    crl.next_update().map_or("-".to_string(), format_ts)
                );
                println!("Revoked:      {}", crl.revoked_count());
                println!("Fresh:        {}", if fresh { "yes" } else { "no (stale)" });
                println!(
                    "Signature:    {}",
                    if signature_ok { "OK" } else { "FAIL" }
                );
            }
            if !signature_ok {
                std::process::exit(2);
            }
        }
        Commands::Check {
            file,
            header,
            json,
            failures_only,
            recurse,
        } => {
            let config = resolve_config(&cli.settings)?;
            let checker = CertificateChecker::from_config(&config)?;
            debug!(
                cas = checker.anchors().ca_count(),
                icas = checker.anchors().ica_count(),
                "Trust anchors loaded"
            );

            // Directory mode: check every certificate file in parallel
            if let Some(dir) = file.as_ref().filter(|p| p.is_dir()) {
                let files = find_cert_files(dir, *recurse);
                if files.is_empty() {
                    anyhow::bail!("No certificate files found in {}", dir.display());
                }
                let failures = run_batch(&files, *failures_only, |path| {
                    check_to_batch(&checker, path, *header)
                });
                if failures > 0 {
                    std::process::exit(2);
                }
                return Ok(());
            }

            // Single file mode
            let input = read_input(file.as_ref())?;
            let label = file
                .as_ref()
                .map_or("stdin".to_string(), |f| f.display().to_string());
            let cert = match load_certificate(&input, *header) {
                Ok(cert) => cert,
                Err(e) if *header => {
                    eprintln!("{}: FAIL, {}", label, e);
                    std::process::exit(2);
                }
                Err(e) => return Err(e),
            };

            if *json {
                let value = check_json(&checker, &cert);
                println!("{}", serde_json::to_string_pretty(&value)?);
                if value["valid"] != serde_json::Value::Bool(true) {
                    std::process::exit(2);
                }
            } else {
                let outcome = checker.inspect(&cert);
                if outcome.is_valid() {
                    println!("{}: {}", label, outcome);
                } else {
                    eprintln!("{}: {}", label, outcome);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}
