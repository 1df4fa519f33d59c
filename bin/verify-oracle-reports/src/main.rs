// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Tool to verify oracle attestation reports against a trust policy

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use oracle_attest::{
    batch::{BatchVerifier, VerifyReportsResponse},
    decode::{decode_user_data, DecodeProofDataRequest, DecodeProofDataResponse},
    info::InfoResponse,
    log::{setup_logging, LogLevelParser},
    nitro::NitroVerifier,
    policy::VerifierConfig,
    report::TeeVerifier,
    session::SessionProvider,
    sgx::{DcapQuoteVerifier, SgxVerifier},
};
use serde::Deserialize;
use std::{fs, io::Read, path::PathBuf, str::FromStr};
use tracing::{info, level_filters::LevelFilter, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Oracle attestation report verifier", long_about = None)]
struct Arguments {
    /// Log level for the log output.
    /// Valid values are: `off`, `error`, `warn`, `info`, `debug`, `trace`
    #[arg(long, default_value_t = LevelFilter::WARN, value_parser = LogLevelParser)]
    log_level: LevelFilter,
    /// Trust policy configuration file
    #[arg(long, env = "ORACLE_VERIFIER_POLICY")]
    policy: PathBuf,
    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Subcommand, Debug)]
enum SubCommands {
    /// Verify a batch of reports and print the verification response
    Verify {
        /// JSON file with the reports, `-` for stdin
        #[arg(default_value = "-")]
        reports: ArgSource,
    },
    /// Print the configured targets in hex, base64 and Aleo encoding
    Info,
    /// Decode the proof data behind the `userData` of a report
    Decode {
        /// JSON file with `{"userData": ...}`, `-` for stdin
        #[arg(default_value = "-")]
        input: ArgSource,
    },
    /// Verify an SGX quote and print its content without applying the policy
    DecodeQuote {
        /// JSON file with `{"quote": <base64>}`, `-` for stdin
        #[arg(default_value = "-")]
        input: ArgSource,
    },
}

#[derive(Debug, Clone)]
enum ArgSource {
    File(PathBuf),
    Stdin,
}

impl FromStr for ArgSource {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" => Ok(ArgSource::Stdin),
            _ => Ok(ArgSource::File(PathBuf::from(s))),
        }
    }
}

/// `{ "reports": [...] }` or a bare array of reports
#[derive(Deserialize)]
#[serde(untagged)]
enum VerifyReportsRequest {
    Wrapped { reports: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl VerifyReportsRequest {
    fn into_reports(self) -> Vec<serde_json::Value> {
        match self {
            Self::Wrapped { reports } | Self::Bare(reports) => reports,
        }
    }
}

#[derive(Deserialize)]
struct DecodeQuoteRequest {
    quote: String,
}

fn read_source(source: &ArgSource, what: &str) -> Result<Vec<u8>> {
    match source {
        ArgSource::File(path) => fs::read(path)
            .with_context(|| format!("Failed to read {what} from {}", path.display())),
        ArgSource::Stdin => {
            let mut content = Vec::new();
            std::io::stdin()
                .read_to_end(&mut content)
                .with_context(|| format!("Failed to read {what} from stdin"))?;
            Ok(content)
        }
    }
}

fn read_reports(source: &ArgSource) -> Result<Vec<serde_json::Value>> {
    let content = read_source(source, "reports")?;
    let request: VerifyReportsRequest =
        serde_json::from_slice(&content).context("Failed to parse the reports request")?;
    Ok(request.into_reports())
}

fn verify(config: &VerifierConfig, source: &ArgSource) -> Result<()> {
    let policy = config.trust_policy()?;
    let nitro = match config.nitro_root_certificate()? {
        Some(root) => Some(
            NitroVerifier::new(&root).context("Failed to load the Nitro root certificate")?,
        ),
        None => {
            warn!("No Nitro root certificate configured, Nitro reports will be rejected");
            None
        }
    };
    let verifier = BatchVerifier::new(
        config.session_provider()?,
        TeeVerifier::new(SgxVerifier::new(DcapQuoteVerifier::default()), nitro),
        policy,
        config.engine,
    );

    let reports = read_reports(source)?;
    info!("Verifying {} reports", reports.len());
    let response = VerifyReportsResponse::from(
        verifier
            .verify_batch(&reports)
            .context("Failed to verify the reports")?,
    );
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        bail!("{} of {} reports are not valid", reports.len() - response.valid_reports.len(), reports.len());
    }
    Ok(())
}

fn print_info(config: &VerifierConfig) -> Result<()> {
    let policy = config.trust_policy()?;
    let response = InfoResponse::new(&policy, &config.live_check_program, chrono::Utc::now());
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn decode(config: &VerifierConfig, source: &ArgSource) -> Result<()> {
    let content = read_source(source, "the decode request")?;
    let request: DecodeProofDataRequest =
        serde_json::from_slice(&content).context("Failed to parse the decode request")?;
    let session = config.session_provider()?.open_session()?;

    let response = DecodeProofDataResponse::from(decode_user_data(&session, &request.user_data));
    println!("{}", serde_json::to_string_pretty(&response)?);
    if let Some(message) = response.error_message {
        bail!(message);
    }
    Ok(())
}

fn decode_quote(source: &ArgSource) -> Result<()> {
    let content = read_source(source, "the decode request")?;
    let request: DecodeQuoteRequest =
        serde_json::from_slice(&content).context("Failed to parse the decode request")?;
    let quote = STANDARD
        .decode(request.quote.trim())
        .context("Failed to decode the quote as base64")?;

    let report = SgxVerifier::new(DcapQuoteVerifier::default())
        .decode_quote(&quote)
        .context("Failed to verify the quote")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Arguments::parse();
    setup_logging(env!("CARGO_CRATE_NAME"), &args.log_level)?;

    let config = VerifierConfig::load(&args.policy)?;
    info!("Expecting SGX unique ID: {}", config.sgx.unique_id);
    info!("Expecting Nitro PCR values: {}", config.nitro.pcrs.join(", "));

    match &args.command {
        SubCommands::Verify { reports } => verify(&config, reports),
        SubCommands::Info => print_info(&config),
        SubCommands::Decode { input } => decode(&config, input),
        SubCommands::DecodeQuote { input } => decode_quote(input),
    }
}
