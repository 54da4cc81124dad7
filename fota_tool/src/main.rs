//! fota-tool - LoRaWAN firmware update signing CLI
//!
//! Provisions a product line, signs firmware images and diffs with a manifest trailer, reads
//! manifests back and renders signed updates as fragmentation packets.

#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use fota::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fota-tool")]
#[command(about = "Sign and fragment firmware updates for LoRaWAN FUOTA")]
#[command(version)]
struct Cli {
    /// Configuration file (keys folder, external tools)
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the signing key pair and the device identity
    CreateKeypair {
        /// Your domain (f.e. example.com)
        #[arg(short, long = "domain-name")]
        domain_name: String,

        /// Device model (f.e. awesome-2000)
        #[arg(short, long)]
        model: String,
    },

    /// Sign a full firmware image
    SignBinary {
        /// Binary to sign
        #[arg(short, long)]
        binary: PathBuf,

        #[command(flatten)]
        output: SignedOutput,
    },

    /// Sign a diff generated between two firmware images
    SignDelta {
        /// Old binary to generate diff from
        #[arg(long)]
        old: PathBuf,

        /// New binary to generate diff from
        #[arg(long)]
        new: PathBuf,

        #[command(flatten)]
        output: SignedOutput,
    },

    /// Sign a diff produced by an external pipeline
    SignExternalDelta {
        /// Old binary the diff applies to
        #[arg(long)]
        old: PathBuf,

        /// New binary the diff produces
        #[arg(long)]
        new: PathBuf,

        /// Input delta file
        #[arg(short, long = "in-file")]
        in_file: PathBuf,

        /// Output file
        #[arg(short, long = "out-file")]
        out_file: PathBuf,

        /// Use now as version, instead of date the binary was created
        #[arg(long)]
        override_version: bool,
    },

    /// Print the manifest at the end of a signed file
    ReadManifest {
        /// File to read manifest from
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Create fragmentation packets from a signed file
    CreateFragPackets {
        /// Input file
        #[arg(short, long = "in-file")]
        in_file: PathBuf,

        /// Output format
        #[arg(short = 'f', long, value_enum)]
        output_format: PacketFormat,

        /// Output file
        #[arg(short, long = "out-file")]
        out_file: PathBuf,

        /// Fragmentation size
        #[arg(long)]
        frag_size: u16,

        /// Number of redundancy packets
        #[arg(long)]
        redundancy_packets: u16,
    },

    /// Derive the multicast root key from a device root key
    DeriveMcKey {
        /// Device root key, 32 hex characters
        #[arg(long)]
        root_key: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::CreateKeypair { .. } => "create-keypair",
            Self::SignBinary { .. } => "sign-binary",
            Self::SignDelta { .. } => "sign-delta",
            Self::SignExternalDelta { .. } => "sign-external-delta",
            Self::ReadManifest { .. } => "read-manifest",
            Self::CreateFragPackets { .. } => "create-frag-packets",
            Self::DeriveMcKey { .. } => "derive-mc-key",
        }
    }
}

#[derive(clap::Args)]
struct SignedOutput {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = SignedFormat::Bin)]
    output_format: SignedFormat,

    /// Output file
    #[arg(short, long = "out-file")]
    out_file: PathBuf,

    /// Fragmentation size (only when output-format is set to packets-*)
    #[arg(long)]
    frag_size: Option<u16>,

    /// Number of redundancy packets (only when output-format is set to packets-*)
    #[arg(long)]
    redundancy_packets: Option<u16>,

    /// Use now as version, instead of date the binary was created
    #[arg(long)]
    override_version: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SignedFormat {
    Bin,
    PacketsPlain,
    PacketsH,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PacketFormat {
    Plain,
    H,
}

impl From<SignedFormat> for OutputFormat {
    fn from(format: SignedFormat) -> Self {
        match format {
            SignedFormat::Bin => OutputFormat::Bin,
            SignedFormat::PacketsPlain => OutputFormat::PacketsPlain,
            SignedFormat::PacketsH => OutputFormat::PacketsH,
        }
    }
}

impl From<PacketFormat> for OutputFormat {
    fn from(format: PacketFormat) -> Self {
        match format {
            PacketFormat::Plain => OutputFormat::PacketsPlain,
            PacketFormat::H => OutputFormat::PacketsH,
        }
    }
}

impl SignedOutput {
    fn fragmentation(&self) -> Option<(u16, u16)> {
        self.frag_size.zip(self.redundancy_packets)
    }

    fn write(&self, tool: &UpdateTool, signed: Vec<u8>) -> Result<()> {
        let rendered = tool.render(signed, self.output_format.into(), self.fragmentation())?;
        write_output(&self.out_file, &rendered)
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fota={log_level},fota_tool={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(e) = execute_command(&cli) {
        print_error(&e);
        std::process::exit(1);
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    let config = FotaConfig::load_or_default(&cli.config)?;
    tracing::debug!(
        path = %cli.config.display(),
        keys_dir = %config.keys_dir.display(),
        command = cli.command.name(),
        "loaded configuration"
    );

    match &cli.command {
        Commands::CreateKeypair { domain_name, model } => {
            UpdateTool::provision(&config, domain_name, model)?;
            Ok(())
        }
        Commands::SignBinary { binary, output } => {
            let tool = UpdateTool::from_config(config);
            let signed = tool.sign_full_image(binary, output.override_version)?;
            output.write(&tool, signed)
        }
        Commands::SignDelta { old, new, output } => {
            let tool = UpdateTool::from_config(config);
            let signed = tool.sign_generic_diff(old, new, output.override_version)?;
            output.write(&tool, signed)
        }
        Commands::SignExternalDelta {
            old,
            new,
            in_file,
            out_file,
            override_version,
        } => {
            let tool = UpdateTool::from_config(config);
            let signed = tool.sign_external_diff(old, new, in_file, *override_version)?;
            write_output(out_file, &signed)
        }
        Commands::ReadManifest { input } => {
            let manifest = UpdateTool::read_manifest(input)?;
            println!("{}", describe_manifest(&manifest));
            Ok(())
        }
        Commands::CreateFragPackets {
            in_file,
            output_format,
            out_file,
            frag_size,
            redundancy_packets,
        } => {
            let tool = UpdateTool::from_config(config);
            let payload = read_input(in_file)?;
            let framed = tool.create_fragments(&payload, *frag_size, *redundancy_packets)?;
            let rendered = render_packets((*output_format).into(), &framed)?;
            write_output(out_file, rendered.as_bytes())
        }
        Commands::DeriveMcKey { root_key } => {
            let root_key = hex::decode(root_key.trim())?;
            let mc_root_key = derive_multicast_root_key_from_slice(&root_key)?;
            println!("{}", bytes_to_hex(&mc_root_key));
            Ok(())
        }
    }
}

/// Prints the error chain, and for failed external tools everything they printed.
fn print_error(e: &anyhow::Error) {
    eprintln!("Error: {e:#}");

    if let Some(FotaError::EncoderInvocationFailed { stdout, stderr, .. }) = e.downcast_ref::<FotaError>() {
        if !stdout.is_empty() {
            eprintln!("{stdout}");
        }
        if !stderr.is_empty() {
            eprintln!("{stderr}");
        }
    }
}
