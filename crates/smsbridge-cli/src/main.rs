use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::{Parser, Subcommand};
use tracing::info;

use smsbridge_bridge::{BridgeManifest, Localization, KEY_REPLY_PROMPT};
use smsbridge_protocol::{
    ContentGeneration, ContentRecord, Envelope, MarkerTable, ReplyEnvelope, ReplyGeneration,
    Version,
};

mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "smsbridge", about = "SMS bridge payload inspection tool")]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Locale for reply prompts, overrides config
    #[arg(long)]
    locale: Option<String>,

    /// Path to the bridge manifest (JSON), overrides config
    #[arg(long)]
    manifest: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the version and payload kind of a base64 payload
    Classify {
        /// Base64-encoded SMS payload
        payload: String,
    },
    /// Decode a base64 payload into its envelope fields
    Decode {
        /// Base64-encoded SMS payload
        payload: String,
    },
    /// Decode a decrypted content record
    Content {
        /// Base64-encoded decrypted plaintext
        plaintext: String,

        /// Envelope version the record arrived under (legacy, v1..v4)
        #[arg(long, default_value = "v1")]
        version: String,
    },
    /// Parse a reply SMS text back into its envelope
    Reply {
        /// Full reply SMS text, or a path prefixed with '@'
        text: String,

        /// Reply wire generation (legacy or current)
        #[arg(long, default_value = "current")]
        generation: String,
    },
    /// List the bridges in the manifest
    Bridges,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smsbridge=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file: {}", config_path))?;
        toml::from_str(&content)?
    } else {
        CliConfig::default()
    };

    if let Some(locale) = args.locale {
        config.locale = locale;
    }
    if let Some(manifest) = args.manifest {
        config.manifest_path = Some(manifest);
    }

    let markers = MarkerTable::new(config.markers.iter().copied())
        .context("invalid marker list in configuration")?;

    match args.command {
        Commands::Classify { payload } => classify(&payload, &markers),
        Commands::Decode { payload } => decode(&payload, &markers),
        Commands::Content { plaintext, version } => content(&plaintext, &version),
        Commands::Reply { text, generation } => reply(&text, &generation, &config),
        Commands::Bridges => bridges(&config),
    }
}

fn classify(payload: &str, markers: &MarkerTable) -> Result<()> {
    let bytes = BASE64.decode(payload).context("payload is not valid base64")?;
    let (version, kind) = markers.classify(&bytes)?;
    println!("version: {:?}", version);
    println!("kind:    {:?}", kind);
    Ok(())
}

fn decode(payload: &str, markers: &MarkerTable) -> Result<()> {
    let envelope = Envelope::from_base64(payload, markers)?;
    println!("version: {:?}", envelope.version());
    println!("kind:    {:?}", envelope.payload_kind());
    match &envelope {
        Envelope::AuthRequest { public_key } => {
            println!("public_key: {}", BASE64.encode(public_key));
        }
        Envelope::AuthCode { auth_code } => {
            println!("auth_code: {}", auth_code);
        }
        Envelope::AuthCodeWithContent { auth_code, .. } => {
            println!("auth_code: {}", auth_code);
        }
        Envelope::AuthRequestWithContent {
            public_key,
            server_key_id,
            ..
        } => {
            println!("public_key:    {}", BASE64.encode(public_key));
            println!("server_key_id: {}", server_key_id);
        }
        Envelope::LegacyContent { .. } | Envelope::Content { .. } => {}
    }
    if let Some(letter) = envelope.bridge_letter() {
        println!("bridge_letter: {}", letter);
    }
    if let Some(language) = envelope.language() {
        println!("language: {}", language);
    }
    if let Some(ciphertext) = envelope.ciphertext() {
        println!("ciphertext: {} bytes", ciphertext.len());
    }
    Ok(())
}

fn content(plaintext: &str, version: &str) -> Result<()> {
    let bytes = BASE64
        .decode(plaintext)
        .context("plaintext is not valid base64")?;
    let generation = ContentGeneration::for_version(parse_version(version)?);
    let record = ContentRecord::decode(&bytes, generation)?;
    print_field("from", &record.from);
    print_field("to", &record.to);
    print_field("cc", &record.cc);
    print_field("bcc", &record.bcc);
    print_field("subject", &record.subject);
    print_field("body", &record.body);
    if let Some(image) = &record.image {
        println!(
            "image: session {} segment {}/{} ({} bytes)",
            image.session,
            image.segment.index + 1,
            image.segment.total,
            image.data.len()
        );
    }
    Ok(())
}

fn print_field(name: &str, value: &Option<String>) {
    match value {
        Some(v) => println!("{}: {:?}", name, v),
        None => println!("{}: (absent)", name),
    }
}

fn reply(text: &str, generation: &str, config: &CliConfig) -> Result<()> {
    let text = if let Some(path) = text.strip_prefix('@') {
        fs::read_to_string(path).with_context(|| format!("failed to read reply text: {}", path))?
    } else {
        text.to_owned()
    };
    let generation = parse_reply_generation(generation)?;
    let (envelope, timestamp) = ReplyEnvelope::from_sms_text(&text, generation)?;

    let locale = load_locale(config)?;
    info!(
        locale = locale.active(),
        prompt = locale.translate(KEY_REPLY_PROMPT)?,
        "expected prompt for this deployment"
    );

    println!("bridge_letter: {}", envelope.bridge_letter);
    println!(
        "lengths: address={} sender={} cc={} bcc={} subject={} body={}",
        envelope.lengths.address,
        envelope.lengths.sender,
        envelope.lengths.cc,
        envelope.lengths.bcc,
        envelope.lengths.subject,
        envelope.lengths.body
    );
    println!("ciphertext: {} bytes", envelope.ciphertext.len());
    match timestamp {
        Some(ts) => println!("timestamp: {}", ts),
        None => println!("timestamp: (absent)"),
    }
    Ok(())
}

fn bridges(config: &CliConfig) -> Result<()> {
    let Some(path) = &config.manifest_path else {
        bail!("no bridge manifest configured; pass --manifest or set manifest_path");
    };
    let manifest = BridgeManifest::load_from_file(Path::new(path))
        .with_context(|| format!("failed to load manifest: {}", path))?;
    for entry in manifest.entries() {
        println!("{}  {:<12} {}", entry.letter, entry.shortcode, entry.name);
    }
    Ok(())
}

fn load_locale(config: &CliConfig) -> Result<Localization> {
    let mut locale = if let Some(path) = &config.locale_path {
        Localization::load_from_file(Path::new(path))
            .with_context(|| format!("failed to load locale file: {}", path))?
    } else {
        Localization::builtin()
    };
    locale
        .set_locale(&config.locale)
        .with_context(|| format!("locale '{}' is not available", config.locale))?;
    Ok(locale)
}

fn parse_version(s: &str) -> Result<Version> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "legacy" | "v0" => Version::LegacyV0,
        "v1" => Version::V1,
        "v2" => Version::V2,
        "v3" => Version::V3,
        "v4" => Version::V4,
        other => bail!("unknown version '{}'; expected legacy or v1..v4", other),
    })
}

fn parse_reply_generation(s: &str) -> Result<ReplyGeneration> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "legacy" => ReplyGeneration::Legacy,
        "current" => ReplyGeneration::Current,
        other => bail!("unknown reply generation '{}'", other),
    })
}
