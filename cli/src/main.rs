mod wav;

use clap::{Parser, Subcommand};
use sonicmesh_core::{Decoder, Encoder, ModemConfig, Reception, SyncMethod};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sonicmesh")]
#[command(about = "Near-ultrasonic acoustic modem for text messages and files")]
struct Cli {
    /// Modem configuration as JSON; missing fields keep their defaults.
    /// Sender and receiver must use the same one.
    #[arg(short, long, global = true, value_name = "CONFIG.JSON")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file (compressed) to a WAV recording
    Encode {
        /// Input file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output WAV file
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,
    },

    /// Encode a short text message to a WAV recording
    EncodeText {
        /// Message to send; must fit in one packet
        message: String,

        /// Output WAV file
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,
    },

    /// Decode a WAV recording back to the original file
    Decode {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Output file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Decode a WAV recording carrying a text message
    DecodeText {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Encode { input, output } => encode_command(config, &input, &output)?,
        Commands::EncodeText { message, output } => {
            encode_text_command(config, &message, &output)?
        }
        Commands::Decode { input, output } => decode_command(config, &input, &output)?,
        Commands::DecodeText { input } => decode_text_command(config, &input)?,
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config)?),
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ModemConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let config: ModemConfig = serde_json::from_str(&json)?;
            log::info!("loaded configuration from {}", path.display());
            config
        }
        None => ModemConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn encode_command(
    config: ModemConfig,
    input_path: &Path,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input_path)?;
    println!("Read {} bytes from {}", data.len(), input_path.display());

    let sample_rate = config.sample_rate;
    let encoder = Encoder::new(config)?;
    let samples = encoder.encode(&data)?;
    println!(
        "Encoded to {} samples ({:.2}s)",
        samples.len(),
        samples.len() as f64 / sample_rate as f64
    );

    wav::write_wav(output_path, &samples, sample_rate)?;
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn encode_text_command(
    config: ModemConfig,
    message: &str,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let sample_rate = config.sample_rate;
    let encoder = Encoder::new(config)?;
    let samples = encoder.encode_text(message)?;
    println!(
        "Encoded {}-byte message to {} samples ({:.2}s)",
        message.len(),
        samples.len(),
        samples.len() as f64 / sample_rate as f64
    );

    wav::write_wav(output_path, &samples, sample_rate)?;
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn receive(
    decoder: &Decoder,
    input_path: &Path,
) -> Result<Reception, Box<dyn std::error::Error>> {
    let samples = wav::read_wav(input_path, decoder.config().sample_rate)?;
    println!("Read {} samples from {}", samples.len(), input_path.display());

    let reception = decoder.receive(&samples)?;
    let method = match reception.sync.method {
        SyncMethod::SymbolAligned => "symbol aligned",
        SyncMethod::BitSearch => "bit search",
    };
    println!(
        "Sync at bit {} (phase {}, {})",
        reception.sync.position, reception.sync.bit_offset, method
    );
    println!(
        "Packets: {} accepted, {} rejected{}",
        reception.report.accepted(),
        reception.report.rejected,
        if reception.report.truncated { ", stream truncated" } else { "" }
    );
    Ok(reception)
}

fn decode_command(
    config: ModemConfig,
    input_path: &Path,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let decoder = Decoder::new(config)?;
    let reception = receive(&decoder, input_path)?;

    let data = decoder.decompress(&reception.report)?;
    println!("Decoded {} bytes", data.len());

    std::fs::write(output_path, &data)?;
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn decode_text_command(
    config: ModemConfig,
    input_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let decoder = Decoder::new(config)?;
    let reception = receive(&decoder, input_path)?;

    let message = decoder.text(&reception.report)?;
    println!("Message: {}", message);
    Ok(())
}
