//! Prisma CLI - Command line interface for the encryption layer.
//!
//! Encrypts and decrypts stdin with an AES session and derives or checks
//! encoded PBKDF2 keys.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroize;

use prisma_crypto::{
    random_bytes, AesSize, CipherConfig, DerivedKey, EncryptingWriter, HashFunction, SecureAes,
    SecureCipher, BLOCK_SIZE, IV_SIZE, TAG_SIZE,
};

#[derive(Parser)]
#[command(name = "prisma-aes")]
#[command(about = "Prisma - AES sessions with integrity tags")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// JSON file holding a cipher configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt stdin.
    Encrypt {
        #[command(flatten)]
        key: KeyArgs,

        /// Encoding of the ciphertext written to stdout.
        #[arg(long, value_enum, default_value_t = Format::Hex)]
        output_format: Format,
    },

    /// Decrypt stdin and verify its tag.
    Decrypt {
        #[command(flatten)]
        key: KeyArgs,

        /// Hex of the IV followed by the tag, as printed by `encrypt`.
        #[arg(long)]
        tag_iv: String,

        /// Encoding of the ciphertext read from stdin.
        #[arg(long, value_enum, default_value_t = Format::Hex)]
        input_format: Format,
    },

    /// Derive and verify encoded PBKDF2 keys.
    Kdf {
        #[command(subcommand)]
        command: KdfCommands,
    },
}

#[derive(Subcommand)]
enum KdfCommands {
    /// Derive a key and print its encoded form.
    Derive {
        /// Passphrase (prompted when omitted).
        #[arg(long)]
        passphrase: Option<String>,

        /// Iteration count (default: from config).
        #[arg(long)]
        iterations: Option<u32>,

        /// Output length in bytes.
        #[arg(long, default_value_t = 32)]
        length: usize,

        /// Hash function: "sha256" or "sha512" (default: from config).
        #[arg(long)]
        hash: Option<String>,

        /// Print base64 of the binary encoding instead of the string form.
        #[arg(long)]
        binary: bool,
    },

    /// Check a passphrase against an encoded key.
    Verify {
        /// String form, or base64 of the binary form.
        #[arg(long)]
        encoded: String,

        /// Passphrase (prompted when omitted).
        #[arg(long)]
        passphrase: Option<String>,
    },
}

#[derive(clap::Args)]
struct KeyArgs {
    /// Passphrase the session key is derived from.
    #[arg(long, conflicts_with = "key_hex")]
    key: Option<String>,

    /// Raw AES key as hex (16, 24 or 32 bytes).
    #[arg(long)]
    key_hex: Option<String>,

    /// AES key size in bits (default: from config).
    #[arg(long, value_parser = ["128", "192", "256"])]
    aes_size: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Hex,
    Base64,
    Raw,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Encrypt { key, output_format } => cmd_encrypt(&config, &key, output_format),

        Commands::Decrypt {
            key,
            tag_iv,
            input_format,
        } => cmd_decrypt(&config, &key, &tag_iv, input_format),

        Commands::Kdf { command } => match command {
            KdfCommands::Derive {
                passphrase,
                iterations,
                length,
                hash,
                binary,
            } => cmd_kdf_derive(&config, passphrase, iterations, length, hash.as_deref(), binary),

            KdfCommands::Verify {
                encoded,
                passphrase,
            } => cmd_kdf_verify(&encoded, passphrase),
        },
    }
}

/// Load the cipher configuration, falling back to defaults.
fn load_config(path: Option<&Path>) -> Result<CipherConfig> {
    let Some(path) = path else {
        return Ok(CipherConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: CipherConfig = serde_json::from_str(&json).context("Invalid config file")?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Prompt for passphrase securely.
fn prompt_passphrase(prompt: &str) -> Result<Vec<u8>> {
    let passphrase = rpassword::prompt_password(prompt).context("Failed to read passphrase")?;
    Ok(passphrase.into_bytes())
}

fn passphrase_or_prompt(passphrase: Option<String>) -> Result<Vec<u8>> {
    match passphrase {
        Some(p) => Ok(p.into_bytes()),
        None => prompt_passphrase("Enter passphrase: "),
    }
}

/// Build a session from the key arguments.
///
/// A raw key uses `iv`, or a fresh random IV when none is given. A
/// passphrase derives the key through the configured KDF.
fn open_session(config: &CipherConfig, args: &KeyArgs, iv: Option<[u8; IV_SIZE]>) -> Result<SecureAes> {
    let mut config = config.clone();
    if let Some(bits) = &args.aes_size {
        config = config.with_aes_size(AesSize::from_bits(bits.parse()?)?);
    }

    if let Some(key_hex) = &args.key_hex {
        let mut key = hex::decode(key_hex.trim()).context("Key is not valid hex")?;
        let iv = match iv {
            Some(iv) => iv,
            None => to_iv(&random_bytes(IV_SIZE)?)?,
        };
        let session = SecureAes::from_raw_key(&key, iv);
        key.zeroize();
        return Ok(session?);
    }

    let mut passphrase = match &args.key {
        Some(key) => key.clone().into_bytes(),
        None => prompt_passphrase("Enter key: ")?,
    };
    let session = SecureAes::with_config(&passphrase, &config);
    passphrase.zeroize();
    let mut session = session?;
    if let Some(iv) = iv {
        session.set_iv(&iv)?;
    }
    Ok(session)
}

fn to_iv(bytes: &[u8]) -> Result<[u8; IV_SIZE]> {
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("IV must be {} bytes, got {}", IV_SIZE, bytes.len()))
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_block(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Whether an unpadded final byte would be taken for a padding length.
fn looks_like_padding(last_byte: u8) -> bool {
    usize::from(last_byte) <= BLOCK_SIZE
}

fn encode(bytes: &[u8], format: Format) -> Vec<u8> {
    match format {
        Format::Hex => format!("{}\n", hex::encode(bytes)).into_bytes(),
        Format::Base64 => format!("{}\n", STANDARD.encode(bytes)).into_bytes(),
        Format::Raw => bytes.to_vec(),
    }
}

fn decode(input: &[u8], format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Hex => {
            let text = std::str::from_utf8(input).context("Hex input is not UTF-8")?;
            hex::decode(text.trim()).context("Input is not valid hex")
        }
        Format::Base64 => {
            let text = std::str::from_utf8(input).context("Base64 input is not UTF-8")?;
            STANDARD
                .decode(text.trim())
                .context("Input is not valid base64")
        }
        Format::Raw => Ok(input.to_vec()),
    }
}

/// Encrypt stdin block by block.
fn cmd_encrypt(config: &CipherConfig, args: &KeyArgs, output_format: Format) -> Result<()> {
    let mut session = open_session(config, args, None)?;
    info!("Encrypting with {}", session.aes_size());
    let iv = session.iv().to_vec();

    let mut stdin = io::stdin().lock();
    let mut writer = EncryptingWriter::new(&mut session, Vec::new());
    let mut block = [0u8; BLOCK_SIZE];
    let mut last_full_block_byte = None;
    loop {
        let n = read_block(&mut stdin, &mut block).context("Failed to read input")?;
        writer
            .write_chunk(&block[..n])
            .context("Failed to encrypt input")?;
        if n < BLOCK_SIZE {
            if n > 0 {
                last_full_block_byte = None;
            }
            break;
        }
        last_full_block_byte = Some(block[BLOCK_SIZE - 1]);
    }
    block.zeroize();
    if last_full_block_byte.is_some_and(looks_like_padding) {
        warn!(
            "Input ends on a block boundary with a trailing byte that reads as padding; \
             decryption will not return it intact"
        );
    }

    let mut ciphertext = writer.close().context("Failed to finish encryption")?;
    let tag = ciphertext.split_off(ciphertext.len() - TAG_SIZE);
    session.dispose()?;

    io::stdout()
        .write_all(&encode(&ciphertext, output_format))
        .context("Failed to write output")?;
    eprintln!("{}{}", hex::encode(&iv), hex::encode(&tag));
    Ok(())
}

/// Decrypt stdin, writing plaintext only when the tag matches.
fn cmd_decrypt(config: &CipherConfig, args: &KeyArgs, tag_iv: &str, input_format: Format) -> Result<()> {
    let trailer = hex::decode(tag_iv.trim()).context("Tag/IV is not valid hex")?;
    if trailer.len() != IV_SIZE + TAG_SIZE {
        anyhow::bail!(
            "Tag/IV must be {} bytes, got {}",
            IV_SIZE + TAG_SIZE,
            trailer.len()
        );
    }
    let iv = to_iv(&trailer[..IV_SIZE])?;

    let mut input = Vec::new();
    io::stdin()
        .lock()
        .read_to_end(&mut input)
        .context("Failed to read input")?;
    let mut packed = decode(&input, input_format)?;
    packed.extend_from_slice(&trailer);

    let mut session = open_session(config, args, Some(iv))?;
    info!("Decrypting {} bytes with {}", packed.len() - trailer.len(), session.aes_size());
    let plaintext = session
        .decrypt_from_bytes(&packed)
        .context("Decryption failed")?;
    session.dispose()?;

    io::stdout()
        .write_all(&plaintext)
        .context("Failed to write output")?;
    Ok(())
}

/// Derive a key and print its encoding.
fn cmd_kdf_derive(
    config: &CipherConfig,
    passphrase: Option<String>,
    iterations: Option<u32>,
    length: usize,
    hash: Option<&str>,
    binary: bool,
) -> Result<()> {
    let hash_function = match hash {
        Some(name) => name.parse::<HashFunction>()?,
        None => config.kdf_hash,
    };
    let iterations = iterations.unwrap_or(config.kdf_iterations);

    let mut passphrase = passphrase_or_prompt(passphrase)?;
    let derived = DerivedKey::derive(&passphrase, iterations, length, hash_function);
    passphrase.zeroize();
    let derived = derived.context("Key derivation failed")?;
    debug!("Derived {:?}", derived);

    if binary {
        println!("{}", STANDARD.encode(derived.serialize_to_bytes()));
    } else {
        println!("{}", derived.serialize_to_string());
    }
    Ok(())
}

/// Verify a passphrase against an encoded key.
fn cmd_kdf_verify(encoded: &str, passphrase: Option<String>) -> Result<()> {
    let encoded = encoded.trim();
    let derived = if encoded.starts_with('$') {
        DerivedKey::parse_from_string(encoded)?
    } else {
        let bytes = STANDARD
            .decode(encoded)
            .context("Encoded key is neither the string form nor base64")?;
        DerivedKey::parse_from_bytes(&bytes)?
    };

    let mut passphrase = passphrase_or_prompt(passphrase)?;
    let matches = derived.verify(&passphrase);
    passphrase.zeroize();

    if !matches {
        anyhow::bail!("Passphrase does not match");
    }
    println!("Passphrase matches.");
    Ok(())
}
