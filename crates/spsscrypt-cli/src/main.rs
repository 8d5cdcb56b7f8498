//! spsscrypt: inspect and decrypt SPSS encrypted files
//!
//! Commands:
//!   probe <file>                  - is this an encrypted container, and of what
//!   decrypt <input> <output|->    - write the plaintext (password, list, or search)
//!   encode-password <plaintext>   - SPSS encoded form of a password
//!   decode-password <encoded>     - plaintext of an encoded password
//!   config show                   - display current configuration

mod search;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use spsscrypt_core::config::SpssCryptConfig;
use spsscrypt_crypto::{decode_password, EncodedPassword};
use spsscrypt_reader::{EncryptedFile, EncryptedReader, FileType, OpenError, HEADER_SIZE};

use search::{brute_force, brute_force_total, expand_alphabet, find_password, SearchOptions};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "spsscrypt",
    version,
    about = "Read SPSS encrypted files",
    long_about = "spsscrypt: probe, unlock, and decrypt SPSS encrypted data (.sav), viewer (.spv), and syntax (.sps) files"
)]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "SPSSCRYPT_CONFIG",
        default_value = "~/.config/spsscrypt/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "SPSSCRYPT_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "SPSSCRYPT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report whether a file is an SPSS encrypted container
    ///
    /// Exits with status 1 if the file is readable but not encrypted.
    Probe {
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decrypt an encrypted file to OUTPUT ("-" for stdout)
    ///
    /// Without -p, --password-list, or -a/-l, the password is read from
    /// SPSSCRYPT_PASSWORD or prompted for.
    Decrypt {
        input: PathBuf,
        output: PathBuf,

        /// Password, plain or SPSS-encoded; with -a/-l, where the search starts
        #[arg(long, short = 'p', env = "SPSSCRYPT_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Try every line of FILE ("-" for stdin) as a literal password
        #[arg(long, value_name = "FILE", conflicts_with_all = ["alphabet", "length"])]
        password_list: Option<PathBuf>,

        /// Characters for the brute-force search; `a-z` style ranges allowed
        #[arg(long = "password-alphabet", short = 'a')]
        alphabet: Option<String>,

        /// Longest password the brute-force search tries
        #[arg(long = "password-length", short = 'l')]
        length: Option<usize>,

        /// Replace OUTPUT if it exists
        #[arg(long)]
        overwrite: bool,
    },

    /// Print an SPSS encoded form of a password
    #[command(name = "encode-password")]
    EncodePassword {
        plaintext: String,
        /// Print encoding number N instead of a random one
        #[arg(long, value_name = "N", conflicts_with = "count")]
        variant: Option<u64>,
        /// Print how many encodings exist
        #[arg(long)]
        count: bool,
    },

    /// Print the plaintext of an SPSS encoded password
    #[command(name = "decode-password")]
    DecodePassword { encoded: String },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path)?;

    let level = cli.log.as_deref().unwrap_or(&config.logging.level);
    let format = cli.log_format.clone().unwrap_or(match config.logging.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(level, &format);

    debug!(version = env!("CARGO_PKG_VERSION"), config = %config_path.display(), "spsscrypt starting");

    match cli.command {
        Commands::Probe { file, json } => cmd_probe(&file, json),
        Commands::Decrypt {
            input,
            output,
            password,
            password_list,
            alphabet,
            length,
            overwrite,
        } => {
            let source = PasswordSource::select(password, password_list, alphabet, length, &config);
            cmd_decrypt(&config, &input, &output, source, overwrite)
        }
        Commands::EncodePassword { plaintext, variant, count } => {
            cmd_encode_password(&plaintext, variant, count)
        }
        Commands::DecodePassword { encoded } => cmd_decode_password(&encoded),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stderr only: stdout may carry decrypted output
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<SpssCryptConfig> {
    SpssCryptConfig::load(path).with_context(|| format!("parsing config: {}", path.display()))
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )
    .map(|style| style.progress_chars("=>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{prefix:.bold} {spinner} {pos} tried {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `spsscrypt probe` ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ProbeReport {
    path: String,
    encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_type: Option<FileType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    type_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ciphertext_bytes: Option<u64>,
}

fn cmd_probe(path: &Path, json: bool) -> Result<()> {
    let report = match EncryptedFile::open(path) {
        Ok(file) => {
            let ciphertext_bytes = std::fs::metadata(path)
                .ok()
                .map(|meta| meta.len().saturating_sub(HEADER_SIZE as u64));
            ProbeReport {
                path: path.display().to_string(),
                encrypted: true,
                file_type: file.file_type(),
                type_tag: Some(String::from_utf8_lossy(file.header().type_tag()).into_owned()),
                ciphertext_bytes,
            }
        }
        Err(OpenError::NotEncrypted) => ProbeReport {
            path: path.display().to_string(),
            encrypted: false,
            file_type: None,
            type_tag: None,
            ciphertext_bytes: None,
        },
        Err(err) => return Err(err).with_context(|| format!("{}: probe failed", path.display())),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report).context("serializing report")?);
    } else {
        println!("file:       {}", report.path);
        println!("encrypted:  {}", if report.encrypted { "yes" } else { "no" });
        if let Some(tag) = &report.type_tag {
            match report.file_type {
                Some(ty) => println!("type:       {ty} ({tag})"),
                None => println!("type:       unknown ({tag})"),
            }
        }
        if let Some(n) = report.ciphertext_bytes {
            println!("ciphertext: {}", fmt_bytes(n));
        }
    }

    if !report.encrypted {
        std::process::exit(1);
    }
    Ok(())
}

// ── `spsscrypt decrypt` ───────────────────────────────────────────────────────

/// How `decrypt` obtains the password.
enum PasswordSource {
    /// Given, from SPSSCRYPT_PASSWORD, or prompted; tried literal then decoded
    Single(Option<SecretString>),
    /// Lines of a file or stdin, literal only
    List(PathBuf),
    /// Odometer search over an alphabet
    BruteForce {
        alphabet: Vec<u8>,
        start: Option<SecretString>,
        max_length: usize,
    },
}

impl PasswordSource {
    fn select(
        password: Option<String>,
        password_list: Option<PathBuf>,
        alphabet: Option<String>,
        length: Option<usize>,
        config: &SpssCryptConfig,
    ) -> Self {
        let password = password.map(SecretString::from);
        if let Some(list) = password_list {
            return PasswordSource::List(list);
        }
        if alphabet.is_some() || length.is_some() {
            let alphabet = alphabet.as_deref().unwrap_or(&config.search.alphabet);
            return PasswordSource::BruteForce {
                alphabet: expand_alphabet(alphabet),
                start: password,
                max_length: length.unwrap_or(config.search.max_length),
            };
        }
        PasswordSource::Single(password)
    }
}

fn cmd_decrypt(
    config: &SpssCryptConfig,
    input: &Path,
    output: &Path,
    source: PasswordSource,
    overwrite: bool,
) -> Result<()> {
    let file = match EncryptedFile::open(input) {
        Ok(file) => file,
        Err(OpenError::NotEncrypted) => bail!("{}: not an encrypted SPSS file", input.display()),
        Err(err) => return Err(err).with_context(|| format!("{}: cannot open", input.display())),
    };
    info!(input = %input.display(), file_type = ?file.file_type(), "opened encrypted file");

    let options = SearchOptions {
        batch: usize::try_from(config.search.progress_interval).unwrap_or(usize::MAX),
        parallel: config.search.parallel,
    };

    let reader = match source {
        PasswordSource::Single(password) => {
            let password = match password {
                Some(password) => password,
                None => SecretString::from(
                    rpassword::prompt_password("password: ").context("reading password")?,
                ),
            };
            file.unlock(password.expose_secret().as_bytes())
                .map_err(|_| anyhow::anyhow!("sorry, wrong password"))?
        }
        PasswordSource::List(list) => {
            let found = search_password_list(&file, &list, options)?;
            unlock_found(file, &found)?
        }
        PasswordSource::BruteForce {
            alphabet,
            start,
            max_length,
        } => {
            let start = start.as_ref().map(|s| s.expose_secret().as_bytes());
            let found = search_brute_force(&file, &alphabet, start, max_length, options)?;
            unlock_found(file, &found)?
        }
    };

    write_plaintext(reader, input, output, overwrite || config.output.overwrite, config.output.chunk_size)
}

fn unlock_found(file: EncryptedFile<File>, password: &[u8]) -> Result<EncryptedReader<File>> {
    eprintln!("password is: \"{}\"", password.escape_ascii());
    file.unlock_literal(password)
        .map_err(|file| anyhow::anyhow!("{}: password found but unlock failed", file.name()))
}

fn search_password_list(
    file: &EncryptedFile<File>,
    list: &Path,
    options: SearchOptions,
) -> Result<Vec<u8>> {
    let lines: Box<dyn BufRead> = if list.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        let f = File::open(list)
            .with_context(|| format!("{}: error opening password file", list.display()))?;
        Box::new(BufReader::new(f))
    };

    let pb = make_spinner("search");
    let candidates = lines.split(b'\n').map(|line| {
        let mut line = line.with_context(|| format!("{}: read error", list.display()))?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok::<_, anyhow::Error>(line)
    });
    let found = find_password(&file.probe(), candidates, options, |tried, _| {
        pb.set_position(tried)
    })?;
    pb.finish_and_clear();

    found.with_context(|| format!("{}: password not in file", list.display()))
}

fn search_brute_force(
    file: &EncryptedFile<File>,
    alphabet: &[u8],
    start: Option<&[u8]>,
    max_length: usize,
    options: SearchOptions,
) -> Result<Vec<u8>> {
    if alphabet.is_empty() {
        bail!("password alphabet is empty");
    }
    let candidates = brute_force(alphabet, start, max_length)?;

    let pb = match brute_force_total(alphabet.len(), max_length) {
        Some(total) if start.is_none() => make_progress_bar(total, "search"),
        _ => make_spinner("search"),
    };
    let found = find_password(&file.probe(), candidates.map(Ok), options, |tried, next| {
        pb.set_position(tried);
        pb.set_message(format!("length {}: {}", next.len(), next.escape_ascii()));
    })?;
    pb.finish_and_clear();

    found.context("password not found")
}

fn write_plaintext(
    mut reader: EncryptedReader<File>,
    input: &Path,
    output: &Path,
    overwrite: bool,
    chunk_size: usize,
) -> Result<()> {
    let to_stdout = output.as_os_str() == "-";
    if !to_stdout && output.exists() && !overwrite {
        bail!("{}: output exists (use --overwrite)", output.display());
    }

    let mut out: Box<dyn Write> = if to_stdout {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        let f = File::create(output)
            .with_context(|| format!("{}: error opening output file", output.display()))?;
        Box::new(BufWriter::new(f))
    };

    let copied = copy_plaintext(&mut reader, &mut out, chunk_size)
        .with_context(|| format!("{}: write error", output.display()));
    let closed = reader
        .close()
        .with_context(|| format!("{}: read error", input.display()));
    let flushed = out
        .flush()
        .with_context(|| format!("{}: write error", output.display()));
    drop(out);

    match (copied, closed, flushed) {
        (Ok(bytes), Ok(()), Ok(())) => {
            info!(output = %output.display(), bytes, "decrypted");
            Ok(())
        }
        (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
            if !to_stdout {
                let _ = std::fs::remove_file(output);
            }
            Err(err)
        }
    }
}

fn copy_plaintext<R: Read>(
    reader: &mut EncryptedReader<R>,
    out: &mut dyn Write,
    chunk_size: usize,
) -> io::Result<u64> {
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = reader.read_plaintext(&mut buffer);
        if n == 0 {
            return Ok(total);
        }
        out.write_all(&buffer[..n])?;
        total += n as u64;
    }
}

// ── `spsscrypt encode-password` / `decode-password` ──────────────────────────

fn cmd_encode_password(plaintext: &str, variant: Option<u64>, count: bool) -> Result<()> {
    let encoded = EncodedPassword::from_plaintext(plaintext.as_bytes());
    if count {
        println!("{}", encoded.n_variants());
        return Ok(());
    }
    let index = variant.unwrap_or_else(|| rand::thread_rng().gen_range(0..encoded.n_variants()));
    println!("{}", encoded.variant(index));
    Ok(())
}

fn cmd_decode_password(encoded: &str) -> Result<()> {
    let Some(plaintext) = decode_password(encoded.as_bytes()) else {
        bail!("{encoded:?} is not a valid encoded password");
    };
    println!("{}", plaintext.escape_ascii());
    Ok(())
}

// ── `spsscrypt config show` ───────────────────────────────────────────────────

fn cmd_config_show(config: &SpssCryptConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
