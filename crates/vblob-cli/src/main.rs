//! vblob - command-line client for Vercel Blob storage

use anyhow::{anyhow, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vblob_client::{
    generate_client_token, BlobClient, ClientTokenOptions, Config, DownloadCommandOptions,
    ListCommandOptions, ListMode, Operation, ProgressCallback, PutBody, PutCommandOptions,
    UploadProgress,
};

#[derive(Parser, Debug)]
#[command(name = "vblob")]
#[command(about = "Command-line client for Vercel Blob storage")]
#[command(version)]
struct Args {
    /// Blob API base URL
    #[arg(long, global = true, env = "VERCEL_BLOB_API_URL")]
    base_url: Option<String>,

    /// Blob API version
    #[arg(long, global = true, env = "VERCEL_BLOB_API_VERSION")]
    api_version: Option<String>,

    /// Read-write token (also the secret for `token`)
    #[arg(long, global = true, env = "BLOB_READ_WRITE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true, env = "VBLOB_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List blobs
    List {
        /// Maximum number of blobs to return
        #[arg(long)]
        limit: Option<u64>,
        /// Only list blobs under this prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Cursor from a previous page
        #[arg(long)]
        cursor: Option<String>,
        /// Group blobs into folders
        #[arg(long)]
        folded: bool,
    },
    /// Upload a file
    Put {
        /// Local file to upload
        file: PathBuf,
        /// Destination pathname
        pathname: String,
        #[command(flatten)]
        options: PutArgs,
    },
    /// Show a blob's metadata
    Head {
        pathname: String,
    },
    /// Delete blobs by URL
    Del {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Copy a blob to a new pathname
    Copy {
        from_url: String,
        to_pathname: String,
        #[command(flatten)]
        options: PutArgs,
    },
    /// Download a blob
    Download {
        url: String,
        /// Byte range, inclusive (e.g. 0-1023)
        #[arg(long, value_parser = parse_range)]
        range: Option<(u64, u64)>,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Mint a client token signed with the read-write token
    Token {
        /// Operation the token is valid for
        operation: Operation,
        /// Restrict the token to one pathname
        #[arg(long)]
        pathname: Option<String>,
        /// Expiry as Unix seconds (defaults to one hour from now)
        #[arg(long)]
        expires_at: Option<i64>,
    },
}

#[derive(ClapArgs, Debug)]
struct PutArgs {
    /// Content type (guessed from the file name when omitted)
    #[arg(long)]
    content_type: Option<String>,
    /// Cache-Control max-age in seconds
    #[arg(long)]
    cache_max_age: Option<u64>,
    /// Append a random suffix to the pathname
    #[arg(long)]
    random_suffix: bool,
    /// Access level
    #[arg(long)]
    access: Option<String>,
}

impl PutArgs {
    fn into_options(self, guess_from: Option<&std::path::Path>) -> PutCommandOptions {
        let mut options = PutCommandOptions::new().with_random_suffix(self.random_suffix);
        let content_type = self
            .content_type
            .or_else(|| guess_from.and_then(|p| mime_guess::from_path(p).first_raw().map(str::to_string)));
        if let Some(ct) = content_type {
            options = options.with_content_type(ct);
        }
        if let Some(age) = self.cache_max_age {
            options = options.with_cache_control_max_age(age);
        }
        if let Some(access) = self.access {
            options = options.with_access(access);
        }
        options
    }
}

fn parse_range(s: &str) -> Result<(u64, u64), String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected START-END, got {}", s))?;
    let start = start.trim().parse::<u64>().map_err(|e| format!("bad range start: {}", e))?;
    let end = end.trim().parse::<u64>().map_err(|e| format!("bad range end: {}", e))?;
    if end < start {
        return Err(format!("range end {} is before start {}", end, start));
    }
    Ok((start, end))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_client(args: &Args) -> anyhow::Result<BlobClient> {
    let mut config = Config::from_env();
    if let Some(ref url) = args.base_url {
        config.base_url = url.clone();
    }
    if let Some(ref version) = args.api_version {
        config = config.with_api_version(version.clone());
    }
    if let Some(ref token) = args.token {
        config = config.with_token(token.clone());
    }
    Ok(BlobClient::new(config)?)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let client = build_client(&args)?;

    match args.command {
        Command::List {
            limit,
            prefix,
            cursor,
            folded,
        } => {
            let mut options = ListCommandOptions::new();
            if let Some(limit) = limit {
                options = options.with_limit(limit);
            }
            if let Some(prefix) = prefix {
                options = options.with_prefix(prefix);
            }
            if let Some(cursor) = cursor {
                options = options.with_cursor(cursor);
            }
            if folded {
                options = options.with_mode(ListMode::Folded);
            }
            print_json(&client.list(options).await?)
        }
        Command::Put {
            file,
            pathname,
            options,
        } => {
            let handle = tokio::fs::File::open(&file)
                .await
                .with_context(|| format!("opening {}", file.display()))?;
            let body = PutBody::from_file(handle).await?;
            let options = options.into_options(Some(&file));
            tracing::info!("Uploading {} to {}", file.display(), pathname);

            let progress: ProgressCallback = Box::new(|p: UploadProgress| {
                tracing::info!(
                    part = p.part_number,
                    bytes = p.bytes_uploaded,
                    percent = p.percentage().unwrap_or_default(),
                    "part uploaded"
                );
            });
            let result = client
                .put_with_progress(&pathname, body, options, Some(progress))
                .await?;
            print_json(&result)
        }
        Command::Head { pathname } => print_json(&client.head(&pathname).await?),
        Command::Del { urls } => {
            client.delete(&urls).await?;
            tracing::info!("Deleted {} blob(s)", urls.len());
            Ok(())
        }
        Command::Copy {
            from_url,
            to_pathname,
            options,
        } => {
            let options = options.into_options(None);
            print_json(&client.copy(&from_url, &to_pathname, options).await?)
        }
        Command::Download { url, range, output } => {
            let options = match range {
                Some((start, end)) => DownloadCommandOptions::range(start, end),
                None => DownloadCommandOptions::default(),
            };
            let data = client.download(&url, options).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &data)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!("Wrote {} bytes to {}", data.len(), path.display());
                }
                None => std::io::stdout().lock().write_all(&data)?,
            }
            Ok(())
        }
        Command::Token {
            operation,
            pathname,
            expires_at,
        } => {
            let secret = args
                .token
                .ok_or_else(|| anyhow!("--token or BLOB_READ_WRITE_TOKEN is required to sign client tokens"))?;
            let mut options = ClientTokenOptions::new(operation);
            if let Some(pathname) = pathname {
                options = options.with_pathname(pathname);
            }
            if let Some(expires_at) = expires_at {
                options = options.with_expires_at(expires_at);
            }
            println!("{}", generate_client_token(&secret, &options)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for JSON and downloads
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vblob={0},vblob_client={0}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(args).await
}
