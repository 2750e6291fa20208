mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use cinepack_core::EqualityOptions;
use cinepack_schema::ContentKind;
use commands::{EXIT_FAILURE, EXIT_READ_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "cinepack",
    version,
    about = "Build, inspect, compare, and verify Digital Cinema Packages"
)]
struct Cli {
    /// Essence backend used to open MXF containers.
    #[arg(long, default_value = "framed", global = true)]
    backend: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the CPLs and reels of a package.
    Info {
        /// Package directory.
        dir: PathBuf,
        /// Fail if any essence file cannot be opened.
        #[arg(long, default_value_t = false)]
        require_mxfs: bool,
    },
    /// Compare two packages down to individual frames.
    Diff {
        /// First package directory.
        a: PathBuf,
        /// Second package directory.
        b: PathBuf,
        /// Also compare CPL names, content kinds, rates, and lengths.
        #[arg(long, default_value_t = false)]
        metadata: bool,
        /// Compare file digests only, never frames.
        #[arg(long, default_value_t = false)]
        hashes_only: bool,
        /// Largest mean absolute difference of decoded picture samples.
        #[arg(long, default_value_t = 5.0)]
        max_mean_pixel_error: f64,
        /// Largest standard deviation of decoded picture sample differences.
        #[arg(long, default_value_t = 5.0)]
        max_std_dev_pixel_error: f64,
        /// Largest difference between two audio samples.
        #[arg(long, default_value_t = 256)]
        max_audio_sample_error: i32,
    },
    /// Check every Packing List entry's size and hash against the files on disk.
    Verify {
        /// Package directory.
        dir: PathBuf,
    },
    /// Print the certificates of a PEM bundle, root first.
    Cert {
        /// PEM file holding one or more certificates.
        file: PathBuf,
    },
    /// Wrap JPEG2000 frames into a one-reel package.
    Create {
        /// Output package directory.
        dir: PathBuf,
        /// Content title of the CPL.
        #[arg(long)]
        name: String,
        /// Content kind (feature, trailer, short, ...).
        #[arg(long, default_value = "feature")]
        kind: ContentKind,
        /// Frames per second.
        #[arg(long, default_value_t = 24)]
        fps: i32,
        /// Picture width in pixels.
        #[arg(long, default_value_t = 1998)]
        width: u32,
        /// Picture height in pixels.
        #[arg(long, default_value_t = 1080)]
        height: u32,
        /// Treat the frame files as left/right pairs.
        #[arg(long, default_value_t = false)]
        stereo: bool,
        /// TOML file with issuer, creator, and other package metadata.
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// JPEG2000 codestreams, one per frame, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

#[allow(clippy::too_many_lines)]
fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CINEPACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let needs_backend = matches!(
        cli.command,
        Commands::Info { .. } | Commands::Diff { .. } | Commands::Create { .. }
    );
    let backend = if needs_backend {
        match commands::open_backend(&cli.backend) {
            Ok(backend) => Some(backend),
            Err(msg) => {
                eprintln!("error: {msg}");
                return ExitCode::from(EXIT_FAILURE);
            }
        }
    } else {
        None
    };

    let result = match (cli.command, backend) {
        (Commands::Info { dir, require_mxfs }, Some(backend)) => {
            commands::info::run(&dir, &backend, require_mxfs, json_output)
        }
        (
            Commands::Diff {
                a,
                b,
                metadata,
                hashes_only,
                max_mean_pixel_error,
                max_std_dev_pixel_error,
                max_audio_sample_error,
            },
            Some(backend),
        ) => commands::diff::run(
            &a,
            &b,
            &backend,
            &EqualityOptions {
                compare_metadata: metadata,
                max_mean_pixel_error,
                max_std_dev_pixel_error,
                max_audio_sample_error,
                compare_frames: !hashes_only,
            },
            json_output,
        ),
        (Commands::Verify { dir }, _) => commands::verify::run(&dir, json_output),
        (Commands::Cert { file }, _) => commands::cert::run(&file, json_output),
        (
            Commands::Create {
                dir,
                name,
                kind,
                fps,
                width,
                height,
                stereo,
                metadata,
                files,
            },
            Some(backend),
        ) => commands::create::run(
            &commands::create::CreateArgs {
                dir,
                name,
                kind,
                fps,
                width,
                height,
                stereo,
                metadata,
                files,
            },
            &backend,
            json_output,
        ),
        (Commands::Completions { shell }, _) => commands::completions::run::<Cli>(shell),
        (Commands::ManPages { dir }, _) => commands::man_pages::run::<Cli>(&dir),
        (_, None) => Err("no essence backend selected".to_owned()),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("package read error:")
                || msg.starts_with("schema error:")
                || msg.starts_with("could not load CPL file")
            {
                EXIT_READ_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
