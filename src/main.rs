use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, CommandFactory, ErrorKind, Parser};

use dupehound::fingerprint::AudioBackend;
use dupehound::report::{NO_DUPLICATES_MESSAGE, NO_FILES_MESSAGE};
use dupehound::{Capabilities, Fingerprinter, Kinds, Report};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Audio,
    Video,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Backend {
    Fpcalc,
    Chromaprint,
}

impl From<Backend> for AudioBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Fpcalc => AudioBackend::Fpcalc,
            Backend::Chromaprint => AudioBackend::Chromaprint,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Find duplicate audio and video files using content fingerprints",
    long_about = None
)]
struct Cli {
    #[clap(value_parser = clap::value_parser!(PathBuf), help = "Root folder to scan.")]
    root: PathBuf,

    #[clap(
        long,
        default_value = "false",
        action(ArgAction::SetTrue),
        help = "Do not scan subfolders. By default, the root folder is scanned recursively."
    )]
    no_recurse: bool,

    #[clap(
        long,
        value_enum,
        value_delimiter = ',',
        default_values = &["audio", "video"],
        help = "Comma-separated list of media kinds to fingerprint. Files of other kinds are still compared by content hash if matched by --custom-exts."
    )]
    kinds: Vec<Mode>,

    #[clap(
        long,
        value_delimiter = ',',
        help = "Comma-separated list of additional file extensions to include. These files are compared by exact content hash unless they are audio or video."
    )]
    custom_exts: Vec<String>,

    #[clap(
        long,
        default_value_t = dupehound::DEFAULT_SAMPLE_FRAMES,
        value_parser = clap::value_parser!(usize),
        help = "Number of frames to sample from each video when computing its perceptual hash."
    )]
    sample_frames: usize,

    #[clap(
        long,
        default_value = "false",
        action(ArgAction::SetTrue),
        help = "Print the report as JSON."
    )]
    json: bool,

    #[clap(
        long,
        value_enum,
        default_value_t = Backend::Fpcalc,
        help = "Audio fingerprinting backend. 'fpcalc' runs the Chromaprint command-line tool found on PATH; 'chromaprint' decodes audio in-process with FFmpeg."
    )]
    audio_backend: Backend,

    #[clap(
        long,
        default_value_t = dupehound::DEFAULT_AUDIO_LENGTH.as_secs(),
        value_parser = clap::value_parser!(u64),
        help = "Length of audio to fingerprint, in seconds."
    )]
    audio_length: u64,

    #[clap(
        long,
        default_value = "false",
        action(ArgAction::SetTrue),
        help = "Fingerprint files in parallel."
    )]
    threaded: bool,

    #[clap(
        short,
        long,
        default_value = "false",
        action(ArgAction::SetTrue),
        help = "Enable debug logging."
    )]
    verbose: bool,
}

impl Cli {
    fn validate(&self) {
        let mut cmd = Cli::command();
        if self.audio_length == 0 {
            cmd.error(
                ErrorKind::InvalidValue,
                "audio_length must be a positive number",
            )
            .exit();
        }
        if self.threaded && !cfg!(feature = "rayon") {
            cmd.error(
                ErrorKind::ArgumentConflict,
                "--threaded requires the 'rayon' feature",
            )
            .exit();
        }
    }

    fn kinds(&self) -> Kinds {
        Kinds {
            audio: self.kinds.contains(&Mode::Audio),
            video: self.kinds.contains(&Mode::Video),
        }
    }
}

fn main() -> dupehound::Result<()> {
    let args = Cli::parse();
    args.validate();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let kinds = args.kinds();
    let recurse = !args.no_recurse;

    let files = dupehound::scan::find_files(&args.root, recurse, kinds, &args.custom_exts)?;
    if files.is_empty() {
        println!("{}", NO_FILES_MESSAGE);
        return Ok(());
    }

    let capabilities = Capabilities::probe(args.audio_backend.into());
    let fingerprinter = Fingerprinter::new(capabilities)
        .with_kinds(kinds)
        .with_sample_frames(args.sample_frames)
        .with_audio_length(Duration::from_secs(args.audio_length));
    tracing::debug!(
        "fingerprinting with kinds {:?} and {:?}",
        fingerprinter.kinds(),
        fingerprinter.capabilities()
    );

    let outcome = dupehound::find_duplicates(&files, &fingerprinter, args.threaded);
    if !outcome.failures.is_empty() {
        tracing::warn!("{} files could not be fingerprinted", outcome.failures.len());
    }

    let report = Report::new(&args.root, recurse, &outcome.groups.duplicates());
    if args.json {
        println!("{}", report.to_json()?);
    } else if report.is_empty() {
        println!("{}", NO_DUPLICATES_MESSAGE);
    } else {
        println!("{}", report.to_text());
    }

    Ok(())
}
