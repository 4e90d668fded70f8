use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use herdtrack_core::frames::LiveAssembler;
use herdtrack_core::projection::{GeoPoint, Projector, Scale};
use herdtrack_core::session::TrackingSession;
use herdtrack_server::document::TrackingDocument;
use herdtrack_server::output::Printer;
use herdtrack_server::replay::{replay_batch, replay_live, ReplayOptions};
use herdtrack_server::settings::{load_settings, SettingsOverrides};
use herdtrack_server::stream::{open_input, stream_frames};

#[derive(Parser, Debug)]
#[command(
    name = "herdtrack",
    version,
    about = "Trail and geofence tracking for wildlife detections"
)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// Engine settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Radius of the implicit boundary used when no geofences are configured
    #[arg(long, global = true, value_name = "METERS")]
    boundary_radius: Option<f64>,

    /// Ignore samples this close to the reference point
    #[arg(long, global = true, value_name = "METERS")]
    center_skip: Option<f64>,

    /// Maximum trail length per object
    #[arg(long, global = true)]
    max_trail_points: Option<usize>,

    /// Do not print alert lines
    #[arg(long, global = true)]
    no_alerts: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded tracking document
    Replay {
        document: PathBuf,

        /// Feed frames through the live assembler instead of batch playback
        #[arg(long)]
        live: bool,

        /// Frames revealed per step (batch playback)
        #[arg(long, default_value_t = 1)]
        frames_per_step: usize,

        /// Steps per second; 0 replays as fast as possible
        #[arg(long, default_value_t = 0.0, conflicts_with = "realtime")]
        rate: f64,

        /// Pace at the frame rate recorded in the document
        #[arg(long)]
        realtime: bool,
    },

    /// Track frames arriving as JSON lines on stdin or from a file
    Stream {
        /// Input file, `-` for stdin
        input: Option<PathBuf>,

        /// Reference latitude for frames that carry no referencePoint
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Reference longitude for frames that carry no referencePoint
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,

        #[arg(long, default_value_t = 1.0)]
        meters_per_unit: f64,
    },
}

async fn run(
    command: Command,
    session: &mut TrackingSession,
    printer: &mut Printer<std::io::Stdout>,
) -> anyhow::Result<()> {
    match command {
        Command::Replay {
            document,
            live,
            frames_per_step,
            rate,
            realtime,
        } => {
            let document = TrackingDocument::load(&document).await?;
            let rate = if realtime { document.fps() } else { rate };
            let options = ReplayOptions {
                frames_per_step,
                ..ReplayOptions::default()
            }
            .with_rate(rate);

            if live {
                replay_live(&document, session, printer, &options).await?;
            } else {
                replay_batch(&document, session, printer, &options).await?;
            }
        }
        Command::Stream {
            input,
            lat,
            lng,
            meters_per_unit,
        } => {
            let mut live = match (lat, lng) {
                (Some(lat), Some(lng)) => LiveAssembler::with_projector(Projector::new(
                    GeoPoint::new(lat, lng),
                    Scale::new(meters_per_unit),
                )?),
                _ => LiveAssembler::new(),
            };
            let reader = open_input(input.as_deref()).await?;
            stream_frames(reader, &mut live, session, printer).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    let overrides = SettingsOverrides {
        boundary_radius: cli.boundary_radius,
        center_skip: cli.center_skip,
        max_trail_points: cli.max_trail_points,
    };
    let settings = load_settings(cli.config.as_deref(), &overrides)?;
    let mut session = TrackingSession::new(settings)?;

    let mut printer = Printer::new(std::io::stdout());
    if cli.no_alerts {
        printer = printer.without_alerts();
    }

    tokio::select! {
        result = run(cli.command, &mut session, &mut printer) => result?,
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted, stopping"),
    }

    printer.write_status(&session.status())?;
    log::info!("{} alerts raised", printer.alerts_raised());
    Ok(())
}
