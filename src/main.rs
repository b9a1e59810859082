use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::time::Duration;

use roll_tracker::config::{GyroRateUnit, TrackerConfig};
use roll_tracker::controller::ControllerState;
use roll_tracker::events::RollEvent;
use roll_tracker::recording::{self, Recording};
use roll_tracker::sensors::{self, SimulatedRide};
use roll_tracker::service;
use roll_tracker::session::SessionSummary;

#[derive(Parser, Debug)]
#[command(name = "roll_tracker")]
#[command(about = "Lean-angle tracker - complementary filter over accel/gyro streams", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigArgs,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// JSON tracker configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gyro weight of the complementary filter
    #[arg(long, global = true)]
    alpha: Option<f64>,

    /// Calibration window in milliseconds
    #[arg(long, global = true)]
    calibration_ms: Option<u64>,

    /// Gyro readings are in rad/s instead of deg/s
    #[arg(long, global = true, default_value_t = false)]
    radians: bool,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Replay a recorded session (*.json or *.json.gz)
    Replay {
        #[arg(long)]
        log: PathBuf,

        /// Write the session summary here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the live service against a simulated ride
    Simulate {
        /// Seconds to track after calibration
        #[arg(value_name = "SECONDS", default_value = "20")]
        seconds: u64,

        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl ConfigArgs {
    fn resolve(&self) -> Result<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TrackerConfig::default(),
        };
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(ms) = self.calibration_ms {
            config.calibration_window_ms = ms;
        }
        if self.radians {
            config.gyro_rate_unit = GyroRateUnit::RadiansPerSecond;
        }
        config.validate()?;
        Ok(config)
    }
}

fn write_summary(summary: &SessionSummary, output: Option<&Path>) -> Result<()> {
    let json = summary.to_json()?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing summary {}", path.display()))?;
            log::info!("summary written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_replay(config: &TrackerConfig, log_path: &Path, output: Option<&Path>) -> Result<()> {
    let recording = Recording::load(log_path)
        .with_context(|| format!("loading recording {}", log_path.display()))?;
    log::info!(
        "loaded {} readings ({:.1} s) from {}",
        recording.len(),
        recording.duration_seconds(),
        log_path.display()
    );

    let (summary, _) = recording::replay(&recording, config, roll_tracker::NullSink)?;
    write_summary(&summary, output)
}

async fn run_simulation(config: TrackerConfig, seconds: u64, output: Option<&Path>) -> Result<()> {
    let window = config.calibration_window();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<RollEvent>();
    let (handle, service_task) = service::spawn(config, event_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                RollEvent::FilteredAngle(roll) => log::debug!("roll {:+.1}°", roll),
                RollEvent::MaxPositiveRoll(max) => log::info!("new max lean right {:.1}°", max),
                RollEvent::MaxNegativeRoll(max) => log::info!("new max lean left {:.1}°", max),
                RollEvent::CalibrationComplete(offsets) => log::info!(
                    "offsets: gyro bias x {:.3}, accel roll {:.2}°",
                    offsets.gyro_bias.x,
                    offsets.acc_roll_offset
                ),
                RollEvent::SessionEnded(_) => {}
            }
        }
    });

    let ride = SimulatedRide::default();
    let sample_period = Duration::from_millis(10);
    tokio::spawn(sensors::accel_loop(handle.clone(), ride, sample_period));
    tokio::spawn(sensors::gyro_loop(handle.clone(), ride, sample_period));
    tokio::spawn(sensors::gps_loop(handle.clone(), ride, Duration::from_secs(1)));

    handle.start_calibration().await?;
    tokio::time::sleep(window + Duration::from_millis(100)).await;
    if handle.snapshot().await?.state == ControllerState::Calibrating {
        log::warn!("calibration timer has not fired yet, closing the window now");
        handle.finalize_calibration().await?;
    }

    handle.set_tracking_mode(true).await?;
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    let summary = handle
        .set_tracking_mode(false)
        .await?
        .context("tracking session was not active")?;

    handle.shutdown().await?;
    drop(handle);
    service_task.await?;
    printer.await?;

    write_summary(&summary, output)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.overrides.resolve()?;

    match &cli.command {
        Mode::Replay { log, output } => run_replay(&config, log, output.as_deref()),
        Mode::Simulate { seconds, output } => {
            run_simulation(config, *seconds, output.as_deref()).await
        }
    }
}
