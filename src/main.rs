//! Automatic mono/stereo sink switching for `AirPods`-style earbuds.
//!
//! This daemon polls an external status command for the accessory state
//! and drives PulseAudio (via `pactl`) so that a mono remap sink is active
//! while one earbud is docked, a stereo remap sink while both are in use,
//! and no sink while disconnected. The current mode is threaded by value
//! through the poll loop; signals only wake the loop, which then runs the
//! final sink teardown on its own execution context.

use std::process::ExitCode;

use log::{error, info};
use tokio::{
   select,
   signal::unix::{SignalKind, signal},
   time::{self, MissedTickBehavior},
};

mod audio;
mod config;
mod error;
mod status;

use crate::{
   audio::{
      controller::{AudioMode, SinkController},
      pactl::{self, Pactl},
   },
   config::Config,
   error::Result,
   status::{CommandStatusSource, StatusSource},
};

/// Exit code when SIGINT terminated the loop.
const EXIT_INTERRUPTED: u8 = 130;
/// Exit code when SIGTERM terminated the loop.
const EXIT_TERMINATED: u8 = 143;
/// Exit code when the final sink deletion failed.
const EXIT_UNCLEAN_SHUTDOWN: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   match run().await {
      Ok(code) => code,
      Err(e) => {
         error!("Fatal error: {e}");
         ExitCode::FAILURE
      },
   }
}

async fn run() -> Result<ExitCode> {
   info!("Starting airsinkd...");

   pactl::preflight().await?;

   let config = Config::load()?;
   let source = CommandStatusSource::new(config.status_command.clone(), config.command_timeout())?;
   let controller = SinkController::new(Pactl, config.sink_name.clone(), config.command_timeout());

   let mut sigint = signal(SignalKind::interrupt())?;
   let mut sigterm = signal(SignalKind::terminate())?;

   let mut ticker = time::interval(config.poll_interval());
   ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

   info!(
      "Watching for '{}' every {}s",
      config.sink_name, config.poll_interval_sec
   );

   let mut mode = AudioMode::Disconnected;
   let exit_code = loop {
      select! {
         _ = ticker.tick() => {
            match source.get_data().await {
               Ok(snapshot) => mode = controller.decide_and_apply(mode, &snapshot).await,
               // No new information this cycle; keep the previous mode
               Err(e) => error!("Failed to retrieve accessory status: {e}"),
            }
         },
         _ = sigint.recv() => break EXIT_INTERRUPTED,
         _ = sigterm.recv() => break EXIT_TERMINATED,
      }
   };

   info!("Shutting down airsinkd");
   if !controller.delete_sink().await {
      error!("Could not delete sink on exit");
      return Ok(ExitCode::from(EXIT_UNCLEAN_SHUTDOWN));
   }

   Ok(ExitCode::from(exit_code))
}
