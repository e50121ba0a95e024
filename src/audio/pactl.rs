//! PulseAudio command layer.
//!
//! Thin wrapper around the `pactl` client binary. Every invocation runs
//! under a bounded timeout and is converted into a structured error on
//! timeout, non-zero exit, or undecodable output; callers decide whether
//! to contain or propagate. The [`AudioServer`] trait is the seam the sink
//! controller is written against, so the state machine can be exercised
//! without a running audio server.

use std::{io, time::Duration};

use log::warn;
use smol_str::SmolStr;
use tokio::{process::Command, time};

use crate::error::{AirSinkError, Result};

const PACTL: &str = "pactl";

/// Master every remap sink forwards to.
const DEFAULT_MASTER: &str = "@DEFAULT_SINK@";

/// Extra output latency added to the mono sink to compensate for the
/// perceptual timing of the mono downmix.
const MONO_LATENCY_MSEC: u32 = 2;

/// Parameters for a `module-remap-sink` instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapSink {
   pub sink_name: SmolStr,
   pub channels: u8,
   pub channel_map: &'static str,
   pub description: SmolStr,
   pub latency_msec: Option<u32>,
}

impl RemapSink {
   /// Single-channel remap of the default sink, named after the model.
   pub fn mono(model: &str) -> Self {
      Self {
         sink_name: model.into(),
         channels: 1,
         channel_map: "mono",
         description: model.into(),
         latency_msec: Some(MONO_LATENCY_MSEC),
      }
   }

   /// Two-channel remap of the default sink, named after the model.
   pub fn stereo(model: &str) -> Self {
      Self {
         sink_name: model.into(),
         channels: 2,
         channel_map: "front-left,front-right",
         description: model.into(),
         latency_msec: None,
      }
   }

   fn args(&self) -> Vec<String> {
      let mut args = vec![
         "load-module".to_string(),
         "module-remap-sink".to_string(),
         format!("sink_name={}", self.sink_name),
         format!("master={DEFAULT_MASTER}"),
         format!("channels={}", self.channels),
         format!("channel_map={}", self.channel_map),
         format!("sink_properties=device.description=\"{}\"", self.description),
      ];
      if let Some(latency) = self.latency_msec {
         args.push(format!("latency_msec={latency}"));
      }
      args
   }
}

/// Operations the sink controller needs from the audio server.
pub trait AudioServer {
   /// Returns the short module listing, one module per line with the
   /// numeric module ID as the leading token.
   async fn list_modules(&self, timeout: Duration) -> Result<String>;

   /// Unloads a single module by ID.
   async fn unload_module(&self, module_id: u32, timeout: Duration) -> Result<()>;

   /// Loads a remap sink module.
   async fn load_remap_sink(&self, sink: &RemapSink, timeout: Duration) -> Result<()>;

   /// Makes the named sink the system default.
   async fn set_default_sink(&self, name: &str, timeout: Duration) -> Result<()>;
}

/// [`AudioServer`] implementation that shells out to `pactl`.
pub struct Pactl;

impl Pactl {
   async fn run(&self, op: &str, args: Vec<String>, timeout: Duration) -> Result<String> {
      // kill_on_drop so a hung pactl does not outlive the timeout
      let output = time::timeout(
         timeout,
         Command::new(PACTL).args(&args).kill_on_drop(true).output(),
      )
      .await
      .map_err(|_| AirSinkError::CommandTimeout {
         command: format!("{PACTL} {op}"),
         timeout,
      })??;

      if !output.status.success() {
         return Err(AirSinkError::CommandFailed {
            command: format!("{PACTL} {op}"),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
         });
      }

      Ok(String::from_utf8(output.stdout)?)
   }
}

impl AudioServer for Pactl {
   async fn list_modules(&self, timeout: Duration) -> Result<String> {
      let args = ["list", "short", "modules"].map(String::from).to_vec();
      self.run("list short modules", args, timeout).await
   }

   async fn unload_module(&self, module_id: u32, timeout: Duration) -> Result<()> {
      let args = vec!["unload-module".to_string(), module_id.to_string()];
      self.run("unload-module", args, timeout).await.map(drop)
   }

   async fn load_remap_sink(&self, sink: &RemapSink, timeout: Duration) -> Result<()> {
      self.run("load-module", sink.args(), timeout).await.map(drop)
   }

   async fn set_default_sink(&self, name: &str, timeout: Duration) -> Result<()> {
      let args = vec!["set-default-sink".to_string(), name.to_string()];
      self.run("set-default-sink", args, timeout).await.map(drop)
   }
}

/// Extracts the module IDs of all listing lines mentioning `sink_name`.
///
/// The match is a plain substring test, so an unrelated module whose line
/// happens to contain the sink name is picked up as well. Lines whose
/// leading token is not a numeric ID are skipped with a warning.
pub fn matching_module_ids(listing: &str, sink_name: &str) -> Vec<u32> {
   let mut ids = Vec::new();
   for line in listing.lines() {
      if !line.contains(sink_name) {
         continue;
      }
      let Some(token) = line.split_whitespace().next() else {
         continue;
      };
      match token.parse() {
         Ok(id) => ids.push(id),
         Err(_) => warn!("Invalid module ID format in line {line}"),
      }
   }
   ids
}

/// Verifies that the `pactl` client binary is available before entering
/// the poll loop.
pub async fn preflight() -> Result<()> {
   match Command::new(PACTL).arg("--version").output().await {
      Ok(output) if output.status.success() => Ok(()),
      Ok(_) => Err(AirSinkError::PactlNotFound),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(AirSinkError::PactlNotFound),
      Err(e) => Err(e.into()),
   }
}
