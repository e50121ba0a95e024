//! Audio-sink state machine.
//!
//! The controller interprets device-status snapshots and drives the audio
//! server so that the active sink layout matches the accessory state:
//! no sink while disconnected, a mono remap while one earbud is docked,
//! a stereo remap while both are in use. Every transition deletes the old
//! sink before creating the new one, and the mode only advances when
//! creation succeeds, so a failed cycle is retried in full on the next
//! poll. All command failures are contained here as boolean results.

use std::time::Duration;

use log::{debug, error, info, warn};
use smol_str::SmolStr;

use crate::{
   audio::pactl::{AudioServer, RemapSink, matching_module_ids},
   status::DeviceSnapshot,
};

/// Audio output mode currently realized on the audio server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum AudioMode {
   #[default]
   Disconnected,
   Mono,
   Stereo,
}

/// Decides and applies the audio mode for each status snapshot.
pub struct SinkController<S> {
   server: S,
   sink_name: SmolStr,
   timeout: Duration,
}

impl<S: AudioServer> SinkController<S> {
   pub fn new(server: S, sink_name: impl Into<SmolStr>, timeout: Duration) -> Self {
      Self {
         server,
         sink_name: sink_name.into(),
         timeout,
      }
   }

   /// Runs one decision step: picks the target mode for `snapshot` and
   /// performs the sink operations needed to reach it.
   ///
   /// Returns the mode that is now in effect. On a failed transition the
   /// previous mode is returned unchanged so the next poll retries the
   /// whole transition; disconnection is reported even when the final
   /// sink deletion fails.
   pub async fn decide_and_apply(&self, previous: AudioMode, snapshot: &DeviceSnapshot) -> AudioMode {
      if !snapshot.connected {
         if previous != AudioMode::Disconnected && !self.delete_sink().await {
            // A stale sink is judged less harmful than staying stuck in a
            // connected mode.
            warn!("Could not delete sink after disconnect");
         }
         return AudioMode::Disconnected;
      }

      let target = target_mode(snapshot);
      if previous == target {
         return previous;
      }

      // Clear out whatever a previous cycle (or a crashed run) left behind
      // before creating the replacement.
      self.delete_sink().await;

      let created = if target == AudioMode::Mono {
         self.create_mono(&snapshot.model).await
      } else {
         self.create_stereo(&snapshot.model).await
      };

      if created {
         info!("Audio mode changed: {previous} -> {target}");
         target
      } else {
         previous
      }
   }

   /// Unloads every audio-server module whose listing line mentions the
   /// configured sink name.
   ///
   /// Re-queries the module table instead of tracking IDs, which makes the
   /// operation idempotent and crash-safe. Returns true when nothing
   /// matched; returns false on the first unload failure without touching
   /// the remaining matches.
   pub async fn delete_sink(&self) -> bool {
      info!("Deleting sink");

      let listing = match self.server.list_modules(self.timeout).await {
         Ok(listing) => listing,
         Err(e) => {
            error!("Failed to list audio server modules: {e}");
            return false;
         },
      };

      let module_ids = matching_module_ids(&listing, &self.sink_name);
      if module_ids.is_empty() {
         debug!("No sink found with name containing '{}'", self.sink_name);
         return true;
      }

      for module_id in module_ids {
         debug!("Unloading module {module_id} for sink '{}'", self.sink_name);
         if let Err(e) = self.server.unload_module(module_id, self.timeout).await {
            error!("Failed to unload module {module_id}: {e}");
            return false;
         }
         info!("Successfully unloaded module {module_id}");
      }
      true
   }

   /// Creates the mono remap sink and makes it the default output.
   ///
   /// If the follow-up set-default call fails, the whole operation is
   /// reported as failed even though the sink exists; the orphan is
   /// removed by the next cycle's delete-before-create step.
   pub async fn create_mono(&self, model: &str) -> bool {
      info!("Switching to mono audio for {model}");

      let sink = RemapSink::mono(model);
      if let Err(e) = self.server.load_remap_sink(&sink, self.timeout).await {
         error!("Failed to create mono sink: {e}");
         return false;
      }
      info!("Mono sink successfully created");

      if let Err(e) = self.server.set_default_sink(model, self.timeout).await {
         error!("Failed to set default sink to {model}: {e}");
         return false;
      }
      true
   }

   /// Creates the stereo remap sink. The default sink is left alone; the
   /// remap forwards to it via its master reference.
   pub async fn create_stereo(&self, model: &str) -> bool {
      info!("Switching to stereo audio for {model}");

      let sink = RemapSink::stereo(model);
      if let Err(e) = self.server.load_remap_sink(&sink, self.timeout).await {
         error!("Failed to create stereo sink: {e}");
         return false;
      }
      info!("Stereo sink successfully created");
      true
   }
}

/// A missing charge reading or an actively charging bud means one earbud
/// is docked in the case, so only one channel would be heard.
fn target_mode(snapshot: &DeviceSnapshot) -> AudioMode {
   if snapshot.left_charge.is_none()
      || snapshot.right_charge.is_none()
      || snapshot.left_charging
      || snapshot.right_charging
   {
      AudioMode::Mono
   } else {
      AudioMode::Stereo
   }
}
