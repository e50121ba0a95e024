//! Accessory status polling.
//!
//! This module defines the device-status snapshot consumed by the sink
//! state machine, the [`StatusSource`] seam it is fetched through, and a
//! concrete source that shells out to an external status command (an
//! `airstatus`-style tool) emitting one JSON object on stdout:
//!
//! ```json
//! {
//!   "status": true,
//!   "model": "AirPods Pro",
//!   "charge": { "left": 80, "right": -1 },
//!   "charging_left": false,
//!   "charging_right": true
//! }
//! ```
//!
//! A charge of `-1` (or any value outside 0..=100) means the reading is
//! unavailable and maps to `None` in the typed snapshot.

use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;
use tokio::{process::Command, time};

use crate::error::{AirSinkError, Result};

/// A single point-in-time reading of the accessory state.
///
/// When `connected` is false the remaining fields carry no information and
/// must not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
   pub connected: bool,
   pub model: SmolStr,
   pub left_charge: Option<u8>,
   pub right_charge: Option<u8>,
   pub left_charging: bool,
   pub right_charging: bool,
}

/// Seam for fetching accessory status snapshots.
pub trait StatusSource {
   /// Fetches a fresh snapshot of the accessory state.
   async fn get_data(&self) -> Result<DeviceSnapshot>;
}

/// Wire representation of the status payload, before sentinel mapping.
#[derive(Deserialize)]
struct RawStatus {
   #[serde(default)]
   status: bool,
   #[serde(default)]
   model: SmolStr,
   #[serde(default)]
   charge: RawCharge,
   #[serde(default)]
   charging_left: bool,
   #[serde(default)]
   charging_right: bool,
}

#[derive(Deserialize)]
struct RawCharge {
   #[serde(default = "charge_unknown")]
   left: i16,
   #[serde(default = "charge_unknown")]
   right: i16,
}

const fn charge_unknown() -> i16 {
   -1
}

impl Default for RawCharge {
   fn default() -> Self {
      Self {
         left: charge_unknown(),
         right: charge_unknown(),
      }
   }
}

fn charge_level(raw: i16) -> Option<u8> {
   u8::try_from(raw).ok().filter(|level| *level <= 100)
}

/// Parses one status payload into a typed snapshot.
pub fn parse_snapshot(payload: &[u8]) -> Result<DeviceSnapshot> {
   let raw: RawStatus = serde_json::from_slice(payload)?;

   if raw.status && raw.model.is_empty() {
      return Err(AirSinkError::InvalidStatus(
         "connected payload is missing the model name",
      ));
   }

   Ok(DeviceSnapshot {
      connected: raw.status,
      model: raw.model,
      left_charge: charge_level(raw.charge.left),
      right_charge: charge_level(raw.charge.right),
      left_charging: raw.charging_left,
      right_charging: raw.charging_right,
   })
}

/// Status source backed by an external command printing JSON on stdout.
#[derive(Debug)]
pub struct CommandStatusSource {
   command: Vec<String>,
   timeout: Duration,
}

impl CommandStatusSource {
   pub fn new(command: Vec<String>, timeout: Duration) -> Result<Self> {
      if command.is_empty() {
         return Err(AirSinkError::EmptyStatusCommand);
      }
      Ok(Self { command, timeout })
   }
}

impl StatusSource for CommandStatusSource {
   async fn get_data(&self) -> Result<DeviceSnapshot> {
      let (program, args) = self
         .command
         .split_first()
         .ok_or(AirSinkError::EmptyStatusCommand)?;

      // kill_on_drop so a hung status command does not outlive the timeout
      let output = time::timeout(
         self.timeout,
         Command::new(program).args(args).kill_on_drop(true).output(),
      )
      .await
      .map_err(|_| AirSinkError::CommandTimeout {
         command: program.clone(),
         timeout: self.timeout,
      })??;

      if !output.status.success() {
         return Err(AirSinkError::CommandFailed {
            command: program.clone(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
         });
      }

      parse_snapshot(&output.stdout)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_parse_full_payload() {
      let snapshot = parse_snapshot(
         br#"{
            "status": true,
            "model": "AirPods Pro",
            "charge": { "left": 80, "right": 82 },
            "charging_left": false,
            "charging_right": false
         }"#,
      )
      .expect("parse");

      assert!(snapshot.connected);
      assert_eq!(snapshot.model, "AirPods Pro");
      assert_eq!(snapshot.left_charge, Some(80));
      assert_eq!(snapshot.right_charge, Some(82));
      assert!(!snapshot.left_charging);
      assert!(!snapshot.right_charging);
   }

   #[test]
   fn test_sentinel_maps_to_none() {
      let snapshot = parse_snapshot(
         br#"{"status": true, "model": "AirPods", "charge": {"left": -1, "right": 50}}"#,
      )
      .expect("parse");

      assert_eq!(snapshot.left_charge, None);
      assert_eq!(snapshot.right_charge, Some(50));
   }

   #[test]
   fn test_out_of_range_charge_is_unknown() {
      let snapshot = parse_snapshot(
         br#"{"status": true, "model": "AirPods", "charge": {"left": 250, "right": 100}}"#,
      )
      .expect("parse");

      assert_eq!(snapshot.left_charge, None);
      assert_eq!(snapshot.right_charge, Some(100));
   }

   #[test]
   fn test_missing_fields_default_to_disconnected() {
      let snapshot = parse_snapshot(b"{}").expect("parse");
      assert!(!snapshot.connected);
      assert_eq!(snapshot.left_charge, None);
      assert_eq!(snapshot.right_charge, None);
   }

   #[test]
   fn test_connected_without_model_is_rejected() {
      let err = parse_snapshot(br#"{"status": true}"#).unwrap_err();
      assert!(matches!(err, AirSinkError::InvalidStatus(_)));
   }

   #[test]
   fn test_empty_command_is_rejected() {
      let err = CommandStatusSource::new(vec![], Duration::from_secs(5)).unwrap_err();
      assert!(matches!(err, AirSinkError::EmptyStatusCommand));
   }

   #[tokio::test]
   async fn test_timed_out_status_command_is_killed() {
      let dir = tempfile::tempdir().expect("tempdir");
      let marker = dir.path().join("marker");
      let command = vec![
         "sh".to_string(),
         "-c".to_string(),
         format!("sleep 2 && touch {}", marker.display()),
      ];
      let source = CommandStatusSource::new(command, Duration::from_millis(200)).expect("source");

      let err = source.get_data().await.unwrap_err();
      assert!(matches!(err, AirSinkError::CommandTimeout { .. }));

      // A child that survived the timeout would run to completion and
      // create the marker; a killed one never does.
      time::sleep(Duration::from_secs(3)).await;
      assert!(!marker.exists());
   }
}
