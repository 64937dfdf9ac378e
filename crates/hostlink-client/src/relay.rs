//! Forwarding of `;`-joined command sequences, as they arrive on switch command
//! topics, and the HR bit toggle built on top of it.

use crate::{ClientError, HostLinkClient};
use hostlink_core::command::response_end_code;
use hostlink_core::frame::{COMMAND_SEPARATOR, TERMINATOR, verify_fcs};
use hostlink_core::{Address, EndCode, WriteSequence};
use hostlink_datalink::DataLink;
use tracing::{debug, warn};

/// What the PLC answered to one relayed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub raw: String,
    pub end_code: Option<EndCode>,
}

#[derive(Debug)]
pub struct RelayedFrame {
    pub frame: String,
    pub result: Result<RelayResponse, ClientError>,
}

impl RelayedFrame {
    /// The PLC answered with end code `00`.
    pub fn is_accepted(&self) -> bool {
        matches!(
            &self.result,
            Ok(RelayResponse {
                end_code: Some(EndCode::Normal),
                ..
            })
        )
    }
}

fn is_well_formed(frame: &str) -> bool {
    frame.starts_with('@') && frame.ends_with(TERMINATOR) && verify_fcs(frame)
}

/// Split a payload into its frames, rejecting it whole if any frame is malformed.
pub fn split_frames(payload: &str) -> Result<Vec<&str>, ClientError> {
    let frames: Vec<&str> = payload
        .split(COMMAND_SEPARATOR)
        .map(str::trim)
        .filter(|frame| !frame.is_empty())
        .collect();

    if let Some(bad) = frames.iter().find(|frame| !is_well_formed(frame)) {
        return Err(ClientError::InvalidFrame((*bad).to_string()));
    }
    Ok(frames)
}

impl<D: DataLink> HostLinkClient<D> {
    /// Forward every frame of `payload` in order.
    ///
    /// A failing frame does not stop the sequence, so a rejected force is still
    /// followed by the switch back to RUN mode.
    pub async fn relay(&self, payload: &str) -> Result<Vec<RelayedFrame>, ClientError> {
        let frames = split_frames(payload)?;
        debug!(frames = frames.len(), "relaying command sequence");

        let mut relayed = Vec::with_capacity(frames.len());
        for frame in frames {
            let result = self.send_frame(frame).await.map(|raw| RelayResponse {
                end_code: response_end_code(&raw),
                raw,
            });
            match &result {
                Ok(response) if response.end_code != Some(EndCode::Normal) => {
                    warn!(
                        frame,
                        response = response.raw.trim_end(),
                        "plc did not accept relayed frame"
                    );
                }
                Ok(_) => {}
                Err(err) => warn!(frame, error = %err, "relayed frame failed"),
            }
            relayed.push(RelayedFrame {
                frame: frame.to_string(),
                result,
            });
        }
        Ok(relayed)
    }

    /// Force an HR bit on or off through the MONITOR / force / RUN sequence.
    pub async fn force_bit(
        &self,
        address: &Address,
        turn_on: bool,
    ) -> Result<Vec<RelayedFrame>, ClientError> {
        let sequence = WriteSequence::for_address(address, turn_on)?;
        self.relay(&sequence.to_string()).await
    }
}
