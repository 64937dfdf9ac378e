//! Poll cycles over a list of read targets.
//!
//! Targets that live in the same word share one round trip per cycle. The
//! grouping is computed up front by [`PollPlan`], so the order of the targets
//! has no effect on how many commands go out on the serial line.

use crate::{ClientError, HostLinkClient, warn_on_bad_fcs};
use hostlink_core::{Address, DecodeError, EncodeError, ReadRequest, Value, decode_response};
use hostlink_datalink::{DataLink, DataLinkError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PollTarget {
    pub description: String,
    pub address: Address,
}

impl PollTarget {
    pub fn new(description: impl Into<String>, address: Address) -> Self {
        Self {
            description: description.into(),
            address,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum PollError {
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("transport error: {0}")]
    Transport(Arc<DataLinkError>),
    #[error("request timed out")]
    Timeout,
    #[error("poll cycle deadline exceeded")]
    CycleDeadlineExceeded,
    #[error("request failed: {0}")]
    Request(String),
}

impl From<ClientError> for PollError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::DataLink(err) => Self::Transport(Arc::new(err)),
            ClientError::Timeout => Self::Timeout,
            ClientError::Encode(err) => Self::Encode(err),
            ClientError::Decode(err) => Self::Decode(err),
            other => Self::Request(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub description: String,
    pub address: Address,
    pub result: Result<Value, PollError>,
}

impl PollOutcome {
    pub fn value(&self) -> Option<&Value> {
        self.result.as_ref().ok()
    }
}

/// One read command and the targets (by input index) it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadGroup {
    request: ReadRequest,
    members: Vec<usize>,
}

impl ReadGroup {
    pub fn request(&self) -> &ReadRequest {
        &self.request
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }
}

/// Targets grouped by read signature, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollPlan {
    groups: Vec<ReadGroup>,
    invalid: Vec<(usize, EncodeError)>,
}

impl PollPlan {
    pub fn build(targets: &[PollTarget]) -> Self {
        let mut plan = Self::default();
        let mut by_request: HashMap<ReadRequest, usize> = HashMap::new();

        for (index, target) in targets.iter().enumerate() {
            let request = match ReadRequest::for_address(&target.address) {
                Ok(request) => request,
                Err(err) => {
                    plan.invalid.push((index, err));
                    continue;
                }
            };
            match by_request.get(&request) {
                Some(&group) => plan.groups[group].members.push(index),
                None => {
                    by_request.insert(request, plan.groups.len());
                    plan.groups.push(ReadGroup {
                        request,
                        members: vec![index],
                    });
                }
            }
        }
        plan
    }

    pub fn groups(&self) -> &[ReadGroup] {
        &self.groups
    }

    /// Targets whose address cannot be turned into a read command.
    pub fn invalid(&self) -> &[(usize, EncodeError)] {
        &self.invalid
    }

    /// Number of round trips one cycle needs.
    pub fn round_trips(&self) -> usize {
        self.groups.len()
    }
}

impl<D: DataLink> HostLinkClient<D> {
    async fn poll_group(
        &self,
        frame: &str,
        deadline: Option<Instant>,
    ) -> Result<String, PollError> {
        let Some(deadline) = deadline else {
            return Ok(self.send_frame(frame).await?);
        };
        if Instant::now() >= deadline {
            return Err(PollError::CycleDeadlineExceeded);
        }
        match timeout_at(deadline, self.send_frame(frame)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PollError::CycleDeadlineExceeded),
        }
    }

    /// Read every target once and return one outcome per target, in input order.
    ///
    /// A failed round trip only affects the targets of that word; the cycle
    /// carries on with the next group.
    pub async fn poll_cycle(&self, targets: &[PollTarget]) -> Vec<PollOutcome> {
        let plan = PollPlan::build(targets);
        let deadline = self.config().cycle_timeout.map(|budget| Instant::now() + budget);
        debug!(
            targets = targets.len(),
            round_trips = plan.round_trips(),
            "starting poll cycle"
        );

        let mut results: Vec<Option<Result<Value, PollError>>> = vec![None; targets.len()];
        for &(index, err) in plan.invalid() {
            results[index] = Some(Err(PollError::Encode(err)));
        }

        for group in plan.groups() {
            let request = group.request();
            match self.poll_group(&request.frame(), deadline).await {
                Ok(response) => {
                    warn_on_bad_fcs(&response);
                    let command = request.command();
                    for &member in group.members() {
                        let bit = targets[member].address.bit;
                        let decoded = decode_response(&response, &command, bit);
                        results[member] = Some(decoded.map_err(PollError::from));
                    }
                }
                Err(err) => {
                    warn!(
                        area = %request.area(),
                        word = request.word(),
                        targets = group.members().len(),
                        error = %err,
                        "poll round trip failed"
                    );
                    for &member in group.members() {
                        results[member] = Some(Err(err.clone()));
                    }
                }
            }
        }

        targets
            .iter()
            .zip(results)
            .map(|(target, result)| PollOutcome {
                description: target.description.clone(),
                address: target.address,
                result: result.unwrap_or(Err(PollError::CycleDeadlineExceeded)),
            })
            .collect()
    }
}
