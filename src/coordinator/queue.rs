use bytes::Bytes;
use tokio::sync::oneshot;

use super::descriptor::RequestDescriptor;
use crate::error::ApiError;

pub(crate) type ResultSlot = oneshot::Sender<Result<Bytes, ApiError>>;

/// A request parked until the next renewal completes.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub descriptor: RequestDescriptor,
    /// Number of times this request has been parked so far.
    pub requeues: u32,
    pub slot: ResultSlot,
}

impl PendingRequest {
    pub fn resolve(self, result: Result<Bytes, ApiError>) {
        // The caller may have given up; nobody left to tell.
        let _ = self.slot.send(result);
    }
}

/// Pending requests plus the single-flight renewal flag.
///
/// Both are only touched under the coordinator's lock.
#[derive(Debug, Default)]
pub(crate) struct RenewalQueue {
    pending: Vec<PendingRequest>,
    renewing: bool,
}

impl RenewalQueue {
    /// Park a request. Returns `true` when the caller must start the renewal.
    pub fn enqueue(&mut self, request: PendingRequest) -> bool {
        self.pending.push(request);
        if self.renewing {
            false
        } else {
            self.renewing = true;
            true
        }
    }

    /// Take every parked request and clear the renewal flag.
    pub fn drain(&mut self) -> Vec<PendingRequest> {
        self.renewing = false;
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_renewing(&self) -> bool {
        self.renewing
    }
}
