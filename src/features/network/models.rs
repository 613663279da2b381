use serde::{Deserialize, Serialize};

/// Cumulative traffic counters summed over all interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkReading {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

impl NetworkReading {
    pub fn add(&mut self, sent: u64, recv: u64) {
        self.bytes_sent = self.bytes_sent.saturating_add(sent);
        self.bytes_recv = self.bytes_recv.saturating_add(recv);
    }
}
