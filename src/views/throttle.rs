//! Rate-limit countdown

/// Wait used when the server gave no usable `Retry-After`
pub const DEFAULT_WAIT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleView {
    pub wait_secs: u64,
    pub left_secs: u64,
}

impl Default for ThrottleView {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ThrottleView {
    pub const fn new(wait_secs: Option<u64>) -> Self {
        let wait_secs = match wait_secs {
            Some(0) | None => DEFAULT_WAIT_SECS,
            Some(secs) => secs,
        };
        Self {
            wait_secs,
            left_secs: wait_secs,
        }
    }

    /// One second passed; true once the wait is over
    pub const fn tick(&mut self) -> bool {
        self.left_secs = self.left_secs.saturating_sub(1);
        self.is_done()
    }

    pub const fn is_done(&self) -> bool {
        self.left_secs == 0
    }

    /// Share of the wait already elapsed, 0..=100
    pub const fn percent(&self) -> u16 {
        let elapsed = self.wait_secs - self.left_secs;
        #[allow(clippy::cast_possible_truncation)]
        let percent = (elapsed * 100 / self.wait_secs) as u16;
        percent
    }

    /// `m:ss` countdown label
    pub fn remaining(&self) -> String {
        format!("{}:{:02}", self.left_secs / 60, self.left_secs % 60)
    }
}
