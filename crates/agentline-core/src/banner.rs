//! The single user-visible status line.
//!
//! Raising a banner replaces whatever was showing. Errors stay until they
//! are dismissed; notices (upload progress) disappear on their own once the
//! configured delay has passed.

use std::time::{Duration, Instant};

/// Kind of banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Error,
    Notice,
}

/// A raised banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
    pub raised_at: Instant,
}

/// Holder for at most one banner.
#[derive(Debug, Clone)]
pub struct StatusBanner {
    current: Option<Banner>,
    notice_ttl: Duration,
}

impl StatusBanner {
    pub fn new(notice_ttl: Duration) -> Self {
        Self {
            current: None,
            notice_ttl,
        }
    }

    pub fn raise_error(&mut self, text: impl Into<String>) {
        self.raise(BannerKind::Error, text.into(), Instant::now());
    }

    pub fn raise_notice(&mut self, text: impl Into<String>) {
        self.raise(BannerKind::Notice, text.into(), Instant::now());
    }

    fn raise(&mut self, kind: BannerKind, text: String, raised_at: Instant) {
        self.current = Some(Banner {
            kind,
            text,
            raised_at,
        });
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// The banner visible now.
    pub fn current(&self) -> Option<&Banner> {
        self.current_at(Instant::now())
    }

    /// The banner visible at `now`; expired notices are hidden.
    pub fn current_at(&self, now: Instant) -> Option<&Banner> {
        self.current.as_ref().filter(|banner| match banner.kind {
            BannerKind::Error => true,
            BannerKind::Notice => now.saturating_duration_since(banner.raised_at) < self.notice_ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_replaces_previous() {
        let mut banner = StatusBanner::new(Duration::from_secs(3));
        banner.raise_notice("Uploaded leads.csv");
        banner.raise_error("Connection refused");

        let current = banner.current().unwrap();
        assert_eq!(current.kind, BannerKind::Error);
        assert_eq!(current.text, "Connection refused");
    }

    #[test]
    fn test_error_never_auto_clears() {
        let mut banner = StatusBanner::new(Duration::from_secs(3));
        let start = Instant::now();
        banner.raise(BannerKind::Error, "boom".into(), start);
        assert!(banner.current_at(start + Duration::from_secs(3600)).is_some());

        banner.dismiss();
        assert!(banner.current().is_none());
    }

    #[test]
    fn test_notice_self_clears() {
        let mut banner = StatusBanner::new(Duration::from_secs(3));
        let start = Instant::now();
        banner.raise(BannerKind::Notice, "Uploaded".into(), start);

        assert!(banner.current_at(start + Duration::from_secs(1)).is_some());
        assert!(banner.current_at(start + Duration::from_secs(3)).is_none());
    }
}
