//! Records collected by the Detector, one per non-idle niche occurrence.

use crate::niche::Niche;
use std::fmt;

/// One non-idle niche occurrence found during a scan.
#[derive(Debug, Clone)]
pub struct Incident {
	/// `-1` when the niche is not tied to a specific inode (superblock,
	/// PBS, group descriptor, ...).
	pub inode: i64,
	pub message: String,
	pub niche: Niche,
	/// `None` when no search pattern was requested for this scan.
	pub matched_payload: Option<bool>,
}

impl Incident {
	pub fn new(inode: i64, message: impl Into<String>, niche: Niche) -> Self {
		Self { inode, message: message.into(), niche, matched_payload: None }
	}

	pub fn with_match(mut self, matched: bool) -> Self {
		self.matched_payload = Some(matched);
		self
	}
}

impl fmt::Display for Incident {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.inode >= 0 {
			write!(f, "[INFO] Inode: {} Message: {}", self.inode, self.message)?;
		} else {
			write!(f, "[INFO] Message: {}", self.message)?;
		}
		if self.matched_payload == Some(true) {
			write!(f, " (A part of) the requested string is found.")?;
		}
		Ok(())
	}
}
