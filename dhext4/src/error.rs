//! Error kinds surfaced by the locator and the hide engine.

use thiserror::Error;

/// Every terminal failure kind from spec.md §7. Each is terminal and
/// needs no retry.
#[derive(Debug, Error)]
pub enum NicheError {
	#[error("block size is too small for this niche")]
	BlockSizeTooSmall,
	#[error("image has too few block groups for this niche")]
	TooFewGroups,
	#[error("payload of {payload_len} bytes exceeds niche capacity of {capacity} bytes")]
	PayloadTooLarge { payload_len: usize, capacity: usize },
	#[error("inode is not a regular file")]
	NotARegularFile,
	#[error("inode has no first extent")]
	NoFirstExtent,
	#[error("file's final block is fully used, leaving no slack")]
	FullyUsedFinalBlock,
	#[error("unknown hiding niche `{0}`")]
	UnknownNiche(String),
	#[error("missing required input: {0}")]
	MissingRequiredInput(&'static str),
	#[error("failed to open image")]
	ImageOpenFailed,
	/// A volume-layer I/O failure (open, read or write). Fatal; always
	/// propagates rather than being treated as an infeasible niche.
	#[error(transparent)]
	Volume(#[from] volume::VolumeError),
}
