//! Errors produced by the volume reader.

use std::io;
use thiserror::Error;

/// An error encountered while opening or reading an EXT4 image.
#[derive(Debug, Error)]
pub enum VolumeError {
	/// The image is too short to hold a superblock at all.
	#[error("image is too small to contain an ext4 superblock")]
	TooSmall,
	/// The superblock magic number did not match `0xEF53`.
	#[error("not an ext4 image: bad superblock magic")]
	BadMagic,
	/// An inode number is out of the valid `[1, inodes_count]` range.
	#[error("inode {0} is out of range")]
	InodeOutOfRange(u32),
	/// A group number is out of range for this image.
	#[error("group {0} is out of range")]
	GroupOutOfRange(u32),
	/// Underlying I/O failure.
	#[error(transparent)]
	Io(#[from] io::Error),
}
