//! A minimal EXT4 volume reader: opens an image once and exposes the
//! superblock/group-descriptor/inode accessors the niche locator and the
//! hide/detect engines need, without handing out raw struct fields.
//!
//! This plays the role spec.md calls the "Volume Reader (external)"
//! collaborator. Because this workspace has no sibling crate to depend on
//! for it, it is implemented here the way the teacher reads and writes
//! raw filesystem structures: fixed-layout `#[repr(C, packed)]` structs
//! read with positional I/O, no parsing framework.

mod error;
mod image;
mod raw;

pub use error::VolumeError;
pub use image::Ext4Image;

/// A contiguous run of blocks backing (at least) the start of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
	pub start_block: u64,
	pub block_count: u64,
}

/// Everything the locator/hide/detect engines need about one inode,
/// fetched in a single pass so `locate()` itself never touches the disk.
#[derive(Debug, Clone)]
pub struct InodeInfo {
	/// Absolute byte offset of this inode's record in the image.
	pub byte_offset_in_image: u64,
	/// Whether the inode's mode bits mark it a regular file.
	pub is_file: bool,
	/// Apparent file size in bytes (0 for non-files).
	pub length_bytes: u64,
	/// The first extent of the file's data, if any could be read.
	pub first_extent: Option<Extent>,
	/// The `extra_isize` field at `byte_offset_in_image + 0x80`, or `0`
	/// when the image's inode size is the classic 128 bytes.
	pub extra_isize: u16,
}

/// Block/inode bitmap and inode table locations for one block group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupDescriptor {
	pub inode_bitmap_block: u64,
	pub block_bitmap_block: u64,
	pub inode_table_block: u64,
}

/// Read-only accessor surface over a parsed EXT4 volume.
///
/// Every getter here is a typed field lookup, never a dynamic
/// attribute/string lookup: adding a field this crate doesn't know about
/// is a non-event, and misspelling one a compile error.
pub trait VolumeReader {
	fn block_size(&self) -> u32;
	fn blocks_per_group(&self) -> u32;
	fn inodes_per_group(&self) -> u32;
	fn inodes_count(&self) -> u32;
	fn inode_size(&self) -> u16;
	fn reserved_gdt_blocks(&self) -> u32;
	fn group_descriptors(&self) -> &[GroupDescriptor];
	/// Fetches inode `n` (1-based). Returns `InodeOutOfRange` if `n` is
	/// not in `[1, inodes_count]`.
	fn get_inode(&self, n: u32) -> Result<InodeInfo, VolumeError>;
	/// Reads `len` bytes at absolute image offset `offset`.
	fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, VolumeError>;
	/// Writes `data` at absolute image offset `offset`, overlaying
	/// whatever was already there; never extends or truncates the image.
	fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), VolumeError>;
}
