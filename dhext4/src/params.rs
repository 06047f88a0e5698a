//! The pure, I/O-free snapshot of volume parameters the locator formulas
//! run against.

use volume::{GroupDescriptor, VolumeReader};

/// Volume parameters, read once when the image is opened and held for
/// the session's lifetime (spec.md §3: "Volume parameters live for the
/// duration of one image session"). Plain data, no I/O capability, so
/// [`crate::locator::locate`] stays pure.
#[derive(Debug, Clone)]
pub struct VolumeParams {
	pub block_size: u32,
	pub blocks_per_group: u32,
	pub inodes_per_group: u32,
	pub inodes_count: u32,
	pub inode_size: u16,
	pub reserved_gdt_blocks: u32,
	pub group_descriptors: Vec<GroupDescriptor>,
}

impl VolumeParams {
	pub fn from_reader(reader: &impl VolumeReader) -> Self {
		Self {
			block_size: reader.block_size(),
			blocks_per_group: reader.blocks_per_group(),
			inodes_per_group: reader.inodes_per_group(),
			inodes_count: reader.inodes_count(),
			inode_size: reader.inode_size(),
			reserved_gdt_blocks: reader.reserved_gdt_blocks(),
			group_descriptors: reader.group_descriptors().to_vec(),
		}
	}

	pub fn groups_count(&self) -> u64 {
		self.group_descriptors.len() as u64
	}

	/// `pbs_pad` from spec.md §4.1: 1 block when `block_size == 1024`, 0
	/// otherwise.
	pub fn pbs_pad_blocks(&self) -> u64 {
		if self.block_size == 1024 {
			1
		} else {
			0
		}
	}

	/// Absolute byte offset of inode `ino` (1-based), computed the same
	/// way the teacher's `INode::get_disk_offset` does, purely from
	/// already-loaded parameters.
	pub fn inode_byte_offset(&self, ino: u32) -> Option<u64> {
		if ino == 0 || ino > self.inodes_count {
			return None;
		}
		let idx = ino - 1;
		let group = (idx / self.inodes_per_group) as usize;
		let idx_in_group = (idx % self.inodes_per_group) as u64;
		let gd = self.group_descriptors.get(group)?;
		Some(gd.inode_table_block * self.block_size as u64 + idx_in_group * self.inode_size as u64)
	}
}
