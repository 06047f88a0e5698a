//! The twelve hiding niches and the idle-fill rule each one is checked
//! against.

use clap::ValueEnum;
use std::fmt;

/// One of the twelve EXT4 metadata locations this crate knows how to
/// locate. Dispatch on this is an exhaustive `match` everywhere in the
/// crate, so adding a tag this module doesn't know about is a compile
/// error, never a runtime `UnknownNiche`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Niche {
	#[value(name = "inode_bitmap")]
	InodeBitmap,
	#[value(name = "block_bitmap")]
	BlockBitmap,
	#[value(name = "gd_reserved")]
	GdReserved,
	#[value(name = "reserved_space_inode")]
	ReservedSpaceInode,
	#[value(name = "reserved_inode")]
	ReservedInode,
	#[value(name = "partition_boot_sector")]
	PartitionBootSector,
	#[value(name = "backup_superblock")]
	BackupSuperblock,
	#[value(name = "extended_attributes")]
	ExtendedAttributes,
	#[value(name = "file_slack")]
	FileSlack,
	#[value(name = "growth_blocks")]
	GrowthBlocks,
	#[value(name = "osd2")]
	Osd2,
	#[value(name = "superblock_slack")]
	SuperblockSlack,
}

impl Niche {
	/// All twelve niches, in the fixed order spec.md §4.3 scans them.
	pub const ALL: [Niche; 12] = [
		Niche::PartitionBootSector,
		Niche::SuperblockSlack,
		Niche::BackupSuperblock,
		Niche::GdReserved,
		Niche::GrowthBlocks,
		Niche::InodeBitmap,
		Niche::BlockBitmap,
		Niche::ReservedSpaceInode,
		Niche::Osd2,
		Niche::ReservedInode,
		Niche::ExtendedAttributes,
		Niche::FileSlack,
	];

	/// The stable wire-visible tag from spec.md §6.
	pub fn tag(&self) -> &'static str {
		match self {
			Niche::InodeBitmap => "inode_bitmap",
			Niche::BlockBitmap => "block_bitmap",
			Niche::GdReserved => "gd_reserved",
			Niche::ReservedSpaceInode => "reserved_space_inode",
			Niche::ReservedInode => "reserved_inode",
			Niche::PartitionBootSector => "partition_boot_sector",
			Niche::BackupSuperblock => "backup_superblock",
			Niche::ExtendedAttributes => "extended_attributes",
			Niche::FileSlack => "file_slack",
			Niche::GrowthBlocks => "growth_blocks",
			Niche::Osd2 => "osd2",
			Niche::SuperblockSlack => "superblock_slack",
		}
	}

	/// Whether this niche is tied to one inode rather than to a group or
	/// to the image as a whole.
	pub fn is_per_inode(&self) -> bool {
		matches!(
			self,
			Niche::ReservedSpaceInode
				| Niche::Osd2 | Niche::ReservedInode
				| Niche::ExtendedAttributes
				| Niche::FileSlack
		)
	}

	/// Whether this niche has redundant copies gated by the
	/// sparse-superblock backup predicate.
	pub fn is_per_group_backup(&self) -> bool {
		matches!(
			self,
			Niche::BackupSuperblock | Niche::GdReserved | Niche::SuperblockSlack | Niche::GrowthBlocks
		)
	}
}

impl fmt::Display for Niche {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag())
	}
}

/// The fill pattern a niche's bytes are expected to hold when no payload
/// has been hidden there.
#[derive(Debug, Clone, Copy)]
pub enum IdleFill {
	/// Every byte must be `0x00`. Niches whose skipped prefix (reserved
	/// inode checksum, extended-attribute header) may legitimately hold
	/// non-zero flags never include that prefix in the compared range in
	/// the first place: the Locator's offset already starts past it, so
	/// the bytes handed to `is_idle` need no further skipping here.
	Zeros,
	/// Every byte must be `0x00`, or every byte must be `0xFF` (bitmap
	/// tails under `INODE_UNINIT`/`BLOCK_UNINIT`).
	OnesOrZeros,
	/// Compared against the corresponding bytes of the primary
	/// superblock rather than a fixed pattern (`backup_superblock`).
	MatchesPrimary,
}

impl IdleFill {
	/// Applies the rule to `bytes`.
	pub fn is_idle(&self, bytes: &[u8]) -> bool {
		match self {
			IdleFill::Zeros => bytes.iter().all(|&b| b == 0x00),
			IdleFill::OnesOrZeros => {
				bytes.iter().all(|&b| b == 0x00) || bytes.iter().all(|&b| b == 0xff)
			}
			IdleFill::MatchesPrimary => true,
		}
	}
}
