//! The pure Niche Locator: maps `(niche, params, ino, grp)` to a byte
//! range and expected idle fill, with no I/O of its own.

use crate::error::NicheError;
use crate::niche::{IdleFill, Niche};
use crate::params::VolumeParams;
use volume::InodeInfo;

/// EXT4's sparse-superblock predicate: group 0, or a power of 3, 5 or 7.
///
/// Uses iterative integer division rather than `log_b(n) % 1 == 0`,
/// which misbehaves at `n == 0` and loses precision for large `n`
/// (spec.md §9). `0` and `1` are treated as backups, matching the
/// original's behavior.
pub fn is_backup(g: u64) -> bool {
	if g <= 1 {
		return true;
	}
	[3u64, 5, 7].iter().any(|&b| is_power_of(g, b))
}

fn is_power_of(mut n: u64, b: u64) -> bool {
	if n == 0 {
		return false;
	}
	while n % b == 0 {
		n /= b;
	}
	n == 1
}

/// A located niche: where it lives, how long it is, and what idle bytes
/// look like there when nothing has been hidden.
#[derive(Debug, Clone)]
pub struct NicheLocation {
	pub offset: u64,
	pub length: u64,
	pub fill: IdleFill,
}

fn ceil_div(a: u64, b: u64) -> u64 {
	(a + b - 1) / b
}

/// `growth_blocks`' first eligible block's starting byte, shared by the
/// Hider (first block only) and the Detector (all blocks via
/// [`growth_blocks_all`]).
fn growth_blocks_start_block(params: &VolumeParams, grp: u64) -> u64 {
	let skip_start = if params.block_size == 1024 { 2 } else { 1 };
	let gd_count = params.groups_count();
	let skip_blocks = (gd_count * 64) / params.block_size as u64 + 1;
	skip_start + skip_blocks + grp * params.blocks_per_group as u64
}

/// Locates a single niche instance. `inode` must be `Some` when `niche`
/// is per-inode (spec.md §3); callers that don't yet have an
/// [`InodeInfo`] should fetch one via `VolumeReader::get_inode` first,
/// keeping this function itself free of I/O.
pub fn locate(
	niche: Niche,
	params: &VolumeParams,
	ino: u32,
	grp: u64,
	inode: Option<&InodeInfo>,
) -> Result<NicheLocation, NicheError> {
	let b = params.block_size as u64;
	let g = params.blocks_per_group as u64;
	let pbs_pad = params.pbs_pad_blocks();

	match niche {
		Niche::PartitionBootSector => Ok(NicheLocation { offset: 0, length: 1024, fill: IdleFill::Zeros }),

		Niche::SuperblockSlack => {
			if b <= 1024 {
				return Err(NicheError::BlockSizeTooSmall);
			}
			if grp == 0 {
				if b <= 2048 {
					return Err(NicheError::BlockSizeTooSmall);
				}
				Ok(NicheLocation { offset: 2048, length: b - 2048, fill: IdleFill::Zeros })
			} else {
				if !is_backup(grp) {
					return Err(NicheError::TooFewGroups);
				}
				Ok(NicheLocation { offset: grp * g * b + 1024, length: b - 1024, fill: IdleFill::Zeros })
			}
		}

		Niche::BackupSuperblock => {
			if params.groups_count() < 3 {
				return Err(NicheError::TooFewGroups);
			}
			if !is_backup(grp) {
				return Err(NicheError::TooFewGroups);
			}
			Ok(NicheLocation {
				offset: (grp * g + pbs_pad) * b,
				length: 1024,
				fill: IdleFill::MatchesPrimary,
			})
		}

		Niche::GdReserved => gd_reserved_location(params, grp, 0),

		Niche::GrowthBlocks => {
			if !is_backup(grp) {
				return Err(NicheError::TooFewGroups);
			}
			let locs = growth_blocks_all(params, grp)?;
			locs.into_iter().next().ok_or(NicheError::TooFewGroups)
		}

		Niche::InodeBitmap => {
			let gd = params
				.group_descriptors
				.get(grp as usize)
				.ok_or(NicheError::TooFewGroups)?;
			let head = params.inodes_per_group as u64 / 8;
			Ok(NicheLocation {
				offset: gd.inode_bitmap_block * b + head,
				length: b - head,
				fill: IdleFill::OnesOrZeros,
			})
		}

		Niche::BlockBitmap => {
			if g == b * 8 {
				return Err(NicheError::BlockSizeTooSmall);
			}
			let gd = params
				.group_descriptors
				.get(grp as usize)
				.ok_or(NicheError::TooFewGroups)?;
			let head = g / 8;
			Ok(NicheLocation {
				offset: gd.block_bitmap_block * b + head,
				length: b - head,
				fill: IdleFill::OnesOrZeros,
			})
		}

		Niche::ReservedSpaceInode => {
			let off = params.inode_byte_offset(ino).ok_or(NicheError::MissingRequiredInput("inode"))?;
			Ok(NicheLocation { offset: off + 0x7A, length: 2, fill: IdleFill::Zeros })
		}

		Niche::Osd2 => {
			let off = params.inode_byte_offset(ino).ok_or(NicheError::MissingRequiredInput("inode"))?;
			Ok(NicheLocation { offset: off + 0x7E, length: 2, fill: IdleFill::Zeros })
		}

		Niche::ReservedInode => {
			if ino != 9 && ino != 10 {
				return Err(NicheError::MissingRequiredInput("inode must be 9 or 10"));
			}
			let off = params.inode_byte_offset(ino).ok_or(NicheError::MissingRequiredInput("inode"))?;
			Ok(NicheLocation { offset: off, length: 0x7c, fill: IdleFill::Zeros })
		}

		Niche::ExtendedAttributes => {
			if params.inode_size <= 128 {
				return Err(NicheError::BlockSizeTooSmall);
			}
			let info = inode.ok_or(NicheError::MissingRequiredInput("inode info"))?;
			let skip = 0x80u64 + info.extra_isize as u64;
			if skip >= params.inode_size as u64 {
				return Err(NicheError::BlockSizeTooSmall);
			}
			Ok(NicheLocation {
				offset: info.byte_offset_in_image + skip,
				length: params.inode_size as u64 - skip,
				fill: IdleFill::Zeros,
			})
		}

		Niche::FileSlack => {
			let info = inode.ok_or(NicheError::MissingRequiredInput("inode info"))?;
			if !info.is_file {
				return Err(NicheError::NotARegularFile);
			}
			let extent = info.first_extent.as_ref().ok_or(NicheError::NoFirstExtent)?;
			let rem = info.length_bytes % b;
			if rem == 0 {
				return Err(NicheError::FullyUsedFinalBlock);
			}
			let last_block = extent.start_block + extent.block_count - 1;
			Ok(NicheLocation { offset: last_block * b + rem, length: b - rem, fill: IdleFill::Zeros })
		}
	}
}

/// The base byte offset of group `grp`'s group-descriptor table block,
/// shared by `gd_reserved` and the growth-blocks skip computation.
fn group_descriptor_table_base(params: &VolumeParams, grp: u64) -> u64 {
	let b = params.block_size as u64;
	let pbs_pad = params.pbs_pad_blocks();
	(pbs_pad + 1 + grp * params.blocks_per_group as u64) * b
}

/// Locates one group-descriptor-table reserved-field entry. `entry_index`
/// selects which of the table's 4-byte reserved fields (one per group
/// descriptor slot) to target; the Hider always uses `0` (first eligible
/// sub-unit, matching `growth_blocks`' "first eligible block" contract),
/// the Detector enumerates every entry via [`gd_reserved_all`].
pub fn gd_reserved_location(
	params: &VolumeParams,
	grp: u64,
	entry_index: u64,
) -> Result<NicheLocation, NicheError> {
	if !is_backup(grp) {
		return Err(NicheError::TooFewGroups);
	}
	let base = group_descriptor_table_base(params, grp);
	Ok(NicheLocation { offset: base + 0x3c + 64 * entry_index, length: 4, fill: IdleFill::Zeros })
}

/// Every `gd_reserved` entry for backup group `grp`, one per group
/// descriptor slot in that group's copy of the table.
pub fn gd_reserved_all(params: &VolumeParams, grp: u64) -> Result<Vec<NicheLocation>, NicheError> {
	if !is_backup(grp) {
		return Err(NicheError::TooFewGroups);
	}
	let count = params.groups_count();
	(0..count).map(|i| gd_reserved_location(params, grp, i)).collect()
}

/// Every `growth_blocks` block for backup group `grp`, clamped against
/// *that group's own* block bitmap block rather than a latch carried
/// across groups (spec.md §9's flagged `one_too_many` bug is not
/// reproduced here).
pub fn growth_blocks_all(params: &VolumeParams, grp: u64) -> Result<Vec<NicheLocation>, NicheError> {
	if !is_backup(grp) {
		return Err(NicheError::TooFewGroups);
	}
	let b = params.block_size as u64;
	let head = ceil_div(params.reserved_gdt_blocks as u64, 8);
	if head >= b {
		return Err(NicheError::BlockSizeTooSmall);
	}
	let start_block = growth_blocks_start_block(params, grp);
	let gd = params
		.group_descriptors
		.get(grp as usize)
		.ok_or(NicheError::TooFewGroups)?;
	let own_bitmap_block = gd.block_bitmap_block;

	let mut locs = Vec::new();
	for i in 0..params.reserved_gdt_blocks as u64 {
		let block = start_block + i;
		if block >= own_bitmap_block {
			break;
		}
		locs.push(NicheLocation { offset: block * b + head, length: b - head, fill: IdleFill::Zeros });
	}
	if locs.is_empty() {
		return Err(NicheError::TooFewGroups);
	}
	Ok(locs)
}

/// `reserved_inode`'s second run, past the inode checksum field
/// `[0x7C, 0x7E)`. The Hider only ever targets the first run (see
/// [`locate`]); the Detector checks both runs for inodes 9 and 10.
pub fn reserved_inode_second_run(
	params: &VolumeParams,
	ino: u32,
) -> Result<NicheLocation, NicheError> {
	if ino != 9 && ino != 10 {
		return Err(NicheError::MissingRequiredInput("inode must be 9 or 10"));
	}
	let off = params.inode_byte_offset(ino).ok_or(NicheError::MissingRequiredInput("inode"))?;
	Ok(NicheLocation {
		offset: off + 0x7e,
		length: params.inode_size as u64 - 0x7e,
		fill: IdleFill::Zeros,
	})
}

/// `backup_superblock`'s two comparison regions, split around the
/// differing block-count field `[0x5A, 0x5E)` (spec.md §4.3). Returns
/// `(first_90_bytes, second_926_bytes)`.
pub fn backup_superblock_regions(
	params: &VolumeParams,
	grp: u64,
) -> Result<(NicheLocation, NicheLocation), NicheError> {
	let loc = locate(Niche::BackupSuperblock, params, 0, grp, None)?;
	let first = NicheLocation { offset: loc.offset, length: 0x5a, fill: IdleFill::MatchesPrimary };
	let second = NicheLocation {
		offset: loc.offset + 0x5e,
		length: 926,
		fill: IdleFill::MatchesPrimary,
	};
	Ok((first, second))
}

#[cfg(test)]
mod test {
	use super::*;

	fn fixture_params(block_size: u32, groups: usize) -> VolumeParams {
		VolumeParams {
			block_size,
			blocks_per_group: 8192,
			inodes_per_group: 2048,
			inodes_count: 2048 * groups as u32,
			inode_size: 256,
			reserved_gdt_blocks: 256,
			group_descriptors: (0..groups)
				.map(|i| volume::GroupDescriptor {
					inode_bitmap_block: (i as u64) * 8192 + 3,
					block_bitmap_block: (i as u64) * 8192 + 4,
					inode_table_block: (i as u64) * 8192 + 5,
				})
				.collect(),
		}
	}

	#[test]
	fn sparse_backup_law() {
		assert!(is_backup(0));
		assert!(is_backup(1));
		assert!(!is_backup(2));
		assert!(is_backup(3));
		assert!(!is_backup(4));
		assert!(is_backup(5));
		assert!(is_backup(7));
		assert!(is_backup(9));
		assert!(is_backup(25));
		assert!(is_backup(49));
		assert!(!is_backup(26));
	}

	#[test]
	fn pbs_padding_law() {
		let p1024 = fixture_params(1024, 8);
		let loc = locate(Niche::BackupSuperblock, &p1024, 0, 1, None).unwrap();
		assert_eq!(loc.offset, (1 * 8192 + 1) * 1024);

		let p4096 = fixture_params(4096, 8);
		let loc = locate(Niche::BackupSuperblock, &p4096, 0, 1, None).unwrap();
		assert_eq!(loc.offset, 1 * 8192 * 4096);
	}

	#[test]
	fn bitmap_tail_size_law() {
		let params = fixture_params(4096, 8);
		let loc = locate(Niche::InodeBitmap, &params, 0, 0, None).unwrap();
		assert_eq!(loc.length, 4096 - 2048 / 8);
	}

	#[test]
	fn superblock_slack_infeasible_at_1024() {
		let params = fixture_params(1024, 8);
		let err = locate(Niche::SuperblockSlack, &params, 0, 0, None).unwrap_err();
		assert!(matches!(err, NicheError::BlockSizeTooSmall));
	}

	#[test]
	fn locator_purity() {
		let params = fixture_params(4096, 8);
		let a = locate(Niche::GdReserved, &params, 0, 3, None).unwrap();
		let b = locate(Niche::GdReserved, &params, 0, 3, None).unwrap();
		assert_eq!(a.offset, b.offset);
		assert_eq!(a.length, b.length);
	}

	#[test]
	fn backup_superblock_too_few_groups() {
		let params = fixture_params(4096, 2);
		let err = locate(Niche::BackupSuperblock, &params, 0, 0, None).unwrap_err();
		assert!(matches!(err, NicheError::TooFewGroups));
	}

	#[test]
	fn growth_blocks_clamps_to_own_bitmap() {
		let mut params = fixture_params(4096, 8);
		params.group_descriptors[3].block_bitmap_block = growth_blocks_start_block(&params, 3) + 2;
		let locs = growth_blocks_all(&params, 3).unwrap();
		assert_eq!(locs.len(), 2);
	}
}
