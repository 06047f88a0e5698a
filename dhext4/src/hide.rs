//! The Hider engine: writes one payload into exactly one niche.

use crate::error::NicheError;
use crate::locator::{self, NicheLocation};
use crate::niche::Niche;
use crate::params::VolumeParams;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use volume::VolumeReader;

/// Result of a successful hide.
#[derive(Debug, Clone)]
pub struct HideResult {
	pub bytes_written: usize,
	pub absolute_offset: u64,
	pub niche: Niche,
	pub inode: u32,
	pub group: u64,
}

/// Picks the inode to target when the caller didn't supply one:
/// `reserved_inode` always defaults to 9 (the lower of the two inodes it
/// can target); everything else draws uniformly from `[1, inodes_count]`
/// using `rng`.
fn default_inode(niche: Niche, params: &VolumeParams, rng: &mut StdRng) -> u32 {
	if niche == Niche::ReservedInode {
		return 9;
	}
	rng.gen_range(1..=params.inodes_count)
}

/// Writes `payload` into `niche`, returning where it landed.
///
/// `inode`/`group` default per spec.md §4.1 (inode: uniformly random
/// in `[1, inodes_count]`, seedable via `seed` for reproducible tests;
/// group: 3). `reserved_inode` defaults its inode to 9 rather than a
/// random draw, since it is only ever feasible at 9 or 10.
pub fn hide(
	reader: &impl VolumeReader,
	niche: Niche,
	payload: &[u8],
	inode: Option<u32>,
	group: Option<u32>,
	seed: Option<u64>,
) -> Result<HideResult, NicheError> {
	let params = VolumeParams::from_reader(reader);
	let mut rng = match seed {
		Some(s) => StdRng::seed_from_u64(s),
		None => StdRng::from_entropy(),
	};

	let ino = match inode {
		Some(n) => n,
		None => default_inode(niche, &params, &mut rng),
	};
	let grp = group.unwrap_or(3) as u64;

	let needs_inode_info = niche.is_per_inode();
	let info = if needs_inode_info { Some(reader.get_inode(ino)?) } else { None };

	let location: NicheLocation = locator::locate(niche, &params, ino, grp, info.as_ref())?;

	if payload.len() as u64 > location.length {
		return Err(NicheError::PayloadTooLarge {
			payload_len: payload.len(),
			capacity: location.length as usize,
		});
	}

	reader.write_at(location.offset, payload)?;

	Ok(HideResult {
		bytes_written: payload.len(),
		absolute_offset: location.offset,
		niche,
		inode: ino,
		group: grp,
	})
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::niche::Niche;
	use std::os::unix::fs::FileExt;
	use tempfile::NamedTempFile;
	use volume::Ext4Image;

	/// Builds a minimal synthetic ext4 image: `block_size`, `groups`
	/// block groups, 32-byte group descriptors, a reserved-space inode
	/// table large enough to address up to inode 64.
	fn make_image(block_size: u32, groups: u32) -> NamedTempFile {
		let blocks_per_group: u32 = 8192;
		let inodes_per_group: u32 = 64;
		let inode_size: u16 = 128;
		let total_blocks = blocks_per_group as u64 * groups as u64;
		let file = NamedTempFile::new().unwrap();
		let size = total_blocks * block_size as u64;
		file.as_file().set_len(size).unwrap();

		let mut sb = [0u8; 1024];
		sb[0..4].copy_from_slice(&(inodes_per_group * groups).to_le_bytes());
		sb[4..8].copy_from_slice(&(total_blocks as u32).to_le_bytes());
		let log_block_size: u32 = match block_size {
			1024 => 0,
			2048 => 1,
			4096 => 2,
			_ => panic!("unsupported block size"),
		};
		sb[24..28].copy_from_slice(&log_block_size.to_le_bytes());
		sb[32..36].copy_from_slice(&blocks_per_group.to_le_bytes());
		sb[40..44].copy_from_slice(&inodes_per_group.to_le_bytes());
		sb[56..58].copy_from_slice(&0xef53u16.to_le_bytes());
		sb[76..80].copy_from_slice(&1u32.to_le_bytes());
		sb[88..90].copy_from_slice(&inode_size.to_le_bytes());
		sb[206..208].copy_from_slice(&32u16.to_le_bytes());
		sb[254..256].copy_from_slice(&32u16.to_le_bytes());

		file.as_file().write_all_at(&sb, 1024).unwrap();

		let pbs_pad_blocks: u64 = if block_size == 1024 { 1 } else { 0 };
		let gdt_off = (pbs_pad_blocks + 1) * block_size as u64;
		for i in 0..groups as u64 {
			let mut gd = [0u8; 32];
			let inode_bitmap_block = total_blocks - 3 - i;
			let block_bitmap_block = total_blocks - 2 - i;
			let inode_table_block = 64u64 + i * 16;
			gd[0..4].copy_from_slice(&(inode_bitmap_block as u32).to_le_bytes());
			gd[4..8].copy_from_slice(&(block_bitmap_block as u32).to_le_bytes());
			gd[8..12].copy_from_slice(&(inode_table_block as u32).to_le_bytes());
			file.as_file().write_all_at(&gd, gdt_off + i * 32).unwrap();
		}

		file
	}

	#[test]
	fn hide_writes_into_osd2() {
		let file = make_image(4096, 3);
		let img = Ext4Image::open(file.path(), true).unwrap();
		let result = hide(&img, Niche::Osd2, b"ab", Some(22), None, Some(1)).unwrap();
		assert_eq!(result.bytes_written, 2);
		assert_eq!(result.inode, 22);
	}

	#[test]
	fn hide_rejects_oversized_payload() {
		let file = make_image(4096, 3);
		let img = Ext4Image::open(file.path(), true).unwrap();
		let err = hide(&img, Niche::Osd2, b"abc", Some(22), None, Some(1)).unwrap_err();
		assert!(matches!(err, NicheError::PayloadTooLarge { .. }));
	}

	#[test]
	fn hide_superblock_slack_fails_on_1024_blocks() {
		let file = make_image(1024, 3);
		let img = Ext4Image::open(file.path(), true).unwrap();
		let err = hide(&img, Niche::SuperblockSlack, b"x", None, Some(0), Some(1)).unwrap_err();
		assert!(matches!(err, NicheError::BlockSizeTooSmall));
	}

	#[test]
	fn hide_backup_superblock_fails_with_too_few_groups() {
		let file = make_image(4096, 2);
		let img = Ext4Image::open(file.path(), true).unwrap();
		let err = hide(&img, Niche::BackupSuperblock, b"x", None, None, Some(1)).unwrap_err();
		assert!(matches!(err, NicheError::TooFewGroups));
	}

	#[test]
	fn reserved_inode_defaults_to_nine() {
		let file = make_image(4096, 3);
		let img = Ext4Image::open(file.path(), true).unwrap();
		let result = hide(&img, Niche::ReservedInode, b"hi", None, None, Some(1)).unwrap();
		assert_eq!(result.inode, 9);
	}
}
