//! The Detector engine: scans every niche instantiation and reports the
//! ones that are no longer idle.

use crate::error::NicheError;
use crate::incident::Incident;
use crate::locator::{self, is_backup, NicheLocation};
use crate::niche::{IdleFill, Niche};
use crate::params::VolumeParams;
use std::collections::BTreeSet;
use volume::VolumeReader;

/// The outcome of one full scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
	pub incidents: Vec<Incident>,
	pub techniques_seen: BTreeSet<Niche>,
}

fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
	if needle.is_empty() {
		return false;
	}
	haystack.windows(needle.len()).any(|w| w == needle)
}

fn matches_any(bytes: &[u8], patterns: &[Vec<u8>]) -> bool {
	patterns.iter().any(|p| contains_subsequence(bytes, p))
}

fn read_location(
	reader: &impl VolumeReader,
	loc: &NicheLocation,
) -> Result<Vec<u8>, NicheError> {
	Ok(reader.read_at(loc.offset, loc.length as usize)?)
}

/// Scans `reader` across all twelve niches, every applicable inode and
/// every applicable group, collecting one [`Incident`] per non-idle
/// occurrence. `search`, when given, is a list of byte patterns tested
/// independently against each region read (spec.md §4.3: a match in
/// either half of a split region counts, cross-half matches are not
/// required).
pub fn scan(
	reader: &impl VolumeReader,
	search: Option<&[Vec<u8>]>,
) -> Result<ScanReport, NicheError> {
	let params = VolumeParams::from_reader(reader);
	let mut report = ScanReport::default();

	for niche in Niche::ALL {
		match niche {
			Niche::PartitionBootSector => {
				scan_fixed(reader, &params, niche, 0, 0, None, search, &mut report)?;
			}
			Niche::ReservedSpaceInode | Niche::Osd2 | Niche::FileSlack | Niche::ExtendedAttributes => {
				scan_per_inode(reader, &params, niche, search, &mut report)?;
			}
			Niche::ReservedInode => {
				scan_reserved_inode(reader, &params, search, &mut report)?;
			}
			Niche::BackupSuperblock => {
				scan_backup_superblock(reader, &params, search, &mut report)?;
			}
			Niche::SuperblockSlack => {
				for grp in 0..params.groups_count() {
					scan_fixed(reader, &params, niche, 0, grp, None, search, &mut report)?;
				}
			}
			Niche::GdReserved => {
				for grp in 0..params.groups_count() {
					if !is_backup(grp) {
						continue;
					}
					let locs = match locator::gd_reserved_all(&params, grp) {
						Ok(l) => l,
						Err(_) => continue,
					};
					for loc in locs {
						record_if_nonidle(reader, niche, -1, &loc, search, &mut report)?;
					}
				}
			}
			Niche::GrowthBlocks => {
				for grp in 0..params.groups_count() {
					if !is_backup(grp) {
						continue;
					}
					let locs = match locator::growth_blocks_all(&params, grp) {
						Ok(l) => l,
						Err(_) => continue,
					};
					for loc in locs {
						record_if_nonidle(reader, niche, -1, &loc, search, &mut report)?;
					}
				}
			}
			Niche::InodeBitmap | Niche::BlockBitmap => {
				for grp in 0..params.groups_count() {
					scan_fixed(reader, &params, niche, 0, grp, None, search, &mut report)?;
				}
			}
		}
	}

	Ok(report)
}

fn scan_fixed(
	reader: &impl VolumeReader,
	params: &VolumeParams,
	niche: Niche,
	ino: u32,
	grp: u64,
	info: Option<&volume::InodeInfo>,
	search: Option<&[Vec<u8>]>,
	report: &mut ScanReport,
) -> Result<(), NicheError> {
	let loc = match locator::locate(niche, params, ino, grp, info) {
		Ok(l) => l,
		Err(_) => return Ok(()),
	};
	let inode_field = if niche.is_per_inode() { ino as i64 } else { -1 };
	record_if_nonidle(reader, niche, inode_field, &loc, search, report)
}

fn scan_per_inode(
	reader: &impl VolumeReader,
	params: &VolumeParams,
	niche: Niche,
	search: Option<&[Vec<u8>]>,
	report: &mut ScanReport,
) -> Result<(), NicheError> {
	for ino in 1..=params.inodes_count {
		let info = reader.get_inode(ino)?;
		scan_fixed(reader, params, niche, ino, 0, Some(&info), search, report)?;
	}
	Ok(())
}

fn scan_reserved_inode(
	reader: &impl VolumeReader,
	params: &VolumeParams,
	search: Option<&[Vec<u8>]>,
	report: &mut ScanReport,
) -> Result<(), NicheError> {
	for ino in [9u32, 10] {
		if ino > params.inodes_count {
			continue;
		}
		let first = match locator::locate(Niche::ReservedInode, params, ino, 0, None) {
			Ok(l) => l,
			Err(_) => continue,
		};
		let second = match locator::reserved_inode_second_run(params, ino) {
			Ok(l) => l,
			Err(_) => continue,
		};
		record_if_nonidle(reader, Niche::ReservedInode, ino as i64, &first, search, report)?;
		record_if_nonidle(reader, Niche::ReservedInode, ino as i64, &second, search, report)?;
	}
	Ok(())
}

fn scan_backup_superblock(
	reader: &impl VolumeReader,
	params: &VolumeParams,
	search: Option<&[Vec<u8>]>,
	report: &mut ScanReport,
) -> Result<(), NicheError> {
	if params.groups_count() < 3 {
		return Ok(());
	}
	let primary = reader.read_at(1024, 1024)?;
	for grp in 0..params.groups_count() {
		if grp == 0 || !is_backup(grp) {
			continue;
		}
		let (first, second) = match locator::backup_superblock_regions(params, grp) {
			Ok(r) => r,
			Err(_) => continue,
		};
		let first_bytes = read_location(reader, &first)?;
		let second_bytes = read_location(reader, &second)?;
		let primary_first = &primary[0..0x5a];
		let primary_second = &primary[0x5e..0x5e + 926];

		if first_bytes != primary_first || second_bytes != primary_second {
			let matched = search.map(|patterns| {
				matches_any(&first_bytes, patterns) || matches_any(&second_bytes, patterns)
			});
			let mut incident = Incident::new(
				-1,
				format!("backup superblock at group {} differs from primary", grp),
				Niche::BackupSuperblock,
			);
			if let Some(m) = matched {
				incident = incident.with_match(m);
			}
			report.incidents.push(incident);
			report.techniques_seen.insert(Niche::BackupSuperblock);
		}
	}
	Ok(())
}

fn record_if_nonidle(
	reader: &impl VolumeReader,
	niche: Niche,
	inode: i64,
	loc: &NicheLocation,
	search: Option<&[Vec<u8>]>,
	report: &mut ScanReport,
) -> Result<(), NicheError> {
	let bytes = read_location(reader, loc)?;
	if matches!(loc.fill, IdleFill::MatchesPrimary) {
		return Ok(());
	}
	if loc.fill.is_idle(&bytes) {
		return Ok(());
	}
	let matched = search.map(|patterns| matches_any(&bytes, patterns));
	let mut incident = Incident::new(inode, format!("non-idle bytes found in {}", niche), niche);
	if let Some(m) = matched {
		incident = incident.with_match(m);
	}
	report.incidents.push(incident);
	report.techniques_seen.insert(niche);
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::hide::hide;
	use std::os::unix::fs::FileExt;
	use tempfile::NamedTempFile;
	use volume::Ext4Image;

	fn make_image(block_size: u32, groups: u32) -> NamedTempFile {
		let blocks_per_group: u32 = 8192;
		let inodes_per_group: u32 = 64;
		let inode_size: u16 = 256;
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

			// Initialize extra_isize (at 0x80 within each inode record) the
			// way a real `mkfs.ext4 -I 256` image does, so
			// `extended_attributes` locates past the field instead of on top
			// of it. Inodes 9 and 10 are left at 0: `reserved_inode`'s
			// second run spans [0x7E, inode_size), which includes this
			// field, and a clean image must read as idle there.
			let table_byte_off = inode_table_block * block_size as u64;
			for j in 0..inodes_per_group as u64 {
				let inode_number = i * inodes_per_group as u64 + j + 1;
				if inode_number == 9 || inode_number == 10 {
					continue;
				}
				let off = table_byte_off + j * inode_size as u64;
				file.as_file().write_all_at(&32u16.to_le_bytes(), off + 0x80).unwrap();
			}
		}

		// Mirror the primary superblock into every sparse-backup group's
		// copy (group 0's "copy" is the primary itself) so a clean image
		// reads as idle at `backup_superblock` too.
		for grp in 1..groups as u64 {
			if !locator::is_backup(grp) {
				continue;
			}
			let offset = (grp * blocks_per_group as u64 + pbs_pad_blocks) * block_size as u64;
			file.as_file().write_all_at(&sb, offset).unwrap();
		}

		file
	}

	#[test]
	fn clean_image_reports_no_incidents() {
		let file = make_image(4096, 3);
		let img = Ext4Image::open(file.path(), false).unwrap();
		let report = scan(&img, None).unwrap();
		assert!(report.incidents.is_empty());
		assert!(report.techniques_seen.is_empty());
	}

	#[test]
	fn hide_then_scan_finds_osd2() {
		let file = make_image(4096, 3);
		{
			let img = Ext4Image::open(file.path(), true).unwrap();
			hide(&img, Niche::Osd2, b"ab", Some(22), None, Some(1)).unwrap();
		}
		let img = Ext4Image::open(file.path(), false).unwrap();
		let patterns = vec![b"ab".to_vec()];
		let report = scan(&img, Some(&patterns)).unwrap();
		assert_eq!(report.techniques_seen.len(), 1);
		assert!(report.techniques_seen.contains(&Niche::Osd2));
		let osd2_incident = report.incidents.iter().find(|i| i.niche == Niche::Osd2).unwrap();
		assert_eq!(osd2_incident.inode, 22);
		assert_eq!(osd2_incident.matched_payload, Some(true));
	}

	#[test]
	fn hide_then_scan_finds_gd_reserved_and_extended_attributes() {
		let file = make_image(4096, 3);
		{
			let img = Ext4Image::open(file.path(), true).unwrap();
			hide(&img, Niche::GdReserved, b"gd", None, Some(0), Some(1)).unwrap();
			hide(&img, Niche::ExtendedAttributes, b"extendAttri", Some(23), None, Some(1)).unwrap();
		}
		let img = Ext4Image::open(file.path(), false).unwrap();
		let report = scan(&img, None).unwrap();
		let mut seen: Vec<&str> = report.techniques_seen.iter().map(|n| n.tag()).collect();
		seen.sort();
		assert_eq!(seen, vec!["extended_attributes", "gd_reserved"]);
	}
}
