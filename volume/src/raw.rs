//! On-disk EXT4 structures, read and written as packed byte layouts.
//!
//! These mirror the real kernel structures closely enough to locate every
//! field this crate needs; fields this crate never reads are folded into
//! padding arrays rather than named individually.

use std::mem::size_of;

/// Offset of the superblock from the start of block group 0.
pub const SUPERBLOCK_OFFSET: u64 = 1024;
/// The ext2/3/4 magic number.
pub const EXT4_MAGIC: u16 = 0xef53;

/// The fixed 1024-byte superblock, as it appears at `SUPERBLOCK_OFFSET`
/// (and, at each sparse-superblock backup group, at the start of the
/// group).
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RawSuperblock {
	pub inodes_count: u32,
	pub blocks_count_lo: u32,
	pub r_blocks_count_lo: u32,
	pub free_blocks_count_lo: u32,
	pub free_inodes_count: u32,
	pub first_data_block: u32,
	pub log_block_size: u32,
	pub log_cluster_size: u32,
	pub blocks_per_group: u32,
	pub clusters_per_group: u32,
	pub inodes_per_group: u32,
	pub mtime: u32,
	pub wtime: u32,
	pub mnt_count: u16,
	pub max_mnt_count: u16,
	pub magic: u16,
	pub state: u16,
	pub errors: u16,
	pub minor_rev_level: u16,
	pub lastcheck: u32,
	pub checkinterval: u32,
	pub creator_os: u32,
	pub rev_level: u32,
	pub def_resuid: u16,
	pub def_resgid: u16,

	// -- Dynamic (EXT2_DYNAMIC_REV) fields --
	pub first_ino: u32,
	pub inode_size: u16,
	pub block_group_nr: u16,
	pub feature_compat: u32,
	pub feature_incompat: u32,
	pub feature_ro_compat: u32,
	pub uuid: [u8; 16],
	pub volume_name: [u8; 16],
	pub last_mounted: [u8; 64],
	pub algorithm_usage_bitmap: u32,

	pub prealloc_blocks: u8,
	pub prealloc_dir_blocks: u8,
	pub reserved_gdt_blocks: u16,

	pub journal_uuid: [u8; 16],
	pub journal_inum: u32,
	pub journal_dev: u32,
	pub last_orphan: u32,
	pub hash_seed: [u32; 4],
	pub def_hash_version: u8,
	pub jnl_backup_type: u8,
	pub desc_size: u16,
	pub default_mount_opts: u32,
	pub first_meta_bg: u32,
	pub mkfs_time: u32,
	pub jnl_blocks: [u32; 17],

	// -- 64-bit support --
	pub blocks_count_hi: u32,
	pub r_blocks_count_hi: u32,
	pub free_blocks_count_hi: u32,
	pub min_extra_isize: u16,
	pub want_extra_isize: u16,
	pub flags: u32,

	/// Padding out to the 1024-byte superblock record (this crate never
	/// needs the RAID/quota/checksum-seed fields that follow).
	pub _padding: [u8; 1024 - 356],
}

const _: () = assert!(size_of::<RawSuperblock>() == 1024);

/// The 64-bit-capable block group descriptor (32 bytes when
/// `desc_size == 32`, 64 when `desc_size == 64`). This crate only reads
/// the low halves it needs plus enough padding to skip to the next
/// descriptor at the right stride.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RawGroupDescriptor32 {
	pub block_bitmap_lo: u32,
	pub inode_bitmap_lo: u32,
	pub inode_table_lo: u32,
	pub free_blocks_count_lo: u16,
	pub free_inodes_count_lo: u16,
	pub used_dirs_count_lo: u16,
	pub flags: u16,
	pub exclude_bitmap_lo: u32,
	pub block_bitmap_csum_lo: u16,
	pub inode_bitmap_csum_lo: u16,
	pub itable_unused_lo: u16,
	pub checksum: u16,
}

const _: () = assert!(size_of::<RawGroupDescriptor32>() == 32);

/// The high half appended when `desc_size == 64`.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RawGroupDescriptor64Tail {
	pub block_bitmap_hi: u32,
	pub inode_bitmap_hi: u32,
	pub inode_table_hi: u32,
	pub free_blocks_count_hi: u16,
	pub free_inodes_count_hi: u16,
	pub used_dirs_count_hi: u16,
	pub itable_unused_hi: u16,
	pub exclude_bitmap_hi: u32,
	pub block_bitmap_csum_hi: u16,
	pub inode_bitmap_csum_hi: u16,
	pub reserved: u32,
}

const _: () = assert!(size_of::<RawGroupDescriptor64Tail>() == 32);

/// File mode bit identifying a regular file in `i_mode`.
pub const S_IFREG: u16 = 0x8000;
pub const S_IFMT: u16 = 0xf000;

/// Flag in `i_flags` marking an inode's `i_block` as an extent tree
/// rather than a direct/indirect block map.
pub const EXT4_EXTENTS_FL: u32 = 0x80000;

/// The 128-byte classic inode record. Larger inode sizes (the common
/// 256-byte case) append the fields in `RawInodeExtra` right after this.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RawInode {
	pub mode: u16,
	pub uid_lo: u16,
	pub size_lo: u32,
	pub atime: u32,
	pub ctime: u32,
	pub mtime: u32,
	pub dtime: u32,
	pub gid_lo: u16,
	pub links_count: u16,
	pub blocks_lo: u32,
	pub flags: u32,
	pub osd1: u32,
	/// Either 15 direct/indirect block pointers, or (when `EXT4_EXTENTS_FL`
	/// is set) an extent tree header followed by up to 4 extent entries.
	pub i_block: [u8; 60],
	pub generation: u32,
	pub file_acl_lo: u32,
	pub size_high: u32,
	pub obso_faddr: u32,
	/// `osd2`: on Linux, `l_i_blocks_high`, `l_i_file_acl_high`,
	/// `l_i_uid_high`, `l_i_gid_high`, `l_i_checksum_lo`, `l_i_reserved`.
	pub osd2: [u8; 12],
}

const _: () = assert!(size_of::<RawInode>() == 128);

/// Extent tree header, the first 12 bytes of `i_block` when
/// `EXT4_EXTENTS_FL` is set.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct ExtentHeader {
	pub magic: u16,
	pub entries: u16,
	pub max: u16,
	pub depth: u16,
	pub generation: u32,
}

pub const EXTENT_MAGIC: u16 = 0xf30a;

/// A leaf extent entry (`depth == 0`): `block_count` blocks starting at
/// `logical_block`, physically located at `start_block`.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct ExtentLeaf {
	pub logical_block: u32,
	pub block_count_raw: u16,
	pub start_hi: u16,
	pub start_lo: u32,
}
