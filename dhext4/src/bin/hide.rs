//! The `hide` tool writes a payload into one EXT4 anti-forensic niche.

use clap::Parser;
use dhext4::{hide, Niche};
use std::path::PathBuf;
use std::process::exit;
use volume::Ext4Image;

/// Hides a payload inside an EXT4 metadata niche.
#[derive(Parser)]
#[command(name = "hide")]
struct Args {
	/// Path to the EXT4 image to modify.
	#[arg(long)]
	filename: PathBuf,

	/// The niche to write into.
	#[arg(long, value_enum)]
	technique: Niche,

	/// The payload to hide, as a UTF-8 string.
	#[arg(long)]
	data: String,

	/// Inode number to target, for per-inode niches. Defaults to a
	/// random inode (or, for `reserved_inode`, to inode 9).
	#[arg(long)]
	inode: Option<u32>,

	/// Block group to target, for per-group niches. Defaults to 3.
	#[arg(long)]
	group: Option<u32>,

	/// Seeds the inode-selection RNG for reproducible runs.
	#[arg(long)]
	seed: Option<u64>,

	/// Print a line describing the write that was performed.
	#[arg(long)]
	log: bool,
}

fn main() {
	let args = Args::parse();
	let prog = "hide";

	let image = Ext4Image::open(&args.filename, true).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", prog, args.filename.display(), e);
		exit(1);
	});

	let result = hide(&image, args.technique, args.data.as_bytes(), args.inode, args.group, args.seed)
		.unwrap_or_else(|e| {
			eprintln!("{}: {}", prog, e);
			exit(1);
		});

	if args.log {
		println!(
			"wrote {} bytes to niche {} at offset {}",
			result.bytes_written, result.niche, result.absolute_offset
		);
	}
}
