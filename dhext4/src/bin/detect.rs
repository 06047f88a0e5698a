//! The `detect` tool scans an EXT4 image for non-idle anti-forensic
//! niches.

use clap::Parser;
use dhext4::scan;
use std::path::PathBuf;
use std::process::exit;
use volume::Ext4Image;

/// Scans an EXT4 image for data hidden in anti-forensic niches.
#[derive(Parser)]
#[command(name = "detect")]
struct Args {
	/// Path to the EXT4 image to scan.
	#[arg(long)]
	filename: PathBuf,

	/// Print one report line per incident.
	#[arg(long)]
	log: bool,

	/// A byte pattern to search for inside each niche. Repeatable; a
	/// niche matches if any one pattern is found.
	#[arg(long = "string")]
	strings: Vec<String>,
}

fn main() {
	let args = Args::parse();
	let prog = "detect";

	let image = Ext4Image::open(&args.filename, false).unwrap_or_else(|e| {
		eprintln!("{}: {}: {}", prog, args.filename.display(), e);
		exit(1);
	});

	let patterns: Option<Vec<Vec<u8>>> =
		if args.strings.is_empty() { None } else { Some(args.strings.iter().map(|s| s.as_bytes().to_vec()).collect()) };

	let report = scan(&image, patterns.as_deref()).unwrap_or_else(|e| {
		eprintln!("{}: {}", prog, e);
		exit(1);
	});

	if args.log {
		for incident in &report.incidents {
			println!("{}", incident);
		}
	}

	println!("techniques seen: {}", report.techniques_seen.len());
}
