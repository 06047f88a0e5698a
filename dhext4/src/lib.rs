//! Anti-forensic EXT4 niche hiding and detection engines.
//!
//! Two paired engines operate over twelve byte-precise EXT4 metadata
//! locations: [`hide::hide`] writes a payload into exactly one niche;
//! [`detect::scan`] walks every niche/inode/group instantiation and
//! reports which ones are no longer idle.

pub mod detect;
pub mod error;
pub mod hide;
pub mod incident;
pub mod locator;
pub mod niche;
pub mod params;

pub use detect::{scan, ScanReport};
pub use error::NicheError;
pub use hide::{hide, HideResult};
pub use incident::Incident;
pub use niche::{IdleFill, Niche};
pub use params::VolumeParams;
