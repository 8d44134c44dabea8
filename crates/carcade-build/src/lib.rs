//! Static site builds for Carcade.
//!
//! [`SiteBuilder`] runs the site tree pipeline once per configured language
//! and renders every node except the root to `<url>/index.html`. A build is
//! all-or-nothing: any failure removes the build directory.
//! [`SiteBuilder::build_atomically`] builds into a hidden sibling directory
//! and publishes it by swapping a symlink.
//!
//! Translation catalogs and message extraction live in [`i18n`] and
//! [`extract`].

mod assets;
mod builder;
mod error;
pub mod extract;
pub mod i18n;
mod publish;
mod template;

pub use builder::{BuildConfig, BuildReport, INDEX_FILE, SiteBuilder, output_file};
pub use carcade_site::SiteError;
pub use error::BuildError;
pub use publish::BUILD_DIR_PREFIX;
