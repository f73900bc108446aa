/*

glkhost - a threaded Glk coordination core
==========================================

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

//! The cross-thread coordination core of a Glk library.
//!
//! An interpreter plugin runs its `glk_main()` on a dedicated worker thread,
//! while all widget mutation happens on the GUI toolkit's main thread. This
//! crate provides the pieces that make that split work: the message bridge
//! that marshals UI-affecting operations across threads, the window
//! arrangement tree, the bounded event queue, the abort/shutdown protocol,
//! and the forced-input queues. The concrete rendering of widgets is left to
//! the embedder behind the [`WidgetSystem`](host::WidgetSystem) trait.

pub mod glkapi;
pub mod host;
pub mod plugin;

use thiserror::Error;

/** Glk's access to the file system. File streams read their whole file when
    opened and write it back when closed, so the core never holds OS file
    handles across the thread boundary. */
pub trait GlkFileSystem: Send {
    fn file_exists(&self, filename: &str) -> bool;
    fn file_delete(&self, filename: &str);
    fn file_read(&self, filename: &str) -> Option<Vec<u8>>;
    fn file_write(&self, filename: &str, buf: &[u8]) -> bool;
    /** Produce a fresh name for a temporary fileref */
    fn temporary_filename(&self) -> String;
}

/** The standard file system implementation */
#[derive(Default)]
pub struct StdFileSystem {}

impl GlkFileSystem for StdFileSystem {
    fn file_exists(&self, filename: &str) -> bool {
        std::path::Path::new(filename).exists()
    }

    fn file_delete(&self, filename: &str) {
        let _ = std::fs::remove_file(filename);
    }

    fn file_read(&self, filename: &str) -> Option<Vec<u8>> {
        std::fs::read(filename).ok()
    }

    fn file_write(&self, filename: &str, buf: &[u8]) -> bool {
        std::fs::write(filename, buf).is_ok()
    }

    fn temporary_filename(&self) -> String {
        let mut path = std::env::temp_dir();
        // Nanosecond timestamps are unique enough for one session
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|dur| dur.as_nanos())
            .unwrap_or(0);
        path.push(format!("glkhost-{}-{stamp}", std::process::id()));
        path.to_string_lossy().into_owned()
    }
}

/** What a resource is used for, when loading it from a resource map */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceUsage {
    Data,
    Image,
    Sound,
}

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("no resource with number {0}")]
    NotFound(u32),
    #[error("resource map error: {0}")]
    Malformed(String),
}

/** Access to a Blorb-style resource map. The chunk format itself is parsed
    elsewhere; the core only owns the lifecycle of the map. */
pub trait ResourceMap: Send {
    fn load(&mut self, usage: ResourceUsage, number: u32) -> Result<Vec<u8>, ResourceError>;
}
