/*

Glk filerefs
============

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

use super::constants::*;
use super::objects::GlkId;

pub type FrefId = GlkId<FileRef>;

pub struct FileRef {
    pub filename: String,
    pub filetype: FileType,
    /** Temporary files are deleted when the session shuts down */
    pub temporary: bool,
}

impl FileRef {
    pub fn new(filename: String, usage: u32) -> Self {
        FileRef {
            filename,
            filetype: file_type(usage),
            temporary: false,
        }
    }

    pub fn temp(filename: String, usage: u32) -> Self {
        FileRef {
            filename,
            filetype: file_type(usage),
            temporary: true,
        }
    }
}

/** Build a filename from a player-supplied name: path separators are
    replaced and the usage suffix is appended. */
pub fn filename_for_name(name: &str, usage: u32) -> String {
    let cleaned: String = name.chars()
        .map(|char| if char == '/' || char == '\\' {'-'} else {char})
        .collect();
    format!("{}{}", cleaned, filetype_suffix(file_type(usage)))
}
