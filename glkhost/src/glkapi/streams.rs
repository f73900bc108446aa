/*

Glk streams
===========

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

use super::common::*;
use super::constants::*;
use super::objects::GlkId;
use super::windows::WinId;
use GlkApiError::*;

pub type StrId = GlkId<Stream>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamResult {
    pub read_count: u32,
    pub write_count: u32,
}

pub struct Stream {
    pub data: StreamData,
    pub fmode: FileMode,
    pub read_count: u32,
    pub write_count: u32,
}

pub enum StreamData {
    /** Output is routed into the window's pending text buffer */
    Window {
        win: WinId,
    },
    Memory(MemoryStream),
    File(FileStream),
}

impl Stream {
    pub fn window(win: WinId) -> Self {
        Stream {
            data: StreamData::Window {win},
            fmode: FileMode::Write,
            read_count: 0,
            write_count: 0,
        }
    }

    pub fn memory(buf: Vec<char>, fmode: FileMode) -> Self {
        Stream {
            data: StreamData::Memory(MemoryStream {
                buf,
                pos: 0,
            }),
            fmode,
            read_count: 0,
            write_count: 0,
        }
    }

    pub fn file(filename: String, content: Vec<u8>, fmode: FileMode) -> Self {
        let pos = match fmode {
            FileMode::WriteAppend => content.len(),
            _ => 0,
        };
        let content = if fmode == FileMode::Write {vec![]} else {content};
        Stream {
            data: StreamData::File(FileStream {
                filename,
                content,
                pos: if fmode == FileMode::Write {0} else {pos},
                dirty: false,
            }),
            fmode,
            read_count: 0,
            write_count: 0,
        }
    }

    pub fn window_id(&self) -> Option<WinId> {
        match self.data {
            StreamData::Window {win} => Some(win),
            _ => None,
        }
    }

    pub fn is_window(&self) -> bool {
        matches!(self.data, StreamData::Window {..})
    }

    pub fn writable(&self) -> bool {
        self.fmode != FileMode::Read
    }

    pub fn readable(&self) -> bool {
        self.fmode != FileMode::Write && self.fmode != FileMode::WriteAppend
    }

    /** Write to a non-window stream. Window streams are routed through the
        session so that echo streams and pending text are handled there. */
    pub fn put_string(&mut self, str: &str) -> GlkResult<()> {
        if !self.writable() {
            return Err(WriteToReadOnly);
        }
        self.write_count += str.chars().count() as u32;
        match &mut self.data {
            StreamData::Window {..} => Ok(()),
            StreamData::Memory(mem) => {
                mem.put_string(str);
                Ok(())
            },
            StreamData::File(file) => {
                file.put_string(str);
                Ok(())
            },
        }
    }

    pub fn get_char(&mut self) -> GlkResult<Option<char>> {
        if !self.readable() {
            return Err(ReadFromWriteOnly);
        }
        let result = match &mut self.data {
            StreamData::Window {..} => None,
            StreamData::Memory(mem) => mem.get_char(),
            StreamData::File(file) => file.get_char(),
        };
        if result.is_some() {
            self.read_count += 1;
        }
        Ok(result)
    }

    pub fn result(&self) -> StreamResult {
        StreamResult {
            read_count: self.read_count,
            write_count: self.write_count,
        }
    }
}

pub struct MemoryStream {
    buf: Vec<char>,
    pos: usize,
}

impl MemoryStream {
    fn put_string(&mut self, str: &str) {
        for char in str.chars() {
            if self.pos < self.buf.len() {
                self.buf[self.pos] = char;
                self.pos += 1;
            }
            else {
                // Memory streams never grow; surplus output is discarded
                break;
            }
        }
    }

    fn get_char(&mut self) -> Option<char> {
        let char = self.buf.get(self.pos).copied()?;
        self.pos += 1;
        Some(char)
    }

    pub fn take_buffer(self) -> Vec<char> {
        self.buf
    }
}

/** A file stream holds the whole file in memory; the session writes it back
    through the file system boundary when the stream closes. */
pub struct FileStream {
    pub filename: String,
    content: Vec<u8>,
    pos: usize,
    dirty: bool,
}

impl FileStream {
    fn put_string(&mut self, str: &str) {
        for byte in str.bytes() {
            if self.pos < self.content.len() {
                self.content[self.pos] = byte;
            }
            else {
                self.content.push(byte);
            }
            self.pos += 1;
        }
        self.dirty = true;
    }

    fn get_char(&mut self) -> Option<char> {
        let byte = self.content.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte as char)
    }

    pub fn needs_writeback(&self) -> bool {
        self.dirty
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}
