/*

Glk constants
=============

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

#![allow(non_upper_case_globals)]

use super::common::*;
use GlkApiError::*;

pub const keycode_Unknown: u32 = 0xffffffff;
pub const keycode_Left: u32 = 0xfffffffe;
pub const keycode_Right: u32 = 0xfffffffd;
pub const keycode_Up: u32 = 0xfffffffc;
pub const keycode_Down: u32 = 0xfffffffb;
pub const keycode_Return: u32 = 0xfffffffa;
pub const keycode_Delete: u32 = 0xfffffff9;
pub const keycode_Escape: u32 = 0xfffffff8;
pub const keycode_Tab: u32 = 0xfffffff7;
pub const keycode_PageUp: u32 = 0xfffffff6;
pub const keycode_PageDown: u32 = 0xfffffff5;
pub const keycode_Home: u32 = 0xfffffff4;
pub const keycode_End: u32 = 0xfffffff3;
pub const keycode_Func1: u32 = 0xffffffef;
pub const keycode_Func2: u32 = 0xffffffee;
pub const keycode_Func3: u32 = 0xffffffed;
pub const keycode_Func4: u32 = 0xffffffec;
pub const keycode_Func5: u32 = 0xffffffeb;
pub const keycode_Func6: u32 = 0xffffffea;
pub const keycode_Func7: u32 = 0xffffffe9;
pub const keycode_Func8: u32 = 0xffffffe8;
pub const keycode_Func9: u32 = 0xffffffe7;
pub const keycode_Func10: u32 = 0xffffffe6;
pub const keycode_Func11: u32 = 0xffffffe5;
pub const keycode_Func12: u32 = 0xffffffe4;

pub const evtype_None: u32 = 0;
pub const evtype_Timer: u32 = 1;
pub const evtype_CharInput: u32 = 2;
pub const evtype_LineInput: u32 = 3;
pub const evtype_MouseInput: u32 = 4;
pub const evtype_Arrange: u32 = 5;
pub const evtype_Redraw: u32 = 6;
pub const evtype_SoundNotify: u32 = 7;
pub const evtype_Hyperlink: u32 = 8;

pub const wintype_AllTypes: u32 = 0;
pub const wintype_Pair: u32 = 1;
pub const wintype_Blank: u32 = 2;
pub const wintype_TextBuffer: u32 = 3;
pub const wintype_TextGrid: u32 = 4;
pub const wintype_Graphics: u32 = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub enum WindowType {
    All = 0,
    Pair = 1,
    #[default]
    Blank = 2,
    Buffer = 3,
    Graphics = 5,
    Grid = 4,
}

pub fn window_type(wintype: u32) -> GlkResult<WindowType> {
    match wintype {
        wintype_Blank => Ok(WindowType::Blank),
        wintype_TextBuffer => Ok(WindowType::Buffer),
        wintype_TextGrid => Ok(WindowType::Grid),
        wintype_Graphics => Ok(WindowType::Graphics),
        _ => Err(InvalidWindowType),
    }
}

pub const winmethod_Left : u32 = 0x00;
pub const winmethod_Right: u32 = 0x01;
pub const winmethod_Above: u32 = 0x02;
pub const winmethod_Below: u32 = 0x03;
pub const winmethod_DirMask: u32 = 0x0f;

pub const winmethod_Fixed: u32 = 0x10;
pub const winmethod_Proportional: u32 = 0x20;
pub const winmethod_DivisionMask: u32 = 0xf0;

pub const winmethod_Border: u32 = 0x000;
pub const winmethod_NoBorder: u32 = 0x100;
pub const winmethod_BorderMask: u32 = 0x100;

pub fn validate_winmethod(method: u32, wintype: WindowType) -> GlkResult<(u32, u32, u32)> {
    if wintype == WindowType::Pair {
        return Err(SplitCantBePair);
    }
    let division = method & winmethod_DivisionMask;
    let direction = method & winmethod_DirMask;
    if division != winmethod_Fixed && division != winmethod_Proportional {
        return Err(InvalidWindowDivision)
    }
    if division == winmethod_Fixed && wintype == WindowType::Blank {
        return Err(InvalidWindowDivisionBlank)
    }
    if let winmethod_Above | winmethod_Below | winmethod_Left | winmethod_Right = direction {}
    else {
        return Err(InvalidWindowDirection)
    }
    Ok((division, direction, method & winmethod_BorderMask))
}

pub const filemode_Write: u32 = 0x01;
pub const filemode_Read: u32 = 0x02;
pub const filemode_ReadWrite: u32 = 0x03;
pub const filemode_WriteAppend: u32 = 0x05;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub enum FileMode {
    #[default]
    Write = 0x01,
    Read = 0x02,
    ReadWrite = 0x03,
    WriteAppend = 0x05,
}

pub fn file_mode(fmode: u32) -> GlkResult<FileMode> {
    match fmode {
        filemode_Write => Ok(FileMode::Write),
        filemode_Read => Ok(FileMode::Read),
        filemode_ReadWrite => Ok(FileMode::ReadWrite),
        filemode_WriteAppend => Ok(FileMode::WriteAppend),
        _ => Err(IllegalFilemode),
    }
}

pub const fileusage_Data: u32 = 0x00;
pub const fileusage_SavedGame: u32 = 0x01;
pub const fileusage_Transcript: u32 = 0x02;
pub const fileusage_InputRecord: u32 = 0x03;
pub const fileusage_TypeMask: u32 = 0x0f;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub enum FileType {
    #[default]
    Data = 0,
    SavedGame,
    Transcript,
    InputRecord,
}

pub fn file_type(filetype: u32) -> FileType {
    match filetype & fileusage_TypeMask {
        fileusage_SavedGame => FileType::SavedGame,
        fileusage_Transcript => FileType::Transcript,
        fileusage_InputRecord => FileType::InputRecord,
        _ => FileType::Data,
    }
}

pub fn filetype_suffix(filetype: FileType) -> &'static str {
    match filetype {
        FileType::Data => ".glkdata",
        FileType::SavedGame => ".glksave",
        FileType::Transcript | FileType::InputRecord => ".txt",
    }
}
