/*

Common types
============

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

use thiserror::Error;

pub type GlkResult<T> = Result<T, GlkApiError>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GlkApiError {
    #[error("cannot close window stream directly")]
    CannotCloseWindowStream,
    #[error("illegal filemode")]
    IllegalFilemode,
    #[error("invalid proportion: must be 0 to 100")]
    InvalidProportion,
    #[error("invalid reference")]
    InvalidReference,
    #[error("invalid method: blank windows can only be split proportionally")]
    InvalidWindowDivisionBlank,
    #[error("invalid method: must be fixed or proportional")]
    InvalidWindowDivision,
    #[error("invalid method: bad direction")]
    InvalidWindowDirection,
    #[error("invalid wintype")]
    InvalidWindowType,
    #[error("keywin must be a descendant of the pair window")]
    KeyWindowNotDescendant,
    #[error("window is not a pair window")]
    NotAPairWindow,
    #[error("window already has keyboard request")]
    PendingKeyboardRequest,
    #[error("no line input request pending")]
    NoLineInputRequest,
    #[error("cannot read from write-only stream")]
    ReadFromWriteOnly,
    #[error("splitwin must be null for first window")]
    SplitMustBeNull,
    #[error("splitwin cannot be a pair window")]
    SplitCantBePair,
    #[error("invalid splitwin")]
    InvalidSplitwin,
    #[error("window does not support keyboard input")]
    WindowDoesntSupportCharInput,
    #[error("cannot write to read-only stream")]
    WriteToReadOnly,
}
