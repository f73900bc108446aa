/*

Macros!
=======

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

/** Apply the forgiving error policy: log the problem and return a harmless
    default rather than crashing the interpreter. */
macro_rules! forgiving {
    ($res: expr, $default: expr) => {
        match $res {
            Ok(val) => val,
            Err(err) => {
                tracing::warn!("glk call ignored: {err}");
                $default
            },
        }
    };
    ($res: expr) => {
        forgiving!($res, Default::default())
    };
}
pub(crate) use forgiving;

macro_rules! win {
    ($state: expr, $win_id: expr) => {
        $state.windows.get($win_id).ok_or(InvalidReference)?
    }
}
pub(crate) use win;

macro_rules! win_mut {
    ($state: expr, $win_id: expr) => {
        $state.windows.get_mut($win_id).ok_or(InvalidReference)?
    }
}
pub(crate) use win_mut;

macro_rules! str_mut {
    ($state: expr, $str_id: expr) => {
        $state.streams.get_mut($str_id).ok_or(InvalidReference)?
    }
}
pub(crate) use str_mut;
