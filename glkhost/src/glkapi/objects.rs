/*

Glk object stores
=================

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::num::NonZeroU32;

/** A handle into a [`GlkObjectStore`]. Handles are generational: closing an
    object bumps its slot's generation, so a stale handle fails the validity
    check in O(1) instead of being confused with a later object reusing the
    same slot. */
pub struct GlkId<T> {
    index: u32,
    generation: NonZeroU32,
    _class: PhantomData<fn() -> T>,
}

// Derives would bound on T, but the id doesn't own a T
impl<T> Clone for GlkId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for GlkId<T> {}
impl<T> PartialEq for GlkId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<T> Eq for GlkId<T> {}
impl<T> Hash for GlkId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}
impl<T> fmt::Debug for GlkId<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GlkId({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: NonZeroU32,
    entry: Option<Entry<T>>,
}

struct Entry<T> {
    obj: T,
    rock: u32,
}

pub struct IterationResult<T> {
    pub id: GlkId<T>,
    pub rock: u32,
}

/** One store per Glk object class (windows, streams, filerefs) */
pub struct GlkObjectStore<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for GlkObjectStore<T> {
    fn default() -> Self {
        GlkObjectStore {
            slots: vec![],
            free: vec![],
        }
    }
}

const FIRST_GENERATION: NonZeroU32 = NonZeroU32::MIN;

impl<T> GlkObjectStore<T> {
    pub fn new() -> Self {
        GlkObjectStore::default()
    }

    pub fn register(&mut self, obj: T, rock: u32) -> GlkId<T> {
        let entry = Entry {obj, rock};
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                GlkId {
                    index,
                    generation: slot.generation,
                    _class: PhantomData,
                }
            },
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: FIRST_GENERATION,
                    entry: Some(entry),
                });
                GlkId {
                    index,
                    generation: FIRST_GENERATION,
                    _class: PhantomData,
                }
            },
        }
    }

    pub fn get(&self, id: GlkId<T>) -> Option<&T> {
        self.slots.get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .map(|entry| &entry.obj)
    }

    pub fn get_mut(&mut self, id: GlkId<T>) -> Option<&mut T> {
        self.slots.get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
            .map(|entry| &mut entry.obj)
    }

    pub fn contains(&self, id: GlkId<T>) -> bool {
        self.get(id).is_some()
    }

    pub fn rock(&self, id: GlkId<T>) -> Option<u32> {
        self.slots.get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .map(|entry| entry.rock)
    }

    /** Remove an object, invalidating every outstanding handle to it */
    pub fn unregister(&mut self, id: GlkId<T>) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.checked_add(1)
            .unwrap_or(FIRST_GENERATION);
        self.free.push(id.index);
        Some(entry.obj)
    }

    /** Glk-style iteration: pass `None` to get the first object, then each
        result's id to get the next. Slot order, stable between mutations. */
    pub fn iterate(&self, prev: Option<GlkId<T>>) -> Option<IterationResult<T>> {
        let start = match prev {
            Some(id) if self.contains(id) => id.index as usize + 1,
            Some(_) => return None,
            None => 0,
        };
        self.slots[start.min(self.slots.len())..].iter()
            .enumerate()
            .find_map(|(offset, slot)| {
                slot.entry.as_ref().map(|entry| IterationResult {
                    id: GlkId {
                        index: (start + offset) as u32,
                        generation: slot.generation,
                        _class: PhantomData,
                    },
                    rock: entry.rock,
                })
            })
    }

    /** Snapshot the live ids, for destructive sweeps */
    pub fn ids(&self) -> Vec<GlkId<T>> {
        self.slots.iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_some())
            .map(|(index, slot)| GlkId {
                index: index as u32,
                generation: slot.generation,
                _class: PhantomData,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
