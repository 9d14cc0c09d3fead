//! Generational slot storage handing out [`BodyId`] handles.

use stellar_orbits::BodyId;

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

/// Vec-backed arena. Removed slots are recycled with a bumped generation so stale handles miss.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: T) -> BodyId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.item = Some(item);
            return BodyId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            item: Some(item),
        });
        BodyId {
            index,
            generation: 0,
        }
    }

    pub fn remove(&mut self, id: BodyId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let item = slot.item.take()?;
        self.free.push(id.index);
        self.len -= 1;
        Some(item)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: BodyId) -> Option<&T> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.item.as_ref()
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.item.as_mut()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live handles and items in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.item.as_ref().map(|item| {
                (
                    BodyId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    item,
                )
            })
        })
    }
}
