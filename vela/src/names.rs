use std::collections::VecDeque;

const INDEX_BITS: u32 = 24;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Splits a name into its slot index and generation. Name zero is never handed out.
fn split(name: u32) -> Option<(usize, u8)> {
    let slot = name & INDEX_MASK;
    if slot == 0 {
        return None;
    }
    Some(((slot - 1) as usize, (name >> INDEX_BITS) as u8))
}

fn join(index: usize, gen: u8) -> u32 {
    ((gen as u32) << INDEX_BITS) | (index as u32 + 1)
}

struct Slot<T> {
    gen: u8,
    item: Option<T>,
}

/// Objects addressed by generational `u32` names, the way native apis name them.
///
/// A removed name is stale forever after (until its 8 bit generation wraps), so a deleted
/// object cannot be reached through an old name.
pub(crate) struct NameTable<T> {
    slots: Vec<Slot<T>>,
    free: VecDeque<usize>,
    len: usize,
}

impl<T> Default for NameTable<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: VecDeque::new(),
            len: 0,
        }
    }
}

impl<T> NameTable<T> {
    /// Returns `None` when every name is in use.
    pub(crate) fn insert(&mut self, item: T) -> Option<u32> {
        let index = match self.free.pop_front() {
            Some(index) => index,
            None => {
                if self.slots.len() >= INDEX_MASK as usize {
                    return None;
                }
                self.slots.push(Slot { gen: 0, item: None });
                self.slots.len() - 1
            }
        };

        self.slots[index].item = Some(item);
        self.len += 1;

        Some(join(index, self.slots[index].gen))
    }

    pub(crate) fn remove(&mut self, name: u32) -> Option<T> {
        let (index, gen) = split(name)?;
        let slot = self.slots.get_mut(index)?;
        if slot.gen != gen {
            return None;
        }

        let item = slot.item.take()?;
        slot.gen = slot.gen.wrapping_add(1);
        self.free.push_back(index);
        self.len -= 1;

        Some(item)
    }

    pub(crate) fn get(&self, name: u32) -> Option<&T> {
        let (index, gen) = split(name)?;
        self.slots
            .get(index)
            .filter(|slot| slot.gen == gen)
            .and_then(|slot| slot.item.as_ref())
    }

    pub(crate) fn get_mut(&mut self, name: u32) -> Option<&mut T> {
        let (index, gen) = split(name)?;
        self.slots
            .get_mut(index)
            .filter(|slot| slot.gen == gen)
            .and_then(|slot| slot.item.as_mut())
    }

    pub(crate) fn contains(&self, name: u32) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.item.as_ref().map(|item| (join(index, slot.gen), item))
        })
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.item.as_mut())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_are_never_zero() {
        let mut table = NameTable::default();

        let name = table.insert("a").unwrap();

        assert_ne!(0, name);
        assert_eq!(None, table.get(0));
        assert_eq!(Some(&"a"), table.get(name));
    }

    #[test]
    fn removed_names_are_stale() {
        let mut table = NameTable::default();
        let first = table.insert(1).unwrap();

        assert_eq!(Some(1), table.remove(first));
        let second = table.insert(2).unwrap();

        assert_ne!(first, second);
        assert_eq!(None, table.get(first));
        assert_eq!(None, table.remove(first));
        assert_eq!(Some(&2), table.get(second));
        assert_eq!(1, table.len());
    }

    #[test]
    fn iter_yields_live_entries_with_their_names() {
        let mut table = NameTable::default();
        let a = table.insert('a').unwrap();
        let b = table.insert('b').unwrap();
        let c = table.insert('c').unwrap();
        table.remove(b);

        let live: Vec<_> = table.iter().collect();

        assert_eq!(vec![(a, &'a'), (c, &'c')], live);
        assert!(table.contains(c));
        assert!(!table.contains(b));
    }
}
