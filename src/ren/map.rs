// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/map.rs

// MAP! storage: insertion-ordered key/value pairs with a hash index.
// Keys match by loose equality, so words and text ignore case.

// <>

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::cell::Cell;
use super::compare::{equal_values, hash_value};
use super::error::{fail, ErrId};
use super::throws::Flow;

#[derive(Default)]
struct MapData {
    pairs: Vec<(Cell, Cell)>,
    index: HashMap<u32, Vec<usize>>,
}

impl MapData {
    fn find(&self, key: &Cell) -> Option<usize> {
        let slots = self.index.get(&hash_value(key))?;
        slots
            .iter()
            .copied()
            .find(|&i| equal_values(&self.pairs[i].0, key, false))
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, (key, _)) in self.pairs.iter().enumerate() {
            self.index.entry(hash_value(key)).or_default().push(i);
        }
    }
}

/// Shared reference to a map
#[derive(Clone, Default)]
pub struct MapRef(Rc<RefCell<MapData>>);

impl MapRef {
    pub fn new() -> MapRef {
        MapRef::default()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Cell) -> Option<Cell> {
        let data = self.0.borrow();
        let found = data.find(key).map(|i| data.pairs[i].1.clone());
        found
    }

    /// Insert or replace; storing void removes the key
    pub fn put(&self, key: Cell, value: Cell) -> Result<(), Flow> {
        if key.is_void() || key.is_trash() {
            return Err(fail(ErrId::InvalidArg, &[Cell::blank()]));
        }
        let mut data = self.0.borrow_mut();
        match (data.find(&key), value.is_void()) {
            (Some(i), false) => data.pairs[i].1 = value.stored(),
            (Some(i), true) => {
                data.pairs.remove(i);
                data.reindex();
            }
            (None, false) => {
                let i = data.pairs.len();
                let hash = hash_value(&key);
                data.pairs.push((key.stored(), value.stored()));
                data.index.entry(hash).or_default().push(i);
            }
            (None, true) => (),
        }
        Ok(())
    }

    pub fn pairs(&self) -> Vec<(Cell, Cell)> {
        self.0.borrow().pairs.clone()
    }

    pub fn same(&self, other: &MapRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const u8 as usize
    }

    pub fn copy(&self) -> MapRef {
        let data = self.0.borrow();
        MapRef(Rc::new(RefCell::new(MapData {
            pairs: data.pairs.clone(),
            index: data.index.clone(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ren::kinds::Kind;
    use crate::ren::symtab::Sym;

    #[test]
    fn keys_match_loosely() {
        let map = MapRef::new();
        map.put(Cell::string("Key"), Cell::integer(1)).unwrap();
        map.put(Cell::word(Kind::Word, Sym::intern("a")), Cell::integer(2))
            .unwrap();
        assert_eq!(Some(1), map.get(&Cell::string("key")).and_then(|c| c.as_integer()));
        assert_eq!(
            Some(2),
            map.get(&Cell::word(Kind::SetWord, Sym::intern("A")))
                .and_then(|c| c.as_integer())
        );
    }

    #[test]
    fn void_removes_and_order_holds() {
        let map = MapRef::new();
        for i in 0..4 {
            map.put(Cell::integer(i), Cell::integer(i * 10)).unwrap();
        }
        map.put(Cell::integer(1), Cell::void()).unwrap();
        assert_eq!(3, map.len());
        let keys: Vec<i64> = map.pairs().iter().filter_map(|(k, _)| k.as_integer()).collect();
        assert_eq!(vec![0, 2, 3], keys);
        assert_eq!(Some(30), map.get(&Cell::integer(3)).and_then(|c| c.as_integer()));
        assert!(map.put(Cell::void(), Cell::integer(1)).is_err());
    }
}
