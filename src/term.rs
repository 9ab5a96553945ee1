//! The in-memory terminal record and its mutation API, grounded in
//! unibilium-internal.h's `struct unibi_term` and the getter/setter/add/del
//! functions in `unibilium.c`.

use crate::dynseq::DynSeq;
use crate::error::Error;
use crate::variant::TermString;

/// Number of standard boolean capabilities (`unibi_boolean_end_ -
/// unibi_boolean_begin_ - 1` in the historical header).
pub const BOOL_COUNT: usize = 44;
/// Number of standard numeric capabilities.
pub const NUM_COUNT: usize = 39;
/// Number of standard string capabilities.
pub const STR_COUNT: usize = 414;

/// A terminal description: the central data model every codec and the
/// mutation API operate on.
///
/// `strs`/`ext_strs` slots are `Option<TermString>` — absent is distinct
/// from an empty string. There's no separate "arena"; each slot owns its
/// bytes directly, so disposal is just `Term`'s `Drop` impl (the default
/// one).
#[derive(Debug, Clone)]
pub struct Term {
    pub name: TermString,
    pub aliases: Vec<TermString>,
    bools: Vec<bool>,
    nums: Vec<i32>,
    strs: Vec<Option<TermString>>,
    ext_bools: DynSeq<bool>,
    ext_nums: DynSeq<i32>,
    ext_strs: DynSeq<Option<TermString>>,
    ext_names: DynSeq<TermString>,
}

impl Term {
    /// The canned empty record (`unibi_dummy`): name is a long
    /// description, the lone alias is the short name "null" — this is
    /// intentionally the reverse of the usual "short name first"
    /// terminfo convention; see `codec::standard`'s module docs.
    pub fn dummy() -> Term {
        Term {
            name: TermString::from("unibilium dummy terminal"),
            aliases: vec![TermString::from("null")],
            bools: vec![false; BOOL_COUNT],
            nums: vec![-1; NUM_COUNT],
            strs: vec![None; STR_COUNT],
            ext_bools: DynSeq::new(),
            ext_nums: DynSeq::new(),
            ext_strs: DynSeq::new(),
            ext_names: DynSeq::new(),
        }
    }

    pub(crate) fn empty_shell() -> Term {
        Term {
            name: TermString::default(),
            aliases: Vec::new(),
            bools: vec![false; BOOL_COUNT],
            nums: vec![-1; NUM_COUNT],
            strs: vec![None; STR_COUNT],
            ext_bools: DynSeq::new(),
            ext_nums: DynSeq::new(),
            ext_strs: DynSeq::new(),
            ext_names: DynSeq::new(),
        }
    }

    pub(crate) fn bools_slice(&self) -> &[bool] {
        &self.bools
    }
    pub(crate) fn bools_slice_mut(&mut self) -> &mut [bool] {
        &mut self.bools
    }
    pub(crate) fn nums_slice(&self) -> &[i32] {
        &self.nums
    }
    pub(crate) fn nums_slice_mut(&mut self) -> &mut [i32] {
        &mut self.nums
    }
    pub(crate) fn strs_slice(&self) -> &[Option<TermString>] {
        &self.strs
    }
    pub(crate) fn strs_slice_mut(&mut self) -> &mut [Option<TermString>] {
        &mut self.strs
    }
    pub(crate) fn ext_bools_mut(&mut self) -> &mut DynSeq<bool> {
        &mut self.ext_bools
    }
    pub(crate) fn ext_nums_mut(&mut self) -> &mut DynSeq<i32> {
        &mut self.ext_nums
    }
    pub(crate) fn ext_strs_mut(&mut self) -> &mut DynSeq<Option<TermString>> {
        &mut self.ext_strs
    }
    pub(crate) fn ext_names_mut(&mut self) -> &mut DynSeq<TermString> {
        &mut self.ext_names
    }
    pub fn ext_bools_raw(&self) -> &DynSeq<bool> {
        &self.ext_bools
    }
    pub fn ext_nums_raw(&self) -> &DynSeq<i32> {
        &self.ext_nums
    }
    pub fn ext_strs_raw(&self) -> &DynSeq<Option<TermString>> {
        &self.ext_strs
    }
    pub fn ext_names_raw(&self) -> &DynSeq<TermString> {
        &self.ext_names
    }

    /// `ASSERT_EXT_NAMES`: the name-array invariant (the three name
    /// regions always sum to `ext_names.len()`).
    pub fn check_ext_names_invariant(&self) -> bool {
        self.ext_names.len() == self.ext_bools.len() + self.ext_nums.len() + self.ext_strs.len()
    }

    // ---- standard capability accessors ----

    /// Out-of-range ordinals return `-1` (matches `unibi_get_bool`).
    pub fn get_bool(&self, i: usize) -> i32 {
        match self.bools.get(i) {
            Some(&b) => b as i32,
            None => -1,
        }
    }

    /// Out-of-range ordinals are a programmer error: debug-asserted,
    /// a no-op in release builds.
    pub fn set_bool(&mut self, i: usize, v: bool) {
        debug_assert!(i < BOOL_COUNT, "set_bool ordinal out of range");
        if let Some(slot) = self.bools.get_mut(i) {
            *slot = v;
        }
    }

    /// Out-of-range ordinals return `-2` (matches `unibi_get_num`).
    pub fn get_num(&self, i: usize) -> i32 {
        match self.nums.get(i) {
            Some(&n) => n,
            None => -2,
        }
    }

    pub fn set_num(&mut self, i: usize, v: i32) {
        debug_assert!(i < NUM_COUNT, "set_num ordinal out of range");
        if let Some(slot) = self.nums.get_mut(i) {
            *slot = v;
        }
    }

    pub fn get_str(&self, i: usize) -> Option<&[u8]> {
        self.strs.get(i).and_then(|s| s.as_ref()).map(|s| s.as_bytes())
    }

    pub fn set_str(&mut self, i: usize, v: Option<impl Into<TermString>>) {
        debug_assert!(i < STR_COUNT, "set_str ordinal out of range");
        if let Some(slot) = self.strs.get_mut(i) {
            *slot = v.map(Into::into);
        }
    }

    // ---- extended capabilities ----

    pub fn count_ext_bool(&self) -> usize {
        self.ext_bools.len()
    }
    pub fn count_ext_num(&self) -> usize {
        self.ext_nums.len()
    }
    pub fn count_ext_str(&self) -> usize {
        self.ext_strs.len()
    }

    pub fn get_ext_bool(&self, i: usize) -> i32 {
        match self.ext_bools.get(i) {
            Some(&b) => b as i32,
            None => -1,
        }
    }
    pub fn get_ext_num(&self, i: usize) -> i32 {
        match self.ext_nums.get(i) {
            Some(&n) => n,
            None => -2,
        }
    }
    pub fn get_ext_str(&self, i: usize) -> Option<&[u8]> {
        self.ext_strs.get(i).and_then(|s| s.as_ref()).map(|s| s.as_bytes())
    }

    pub fn get_ext_bool_name(&self, i: usize) -> Option<&[u8]> {
        if i >= self.ext_bools.len() {
            return None;
        }
        self.ext_names.get(i).map(|n| n.as_bytes())
    }
    pub fn get_ext_num_name(&self, i: usize) -> Option<&[u8]> {
        if i >= self.ext_nums.len() {
            return None;
        }
        self.ext_names.get(self.ext_bools.len() + i).map(|n| n.as_bytes())
    }
    pub fn get_ext_str_name(&self, i: usize) -> Option<&[u8]> {
        if i >= self.ext_strs.len() {
            return None;
        }
        self.ext_names
            .get(self.ext_bools.len() + self.ext_nums.len() + i)
            .map(|n| n.as_bytes())
    }

    pub fn set_ext_bool(&mut self, i: usize, v: bool) {
        debug_assert!(i < self.ext_bools.len());
        if let Some(slot) = self.ext_bools.get_mut(i) {
            *slot = v;
        }
    }
    pub fn set_ext_bool_name(&mut self, i: usize, name: impl Into<TermString>) {
        debug_assert!(i < self.ext_bools.len());
        if i < self.ext_bools.len() {
            if let Some(slot) = self.ext_names.get_mut(i) {
                *slot = name.into();
            }
        }
    }
    pub fn set_ext_num(&mut self, i: usize, v: i32) {
        debug_assert!(i < self.ext_nums.len());
        if let Some(slot) = self.ext_nums.get_mut(i) {
            *slot = v;
        }
    }
    pub fn set_ext_num_name(&mut self, i: usize, name: impl Into<TermString>) {
        let nb = self.ext_bools.len();
        debug_assert!(i < self.ext_nums.len());
        if i < self.ext_nums.len() {
            if let Some(slot) = self.ext_names.get_mut(nb + i) {
                *slot = name.into();
            }
        }
    }
    pub fn set_ext_str(&mut self, i: usize, v: Option<impl Into<TermString>>) {
        debug_assert!(i < self.ext_strs.len());
        if let Some(slot) = self.ext_strs.get_mut(i) {
            *slot = v.map(Into::into);
        }
    }
    pub fn set_ext_str_name(&mut self, i: usize, name: impl Into<TermString>) {
        let nb_nn = self.ext_bools.len() + self.ext_nums.len();
        debug_assert!(i < self.ext_strs.len());
        if i < self.ext_strs.len() {
            if let Some(slot) = self.ext_names.get_mut(nb_nn + i) {
                *slot = name.into();
            }
        }
    }

    /// `unibi_add_ext_bool`: the new name is inserted right before the
    /// numerics region of `ext_names`, keeping the
    /// booleans-then-numerics-then-strings partition intact.
    pub fn add_ext_bool(&mut self, name: impl Into<TermString>, v: bool) -> Result<usize, Error> {
        let insert_at = self.ext_bools.len();
        self.ext_names.insert(insert_at, name.into())?;
        self.ext_bools.push(v)?;
        Ok(insert_at)
    }

    pub fn add_ext_num(&mut self, name: impl Into<TermString>, v: i32) -> Result<usize, Error> {
        let insert_at = self.ext_bools.len() + self.ext_nums.len();
        self.ext_names.insert(insert_at, name.into())?;
        let idx = self.ext_nums.len();
        self.ext_nums.push(v)?;
        Ok(idx)
    }

    pub fn add_ext_str(
        &mut self,
        name: impl Into<TermString>,
        v: Option<impl Into<TermString>>,
    ) -> Result<usize, Error> {
        self.ext_names.push(name.into())?;
        let idx = self.ext_strs.len();
        self.ext_strs.push(v.map(Into::into))?;
        Ok(idx)
    }

    pub fn del_ext_bool(&mut self, i: usize) {
        debug_assert!(i < self.ext_bools.len());
        if i < self.ext_bools.len() {
            self.ext_bools.remove(i);
            self.ext_names.remove(i);
        }
    }

    pub fn del_ext_num(&mut self, i: usize) {
        debug_assert!(i < self.ext_nums.len());
        if i < self.ext_nums.len() {
            let nb = self.ext_bools.len();
            self.ext_nums.remove(i);
            self.ext_names.remove(nb + i);
        }
    }

    pub fn del_ext_str(&mut self, i: usize) {
        debug_assert!(i < self.ext_strs.len());
        if i < self.ext_strs.len() {
            let nb_nn = self.ext_bools.len() + self.ext_nums.len();
            self.ext_strs.remove(i);
            self.ext_names.remove(nb_nn + i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_has_no_capabilities() {
        let t = Term::dummy();
        assert_eq!(t.name.to_string(), "unibilium dummy terminal");
        assert_eq!(t.aliases.len(), 1);
        assert_eq!(t.aliases[0].to_string(), "null");
        assert_eq!(t.get_bool(0), 0);
        assert_eq!(t.get_num(0), -1);
        assert_eq!(t.get_str(0), None);
        assert!(t.check_ext_names_invariant());
    }

    #[test]
    fn bool_set_get_roundtrip() {
        let mut t = Term::dummy();
        t.set_bool(3, true);
        assert_eq!(t.get_bool(3), 1);
        assert_eq!(t.get_bool(4), 0);
    }

    #[test]
    fn oob_getters_return_sentinels() {
        let t = Term::dummy();
        assert_eq!(t.get_bool(9999), -1);
        assert_eq!(t.get_num(9999), -2);
        assert_eq!(t.get_str(9999), None);
    }

    #[test]
    fn add_and_delete_ext_str_restores_invariant() {
        let mut t = Term::dummy();
        let idx = t.add_ext_str("XT", Some(&b"\x1b]"[..])).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(t.count_ext_str(), 1);
        assert_eq!(t.get_ext_str_name(0), Some(&b"XT"[..]));
        assert!(t.check_ext_names_invariant());
        t.del_ext_str(0);
        assert_eq!(t.count_ext_str(), 0);
        assert!(t.check_ext_names_invariant());
    }

    #[test]
    fn ext_regions_stay_partitioned_across_mixed_adds() {
        let mut t = Term::dummy();
        t.add_ext_bool("b0", true).unwrap();
        t.add_ext_num("n0", 5).unwrap();
        t.add_ext_bool("b1", false).unwrap();
        // b1's name must land before n0's in ext_names (bools region
        // precedes numerics region), even though n0 was added first.
        assert_eq!(t.get_ext_bool_name(0), Some(&b"b0"[..]));
        assert_eq!(t.get_ext_bool_name(1), Some(&b"b1"[..]));
        assert_eq!(t.get_ext_num_name(0), Some(&b"n0"[..]));
        assert!(t.check_ext_names_invariant());
    }
}
