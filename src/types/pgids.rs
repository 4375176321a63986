use std::{borrow::Cow, ops::Deref};

use serde::{Deserialize, Serialize};

use crate::types::{Pgid, error::PageError};

/// Strictly ascending, duplicate-free list of page ids.
///
/// The freelist keeps one of these per pending transaction and a master list
/// for everything that is free; commits fold the former into the latter with
/// [`Pgids::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pgids(Vec<Pgid>);

impl Pgids {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn as_slice(&self) -> &[Pgid] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Pgid> {
        self.0
    }

    pub fn push(&mut self, id: Pgid) {
        self.0.push(id);
    }

    /// Sorts by numeric id. Ids collected out of order must go through this
    /// before merging.
    pub fn sort(&mut self) {
        self.0.sort_unstable();
    }

    pub fn is_strictly_ascending(&self) -> bool {
        self.0.windows(2).all(|w| w[0] < w[1])
    }

    /// Sorted union of `self` and `other`. An empty side hands back the other
    /// list as-is without allocating.
    pub fn merge(self, other: Pgids) -> Pgids {
        if self.0.is_empty() {
            return other;
        }
        if other.0.is_empty() {
            return self;
        }
        let mut merged = vec![0; self.0.len() + other.0.len()];
        merge_into(&mut merged, &self.0, &other.0);
        Pgids(merged)
    }
}

impl Deref for Pgids {
    type Target = [Pgid];

    fn deref(&self) -> &[Pgid] {
        &self.0
    }
}

impl From<Vec<Pgid>> for Pgids {
    fn from(ids: Vec<Pgid>) -> Self {
        Self(ids)
    }
}

impl From<Pgids> for Vec<Pgid> {
    fn from(ids: Pgids) -> Self {
        ids.0
    }
}

impl FromIterator<Pgid> for Pgids {
    fn from_iter<I: IntoIterator<Item = Pgid>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Pgids {
    type Item = Pgid;
    type IntoIter = std::vec::IntoIter<Pgid>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Pgids {
    type Item = &'a Pgid;
    type IntoIter = std::slice::Iter<'a, Pgid>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Sorted union of two ascending id slices. Borrows the non-empty side when
/// the other is empty.
pub fn merge<'a>(a: &'a [Pgid], b: &'a [Pgid]) -> Cow<'a, [Pgid]> {
    if a.is_empty() {
        return Cow::Borrowed(b);
    }
    if b.is_empty() {
        return Cow::Borrowed(a);
    }
    let mut merged = vec![0; a.len() + b.len()];
    merge_into(&mut merged, a, b);
    Cow::Owned(merged)
}

/// Copies the sorted union of `a` and `b` into the front of `dst`.
///
/// # Panics
///
/// Panics with [`PageError::CapacityViolation`] if `dst` is shorter than
/// `a.len() + b.len()`.
pub fn merge_into(dst: &mut [Pgid], a: &[Pgid], b: &[Pgid]) {
    if let Err(err) = try_merge_into(dst, a, b) {
        panic!("{}", err);
    }
}

/// Like [`merge_into`] but reports an undersized `dst` instead of panicking.
pub fn try_merge_into(dst: &mut [Pgid], a: &[Pgid], b: &[Pgid]) -> Result<(), PageError> {
    if dst.len() < a.len() + b.len() {
        return Err(PageError::CapacityViolation {
            dst: dst.len(),
            a: a.len(),
            b: b.len(),
        });
    }
    merge_runs_by(dst, a, b, |x, y| x < y);
    Ok(())
}

/// Merges two slices sorted under `less` into `dst`, copying whole runs at a
/// time.
///
/// Each round binary-searches the leading slice for the first element past the
/// head of the following slice, copies everything before it in one go, then
/// swaps the roles. Inputs made of a few long runs merge in a handful of
/// copies.
///
/// # Panics
///
/// Panics if `dst` is shorter than `a.len() + b.len()`.
pub fn merge_runs_by<T, F>(dst: &mut [T], a: &[T], b: &[T], mut less: F)
where
    T: Copy,
    F: FnMut(&T, &T) -> bool,
{
    assert!(
        dst.len() >= a.len() + b.len(),
        "merge destination too small: {} < {} + {}",
        dst.len(),
        a.len(),
        b.len()
    );
    if a.is_empty() {
        dst[..b.len()].copy_from_slice(b);
        return;
    }
    if b.is_empty() {
        dst[..a.len()].copy_from_slice(a);
        return;
    }

    let (mut lead, mut follow) = if less(&b[0], &a[0]) { (b, a) } else { (a, b) };
    let mut written = 0;

    loop {
        // follow is never empty here
        let head = &follow[0];
        let n = lead.partition_point(|x| !less(head, x));
        dst[written..written + n].copy_from_slice(&lead[..n]);
        written += n;
        if n == lead.len() {
            break;
        }
        (lead, follow) = (follow, &lead[n..]);
    }

    dst[written..written + follow.len()].copy_from_slice(follow);
}
