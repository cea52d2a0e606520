use std::{collections::HashMap, hash::Hash, mem};

/// A two-way unique mapping between values of type `A` and type `B`.
///
/// Both directions are kept consistent at all times: for every pair
/// `(a, b)`, looking up `a` yields `b` and looking up `b` yields `a`,
/// and no key appears twice in either direction.
///
/// The map supports safe structural mutation while an iteration is
/// open. Callers bracket an iteration pass with [`BiMap::lock`] and
/// [`BiMap::unlock`]; while any lock is outstanding, mutating calls are
/// queued rather than applied, and they are replayed in arrival order
/// once the last lock is released. An open iteration therefore never
/// observes a mutation that was requested after it started.
pub struct BiMap<A, B> {
    fwd: HashMap<A, B>,
    rev: HashMap<B, A>,
    locks: u32,
    pending: Vec<PendingOp<A, B>>,
}

enum PendingOp<A, B> {
    Insert(A, B),
    RemoveByLeft(A),
    RemoveByRight(B),
}

impl<A, B> BiMap<A, B>
where
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            fwd: HashMap::new(),
            rev: HashMap::new(),
            locks: 0,
            pending: Vec::new(),
        }
    }

    /// Number of pairs currently applied. Queued mutations do not count
    /// until they are replayed.
    pub fn len(&self) -> usize {
        self.fwd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fwd.is_empty()
    }

    /// Establishes the pair `(left, right)`, first removing any existing
    /// pair containing `left` or `right`. Last write wins on either side.
    pub fn insert(&mut self, left: A, right: B) {
        if self.locks > 0 {
            self.pending.push(PendingOp::Insert(left, right));
            return;
        }
        self.apply_insert(left, right);
    }

    /// Removes the pair containing `left` if present, no-op otherwise.
    pub fn remove_by_left(&mut self, left: &A) {
        if self.locks > 0 {
            self.pending.push(PendingOp::RemoveByLeft(left.clone()));
            return;
        }
        self.apply_remove_by_left(left);
    }

    /// Removes the pair containing `right` if present, no-op otherwise.
    pub fn remove_by_right(&mut self, right: &B) {
        if self.locks > 0 {
            self.pending.push(PendingOp::RemoveByRight(right.clone()));
            return;
        }
        self.apply_remove_by_right(right);
    }

    pub fn get_by_left(&self, left: &A) -> Option<&B> {
        self.fwd.get(left)
    }

    pub fn get_by_right(&self, right: &B) -> Option<&A> {
        self.rev.get(right)
    }

    pub fn contains_left(&self, left: &A) -> bool {
        self.fwd.contains_key(left)
    }

    pub fn contains_right(&self, right: &B) -> bool {
        self.rev.contains_key(right)
    }

    /// Iterates the forward view. Bracket with [`BiMap::lock`] /
    /// [`BiMap::unlock`] if mutations may be requested mid-pass.
    pub fn iter(&self) -> impl Iterator<Item = (&A, &B)> {
        self.fwd.iter()
    }

    /// Drops all pairs. Must not be called while a lock is outstanding.
    pub fn clear(&mut self) {
        debug_assert_eq!(self.locks, 0, "BiMap::clear during an open iteration");
        self.fwd.clear();
        self.rev.clear();
    }

    /// Acquires a reentrancy token. Mutating calls made before the
    /// matching [`BiMap::unlock`] are queued instead of applied.
    pub fn lock(&mut self) {
        self.locks += 1;
    }

    /// Releases one reentrancy token. Releasing the last token replays
    /// every queued mutation through the normal mutating path, in the
    /// order the mutations arrived, so later queued mutations observe
    /// earlier ones.
    ///
    /// # Panics
    ///
    /// Panics if called without a matching [`BiMap::lock`]; that is a
    /// programming error in the caller, not a recoverable condition.
    pub fn unlock(&mut self) {
        if self.locks == 0 {
            panic!("BiMap::unlock called without a matching lock");
        }
        self.locks -= 1;
        if self.locks == 0 {
            for op in mem::take(&mut self.pending) {
                match op {
                    PendingOp::Insert(left, right) => self.apply_insert(left, right),
                    PendingOp::RemoveByLeft(left) => self.apply_remove_by_left(&left),
                    PendingOp::RemoveByRight(right) => self.apply_remove_by_right(&right),
                }
            }
        }
    }

    fn apply_insert(&mut self, left: A, right: B) {
        self.apply_remove_by_left(&left);
        self.apply_remove_by_right(&right);
        self.fwd.insert(left.clone(), right.clone());
        self.rev.insert(right, left);
    }

    fn apply_remove_by_left(&mut self, left: &A) {
        if let Some(right) = self.fwd.remove(left) {
            self.rev.remove(&right);
        }
    }

    fn apply_remove_by_right(&mut self, right: &B) {
        if let Some(left) = self.rev.remove(right) {
            self.fwd.remove(&left);
        }
    }
}

impl<A, B> Default for BiMap<A, B>
where
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
