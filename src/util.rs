/// Bitset over the interned subject numbering of one subproblem.
///
/// Each destination room accumulates the set of subjects examined in it; the disjointness check
/// between two rooms reduces to word-wise AND. All sets of one subproblem must be created with the
/// same universe size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectSet {
    bits: Vec<u64>,
}

impl SubjectSet {
    pub fn new(universe: usize) -> Self {
        SubjectSet {
            bits: vec![0; (universe + 63) / 64],
        }
    }

    pub fn singleton(universe: usize, id: usize) -> Self {
        let mut set = Self::new(universe);
        set.insert(id);
        set
    }

    pub fn insert(&mut self, id: usize) {
        self.bits[id / 64] |= 1 << (id % 64);
    }

    pub fn is_disjoint(&self, other: &SubjectSet) -> bool {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .all(|(a, b)| a & b == 0)
    }

    pub fn union_with(&mut self, other: &SubjectSet) {
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            *a |= b;
        }
    }
}

#[cfg(test)]
mod test {
    use super::SubjectSet;

    #[test]
    fn simple_test() {
        let mut a = SubjectSet::new(130);
        a.insert(0);
        a.insert(64);
        a.insert(129);
        assert!(!a.is_disjoint(&SubjectSet::singleton(130, 0)));
        assert!(!a.is_disjoint(&SubjectSet::singleton(130, 64)));
        assert!(!a.is_disjoint(&SubjectSet::singleton(130, 129)));
        assert!(a.is_disjoint(&SubjectSet::singleton(130, 1)));
        assert!(a.is_disjoint(&SubjectSet::singleton(130, 128)));

        let b = SubjectSet::singleton(130, 65);
        assert!(a.is_disjoint(&b));
        a.union_with(&b);
        assert!(!a.is_disjoint(&b));
    }

    #[test]
    fn union_is_cumulative() {
        let mut a = SubjectSet::singleton(3, 0);
        a.union_with(&SubjectSet::singleton(3, 2));
        assert!(!a.is_disjoint(&SubjectSet::singleton(3, 0)));
        assert!(a.is_disjoint(&SubjectSet::singleton(3, 1)));
        assert!(!a.is_disjoint(&SubjectSet::singleton(3, 2)));
    }
}
