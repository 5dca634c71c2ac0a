//! Merkle root over a block's transaction hashes. Odd layers are completed
//! by duplicating the last node.

use crate::models::hash::Digest;

pub fn merkle_root(leaves: &[Digest]) -> Digest {
    if leaves.is_empty() {
        return Digest::ZERO;
    }

    let mut level: Vec<Digest> = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        level = level
            .chunks(2)
            .map(|pair| {
                let mut buf = Vec::with_capacity(64);
                buf.extend_from_slice(&pair[0].0);
                buf.extend_from_slice(&pair[1].0);
                Digest::hash_bytes(&buf)
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod merkle_tests {
    use super::*;

    fn leaf(n: u8) -> Digest {
        Digest::hash_bytes(&[n])
    }

    #[test]
    fn empty_tree_is_zero() {
        assert_eq!(merkle_root(&[]), Digest::ZERO);
    }

    #[test]
    fn single_leaf_tree_is_the_leaf_hash() {
        let l = leaf(1);
        assert_eq!(merkle_root(&[l]), l);
    }

    #[test]
    fn two_leaves_differ_from_either_leaf() {
        let a = leaf(1);
        let b = leaf(2);
        let root = merkle_root(&[a, b]);
        assert_ne!(root, a);
        assert_ne!(root, b);
    }

    #[test]
    fn odd_leaf_count_duplicates_last() {
        let a = leaf(1);
        let b = leaf(2);
        let c = leaf(3);
        let root_odd = merkle_root(&[a, b, c]);
        let root_padded = merkle_root(&[a, b, c, c]);
        assert_eq!(root_odd, root_padded);
    }

    #[test]
    fn order_is_significant() {
        let a = leaf(1);
        let b = leaf(2);
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }
}
