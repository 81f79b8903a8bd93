//! Block neighbor lists.
//!
//! Atoms are grouped into blocks of [`BLOCK_SIZE`]. Each block carries an
//! ordered list of neighbor atoms and, in parallel, one exclusion byte per
//! neighbor: bit `i` set means the pair (block lane `i`, neighbor) must not
//! be evaluated.
//!
//! Spatial list construction lives outside this crate and plugs in through
//! [`BlockNeighbors`]. [`NeighborList`] is a validated container, with an
//! all-pairs builder for small systems and tests.

use std::collections::HashSet;

use crate::BLOCK_SIZE;
use crate::error::{NonbondedError, Result};

/// Exclusion byte with every lane excluded.
pub const ALL_EXCLUDED: u8 = u8::MAX;

/// Read access to a block neighbor list.
pub trait BlockNeighbors {
    /// Number of blocks.
    fn num_blocks(&self) -> usize;

    /// Atom index held by each lane of `block`.
    fn block_atoms(&self, block: usize) -> &[usize; BLOCK_SIZE];

    /// Neighbor atoms of `block`, in evaluation order.
    fn neighbors(&self, block: usize) -> &[usize];

    /// Exclusion byte for each entry of [`neighbors`](Self::neighbors).
    fn exclusions(&self, block: usize) -> &[u8];
}

/// Neighbors and exclusion bytes of one block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NeighborBlock {
    /// Neighbor atom indices.
    pub neighbors: Vec<usize>,
    /// One exclusion byte per neighbor.
    pub exclusions: Vec<u8>,
}

impl NeighborBlock {
    /// Append a neighbor with its exclusion byte.
    pub fn push(&mut self, atom: usize, exclusions: u8) {
        self.neighbors.push(atom);
        self.exclusions.push(exclusions);
    }
}

/// Owned block neighbor list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborList {
    block_atoms: Vec<[usize; BLOCK_SIZE]>,
    blocks: Vec<NeighborBlock>,
}

impl NeighborList {
    /// Build from the sorted atom order and the per-block neighbor data.
    ///
    /// `sorted_atoms` lists the atoms of block 0, then block 1, and so on; its
    /// length must be a multiple of [`BLOCK_SIZE`] and match `blocks`.
    pub fn new(sorted_atoms: &[usize], blocks: Vec<NeighborBlock>) -> Result<Self> {
        if sorted_atoms.len() % BLOCK_SIZE != 0 {
            return Err(NonbondedError::invalid_neighbors(format!(
                "{} sorted atoms is not a multiple of {BLOCK_SIZE}",
                sorted_atoms.len()
            )));
        }
        let block_atoms: Vec<[usize; BLOCK_SIZE]> = sorted_atoms
            .chunks_exact(BLOCK_SIZE)
            .map(|chunk| std::array::from_fn(|i| chunk[i]))
            .collect();
        if block_atoms.len() != blocks.len() {
            return Err(NonbondedError::invalid_neighbors(format!(
                "{} blocks of atoms but {} neighbor blocks",
                block_atoms.len(),
                blocks.len()
            )));
        }
        for (b, block) in blocks.iter().enumerate() {
            if block.neighbors.len() != block.exclusions.len() {
                return Err(NonbondedError::invalid_neighbors(format!(
                    "block {b} has {} neighbors but {} exclusion bytes",
                    block.neighbors.len(),
                    block.exclusions.len()
                )));
            }
        }
        Ok(Self {
            block_atoms,
            blocks,
        })
    }

    /// Every pair of `num_atoms` atoms exactly once, minus `excluded_pairs`.
    ///
    /// Atoms keep their index order. The last block is padded by repeating
    /// the final atom; padded lanes are excluded against every neighbor.
    pub fn all_pairs(num_atoms: usize, excluded_pairs: &[(usize, usize)]) -> Result<Self> {
        let mut excluded = HashSet::with_capacity(excluded_pairs.len());
        for &(a, b) in excluded_pairs {
            if a >= num_atoms || b >= num_atoms {
                return Err(NonbondedError::invalid_neighbors(format!(
                    "excluded pair ({a}, {b}) out of range for {num_atoms} atoms"
                )));
            }
            excluded.insert((a.min(b), a.max(b)));
        }

        let num_blocks = num_atoms.div_ceil(BLOCK_SIZE);
        let mut sorted_atoms = Vec::with_capacity(num_blocks * BLOCK_SIZE);
        let mut blocks = Vec::with_capacity(num_blocks);

        for b in 0..num_blocks {
            let start = b * BLOCK_SIZE;
            let lanes: [usize; BLOCK_SIZE] =
                std::array::from_fn(|i| (start + i).min(num_atoms - 1));
            sorted_atoms.extend_from_slice(&lanes);

            let mut block = NeighborBlock::default();
            for j in start..num_atoms {
                let mut bits = 0u8;
                for (i, &atom) in lanes.iter().enumerate() {
                    let padded = start + i >= num_atoms;
                    let counted_elsewhere = j <= start + i;
                    if padded || counted_elsewhere || excluded.contains(&(atom.min(j), atom.max(j)))
                    {
                        bits |= 1 << i;
                    }
                }
                if bits != ALL_EXCLUDED {
                    block.push(j, bits);
                }
            }
            blocks.push(block);
        }

        Self::new(&sorted_atoms, blocks)
    }

    /// Per-block neighbor data.
    #[must_use]
    pub fn blocks(&self) -> &[NeighborBlock] {
        &self.blocks
    }

    /// Total number of neighbor entries over all blocks.
    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.blocks.iter().map(|b| b.neighbors.len()).sum()
    }
}

impl BlockNeighbors for NeighborList {
    fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn block_atoms(&self, block: usize) -> &[usize; BLOCK_SIZE] {
        &self.block_atoms[block]
    }

    fn neighbors(&self, block: usize) -> &[usize] {
        &self.blocks[block].neighbors
    }

    fn exclusions(&self, block: usize) -> &[u8] {
        &self.blocks[block].exclusions
    }
}

/// Check a neighbor list against the number of atoms.
///
/// Every block atom and neighbor index must be below `num_atoms` and every
/// block must have one exclusion byte per neighbor.
pub fn validate_neighbors<N: BlockNeighbors + ?Sized>(neighbors: &N, num_atoms: usize) -> Result<()> {
    for b in 0..neighbors.num_blocks() {
        if let Some(&atom) = neighbors.block_atoms(b).iter().find(|&&a| a >= num_atoms) {
            return Err(NonbondedError::invalid_neighbors(format!(
                "block {b} holds atom {atom}, only {num_atoms} atoms"
            )));
        }
        let list = neighbors.neighbors(b);
        let exclusions = neighbors.exclusions(b);
        if list.len() != exclusions.len() {
            return Err(NonbondedError::invalid_neighbors(format!(
                "block {b} has {} neighbors but {} exclusion bytes",
                list.len(),
                exclusions.len()
            )));
        }
        if let Some(&atom) = list.iter().find(|&&a| a >= num_atoms) {
            return Err(NonbondedError::invalid_neighbors(format!(
                "block {b} lists neighbor {atom}, only {num_atoms} atoms"
            )));
        }
    }
    Ok(())
}
