use photon_core::{OverflowPolicy, PhotonError, Result};

/// Flat list of `u16` light indices, one contiguous run per cluster.
///
/// The capacity is fixed per frame (light slots times the configured
/// multiplier). What happens when a frame needs more depends on the
/// [`OverflowPolicy`].
#[derive(Debug, Clone)]
pub struct LightIndexList {
    indices: Vec<u16>,
    capacity: usize,
    policy: OverflowPolicy,
}

impl LightIndexList {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            capacity,
            policy,
        }
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Entries still available before the capacity is hit.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.indices.len())
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.indices
    }

    /// Bytes of the written prefix, ready for a buffer upload.
    pub fn upload_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Empty the list and set the capacity for the coming frame. A list that
    /// grew keeps its grown capacity.
    pub fn reset(&mut self, capacity: usize) {
        self.indices.clear();
        self.capacity = match self.policy {
            OverflowPolicy::Grow => self.capacity.max(capacity),
            OverflowPolicy::DropAndLog => capacity,
        };
        if self.indices.capacity() < self.capacity {
            self.indices.reserve(self.capacity);
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.indices.truncate(len);
    }

    fn make_room(&mut self, additional: usize) -> Result<()> {
        let needed = self.indices.len() + additional;
        if needed <= self.capacity {
            return Ok(());
        }
        match self.policy {
            OverflowPolicy::Grow => {
                let grown = needed.max(self.capacity.saturating_mul(2)).max(1);
                log::debug!("Light index list grown from {} to {} entries", self.capacity, grown);
                self.capacity = grown;
                Ok(())
            }
            OverflowPolicy::DropAndLog => Err(PhotonError::LightListOverflow {
                capacity: self.capacity,
                requested: needed,
            }),
        }
    }

    pub fn push(&mut self, index: u16) -> Result<()> {
        self.make_room(1)?;
        self.indices.push(index);
        Ok(())
    }

    /// Append `len` zeroed entries and return them for filling in place.
    pub fn reserve_run(&mut self, len: usize) -> Result<&mut [u16]> {
        self.make_room(len)?;
        let start = self.indices.len();
        self.indices.resize(start + len, 0);
        Ok(&mut self.indices[start..])
    }
}
